//! Geometry storage and meshlet clustering.

mod mesh;
mod meshlet;

pub use mesh::{Mesh, MeshError, Triangle};
pub use meshlet::{generate_meshlets, Meshlet, DEFAULT_T_MAX, DEFAULT_V_MAX};
