//! External asset collaborators: the OBJ mesh loader, the BMP texture
//! loader, and the texture type they produce.
//!
//! These are a "produces the initial mesh"/"produces sampleable texel
//! arrays" black box; the core pipeline (binning, job system, rasterizer)
//! only ever consumes the [`crate::mesh::Mesh`] and [`texture::Texture`]
//! these hand back.

pub mod loaders;
pub mod texture;

pub use loaders::{load_bmp, load_obj, BmpError, ObjError};
pub use texture::{Texture, TextureError};
