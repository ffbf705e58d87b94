//! The tile kernel: backface culling, flat/textured lighting, and the
//! integer-barycentric fill + optional wireframe overlay that a single
//! worker runs against one tile's private buffer.
//!
//! Walks one tile's bin list against its local-space buffer using the
//! kernel's own `V2`/`V3`/`Mat4` types, with fixed lighting and
//! backface-cull formulas rather than a general shading pipeline.

mod rasterizer;
mod shader;

pub use rasterizer::{rasterize_tile, TileJobContext};
pub use shader::{backface_cull, pack_color, shade, AMBIENT};
