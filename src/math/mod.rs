//! Hand-rolled vector/matrix math kernel with an optional SIMD-accelerated
//! batch path, dispatched once at startup based on detected CPU features.
//!
//! This module exists instead of pulling in a math crate because the batch
//! kernel dispatch (scalar vs. SIMD, chosen once and reused) is itself the
//! thing under test: see [`simd::VecKernel`].

mod mat4;
mod simd;
mod vec2;
mod vec3;
mod vec4;

pub use mat4::Mat4;
pub use simd::{active_kernel, VecKernel};
pub use vec2::V2;
pub use vec3::V3;
pub use vec4::V4;

/// Below this vector length, [`V3::normalize`] and friends return the zero
/// vector instead of dividing by a near-zero length.
pub const NORMALIZE_EPSILON: f32 = 1e-6;
