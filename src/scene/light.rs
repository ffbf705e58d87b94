//! The scene's single directional light: an orbit position the user can
//! steer, reduced each frame to a unit direction vector.
//!
//! One light, orbiting a fixed distance from the origin, contributing only
//! a direction to the flat lighting formula in `raster::shader`. There is
//! no per-light color/strength or point-light attenuation (see
//! `DESIGN.md`).

use crate::math::{Mat4, V3};

/// Distance from the origin the light orbits at.
pub const DEFAULT_ORBIT_DISTANCE: f32 = 5.0;

/// An orbiting directional light: two orbit angles (around X and Y)
/// applied to a fixed offset along +Z.
pub struct Light {
    orbit_x: f32,
    orbit_y: f32,
    distance: f32,
}

impl Light {
    /// Builds a light at the default orbit distance, angles zeroed (so it
    /// starts directly along `(0, 0, distance)`).
    pub fn new() -> Self {
        Light { orbit_x: 0.0, orbit_y: 0.0, distance: DEFAULT_ORBIT_DISTANCE }
    }

    /// Accumulates an orbit delta around the X axis, in radians.
    pub fn add_orbit_x(&mut self, delta: f32) {
        self.orbit_x += delta;
    }

    /// Accumulates an orbit delta around the Y axis, in radians.
    pub fn add_orbit_y(&mut self, delta: f32) {
        self.orbit_y += delta;
    }

    /// The light's current world-space position: the orbit rotation applied
    /// to `(0, 0, distance)`.
    pub fn position(&self) -> V3 {
        let rotation = Mat4::rotate_y(self.orbit_y).multiply(&Mat4::rotate_x(self.orbit_x));
        rotation.mul_vec3(V3::new(0.0, 0.0, self.distance))
    }

    /// Unit direction from the origin toward the light. Falls back to
    /// `(0, 0, 1)` in the degenerate case where the orbit has collapsed the
    /// position to (numerically) zero.
    pub fn direction(&self) -> V3 {
        let pos = self.position();
        let normalized = pos.normalize();
        if normalized == V3::ZERO {
            V3::new(0.0, 0.0, 1.0)
        } else {
            normalized
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Light::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_orbit_points_along_positive_z() {
        let light = Light::new();
        let dir = light.direction();
        assert!((dir.x).abs() < 1e-5);
        assert!((dir.y).abs() < 1e-5);
        assert!((dir.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn direction_is_always_unit_length() {
        let mut light = Light::new();
        light.add_orbit_x(0.7);
        light.add_orbit_y(1.3);
        let dir = light.direction();
        assert!((dir.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn position_scales_with_distance() {
        let light = Light::new();
        assert!((light.position().length() - DEFAULT_ORBIT_DISTANCE).abs() < 1e-5);
    }
}
