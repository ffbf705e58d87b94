//! Camera state: position, yaw/pitch orientation and field of view, plus the
//! rotation and perspective matrices derived from them each frame.
//!
//! Two degrees of freedom only — yaw and pitch, no roll — since that's all
//! input actually drives. A full quaternion orientation would be more
//! machinery than this needs; `R = rotateY(yaw) * rotateX(pitch)` composed
//! directly from the math kernel's `Mat4` is both simpler and exactly what
//! the frame orchestrator computes each frame.

use crate::math::Mat4;

/// Default vertical field of view, in degrees.
pub const DEFAULT_FOV_DEGREES: f32 = 60.0;
/// FOV step per input action, in degrees.
pub const FOV_STEP_DEGREES: f32 = 1.5;
/// Minimum allowed FOV, in degrees.
pub const FOV_MIN_DEGREES: f32 = 20.0;
/// Maximum allowed FOV, in degrees.
pub const FOV_MAX_DEGREES: f32 = 120.0;
/// Near clip plane distance.
pub const NEAR_CLIP: f32 = 0.1;

/// The camera's accumulated input state and derived projection parameters.
pub struct Camera {
    yaw: f32,
    pitch: f32,
    fov_degrees: f32,
    aspect_ratio: f32,
}

impl Camera {
    /// Builds a camera facing `(0,0,1)` with the default FOV.
    pub fn new(aspect_ratio: f32) -> Self {
        Camera { yaw: 0.0, pitch: 0.0, fov_degrees: DEFAULT_FOV_DEGREES, aspect_ratio }
    }

    /// Accumulates a yaw delta, in radians (positive = turn right).
    pub fn add_yaw(&mut self, delta: f32) {
        self.yaw += delta;
    }

    /// Accumulates a pitch delta, in radians (positive = look up).
    pub fn add_pitch(&mut self, delta: f32) {
        self.pitch += delta;
    }

    /// Steps the field of view by `steps * FOV_STEP_DEGREES`, clamped to
    /// `[FOV_MIN_DEGREES, FOV_MAX_DEGREES]`.
    pub fn step_fov(&mut self, steps: f32) {
        self.fov_degrees = (self.fov_degrees + steps * FOV_STEP_DEGREES).clamp(FOV_MIN_DEGREES, FOV_MAX_DEGREES);
    }

    /// Updates the aspect ratio (width / height), e.g. after a window resize.
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Current field of view, in degrees.
    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    /// The camera's rotation matrix, `rotateY(yaw) * rotateX(pitch)`.
    pub fn rotation(&self) -> Mat4 {
        Mat4::rotate_y(self.yaw).multiply(&Mat4::rotate_x(self.pitch))
    }

    /// The camera's perspective projection matrix for its current FOV and
    /// aspect ratio, with a fixed near plane at [`NEAR_CLIP`] and far plane
    /// at 1000 units.
    pub fn perspective(&self) -> Mat4 {
        Mat4::perspective(self.fov_degrees.to_radians(), self.aspect_ratio, NEAR_CLIP, 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fov_step_clamps_at_bounds() {
        let mut camera = Camera::new(16.0 / 9.0);
        for _ in 0..200 {
            camera.step_fov(-1.0);
        }
        assert_eq!(camera.fov_degrees(), FOV_MIN_DEGREES);
        for _ in 0..200 {
            camera.step_fov(1.0);
        }
        assert_eq!(camera.fov_degrees(), FOV_MAX_DEGREES);
    }

    #[test]
    fn fov_step_size_matches_constant() {
        let mut camera = Camera::new(16.0 / 9.0);
        camera.step_fov(1.0);
        assert!((camera.fov_degrees() - (DEFAULT_FOV_DEGREES + FOV_STEP_DEGREES)).abs() < 1e-5);
    }

    #[test]
    fn zero_yaw_pitch_gives_identity_rotation() {
        let camera = Camera::new(16.0 / 9.0);
        let r = camera.rotation();
        let id = Mat4::IDENTITY;
        for i in 0..16 {
            assert!((r.m[i] - id.m[i]).abs() < 1e-5);
        }
    }
}
