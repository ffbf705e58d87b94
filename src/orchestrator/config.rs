use crate::mesh::{DEFAULT_T_MAX, DEFAULT_V_MAX};

/// Default tile edge length, in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 64;
/// Default target frame rate, used for pacing (and the title-bar string).
pub const DEFAULT_TARGET_FPS: u32 = 120;
/// Default distance the mesh is placed along the camera's forward axis.
///
/// The camera only carries orientation (yaw/pitch), not a translation, so
/// each frame the orchestrator pushes the mesh `mesh_distance` units down
/// +Z in camera space (`t = R*v + (0,0,mesh_distance)`) instead of moving a
/// camera position around a stationary subject.
pub const DEFAULT_MESH_DISTANCE: f32 = 5.0;

/// Construction-time configuration for an [`super::Orchestrator`].
///
/// Every field has a sensible [`Default`]; callers override only what they
/// need to rather than supply a config file — CLI/config-file parsing is
/// left to the embedding application.
#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    /// Tile edge length, in pixels. See [`crate::tile::TileGrid`].
    pub tile_size: u32,
    /// Maximum vertices per meshlet. See [`crate::mesh::generate_meshlets`].
    pub v_max: usize,
    /// Maximum triangles per meshlet.
    pub t_max: usize,
    /// Target frame rate used for pacing and the title-bar FPS string.
    pub target_fps: u32,
    /// Near clip distance; vertices at or nearer than this are rejected.
    pub near: f32,
    /// Distance the mesh is placed along the camera's forward axis.
    pub mesh_distance: f32,
    /// Overrides the worker thread count (`None` = `available_parallelism
    /// - 1`, floored at 1).
    pub worker_count_override: Option<usize>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            tile_size: DEFAULT_TILE_SIZE,
            v_max: DEFAULT_V_MAX,
            t_max: DEFAULT_T_MAX,
            target_fps: DEFAULT_TARGET_FPS,
            near: crate::scene::camera::NEAR_CLIP,
            mesh_distance: DEFAULT_MESH_DISTANCE,
            worker_count_override: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = RenderConfig::default();
        assert_eq!(config.tile_size, 64);
        assert_eq!(config.v_max, 64);
        assert_eq!(config.t_max, 126);
        assert_eq!(config.target_fps, 120);
        assert!((config.near - 0.1).abs() < 1e-6);
    }
}
