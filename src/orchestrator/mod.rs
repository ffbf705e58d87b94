//! The frame orchestrator: the one piece of code that, every frame, walks
//! a mesh through transform, projection, binning, parallel tile
//! rasterization and composition into an external framebuffer.
//!
//! Grounded in `other_examples/.../executor.rs`'s "dispatch one unit of
//! work per bucket, wait for completion" shape, generalized with the
//! frame-scoped bookkeeping (pacing, meshlet cache refresh, debug overlays)
//! a renderer actually needs around that core loop.

mod config;
mod error;
mod frame_arena;
mod overlay;
mod pacing;

pub use config::RenderConfig;
pub use error::RenderError;
pub use pacing::FramePacing;

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use log::{debug, warn};

use crate::binning::{self, ScreenAabb};
use crate::cache;
use crate::jobs::{Job, JobHandle, JobSystem};
use crate::math::{active_kernel, Mat4, V3};
use crate::mesh::{self, Mesh};
use crate::raster::{rasterize_tile, TileJobContext};
use crate::resources::Texture;
use crate::scene::Scene;
use crate::tile::TileGrid;

use frame_arena::FrameArena;

/// Owns everything a running render needs across frames: the mesh and
/// optional texture being drawn, the tile grid sized to the current
/// window, the worker pool, frame-scoped scratch storage, and the
/// debug-overlay toggles an [`crate::inputs::InputHandler`] flips.
pub struct Orchestrator {
    config: RenderConfig,
    mesh: Mesh,
    mesh_source_path: Option<PathBuf>,
    texture: Option<Texture>,
    grid: TileGrid,
    jobs: JobSystem,
    arena: FrameArena,
    pacing: FramePacing,
    /// Overlays fill edges/edges with wireframe after the solid fill pass.
    pub wireframe: bool,
    /// Draws a one-pixel green border around every tile.
    pub show_tile_borders: bool,
    /// Draws a cyan marker at the light's projected position.
    pub show_light_marker: bool,
}

impl Orchestrator {
    /// Builds an orchestrator for a `screen_width x screen_height` window,
    /// spinning up `config.worker_count_override` (or
    /// `available_parallelism() - 1`) worker threads.
    ///
    /// Meshlets are built fresh via [`mesh::generate_meshlets`] with no
    /// cache lookup; call [`Orchestrator::load_meshlets_or_build`]
    /// afterward if `mesh` has a known source path and its cache should be
    /// consulted first.
    pub fn new(config: RenderConfig, mut mesh: Mesh, texture: Option<Texture>, screen_width: u32, screen_height: u32) -> Self {
        let worker_count = config.worker_count_override.unwrap_or_else(default_worker_count);
        let meshlets = mesh::generate_meshlets(&mesh, config.v_max, config.t_max);
        mesh.set_meshlets(meshlets);

        Orchestrator {
            grid: TileGrid::new(screen_width, screen_height, config.tile_size),
            jobs: JobSystem::new(worker_count),
            arena: FrameArena::new(),
            pacing: FramePacing::new(config.target_fps),
            mesh,
            mesh_source_path: None,
            texture,
            wireframe: false,
            show_tile_borders: false,
            show_light_marker: false,
            config,
        }
    }

    /// Resizes the tile grid for a new window size. Must be called before
    /// the next [`Orchestrator::render_frame`] after a resize.
    pub fn resize(&mut self, screen_width: u32, screen_height: u32) {
        self.grid = TileGrid::new(screen_width, screen_height, self.config.tile_size);
    }

    /// Loads this mesh's meshlets from `./cache/<hash>.meshlets` if present
    /// and still valid for the mesh's current vertex/triangle counts;
    /// otherwise rebuilds them with [`mesh::generate_meshlets`] and writes
    /// a fresh cache entry. Any cache error (missing file, bad magic,
    /// version mismatch, stale counts) is logged and treated as a cache
    /// miss, never propagated.
    pub fn load_meshlets_or_build(&mut self, source_path: &Path) {
        self.mesh_source_path = Some(source_path.to_path_buf());
        let path = cache::cache_path(source_path);
        let vertex_count = self.mesh.vertices().len() as u32;
        let triangle_count = self.mesh.triangles().len() as u32;

        match cache::load(&path, vertex_count, triangle_count) {
            Ok(meshlets) => {
                debug!("loaded {} meshlets from {}", meshlets.len(), path.display());
                self.mesh.set_meshlets(meshlets);
            }
            Err(e) => {
                warn!("meshlet cache miss for {} ({e}); regenerating", path.display());
                let meshlets = mesh::generate_meshlets(&self.mesh, self.config.v_max, self.config.t_max);
                if let Err(e) = cache::store(&path, vertex_count, triangle_count, &meshlets) {
                    warn!("failed to write meshlet cache {}: {e}", path.display());
                }
                self.mesh.set_meshlets(meshlets);
            }
        }
    }

    /// Replaces the mesh being rendered, rebuilding (or reloading, via
    /// [`Orchestrator::load_meshlets_or_build`]) its meshlets.
    pub fn set_mesh(&mut self, mesh: Mesh) {
        self.mesh = mesh;
        self.mesh_source_path = None;
        let meshlets = mesh::generate_meshlets(&self.mesh, self.config.v_max, self.config.t_max);
        self.mesh.set_meshlets(meshlets);
    }

    /// Replaces the texture being sampled (`None` to fall back to flat
    /// per-triangle base colors).
    pub fn set_texture(&mut self, texture: Option<Texture>) {
        self.texture = texture;
    }

    /// Renders one frame: transforms and projects the mesh against
    /// `scene`'s camera and light, bins and rasterizes it across the
    /// worker pool, and composites the result into `framebuffer` (a
    /// `screen_width * screen_height` row-major BGRA slab, matching the
    /// tile grid's own dimensions).
    ///
    /// `pump` is polled between completion checks during the busy-wait so
    /// the caller can keep its event loop alive; once it returns `false`
    /// the orchestrator waits for already-submitted jobs to finish (their
    /// tile buffers are about to be reused next frame) and returns
    /// [`RenderError::Interrupted`] without compositing this frame.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Interrupted`] if `pump` returns `false`
    /// before every submitted tile job completes.
    pub fn render_frame(&mut self, scene: &Scene, framebuffer: &mut [u32], mut pump: impl FnMut() -> bool) -> Result<(), RenderError> {
        let frame_start = Instant::now();
        let screen_width = self.grid.width();
        let screen_height = self.grid.height();
        debug_assert_eq!(framebuffer.len(), (screen_width * screen_height) as usize);

        let rotation = scene.camera.rotation();
        let light_dir = rotation.upper3x3_mul_vec3(scene.light.direction()).normalize();
        let light_camera_space = rotation.mul_vec3(scene.light.position()) + V3::new(0.0, 0.0, self.config.mesh_distance);

        let projection = scene.camera.perspective();
        let x_scale = projection.get(0, 0);
        let y_scale = projection.get(1, 1);

        let vertex_count = self.mesh.vertices().len();
        let buffers = self.arena.begin_frame(vertex_count);
        project_vertices(&self.mesh, &rotation, self.config.mesh_distance, self.config.near, x_scale, y_scale, screen_width, screen_height, buffers);

        self.grid.clear_all();

        let triangles = self.mesh.triangles();
        let bins = binning::bin_triangles(&self.grid, triangles.len(), |i| {
            let indices = triangles[i].indices();
            let p = indices.map(|v| buffers.projected[v as usize]);
            if p.iter().any(|&(x, y)| x == -1000 && y == -1000) {
                return None;
            }
            Some(ScreenAabb::from_points(p[0], p[1], p[2]))
        });

        let shared = SharedFrameData {
            mesh: &self.mesh,
            projected: &buffers.projected,
            camera_space: &buffers.camera_space,
            rotation: &rotation,
            texture: self.texture.as_ref(),
            light_dir,
            wireframe: self.wireframe,
        };

        let mut handles = Vec::new();
        for (tile_index, tile) in self.grid.tiles().to_vec().iter().enumerate() {
            let bin = bins.tile_bin(tile_index);
            if bin.is_empty() {
                continue;
            }
            let ptrs = TileJobPtrs::new(*tile, bin, &shared);
            let buffer_ptr: *mut crate::tile::TileBuffer = self.grid.buffer_mut(tile_index);
            // SAFETY: `ptrs` borrows `shared`'s referents (the mesh, this
            // frame's projected/camera-space arrays, the rotation, the
            // texture) which all outlive this function: they're either
            // owned by `self` or a local with `frame_start`'s lifetime,
            // and we busy-wait below until every handle reports complete
            // before `render_frame` returns, so nothing referenced here is
            // mutated or dropped while a job might still be running.
            // `buffer_ptr` points at one tile's buffer, exclusively owned
            // by this one job for the frame (no two tiles' jobs ever touch
            // the same buffer).
            let job = Job::leaf(Box::new(move || unsafe {
                let buffer = &mut *buffer_ptr;
                let ctx = ptrs.context();
                rasterize_tile(&ctx, buffer);
            }));
            match self.jobs.submit(job) {
                Ok(handle) => handles.push(handle),
                Err(e) => warn!("dropping tile {tile_index} this frame: {e}"),
            }
        }

        let interrupted = busy_wait(&handles, &mut pump);
        if interrupted {
            // Let already-running jobs finish before their tile buffers
            // (and this frame's arena slot) are reused next frame.
            while handles.iter().any(|h| !h.is_complete()) {
                thread::yield_now();
            }
            return Err(RenderError::Interrupted);
        }

        composite(&self.grid, framebuffer, screen_width);

        if self.show_tile_borders {
            overlay::draw_tile_borders(framebuffer, screen_width, &self.grid);
        }
        if self.show_light_marker {
            overlay::draw_light_marker(framebuffer, screen_width, screen_height, &self.grid, light_camera_space, self.config.near, x_scale, y_scale);
        }

        self.pacing.throttle(frame_start);
        Ok(())
    }

    /// Records this frame's completion for pacing purposes and returns a
    /// freshly formatted title string once per wall-clock second.
    pub fn record_frame_for_pacing(&mut self, app_name: &str) -> Option<String> {
        self.pacing.record_frame(app_name)
    }

    /// The mesh currently being rendered.
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// The source path the current mesh was loaded from, if any (used to
    /// key the meshlet cache).
    pub fn mesh_source_path(&self) -> Option<&Path> {
        self.mesh_source_path.as_deref()
    }
}

/// `available_parallelism() - 1`, floored at 1: the orchestrator thread
/// itself accounts for the remaining logical core.
fn default_worker_count() -> usize {
    thread::available_parallelism().map(|n| n.get().saturating_sub(1)).unwrap_or(1).max(1)
}

/// Transforms and projects every vertex, writing the `(-1000, -1000)`
/// sentinel for anything at or behind `near`.
///
/// The rotation is applied per vertex (it's a matrix-vector product, not a
/// pairwise slice op), but the translate step that follows it — adding the
/// `mesh_distance` offset to every rotated vertex — is exactly the
/// pairwise-add the batch kernel ([`crate::math::VecKernel`], dispatched via
/// [`active_kernel`]) exists for, so it runs through the kernel rather than
/// a second scalar loop.
#[allow(clippy::too_many_arguments)]
fn project_vertices(
    mesh: &Mesh,
    rotation: &Mat4,
    mesh_distance: f32,
    near: f32,
    x_scale: f32,
    y_scale: f32,
    screen_width: u32,
    screen_height: u32,
    buffers: &mut frame_arena::FrameBuffers,
) {
    let cx = screen_width as f32 / 2.0;
    let cy = screen_height as f32 / 2.0;
    let offset = V3::new(0.0, 0.0, mesh_distance);

    for (i, &v) in mesh.vertices().iter().enumerate() {
        buffers.rotated[i] = rotation.mul_vec3(v);
        buffers.offsets[i] = offset;
    }
    active_kernel().add_slice_v3(&buffers.rotated, &buffers.offsets, &mut buffers.camera_space);

    for i in 0..mesh.vertices().len() {
        let t = buffers.camera_space[i];
        buffers.projected[i] = if t.z <= near {
            (-1000, -1000)
        } else {
            let ndc_x = t.x / t.z * x_scale;
            let ndc_y = t.y / t.z * y_scale;
            let sx = (ndc_x * cx + cx).round() as i32;
            let sy = (-ndc_y * cy + cy).round() as i32;
            (sx, sy)
        };
    }
}

/// Copies every tile's buffer into its rectangle of the screen framebuffer.
fn composite(grid: &TileGrid, framebuffer: &mut [u32], screen_width: u32) {
    for (tile, buffer) in grid.tiles().iter().zip(grid.buffers()) {
        for row in 0..tile.height {
            let dst_start = ((tile.y + row) * screen_width + tile.x) as usize;
            let src_start = (row * tile.width) as usize;
            let width = tile.width as usize;
            framebuffer[dst_start..dst_start + width].copy_from_slice(&buffer.pixels()[src_start..src_start + width]);
        }
    }
}

/// Busy-waits until every handle completes, polling `pump` between checks.
/// Returns `true` if `pump` returned `false` first.
fn busy_wait(handles: &[JobHandle], pump: &mut impl FnMut() -> bool) -> bool {
    loop {
        if handles.iter().all(|h| h.is_complete()) {
            return false;
        }
        if !pump() {
            return true;
        }
        thread::yield_now();
    }
}

/// The read-only frame state every tile job needs, borrowed for the
/// duration of one `render_frame` call.
struct SharedFrameData<'a> {
    mesh: &'a Mesh,
    projected: &'a [(i32, i32)],
    camera_space: &'a [V3],
    rotation: &'a Mat4,
    texture: Option<&'a Texture>,
    light_dir: V3,
    wireframe: bool,
}

/// Raw-pointer view of [`SharedFrameData`], `Copy` so it can be moved into
/// every tile job's `'static`-bound closure without a lifetime the type
/// system can see. See the `# Safety` note at its one construction site in
/// [`Orchestrator::render_frame`].
#[derive(Clone, Copy)]
struct TileJobPtrs {
    tile: crate::tile::Tile,
    bin: *const [u32],
    mesh: *const Mesh,
    projected: *const [(i32, i32)],
    camera_space: *const [V3],
    rotation: *const Mat4,
    texture: *const Texture,
    light_dir: V3,
    wireframe: bool,
}

// SAFETY: every pointer here is read-only for the job's lifetime and the
// orchestrator guarantees (by busy-waiting for every `JobHandle` before
// returning) that the pointed-to data outlives every job that runs.
unsafe impl Send for TileJobPtrs {}

impl TileJobPtrs {
    fn new(tile: crate::tile::Tile, bin: &[u32], shared: &SharedFrameData) -> Self {
        TileJobPtrs {
            tile,
            bin: bin as *const [u32],
            mesh: shared.mesh as *const Mesh,
            projected: shared.projected as *const [(i32, i32)],
            camera_space: shared.camera_space as *const [V3],
            rotation: shared.rotation as *const Mat4,
            texture: shared.texture.map_or(std::ptr::null(), |t| t as *const Texture),
            light_dir: shared.light_dir,
            wireframe: shared.wireframe,
        }
    }

    /// Reconstitutes the borrowed [`TileJobContext`] this job needs. Must
    /// only be called while the invariant documented on [`TileJobPtrs`]
    /// still holds (i.e. from inside the job itself).
    ///
    /// # Safety
    ///
    /// Every pointer must still be valid and not mutably aliased.
    unsafe fn context<'a>(&self) -> TileJobContext<'a> {
        TileJobContext {
            tile: self.tile,
            bin: &*self.bin,
            mesh: &*self.mesh,
            projected: &*self.projected,
            camera_space: &*self.camera_space,
            rotation: &*self.rotation,
            light_dir: self.light_dir,
            wireframe: self.wireframe,
            texture: self.texture.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::V2 as Uv;
    use crate::mesh::Triangle;
    use crate::scene::Scene;

    fn triangle_mesh() -> Mesh {
        let vertices = vec![V3::new(-1.0, -1.0, 0.0), V3::new(0.0, 1.0, 0.0), V3::new(1.0, -1.0, 0.0)];
        let tex_coords = vec![Uv::ZERO; 3];
        let triangles = vec![Triangle::new(0, 1, 2, 0xFFFFFFFF)];
        Mesh::new(vertices, tex_coords, triangles).unwrap()
    }

    #[test]
    fn single_triangle_renders_to_nonblack_pixels() {
        let config = RenderConfig { tile_size: 32, worker_count_override: Some(2), ..RenderConfig::default() };
        let mut orchestrator = Orchestrator::new(config, triangle_mesh(), None, 128, 128);
        let scene = Scene::new(1.0);
        let mut framebuffer = vec![0xFF000000u32; 128 * 128];

        orchestrator.render_frame(&scene, &mut framebuffer, || true).unwrap();

        assert!(framebuffer.iter().any(|&p| p != 0xFF000000), "triangle should have painted some pixels");
    }

    #[test]
    fn interrupted_pump_yields_render_error_without_compositing() {
        let config = RenderConfig { tile_size: 32, worker_count_override: Some(2), ..RenderConfig::default() };
        let mut orchestrator = Orchestrator::new(config, triangle_mesh(), None, 128, 128);
        let scene = Scene::new(1.0);
        let mut framebuffer = vec![0xFF000000u32; 128 * 128];

        let result = orchestrator.render_frame(&scene, &mut framebuffer, || false);
        assert!(matches!(result, Err(RenderError::Interrupted)));
    }

    #[test]
    fn tile_straddling_triangle_composites_the_same_as_a_single_tile() {
        // Same scene rendered once as a 2x1 tile grid and once as a single
        // big tile; a triangle crossing the tile boundary should composite
        // to bit-identical output either way.
        let mesh = triangle_mesh();
        let scene = Scene::new(1.0);

        let multi_tile = RenderConfig { tile_size: 64, worker_count_override: Some(2), ..RenderConfig::default() };
        let mut multi = Orchestrator::new(multi_tile, mesh.clone(), None, 128, 64);
        let mut multi_fb = vec![0xFF000000u32; 128 * 64];
        multi.render_frame(&scene, &mut multi_fb, || true).unwrap();

        let single_tile = RenderConfig { tile_size: 128, worker_count_override: Some(2), ..RenderConfig::default() };
        let mut single = Orchestrator::new(single_tile, mesh, None, 128, 64);
        let mut single_fb = vec![0xFF000000u32; 128 * 64];
        single.render_frame(&scene, &mut single_fb, || true).unwrap();

        assert_eq!(multi_fb, single_fb);
    }

    #[test]
    fn empty_triangle_list_still_clears_every_tile() {
        let vertices = vec![V3::new(0.0, 0.0, 0.0)];
        let tex_coords = vec![Uv::ZERO];
        let mesh = Mesh::new(vertices, tex_coords, Vec::new()).unwrap();
        let config = RenderConfig { tile_size: 32, worker_count_override: Some(1), ..RenderConfig::default() };
        let mut orchestrator = Orchestrator::new(config, mesh, None, 64, 64);
        let scene = Scene::new(1.0);
        let mut framebuffer = vec![0xFFFFFFFFu32; 64 * 64];

        orchestrator.render_frame(&scene, &mut framebuffer, || true).unwrap();
        assert!(framebuffer.iter().all(|&p| p == 0xFF000000));
    }
}
