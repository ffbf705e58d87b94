use crate::math::{Mat4, V2, V3};
use crate::mesh::Mesh;
use crate::resources::texture::Texture;
use crate::tile::{Tile, TileBuffer};

use super::shader::{backface_cull, pack_color, shade};

const WIRE_COLOR: u32 = 0xFFFFFFFF;

/// Everything one tile-rasterization job needs, borrowed read-only from the
/// frame's shared per-frame state. The tile buffer itself is passed
/// separately since it's the one piece of state the job mutates
/// exclusively.
pub struct TileJobContext<'a> {
    /// Placement/extent of the tile this job owns for the frame.
    pub tile: Tile,
    /// Indices into `mesh.triangles()`, in mesh order, that overlap this
    /// tile (per the binning stage).
    pub bin: &'a [u32],
    /// The mesh being rendered.
    pub mesh: &'a Mesh,
    /// Per-vertex projected screen coordinates, parallel to
    /// `mesh.vertices()`. `(-1000, -1000)` marks a vertex behind the near
    /// plane.
    pub projected: &'a [(i32, i32)],
    /// Per-vertex camera-space positions, parallel to `mesh.vertices()`.
    pub camera_space: &'a [V3],
    /// The frame's camera rotation, used to transform face normals into
    /// camera space (via its upper-3x3).
    pub rotation: &'a Mat4,
    /// Unit-length direction toward the light, in camera space.
    pub light_dir: V3,
    /// Whether to overlay wireframe edges after the fill pass.
    pub wireframe: bool,
    /// Texture to sample for base color, if the mesh is textured.
    pub texture: Option<&'a Texture>,
}

/// Runs the fill (and optional wireframe) pass for one tile's bin list
/// against its private buffer. This is the function a tile's job body
/// calls; it touches no state but `buffer` and `ctx`'s read-only borrows.
pub fn rasterize_tile(ctx: &TileJobContext, buffer: &mut TileBuffer) {
    for &tri_index in ctx.bin {
        let triangle = &ctx.mesh.triangles()[tri_index as usize];
        if triangle.cull_fill && triangle.cull_wire {
            continue;
        }

        let indices = triangle.indices();
        let p = indices.map(|i| ctx.projected[i as usize]);
        if p.iter().any(|&(x, y)| x == -1000 && y == -1000) {
            continue; // one or more vertices behind the near plane
        }
        let c = indices.map(|i| ctx.camera_space[i as usize]);

        let face_normal = ctx.mesh.face_normals()[tri_index as usize];
        let normal = ctx.rotation.upper3x3_mul_vec3(face_normal).normalize();
        let center = (c[0] + c[1] + c[2]) * (1.0 / 3.0);
        if backface_cull(normal, center) {
            continue;
        }

        if !triangle.cull_fill {
            fill_triangle(ctx, buffer, triangle.base_color, normal, p, c, indices);
        }
        if ctx.wireframe && !triangle.cull_wire {
            draw_wireframe(ctx, buffer, p);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn fill_triangle(
    ctx: &TileJobContext,
    buffer: &mut TileBuffer,
    base_color: u32,
    normal: V3,
    p: [(i32, i32); 3],
    c: [V3; 3],
    indices: [u32; 3],
) {
    let tile = &ctx.tile;
    let local: Vec<(f32, f32)> = p.iter().map(|&(x, y)| ((x - tile.x as i32) as f32, (y - tile.y as i32) as f32)).collect();
    let (v0x, v0y) = local[0];
    let (v1x, v1y) = local[1];
    let (v2x, v2y) = local[2];

    let denom = (v1y - v2y) * (v0x - v2x) + (v2x - v1x) * (v0y - v2y);
    if denom.abs() < 1e-6 {
        return;
    }

    let min_x = local.iter().map(|p| p.0).fold(f32::INFINITY, f32::min).floor().max(0.0) as i32;
    let max_x = local.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max).ceil().min(tile.width as f32 - 1.0) as i32;
    let min_y = local.iter().map(|p| p.1).fold(f32::INFINITY, f32::min).floor().max(0.0) as i32;
    let max_y = local.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max).ceil().min(tile.height as f32 - 1.0) as i32;
    if min_x > max_x || min_y > max_y {
        return;
    }

    let uvs = indices.map(|i| ctx.mesh.tex_coords()[i as usize]);
    let light_dir = ctx.light_dir;

    for y in min_y..=max_y {
        let py = y as f32 + 0.5;
        for x in min_x..=max_x {
            let px = x as f32 + 0.5;
            let l0 = ((v1y - v2y) * (px - v2x) + (v2x - v1x) * (py - v2y)) / denom;
            let l1 = ((v2y - v0y) * (px - v2x) + (v0x - v2x) * (py - v2y)) / denom;
            let l2 = 1.0 - l0 - l1;
            if l0 < 0.0 || l1 < 0.0 || l2 < 0.0 {
                continue;
            }

            let depth = l0 * c[0].z + l1 * c[1].z + l2 * c[2].z;
            let idx = buffer.index(x as u32, y as u32);
            if depth < buffer.depth()[idx] {
                let color = if let Some(texture) = ctx.texture {
                    let uv = uvs[0] * l0 + uvs[1] * l1 + uvs[2] * l2;
                    let texel = texture.sample(uv.x, uv.y);
                    shade_texel(normal, light_dir, texel)
                } else {
                    shade(normal, light_dir, base_color)
                };
                buffer.pixels_mut()[idx] = color;
                buffer.depth_mut()[idx] = depth;
            }
        }
    }
}

/// Applies the same lighting formula as [`shade`] but to a sampled texel
/// instead of a flat base color.
fn shade_texel(normal: V3, light_dir: V3, texel: u32) -> u32 {
    shade(normal, light_dir, texel)
}

fn draw_wireframe(ctx: &TileJobContext, buffer: &mut TileBuffer, p: [(i32, i32); 3]) {
    let tile = &ctx.tile;
    let local: Vec<(i32, i32)> = p.iter().map(|&(x, y)| (x - tile.x as i32, y - tile.y as i32)).collect();
    let edges = [(local[0], local[1]), (local[1], local[2]), (local[2], local[0])];
    for (a, b) in edges {
        bresenham_line(buffer, a, b);
    }
}

/// Bresenham's line algorithm in tile-local integer space. Bypasses the
/// depth test (a documented quirk: wireframe always wins over whatever the
/// fill pass wrote).
fn bresenham_line(buffer: &mut TileBuffer, (x0, y0): (i32, i32), (x1, y1): (i32, i32)) {
    let width = buffer.width() as i32;
    let height = buffer.height() as i32;

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);

    loop {
        if x >= 0 && x < width && y >= 0 && y < height {
            let idx = buffer.index(x as u32, y as u32);
            buffer.pixels_mut()[idx] = WIRE_COLOR;
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::V2 as Uv;
    use crate::mesh::Triangle;

    /// A triangle at camera-space depth `z` (positive = in front of the
    /// camera, per the orchestrator's `t.z > 0.1` near-plane convention),
    /// wound so its front face points back toward the camera.
    fn single_triangle_mesh_at(z: f32, base_color: u32) -> Mesh {
        let vertices = vec![V3::new(-1.0, -1.0, z), V3::new(0.0, 1.0, z), V3::new(1.0, -1.0, z)];
        let tex_coords = vec![Uv::ZERO; 3];
        let triangles = vec![Triangle::new(0, 1, 2, base_color)];
        Mesh::new(vertices, tex_coords, triangles).unwrap()
    }

    fn single_triangle_mesh(base_color: u32) -> Mesh {
        single_triangle_mesh_at(2.0, base_color)
    }

    /// Projected screen coordinates matching `single_triangle_mesh`'s vertex
    /// order (bottom-left, top, bottom-right), generously spread across a
    /// 32x32 tile so the centroid pixel is unambiguously inside.
    fn sample_projection() -> Vec<(i32, i32)> {
        vec![(4, 28), (16, 4), (28, 28)]
    }

    #[test]
    fn known_pixel_is_filled_with_correct_depth() {
        let mesh = single_triangle_mesh(0xFFFFFFFF);
        let tile = Tile { col: 0, row: 0, x: 0, y: 0, width: 32, height: 32 };
        let mut buffer = TileBuffer::new(32, 32);
        let rotation = Mat4::IDENTITY;
        let projected = sample_projection();
        let camera_space = mesh.vertices().to_vec();

        let ctx = TileJobContext {
            tile,
            bin: &[0],
            mesh: &mesh,
            projected: &projected,
            camera_space: &camera_space,
            rotation: &rotation,
            light_dir: V3::new(0.0, 0.0, 1.0),
            wireframe: false,
            texture: None,
        };
        rasterize_tile(&ctx, &mut buffer);

        let idx = buffer.index(16, 20);
        assert_ne!(buffer.pixels()[idx], 0xFF000000, "centroid pixel should have been filled");
        assert!(buffer.depth()[idx] < f32::INFINITY);
    }

    #[test]
    fn vertex_behind_near_plane_sentinel_skips_triangle() {
        let mesh = single_triangle_mesh(0xFFFFFFFF);
        let tile = Tile { col: 0, row: 0, x: 0, y: 0, width: 32, height: 32 };
        let mut buffer = TileBuffer::new(32, 32);
        let rotation = Mat4::IDENTITY;
        let mut projected = sample_projection();
        projected[0] = (-1000, -1000);
        let camera_space = mesh.vertices().to_vec();

        let ctx = TileJobContext {
            tile,
            bin: &[0],
            mesh: &mesh,
            projected: &projected,
            camera_space: &camera_space,
            rotation: &rotation,
            light_dir: V3::new(0.0, 0.0, 1.0),
            wireframe: false,
            texture: None,
        };
        rasterize_tile(&ctx, &mut buffer);
        assert!(buffer.pixels().iter().all(|&p| p == 0xFF000000));
    }

    #[test]
    fn cull_fill_flag_skips_the_fill_pass() {
        let mut mesh = single_triangle_mesh(0xFFFFFFFF);
        // Rebuild with cull_fill set, since Triangle::new doesn't expose it.
        let triangles = vec![Triangle { cull_fill: true, ..mesh.triangles()[0] }];
        mesh = Mesh::new(mesh.vertices().to_vec(), mesh.tex_coords().to_vec(), triangles).unwrap();

        let tile = Tile { col: 0, row: 0, x: 0, y: 0, width: 32, height: 32 };
        let mut buffer = TileBuffer::new(32, 32);
        let rotation = Mat4::IDENTITY;
        let projected = sample_projection();
        let camera_space = mesh.vertices().to_vec();

        let ctx = TileJobContext {
            tile,
            bin: &[0],
            mesh: &mesh,
            projected: &projected,
            camera_space: &camera_space,
            rotation: &rotation,
            light_dir: V3::new(0.0, 0.0, 1.0),
            wireframe: false,
            texture: None,
        };
        rasterize_tile(&ctx, &mut buffer);
        assert!(buffer.pixels().iter().all(|&p| p == 0xFF000000));
    }

    #[test]
    fn nearer_triangle_wins_depth_test_regardless_of_bin_order() {
        let far = single_triangle_mesh_at(5.0, 0xFFFF0000);
        let near = single_triangle_mesh_at(2.0, 0xFF0000FF);
        let mut vertices = far.vertices().to_vec();
        vertices.extend_from_slice(near.vertices());
        let tex_coords = vec![Uv::ZERO; 6];
        // Far triangle (red) listed first, near triangle (blue) second;
        // depth test must still make near win despite draw order.
        let triangles = vec![Triangle::new(0, 1, 2, 0xFFFF0000), Triangle::new(3, 4, 5, 0xFF0000FF)];
        let mesh = Mesh::new(vertices, tex_coords, triangles).unwrap();

        let tile = Tile { col: 0, row: 0, x: 0, y: 0, width: 32, height: 32 };
        let mut buffer = TileBuffer::new(32, 32);
        let rotation = Mat4::IDENTITY;
        let mut projected = sample_projection();
        projected.extend(sample_projection());
        let camera_space = mesh.vertices().to_vec();

        let ctx = TileJobContext {
            tile,
            bin: &[0, 1],
            mesh: &mesh,
            projected: &projected,
            camera_space: &camera_space,
            rotation: &rotation,
            light_dir: V3::new(0.0, 0.0, 1.0),
            wireframe: false,
            texture: None,
        };
        rasterize_tile(&ctx, &mut buffer);

        let idx = buffer.index(16, 20);
        // Blue channel should dominate (near triangle), not red (far one).
        assert_eq!(buffer.pixels()[idx] & 0x0000FF00, 0); // no green
        assert!(buffer.pixels()[idx] & 0x000000FF > buffer.pixels()[idx] >> 16 & 0xFF);
    }
}
