use crate::math::V3;
use crate::tile::TileGrid;

/// Tile border overlay color: opaque green.
const BORDER_COLOR: u32 = 0xFF00FF00;
/// Light marker overlay color: opaque cyan.
const MARKER_COLOR: u32 = 0xFF00FFFF;
/// Light marker radius, in screen pixels.
const MARKER_RADIUS: i32 = 4;

#[inline]
fn set_pixel(framebuffer: &mut [u32], stride: u32, x: u32, y: u32, color: u32) {
    let idx = (y * stride + x) as usize;
    if idx < framebuffer.len() {
        framebuffer[idx] = color;
    }
}

/// Draws a one-pixel border around every tile directly into the
/// already-composited framebuffer. Purely a debug aid; has no effect on
/// any tile's own buffer or depth state.
pub fn draw_tile_borders(framebuffer: &mut [u32], screen_width: u32, grid: &TileGrid) {
    for tile in grid.tiles() {
        let right = tile.x + tile.width - 1;
        let bottom = tile.y + tile.height - 1;
        for x in tile.x..=right {
            set_pixel(framebuffer, screen_width, x, tile.y, BORDER_COLOR);
            set_pixel(framebuffer, screen_width, x, bottom, BORDER_COLOR);
        }
        for y in tile.y..=bottom {
            set_pixel(framebuffer, screen_width, tile.x, y, BORDER_COLOR);
            set_pixel(framebuffer, screen_width, right, y, BORDER_COLOR);
        }
    }
}

/// Draws a small filled circle at the light's projected screen position,
/// skipped entirely if the light is behind the near plane, off-screen, or
/// occluded by already-rasterized geometry nearer than it in the same
/// tile.
#[allow(clippy::too_many_arguments)]
pub fn draw_light_marker(
    framebuffer: &mut [u32],
    screen_width: u32,
    screen_height: u32,
    grid: &TileGrid,
    light_camera_space: V3,
    near: f32,
    x_scale: f32,
    y_scale: f32,
) {
    if light_camera_space.z <= near {
        return;
    }

    let cx = screen_width as f32 / 2.0;
    let cy = screen_height as f32 / 2.0;
    let ndc_x = light_camera_space.x / light_camera_space.z * x_scale;
    let ndc_y = light_camera_space.y / light_camera_space.z * y_scale;
    let sx = (ndc_x * cx + cx).round() as i32;
    let sy = (-ndc_y * cy + cy).round() as i32;
    if sx < 0 || sy < 0 || sx >= screen_width as i32 || sy >= screen_height as i32 {
        return;
    }

    if is_occluded(grid, sx as u32, sy as u32, light_camera_space.z) {
        return;
    }

    for dy in -MARKER_RADIUS..=MARKER_RADIUS {
        for dx in -MARKER_RADIUS..=MARKER_RADIUS {
            if dx * dx + dy * dy > MARKER_RADIUS * MARKER_RADIUS {
                continue;
            }
            let px = sx + dx;
            let py = sy + dy;
            if px >= 0 && py >= 0 && px < screen_width as i32 && py < screen_height as i32 {
                set_pixel(framebuffer, screen_width, px as u32, py as u32, MARKER_COLOR);
            }
        }
    }
}

/// Whether the tile owning screen pixel `(x, y)` already holds geometry
/// nearer than `depth`.
fn is_occluded(grid: &TileGrid, x: u32, y: u32, depth: f32) -> bool {
    let tile_size = grid.tile_size().max(1);
    let col = (x / tile_size).min(grid.cols().saturating_sub(1));
    let row = (y / tile_size).min(grid.rows().saturating_sub(1));
    let tile_index = grid.tile_index(col, row);
    let tile = grid.tiles()[tile_index];
    let local_x = x.saturating_sub(tile.x).min(tile.width.saturating_sub(1));
    let local_y = y.saturating_sub(tile.y).min(tile.height.saturating_sub(1));
    let buffer = &grid.buffers()[tile_index];
    let idx = buffer.index(local_x, local_y);
    depth >= buffer.depth()[idx]
}
