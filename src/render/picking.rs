use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::game::grid::Grid;

/// Screen pixel to normalized device coordinates (y up).
pub fn screen_to_ndc(sx: f64, sy: f64, width: f32, height: f32) -> Vec2 {
    Vec2::new(
        2.0 * (sx as f32 / width) - 1.0,
        1.0 - 2.0 * (sy as f32 / height),
    )
}

/// Where the ray through `ndc` meets the y = 0 ground plane, if it does so
/// in front of the camera.
pub fn ground_hit(inv_view_proj: &Mat4, ndc: Vec2) -> Option<Vec3> {
    let near = *inv_view_proj * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
    let far = *inv_view_proj * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
    if near.w.abs() < 1e-8 || far.w.abs() < 1e-8 {
        return None;
    }
    let near = near.truncate() / near.w;
    let far = far.truncate() / far.w;

    let dir = far - near;
    if dir.y.abs() < 1e-8 {
        return None;
    }
    let t = -near.y / dir.y;
    if t < 0.0 {
        return None;
    }
    Some(near + dir * t)
}

/// Grid cell under the cursor, or `None` when the ray misses the board.
pub fn pick_cell(inv_view_proj: &Mat4, ndc: Vec2, cell_size: f32) -> Option<(i32, i32)> {
    let hit = ground_hit(inv_view_proj, ndc)?;
    Grid::cell_at(hit.x, hit.z, cell_size)
}
