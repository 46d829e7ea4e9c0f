/// Screen-space bounding rectangle visibility query
use super::backend::TILE_WIDTH;
use super::tile::{MergePolicy, TileGrid, LANE_WIDTH};

/// Pixel bounds of a query: x in subtile units `[x0, x1)`, y in rows `[y0, y1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtileRect {
    pub x0: i32,
    pub x1: i32,
    pub y0: i32,
    pub y1: i32,
}

impl SubtileRect {
    /// Map an NDC rectangle to the subtile-aligned pixel box it touches.
    /// `None` when the rectangle is inverted or lies entirely off screen.
    pub fn from_ndc(p_min: [f32; 2], p_max: [f32; 2], width: usize, height: usize) -> Option<Self> {
        if p_min[0] > p_max[0] || p_min[1] > p_max[1] {
            return None;
        }
        if p_min[0] > 1.0 || p_max[0] < -1.0 || p_min[1] > 1.0 || p_max[1] < -1.0 {
            return None;
        }

        let half_w = width as f32 * 0.5;
        let half_h = height as f32 * 0.5;
        let to_px = |v: f32, limit: usize| (v.round_ties_even() as i32).clamp(0, limit as i32);

        // min corners stay on the last pixel so rects in the final column or row keep a tile
        let px0 = to_px(p_min[0] * half_w + half_w, width - 1);
        let px1 = to_px(p_max[0] * half_w + half_w, width);
        // NDC y points up, pixel rows down
        let py0 = to_px(-p_max[1] * half_h + half_h, height - 1);
        let py1 = to_px(-p_min[1] * half_h + half_h, height);

        let lane = LANE_WIDTH as i32;
        Some(Self {
            x0: px0 & !(lane - 1),
            x1: (px1 + lane) & !(lane - 1),
            y0: py0,
            y1: py1 + 1,
        })
    }

    #[inline]
    fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// Whether anything inside the rectangle could be visible at reciprocal depth `1 / w_min`
pub fn test_rect<P: MergePolicy>(
    grid: &TileGrid,
    p_min: [f32; 2],
    p_max: [f32; 2],
    w_min: f32,
    width: usize,
    height: usize,
) -> bool {
    let Some(rect) = SubtileRect::from_ndc(p_min, p_max, width, height) else {
        return false;
    };

    let tile_w = TILE_WIDTH as i32;
    let tile_h = grid.rows_per_tile() as i32;
    let tx_lo = rect.x0 / tile_w;
    let tx_hi = ((rect.x1 + tile_w - 1) / tile_w).min(grid.tiles_x() as i32);
    let ty_lo = rect.y0 / tile_h;
    let ty_hi = ((rect.y1 + tile_h - 1) / tile_h).min(grid.tiles_y() as i32);
    if tx_lo >= tx_hi || ty_lo >= ty_hi {
        return false;
    }

    let z_max = 1.0 / w_min;

    for ty in ty_lo..ty_hi {
        for tx in tx_lo..tx_hi {
            let records = grid.tile(tx as usize, ty as usize);
            for (r, record) in records.iter().enumerate() {
                let y = ty * tile_h + r as i32;
                let reference = P::reference_depth(record);
                for (j, &z_ref) in reference.iter().enumerate() {
                    let px = tx * tile_w + (j * LANE_WIDTH) as i32;
                    if rect.contains(px, y) && z_max >= z_ref {
                        return true;
                    }
                }
            }
        }
    }

    false
}
