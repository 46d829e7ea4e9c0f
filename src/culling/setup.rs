/// Per-triangle setup: projection, bounding box, depth plane and fixed-point edge events
///
/// Screen coordinates are integers stored in f32 (x rounded up, y rounded down), y grows
/// downward and z is reciprocal W. Edges are tracked as 16.16 fixed-point x positions
/// relative to the left of the tile-snapped bounding box, advanced one slope per pixel row.
use glam::{Vec3, Vec4};

use super::backend::TILE_WIDTH;
use super::surface::SurfaceKind;
use super::tile::{LANES, LANE_WIDTH};

pub const FP_BITS: u32 = 16;

/// Extra slope (in pixels) given to horizontal edges so they never cover anything
const HORIZONTAL_SLOPE_PAD: f32 = 4.0;

/// Perspective divide and snap to integer screen coordinates
#[inline]
pub fn project(v: Vec4, half_w: f32, half_h: f32) -> Vec3 {
    let rcp_w = 1.0 / v.z;
    Vec3::new(
        (v.x * half_w * rcp_w + half_w).ceil(),
        (v.y * -half_h * rcp_w + half_h).floor(),
        rcp_w,
    )
}

/// Twice the signed screen area; positive for front-facing triangles
#[inline]
pub fn signed_area(tri: &[Vec3; 3]) -> f32 {
    let area1 = (tri[1].x - tri[0].x) * (tri[2].y - tri[0].y);
    let area2 = (tri[0].x - tri[2].x) * (tri[0].y - tri[1].y);
    area1 - area2
}

/// Depth gradient `(dz/dx, dz/dy)` of the plane through three screen vertices
#[inline]
pub fn depth_plane(v0: Vec3, v1: Vec3, v2: Vec3) -> (f32, f32) {
    let x10 = v1.x - v0.x;
    let x20 = v2.x - v0.x;
    let y10 = v1.y - v0.y;
    let y20 = v2.y - v0.y;
    let z10 = v1.z - v0.z;
    let z20 = v2.z - v0.z;
    let d = 1.0 / (x10 * y20 - y10 * x20);

    ((z10 * y20 - y10 * z20) * d, (x10 * z20 - z10 * x20) * d)
}

/// Edge bookkeeping after the vertices are rotated so v0 is the topmost row (smallest y).
///
/// Edge 0 runs v0->v1, edge 1 v1->v2 and edge 2 v0->v2 (the long edge).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeEvents {
    /// Fixed-point x of edges 0 and 2 at `row_lo`, of edge 1 at `mid_row`
    pub start: [i32; 3],
    /// Fixed-point x step per pixel row
    pub slope: [i32; 3],
    pub mid_row: i32,
    /// Middle vertex lies right of the long edge
    pub mid_right: bool,
    pub flat_bottom: bool,
}

/// Everything the tile walk needs for one projected triangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleSetup {
    /// Bounding box columns, multiples of the tile width
    pub bb_x0: i32,
    pub bb_x1: i32,
    /// Pixel rows `[row_lo, row_hi)`
    pub row_lo: i32,
    pub row_hi: i32,
    pub z_min: f32,
    pub z_max: f32,
    pub z_dx: f32,
    pub z_dy: f32,
    /// Biased plane depth at `(bb_x0, plane_y)`
    pub z_origin: f32,
    pub plane_y: f32,
    pub events: EdgeEvents,
}

impl TriangleSetup {
    /// Build the setup for a front-facing projected triangle inside a `width` x `height`
    /// frame. Returns `None` when the bounding box is empty after clamping.
    pub fn new(tri: [Vec3; 3], width: i32, height: i32, kind: SurfaceKind) -> Option<Self> {
        let [mut v0, mut v1, mut v2] = tri;

        let min_x = v0.x.min(v1.x).min(v2.x) as i32;
        let max_x = v0.x.max(v1.x).max(v2.x) as i32;
        let min_y = v0.y.min(v1.y).min(v2.y) as i32;
        let max_y = v0.y.max(v1.y).max(v2.y) as i32;

        let tile_mask = !(TILE_WIDTH as i32 - 1);
        let bb_x0 = (min_x & tile_mask).max(0);
        let bb_x1 = (max_x.saturating_add(TILE_WIDTH as i32 - 1) & tile_mask).min(width);
        let row_lo = min_y.clamp(0, height);
        let row_hi = max_y.clamp(0, height);

        if bb_x0 >= bb_x1 || row_lo >= row_hi {
            return None;
        }

        let (z_dx, z_dy) = depth_plane(v0, v1, v2);

        // push the plane one subtile toward the safe side: occluders away from the
        // camera, occludees toward it
        let bias = match kind {
            SurfaceKind::Occluder => (z_dx * LANE_WIDTH as f32).min(0.0) + z_dy.min(0.0),
            SurfaceKind::Occludee => (z_dx * LANE_WIDTH as f32).max(0.0) + z_dy.max(0.0),
        };
        let z_origin = v0.z + z_dx * (bb_x0 as f32 - v0.x) + bias;
        let plane_y = v0.y;

        let z_min = v0.z.min(v1.z).min(v2.z);
        let z_max = v0.z.max(v1.z).max(v2.z);

        for _ in 0..2 {
            let ey1 = v1.y - v0.y;
            let ey2 = v2.y - v0.y;
            if ey1 < 0.0 || ey2 <= 0.0 {
                (v0, v1, v2) = (v1, v2, v0);
            }
        }

        let events = EdgeEvents::new(v0, v1, v2, bb_x0, row_lo, row_hi, width);

        Some(Self {
            bb_x0,
            bb_x1,
            row_lo,
            row_hi,
            z_min,
            z_max,
            z_dx,
            z_dy,
            z_origin,
            plane_y,
            events,
        })
    }

    /// Plane depth at the bounding box's left column on pixel row `y`
    #[inline]
    pub fn row_z(&self, y: i32) -> f32 {
        self.z_origin + self.z_dy * (y as f32 - self.plane_y)
    }

    /// Depth offset of each lane of the tile starting at column `tile_x0`
    #[inline]
    pub fn lane_z(&self, tile_x0: i32) -> [f32; LANES] {
        let rel = tile_x0 - self.bb_x0;
        let mut out = [0f32; LANES];
        for (j, z) in out.iter_mut().enumerate() {
            *z = self.z_dx * (rel + (j * LANE_WIDTH) as i32) as f32;
        }
        out
    }

    /// Covered pixel columns `[left, right)` of row `y` (inside `[row_lo, row_hi)`)
    #[inline]
    pub fn row_span(&self, y: i32) -> (i32, i32) {
        let (left, right) = self.events.row_events(y, self.row_lo);
        ((left >> FP_BITS) + self.bb_x0, (right >> FP_BITS) + self.bb_x0)
    }
}

impl EdgeEvents {
    fn new(v0: Vec3, v1: Vec3, v2: Vec3, bb_x0: i32, row_lo: i32, row_hi: i32, width: i32) -> Self {
        let e0 = v1 - v0;
        let e1 = v2 - v1;
        let e2 = v2 - v0;

        let mid_right = e1.y >= 0.0;
        let mid = if mid_right { v1 } else { v2 };

        let horizontal_slope = width as f32 + HORIZONTAL_SLOPE_PAD;
        let mut slope = [e0.x / e0.y, e1.x / e1.y, e2.x / e2.y];
        if e0.y == 0.0 {
            slope[0] = horizontal_slope;
        }
        if e1.y == 0.0 {
            slope[1] = -horizontal_slope;
        }

        let one = (1 << FP_BITS) as f32;
        let mut slope_fp = slope.map(|s| (s * one) as i32);
        // avoid cracks between adjacent triangles
        slope_fp[0] = slope_fp[0].wrapping_add(1);
        if mid_right {
            slope_fp[1] = slope_fp[1].wrapping_add(1);
        }

        let mid_row = (mid.y as i32).max(0).clamp(row_lo, row_hi);

        let v0_x = (v0.x as i32 - bb_x0).wrapping_shl(FP_BITS);
        let v0_dy = v0.y as i32 - row_lo;
        let mid_x = (mid.x as i32 - bb_x0).wrapping_shl(FP_BITS);
        let mid_dy = mid.y as i32 - mid_row;

        let start = [
            v0_x.wrapping_sub(slope_fp[0].wrapping_mul(v0_dy)),
            mid_x.wrapping_sub(slope_fp[1].wrapping_mul(mid_dy)),
            v0_x.wrapping_sub(slope_fp[2].wrapping_mul(v0_dy)),
        ];

        Self {
            start,
            slope: slope_fp,
            mid_row,
            mid_right,
            flat_bottom: row_lo as f32 == mid.y,
        }
    }

    #[inline]
    fn edge_at(&self, edge: usize, rows: i32) -> i32 {
        self.start[edge].wrapping_add(self.slope[edge].wrapping_mul(rows))
    }

    /// Fixed-point `(left, right)` on row `y`
    #[inline]
    pub fn row_events(&self, y: i32, row_lo: i32) -> (i32, i32) {
        let long = self.edge_at(2, y - row_lo);
        let first = self.edge_at(0, y - row_lo);

        if !self.flat_bottom && y < self.mid_row {
            return (long, first);
        }

        let second = self.edge_at(1, y - self.mid_row);
        if !self.flat_bottom && y == self.mid_row {
            // all three edges touch the middle row
            return if self.mid_right {
                (long, first.min(second))
            } else {
                (long.max(second), first)
            };
        }

        if self.mid_right {
            (long, second)
        } else {
            (second, first)
        }
    }
}
