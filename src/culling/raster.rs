/// Tile walk for one set-up triangle: occluder writes and occludee queries
///
/// Tiles are visited one tile row at a time. The per-row spans of a tile row are gathered
/// into a `RowEvents` block so the backend can compute coverage and lane depths for all
/// `TILE_H` rows at once; merging and comparison are shared scalar code.
use std::ops::ControlFlow;

use super::backend::{Backend, RowEvents, MAX_TILE_ROWS, TILE_WIDTH};
use super::setup::TriangleSetup;
use super::tile::{lane_bits, MergePolicy, TileGrid, LANES};
use crate::perf::CullCounters;
use crate::count;

/// Bounding boxes at most this many tiles wide or tall walk every tile in the box
const TIGHT_TRAVERSAL_MIN_TILES: i32 = 3;

/// Per-tile kernel output handed to the visitor
struct TileBlock<'a> {
    tx: usize,
    ty: usize,
    coverage: &'a [u32; MAX_TILE_ROWS],
    depths: &'a [[f32; MAX_TILE_ROWS]; LANES],
}

/// Visit every tile the triangle may touch, stopping early when the visitor breaks
fn walk_tiles<B, F>(backend: &B, tri: &TriangleSetup, mut visit: F) -> ControlFlow<()>
where
    B: Backend,
    F: FnMut(TileBlock<'_>) -> ControlFlow<()>,
{
    let tile_h = B::TILE_H as i32;
    let tile_w = TILE_WIDTH as i32;

    let col_lo = tri.bb_x0 / tile_w;
    let col_hi = tri.bb_x1 / tile_w;
    let ty_lo = tri.row_lo / tile_h;
    let ty_hi = (tri.row_hi + tile_h - 1) / tile_h;
    let tight = col_hi - col_lo > TIGHT_TRAVERSAL_MIN_TILES && ty_hi - ty_lo > TIGHT_TRAVERSAL_MIN_TILES;

    let mut events = RowEvents::empty();
    let mut row_z = [0f32; MAX_TILE_ROWS];
    let mut coverage = [0u32; MAX_TILE_ROWS];
    let mut depths = [[0f32; MAX_TILE_ROWS]; LANES];

    for ty in ty_lo..ty_hi {
        let y0 = ty * tile_h;
        let mut span_lo = i32::MAX;
        let mut span_hi = i32::MIN;

        for r in 0..B::TILE_H {
            let y = y0 + r as i32;
            if y < tri.row_lo || y >= tri.row_hi {
                events.left[r] = 0;
                events.right[r] = 0;
                row_z[r] = 0.0;
                continue;
            }

            let (left, right) = tri.row_span(y);
            events.left[r] = left;
            events.right[r] = right;
            row_z[r] = tri.row_z(y);

            if left < right {
                span_lo = span_lo.min(left.div_euclid(tile_w));
                span_hi = span_hi.max((right + tile_w - 1).div_euclid(tile_w));
            }
        }

        let (tx_lo, tx_hi) = if tight {
            if span_lo >= span_hi {
                continue;
            }
            (span_lo.max(col_lo), span_hi.min(col_hi))
        } else {
            (col_lo, col_hi)
        };

        for tx in tx_lo..tx_hi {
            let tile_x0 = tx * tile_w;
            backend.coverage(&events, tile_x0, &mut coverage);
            backend.lane_depths(&row_z, &tri.lane_z(tile_x0), &mut depths);

            visit(TileBlock {
                tx: tx as usize,
                ty: ty as usize,
                coverage: &coverage,
                depths: &depths,
            })?;
        }
    }

    ControlFlow::Continue(())
}

/// Merge an occluder triangle into the tiles it covers
pub fn write_occluder<B: Backend, P: MergePolicy>(
    backend: &B,
    grid: &mut TileGrid,
    tri: &TriangleSetup,
    counters: &mut CullCounters,
) {
    let _ = walk_tiles(backend, tri, |block| {
        let records = grid.tile_mut(block.tx, block.ty);

        for (r, record) in records.iter_mut().enumerate() {
            let coverage = block.coverage[r];
            if coverage == 0 {
                continue;
            }
            count!(counters.records_visited);

            let reference = P::reference_depth(record);
            if reference.iter().all(|&z_ref| tri.z_max < z_ref) {
                count!(counters.records_depth_rejected);
                continue;
            }

            let mut z = [0f32; LANES];
            for (j, z) in z.iter_mut().enumerate() {
                *z = block.depths[j][r].max(tri.z_min);
            }
            P::update(record, coverage, &z);
            count!(counters.records_updated);
        }

        ControlFlow::Continue(())
    });
}

/// Whether any covered pixel of an occludee triangle is at least as near as the stored
/// reference depth. Stops at the first passing lane.
pub fn query_occludee<B: Backend, P: MergePolicy>(
    backend: &B,
    grid: &TileGrid,
    tri: &TriangleSetup,
    counters: &mut CullCounters,
) -> bool {
    let flow = walk_tiles(backend, tri, |block| {
        let records = grid.tile(block.tx, block.ty);

        for (r, record) in records.iter().enumerate() {
            let coverage = block.coverage[r];
            if coverage == 0 {
                continue;
            }
            count!(counters.records_visited);

            let reference = P::reference_depth(record);
            if reference.iter().all(|&z_ref| tri.z_max < z_ref) {
                count!(counters.records_depth_rejected);
                continue;
            }

            let passes = (0..LANES).any(|j| {
                coverage & lane_bits(j) != 0 && block.depths[j][r].min(tri.z_max) >= reference[j]
            });
            if passes {
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    });

    flow.is_break()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culling::backend::{CpuFeatures, Scalar};
    use crate::culling::surface::SurfaceKind;
    use crate::culling::tile::{AccurateMerge, QuickMerge, Tile};
    use glam::Vec3;

    const W: usize = 128;
    const H: usize = 64;

    fn grid<P: MergePolicy>() -> TileGrid {
        TileGrid::new(W / TILE_WIDTH, H, 1, Tile::cleared(-1.0, P::LAYER1_CLEAR))
    }

    fn backend() -> Scalar {
        Scalar::probe(&CpuFeatures::scalar_only()).expect("scalar always probes")
    }

    fn full_screen(z: f32, kind: SurfaceKind) -> [TriangleSetup; 2] {
        let (w, h) = (W as f32, H as f32);
        let a = [Vec3::new(0.0, 0.0, z), Vec3::new(w, 0.0, z), Vec3::new(0.0, h, z)];
        let b = [Vec3::new(w, 0.0, z), Vec3::new(w, h, z), Vec3::new(0.0, h, z)];
        [a, b].map(|t| TriangleSetup::new(t, W as i32, H as i32, kind).expect("on screen"))
    }

    fn small(z: f32) -> TriangleSetup {
        let tri = [Vec3::new(40.0, 20.0, z), Vec3::new(60.0, 20.0, z), Vec3::new(40.0, 40.0, z)];
        TriangleSetup::new(tri, W as i32, H as i32, SurfaceKind::Occludee).expect("on screen")
    }

    fn dump(grid: &TileGrid) -> Vec<f32> {
        let mut out = Vec::with_capacity(W * H);
        for y in 0..H {
            for x in 0..W {
                out.push(grid.record_at(x / TILE_WIDTH, y).pixel_depth(x % TILE_WIDTH));
            }
        }
        out
    }

    fn check_full_screen<P: MergePolicy>() {
        let b = backend();
        let mut grid = grid::<P>();
        let mut counters = CullCounters::new();

        for tri in full_screen(2.0, SurfaceKind::Occluder) {
            write_occluder::<_, P>(&b, &mut grid, &tri, &mut counters);
        }
        assert!(dump(&grid).iter().all(|&z| z == 2.0), "{}: full-screen quad fills every pixel", P::NAME);

        assert!(!query_occludee::<_, P>(&b, &grid, &small(1.5), &mut counters), "{}: farther is hidden", P::NAME);
        assert!(query_occludee::<_, P>(&b, &grid, &small(3.0), &mut counters), "{}: nearer is visible", P::NAME);
    }

    #[test]
    fn test_full_screen_quick() {
        check_full_screen::<QuickMerge>();
    }

    #[test]
    fn test_full_screen_accurate() {
        check_full_screen::<AccurateMerge>();
    }

    #[test]
    fn test_occludee_never_writes() {
        let b = backend();
        let mut grid = grid::<QuickMerge>();
        let before = grid.records().to_vec();
        let mut counters = CullCounters::new();

        assert!(query_occludee::<_, QuickMerge>(&b, &grid, &small(1.0), &mut counters));
        assert_eq!(grid.records(), &before[..]);

        write_occluder::<_, QuickMerge>(&b, &mut grid, &small(1.0), &mut counters);
        assert_ne!(grid.records(), &before[..]);
    }

    #[test]
    fn test_writes_stay_inside_triangle_rows() {
        let b = backend();
        let mut grid = grid::<QuickMerge>();
        let mut counters = CullCounters::new();
        let tri = small(1.0);
        write_occluder::<_, QuickMerge>(&b, &mut grid, &tri, &mut counters);

        let depths = dump(&grid);
        for y in 0..H {
            for x in 0..W {
                let z = depths[y * W + x];
                if (y as i32) < tri.row_lo || (y as i32) >= tri.row_hi {
                    assert_eq!(z, -1.0, "pixel ({}, {}) outside the triangle rows was written", x, y);
                }
            }
        }
        assert!(depths.iter().any(|&z| z == 1.0));
    }
}
