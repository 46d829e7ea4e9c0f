/// Per-pixel reconstruction of the tile store, for visual inspection
use super::backend::TILE_WIDTH;
use super::tile::TileGrid;

/// Write one reciprocal depth per pixel into `out`, row-major, `width` values per row
pub fn dump_depth(grid: &TileGrid, width: usize, height: usize, out: &mut [f32]) {
    assert!(
        out.len() >= width * height,
        "debug depth buffer holds {} values, {}x{} needs {}",
        out.len(),
        width,
        height,
        width * height
    );

    for (y, row) in out.chunks_exact_mut(width).take(height).enumerate() {
        for (tx, span) in row.chunks_exact_mut(TILE_WIDTH).enumerate() {
            let record = grid.record_at(tx, y);
            for (x, value) in span.iter_mut().enumerate() {
                *value = record.pixel_depth(x);
            }
        }
    }
}
