/// Reference backend: one row per tile, plain integer and float code
use super::{row_coverage, Backend, BackendKind, CpuFeatures, RowEvents, MAX_TILE_ROWS};
use crate::culling::tile::LANES;

#[derive(Debug, Clone, Copy, Default)]
pub struct Scalar;

impl Backend for Scalar {
    const KIND: BackendKind = BackendKind::Scalar;
    const TILE_H: usize = 1;

    #[inline]
    fn probe(_features: &CpuFeatures) -> Option<Self> {
        Some(Scalar)
    }

    #[inline]
    fn coverage(&self, rows: &RowEvents, tile_x0: i32, out: &mut [u32; MAX_TILE_ROWS]) {
        for r in 0..Self::TILE_H {
            out[r] = row_coverage(rows.left[r], rows.right[r], tile_x0);
        }
    }

    #[inline]
    fn lane_depths(
        &self,
        row_z: &[f32; MAX_TILE_ROWS],
        lane_z: &[f32; LANES],
        out: &mut [[f32; MAX_TILE_ROWS]; LANES],
    ) {
        for (lane_out, dz) in out.iter_mut().zip(lane_z) {
            for r in 0..Self::TILE_H {
                lane_out[r] = row_z[r] + dz;
            }
        }
    }
}
