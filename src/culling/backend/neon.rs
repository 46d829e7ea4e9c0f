/// NEON backend: 4 rows per tile on aarch64
use super::{Backend, BackendKind, CpuFeatures, RowEvents, MAX_TILE_ROWS, TILE_WIDTH};
use crate::culling::tile::LANES;
use core::arch::aarch64::*;

const ROWS: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct Neon {
    _detected: (),
}

impl Backend for Neon {
    const KIND: BackendKind = BackendKind::Neon;
    const TILE_H: usize = ROWS;

    fn probe(features: &CpuFeatures) -> Option<Self> {
        // the capability vector is caller-built; only the running CPU can vouch for neon
        (features.neon && std::arch::is_aarch64_feature_detected!("neon")).then_some(Neon { _detected: () })
    }

    #[inline]
    fn coverage(&self, rows: &RowEvents, tile_x0: i32, out: &mut [u32; MAX_TILE_ROWS]) {
        // SAFETY: a Neon value only exists after the neon probe succeeded
        unsafe { coverage_neon(rows, tile_x0, out) }
    }

    #[inline]
    fn lane_depths(
        &self,
        row_z: &[f32; MAX_TILE_ROWS],
        lane_z: &[f32; LANES],
        out: &mut [[f32; MAX_TILE_ROWS]; LANES],
    ) {
        // SAFETY: see `coverage`
        unsafe { lane_depths_neon(row_z, lane_z, out) }
    }
}

#[target_feature(enable = "neon")]
unsafe fn coverage_neon(rows: &RowEvents, tile_x0: i32, out: &mut [u32; MAX_TILE_ROWS]) {
    let offset = vdupq_n_s32(tile_x0);
    let zero = vdupq_n_s32(0);
    let width = vdupq_n_s32(TILE_WIDTH as i32);
    let ones = vdupq_n_u32(u32::MAX);

    let left = vld1q_s32(rows.left.as_ptr());
    let right = vld1q_s32(rows.right.as_ptr());

    let left = vminq_s32(vmaxq_s32(vsubq_s32(left, offset), zero), width);
    let right = vminq_s32(vmaxq_s32(vsubq_s32(right, offset), zero), width);

    // USHL by 32 or more yields zero
    let from_left = vshlq_u32(ones, left);
    let from_right = vshlq_u32(ones, right);

    vst1q_u32(out.as_mut_ptr(), vbicq_u32(from_left, from_right));
}

#[target_feature(enable = "neon")]
unsafe fn lane_depths_neon(
    row_z: &[f32; MAX_TILE_ROWS],
    lane_z: &[f32; LANES],
    out: &mut [[f32; MAX_TILE_ROWS]; LANES],
) {
    let z = vld1q_f32(row_z.as_ptr());
    for (lane_out, dz) in out.iter_mut().zip(lane_z) {
        vst1q_f32(lane_out.as_mut_ptr(), vaddq_f32(z, vdupq_n_f32(*dz)));
    }
}
