/// AVX2 backend: 8 rows per tile, variable shifts via `vpsllvd`
use super::{Backend, BackendKind, CpuFeatures, RowEvents, MAX_TILE_ROWS, TILE_WIDTH};
use crate::culling::tile::LANES;
use core::arch::x86_64::*;

const ROWS: usize = 8;

#[derive(Debug, Clone, Copy)]
pub struct Avx2 {
    _detected: (),
}

impl Backend for Avx2 {
    const KIND: BackendKind = BackendKind::Avx2;
    const TILE_H: usize = ROWS;

    fn probe(features: &CpuFeatures) -> Option<Self> {
        // the capability vector is caller-built; only the running CPU can vouch for avx2
        (features.avx2 && is_x86_feature_detected!("avx2")).then_some(Avx2 { _detected: () })
    }

    #[inline]
    fn coverage(&self, rows: &RowEvents, tile_x0: i32, out: &mut [u32; MAX_TILE_ROWS]) {
        // SAFETY: an Avx2 value only exists after the avx2 probe succeeded
        unsafe { coverage_avx2(rows, tile_x0, out) }
    }

    #[inline]
    fn lane_depths(
        &self,
        row_z: &[f32; MAX_TILE_ROWS],
        lane_z: &[f32; LANES],
        out: &mut [[f32; MAX_TILE_ROWS]; LANES],
    ) {
        // SAFETY: see `coverage`
        unsafe { lane_depths_avx2(row_z, lane_z, out) }
    }
}

#[target_feature(enable = "avx2")]
unsafe fn coverage_avx2(rows: &RowEvents, tile_x0: i32, out: &mut [u32; MAX_TILE_ROWS]) {
    let offset = _mm256_set1_epi32(tile_x0);
    let zero = _mm256_setzero_si256();
    let width = _mm256_set1_epi32(TILE_WIDTH as i32);
    let ones = _mm256_set1_epi32(-1);

    let left = _mm256_loadu_si256(rows.left.as_ptr() as *const __m256i);
    let right = _mm256_loadu_si256(rows.right.as_ptr() as *const __m256i);

    let left = _mm256_min_epi32(_mm256_max_epi32(_mm256_sub_epi32(left, offset), zero), width);
    let right = _mm256_min_epi32(_mm256_max_epi32(_mm256_sub_epi32(right, offset), zero), width);

    // Shift counts of 32 produce zero, which is exactly the empty-span case
    let from_left = _mm256_sllv_epi32(ones, left);
    let from_right = _mm256_sllv_epi32(ones, right);
    let mask = _mm256_andnot_si256(from_right, from_left);

    _mm256_storeu_si256(out.as_mut_ptr() as *mut __m256i, mask);
}

#[target_feature(enable = "avx2")]
unsafe fn lane_depths_avx2(
    row_z: &[f32; MAX_TILE_ROWS],
    lane_z: &[f32; LANES],
    out: &mut [[f32; MAX_TILE_ROWS]; LANES],
) {
    let z = _mm256_loadu_ps(row_z.as_ptr());
    for (lane_out, dz) in out.iter_mut().zip(lane_z) {
        _mm256_storeu_ps(lane_out.as_mut_ptr(), _mm256_add_ps(z, _mm256_set1_ps(*dz)));
    }
}
