/// SSE2 backend: 4 rows per tile, one row per 32-bit vector lane
///
/// SSE2 has neither 32-bit min/max nor per-lane variable shifts, so clamping is done with
/// compare + blend and the final shifts run on the stored lane values.
use super::{Backend, BackendKind, CpuFeatures, RowEvents, MAX_TILE_ROWS, TILE_WIDTH};
use crate::culling::tile::LANES;
use core::arch::x86_64::*;

const ROWS: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct Sse2 {
    _detected: (),
}

impl Backend for Sse2 {
    const KIND: BackendKind = BackendKind::Sse2;
    const TILE_H: usize = ROWS;

    fn probe(features: &CpuFeatures) -> Option<Self> {
        // the capability vector is caller-built; only the running CPU can vouch for sse2
        (features.sse2 && is_x86_feature_detected!("sse2")).then_some(Sse2 { _detected: () })
    }

    #[inline]
    fn coverage(&self, rows: &RowEvents, tile_x0: i32, out: &mut [u32; MAX_TILE_ROWS]) {
        // SAFETY: an Sse2 value only exists after the sse2 probe succeeded
        unsafe { coverage_sse2(rows, tile_x0, out) }
    }

    #[inline]
    fn lane_depths(
        &self,
        row_z: &[f32; MAX_TILE_ROWS],
        lane_z: &[f32; LANES],
        out: &mut [[f32; MAX_TILE_ROWS]; LANES],
    ) {
        // SAFETY: see `coverage`
        unsafe { lane_depths_sse2(row_z, lane_z, out) }
    }
}

/// Per-lane signed max, emulated with a compare mask
#[inline]
#[target_feature(enable = "sse2")]
unsafe fn max_epi32(a: __m128i, b: __m128i) -> __m128i {
    let a_gt = _mm_cmpgt_epi32(a, b);
    _mm_or_si128(_mm_and_si128(a_gt, a), _mm_andnot_si128(a_gt, b))
}

#[inline]
#[target_feature(enable = "sse2")]
unsafe fn min_epi32(a: __m128i, b: __m128i) -> __m128i {
    let a_gt = _mm_cmpgt_epi32(a, b);
    _mm_or_si128(_mm_and_si128(a_gt, b), _mm_andnot_si128(a_gt, a))
}

#[target_feature(enable = "sse2")]
unsafe fn coverage_sse2(rows: &RowEvents, tile_x0: i32, out: &mut [u32; MAX_TILE_ROWS]) {
    let offset = _mm_set1_epi32(tile_x0);
    let zero = _mm_setzero_si128();
    let width = _mm_set1_epi32(TILE_WIDTH as i32);

    let left = _mm_loadu_si128(rows.left.as_ptr() as *const __m128i);
    let right = _mm_loadu_si128(rows.right.as_ptr() as *const __m128i);

    let left = min_epi32(max_epi32(_mm_sub_epi32(left, offset), zero), width);
    let right = min_epi32(max_epi32(_mm_sub_epi32(right, offset), zero), width);

    let mut l = [0i32; ROWS];
    let mut r = [0i32; ROWS];
    _mm_storeu_si128(l.as_mut_ptr() as *mut __m128i, left);
    _mm_storeu_si128(r.as_mut_ptr() as *mut __m128i, right);

    for i in 0..ROWS {
        let from_left = u32::MAX.checked_shl(l[i] as u32).unwrap_or(0);
        let from_right = u32::MAX.checked_shl(r[i] as u32).unwrap_or(0);
        out[i] = from_left & !from_right;
    }
}

#[target_feature(enable = "sse2")]
unsafe fn lane_depths_sse2(
    row_z: &[f32; MAX_TILE_ROWS],
    lane_z: &[f32; LANES],
    out: &mut [[f32; MAX_TILE_ROWS]; LANES],
) {
    let z = _mm_loadu_ps(row_z.as_ptr());
    for (lane_out, dz) in out.iter_mut().zip(lane_z) {
        _mm_storeu_ps(lane_out.as_mut_ptr(), _mm_add_ps(z, _mm_set1_ps(*dz)));
    }
}
