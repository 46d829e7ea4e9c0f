/// AVX-512 backend: 16 rows per tile, the whole tile in one register
use super::{Backend, BackendKind, CpuFeatures, RowEvents, MAX_TILE_ROWS, TILE_WIDTH};
use crate::culling::tile::LANES;
use core::arch::x86_64::*;

const ROWS: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct Avx512 {
    _detected: (),
}

impl Backend for Avx512 {
    const KIND: BackendKind = BackendKind::Avx512;
    const TILE_H: usize = ROWS;

    fn probe(features: &CpuFeatures) -> Option<Self> {
        // the capability vector is caller-built; only the running CPU can vouch for avx512f
        (features.avx512f && is_x86_feature_detected!("avx512f")).then_some(Avx512 { _detected: () })
    }

    #[inline]
    fn coverage(&self, rows: &RowEvents, tile_x0: i32, out: &mut [u32; MAX_TILE_ROWS]) {
        // SAFETY: an Avx512 value only exists after the avx512f probe succeeded
        unsafe { coverage_avx512(rows, tile_x0, out) }
    }

    #[inline]
    fn lane_depths(
        &self,
        row_z: &[f32; MAX_TILE_ROWS],
        lane_z: &[f32; LANES],
        out: &mut [[f32; MAX_TILE_ROWS]; LANES],
    ) {
        // SAFETY: see `coverage`
        unsafe { lane_depths_avx512(row_z, lane_z, out) }
    }
}

#[target_feature(enable = "avx512f")]
unsafe fn coverage_avx512(rows: &RowEvents, tile_x0: i32, out: &mut [u32; MAX_TILE_ROWS]) {
    let offset = _mm512_set1_epi32(tile_x0);
    let zero = _mm512_setzero_si512();
    let width = _mm512_set1_epi32(TILE_WIDTH as i32);
    let ones = _mm512_set1_epi32(-1);

    let left = _mm512_loadu_epi32(rows.left.as_ptr());
    let right = _mm512_loadu_epi32(rows.right.as_ptr());

    let left = _mm512_min_epi32(_mm512_max_epi32(_mm512_sub_epi32(left, offset), zero), width);
    let right = _mm512_min_epi32(_mm512_max_epi32(_mm512_sub_epi32(right, offset), zero), width);

    let from_left = _mm512_sllv_epi32(ones, left);
    let from_right = _mm512_sllv_epi32(ones, right);
    let mask = _mm512_andnot_si512(from_right, from_left);

    _mm512_storeu_epi32(out.as_mut_ptr() as *mut i32, mask);
}

#[target_feature(enable = "avx512f")]
unsafe fn lane_depths_avx512(
    row_z: &[f32; MAX_TILE_ROWS],
    lane_z: &[f32; LANES],
    out: &mut [[f32; MAX_TILE_ROWS]; LANES],
) {
    let z = _mm512_loadu_ps(row_z.as_ptr());
    for (lane_out, dz) in out.iter_mut().zip(lane_z) {
        _mm512_storeu_ps(lane_out.as_mut_ptr(), _mm512_add_ps(z, _mm512_set1_ps(*dz)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culling::backend::tests::check_against_reference;

    #[test]
    fn test_avx512_matches_scalar() {
        if let Some(backend) = Avx512::probe(&CpuFeatures::detect()) {
            check_against_reference(&backend);
        }
    }

    #[test]
    fn test_avx512_requires_running_cpu_support() {
        let claimed = CpuFeatures {
            avx512f: true,
            ..CpuFeatures::scalar_only()
        };
        assert_eq!(Avx512::probe(&claimed).is_some(), is_x86_feature_detected!("avx512f"));
        assert!(Avx512::probe(&CpuFeatures::scalar_only()).is_none());
    }
}
