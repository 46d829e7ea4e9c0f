/// Vector-width backends for the tile rasterizer
///
/// Every backend shares the scalar triangle setup, the scalar merge and compare code, and the
/// same 8x1 pixel subtile. Only two things vary: the tile height (how many 8x1 row records one
/// tile stacks) and the two per-tile kernels that run across those rows in SIMD:
/// - coverage: 32-bit pixel masks from per-row left/right span edges
/// - lane depths: interpolated plane depth for the 4 lanes of every row
///
/// Both kernels are exact (integer shifts, one float add per value), so all backends
/// produce bit-identical tile contents for the same input. The record layout is the same
/// for every backend; none of them uses a taller per-ISA subtile.
pub mod scalar;

#[cfg(target_arch = "x86_64")]
pub mod sse2;

#[cfg(target_arch = "x86_64")]
pub mod avx2;

#[cfg(target_arch = "x86_64")]
pub mod avx512;

#[cfg(target_arch = "aarch64")]
pub mod neon;

pub use scalar::Scalar;

#[cfg(target_arch = "x86_64")]
pub use self::{avx2::Avx2, avx512::Avx512, sse2::Sse2};

#[cfg(target_arch = "aarch64")]
pub use neon::Neon;

use super::tile::LANES;

/// Tile width in pixels, shared by every backend
pub const TILE_WIDTH: usize = 32;

/// Largest tile height of any backend (AVX-512 processes 16 rows per tile)
pub const MAX_TILE_ROWS: usize = 16;

/// Identifies one of the interchangeable rasterizer backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Scalar,
    Sse2,
    Avx2,
    Avx512,
    Neon,
}

impl BackendKind {
    pub const ALL: [BackendKind; 5] = [
        BackendKind::Scalar,
        BackendKind::Sse2,
        BackendKind::Avx2,
        BackendKind::Avx512,
        BackendKind::Neon,
    ];

    /// Rows stacked in one tile
    pub const fn tile_height(self) -> usize {
        match self {
            BackendKind::Scalar => 1,
            BackendKind::Sse2 => 4,
            BackendKind::Avx2 => 8,
            BackendKind::Avx512 => 16,
            BackendKind::Neon => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            BackendKind::Scalar => "scalar",
            BackendKind::Sse2 => "sse2",
            BackendKind::Avx2 => "avx2",
            BackendKind::Avx512 => "avx512",
            BackendKind::Neon => "neon",
        }
    }

    /// True when this backend is compiled for the current target and the CPU reports the
    /// instructions it needs
    pub fn is_supported(self, features: &CpuFeatures) -> bool {
        match self {
            BackendKind::Scalar => true,
            BackendKind::Sse2 => cfg!(target_arch = "x86_64") && features.sse2,
            BackendKind::Avx2 => cfg!(target_arch = "x86_64") && features.avx2,
            BackendKind::Avx512 => cfg!(target_arch = "x86_64") && features.avx512f,
            BackendKind::Neon => cfg!(target_arch = "aarch64") && features.neon,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only CPU capability vector consumed by backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuFeatures {
    pub sse2: bool,
    pub avx2: bool,
    pub avx512f: bool,
    pub neon: bool,
}

impl CpuFeatures {
    /// Query the running CPU. The standard library caches the result per process.
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            Self {
                sse2: is_x86_feature_detected!("sse2"),
                avx2: is_x86_feature_detected!("avx2"),
                avx512f: is_x86_feature_detected!("avx512f"),
                neon: false,
            }
        }

        #[cfg(target_arch = "aarch64")]
        {
            Self {
                neon: std::arch::is_aarch64_feature_detected!("neon"),
                ..Self::default()
            }
        }

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            Self::default()
        }
    }

    /// Capability vector that only admits the scalar backend
    pub const fn scalar_only() -> Self {
        Self {
            sse2: false,
            avx2: false,
            avx512f: false,
            neon: false,
        }
    }

    /// Widest supported backend whose tile height divides `height`.
    /// Scalar (tile height 1) always qualifies.
    pub fn best_backend(&self, height: usize) -> BackendKind {
        const PREFERENCE: [BackendKind; 4] = [
            BackendKind::Avx512,
            BackendKind::Avx2,
            BackendKind::Neon,
            BackendKind::Sse2,
        ];

        PREFERENCE
            .into_iter()
            .find(|kind| kind.is_supported(self) && height % kind.tile_height() == 0)
            .unwrap_or(BackendKind::Scalar)
    }

    /// All backends usable on this CPU, scalar first
    pub fn supported_backends(&self) -> Vec<BackendKind> {
        BackendKind::ALL
            .into_iter()
            .filter(|kind| kind.is_supported(self))
            .collect()
    }
}

/// Span edges for the rows of one tile, in absolute pixel columns.
/// A row with `left >= right` has no coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowEvents {
    pub left: [i32; MAX_TILE_ROWS],
    pub right: [i32; MAX_TILE_ROWS],
}

impl RowEvents {
    pub const fn empty() -> Self {
        Self {
            left: [0; MAX_TILE_ROWS],
            right: [0; MAX_TILE_ROWS],
        }
    }
}

impl Default for RowEvents {
    fn default() -> Self {
        Self::empty()
    }
}

/// Per-tile SIMD kernels of one instruction set.
///
/// A value of a backend type is proof that its instructions are available: the only way to
/// obtain one is `probe`, which requires both the capability vector and the running CPU to
/// report the feature. The kernel methods rely on this to call their `#[target_feature]`
/// implementations.
pub trait Backend: Copy + Send + Sync + 'static {
    const KIND: BackendKind;
    const TILE_H: usize;

    fn probe(features: &CpuFeatures) -> Option<Self>;

    /// Coverage mask of every row in the tile whose left pixel column is `tile_x0`.
    /// Only the first `TILE_H` entries of `out` are written.
    fn coverage(&self, rows: &RowEvents, tile_x0: i32, out: &mut [u32; MAX_TILE_ROWS]);

    /// `out[lane][row] = row_z[row] + lane_z[lane]` for the first `TILE_H` rows
    fn lane_depths(
        &self,
        row_z: &[f32; MAX_TILE_ROWS],
        lane_z: &[f32; LANES],
        out: &mut [[f32; MAX_TILE_ROWS]; LANES],
    );
}

/// Reference coverage for a single row, shared by the scalar backend and the SIMD tests
#[inline]
pub(crate) fn row_coverage(left: i32, right: i32, tile_x0: i32) -> u32 {
    let l = (left.saturating_sub(tile_x0)).clamp(0, TILE_WIDTH as i32) as u32;
    let r = (right.saturating_sub(tile_x0)).clamp(0, TILE_WIDTH as i32) as u32;
    let from_left = u32::MAX.checked_shl(l).unwrap_or(0);
    let from_right = u32::MAX.checked_shl(r).unwrap_or(0);
    from_left & !from_right
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_coverage_spans() {
        assert_eq!(row_coverage(0, 32, 0), u32::MAX, "Full span covers all 32 pixels");
        assert_eq!(row_coverage(0, 8, 0), 0xff, "First lane only");
        assert_eq!(row_coverage(40, 48, 32), 0xff00, "Second lane of the second tile");
        assert_eq!(row_coverage(-100, 5, 0), 0x1f, "Left edge clamps to the tile start");
        assert_eq!(row_coverage(30, 500, 0), 0xc000_0000, "Right edge clamps to the tile end");
        assert_eq!(row_coverage(10, 10, 0), 0, "Empty span");
        assert_eq!(row_coverage(20, 10, 0), 0, "Inverted span has no coverage");
        assert_eq!(row_coverage(64, 96, 0), 0, "Span entirely right of the tile");
    }

    #[test]
    fn test_best_backend_respects_height() {
        let all = CpuFeatures {
            sse2: true,
            avx2: true,
            avx512f: true,
            neon: true,
        };

        if cfg!(target_arch = "x86_64") {
            assert_eq!(all.best_backend(128), BackendKind::Avx512);
            assert_eq!(all.best_backend(120), BackendKind::Avx2, "120 is not a multiple of 16");
            assert_eq!(all.best_backend(36), BackendKind::Sse2);
            assert_eq!(all.best_backend(33), BackendKind::Scalar);
        }
        if cfg!(target_arch = "aarch64") {
            assert_eq!(all.best_backend(128), BackendKind::Neon);
            assert_eq!(all.best_backend(30), BackendKind::Scalar);
        }

        assert_eq!(CpuFeatures::scalar_only().best_backend(128), BackendKind::Scalar);
    }

    #[test]
    fn test_detected_backends_probe() {
        let features = CpuFeatures::detect();
        let supported = features.supported_backends();
        assert_eq!(supported[0], BackendKind::Scalar);

        for kind in supported {
            let probed = match kind {
                BackendKind::Scalar => Scalar::probe(&features).is_some(),
                #[cfg(target_arch = "x86_64")]
                BackendKind::Sse2 => Sse2::probe(&features).is_some(),
                #[cfg(target_arch = "x86_64")]
                BackendKind::Avx2 => Avx2::probe(&features).is_some(),
                #[cfg(target_arch = "x86_64")]
                BackendKind::Avx512 => Avx512::probe(&features).is_some(),
                #[cfg(target_arch = "aarch64")]
                BackendKind::Neon => Neon::probe(&features).is_some(),
                #[allow(unreachable_patterns)]
                _ => false,
            };
            assert!(probed, "{} reported as supported but failed to probe", kind);
        }
    }

    /// Shared checks for SIMD backend tests: compare against the scalar reference
    pub(crate) fn check_against_reference<B: Backend>(backend: &B) {
        let mut rows = RowEvents::empty();
        let spans: [(i32, i32); MAX_TILE_ROWS] = [
            (0, 32),
            (-50, 7),
            (9, 9),
            (31, 200),
            (64, 70),
            (70, 64),
            (35, 61),
            (i32::MIN / 2, i32::MAX / 2),
            (40, 41),
            (33, 64),
            (32, 33),
            (-1, 0),
            (0, 1),
            (50, 52),
            (47, 49),
            (39, 57),
        ];
        for (r, (l, rr)) in spans.iter().enumerate() {
            rows.left[r] = *l;
            rows.right[r] = *rr;
        }

        for tile_x0 in [0, 32, 64] {
            let mut out = [0u32; MAX_TILE_ROWS];
            backend.coverage(&rows, tile_x0, &mut out);
            for r in 0..B::TILE_H {
                assert_eq!(
                    out[r],
                    row_coverage(rows.left[r], rows.right[r], tile_x0),
                    "{} coverage mismatch at row {} tile_x0 {}",
                    B::KIND,
                    r,
                    tile_x0
                );
            }
        }

        let mut row_z = [0f32; MAX_TILE_ROWS];
        for (r, z) in row_z.iter_mut().enumerate() {
            *z = 0.37 + r as f32 * 0.013;
        }
        let lane_z = [0.0, -0.0021, 0.0042, -0.0063];
        let mut out = [[0f32; MAX_TILE_ROWS]; LANES];
        backend.lane_depths(&row_z, &lane_z, &mut out);
        for j in 0..LANES {
            for r in 0..B::TILE_H {
                assert_eq!(
                    out[j][r].to_bits(),
                    (row_z[r] + lane_z[j]).to_bits(),
                    "{} lane depth must match the scalar add bit for bit",
                    B::KIND
                );
            }
        }
    }
}
