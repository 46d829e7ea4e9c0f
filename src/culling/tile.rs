/// Two-layer masked depth tiles and the policies that merge triangles into them
///
/// Depth is stored as reciprocal W, so larger values are nearer and a "minimum" is the
/// farthest (conservative) occluder depth. Each `Tile` record covers 32x1 pixels split into
/// four 8-pixel lanes. Per lane it keeps two depth sheets and 8 mask bits choosing which sheet
/// a pixel belongs to (set = layer1).
use super::backend::TILE_WIDTH;

/// Subtile lanes per tile record
pub const LANES: usize = 4;

/// Pixels per lane
pub const LANE_WIDTH: usize = TILE_WIDTH / LANES;

/// Mask bits of lane `j`
#[inline(always)]
pub const fn lane_bits(j: usize) -> u32 {
    0xff << (j * LANE_WIDTH)
}

/// One row record of a tile, one cache line each
#[repr(C, align(64))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub layer0: [f32; LANES],
    pub layer1: [f32; LANES],
    pub mask: u32,
}

impl Tile {
    pub const fn cleared(clear_depth: f32, layer1_clear: f32) -> Self {
        Self {
            layer0: [clear_depth; LANES],
            layer1: [layer1_clear; LANES],
            mask: 0,
        }
    }

    #[inline]
    pub fn lane_mask(&self, j: usize) -> u32 {
        (self.mask & lane_bits(j)) >> (j * LANE_WIDTH)
    }

    /// Depth of pixel `x` (0..32) within this record
    #[inline]
    pub fn pixel_depth(&self, x: usize) -> f32 {
        let lane = x / LANE_WIDTH;
        if (self.mask >> x) & 1 != 0 {
            self.layer1[lane]
        } else {
            self.layer0[lane]
        }
    }
}

/// Strategy for folding a rasterized triangle row into a tile record.
///
/// Chosen once per context as a type parameter; the rasterizer is monomorphized per policy.
pub trait MergePolicy: Copy + Send + Sync + Default + 'static {
    const NAME: &'static str;

    /// Value layer1 takes on clear
    const LAYER1_CLEAR: f32;

    /// Merge `coverage` at per-lane depth `z` (already clamped to the triangle's min depth)
    fn update(tile: &mut Tile, coverage: u32, z: &[f32; LANES]);

    /// Conservative per-lane occlusion depth used by occludee and rect queries
    fn reference_depth(tile: &Tile) -> [f32; LANES];
}

/// Cheap policy: never lets the incoming triangle interfere with layer0 unless it fills a lane
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickMerge;

impl MergePolicy for QuickMerge {
    const NAME: &'static str = "quick";
    const LAYER1_CLEAR: f32 = f32::MAX;

    fn update(tile: &mut Tile, coverage: u32, z: &[f32; LANES]) {
        let layer0 = tile.layer0;
        let layer1 = tile.layer1;

        let mut dead_lanes = 0u32;
        for j in 0..LANES {
            if coverage & lane_bits(j) == 0 || z[j] < layer0[j] {
                dead_lanes |= lane_bits(j);
            }
        }

        // subtiles failing the depth test keep their mask
        let rast_mask = coverage & !dead_lanes;

        // discard layer1 when the triangle fills the lane or is much nearer than layer1
        let mut discard = 0u32;
        for j in 0..LANES {
            let filled = rast_mask & lane_bits(j) == lane_bits(j);
            let nearer_than_mid = 2.0 * layer1[j] - (z[j] + layer0[j]) < 0.0;
            if filled || nearer_than_mid {
                discard |= lane_bits(j);
            }
        }
        discard &= !dead_lanes;

        let mask = (tile.mask & !discard) | rast_mask;

        let mut out_mask = 0u32;
        for j in 0..LANES {
            let bits = lane_bits(j);
            let candidate = if dead_lanes & bits != 0 { layer1[j] } else { z[j] };
            let kept = if discard & bits != 0 { z[j] } else { layer1[j] };
            let merged = candidate.min(kept);

            if mask & bits == bits {
                // fully covered: collapse into layer0
                tile.layer0[j] = merged;
                tile.layer1[j] = f32::MAX;
            } else {
                tile.layer1[j] = merged;
                out_mask |= mask & bits;
            }
        }
        tile.mask = out_mask;
    }

    #[inline]
    fn reference_depth(tile: &Tile) -> [f32; LANES] {
        tile.layer0
    }
}

/// Precise policy: merges the incoming triangle with whichever existing layer it is closest to
#[derive(Debug, Clone, Copy, Default)]
pub struct AccurateMerge;

impl MergePolicy for AccurateMerge {
    const NAME: &'static str = "accurate";
    const LAYER1_CLEAR: f32 = 0.0;

    fn update(tile: &mut Tile, coverage: u32, z: &[f32; LANES]) {
        let mask = tile.mask;
        let layer0 = tile.layer0;
        let layer1 = tile.layer1;

        let mut dist0 = [0f32; LANES];
        let mut dist1 = [0f32; LANES];
        let mut nearer0 = 0u32;
        let mut nearer1 = 0u32;
        for j in 0..LANES {
            dist0[j] = layer0[j] - z[j];
            dist1[j] = layer1[j] - z[j];
            if dist0[j] < 0.0 {
                nearer0 |= lane_bits(j);
            }
            if dist1[j] < 0.0 {
                nearer1 |= lane_bits(j);
            }
        }

        // pixels the triangle wins, against the layer each pixel currently belongs to
        let tri_mask = coverage & ((!mask & nearer0) | (mask & nearer1));
        if tri_mask == 0 {
            return;
        }

        let mut z_tri = [0f32; LANES];
        for j in 0..LANES {
            z_tri[j] = if tri_mask & lane_bits(j) == 0 { layer0[j] } else { z[j] };
        }

        // pixels left to each old layer after the triangle is applied
        let layer0_left = !tri_mask & !mask;
        let layer1_left = !tri_mask & mask;

        let mut overwrites0 = 0u32;
        let mut overwrites1 = 0u32;
        let mut z0 = [0f32; LANES];
        let mut z1 = [0f32; LANES];
        for j in 0..LANES {
            if layer0_left & lane_bits(j) == 0 {
                overwrites0 |= lane_bits(j);
                z0[j] = z_tri[j];
            } else {
                z0[j] = layer0[j];
            }
            if layer1_left & lane_bits(j) == 0 {
                overwrites1 |= lane_bits(j);
                z1[j] = z_tri[j];
            } else {
                z1[j] = layer1[j];
            }
        }

        let mut new_mask = 0u32;
        for j in 0..LANES {
            let bits = lane_bits(j);
            let d0 = dist0[j].abs();
            let d1 = dist1[j].abs();
            let d2 = (z0[j] - z1[j]).abs();

            // triangle joins layer0 when it is nearest to it, or layer0 is fully replaced
            let merge_with_0 = (d0 < d1 && d0 < d2)
                || overwrites0 & bits != 0
                || tri_mask & bits == 0;
            // otherwise it joins layer1 (the layers swap) when nearer to layer1 than the old
            // layers are to each other; failing both, the old layers merge and the triangle
            // becomes layer1
            let merge_with_1 = !merge_with_0 && (d1 < d2 || overwrites1 & bits != 0);

            let inner = if merge_with_0 { layer1_left } else { tri_mask };
            new_mask |= if merge_with_1 { layer0_left & bits } else { inner & bits };

            let e0 = if merge_with_1 { z1[j] } else { z0[j] };
            let e1 = if merge_with_1 || merge_with_0 { z_tri[j] } else { z1[j] };
            tile.layer0[j] = e0.min(e1);

            let z1_next = if merge_with_0 { z1[j] } else { z_tri[j] };
            tile.layer1[j] = if merge_with_1 { z0[j] } else { z1_next };
        }
        tile.mask = new_mask;
    }

    #[inline]
    fn reference_depth(tile: &Tile) -> [f32; LANES] {
        let mut out = [0f32; LANES];
        for (j, depth) in out.iter_mut().enumerate() {
            let lane = tile.lane_mask(j);
            let z0 = if lane == 0xff { tile.layer1[j] } else { tile.layer0[j] };
            let z1 = if lane == 0 { tile.layer0[j] } else { tile.layer1[j] };
            *depth = z0.min(z1);
        }
        out
    }
}

/// Contiguous tile-major store of row records.
///
/// A tile at `(tx, ty)` owns `rows_per_tile` consecutive records, one per pixel row.
#[derive(Debug, Clone)]
pub struct TileGrid {
    records: Vec<Tile>,
    tiles_x: usize,
    tiles_y: usize,
    rows_per_tile: usize,
}

impl TileGrid {
    pub fn new(tiles_x: usize, tiles_y: usize, rows_per_tile: usize, clear: Tile) -> Self {
        Self {
            records: vec![clear; tiles_x * tiles_y * rows_per_tile],
            tiles_x,
            tiles_y,
            rows_per_tile,
        }
    }

    #[inline]
    pub fn clear(&mut self, clear: Tile) {
        self.records.fill(clear);
    }

    #[inline]
    pub fn tiles_x(&self) -> usize {
        self.tiles_x
    }

    #[inline]
    pub fn tiles_y(&self) -> usize {
        self.tiles_y
    }

    #[inline]
    pub fn rows_per_tile(&self) -> usize {
        self.rows_per_tile
    }

    #[inline]
    pub fn records(&self) -> &[Tile] {
        &self.records
    }

    /// Row records of tile `(tx, ty)`
    #[inline]
    pub fn tile(&self, tx: usize, ty: usize) -> &[Tile] {
        let base = (ty * self.tiles_x + tx) * self.rows_per_tile;
        &self.records[base..base + self.rows_per_tile]
    }

    #[inline]
    pub fn tile_mut(&mut self, tx: usize, ty: usize) -> &mut [Tile] {
        let base = (ty * self.tiles_x + tx) * self.rows_per_tile;
        &mut self.records[base..base + self.rows_per_tile]
    }

    /// Record holding pixel row `y` of tile column `tx`
    #[inline]
    pub fn record_at(&self, tx: usize, y: usize) -> &Tile {
        let ty = y / self.rows_per_tile;
        &self.tile(tx, ty)[y % self.rows_per_tile]
    }
}
