//! Bounding-rectangle queries against cleared and written tile stores
mod common;

use common::*;
use occlusion_culler::{AccurateMerge, CullSurface, Indices, MergePolicy, OcclusionContext, QuickMerge};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_rect(rng: &mut ChaCha8Rng) -> ([f32; 2], [f32; 2]) {
    let x0 = rng.gen_range(-1.0f32..1.0);
    let y0 = rng.gen_range(-1.0f32..1.0);
    let x1 = rng.gen_range(x0..=1.0);
    let y1 = rng.gen_range(y0..=1.0);
    ([x0, y0], [x1, y1])
}

fn cleared_rects_pass<P: MergePolicy>() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for mut ctx in contexts_for_all_backends::<P>(WIDTH, HEIGHT) {
        ctx.clear();
        for _ in 0..200 {
            let (p_min, p_max) = random_rect(&mut rng);
            let w_min = rng.gen_range(0.01f32..1000.0);
            assert!(
                ctx.test_rect(p_min, p_max, w_min),
                "{} {}: rect {:?}..{:?} at w {} over cleared tiles",
                P::NAME,
                ctx.backend(),
                p_min,
                p_max,
                w_min
            );
        }
    }
}

#[test]
fn test_cleared_rects_pass_quick() {
    cleared_rects_pass::<QuickMerge>();
}

#[test]
fn test_cleared_rects_pass_accurate() {
    cleared_rects_pass::<AccurateMerge>();
}

fn edge_rects_pass<P: MergePolicy>() {
    for mut ctx in contexts_for_all_backends::<P>(WIDTH, HEIGHT) {
        ctx.clear();
        assert!(ctx.test_rect([0.995, 0.1], [0.998, 0.5], 1.0), "{} {}: last column", P::NAME, ctx.backend());
        assert!(ctx.test_rect([-0.5, -0.999], [0.5, -0.995], 1.0), "{} {}: last row", P::NAME, ctx.backend());
        assert!(ctx.test_rect([0.996, -0.999], [0.999, -0.996], 1.0), "{} {}: last pixel", P::NAME, ctx.backend());
    }
}

#[test]
fn test_last_column_and_row_rects_pass_quick() {
    edge_rects_pass::<QuickMerge>();
}

#[test]
fn test_last_column_and_row_rects_pass_accurate() {
    edge_rects_pass::<AccurateMerge>();
}

#[test]
fn test_inverted_and_offscreen_rects_fail() {
    let mut ctx = OcclusionContext::<QuickMerge>::new(WIDTH, HEIGHT, NEAR);
    assert!(!ctx.test_rect([0.5, -0.5], [-0.5, 0.5], 1.0), "inverted x");
    assert!(!ctx.test_rect([-0.5, 0.5], [0.5, -0.5], 1.0), "inverted y");
    assert!(!ctx.test_rect([1.2, -0.5], [1.8, 0.5], 1.0), "right of the screen");
    assert!(!ctx.test_rect([-0.5, -3.0], [0.5, -2.0], 1.0), "below the screen");
}

#[test]
fn test_rect_partially_uncovered() {
    // occluder over the left half only
    let d = 0.5;
    let half: Vec<f32> = [(-1.5, -1.5), (0.0, -1.5), (0.0, 12.0), (-1.5, 12.0)]
        .iter()
        .flat_map(|(x, y)| [x * d, y * d, d])
        .collect();

    let mut ctx = OcclusionContext::<QuickMerge>::new(WIDTH, HEIGHT, NEAR);
    let mut occluders = [CullSurface::occluder(&half, Indices::U32(&QUAD_INDICES), view_xform())];
    ctx.submit_surfaces(&mut occluders);

    assert!(!ctx.test_rect([-0.9, -0.9], [-0.2, 0.9], 0.6), "inside the occluded half");
    assert!(ctx.test_rect([0.2, -0.9], [0.9, 0.9], 0.6), "inside the open half");
    assert!(ctx.test_rect([-0.9, -0.1], [0.9, 0.1], 0.6), "straddling both halves");
}
