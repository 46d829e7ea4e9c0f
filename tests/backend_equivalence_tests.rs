//! Every supported backend must produce the same tile store and the same verdicts
mod common;

use common::*;
use occlusion_culler::{AccurateMerge, CullSurface, Indices, MergePolicy, QuickMerge};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Random view-space triangles, some crossing the screen edges or the near plane
fn random_triangles(rng: &mut ChaCha8Rng, count: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(count * 9);
    for _ in 0..count {
        let d = rng.gen_range(0.2f32..6.0);
        for _ in 0..3 {
            let w = if rng.gen_bool(0.1) { rng.gen_range(-0.5f32..0.3) } else { d + rng.gen_range(-0.1f32..0.1) };
            out.push(rng.gen_range(-1.6f32..1.6) * w.abs());
            out.push(rng.gen_range(-1.6f32..1.6) * w.abs());
            out.push(w);
        }
    }
    out
}

fn check_equivalence<P: MergePolicy>(width: usize, height: usize, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let occluders = random_triangles(&mut rng, 64);
    let occludees: Vec<Vec<f32>> = (0..32).map(|_| random_triangles(&mut rng, 2)).collect();
    let rects: Vec<([f32; 2], [f32; 2], f32)> = (0..32)
        .map(|_| {
            let x = rng.gen_range(-1.2f32..1.0);
            let y = rng.gen_range(-1.2f32..1.0);
            ([x, y], [x + rng.gen_range(0.0f32..0.5), y + rng.gen_range(0.0f32..0.5)], rng.gen_range(0.2f32..6.0))
        })
        .collect();

    let mut results = Vec::new();
    for mut ctx in contexts_for_all_backends::<P>(width, height) {
        ctx.clear();
        let mut surfaces = [CullSurface::occluder(&occluders, Indices::Sequential, view_xform())];
        ctx.submit_surfaces(&mut surfaces);

        let mut queries: Vec<CullSurface> = occludees
            .iter()
            .map(|v| CullSurface::occludee(v, Indices::Sequential, view_xform()))
            .collect();
        ctx.submit_surfaces(&mut queries);
        let flags: Vec<bool> = queries.iter().map(|s| s.visible).collect();
        let rect_flags: Vec<bool> = rects.iter().map(|(a, b, w)| ctx.test_rect(*a, *b, *w)).collect();

        let depth_bits: Vec<u32> = dump(&ctx).iter().map(|z| z.to_bits()).collect();
        results.push((ctx.backend(), depth_bits, flags, rect_flags));
    }

    let (reference_kind, reference_depth, reference_flags, reference_rects) = &results[0];
    for (kind, depth, flags, rect_flags) in &results[1..] {
        assert!(
            depth == reference_depth,
            "{}: {} depth differs from {}",
            P::NAME,
            kind,
            reference_kind
        );
        assert_eq!(flags, reference_flags, "{}: {} occludee flags differ from {}", P::NAME, kind, reference_kind);
        assert_eq!(rect_flags, reference_rects, "{}: {} rect flags differ from {}", P::NAME, kind, reference_kind);
    }
}

#[test]
fn test_backends_agree_quick() {
    init_tracing();
    for seed in 0..4 {
        check_equivalence::<QuickMerge>(WIDTH, HEIGHT, seed);
        check_equivalence::<QuickMerge>(256, 64, seed + 100);
    }
}

#[test]
fn test_backends_agree_accurate() {
    for seed in 0..4 {
        check_equivalence::<AccurateMerge>(WIDTH, HEIGHT, seed);
        check_equivalence::<AccurateMerge>(256, 64, seed + 100);
    }
}

#[test]
fn test_scalar_always_available() {
    let contexts = contexts_for_all_backends::<QuickMerge>(WIDTH, 48);
    assert!(backend_names(&contexts).contains(&occlusion_culler::BackendKind::Scalar));
}
