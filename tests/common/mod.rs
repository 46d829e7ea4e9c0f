//! Shared scene helpers for the integration tests
#![allow(dead_code)]

use glam::{Mat4, Vec4};
use occlusion_culler::{BackendKind, CpuFeatures, CullConfig, MergePolicy, OcclusionContext};

pub const WIDTH: usize = 128;
pub const HEIGHT: usize = 128;
pub const NEAR: f32 = 0.1;

/// Clip-from-view transform that keeps x and y and copies view depth into w
pub fn view_xform() -> Mat4 {
    Mat4::from_cols(Vec4::X, Vec4::Y, Vec4::new(0.0, 0.0, 1.0, 1.0), Vec4::ZERO)
}

/// Quad reaching past every screen edge at view depth `d`, packed xyz
pub fn full_screen_quad(d: f32) -> [f32; 12] {
    let corners = [(-1.5, -1.5), (12.0, -1.5), (12.0, 12.0), (-1.5, 12.0)];
    let mut out = [0f32; 12];
    for (i, (x, y)) in corners.iter().enumerate() {
        out[i * 3] = x * d;
        out[i * 3 + 1] = y * d;
        out[i * 3 + 2] = d;
    }
    out
}

pub const QUAD_INDICES: [u32; 6] = [1, 2, 3, 1, 3, 0];

/// Small counter-clockwise triangle around the screen center at view depth `d`
pub fn center_triangle(d: f32) -> [f32; 9] {
    [-0.5 * d, -0.5 * d, d, 0.5 * d, -0.5 * d, d, 0.0, 0.5 * d, d]
}

/// One context per backend this CPU can run
pub fn contexts_for_all_backends<P: MergePolicy>(width: usize, height: usize) -> Vec<OcclusionContext<P>> {
    CpuFeatures::detect()
        .supported_backends()
        .into_iter()
        .filter(|kind| height % kind.tile_height() == 0)
        .map(|kind| OcclusionContext::with_config(CullConfig::new(width, height, NEAR).with_backend(kind)))
        .collect()
}

pub fn backend_names<P: MergePolicy>(contexts: &[OcclusionContext<P>]) -> Vec<BackendKind> {
    contexts.iter().map(|c| c.backend()).collect()
}

pub fn dump<P: MergePolicy>(ctx: &OcclusionContext<P>) -> Vec<f32> {
    let mut out = vec![0.0; ctx.width() * ctx.height()];
    ctx.debug_dump_depth(&mut out);
    out
}

/// Install a test subscriber once; honours RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Right-handed variant of `view_xform`: the camera looks down -z
pub fn rh_view_xform() -> Mat4 {
    Mat4::from_cols(Vec4::X, Vec4::Y, Vec4::new(0.0, 0.0, -1.0, -1.0), Vec4::ZERO)
}
