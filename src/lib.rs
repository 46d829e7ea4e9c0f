/// Occlusion Culler - CPU software occlusion culling with runtime-selected SIMD backends
/// Built with compartmentalized benchmarkable components
pub mod culling;
pub mod perf;

pub use culling::{
    bbox_corners, AccurateMerge, BackendKind, CpuFeatures, CullConfig, CullError, CullSurface, Indices,
    MergePolicy, OcclusionContext, PrimitiveType, QuickMerge, SurfaceKind, BBOX_INDICES,
};
pub use perf::{CounterSnapshot, CullCounters};
