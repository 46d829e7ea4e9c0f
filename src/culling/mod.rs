/// Tile-based software occlusion culling
/// Occluders are rasterized into a compressed two-layer depth store; occludees and screen
/// rectangles are tested against it conservatively
pub mod backend;
pub mod clipper;
pub mod config;
pub mod context;
pub mod debug;
pub mod error;
pub mod raster;
pub mod rect;
pub mod setup;
pub mod surface;
pub mod tile;

pub use backend::{BackendKind, CpuFeatures};
pub use config::CullConfig;
pub use context::OcclusionContext;
pub use error::CullError;
pub use surface::{bbox_corners, CullSurface, Indices, PrimitiveType, SurfaceKind, BBOX_INDICES};
pub use tile::{AccurateMerge, MergePolicy, QuickMerge, Tile};
