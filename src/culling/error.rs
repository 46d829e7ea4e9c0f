/// Error types for context configuration
use thiserror::Error;

use super::backend::BackendKind;

/// Configuration problems reported by the `try_*` constructors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CullError {
    /// Forced backend is not available on this CPU.
    #[error("backend {backend} is not supported by this CPU")]
    UnsupportedBackend { backend: BackendKind },

    /// Width is not a whole number of tiles.
    #[error("width {width} is not a multiple of the tile width {tile_width}")]
    MisalignedWidth { width: usize, tile_width: usize },

    /// Height is not a whole number of tiles for the chosen backend.
    #[error("height {height} is not a multiple of the {backend} tile height {tile_height}")]
    MisalignedHeight {
        height: usize,
        backend: BackendKind,
        tile_height: usize,
    },

    #[error("near clip distance must be positive and finite, got {0}")]
    InvalidNearClip(f32),

    #[error("resolution {width}x{height} is empty")]
    EmptyResolution { width: usize, height: usize },
}

/// Result type for culling configuration.
pub type Result<T> = std::result::Result<T, CullError>;
