/// Occlusion context configuration
use super::backend::{BackendKind, CpuFeatures, TILE_WIDTH};
use super::error::{CullError, Result};

/// Context configuration parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CullConfig {
    /// Resolution in pixels; width must be a multiple of 32
    pub width: usize,
    /// Must be a multiple of the backend's tile height
    pub height: usize,
    /// Near plane distance in view-space W
    pub near_clip: f32,
    /// Reciprocal depth the near layer takes on clear
    pub clear_depth: f32,
    /// Force a backend instead of picking the widest supported one
    pub backend: Option<BackendKind>,
}

impl Default for CullConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 128,
            near_clip: 0.1,
            clear_depth: -1.0,
            backend: None,
        }
    }
}

impl CullConfig {
    pub fn new(width: usize, height: usize, near_clip: f32) -> Self {
        Self {
            width,
            height,
            near_clip,
            ..Self::default()
        }
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_clear_depth(mut self, clear_depth: f32) -> Self {
        self.clear_depth = clear_depth;
        self
    }

    /// Check the configuration against `features` and resolve the backend it will run on
    pub fn validate(&self, features: &CpuFeatures) -> Result<BackendKind> {
        if self.width == 0 || self.height == 0 {
            return Err(CullError::EmptyResolution {
                width: self.width,
                height: self.height,
            });
        }
        if self.width % TILE_WIDTH != 0 {
            return Err(CullError::MisalignedWidth {
                width: self.width,
                tile_width: TILE_WIDTH,
            });
        }
        if !(self.near_clip > 0.0 && self.near_clip.is_finite()) {
            return Err(CullError::InvalidNearClip(self.near_clip));
        }

        let backend = match self.backend {
            Some(forced) if !forced.is_supported(features) => {
                return Err(CullError::UnsupportedBackend { backend: forced });
            }
            Some(forced) => forced,
            None => features.best_backend(self.height),
        };

        if self.height % backend.tile_height() != 0 {
            return Err(CullError::MisalignedHeight {
                height: self.height,
                backend,
                tile_height: backend.tile_height(),
            });
        }

        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let features = CpuFeatures::detect();
        let backend = CullConfig::default().validate(&features).expect("default config");
        assert!(backend.is_supported(&features));
    }

    #[test]
    fn test_alignment_errors() {
        let scalar = CpuFeatures::scalar_only();
        assert_eq!(
            CullConfig::new(100, 64, 0.1).validate(&scalar),
            Err(CullError::MisalignedWidth { width: 100, tile_width: 32 })
        );
        assert_eq!(
            CullConfig::new(0, 64, 0.1).validate(&scalar),
            Err(CullError::EmptyResolution { width: 0, height: 64 })
        );
        assert_eq!(CullConfig::new(64, 63, 0.1).validate(&scalar), Ok(BackendKind::Scalar));
    }

    #[test]
    fn test_near_clip_must_be_positive() {
        let scalar = CpuFeatures::scalar_only();
        assert_eq!(
            CullConfig::new(64, 64, 0.0).validate(&scalar),
            Err(CullError::InvalidNearClip(0.0))
        );
        assert!(CullConfig::new(64, 64, f32::NAN).validate(&scalar).is_err());
    }

    #[test]
    fn test_forced_backend() {
        let scalar = CpuFeatures::scalar_only();
        assert_eq!(
            CullConfig::default().with_backend(BackendKind::Avx2).validate(&scalar),
            Err(CullError::UnsupportedBackend { backend: BackendKind::Avx2 })
        );

        if !cfg!(target_arch = "x86_64") {
            return;
        }
        let sse = CpuFeatures { sse2: true, ..CpuFeatures::scalar_only() };
        assert_eq!(
            CullConfig::new(64, 6, 0.1).with_backend(BackendKind::Sse2).validate(&sse),
            Err(CullError::MisalignedHeight { height: 6, backend: BackendKind::Sse2, tile_height: 4 })
        );
        // automatic selection falls back to a backend whose tile height fits
        assert_eq!(CullConfig::new(64, 6, 0.1).validate(&sse), Ok(BackendKind::Scalar));
    }
}
