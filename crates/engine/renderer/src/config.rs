//! Startup configuration loaded from a RON file
//!
//! Every section is optional; missing fields fall back to the built-in
//! defaults.
//!
//! ```ron
//! (
//!     density: (resolution: (xz: 128, y: 32), shape: (coverage: 0.6)),
//!     regeneration: (cadence_frames: None, on_window_change: true),
//!     volume: (num_steps: 64, step_size: 0.2),
//! )
//! ```

use crate::density::{CloudShape, GridResolution};
use crate::error::Result;
use crate::schedule::RegenerationPolicy;
use crate::scene::{GenerationParams, VolumeParams};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityConfig {
    pub resolution: GridResolution,
    pub shape: CloudShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub density: DensityConfig,
    pub regeneration: RegenerationPolicy,
    pub volume: VolumeParams,
    pub generation: GenerationParams,
    /// Linear RGB behind clouds where no geometry was drawn
    pub sky_color: [f32; 3],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            density: DensityConfig::default(),
            regeneration: RegenerationPolicy::default(),
            volume: VolumeParams::default(),
            generation: GenerationParams::default(),
            sky_color: crate::compositor::SKY_COLOR.to_array(),
        }
    }
}

impl RendererConfig {
    pub fn from_ron(source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source)?;
        config.density.resolution.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_ron(&source)?;
        tracing::info!("Loaded renderer config from {}", path.display());
        Ok(config)
    }

    pub fn sky_color(&self) -> glam::Vec3 {
        glam::Vec3::from_array(self.sky_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RendererConfig::from_ron("()").unwrap();
        assert_eq!(config, RendererConfig::default());
        assert_eq!(config.volume.num_steps, 30);
        assert_eq!(config.regeneration.cadence_frames, Some(5));
    }

    #[test]
    fn test_partial_sections() {
        let config = RendererConfig::from_ron(
            "(regeneration: (cadence_frames: None), volume: (num_steps: 64))",
        )
        .unwrap();
        assert_eq!(config.regeneration.cadence_frames, None);
        assert!(config.regeneration.on_window_change);
        assert_eq!(config.volume.num_steps, 64);
        assert_eq!(config.volume.num_light_steps, 10);
    }

    #[test]
    fn test_invalid_resolution_rejected() {
        let err = RendererConfig::from_ron("(density: (resolution: (xz: 30, y: 8)))");
        assert!(matches!(err, Err(crate::Error::InvalidResolution { .. })));
    }

    #[test]
    fn test_malformed_config_is_error() {
        assert!(matches!(
            RendererConfig::from_ron("(volume: (num_steps: \"many\"))"),
            Err(crate::Error::Config(_))
        ));
    }
}
