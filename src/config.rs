//! Generator configuration
//!
//! Everything a run needs besides the random seed stream. Loaded from JSON
//! (missing keys take their defaults) and then overridden from the command
//! line.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::geometry::Extent;
use crate::heightmap::NoiseParams;
use crate::mesh::DEFAULT_RELAX_ITERATIONS;
use crate::presets::{PipelineOptions, TerrainPreset, DEFAULT_CLEAN_ITERATIONS};

/// Mesh construction parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshParams {
    /// Number of sample points
    pub points: usize,
    pub extent: Extent,
    /// Lloyd relaxation passes
    pub relax_iterations: usize,
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            points: 4096,
            extent: Extent::default(),
            relax_iterations: DEFAULT_RELAX_ITERATIONS,
        }
    }
}

/// Top-level configuration for one terrain run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Master seed; a random one is picked when absent
    pub seed: Option<u64>,
    pub mesh: MeshParams,
    pub preset: TerrainPreset,
    /// Sea-level quantile overriding the preset's own
    pub sea_level: Option<f64>,
    pub clean_iterations: usize,
    pub contour_level: f64,
    pub noise: NoiseParams,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            mesh: MeshParams::default(),
            preset: TerrainPreset::default(),
            sea_level: None,
            clean_iterations: DEFAULT_CLEAN_ITERATIONS,
            contour_level: 0.0,
            noise: NoiseParams::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TerrainError::Config(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TerrainError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Reject values no pipeline can run with.
    pub fn validate(&self) -> Result<()> {
        if self.mesh.points == 0 {
            return Err(TerrainError::InvalidParameter("mesh needs at least one point".into()));
        }
        let Extent { width, height } = self.mesh.extent;
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(TerrainError::InvalidParameter(format!(
                "extent must be positive, got {}x{}",
                width, height
            )));
        }
        if let Some(q) = self.sea_level {
            if !(0.0..=1.0).contains(&q) {
                return Err(TerrainError::InvalidParameter(format!(
                    "sea level quantile must lie in [0, 1], got {}",
                    q
                )));
            }
        }
        if !self.contour_level.is_finite() {
            return Err(TerrainError::InvalidParameter("contour level must be finite".into()));
        }
        if self.noise.octaves == 0 {
            return Err(TerrainError::InvalidParameter("noise needs at least one octave".into()));
        }
        Ok(())
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            sea_level: self.sea_level,
            clean_iterations: self.clean_iterations,
            noise: self.noise,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GeneratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.contour_level, 0.0);
        assert_eq!(config.pipeline_options(), PipelineOptions::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = GeneratorConfig::from_json_str(
            r#"{ "seed": 42, "preset": "fjord", "mesh": { "points": 1000 } }"#,
        )
        .unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.preset, TerrainPreset::Fjord);
        assert_eq!(config.mesh.points, 1000);
        assert_eq!(config.mesh.extent, Extent::default());
        assert_eq!(config.clean_iterations, DEFAULT_CLEAN_ITERATIONS);
    }

    #[test]
    fn test_bad_json_is_a_config_error() {
        let err = GeneratorConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, TerrainError::Config(_)));

        let err = GeneratorConfig::from_json_file("/nonexistent/terrain.json").unwrap_err();
        assert!(matches!(err, TerrainError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = GeneratorConfig::default();
        config.mesh.points = 0;
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::default();
        config.mesh.extent = Extent::new(0.0, 1.0);
        assert!(config.validate().is_err());

        let config = GeneratorConfig {
            sea_level: Some(1.5),
            ..GeneratorConfig::default()
        };
        assert!(matches!(config.validate(), Err(TerrainError::InvalidParameter(_))));
    }
}
