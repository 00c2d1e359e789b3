//! Configuration structures for sample generation.
//!
//! All probability and range knobs live in a typed, validated record with
//! explicit defaults. Unknown keys in a JSON config file are rejected.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::utils::error::{Error, Result};

/// Transformation parameters for the augmentation pipeline.
///
/// Fixed at construction and never mutated during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformConfig {
    /// Enable random horizontal flips
    pub flip: bool,
    /// Enable random vertical flips (drawn only when `flip` is also enabled)
    pub flip_vertical: bool,
    /// Probability of each flip draw
    pub flip_prob: f64,
    /// Maximum rotation in degrees; the angle is a uniform integer in [-max_rotate, max_rotate]
    pub max_rotate: i32,
    /// Probability of applying the smoothing blur
    pub blur_prob: f64,
    /// Gaussian blur strength
    pub blur_sigma: f32,
    /// Per-axis probability of trimming an edge before placement
    pub edge_crop_prob: f64,
    /// Minimum fraction of an axis removed by an edge crop
    pub min_edge_crop: f64,
    /// Maximum fraction of an axis removed by an edge crop
    pub max_edge_crop: f64,
    /// Minimum fraction of the background canvas the foreground is scaled to cover
    pub min_coverage: f64,
    /// Maximum fraction of the background canvas the foreground is scaled to cover
    pub max_coverage: f64,
    /// Probability that the resize scales both axes independently
    pub stretch_prob: f64,
    /// Probability of each lighting (brightness/contrast) draw
    pub lighting_prob: f64,
    /// Maximum relative brightness/contrast change
    pub max_lighting: f64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            flip: true,
            flip_vertical: true,
            flip_prob: 0.5,
            max_rotate: 90,
            blur_prob: 0.05,
            blur_sigma: 2.0,
            edge_crop_prob: 0.3,
            min_edge_crop: 0.0,
            max_edge_crop: 0.5,
            min_coverage: 0.95,
            max_coverage: 0.99,
            stretch_prob: 0.4,
            lighting_prob: 0.4,
            max_lighting: 0.6,
        }
    }
}

impl TransformConfig {
    /// Checks all probabilities and ranges.
    pub fn validate(&self) -> Result<()> {
        check_prob("flip_prob", self.flip_prob)?;
        check_prob("blur_prob", self.blur_prob)?;
        check_prob("edge_crop_prob", self.edge_crop_prob)?;
        check_prob("stretch_prob", self.stretch_prob)?;
        check_prob("lighting_prob", self.lighting_prob)?;
        check_prob("max_lighting", self.max_lighting)?;

        if self.max_rotate < 0 {
            return Err(Error::Config(format!(
                "max_rotate must be non-negative, got {}",
                self.max_rotate
            )));
        }
        if self.blur_sigma <= 0.0 {
            return Err(Error::Config(format!(
                "blur_sigma must be positive, got {}",
                self.blur_sigma
            )));
        }
        if self.min_edge_crop < 0.0
            || self.max_edge_crop > 1.0
            || self.min_edge_crop > self.max_edge_crop
        {
            return Err(Error::Config(format!(
                "edge crop range [{}, {}] must be ordered and within [0, 1]",
                self.min_edge_crop, self.max_edge_crop
            )));
        }
        if self.min_coverage <= 0.0
            || self.max_coverage > 1.0
            || self.min_coverage > self.max_coverage
        {
            return Err(Error::Config(format!(
                "coverage range [{}, {}] must be ordered and within (0, 1]",
                self.min_coverage, self.max_coverage
            )));
        }

        Ok(())
    }

    /// Loads and validates a config from a JSON file. Unknown keys are rejected.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }
}

fn check_prob(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::Config(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

/// Run-level options for the sample orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Number of samples to generate
    pub num_samples: usize,
    /// Root output directory
    pub output_dir: PathBuf,
    /// Treat foreground subdirectories as class labels
    pub subdir_is_class: bool,
    /// Random seed for reproducibility; drawn from OS entropy when unset
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_samples: 10,
            output_dir: PathBuf::from("output/samples"),
            subdir_is_class: false,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TransformConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.flip_prob, 0.5);
        assert_eq!(config.max_rotate, 90);
        assert_eq!(config.max_lighting, 0.6);
    }

    #[test]
    fn test_probability_out_of_range() {
        let config = TransformConfig {
            flip_prob: 1.5,
            ..TransformConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TransformConfig {
            lighting_prob: -0.1,
            ..TransformConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_ranges_rejected() {
        let config = TransformConfig {
            min_coverage: 0.99,
            max_coverage: 0.95,
            ..TransformConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TransformConfig {
            min_edge_crop: 0.6,
            max_edge_crop: 0.5,
            ..TransformConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_rotation_rejected() {
        let config = TransformConfig {
            max_rotate: -10,
            ..TransformConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = TransformConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: TransformConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.max_rotate, config.max_rotate);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let json = r#"{"flip_prob": 0.5, "not_a_knob": 1.0}"#;
        let parsed: std::result::Result<TransformConfig, _> = serde_json::from_str(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tfms.json");
        fs::write(&path, r#"{"max_rotate": 15, "flip": false}"#).unwrap();

        let config = TransformConfig::from_json_file(&path).unwrap();
        assert_eq!(config.max_rotate, 15);
        assert!(!config.flip);
        // Unspecified knobs fall back to defaults
        assert_eq!(config.blur_prob, 0.05);
    }

    #[test]
    fn test_from_json_file_validates() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"edge_crop_prob": 2.0}"#).unwrap();
        assert!(TransformConfig::from_json_file(&path).is_err());
    }

    #[test]
    fn test_generator_config_default() {
        let config = GeneratorConfig::default();
        assert_eq!(config.num_samples, 10);
        assert!(!config.subdir_is_class);
        assert!(config.seed.is_none());
    }
}
