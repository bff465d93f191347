//! Engine configuration.
//!
//! Loaded from a TOML file; every section is optional and falls back to the
//! defaults below.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub detector: DetectorConfig,
    pub isolator: IsolatorConfig,
    pub comparison: ComparisonConfig,
    pub staging: StagingConfig,
    pub ink: InkConfig,
}

/// Minimum confidence handed to the signature detector, per document kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    /// Applied when detecting inside an isolated ID card
    pub id_min_confidence: f32,
    /// Applied when detecting on a full document page
    pub document_min_confidence: f32,
}

/// Credential region isolation parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IsolatorConfig {
    /// Pixels brighter than this are background
    pub background_threshold: u8,
    /// Chebyshev radius of the dilation square (2 => 5x5)
    pub dilate_radius: u8,
    pub dilate_iterations: u32,
    /// Treat registration card captures as photographs and isolate the card
    /// before detection
    pub isolate_registration_card: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Side length both signatures are resized to before scoring
    pub canonical_size: u32,
    /// Minimum SSIM score considered a match (0.0-1.0)
    pub match_threshold: f64,
    /// Write a grayscale/binarized comparison panel next to the artifacts
    pub visualize: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StagingConfig {
    /// Directory under which per-run staging directories are created
    pub root: PathBuf,
    /// Persist detected signature crops for human audit
    pub save_artifacts: bool,
}

/// Parameters of the built-in heuristic ink detector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InkConfig {
    /// Pixels at or below this gray level count as ink
    pub ink_threshold: u8,
    /// Dilation radius used to merge strokes into one blob
    pub merge_radius: u8,
    /// Minimum blob bounding-box area relative to the image area
    pub min_area_fraction: f32,
    /// Minimum width / height of a signature blob
    pub min_aspect_ratio: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            id_min_confidence: 0.5,
            document_min_confidence: 0.5,
        }
    }
}

impl Default for IsolatorConfig {
    fn default() -> Self {
        Self {
            background_threshold: 240,
            dilate_radius: 2,
            dilate_iterations: 2,
            isolate_registration_card: false,
        }
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            canonical_size: 300,
            match_threshold: 0.7,
            visualize: false,
        }
    }
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("temp"),
            save_artifacts: true,
        }
    }
}

impl Default for InkConfig {
    fn default() -> Self {
        Self {
            ink_threshold: 110,
            merge_radius: 6,
            min_area_fraction: 0.002,
            min_aspect_ratio: 1.2,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| EngineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&contents).map_err(|e| match e {
            EngineError::ConfigParse { source, .. } => EngineError::ConfigParse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            toml::from_str(contents).map_err(|source| EngineError::ConfigParse {
                path: PathBuf::new(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> EngineResult<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.detector.id_min_confidence)
            || !unit.contains(&self.detector.document_min_confidence)
        {
            return Err(EngineError::InvalidConfig(
                "detector confidences must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.comparison.match_threshold) {
            return Err(EngineError::InvalidConfig(
                "match threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.comparison.canonical_size < 7 {
            return Err(EngineError::InvalidConfig(
                "canonical size must be at least 7 pixels".to_string(),
            ));
        }
        if self.isolator.dilate_radius == 0 && self.isolator.dilate_iterations > 0 {
            return Err(EngineError::InvalidConfig(
                "dilate radius must be positive when dilation is enabled".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.ink.min_area_fraction) || self.ink.min_aspect_ratio <= 0.0 {
            return Err(EngineError::InvalidConfig(
                "ink detector area fraction must be in [0, 1) and aspect ratio positive"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
