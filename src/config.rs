//! Analyzer configuration.
//!
//! Configuration is loaded from TOML with the following resolution order:
//! 1. explicit path (must exist)
//! 2. `~/.freshcheck/config.toml` (user)
//! 3. `/etc/freshcheck/config.toml` (system)
//! 4. built-in defaults
//!
//! Every field has a default, so a partial file only overrides what it names.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::Device;
use crate::{AnalysisError, Result};

/// Environment variable overriding the model download directory.
pub const CACHE_DIR_ENV: &str = "FRESHCHECK_CACHE_DIR";

/// Top-level analyzer configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub ensemble: EnsembleConfig,
    #[serde(default)]
    pub models: ModelsConfig,
}

/// Image normalisation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PreprocessConfig {
    /// Longest side after resizing, in pixels (default: 512).
    #[serde(default = "default_max_size")]
    pub max_size: u32,
    /// JPEG quality of the re-encoded image, 1-100 (default: 90).
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Per-channel multiplier (default: 1.1).
    #[serde(default = "default_gain")]
    pub gain: f32,
    /// Per-channel additive offset (default: 10).
    #[serde(default = "default_offset")]
    pub offset: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            jpeg_quality: default_jpeg_quality(),
            gain: default_gain(),
            offset: default_offset(),
        }
    }
}

fn default_max_size() -> u32 {
    512
}

fn default_jpeg_quality() -> u8 {
    90
}

fn default_gain() -> f32 {
    1.1
}

fn default_offset() -> f32 {
    10.0
}

/// Ensemble merge settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EnsembleConfig {
    /// Weight applied to primary-model scores (default: 1.2).
    #[serde(default = "default_primary_weight")]
    pub primary_weight: f64,
    /// Weight applied to secondary-model scores (default: 1.0).
    #[serde(default = "default_unit_weight")]
    pub secondary_weight: f64,
    /// Weight applied to pixel-statistics scores (default: 1.0).
    #[serde(default = "default_unit_weight")]
    pub fallback_weight: f64,
    /// Candidates must score strictly above this (default: 0.3).
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Number of candidates kept (default: 3).
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            primary_weight: default_primary_weight(),
            secondary_weight: default_unit_weight(),
            fallback_weight: default_unit_weight(),
            min_confidence: default_min_confidence(),
            top_n: default_top_n(),
        }
    }
}

fn default_primary_weight() -> f64 {
    1.2
}

fn default_unit_weight() -> f64 {
    1.0
}

fn default_min_confidence() -> f64 {
    0.3
}

fn default_top_n() -> usize {
    3
}

/// Learned model settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Preferred device for the primary model: "cpu" or "cuda" (default: "cpu").
    #[serde(default = "default_device")]
    pub device: String,
    /// GPU index when `device = "cuda"`.
    #[serde(default)]
    pub device_id: u32,
    /// Directory for model downloads.
    #[serde(default)]
    pub models_dir: Option<PathBuf>,
    /// Replace the primary model with local files.
    #[serde(default)]
    pub primary: Option<LocalModelConfig>,
    /// Replace the secondary model with local files.
    #[serde(default)]
    pub secondary: Option<LocalModelConfig>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            device_id: 0,
            models_dir: None,
            primary: None,
            secondary: None,
        }
    }
}

fn default_device() -> String {
    "cpu".to_string()
}

/// A model stored on local disk.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalModelConfig {
    /// Path to the ONNX graph.
    pub model_path: PathBuf,
    /// Path to a HuggingFace-style `config.json` carrying `id2label`.
    pub labels_path: PathBuf,
}

impl ModelsConfig {
    /// Parse the configured device.
    pub fn device(&self) -> Result<Device> {
        Device::parse(&self.device, self.device_id)
    }

    /// Directory models are downloaded into.
    pub fn cache_dir(&self) -> PathBuf {
        self.models_dir.clone().unwrap_or_else(default_cache_dir)
    }
}

/// `$FRESHCHECK_CACHE_DIR`, else the platform cache directory.
pub fn default_cache_dir() -> PathBuf {
    std::env::var(CACHE_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("freshcheck")
                .join("models")
        })
}

impl AnalyzerConfig {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path that does not exist is an error; when no file is
    /// found anywhere the defaults are used.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load and validate a specific file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AnalysisError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            AnalysisError::Configuration(msg) => {
                AnalysisError::Configuration(format!("{path:?}: {msg}"))
            }
            other => other,
        })
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AnalysisError::Configuration(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.preprocess.max_size == 0 {
            return Err(AnalysisError::Configuration(
                "preprocess.max_size must be positive".to_string(),
            ));
        }
        if !(1..=100).contains(&self.preprocess.jpeg_quality) {
            return Err(AnalysisError::Configuration(format!(
                "preprocess.jpeg_quality must be in 1..=100, got {}",
                self.preprocess.jpeg_quality
            )));
        }
        if self.ensemble.top_n == 0 {
            return Err(AnalysisError::Configuration(
                "ensemble.top_n must be positive".to_string(),
            ));
        }
        self.models.device()?;
        Ok(())
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(AnalysisError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".freshcheck").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/freshcheck/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}
