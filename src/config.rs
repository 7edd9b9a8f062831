//! Runtime configuration for the identification engine.
//!
//! All knobs carry serde defaults so a partial TOML file (or none at all)
//! yields a working configuration.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyConfig {
    /// Directory holding per-user JSON history files (`<username>.json`).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Path of the persisted trained-model artifact.
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Acceptance band half-width in standard deviations (statistical method).
    #[serde(default = "default_std_multiplier")]
    pub std_multiplier: f64,

    /// Minimum acceptance for a named statistical verdict.
    #[serde(default = "default_statistical_threshold")]
    pub statistical_threshold: f64,

    /// Minimum similarity for a named n-gram verdict.
    #[serde(default = "default_ngram_threshold")]
    pub ngram_threshold: f64,

    /// Optional minimum ensemble confidence for a named ML verdict.
    /// `None` keeps the historical behavior of always naming a user.
    #[serde(default)]
    pub ml_threshold: Option<f64>,

    /// Minimum total n-gram training rows across all users.
    #[serde(default = "default_min_training_samples")]
    pub min_training_samples: usize,

    /// Neighbors consulted by the distance-based classifier.
    #[serde(default = "default_knn_k")]
    pub knn_k: usize,

    /// Fraction of training rows held out for internal validation.
    #[serde(default = "default_holdout_fraction")]
    pub holdout_fraction: f64,

    /// Maximum length of the ranked match shortlist.
    #[serde(default = "default_shortlist_len")]
    pub shortlist_len: usize,
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            model_path: default_model_path(),
            std_multiplier: default_std_multiplier(),
            statistical_threshold: default_statistical_threshold(),
            ngram_threshold: default_ngram_threshold(),
            ml_threshold: None,
            min_training_samples: default_min_training_samples(),
            knn_k: default_knn_k(),
            holdout_fraction: default_holdout_fraction(),
            shortlist_len: default_shortlist_len(),
        }
    }
}

impl IdentifyConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from a TOML file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                log::warn!("Failed to load config from {}: {e}", path.display());
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_model_path() -> PathBuf {
    PathBuf::from("data/model.json")
}

fn default_std_multiplier() -> f64 {
    2.0
}

fn default_statistical_threshold() -> f64 {
    0.7
}

fn default_ngram_threshold() -> f64 {
    0.6
}

fn default_min_training_samples() -> usize {
    10
}

fn default_knn_k() -> usize {
    3
}

fn default_holdout_fraction() -> f64 {
    0.2
}

fn default_shortlist_len() -> usize {
    5
}
