//! Configuration management for the cryptojacking detector

use crate::feature_contract::FeatureContract;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub contract: ContractConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Trained artifact locations
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory containing the artifact files
    #[serde(default = "default_artifacts_dir")]
    pub dir: String,
    /// Scaler parameters (JSON)
    #[serde(default = "default_scaler")]
    pub scaler: String,
    /// Feature selector parameters (JSON)
    #[serde(default = "default_selector")]
    pub selector: String,
    /// Classifier: `.onnx` graph or `.json` forest
    #[serde(default = "default_classifier")]
    pub classifier: String,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_artifacts_dir() -> String {
    "models".to_string()
}

fn default_scaler() -> String {
    "scaler.json".to_string()
}

fn default_selector() -> String {
    "feature_selector.json".to_string()
}

fn default_classifier() -> String {
    "random_forest.onnx".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: default_artifacts_dir(),
            scaler: default_scaler(),
            selector: default_selector(),
            classifier: default_classifier(),
            onnx_threads: default_onnx_threads(),
        }
    }
}

/// Non-feature columns of telemetry tables
#[derive(Debug, Clone, Deserialize)]
pub struct ContractConfig {
    /// Columns stripped before alignment
    #[serde(default = "default_excluded_columns")]
    pub excluded_columns: Vec<String>,
    /// Column holding known labels, read during evaluation
    #[serde(default = "default_label_column")]
    pub label_column: String,
}

fn default_excluded_columns() -> Vec<String> {
    vec!["ID".to_string(), "Label".to_string()]
}

fn default_label_column() -> String {
    "Label".to_string()
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            excluded_columns: default_excluded_columns(),
            label_column: default_label_column(),
        }
    }
}

impl ContractConfig {
    /// Build the feature contract. The label column is always excluded
    /// from features.
    pub fn to_contract(&self) -> FeatureContract {
        let mut excluded = self.excluded_columns.clone();
        if !excluded.contains(&self.label_column) {
            excluded.push(self.label_column.clone());
        }
        FeatureContract::new(excluded, self.label_column.clone())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Load from an explicit path, else the default file if present, else defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(),
            None => Ok(Self::default()),
        }
    }
}
