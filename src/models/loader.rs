//! Artifact loader: builds the bundle from files on disk

use crate::config::ArtifactsConfig;
use crate::models::bundle::ArtifactBundle;
use crate::models::forest::{ForestClassifier, ForestParams};
use crate::models::onnx::OnnxClassifier;
use crate::models::stages::{Classifier, FeatureSelector, Scaler, ScalerParams, SelectorParams};
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

/// Loader for the scaler, feature selector and classifier artifacts
pub struct ArtifactLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ArtifactLoader {
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load all three stages. Never fails: any broken or missing artifact
    /// yields an unavailable bundle whose reason names the stage.
    pub fn load(&self, config: &ArtifactsConfig) -> ArtifactBundle {
        let dir = Path::new(&config.dir);
        let mut failures = Vec::new();

        let scaler = record(
            "scaler",
            self.load_scaler(&dir.join(&config.scaler)),
            &mut failures,
        );
        let selector = record(
            "feature selector",
            self.load_selector(&dir.join(&config.selector)),
            &mut failures,
        );

        // The classifier consumes the selector's output; without a selector
        // there is nothing to size an ONNX input against.
        let classifier = match &selector {
            Some(selector) => record(
                "classifier",
                self.load_classifier(&dir.join(&config.classifier), selector.output_width()),
                &mut failures,
            ),
            None => None,
        };

        if !failures.is_empty() {
            return ArtifactBundle::unavailable(failures.join("; "));
        }

        let bundle = ArtifactBundle::from_parts(scaler, selector, classifier);
        if bundle.is_loaded() {
            info!(bundle = ?bundle, dir = %dir.display(), "Artifact bundle loaded successfully");
        }
        bundle
    }

    /// Load a scaler from its JSON parameters
    pub fn load_scaler(&self, path: &Path) -> Result<Box<dyn Scaler>> {
        let params: ScalerParams = read_json(path)?;
        let scaler = params.build()?;
        info!(kind = scaler.name(), width = scaler.width(), "Scaler loaded");
        Ok(scaler)
    }

    /// Load a feature selector from its JSON parameters
    pub fn load_selector(&self, path: &Path) -> Result<Box<dyn FeatureSelector>> {
        let params: SelectorParams = read_json(path)?;
        let selector = params.build()?;
        info!(
            input_width = selector.input_width(),
            output_width = selector.output_width(),
            "Feature selector loaded"
        );
        Ok(selector)
    }

    /// Load a classifier; the format follows the file extension.
    pub fn load_classifier(&self, path: &Path, input_width: usize) -> Result<Box<dyn Classifier>> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("onnx") => {
                if !path.exists() {
                    bail!("model file not found: {}", path.display());
                }
                ort::init().commit()?;
                info!(onnx_threads = self.onnx_threads, "ONNX Runtime initialized");
                let classifier = OnnxClassifier::load(path, self.onnx_threads, input_width)?;
                Ok(Box::new(classifier))
            }
            Some("json") => {
                let params: ForestParams = read_json(path)?;
                let forest = ForestClassifier::from_params(params)?;
                info!(
                    trees = forest.tree_count(),
                    features = forest.input_width(),
                    "Forest classifier loaded"
                );
                Ok(Box::new(forest))
            }
            other => bail!(
                "unsupported classifier format {:?} for {}",
                other.unwrap_or(""),
                path.display()
            ),
        }
    }
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).context(format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .context(format!("Failed to parse {}", path.display()))
}

fn record<T>(stage: &str, result: Result<T>, failures: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(stage = %stage, error = %format!("{:#}", e), "Failed to load artifact");
            failures.push(format!("{} not available: {:#}", stage, e));
            None
        }
    }
}
