//! Inference pipeline: scaler → feature selector → classifier

use crate::error::{DetectionError, DetectionResult};
use crate::feature_contract::FeatureVector;
use crate::models::bundle::ArtifactBundle;
use crate::types::verdict::ThreatLabel;
use std::sync::Arc;
use tracing::debug;

/// Classifier output for one feature vector
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub label: ThreatLabel,
    /// `[p(normal), p(cryptojacking)]`
    pub probabilities: [f64; 2],
}

impl PredictionResult {
    /// Ties resolve to normal, matching argmax over class order.
    pub fn from_probabilities(probabilities: [f64; 2]) -> Self {
        let label = if probabilities[1] > probabilities[0] {
            ThreatLabel::Cryptojacking
        } else {
            ThreatLabel::Normal
        };
        Self {
            label,
            probabilities,
        }
    }

    /// Probability mass on the predicted class, in [0, 1].
    pub fn confidence(&self) -> f64 {
        self.probabilities[self.label.class_index()].clamp(0.0, 1.0)
    }

    pub fn is_threat(&self) -> bool {
        self.label.is_threat()
    }
}

/// Runs the fixed stage sequence over batches of feature vectors.
///
/// A pure function of the bundle and the input; the bundle is shared
/// read-only and never re-fitted.
#[derive(Debug, Clone)]
pub struct InferencePipeline {
    bundle: Arc<ArtifactBundle>,
}

impl InferencePipeline {
    pub fn new(bundle: ArtifactBundle) -> Self {
        Self::shared(Arc::new(bundle))
    }

    pub fn shared(bundle: Arc<ArtifactBundle>) -> Self {
        Self { bundle }
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    pub fn is_available(&self) -> bool {
        self.bundle.is_loaded()
    }

    /// Fail fast with `ModelUnavailable` before any input is read.
    pub fn ensure_available(&self) -> DetectionResult<()> {
        self.bundle.stages().map(|_| ())
    }

    /// Classify one vector.
    pub fn infer_one(&self, vector: &FeatureVector) -> DetectionResult<PredictionResult> {
        let mut results = self.infer(std::slice::from_ref(vector))?;
        results.pop().ok_or(DetectionError::DimensionMismatch {
            stage: "classifier rows",
            expected: 1,
            actual: 0,
        })
    }

    /// Classify a batch. Either every vector gets a result or the call fails.
    pub fn infer(&self, vectors: &[FeatureVector]) -> DetectionResult<Vec<PredictionResult>> {
        let stages = self.bundle.stages()?;
        if vectors.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<Vec<f64>> = vectors.iter().map(|v| v.values().to_vec()).collect();
        check_widths("scaler", &rows, stages.scaler.width())?;

        let scaled = stages.scaler.transform(&rows);
        check_rows("scaler output", rows.len(), &scaled)?;
        check_widths("selector", &scaled, stages.selector.input_width())?;

        let selected = stages.selector.transform(&scaled);
        check_rows("selector output", rows.len(), &selected)?;
        check_widths("selector output", &selected, stages.selector.output_width())?;
        check_widths("classifier", &selected, stages.classifier.input_width())?;

        let probabilities = stages.classifier.predict_proba(&selected)?;
        check_rows("classifier output", rows.len(), &probabilities)?;

        let results = probabilities
            .into_iter()
            .map(|p| match p.as_slice() {
                [normal, threat] if normal.is_finite() && threat.is_finite() => {
                    Ok(PredictionResult::from_probabilities([*normal, *threat]))
                }
                [_, _] => Err(DetectionError::unavailable(format!(
                    "{} classifier produced non-finite probabilities",
                    stages.classifier.name()
                ))),
                other => Err(DetectionError::DimensionMismatch {
                    stage: "classifier classes",
                    expected: 2,
                    actual: other.len(),
                }),
            })
            .collect::<DetectionResult<Vec<_>>>()?;

        debug!(
            rows = results.len(),
            scaler = stages.scaler.name(),
            selector = stages.selector.name(),
            classifier = stages.classifier.name(),
            selected_features = stages.selector.output_width(),
            "Inference complete"
        );

        Ok(results)
    }
}

fn check_widths(stage: &'static str, rows: &[Vec<f64>], expected: usize) -> DetectionResult<()> {
    match rows.iter().find(|r| r.len() != expected) {
        Some(row) => Err(DetectionError::DimensionMismatch {
            stage,
            expected,
            actual: row.len(),
        }),
        None => Ok(()),
    }
}

fn check_rows<T>(stage: &'static str, expected: usize, rows: &[T]) -> DetectionResult<()> {
    if rows.len() != expected {
        return Err(DetectionError::DimensionMismatch {
            stage,
            expected,
            actual: rows.len(),
        });
    }
    Ok(())
}
