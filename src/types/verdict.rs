//! Detection result data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Class predicted for one telemetry sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLabel {
    Normal,
    Cryptojacking,
}

impl ThreatLabel {
    /// Map a classifier class index (0 = normal, 1 = cryptojacking)
    pub fn from_class_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(ThreatLabel::Normal),
            1 => Some(ThreatLabel::Cryptojacking),
            _ => None,
        }
    }

    pub fn class_index(&self) -> usize {
        match self {
            ThreatLabel::Normal => 0,
            ThreatLabel::Cryptojacking => 1,
        }
    }

    pub fn is_threat(&self) -> bool {
        matches!(self, ThreatLabel::Cryptojacking)
    }

    /// User-facing wording
    pub fn display_name(&self) -> &'static str {
        match self {
            ThreatLabel::Normal => "Normal Activity",
            ThreatLabel::Cryptojacking => "Cryptojacking Detected",
        }
    }
}

/// Verdict for a single telemetry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// "Cryptojacking Detected" or "Normal Activity"
    pub label: String,
    /// Probability of the predicted class, as a percentage (2 decimals)
    pub confidence: f64,
    pub is_threat: bool,
}

/// Aggregate counts over a table of records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_samples: usize,
    pub cryptojacking_detected: usize,
    pub normal_samples: usize,
}

/// Outcome for one labeled row during evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowOutcome {
    pub actual: ThreatLabel,
    pub predicted: ThreatLabel,
    /// Percentage, 2 decimals
    pub confidence: f64,
}

impl RowOutcome {
    pub fn is_correct(&self) -> bool {
        self.actual == self.predicted
    }
}

/// Predictions compared against known labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub total_samples: usize,
    pub actual_cryptojacking: usize,
    pub predicted_cryptojacking: usize,
    pub correct: usize,
    /// Percentage, 1 decimal
    pub accuracy: f64,
    pub rows: Vec<RowOutcome>,
}

/// Payload carried by a [`DetectionReport`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportPayload {
    Single(Verdict),
    Batch(BatchSummary),
    Evaluation(EvaluationReport),
}

/// Envelope emitted by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Source of the input (file path, "form" or "demo")
    pub source: String,
    pub payload: ReportPayload,
}

impl DetectionReport {
    pub fn new(source: impl Into<String>, payload: ReportPayload) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}
