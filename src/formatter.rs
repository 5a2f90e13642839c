//! Result formatting: per-record verdicts, batch summaries and evaluations

use crate::error::{DetectionError, DetectionResult};
use crate::models::inference::PredictionResult;
use crate::types::verdict::{BatchSummary, EvaluationReport, RowOutcome, ThreatLabel, Verdict};

/// Round to `decimals` places, ties to even.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Confidence as a percentage rounded to two decimals.
pub fn confidence_percent(result: &PredictionResult) -> f64 {
    round_to(result.confidence() * 100.0, 2)
}

/// Verdict for a single record.
pub fn format_verdict(result: &PredictionResult) -> Verdict {
    Verdict {
        label: result.label.display_name().to_string(),
        confidence: confidence_percent(result),
        is_threat: result.is_threat(),
    }
}

/// Aggregate counts over a batch.
pub fn summarize_batch(results: &[PredictionResult]) -> BatchSummary {
    let total_samples = results.len();
    let cryptojacking_detected = results.iter().filter(|r| r.is_threat()).count();

    BatchSummary {
        total_samples,
        cryptojacking_detected,
        normal_samples: total_samples - cryptojacking_detected,
    }
}

/// Compare predictions with known labels. Accuracy is a percentage with
/// one decimal, 0.0 for an empty table.
pub fn evaluate_labels(
    results: &[PredictionResult],
    actual: &[ThreatLabel],
) -> DetectionResult<EvaluationReport> {
    if results.len() != actual.len() {
        return Err(DetectionError::DimensionMismatch {
            stage: "evaluation labels",
            expected: results.len(),
            actual: actual.len(),
        });
    }

    let rows: Vec<RowOutcome> = results
        .iter()
        .zip(actual)
        .map(|(result, &actual)| RowOutcome {
            actual,
            predicted: result.label,
            confidence: confidence_percent(result),
        })
        .collect();

    let total_samples = rows.len();
    let correct = rows.iter().filter(|r| r.is_correct()).count();
    let accuracy = if total_samples > 0 {
        round_to(correct as f64 / total_samples as f64 * 100.0, 1)
    } else {
        0.0
    };

    Ok(EvaluationReport {
        total_samples,
        actual_cryptojacking: actual.iter().filter(|l| l.is_threat()).count(),
        predicted_cryptojacking: results.iter().filter(|r| r.is_threat()).count(),
        correct,
        accuracy,
        rows,
    })
}
