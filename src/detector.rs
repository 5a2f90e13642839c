//! Detector: normalizer, inference pipeline and formatter behind the three
//! user-facing operations (table detection, single check, evaluation).

use crate::error::DetectionResult;
use crate::feature_contract::FeatureContract;
use crate::formatter;
use crate::metrics::DetectionMetrics;
use crate::models::inference::{InferencePipeline, PredictionResult};
use crate::normalizer::RowNormalizer;
use crate::types::telemetry::TelemetrySample;
use crate::types::verdict::{BatchSummary, EvaluationReport, Verdict};
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub struct Detector {
    normalizer: RowNormalizer,
    pipeline: InferencePipeline,
    metrics: Arc<DetectionMetrics>,
}

impl Detector {
    pub fn new(
        contract: FeatureContract,
        pipeline: InferencePipeline,
        metrics: Arc<DetectionMetrics>,
    ) -> Self {
        Self {
            normalizer: RowNormalizer::new(contract),
            pipeline,
            metrics,
        }
    }

    pub fn pipeline(&self) -> &InferencePipeline {
        &self.pipeline
    }

    pub fn metrics(&self) -> &DetectionMetrics {
        &self.metrics
    }

    /// Classify every row of a telemetry table and summarize.
    pub fn detect_table<R: Read>(&self, reader: R) -> DetectionResult<BatchSummary> {
        let start = Instant::now();
        let results = self.observe("table", || {
            self.pipeline.ensure_available()?;
            let vectors = self.normalizer.normalize_table(reader)?;
            self.pipeline.infer(&vectors)
        })?;
        self.metrics.record_batch(start.elapsed(), &results);

        let summary = formatter::summarize_batch(&results);
        info!(
            rows = summary.total_samples,
            detected = summary.cryptojacking_detected,
            normal = summary.normal_samples,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Table classified"
        );
        Ok(summary)
    }

    /// Classify one form submission.
    pub fn detect_single(&self, fields: &HashMap<String, String>) -> DetectionResult<Verdict> {
        let vector = self.normalizer.normalize_single(fields);
        let result = self.classify("form", || self.pipeline.infer_one(&vector))?;
        Ok(formatter::format_verdict(&result))
    }

    /// Classify a typed sample, returning the raw prediction.
    pub fn detect_sample(&self, sample: &TelemetrySample) -> DetectionResult<PredictionResult> {
        let vector = sample.to_vector();
        self.classify("sample", || self.pipeline.infer_one(&vector))
    }

    /// Classify a labeled table and compare against the known labels.
    pub fn evaluate_table<R: Read>(&self, reader: R) -> DetectionResult<EvaluationReport> {
        let start = Instant::now();
        let (results, report) = self.observe("evaluation", || {
            self.pipeline.ensure_available()?;
            let (vectors, labels) = self.normalizer.normalize_labeled_table(reader)?;
            let results = self.pipeline.infer(&vectors)?;
            let report = formatter::evaluate_labels(&results, &labels)?;
            Ok((results, report))
        })?;
        self.metrics.record_batch(start.elapsed(), &results);

        info!(
            rows = report.total_samples,
            actual_cryptojacking = report.actual_cryptojacking,
            predicted_cryptojacking = report.predicted_cryptojacking,
            accuracy = report.accuracy,
            "Labeled table evaluated"
        );
        Ok(report)
    }

    fn classify<F>(&self, source: &'static str, f: F) -> DetectionResult<PredictionResult>
    where
        F: FnOnce() -> DetectionResult<PredictionResult>,
    {
        let start = Instant::now();
        let result = self.observe(source, f)?;
        self.metrics.record_single(start.elapsed(), &result);

        info!(
            source = source,
            label = ?result.label,
            confidence = formatter::confidence_percent(&result),
            "Record classified"
        );
        Ok(result)
    }

    /// Run an operation, logging and counting any failure.
    fn observe<T, F>(&self, source: &'static str, f: F) -> DetectionResult<T>
    where
        F: FnOnce() -> DetectionResult<T>,
    {
        f().map_err(|e| {
            self.metrics.record_failure(e.kind());
            warn!(source = source, kind = e.kind(), error = %e, "Detection failed");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectionError;
    use crate::models::bundle::ArtifactBundle;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_unavailable_bundle_counts_failures() {
        let metrics = Arc::new(DetectionMetrics::new());
        let detector = Detector::new(
            FeatureContract::default(),
            InferencePipeline::new(ArtifactBundle::unavailable("no artifacts")),
            metrics.clone(),
        );

        assert!(matches!(
            detector.detect_single(&HashMap::new()),
            Err(DetectionError::ModelUnavailable { .. })
        ));
        assert!(matches!(
            detector.detect_sample(&TelemetrySample::default()),
            Err(DetectionError::ModelUnavailable { .. })
        ));
        // Checked before the table is read, so even garbage input reports it
        assert!(matches!(
            detector.detect_table("not,a,telemetry,table".as_bytes()),
            Err(DetectionError::ModelUnavailable { .. })
        ));
        assert_eq!(metrics.get_failures().get("model_unavailable"), Some(&3));
        assert_eq!(metrics.rows_classified.load(Ordering::Relaxed), 0);
    }
}
