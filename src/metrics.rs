//! Detection statistics: volumes, latency and confidence distribution.

use crate::models::inference::PredictionResult;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::info;

/// Metrics collector for detection calls
pub struct DetectionMetrics {
    /// Table submissions processed
    pub batches_processed: AtomicU64,
    /// Single-record checks processed
    pub single_checks: AtomicU64,
    /// Rows classified across all calls
    pub rows_classified: AtomicU64,
    /// Rows predicted as cryptojacking
    pub threats_detected: AtomicU64,
    /// Failed calls by error kind
    failures_by_kind: RwLock<HashMap<String, u64>>,
    /// Call latency (in microseconds)
    latencies: RwLock<Vec<u64>>,
    /// Confidence distribution buckets (0-10%, ..., 90-100%)
    confidence_buckets: RwLock<[u64; 10]>,
}

impl DetectionMetrics {
    pub fn new() -> Self {
        Self {
            batches_processed: AtomicU64::new(0),
            single_checks: AtomicU64::new(0),
            rows_classified: AtomicU64::new(0),
            threats_detected: AtomicU64::new(0),
            failures_by_kind: RwLock::new(HashMap::new()),
            latencies: RwLock::new(Vec::with_capacity(1000)),
            confidence_buckets: RwLock::new([0; 10]),
        }
    }

    /// Record a classified table
    pub fn record_batch(&self, elapsed: Duration, results: &[PredictionResult]) {
        self.batches_processed.fetch_add(1, Ordering::Relaxed);
        self.record_results(elapsed, results);
    }

    /// Record a classified single record
    pub fn record_single(&self, elapsed: Duration, result: &PredictionResult) {
        self.single_checks.fetch_add(1, Ordering::Relaxed);
        self.record_results(elapsed, std::slice::from_ref(result));
    }

    pub fn record_failure(&self, kind: &str) {
        if let Ok(mut failures) = self.failures_by_kind.write() {
            *failures.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    fn record_results(&self, elapsed: Duration, results: &[PredictionResult]) {
        let threats = results.iter().filter(|r| r.is_threat()).count() as u64;
        self.rows_classified
            .fetch_add(results.len() as u64, Ordering::Relaxed);
        self.threats_detected.fetch_add(threats, Ordering::Relaxed);

        if let Ok(mut times) = self.latencies.write() {
            times.push(elapsed.as_micros() as u64);
            // Keep only the most recent samples
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        if let Ok(mut buckets) = self.confidence_buckets.write() {
            for result in results {
                let bucket = (result.confidence() * 10.0).min(9.0) as usize;
                buckets[bucket] += 1;
            }
        }
    }

    /// Latency statistics over recorded calls
    pub fn get_latency_stats(&self) -> LatencyStats {
        let mut sorted = match self.latencies.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return LatencyStats::default(),
        };
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    pub fn get_confidence_distribution(&self) -> [u64; 10] {
        self.confidence_buckets
            .read()
            .map(|b| *b)
            .unwrap_or_default()
    }

    pub fn get_failures(&self) -> HashMap<String, u64> {
        self.failures_by_kind
            .read()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    /// Share of classified rows predicted as cryptojacking, in percent
    pub fn threat_rate(&self) -> f64 {
        let rows = self.rows_classified.load(Ordering::Relaxed);
        if rows == 0 {
            return 0.0;
        }
        self.threats_detected.load(Ordering::Relaxed) as f64 / rows as f64 * 100.0
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let latency = self.get_latency_stats();
        let failures = self.get_failures();
        let distribution = self.get_confidence_distribution();

        info!(
            batches = self.batches_processed.load(Ordering::Relaxed),
            single_checks = self.single_checks.load(Ordering::Relaxed),
            rows = self.rows_classified.load(Ordering::Relaxed),
            threats = self.threats_detected.load(Ordering::Relaxed),
            threat_rate = format!("{:.1}%", self.threat_rate()),
            "Detection summary"
        );
        info!(
            calls = latency.count,
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            p99_us = latency.p99_us,
            max_us = latency.max_us,
            "Detection latency"
        );

        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let pct = count as f64 / total as f64 * 100.0;
            info!(
                "Confidence {:>3}-{:<3}%: {:>6} ({:>5.1}%) {}",
                i * 10,
                (i + 1) * 10,
                count,
                pct,
                "█".repeat(((pct / 5.0) as usize).min(20))
            );
        }

        for (kind, count) in &failures {
            info!(kind = %kind, count = count, "Detection failures");
        }
    }
}

impl Default for DetectionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Call latency statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(p_threat: f64) -> PredictionResult {
        PredictionResult::from_probabilities([1.0 - p_threat, p_threat])
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = DetectionMetrics::new();

        metrics.record_batch(
            Duration::from_micros(300),
            &[result(0.9), result(0.2), result(0.75)],
        );
        metrics.record_single(Duration::from_micros(100), &result(0.1));
        metrics.record_failure("schema_mismatch");

        assert_eq!(metrics.batches_processed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.single_checks.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.rows_classified.load(Ordering::Relaxed), 4);
        assert_eq!(metrics.threats_detected.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.threat_rate(), 50.0);
        assert_eq!(metrics.get_failures().get("schema_mismatch"), Some(&1));
    }

    #[test]
    fn test_confidence_buckets() {
        let metrics = DetectionMetrics::new();
        metrics.record_batch(Duration::from_micros(10), &[result(1.0), result(0.55)]);

        let distribution = metrics.get_confidence_distribution();
        assert_eq!(distribution[9], 1);
        assert_eq!(distribution[5], 1);
    }

    #[test]
    fn test_latency_stats() {
        let metrics = DetectionMetrics::new();
        assert_eq!(metrics.get_latency_stats(), LatencyStats::default());

        for us in [100, 200, 300, 400] {
            metrics.record_single(Duration::from_micros(us), &result(0.3));
        }
        let stats = metrics.get_latency_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.max_us, 400);
    }
}
