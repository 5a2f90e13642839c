//! Type definitions for the cryptojacking detector

pub mod telemetry;
pub mod verdict;

pub use telemetry::TelemetrySample;
pub use verdict::{
    BatchSummary, DetectionReport, EvaluationReport, ReportPayload, RowOutcome, ThreatLabel,
    Verdict,
};
