//! Cryptojacking Detector Library
//!
//! Classifies host resource telemetry (CPU, disk, network and paging
//! counters) as normal activity or cryptojacking using a pre-trained
//! scaler, feature selector and classifier.

pub mod config;
pub mod detector;
pub mod error;
pub mod feature_contract;
pub mod formatter;
pub mod metrics;
pub mod models;
pub mod normalizer;
pub mod types;

pub use config::AppConfig;
pub use detector::Detector;
pub use error::{DetectionError, DetectionResult};
pub use feature_contract::{FeatureContract, FeatureVector, RawRecord, FEATURE_COUNT};
pub use models::{ArtifactBundle, ArtifactLoader, InferencePipeline, PredictionResult};
pub use normalizer::RowNormalizer;
pub use types::{BatchSummary, EvaluationReport, TelemetrySample, ThreatLabel, Verdict};
