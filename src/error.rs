//! Error taxonomy for the detection core

use thiserror::Error;

/// Errors surfaced by contract alignment, normalization and inference.
///
/// None of these are fatal to the process; callers decide how to present them
/// and must resubmit corrected input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    /// Input fields do not line up with the feature contract
    #[error("Schema mismatch: {reason}")]
    SchemaMismatch { reason: String },

    /// The artifact bundle is missing or only partially loaded
    #[error("Model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    /// A vector's width disagrees with what a pipeline stage expects
    #[error("Dimension mismatch at {stage}: expected {expected}, got {actual}")]
    DimensionMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A batch value could not be read as a finite number
    #[error("Parse failure at row {row}, column '{column}': {value:?} is not a number")]
    ParseFailure {
        row: usize,
        column: String,
        value: String,
    },
}

impl DetectionError {
    pub fn schema(reason: impl Into<String>) -> Self {
        DetectionError::SchemaMismatch {
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        DetectionError::ModelUnavailable {
            reason: reason.into(),
        }
    }

    /// Short machine-readable kind, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            DetectionError::SchemaMismatch { .. } => "schema_mismatch",
            DetectionError::ModelUnavailable { .. } => "model_unavailable",
            DetectionError::DimensionMismatch { .. } => "dimension_mismatch",
            DetectionError::ParseFailure { .. } => "parse_failure",
        }
    }
}

pub type DetectionResult<T> = std::result::Result<T, DetectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DetectionError::DimensionMismatch {
            stage: "scaler",
            expected: 14,
            actual: 13,
        };
        assert_eq!(
            err.to_string(),
            "Dimension mismatch at scaler: expected 14, got 13"
        );

        let err = DetectionError::ParseFailure {
            row: 3,
            column: "Bytes Sent".to_string(),
            value: "abc".to_string(),
        };
        assert!(err.to_string().contains("row 3"));
        assert!(err.to_string().contains("Bytes Sent"));
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(DetectionError::schema("x").kind(), "schema_mismatch");
        assert_eq!(DetectionError::unavailable("x").kind(), "model_unavailable");
    }
}
