//! Artifact bundle: the three trained stages, all present or none

use crate::error::{DetectionError, DetectionResult};
use crate::feature_contract::FEATURE_COUNT;
use crate::models::stages::{Classifier, FeatureSelector, Scaler};
use std::fmt;
use tracing::warn;

/// Scaler, selector and classifier with agreeing widths.
pub struct Stages {
    pub scaler: Box<dyn Scaler>,
    pub selector: Box<dyn FeatureSelector>,
    pub classifier: Box<dyn Classifier>,
}

impl Stages {
    /// Each stage must accept exactly what the previous one produces.
    pub fn check_widths(&self) -> DetectionResult<()> {
        let pairs = [
            ("scaler", FEATURE_COUNT, self.scaler.width()),
            ("selector", self.scaler.width(), self.selector.input_width()),
            ("classifier", self.selector.output_width(), self.classifier.input_width()),
        ];
        for (stage, expected, actual) in pairs {
            if expected != actual {
                return Err(DetectionError::DimensionMismatch {
                    stage,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Immutable inference artifacts, loaded once per process.
pub enum ArtifactBundle {
    Loaded(Stages),
    Unavailable { reason: String },
}

impl ArtifactBundle {
    /// Assemble a bundle from fully loaded stages.
    ///
    /// Stages whose widths do not chain are rejected as unavailable.
    pub fn loaded(
        scaler: Box<dyn Scaler>,
        selector: Box<dyn FeatureSelector>,
        classifier: Box<dyn Classifier>,
    ) -> Self {
        let stages = Stages {
            scaler,
            selector,
            classifier,
        };
        match stages.check_widths() {
            Ok(()) => ArtifactBundle::Loaded(stages),
            Err(e) => Self::unavailable(format!("inconsistent stage widths: {}", e)),
        }
    }

    /// Assemble from optional stages; any absent stage makes the whole
    /// bundle unavailable.
    pub fn from_parts(
        scaler: Option<Box<dyn Scaler>>,
        selector: Option<Box<dyn FeatureSelector>>,
        classifier: Option<Box<dyn Classifier>>,
    ) -> Self {
        match (scaler, selector, classifier) {
            (Some(scaler), Some(selector), Some(classifier)) => {
                Self::loaded(scaler, selector, classifier)
            }
            (scaler, selector, classifier) => {
                let missing: Vec<&str> = [
                    ("scaler", scaler.is_none()),
                    ("feature selector", selector.is_none()),
                    ("classifier", classifier.is_none()),
                ]
                .iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| *name)
                .collect();
                Self::unavailable(format!("{} not available", missing.join(", ")))
            }
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(reason = %reason, "Artifact bundle unavailable");
        ArtifactBundle::Unavailable { reason }
    }

    /// The loaded stages, or `ModelUnavailable`.
    pub fn stages(&self) -> DetectionResult<&Stages> {
        match self {
            ArtifactBundle::Loaded(stages) => Ok(stages),
            ArtifactBundle::Unavailable { reason } => {
                Err(DetectionError::unavailable(reason.clone()))
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ArtifactBundle::Loaded(_))
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            ArtifactBundle::Loaded(_) => None,
            ArtifactBundle::Unavailable { reason } => Some(reason),
        }
    }
}

impl fmt::Debug for ArtifactBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactBundle::Loaded(stages) => f
                .debug_struct("Loaded")
                .field("scaler", &stages.scaler.name())
                .field("selector", &stages.selector.name())
                .field("classifier", &stages.classifier.name())
                .field("selected_features", &stages.selector.output_width())
                .finish(),
            ArtifactBundle::Unavailable { reason } => {
                f.debug_struct("Unavailable").field("reason", reason).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::forest::{DecisionTree, ForestClassifier};
    use crate::models::stages::{ColumnSelector, StandardScaler};

    fn scaler(width: usize) -> Box<dyn Scaler> {
        Box::new(StandardScaler::new(vec![0.0; width], vec![1.0; width]).unwrap())
    }

    fn classifier(width: usize) -> Box<dyn Classifier> {
        let leaf = DecisionTree {
            children_left: vec![-1],
            children_right: vec![-1],
            feature: vec![-2],
            threshold: vec![-2.0],
            value: vec![vec![1.0, 0.0]],
        };
        Box::new(ForestClassifier::new(width, vec![leaf]).unwrap())
    }

    #[test]
    fn test_loaded_bundle() {
        let bundle = ArtifactBundle::loaded(
            scaler(FEATURE_COUNT),
            Box::new(ColumnSelector::new(vec![0, 3, 5], FEATURE_COUNT).unwrap()),
            classifier(3),
        );
        assert!(bundle.is_loaded());
        assert!(bundle.stages().is_ok());
        assert!(format!("{:?}", bundle).contains("random_forest"));
    }

    #[test]
    fn test_missing_stage_makes_bundle_unavailable() {
        let bundle = ArtifactBundle::from_parts(
            Some(scaler(FEATURE_COUNT)),
            None,
            Some(classifier(FEATURE_COUNT)),
        );
        assert!(!bundle.is_loaded());
        assert_eq!(
            bundle.unavailable_reason(),
            Some("feature selector not available")
        );
        assert!(matches!(
            bundle.stages(),
            Err(DetectionError::ModelUnavailable { .. })
        ));
    }

    #[test]
    fn test_nothing_loaded() {
        let bundle = ArtifactBundle::from_parts(None, None, None);
        assert_eq!(
            bundle.unavailable_reason(),
            Some("scaler, feature selector, classifier not available")
        );
    }

    #[test]
    fn test_width_disagreement_is_unavailable() {
        let bundle = ArtifactBundle::loaded(
            scaler(FEATURE_COUNT),
            Box::new(ColumnSelector::new(vec![0, 1], FEATURE_COUNT).unwrap()),
            classifier(5),
        );
        let reason = bundle.unavailable_reason().unwrap();
        assert!(reason.contains("Dimension mismatch at classifier: expected 2, got 5"));

        let bundle = ArtifactBundle::loaded(
            scaler(10),
            Box::new(ColumnSelector::identity(10)),
            classifier(10),
        );
        assert!(!bundle.is_loaded());
        assert!(bundle
            .unavailable_reason()
            .unwrap()
            .contains("at scaler: expected 14, got 10"));
    }
}
