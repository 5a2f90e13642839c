//! End-to-end detection over a small hand-built forest.

use cryptojack_detector::config::ArtifactsConfig;
use cryptojack_detector::feature_contract::FEATURES;
use cryptojack_detector::metrics::DetectionMetrics;
use cryptojack_detector::models::forest::{DecisionTree, ForestClassifier};
use cryptojack_detector::models::stages::{ColumnSelector, StandardScaler};
use cryptojack_detector::types::TelemetrySample;
use cryptojack_detector::{
    ArtifactBundle, ArtifactLoader, DetectionError, Detector, FeatureContract, InferencePipeline,
    FEATURE_COUNT,
};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

const TIME_ON_PROCESSOR: usize = 3;
const PAGE_ERRORS: usize = 12;

/// Single split on one selected column.
fn stump(feature: i64, threshold: f64, left: [f64; 2], right: [f64; 2]) -> DecisionTree {
    DecisionTree {
        children_left: vec![1, -1, -1],
        children_right: vec![2, -1, -1],
        feature: vec![feature, -2, -2],
        threshold: vec![threshold, -2.0, -2.0],
        value: vec![vec![0.0, 0.0], left.to_vec(), right.to_vec()],
    }
}

/// Identity scaler, selector keeping CPU time and page errors, two stumps.
///
/// Quiet host: tree 1 says [1, 0], tree 2 says [0.75, 0.25] => 87.5% normal.
/// Busy host: both trees say [0, 1] => 100% cryptojacking.
fn fixture_bundle() -> ArtifactBundle {
    ArtifactBundle::loaded(
        Box::new(
            StandardScaler::new(vec![0.0; FEATURE_COUNT], vec![1.0; FEATURE_COUNT]).unwrap(),
        ),
        Box::new(
            ColumnSelector::new(vec![TIME_ON_PROCESSOR, PAGE_ERRORS], FEATURE_COUNT).unwrap(),
        ),
        Box::new(
            ForestClassifier::new(
                2,
                vec![
                    stump(0, 0.5, [1.0, 0.0], [0.0, 1.0]),
                    stump(1, 100.0, [3.0, 1.0], [0.0, 4.0]),
                ],
            )
            .unwrap(),
        ),
    )
}

fn detector_with(bundle: ArtifactBundle) -> (Detector, Arc<DetectionMetrics>) {
    let metrics = Arc::new(DetectionMetrics::new());
    let detector = Detector::new(
        FeatureContract::default(),
        InferencePipeline::new(bundle),
        metrics.clone(),
    );
    (detector, metrics)
}

fn row(threat: bool) -> [f64; FEATURE_COUNT] {
    let mut values = [1.0; FEATURE_COUNT];
    if threat {
        values[TIME_ON_PROCESSOR] = 0.95;
        values[PAGE_ERRORS] = 800.0;
    } else {
        values[TIME_ON_PROCESSOR] = 0.2;
        values[PAGE_ERRORS] = 10.0;
    }
    values
}

/// CSV with ID, the feature columns in `order`, and Label.
fn table(rows: &[([f64; FEATURE_COUNT], u8)], order: &[usize]) -> String {
    let mut header = vec!["ID".to_string()];
    header.extend(order.iter().map(|&i| FEATURES[i].name.to_string()));
    header.push("Label".to_string());

    let mut out = header.join(",");
    out.push('\n');
    for (id, (values, label)) in rows.iter().enumerate() {
        let mut fields = vec![id.to_string()];
        fields.extend(order.iter().map(|&i| values[i].to_string()));
        fields.push(label.to_string());
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn canonical_order() -> Vec<usize> {
    (0..FEATURE_COUNT).collect()
}

#[test]
fn test_batch_counts_add_up() {
    let (detector, _) = detector_with(fixture_bundle());
    let rows: Vec<_> = (0..20).map(|i| (row(i % 2 == 0), (i % 2 == 0) as u8)).collect();

    let summary = detector
        .detect_table(table(&rows, &canonical_order()).as_bytes())
        .unwrap();

    assert_eq!(summary.total_samples, 20);
    assert_eq!(summary.cryptojacking_detected, 10);
    assert_eq!(summary.normal_samples, 10);
}

#[test]
fn test_header_only_table_is_empty_summary() {
    let (detector, _) = detector_with(fixture_bundle());
    let summary = detector
        .detect_table(table(&[], &canonical_order()).as_bytes())
        .unwrap();
    assert_eq!(summary.total_samples, 0);
    assert_eq!(summary.cryptojacking_detected, 0);
}

#[test]
fn test_column_order_does_not_matter() {
    let (detector, _) = detector_with(fixture_bundle());
    let rows = vec![(row(true), 1), (row(false), 0), (row(true), 1)];
    let reversed: Vec<usize> = (0..FEATURE_COUNT).rev().collect();

    let canonical = detector
        .detect_table(table(&rows, &canonical_order()).as_bytes())
        .unwrap();
    let permuted = detector
        .detect_table(table(&rows, &reversed).as_bytes())
        .unwrap();

    assert_eq!(canonical, permuted);
    assert_eq!(canonical.cryptojacking_detected, 2);
}

#[test]
fn test_all_zero_form_submission() {
    let (detector, _) = detector_with(fixture_bundle());
    let fields: HashMap<String, String> = FEATURES
        .iter()
        .map(|f| (f.form_key.to_string(), "0".to_string()))
        .collect();

    let verdict = detector.detect_single(&fields).unwrap();
    assert_eq!(verdict.label, "Normal Activity");
    assert_eq!(verdict.confidence, 87.5);
    assert!(!verdict.is_threat);

    // An empty submission defaults every field to 0.0
    assert_eq!(detector.detect_single(&HashMap::new()).unwrap(), verdict);
}

#[test]
fn test_form_submission_detects_threat() {
    let (detector, _) = detector_with(fixture_bundle());
    let fields = HashMap::from([
        ("time_on_processor".to_string(), "0.97".to_string()),
        ("page_errors_sec".to_string(), "1500".to_string()),
        ("bytes_sent".to_string(), "not a number".to_string()),
    ]);

    let verdict = detector.detect_single(&fields).unwrap();
    assert_eq!(verdict.label, "Cryptojacking Detected");
    assert_eq!(verdict.confidence, 100.0);
    assert!(verdict.is_threat);
}

#[test]
fn test_repeated_calls_are_identical() {
    let (detector, _) = detector_with(fixture_bundle());
    let sample = TelemetrySample::suspicious_example();

    let first = detector.detect_sample(&sample).unwrap();
    for _ in 0..5 {
        assert_eq!(detector.detect_sample(&sample).unwrap(), first);
    }
}

#[test]
fn test_bad_cell_fails_whole_table() {
    let (detector, metrics) = detector_with(fixture_bundle());
    let mut csv = table(&[(row(true), 1), (row(false), 0)], &canonical_order());
    csv = csv.replacen("0.2,", "abc,", 1);

    match detector.detect_table(csv.as_bytes()) {
        Err(DetectionError::ParseFailure { row, column, value }) => {
            assert_eq!(row, 2);
            assert_eq!(column, "Time on processor");
            assert_eq!(value, "abc");
        }
        other => panic!("expected parse failure, got {:?}", other),
    }
    assert_eq!(metrics.get_failures().get("parse_failure"), Some(&1));
}

#[test]
fn test_missing_column_is_schema_mismatch() {
    let (detector, _) = detector_with(fixture_bundle());
    let order: Vec<usize> = (1..FEATURE_COUNT).collect();
    let csv = table(&[(row(true), 1)], &order);

    assert!(matches!(
        detector.detect_table(csv.as_bytes()),
        Err(DetectionError::SchemaMismatch { .. })
    ));
}

#[test]
fn test_evaluation_accuracy() {
    let (detector, _) = detector_with(fixture_bundle());
    let rows = vec![
        (row(true), 1),
        (row(true), 1),
        (row(true), 1),
        (row(false), 0),
        (row(false), 0),
        // Mislabeled on purpose
        (row(false), 1),
    ];

    let report = detector
        .evaluate_table(table(&rows, &canonical_order()).as_bytes())
        .unwrap();

    assert_eq!(report.total_samples, 6);
    assert_eq!(report.actual_cryptojacking, 4);
    assert_eq!(report.predicted_cryptojacking, 3);
    assert_eq!(report.correct, 5);
    assert_eq!(report.accuracy, 83.3);
    assert!(!report.rows[5].is_correct());
}

#[test]
fn test_unavailable_bundle_fails_every_operation() {
    let (detector, metrics) = detector_with(ArtifactBundle::unavailable("scaler not available"));
    let csv = table(&[(row(true), 1)], &canonical_order());

    assert!(matches!(
        detector.detect_table(csv.as_bytes()),
        Err(DetectionError::ModelUnavailable { .. })
    ));
    assert!(matches!(
        detector.evaluate_table(csv.as_bytes()),
        Err(DetectionError::ModelUnavailable { .. })
    ));
    assert!(matches!(
        detector.detect_single(&HashMap::new()),
        Err(DetectionError::ModelUnavailable { .. })
    ));
    assert_eq!(metrics.get_failures().get("model_unavailable"), Some(&3));
}

#[test]
fn test_loader_builds_bundle_from_json_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let scaler = serde_json::json!({
        "kind": "standard",
        "mean": vec![0.0; FEATURE_COUNT],
        "scale": vec![1.0; FEATURE_COUNT],
    });
    let mut support = vec![false; FEATURE_COUNT];
    support[TIME_ON_PROCESSOR] = true;
    support[PAGE_ERRORS] = true;
    let selector = serde_json::json!({ "support": support });
    let forest = serde_json::json!({
        "n_features": 2,
        "trees": [
            {
                "children_left": [1, -1, -1],
                "children_right": [2, -1, -1],
                "feature": [0, -2, -2],
                "threshold": [0.5, -2.0, -2.0],
                "value": [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]
            }
        ]
    });

    fs::write(dir.path().join("scaler.json"), scaler.to_string()).unwrap();
    fs::write(dir.path().join("feature_selector.json"), selector.to_string()).unwrap();
    fs::write(dir.path().join("forest.json"), forest.to_string()).unwrap();

    let config = ArtifactsConfig {
        dir: dir.path().display().to_string(),
        classifier: "forest.json".to_string(),
        ..ArtifactsConfig::default()
    };
    let bundle = ArtifactLoader::new().load(&config);
    assert!(bundle.is_loaded(), "{:?}", bundle.unavailable_reason());

    let (detector, _) = detector_with(bundle);
    let summary = detector
        .detect_table(table(&[(row(true), 1), (row(false), 0)], &canonical_order()).as_bytes())
        .unwrap();
    assert_eq!(summary.cryptojacking_detected, 1);
    assert_eq!(summary.normal_samples, 1);
}

#[test]
fn test_loader_reports_missing_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config = ArtifactsConfig {
        dir: dir.path().display().to_string(),
        ..ArtifactsConfig::default()
    };

    let bundle = ArtifactLoader::new().load(&config);
    assert!(!bundle.is_loaded());
    let reason = bundle.unavailable_reason().unwrap();
    assert!(reason.contains("scaler"));
    assert!(reason.contains("feature selector"));
}
