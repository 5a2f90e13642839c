//! Feature contract for cryptojacking model inference.
//!
//! This module pins down the 14 telemetry columns the trained scaler,
//! selector and classifier were fitted on, and aligns raw records to them.
//! Column order is significant: the stages index features positionally.

use crate::error::{DetectionError, DetectionResult};
use serde::Serialize;

/// Number of features the pipeline accepts.
pub const FEATURE_COUNT: usize = 14;

/// One column of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSpec {
    /// Column header as it appears in telemetry tables
    pub name: &'static str,
    /// Field key used by interactive form submissions
    pub form_key: &'static str,
}

/// Canonical column order, matching the training table (minus ID and Label).
pub const FEATURES: [FeatureSpec; FEATURE_COUNT] = [
    FeatureSpec {
        name: "I/O Data Operations",
        form_key: "io_data_operations",
    },
    FeatureSpec {
        name: "I/O Data Bytes",
        form_key: "io_data_bytes",
    },
    FeatureSpec {
        name: "Number of subprocesses",
        form_key: "number_of_subprocesses",
    },
    FeatureSpec {
        name: "Time on processor",
        form_key: "time_on_processor",
    },
    FeatureSpec {
        name: "Disk Reading/sec",
        form_key: "disk_reading_sec",
    },
    FeatureSpec {
        name: "Disc Writing/sec",
        form_key: "disc_writing_sec",
    },
    FeatureSpec {
        name: "Bytes Sent",
        form_key: "bytes_sent",
    },
    FeatureSpec {
        name: "Received Bytes (HTTP)",
        form_key: "received_bytes_http",
    },
    FeatureSpec {
        name: "Network packets sent",
        form_key: "network_packets_sent",
    },
    FeatureSpec {
        name: "Network packets received",
        form_key: "network_packets_received",
    },
    FeatureSpec {
        name: "Pages Read/sec",
        form_key: "pages_read_sec",
    },
    FeatureSpec {
        name: "Pages Input/sec",
        form_key: "pages_input_sec",
    },
    FeatureSpec {
        name: "Page Errors/sec",
        form_key: "page_errors_sec",
    },
    FeatureSpec {
        name: "Confirmed byte radius",
        form_key: "confirmed_byte_radius",
    },
];

/// Ordered feature values aligned to [`FEATURES`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values.to_vec())
    }

    pub fn zeros() -> Self {
        Self(vec![0.0; FEATURE_COUNT])
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value of a named contract column, if this vector is contract-wide.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURES
            .iter()
            .position(|f| f.name == name)
            .and_then(|i| self.0.get(i).copied())
    }
}

/// Unchecked construction; width is validated by the inference pipeline.
impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// A raw record: named textual values in arbitrary order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: Vec<(String, String)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field to the record
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Rebuild a record under canonical column names.
    pub fn from_vector(vector: &FeatureVector) -> Self {
        FEATURES
            .iter()
            .zip(vector.values())
            .map(|(f, v)| (f.name.to_string(), v.to_string()))
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Resolved positions of each contract column within a header row.
///
/// Built once per table and applied to every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    positions: [usize; FEATURE_COUNT],
    width: usize,
}

impl ColumnPlan {
    /// Number of columns a row must carry.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Pull the contract columns out of one row in canonical order.
    ///
    /// `row` is 1-based and only used for error reporting.
    pub fn extract<'a, I>(&self, values: I, row: usize) -> DetectionResult<FeatureVector>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let values: Vec<&str> = values.into_iter().collect();
        if values.len() != self.width {
            return Err(DetectionError::schema(format!(
                "row {} has {} fields, header has {}",
                row,
                values.len(),
                self.width
            )));
        }

        let mut out = Vec::with_capacity(FEATURE_COUNT);
        for (feature, &pos) in FEATURES.iter().zip(self.positions.iter()) {
            out.push(parse_strict(values[pos], row, feature.name)?);
        }
        Ok(FeatureVector(out))
    }
}

/// The fixed schema plus the names of non-feature columns to strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureContract {
    excluded: Vec<String>,
    label_column: String,
}

impl FeatureContract {
    pub fn new(excluded: Vec<String>, label_column: impl Into<String>) -> Self {
        Self {
            excluded,
            label_column: label_column.into(),
        }
    }

    /// Canonical feature names in pipeline order.
    pub fn names(&self) -> Vec<&'static str> {
        FEATURES.iter().map(|f| f.name).collect()
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn excluded_columns(&self) -> &[String] {
        &self.excluded
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    /// Resolve a form key or column name to its canonical index.
    pub fn index_of(&self, key: &str) -> Option<usize> {
        let key = key.trim();
        FEATURES
            .iter()
            .position(|f| f.form_key == key || f.name == key)
    }

    /// Map header names to contract positions.
    ///
    /// Excluded columns are skipped; anything else that is not a contract
    /// column, and any contract column that is absent or repeated, is a
    /// schema mismatch.
    pub fn plan<'a, I>(&self, headers: I) -> DetectionResult<ColumnPlan>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut positions: [Option<usize>; FEATURE_COUNT] = [None; FEATURE_COUNT];
        let mut width = 0;

        for (pos, header) in headers.into_iter().enumerate() {
            width += 1;
            let header = header.trim();

            if self.excluded.iter().any(|e| e == header) {
                continue;
            }

            match FEATURES.iter().position(|f| f.name == header) {
                Some(idx) if positions[idx].is_some() => {
                    return Err(DetectionError::schema(format!(
                        "duplicate column '{}'",
                        header
                    )));
                }
                Some(idx) => positions[idx] = Some(pos),
                None => {
                    return Err(DetectionError::schema(format!(
                        "unexpected column '{}'",
                        header
                    )));
                }
            }
        }

        let missing: Vec<&str> = FEATURES
            .iter()
            .zip(positions.iter())
            .filter(|(_, p)| p.is_none())
            .map(|(f, _)| f.name)
            .collect();
        if !missing.is_empty() {
            return Err(DetectionError::schema(format!(
                "missing required columns: {}",
                missing.join(", ")
            )));
        }

        let mut resolved = [0usize; FEATURE_COUNT];
        for (slot, pos) in resolved.iter_mut().zip(positions.iter()) {
            *slot = pos.unwrap_or_default();
        }

        Ok(ColumnPlan {
            positions: resolved,
            width,
        })
    }

    /// Position of the label column within a header row.
    pub fn label_position<'a, I>(&self, headers: I) -> DetectionResult<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        headers
            .into_iter()
            .position(|h| h.trim() == self.label_column)
            .ok_or_else(|| {
                DetectionError::schema(format!(
                    "label column '{}' not found",
                    self.label_column
                ))
            })
    }

    /// Align one raw record to the contract, strictly.
    pub fn align(&self, record: &RawRecord) -> DetectionResult<FeatureVector> {
        self.plan(record.names())?.extract(record.values(), 1)
    }
}

impl Default for FeatureContract {
    fn default() -> Self {
        Self::new(vec!["ID".to_string(), "Label".to_string()], "Label")
    }
}

/// Batch-path parse: the value must be a finite number.
pub(crate) fn parse_strict(value: &str, row: usize, column: &str) -> DetectionResult<f64> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(DetectionError::ParseFailure {
            row,
            column: column.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Interactive-path parse: anything unusable becomes 0.0.
pub(crate) fn parse_lenient(value: &str) -> f64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
