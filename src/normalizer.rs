//! Row normalization for the batch (table) and interactive (form) paths.
//!
//! The two paths differ on purpose: tables are strict and all-or-nothing,
//! while form submissions are expected to be partial and default to 0.0.

use crate::error::{DetectionError, DetectionResult};
use crate::feature_contract::{
    parse_lenient, parse_strict, FeatureContract, FeatureVector, FEATURES, FEATURE_COUNT,
};
use crate::types::verdict::ThreatLabel;
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;

/// Converts raw inputs into contract-aligned feature vectors.
#[derive(Debug, Clone, Default)]
pub struct RowNormalizer {
    contract: FeatureContract,
}

impl RowNormalizer {
    pub fn new(contract: FeatureContract) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> &FeatureContract {
        &self.contract
    }

    /// Normalize a delimited table with a header row.
    ///
    /// One bad row fails the whole table.
    pub fn normalize_table<R: Read>(&self, reader: R) -> DetectionResult<Vec<FeatureVector>> {
        let (vectors, _) = self.read_table(reader, false)?;
        Ok(vectors)
    }

    /// Normalize a table that also carries the label column, returning the
    /// known labels alongside the vectors.
    pub fn normalize_labeled_table<R: Read>(
        &self,
        reader: R,
    ) -> DetectionResult<(Vec<FeatureVector>, Vec<ThreatLabel>)> {
        self.read_table(reader, true)
    }

    /// Normalize one form submission keyed by form key or column name.
    ///
    /// Missing, empty or unparseable values become 0.0. Unknown keys are ignored.
    /// When several keys name the same column, a form key beats a column name,
    /// then the smallest key wins.
    pub fn normalize_single(&self, fields: &HashMap<String, String>) -> FeatureVector {
        let mut chosen: [Option<(u8, &str, &str)>; FEATURE_COUNT] = [None; FEATURE_COUNT];
        for (key, value) in fields {
            let Some(idx) = self.contract.index_of(key) else {
                debug!(field = %key, "Ignoring unknown form field");
                continue;
            };
            let rank = u8::from(FEATURES[idx].form_key != key.trim());
            let outranked = matches!(
                chosen[idx],
                Some((r, k, _)) if (r, k) <= (rank, key.as_str())
            );
            if !outranked {
                chosen[idx] = Some((rank, key.as_str(), value.as_str()));
            }
        }

        let mut values = [0.0; FEATURE_COUNT];
        for (slot, choice) in values.iter_mut().zip(chosen) {
            if let Some((_, _, value)) = choice {
                *slot = parse_lenient(value);
            }
        }
        FeatureVector::new(values)
    }

    fn read_table<R: Read>(
        &self,
        reader: R,
        labeled: bool,
    ) -> DetectionResult<(Vec<FeatureVector>, Vec<ThreatLabel>)> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| DetectionError::schema(format!("unreadable header: {}", e)))?
            .clone();

        let plan = self.contract.plan(headers.iter())?;
        let label_pos = if labeled {
            Some(self.contract.label_position(headers.iter())?)
        } else {
            None
        };

        let mut vectors = Vec::new();
        let mut labels = Vec::new();

        for (i, record) in csv_reader.records().enumerate() {
            let row = i + 1;
            let record = record
                .map_err(|e| DetectionError::schema(format!("malformed row {}: {}", row, e)))?;

            vectors.push(plan.extract(record.iter(), row)?);

            if let Some(pos) = label_pos {
                let raw = record.get(pos).unwrap_or_default();
                labels.push(parse_label(raw, row, self.contract.label_column())?);
            }
        }

        debug!(rows = vectors.len(), labeled = labeled, "Table normalized");
        Ok((vectors, labels))
    }
}

fn parse_label(raw: &str, row: usize, column: &str) -> DetectionResult<ThreatLabel> {
    let value = parse_strict(raw, row, column)?;
    if value == 0.0 {
        Ok(ThreatLabel::Normal)
    } else if value == 1.0 {
        Ok(ThreatLabel::Cryptojacking)
    } else {
        Err(DetectionError::ParseFailure {
            row,
            column: column.to_string(),
            value: raw.to_string(),
        })
    }
}
