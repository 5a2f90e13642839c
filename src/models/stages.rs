//! Pipeline stage traits and the fitted transforms shipped with the crate

use crate::error::DetectionResult;
use anyhow::{bail, Result};
use serde::Deserialize;

/// Fitted scaler. Preserves width.
pub trait Scaler: Send + Sync {
    fn name(&self) -> &str;

    fn width(&self) -> usize;

    /// Apply training-time statistics to every row. Never re-fits.
    fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>>;
}

/// Fitted feature selector. Narrows and may reorder columns.
pub trait FeatureSelector: Send + Sync {
    fn name(&self) -> &str;

    fn input_width(&self) -> usize;

    fn output_width(&self) -> usize;

    fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>>;
}

/// Trained classifier over the selector's output.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    fn input_width(&self) -> usize;

    /// One probability row per input row, indexed by class
    /// (0 = normal, 1 = cryptojacking).
    fn predict_proba(&self, rows: &[Vec<f64>]) -> DetectionResult<Vec<Vec<f64>>>;
}

/// Persisted scaler parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerParams {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

impl ScalerParams {
    pub fn build(self) -> Result<Box<dyn Scaler>> {
        match self {
            ScalerParams::Standard { mean, scale } => {
                Ok(Box::new(StandardScaler::new(mean, scale)?))
            }
            ScalerParams::MinMax { min, scale } => Ok(Box::new(MinMaxScaler::new(min, scale)?)),
        }
    }
}

fn check_params(name: &str, a: &[f64], b: &[f64]) -> Result<()> {
    if a.is_empty() {
        bail!("{} has no columns", name);
    }
    if a.len() != b.len() {
        bail!(
            "{} parameter lengths differ ({} vs {})",
            name,
            a.len(),
            b.len()
        );
    }
    if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
        bail!("{} parameters must be finite", name);
    }
    Ok(())
}

/// Standardization with per-column mean and scale.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        check_params("standard scaler", &mean, &scale)?;
        // Constant columns were fitted with scale 0; treat as unit scale.
        let scale = scale
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();
        Ok(Self { mean, scale })
    }
}

impl Scaler for StandardScaler {
    fn name(&self) -> &str {
        "standard"
    }

    fn width(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .zip(self.mean.iter().zip(self.scale.iter()))
                    .map(|(x, (m, s))| (x - m) / s)
                    .collect()
            })
            .collect()
    }
}

/// Min-max rescaling, fitted as `scale = 1 / (max - min)` and `min = -min * scale`.
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    min: Vec<f64>,
    scale: Vec<f64>,
}

impl MinMaxScaler {
    pub fn new(min: Vec<f64>, scale: Vec<f64>) -> Result<Self> {
        check_params("min-max scaler", &min, &scale)?;
        Ok(Self { min, scale })
    }
}

impl Scaler for MinMaxScaler {
    fn name(&self) -> &str {
        "min_max"
    }

    fn width(&self) -> usize {
        self.min.len()
    }

    fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .zip(self.min.iter().zip(self.scale.iter()))
                    .map(|(x, (m, s))| x * s + m)
                    .collect()
            })
            .collect()
    }
}

/// Persisted selector parameters: explicit indices or a boolean support mask
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SelectorParams {
    Indices {
        indices: Vec<usize>,
        input_width: usize,
    },
    Support {
        support: Vec<bool>,
    },
}

impl SelectorParams {
    pub fn build(self) -> Result<Box<dyn FeatureSelector>> {
        let selector = match self {
            SelectorParams::Indices {
                indices,
                input_width,
            } => ColumnSelector::new(indices, input_width)?,
            SelectorParams::Support { support } => ColumnSelector::from_support(&support)?,
        };
        Ok(Box::new(selector))
    }
}

/// Picks a fixed subset of columns, in the order given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelector {
    indices: Vec<usize>,
    input_width: usize,
}

impl ColumnSelector {
    pub fn new(indices: Vec<usize>, input_width: usize) -> Result<Self> {
        if indices.is_empty() {
            bail!("selector keeps no columns");
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= input_width) {
            bail!(
                "selector index {} out of range for width {}",
                bad,
                input_width
            );
        }
        Ok(Self {
            indices,
            input_width,
        })
    }

    pub fn from_support(support: &[bool]) -> Result<Self> {
        let indices = support
            .iter()
            .enumerate()
            .filter(|(_, keep)| **keep)
            .map(|(i, _)| i)
            .collect();
        Self::new(indices, support.len())
    }

    /// Keep every column unchanged.
    pub fn identity(width: usize) -> Self {
        Self {
            indices: (0..width).collect(),
            input_width: width,
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl FeatureSelector for ColumnSelector {
    fn name(&self) -> &str {
        "column"
    }

    fn input_width(&self) -> usize {
        self.input_width
    }

    fn output_width(&self) -> usize {
        self.indices.len()
    }

    fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| self.indices.iter().filter_map(|&i| row.get(i).copied()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_scaler() {
        let scaler = StandardScaler::new(vec![1.0, 10.0, 5.0], vec![2.0, 5.0, 0.0]).unwrap();
        let out = scaler.transform(&[vec![3.0, 0.0, 7.0]]);
        assert_eq!(out, vec![vec![1.0, -2.0, 2.0]]);
        assert_eq!(scaler.width(), 3);
    }

    #[test]
    fn test_min_max_scaler() {
        let scaler = MinMaxScaler::new(vec![0.0, -1.0], vec![0.5, 0.25]).unwrap();
        let out = scaler.transform(&[vec![2.0, 8.0], vec![0.0, 4.0]]);
        assert_eq!(out, vec![vec![1.0, 1.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn test_scaler_params_validation() {
        assert!(StandardScaler::new(vec![1.0], vec![1.0, 2.0]).is_err());
        assert!(StandardScaler::new(vec![], vec![]).is_err());
        assert!(MinMaxScaler::new(vec![f64::NAN], vec![1.0]).is_err());
    }

    #[test]
    fn test_scaler_params_from_json() {
        let params: ScalerParams =
            serde_json::from_str(r#"{"kind":"standard","mean":[0.0,1.0],"scale":[1.0,2.0]}"#)
                .unwrap();
        let scaler = params.build().unwrap();
        assert_eq!(scaler.name(), "standard");
        assert_eq!(scaler.transform(&[vec![1.0, 5.0]]), vec![vec![1.0, 2.0]]);
    }

    #[test]
    fn test_column_selector_reorders() {
        let selector = ColumnSelector::new(vec![3, 0, 2], 4).unwrap();
        let out = selector.transform(&[vec![10.0, 11.0, 12.0, 13.0]]);
        assert_eq!(out, vec![vec![13.0, 10.0, 12.0]]);
        assert_eq!(selector.output_width(), 3);
        assert_eq!(selector.input_width(), 4);
    }

    #[test]
    fn test_column_selector_from_support() {
        let selector = ColumnSelector::from_support(&[true, false, true, false]).unwrap();
        assert_eq!(selector.indices(), &[0, 2]);
        assert_eq!(selector.input_width(), 4);

        assert!(ColumnSelector::from_support(&[false, false]).is_err());
        assert!(ColumnSelector::new(vec![5], 4).is_err());
    }

    #[test]
    fn test_selector_params_from_json() {
        let params: SelectorParams =
            serde_json::from_str(r#"{"indices":[1,0],"input_width":3}"#).unwrap();
        let selector = params.build().unwrap();
        assert_eq!(selector.output_width(), 2);

        let params: SelectorParams =
            serde_json::from_str(r#"{"support":[false,true,true]}"#).unwrap();
        let selector = params.build().unwrap();
        assert_eq!(selector.transform(&[vec![1.0, 2.0, 3.0]]), vec![vec![2.0, 3.0]]);
    }
}
