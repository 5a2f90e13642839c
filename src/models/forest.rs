//! Native random forest over array-encoded decision trees
//!
//! Trees use the flat layout of fitted tree estimators: parallel arrays
//! indexed by node id, with `-1` children marking a leaf.

use crate::error::{DetectionError, DetectionResult};
use crate::models::stages::Classifier;
use anyhow::{bail, Result};
use serde::Deserialize;

const LEAF: i64 = -1;
const NUM_CLASSES: usize = 2;

/// One decision tree in flat array form
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    /// Feature tested at each internal node
    pub feature: Vec<i64>,
    /// Go left when `x[feature] <= threshold`
    pub threshold: Vec<f64>,
    /// Per-node class weights; only leaves are read
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn validate(&self, n_features: usize) -> Result<()> {
        let n = self.children_left.len();
        if n == 0 {
            bail!("tree has no nodes");
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            bail!("tree arrays have inconsistent lengths");
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF {
                if right != LEAF {
                    bail!("node {} has only one child", node);
                }
                if self.value[node].len() != NUM_CLASSES {
                    bail!(
                        "leaf {} has {} class weights, expected {}",
                        node,
                        self.value[node].len(),
                        NUM_CLASSES
                    );
                }
                if self.value[node].iter().any(|w| !w.is_finite() || *w < 0.0) {
                    bail!("leaf {} has invalid class weights {:?}", node, self.value[node]);
                }
                continue;
            }

            // Children always follow their parent, so traversal terminates.
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    bail!("node {} has invalid child {}", node, child);
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                bail!("node {} tests feature {} of {}", node, feature, n_features);
            }
        }
        Ok(())
    }

    /// Normalized class distribution of the leaf reached by `row`.
    fn leaf_distribution(&self, row: &[f64]) -> [f64; NUM_CLASSES] {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let x = row[self.feature[node] as usize];
            node = if x <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }

        let weights = &self.value[node];
        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            [weights[0] / total, weights[1] / total]
        } else {
            [0.5, 0.5]
        }
    }
}

/// Persisted forest
#[derive(Debug, Clone, Deserialize)]
pub struct ForestParams {
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

/// Averages leaf class distributions across trees.
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl ForestClassifier {
    pub fn new(n_features: usize, trees: Vec<DecisionTree>) -> Result<Self> {
        if n_features == 0 {
            bail!("forest expects zero features");
        }
        if trees.is_empty() {
            bail!("forest has no trees");
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(n_features)
                .map_err(|e| anyhow::anyhow!("tree {}: {}", i, e))?;
        }
        Ok(Self { n_features, trees })
    }

    pub fn from_params(params: ForestParams) -> Result<Self> {
        Self::new(params.n_features, params.trees)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn predict_row(&self, row: &[f64]) -> Vec<f64> {
        let mut acc = [0.0; NUM_CLASSES];
        for tree in &self.trees {
            let dist = tree.leaf_distribution(row);
            acc[0] += dist[0];
            acc[1] += dist[1];
        }
        let n = self.trees.len() as f64;
        acc.iter().map(|v| v / n).collect()
    }
}

impl Classifier for ForestClassifier {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn input_width(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, rows: &[Vec<f64>]) -> DetectionResult<Vec<Vec<f64>>> {
        rows.iter()
            .map(|row| {
                if row.len() != self.n_features {
                    return Err(DetectionError::DimensionMismatch {
                        stage: "classifier",
                        expected: self.n_features,
                        actual: row.len(),
                    });
                }
                Ok(self.predict_row(row))
            })
            .collect()
    }
}
