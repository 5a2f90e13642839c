//! ONNX Runtime classifier adapter

use crate::error::{DetectionError, DetectionResult};
use crate::models::stages::Classifier;
use anyhow::{Context, Result};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info};

/// Classifier backed by an exported ONNX graph.
///
/// Sessions need `&mut` to run, so the session sits behind a lock; the
/// adapter itself is shared read-only like every other stage.
pub struct OnnxClassifier {
    session: RwLock<Session>,
    input_name: String,
    output_name: String,
    input_width: usize,
}

impl OnnxClassifier {
    /// Load a classifier graph from file.
    ///
    /// `input_width` is the selector's output width; exported graphs usually
    /// declare a dynamic batch and feature dimension, so it is not read back.
    pub fn load<P: AsRef<Path>>(path: P, intra_threads: usize, input_width: usize) -> Result<Self> {
        let path = path.as_ref();

        info!(path = %path.display(), threads = intra_threads, "Loading ONNX classifier");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .context("ONNX classifier declares no inputs")?;

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "output_probability".to_string());

        info!(
            input = %input_name,
            output = %output_name,
            input_width = input_width,
            "ONNX classifier loaded successfully"
        );

        Ok(Self {
            session: RwLock::new(session),
            input_name,
            output_name,
            input_width,
        })
    }

    fn runtime_error(context: &str, err: impl std::fmt::Display) -> DetectionError {
        DetectionError::unavailable(format!("onnx classifier {}: {}", context, err))
    }

    /// Extract per-row class probabilities.
    /// Handles tensor outputs (`[N, classes]`) and seq(map(int64, float)) outputs.
    fn extract_probabilities(
        &self,
        outputs: &ort::session::SessionOutputs,
        rows: usize,
    ) -> DetectionResult<Vec<Vec<f64>>> {
        if let Some(output) = outputs.get(self.output_name.as_str()) {
            if let Some(probs) = Self::extract_any(&output, rows) {
                return Ok(probs);
            }
        }

        // Fallback: first output that yields probabilities, skipping labels
        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }
            if let Some(probs) = Self::extract_any(&output, rows) {
                debug!(output = %name, "Extracted probabilities (fallback)");
                return Ok(probs);
            }
        }

        Err(DetectionError::unavailable(
            "onnx classifier produced no probability output",
        ))
    }

    fn extract_any(output: &ort::value::DynValue, rows: usize) -> Option<Vec<Vec<f64>>> {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            return Self::split_tensor(&dims, data, rows);
        }

        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            return Self::extract_from_sequence_map(output).ok();
        }
        None
    }

    /// Split a flat `[N, classes]` tensor into rows.
    fn split_tensor(dims: &[i64], data: &[f32], rows: usize) -> Option<Vec<Vec<f64>>> {
        let classes = match dims {
            [n, c] if *n as usize == rows => *c as usize,
            [c] if rows == 1 => *c as usize,
            _ => return None,
        };
        if classes == 0 || data.len() != rows * classes {
            return None;
        }
        Some(
            data.chunks(classes)
                .map(|chunk| chunk.iter().map(|&p| p as f64).collect())
                .collect(),
        )
    }

    /// One map per row, keyed by class id
    fn extract_from_sequence_map(output: &ort::value::DynValue) -> Result<Vec<Vec<f64>>> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

        let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

        let mut rows = Vec::with_capacity(maps.len());
        for map_value in &maps {
            let mut kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
            kv_pairs.sort_by_key(|(class_id, _)| *class_id);
            rows.push(kv_pairs.into_iter().map(|(_, p)| p as f64).collect());
        }
        Ok(rows)
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        "onnx"
    }

    fn input_width(&self) -> usize {
        self.input_width
    }

    fn predict_proba(&self, rows: &[Vec<f64>]) -> DetectionResult<Vec<Vec<f64>>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let data: Vec<f32> = rows.iter().flatten().map(|&v| v as f32).collect();
        let shape = vec![rows.len() as i64, self.input_width as i64];
        let input_tensor = Tensor::from_array((shape, data))
            .map_err(|e| Self::runtime_error("input tensor", e))?;

        let mut session = self
            .session
            .write()
            .map_err(|e| Self::runtime_error("lock", e))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_tensor])
            .map_err(|e| Self::runtime_error("run", e))?;

        self.extract_probabilities(&outputs, rows.len())
    }
}
