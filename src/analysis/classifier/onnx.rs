//! ONNX Runtime based rhythm classifier
//!
//! Runs the exported classifier on a `[1, 32]` f32 tensor. The first `i64`
//! output is taken as the class id; an `f32` output, if present, as class
//! probabilities.

use crate::analysis::traits::Classifier;
use crate::error::{LatidoError, Result};
use crate::types::{ClassificationResult, FeatureVector, FEATURE_LEN};
use ndarray::Array2;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::Session;
use ort::value::Tensor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Classifier backed by an ONNX Runtime session
///
/// `Session::run` takes `&mut self` in ort 2.0.0-rc.10, so the session sits
/// behind a `Mutex` and concurrent requests take turns for the forward pass.
/// Feature extraction and beat detection run outside the lock; only the
/// single `[1, 32]` inference call is serialized.
pub struct OnnxClassifier {
    model_path: PathBuf,
    session: Mutex<Session>,
    input_name: String,
}

impl OnnxClassifier {
    /// Load the model and build a CPU session
    pub fn load(model_path: &Path) -> Result<Self> {
        let load_error = |reason: String| LatidoError::ModelLoadError {
            path: model_path.to_path_buf(),
            reason,
        };

        let session = Session::builder()
            .map_err(|e| load_error(format!("Failed to create ORT session builder: {}", e)))?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .map_err(|e| load_error(format!("Failed to configure CPU provider: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| load_error(format!("Failed to load model: {}", e)))?;

        // Fail explicitly if model has no inputs
        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| load_error("Model has no input tensors defined".to_string()))?;

        info!(
            "Classifier loaded from {} (input '{}', {} outputs)",
            model_path.display(),
            input_name,
            session.outputs.len()
        );

        Ok(Self {
            model_path: model_path.to_path_buf(),
            session: Mutex::new(session),
            input_name,
        })
    }
}

fn inference_error(reason: impl Into<String>) -> LatidoError {
    LatidoError::InferenceError {
        reason: reason.into(),
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<ClassificationResult> {
        if features.len() != FEATURE_LEN {
            return Err(inference_error(format!(
                "expected {} features, got {}",
                FEATURE_LEN,
                features.len()
            )));
        }

        let input = Array2::from_shape_vec((1, FEATURE_LEN), features.as_slice().to_vec())
            .map_err(|e| inference_error(format!("Failed to shape input: {}", e)))?;
        let input_tensor = Tensor::from_array(input)
            .map_err(|e| inference_error(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| inference_error("Failed to acquire session lock"))?;

        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];
        let outputs = session
            .run(inputs)
            .map_err(|e| {
                inference_error(format!(
                    "Inference with {} failed: {}",
                    self.model_path.display(),
                    e
                ))
            })?;

        let mut class_id: Option<i64> = None;
        let mut probabilities: Option<Vec<f32>> = None;

        for (name, value) in outputs.iter() {
            if class_id.is_none() {
                if let Ok((_, data)) = value.try_extract_tensor::<i64>() {
                    class_id = data.first().copied();
                    debug!("Output '{}' holds the class id", name);
                    continue;
                }
            }
            if probabilities.is_none() {
                if let Ok((_, data)) = value.try_extract_tensor::<f32>() {
                    probabilities = Some(data.to_vec());
                    debug!("Output '{}' holds class probabilities", name);
                }
            }
        }

        let class_id = match (class_id, probabilities.as_deref()) {
            (Some(id), _) => id,
            (None, Some(probs)) => argmax(probs)
                .map(|i| i as i64)
                .ok_or_else(|| inference_error("Probability output is empty"))?,
            (None, None) => {
                return Err(inference_error(
                    "Model produced neither an int64 label nor f32 probabilities",
                ))
            }
        };

        let confidence = probabilities.as_deref().and_then(|probs| {
            usize::try_from(class_id)
                .ok()
                .and_then(|i| probs.get(i).copied())
        });

        Ok(ClassificationResult::from_class_id(class_id, confidence))
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}
