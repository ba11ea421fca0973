//! Rhythm classifier adapter
//!
//! Wraps the pre-trained model behind the `Classifier` trait. The model is
//! loaded exactly once, at startup, by `load_classifier`; request handling
//! only ever sees the shared handle.

pub mod model;
#[cfg(feature = "onnx")]
pub mod onnx;

use crate::analysis::traits::{Classifier, ClassifierHandle};
use crate::config::Settings;
use crate::error::{LatidoError, Result};
use crate::types::{ClassificationResult, FeatureVector, FEATURE_LEN};

#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;

/// Classifier that always predicts the same class id
///
/// Used for tests and wiring checks; never selected by the CLI.
pub struct PlaceholderClassifier {
    class_id: i64,
}

impl PlaceholderClassifier {
    pub fn new(class_id: i64) -> Self {
        Self { class_id }
    }
}

impl Default for PlaceholderClassifier {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Classifier for PlaceholderClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<ClassificationResult> {
        if features.len() != FEATURE_LEN {
            return Err(LatidoError::InferenceError {
                reason: format!("expected {} features, got {}", FEATURE_LEN, features.len()),
            });
        }
        Ok(ClassificationResult::from_class_id(self.class_id, None))
    }

    fn name(&self) -> &'static str {
        "placeholder"
    }
}

/// Load the classifier named by the settings
///
/// Failure here is fatal: the caller must not start serving requests.
#[cfg(feature = "onnx")]
pub fn load_classifier(settings: &Settings) -> Result<ClassifierHandle> {
    let path = model::find_model_path(settings.model_path.as_deref())?;
    let classifier = OnnxClassifier::load(&path)?;
    Ok(std::sync::Arc::new(classifier))
}

/// Load the classifier named by the settings
///
/// This build has no inference backend, so loading always fails.
#[cfg(not(feature = "onnx"))]
pub fn load_classifier(settings: &Settings) -> Result<ClassifierHandle> {
    if let Ok(path) = model::find_model_path(settings.model_path.as_deref()) {
        tracing::warn!(
            "Found model at {} but the ONNX backend is not compiled in",
            path.display()
        );
    }
    Err(LatidoError::model_backend_disabled())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RhythmLabel;

    #[test]
    fn test_placeholder_maps_through_label_table() {
        let fv = FeatureVector::from_vec(vec![0.0; FEATURE_LEN]);
        let result = PlaceholderClassifier::new(2).predict(&fv).unwrap();
        assert_eq!(result.label, RhythmLabel::Tachycardia);

        let result = PlaceholderClassifier::new(7).predict(&fv).unwrap();
        assert_eq!(result.class_id, 7);
        assert_eq!(result.label, RhythmLabel::Unknown);
    }

    #[test]
    fn test_placeholder_rejects_wrong_length() {
        let fv = FeatureVector::from_vec(vec![0.0; FEATURE_LEN - 1]);
        let err = PlaceholderClassifier::default().predict(&fv).unwrap_err();
        assert!(err.is_defect());
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_load_without_backend_is_fatal() {
        let err = match load_classifier(&Settings::default()) {
            Ok(_) => panic!("expected load to fail"),
            Err(e) => e,
        };
        assert!(matches!(err, LatidoError::ModelUnavailable { .. }));
        assert!(!err.is_recoverable());
    }
}
