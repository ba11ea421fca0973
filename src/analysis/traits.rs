//! Analysis trait abstractions
//!
//! These traits define the interface for swappable analysis backends.
//! The pipeline only sees trait objects, so a model runtime can be replaced
//! without touching request handling.

use crate::error::Result;
use crate::types::{BeatSet, ClassificationResult, FeatureVector, Waveform};
use std::sync::Arc;

/// Rhythm classification backend
///
/// Implementations are constructed once at startup and shared read-only
/// between concurrent requests.
pub trait Classifier: Send + Sync {
    /// Predict the rhythm class for one feature vector
    fn predict(&self, features: &FeatureVector) -> Result<ClassificationResult>;

    /// Get the name of this classifier (for logging)
    fn name(&self) -> &'static str;
}

/// Heartbeat detection backend
pub trait BeatDetector: Send + Sync {
    /// Locate beats in a filtered waveform
    ///
    /// Finding no beats is not an error; it yields an empty `BeatSet`.
    fn detect(&self, waveform: &Waveform) -> Result<BeatSet>;

    /// Get the name of this detector (for logging)
    fn name(&self) -> &'static str;
}

/// Shared classifier handle passed into the pipeline
pub type ClassifierHandle = Arc<dyn Classifier>;
