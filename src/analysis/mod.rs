//! Heart-sound analysis
//!
//! Feature extraction, rhythm classification, beat detection and the
//! consistency check between the last two. Classification and beat
//! detection sit behind traits so backends can be swapped without changing
//! pipeline code.

pub mod beats;
pub mod classifier;
pub mod consistency;
pub mod features;
pub mod traits;

pub use traits::{BeatDetector, Classifier, ClassifierHandle};

pub use beats::PeakBeatDetector;
pub use classifier::{load_classifier, PlaceholderClassifier};
pub use consistency::resolve;
pub use features::extract_features;

#[cfg(feature = "onnx")]
pub use classifier::OnnxClassifier;
