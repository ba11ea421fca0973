//! Unified error types for latido
//!
//! Error strategy:
//! - Per-request errors (decode, filter, analysis, inference): the request
//!   ends with an error-shaped result, the next request is unaffected
//! - Startup and system errors (model load, output, config): fatal
//!
//! Zero detected beats is not an error; it surfaces as `bpm: None`.

use std::path::PathBuf;
use thiserror::Error;

/// Supported audio formats for helpful error messages
pub const SUPPORTED_FORMATS: &str = "3GP, MP4/M4A (AAC), AAC, WAV, MP3, FLAC, OGG";

/// Top-level error type for latido operations
#[derive(Debug, Error)]
pub enum LatidoError {
    // =========================================================================
    // Per-request errors - the request ends with an error-shaped result
    // =========================================================================
    #[error("Could not decode audio '{source_name}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}\n  Tip: {}", decode_tip(.fallback_tried))]
    DecodeError {
        source_name: String,
        reason: String,
        fallback_tried: bool,
    },

    #[error("Band-pass filter failed: {reason}")]
    FilterError { reason: String },

    #[error("Analysis failed during {stage}: {reason}")]
    AnalysisError { stage: &'static str, reason: String },

    #[error("Model inference failed: {reason}\n  Tip: The feature vector does not match what the model expects; check the model export")]
    InferenceError { reason: String },

    #[error("Unsupported audio format for '{path}': {format}\n  Supported formats: {SUPPORTED_FORMATS}")]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("File not found: '{0}'\n  Tip: Check the path exists and is accessible")]
    FileNotFound(PathBuf),

    // =========================================================================
    // Fatal errors - the process must not serve requests
    // =========================================================================
    #[error("Classifier model unavailable: {reason}\n\n  To provide a model:\n  1. Export the trained classifier to ONNX (class id output as int64)\n  2. Set environment variable:\n     export LATIDO_MODEL_PATH=/path/to/modelo_latido.onnx\n  3. Build with the ONNX backend:\n     cargo build --release --features onnx")]
    ModelUnavailable { reason: String },

    #[error("Failed to load classifier model '{path}': {reason}\n  Tip: The file may be corrupt or exported with an unsupported opset")]
    ModelLoadError { path: PathBuf, reason: String },

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn decode_tip(fallback_tried: &bool) -> &'static str {
    if *fallback_tried {
        "ffmpeg could not read it either; record again"
    } else {
        "Record again, or enable --ffmpeg-fallback for AMR/3GP recordings"
    }
}

/// Result type alias for latido operations
pub type Result<T> = std::result::Result<T, LatidoError>;

impl LatidoError {
    /// Returns true if this error only ends the current request
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LatidoError::DecodeError { .. }
                | LatidoError::FilterError { .. }
                | LatidoError::AnalysisError { .. }
                | LatidoError::InferenceError { .. }
                | LatidoError::UnsupportedFormat { .. }
                | LatidoError::FileNotFound(_)
        )
    }

    /// Returns true if the error was caused by the uploaded audio itself
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            LatidoError::DecodeError { .. } | LatidoError::FilterError { .. }
        )
    }

    /// Returns true if the error points at a bug rather than bad input
    ///
    /// An inference rejection means the extractor and the model disagree on
    /// the feature layout.
    pub fn is_defect(&self) -> bool {
        matches!(self, LatidoError::InferenceError { .. })
    }

    /// Create a decode error for a named upload
    pub fn decode_error(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        LatidoError::DecodeError {
            source_name: source_name.into(),
            reason: reason.into(),
            fallback_tried: false,
        }
    }

    /// Mark a decode error as having already gone through the ffmpeg fallback
    pub fn after_fallback(self) -> Self {
        match self {
            LatidoError::DecodeError {
                source_name,
                reason,
                ..
            } => LatidoError::DecodeError {
                source_name,
                reason,
                fallback_tried: true,
            },
            other => other,
        }
    }

    /// Create an analysis error for a pipeline stage
    pub fn analysis_error(stage: &'static str, reason: impl Into<String>) -> Self {
        LatidoError::AnalysisError {
            stage,
            reason: reason.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!("Directory does not exist: {}", path.parent().map(|p| p.display().to_string()).unwrap_or_default())
            }
            _ => err.to_string(),
        };
        LatidoError::OutputError { path, reason }
    }

    /// Create a model error for a build without an inference backend
    pub fn model_backend_disabled() -> Self {
        LatidoError::ModelUnavailable {
            reason: "ONNX backend not compiled in".to_string(),
        }
    }
}

/// Extension trait for adding stage context to foreign errors
pub trait ErrorContext<T> {
    /// Map any displayable error into an analysis error for `stage`
    fn with_stage(self, stage: &'static str) -> Result<T>;
}

impl<T, E: std::fmt::Display> ErrorContext<T> for std::result::Result<T, E> {
    fn with_stage(self, stage: &'static str) -> Result<T> {
        self.map_err(|e| LatidoError::AnalysisError {
            stage,
            reason: e.to_string(),
        })
    }
}
