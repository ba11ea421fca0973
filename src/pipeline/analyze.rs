//! Single-request analysis
//!
//! decode -> band-pass -> { features -> classify, beats } -> resolve -> render
//!
//! Classification and beat detection read the same filtered waveform and run
//! as a fork-join. Any stage error, and any panic, ends the request with an
//! error-shaped result; nothing partial is returned.

use super::messages;
use crate::analysis::{extract_features, resolve, BeatDetector, ClassifierHandle, PeakBeatDetector};
use crate::audio::{self, DecodeOptions};
use crate::error::{LatidoError, Result};
use crate::render;
use crate::types::{AnalysisRequest, BeatSet, ClassificationResult, Resolution};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Everything a successful analysis produced
#[derive(Debug, Clone)]
pub struct Verdict {
    pub classification: ClassificationResult,
    pub resolution: Resolution,
    pub beats: BeatSet,
    pub message: String,
    pub action: String,
    pub encouragement: Option<&'static str>,
    pub glucose_mg_dl: f64,
    /// Base64 PNG of the filtered waveform with beat markers
    pub waveform_png: String,
}

/// Terminal state of one request
#[derive(Debug, Clone)]
pub enum AnalysisResult {
    Completed(Box<Verdict>),
    Failed { error: String },
}

impl AnalysisResult {
    pub fn failed(error: impl Into<String>) -> Self {
        AnalysisResult::Failed {
            error: error.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AnalysisResult::Failed { .. })
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            AnalysisResult::Completed(verdict) => Some(verdict.as_ref()),
            AnalysisResult::Failed { .. } => None,
        }
    }
}

/// Request handler holding the process-wide collaborators
///
/// Cheap to share between threads; every call to `analyze` is independent.
pub struct Analyzer {
    classifier: ClassifierHandle,
    detector: Arc<dyn BeatDetector>,
    decode_options: DecodeOptions,
}

impl Analyzer {
    pub fn new(classifier: ClassifierHandle, decode_options: DecodeOptions) -> Self {
        Self {
            classifier,
            detector: Arc::new(PeakBeatDetector::new()),
            decode_options,
        }
    }

    /// Replace the beat detector
    pub fn with_detector(mut self, detector: Arc<dyn BeatDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Analyse one request; never fails, errors come back error-shaped
    pub fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        let name = request.audio.filename.as_str();

        match panic::catch_unwind(AssertUnwindSafe(|| self.run(request))) {
            Ok(Ok(verdict)) => AnalysisResult::Completed(Box::new(verdict)),
            Ok(Err(e)) => {
                if e.is_input_error() {
                    warn!("Rejected {}: {}", name, e);
                } else if e.is_recoverable() && !e.is_defect() {
                    warn!("Skipping {}: {}", name, e);
                } else {
                    error!("Failed {}: {}", name, e);
                }
                AnalysisResult::failed(e.to_string())
            }
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                error!("Analysis of {} panicked: {}", name, panic_msg);
                AnalysisResult::failed(
                    LatidoError::analysis_error("pipeline", format!("internal error: {}", panic_msg))
                        .to_string(),
                )
            }
        }
    }

    fn run(&self, request: &AnalysisRequest) -> Result<Verdict> {
        let name = request.audio.filename.as_str();
        let start = Instant::now();

        let waveform = audio::decode(&request.audio, &self.decode_options)?;
        debug!(
            "{}: decoded {:.2}s in {:.0}ms",
            name,
            waveform.duration,
            start.elapsed().as_secs_f64() * 1000.0
        );

        let filtered = audio::bandpass(&waveform)?;

        let (classification, beats) = rayon::join(
            || {
                let features = extract_features(&filtered)?;
                self.classifier.predict(&features)
            },
            || self.detector.detect(&filtered),
        );
        let classification = classification?;
        let beats = beats?;
        debug!("{}: {} beats via {}", name, beats.len(), self.detector.name());

        let resolution = resolve(classification.label, beats.bpm);
        let waveform_png = render::render_base64(&filtered, &beats)?;

        let (message, action) = messages::message_and_action(
            classification.label,
            resolution.final_label,
            resolution.inconsistent,
            beats.bpm,
        );

        info!(
            "{}: {} (model {} via {}), bpm={}, inconsistent={} [{:.0}ms]",
            name,
            resolution.final_label,
            classification.label,
            self.classifier.name(),
            beats
                .bpm
                .map(|b| format!("{:.1}", b))
                .unwrap_or_else(|| "n/a".to_string()),
            resolution.inconsistent,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Verdict {
            encouragement: messages::encouragement(resolution.final_label),
            classification,
            resolution,
            beats,
            message,
            action,
            glucose_mg_dl: request.glucose.mg_dl(),
            waveform_png,
        })
    }
}
