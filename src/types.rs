//! Core data types for latido
//!
//! These types represent the domain model and flow through the pipeline.
//! Every value here is request-scoped; nothing outlives one analysis.

use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// Audio buffers
// =============================================================================

/// An uploaded audio payload as received from the caller
#[derive(Debug, Clone)]
pub struct RawAudioBlob {
    /// Undecoded container bytes
    pub bytes: Vec<u8>,
    /// Filename as declared by the uploader (used for the format hint)
    pub filename: String,
}

impl RawAudioBlob {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
        }
    }

    /// Read a blob from disk, keeping the file name as the declared name
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self { bytes, filename })
    }

    /// Lowercased extension of the declared filename, if any
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Decoded mono audio ready for analysis
#[derive(Debug, Clone)]
pub struct Waveform {
    /// Mono samples, nominally in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration: f64,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        // Guard against division by zero - use 0 duration for invalid sample rate
        let duration = if sample_rate > 0 {
            samples.len() as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            samples,
            sample_rate,
            duration,
        }
    }

    /// Replace the samples, keeping the sample rate
    pub fn with_samples(&self, samples: Vec<f32>) -> Self {
        Self::new(samples, self.sample_rate)
    }

    /// Channel count; waveforms are always downmixed to mono
    pub fn channels(&self) -> u16 {
        1
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// =============================================================================
// Analysis values
// =============================================================================

/// Number of cepstral coefficients in the feature vector
pub const MFCC_COUNT: usize = 13;
/// Number of pitch classes in the feature vector
pub const CHROMA_COUNT: usize = 12;
/// Number of spectral contrast bands in the feature vector
pub const CONTRAST_COUNT: usize = 7;
/// Total feature vector length expected by the trained model
pub const FEATURE_LEN: usize = MFCC_COUNT + CHROMA_COUNT + CONTRAST_COUNT;

/// Time-averaged spectral summary handed to the classifier
///
/// Layout: `[mfcc; 13] ++ [chroma; 12] ++ [contrast; 7]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    /// Concatenate the three feature families in model order
    pub fn from_parts(mfcc: &[f32], chroma: &[f32], contrast: &[f32]) -> Self {
        let mut values = Vec::with_capacity(mfcc.len() + chroma.len() + contrast.len());
        values.extend_from_slice(mfcc);
        values.extend_from_slice(chroma);
        values.extend_from_slice(contrast);
        Self(values)
    }

    pub fn from_vec(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn mfcc(&self) -> &[f32] {
        &self.0[..MFCC_COUNT.min(self.0.len())]
    }

    pub fn chroma(&self) -> &[f32] {
        let end = (MFCC_COUNT + CHROMA_COUNT).min(self.0.len());
        &self.0[MFCC_COUNT.min(end)..end]
    }

    pub fn contrast(&self) -> &[f32] {
        let start = (MFCC_COUNT + CHROMA_COUNT).min(self.0.len());
        &self.0[start..]
    }
}

/// Detected heartbeats for one clip
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatSet {
    /// Peak offsets in seconds, strictly increasing
    pub times: Vec<f64>,
    /// Beats per minute rounded to one decimal, `None` when no peak was found
    pub bpm: Option<f64>,
}

impl BeatSet {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Rhythm verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RhythmLabel {
    Normal,
    Bradycardia,
    Tachycardia,
    Unknown,
}

impl RhythmLabel {
    /// Map a raw model class id to a label; unrecognized ids become `Unknown`
    pub fn from_class_id(id: i64) -> Self {
        match id {
            0 => RhythmLabel::Normal,
            1 => RhythmLabel::Bradycardia,
            2 => RhythmLabel::Tachycardia,
            _ => RhythmLabel::Unknown,
        }
    }

    /// Class id of a known label
    pub fn class_id(self) -> Option<i64> {
        match self {
            RhythmLabel::Normal => Some(0),
            RhythmLabel::Bradycardia => Some(1),
            RhythmLabel::Tachycardia => Some(2),
            RhythmLabel::Unknown => None,
        }
    }

    /// Label as shown to the patient
    pub fn display_name(self) -> &'static str {
        match self {
            RhythmLabel::Normal => "Normal",
            RhythmLabel::Bradycardia => "Bradicardia",
            RhythmLabel::Tachycardia => "Taquicardia",
            RhythmLabel::Unknown => "Desconocido",
        }
    }
}

impl std::fmt::Display for RhythmLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Classifier output
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Raw id as returned by the model
    pub class_id: i64,
    /// Mapped label
    pub label: RhythmLabel,
    /// Probability of the predicted class, when the model exposes one
    pub confidence: Option<f32>,
}

impl ClassificationResult {
    pub fn from_class_id(class_id: i64, confidence: Option<f32>) -> Self {
        Self {
            class_id,
            label: RhythmLabel::from_class_id(class_id),
            confidence,
        }
    }
}

/// Outcome of reconciling the classifier with the measured BPM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub final_label: RhythmLabel,
    pub inconsistent: bool,
}

// =============================================================================
// Auxiliary reading
// =============================================================================

/// mg/dL per mmol/L for glucose
pub const MG_DL_PER_MMOL_L: f64 = 18.0;

/// Unit of a glucose reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlucoseUnit {
    MgDl,
    MmolL,
}

impl GlucoseUnit {
    /// Parse a unit string such as "mg/dl" or "mmol/L"
    pub fn parse(unit: &str) -> Option<Self> {
        let normalized: String = unit
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "mg/dl" | "mgdl" | "mg" => Some(GlucoseUnit::MgDl),
            "mmol/l" | "mmoll" | "mmol" => Some(GlucoseUnit::MmolL),
            _ => None,
        }
    }
}

/// Glucose value submitted alongside a recording
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlucoseReading {
    pub value: f64,
    pub unit: GlucoseUnit,
}

impl GlucoseReading {
    pub fn new(value: f64, unit: GlucoseUnit) -> Self {
        Self { value, unit }
    }

    /// Value in mg/dL
    pub fn mg_dl(&self) -> f64 {
        match self.unit {
            GlucoseUnit::MgDl => self.value,
            GlucoseUnit::MmolL => self.value * MG_DL_PER_MMOL_L,
        }
    }
}

/// One analysis request: an upload plus its glucose reading
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub audio: RawAudioBlob,
    pub glucose: GlucoseReading,
}

// =============================================================================
// Supported formats
// =============================================================================

/// Audio containers accepted for analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    ThreeGp,
    Mp4,
    Aac,
    Wav,
    Mp3,
    Flac,
    Ogg,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "3gp" | "3gpp" | "3g2" => Some(AudioFormat::ThreeGp),
            "mp4" | "m4a" => Some(AudioFormat::Mp4),
            "aac" => Some(AudioFormat::Aac),
            "wav" | "wave" => Some(AudioFormat::Wav),
            "mp3" => Some(AudioFormat::Mp3),
            "flac" => Some(AudioFormat::Flac),
            "ogg" | "oga" => Some(AudioFormat::Ogg),
            _ => None,
        }
    }
}
