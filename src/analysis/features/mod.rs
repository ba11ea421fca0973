//! Spectral feature extraction
//!
//! Reduces a filtered waveform to the 32 values the classifier was trained
//! on: 13 MFCC means, 12 chroma means and 7 spectral-contrast means, in that
//! order. Extraction is pure; the same waveform always yields the same
//! vector.

pub mod chroma;
pub mod contrast;
pub mod mfcc;
pub mod stft;

use crate::error::{LatidoError, Result};
use crate::types::{FeatureVector, Waveform, CHROMA_COUNT, CONTRAST_COUNT, MFCC_COUNT};
use stft::Spectrogram;
use tracing::debug;

const STAGE: &str = "features";

/// Extract the classifier's feature vector from a filtered waveform
pub fn extract_features(waveform: &Waveform) -> Result<FeatureVector> {
    if !contrast::bands_fit(waveform.sample_rate) {
        return Err(LatidoError::analysis_error(
            STAGE,
            format!(
                "sample rate {} Hz is too low for the contrast bands",
                waveform.sample_rate
            ),
        ));
    }

    let spec = Spectrogram::compute(&waveform.samples, waveform.sample_rate)
        .ok_or_else(|| LatidoError::analysis_error(STAGE, "waveform is empty"))?;

    let mfcc = mfcc::mean_mfcc(&spec, MFCC_COUNT);
    let chroma = chroma::mean_chroma(&spec);
    let contrast = contrast::mean_contrast(&spec);
    debug_assert_eq!(chroma.len(), CHROMA_COUNT);
    debug_assert_eq!(contrast.len(), CONTRAST_COUNT);

    let features = FeatureVector::from_parts(&mfcc, &chroma, &contrast);

    let families = [
        ("mfcc", features.mfcc()),
        ("chroma", features.chroma()),
        ("contrast", features.contrast()),
    ];
    for (family, values) in families {
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(LatidoError::analysis_error(
                STAGE,
                format!(
                    "{} value {} is not finite (input contains NaN or Inf)",
                    family, pos
                ),
            ));
        }
    }

    debug!(
        "Extracted {} features over {} frames",
        features.len(),
        spec.num_frames()
    );

    Ok(features)
}
