//! Audio decoding and conditioning

pub mod decoder;
pub mod filter;

pub use decoder::{decode, DecodeOptions, MAX_DURATION_SECS, MAX_SAMPLES, TARGET_SAMPLE_RATE};
pub use filter::{bandpass, BandPassFilter, HIGH_CUTOFF_HZ, LOW_CUTOFF_HZ};
