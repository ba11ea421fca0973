//! Short-time Fourier transform for feature extraction
//!
//! # Parameter Choices
//!
//! - **N_FFT = 2048**: at 16 kHz this is a 128 ms window with 1025 bins
//!   (~7.8 Hz resolution), fine enough to separate the lower heart band.
//! - **HOP_LENGTH = 512**: 75% overlap, 32 ms between frames.
//! - **Centered frames**: the signal is padded with N_FFT/2 zeros on each
//!   side so frame `t` is centred on sample `t * HOP_LENGTH`.
//! - **Periodic Hann window**.

use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// FFT window size
pub const N_FFT: usize = 2048;

/// Hop length between frames
pub const HOP_LENGTH: usize = 512;

/// Number of non-negative frequency bins
pub const NUM_FREQ_BINS: usize = N_FFT / 2 + 1; // 1025

/// Magnitude spectrogram, stored frame-major: `magnitude[frame][bin]`
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub magnitude: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl Spectrogram {
    /// Compute the centred STFT magnitude of `samples`
    ///
    /// Returns `None` for an empty signal.
    pub fn compute(samples: &[f32], sample_rate: u32) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let pad = N_FFT / 2;
        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let num_frames = 1 + (padded.len() - N_FFT) / HOP_LENGTH;
        let window = hann_window(N_FFT);

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(N_FFT);

        let mut magnitude = vec![vec![0.0f32; NUM_FREQ_BINS]; num_frames];

        magnitude.par_iter_mut().enumerate().for_each_init(
            || vec![Complex::new(0.0f32, 0.0); N_FFT],
            |buffer, (frame_idx, row)| {
                let start = frame_idx * HOP_LENGTH;
                for (i, slot) in buffer.iter_mut().enumerate() {
                    *slot = Complex::new(padded[start + i] * window[i], 0.0);
                }

                fft.process(buffer);

                for (bin, value) in row.iter_mut().enumerate() {
                    *value = buffer[bin].norm();
                }
            },
        );

        Some(Self {
            magnitude,
            sample_rate,
        })
    }

    pub fn num_frames(&self) -> usize {
        self.magnitude.len()
    }

    /// Squared magnitude, same layout
    pub fn power(&self) -> Vec<Vec<f32>> {
        self.magnitude
            .iter()
            .map(|frame| frame.iter().map(|m| m * m).collect())
            .collect()
    }

    /// Centre frequency of every bin in Hz
    pub fn bin_frequencies(&self) -> Vec<f64> {
        fft_frequencies(self.sample_rate, N_FFT)
    }
}

/// Centre frequencies of the non-negative FFT bins
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f64> {
    let step = sample_rate as f64 / n_fft as f64;
    (0..=n_fft / 2).map(|k| k as f64 * step).collect()
}

/// Periodic Hann window
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

/// Convert a power quantity to decibels, clamped `top_db` below the peak
///
/// Uses `ref = 1.0` and `amin = 1e-10`; the clamp is applied against the
/// maximum over the whole slice.
pub fn power_to_db(values: &mut [f64], top_db: f64) {
    const AMIN: f64 = 1e-10;

    let mut peak = f64::NEG_INFINITY;
    for v in values.iter_mut() {
        *v = 10.0 * v.max(AMIN).log10();
        peak = peak.max(*v);
    }

    let floor = peak - top_db;
    for v in values.iter_mut() {
        if *v < floor {
            *v = floor;
        }
    }
}
