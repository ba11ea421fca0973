//! Mel-frequency cepstral coefficients
//!
//! Power spectrum -> 128-band Slaney mel filterbank -> dB -> orthonormal
//! DCT-II, keeping the first coefficients and averaging them over time.

use super::stft::{power_to_db, Spectrogram};
use std::f64::consts::PI;

/// Mel bands before the DCT
pub const N_MELS: usize = 128;

/// Dynamic range kept by the dB conversion
const TOP_DB: f64 = 80.0;

// Slaney mel scale: linear below 1 kHz, logarithmic above
const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filters from 0 Hz to Nyquist with Slaney area normalization
///
/// Returns `n_mels` rows over the spectrogram bins.
pub fn mel_filterbank(n_mels: usize, bin_freqs: &[f64], sample_rate: u32) -> Vec<Vec<f64>> {
    let mel_max = hz_to_mel(sample_rate as f64 / 2.0);
    let mel_f: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
        .collect();

    (0..n_mels)
        .map(|m| {
            let (left, center, right) = (mel_f[m], mel_f[m + 1], mel_f[m + 2]);
            let enorm = 2.0 / (right - left);
            bin_freqs
                .iter()
                .map(|&f| {
                    let lower = (f - left) / (center - left);
                    let upper = (right - f) / (right - center);
                    lower.min(upper).max(0.0) * enorm
                })
                .collect()
        })
        .collect()
}

/// Time-averaged MFCCs
pub fn mean_mfcc(spec: &Spectrogram, n_mfcc: usize) -> Vec<f32> {
    let filters = mel_filterbank(N_MELS, &spec.bin_frequencies(), spec.sample_rate);
    let power = spec.power();
    let frames = power.len();

    // mel[frame * N_MELS + band]
    let mut mel = Vec::with_capacity(frames * N_MELS);
    for frame in &power {
        for filter in &filters {
            let energy: f64 = filter
                .iter()
                .zip(frame)
                .filter(|(w, _)| **w != 0.0)
                .map(|(w, &p)| w * p as f64)
                .sum();
            mel.push(energy);
        }
    }
    power_to_db(&mut mel, TOP_DB);

    let basis = dct_basis(n_mfcc, N_MELS);
    let mut sums = vec![0.0f64; n_mfcc];
    for frame in mel.chunks(N_MELS) {
        for (sum, row) in sums.iter_mut().zip(&basis) {
            *sum += row.iter().zip(frame).map(|(b, x)| b * x).sum::<f64>();
        }
    }

    sums.iter().map(|s| (s / frames as f64) as f32).collect()
}

/// First `n_out` rows of the orthonormal DCT-II matrix of size `n_in`
fn dct_basis(n_out: usize, n_in: usize) -> Vec<Vec<f64>> {
    let n = n_in as f64;
    (0..n_out)
        .map(|k| {
            let scale = if k == 0 {
                (1.0 / n).sqrt()
            } else {
                (2.0 / n).sqrt()
            };
            (0..n_in)
                .map(|i| scale * (PI * k as f64 * (2 * i + 1) as f64 / (2.0 * n)).cos())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::features::stft::fft_frequencies;

    #[test]
    fn test_mel_scale_roundtrip_points() {
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-9);
        assert!((hz_to_mel(200.0) - 3.0).abs() < 1e-9);
        assert!((mel_to_hz(15.0) - 1000.0).abs() < 1e-9);
        assert!((mel_to_hz(hz_to_mel(4321.0)) - 4321.0).abs() < 1e-6);
    }

    #[test]
    fn test_filterbank_shape_and_peak() {
        let freqs = fft_frequencies(16000, 2048);
        let fb = mel_filterbank(N_MELS, &freqs, 16000);
        assert_eq!(fb.len(), N_MELS);
        assert!(fb.iter().all(|row| row.len() == freqs.len()));
        assert!(fb.iter().flatten().all(|&w| w >= 0.0));
        // Upper bands are wide enough to catch at least one bin
        assert!(fb[N_MELS - 1].iter().any(|&w| w > 0.0));
    }

    #[test]
    fn test_dct_basis_is_orthonormal() {
        let basis = dct_basis(N_MELS, N_MELS);
        for a in 0..4 {
            for b in 0..4 {
                let dot: f64 = basis[a].iter().zip(&basis[b]).map(|(x, y)| x * y).sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_silence_gives_floor_cepstrum() {
        let spec = Spectrogram::compute(&vec![0.0; 4000], 16000).unwrap();
        let mfcc = mean_mfcc(&spec, 13);
        assert_eq!(mfcc.len(), 13);
        // All mel bands sit at -100 dB, so only c0 is non-zero
        let expected_c0 = -100.0 * (N_MELS as f64).sqrt();
        assert!((mfcc[0] as f64 - expected_c0).abs() < 1e-3);
        assert!(mfcc[1..].iter().all(|c| c.abs() < 1e-3));
    }
}
