//! Chromagram from the power spectrum
//!
//! Each FFT bin is spread over the 12 pitch classes with a Gaussian bump,
//! weighted towards the octaves around the centre octave, then every frame is
//! scaled so its strongest pitch class is 1.

use super::stft::{Spectrogram, N_FFT};

/// Pitch classes per octave
pub const N_CHROMA: usize = 12;

/// Centre octave of the Gaussian octave weighting (A440 = octave 4.75)
const CENTER_OCTAVE: f64 = 5.0;

/// Gaussian half-width of the octave weighting, in octaves
const OCTAVE_WIDTH: f64 = 2.0;

/// Frames whose maximum is below this are left unnormalized
const NORM_THRESHOLD: f64 = f32::MIN_POSITIVE as f64;

/// Fractional octaves relative to A0/16 tuned to A440
fn hz_to_octs(hz: f64) -> f64 {
    (hz / (440.0 / 16.0)).log2()
}

/// Chroma filterbank: `N_CHROMA` rows over the `N_FFT / 2 + 1` bins, row 0 = C
pub fn chroma_filterbank(sample_rate: u32) -> Vec<Vec<f64>> {
    let n = N_CHROMA as f64;

    // Bin positions in chroma units over the full FFT, bin 0 invented 1.5
    // octaves below bin 1
    let mut frqbins: Vec<f64> = (1..N_FFT)
        .map(|k| n * hz_to_octs(k as f64 * sample_rate as f64 / N_FFT as f64))
        .collect();
    frqbins.insert(0, frqbins[0] - 1.5 * n);

    let mut binwidths: Vec<f64> = frqbins
        .windows(2)
        .map(|w| (w[1] - w[0]).max(1.0))
        .collect();
    binwidths.push(1.0);

    let half = (n / 2.0).round();
    let mut wts = vec![vec![0.0f64; N_FFT]; N_CHROMA];
    for (c, row) in wts.iter_mut().enumerate() {
        for (k, w) in row.iter_mut().enumerate() {
            let d = (frqbins[k] - c as f64 + half + 10.0 * n).rem_euclid(n) - half;
            *w = (-0.5 * (2.0 * d / binwidths[k]).powi(2)).exp();
        }
    }

    // L2-normalize each bin's column, then apply the octave weighting
    for k in 0..N_FFT {
        let norm = wts.iter().map(|row| row[k] * row[k]).sum::<f64>().sqrt();
        let octave_weight = (-0.5 * ((frqbins[k] / n - CENTER_OCTAVE) / OCTAVE_WIDTH).powi(2)).exp();
        for row in wts.iter_mut() {
            if norm >= NORM_THRESHOLD {
                row[k] /= norm;
            }
            row[k] *= octave_weight;
        }
    }

    // Rows currently start at A; rotate so row 0 is C
    wts.rotate_left(3);

    for row in wts.iter_mut() {
        row.truncate(N_FFT / 2 + 1);
    }
    wts
}

/// Time-averaged, per-frame max-normalized chroma
pub fn mean_chroma(spec: &Spectrogram) -> Vec<f32> {
    let filters = chroma_filterbank(spec.sample_rate);
    let power = spec.power();
    let frames = power.len();

    let mut sums = vec![0.0f64; N_CHROMA];
    for frame in &power {
        let raw: Vec<f64> = filters
            .iter()
            .map(|row| row.iter().zip(frame).map(|(w, &p)| w * p as f64).sum())
            .collect();

        let peak = raw.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        let scale = if peak < NORM_THRESHOLD { 1.0 } else { peak };

        for (sum, v) in sums.iter_mut().zip(&raw) {
            *sum += v / scale;
        }
    }

    sums.iter().map(|s| (s / frames as f64) as f32).collect()
}
