//! Spectral contrast
//!
//! For each octave band the mean of the strongest and weakest 2% of bins is
//! taken per frame; contrast is the dB difference between the two.

use super::stft::{power_to_db, Spectrogram};

/// Octave bands above `CONTRAST_FMIN_HZ`; one extra band covers the bottom
pub const N_BANDS: usize = 6;

/// Lower edge of the first octave band
pub const CONTRAST_FMIN_HZ: f64 = 200.0;

/// Fraction of bins used for the peak and valley estimates
const QUANTILE: f64 = 0.02;

const TOP_DB: f64 = 80.0;

/// Bin ranges for each of the `N_BANDS + 1` bands
///
/// Each range is `(start, end, count)` where `start..end` are the bins that
/// are sorted and `count` is the band's nominal size used for the quantile.
fn band_layout(freqs: &[f64]) -> Vec<(usize, usize, usize)> {
    let mut edges = vec![0.0f64; N_BANDS + 2];
    for (k, edge) in edges.iter_mut().enumerate().skip(1) {
        *edge = CONTRAST_FMIN_HZ * 2f64.powi(k as i32 - 1);
    }

    let mut layout = Vec::with_capacity(N_BANDS + 1);
    for k in 0..=N_BANDS {
        let (f_low, f_high) = (edges[k], edges[k + 1]);
        let inside: Vec<usize> = (0..freqs.len())
            .filter(|&i| freqs[i] >= f_low && freqs[i] <= f_high)
            .collect();
        let (Some(&first), Some(&last)) = (inside.first(), inside.last()) else {
            layout.push((0, 0, 0));
            continue;
        };

        let mut start = first;
        let mut end = last + 1;
        if k > 0 && start > 0 {
            start -= 1;
        }
        if k == N_BANDS {
            end = freqs.len();
        }
        let count = end - start;
        // Bands other than the top drop their highest bin, which is shared
        if k < N_BANDS {
            end -= 1;
        }
        layout.push((start, end, count));
    }
    layout
}

/// Round half to even
fn rint(x: f64) -> f64 {
    let r = x.round();
    if (x - x.trunc()).abs() == 0.5 {
        2.0 * (x / 2.0).round()
    } else {
        r
    }
}

/// Check that every band edge below the top one sits under Nyquist
pub fn bands_fit(sample_rate: u32) -> bool {
    CONTRAST_FMIN_HZ * 2f64.powi(N_BANDS as i32 - 1) < 0.5 * sample_rate as f64
}

/// Time-averaged spectral contrast, `N_BANDS + 1` values
pub fn mean_contrast(spec: &Spectrogram) -> Vec<f32> {
    let layout = band_layout(&spec.bin_frequencies());
    let frames = spec.num_frames();
    let bands = layout.len();

    // [band * frames + frame]
    let mut peak = vec![0.0f64; bands * frames];
    let mut valley = vec![0.0f64; bands * frames];

    let mut sorted = Vec::new();
    for (t, frame) in spec.magnitude.iter().enumerate() {
        for (b, &(start, end, count)) in layout.iter().enumerate() {
            if end <= start {
                continue;
            }
            sorted.clear();
            sorted.extend(frame[start..end].iter().map(|&m| m as f64));
            sorted.sort_by(f64::total_cmp);

            let idx = (rint(QUANTILE * count as f64) as usize).max(1).min(sorted.len());
            let n = sorted.len();
            valley[b * frames + t] = sorted[..idx].iter().sum::<f64>() / idx as f64;
            peak[b * frames + t] = sorted[n - idx..].iter().sum::<f64>() / idx as f64;
        }
    }

    power_to_db(&mut peak, TOP_DB);
    power_to_db(&mut valley, TOP_DB);

    (0..bands)
        .map(|b| {
            let total: f64 = (0..frames)
                .map(|t| peak[b * frames + t] - valley[b * frames + t])
                .sum();
            (total / frames as f64) as f32
        })
        .collect()
}
