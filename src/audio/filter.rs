//! Zero-phase Butterworth band-pass
//!
//! The heart band (20-150 Hz) is isolated with a 2nd-order Butterworth
//! band-pass designed through the bilinear transform and realised as two
//! second-order sections. Filtering runs forward then backward over an
//! odd-extended copy of the signal, so the output has no phase shift and the
//! same length as the input.

use crate::error::{LatidoError, Result};
use crate::types::Waveform;
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;
use tracing::trace;

/// Lower edge of the heart-sound band
pub const LOW_CUTOFF_HZ: f64 = 20.0;

/// Upper edge of the heart-sound band
pub const HIGH_CUTOFF_HZ: f64 = 150.0;

/// Samples of odd extension added to each end before filtering
pub const PAD_LEN: usize = 15;

/// One second-order section in direct form II transposed
#[derive(Debug, Clone, Copy, PartialEq)]
struct Biquad {
    b: [f64; 3],
    a: [f64; 3],
}

impl Biquad {
    /// DC gain, or 0 for sections with a zero at DC
    fn dc_gain(&self) -> f64 {
        let den: f64 = self.a.iter().sum();
        if den == 0.0 {
            0.0
        } else {
            self.b.iter().sum::<f64>() / den
        }
    }

    /// Initial state that matches a unit step already in steady state
    fn step_state(&self) -> [f64; 2] {
        let h = self.dc_gain();
        [h - self.b[0], self.b[2] - self.a[2] * h]
    }

    fn run(&self, signal: &mut [f64], mut state: [f64; 2]) {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        for x in signal.iter_mut() {
            let input = *x;
            let y = b0 * input + state[0];
            state[0] = b1 * input - a1 * y + state[1];
            state[1] = b2 * input - a2 * y;
            *x = y;
        }
    }

    fn response(&self, z: Complex64) -> Complex64 {
        let zi = z.inv();
        let zi2 = zi * zi;
        let num = self.b[0] + zi * self.b[1] + zi2 * self.b[2];
        let den = self.a[0] + zi * self.a[1] + zi2 * self.a[2];
        num / den
    }
}

/// Band-pass filter as a cascade of two biquads
#[derive(Debug, Clone, PartialEq)]
pub struct BandPassFilter {
    sections: [Biquad; 2],
    sample_rate: u32,
}

impl BandPassFilter {
    /// Design a 2nd-order Butterworth band-pass for `[low_hz, high_hz]`
    pub fn design(low_hz: f64, high_hz: f64, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(LatidoError::FilterError {
                reason: "sample rate is zero".to_string(),
            });
        }
        let nyquist = sample_rate as f64 / 2.0;
        let valid = low_hz.is_finite()
            && high_hz.is_finite()
            && low_hz > 0.0
            && low_hz < high_hz
            && high_hz < nyquist;
        if !valid {
            return Err(LatidoError::FilterError {
                reason: format!(
                    "band edges must satisfy 0 < low < high < {} Hz, got [{}, {}]",
                    nyquist, low_hz, high_hz
                ),
            });
        }

        // Prewarp the normalized edges for a bilinear transform at fs = 2
        let warp = |hz: f64| 4.0 * (PI * (hz / nyquist) / 2.0).tan();
        let (w_low, w_high) = (warp(low_hz), warp(high_hz));
        let bw = w_high - w_low;
        let wo2 = w_low * w_high;

        // Order-2 analog prototype: the upper-half-plane pole of the pair
        let proto = -Complex64::from_polar(1.0, -PI / 4.0);

        // Lowpass to bandpass splits each prototype pole in two
        let p_lp = proto * (bw / 2.0);
        let root = (p_lp * p_lp - wo2).sqrt();
        let analog = [p_lp + root, p_lp - root];

        // Bilinear transform; each section keeps one conjugate pair
        let fs2 = Complex64::new(4.0, 0.0);
        let digital = analog.map(|p| (fs2 + p) / (fs2 - p));

        // Analog zeros sit at DC and map to +1; the excess order maps to -1
        let gain = bw * bw * 16.0 / analog.iter().map(|p| (fs2 - p).norm_sqr()).product::<f64>();

        let mut sections = digital.map(|p| Biquad {
            b: [1.0, 0.0, -1.0],
            a: [1.0, -2.0 * p.re, p.norm_sqr()],
        });
        for coeff in sections[0].b.iter_mut() {
            *coeff *= gain;
        }

        trace!(?sections, "designed band-pass [{} Hz, {} Hz]", low_hz, high_hz);

        Ok(Self {
            sections,
            sample_rate,
        })
    }

    /// The 20-150 Hz heart band at the given sample rate
    pub fn heart_band(sample_rate: u32) -> Result<Self> {
        Self::design(LOW_CUTOFF_HZ, HIGH_CUTOFF_HZ, sample_rate)
    }

    /// Magnitude of the single-pass frequency response at `freq_hz`
    pub fn gain_at(&self, freq_hz: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / self.sample_rate as f64;
        let z = Complex64::from_polar(1.0, omega);
        self.sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.response(z))
            .norm()
    }

    /// Filter forward and backward with odd edge padding
    pub fn filtfilt(&self, samples: &[f32]) -> Result<Vec<f32>> {
        let n = samples.len();
        if n <= PAD_LEN {
            return Err(LatidoError::FilterError {
                reason: format!(
                    "signal has {} samples, need more than {} to pad",
                    n, PAD_LEN
                ),
            });
        }

        let x: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
        let mut ext = odd_extend(&x, PAD_LEN);

        let x0 = ext[0];
        self.cascade(&mut ext, x0);

        ext.reverse();
        let y0 = ext[0];
        self.cascade(&mut ext, y0);
        ext.reverse();

        Ok(ext[PAD_LEN..PAD_LEN + n].iter().map(|&v| v as f32).collect())
    }

    /// Run every section with steady-state initial conditions scaled by `x0`
    fn cascade(&self, signal: &mut [f64], x0: f64) {
        let mut scale = x0;
        for section in &self.sections {
            let [z1, z2] = section.step_state();
            section.run(signal, [z1 * scale, z2 * scale]);
            scale *= section.dc_gain();
        }
    }
}

/// Odd extension: reflect about each endpoint and invert
fn odd_extend(x: &[f64], pad: usize) -> Vec<f64> {
    let n = x.len();
    let first = x[0];
    let last = x[n - 1];

    let mut ext = Vec::with_capacity(n + 2 * pad);
    ext.extend((1..=pad).rev().map(|i| 2.0 * first - x[i]));
    ext.extend_from_slice(x);
    ext.extend((1..=pad).map(|i| 2.0 * last - x[n - 1 - i]));
    ext
}

/// Apply the heart-band filter to a waveform
pub fn bandpass(waveform: &Waveform) -> Result<Waveform> {
    let filter = BandPassFilter::heart_band(waveform.sample_rate)?;
    let filtered = filter.filtfilt(&waveform.samples)?;
    Ok(waveform.with_samples(filtered))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 16_000;

    fn sine(freq: f64, secs: f64) -> Vec<f32> {
        let n = (secs * SR as f64) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f64 / SR as f64).sin() as f32)
            .collect()
    }

    fn rms(x: &[f32]) -> f64 {
        (x.iter().map(|&v| (v as f64).powi(2)).sum::<f64>() / x.len() as f64).sqrt()
    }

    #[test]
    fn test_response_shape() {
        let filter = BandPassFilter::heart_band(SR).unwrap();
        let center = (LOW_CUTOFF_HZ * HIGH_CUTOFF_HZ).sqrt();
        assert!((filter.gain_at(center) - 1.0).abs() < 0.01);
        assert!(filter.gain_at(80.0) > 0.95);
        assert!(filter.gain_at(500.0) < 0.15);
        assert!(filter.gain_at(2.0) < 0.05);
        // -3 dB at the edges
        assert!((filter.gain_at(HIGH_CUTOFF_HZ) - 0.7071).abs() < 0.02);
        assert!((filter.gain_at(LOW_CUTOFF_HZ) - 0.7071).abs() < 0.02);
    }

    #[test]
    fn test_zero_phase_in_band() {
        let input = sine(80.0, 3.0);
        let filter = BandPassFilter::heart_band(SR).unwrap();
        let output = filter.filtfilt(&input).unwrap();
        assert_eq!(output.len(), input.len());

        // Middle second, away from edge transients
        let mid = SR as usize..2 * SR as usize;
        let max_diff = input[mid.clone()]
            .iter()
            .zip(&output[mid])
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_diff < 0.05, "max diff {}", max_diff);
    }

    #[test]
    fn test_out_of_band_attenuated() {
        let input = sine(500.0, 3.0);
        let filter = BandPassFilter::heart_band(SR).unwrap();
        let output = filter.filtfilt(&input).unwrap();
        let mid = SR as usize..2 * SR as usize;
        let ratio = rms(&output[mid.clone()]) / rms(&input[mid]);
        assert!(ratio < 0.1, "ratio {}", ratio);
    }

    #[test]
    fn test_rejects_invalid_band() {
        assert!(BandPassFilter::design(150.0, 20.0, SR).is_err());
        assert!(BandPassFilter::design(0.0, 150.0, SR).is_err());
        assert!(BandPassFilter::design(20.0, 150.0, 200).is_err());
        assert!(BandPassFilter::design(20.0, 150.0, 0).is_err());
    }

    #[test]
    fn test_too_short_to_pad() {
        let filter = BandPassFilter::heart_band(SR).unwrap();
        assert!(matches!(
            filter.filtfilt(&[0.0; PAD_LEN]),
            Err(LatidoError::FilterError { .. })
        ));
        assert!(filter.filtfilt(&[]).is_err());
        assert_eq!(filter.filtfilt(&[0.0; PAD_LEN + 1]).unwrap().len(), PAD_LEN + 1);
    }

    #[test]
    fn test_silence_and_nan_do_not_panic() {
        let silent = Waveform::new(vec![0.0; 1600], SR);
        let out = bandpass(&silent).unwrap();
        assert!(out.samples.iter().all(|&s| s == 0.0));

        let mut noisy = vec![0.0f32; 1600];
        noisy[100] = f32::NAN;
        let out = bandpass(&Waveform::new(noisy, SR)).unwrap();
        assert_eq!(out.len(), 1600);
    }

    #[test]
    fn test_odd_extend() {
        let ext = odd_extend(&[1.0, 2.0, 4.0, 7.0], 2);
        assert_eq!(ext, vec![-3.0, 0.0, 1.0, 2.0, 4.0, 7.0, 10.0, 12.0]);
    }
}
