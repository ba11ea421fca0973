//! Heartbeat detection from the amplitude envelope
//!
//! The filtered waveform is rectified and smoothed with a short centred
//! moving average. Envelope peaks that stand clearly above the average level
//! and are far enough apart are counted as beats; BPM follows from the count
//! and the clip duration.

pub mod peaks;

use crate::analysis::traits::BeatDetector;
use crate::error::Result;
use crate::types::{BeatSet, Waveform};
use tracing::debug;

/// Shortest allowed gap between two beats (150 BPM ceiling)
pub const MIN_PEAK_SPACING_SECS: f64 = 0.4;

/// A beat must reach this multiple of the mean envelope level
pub const PEAK_HEIGHT_FACTOR: f64 = 1.2;

/// Moving-average window used to smooth the rectified signal
pub const SMOOTHING_WINDOW_SECS: f64 = 0.05;

/// Envelope peak-picking beat detector
#[derive(Debug, Clone)]
pub struct PeakBeatDetector {
    min_spacing_secs: f64,
    height_factor: f64,
    smoothing_secs: f64,
}

impl PeakBeatDetector {
    pub fn new() -> Self {
        Self {
            min_spacing_secs: MIN_PEAK_SPACING_SECS,
            height_factor: PEAK_HEIGHT_FACTOR,
            smoothing_secs: SMOOTHING_WINDOW_SECS,
        }
    }

    /// Smoothed absolute amplitude, same length as the input
    pub fn envelope(&self, waveform: &Waveform) -> Vec<f64> {
        let window = secs_to_samples(self.smoothing_secs, waveform.sample_rate).max(1);
        moving_average(&waveform.samples, window)
    }
}

impl Default for PeakBeatDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl BeatDetector for PeakBeatDetector {
    fn detect(&self, waveform: &Waveform) -> Result<BeatSet> {
        if waveform.is_empty() || waveform.sample_rate == 0 {
            return Ok(BeatSet::default());
        }

        let envelope = self.envelope(waveform);
        let mean = envelope.iter().sum::<f64>() / envelope.len() as f64;
        let min_height = self.height_factor * mean;
        let min_distance = secs_to_samples(self.min_spacing_secs, waveform.sample_rate).max(1);

        let found = peaks::find_peaks(&envelope, min_height, min_distance);

        let sr = waveform.sample_rate as f64;
        let times: Vec<f64> = found.iter().map(|&i| i as f64 / sr).collect();
        let bpm = if times.is_empty() {
            None
        } else {
            Some(round1(times.len() as f64 / waveform.duration * 60.0))
        };

        debug!(
            "Found {} beats in {:.2}s (threshold {:.5}, spacing {} samples)",
            times.len(),
            waveform.duration,
            min_height,
            min_distance
        );

        Ok(BeatSet { times, bpm })
    }

    fn name(&self) -> &'static str {
        "envelope-peaks"
    }
}

fn secs_to_samples(secs: f64, sample_rate: u32) -> usize {
    (secs * sample_rate as f64).round() as usize
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Centred moving average of `|x|` with zero padding outside the signal
///
/// Sample `i` averages `x[i - w/2 ..= i + (w - 1) / 2]` (integer halves,
/// the longer half on the left for even windows), always divided by `w`.
fn moving_average(samples: &[f32], window: usize) -> Vec<f64> {
    let n = samples.len();
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0f64);
    let mut acc = 0.0f64;
    for &s in samples {
        acc += (s as f64).abs();
        prefix.push(acc);
    }

    let ahead = (window - 1) / 2;
    let behind = window - 1 - ahead;
    let w = window as f64;

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(behind);
            let hi = (i + ahead + 1).min(n);
            (prefix[hi] - prefix[lo]) / w
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 16_000;

    /// Short bursts of a decaying 60 Hz tone at each beat time
    fn clip_with_beats(beat_times: &[f64], secs: f64) -> Waveform {
        let n = (secs * SR as f64) as usize;
        let mut samples = vec![0.0f32; n];
        for &t in beat_times {
            let start = (t * SR as f64) as usize;
            for k in 0..800 {
                if start + k < n {
                    let decay = (-(k as f32) / 200.0).exp();
                    let phase = 2.0 * std::f32::consts::PI * 60.0 * k as f32 / SR as f32;
                    samples[start + k] += phase.sin() * decay * 0.8;
                }
            }
        }
        Waveform::new(samples, SR)
    }

    #[test]
    fn test_moving_average_matches_centred_window() {
        let x = [1.0f32, -2.0, 3.0, -4.0, 5.0];
        // Window 3: one sample on each side
        let avg = moving_average(&x, 3);
        assert!((avg[0] - 1.0).abs() < 1e-12);
        assert!((avg[2] - 3.0).abs() < 1e-12);
        assert!((avg[4] - 3.0).abs() < 1e-12);

        // Window 4: two behind, one ahead
        let avg = moving_average(&x, 4);
        assert!((avg[2] - 2.5).abs() < 1e-12);
        assert!((avg[0] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_evenly_spaced_beats() {
        // 8 beats in 8 s: 60 BPM
        let times: Vec<f64> = (0..8).map(|i| 0.5 + i as f64).collect();
        let beats = PeakBeatDetector::new().detect(&clip_with_beats(&times, 8.0)).unwrap();
        assert_eq!(beats.len(), 8);
        assert!((beats.bpm.unwrap() - 60.0).abs() <= 0.5);
        for (found, expected) in beats.times.iter().zip(&times) {
            assert!((found - expected).abs() < 0.05, "{} vs {}", found, expected);
        }
    }

    /// Unit single-sample impulses at the given sample offsets
    fn impulses(offsets: impl IntoIterator<Item = usize>, secs: f64) -> Waveform {
        let mut samples = vec![0.0f32; (secs * SR as f64) as usize];
        for i in offsets {
            samples[i] = 1.0;
        }
        Waveform::new(samples, SR)
    }

    #[test]
    fn test_single_sample_impulses_are_counted() {
        let detector = PeakBeatDetector::new();
        let sr = SR as usize;

        // 6 impulses over 6 s
        let beats = detector
            .detect(&impulses((0..6).map(|k| k * sr + sr / 2), 6.0))
            .unwrap();
        assert_eq!(beats.len(), 6);
        assert_eq!(beats.bpm, Some(60.0));
        assert!((beats.times[0] - 0.5).abs() < 1e-3);

        // 10 impulses over 5 s
        let beats = detector
            .detect(&impulses((0..10).map(|k| k * sr / 2 + sr / 4), 5.0))
            .unwrap();
        assert_eq!(beats.len(), 10);
        assert_eq!(beats.bpm, Some(120.0));
    }

    #[test]
    fn test_impulse_on_first_sample_is_not_a_peak() {
        // The envelope plateau touching sample 0 has no rising edge
        let sr = SR as usize;
        let beats = PeakBeatDetector::new()
            .detect(&impulses((0..8).map(|k| k * sr), 8.0))
            .unwrap();
        assert_eq!(beats.len(), 7);
        assert!((beats.times[0] - 1.0).abs() < 1e-3);
        assert_eq!(beats.bpm, Some(52.5));
    }

    #[test]
    fn test_times_strictly_increasing() {
        let times: Vec<f64> = (0..12).map(|i| 0.3 + i as f64 * 0.75).collect();
        let beats = PeakBeatDetector::new().detect(&clip_with_beats(&times, 9.5)).unwrap();
        assert!(beats.times.windows(2).all(|w| w[0] < w[1]));
        assert!(beats
            .times
            .windows(2)
            .all(|w| w[1] - w[0] >= MIN_PEAK_SPACING_SECS - 1e-9));
    }

    #[test]
    fn test_silence_has_no_bpm() {
        let beats = PeakBeatDetector::new()
            .detect(&Waveform::new(vec![0.0; 16000], SR))
            .unwrap();
        assert!(beats.is_empty());
        assert_eq!(beats.bpm, None);
    }

    #[test]
    fn test_empty_waveform() {
        let beats = PeakBeatDetector::new()
            .detect(&Waveform::new(Vec::new(), SR))
            .unwrap();
        assert_eq!(beats, BeatSet::default());
    }

    #[test]
    fn test_detection_is_idempotent() {
        let wf = clip_with_beats(&[0.5, 1.3, 2.1, 2.9], 4.0);
        let detector = PeakBeatDetector::new();
        assert_eq!(detector.detect(&wf).unwrap(), detector.detect(&wf).unwrap());
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(72.34), 72.3);
        assert_eq!(round1(59.96), 60.0);
    }
}
