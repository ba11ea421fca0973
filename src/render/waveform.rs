//! Waveform plot with beat markers
//!
//! Draws amplitude against time into an RGB image: a grey baseline, the
//! waveform as per-column min/max spans, one tick per second, and a dashed
//! red line at every detected beat.

use crate::error::{ErrorContext, Result};
use crate::types::{BeatSet, Waveform};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Plot width in pixels
pub const PLOT_WIDTH: u32 = 1000;

/// Plot height in pixels
pub const PLOT_HEIGHT: u32 = 300;

const MARGIN: u32 = 20;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([160, 160, 160]);
const WAVE: Rgb<u8> = Rgb([31, 119, 180]);
const MARKER: Rgb<u8> = Rgb([214, 39, 40]);

/// Dash pattern for beat markers, in pixels
const DASH_ON: u32 = 6;
const DASH_OFF: u32 = 4;

/// Plot geometry shared by the drawing helpers
struct Canvas {
    img: RgbImage,
    left: u32,
    right: u32,
    top: u32,
    bottom: u32,
}

impl Canvas {
    fn new(width: u32, height: u32) -> Self {
        Self {
            img: RgbImage::from_pixel(width, height, BACKGROUND),
            left: MARGIN,
            right: width - MARGIN,
            top: MARGIN,
            bottom: height - MARGIN,
        }
    }

    fn plot_width(&self) -> u32 {
        self.right - self.left
    }

    fn mid_y(&self) -> u32 {
        (self.top + self.bottom) / 2
    }

    /// Map a normalised amplitude in [-1, 1] to a pixel row
    fn amplitude_to_y(&self, amplitude: f32) -> u32 {
        let half = (self.bottom - self.top) as f32 / 2.0;
        let y = self.mid_y() as f32 - amplitude.clamp(-1.0, 1.0) * half;
        (y.round() as u32).clamp(self.top, self.bottom)
    }

    /// Map a time in seconds to a pixel column
    fn time_to_x(&self, secs: f64, duration: f64) -> Option<u32> {
        if duration <= 0.0 || !(0.0..=duration).contains(&secs) {
            return None;
        }
        let x = self.left as f64 + secs / duration * (self.plot_width() - 1) as f64;
        Some(x.round() as u32)
    }

    fn vline(&mut self, x: u32, y0: u32, y1: u32, color: Rgb<u8>) {
        for y in y0.min(y1)..=y0.max(y1) {
            self.img.put_pixel(x, y, color);
        }
    }

    fn hline(&mut self, y: u32, color: Rgb<u8>) {
        for x in self.left..self.right {
            self.img.put_pixel(x, y, color);
        }
    }

    fn dashed_vline(&mut self, x: u32, color: Rgb<u8>) {
        for y in self.top..=self.bottom {
            if (y - self.top) % (DASH_ON + DASH_OFF) < DASH_ON {
                self.img.put_pixel(x, y, color);
            }
        }
    }
}

/// Render the plot as an in-memory image
pub fn render_image(waveform: &Waveform, beats: &BeatSet) -> RgbImage {
    let mut canvas = Canvas::new(PLOT_WIDTH, PLOT_HEIGHT);
    let mid = canvas.mid_y();
    canvas.hline(mid, AXIS);

    let duration = waveform.duration;
    if waveform.is_empty() || duration <= 0.0 {
        return canvas.img;
    }

    // One tick per second along the baseline
    let mut second = 0.0;
    while second <= duration {
        if let Some(x) = canvas.time_to_x(second, duration) {
            canvas.vline(x, mid.saturating_sub(4), mid + 4, AXIS);
        }
        second += 1.0;
    }

    let peak = waveform
        .samples
        .iter()
        .filter(|s| s.is_finite())
        .fold(0.0f32, |acc, s| acc.max(s.abs()));
    let scale = if peak > 0.0 { 1.0 / peak } else { 1.0 };

    let columns = canvas.plot_width() as usize;
    let n = waveform.len();
    for col in 0..columns {
        let start = col * n / columns;
        let end = ((col + 1) * n / columns).max(start + 1).min(n);
        if start >= n {
            break;
        }

        let (lo, hi) = waveform.samples[start..end]
            .iter()
            .filter(|s| s.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| {
                (lo.min(s), hi.max(s))
            });
        if lo > hi {
            continue;
        }

        let x = canvas.left + col as u32;
        let y_top = canvas.amplitude_to_y(hi * scale);
        let y_bottom = canvas.amplitude_to_y(lo * scale);
        canvas.vline(x, y_top, y_bottom, WAVE);
    }

    for &t in &beats.times {
        if let Some(x) = canvas.time_to_x(t, duration) {
            canvas.dashed_vline(x, MARKER);
        }
    }

    canvas.img
}

/// Render the plot and encode it as PNG bytes
pub fn render_png(waveform: &Waveform, beats: &BeatSet) -> Result<Vec<u8>> {
    let img = render_image(waveform, beats);
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| format!("PNG encoding failed: {}", e))
        .with_stage("render")?;
    Ok(buf)
}

/// Render the plot as a base64-encoded PNG
pub fn render_base64(waveform: &Waveform, beats: &BeatSet) -> Result<String> {
    render_png(waveform, beats).map(|png| STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn sine(secs: f64) -> Waveform {
        let n = (secs * 16000.0) as usize;
        let samples = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 5.0 * i as f32 / 16000.0).sin())
            .collect();
        Waveform::new(samples, 16000)
    }

    #[test]
    fn test_png_has_expected_size() {
        let png = render_png(&sine(2.0), &BeatSet::default()).unwrap();
        assert_eq!(&png[..8], &PNG_MAGIC);
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), PLOT_WIDTH);
        assert_eq!(decoded.height(), PLOT_HEIGHT);
    }

    #[test]
    fn test_markers_are_drawn() {
        let beats = BeatSet {
            times: vec![1.0],
            bpm: Some(30.0),
        };
        let img = render_image(&sine(2.0), &beats);
        let reds = img.pixels().filter(|p| **p == MARKER).count();
        assert!(reds > 100, "only {} marker pixels", reds);

        let plain = render_image(&sine(2.0), &BeatSet::default());
        assert_eq!(plain.pixels().filter(|p| **p == MARKER).count(), 0);
    }

    #[test]
    fn test_empty_waveform_is_blank_plot() {
        let img = render_image(&Waveform::new(Vec::new(), 16000), &BeatSet::default());
        assert_eq!(img.pixels().filter(|p| **p == WAVE).count(), 0);
        assert!(render_base64(&Waveform::new(Vec::new(), 16000), &BeatSet::default()).is_ok());
    }

    #[test]
    fn test_base64_decodes_to_png() {
        let encoded = render_base64(&sine(0.5), &BeatSet::default()).unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        assert_eq!(&bytes[..8], &PNG_MAGIC);
    }
}
