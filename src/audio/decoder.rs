//! Audio decoding using symphonia
//!
//! Decodes uploaded audio bytes, entirely in memory, to mono f32 samples at
//! the canonical analysis rate. Uses rubato for resampling with proper
//! anti-aliasing. Recordings longer than the analysis window are truncated.

use crate::error::{LatidoError, Result};
use crate::types::{RawAudioBlob, Waveform};
use rubato::{FftFixedInOut, Resampler};
use std::io::Cursor;
use std::path::Path;
use std::process::{Command, Stdio};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace, warn};

/// Target sample rate for analysis (16 kHz)
///
/// Heart sounds live well below 1 kHz; 16 kHz keeps the spectral features
/// comparable to the ones the classifier was trained on.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Longest stretch of audio analysed per request, in seconds
pub const MAX_DURATION_SECS: u32 = 10;

/// Sample cap after normalization
pub const MAX_SAMPLES: usize = (TARGET_SAMPLE_RATE * MAX_DURATION_SECS) as usize;

/// Largest upload we'll attempt to decode (50 MiB)
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Name prefix of the ffmpeg fallback's scratch directories
const SCRATCH_PREFIX: &str = "latido-";

/// Decoder behaviour switches
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    /// Retry through an `ffmpeg` subprocess when symphonia cannot decode
    pub ffmpeg_fallback: bool,
}

/// Decode an uploaded blob to a mono 16 kHz waveform
pub fn decode(blob: &RawAudioBlob, options: &DecodeOptions) -> Result<Waveform> {
    if blob.is_empty() {
        return Err(LatidoError::decode_error(&blob.filename, "Upload is empty"));
    }

    if blob.len() > MAX_UPLOAD_BYTES {
        return Err(LatidoError::decode_error(
            &blob.filename,
            format!(
                "Upload too large ({} bytes). Maximum supported size is {} bytes (50 MiB).",
                blob.len(),
                MAX_UPLOAD_BYTES
            ),
        ));
    }

    let hint_ext = blob.extension();
    match decode_bytes(blob.bytes.clone(), hint_ext.as_deref(), &blob.filename) {
        Ok(waveform) => Ok(waveform),
        Err(err) if options.ffmpeg_fallback => {
            warn!(
                "symphonia could not decode '{}' ({}), retrying through ffmpeg",
                blob.filename, err
            );
            match transcode_with_ffmpeg(blob) {
                Ok(wav) => decode_bytes(wav, Some("wav"), &blob.filename)
                    .map_err(LatidoError::after_fallback),
                Err(fallback_err) => {
                    debug!("ffmpeg fallback failed: {}", fallback_err);
                    Err(err.after_fallback())
                }
            }
        }
        Err(err) => Err(err),
    }
}

/// Decode container bytes with symphonia
fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>, source_name: &str) -> Result<Waveform> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    // The declared extension is only a hint; probing looks at the bytes
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| {
            LatidoError::decode_error(source_name, format!("Failed to probe format: {}", e))
        })?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| LatidoError::decode_error(source_name, "No audio tracks found"))?;

    let track_id = track.id;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| {
            LatidoError::decode_error(source_name, format!("Failed to create decoder: {}", e))
        })?;

    // Created on the first decoded buffer, whose spec is authoritative
    let mut resampler: Option<PacketResampler> = None;
    let mut mono: Vec<f32> = Vec::new();

    while !resampler.as_ref().is_some_and(PacketResampler::is_full) {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(LatidoError::decode_error(
                    source_name,
                    format!("Failed to read packet: {}", e),
                ));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                trace!("Skipping corrupted frame: {}", e);
                continue;
            }
            Err(e) => {
                return Err(LatidoError::decode_error(
                    source_name,
                    format!("Decode error: {}", e),
                ));
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);

        if resampler.is_none() {
            if spec.rate == 0 {
                return Err(LatidoError::decode_error(
                    source_name,
                    "Stream reports a sample rate of 0 Hz",
                ));
            }
            debug!(
                "Decoding: {} @ {}Hz, {} channels",
                source_name, spec.rate, channels
            );
            resampler = Some(PacketResampler::new(spec.rate));
        }

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        downmix_into(sample_buf.samples(), channels, &mut mono);
        if let Some(stream) = resampler.as_mut() {
            stream.push(&mono);
        }
    }

    let stream = resampler
        .filter(|stream| stream.consumed > 0)
        .ok_or_else(|| LatidoError::decode_error(source_name, "Container holds no audio samples"))?;

    let mut samples = stream.finish();
    samples.truncate(MAX_SAMPLES);

    debug!(
        "Decoded {} samples ({:.2}s)",
        samples.len(),
        samples.len() as f64 / TARGET_SAMPLE_RATE as f64
    );

    Ok(Waveform::new(samples, TARGET_SAMPLE_RATE))
}

/// Average interleaved frames into `out`, replacing its contents
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    out.clear();
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }

    let scale = 1.0 / channels as f32;
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}

/// Transcode an upload to mono 16 kHz WAV with an `ffmpeg` subprocess
///
/// The scratch directory lives only for the duration of this call and is
/// removed when it goes out of scope, whichever way the function returns.
fn transcode_with_ffmpeg(blob: &RawAudioBlob) -> Result<Vec<u8>> {
    let scratch = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir()
        .map_err(|e| {
            LatidoError::decode_error(&blob.filename, format!("Cannot create scratch dir: {}", e))
        })?;

    let ext = blob.extension().unwrap_or_else(|| "bin".to_string());
    let input = scratch.path().join(format!("upload.{}", ext));
    let output = scratch.path().join("normalized.wav");

    std::fs::write(&input, &blob.bytes).map_err(|e| {
        LatidoError::decode_error(&blob.filename, format!("Cannot stage upload: {}", e))
    })?;

    run_ffmpeg(&input, &output).map_err(|reason| LatidoError::decode_error(&blob.filename, reason))?;

    std::fs::read(&output).map_err(|e| {
        LatidoError::decode_error(&blob.filename, format!("ffmpeg produced no output: {}", e))
    })
}

fn run_ffmpeg(input: &Path, output: &Path) -> std::result::Result<(), String> {
    let sample_rate = TARGET_SAMPLE_RATE.to_string();
    let max_duration = MAX_DURATION_SECS.to_string();

    let status = Command::new("ffmpeg")
        .arg("-v")
        .arg("quiet")
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-ac", "1", "-ar", sample_rate.as_str(), "-t", max_duration.as_str()])
        .arg(output)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| format!("Cannot launch ffmpeg (is it on PATH?): {}", e))?;

    if status.success() {
        Ok(())
    } else {
        Err(format!("ffmpeg exited with {}", status))
    }
}

/// Rubato input chunk request; the resampler rounds it to fit the rate ratio
const CHUNK_SIZE: usize = 1024;

enum Engine {
    /// Source already at the target rate
    Passthrough,
    Fft(Box<FftFixedInOut<f32>>),
    /// Linear interpolation over everything not yet resampled
    Linear,
}

/// Mono resampler to the analysis rate, fed one decoded packet at a time
///
/// Rubato works on fixed-size chunks, so samples wait in `pending` until a
/// full chunk is available. Input beyond the analysis window is dropped on
/// arrival. If rubato cannot be built, or fails mid-stream, the rest of the
/// stream goes through linear interpolation instead.
struct PacketResampler {
    from_rate: u32,
    engine: Engine,
    pending: Vec<f32>,
    output: Vec<f32>,
    /// Source frames accepted so far
    consumed: usize,
    /// Source frames that make up the analysis window
    capacity: usize,
}

impl PacketResampler {
    fn new(from_rate: u32) -> Self {
        let engine = if from_rate == TARGET_SAMPLE_RATE {
            Engine::Passthrough
        } else {
            match FftFixedInOut::<f32>::new(
                from_rate as usize,
                TARGET_SAMPLE_RATE as usize,
                CHUNK_SIZE,
                1,
            ) {
                Ok(r) => Engine::Fft(Box::new(r)),
                Err(e) => {
                    debug!("Rubato initialization failed ({}), using fallback", e);
                    Engine::Linear
                }
            }
        };

        Self {
            from_rate,
            engine,
            pending: Vec::new(),
            output: Vec::with_capacity(MAX_SAMPLES),
            consumed: 0,
            capacity: from_rate as usize * MAX_DURATION_SECS as usize,
        }
    }

    fn is_full(&self) -> bool {
        self.consumed >= self.capacity
    }

    fn push(&mut self, samples: &[f32]) {
        let take = samples.len().min(self.capacity - self.consumed);
        let samples = &samples[..take];
        self.consumed += take;

        match self.engine {
            Engine::Passthrough => self.output.extend_from_slice(samples),
            Engine::Linear => self.pending.extend_from_slice(samples),
            Engine::Fft(_) => {
                self.pending.extend_from_slice(samples);
                self.drain_full_chunks();
            }
        }
    }

    fn drain_full_chunks(&mut self) {
        loop {
            let Engine::Fft(resampler) = &mut self.engine else {
                return;
            };
            let needed = resampler.input_frames_next();
            if self.pending.len() < needed {
                return;
            }

            match resampler.process(&[&self.pending[..needed]], None) {
                Ok(resampled) => {
                    if let Some(channel) = resampled.into_iter().next() {
                        self.output.extend(channel);
                    }
                    self.pending.drain(..needed);
                }
                Err(e) => {
                    debug!("Rubato processing error ({}), using fallback for remaining", e);
                    self.engine = Engine::Linear;
                    return;
                }
            }
        }
    }

    /// Flush the tail and trim padding from the output
    fn finish(mut self) -> Vec<f32> {
        let expected = (self.consumed as f64 * TARGET_SAMPLE_RATE as f64 / self.from_rate as f64)
            .ceil() as usize;

        let tail_chunk = match &self.engine {
            Engine::Fft(resampler) if !self.pending.is_empty() => Some(resampler.input_frames_next()),
            _ => None,
        };
        if let Some(needed) = tail_chunk {
            self.pending.resize(needed, 0.0);
            self.drain_full_chunks();
        }

        if matches!(self.engine, Engine::Linear) {
            let tail = resample_linear(&self.pending, self.from_rate, TARGET_SAMPLE_RATE);
            self.output.extend(tail);
        }

        self.output.truncate(expected);
        self.output
    }
}

/// Linear interpolation between neighbouring source samples
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let step = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / step) as usize;
    let last = samples.len() - 1;

    (0..output_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64) as f32;
            samples[idx] + (samples[next] - samples[idx]) * frac
        })
        .collect()
}
