//! Integration tests for the latido pipeline
//!
//! These tests drive recordings through decode, filter, features, beats,
//! and export, and check the flat documents that come out the other end.

use latido::analysis::{extract_features, PlaceholderClassifier};
use latido::audio::{bandpass, decode, DecodeOptions, MAX_SAMPLES, TARGET_SAMPLE_RATE};
use latido::config::Settings;
use latido::export::{read_report, AnalysisDocument};
use latido::pipeline::{self, Analyzer};
use latido::types::{AnalysisRequest, GlucoseReading, GlucoseUnit, RawAudioBlob, FEATURE_LEN};
use std::f32::consts::PI;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Write a 16-bit WAV file with the given channel layout
fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: &[f32]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV file");
    for &sample in frames {
        for _ in 0..channels {
            writer
                .write_sample((sample * 32767.0) as i16)
                .expect("Failed to write sample");
        }
    }
    writer.finalize().expect("Failed to finalize WAV");
}

/// Synthetic heartbeat: short 60 Hz bursts at a fixed spacing
///
/// The first beat sits half a spacing in, so the clip holds exactly
/// `beats` bursts.
fn heartbeat(beats: usize, spacing_secs: f32, sample_rate: u32) -> Vec<f32> {
    let total = (beats as f32 * spacing_secs * sample_rate as f32) as usize;
    let burst_len = (0.06 * sample_rate as f32) as usize;
    let mut samples = vec![0.0f32; total];

    for beat in 0..beats {
        let start = ((beat as f32 + 0.5) * spacing_secs * sample_rate as f32) as usize;
        for i in 0..burst_len {
            let idx = start + i;
            if idx >= total {
                break;
            }
            let t = i as f32 / sample_rate as f32;
            let window = (PI * i as f32 / burst_len as f32).sin();
            samples[idx] = 0.8 * window * (2.0 * PI * 60.0 * t).sin();
        }
    }

    samples
}

fn sine(frequency_hz: f32, duration_secs: f32, sample_rate: u32) -> Vec<f32> {
    let n = (duration_secs * sample_rate as f32) as usize;
    (0..n)
        .map(|i| (2.0 * PI * frequency_hz * i as f32 / sample_rate as f32).sin() * 0.5)
        .collect()
}

fn request_for(path: &Path) -> AnalysisRequest {
    AnalysisRequest {
        audio: RawAudioBlob::from_path(path).expect("Failed to read clip"),
        glucose: GlucoseReading::new(98.0, GlucoseUnit::MgDl),
    }
}

fn analyzer(class_id: i64) -> Analyzer {
    Analyzer::new(
        Arc::new(PlaceholderClassifier::new(class_id)),
        DecodeOptions::default(),
    )
}

fn document_value(analyzer: &Analyzer, request: &AnalysisRequest) -> serde_json::Value {
    let result = analyzer.analyze(request);
    serde_json::to_value(AnalysisDocument::from(&result)).expect("Failed to serialize")
}

/// Create test settings with progress bars disabled
fn create_test_settings(input: &Path, output: &Path) -> Settings {
    Settings {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        glucose: GlucoseReading::new(98.0, GlucoseUnit::MgDl),
        analysis_threads: 2,
        recursive: true,
        show_progress: false,
        ..Settings::default()
    }
}

#[test]
fn test_five_beats_one_second_apart_reads_sixty_bpm() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let clip = dir.path().join("latido.wav");
    write_wav(&clip, 1, 16000, &heartbeat(5, 1.0, 16000));

    let doc = document_value(&analyzer(0), &request_for(&clip));

    assert_eq!(doc["error"], "");
    let bpm = doc["bpm"].as_f64().expect("bpm should be a number");
    assert!((bpm - 60.0).abs() <= 1.0, "Expected ~60 BPM, got {}", bpm);

    // 60 BPM agrees with a Normal prediction
    assert_eq!(doc["resultado"], 0);
    assert_eq!(doc["anomaly_type"], "Normal");
    assert_eq!(doc["inconsistente"], false);
    assert!(!doc["encouragement"].as_str().unwrap().is_empty());
    assert_eq!(doc["glucosa_mg_dl"].as_f64(), Some(98.0));

    let png = doc["waveform_png"].as_str().expect("plot should be present");
    assert!(!png.is_empty());
}

#[test]
fn test_tachycardia_at_normal_rate_is_overridden() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let clip = dir.path().join("latido.wav");
    write_wav(&clip, 1, 16000, &heartbeat(5, 1.0, 16000));

    let doc = document_value(&analyzer(2), &request_for(&clip));

    assert_eq!(doc["error"], "");
    assert_eq!(doc["resultado"], 0);
    assert_eq!(doc["anomaly_type"], "Normal");
    assert_eq!(doc["inconsistente"], true);
}

#[test]
fn test_tachycardia_at_fast_rate_is_kept() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let clip = dir.path().join("rapido.wav");
    // 0.5 s spacing is 120 BPM
    write_wav(&clip, 1, 16000, &heartbeat(10, 0.5, 16000));

    let doc = document_value(&analyzer(2), &request_for(&clip));

    assert_eq!(doc["error"], "");
    let bpm = doc["bpm"].as_f64().expect("bpm should be a number");
    assert!((bpm - 120.0).abs() <= 2.0, "Expected ~120 BPM, got {}", bpm);
    assert_eq!(doc["resultado"], 2);
    assert_eq!(doc["anomaly_type"], "Taquicardia");
    assert_eq!(doc["inconsistente"], false);
    assert_eq!(doc["encouragement"], "");
}

#[test]
fn test_unknown_class_id_passes_through() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let clip = dir.path().join("raro.wav");
    write_wav(&clip, 1, 16000, &heartbeat(5, 1.0, 16000));

    let doc = document_value(&analyzer(7), &request_for(&clip));

    assert_eq!(doc["error"], "");
    assert_eq!(doc["resultado"], 7);
    assert_eq!(doc["anomaly_type"], "Desconocido");
    assert_eq!(doc["inconsistente"], false);
}

#[test]
fn test_malformed_upload_is_error_shaped() {
    let request = AnalysisRequest {
        audio: RawAudioBlob::new(b"definitely not audio".to_vec(), "roto.3gp"),
        glucose: GlucoseReading::new(98.0, GlucoseUnit::MgDl),
    };

    let doc = document_value(&analyzer(0), &request);

    assert!(!doc["error"].as_str().unwrap().is_empty());
    assert!(doc["waveform_png"].is_null());
    assert!(doc.get("resultado").is_none());
    assert!(doc.get("bpm").is_none());
}

#[test]
fn test_empty_upload_is_error_shaped() {
    let request = AnalysisRequest {
        audio: RawAudioBlob::new(Vec::new(), "vacio.wav"),
        glucose: GlucoseReading::new(98.0, GlucoseUnit::MgDl),
    };

    let doc = document_value(&analyzer(0), &request);
    assert!(!doc["error"].as_str().unwrap().is_empty());
    assert!(doc["waveform_png"].is_null());
}

#[test]
fn test_decoder_normalizes_rate_and_channels() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let clip = dir.path().join("estereo.wav");
    write_wav(&clip, 2, 44100, &sine(80.0, 3.0, 44100));

    let blob = RawAudioBlob::from_path(&clip).unwrap();
    let waveform = decode(&blob, &DecodeOptions::default()).unwrap();

    assert_eq!(waveform.sample_rate, TARGET_SAMPLE_RATE);
    assert_eq!(waveform.channels(), 1);
    let expected = 3.0 * TARGET_SAMPLE_RATE as f64;
    let actual = waveform.len() as f64;
    assert!(
        (actual - expected).abs() / expected < 0.02,
        "Expected ~{} samples, got {}",
        expected,
        actual
    );
}

#[test]
fn test_decoder_caps_long_recordings() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let clip = dir.path().join("largo.wav");
    write_wav(&clip, 1, 16000, &sine(80.0, 12.0, 16000));

    let blob = RawAudioBlob::from_path(&clip).unwrap();
    let waveform = decode(&blob, &DecodeOptions::default()).unwrap();

    assert_eq!(waveform.len(), MAX_SAMPLES);
    assert!((waveform.duration - 10.0).abs() < 1e-6);
}

#[test]
fn test_feature_vector_has_fixed_length() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let clip = dir.path().join("latido.wav");
    write_wav(&clip, 1, 16000, &heartbeat(4, 1.0, 16000));

    let blob = RawAudioBlob::from_path(&clip).unwrap();
    let waveform = decode(&blob, &DecodeOptions::default()).unwrap();
    let filtered = bandpass(&waveform).unwrap();
    let features = extract_features(&filtered).unwrap();

    assert_eq!(features.len(), FEATURE_LEN);
    assert_eq!(features.len(), 32);
    assert!(features.as_slice().iter().all(|v| v.is_finite()));
}

#[test]
fn test_analysis_is_deterministic_apart_from_encouragement() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let clip = dir.path().join("latido.wav");
    write_wav(&clip, 1, 16000, &heartbeat(5, 1.0, 16000));

    let analyzer = analyzer(0);
    let request = request_for(&clip);
    let mut first = document_value(&analyzer, &request);
    let mut second = document_value(&analyzer, &request);
    first["encouragement"] = serde_json::Value::Null;
    second["encouragement"] = serde_json::Value::Null;

    assert_eq!(first, second);
}

#[test]
fn test_pipeline_writes_directory_report() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    let output_dir = TempDir::new().expect("Failed to create output temp dir");

    write_wav(
        &input_dir.path().join("a_normal.wav"),
        1,
        16000,
        &heartbeat(5, 1.0, 16000),
    );
    write_wav(
        &input_dir.path().join("b_rapido.wav"),
        1,
        16000,
        &heartbeat(10, 0.5, 16000),
    );
    fs::write(input_dir.path().join("c_roto.wav"), b"garbage").unwrap();
    fs::write(input_dir.path().join("notas.txt"), b"ignored").unwrap();

    let settings = create_test_settings(input_dir.path(), output_dir.path());
    let result = pipeline::run(&settings, Arc::new(PlaceholderClassifier::new(0)))
        .expect("Pipeline failed");

    assert_eq!(result.total_clips, 3);
    assert_eq!(result.successful, 2);
    assert_eq!(result.failed, 1);

    let report_path = result.report_path.expect("directory run writes a report");
    assert_eq!(report_path, output_dir.path().join("latido.json"));

    let report = read_report(&report_path).expect("Failed to read report");
    assert_eq!(report.metadata.clip_count, 3);
    assert_eq!(report.results.len(), 3);

    let broken = report
        .results
        .iter()
        .find(|r| r.path.ends_with("c_roto.wav"))
        .expect("broken clip listed");
    assert!(broken.document.is_error());
    assert!(broken.document.analysis.is_none());

    let normal = report
        .results
        .iter()
        .find(|r| r.path.ends_with("a_normal.wav"))
        .expect("normal clip listed");
    assert!(!normal.document.is_error());
    let fields = normal.document.analysis.as_ref().expect("analytic fields");
    assert_eq!(fields.resultado, 0);
    assert!(fields.bpm.is_some());
}

#[test]
fn test_pipeline_handles_empty_directory() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    let output_dir = TempDir::new().expect("Failed to create output temp dir");

    let settings = create_test_settings(input_dir.path(), output_dir.path());
    let result = pipeline::run(&settings, Arc::new(PlaceholderClassifier::default()))
        .expect("Pipeline should succeed on empty directory");

    assert_eq!(result.total_clips, 0);
    assert!(result.report_path.is_none());
}

#[test]
fn test_pipeline_rejects_missing_input() {
    let output_dir = TempDir::new().expect("Failed to create output temp dir");
    let missing = output_dir.path().join("no_existe");

    let settings = create_test_settings(&missing, output_dir.path());
    let result = pipeline::run(&settings, Arc::new(PlaceholderClassifier::default()));

    assert!(result.is_err());
}
