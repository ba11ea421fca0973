//! latido - Heart-sound triage from short recorded clips
//!
//! Turns a phone recording of heart sounds into a rhythm verdict, a measured
//! heart rate, a consistency check between the two, and a waveform plot.
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! - `config`: CLI argument parsing and runtime settings
//! - `discovery`: Recording discovery for batch runs
//! - `audio`: In-memory decoding (symphonia) and the heart-band filter
//! - `analysis`: Features, classifier adapter, beat detection, consistency
//! - `render`: Waveform plot with beat markers as base64 PNG
//! - `pipeline`: Per-request fork-join and request-parallel orchestration
//! - `export`: Flat output document and JSON report
//!
//! # Example
//!
//! ```no_run
//! use latido::analysis::load_classifier;
//! use latido::audio::DecodeOptions;
//! use latido::config::Settings;
//! use latido::pipeline::Analyzer;
//! use latido::types::{AnalysisRequest, GlucoseReading, GlucoseUnit, RawAudioBlob};
//!
//! let classifier = load_classifier(&Settings::default()).expect("model");
//! let analyzer = Analyzer::new(classifier, DecodeOptions::default());
//! let request = AnalysisRequest {
//!     audio: RawAudioBlob::from_path("grabacion.3gp".as_ref()).expect("read"),
//!     glucose: GlucoseReading::new(98.0, GlucoseUnit::MgDl),
//! };
//! let document = latido::export::AnalysisDocument::from(&analyzer.analyze(&request));
//! println!("{}", serde_json::to_string(&document).unwrap());
//! ```

pub mod analysis;
pub mod audio;
pub mod config;
pub mod discovery;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod render;
pub mod types;

// Re-export key types at crate root
pub use error::{LatidoError, Result};
pub use types::{AnalysisRequest, BeatSet, FeatureVector, RhythmLabel, Waveform};
