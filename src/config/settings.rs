//! Runtime configuration settings

use crate::audio::DecodeOptions;
use crate::error::{LatidoError, Result};
use crate::types::{GlucoseReading, GlucoseUnit};
use std::path::PathBuf;
use tracing::warn;

/// Report file written for directory input
pub const REPORT_FILENAME: &str = "latido.json";

/// Runtime settings for the analysis pipeline
#[derive(Debug, Clone)]
pub struct Settings {
    /// Input path (file or directory)
    pub input: PathBuf,
    /// Output directory
    pub output: PathBuf,
    /// Glucose reading attached to every clip of this run
    pub glucose: GlucoseReading,
    /// Explicit classifier model path
    pub model_path: Option<PathBuf>,
    /// Number of analysis worker threads
    pub analysis_threads: usize,
    /// Scan recursively
    pub recursive: bool,
    /// Retry undecodable uploads through ffmpeg
    pub ffmpeg_fallback: bool,
    /// Show progress bars
    pub show_progress: bool,
    /// Dry run mode - show files without processing
    pub dry_run: bool,
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_cli(cli: &super::cli::Cli) -> Result<Self> {
        let default_threads = num_cpus::get().saturating_sub(1).max(1);
        let analysis_threads = cli.threads.unwrap_or(default_threads);
        if analysis_threads == 0 {
            return Err(LatidoError::ConfigError(
                "--threads must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            input: cli.input.clone(),
            output: cli.output.clone(),
            glucose: parse_glucose(cli.glucose, &cli.unit)?,
            model_path: cli.model.clone(),
            analysis_threads,
            recursive: cli.recursive,
            ffmpeg_fallback: cli.ffmpeg_fallback,
            show_progress: !cli.quiet,
            dry_run: cli.dry_run,
        })
    }

    /// Decoder switches derived from these settings
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            ffmpeg_fallback: self.ffmpeg_fallback,
        }
    }

    /// Path of the directory report
    pub fn report_path(&self) -> PathBuf {
        self.output.join(REPORT_FILENAME)
    }
}

/// Validate a glucose value and resolve its unit
///
/// Unknown units fall back to mg/dL.
pub fn parse_glucose(value: f64, unit: &str) -> Result<GlucoseReading> {
    if !value.is_finite() || value < 0.0 {
        return Err(LatidoError::ConfigError(format!(
            "glucose must be a non-negative number, got {}",
            value
        )));
    }

    let unit = GlucoseUnit::parse(unit).unwrap_or_else(|| {
        warn!("Unknown glucose unit '{}', assuming mg/dl", unit);
        GlucoseUnit::MgDl
    });

    Ok(GlucoseReading::new(value, unit))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            output: PathBuf::from("."),
            glucose: GlucoseReading::new(0.0, GlucoseUnit::MgDl),
            model_path: None,
            analysis_threads: num_cpus::get().saturating_sub(1).max(1),
            recursive: false,
            ffmpeg_fallback: false,
            show_progress: true,
            dry_run: false,
        }
    }
}
