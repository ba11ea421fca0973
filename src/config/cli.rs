//! CLI argument parsing and configuration

use clap::Parser;
use std::path::PathBuf;

/// latido - Heart-sound triage from short recordings
///
/// Decodes a recorded clip, isolates the heart band, classifies the rhythm,
/// counts beats and renders the waveform. Prints one JSON document per clip,
/// or writes a report for a directory of clips.
#[derive(Parser, Debug)]
#[command(name = "latido")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Input path (file or directory)
    #[arg(short, long, value_name = "PATH")]
    pub input: PathBuf,

    /// Output directory for the JSON report (directory input only)
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Glucose reading taken with the recording
    #[arg(short, long, value_name = "VALUE", allow_negative_numbers = true)]
    pub glucose: f64,

    /// Unit of the glucose reading
    #[arg(short, long, value_name = "UNIT", default_value = "mg/dl")]
    pub unit: String,

    /// Classifier model file (defaults to LATIDO_MODEL_PATH or the data dir)
    #[arg(short, long, value_name = "FILE")]
    pub model: Option<PathBuf>,

    /// Number of worker threads (defaults to CPU count - 1)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Scan subdirectories recursively
    #[arg(short, long, default_value = "false")]
    pub recursive: bool,

    /// Retry undecodable uploads through an ffmpeg subprocess
    #[arg(long, default_value = "false")]
    pub ffmpeg_fallback: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only, no progress bar)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,

    /// Dry run - show clips that would be analysed without processing
    #[arg(long, default_value = "false")]
    pub dry_run: bool,
}

impl Cli {
    /// Get the log level based on verbosity flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_invocation() {
        let cli = Cli::try_parse_from(["latido", "-i", "clip.3gp", "--glucose", "98"]).unwrap();
        assert_eq!(cli.unit, "mg/dl");
        assert_eq!(cli.output, PathBuf::from("."));
        assert!(!cli.recursive);
        assert_eq!(cli.log_level(), tracing::Level::WARN);
    }

    #[test]
    fn test_glucose_is_required() {
        assert!(Cli::try_parse_from(["latido", "-i", "clip.3gp"]).is_err());
    }

    #[test]
    fn test_verbosity() {
        let cli =
            Cli::try_parse_from(["latido", "-i", "x", "--glucose", "5.4", "-u", "mmol/l", "-vv"])
                .unwrap();
        assert_eq!(cli.log_level(), tracing::Level::DEBUG);
        let cli = Cli::try_parse_from(["latido", "-i", "x", "--glucose", "1", "-q", "-v"]).unwrap();
        assert_eq!(cli.log_level(), tracing::Level::ERROR);
    }
}
