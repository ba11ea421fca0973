//! JSON report for a batch of analysed clips

use super::document::AnalysisDocument;
use crate::error::{LatidoError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

/// JSON output schema version
const SCHEMA_VERSION: &str = "1.0";

/// Top-level report structure
#[derive(Debug, Serialize, Deserialize)]
pub struct LatidoReport {
    /// Schema version for forward compatibility
    pub version: String,
    /// Report metadata
    pub metadata: ExportMetadata,
    /// One entry per clip, in discovery order
    pub results: Vec<ClipReport>,
}

/// Export metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportMetadata {
    /// latido version that generated this file
    pub generator_version: String,
    /// Timestamp of export
    pub exported_at: String,
    /// Number of clips
    pub clip_count: usize,
}

/// Document for one clip, keyed by its path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipReport {
    pub path: String,
    pub document: AnalysisDocument,
}

impl ClipReport {
    pub fn new(path: &Path, document: AnalysisDocument) -> Self {
        Self {
            path: path.to_string_lossy().to_string(),
            document,
        }
    }
}

/// Write the batch report
///
/// Uses atomic write pattern: writes to a temp file first, then renames.
/// This prevents data corruption if the write is interrupted.
pub fn write_report(results: Vec<ClipReport>, output_path: &Path) -> Result<()> {
    // Write to temp file in same directory (ensures same filesystem for atomic rename)
    let temp_path = output_path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(|e| LatidoError::OutputError {
        path: output_path.to_path_buf(),
        reason: format!("Failed to create temp file: {}", e),
    })?;

    let writer = BufWriter::new(file);
    let clip_count = results.len();

    let report = LatidoReport {
        version: SCHEMA_VERSION.to_string(),
        metadata: ExportMetadata {
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: chrono::Utc::now().to_rfc3339(),
            clip_count,
        },
        results,
    };

    serde_json::to_writer_pretty(writer, &report).map_err(|e| {
        // Clean up temp file on error
        let _ = std::fs::remove_file(&temp_path);
        LatidoError::OutputError {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    // Atomic rename: either succeeds completely or fails without modifying target
    std::fs::rename(&temp_path, output_path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        LatidoError::OutputError {
            path: output_path.to_path_buf(),
            reason: format!("Failed to finalize file: {}", e),
        }
    })?;

    info!("Wrote {} clips to {}", clip_count, output_path.display());

    Ok(())
}

/// Read a previously written report
pub fn read_report(path: &Path) -> Result<LatidoReport> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => LatidoError::FileNotFound(PathBuf::from(path)),
        _ => LatidoError::Io(e),
    })?;

    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| LatidoError::ConfigError(format!("Malformed report {}: {}", path.display(), e)))
}
