//! Pipeline orchestration
//!
//! Coordinates clip discovery, request-parallel analysis, and export.
//! Every clip is an independent request; one bad recording never stops the
//! rest of the batch.

use super::analyze::{AnalysisResult, Analyzer};
use crate::analysis::ClassifierHandle;
use crate::config::Settings;
use crate::discovery::{self, DiscoveredClip};
use crate::error::{LatidoError, Result};
use crate::export::{self, AnalysisDocument, ClipReport};
use crate::types::{AnalysisRequest, RawAudioBlob};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Pipeline result summary
#[derive(Debug)]
pub struct PipelineResult {
    pub total_clips: usize,
    pub successful: usize,
    pub failed: usize,
    /// Report written for directory input
    pub report_path: Option<PathBuf>,
}

impl PipelineResult {
    fn empty(total_clips: usize) -> Self {
        Self {
            total_clips,
            successful: 0,
            failed: 0,
            report_path: None,
        }
    }
}

/// Run the full analysis pipeline
///
/// A single file prints its document to stdout; a directory produces a
/// report in the output directory.
pub fn run(settings: &Settings, classifier: ClassifierHandle) -> Result<PipelineResult> {
    let pipeline_start = Instant::now();

    configure_thread_pool(settings.analysis_threads)?;

    // Phase 1: Discovery
    let discovery_start = Instant::now();
    info!("Scanning for recordings...");
    let clips = discovery::scan(&settings.input, settings.recursive)?;

    if clips.is_empty() {
        return Ok(PipelineResult::empty(0));
    }

    info!(
        "Found {} recordings in {:.2}s",
        clips.len(),
        discovery_start.elapsed().as_secs_f64()
    );

    let analyzer = Analyzer::new(classifier, settings.decode_options());

    // Phase 2: Analysis
    let single_file = settings.input.is_file();
    let analysis_start = Instant::now();
    let (results, successful, failed) = analyze_clips(&clips, &analyzer, settings);
    info!(
        "Analysis completed in {:.2}s",
        analysis_start.elapsed().as_secs_f64()
    );

    // Phase 3: Export
    let report_path = if single_file {
        let document = results
            .first()
            .map(|r| r.document.clone())
            .ok_or_else(|| LatidoError::ConfigError("no result for input file".to_string()))?;
        print_document(&document)?;
        None
    } else {
        std::fs::create_dir_all(&settings.output)
            .map_err(|e| LatidoError::output_error(&settings.output, e))?;
        let path = settings.report_path();
        export::write_report(results, &path)?;
        Some(path)
    };

    info!(
        "Total pipeline time: {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    Ok(PipelineResult {
        total_clips: clips.len(),
        successful,
        failed,
        report_path,
    })
}

/// Dry run mode - list clips that would be analysed without processing
pub fn dry_run(settings: &Settings) -> Result<PipelineResult> {
    let clips = discovery::scan(&settings.input, settings.recursive)?;

    println!();
    println!("=== DRY RUN MODE ===");
    println!();

    let mut total_bytes = 0u64;
    for clip in &clips {
        total_bytes += clip.size_bytes;
        println!(
            "  {} ({:?}, {:.1} KiB)",
            clip.path.display(),
            clip.format,
            clip.size_bytes as f64 / 1024.0
        );
    }

    println!();
    println!(
        "Would analyze {} recordings ({:.1} MiB)",
        clips.len(),
        total_bytes as f64 / (1024.0 * 1024.0)
    );
    if !settings.input.is_file() {
        let report_path = settings.report_path();
        match describe_existing_report(&report_path) {
            Some(existing) => {
                println!("Would replace:");
                println!("  {} ({})", report_path.display(), existing);
            }
            None => {
                println!("Would create:");
                println!("  {}", report_path.display());
            }
        }
    }
    println!();

    Ok(PipelineResult::empty(clips.len()))
}

/// Summarize a report already sitting at the output path, if any
fn describe_existing_report(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }
    Some(match export::read_report(path) {
        Ok(report) => format!(
            "{} clips, exported {}",
            report.metadata.clip_count, report.metadata.exported_at
        ),
        Err(e) => {
            debug!("Existing report is unreadable: {}", e);
            "unreadable".to_string()
        }
    })
}

/// Configure the Rayon thread pool
fn configure_thread_pool(num_threads: usize) -> Result<()> {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        Ok(()) => {
            debug!("Configured thread pool with {} threads", num_threads);
        }
        Err(e) => {
            // If the pool is already initialized (e.g., in tests), that's OK
            if e.to_string().contains("already been initialized") {
                debug!("Thread pool already initialized, using existing pool");
            } else {
                return Err(LatidoError::ConfigError(format!(
                    "Failed to configure thread pool: {}",
                    e
                )));
            }
        }
    }
    Ok(())
}

/// Analyse clips in parallel, keeping discovery order
fn analyze_clips(
    clips: &[DiscoveredClip],
    analyzer: &Analyzer,
    settings: &Settings,
) -> (Vec<ClipReport>, usize, usize) {
    let progress_bar = if settings.show_progress && clips.len() > 1 {
        let pb = ProgressBar::new(clips.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let results: Vec<ClipReport> = clips
        .par_iter()
        .map(|clip| {
            let result = match RawAudioBlob::from_path(&clip.path) {
                Ok(audio) => {
                    let request = AnalysisRequest {
                        audio,
                        glucose: settings.glucose,
                    };
                    analyzer.analyze(&request)
                }
                Err(e) => AnalysisResult::failed(LatidoError::Io(e).to_string()),
            };

            if result.is_error() {
                failed.fetch_add(1, Ordering::Relaxed);
            } else {
                successful.fetch_add(1, Ordering::Relaxed);
            }

            if let Some(ref pb) = progress_bar {
                pb.inc(1);
                pb.set_message(clip.display_name());
            }

            ClipReport::new(&clip.path, AnalysisDocument::from(&result))
        })
        .collect();

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Analysis complete");
    }

    (
        results,
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
    )
}

fn print_document(document: &AnalysisDocument) -> Result<()> {
    let json = serde_json::to_string_pretty(document)
        .map_err(|e| LatidoError::ConfigError(format!("Cannot serialize document: {}", e)))?;
    println!("{}", json);
    Ok(())
}
