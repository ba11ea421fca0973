//! Clip discovery and scanning

use crate::error::{LatidoError, Result};
use crate::types::AudioFormat;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Discovered recording with basic metadata
#[derive(Debug, Clone)]
pub struct DiscoveredClip {
    pub path: PathBuf,
    pub format: AudioFormat,
    pub size_bytes: u64,
}

impl DiscoveredClip {
    /// File name shown in logs and the progress bar
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }
}

/// Scan a path (file or directory) for recordings, sorted by path
pub fn scan(input: &Path, recursive: bool) -> Result<Vec<DiscoveredClip>> {
    if !input.exists() {
        return Err(LatidoError::FileNotFound(input.to_path_buf()));
    }

    let mut clips = Vec::new();

    if input.is_file() {
        // Single file mode
        if let Some(clip) = try_discover_clip(input) {
            clips.push(clip);
        } else {
            return Err(LatidoError::UnsupportedFormat {
                path: input.to_path_buf(),
                format: input
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            });
        }
    } else if input.is_dir() {
        let walker = if recursive {
            WalkDir::new(input)
        } else {
            WalkDir::new(input).max_depth(1)
        };

        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_file() {
                if let Some(clip) = try_discover_clip(path) {
                    debug!("Discovered: {}", clip.path.display());
                    clips.push(clip);
                }
            }
        }
        clips.sort_by(|a, b| a.path.cmp(&b.path));
    }

    info!("Discovered {} recordings", clips.len());

    if clips.is_empty() {
        warn!("No supported recordings found in {}", input.display());
    }

    Ok(clips)
}

/// Try to create a DiscoveredClip if the path is a supported audio format
fn try_discover_clip(path: &Path) -> Option<DiscoveredClip> {
    let ext = path.extension()?.to_str()?;
    let format = AudioFormat::from_extension(ext)?;

    let metadata = std::fs::metadata(path).ok()?;

    Some(DiscoveredClip {
        path: path.to_path_buf(),
        format,
        size_bytes: metadata.len(),
    })
}
