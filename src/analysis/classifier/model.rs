//! Classifier model location
//!
//! Model resolution checks multiple common locations automatically.

use crate::error::{LatidoError, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// File name of the exported rhythm classifier
pub const MODEL_FILENAME: &str = "modelo_latido.onnx";

/// Environment variable that points at a model file
pub const MODEL_PATH_ENV: &str = "LATIDO_MODEL_PATH";

/// Check for user-provided model path via environment variable
pub fn get_user_model_path() -> Option<PathBuf> {
    std::env::var(MODEL_PATH_ENV).ok().map(PathBuf::from)
}

/// Find the model file by checking multiple common locations
///
/// Search order:
/// 1. Explicit path (`--model`)
/// 2. LATIDO_MODEL_PATH environment variable
/// 3. ProjectDirs data: ~/.local/share/latido/models/modelo_latido.onnx (Linux XDG)
///    or ~/Library/Application Support/com.latido.latido/models/ (macOS)
/// 4. Current directory: ./models/modelo_latido.onnx
///
/// Returns the first existing model path found, or an error listing all checked locations.
pub fn find_model_path(explicit: Option<&Path>) -> Result<PathBuf> {
    let mut checked_locations: Vec<String> = Vec::new();

    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        checked_locations.push(format!("--model {}", path.display()));
    }

    if let Some(env_path) = get_user_model_path() {
        if env_path.is_file() {
            return Ok(env_path);
        }
        checked_locations.push(format!("{}={}", MODEL_PATH_ENV, env_path.display()));
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "latido", "latido") {
        let data_path = proj_dirs.data_dir().join("models").join(MODEL_FILENAME);
        if data_path.is_file() {
            return Ok(data_path);
        }
        checked_locations.push(data_path.display().to_string());
    }

    let cwd_path = PathBuf::from("./models").join(MODEL_FILENAME);
    if cwd_path.is_file() {
        return Ok(cwd_path.canonicalize().unwrap_or(cwd_path));
    }
    checked_locations.push(cwd_path.display().to_string());

    let locations_list = checked_locations
        .iter()
        .map(|loc| format!("  - {}", loc))
        .collect::<Vec<_>>()
        .join("\n");

    Err(LatidoError::ModelUnavailable {
        reason: format!(
            "{} not found.\n\n  Locations checked:\n{}",
            MODEL_FILENAME, locations_list
        ),
    })
}
