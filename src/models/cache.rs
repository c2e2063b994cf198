//! Hub cache and models directory inspection
//!
//! The download client keeps its own cache next to the local model copies:
//! ```text
//! ./models/
//! ├── .cache/
//! │   └── models--microsoft--DialoGPT-small/
//! │       ├── snapshots/
//! │       │   └── {revision}/
//! │       │       ├── config.json
//! │       │       └── pytorch_model.bin
//! │       └── refs/
//! │           └── main
//! ├── distilgpt2/
//! │   ├── config.json
//! │   ├── model.safetensors
//! │   └── tokenizer.json
//! └── DialoGPT-small/
//!     └── ...
//! ```

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory names under the models root that never hold a model
pub const IGNORED_DIRS: [&str; 2] = [".cache", "__pycache__"];

/// Convert model ID to cache directory name
///
/// HuggingFace uses `models--{org}--{name}` format
/// e.g., "microsoft/DialoGPT-small" -> "models--microsoft--DialoGPT-small"
pub fn model_id_to_cache_name(model_id: &str) -> String {
    format!("models--{}", model_id.replace('/', "--"))
}

/// Convert cache directory name back to model ID
///
/// e.g., "models--microsoft--DialoGPT-small" -> "microsoft/DialoGPT-small"
pub fn cache_name_to_model_id(cache_name: &str) -> Option<String> {
    cache_name
        .strip_prefix("models--")
        .map(|s| s.replacen("--", "/", 1))
}

/// Get the cache path for a model's latest snapshot
pub fn snapshot_path(cache_dir: &Path, model_id: &str) -> Option<PathBuf> {
    let model_dir = cache_dir.join(model_id_to_cache_name(model_id));

    // First try to resolve via refs/main
    let refs_main = model_dir.join("refs/main");
    if let Ok(revision) = std::fs::read_to_string(&refs_main) {
        let snapshot = model_dir.join("snapshots").join(revision.trim());
        if snapshot.is_dir() {
            return Some(snapshot);
        }
    }

    // Fall back to the first snapshot present
    std::fs::read_dir(model_dir.join("snapshots"))
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .find(|path| path.is_dir())
}

/// List all models with at least one snapshot in the hub cache
pub fn list_cached_models(cache_dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(cache_dir) else {
        return Vec::new();
    };

    let mut models: Vec<String> = entries
        .flatten()
        .filter_map(|entry| cache_name_to_model_id(&entry.file_name().to_string_lossy()))
        .filter(|model_id| snapshot_path(cache_dir, model_id).is_some())
        .collect();

    models.sort();
    models
}

/// Recursively calculate directory size, without following symlinks
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

/// Size of a file in megabytes, if it exists
pub fn file_size_mb(path: &Path) -> Option<f64> {
    std::fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len() as f64 / (1024.0 * 1024.0))
}

/// Sorted names of the entries directly inside `dir`
pub fn list_dir_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .flatten()
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

/// Subdirectories of the models root that hold models
pub fn model_dirs(models_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(models_dir) else {
        return Vec::new();
    };
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .filter(|p| {
            p.file_name()
                .map(|n| !IGNORED_DIRS.contains(&n.to_string_lossy().as_ref()))
                .unwrap_or(false)
        })
        .collect();
    dirs.sort();
    dirs
}

/// Recursively find files with the given extension (without the dot)
///
/// Symlinked directories are not descended into.
pub fn find_files_with_extension(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == extension))
        .map(|e| e.into_path())
        .collect();
    found.sort();
    found
}

/// Directories under `root` that contain a `.git` directory
pub fn find_git_repos(root: &Path) -> Vec<PathBuf> {
    let mut repos = Vec::new();
    let mut walker = WalkDir::new(root).min_depth(1).into_iter();
    while let Some(entry) = walker.next() {
        let Ok(entry) = entry else {
            continue;
        };
        if entry.file_type().is_dir() && entry.file_name() == ".git" {
            if let Some(parent) = entry.path().parent() {
                repos.push(parent.to_path_buf());
            }
            walker.skip_current_dir();
        }
    }
    repos.sort();
    repos
}

/// Render the directory structure under `root`, showing at most
/// `max_files` files per directory
pub fn render_tree(root: &Path, max_files: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if root.is_dir() {
        render_dir(root, 0, max_files, &mut lines);
    }
    lines
}

fn render_dir(dir: &Path, level: usize, max_files: usize, lines: &mut Vec<String>) {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| dir.display().to_string());
    lines.push(format!("{}{}/", "  ".repeat(level), name));

    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut subdirs = Vec::new();
    let mut files = Vec::new();
    for entry in entries.flatten() {
        // file_type does not follow symlinks, so linked dirs are listed as files
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            subdirs.push(entry.path());
        } else {
            files.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    subdirs.sort();
    files.sort();

    let indent = "  ".repeat(level + 1);
    for file in files.iter().take(max_files) {
        lines.push(format!("{}{}", indent, file));
    }
    if files.len() > max_files {
        lines.push(format!(
            "{}... and {} more files",
            indent,
            files.len() - max_files
        ));
    }

    for subdir in subdirs {
        render_dir(&subdir, level + 1, max_files, lines);
    }
}
