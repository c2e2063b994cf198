//! Model directory integrity verification
//!
//! Checks a downloaded model directory for its essential files, validates the
//! JSON ones, looks for weights and reads key fields from config.json. Nothing
//! here mutates the directory, and a missing directory is reported as a failed
//! verification rather than an error.

use super::cache::{
    dir_size, file_size_mb, find_files_with_extension, find_git_repos, list_cached_models,
    model_dirs,
};
use crate::summary::RunSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Files every model directory must contain, with descriptions
pub const ESSENTIAL_FILES: [(&str, &str); 2] = [
    ("config.json", "Model configuration"),
    ("tokenizer.json", "Tokenizer configuration"),
];

/// Weight files, at least one of which must exist
pub const WEIGHT_FILES: [(&str, &str); 2] = [
    ("pytorch_model.bin", "PyTorch model weights"),
    ("model.safetensors", "SafeTensors model weights"),
];

/// Fields config.json must declare
pub const REQUIRED_CONFIG_FIELDS: [&str; 2] = ["model_type", "vocab_size"];

/// Number of checks the integrity score is computed over: the essential and
/// weight files plus the weights-present and config checks
pub const TOTAL_CHECKS: usize = ESSENTIAL_FILES.len() + WEIGHT_FILES.len() + 2;

/// A problem found while verifying a model directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum VerificationIssue {
    DirectoryNotFound,
    Missing(String),
    InvalidJson(String),
    NoWeights,
    MissingConfigField(String),
    ConfigError(String),
}

impl fmt::Display for VerificationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryNotFound => write!(f, "Model directory not found"),
            Self::Missing(file) => write!(f, "Missing: {}", file),
            Self::InvalidJson(file) => write!(f, "Invalid JSON: {}", file),
            Self::NoWeights => write!(f, "No model weights found"),
            Self::MissingConfigField(field) => write!(f, "Missing config field: {}", field),
            Self::ConfigError(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

/// An essential file that was found
#[derive(Debug, Clone, Serialize)]
pub struct FileCheck {
    pub file: String,
    pub description: String,
    /// Top-level key count when the file is valid JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_keys: Option<usize>,
}

/// A weight file that was found
#[derive(Debug, Clone, Serialize)]
pub struct WeightFile {
    pub file: String,
    pub description: String,
    pub size_mb: f64,
}

/// Result of verifying one model directory
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub name: String,
    pub path: PathBuf,
    pub found: Vec<FileCheck>,
    pub weights: Vec<WeightFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    pub issues: Vec<VerificationIssue>,
    pub integrity_score: f64,
    pub checked_at: DateTime<Utc>,
}

impl VerificationReport {
    fn new(name: &str, path: &Path) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            found: Vec::new(),
            weights: Vec::new(),
            model_type: None,
            architecture: None,
            issues: Vec::new(),
            integrity_score: 0.0,
            checked_at: Utc::now(),
        }
    }

    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }

    /// Human-readable diagnostics, one line per entry
    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Verifying {}...", self.name),
            format!("Path: {}", self.path.display()),
        ];

        if self.issues.contains(&VerificationIssue::DirectoryNotFound) {
            lines.push("  ❌ Model directory not found".to_string());
            return lines;
        }

        for (file, description) in ESSENTIAL_FILES {
            match self.found.iter().find(|f| f.file == file) {
                Some(check) => {
                    lines.push(format!("  ✅ {}: {}", description, file));
                    match check.json_keys {
                        Some(keys) => lines.push(format!("    📝 Valid JSON with {} keys", keys)),
                        None => lines.push("    ❌ Invalid JSON format".to_string()),
                    }
                }
                None => lines.push(format!("  ❌ Missing {}", description)),
            }
        }

        for weight in &self.weights {
            lines.push(format!(
                "  ✅ {}: {} ({:.1} MB)",
                weight.description, weight.file, weight.size_mb
            ));
        }
        if self.weights.is_empty() {
            lines.push("  ❌ No model weights found".to_string());
        }

        if let Some(model_type) = &self.model_type {
            lines.push(format!("  📋 Model type: {}", model_type));
        }
        if let Some(architecture) = &self.architecture {
            lines.push(format!("  📋 Architecture: {}", architecture));
        }

        lines.push(format!("  🎯 Integrity Score: {:.1}%", self.integrity_score));

        if self.passed() {
            lines.push("  ✅ Model verification passed!".to_string());
        } else {
            lines.push("  ⚠️  Issues found:".to_string());
            for issue in &self.issues {
                lines.push(format!("    - {}", issue));
            }
        }

        lines
    }
}

/// Integrity score as a percentage, clamped at zero
pub fn integrity_score(issue_count: usize) -> f64 {
    let total = TOTAL_CHECKS as f64;
    ((total - issue_count as f64) / total * 100.0).max(0.0)
}

/// Verify a model directory's integrity by checking its essential files
pub fn verify_model_dir(path: &Path, name: &str) -> VerificationReport {
    let mut report = VerificationReport::new(name, path);

    if !path.is_dir() {
        tracing::warn!(model = %name, path = %path.display(), "Model directory not found");
        report.issues.push(VerificationIssue::DirectoryNotFound);
        return report;
    }

    for (file, description) in ESSENTIAL_FILES {
        let file_path = path.join(file);
        if !file_path.exists() {
            report.issues.push(VerificationIssue::Missing(file.to_string()));
            continue;
        }

        let json_keys = match read_json(&file_path) {
            Ok(value) => Some(json_len(&value)),
            Err(_) => {
                report
                    .issues
                    .push(VerificationIssue::InvalidJson(file.to_string()));
                None
            }
        };
        report.found.push(FileCheck {
            file: file.to_string(),
            description: description.to_string(),
            json_keys,
        });
    }

    for (file, description) in WEIGHT_FILES {
        if let Some(size_mb) = file_size_mb(&path.join(file)) {
            report.weights.push(WeightFile {
                file: file.to_string(),
                description: description.to_string(),
                size_mb,
            });
        }
    }
    if report.weights.is_empty() {
        report.issues.push(VerificationIssue::NoWeights);
    }

    let config_path = path.join("config.json");
    if config_path.exists() {
        check_config(&config_path, &mut report);
    }

    report.integrity_score = integrity_score(report.issues.len());

    tracing::debug!(
        model = %name,
        issues = report.issues.len(),
        score = report.integrity_score,
        "Verification finished"
    );

    report
}

fn check_config(config_path: &Path, report: &mut VerificationReport) {
    let config = match read_json(config_path) {
        Ok(config) => config,
        Err(msg) => {
            report.issues.push(VerificationIssue::ConfigError(msg));
            return;
        }
    };

    report.model_type = Some(
        config
            .get("model_type")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string(),
    );
    report.architecture = Some(
        config
            .get("architectures")
            .and_then(|v| v.as_array())
            .and_then(|a| a.first())
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string(),
    );

    for field in REQUIRED_CONFIG_FIELDS {
        if config.get(field).is_none() {
            report
                .issues
                .push(VerificationIssue::MissingConfigField(field.to_string()));
        }
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&content).map_err(|e| e.to_string())
}

fn json_len(value: &serde_json::Value) -> usize {
    match value {
        serde_json::Value::Object(map) => map.len(),
        serde_json::Value::Array(items) => items.len(),
        _ => 1,
    }
}

/// Result of checking an ONNX model directory
#[derive(Debug, Clone, Serialize)]
pub struct OnnxReport {
    pub name: String,
    pub path: PathBuf,
    pub exists: bool,
    /// ONNX files relative to the model directory
    pub onnx_files: Vec<PathBuf>,
    pub missing: Vec<String>,
}

impl OnnxReport {
    pub fn passed(&self) -> bool {
        self.exists && !self.onnx_files.is_empty() && self.missing.is_empty()
    }

    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![format!("Checking {}:", self.name)];
        if !self.exists {
            lines.push(format!("  ⚠️  Directory not found: {}", self.path.display()));
            return lines;
        }

        if self.onnx_files.is_empty() {
            lines.push(format!("  ⚠️  No ONNX files found in {}", self.path.display()));
        } else {
            lines.push(format!("  ✅ Found {} ONNX file(s)", self.onnx_files.len()));
            for file in self.onnx_files.iter().take(3) {
                lines.push(format!("    📄 {}", file.display()));
            }
            if self.onnx_files.len() > 3 {
                lines.push(format!("    ... and {} more", self.onnx_files.len() - 3));
            }
        }

        for (file, _) in ESSENTIAL_FILES {
            if self.missing.iter().any(|m| m == file) {
                lines.push(format!("  ⚠️  {} missing", file));
            } else {
                lines.push(format!("  ✅ {} found", file));
            }
        }
        lines
    }
}

/// Verify that an ONNX model directory holds ONNX graphs and the files
/// needed to tokenize
pub fn verify_onnx_dir(path: &Path, name: &str) -> OnnxReport {
    let exists = path.is_dir();
    let onnx_files = if exists {
        find_files_with_extension(path, "onnx")
            .into_iter()
            .map(|f| f.strip_prefix(path).map(Path::to_path_buf).unwrap_or(f))
            .collect()
    } else {
        Vec::new()
    };
    let missing = if exists {
        ESSENTIAL_FILES
            .iter()
            .filter(|(file, _)| !path.join(file).exists())
            .map(|(file, _)| file.to_string())
            .collect()
    } else {
        Vec::new()
    };

    OnnxReport {
        name: name.to_string(),
        path: path.to_path_buf(),
        exists,
        onnx_files,
        missing,
    }
}

/// Markers showing the models came through the hub download client
#[derive(Debug, Clone, Serialize)]
pub struct HubMarkers {
    pub cache_dir: PathBuf,
    pub cache_present: bool,
    /// Directories under the models root versioned with git
    pub git_repos: Vec<PathBuf>,
    /// Repositories with a snapshot in the hub cache
    pub cached_repos: Vec<String>,
    pub cache_size_bytes: u64,
}

impl HubMarkers {
    pub fn authentic(&self) -> bool {
        self.cache_present
    }

    pub fn render(&self) -> Vec<String> {
        let mut lines = vec!["Checking HuggingFace authenticity markers...".to_string()];
        if !self.cache_present {
            lines.push("  ❌ No HuggingFace cache directory found".to_string());
            return lines;
        }

        lines.push(format!(
            "  ✅ HuggingFace cache directory found ({:.1} MB)",
            self.cache_size_bytes as f64 / (1024.0 * 1024.0)
        ));
        if !self.cached_repos.is_empty() {
            lines.push(format!(
                "  ✅ {} repositories in hub cache: {}",
                self.cached_repos.len(),
                self.cached_repos.join(", ")
            ));
        }
        if self.git_repos.is_empty() {
            lines.push("  ⚠️  No git repositories found".to_string());
        } else {
            lines.push(format!(
                "  ✅ Found {} git repositories (HuggingFace versioning)",
                self.git_repos.len()
            ));
            for repo in self.git_repos.iter().take(3) {
                lines.push(format!("    📁 {}", repo.display()));
            }
        }
        lines
    }
}

/// Collect hub authenticity markers for a models root
pub fn hub_markers(models_dir: &Path, cache_dir: &Path) -> HubMarkers {
    let cache_present = cache_dir.is_dir();
    HubMarkers {
        cache_dir: cache_dir.to_path_buf(),
        cache_present,
        git_repos: if cache_present {
            find_git_repos(models_dir)
        } else {
            Vec::new()
        },
        cached_repos: list_cached_models(cache_dir),
        cache_size_bytes: dir_size(cache_dir),
    }
}

/// Verification of every model directory under a models root
#[derive(Debug, Clone, Serialize)]
pub struct ModelsVerification {
    pub models_dir: PathBuf,
    pub root_present: bool,
    pub reports: Vec<VerificationReport>,
    pub hub: HubMarkers,
}

impl ModelsVerification {
    /// Per-model pass/fail, in directory order
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::new("Verification");
        for report in &self.reports {
            summary.record(&report.name, report.passed());
        }
        summary
    }

    /// True only if the root exists, every model passed and the hub cache
    /// is present
    pub fn success(&self) -> bool {
        self.root_present && self.summary().all_passed() && self.hub.authentic()
    }
}

/// Verify every model directory under `models_dir` (skipping the cache)
pub fn verify_models_root(models_dir: &Path, cache_dir: &Path) -> ModelsVerification {
    let root_present = models_dir.is_dir();
    let reports = model_dirs(models_dir)
        .iter()
        .map(|dir| {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            verify_model_dir(dir, &name)
        })
        .collect();

    ModelsVerification {
        models_dir: models_dir.to_path_buf(),
        root_present,
        reports,
        hub: hub_markers(models_dir, cache_dir),
    }
}
