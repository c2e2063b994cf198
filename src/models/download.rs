//! Model download functionality using hf-hub
//!
//! Fetches every file of a hub repository through the shared hub cache and
//! copies it into the model's local directory, so the local copy holds real
//! files rather than symlinks into the cache.

use super::cache::list_dir_names;
use crate::config::ModelSpec;
use crate::error::{ProbeError, ProbeResult};
use crate::summary::RunSummary;
use hf_hub::api::tokio::{Api, ApiBuilder, ApiRepo};
use std::path::{Component, Path, PathBuf};

/// Build a hub client that stores its cache under `cache_dir`
///
/// Token and endpoint come from the standard `HF_*` environment.
pub fn build_api(cache_dir: &Path) -> ProbeResult<Api> {
    Ok(ApiBuilder::from_env()
        .with_cache_dir(cache_dir.to_path_buf())
        .build()?)
}

/// Download a full repository snapshot into `spec.local_dir`
///
/// # Returns
/// * `Ok(Vec<PathBuf>)` - Files written, relative to the local directory
/// * `Err(ProbeError)` - First failure; files already copied stay in place
pub async fn snapshot_download(api: &Api, spec: &ModelSpec) -> ProbeResult<Vec<PathBuf>> {
    let repo = api.model(spec.repo_id.clone());

    let info = repo.info().await?;
    let files: Vec<String> = info
        .siblings
        .into_iter()
        .map(|s| s.rfilename)
        .filter(|name| matches_allow_patterns(name, &spec.allow_patterns))
        .collect();

    tracing::info!(
        repo_id = %spec.repo_id,
        revision = %info.sha,
        file_count = files.len(),
        "Fetching snapshot"
    );

    tokio::fs::create_dir_all(&spec.local_dir).await?;

    let mut written = Vec::with_capacity(files.len());
    for file in &files {
        let relative = safe_relative_path(file)?;
        tracing::debug!(repo_id = %spec.repo_id, file = %file, "Downloading file");

        let cached = fetch(&repo, file).await?;
        let target = spec.local_dir.join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Copy follows the cache's symlink to the blob
        tokio::fs::copy(&cached, &target).await?;
        written.push(relative);
    }

    Ok(written)
}

async fn fetch(repo: &ApiRepo, file: &str) -> ProbeResult<PathBuf> {
    Ok(repo.get(file).await?)
}

/// Download every model in `specs`, continuing past failures
///
/// The summary passes only if every download succeeded.
pub async fn download_models(specs: &[ModelSpec], cache_dir: &Path) -> RunSummary {
    let mut summary = RunSummary::new("Download");

    let api = match build_api(cache_dir) {
        Ok(api) => api,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create HF API client");
            for spec in specs {
                summary.record(&spec.name, false);
            }
            return summary;
        }
    };

    for spec in specs {
        tracing::info!(model = %spec.name, "Starting download");
        tracing::info!(local_dir = %spec.local_dir.display(), "Downloading to");
        if let Some(description) = &spec.description {
            tracing::info!(model = %spec.name, description = %description, "Model description");
        }

        match snapshot_download(&api, spec).await {
            Ok(files) => {
                tracing::info!(
                    repo_id = %spec.repo_id,
                    local_dir = %spec.local_dir.display(),
                    file_count = files.len(),
                    "✅ Successfully downloaded"
                );
                let listing = list_dir_names(&spec.local_dir);
                tracing::info!(files = ?listing, "Downloaded files");
                summary.record(&spec.name, true);
            }
            Err(e) => {
                tracing::error!(model = %spec.name, error = %e, "❌ Failed to download");
                summary.record(&spec.name, false);
            }
        }
    }

    summary
}

/// Whether a repository file passes the allow list (empty list allows all)
pub fn matches_allow_patterns(file: &str, patterns: &[String]) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| wildcard_match(p, file))
}

/// Match `text` against `pattern`, where `*` matches any run of characters
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let Some((head, rest)) = pattern.split_once('*') else {
        return pattern == text;
    };
    let Some(mut remaining) = text.strip_prefix(head) else {
        return false;
    };

    let mut parts: Vec<&str> = rest.split('*').collect();
    let tail = parts.pop().unwrap_or_default();
    for part in parts {
        match remaining.find(part) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    remaining.len() >= tail.len() && remaining.ends_with(tail)
}

/// Reject repository file names that would escape the local directory
fn safe_relative_path(file: &str) -> ProbeResult<PathBuf> {
    let path = PathBuf::from(file);
    let safe = !file.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if safe {
        Ok(path)
    } else {
        Err(ProbeError::UnsafePath(file.to_string()))
    }
}
