//! Configuration structures and loading logic

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Main probe configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Root directory holding one subdirectory per model
    pub models_dir: PathBuf,
    /// Shared hub cache used by the download client
    pub cache_dir: PathBuf,
    /// Models fetched by `download`
    pub models: Vec<ModelSpec>,
    /// ONNX re-exports fetched by `download --onnx`
    pub onnx_models: Vec<ModelSpec>,
    /// Directories checked by `inspect`
    pub inspect_targets: Vec<ProbeTarget>,
    pub generation: GenerationConfig,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            cache_dir: default_cache_dir(),
            models: default_models(),
            onnx_models: default_onnx_models(),
            inspect_targets: default_inspect_targets(),
            generation: GenerationConfig::default(),
        }
    }
}

impl ProbeConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content).context("Failed to parse TOML config")?
        } else {
            Self::default()
        };

        // Environment variable overrides
        if let Ok(models_dir) = std::env::var("MODEL_PROBE_MODELS_DIR") {
            config.models_dir = PathBuf::from(models_dir);
        }
        if let Ok(cache_dir) = std::env::var("MODEL_PROBE_CACHE_DIR") {
            config.cache_dir = PathBuf::from(cache_dir);
        }
        if let Ok(model) = std::env::var("MODEL_PROBE_GENERATION_MODEL") {
            config.generation.model = model;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        validate_specs("models", &self.models)?;
        validate_specs("onnx_models", &self.onnx_models)?;
        validate_targets("inspect_targets", &self.inspect_targets)?;
        validate_targets("generation.targets", &self.generation.targets)?;

        let generation = &self.generation;
        if generation.model.trim().is_empty() {
            anyhow::bail!("generation.model cannot be empty");
        }
        if generation.max_new_tokens == 0 {
            anyhow::bail!("generation.max_new_tokens must be > 0");
        }
        if generation.all_max_new_tokens == 0 {
            anyhow::bail!("generation.all_max_new_tokens must be > 0");
        }
        for temperature in [generation.temperature, generation.all_temperature]
            .into_iter()
            .flatten()
        {
            if !temperature.is_finite() || temperature <= 0.0 {
                anyhow::bail!(
                    "generation temperature must be a positive number (got {})",
                    temperature
                );
            }
        }

        Ok(())
    }

    /// Resolve the single-model generation target
    ///
    /// A configured model or generation target name maps to its directory;
    /// anything else is treated as a path.
    pub fn resolve_generation_model(&self, model: &str) -> ProbeTarget {
        if let Some(spec) = self.models.iter().find(|m| m.name == model) {
            return ProbeTarget::new(&spec.name, spec.local_dir.clone());
        }
        if let Some(target) = self.generation.targets.iter().find(|t| t.name == model) {
            return target.clone();
        }
        let path = PathBuf::from(model);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| model.to_string());
        ProbeTarget::new(&name, path)
    }
}

/// A model repository on the hub and where it lands locally
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ModelSpec {
    pub name: String,
    pub repo_id: String,
    pub local_dir: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Restrict the snapshot to matching file names (`*` wildcards).
    /// Empty means every file in the repository.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_patterns: Vec<String>,
}

impl ModelSpec {
    pub fn new(name: &str, repo_id: &str, local_dir: &str) -> Self {
        Self {
            name: name.to_string(),
            repo_id: repo_id.to_string(),
            local_dir: PathBuf::from(local_dir),
            description: None,
            allow_patterns: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// A local model directory to inspect or generate against
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ProbeTarget {
    pub name: String,
    pub path: PathBuf,

    /// Skipped instead of failed when the directory is absent
    #[serde(default)]
    pub optional: bool,
}

impl ProbeTarget {
    pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
            optional: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Settings for the generation smoke tests
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Model name or directory used by the single-model test
    pub model: String,
    pub prompt: String,
    pub max_new_tokens: usize,
    /// Sampling temperature; absent means greedy decoding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    pub seed: u64,

    /// Models exercised by `generate --all`
    pub targets: Vec<ProbeTarget>,
    pub all_prompt: String,
    pub all_max_new_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_temperature: Option<f64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "models/distilgpt2".to_string(),
            prompt: "JavaScript is".to_string(),
            max_new_tokens: 10,
            temperature: None,
            seed: default_seed(),
            targets: default_generation_targets(),
            all_prompt: "Create a JavaScript quiz question about".to_string(),
            all_max_new_tokens: 50,
            all_temperature: Some(0.7),
        }
    }
}

fn validate_specs(field: &str, specs: &[ModelSpec]) -> Result<()> {
    let mut names = HashSet::new();
    let mut dirs = HashSet::new();

    for spec in specs {
        if spec.name.trim().is_empty() {
            anyhow::bail!("{}: model name cannot be empty", field);
        }
        if !names.insert(&spec.name) {
            anyhow::bail!("{}: duplicate model name: {}", field, spec.name);
        }
        if !is_valid_repo_id(&spec.repo_id) {
            anyhow::bail!(
                "{}: invalid repo id '{}' for model '{}'",
                field,
                spec.repo_id,
                spec.name
            );
        }
        if spec.local_dir.as_os_str().is_empty() {
            anyhow::bail!("{}: local_dir cannot be empty for '{}'", field, spec.name);
        }
        if !dirs.insert(&spec.local_dir) {
            anyhow::bail!(
                "{}: duplicate local_dir {:?} in model configs",
                field,
                spec.local_dir
            );
        }
    }

    Ok(())
}

fn validate_targets(field: &str, targets: &[ProbeTarget]) -> Result<()> {
    let mut names = HashSet::new();
    for target in targets {
        if target.name.trim().is_empty() {
            anyhow::bail!("{}: target name cannot be empty", field);
        }
        if !names.insert(&target.name) {
            anyhow::bail!("{}: duplicate target name: {}", field, target.name);
        }
    }
    Ok(())
}

/// Hub ids are `name` or `org/name` with no whitespace
pub fn is_valid_repo_id(repo_id: &str) -> bool {
    if repo_id.is_empty() || repo_id.chars().any(char::is_whitespace) {
        return false;
    }
    let parts: Vec<&str> = repo_id.split('/').collect();
    parts.len() <= 2 && parts.iter().all(|p| !p.is_empty() && *p != "." && *p != "..")
}

// Default functions
fn default_models_dir() -> PathBuf {
    PathBuf::from("./models")
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("./models/.cache")
}
fn default_seed() -> u64 {
    42
}
fn default_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec::new("distilgpt2", "distilgpt2", "./models/distilgpt2"),
        ModelSpec::new("gpt2", "gpt2", "./models/gpt2"),
        ModelSpec::new(
            "microsoft/DialoGPT-small",
            "microsoft/DialoGPT-small",
            "./models/DialoGPT-small",
        ),
    ]
}
fn default_onnx_models() -> Vec<ModelSpec> {
    vec![
        ModelSpec::new(
            "Xenova/distilgpt2",
            "Xenova/distilgpt2",
            "./models/xenova-distilgpt2",
        )
        .with_description("DistilGPT-2 with ONNX support"),
        ModelSpec::new("Xenova/gpt2", "Xenova/gpt2", "./models/xenova-gpt2")
            .with_description("GPT-2 with ONNX support"),
        ModelSpec::new("Xenova/t5-small", "Xenova/t5-small", "./models/xenova-t5-small")
            .with_description("T5-small with ONNX support"),
    ]
}
fn default_inspect_targets() -> Vec<ProbeTarget> {
    vec![
        ProbeTarget::new("DistilGPT-2", "models/distilgpt2"),
        ProbeTarget::new("GPT-2", "models/gpt2"),
        ProbeTarget::new("FLAN-T5-Small", "models/flan-t5-small"),
    ]
}
fn default_generation_targets() -> Vec<ProbeTarget> {
    vec![
        ProbeTarget::new("DistilGPT-2", "models/distilgpt2"),
        ProbeTarget::new("GPT-2", "models/gpt2"),
        ProbeTarget::new("DialoGPT-small", "models/DialoGPT-small").optional(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = ProbeConfig::default();
        assert_eq!(config.models_dir, PathBuf::from("./models"));
        assert_eq!(config.cache_dir, PathBuf::from("./models/.cache"));
        assert_eq!(config.models.len(), 3);
        assert_eq!(config.onnx_models.len(), 3);
        assert_eq!(config.generation.max_new_tokens, 10);
        assert!(config.generation.temperature.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_dialogpt_target_is_optional() {
        let config = ProbeConfig::default();
        let dialogpt = config
            .generation
            .targets
            .iter()
            .find(|t| t.name == "DialoGPT-small")
            .unwrap();
        assert!(dialogpt.optional);
    }

    #[test]
    fn test_duplicate_model_name_detection() {
        let config = ProbeConfig {
            models: vec![
                ModelSpec::new("gpt2", "gpt2", "./models/a"),
                ModelSpec::new("gpt2", "openai-community/gpt2", "./models/b"),
            ],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_local_dir_detection() {
        let config = ProbeConfig {
            models: vec![
                ModelSpec::new("a", "gpt2", "./models/same"),
                ModelSpec::new("b", "distilgpt2", "./models/same"),
            ],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_repo_id_rejected() {
        let config = ProbeConfig {
            models: vec![ModelSpec::new("bad", "a/b/c", "./models/bad")],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_repo_id_validation() {
        assert!(is_valid_repo_id("gpt2"));
        assert!(is_valid_repo_id("microsoft/DialoGPT-small"));
        assert!(!is_valid_repo_id(""));
        assert!(!is_valid_repo_id("org/"));
        assert!(!is_valid_repo_id("has space"));
        assert!(!is_valid_repo_id("../escape"));
    }

    #[test]
    fn test_zero_max_new_tokens_rejected() {
        let mut config = ProbeConfig::default();
        config.generation.max_new_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_temperature_rejected() {
        let mut config = ProbeConfig::default();
        config.generation.temperature = Some(0.0);
        assert!(config.validate().is_err());

        config.generation.temperature = Some(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            models_dir = "/data/models"

            [[models]]
            name = "tiny"
            repo_id = "sshleifer/tiny-gpt2"
            local_dir = "/data/models/tiny"
            allow_patterns = ["*.json", "model.safetensors"]

            [generation]
            prompt = "Rust is"
            temperature = 0.9
        "#;
        let config: ProbeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.models_dir, PathBuf::from("/data/models"));
        assert_eq!(config.models.len(), 1);
        assert_eq!(config.models[0].allow_patterns.len(), 2);
        assert_eq!(config.generation.prompt, "Rust is");
        assert_eq!(config.generation.temperature, Some(0.9));
        // Untouched sections keep their defaults
        assert_eq!(config.generation.max_new_tokens, 10);
        assert_eq!(config.onnx_models.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_generation_model() {
        let config = ProbeConfig::default();

        let by_name = config.resolve_generation_model("gpt2");
        assert_eq!(by_name.path, PathBuf::from("./models/gpt2"));

        let by_target = config.resolve_generation_model("DialoGPT-small");
        assert_eq!(by_target.path, PathBuf::from("models/DialoGPT-small"));

        let by_path = config.resolve_generation_model("/tmp/custom-model");
        assert_eq!(by_path.name, "custom-model");
        assert_eq!(by_path.path, PathBuf::from("/tmp/custom-model"));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        unsafe {
            std::env::set_var("MODEL_PROBE_MODELS_DIR", "/srv/models");
            std::env::set_var("MODEL_PROBE_CACHE_DIR", "/srv/cache");
            std::env::set_var("MODEL_PROBE_GENERATION_MODEL", "gpt2");
        }

        let config = ProbeConfig::load(None).unwrap();

        unsafe {
            std::env::remove_var("MODEL_PROBE_MODELS_DIR");
            std::env::remove_var("MODEL_PROBE_CACHE_DIR");
            std::env::remove_var("MODEL_PROBE_GENERATION_MODEL");
        }

        assert_eq!(config.models_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.cache_dir, PathBuf::from("/srv/cache"));
        assert_eq!(config.generation.model, "gpt2");
    }

    #[test]
    #[serial]
    fn test_load_missing_file_fails() {
        let result = ProbeConfig::load(Some(PathBuf::from("/nonexistent/model-probe.toml")));
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probe.toml");
        std::fs::write(&path, "cache_dir = \"/tmp/hub-cache\"\n").unwrap();

        let config = ProbeConfig::load(Some(path)).unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/hub-cache"));
        assert_eq!(config.models.len(), 3);
    }
}
