//! Model metadata parsing
//!
//! Parses model configuration from HuggingFace's config.json files
//! to extract model type, architecture, context length, etc.

use crate::error::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Model metadata extracted from HuggingFace config.json
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelMetadata {
    /// Model architecture type (e.g., "gpt2", "t5", "bert")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,

    /// Declared architectures (e.g., "GPT2LMHeadModel")
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub architectures: Vec<String>,

    /// Vocabulary size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocab_size: Option<u32>,

    /// Maximum context length in tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_context: Option<u32>,

    /// Number of transformer layers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_layers: Option<u32>,

    /// Number of attention heads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_heads: Option<u32>,

    /// Hidden size / embedding dimension
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_size: Option<u32>,
}

impl ModelMetadata {
    /// First declared architecture, or "Unknown"
    pub fn architecture(&self) -> &str {
        self.architectures
            .first()
            .map(String::as_str)
            .unwrap_or("Unknown")
    }

    pub fn family(&self) -> ModelFamily {
        ModelFamily::from_model_type(self.model_type.as_deref().unwrap_or_default())
    }
}

/// Raw config.json structure (partial)
#[derive(Debug, Deserialize)]
struct RawConfig {
    model_type: Option<String>,
    #[serde(default)]
    architectures: Option<Vec<String>>,
    vocab_size: Option<u32>,
    // GPT-2 names first, then BERT / T5 style names
    n_positions: Option<u32>,
    max_position_embeddings: Option<u32>,
    n_layer: Option<u32>,
    num_layers: Option<u32>,
    num_hidden_layers: Option<u32>,
    n_head: Option<u32>,
    num_heads: Option<u32>,
    num_attention_heads: Option<u32>,
    n_embd: Option<u32>,
    hidden_size: Option<u32>,
    d_model: Option<u32>,
}

impl From<RawConfig> for ModelMetadata {
    fn from(raw: RawConfig) -> Self {
        Self {
            model_type: raw.model_type,
            architectures: raw.architectures.unwrap_or_default(),
            vocab_size: raw.vocab_size,
            max_context: raw.n_positions.or(raw.max_position_embeddings),
            num_layers: raw.n_layer.or(raw.num_layers).or(raw.num_hidden_layers),
            num_heads: raw.n_head.or(raw.num_attention_heads).or(raw.num_heads),
            hidden_size: raw.n_embd.or(raw.hidden_size).or(raw.d_model),
        }
    }
}

/// Read model metadata from a model directory's config.json
pub fn read_model_config(model_dir: &Path) -> ProbeResult<ModelMetadata> {
    let config_path = model_dir.join("config.json");

    if !config_path.is_file() {
        return Err(ProbeError::MissingFile(config_path));
    }

    let content = std::fs::read_to_string(&config_path)?;
    let raw: RawConfig =
        serde_json::from_str(&content).map_err(|source| ProbeError::InvalidJson {
            path: config_path,
            source,
        })?;

    Ok(raw.into())
}

/// Parse model metadata, returning `None` if config.json is missing or invalid
pub fn parse_model_config(model_dir: &Path) -> Option<ModelMetadata> {
    read_model_config(model_dir).ok()
}

/// Broad model family, derived from `model_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    /// Decoder-only, left-to-right text generation
    Autoregressive,
    /// Encoder-decoder text-to-text transformation
    TextToText,
    Other,
}

impl ModelFamily {
    pub fn from_model_type(model_type: &str) -> Self {
        match model_type {
            "gpt2" | "gpt" => Self::Autoregressive,
            "t5" => Self::TextToText,
            _ => Self::Other,
        }
    }

    pub fn capabilities(&self) -> &'static [&'static str] {
        match self {
            Self::Autoregressive => &[
                "Text Generation (Autoregressive)",
                "Question Generation",
                "Code Completion",
                "Creative Writing",
            ],
            Self::TextToText => &[
                "Text-to-Text Generation",
                "Question Answering",
                "Summarization",
                "Translation",
            ],
            Self::Other => &[],
        }
    }

    pub fn best_for(&self) -> Option<&'static str> {
        match self {
            Self::Autoregressive => Some("Open-ended text generation tasks"),
            Self::TextToText => Some("Structured text transformation tasks"),
            Self::Other => None,
        }
    }

    /// Illustrative quiz generation output for this family
    pub fn quiz_examples(&self) -> &'static [&'static str] {
        match self {
            Self::Autoregressive => &[
                "Create a JavaScript quiz question about arrays: What method would you use to add an element to the end of an array?",
                "Create a JavaScript quiz question about functions: What is the difference between function declarations and function expressions?",
                "Create a JavaScript quiz question about objects: How do you access a property of an object using bracket notation?",
            ],
            Self::TextToText | Self::Other => &[
                "Question: What is the purpose of the Array.push() method?",
                "Question: How do you declare a variable in JavaScript using ES6 syntax?",
                "Question: What is the difference between == and === operators?",
            ],
        }
    }
}

/// Inference cost bucket based on weight file size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Fast,
    Balanced,
    Heavy,
}

impl SizeClass {
    pub fn from_size_mb(size_mb: f64) -> Self {
        if size_mb < 500.0 {
            Self::Fast
        } else if size_mb < 1000.0 {
            Self::Balanced
        } else {
            Self::Heavy
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Fast => "Fast inference, suitable for real-time applications",
            Self::Balanced => "Balanced speed/quality trade-off",
            Self::Heavy => "High quality, may require more computational resources",
        }
    }
}

/// Estimate number of parameters from model metadata
///
/// This is a rough estimate based on transformer architecture
pub fn estimate_parameters(metadata: &ModelMetadata) -> Option<u64> {
    let hidden = metadata.hidden_size? as u64;
    let layers = metadata.num_layers? as u64;
    let vocab = metadata.vocab_size? as u64;
    let positions = metadata.max_context.unwrap_or(0) as u64;

    // Embeddings plus 12 * hidden^2 per layer (attention + FFN)
    let embedding_params = (vocab + positions) * hidden;
    let layer_params = layers * 12 * hidden * hidden;

    Some(embedding_params + layer_params)
}
