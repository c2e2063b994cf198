//! Model loader for load-only smoke testing
//!
//! Loads a model's configuration and tokenizer from local files, without
//! touching the weights, and checks that tokenization round-trips.

use super::cache::file_size_mb;
use super::metadata::{
    ModelFamily, ModelMetadata, SizeClass, estimate_parameters, read_model_config,
};
use super::verify::WEIGHT_FILES;
use crate::config::ProbeTarget;
use crate::error::{ProbeError, ProbeResult};
use serde::Serialize;
use std::path::Path;
use tokenizers::Tokenizer;
use tokenizers::models::bpe::BPE;
use tokenizers::pre_tokenizers::byte_level::ByteLevel;

/// Text used by the lightweight tokenization check
pub const LIGHTWEIGHT_PROBE_TEXT: &str = "Hello world";

/// Prompts used by the detailed analysis
pub const ANALYSIS_PROBE_TEXTS: [&str; 4] = [
    "Create a JavaScript quiz question about arrays",
    "What is the difference between let and var?",
    "Explain asynchronous programming in JavaScript",
    "How do you handle errors in JavaScript?",
];

/// Decoded text longer than this is truncated in reports
const DECODED_PREVIEW_CHARS: usize = 50;

/// Configuration and tokenizer of a local model
pub struct LoadedModel {
    pub metadata: ModelMetadata,
    pub tokenizer: Tokenizer,
}

impl LoadedModel {
    /// Base vocabulary size, added tokens excluded
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(false)
    }
}

/// Load config.json and tokenizer.json from a model directory
pub fn load_probe(model_dir: &Path) -> ProbeResult<LoadedModel> {
    if !model_dir.is_dir() {
        return Err(ProbeError::DirectoryNotFound(model_dir.to_path_buf()));
    }

    let metadata = read_model_config(model_dir)?;
    let tokenizer = load_tokenizer(model_dir)?;

    Ok(LoadedModel {
        metadata,
        tokenizer,
    })
}

/// Load a model directory's tokenizer
///
/// Uses tokenizer.json when present. Otherwise builds a byte-level BPE
/// tokenizer from the GPT-2 style vocab.json and merges.txt pair.
pub fn load_tokenizer(model_dir: &Path) -> ProbeResult<Tokenizer> {
    let path = model_dir.join("tokenizer.json");
    if path.is_file() {
        return Ok(Tokenizer::from_file(&path)?);
    }

    let vocab = model_dir.join("vocab.json");
    let merges = model_dir.join("merges.txt");
    if !vocab.is_file() || !merges.is_file() {
        return Err(ProbeError::MissingFile(path));
    }

    tracing::debug!(path = %model_dir.display(), "Building BPE tokenizer from vocab.json and merges.txt");
    let bpe = BPE::from_file(&vocab.to_string_lossy(), &merges.to_string_lossy()).build()?;
    let mut tokenizer = Tokenizer::new(bpe);
    tokenizer
        .with_pre_tokenizer(Some(ByteLevel::new(false, true, true)))
        .with_decoder(Some(ByteLevel::default()));
    Ok(tokenizer)
}

/// Outcome of encoding and decoding one text
#[derive(Debug, Clone, Serialize)]
pub struct TokenizationProbe {
    pub input: String,
    pub token_count: usize,
    pub decoded: String,
}

impl TokenizationProbe {
    /// Decoded text cut to a fixed preview length
    pub fn decoded_preview(&self) -> String {
        if self.decoded.chars().count() > DECODED_PREVIEW_CHARS {
            let cut: String = self.decoded.chars().take(DECODED_PREVIEW_CHARS).collect();
            format!("{}...", cut)
        } else {
            self.decoded.clone()
        }
    }
}

/// Encode `text` (with special tokens) and decode it back
pub fn tokenization_probe(tokenizer: &Tokenizer, text: &str) -> ProbeResult<TokenizationProbe> {
    let encoding = tokenizer.encode(text, true)?;
    let ids = encoding.get_ids();
    let decoded = tokenizer.decode(ids, false)?;

    Ok(TokenizationProbe {
        input: text.to_string(),
        token_count: ids.len(),
        decoded,
    })
}

/// Result of the lightweight load test
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub model_type: String,
    pub vocab_size: usize,
    pub probe: TokenizationProbe,
}

/// Load config and tokenizer, then run one tokenization round trip
pub fn inspect_model(model_dir: &Path) -> ProbeResult<InspectReport> {
    let loaded = load_probe(model_dir)?;
    let probe = tokenization_probe(&loaded.tokenizer, LIGHTWEIGHT_PROBE_TEXT)?;

    Ok(InspectReport {
        model_type: loaded
            .metadata
            .model_type
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        vocab_size: loaded.vocab_size(),
        probe,
    })
}

/// Result of the detailed capability analysis
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub metadata: ModelMetadata,
    pub vocab_size: usize,
    pub probes: Vec<TokenizationProbe>,
    pub family: ModelFamily,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_parameters: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_class: Option<SizeClass>,
}

/// Analyze what a model can do based on its configuration and tokenizer
pub fn analyze_model(model_dir: &Path) -> ProbeResult<AnalysisReport> {
    let loaded = load_probe(model_dir)?;

    let probes = ANALYSIS_PROBE_TEXTS
        .iter()
        .map(|text| tokenization_probe(&loaded.tokenizer, text))
        .collect::<ProbeResult<Vec<_>>>()?;

    let weights_mb = WEIGHT_FILES
        .iter()
        .find_map(|(file, _)| file_size_mb(&model_dir.join(file)));

    Ok(AnalysisReport {
        family: loaded.metadata.family(),
        estimated_parameters: estimate_parameters(&loaded.metadata),
        vocab_size: loaded.vocab_size(),
        metadata: loaded.metadata,
        probes,
        weights_mb,
        size_class: weights_mb.map(SizeClass::from_size_mb),
    })
}

/// Run the lightweight load test against a target, printing diagnostics
pub fn inspect_target(target: &ProbeTarget) -> bool {
    println!("\n🧪 Testing {}...", target.name);
    println!("📍 Path: {}", target.path.display());

    match inspect_model(&target.path) {
        Ok(report) => {
            println!("  ✅ Config loaded: {}", report.model_type);
            println!("  ✅ Tokenizer loaded: vocab_size={}", report.vocab_size);
            println!(
                "  ✅ Tokenization test: '{}' -> {} tokens -> '{}'",
                report.probe.input, report.probe.token_count, report.probe.decoded
            );
            println!("  🎉 {} is working correctly!", target.name);
            true
        }
        Err(e) => {
            tracing::error!(model = %target.name, error = %e, "Load test failed");
            println!("  ❌ Error testing {}: {}", target.name, e);
            false
        }
    }
}

/// Run the detailed analysis against a target, printing diagnostics
pub fn analyze_target(target: &ProbeTarget) -> bool {
    println!("\n🔍 Analyzing {} capabilities...", target.name);
    println!("📍 Path: {}", target.path.display());

    let report = match analyze_model(&target.path) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(model = %target.name, error = %e, "Capability analysis failed");
            println!("  ❌ Error analyzing {}: {}", target.name, e);
            return false;
        }
    };

    let metadata = &report.metadata;
    println!(
        "📋 Model Type: {}",
        metadata.model_type.as_deref().unwrap_or("unknown")
    );
    println!("📋 Architecture: {}", metadata.architecture());
    println!("📋 Vocabulary Size: {}", report.vocab_size);
    if let Some(context) = metadata.max_context {
        println!("📋 Max Context Length: {} tokens", context);
    }
    if let Some(layers) = metadata.num_layers {
        println!("📋 Number of Layers: {}", layers);
    }
    if let Some(heads) = metadata.num_heads {
        println!("📋 Attention Heads: {}", heads);
    }
    if let Some(params) = report.estimated_parameters {
        println!("📋 Estimated Parameters: ~{:.0}M", params as f64 / 1e6);
    }

    println!("\n🧪 Tokenization Tests:");
    for (i, probe) in report.probes.iter().enumerate() {
        println!("  {}. Input: '{}'", i + 1, probe.input);
        println!(
            "     Tokens: {} | Decoded: '{}'",
            probe.token_count,
            probe.decoded_preview()
        );
    }

    println!("\n🎯 Model Capabilities Analysis:");
    for capability in report.family.capabilities() {
        println!("  ✅ {}", capability);
    }
    if let Some(best_for) = report.family.best_for() {
        println!("  🎯 Best for: {}", best_for);
    }
    if let (Some(size_mb), Some(size_class)) = (report.weights_mb, report.size_class) {
        println!("  📦 Model Size: {:.1} MB", size_mb);
        println!("  Performance: {}", size_class.description());
    }

    println!("\n💭 Expected Output Examples for Quiz Generation:");
    for (i, example) in report.family.quiz_examples().iter().enumerate() {
        println!("  {}. {}", i + 1, example);
    }

    println!("  ✅ {} is ready for quiz generation tasks!", target.name);
    true
}
