//! Text generation runtime
//!
//! Provides the generation smoke test: load a local model, run one prompt
//! through it and report the output. Inference runs on the CPU.

pub mod gpt2;

use crate::config::ProbeTarget;
use crate::error::{ProbeError, ProbeResult};
use crate::models::loader::load_tokenizer;
use crate::models::metadata::parse_model_config;
use gpt2::{Gpt2Config, Gpt2Model};
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tokenizers::Tokenizer;

/// End-of-text marker shared by the GPT-2 family tokenizers
pub const END_OF_TEXT: &str = "<|endoftext|>";

/// Decoding settings for one generation call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: usize,
    /// Sampling temperature; `None` selects greedy decoding
    pub temperature: Option<f64>,
    pub seed: u64,
}

impl GenerationParams {
    pub fn greedy(max_new_tokens: usize) -> Self {
        Self {
            max_new_tokens,
            temperature: None,
            seed: 42,
        }
    }
}

/// Output of one generation call
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Prompt plus continuation, special tokens removed
    pub text: String,
    pub prompt_tokens: usize,
    pub new_tokens: usize,
}

/// Something that can continue a prompt
pub trait TextGenerator {
    fn generate(&mut self, prompt: &str, params: &GenerationParams) -> ProbeResult<Generation>;
}

/// A GPT-2 family model with its tokenizer
pub struct Gpt2Runtime {
    model: Gpt2Model,
    tokenizer: Tokenizer,
    eos_token_id: Option<u32>,
}

impl Gpt2Runtime {
    /// Load config, tokenizer and weights from a local model directory
    pub fn load(model_dir: &Path) -> ProbeResult<Self> {
        if !model_dir.is_dir() {
            return Err(ProbeError::DirectoryNotFound(model_dir.to_path_buf()));
        }

        let config = Gpt2Config::from_model_dir(model_dir)?;
        let tokenizer = load_tokenizer(model_dir)?;
        let eos_token_id = tokenizer.token_to_id(END_OF_TEXT).or(config.eos_token_id);

        tracing::info!(
            path = %model_dir.display(),
            layers = config.n_layer,
            vocab_size = config.vocab_size,
            "Loading model weights"
        );
        let model = Gpt2Model::from_model_dir(model_dir, config)?;

        Ok(Self {
            model,
            tokenizer,
            eos_token_id,
        })
    }
}

impl TextGenerator for Gpt2Runtime {
    fn generate(&mut self, prompt: &str, params: &GenerationParams) -> ProbeResult<Generation> {
        let encoding = self.tokenizer.encode(prompt, false)?;
        let prompt_ids = encoding.get_ids().to_vec();

        let ids = generate_ids(&self.model, prompt_ids.clone(), params, self.eos_token_id)?;
        let text = self.tokenizer.decode(&ids, true)?;

        Ok(Generation {
            text,
            prompt_tokens: prompt_ids.len(),
            new_tokens: ids.len() - prompt_ids.len(),
        })
    }
}

/// Extend `ids` one token at a time
///
/// Stops after `max_new_tokens`, at the end-of-text token (which is kept),
/// or once the context window is full.
pub fn generate_ids(
    model: &Gpt2Model,
    mut ids: Vec<u32>,
    params: &GenerationParams,
    eos_token_id: Option<u32>,
) -> ProbeResult<Vec<u32>> {
    let context = model.config().n_positions;
    let mut rng = StdRng::seed_from_u64(params.seed);

    for _ in 0..params.max_new_tokens {
        if ids.len() >= context {
            tracing::debug!(context, "Context window full, stopping");
            break;
        }

        let logits = model.next_token_logits(&ids)?;
        let logits: Vec<f32> = logits.to_vec1()?;
        let next = select_token(&logits, params.temperature, &mut rng)?;
        ids.push(next);

        if Some(next) == eos_token_id {
            break;
        }
    }

    Ok(ids)
}

/// Pick the next token: argmax when greedy, otherwise sample from the
/// temperature-scaled softmax
pub fn select_token<R: Rng>(
    logits: &[f32],
    temperature: Option<f64>,
    rng: &mut R,
) -> ProbeResult<u32> {
    if logits.is_empty() {
        return Err(ProbeError::Generation("empty logits".to_string()));
    }

    let Some(temperature) = temperature.filter(|t| *t > 0.0) else {
        let best = logits
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or_default();
        return Ok(best as u32);
    };

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let weights: Vec<f64> = logits
        .iter()
        .map(|&l| ((l - max) as f64 / temperature).exp())
        .collect();
    let dist = WeightedIndex::new(&weights).map_err(|e| ProbeError::Generation(e.to_string()))?;
    Ok(dist.sample(rng) as u32)
}

/// Run one prompt through a generator, printing the result
pub fn smoke_test<G: TextGenerator>(
    generator: &mut G,
    name: &str,
    prompt: &str,
    params: &GenerationParams,
) -> bool {
    println!("💭 Prompt: '{}'", prompt);
    println!("🚀 Generating {} tokens...", params.max_new_tokens);

    match generator.generate(prompt, params) {
        Ok(generation) => {
            tracing::info!(
                model = %name,
                prompt_tokens = generation.prompt_tokens,
                new_tokens = generation.new_tokens,
                "Generation finished"
            );
            println!("📝 Generated: '{}'", generation.text);
            println!("  🎉 {} generation test passed!", name);
            true
        }
        Err(e) => {
            tracing::error!(model = %name, error = %e, "Generation failed");
            println!("  ❌ Generation test failed: {}", e);
            false
        }
    }
}

/// Load a target's model and run the smoke test against it
pub fn smoke_test_target(target: &ProbeTarget, prompt: &str, params: &GenerationParams) -> bool {
    println!("\n🧪 Testing generation with {}...", target.name);
    println!("📍 Path: {}", target.path.display());
    if let Some(metadata) = parse_model_config(&target.path) {
        println!("📋 Architecture: {}", metadata.architecture());
    }
    println!("📦 Loading model...");

    match Gpt2Runtime::load(&target.path) {
        Ok(mut runtime) => smoke_test(&mut runtime, &target.name, prompt, params),
        Err(e) => {
            tracing::error!(model = %target.name, error = %e, "Failed to load model");
            println!("  ❌ Model test failed: {}", e);
            false
        }
    }
}
