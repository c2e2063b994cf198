//! GPT-2 family weights on the candle tensor runtime
//!
//! Covers distilgpt2, gpt2 and DialoGPT checkpoints. Weights are read as f32 on
//! the CPU from `model.safetensors` or `pytorch_model.bin`, with or without
//! the `transformer.` prefix. The LM head is tied to the token embedding.

use crate::error::{ProbeError, ProbeResult};
use candle_core::{D, DType, Device, IndexOp, Module, Tensor};
use candle_nn::{Embedding, LayerNorm, VarBuilder};
use serde::Deserialize;
use std::path::Path;

/// Hyperparameters read from config.json
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Gpt2Config {
    #[serde(default)]
    pub model_type: Option<String>,
    pub vocab_size: usize,
    #[serde(alias = "max_position_embeddings")]
    pub n_positions: usize,
    #[serde(alias = "hidden_size")]
    pub n_embd: usize,
    #[serde(alias = "num_hidden_layers")]
    pub n_layer: usize,
    #[serde(alias = "num_attention_heads")]
    pub n_head: usize,
    #[serde(default = "default_layer_norm_epsilon")]
    pub layer_norm_epsilon: f64,
    #[serde(default)]
    pub eos_token_id: Option<u32>,
}

fn default_layer_norm_epsilon() -> f64 {
    1e-5
}

impl Gpt2Config {
    /// Read and check config.json from a model directory
    pub fn from_model_dir(model_dir: &Path) -> ProbeResult<Self> {
        let path = model_dir.join("config.json");
        if !path.is_file() {
            return Err(ProbeError::MissingFile(path));
        }
        let content = std::fs::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&content).map_err(|source| {
            ProbeError::InvalidJson {
                path: path.clone(),
                source,
            }
        })?;

        // Reject other architectures before reading the GPT-2 fields
        match value.get("model_type").and_then(|v| v.as_str()) {
            Some("gpt2") | None => {}
            Some(other) => return Err(ProbeError::UnsupportedModel(other.to_string())),
        }

        let config: Self = serde_json::from_value(value)
            .map_err(|source| ProbeError::InvalidJson { path, source })?;
        if config.n_head == 0 || config.n_embd % config.n_head != 0 {
            return Err(ProbeError::UnsupportedModel(format!(
                "gpt2 with n_embd={} not divisible by n_head={}",
                config.n_embd, config.n_head
            )));
        }

        Ok(config)
    }
}

/// GPT-2's linear layer, stored as (in, out)
struct Conv1D {
    weight: Tensor,
    bias: Tensor,
}

impl Conv1D {
    fn load(in_dim: usize, out_dim: usize, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            weight: vb.get((in_dim, out_dim), "weight")?,
            bias: vb.get(out_dim, "bias")?,
        })
    }
}

impl Module for Conv1D {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        xs.broadcast_matmul(&self.weight)?.broadcast_add(&self.bias)
    }
}

struct Attention {
    c_attn: Conv1D,
    c_proj: Conv1D,
    n_head: usize,
    head_dim: usize,
    scale: f64,
}

impl Attention {
    fn load(config: &Gpt2Config, vb: VarBuilder) -> candle_core::Result<Self> {
        let n_embd = config.n_embd;
        let head_dim = n_embd / config.n_head;
        Ok(Self {
            c_attn: Conv1D::load(n_embd, 3 * n_embd, vb.pp("c_attn"))?,
            c_proj: Conv1D::load(n_embd, n_embd, vb.pp("c_proj"))?,
            n_head: config.n_head,
            head_dim,
            scale: 1.0 / (head_dim as f64).sqrt(),
        })
    }

    fn forward(&self, xs: &Tensor, mask: &Tensor) -> candle_core::Result<Tensor> {
        let (b, t, c) = xs.dims3()?;
        let qkv = self.c_attn.forward(xs)?;

        let heads = |offset: usize| -> candle_core::Result<Tensor> {
            qkv.narrow(D::Minus1, offset, c)?
                .reshape((b, t, self.n_head, self.head_dim))?
                .transpose(1, 2)?
                .contiguous()
        };
        let q = heads(0)?;
        let k = heads(c)?;
        let v = heads(2 * c)?;

        let scores = (q.matmul(&k.t()?)? * self.scale)?.broadcast_add(mask)?;
        let probs = candle_nn::ops::softmax_last_dim(&scores)?;
        let ys = probs
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((b, t, c))?;

        self.c_proj.forward(&ys)
    }
}

struct Mlp {
    c_fc: Conv1D,
    c_proj: Conv1D,
}

impl Mlp {
    fn load(config: &Gpt2Config, vb: VarBuilder) -> candle_core::Result<Self> {
        let n_embd = config.n_embd;
        Ok(Self {
            c_fc: Conv1D::load(n_embd, 4 * n_embd, vb.pp("c_fc"))?,
            c_proj: Conv1D::load(4 * n_embd, n_embd, vb.pp("c_proj"))?,
        })
    }
}

impl Module for Mlp {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        // tanh-approximated GELU ("gelu_new")
        self.c_proj.forward(&self.c_fc.forward(xs)?.gelu()?)
    }
}

struct Block {
    ln_1: LayerNorm,
    attn: Attention,
    ln_2: LayerNorm,
    mlp: Mlp,
}

impl Block {
    fn load(config: &Gpt2Config, vb: VarBuilder) -> candle_core::Result<Self> {
        let eps = config.layer_norm_epsilon;
        Ok(Self {
            ln_1: candle_nn::layer_norm(config.n_embd, eps, vb.pp("ln_1"))?,
            attn: Attention::load(config, vb.pp("attn"))?,
            ln_2: candle_nn::layer_norm(config.n_embd, eps, vb.pp("ln_2"))?,
            mlp: Mlp::load(config, vb.pp("mlp"))?,
        })
    }

    fn forward(&self, xs: &Tensor, mask: &Tensor) -> candle_core::Result<Tensor> {
        let xs = (xs + self.attn.forward(&self.ln_1.forward(xs)?, mask)?)?;
        &xs + self.mlp.forward(&self.ln_2.forward(&xs)?)?
    }
}

/// A loaded GPT-2 model
pub struct Gpt2Model {
    wte: Embedding,
    wpe: Embedding,
    blocks: Vec<Block>,
    ln_f: LayerNorm,
    config: Gpt2Config,
    device: Device,
}

impl Gpt2Model {
    /// Build the model from a variable store
    pub fn load(config: Gpt2Config, vb: VarBuilder) -> ProbeResult<Self> {
        let vb = if vb.contains_tensor("transformer.wte.weight") {
            vb.pp("transformer")
        } else {
            vb
        };
        let device = vb.device().clone();

        let wte = candle_nn::embedding(config.vocab_size, config.n_embd, vb.pp("wte"))?;
        let wpe = candle_nn::embedding(config.n_positions, config.n_embd, vb.pp("wpe"))?;
        let blocks = (0..config.n_layer)
            .map(|i| Block::load(&config, vb.pp("h").pp(i)))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let ln_f = candle_nn::layer_norm(config.n_embd, config.layer_norm_epsilon, vb.pp("ln_f"))?;

        Ok(Self {
            wte,
            wpe,
            blocks,
            ln_f,
            config,
            device,
        })
    }

    /// Load weights from a model directory, preferring safetensors
    pub fn from_model_dir(model_dir: &Path, config: Gpt2Config) -> ProbeResult<Self> {
        let device = Device::Cpu;
        let safetensors = model_dir.join("model.safetensors");
        let pytorch = model_dir.join("pytorch_model.bin");

        let vb = if safetensors.is_file() {
            tracing::debug!(path = %safetensors.display(), "Loading safetensors weights");
            // SAFETY: the file is only read while the model is alive and this
            // tool never writes to a model directory it is loading from
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, &device)? }
        } else if pytorch.is_file() {
            tracing::debug!(path = %pytorch.display(), "Loading PyTorch weights");
            VarBuilder::from_pth(&pytorch, DType::F32, &device)?
        } else {
            return Err(ProbeError::MissingFile(safetensors));
        };

        Self::load(config, vb)
    }

    pub fn config(&self) -> &Gpt2Config {
        &self.config
    }

    /// Logits for the token following `ids`
    pub fn next_token_logits(&self, ids: &[u32]) -> ProbeResult<Tensor> {
        let t = ids.len();
        if t == 0 {
            return Err(ProbeError::Generation("empty input".to_string()));
        }

        let input = Tensor::new(ids, &self.device)?.unsqueeze(0)?;
        let positions = Tensor::arange(0u32, t as u32, &self.device)?;
        let mask = causal_mask(t, &self.device)?;

        let mut xs = self
            .wte
            .forward(&input)?
            .broadcast_add(&self.wpe.forward(&positions)?)?;
        for block in &self.blocks {
            xs = block.forward(&xs, &mask)?;
        }
        let xs = self.ln_f.forward(&xs)?;

        let last = xs.i((0, t - 1))?;
        let logits = self
            .wte
            .embeddings()
            .matmul(&last.unsqueeze(1)?)?
            .squeeze(1)?;
        Ok(logits)
    }
}

/// Additive mask hiding future positions
fn causal_mask(t: usize, device: &Device) -> candle_core::Result<Tensor> {
    let mask: Vec<f32> = (0..t)
        .flat_map(|i| (0..t).map(move |j| if j > i { f32::NEG_INFINITY } else { 0.0 }))
        .collect();
    Tensor::from_slice(&mask, (t, t), device)
}
