//! Model Probe - acquire, verify and smoke-test small language models
//!
//! Downloads model snapshots from the HuggingFace Hub, checks that the local
//! copies are complete, and runs a fixed prompt through them on the CPU.

pub mod config;
pub mod error;
pub mod models;
pub mod runtime;
pub mod summary;

pub use config::{GenerationConfig, ModelSpec, ProbeConfig, ProbeTarget};
pub use error::{ProbeError, ProbeResult};
pub use models::{VerificationIssue, VerificationReport, verify_model_dir};
pub use runtime::{GenerationParams, Gpt2Runtime, TextGenerator};
pub use summary::{RunSummary, exit_status};
