//! Model management module
//!
//! Provides functionality for:
//! - Downloading model snapshots from HuggingFace Hub into local directories
//! - Inspecting the hub cache and the models directory
//! - Parsing model metadata from config.json
//! - Verifying model directory integrity
//! - Load-only smoke testing of config and tokenizer

pub mod cache;
pub mod download;
pub mod loader;
pub mod metadata;
pub mod verify;

pub use cache::{list_cached_models, model_dirs, render_tree, snapshot_path};
pub use download::{download_models, snapshot_download};
pub use loader::{LoadedModel, analyze_target, inspect_target, load_probe};
pub use metadata::{ModelFamily, ModelMetadata, SizeClass, parse_model_config, read_model_config};
pub use verify::{
    HubMarkers, ModelsVerification, OnnxReport, VerificationIssue, VerificationReport,
    hub_markers, verify_model_dir, verify_models_root, verify_onnx_dir,
};
