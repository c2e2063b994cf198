//! Model Probe - Main entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use model_probe::config::ProbeConfig;
use model_probe::models::{
    analyze_target, download_models, inspect_target, render_tree, verify_models_root,
    verify_onnx_dir,
};
use model_probe::runtime::{GenerationParams, smoke_test_target};
use model_probe::summary::{RunSummary, exit_status};
use std::path::PathBuf;
use std::process::ExitCode;

const RULE_WIDTH: usize = 60;

#[derive(Parser, Debug)]
#[command(name = "model-probe")]
#[command(about = "Download, verify and smoke-test small language models", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log format (json or pretty)
    #[arg(long, global = true, default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download the configured models from the hub
    Download {
        /// Download the ONNX re-exports instead
        #[arg(long)]
        onnx: bool,
    },
    /// Verify integrity of every model directory
    Verify {
        /// Check the ONNX model directories instead
        #[arg(long)]
        onnx: bool,
        /// Print reports as JSON
        #[arg(long, conflicts_with = "onnx")]
        json: bool,
    },
    /// Load config and tokenizer of each inspect target
    Inspect {
        /// Add the capability analysis
        #[arg(long)]
        detailed: bool,
    },
    /// Run a generation smoke test
    Generate {
        /// Test every generation target instead of a single model
        #[arg(long)]
        all: bool,
        /// Model name or directory for the single-model test
        #[arg(long, conflicts_with = "all")]
        model: Option<String>,
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        max_new_tokens: Option<usize>,
        /// Sampling temperature (greedy when omitted)
        #[arg(long)]
        temperature: Option<f64>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the models directory structure
    Tree,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    match cli.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(&cli.log_level)
                .init();
        }
    }

    let mut config = ProbeConfig::load(cli.config)?;

    // CLI overrides
    if let Command::Generate {
        model,
        prompt,
        max_new_tokens,
        temperature,
        seed,
        all,
    } = &cli.command
    {
        let generation = &mut config.generation;
        if let Some(model) = model {
            generation.model = model.clone();
        }
        if let Some(prompt) = prompt {
            if *all {
                generation.all_prompt = prompt.clone();
            } else {
                generation.prompt = prompt.clone();
            }
        }
        if let Some(max_new_tokens) = *max_new_tokens {
            if *all {
                generation.all_max_new_tokens = max_new_tokens;
            } else {
                generation.max_new_tokens = max_new_tokens;
            }
        }
        if temperature.is_some() {
            if *all {
                generation.all_temperature = *temperature;
            } else {
                generation.temperature = *temperature;
            }
        }
        if let Some(seed) = *seed {
            generation.seed = seed;
        }
    }

    config.validate()?;

    tracing::debug!(
        models_dir = %config.models_dir.display(),
        cache_dir = %config.cache_dir.display(),
        "Configuration loaded"
    );

    let success = match cli.command {
        Command::Download { onnx } => run_download(&config, onnx).await,
        Command::Verify { onnx: true, .. } => run_verify_onnx(&config),
        Command::Verify { onnx: false, json } => run_verify(&config, json)?,
        Command::Inspect { detailed } => run_inspect(&config, detailed),
        Command::Generate { all: true, .. } => run_generate_all(&config),
        Command::Generate { all: false, .. } => run_generate(&config),
        Command::Tree => {
            print_tree(&config);
            config.models_dir.is_dir()
        }
    };

    Ok(ExitCode::from(exit_status(success)))
}

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

async fn run_download(config: &ProbeConfig, onnx: bool) -> bool {
    let specs = if onnx {
        &config.onnx_models
    } else {
        &config.models
    };
    tracing::info!(count = specs.len(), onnx, "🚀 Starting model download process");

    let summary = download_models(specs, &config.cache_dir).await;
    tracing::info!(
        downloaded = summary.passed_count(),
        total = summary.total(),
        "🎯 Download summary"
    );

    let success = summary.all_passed();
    if success {
        tracing::info!("✨ All models downloaded successfully!");
    } else {
        tracing::warn!("⚠️ Some models failed to download. Check error logs");
    }

    if onnx {
        if success {
            println!("\n🔍 Verifying ONNX model files...");
            for spec in specs {
                print_lines(&verify_onnx_dir(&spec.local_dir, &spec.name).render());
            }
        }
    } else {
        print_tree(config);
    }

    success
}

fn run_verify(config: &ProbeConfig, json: bool) -> Result<bool> {
    let verification = verify_models_root(&config.models_dir, &config.cache_dir);
    let success = verification.success();

    if json {
        println!("{}", serde_json::to_string_pretty(&verification)?);
        return Ok(success);
    }

    println!("🛡️  Model Authentication & Integrity Verification");
    println!("{}", rule());

    if !verification.root_present {
        tracing::error!(models_dir = %config.models_dir.display(), "Models directory not found");
        println!("❌ Models directory not found!");
        return Ok(false);
    }

    println!("📁 Found {} model directories", verification.reports.len());
    for report in &verification.reports {
        println!();
        print_lines(&report.render());
    }

    println!("\n{}", rule());
    print_lines(&verification.hub.render());

    println!("\n{}", rule());
    print_lines(&verification.summary().render("AUTHENTIC", "ISSUES"));
    println!(
        "🔐 HuggingFace authenticity: {}",
        if verification.hub.authentic() {
            "✅ VERIFIED"
        } else {
            "❌ UNVERIFIED"
        }
    );

    if success {
        println!("\n🎉 All models are authentic and properly downloaded!");
    } else {
        println!("\n⚠️  Some models may have issues or are not authentic");
    }

    Ok(success)
}

fn run_verify_onnx(config: &ProbeConfig) -> bool {
    println!("🔍 Verifying ONNX model files...");

    let mut summary = RunSummary::new("ONNX Verification");
    for spec in &config.onnx_models {
        let report = verify_onnx_dir(&spec.local_dir, &spec.name);
        println!();
        print_lines(&report.render());
        summary.record(&spec.name, report.passed());
    }

    println!("\n{}", rule());
    print_lines(&summary.render("READY", "ISSUES"));
    summary.all_passed()
}

fn run_inspect(config: &ProbeConfig, detailed: bool) -> bool {
    if detailed {
        println!("🚀 Model Capability Analysis & Testing");
    } else {
        println!("🚀 Lightweight Model Testing");
    }
    println!("{}", rule());

    let mut summary = RunSummary::new(if detailed { "Model Analysis" } else { "Test" });
    for target in &config.inspect_targets {
        let passed = if !target.path.exists() {
            println!("\n❌ {} not found at {}", target.name, target.path.display());
            false
        } else if detailed {
            analyze_target(target)
        } else {
            inspect_target(target)
        };
        summary.record(&target.name, passed);
    }

    println!("\n{}", rule());
    if detailed {
        print_lines(&summary.render("READY", "ISSUES"));
        let ready = summary.passed_names();
        if !ready.is_empty() {
            println!("\n🎉 Models ready for production use:");
            for name in ready {
                println!("  • {}", name);
            }
        }
    } else {
        print_lines(&summary.render("WORKING", "FAILED"));
        if summary.all_passed() {
            println!("🎉 All models are functional!");
        } else {
            println!("⚠️  Some models have issues");
        }
    }
    summary.all_passed()
}

fn run_generate(config: &ProbeConfig) -> bool {
    let generation = &config.generation;
    let target = config.resolve_generation_model(&generation.model);
    let params = GenerationParams {
        max_new_tokens: generation.max_new_tokens,
        temperature: generation.temperature,
        seed: generation.seed,
    };

    println!("🚀 Simple Generation Test");
    println!("{}", rule());

    if !target.path.exists() {
        println!("❌ Model not found at {}", target.path.display());
        return false;
    }

    let success = smoke_test_target(&target, &generation.prompt, &params);

    println!("\n{}", rule());
    if success {
        println!("🎉 Model generation test PASSED!");
        println!("✅ {} can generate text", target.name);
    } else {
        println!("❌ Model generation test FAILED!");
    }
    success
}

fn run_generate_all(config: &ProbeConfig) -> bool {
    let generation = &config.generation;
    let params = GenerationParams {
        max_new_tokens: generation.all_max_new_tokens,
        temperature: generation.all_temperature,
        seed: generation.seed,
    };

    println!("🚀 Model Testing Script");
    println!("{}", rule());

    if !config.models_dir.is_dir() {
        println!("❌ Models directory not found!");
        return false;
    }

    let mut summary = RunSummary::new("Test");
    for target in &generation.targets {
        if target.optional && !target.path.exists() {
            tracing::info!(model = %target.name, "Optional model not present, skipping");
            continue;
        }
        let passed = smoke_test_target(target, &generation.all_prompt, &params);
        summary.record(&target.name, passed);
    }

    println!("\n{}", rule());
    print_lines(&summary.render("PASS", "FAIL"));
    if summary.all_passed() {
        println!("🎉 All models are working correctly!");
    } else {
        println!("⚠️  Some models failed tests");
    }
    summary.all_passed()
}

fn print_tree(config: &ProbeConfig) {
    let lines = render_tree(&config.models_dir, 5);
    if lines.is_empty() {
        return;
    }
    println!("\n📁 Final models directory structure:");
    print_lines(&lines);
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}
