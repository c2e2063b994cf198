//! Integration tests for model directory verification
//!
//! Every test builds its own models root in a temp dir, so nothing here needs
//! network access or real weights.

use model_probe::models::{VerificationIssue, verify_model_dir, verify_models_root};
use model_probe::summary::{RunSummary, exit_status};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONFIG: &str =
    r#"{"model_type": "gpt2", "architectures": ["GPT2LMHeadModel"], "vocab_size": 50257}"#;

fn write_model(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("config.json"), CONFIG).unwrap();
    fs::write(dir.join("tokenizer.json"), r#"{"version": "1.0"}"#).unwrap();
    fs::write(dir.join("model.safetensors"), vec![0u8; 2048]).unwrap();
}

/// Models root with the hub cache present and the given model dirs complete
fn models_root(names: &[&str]) -> TempDir {
    let root = TempDir::new().unwrap();
    fs::create_dir_all(root.path().join(".cache")).unwrap();
    for name in names {
        write_model(&root.path().join(name));
    }
    root
}

#[test]
fn complete_models_verify() {
    let root = models_root(&["distilgpt2", "gpt2", "flan-t5-small"]);
    let verification = verify_models_root(root.path(), &root.path().join(".cache"));

    assert!(verification.root_present);
    assert_eq!(verification.reports.len(), 3);
    for report in &verification.reports {
        assert!(report.passed(), "{} had issues: {:?}", report.name, report.issues);
        assert_eq!(report.integrity_score, 100.0);
        assert_eq!(report.model_type.as_deref(), Some("gpt2"));
    }
    assert!(verification.success());
    assert_eq!(exit_status(verification.success()), 0);
}

#[test]
fn cache_dir_is_not_a_model() {
    let root = models_root(&["gpt2"]);
    let verification = verify_models_root(root.path(), &root.path().join(".cache"));
    let names: Vec<&str> = verification.reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["gpt2"]);
}

#[test]
fn missing_config_is_reported() {
    let root = models_root(&["gpt2"]);
    let model = root.path().join("gpt2");
    fs::remove_file(model.join("config.json")).unwrap();

    let report = verify_model_dir(&model, "gpt2");
    assert!(
        report
            .issues
            .contains(&VerificationIssue::Missing("config.json".to_string()))
    );
    assert!(!report.passed());
    assert!(report.integrity_score < 100.0);

    let verification = verify_models_root(root.path(), &root.path().join(".cache"));
    assert!(!verification.success());
    assert_eq!(exit_status(verification.success()), 1);
}

#[test]
fn malformed_config_is_invalid_json() {
    let root = models_root(&["distilgpt2"]);
    let model = root.path().join("distilgpt2");
    fs::write(model.join("config.json"), "{ not json").unwrap();

    let report = verify_model_dir(&model, "distilgpt2");
    assert!(
        report
            .issues
            .contains(&VerificationIssue::InvalidJson("config.json".to_string()))
    );
    assert!(!report.passed());
    assert!(
        report
            .render()
            .iter()
            .any(|line| line.contains("Invalid JSON: config.json"))
    );
}

#[test]
fn missing_weights_fail() {
    let root = models_root(&["gpt2"]);
    let model = root.path().join("gpt2");
    fs::remove_file(model.join("model.safetensors")).unwrap();

    let report = verify_model_dir(&model, "gpt2");
    assert_eq!(report.issues, vec![VerificationIssue::NoWeights]);

    fs::write(model.join("pytorch_model.bin"), b"weights").unwrap();
    assert!(verify_model_dir(&model, "gpt2").passed());
}

#[test]
fn missing_directory_fails_without_error() {
    let root = TempDir::new().unwrap();
    let report = verify_model_dir(&root.path().join("absent"), "absent");
    assert_eq!(report.issues, vec![VerificationIssue::DirectoryNotFound]);
    assert!(!report.passed());

    let verification = verify_models_root(&root.path().join("absent"), &root.path().join(".cache"));
    assert!(!verification.root_present);
    assert!(!verification.success());
}

#[test]
fn one_failure_fails_the_run() {
    let root = models_root(&["distilgpt2", "gpt2"]);
    fs::remove_file(root.path().join("gpt2").join("tokenizer.json")).unwrap();

    let verification = verify_models_root(root.path(), &root.path().join(".cache"));
    let summary = verification.summary();
    assert_eq!(summary.total(), 2);
    assert_eq!(summary.passed_names(), vec!["distilgpt2"]);
    assert!(!verification.success());
}

#[test]
fn hub_cache_is_required() {
    let root = models_root(&["gpt2"]);
    fs::remove_dir(root.path().join(".cache")).unwrap();

    let verification = verify_models_root(root.path(), &root.path().join(".cache"));
    assert!(verification.summary().all_passed());
    assert!(!verification.hub.authentic());
    assert!(!verification.success());
}

#[test]
fn verification_serializes_to_json() {
    let root = models_root(&["gpt2"]);
    fs::remove_file(root.path().join("gpt2").join("model.safetensors")).unwrap();

    let verification = verify_models_root(root.path(), &root.path().join(".cache"));
    let value = serde_json::to_value(&verification).unwrap();
    let issue = &value["reports"][0]["issues"][0];
    assert_eq!(issue["kind"], "no_weights");
    assert_eq!(value["hub"]["cache_present"], true);
}

#[test]
fn summary_matches_exit_status() {
    let mut summary = RunSummary::new("Verification");
    summary.record("distilgpt2", true);
    assert_eq!(exit_status(summary.all_passed()), 0);
    summary.record("gpt2", false);
    assert_eq!(exit_status(summary.all_passed()), 1);
}
