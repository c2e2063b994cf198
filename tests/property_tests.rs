//! Property-based tests using proptest
//!
//! These tests verify invariants across randomized inputs, helping catch
//! edge cases that might be missed by example-based testing.

use model_probe::config::{ModelSpec, ProbeTarget, is_valid_repo_id};
use model_probe::models::download::matches_allow_patterns;
use model_probe::models::verify::{TOTAL_CHECKS, integrity_score};
use model_probe::summary::{RunSummary, exit_status};
use proptest::prelude::*;

// =============================================================================
// Arbitrary Implementations
// =============================================================================

/// Generate arbitrary ModelSpec values
fn arb_model_spec() -> impl Strategy<Value = ModelSpec> {
    (
        "[a-zA-Z][a-zA-Z0-9_-]{0,30}",               // model name
        "([a-zA-Z0-9-]{1,20}/)?[a-zA-Z0-9_.-]{1,30}", // repo id like "microsoft/DialoGPT-small"
        prop::option::of("[a-zA-Z ]{1,40}"),          // description
        prop::collection::vec("\\*?[a-z]{1,8}(\\.[a-z]{2,4})?", 0..3),
    )
        .prop_map(|(name, repo_id, description, allow_patterns)| ModelSpec {
            local_dir: format!("./models/{}", name).into(),
            name,
            repo_id,
            description,
            allow_patterns,
        })
}

fn arb_outcomes() -> impl Strategy<Value = Vec<(String, bool)>> {
    prop::collection::vec(("[a-z0-9-]{1,12}", any::<bool>()), 0..12)
}

// =============================================================================
// Config Serialization Round-Trip Tests
// =============================================================================

proptest! {
    /// ModelSpec serializes to TOML and deserializes back to equal value
    #[test]
    fn model_spec_roundtrip(spec in arb_model_spec()) {
        let toml_str = toml::to_string(&spec).expect("Failed to serialize to TOML");
        let parsed: ModelSpec = toml::from_str(&toml_str).expect("Failed to parse TOML");
        prop_assert_eq!(spec, parsed);
    }

    /// ProbeTarget survives a JSON round trip, optional flag included
    #[test]
    fn probe_target_json_roundtrip(name in "[a-zA-Z][a-zA-Z0-9 -]{0,20}", optional in any::<bool>()) {
        let mut target = ProbeTarget::new(&name, format!("models/{}", name));
        target.optional = optional;
        let json_str = serde_json::to_string(&target).expect("Failed to serialize to JSON");
        let parsed: ProbeTarget = serde_json::from_str(&json_str).expect("Failed to parse JSON");
        prop_assert_eq!(target, parsed);
    }

    /// Generated repo ids are accepted, whitespace never is
    #[test]
    fn repo_id_validation(spec in arb_model_spec(), pad in " |\t") {
        prop_assert!(is_valid_repo_id(&spec.repo_id) || spec.repo_id.split('/').any(|p| p == "." || p == ".."));
        let padded = format!("{}{}", spec.repo_id, pad);
        prop_assert!(!is_valid_repo_id(&padded));
    }
}

// =============================================================================
// Integrity Score Invariants
// =============================================================================

proptest! {
    /// Score stays within 0..=100 for any issue count
    #[test]
    fn integrity_score_bounded(issues in 0usize..64) {
        let score = integrity_score(issues);
        prop_assert!((0.0..=100.0).contains(&score));
    }

    /// More issues never raise the score
    #[test]
    fn integrity_score_monotonic(issues in 0usize..32, extra in 1usize..8) {
        prop_assert!(integrity_score(issues + extra) <= integrity_score(issues));
    }

    /// Score reaches zero exactly when every check failed
    #[test]
    fn integrity_score_zero_floor(issues in 0usize..32) {
        prop_assert_eq!(integrity_score(issues) == 0.0, issues >= TOTAL_CHECKS);
    }
}

// =============================================================================
// Run Summary Invariants
// =============================================================================

proptest! {
    /// A run succeeds only if every recorded model passed
    #[test]
    fn all_passed_iff_every_outcome(outcomes in arb_outcomes()) {
        let mut summary = RunSummary::new("Test");
        for (name, passed) in &outcomes {
            summary.record(name, *passed);
        }

        let expected = outcomes.iter().all(|(_, passed)| *passed);
        prop_assert_eq!(summary.all_passed(), expected);
        prop_assert_eq!(exit_status(summary.all_passed()) == 0, expected);
        prop_assert_eq!(summary.total(), outcomes.len());
        prop_assert_eq!(
            summary.passed_count(),
            outcomes.iter().filter(|(_, passed)| *passed).count()
        );
    }
}

// =============================================================================
// Allow Pattern Invariants
// =============================================================================

proptest! {
    /// An empty allow list keeps every file
    #[test]
    fn empty_allow_list_matches_all(file in "[a-zA-Z0-9_./-]{1,40}") {
        prop_assert!(matches_allow_patterns(&file, &[]));
    }

    /// A lone `*` matches every file
    #[test]
    fn star_matches_all(file in "[a-zA-Z0-9_./-]{0,40}") {
        prop_assert!(matches_allow_patterns(&file, &["*".to_string()]));
    }

    /// Extension patterns match by suffix only
    #[test]
    fn extension_pattern(stem in "[a-z_]{1,12}", ext in "json|onnx|txt") {
        let pattern = vec![format!("*.{}", ext)];
        let matching = format!("{}.{}", stem, ext);
        prop_assert!(matches_allow_patterns(&matching, &pattern));
        let other = format!("{}.safetensors", stem);
        prop_assert!(!matches_allow_patterns(&other, &pattern));
    }

    /// Literal patterns match only themselves
    #[test]
    fn literal_pattern(file in "[a-z_]{1,12}\\.json", other in "[a-z_]{1,12}\\.bin") {
        let pattern = vec![file.clone()];
        prop_assert!(matches_allow_patterns(&file, &pattern));
        prop_assert!(!matches_allow_patterns(&other, &pattern));
    }
}
