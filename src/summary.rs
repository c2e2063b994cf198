//! Aggregation of per-model outcomes into an overall result

use serde::Serialize;

/// Outcome of one model in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub name: String,
    pub passed: bool,
}

/// Ordered per-model outcomes of one command
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub title: String,
    pub outcomes: Vec<Outcome>,
}

impl RunSummary {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, name: &str, passed: bool) {
        self.outcomes.push(Outcome {
            name: name.to_string(),
            passed,
        });
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn passed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.passed).count()
    }

    /// True only if every recorded outcome passed
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.passed)
    }

    /// Names of the outcomes that passed, in order
    pub fn passed_names(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.passed)
            .map(|o| o.name.as_str())
            .collect()
    }

    /// Per-model status lines followed by the passed/total count
    pub fn render(&self, pass_label: &str, fail_label: &str) -> Vec<String> {
        let mut lines = vec![format!("📊 {} Summary:", self.title)];
        for outcome in &self.outcomes {
            let status = if outcome.passed {
                format!("✅ {}", pass_label)
            } else {
                format!("❌ {}", fail_label)
            };
            lines.push(format!("  {}: {}", outcome.name, status));
        }
        lines.push(format!(
            "\n🎯 Results: {}/{} models {}",
            self.passed_count(),
            self.total(),
            pass_label.to_lowercase()
        ));
        lines
    }
}

/// Process exit status for an overall success flag
pub fn exit_status(success: bool) -> u8 {
    if success { 0 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_passed_requires_every_outcome() {
        let mut summary = RunSummary::new("Download");
        summary.record("distilgpt2", true);
        summary.record("gpt2", true);
        assert!(summary.all_passed());

        summary.record("microsoft/DialoGPT-small", false);
        assert!(!summary.all_passed());
        assert_eq!(summary.passed_count(), 2);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.passed_names(), vec!["distilgpt2", "gpt2"]);
    }

    #[test]
    fn test_empty_summary_passes() {
        let summary = RunSummary::new("Verification");
        assert!(summary.all_passed());
        assert_eq!(summary.total(), 0);
    }

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(true), 0);
        assert_eq!(exit_status(false), 1);
    }

    #[test]
    fn test_render() {
        let mut summary = RunSummary::new("Test");
        summary.record("DistilGPT-2", true);
        summary.record("GPT-2", false);

        let lines = summary.render("WORKING", "FAILED");
        assert_eq!(lines[0], "📊 Test Summary:");
        assert_eq!(lines[1], "  DistilGPT-2: ✅ WORKING");
        assert_eq!(lines[2], "  GPT-2: ❌ FAILED");
        assert!(lines[3].contains("1/2 models working"));
    }
}
