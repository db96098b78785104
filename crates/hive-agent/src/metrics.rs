use std::fmt::Write;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepMetrics {
    pub name: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepMetrics {
    pub fn success(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Success,
            duration_ms: duration.as_millis() as u64,
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, duration: Duration, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Failed,
            duration_ms: duration.as_millis() as u64,
            error: Some(error.into()),
        }
    }

    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Skipped,
            duration_ms: 0,
            error: None,
        }
    }
}

/// Aggregate result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineMetrics {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<StepMetrics>,
}

impl PipelineMetrics {
    pub fn new(
        steps: Vec<StepMetrics>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let count = |status: StepStatus| steps.iter().filter(|s| s.status == status).count();
        let succeeded = count(StepStatus::Success);
        let failed = count(StepStatus::Failed);
        let skipped = count(StepStatus::Skipped);
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        Self {
            total: steps.len(),
            succeeded,
            failed,
            skipped,
            duration_ms,
            started_at,
            finished_at,
            steps,
        }
    }

    /// Every unit ran and succeeded.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    pub fn step(&self, name: &str) -> Option<&StepMetrics> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Human-readable report: totals, then one line per unit.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Pipeline finished in {:.2}s: {} total, {} succeeded, {} failed, {} skipped\n",
            self.duration_ms as f64 / 1000.0,
            self.total,
            self.succeeded,
            self.failed,
            self.skipped
        );
        for step in &self.steps {
            let _ = match step.status {
                StepStatus::Success => {
                    writeln!(out, "  ✔ {} ({} ms)", step.name, step.duration_ms)
                }
                StepStatus::Failed => writeln!(
                    out,
                    "  ✖ {} ({} ms): {}",
                    step.name,
                    step.duration_ms,
                    step.error.as_deref().unwrap_or("unknown error")
                ),
                StepStatus::Skipped => writeln!(out, "  ↷ {} (skipped)", step.name),
            };
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PipelineMetrics {
        let start = Utc::now();
        let end = start + chrono::Duration::milliseconds(1500);
        PipelineMetrics::new(
            vec![
                StepMetrics::success("collect", Duration::from_millis(900)),
                StepMetrics::failed("analyze", Duration::from_millis(600), "HTTP 500"),
                StepMetrics::skipped("report"),
            ],
            start,
            end,
        )
    }

    #[test]
    fn counts_add_up() {
        let m = sample();
        assert_eq!(m.total, 3);
        assert_eq!(m.succeeded + m.failed + m.skipped, m.total);
        assert_eq!(m.duration_ms, 1500);
        assert!(!m.is_success());
        assert_eq!(m.step("report").unwrap().duration_ms, 0);
    }

    #[test]
    fn summary_lists_every_step() {
        let text = sample().summary();
        assert!(text.starts_with(
            "Pipeline finished in 1.50s: 3 total, 1 succeeded, 1 failed, 1 skipped"
        ));
        assert!(text.contains("✔ collect (900 ms)"));
        assert!(text.contains("✖ analyze (600 ms): HTTP 500"));
        assert!(text.contains("↷ report (skipped)"));
    }

    #[test]
    fn serializes_with_millisecond_durations() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["steps"][0]["status"], "success");
        assert_eq!(json["steps"][1]["error"], "HTTP 500");
        assert!(json["steps"][2].get("error").is_none());
        assert_eq!(json["duration_ms"], 1500);
    }
}
