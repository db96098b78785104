use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{error, info, warn};

use hive_core::{EventBus, PipelineEvent, StepRunner};
use hive_memory::SharedStateStore;

use crate::metrics::{PipelineMetrics, StepMetrics};
use crate::resolver::ExecutionPlan;

/// Drives a plan to completion, one unit at a time.
///
/// After a unit with `on_error: stop` fails, every later unit that is not
/// `on_error: continue` is skipped for the rest of the run.
pub struct PipelineExecutor {
    runner: Arc<dyn StepRunner>,
    events: EventBus,
}

impl PipelineExecutor {
    pub fn new(runner: Arc<dyn StepRunner>) -> Self {
        Self {
            runner,
            events: EventBus::default(),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn execute(
        &self,
        plan: &ExecutionPlan,
        state: &mut SharedStateStore,
    ) -> PipelineMetrics {
        let started_at = Utc::now();
        let mut steps = Vec::with_capacity(plan.len());
        let mut halted = false;

        info!(total = plan.len(), "Starting pipeline");
        self.events.publish(PipelineEvent::PipelineStarted { total: plan.len() });

        for (index, agent) in plan.iter().enumerate() {
            if halted && !agent.continues_on_error() {
                info!(agent = %agent.name, "Skipping agent after earlier failure");
                self.events.publish(PipelineEvent::StepSkipped {
                    name: agent.name.clone(),
                });
                steps.push(StepMetrics::skipped(&agent.name));
                continue;
            }

            info!(agent = %agent.name, index, "Running agent");
            self.events.publish(PipelineEvent::StepStarted {
                name: agent.name.clone(),
                index,
            });

            let start = Instant::now();
            let run = self.runner.run(agent, &*state).await;
            let outcome = run.and_then(|result| state.set(agent.name.clone(), result));
            let elapsed = start.elapsed();

            match outcome {
                Ok(()) => {
                    let step = StepMetrics::success(&agent.name, elapsed);
                    info!(agent = %agent.name, duration_ms = step.duration_ms, "Agent succeeded");
                    self.events.publish(PipelineEvent::StepSucceeded {
                        name: agent.name.clone(),
                        duration_ms: step.duration_ms,
                    });
                    steps.push(step);
                }
                Err(e) => {
                    let step = StepMetrics::failed(&agent.name, elapsed, e.to_string());
                    error!(agent = %agent.name, error = %e, "Agent failed");
                    self.events.publish(PipelineEvent::StepFailed {
                        name: agent.name.clone(),
                        duration_ms: step.duration_ms,
                        error: e.to_string(),
                    });
                    steps.push(step);

                    if !agent.continues_on_error() && !halted {
                        warn!(agent = %agent.name, "Halting remaining agents");
                        halted = true;
                    }
                }
            }
        }

        let metrics = PipelineMetrics::new(steps, started_at, Utc::now());
        info!(
            succeeded = metrics.succeeded,
            failed = metrics.failed,
            skipped = metrics.skipped,
            duration_ms = metrics.duration_ms,
            "Pipeline finished"
        );
        self.events.publish(PipelineEvent::PipelineFinished {
            succeeded: metrics.succeeded,
            failed: metrics.failed,
            skipped: metrics.skipped,
        });
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::StepStatus;
    use crate::resolver::resolve;
    use hive_core::OnError;
    use hive_test_utils::{agent, agent_with_policy, RecordingRunner};
    use serde_json::json;

    fn store(dir: &tempfile::TempDir) -> SharedStateStore {
        SharedStateStore::open(dir.path().join("cache.json"))
    }

    fn status(m: &PipelineMetrics, name: &str) -> StepStatus {
        m.step(name).unwrap().status
    }

    #[tokio::test]
    async fn all_steps_succeed_and_results_are_stored() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = store(&dir);
        let runner = Arc::new(RecordingRunner::new());
        let plan = resolve(&[agent("b", &["a"]), agent("a", &[])]).unwrap();

        let metrics = PipelineExecutor::new(runner.clone())
            .execute(&plan, &mut state)
            .await;

        assert!(metrics.is_success());
        assert_eq!(runner.invoked(), vec!["a", "b"]);
        assert_eq!(state.get("a"), Some(&json!({"content": "a done", "toolCalls": []})));
        // b saw a's stored result
        let calls = runner.calls();
        assert_eq!(calls[1].dependency_results[0].0, "a");

        let reopened = SharedStateStore::open(dir.path().join("cache.json"));
        assert!(reopened.contains("b"));
    }

    #[tokio::test]
    async fn stop_failure_skips_dependents_without_running_them() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = store(&dir);
        let runner = Arc::new(RecordingRunner::new().fail("a"));
        let plan = resolve(&[agent("a", &[]), agent("b", &["a"]), agent("c", &["a"])]).unwrap();

        let metrics = PipelineExecutor::new(runner.clone())
            .execute(&plan, &mut state)
            .await;

        assert_eq!(status(&metrics, "a"), StepStatus::Failed);
        assert_eq!(status(&metrics, "b"), StepStatus::Skipped);
        assert_eq!(status(&metrics, "c"), StepStatus::Skipped);
        assert_eq!(metrics.step("b").unwrap().duration_ms, 0);
        assert_eq!(runner.invoked(), vec!["a"]);
        assert!(!state.contains("a"));
    }

    #[tokio::test]
    async fn skip_is_sticky_for_unrelated_units() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = store(&dir);
        let runner = Arc::new(RecordingRunner::new().fail("a"));
        let plan = resolve(&[
            agent("a", &[]),
            agent("independent", &[]),
            agent_with_policy("resilient", &[], OnError::Continue),
            agent("later", &[]),
        ])
        .unwrap();

        let metrics = PipelineExecutor::new(runner.clone())
            .execute(&plan, &mut state)
            .await;

        assert_eq!(status(&metrics, "independent"), StepStatus::Skipped);
        assert_eq!(status(&metrics, "resilient"), StepStatus::Success);
        assert_eq!(status(&metrics, "later"), StepStatus::Skipped);
        assert_eq!(runner.invoked(), vec!["a", "resilient"]);
    }

    #[tokio::test]
    async fn continue_failure_does_not_halt() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = store(&dir);
        let runner = Arc::new(RecordingRunner::new().fail("a"));
        let plan = resolve(&[
            agent_with_policy("a", &[], OnError::Continue),
            agent("b", &[]),
        ])
        .unwrap();

        let metrics = PipelineExecutor::new(runner.clone())
            .execute(&plan, &mut state)
            .await;

        assert_eq!(status(&metrics, "a"), StepStatus::Failed);
        assert_eq!(status(&metrics, "b"), StepStatus::Success);
        assert_eq!(metrics.succeeded + metrics.failed + metrics.skipped, metrics.total);
        assert_eq!(runner.invoked(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn dependent_of_continue_failure_runs_without_its_result() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = store(&dir);
        let runner = Arc::new(RecordingRunner::new().fail("a"));
        let plan = resolve(&[
            agent_with_policy("a", &[], OnError::Continue),
            agent("b", &["a"]),
        ])
        .unwrap();

        PipelineExecutor::new(runner.clone())
            .execute(&plan, &mut state)
            .await;

        let calls = runner.calls();
        assert_eq!(calls[1].agent, "b");
        assert!(calls[1].dependency_results.is_empty());
    }

    #[tokio::test]
    async fn unsaved_result_is_not_handed_to_dependents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::create_dir(&path).unwrap();
        let mut state = SharedStateStore::open(&path);
        let runner = Arc::new(RecordingRunner::new());
        let plan = resolve(&[
            agent_with_policy("a", &[], OnError::Continue),
            agent("b", &["a"]),
        ])
        .unwrap();

        let metrics = PipelineExecutor::new(runner.clone())
            .execute(&plan, &mut state)
            .await;

        assert_eq!(status(&metrics, "a"), StepStatus::Failed);
        assert!(metrics
            .step("a")
            .unwrap()
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("Shared state error")));
        assert!(!state.contains("a"));
        let calls = runner.calls();
        assert_eq!(calls[1].agent, "b");
        assert!(calls[1].dependency_results.is_empty());
    }

    #[tokio::test]
    async fn failure_message_is_captured() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = store(&dir);
        let runner = Arc::new(RecordingRunner::new().fail("a"));
        let plan = resolve(&[agent("a", &[])]).unwrap();

        let metrics = PipelineExecutor::new(runner).execute(&plan, &mut state).await;
        assert_eq!(
            metrics.step("a").unwrap().error.as_deref(),
            Some("LLM request failed: scripted failure for a")
        );
    }

    #[tokio::test]
    async fn publishes_lifecycle_events() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = store(&dir);
        let runner = Arc::new(RecordingRunner::new().fail("a"));
        let plan = resolve(&[agent("a", &[]), agent("b", &[])]).unwrap();
        let executor = PipelineExecutor::new(runner);
        let mut rx = executor.events().subscribe();

        executor.execute(&plan, &mut state).await;

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events.first(), Some(&PipelineEvent::PipelineStarted { total: 2 }));
        assert!(events.contains(&PipelineEvent::StepSkipped { name: "b".into() }));
        assert_eq!(
            events.last(),
            Some(&PipelineEvent::PipelineFinished {
                succeeded: 0,
                failed: 1,
                skipped: 1
            })
        );
    }

    #[tokio::test]
    async fn empty_plan_yields_empty_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = store(&dir);
        let plan = resolve(&[]).unwrap();
        let metrics = PipelineExecutor::new(Arc::new(RecordingRunner::new()))
            .execute(&plan, &mut state)
            .await;
        assert_eq!(metrics.total, 0);
        assert!(metrics.is_success());
    }
}
