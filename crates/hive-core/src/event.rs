use serde::Serialize;

/// Lifecycle notifications emitted while a pipeline runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    PipelineStarted {
        total: usize,
    },
    StepStarted {
        name: String,
        index: usize,
    },
    StepSucceeded {
        name: String,
        duration_ms: u64,
    },
    StepFailed {
        name: String,
        duration_ms: u64,
        error: String,
    },
    StepSkipped {
        name: String,
    },
    PipelineFinished {
        succeeded: usize,
        failed: usize,
        skipped: usize,
    },
}

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<PipelineEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: PipelineEvent) {
        // Nobody listening is fine.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_published_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(PipelineEvent::PipelineStarted { total: 2 });
        bus.publish(PipelineEvent::StepSkipped { name: "b".into() });

        assert_eq!(rx.recv().await.unwrap(), PipelineEvent::PipelineStarted { total: 2 });
        assert_eq!(
            rx.recv().await.unwrap(),
            PipelineEvent::StepSkipped { name: "b".into() }
        );
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.publish(PipelineEvent::PipelineFinished {
            succeeded: 0,
            failed: 0,
            skipped: 0,
        });
    }

    #[test]
    fn events_serialize_with_tag() {
        let json = serde_json::to_value(PipelineEvent::StepFailed {
            name: "a".into(),
            duration_ms: 12,
            error: "boom".into(),
        })
        .unwrap();
        assert_eq!(json["event"], "step_failed");
        assert_eq!(json["duration_ms"], 12);
    }
}
