//! In-memory trace recorder observer

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use super::bus::Observer;
use super::event::{EventEnvelope, ObserverEvent};

/// Records every event envelope, grouped by execution, for later retrieval
/// (§4.7 — "a trace recorder"). Unbounded for now; a long-lived process
/// hosting this engine is expected to drain executions via [`Self::take`]
/// once they complete.
#[derive(Clone, Default)]
pub struct InMemoryTraceObserver {
    traces: Arc<Mutex<HashMap<Uuid, Vec<EventEnvelope>>>>,
}

impl InMemoryTraceObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded envelopes for `execution_id`, in
    /// emission order.
    pub fn trace_for(&self, execution_id: Uuid) -> Vec<EventEnvelope> {
        self.traces.lock().get(&execution_id).cloned().unwrap_or_default()
    }

    /// Removes and returns the recorded envelopes for `execution_id`.
    pub fn take(&self, execution_id: Uuid) -> Vec<EventEnvelope> {
        self.traces.lock().remove(&execution_id).unwrap_or_default()
    }
}

#[async_trait]
impl Observer for InMemoryTraceObserver {
    fn name(&self) -> &str {
        "trace"
    }

    async fn on_event(&self, event: &ObserverEvent) {
        let envelope = event.envelope();
        let Some(execution_id) = envelope.execution_id else {
            return;
        };
        self.traces.lock().entry(execution_id).or_default().push(envelope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_events_for_execution() {
        let observer = InMemoryTraceObserver::new();
        let execution_id = Uuid::now_v7();
        let workflow_id = Uuid::now_v7();

        observer
            .on_event(&ObserverEvent::ExecutionStarted { execution_id, workflow_id })
            .await;
        observer
            .on_event(&ObserverEvent::ExecutionCompleted {
                execution_id,
                workflow_id,
                duration_ms: 42,
            })
            .await;

        let trace = observer.trace_for(execution_id);
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[1].duration_ms, Some(42));
    }

    #[tokio::test]
    async fn test_take_drains_the_trace() {
        let observer = InMemoryTraceObserver::new();
        let execution_id = Uuid::now_v7();
        observer
            .on_event(&ObserverEvent::ExecutionCancelled { execution_id, workflow_id: Uuid::now_v7() })
            .await;

        assert_eq!(observer.take(execution_id).len(), 1);
        assert!(observer.trace_for(execution_id).is_empty());
    }
}
