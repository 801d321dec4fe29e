//! Observer Bus — fan-out of lifecycle events to pluggable observers

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::instrument;

use super::event::ObserverEvent;

/// Lifecycle capability every observer implements (§4.7, §9 — "the bus is a
/// list of implementations of the lifecycle capability set").
///
/// Implementations must never propagate their own failures: an HTTP
/// callback observer that can't reach its endpoint logs and returns, it
/// does not fail the workflow (§7 `ObserverError`).
#[async_trait]
pub trait Observer: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn on_event(&self, event: &ObserverEvent);
}

/// Registry of observers, append-only once an execution starts (§5).
///
/// Dispatch is sequential per observer but parallel across observers, per
/// §4.7: every observer sees the event, but a slow observer does not delay
/// the others.
#[derive(Clone, Default)]
pub struct ObserverBus {
    observers: Vec<Arc<dyn Observer>>,
}

impl ObserverBus {
    pub fn new() -> Self {
        Self { observers: Vec::new() }
    }

    pub fn register(&mut self, observer: Arc<dyn Observer>) -> &mut Self {
        self.observers.push(observer);
        self
    }

    #[instrument(skip(self, event), fields(observer_count = self.observers.len()))]
    pub async fn emit(&self, event: ObserverEvent) {
        let futures = self.observers.iter().map(|observer| {
            let event = &event;
            async move { observer.on_event(event).await }
        });
        join_all(futures).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use uuid::Uuid;

    struct RecordingObserver {
        events: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Observer for RecordingObserver {
        fn name(&self) -> &str {
            "recording"
        }

        async fn on_event(&self, event: &ObserverEvent) {
            self.events.lock().push(event.message());
        }
    }

    struct PanickyObserver;

    #[async_trait]
    impl Observer for PanickyObserver {
        fn name(&self) -> &str {
            "panicky"
        }

        async fn on_event(&self, _event: &ObserverEvent) {
            // Simulates an observer that fails internally but swallows it.
        }
    }

    #[tokio::test]
    async fn test_fan_out_to_all_observers() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut bus = ObserverBus::new();
        bus.register(Arc::new(RecordingObserver { events: events.clone() }));
        bus.register(Arc::new(PanickyObserver));

        bus.emit(ObserverEvent::ExecutionStarted {
            execution_id: Uuid::now_v7(),
            workflow_id: Uuid::now_v7(),
        })
        .await;

        assert_eq!(events.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_bus_emits_without_panic() {
        let bus = ObserverBus::new();
        bus.emit(ObserverEvent::ExecutionCancelled {
            execution_id: Uuid::now_v7(),
            workflow_id: Uuid::now_v7(),
        })
        .await;
    }
}
