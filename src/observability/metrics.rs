//! Metrics collector observer

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::bus::Observer;
use super::event::ObserverEvent;

/// A point-in-time read of the counters a [`MetricsObserver`] accumulates.
/// This is the `Metrics()` snapshot of §6.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MetricsSnapshot {
    pub executions_started: u64,
    pub executions_completed: u64,
    pub executions_failed: u64,
    pub executions_cancelled: u64,
    pub nodes_started: u64,
    pub nodes_completed: u64,
    pub nodes_failed: u64,
    pub nodes_retried: u64,
    pub nodes_skipped: u64,
    pub avg_node_duration_ms: Option<f64>,
    pub avg_execution_duration_ms: Option<f64>,
}

/// Counts, durations, and success rates across all executions observed by
/// this engine instance (§4.7). Token usage accounting is left to the
/// per-kind adapter (e.g. an `llm` adapter records it in its own output);
/// this collector only tracks what every node kind has in common.
#[derive(Default)]
pub struct MetricsObserver {
    executions_started: AtomicU64,
    executions_completed: AtomicU64,
    executions_failed: AtomicU64,
    executions_cancelled: AtomicU64,
    nodes_started: AtomicU64,
    nodes_completed: AtomicU64,
    nodes_failed: AtomicU64,
    nodes_retried: AtomicU64,
    nodes_skipped: AtomicU64,
    node_durations_ms: Mutex<Vec<u64>>,
    execution_durations_ms: Mutex<Vec<u64>>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            executions_started: self.executions_started.load(Ordering::Relaxed),
            executions_completed: self.executions_completed.load(Ordering::Relaxed),
            executions_failed: self.executions_failed.load(Ordering::Relaxed),
            executions_cancelled: self.executions_cancelled.load(Ordering::Relaxed),
            nodes_started: self.nodes_started.load(Ordering::Relaxed),
            nodes_completed: self.nodes_completed.load(Ordering::Relaxed),
            nodes_failed: self.nodes_failed.load(Ordering::Relaxed),
            nodes_retried: self.nodes_retried.load(Ordering::Relaxed),
            nodes_skipped: self.nodes_skipped.load(Ordering::Relaxed),
            avg_node_duration_ms: average(&self.node_durations_ms.lock()),
            avg_execution_duration_ms: average(&self.execution_durations_ms.lock()),
        }
    }
}

fn average(samples: &[u64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<u64>() as f64 / samples.len() as f64)
}

#[async_trait]
impl Observer for MetricsObserver {
    fn name(&self) -> &str {
        "metrics"
    }

    async fn on_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::ExecutionStarted { .. } => {
                self.executions_started.fetch_add(1, Ordering::Relaxed);
            }
            ObserverEvent::ExecutionCompleted { duration_ms, .. } => {
                self.executions_completed.fetch_add(1, Ordering::Relaxed);
                self.execution_durations_ms.lock().push(*duration_ms);
            }
            ObserverEvent::ExecutionFailed { duration_ms, .. } => {
                self.executions_failed.fetch_add(1, Ordering::Relaxed);
                self.execution_durations_ms.lock().push(*duration_ms);
            }
            ObserverEvent::ExecutionCancelled { .. } => {
                self.executions_cancelled.fetch_add(1, Ordering::Relaxed);
            }
            ObserverEvent::NodeStarted { .. } => {
                self.nodes_started.fetch_add(1, Ordering::Relaxed);
            }
            ObserverEvent::NodeCompleted { duration_ms, .. } => {
                self.nodes_completed.fetch_add(1, Ordering::Relaxed);
                self.node_durations_ms.lock().push(*duration_ms);
            }
            ObserverEvent::NodeFailed { .. } => {
                self.nodes_failed.fetch_add(1, Ordering::Relaxed);
            }
            ObserverEvent::NodeRetrying { .. } => {
                self.nodes_retried.fetch_add(1, Ordering::Relaxed);
            }
            ObserverEvent::NodeSkipped { .. } => {
                self.nodes_skipped.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }
}
