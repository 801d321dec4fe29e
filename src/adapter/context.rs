//! Node execution context passed to adapters

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

/// Handle to request cancellation of a running adapter invocation.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Context given to a [`super::NodeAdapter`] for one attempt of one node
/// within one execution. Carries everything the adapter needs without
/// giving it write access to the engine's state (§6).
#[derive(Debug, Clone)]
pub struct NodeExecutionContext {
    pub execution_id: Uuid,
    pub node_id: Uuid,
    pub node_logical_id: String,
    /// 1-based attempt number, including the first try.
    pub attempt: u32,
    pub max_attempts: u32,
    /// Read-only snapshot of the Variable Store at invocation time.
    pub variables: Value,
    /// Opaque credential handle resolved by the host application; the
    /// engine never interprets its contents.
    pub credential: Option<Value>,
    cancelled: Arc<AtomicBool>,
}

impl NodeExecutionContext {
    pub fn new(
        execution_id: Uuid,
        node_id: Uuid,
        node_logical_id: impl Into<String>,
        attempt: u32,
        max_attempts: u32,
        variables: Value,
    ) -> Self {
        Self {
            execution_id,
            node_id,
            node_logical_id: node_logical_id.into(),
            attempt,
            max_attempts,
            variables,
            credential: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_credential(mut self, credential: Value) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn cancellation_handle(&self) -> CancellationHandle {
        CancellationHandle {
            cancelled: self.cancelled.clone(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn is_last_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}
