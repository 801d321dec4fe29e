//! Lifecycle event types and their wire envelope
//!
//! Grounded on the teacher's tagged-enum `WorkflowEvent` (`workflow/event.rs`)
//! for the typed-variant shape, and `everruns-core`'s `Event`/`EventData`
//! pair (`core/src/events.rs`) for the idea of a single serializable
//! envelope distinct from the typed in-process event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Severity carried by every [`ObserverEvent`], mirrored into the envelope's
/// `level` field (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

/// A lifecycle event emitted by the Scheduler onto the Observer Bus (§4.7).
///
/// A closed tagged-variant representation, following the teacher's
/// `WorkflowEvent` convention, generalized from workflow-replay events to
/// the node/execution lifecycle this engine defines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObserverEvent {
    ExecutionStarted {
        execution_id: Uuid,
        workflow_id: Uuid,
    },
    ExecutionCompleted {
        execution_id: Uuid,
        workflow_id: Uuid,
        duration_ms: u64,
    },
    ExecutionFailed {
        execution_id: Uuid,
        workflow_id: Uuid,
        error_message: String,
        duration_ms: u64,
    },
    ExecutionCancelled {
        execution_id: Uuid,
        workflow_id: Uuid,
    },
    NodeStarted {
        execution_id: Uuid,
        workflow_id: Uuid,
        node_id: Uuid,
        node_type: String,
        node_name: String,
        config: Value,
        attempt_number: u32,
    },
    NodeCompleted {
        execution_id: Uuid,
        workflow_id: Uuid,
        node_id: Uuid,
        node_type: String,
        node_name: String,
        output: Value,
        duration_ms: u64,
    },
    NodeFailed {
        execution_id: Uuid,
        workflow_id: Uuid,
        node_id: Uuid,
        node_type: String,
        node_name: String,
        error_message: String,
        will_retry: bool,
    },
    NodeRetrying {
        execution_id: Uuid,
        workflow_id: Uuid,
        node_id: Uuid,
        node_type: String,
        node_name: String,
        attempt_number: u32,
        retry_delay_ms: u64,
    },
    NodeSkipped {
        execution_id: Uuid,
        workflow_id: Uuid,
        node_id: Uuid,
        node_type: String,
        node_name: String,
        reason: String,
    },
    VariableSet {
        execution_id: Uuid,
        workflow_id: Uuid,
        variable_key: String,
        variable_value: Value,
    },
    NodeCallbackStarted {
        execution_id: Uuid,
        node_id: Uuid,
    },
    NodeCallbackCompleted {
        execution_id: Uuid,
        node_id: Uuid,
        error_message: Option<String>,
    },
}

impl ObserverEvent {
    pub fn level(&self) -> Level {
        match self {
            Self::ExecutionFailed { .. } | Self::NodeFailed { .. } => Level::Error,
            Self::NodeRetrying { .. } | Self::NodeSkipped { .. } | Self::ExecutionCancelled { .. } => Level::Warning,
            Self::NodeCallbackCompleted { error_message: Some(_), .. } => Level::Warning,
            _ => Level::Info,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::ExecutionStarted { execution_id, .. } => format!("execution {execution_id} started"),
            Self::ExecutionCompleted { execution_id, .. } => format!("execution {execution_id} completed"),
            Self::ExecutionFailed { execution_id, error_message, .. } => {
                format!("execution {execution_id} failed: {error_message}")
            }
            Self::ExecutionCancelled { execution_id, .. } => format!("execution {execution_id} cancelled"),
            Self::NodeStarted { node_name, attempt_number, .. } => {
                format!("node '{node_name}' started (attempt {attempt_number})")
            }
            Self::NodeCompleted { node_name, .. } => format!("node '{node_name}' completed"),
            Self::NodeFailed { node_name, error_message, .. } => {
                format!("node '{node_name}' failed: {error_message}")
            }
            Self::NodeRetrying { node_name, attempt_number, retry_delay_ms, .. } => {
                format!("node '{node_name}' retrying (attempt {attempt_number}, delay {retry_delay_ms}ms)")
            }
            Self::NodeSkipped { node_name, reason, .. } => format!("node '{node_name}' skipped: {reason}"),
            Self::VariableSet { variable_key, .. } => format!("variable '{variable_key}' set"),
            Self::NodeCallbackStarted { node_id, .. } => format!("callback started for node {node_id}"),
            Self::NodeCallbackCompleted { node_id, error_message: None, .. } => {
                format!("callback completed for node {node_id}")
            }
            Self::NodeCallbackCompleted { node_id, error_message: Some(err), .. } => {
                format!("callback failed for node {node_id}: {err}")
            }
        }
    }

    /// Convert to the wire envelope used by the HTTP callback observer and
    /// serialized traces (§6).
    pub fn envelope(&self) -> EventEnvelope {
        let event_type = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.get("type").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());

        let mut envelope = EventEnvelope {
            timestamp: Utc::now(),
            event_type,
            level: self.level(),
            message: self.message(),
            execution_id: None,
            workflow_id: None,
            node_id: None,
            node_type: None,
            node_name: None,
            config: None,
            duration_ms: None,
            attempt_number: None,
            will_retry: None,
            retry_delay_ms: None,
            error_message: None,
            from_state: None,
            to_state: None,
            variable_key: None,
            variable_value: None,
            output: None,
            reason: None,
        };

        match self.clone() {
            Self::ExecutionStarted { execution_id, workflow_id } => {
                envelope.execution_id = Some(execution_id);
                envelope.workflow_id = Some(workflow_id);
            }
            Self::ExecutionCompleted { execution_id, workflow_id, duration_ms } => {
                envelope.execution_id = Some(execution_id);
                envelope.workflow_id = Some(workflow_id);
                envelope.duration_ms = Some(duration_ms);
            }
            Self::ExecutionFailed { execution_id, workflow_id, error_message, duration_ms } => {
                envelope.execution_id = Some(execution_id);
                envelope.workflow_id = Some(workflow_id);
                envelope.error_message = Some(error_message);
                envelope.duration_ms = Some(duration_ms);
            }
            Self::ExecutionCancelled { execution_id, workflow_id } => {
                envelope.execution_id = Some(execution_id);
                envelope.workflow_id = Some(workflow_id);
            }
            Self::NodeStarted { execution_id, workflow_id, node_id, node_type, node_name, config, attempt_number } => {
                envelope.execution_id = Some(execution_id);
                envelope.workflow_id = Some(workflow_id);
                envelope.node_id = Some(node_id);
                envelope.node_type = Some(node_type);
                envelope.node_name = Some(node_name);
                envelope.config = Some(config);
                envelope.attempt_number = Some(attempt_number);
            }
            Self::NodeCompleted { execution_id, workflow_id, node_id, node_type, node_name, output, duration_ms } => {
                envelope.execution_id = Some(execution_id);
                envelope.workflow_id = Some(workflow_id);
                envelope.node_id = Some(node_id);
                envelope.node_type = Some(node_type);
                envelope.node_name = Some(node_name);
                envelope.output = Some(output);
                envelope.duration_ms = Some(duration_ms);
            }
            Self::NodeFailed { execution_id, workflow_id, node_id, node_type, node_name, error_message, will_retry } => {
                envelope.execution_id = Some(execution_id);
                envelope.workflow_id = Some(workflow_id);
                envelope.node_id = Some(node_id);
                envelope.node_type = Some(node_type);
                envelope.node_name = Some(node_name);
                envelope.error_message = Some(error_message);
                envelope.will_retry = Some(will_retry);
            }
            Self::NodeRetrying { execution_id, workflow_id, node_id, node_type, node_name, attempt_number, retry_delay_ms } => {
                envelope.execution_id = Some(execution_id);
                envelope.workflow_id = Some(workflow_id);
                envelope.node_id = Some(node_id);
                envelope.node_type = Some(node_type);
                envelope.node_name = Some(node_name);
                envelope.attempt_number = Some(attempt_number);
                envelope.retry_delay_ms = Some(retry_delay_ms);
            }
            Self::NodeSkipped { execution_id, workflow_id, node_id, node_type, node_name, reason } => {
                envelope.execution_id = Some(execution_id);
                envelope.workflow_id = Some(workflow_id);
                envelope.node_id = Some(node_id);
                envelope.node_type = Some(node_type);
                envelope.node_name = Some(node_name);
                envelope.reason = Some(reason);
            }
            Self::VariableSet { execution_id, workflow_id, variable_key, variable_value } => {
                envelope.execution_id = Some(execution_id);
                envelope.workflow_id = Some(workflow_id);
                envelope.variable_key = Some(variable_key);
                envelope.variable_value = Some(variable_value);
            }
            Self::NodeCallbackStarted { execution_id, node_id } => {
                envelope.execution_id = Some(execution_id);
                envelope.node_id = Some(node_id);
            }
            Self::NodeCallbackCompleted { execution_id, node_id, error_message } => {
                envelope.execution_id = Some(execution_id);
                envelope.node_id = Some(node_id);
                envelope.error_message = error_message;
            }
        }

        // from_state/to_state are intentionally left for a future state-
        // transition event kind; no current variant carries them.
        envelope
    }
}

/// Wire format for the HTTP callback observer and serialized traces (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub level: Level,
    pub message: String,
    pub execution_id: Option<Uuid>,
    pub workflow_id: Option<Uuid>,
    pub node_id: Option<Uuid>,
    pub node_type: Option<String>,
    pub node_name: Option<String>,
    pub config: Option<Value>,
    pub duration_ms: Option<u64>,
    pub attempt_number: Option<u32>,
    pub will_retry: Option<bool>,
    pub retry_delay_ms: Option<u64>,
    pub error_message: Option<String>,
    pub from_state: Option<String>,
    pub to_state: Option<String>,
    pub variable_key: Option<String>,
    pub variable_value: Option<Value>,
    pub output: Option<Value>,
    pub reason: Option<String>,
}
