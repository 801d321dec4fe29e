//! Execution record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{NodeExecution, Trigger};

/// Lifecycle phase of an [`Execution`]. See `SPEC_FULL.md` §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPhase {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled
        )
    }
}

impl std::fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// One run of a [`crate::model::Workflow`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub workflow_version: i64,
    pub phase: ExecutionPhase,
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub input_data: Value,
    pub output_data: Option<Value>,
    /// Snapshot of the Variable Store taken when the execution reaches a
    /// terminal phase.
    pub variables: Value,
    pub strict_mode: bool,
    /// Set when `phase == Failed`; summarizes the first terminal node
    /// failure, or a synthetic persistence-failure cause.
    pub failure_reason: Option<String>,
    pub node_executions: Vec<NodeExecution>,
}

impl Execution {
    pub fn new(workflow_id: Uuid, workflow_version: i64, trigger: Trigger, input_data: Value, strict_mode: bool) -> Self {
        Self {
            id: Uuid::now_v7(),
            workflow_id,
            workflow_version,
            phase: ExecutionPhase::Running,
            trigger,
            started_at: Utc::now(),
            completed_at: None,
            input_data,
            output_data: None,
            variables: Value::Object(Default::default()),
            strict_mode,
            failure_reason: None,
            node_executions: Vec::new(),
        }
    }
}
