//! NodeExecution record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Lifecycle phase of a [`NodeExecution`]. See `SPEC_FULL.md` §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeExecutionPhase {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl NodeExecutionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Skipped
        )
    }
}

impl std::fmt::Display for NodeExecutionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// One attempt sequence of a single node within an [`crate::model::Execution`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecution {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub node_id: Uuid,
    pub node_logical_id: String,
    pub phase: NodeExecutionPhase,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub input_data: Value,
    pub output_data: Option<Value>,
    pub error_message: Option<String>,
    pub retry_count: u32,
    /// Topological wave within the execution.
    pub wave: u32,
    /// Set when the node is skipped (e.g. "edge condition false",
    /// "predecessor skipped").
    pub skip_reason: Option<String>,
}

impl NodeExecution {
    pub fn new(execution_id: Uuid, node_id: Uuid, node_logical_id: impl Into<String>, wave: u32, input_data: Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            execution_id,
            node_id,
            node_logical_id: node_logical_id.into(),
            phase: NodeExecutionPhase::Pending,
            started_at: None,
            completed_at: None,
            input_data,
            output_data: None,
            error_message: None,
            retry_count: 0,
            wave,
            skip_reason: None,
        }
    }
}
