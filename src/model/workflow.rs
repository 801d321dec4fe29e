//! Workflow definition

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{Edge, Node, Trigger};

/// Lifecycle status of a workflow definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Draft,
    Active,
    Archived,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Active => write!(f, "active"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

/// A stable workflow definition: a DAG of [`Node`]s and [`Edge`]s plus the
/// default variable context new executions start with.
///
/// `(name, version)` is unique; `version` is a monotonic integer bumped on
/// every smart-merge update (see [`crate::persistence::WorkflowStore`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    pub version: i64,
    pub status: WorkflowStatus,
    /// Default variable context merged under caller-supplied `initialVariables`.
    pub variables: Value,
    pub metadata: Value,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub triggers: Vec<Trigger>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Workflow {
    /// Construct a new draft workflow with a fresh id and version 1.
    pub fn new(name: impl Into<String>, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            version: 1,
            status: WorkflowStatus::Draft,
            variables: Value::Object(Default::default()),
            metadata: Value::Object(Default::default()),
            nodes,
            edges,
            triggers: Vec::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Find a node by its logical (user-facing) id.
    pub fn node_by_logical_id(&self, logical_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.logical_id == logical_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_workflow_is_draft_version_one() {
        let wf = Workflow::new("pipeline", vec![], vec![]);
        assert_eq!(wf.version, 1);
        assert_eq!(wf.status, WorkflowStatus::Draft);
        assert!(wf.deleted_at.is_none());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(WorkflowStatus::Draft.to_string(), "draft");
        assert_eq!(WorkflowStatus::Active.to_string(), "active");
        assert_eq!(WorkflowStatus::Archived.to_string(), "archived");
    }
}
