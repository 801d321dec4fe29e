//! Persistence trait definitions
//!
//! Grounded on the teacher's `WorkflowEventStore` (method-grouping-by-concern,
//! `StoreError` variant-per-failure-mode, `Pagination` default-limit-100
//! convention). Split into four traits — `WorkflowStore`, `ExecutionStore`,
//! `NodeExecutionStore`, `EventStore` — matching the four concerns §6's
//! persistence contract lists separately, rather than the teacher's single
//! monolithic trait.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::model::{
    Execution, ExecutionEvent, ExecutionPhase, NodeExecution, NodeExecutionPhase, Workflow,
    WorkflowStatus,
};

/// `PersistenceError` (§7): a storage operation failed, or the caller asked
/// for something that does not exist.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("workflow not found: {0}")]
    WorkflowNotFound(Uuid),

    #[error("workflow '{name}' version {version} not found")]
    WorkflowVersionNotFound { name: String, version: i64 },

    #[error("execution not found: {0}")]
    ExecutionNotFound(Uuid),

    #[error("node execution not found: {0}")]
    NodeExecutionNotFound(Uuid),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Pagination parameters for list operations. Mirrors the teacher's
/// `Pagination` (`offset`/`limit`, default limit 100).
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub offset: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { offset: 0, limit: 100 }
    }
}

impl Pagination {
    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .cloned()
            .collect()
    }
}

/// Filter for [`ExecutionStore::list_executions`].
#[derive(Debug, Clone, Default)]
pub struct ExecutionFilter {
    pub workflow_id: Option<Uuid>,
    pub phase: Option<ExecutionPhase>,
}

/// Result of [`ExecutionStore::statistics`] (§4.9).
#[derive(Debug, Clone, Default, Serialize)]
pub struct Statistics {
    pub counts_by_phase: HashMap<ExecutionPhase, u64>,
    /// `None` when no execution in the window reached `completed`.
    pub average_duration_secs: Option<f64>,
    /// Fraction of terminal (completed + failed) executions that completed.
    /// `0.0` when there are no terminal executions in the window.
    pub success_rate: f64,
    pub failure_rate: f64,
}

/// CRUD + smart-merge for [`Workflow`] definitions (§6, §4.9).
#[async_trait]
pub trait WorkflowStore: Send + Sync + 'static {
    async fn create_workflow(&self, workflow: Workflow) -> Result<Workflow, StoreError>;

    async fn get_workflow(&self, id: Uuid) -> Result<Workflow, StoreError>;

    async fn find_workflow_by_name_version(&self, name: &str, version: i64) -> Result<Workflow, StoreError>;

    /// Smart-merge update: incoming nodes/edges are matched to existing ones
    /// by logical id. Present → keep internal id, update mutable fields. New
    /// → insert with a fresh internal id. Missing from the incoming set →
    /// delete, cascading to that node's [`NodeExecution`]s. Bumps `version`.
    async fn update_workflow(&self, workflow: Workflow) -> Result<Workflow, StoreError>;

    /// Cascades to the workflow's nodes, edges, and executions (and, via
    /// execution deletion, their node executions).
    async fn delete_workflow(&self, id: Uuid) -> Result<(), StoreError>;

    async fn list_workflows(
        &self,
        status: Option<WorkflowStatus>,
        pagination: Pagination,
    ) -> Result<Vec<Workflow>, StoreError>;
}

/// CRUD + queries for [`Execution`] records (§6, §4.9).
#[async_trait]
pub trait ExecutionStore: Send + Sync + 'static {
    async fn create_execution(&self, execution: Execution) -> Result<Execution, StoreError>;

    async fn update_execution(&self, execution: Execution) -> Result<Execution, StoreError>;

    /// Cascades to the execution's [`NodeExecution`]s.
    async fn delete_execution(&self, id: Uuid) -> Result<(), StoreError>;

    async fn get_execution(&self, id: Uuid, with_node_executions: bool) -> Result<Execution, StoreError>;

    async fn list_executions(
        &self,
        filter: ExecutionFilter,
        pagination: Pagination,
    ) -> Result<Vec<Execution>, StoreError>;

    async fn find_running(&self) -> Result<Vec<Execution>, StoreError>;

    async fn count_executions(&self, workflow_id: Option<Uuid>, phase: Option<ExecutionPhase>) -> Result<u64, StoreError>;

    async fn statistics(
        &self,
        workflow_id: Option<Uuid>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Statistics, StoreError>;
}

/// CRUD + queries for [`NodeExecution`] records (§6).
#[async_trait]
pub trait NodeExecutionStore: Send + Sync + 'static {
    async fn create_node_execution(&self, node_execution: NodeExecution) -> Result<NodeExecution, StoreError>;

    async fn update_node_execution(&self, node_execution: NodeExecution) -> Result<NodeExecution, StoreError>;

    async fn delete_node_execution(&self, id: Uuid) -> Result<(), StoreError>;

    async fn get_node_execution(&self, id: Uuid) -> Result<NodeExecution, StoreError>;

    /// Ordered by wave ascending, then `started_at` (or insertion order for
    /// not-yet-started node executions) ascending.
    async fn find_for_execution(&self, execution_id: Uuid) -> Result<Vec<NodeExecution>, StoreError>;

    async fn find_for_execution_and_wave(&self, execution_id: Uuid, wave: u32) -> Result<Vec<NodeExecution>, StoreError>;

    async fn find_for_execution_and_status(
        &self,
        execution_id: Uuid,
        phase: NodeExecutionPhase,
    ) -> Result<Vec<NodeExecution>, StoreError>;
}

/// Append-only per-execution event log with monotonic sequence numbers
/// assigned at append time (§4.8).
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    async fn append(&self, execution_id: Uuid, event_type: &str, payload: Value) -> Result<ExecutionEvent, StoreError>;

    /// Returns events in sequence order.
    async fn load(&self, execution_id: Uuid) -> Result<Vec<ExecutionEvent>, StoreError>;
}
