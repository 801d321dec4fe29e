//! In-memory implementation of the persistence traits
//!
//! Grounded on the teacher's `InMemoryWorkflowEventStore`: a
//! `parking_lot::RwLock<HashMap<...>>` per entity kind, guarded the same way.
//! Smart-merge (`update_workflow`) has no teacher precedent — designed fresh
//! against the algorithm SPEC_FULL.md §4.9 spells out.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use super::store::{
    EventStore, ExecutionFilter, ExecutionStore, NodeExecutionStore, Pagination, Statistics,
    StoreError, WorkflowStore,
};
use crate::model::{
    Execution, ExecutionEvent, ExecutionPhase, NodeExecution, NodeExecutionPhase, Workflow,
    WorkflowStatus,
};

/// In-memory backing store for all four persistence traits. Intended for
/// tests and for single-process deployments that don't need durability
/// across restarts; the trait boundary lets a SQL-backed store replace this
/// without touching the Scheduler (§6).
#[derive(Default)]
pub struct InMemoryStore {
    workflows: RwLock<HashMap<Uuid, Workflow>>,
    executions: RwLock<HashMap<Uuid, Execution>>,
    node_executions: RwLock<HashMap<Uuid, NodeExecution>>,
    events: RwLock<HashMap<Uuid, Vec<ExecutionEvent>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn node_executions_for(&self, execution_id: Uuid) -> Vec<NodeExecution> {
        self.node_executions
            .read()
            .values()
            .filter(|ne| ne.execution_id == execution_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryStore {
    async fn create_workflow(&self, workflow: Workflow) -> Result<Workflow, StoreError> {
        self.workflows.write().insert(workflow.id, workflow.clone());
        Ok(workflow)
    }

    async fn get_workflow(&self, id: Uuid) -> Result<Workflow, StoreError> {
        self.workflows
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::WorkflowNotFound(id))
    }

    async fn find_workflow_by_name_version(&self, name: &str, version: i64) -> Result<Workflow, StoreError> {
        self.workflows
            .read()
            .values()
            .find(|w| w.name == name && w.version == version)
            .cloned()
            .ok_or_else(|| StoreError::WorkflowVersionNotFound { name: name.to_string(), version })
    }

    async fn update_workflow(&self, mut incoming: Workflow) -> Result<Workflow, StoreError> {
        let mut workflows = self.workflows.write();
        let existing = workflows.get(&incoming.id).cloned().ok_or(StoreError::WorkflowNotFound(incoming.id))?;

        let incoming_node_ids: HashSet<&str> = incoming.nodes.iter().map(|n| n.logical_id.as_str()).collect();
        let incoming_edge_ids: HashSet<&str> = incoming.edges.iter().map(|e| e.logical_id.as_str()).collect();

        let removed_node_internal_ids: Vec<Uuid> = existing
            .nodes
            .iter()
            .filter(|n| !incoming_node_ids.contains(n.logical_id.as_str()))
            .map(|n| n.id)
            .collect();

        for node in &mut incoming.nodes {
            if let Some(existing_node) = existing.nodes.iter().find(|n| n.logical_id == node.logical_id) {
                node.id = existing_node.id;
            }
        }
        for edge in &mut incoming.edges {
            if let Some(existing_edge) = existing.edges.iter().find(|e| e.logical_id == edge.logical_id) {
                edge.id = existing_edge.id;
            }
        }
        let _ = incoming_edge_ids; // edges carry no cascading children of their own

        incoming.version = existing.version + 1;
        incoming.created_at = existing.created_at;
        incoming.updated_at = Utc::now();

        workflows.insert(incoming.id, incoming.clone());
        drop(workflows);

        if !removed_node_internal_ids.is_empty() {
            self.node_executions.write().retain(|_, ne| !removed_node_internal_ids.contains(&ne.node_id));
        }

        Ok(incoming)
    }

    async fn delete_workflow(&self, id: Uuid) -> Result<(), StoreError> {
        self.workflows.write().remove(&id).ok_or(StoreError::WorkflowNotFound(id))?;

        let execution_ids: Vec<Uuid> = self
            .executions
            .read()
            .values()
            .filter(|e| e.workflow_id == id)
            .map(|e| e.id)
            .collect();
        self.executions.write().retain(|_, e| e.workflow_id != id);
        self.node_executions.write().retain(|_, ne| !execution_ids.contains(&ne.execution_id));
        self.events.write().retain(|execution_id, _| !execution_ids.contains(execution_id));
        Ok(())
    }

    async fn list_workflows(&self, status: Option<WorkflowStatus>, pagination: Pagination) -> Result<Vec<Workflow>, StoreError> {
        let mut workflows: Vec<Workflow> = self
            .workflows
            .read()
            .values()
            .filter(|w| status.is_none_or(|s| w.status == s))
            .cloned()
            .collect();
        workflows.sort_by_key(|w| w.created_at);
        Ok(pagination.apply(&workflows))
    }
}

#[async_trait]
impl ExecutionStore for InMemoryStore {
    async fn create_execution(&self, execution: Execution) -> Result<Execution, StoreError> {
        self.executions.write().insert(execution.id, execution.clone());
        Ok(execution)
    }

    async fn update_execution(&self, execution: Execution) -> Result<Execution, StoreError> {
        let mut executions = self.executions.write();
        if !executions.contains_key(&execution.id) {
            return Err(StoreError::ExecutionNotFound(execution.id));
        }
        executions.insert(execution.id, execution.clone());
        Ok(execution)
    }

    async fn delete_execution(&self, id: Uuid) -> Result<(), StoreError> {
        self.executions.write().remove(&id).ok_or(StoreError::ExecutionNotFound(id))?;
        self.node_executions.write().retain(|_, ne| ne.execution_id != id);
        self.events.write().remove(&id);
        Ok(())
    }

    async fn get_execution(&self, id: Uuid, with_node_executions: bool) -> Result<Execution, StoreError> {
        let mut execution = self.executions.read().get(&id).cloned().ok_or(StoreError::ExecutionNotFound(id))?;
        if with_node_executions {
            let mut node_executions = self.node_executions_for(id);
            node_executions.sort_by(|a, b| a.wave.cmp(&b.wave).then(a.id.cmp(&b.id)));
            execution.node_executions = node_executions;
        } else {
            execution.node_executions = Vec::new();
        }
        Ok(execution)
    }

    async fn list_executions(&self, filter: ExecutionFilter, pagination: Pagination) -> Result<Vec<Execution>, StoreError> {
        let mut executions: Vec<Execution> = self
            .executions
            .read()
            .values()
            .filter(|e| filter.workflow_id.is_none_or(|w| e.workflow_id == w))
            .filter(|e| filter.phase.is_none_or(|p| e.phase == p))
            .cloned()
            .collect();
        executions.sort_by_key(|e| e.started_at);
        Ok(pagination.apply(&executions))
    }

    async fn find_running(&self) -> Result<Vec<Execution>, StoreError> {
        Ok(self
            .executions
            .read()
            .values()
            .filter(|e| e.phase == ExecutionPhase::Running)
            .cloned()
            .collect())
    }

    async fn count_executions(&self, workflow_id: Option<Uuid>, phase: Option<ExecutionPhase>) -> Result<u64, StoreError> {
        let count = self
            .executions
            .read()
            .values()
            .filter(|e| workflow_id.is_none_or(|w| e.workflow_id == w))
            .filter(|e| phase.is_none_or(|p| e.phase == p))
            .count();
        Ok(count as u64)
    }

    async fn statistics(&self, workflow_id: Option<Uuid>, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Statistics, StoreError> {
        let executions = self.executions.read();
        let windowed: Vec<&Execution> = executions
            .values()
            .filter(|e| workflow_id.is_none_or(|w| e.workflow_id == w))
            .filter(|e| e.started_at >= from && e.started_at <= to)
            .collect();

        let mut counts_by_phase: HashMap<ExecutionPhase, u64> = HashMap::new();
        for execution in &windowed {
            *counts_by_phase.entry(execution.phase).or_insert(0) += 1;
        }

        let completed: Vec<&&Execution> = windowed.iter().filter(|e| e.phase == ExecutionPhase::Completed).collect();
        let average_duration_secs = if completed.is_empty() {
            None
        } else {
            let total: f64 = completed
                .iter()
                .filter_map(|e| e.completed_at.map(|c| (c - e.started_at).num_milliseconds() as f64 / 1000.0))
                .sum();
            Some(total / completed.len() as f64)
        };

        let failed_count = *counts_by_phase.get(&ExecutionPhase::Failed).unwrap_or(&0);
        let completed_count = completed.len() as u64;
        let terminal_count = completed_count + failed_count;
        let (success_rate, failure_rate) = if terminal_count == 0 {
            (0.0, 0.0)
        } else {
            (completed_count as f64 / terminal_count as f64, failed_count as f64 / terminal_count as f64)
        };

        Ok(Statistics { counts_by_phase, average_duration_secs, success_rate, failure_rate })
    }
}

#[async_trait]
impl NodeExecutionStore for InMemoryStore {
    async fn create_node_execution(&self, node_execution: NodeExecution) -> Result<NodeExecution, StoreError> {
        self.node_executions.write().insert(node_execution.id, node_execution.clone());
        Ok(node_execution)
    }

    async fn update_node_execution(&self, node_execution: NodeExecution) -> Result<NodeExecution, StoreError> {
        let mut node_executions = self.node_executions.write();
        if !node_executions.contains_key(&node_execution.id) {
            return Err(StoreError::NodeExecutionNotFound(node_execution.id));
        }
        node_executions.insert(node_execution.id, node_execution.clone());
        Ok(node_execution)
    }

    async fn delete_node_execution(&self, id: Uuid) -> Result<(), StoreError> {
        self.node_executions.write().remove(&id).ok_or(StoreError::NodeExecutionNotFound(id))?;
        Ok(())
    }

    async fn get_node_execution(&self, id: Uuid) -> Result<NodeExecution, StoreError> {
        self.node_executions.read().get(&id).cloned().ok_or(StoreError::NodeExecutionNotFound(id))
    }

    async fn find_for_execution(&self, execution_id: Uuid) -> Result<Vec<NodeExecution>, StoreError> {
        let mut node_executions = self.node_executions_for(execution_id);
        node_executions.sort_by(|a, b| a.wave.cmp(&b.wave).then(a.id.cmp(&b.id)));
        Ok(node_executions)
    }

    async fn find_for_execution_and_wave(&self, execution_id: Uuid, wave: u32) -> Result<Vec<NodeExecution>, StoreError> {
        Ok(self.node_executions_for(execution_id).into_iter().filter(|ne| ne.wave == wave).collect())
    }

    async fn find_for_execution_and_status(&self, execution_id: Uuid, phase: NodeExecutionPhase) -> Result<Vec<NodeExecution>, StoreError> {
        Ok(self.node_executions_for(execution_id).into_iter().filter(|ne| ne.phase == phase).collect())
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn append(&self, execution_id: Uuid, event_type: &str, payload: Value) -> Result<ExecutionEvent, StoreError> {
        let mut events = self.events.write();
        let log = events.entry(execution_id).or_default();
        let sequence_number = log.len() as u64 + 1;
        let event = ExecutionEvent::new(execution_id, sequence_number, event_type, payload);
        log.push(event.clone());
        Ok(event)
    }

    async fn load(&self, execution_id: Uuid) -> Result<Vec<ExecutionEvent>, StoreError> {
        Ok(self.events.read().get(&execution_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, Node, Trigger, TriggerKind};
    use serde_json::json;

    fn sample_workflow() -> Workflow {
        let n1 = Node::new("a", "transform", json!({"expr": "1"}));
        let n2 = Node::new("b", "transform", json!({"expr": "2"}));
        let edge = Edge::new("a_to_b", "a", "b");
        Workflow::new("pipeline", vec![n1, n2], vec![edge])
    }

    #[tokio::test]
    async fn test_create_and_get_workflow() {
        let store = InMemoryStore::new();
        let workflow = store.create_workflow(sample_workflow()).await.unwrap();
        let fetched = store.get_workflow(workflow.id).await.unwrap();
        assert_eq!(fetched.name, "pipeline");
    }

    #[tokio::test]
    async fn test_smart_merge_preserves_internal_id_and_cascades_removed_node() {
        let store = InMemoryStore::new();
        let workflow = store.create_workflow(sample_workflow()).await.unwrap();
        let node_a_id = workflow.node_by_logical_id("a").unwrap().id;
        let node_b_id = workflow.node_by_logical_id("b").unwrap().id;

        let execution = Execution::new(workflow.id, workflow.version, Trigger::new(TriggerKind::Manual, Value::Null), Value::Null, false);
        store.create_execution(execution.clone()).await.unwrap();
        let ne_b = NodeExecution::new(execution.id, node_b_id, "b", 0, Value::Null);
        store.create_node_execution(ne_b.clone()).await.unwrap();

        let mut updated = workflow.clone();
        updated.nodes.retain(|n| n.logical_id != "b");
        updated.edges.clear();
        let merged = store.update_workflow(updated).await.unwrap();

        assert_eq!(merged.version, 2);
        assert_eq!(merged.node_by_logical_id("a").unwrap().id, node_a_id);
        assert!(merged.node_by_logical_id("b").is_none());
        assert!(store.get_node_execution(ne_b.id).await.is_err());
    }

    #[tokio::test]
    async fn test_event_store_assigns_monotonic_sequence() {
        let store = InMemoryStore::new();
        let execution_id = Uuid::now_v7();
        let e1 = store.append(execution_id, "node_started", json!({})).await.unwrap();
        let e2 = store.append(execution_id, "node_completed", json!({})).await.unwrap();
        assert_eq!(e1.sequence_number, 1);
        assert_eq!(e2.sequence_number, 2);
        assert_eq!(store.load(execution_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_statistics_computes_rates_and_average_duration() {
        let store = InMemoryStore::new();
        let workflow = store.create_workflow(sample_workflow()).await.unwrap();

        let mut completed = Execution::new(workflow.id, 1, Trigger::new(TriggerKind::Manual, Value::Null), Value::Null, false);
        completed.phase = ExecutionPhase::Completed;
        completed.completed_at = Some(completed.started_at + chrono::Duration::seconds(10));
        store.create_execution(completed).await.unwrap();

        let mut failed = Execution::new(workflow.id, 1, Trigger::new(TriggerKind::Manual, Value::Null), Value::Null, false);
        failed.phase = ExecutionPhase::Failed;
        failed.completed_at = Some(failed.started_at);
        store.create_execution(failed).await.unwrap();

        let stats = store
            .statistics(Some(workflow.id), Utc::now() - chrono::Duration::hours(1), Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(stats.average_duration_secs, Some(10.0));
        assert_eq!(stats.success_rate, 0.5);
        assert_eq!(stats.failure_rate, 0.5);
    }

    #[tokio::test]
    async fn test_delete_execution_cascades_node_executions() {
        let store = InMemoryStore::new();
        let workflow = store.create_workflow(sample_workflow()).await.unwrap();
        let node_id = workflow.node_by_logical_id("a").unwrap().id;
        let execution = Execution::new(workflow.id, 1, Trigger::new(TriggerKind::Manual, Value::Null), Value::Null, false);
        store.create_execution(execution.clone()).await.unwrap();
        let ne = store
            .create_node_execution(NodeExecution::new(execution.id, node_id, "a", 0, Value::Null))
            .await
            .unwrap();

        store.delete_execution(execution.id).await.unwrap();
        assert!(store.get_node_execution(ne.id).await.is_err());
    }
}
