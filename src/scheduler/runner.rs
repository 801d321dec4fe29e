//! The wave-loop runner (§4.4, §4.5, §5)
//!
//! Grounded on the g3 `DagExecutor::execute`/`execute_level` example
//! (`other_examples/...workflow-dag.rs.rs`) for the semaphore-bounded
//! spawn-then-join-barrier shape of one wave, generalized with the retry,
//! skip, and circuit-breaker machinery the spec's algorithm spells out.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::adapter::{AdapterOutcome, NodeExecutionContext, NodeRegistry};
use crate::dag::Dag;
use crate::expr::evaluate_predicate;
use crate::model::{
    Edge, Execution, ExecutionEvent, ExecutionPhase, LoopSpec, Node, NodeExecution,
    NodeExecutionPhase, Trigger, Workflow,
};
use crate::observability::{ObserverBus, ObserverEvent};
use crate::persistence::{EventStore, ExecutionStore, NodeExecutionStore};
use crate::reliability::{CircuitBreaker, CircuitBreakerConfig};
use crate::variables::VariableStore;

use super::error::SchedulerError;
use super::policy::PolicyBundle;
use super::resolve::resolve_config;

/// Owns the wave loop for one or more concurrent executions (§5 — one
/// Scheduler instance is shared across executions; each call to
/// [`Self::execute_workflow`] drives its own independent run).
pub struct Scheduler {
    registry: NodeRegistry,
    observers: ObserverBus,
    execution_store: Arc<dyn ExecutionStore>,
    node_execution_store: Arc<dyn NodeExecutionStore>,
    event_store: Arc<dyn EventStore>,
    policy: PolicyBundle,
    circuit_breakers: DashMap<String, Arc<CircuitBreaker>>,
    cancellations: DashMap<Uuid, CancellationToken>,
}

struct NodeOutcome {
    logical_id: String,
    phase: NodeExecutionPhase,
    error_message: Option<String>,
}

impl Scheduler {
    pub fn new(
        registry: NodeRegistry,
        observers: ObserverBus,
        execution_store: Arc<dyn ExecutionStore>,
        node_execution_store: Arc<dyn NodeExecutionStore>,
        event_store: Arc<dyn EventStore>,
        policy: PolicyBundle,
    ) -> Self {
        Self {
            registry,
            observers,
            execution_store,
            node_execution_store,
            event_store,
            policy,
            circuit_breakers: DashMap::new(),
            cancellations: DashMap::new(),
        }
    }

    /// Non-blocking cancel signal (§6 `Cancel(executionId)`). Returns
    /// `false` if `execution_id` is not currently running under this
    /// scheduler.
    pub fn cancel(&self, execution_id: Uuid) -> bool {
        if let Some(token) = self.cancellations.get(&execution_id) {
            token.cancel();
            true
        } else {
            false
        }
    }

    /// Replay of the append-only event log (§6 `Events(executionId)`).
    pub async fn events(&self, execution_id: Uuid) -> Result<Vec<ExecutionEvent>, SchedulerError> {
        Ok(self.event_store.load(execution_id).await?)
    }

    /// `ExecuteWorkflow(workflow, trigger, initialVariables)` (§4.4, §6).
    /// Blocks until the execution reaches a terminal phase.
    #[instrument(skip(self, workflow, initial_variables), fields(workflow_id = %workflow.id))]
    pub async fn execute_workflow(
        &self,
        workflow: &Workflow,
        trigger: Trigger,
        initial_variables: Value,
    ) -> Result<Execution, SchedulerError> {
        let dag = Dag::build(&workflow.nodes, &workflow.edges)?;

        let mut variables = workflow.variables.as_object().cloned().unwrap_or_default();
        if let Some(overrides) = initial_variables.as_object() {
            for (key, value) in overrides {
                variables.insert(key.clone(), value.clone());
            }
        }

        let mut execution = Execution::new(
            workflow.id,
            workflow.version,
            trigger,
            initial_variables,
            self.policy.strict_mode,
        );
        let execution_id = execution.id;
        let cancel_token = CancellationToken::new();
        self.cancellations.insert(execution_id, cancel_token.clone());

        self.execution_store.create_execution(execution.clone()).await?;
        self.emit_and_record(execution_id, ObserverEvent::ExecutionStarted { execution_id, workflow_id: workflow.id }).await;

        let store = Arc::new(VariableStore::from_initial(Value::Object(variables)));
        self.wire_change_hook(&store, execution_id, workflow.id);

        let incoming_edges = group_incoming_edges(&workflow.edges);
        let loop_specs = loop_specs(&workflow.edges);
        let mut node_state: HashMap<String, NodeExecutionPhase> =
            workflow.nodes.iter().map(|n| (n.logical_id.clone(), NodeExecutionPhase::Pending)).collect();
        let mut failures: Vec<(String, String)> = Vec::new();
        let mut cancelled = false;

        for (wave_index, wave_nodes) in dag.waves().iter().enumerate() {
            let wave_index = wave_index as u32;
            if cancel_token.is_cancelled() {
                cancelled = true;
                break;
            }

            let mut ready = Vec::new();
            for logical_id in wave_nodes {
                let Some(node) = workflow.node_by_logical_id(logical_id) else { continue };
                let predecessors = dag.predecessors(logical_id);
                let decision = decide_node(predecessors, &node_state, incoming_edges.get(logical_id.as_str()), &store, self.policy.strict_mode);
                match decision {
                    NodeDecision::Ready => ready.push(node),
                    NodeDecision::Skip(reason) => {
                        node_state.insert(logical_id.clone(), NodeExecutionPhase::Skipped);
                        self.persist_skip(execution_id, node, wave_index, &reason).await;
                        self.emit_and_record(
                            execution_id,
                            ObserverEvent::NodeSkipped {
                                execution_id,
                                workflow_id: workflow.id,
                                node_id: node.id,
                                node_type: node.kind.clone(),
                                node_name: node.name.clone(),
                                reason,
                            },
                        )
                        .await;
                    }
                }
            }
            ready.sort_by(|a, b| a.logical_id.cmp(&b.logical_id));

            let semaphore = Arc::new(Semaphore::new(self.policy.max_parallelism.max(1)));
            let tasks = ready.into_iter().map(|node| {
                let loop_spec = loop_specs.get(&node.logical_id).cloned();
                self.run_node(node.clone(), wave_index, execution_id, workflow.id, store.clone(), cancel_token.clone(), semaphore.clone(), loop_spec)
            });
            let outcomes: Vec<NodeOutcome> = join_all(tasks).await;

            let mut wave_failed = false;
            for outcome in outcomes {
                if outcome.phase == NodeExecutionPhase::Failed {
                    wave_failed = true;
                    if let Some(msg) = outcome.error_message {
                        failures.push((outcome.logical_id.clone(), msg));
                    }
                }
                node_state.insert(outcome.logical_id, outcome.phase);
            }

            if cancel_token.is_cancelled() {
                cancelled = true;
                break;
            }
            if wave_failed && self.policy.strict_mode {
                break;
            }
        }

        self.cancellations.remove(&execution_id);

        execution.phase = if cancelled {
            ExecutionPhase::Cancelled
        } else if node_state.values().any(|phase| *phase == NodeExecutionPhase::Failed) {
            ExecutionPhase::Failed
        } else {
            ExecutionPhase::Completed
        };
        execution.completed_at = Some(chrono::Utc::now());
        execution.variables = store.snapshot();
        execution.failure_reason = failures.first().map(|(logical_id, msg)| format!("node '{logical_id}' failed: {msg}"));
        execution.output_data = build_output_data(workflow, &store);

        self.execution_store.update_execution(execution.clone()).await?;

        let duration_ms = (execution.completed_at.unwrap() - execution.started_at).num_milliseconds().max(0) as u64;
        let terminal_event = match execution.phase {
            ExecutionPhase::Completed => ObserverEvent::ExecutionCompleted { execution_id, workflow_id: workflow.id, duration_ms },
            ExecutionPhase::Cancelled => ObserverEvent::ExecutionCancelled { execution_id, workflow_id: workflow.id },
            _ => ObserverEvent::ExecutionFailed {
                execution_id,
                workflow_id: workflow.id,
                error_message: execution.failure_reason.clone().unwrap_or_else(|| "execution failed".to_string()),
                duration_ms,
            },
        };
        self.emit_and_record(execution_id, terminal_event).await;

        Ok(execution)
    }

    fn wire_change_hook(&self, store: &Arc<VariableStore>, execution_id: Uuid, workflow_id: Uuid) {
        let observers = self.observers.clone();
        store.set_change_hook(Arc::new(move |key, value| {
            let observers = observers.clone();
            let key = key.to_string();
            let value = value.clone();
            tokio::spawn(async move {
                observers
                    .emit(ObserverEvent::VariableSet { execution_id, workflow_id, variable_key: key, variable_value: value })
                    .await;
            });
        }));
    }

    async fn emit_and_record(&self, execution_id: Uuid, event: ObserverEvent) {
        let envelope = event.envelope();
        self.observers.emit(event).await;
        let payload = serde_json::to_value(&envelope).unwrap_or(Value::Null);
        if let Err(err) = self.event_store.append(execution_id, &envelope.event_type, payload).await {
            warn!(execution_id = %execution_id, error = %err, "failed to append execution event");
        }
    }

    async fn persist_skip(&self, execution_id: Uuid, node: &Node, wave: u32, reason: &str) {
        let mut node_execution = NodeExecution::new(execution_id, node.id, &node.logical_id, wave, Value::Null);
        node_execution.phase = NodeExecutionPhase::Skipped;
        node_execution.skip_reason = Some(reason.to_string());
        node_execution.completed_at = Some(chrono::Utc::now());
        if let Err(err) = self.node_execution_store.create_node_execution(node_execution).await {
            warn!(execution_id = %execution_id, node = %node.logical_id, error = %err, "failed to persist skipped node execution");
        }
    }

    /// Iteration-driving wrapper around [`Self::execute_node_once`] (§4.4,
    /// §9 loop edges): re-enters the node up to `loop_spec.max_iterations`
    /// times, injecting `loop.iteration` (0-based) before each attempt and
    /// stopping early the first time an iteration doesn't complete. Each
    /// iteration gets its own `NodeExecution` record — the log reads as a
    /// sequence of runs of the same node rather than one record mutated in
    /// place.
    #[instrument(skip(self, node, store, cancel_token, semaphore, loop_spec), fields(node = %node.logical_id, kind = %node.kind))]
    async fn run_node(
        &self,
        node: Node,
        wave: u32,
        execution_id: Uuid,
        workflow_id: Uuid,
        store: Arc<VariableStore>,
        cancel_token: CancellationToken,
        semaphore: Arc<Semaphore>,
        loop_spec: Option<LoopSpec>,
    ) -> NodeOutcome {
        let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");

        let max_iterations = loop_spec.as_ref().map(|l| l.max_iterations.max(1)).unwrap_or(1);
        let mut outcome = None;
        for iteration in 0..max_iterations {
            if loop_spec.is_some() {
                store.set("loop", serde_json::json!({ "iteration": iteration as u64 }));
            }
            let iteration_outcome = self
                .execute_node_once(&node, wave, execution_id, workflow_id, &store, &cancel_token)
                .await;
            let completed = iteration_outcome.phase == NodeExecutionPhase::Completed;
            outcome = Some(iteration_outcome);
            if !completed {
                break;
            }
        }
        if loop_spec.is_some() {
            store.set("loop", Value::Null);
        }
        outcome.expect("max_iterations is at least 1, so the loop runs at least once")
    }

    async fn execute_node_once(
        &self,
        node: &Node,
        wave: u32,
        execution_id: Uuid,
        workflow_id: Uuid,
        store: &Arc<VariableStore>,
        cancel_token: &CancellationToken,
    ) -> NodeOutcome {
        let mut node_execution = NodeExecution::new(execution_id, node.id, &node.logical_id, wave, store.snapshot());
        node_execution.phase = NodeExecutionPhase::Running;
        node_execution.started_at = Some(chrono::Utc::now());
        let node_execution_id = node_execution.id;
        if let Err(err) = self.node_execution_store.create_node_execution(node_execution.clone()).await {
            warn!(execution_id = %execution_id, node = %node.logical_id, error = %err, "failed to persist node execution start");
        }

        let resolved_config = match resolve_config(&node.config, store) {
            Ok(config) => config,
            Err(err) => {
                return self
                    .finish_node_failed(node_execution_id, execution_id, workflow_id, node, wave, 1, err.to_string())
                    .await;
            }
        };

        let max_attempts = self.policy.retry_policy.max_attempts;
        let mut attempt = 1;
        loop {
            if attempt > 1 && cancel_token.is_cancelled() {
                return self
                    .finish_node_failed(node_execution_id, execution_id, workflow_id, node, wave, attempt, "execution cancelled".to_string())
                    .await;
            }

            self.emit_and_record(
                execution_id,
                ObserverEvent::NodeStarted {
                    execution_id,
                    workflow_id,
                    node_id: node.id,
                    node_type: node.kind.clone(),
                    node_name: node.name.clone(),
                    config: resolved_config.clone(),
                    attempt_number: attempt,
                },
            )
            .await;

            let outcome = self.invoke_adapter(node, &resolved_config, store, execution_id, attempt, max_attempts, cancel_token).await;
            match outcome {
                AdapterOutcome::Ok(value) => {
                    let output_key = node.effective_output_key();
                    store.set(output_key, value.clone());
                    node_execution.phase = NodeExecutionPhase::Completed;
                    node_execution.output_data = Some(value.clone());
                    node_execution.completed_at = Some(chrono::Utc::now());
                    node_execution.retry_count = attempt - 1;
                    if let Err(err) = self.node_execution_store.update_node_execution(node_execution.clone()).await {
                        warn!(execution_id = %execution_id, node = %node.logical_id, error = %err, "failed to persist completed node execution");
                    }
                    let duration_ms = node_execution
                        .completed_at
                        .zip(node_execution.started_at)
                        .map(|(c, s)| (c - s).num_milliseconds().max(0) as u64)
                        .unwrap_or(0);
                    self.emit_and_record(
                        execution_id,
                        ObserverEvent::NodeCompleted {
                            execution_id,
                            workflow_id,
                            node_id: node.id,
                            node_type: node.kind.clone(),
                            node_name: node.name.clone(),
                            output: value,
                            duration_ms,
                        },
                    )
                    .await;
                    return NodeOutcome { logical_id: node.logical_id.clone(), phase: NodeExecutionPhase::Completed, error_message: None };
                }
                AdapterOutcome::Transient(_) if attempt < max_attempts => {
                    node_execution.retry_count = attempt;
                    node_execution.phase = NodeExecutionPhase::Pending;
                    if let Err(err) = self.node_execution_store.update_node_execution(node_execution.clone()).await {
                        warn!(execution_id = %execution_id, node = %node.logical_id, error = %err, "failed to persist retrying node execution");
                    }
                    let delay = self.policy.retry_policy.delay_for_attempt(attempt + 1);
                    self.emit_and_record(
                        execution_id,
                        ObserverEvent::NodeRetrying {
                            execution_id,
                            workflow_id,
                            node_id: node.id,
                            node_type: node.kind.clone(),
                            node_name: node.name.clone(),
                            attempt_number: attempt + 1,
                            retry_delay_ms: delay.as_millis() as u64,
                        },
                    )
                    .await;
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = cancel_token.cancelled() => {}
                    }
                    attempt += 1;
                }
                AdapterOutcome::Transient(msg) | AdapterOutcome::Permanent(msg) => {
                    return self.finish_node_failed(node_execution_id, execution_id, workflow_id, node, wave, attempt, msg).await;
                }
            }
        }
    }

    async fn invoke_adapter(
        &self,
        node: &Node,
        resolved_config: &Value,
        store: &Arc<VariableStore>,
        execution_id: Uuid,
        attempt: u32,
        max_attempts: u32,
        cancel_token: &CancellationToken,
    ) -> AdapterOutcome {
        let Some(adapter) = self.registry.get(&node.kind) else {
            return AdapterOutcome::Permanent(format!("no adapter registered for kind '{}'", node.kind));
        };

        let breaker = self
            .circuit_breakers
            .entry(node.kind.clone())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default())))
            .clone();

        let permit = match breaker.try_acquire() {
            Ok(permit) => permit,
            Err(_) => return AdapterOutcome::Permanent("circuit open".to_string()),
        };

        let ctx = NodeExecutionContext::new(execution_id, node.id, node.logical_id.clone(), attempt, max_attempts, store.snapshot());
        let handle = ctx.cancellation_handle();
        let watcher_token = cancel_token.clone();
        let watcher = tokio::spawn(async move {
            watcher_token.cancelled().await;
            handle.cancel();
        });

        let call = adapter.execute(&ctx, resolved_config.clone());
        let result = match self.policy.default_node_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    watcher.abort();
                    permit.failure();
                    return if self.policy.timeout_is_transient {
                        AdapterOutcome::Transient("node timed out".to_string())
                    } else {
                        AdapterOutcome::Permanent("node timed out".to_string())
                    };
                }
            },
            None => call.await,
        };
        watcher.abort();

        match &result {
            AdapterOutcome::Ok(_) => permit.success(),
            _ => permit.failure(),
        }
        result
    }

    async fn finish_node_failed(
        &self,
        node_execution_id: Uuid,
        execution_id: Uuid,
        workflow_id: Uuid,
        node: &Node,
        _wave: u32,
        attempt: u32,
        error_message: String,
    ) -> NodeOutcome {
        let mut node_execution = match self.node_execution_store.get_node_execution(node_execution_id).await {
            Ok(ne) => ne,
            Err(_) => NodeExecution::new(execution_id, node.id, &node.logical_id, 0, Value::Null),
        };
        node_execution.phase = NodeExecutionPhase::Failed;
        node_execution.error_message = Some(error_message.clone());
        node_execution.completed_at = Some(chrono::Utc::now());
        node_execution.retry_count = attempt.saturating_sub(1);
        if let Err(err) = self.node_execution_store.update_node_execution(node_execution).await {
            warn!(execution_id = %execution_id, node = %node.logical_id, error = %err, "failed to persist failed node execution");
        }
        self.emit_and_record(
            execution_id,
            ObserverEvent::NodeFailed {
                execution_id,
                workflow_id,
                node_id: node.id,
                node_type: node.kind.clone(),
                node_name: node.name.clone(),
                error_message: error_message.clone(),
                will_retry: false,
            },
        )
        .await;
        NodeOutcome { logical_id: node.logical_id.clone(), phase: NodeExecutionPhase::Failed, error_message: Some(error_message) }
    }
}

enum NodeDecision {
    Ready,
    Skip(String),
}

fn decide_node(
    predecessors: &[String],
    node_state: &HashMap<String, NodeExecutionPhase>,
    incoming_edges: Option<&Vec<&Edge>>,
    store: &VariableStore,
    strict_mode: bool,
) -> NodeDecision {
    if predecessors.is_empty() {
        return NodeDecision::Ready;
    }

    let any_failed = predecessors.iter().any(|p| node_state.get(p) == Some(&NodeExecutionPhase::Failed));
    if strict_mode && any_failed {
        return NodeDecision::Skip("predecessor failed (strict mode)".to_string());
    }

    // Skip transitivity (§4.4.b / §8 invariant 6): a node with no live
    // predecessor can never become ready, regardless of its own edge
    // conditions — there is nothing for those conditions to evaluate
    // against.
    let all_skipped = predecessors.iter().all(|p| node_state.get(p) == Some(&NodeExecutionPhase::Skipped));
    if all_skipped {
        return NodeDecision::Skip("predecessor skipped".to_string());
    }

    let Some(edges) = incoming_edges else {
        return NodeDecision::Ready;
    };
    let all_true = edges.iter().all(|edge| match &edge.condition {
        None => true,
        Some(expr) => evaluate_predicate(expr, store).unwrap_or(false),
    });
    if all_true {
        NodeDecision::Ready
    } else {
        NodeDecision::Skip("edge condition false".to_string())
    }
}

/// Self-loop edges carrying a [`LoopSpec`], keyed by the node they re-enter.
/// `Dag::build` has already rejected any non-self-loop edge with a
/// `loop_spec` and excluded these from cycle detection and wave ordering.
fn loop_specs(edges: &[Edge]) -> HashMap<String, LoopSpec> {
    edges
        .iter()
        .filter(|e| e.from_logical_id == e.to_logical_id)
        .filter_map(|e| e.loop_spec.clone().map(|ls| (e.to_logical_id.clone(), ls)))
        .collect()
}

fn group_incoming_edges(edges: &[Edge]) -> HashMap<String, Vec<&Edge>> {
    let mut grouped: HashMap<String, Vec<&Edge>> = HashMap::new();
    for edge in edges {
        if edge.loop_spec.is_some() {
            continue;
        }
        grouped.entry(edge.to_logical_id.clone()).or_default().push(edge);
    }
    grouped
}

fn build_output_data(workflow: &Workflow, store: &VariableStore) -> Option<Value> {
    let end_node = workflow.nodes.iter().find(|n| n.kind == "end")?;
    let keys = end_node.config.get("output_keys")?.as_array()?;
    let mut output = serde_json::Map::new();
    for key in keys {
        let Some(key) = key.as_str() else { continue };
        output.insert(key.to_string(), store.get(key).into_value());
    }
    Some(Value::Object(output))
}
