//! End-to-end scenario tests (S1–S6, `SPEC_FULL.md` §8) driven against the
//! in-memory store, following the teacher's split between inline unit tests
//! and a crate-level `tests/` suite for whole-system behavior.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use fluxion_engine::prelude::*;

fn registry_with(adapters: Vec<Arc<dyn NodeAdapter>>) -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    for adapter in adapters {
        registry.register(adapter);
    }
    registry
}

fn scheduler(
    registry: NodeRegistry,
    observers: ObserverBus,
    policy: PolicyBundle,
) -> (Scheduler, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::default());
    let scheduler = Scheduler::new(
        registry,
        observers,
        store.clone(),
        store.clone(),
        store.clone(),
        policy,
    );
    (scheduler, store)
}

fn manual_trigger() -> Trigger {
    Trigger::new(TriggerKind::Manual, Value::Null)
}

/// Adapter whose first `fail_count` invocations return `AdapterOutcome::Transient`,
/// after which it returns `Ok(output)`.
struct FlakyAdapter {
    kind: String,
    fail_count: u32,
    calls: AtomicU32,
    output: Value,
}

impl FlakyAdapter {
    fn new(kind: &str, fail_count: u32, output: Value) -> Self {
        Self { kind: kind.to_string(), fail_count, calls: AtomicU32::new(0), output }
    }
}

#[async_trait]
impl NodeAdapter for FlakyAdapter {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn execute(&self, _ctx: &NodeExecutionContext, _config: Value) -> AdapterOutcome {
        let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_count {
            AdapterOutcome::Transient("boom".to_string())
        } else {
            AdapterOutcome::Ok(self.output.clone())
        }
    }
}

/// Adapter that always fails permanently.
struct PermanentFailureAdapter {
    kind: String,
}

#[async_trait]
impl NodeAdapter for PermanentFailureAdapter {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn execute(&self, _ctx: &NodeExecutionContext, _config: Value) -> AdapterOutcome {
        AdapterOutcome::Permanent("permanent failure".to_string())
    }
}

fn transform_node(logical_id: &str, expr: &str, output_key: &str) -> Node {
    Node::new(logical_id, "transform", json!({"expr": expr})).with_output_key(output_key)
}

// S1 — linear pipeline: A writes x = input*2, B writes y = x+1.
#[tokio::test]
async fn s1_linear_pipeline_propagates_variables() {
    let nodes = vec![transform_node("A", "input * 2", "x"), transform_node("B", "x + 1", "y")];
    let edges = vec![Edge::new("a_to_b", "A", "B")];
    let workflow = Workflow::new("linear", nodes, edges);

    let registry = registry_with(vec![Arc::new(TransformAdapter)]);
    let (scheduler, store) = scheduler(registry, ObserverBus::new(), PolicyBundle::default());

    let execution = scheduler
        .execute_workflow(&workflow, manual_trigger(), json!({"input": 5}))
        .await
        .unwrap();

    assert_eq!(execution.phase, ExecutionPhase::Completed);
    assert_eq!(execution.variables.get("x"), Some(&json!(10.0)));
    assert_eq!(execution.variables.get("y"), Some(&json!(11.0)));

    let node_executions = store.find_for_execution(execution.id).await.unwrap();
    assert_eq!(node_executions.len(), 2);
    let wave_of = |logical_id: &str| {
        node_executions.iter().find(|ne| ne.node_logical_id == logical_id).unwrap().wave
    };
    assert_eq!(wave_of("A"), 0);
    assert_eq!(wave_of("B"), 1);
}

// S2 — fork-join: start fans out to T1/T2/T3, join aggregates, end terminates.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn s2_fork_join_runs_concurrently_and_aggregates() {
    let nodes = vec![
        Node::new("start", "start", json!({})),
        transform_node("T1", "10", "r1"),
        transform_node("T2", "20", "r2"),
        transform_node("T3", "30", "r3"),
        transform_node("join", "r1 + r2 + r3", "final_result"),
        Node::new("end", "end", json!({"output_keys": ["final_result"]})),
    ];
    let edges = vec![
        Edge::new("e_start_t1", "start", "T1"),
        Edge::new("e_start_t2", "start", "T2"),
        Edge::new("e_start_t3", "start", "T3"),
        Edge::new("e_t1_join", "T1", "join"),
        Edge::new("e_t2_join", "T2", "join"),
        Edge::new("e_t3_join", "T3", "join"),
        Edge::new("e_join_end", "join", "end"),
    ];
    let workflow = Workflow::new("fork_join", nodes, edges);

    let registry = registry_with(vec![
        Arc::new(TransformAdapter),
        Arc::new(PassthroughAdapter::new("start")),
        Arc::new(PassthroughAdapter::new("end")),
    ]);
    let trace = Arc::new(InMemoryTraceObserver::new());
    let mut observers = ObserverBus::new();
    observers.register(trace.clone());
    let policy = PolicyBundle::default().with_max_parallelism(4);
    let (scheduler, store) = scheduler(registry, observers, policy);

    let execution = scheduler.execute_workflow(&workflow, manual_trigger(), Value::Null).await.unwrap();

    assert_eq!(execution.phase, ExecutionPhase::Completed);
    assert_eq!(execution.output_data, Some(json!({"final_result": 60.0})));

    let node_executions = store.find_for_execution(execution.id).await.unwrap();
    for logical_id in ["T1", "T2", "T3"] {
        let wave = node_executions.iter().find(|ne| ne.node_logical_id == logical_id).unwrap().wave;
        assert_eq!(wave, 1, "{logical_id} should run in wave 1");
    }

    let envelopes = trace.trace_for(execution.id);
    let start_times: Vec<_> = envelopes
        .iter()
        .filter(|e| e.event_type == "node_started" && ["T1", "T2", "T3"].contains(&e.node_name.as_deref().unwrap_or("")))
        .map(|e| e.timestamp)
        .collect();
    assert_eq!(start_times.len(), 3);
    let min = start_times.iter().min().unwrap();
    let max = start_times.iter().max().unwrap();
    assert!((*max - *min) < chrono::Duration::milliseconds(500), "T1/T2/T3 should start close together");
}

// S3 — conditional routing: only the matching branch runs, the other is skipped.
#[tokio::test]
async fn s3_conditional_routing_skips_inactive_branch() {
    let nodes = vec![
        transform_node("check", "'active'", "status"),
        Node::new("active_path", "passthrough", json!({})),
        Node::new("inactive_path", "passthrough", json!({})),
    ];
    let edges = vec![
        Edge::new("e_active", "check", "active_path").with_condition("status == 'active'"),
        Edge::new("e_inactive", "check", "inactive_path").with_condition("status == 'inactive'"),
    ];
    let workflow = Workflow::new("routing", nodes, edges);

    let registry = registry_with(vec![
        Arc::new(TransformAdapter),
        Arc::new(PassthroughAdapter::new("passthrough")),
    ]);
    let (scheduler, store) = scheduler(registry, ObserverBus::new(), PolicyBundle::default());

    let execution = scheduler.execute_workflow(&workflow, manual_trigger(), Value::Null).await.unwrap();
    assert_eq!(execution.phase, ExecutionPhase::Completed);

    let node_executions = store.find_for_execution(execution.id).await.unwrap();
    let active = node_executions.iter().find(|ne| ne.node_logical_id == "active_path").unwrap();
    assert_eq!(active.phase, NodeExecutionPhase::Completed);

    let inactive = node_executions.iter().find(|ne| ne.node_logical_id == "inactive_path").unwrap();
    assert_eq!(inactive.phase, NodeExecutionPhase::Skipped);
    assert_eq!(inactive.skip_reason.as_deref(), Some("edge condition false"));
}

// S4 — cycle detection: validation fails before any execution starts.
#[tokio::test]
async fn s4_cycle_detection_fails_validation() {
    let nodes = vec![Node::new("A", "transform", json!({})), Node::new("B", "transform", json!({})), Node::new("C", "transform", json!({}))];
    let edges = vec![
        Edge::new("e1", "A", "B"),
        Edge::new("e2", "B", "C"),
        Edge::new("e3", "C", "A"),
    ];
    let workflow = Workflow::new("cyclic", nodes, edges);

    let registry = registry_with(vec![Arc::new(TransformAdapter)]);
    let (scheduler, store) = scheduler(registry, ObserverBus::new(), PolicyBundle::default());

    let err = scheduler.execute_workflow(&workflow, manual_trigger(), Value::Null).await.unwrap_err();
    assert!(matches!(err, SchedulerError::Validation(DagError::CycleDetected(_))));
    assert!(store.find_running().await.unwrap().is_empty());
}

// S5 — transient retry: adapter fails twice then succeeds.
#[tokio::test]
async fn s5_transient_failures_retry_then_succeed() {
    let nodes = vec![Node::new("flaky", "flaky", json!({}))];
    let workflow = Workflow::new("retry", nodes, vec![]);

    let adapter: Arc<dyn NodeAdapter> = Arc::new(FlakyAdapter::new("flaky", 2, json!(true)));
    let registry = registry_with(vec![adapter]);

    let trace = Arc::new(InMemoryTraceObserver::new());
    let mut observers = ObserverBus::new();
    observers.register(trace.clone());

    let retry_policy = RetryPolicy::exponential()
        .with_max_attempts(3)
        .with_initial_interval(Duration::from_millis(10))
        .with_jitter(0.0);
    let policy = PolicyBundle::default().with_retry_policy(retry_policy);
    let (scheduler, store) = scheduler(registry, observers, policy);

    let execution = scheduler.execute_workflow(&workflow, manual_trigger(), Value::Null).await.unwrap();
    assert_eq!(execution.phase, ExecutionPhase::Completed);

    let node_executions = store.find_for_execution(execution.id).await.unwrap();
    let flaky = node_executions.iter().find(|ne| ne.node_logical_id == "flaky").unwrap();
    assert_eq!(flaky.phase, NodeExecutionPhase::Completed);
    assert_eq!(flaky.retry_count, 2);

    let envelopes = trace.trace_for(execution.id);
    let started = envelopes.iter().filter(|e| e.event_type == "node_started").count();
    let retrying = envelopes.iter().filter(|e| e.event_type == "node_retrying").count();
    assert_eq!(started, 3);
    assert_eq!(retrying, 2);

    let delays: Vec<_> = envelopes
        .iter()
        .filter(|e| e.event_type == "node_retrying")
        .filter_map(|e| e.retry_delay_ms)
        .collect();
    assert_eq!(delays.len(), 2);
    assert!(delays[0] >= 8 && delays[0] <= 15, "first retry delay ~10ms, got {}", delays[0]);
    assert!(delays[1] >= 15 && delays[1] <= 30, "second retry delay ~20ms, got {}", delays[1]);
}

// S6 — strict-mode failure: a permanently-failing middle node stops the pipeline.
#[tokio::test]
async fn s6_strict_mode_stops_downstream_nodes() {
    let nodes = vec![
        Node::new("A", "transform", json!({"expr": "1"})),
        Node::new("B", "boom", json!({})),
        Node::new("C", "transform", json!({"expr": "1"})),
    ];
    let edges = vec![Edge::new("e1", "A", "B"), Edge::new("e2", "B", "C")];
    let workflow = Workflow::new("strict", nodes, edges);

    let registry = registry_with(vec![
        Arc::new(TransformAdapter),
        Arc::new(PermanentFailureAdapter { kind: "boom".to_string() }),
    ]);
    let trace = Arc::new(InMemoryTraceObserver::new());
    let mut observers = ObserverBus::new();
    observers.register(trace.clone());
    let policy = PolicyBundle::default().with_strict_mode(true);
    let (scheduler, store) = scheduler(registry, observers, policy);

    let execution = scheduler.execute_workflow(&workflow, manual_trigger(), Value::Null).await.unwrap();
    assert_eq!(execution.phase, ExecutionPhase::Failed);

    let node_executions = store.find_for_execution(execution.id).await.unwrap();
    assert!(node_executions.iter().all(|ne| ne.node_logical_id != "C"), "C should never have run");

    let envelopes = trace.trace_for(execution.id);
    let c_started = envelopes
        .iter()
        .any(|e| e.event_type == "node_started" && e.node_name.as_deref() == Some("C"));
    assert!(!c_started, "no NodeStarted event should be emitted for C");
}

#[allow(dead_code)]
fn _unused_id() -> Uuid {
    Uuid::now_v7()
}
