//! # Fluxion Workflow Engine
//!
//! A data-driven DAG workflow orchestration engine: nodes and edges define a
//! directed acyclic graph, the Scheduler walks it wave by wave with
//! fork/join parallelism, and a pluggable Node Executor Adapter contract
//! lets the host application supply the actual work each node kind does.
//!
//! ## Features
//!
//! - **DAG-of-nodes model**: workflows are data (nodes + edges + triggers),
//!   not Rust types — see [`model::Workflow`]
//! - **Wave-based fork/join scheduling**: independent nodes in the same
//!   topological wave run concurrently, bounded by a configurable
//!   parallelism limit — see [`scheduler::Scheduler`]
//! - **Variable Store + expression language**: dotted-path variables and a
//!   small predicate/template language drive edge conditions and node
//!   config resolution — see [`variables`] and [`expr`]
//! - **Automatic retries and circuit breakers**: exponential backoff with
//!   jitter per node, circuit breaking per node kind — see [`reliability`]
//! - **Observer Bus**: pluggable lifecycle observers (logging, metrics,
//!   in-memory trace, HTTP callback) — see [`observability`]
//! - **Event-sourced, smart-merge persistence**: append-only execution event
//!   log plus a workflow store that preserves stable node/edge identity
//!   across updates — see [`persistence`]
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Scheduler                            │
//! │  (DAG analysis, wave loop, retry/circuit-breaker, adapters) │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┼───────────────┐
//!              ▼               ▼               ▼
//! ┌─────────────────┐ ┌────────────────┐ ┌──────────────────┐
//! │  VariableStore   │ │  ObserverBus   │ │  Persistence      │
//! │  (expr-driven)   │ │  (lifecycle)   │ │  (store + events) │
//! └─────────────────┘ └────────────────┘ └──────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use fluxion_engine::prelude::*;
//! use std::sync::Arc;
//!
//! let mut registry = NodeRegistry::new();
//! registry.register(Arc::new(PassthroughAdapter::new("start")));
//!
//! let store: Arc<InMemoryStore> = Arc::new(InMemoryStore::default());
//! let scheduler = Scheduler::new(
//!     registry,
//!     ObserverBus::new(),
//!     store.clone(),
//!     store.clone(),
//!     store,
//!     PolicyBundle::default(),
//! );
//! ```

pub mod adapter;
pub mod dag;
pub mod expr;
pub mod model;
pub mod observability;
pub mod persistence;
pub mod reliability;
pub mod scheduler;
pub mod variables;

/// Prelude for common imports
pub mod prelude {
    pub use crate::adapter::{
        AdapterOutcome, CancellationHandle, NodeAdapter, NodeExecutionContext, NodeRegistry,
        PassthroughAdapter, TransformAdapter,
    };
    pub use crate::dag::{Dag, DagError};
    pub use crate::expr::{evaluate, evaluate_predicate, substitute_template, ExpressionError};
    pub use crate::model::{
        Edge, Execution, ExecutionEvent, ExecutionPhase, LoopSpec, Node, NodeExecution,
        NodeExecutionPhase, Trigger, TriggerKind, Workflow, WorkflowStatus,
    };
    pub use crate::observability::{
        EventEnvelope, HttpCallbackObserver, InMemoryTraceObserver, Level, LoggingObserver,
        MetricsObserver, MetricsSnapshot, Observer, ObserverBus, ObserverEvent,
    };
    pub use crate::persistence::{
        EventStore, ExecutionFilter, ExecutionStore, InMemoryStore, NodeExecutionStore,
        Pagination, Statistics, StoreError, WorkflowStore,
    };
    pub use crate::reliability::{
        CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerPermit,
        CircuitState, RetryPolicy,
    };
    pub use crate::scheduler::{PolicyBundle, Scheduler, SchedulerError};
    pub use crate::variables::{PathLookup, VariableStore};
}

// Re-export key types at crate root
pub use adapter::{AdapterOutcome, NodeAdapter, NodeExecutionContext, NodeRegistry};
pub use dag::{Dag, DagError};
pub use model::{Edge, Execution, Node, NodeExecution, Trigger, Workflow};
pub use observability::{ObserverBus, ObserverEvent};
pub use persistence::{InMemoryStore, StoreError};
pub use reliability::{CircuitBreakerConfig, RetryPolicy};
pub use scheduler::{PolicyBundle, Scheduler, SchedulerError};
pub use variables::VariableStore;
