//! Durable storage for workflows, executions, and their event logs (§4.8, §4.9, §6)
//!
//! This crate ships only the in-memory implementation ([`InMemoryStore`]);
//! the trait boundary (`WorkflowStore`/`ExecutionStore`/`NodeExecutionStore`/
//! `EventStore`) is designed so a SQL-backed store can be added later
//! without touching the Scheduler.

mod memory;
mod store;

pub use memory::InMemoryStore;
pub use store::{
    EventStore, ExecutionFilter, ExecutionStore, NodeExecutionStore, Pagination, Statistics,
    StoreError, WorkflowStore,
};
