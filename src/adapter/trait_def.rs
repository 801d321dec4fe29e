//! Node Executor Adapter contract

use async_trait::async_trait;
use serde_json::Value;

use super::context::NodeExecutionContext;
use super::outcome::AdapterOutcome;

/// The uniform interface the Scheduler invokes for every node kind (§6).
///
/// Implementations must be safe to invoke concurrently — the engine does
/// not serialize across adapter invocations, including multiple concurrent
/// invocations of the same adapter for different nodes or executions.
#[async_trait]
pub trait NodeAdapter: Send + Sync + 'static {
    /// The node-kind tag this adapter handles, e.g. `http`, `transform`.
    fn kind(&self) -> &str;

    /// Execute with fully resolved (template-substituted) config.
    async fn execute(&self, ctx: &NodeExecutionContext, config: Value) -> AdapterOutcome;
}
