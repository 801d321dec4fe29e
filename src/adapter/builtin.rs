//! Built-in adapters for the node kinds the engine ships out of the box
//!
//! Everything beyond `transform`/`start`/`end`/`passthrough` (e.g. `http`,
//! `llm`) is a named external collaborator per §1 — host applications
//! register their own [`super::NodeAdapter`] for those kinds.

use async_trait::async_trait;
use serde_json::Value;

use crate::expr;
use crate::variables::VariableStore;

use super::context::NodeExecutionContext;
use super::outcome::AdapterOutcome;
use super::trait_def::NodeAdapter;

/// Evaluates `config.expr` against the node's variable snapshot and
/// returns the typed result as the node's output.
pub struct TransformAdapter;

#[async_trait]
impl NodeAdapter for TransformAdapter {
    fn kind(&self) -> &str {
        "transform"
    }

    async fn execute(&self, ctx: &NodeExecutionContext, config: Value) -> AdapterOutcome {
        let Some(expr_text) = config.get("expr").and_then(Value::as_str) else {
            return AdapterOutcome::Permanent("transform node config missing 'expr'".to_string());
        };
        let store = VariableStore::from_initial(ctx.variables.clone());
        match expr::evaluate(expr_text, &store) {
            Ok(value) => AdapterOutcome::Ok(value),
            Err(err) => AdapterOutcome::Permanent(err.to_string()),
        }
    }
}

/// No-op adapter for `start`/`end` marker nodes and any kind that only
/// exists to shape the DAG.
pub struct PassthroughAdapter {
    kind: String,
}

impl PassthroughAdapter {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }
}

#[async_trait]
impl NodeAdapter for PassthroughAdapter {
    fn kind(&self) -> &str {
        &self.kind
    }

    async fn execute(&self, _ctx: &NodeExecutionContext, config: Value) -> AdapterOutcome {
        AdapterOutcome::Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn ctx(vars: Value) -> NodeExecutionContext {
        NodeExecutionContext::new(Uuid::now_v7(), Uuid::now_v7(), "n", 1, 1, vars)
    }

    #[tokio::test]
    async fn test_transform_evaluates_expr() {
        let adapter = TransformAdapter;
        let outcome = adapter
            .execute(&ctx(json!({"input": 5})), json!({"expr": "input * 2"}))
            .await;
        assert!(matches!(outcome, AdapterOutcome::Ok(v) if v == json!(10.0)));
    }

    #[tokio::test]
    async fn test_transform_missing_expr_is_permanent() {
        let adapter = TransformAdapter;
        let outcome = adapter.execute(&ctx(Value::Null), json!({})).await;
        assert!(matches!(outcome, AdapterOutcome::Permanent(_)));
    }

    #[tokio::test]
    async fn test_passthrough_echoes_config() {
        let adapter = PassthroughAdapter::new("start");
        let outcome = adapter.execute(&ctx(Value::Null), json!({"x": 1})).await;
        assert!(matches!(outcome, AdapterOutcome::Ok(v) if v == json!({"x": 1})));
    }
}
