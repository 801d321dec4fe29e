//! Node Registry — maps node-kind tags to adapters

use std::collections::HashMap;
use std::sync::Arc;

use super::trait_def::NodeAdapter;

/// Registry of [`NodeAdapter`] implementations keyed by kind tag.
///
/// New kinds register at engine construction time (§9 "closed tagged-variant
/// representation... new kinds register a factory at engine construction
/// time"); lookups happen on the hot path so reads never block each other.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    adapters: HashMap<String, Arc<dyn NodeAdapter>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self { adapters: HashMap::new() }
    }

    pub fn register(&mut self, adapter: Arc<dyn NodeAdapter>) -> &mut Self {
        self.adapters.insert(adapter.kind().to_string(), adapter);
        self
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn NodeAdapter>> {
        self.adapters.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.adapters.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterOutcome, NodeExecutionContext};
    use async_trait::async_trait;
    use serde_json::Value;

    struct EchoAdapter;

    #[async_trait]
    impl NodeAdapter for EchoAdapter {
        fn kind(&self) -> &str {
            "echo"
        }

        async fn execute(&self, _ctx: &NodeExecutionContext, config: Value) -> AdapterOutcome {
            AdapterOutcome::Ok(config)
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = NodeRegistry::new();
        registry.register(Arc::new(EchoAdapter));
        assert!(registry.contains("echo"));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_registered_adapter_executes() {
        let mut registry = NodeRegistry::new();
        registry.register(Arc::new(EchoAdapter));
        let adapter = registry.get("echo").unwrap();
        let ctx = NodeExecutionContext::new(
            uuid::Uuid::now_v7(),
            uuid::Uuid::now_v7(),
            "n1",
            1,
            1,
            Value::Null,
        );
        let outcome = adapter.execute(&ctx, Value::String("hi".into())).await;
        assert!(matches!(outcome, AdapterOutcome::Ok(Value::String(s)) if s == "hi"));
    }
}
