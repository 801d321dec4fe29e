//! Node definition

use serde_json::Value;
use uuid::Uuid;

/// A vertex in a workflow DAG.
///
/// `id` is the internal stable identifier: it never changes once assigned,
/// even across smart-merge workflow updates (see [`crate::persistence`]).
/// `logical_id` is the user-facing string id and the merge key during
/// workflow update — it is what edges reference and what adapters/tests
/// address the node by.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub id: Uuid,
    pub logical_id: String,
    pub name: String,
    /// Node-kind tag, e.g. `http`, `transform`, `llm`, `conditional-router`,
    /// `data-aggregator`, `json-parser`, `start`, `end`, `sub-workflow`.
    pub kind: String,
    /// Opaque kind-specific configuration; leaf strings may contain
    /// `{{expr}}` template fragments resolved at execution time.
    pub config: Value,
    /// Variable Store key the adapter's output is written under.
    /// Defaults to `<logical_id>_output` when absent.
    pub output_key: Option<String>,
    /// Layout hint only; never consulted by the scheduler.
    pub position: Option<(f64, f64)>,
}

impl Node {
    pub fn new(logical_id: impl Into<String>, kind: impl Into<String>, config: Value) -> Self {
        let logical_id = logical_id.into();
        Self {
            id: Uuid::now_v7(),
            name: logical_id.clone(),
            logical_id,
            kind: kind.into(),
            config,
            output_key: None,
            position: None,
        }
    }

    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    /// The key this node's successful output is stored under in the
    /// Variable Store.
    pub fn effective_output_key(&self) -> String {
        self.output_key
            .clone()
            .unwrap_or_else(|| format!("{}_output", self.logical_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_key() {
        let node = Node::new("fetch_user", "http", Value::Null);
        assert_eq!(node.effective_output_key(), "fetch_user_output");
    }

    #[test]
    fn test_explicit_output_key() {
        let node = Node::new("fetch_user", "http", Value::Null).with_output_key("user");
        assert_eq!(node.effective_output_key(), "user");
    }
}
