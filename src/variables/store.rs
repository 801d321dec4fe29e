//! Variable Store implementation

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{Map, Value};

/// Result of a dotted-path [`VariableStore::get`] lookup.
///
/// Missing paths are a typed "absent" result, never a fault — §4.1 is
/// explicit that traversal never raises an error for an unknown key.
#[derive(Debug, Clone, PartialEq)]
pub enum PathLookup {
    Found(Value),
    Absent,
}

impl PathLookup {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Found(v) => v,
            Self::Absent => Value::Null,
        }
    }
}

/// A notification hook fired synchronously after every [`VariableStore::set`].
/// The Scheduler wires this to the Observer Bus's `VariableSet` dispatch; the
/// store itself has no notion of observers (§9 — the bus is a list of
/// lifecycle-capability implementations, not a privileged dependency).
pub type ChangeHook = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Thread-safe map of execution variables with dotted-path get/set.
///
/// Has no notion of ownership or scoping beyond a single execution — one
/// store is created per [`crate::model::Execution`] and dropped with it.
pub struct VariableStore {
    values: RwLock<Map<String, Value>>,
    on_set: RwLock<Option<ChangeHook>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(Map::new()),
            on_set: RwLock::new(None),
        }
    }

    /// Seed the store from an initial JSON object (e.g. `initialVariables`).
    pub fn from_initial(initial: Value) -> Self {
        let store = Self::new();
        if let Value::Object(map) = initial {
            *store.values.write() = map;
        }
        store
    }

    /// Register the hook invoked on every `set`. Intended to be called once,
    /// before the execution's wave loop starts.
    pub fn set_change_hook(&self, hook: ChangeHook) {
        *self.on_set.write() = Some(hook);
    }

    /// Dotted-path lookup, e.g. `user.status` or `items.0.name`. Traverses
    /// nested objects and arrays; any unresolved segment yields
    /// [`PathLookup::Absent`].
    pub fn get(&self, path: &str) -> PathLookup {
        let values = self.values.read();
        let mut current: Option<&Value> = None;
        for (i, segment) in path.split('.').enumerate() {
            let next = if i == 0 {
                values.get(segment)
            } else {
                match current {
                    Some(Value::Object(map)) => map.get(segment),
                    Some(Value::Array(arr)) => segment.parse::<usize>().ok().and_then(|idx| arr.get(idx)),
                    _ => None,
                }
            };
            match next {
                Some(v) => current = Some(v),
                None => return PathLookup::Absent,
            }
        }
        match current {
            Some(v) => PathLookup::Found(v.clone()),
            None => PathLookup::Absent,
        }
    }

    /// Top-level assignment. Nested paths are set by replacing the root
    /// value at `key`'s first segment, per §4.1 — this store does not
    /// support partial nested writes.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.values.write().insert(key.clone(), value.clone());
        if let Some(hook) = self.on_set.read().as_ref() {
            hook(&key, &value);
        }
    }

    /// A consistent copy of all keys, suitable for handing to a read-only
    /// adapter context or for persisting an execution's final variable
    /// snapshot.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.values.read().clone())
    }
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_get_top_level() {
        let store = VariableStore::new();
        store.set("x", json!(10));
        assert_eq!(store.get("x"), PathLookup::Found(json!(10)));
    }

    #[test]
    fn test_get_missing_is_absent_not_error() {
        let store = VariableStore::new();
        assert_eq!(store.get("nope"), PathLookup::Absent);
        assert_eq!(store.get("nope.deeper.still"), PathLookup::Absent);
    }

    #[test]
    fn test_get_nested_dotted_path() {
        let store = VariableStore::new();
        store.set("user", json!({"status": "active", "tags": ["a", "b"]}));
        assert_eq!(store.get("user.status"), PathLookup::Found(json!("active")));
        assert_eq!(store.get("user.tags.1"), PathLookup::Found(json!("b")));
        assert_eq!(store.get("user.missing"), PathLookup::Absent);
    }

    #[test]
    fn test_snapshot_is_consistent_copy() {
        let store = VariableStore::new();
        store.set("a", json!(1));
        let snap = store.snapshot();
        store.set("a", json!(2));
        assert_eq!(snap, json!({"a": 1}));
        assert_eq!(store.snapshot(), json!({"a": 2}));
    }

    #[test]
    fn test_from_initial_seeds_values() {
        let store = VariableStore::from_initial(json!({"input": 5}));
        assert_eq!(store.get("input"), PathLookup::Found(json!(5)));
    }

    #[test]
    fn test_change_hook_fires_on_set() {
        let store = VariableStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        store.set_change_hook(Arc::new(move |_key, _value| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        }));
        store.set("x", json!(1));
        store.set("y", json!(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
