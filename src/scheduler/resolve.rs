//! Node config resolution — template-substitutes every leaf string in a
//! node's config tree against the Variable Store (§4.4 step 3c).

use serde_json::{Map, Value};

use crate::expr::{substitute_template, ExpressionError};
use crate::variables::VariableStore;

pub fn resolve_config(config: &Value, store: &VariableStore) -> Result<Value, ExpressionError> {
    match config {
        Value::String(text) => substitute_template(text, store),
        Value::Array(items) => {
            let resolved = items.iter().map(|item| resolve_config(item, store)).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(resolved))
        }
        Value::Object(map) => {
            let mut resolved = Map::with_capacity(map.len());
            for (key, value) in map {
                resolved.insert(key.clone(), resolve_config(value, store)?);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolves_nested_leaves() {
        let store = VariableStore::new();
        store.set("user", json!({"name": "ada"}));
        let config = json!({"greeting": "hello {{user.name}}", "tags": ["static", "{{user.name}}"]});
        let resolved = resolve_config(&config, &store).unwrap();
        assert_eq!(resolved, json!({"greeting": "hello ada", "tags": ["static", "ada"]}));
    }

    #[test]
    fn test_non_string_leaves_pass_through() {
        let store = VariableStore::new();
        let config = json!({"count": 3, "enabled": true, "nothing": null});
        assert_eq!(resolve_config(&config, &store).unwrap(), config);
    }
}
