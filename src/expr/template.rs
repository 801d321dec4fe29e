//! Template substitution mode (`{{expr}}` fragments)

use serde_json::Value;

use super::error::ExpressionError;
use super::{eval, lexer, parser};
use crate::variables::VariableStore;

struct Fragment<'a> {
    text: &'a str,
    is_expr: bool,
}

fn split_fragments(text: &str) -> Result<Vec<Fragment<'_>>, ExpressionError> {
    let mut fragments = Vec::new();
    let mut rest = text;
    loop {
        match rest.find("{{") {
            None => {
                if !rest.is_empty() {
                    fragments.push(Fragment { text: rest, is_expr: false });
                }
                break;
            }
            Some(start) => {
                if start > 0 {
                    fragments.push(Fragment { text: &rest[..start], is_expr: false });
                }
                let after_open = &rest[start + 2..];
                match after_open.find("}}") {
                    None => return Err(ExpressionError::UnterminatedFragment(text.to_string())),
                    Some(end) => {
                        fragments.push(Fragment { text: &after_open[..end], is_expr: true });
                        rest = &after_open[end + 2..];
                    }
                }
            }
        }
    }
    Ok(fragments)
}

fn eval_fragment(expr_text: &str, store: &VariableStore) -> Result<Value, ExpressionError> {
    let trimmed = expr_text.trim();
    let tokens = lexer::tokenize(trimmed)?;
    let ast = parser::parse(&tokens, trimmed)?;
    let result = eval::eval(&ast, store)?;
    Ok(result.into_value())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Substitute every `{{expr}}` fragment in `text` against `store`.
///
/// If `text` is exactly one fragment (nothing before or after `{{ }}`), the
/// fragment's raw typed value is returned (numbers, objects, and arrays
/// survive intact). Otherwise every fragment is stringified and spliced
/// back into the surrounding text, and the result is a JSON string.
pub fn substitute_template(text: &str, store: &VariableStore) -> Result<Value, ExpressionError> {
    let fragments = split_fragments(text)?;

    if fragments.len() == 1 && fragments[0].is_expr {
        return eval_fragment(fragments[0].text, store);
    }

    let mut out = String::new();
    for fragment in &fragments {
        if fragment.is_expr {
            let value = eval_fragment(fragment.text, store)?;
            out.push_str(&stringify(&value));
        } else {
            out.push_str(fragment.text);
        }
    }
    Ok(Value::String(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whole_string_fragment_preserves_type() {
        let store = VariableStore::from_initial(json!({"count": 5}));
        let result = substitute_template("{{count}}", &store).unwrap();
        assert_eq!(result, json!(5));
    }

    #[test]
    fn test_whole_string_fragment_preserves_object() {
        let store = VariableStore::from_initial(json!({"user": {"id": 1}}));
        let result = substitute_template("{{user}}", &store).unwrap();
        assert_eq!(result, json!({"id": 1}));
    }

    #[test]
    fn test_mixed_text_stringifies_fragments() {
        let store = VariableStore::from_initial(json!({"name": "Ada", "count": 3}));
        let result = substitute_template("Hello {{name}}, you have {{count}} items", &store).unwrap();
        assert_eq!(result, json!("Hello Ada, you have 3 items"));
    }

    #[test]
    fn test_no_fragments_returns_literal_string() {
        let store = VariableStore::new();
        let result = substitute_template("plain text", &store).unwrap();
        assert_eq!(result, json!("plain text"));
    }

    #[test]
    fn test_unterminated_fragment_errors() {
        let store = VariableStore::new();
        assert!(substitute_template("hello {{name", &store).is_err());
    }

    #[test]
    fn test_absent_fragment_stringifies_empty() {
        let store = VariableStore::new();
        let result = substitute_template("value=[{{missing}}]", &store).unwrap();
        assert_eq!(result, json!("value=[]"));
    }
}
