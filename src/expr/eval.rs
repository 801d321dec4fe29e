//! Evaluation of the expression AST against a Variable Store

use serde_json::Value;

use super::ast::{BinOp, Expr, UnOp};
use super::error::ExpressionError;
use crate::variables::{PathLookup, VariableStore};

/// Internal evaluation result. `Absent` represents an unresolved identifier;
/// per §4.2 this is never itself an error, but predicates over it yield
/// `false` and arithmetic over it is a hard evaluation failure.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Value(Value),
    Absent,
}

impl EvalValue {
    pub fn as_bool(&self) -> bool {
        match self {
            EvalValue::Absent => false,
            EvalValue::Value(Value::Null) => false,
            EvalValue::Value(Value::Bool(b)) => *b,
            EvalValue::Value(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            EvalValue::Value(Value::String(s)) => !s.is_empty(),
            EvalValue::Value(Value::Array(a)) => !a.is_empty(),
            EvalValue::Value(Value::Object(o)) => !o.is_empty(),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            EvalValue::Value(v) => v,
            EvalValue::Absent => Value::Null,
        }
    }

    fn as_f64(&self, op: &'static str, expr_text: &str) -> Result<f64, ExpressionError> {
        match self {
            EvalValue::Value(Value::Number(n)) => {
                n.as_f64().ok_or_else(|| ExpressionError::NotNumeric { op, expr: expr_text.to_string() })
            }
            _ => Err(ExpressionError::NotNumeric { op, expr: expr_text.to_string() }),
        }
    }
}

pub fn eval(expr: &Expr, store: &VariableStore) -> Result<EvalValue, ExpressionError> {
    match expr {
        Expr::Literal(v) => Ok(EvalValue::Value(v.clone())),
        Expr::Path(path) => Ok(match store.get(path) {
            PathLookup::Found(v) => EvalValue::Value(v),
            PathLookup::Absent => EvalValue::Absent,
        }),
        Expr::Unary(UnOp::Not, inner) => {
            let v = eval(inner, store)?;
            Ok(EvalValue::Value(Value::Bool(!v.as_bool())))
        }
        Expr::Unary(UnOp::Neg, inner) => {
            let v = eval(inner, store)?;
            let n = v.as_f64("-", "<unary minus>")?;
            Ok(EvalValue::Value(Value::from(-n)))
        }
        Expr::Binary(op, lhs, rhs) => eval_binary(*op, lhs, rhs, store),
    }
}

fn eval_binary(op: BinOp, lhs: &Expr, rhs: &Expr, store: &VariableStore) -> Result<EvalValue, ExpressionError> {
    match op {
        BinOp::And => {
            let l = eval(lhs, store)?;
            if !l.as_bool() {
                return Ok(EvalValue::Value(Value::Bool(false)));
            }
            let r = eval(rhs, store)?;
            Ok(EvalValue::Value(Value::Bool(r.as_bool())))
        }
        BinOp::Or => {
            let l = eval(lhs, store)?;
            if l.as_bool() {
                return Ok(EvalValue::Value(Value::Bool(true)));
            }
            let r = eval(rhs, store)?;
            Ok(EvalValue::Value(Value::Bool(r.as_bool())))
        }
        BinOp::Eq | BinOp::Ne => {
            let l = eval(lhs, store)?;
            let r = eval(rhs, store)?;
            let equal = match (&l, &r) {
                (EvalValue::Absent, EvalValue::Absent) => true,
                (EvalValue::Absent, _) | (_, EvalValue::Absent) => false,
                (EvalValue::Value(a), EvalValue::Value(b)) => values_equal(a, b),
            };
            let result = if matches!(op, BinOp::Eq) { equal } else { !equal };
            Ok(EvalValue::Value(Value::Bool(result)))
        }
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let l = eval(lhs, store)?;
            let r = eval(rhs, store)?;
            if matches!(l, EvalValue::Absent) || matches!(r, EvalValue::Absent) {
                return Ok(EvalValue::Value(Value::Bool(false)));
            }
            let ordering = compare_values(&l.clone().into_value(), &r.clone().into_value());
            let result = match (op, ordering) {
                (BinOp::Lt, Some(std::cmp::Ordering::Less)) => true,
                (BinOp::Le, Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)) => true,
                (BinOp::Gt, Some(std::cmp::Ordering::Greater)) => true,
                (BinOp::Ge, Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)) => true,
                _ => false,
            };
            Ok(EvalValue::Value(Value::Bool(result)))
        }
        BinOp::In => {
            let l = eval(lhs, store)?;
            let r = eval(rhs, store)?;
            if matches!(l, EvalValue::Absent) || matches!(r, EvalValue::Absent) {
                return Ok(EvalValue::Value(Value::Bool(false)));
            }
            let needle = l.into_value();
            let haystack = r.into_value();
            let found = match haystack {
                Value::Array(items) => items.iter().any(|v| values_equal(v, &needle)),
                Value::String(s) => match needle {
                    Value::String(n) => s.contains(&n),
                    _ => false,
                },
                Value::Object(map) => match needle {
                    Value::String(key) => map.contains_key(&key),
                    _ => false,
                },
                _ => false,
            };
            Ok(EvalValue::Value(Value::Bool(found)))
        }
        BinOp::Add => {
            let l = eval(lhs, store)?;
            let r = eval(rhs, store)?;
            match (&l, &r) {
                (EvalValue::Value(Value::String(_)), _) | (_, EvalValue::Value(Value::String(_))) => {
                    Ok(EvalValue::Value(Value::String(format!(
                        "{}{}",
                        stringify(&l),
                        stringify(&r)
                    ))))
                }
                _ => {
                    let a = l.as_f64("+", "<add>")?;
                    let b = r.as_f64("+", "<add>")?;
                    Ok(EvalValue::Value(Value::from(a + b)))
                }
            }
        }
        BinOp::Sub => arith(lhs, rhs, store, "-", |a, b| a - b),
        BinOp::Mul => arith(lhs, rhs, store, "*", |a, b| a * b),
        BinOp::Div => arith(lhs, rhs, store, "/", |a, b| a / b),
    }
}

fn arith(
    lhs: &Expr,
    rhs: &Expr,
    store: &VariableStore,
    op: &'static str,
    f: impl Fn(f64, f64) -> f64,
) -> Result<EvalValue, ExpressionError> {
    let l = eval(lhs, store)?;
    let r = eval(rhs, store)?;
    let a = l.as_f64(op, op)?;
    let b = r.as_f64(op, op)?;
    Ok(EvalValue::Value(Value::from(f(a, b))))
}

fn stringify(v: &EvalValue) -> String {
    match v {
        EvalValue::Absent => String::new(),
        EvalValue::Value(Value::String(s)) => s.clone(),
        EvalValue::Value(other) => other.to_string(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    a == b
}

fn compare_values(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{evaluate, evaluate_predicate};
    use serde_json::json;

    #[test]
    fn test_arithmetic_preserves_type() {
        let store = VariableStore::from_initial(json!({"input": 5}));
        let result = evaluate("input * 2", &store).unwrap();
        assert_eq!(result, json!(10.0));
    }

    #[test]
    fn test_string_concat() {
        let store = VariableStore::from_initial(json!({"x": 10}));
        let result = evaluate("'value=' + x", &store).unwrap();
        assert_eq!(result, json!("value=10"));
    }

    #[test]
    fn test_predicate_equality() {
        let store = VariableStore::from_initial(json!({"status": "active"}));
        assert!(evaluate_predicate("status == 'active'", &store).unwrap());
        assert!(!evaluate_predicate("status == 'inactive'", &store).unwrap());
    }

    #[test]
    fn test_predicate_over_absent_is_false() {
        let store = VariableStore::new();
        assert!(!evaluate_predicate("missing == 'x'", &store).unwrap());
        assert!(!evaluate_predicate("missing", &store).unwrap());
        assert!(!evaluate_predicate("missing > 1", &store).unwrap());
    }

    #[test]
    fn test_logical_and_or_not() {
        let store = VariableStore::from_initial(json!({"a": true, "b": false}));
        assert!(evaluate_predicate("a && !b", &store).unwrap());
        assert!(evaluate_predicate("a || b", &store).unwrap());
        assert!(!evaluate_predicate("!a", &store).unwrap());
    }

    #[test]
    fn test_membership() {
        let store = VariableStore::from_initial(json!({"roles": ["admin", "user"]}));
        assert!(evaluate_predicate("'admin' in roles", &store).unwrap());
        assert!(!evaluate_predicate("'guest' in roles", &store).unwrap());
    }

    #[test]
    fn test_field_access_chain() {
        let store = VariableStore::from_initial(json!({"user": {"profile": {"age": 30}}}));
        let result = evaluate("user.profile.age", &store).unwrap();
        assert_eq!(result, json!(30));
        assert!(evaluate_predicate("user.profile.age >= 18", &store).unwrap());
    }
}
