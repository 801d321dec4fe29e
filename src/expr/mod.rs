//! Expression Evaluator
//!
//! Two modes over the [`crate::variables::VariableStore`] (`SPEC_FULL.md` §4.2):
//! - [`substitute_template`] — `{{expr}}` fragment substitution, type-preserving
//!   when the whole string is a single fragment.
//! - [`evaluate`] — the safe predicate/arithmetic expression language used for
//!   edge conditions and inside template fragments.
//!
//! Neither mode performs I/O or has side effects; both are pure functions of
//! the current Variable Store snapshot.

mod ast;
mod error;
mod eval;
mod lexer;
mod parser;
mod template;

pub use error::ExpressionError;
pub use template::substitute_template;

use crate::variables::VariableStore;
use serde_json::Value;

/// Evaluate a single expression (no `{{ }}` wrapper) against the store,
/// returning its typed result. Used for edge conditions and for the body of
/// a template fragment.
pub fn evaluate(expr_text: &str, store: &VariableStore) -> Result<Value, ExpressionError> {
    let tokens = lexer::tokenize(expr_text)?;
    let ast = parser::parse(&tokens, expr_text)?;
    let result = eval::eval(&ast, store)?;
    Ok(eval::EvalValue::into_value(result))
}

/// Evaluate an expression as a boolean predicate. Absent/unresolved operands
/// and evaluation of `null` yield `false`, never an error, per §4.2.
pub fn evaluate_predicate(expr_text: &str, store: &VariableStore) -> Result<bool, ExpressionError> {
    let tokens = lexer::tokenize(expr_text)?;
    let ast = parser::parse(&tokens, expr_text)?;
    let result = eval::eval(&ast, store)?;
    Ok(result.as_bool())
}
