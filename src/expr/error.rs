//! Expression evaluation errors

/// Raised when template or predicate evaluation fails. Carries the
/// offending text per §4.2; the Scheduler treats this as a `permanent` node
/// failure (§7).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExpressionError {
    #[error("unexpected character '{0}' in expression: {1}")]
    UnexpectedChar(char, String),

    #[error("unterminated string literal in expression: {0}")]
    UnterminatedString(String),

    #[error("unexpected end of expression: {0}")]
    UnexpectedEof(String),

    #[error("unexpected token '{0}' in expression: {1}")]
    UnexpectedToken(String, String),

    #[error("trailing tokens after expression: {0}")]
    TrailingTokens(String),

    #[error("cannot apply operator '{op}' to non-numeric operand in: {expr}")]
    NotNumeric { op: &'static str, expr: String },

    #[error("unterminated template fragment (missing '}}}}') in: {0}")]
    UnterminatedFragment(String),
}
