//! Adapter outcome classification

use serde_json::Value;

/// The result of one Node Executor Adapter invocation (§4.6, §7).
///
/// Only [`AdapterOutcome::Transient`] is subject to the Retry Policy;
/// [`AdapterOutcome::Permanent`] fails the node immediately.
#[derive(Debug, Clone)]
pub enum AdapterOutcome {
    Ok(Value),
    Transient(String),
    Permanent(String),
}

impl AdapterOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Transient(msg) | Self::Permanent(msg) => Some(msg),
        }
    }
}
