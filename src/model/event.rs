//! Execution event log record
//!
//! Distinct from the [`crate::observability`] lifecycle envelope: this is
//! the durable, append-only audit record written by the [`crate::persistence::EventStore`]
//! (`SPEC_FULL.md` §4.8), not the wire format POSTed to observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One entry in an execution's append-only event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub execution_id: Uuid,
    /// Dense, 1-based, monotonic per execution; assigned at append time.
    pub sequence_number: u64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub payload: Value,
}

impl ExecutionEvent {
    pub fn new(execution_id: Uuid, sequence_number: u64, event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            execution_id,
            sequence_number,
            timestamp: Utc::now(),
            event_type: event_type.into(),
            payload,
        }
    }
}
