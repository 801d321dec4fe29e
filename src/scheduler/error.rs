//! Scheduler errors

use uuid::Uuid;

use crate::dag::DagError;
use crate::persistence::StoreError;

/// Execution-level errors that propagate out of [`super::Scheduler::execute_workflow`]
/// (§7 — per-node errors are recovered locally and never reach this type).
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("workflow failed validation: {0}")]
    Validation(#[from] DagError),

    #[error("execution {0} was cancelled")]
    Cancelled(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}
