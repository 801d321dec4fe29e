//! DAG Analyzer errors

/// A `ValidationError` (§7) raised while analyzing a workflow's nodes/edges.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DagError {
    #[error("cycle detected: {0}")]
    CycleDetected(String),

    #[error("edge '{edge}' references unknown node '{node}'")]
    DanglingEdgeEndpoint { edge: String, node: String },

    #[error("duplicate logical node id '{0}'")]
    DuplicateNodeId(String),

    #[error("loop edge '{0}' must be a self-loop (from == to)")]
    InvalidLoopEdge(String),
}
