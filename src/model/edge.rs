//! Edge definition

use uuid::Uuid;

/// A loop-edge specification: the scheduler re-enters the target node up to
/// `max_iterations` times, injecting `loop.iteration` (0-based) into the
/// Variable Store before each re-entry (see `SPEC_FULL.md` §9).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LoopSpec {
    pub max_iterations: u32,
}

/// A directed, optionally conditional relation between two nodes, addressed
/// by their logical ids.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Edge {
    pub id: Uuid,
    pub logical_id: String,
    pub from_logical_id: String,
    pub to_logical_id: String,
    /// Expression evaluated against the Variable Store at the moment the
    /// target node becomes eligible; absent means unconditional.
    pub condition: Option<String>,
    pub loop_spec: Option<LoopSpec>,
}

impl Edge {
    pub fn new(logical_id: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            logical_id: logical_id.into(),
            from_logical_id: from.into(),
            to_logical_id: to.into(),
            condition: None,
            loop_spec: None,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_loop(mut self, max_iterations: u32) -> Self {
        self.loop_spec = Some(LoopSpec { max_iterations });
        self
    }
}
