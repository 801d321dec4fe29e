//! Trigger definition

use serde_json::Value;
use uuid::Uuid;

/// What caused an execution to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Manual,
    Schedule,
    Webhook,
    Event,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Schedule => write!(f, "schedule"),
            Self::Webhook => write!(f, "webhook"),
            Self::Event => write!(f, "event"),
        }
    }
}

/// A trigger definition owned by a workflow. `enabled = false` triggers are
/// retained but never fire.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Trigger {
    pub id: Uuid,
    pub kind: TriggerKind,
    pub config: Value,
    pub enabled: bool,
}

impl Trigger {
    pub fn new(kind: TriggerKind, config: Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            config,
            enabled: true,
        }
    }
}
