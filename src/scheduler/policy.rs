//! Policy bundle — the tunables an `ExecuteWorkflow` call is parameterized by

use std::time::Duration;

use crate::reliability::RetryPolicy;

/// Max parallelism, retry policy, timeout defaults, and the strict-mode flag
/// (§4.4 "Inputs"). One bundle is shared by every node in an execution;
/// per-node overrides (timeout, retry) are read from the node's own config
/// where present.
#[derive(Debug, Clone)]
pub struct PolicyBundle {
    pub max_parallelism: usize,
    pub retry_policy: RetryPolicy,
    pub default_node_timeout: Option<Duration>,
    pub strict_mode: bool,
    /// Per §9: whether a per-node timeout is classified as a transient
    /// failure (subject to retry) or permanent. Defaults to `true`.
    pub timeout_is_transient: bool,
}

impl Default for PolicyBundle {
    fn default() -> Self {
        Self {
            max_parallelism: 8,
            retry_policy: RetryPolicy::default(),
            default_node_timeout: Some(Duration::from_secs(30)),
            strict_mode: false,
            timeout_is_transient: true,
        }
    }
}

impl PolicyBundle {
    pub fn with_max_parallelism(mut self, max_parallelism: usize) -> Self {
        self.max_parallelism = max_parallelism;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_strict_mode(mut self, strict_mode: bool) -> Self {
        self.strict_mode = strict_mode;
        self
    }
}
