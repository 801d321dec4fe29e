//! Reliability patterns for node execution
//!
//! This module provides:
//! - [`RetryPolicy`] - Configurable retry with exponential backoff
//! - [`CircuitBreakerConfig`] / [`CircuitBreaker`] - per-node-kind circuit breaking

mod circuit_breaker;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerPermit, CircuitState};
pub use retry::RetryPolicy;
