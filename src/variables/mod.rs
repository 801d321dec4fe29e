//! Variable Store
//!
//! Thread-safe, per-execution key→value context used by the Expression
//! Evaluator and the Scheduler (`SPEC_FULL.md` §4.1).

mod store;

pub use store::{PathLookup, VariableStore};
