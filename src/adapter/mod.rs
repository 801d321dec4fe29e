//! Node Executor Adapter contract
//!
//! The uniform interface the Scheduler invokes for every node kind (§6),
//! plus the registry that maps kind tags to adapters (§9) and the handful
//! of built-in adapters the engine ships with. Grounded on the teacher's
//! `Activity`/`ActivityContext`/`ActivityError` trio and `WorkerPool`'s
//! handler map, generalized from "activity type string" to "node kind tag"
//! and from a `Result<Output, ActivityError>` return to the three-way
//! [`AdapterOutcome`] the spec calls for.

mod builtin;
mod context;
mod outcome;
mod registry;
mod trait_def;

pub use builtin::{PassthroughAdapter, TransformAdapter};
pub use context::{CancellationHandle, NodeExecutionContext};
pub use outcome::AdapterOutcome;
pub use registry::NodeRegistry;
pub use trait_def::NodeAdapter;
