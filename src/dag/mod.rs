//! DAG Analyzer
//!
//! Validates acyclicity and computes topological waves for a workflow's
//! nodes and edges (`SPEC_FULL.md` §4.3). Grounded on the level-iteration
//! shape of a parallel task-DAG executor in the retrieval pack, adapted to
//! use DFS with a recursion-stack marker for cycle detection as the spec
//! requires (the pack example used Kahn's algorithm for that part).

mod analyzer;
mod error;

pub use analyzer::Dag;
pub use error::DagError;
