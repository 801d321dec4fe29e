//! DAG construction, cycle detection, and wave computation

use std::collections::{HashMap, HashSet};

use crate::model::{Edge, Node};

use super::error::DagError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// The analyzed shape of a workflow: adjacency by logical node id plus the
/// ordered list of topological waves.
#[derive(Debug, Clone)]
pub struct Dag {
    /// Logical node ids in the order nodes were declared — the tie-break
    /// order within a wave (§4.4 "stable logical-id order").
    node_order: Vec<String>,
    successors: HashMap<String, Vec<String>>,
    predecessors: HashMap<String, Vec<String>>,
    waves: Vec<Vec<String>>,
    wave_of: HashMap<String, u32>,
}

impl Dag {
    /// Build and fully validate a DAG from a workflow's nodes and edges.
    /// Returns [`DagError::DanglingEdgeEndpoint`] / [`DagError::DuplicateNodeId`]
    /// for malformed input and [`DagError::CycleDetected`] for a cyclic graph.
    pub fn build(nodes: &[Node], edges: &[Edge]) -> Result<Self, DagError> {
        let mut node_order = Vec::with_capacity(nodes.len());
        let mut seen = HashSet::new();
        for node in nodes {
            if !seen.insert(node.logical_id.clone()) {
                return Err(DagError::DuplicateNodeId(node.logical_id.clone()));
            }
            node_order.push(node.logical_id.clone());
        }

        let mut successors: HashMap<String, Vec<String>> =
            node_order.iter().map(|id| (id.clone(), Vec::new())).collect();
        let mut predecessors: HashMap<String, Vec<String>> =
            node_order.iter().map(|id| (id.clone(), Vec::new())).collect();

        for edge in edges {
            if !seen.contains(&edge.from_logical_id) {
                return Err(DagError::DanglingEdgeEndpoint {
                    edge: edge.logical_id.clone(),
                    node: edge.from_logical_id.clone(),
                });
            }
            if !seen.contains(&edge.to_logical_id) {
                return Err(DagError::DanglingEdgeEndpoint {
                    edge: edge.logical_id.clone(),
                    node: edge.to_logical_id.clone(),
                });
            }

            if edge.loop_spec.is_some() {
                // A loop edge is bounded re-entry of a single node, not a DAG
                // dependency: it carries no wave ordering and must not feed
                // cycle detection. Anything other than a self-loop would be
                // indistinguishable from a real back-edge.
                if edge.from_logical_id != edge.to_logical_id {
                    return Err(DagError::InvalidLoopEdge(edge.logical_id.clone()));
                }
                continue;
            }

            successors.get_mut(&edge.from_logical_id).unwrap().push(edge.to_logical_id.clone());
            predecessors.get_mut(&edge.to_logical_id).unwrap().push(edge.from_logical_id.clone());
        }

        validate_acyclicity(&node_order, &successors)?;

        let (waves, wave_of) = compute_waves(&node_order, &predecessors);

        Ok(Self {
            node_order,
            successors,
            predecessors,
            waves,
            wave_of,
        })
    }

    pub fn node_order(&self) -> &[String] {
        &self.node_order
    }

    pub fn predecessors(&self, logical_id: &str) -> &[String] {
        self.predecessors.get(logical_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn successors(&self, logical_id: &str) -> &[String] {
        self.successors.get(logical_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ordered list of topological waves; `waves()[w]` is every node at
    /// wave `w`, in stable logical-id declaration order.
    pub fn waves(&self) -> &[Vec<String>] {
        &self.waves
    }

    pub fn wave_of(&self, logical_id: &str) -> Option<u32> {
        self.wave_of.get(logical_id).copied()
    }
}

/// DFS with a recursion-stack marker, per §4.3.
fn validate_acyclicity(
    node_order: &[String],
    successors: &HashMap<String, Vec<String>>,
) -> Result<(), DagError> {
    let mut state: HashMap<&str, VisitState> =
        node_order.iter().map(|id| (id.as_str(), VisitState::Unvisited)).collect();
    let mut path: Vec<String> = Vec::new();

    for start in node_order {
        if state[start.as_str()] == VisitState::Unvisited {
            dfs_visit(start, successors, &mut state, &mut path)?;
        }
    }
    Ok(())
}

fn dfs_visit<'a>(
    node: &'a str,
    successors: &'a HashMap<String, Vec<String>>,
    state: &mut HashMap<&'a str, VisitState>,
    path: &mut Vec<String>,
) -> Result<(), DagError> {
    state.insert(node, VisitState::InProgress);
    path.push(node.to_string());

    for next in successors.get(node).map(Vec::as_slice).unwrap_or(&[]) {
        match state.get(next.as_str()) {
            Some(VisitState::InProgress) => {
                let cycle_start = path.iter().position(|n| n == next).unwrap_or(0);
                let mut cycle = path[cycle_start..].to_vec();
                cycle.push(next.clone());
                return Err(DagError::CycleDetected(cycle.join(" -> ")));
            }
            Some(VisitState::Done) => continue,
            _ => dfs_visit(next, successors, state, path)?,
        }
    }

    state.insert(node, VisitState::Done);
    path.pop();
    Ok(())
}

/// wave(v) = 0 if no incoming edges, else 1 + max(wave(u)) over predecessors.
fn compute_waves(
    node_order: &[String],
    predecessors: &HashMap<String, Vec<String>>,
) -> (Vec<Vec<String>>, HashMap<String, u32>) {
    let mut wave_of: HashMap<String, u32> = HashMap::new();
    let mut remaining: HashSet<String> = node_order.iter().cloned().collect();
    let mut waves: Vec<Vec<String>> = Vec::new();

    while !remaining.is_empty() {
        let ready: Vec<String> = node_order
            .iter()
            .filter(|id| remaining.contains(*id))
            .filter(|id| {
                predecessors
                    .get(id.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or(&[])
                    .iter()
                    .all(|p| wave_of.contains_key(p))
            })
            .cloned()
            .collect();

        debug_assert!(!ready.is_empty(), "acyclic DAG must always make progress");
        if ready.is_empty() {
            break;
        }

        let wave_index = waves.len() as u32;
        for id in &ready {
            wave_of.insert(id.clone(), wave_index);
            remaining.remove(id);
        }
        waves.push(ready);
    }

    (waves, wave_of)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn node(id: &str) -> Node {
        Node::new(id, "transform", Value::Null)
    }

    #[test]
    fn test_linear_waves() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![Edge::new("e1", "a", "b"), Edge::new("e2", "b", "c")];
        let dag = Dag::build(&nodes, &edges).unwrap();
        assert_eq!(dag.waves().len(), 3);
        assert_eq!(dag.waves()[0], vec!["a"]);
        assert_eq!(dag.waves()[1], vec!["b"]);
        assert_eq!(dag.waves()[2], vec!["c"]);
        assert_eq!(dag.wave_of("a"), Some(0));
        assert_eq!(dag.wave_of("c"), Some(2));
    }

    #[test]
    fn test_fork_join_waves() {
        let nodes = vec![node("start"), node("t1"), node("t2"), node("t3"), node("join")];
        let edges = vec![
            Edge::new("e1", "start", "t1"),
            Edge::new("e2", "start", "t2"),
            Edge::new("e3", "start", "t3"),
            Edge::new("e4", "t1", "join"),
            Edge::new("e5", "t2", "join"),
            Edge::new("e6", "t3", "join"),
        ];
        let dag = Dag::build(&nodes, &edges).unwrap();
        assert_eq!(dag.waves().len(), 3);
        assert_eq!(dag.waves()[0], vec!["start"]);
        assert_eq!(dag.waves()[1].len(), 3);
        assert_eq!(dag.waves()[2], vec!["join"]);
    }

    #[test]
    fn test_wave_correctness_property() {
        // For all edges u->v in an accepted DAG, wave(u) < wave(v).
        let nodes = vec![node("a"), node("b"), node("c"), node("d")];
        let edges = vec![
            Edge::new("e1", "a", "b"),
            Edge::new("e2", "a", "c"),
            Edge::new("e3", "b", "d"),
            Edge::new("e4", "c", "d"),
        ];
        let dag = Dag::build(&nodes, &edges).unwrap();
        for edge in &edges {
            assert!(dag.wave_of(&edge.from_logical_id) < dag.wave_of(&edge.to_logical_id));
        }
    }

    #[test]
    fn test_cycle_detected() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![
            Edge::new("e1", "a", "b"),
            Edge::new("e2", "b", "c"),
            Edge::new("e3", "c", "a"),
        ];
        let err = Dag::build(&nodes, &edges).unwrap_err();
        assert!(matches!(err, DagError::CycleDetected(_)));
    }

    #[test]
    fn test_dangling_edge_endpoint() {
        let nodes = vec![node("a")];
        let edges = vec![Edge::new("e1", "a", "ghost")];
        let err = Dag::build(&nodes, &edges).unwrap_err();
        assert!(matches!(err, DagError::DanglingEdgeEndpoint { .. }));
    }

    #[test]
    fn test_predecessors_and_successors() {
        let nodes = vec![node("a"), node("b"), node("c")];
        let edges = vec![Edge::new("e1", "a", "c"), Edge::new("e2", "b", "c")];
        let dag = Dag::build(&nodes, &edges).unwrap();
        assert_eq!(dag.predecessors("c").len(), 2);
        assert_eq!(dag.successors("a"), &["c".to_string()]);
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let nodes = vec![node("a")];
        let edges = vec![Edge::new("e1", "a", "a")];
        let err = Dag::build(&nodes, &edges).unwrap_err();
        assert!(matches!(err, DagError::CycleDetected(_)));
    }

    #[test]
    fn test_loop_edge_self_loop_is_not_a_cycle() {
        let nodes = vec![node("a"), node("b")];
        let edges = vec![
            Edge::new("e1", "a", "b"),
            Edge::new("e2", "a", "a").with_loop(3),
        ];
        let dag = Dag::build(&nodes, &edges).unwrap();
        assert_eq!(dag.waves().len(), 2);
        assert!(dag.predecessors("a").is_empty());
        assert!(!dag.successors("a").contains(&"a".to_string()));
    }

    #[test]
    fn test_loop_edge_across_nodes_is_rejected() {
        let nodes = vec![node("a"), node("b")];
        let edges = vec![Edge::new("e1", "a", "b").with_loop(3)];
        let err = Dag::build(&nodes, &edges).unwrap_err();
        assert!(matches!(err, DagError::InvalidLoopEdge(_)));
    }
}
