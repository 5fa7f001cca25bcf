use std::collections::{HashSet, VecDeque};

use petgraph::Direction;
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::graph::CodeGraph;

// ---------------------------------------------------------------------------
// Reachability engine
//
// Forward BFS from the entrypoint roots over reachability-carrying edges
// only — structural CONTAINS edges are never traversed, so a class being
// reachable says nothing about its methods. This is the one and only place
// the `Node.reachable` flag is written.
// ---------------------------------------------------------------------------

/// Mark every node reachable from `roots`. Returns the number of nodes
/// marked.
///
/// Idempotent (same roots, same result) and monotonic (superset roots can
/// only grow the reachable set) — the flag is only ever set, never cleared.
pub fn mark_reachable(graph: &mut CodeGraph, roots: &[NodeIndex]) -> usize {
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut queue: VecDeque<NodeIndex> = VecDeque::new();

    for &root in roots {
        if visited.insert(root) {
            queue.push_back(root);
        }
    }

    while let Some(current) = queue.pop_front() {
        let next: Vec<NodeIndex> = graph
            .graph
            .edges_directed(current, Direction::Outgoing)
            .filter(|e| e.weight().kind.carries_reachability())
            .map(|e| e.target())
            .collect();
        for target in next {
            if visited.insert(target) {
                queue.push_back(target);
            }
        }
    }

    for &idx in &visited {
        graph.mark_reachable(idx);
    }
    visited.len()
}
