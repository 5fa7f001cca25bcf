use std::collections::HashSet;

use petgraph::Direction;
use petgraph::stable_graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::graph::CodeGraph;
use crate::graph::edge::{EdgeKind, ResolutionCase};

// ---------------------------------------------------------------------------
// Reverse trace
//
// Answers "why is this node reachable?": bounded reverse DFS from a target
// back to any entrypoint root, enumerating up to `max_paths` distinct paths.
// Cycle avoidance is per-branch — different branches may legitimately
// revisit a node via a different route, so a global visited set would hide
// real paths.
// ---------------------------------------------------------------------------

/// One hop of a trace path. `edge_kind`/`resolution_case` describe the edge
/// entering this node from the previous step; both are `None` on the root.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TraceStep {
    pub node: String,
    pub edge_kind: Option<EdgeKind>,
    pub resolution_case: Option<ResolutionCase>,
}

/// Enumerate up to `max_paths` paths from any root to `target_id`, each
/// spanning at most `max_depth` nodes, ordered root-first. Returns an empty list
/// when the target does not exist or no root reaches it within bounds.
pub fn trace_to_roots(
    graph: &CodeGraph,
    target_id: &str,
    roots: &[NodeIndex],
    max_depth: usize,
    max_paths: usize,
) -> Vec<Vec<TraceStep>> {
    let Some(start) = graph.node_index(target_id) else {
        return Vec::new();
    };
    let root_set: HashSet<NodeIndex> = roots.iter().copied().collect();

    let mut paths = Vec::new();
    // Each branch entry: (node, edge from this node toward the target-side
    // neighbour it was reached from).
    let mut branch: Vec<(NodeIndex, Option<(EdgeKind, Option<ResolutionCase>)>)> = Vec::new();
    let mut on_branch: HashSet<NodeIndex> = HashSet::new();
    dfs(
        graph,
        start,
        None,
        &root_set,
        max_depth,
        max_paths,
        &mut branch,
        &mut on_branch,
        &mut paths,
    );
    paths
}

#[allow(clippy::too_many_arguments)]
fn dfs(
    graph: &CodeGraph,
    current: NodeIndex,
    outbound: Option<(EdgeKind, Option<ResolutionCase>)>,
    roots: &HashSet<NodeIndex>,
    max_depth: usize,
    max_paths: usize,
    branch: &mut Vec<(NodeIndex, Option<(EdgeKind, Option<ResolutionCase>)>)>,
    on_branch: &mut HashSet<NodeIndex>,
    paths: &mut Vec<Vec<TraceStep>>,
) {
    if paths.len() >= max_paths {
        return;
    }
    branch.push((current, outbound));
    on_branch.insert(current);

    if roots.contains(&current) {
        paths.push(emit(graph, branch));
    } else if branch.len() < max_depth {
        // Deterministic exploration order: predecessors sorted by id.
        let mut preds: Vec<(NodeIndex, (EdgeKind, Option<ResolutionCase>))> = graph
            .graph
            .edges_directed(current, Direction::Incoming)
            .filter(|e| e.weight().kind.carries_reachability())
            .map(|e| {
                let data = e.weight();
                (e.source(), (data.kind, data.resolution.map(|r| r.case)))
            })
            .collect();
        preds.sort_by(|a, b| graph.graph[a.0].id.cmp(&graph.graph[b.0].id));

        for (pred, edge) in preds {
            if on_branch.contains(&pred) {
                continue;
            }
            dfs(
                graph,
                pred,
                Some(edge),
                roots,
                max_depth,
                max_paths,
                branch,
                on_branch,
                paths,
            );
        }
    }

    on_branch.remove(&current);
    branch.pop();
}

/// Reverse the branch (target-first) into a root-first step list. The edge
/// stored on a branch entry points from that node toward the target, i.e.
/// it is the inbound edge of the *next* step in root-first order.
fn emit(
    graph: &CodeGraph,
    branch: &[(NodeIndex, Option<(EdgeKind, Option<ResolutionCase>)>)],
) -> Vec<TraceStep> {
    let forward: Vec<_> = branch.iter().rev().collect();
    forward
        .iter()
        .enumerate()
        .map(|(i, (idx, _))| {
            let inbound = if i == 0 { None } else { forward[i - 1].1 };
            TraceStep {
                node: graph.graph[*idx].id.clone(),
                edge_kind: inbound.map(|(kind, _)| kind),
                resolution_case: inbound.and_then(|(_, case)| case),
            }
        })
        .collect()
}
