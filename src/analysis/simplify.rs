use std::collections::BTreeMap;

use crate::graph::CodeGraph;
use crate::graph::edge::{EdgeData, EdgeKind, Resolution};
use crate::graph::node::NodeKind;

// ---------------------------------------------------------------------------
// Graph simplifier
//
// A derived, coarser view for visualization: method nodes are absorbed into
// their owning class. Edges whose endpoints collapse onto the same parent
// (a class calling its own methods) disappear; edges between different
// parents merge per (new-source, new-target, kind), recording the absorbed
// method pairs and an aggregate call_count instead of fabricating one edge
// per method pair. The detailed graph is left untouched.
// ---------------------------------------------------------------------------

/// Aggregation bucket for one collapsed (source, target, kind) triple.
struct Collapsed {
    lines: Vec<u32>,
    details: Vec<String>,
    resolution: Option<Resolution>,
    call_count: usize,
}

/// Produce the method-collapsed view of `graph`.
///
/// A collapsed class is reachable when any absorbed method was reachable.
pub fn simplify(graph: &CodeGraph) -> CodeGraph {
    // Representative id per node: methods map to their owning class.
    let representative = |idx: petgraph::stable_graph::NodeIndex| -> String {
        let node = &graph.graph[idx];
        match node.kind {
            NodeKind::Method => node
                .parent_id()
                .unwrap_or(node.id.as_str())
                .to_string(),
            _ => node.id.clone(),
        }
    };

    let mut simplified = CodeGraph::new();

    // Surviving nodes, sorted by id for deterministic indices.
    let mut survivors: Vec<petgraph::stable_graph::NodeIndex> = graph
        .graph
        .node_indices()
        .filter(|&idx| graph.graph[idx].kind != NodeKind::Method)
        .collect();
    survivors.sort_by(|&a, &b| graph.graph[a].id.cmp(&graph.graph[b].id));
    for idx in survivors {
        let mut node = graph.graph[idx].clone();
        if node.kind == NodeKind::Class && !node.reachable {
            // Absorb reachability from the methods being collapsed away.
            node.reachable = graph.graph.node_indices().any(|m| {
                let candidate = &graph.graph[m];
                candidate.kind == NodeKind::Method
                    && candidate.parent_id() == Some(node.id.as_str())
                    && candidate.reachable
            });
        }
        simplified.add_node(node);
    }

    // Containment between surviving representatives.
    let mut carrying: BTreeMap<(String, String, EdgeKind), Collapsed> = BTreeMap::new();
    for edge_idx in graph.graph.edge_indices() {
        let Some((source, target)) = graph.graph.edge_endpoints(edge_idx) else {
            continue;
        };
        let data = &graph.graph[edge_idx];
        let new_source = representative(source);
        let new_target = representative(target);
        if new_source == new_target {
            // Internal to one collapsed parent; not visible at this granularity.
            continue;
        }

        if data.kind == EdgeKind::Contains {
            if let (Some(s), Some(t)) = (
                simplified.node_index(&new_source),
                simplified.node_index(&new_target),
            ) {
                simplified.add_containment(s, t);
            }
            continue;
        }

        let bucket = carrying
            .entry((new_source, new_target, data.kind))
            .or_insert_with(|| Collapsed {
                lines: Vec::new(),
                details: Vec::new(),
                resolution: None,
                call_count: 0,
            });
        for &line in &data.lines {
            if let Err(pos) = bucket.lines.binary_search(&line) {
                bucket.lines.insert(pos, line);
            }
        }
        // Record which concrete pair this occurrence came from.
        let pair = format!(
            "{} -> {}",
            graph.graph[source].id, graph.graph[target].id
        );
        if !bucket.details.contains(&pair) {
            bucket.details.push(pair);
        }
        if bucket.resolution.is_none() {
            bucket.resolution = data.resolution;
        }
        // One distinct (pair, line) occurrence per recorded line.
        bucket.call_count += data.lines.len();
    }

    for ((new_source, new_target, kind), bucket) in carrying {
        let (Some(s), Some(t)) = (
            simplified.node_index(&new_source),
            simplified.node_index(&new_target),
        ) else {
            continue;
        };
        simplified.insert_merged_edge(
            s,
            t,
            EdgeData {
                kind,
                lines: bucket.lines,
                details: bucket.details,
                resolution: bucket.resolution,
                call_count: bucket.call_count,
            },
        );
    }

    simplified
}
