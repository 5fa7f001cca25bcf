use std::collections::BTreeMap;

use serde::Serialize;

use crate::graph::CodeGraph;
use crate::graph::edge::Resolution;
use crate::graph::node::{Node, NodeKind};

// ---------------------------------------------------------------------------
// Serialized graph and run summary
//
// The document form is the contract with report generators, visualizers,
// and the classifier: structured, diffable, deterministic key ordering.
// Nodes sort by id; edges by (source, target, kind).
// ---------------------------------------------------------------------------

/// One merged edge in document form, endpoints by id.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeDoc {
    pub source: String,
    pub target: String,
    pub kind: &'static str,
    pub lines: Vec<u32>,
    pub details: Vec<String>,
    pub resolution: Option<Resolution>,
    pub call_count: usize,
}

/// The whole serialized graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphDoc {
    pub nodes: Vec<Node>,
    pub edges: Vec<EdgeDoc>,
}

/// Project a graph into its deterministic document form.
pub fn to_document(graph: &CodeGraph) -> GraphDoc {
    let mut nodes: Vec<Node> = graph
        .graph
        .node_indices()
        .map(|idx| graph.graph[idx].clone())
        .collect();
    nodes.sort_by(|a, b| a.id.cmp(&b.id));

    let mut edges: Vec<EdgeDoc> = graph
        .graph
        .edge_indices()
        .filter_map(|edge_idx| {
            let (source, target) = graph.graph.edge_endpoints(edge_idx)?;
            let data = &graph.graph[edge_idx];
            Some(EdgeDoc {
                source: graph.graph[source].id.clone(),
                target: graph.graph[target].id.clone(),
                kind: data.kind.as_str(),
                lines: data.lines.clone(),
                details: data.details.clone(),
                resolution: data.resolution,
                call_count: data.call_count,
            })
        })
        .collect();
    edges.sort_by(|a, b| {
        (a.source.as_str(), a.target.as_str(), a.kind)
            .cmp(&(b.source.as_str(), b.target.as_str(), b.kind))
    });

    GraphDoc { nodes, edges }
}

/// Aggregate statistics produced by an analyze run.
#[derive(Debug, Serialize)]
pub struct AnalyzeStats {
    pub files_parsed: usize,
    /// Files skipped due to read or parse errors.
    pub files_skipped: usize,
    pub modules: usize,
    pub classes: usize,
    pub functions: usize,
    pub methods: usize,
    pub edges: usize,
    pub edges_by_kind: BTreeMap<String, usize>,
    pub entrypoints: usize,
    pub reachable: usize,
    pub warnings: usize,
    /// Wall-clock time for the run in seconds.
    pub elapsed_secs: f64,
}

impl AnalyzeStats {
    pub fn collect(
        graph: &CodeGraph,
        files_parsed: usize,
        files_skipped: usize,
        entrypoints: usize,
        warnings: usize,
        elapsed_secs: f64,
    ) -> Self {
        let mut kind_counts = [0usize; 4];
        let mut reachable = 0;
        for idx in graph.graph.node_indices() {
            let node = &graph.graph[idx];
            let slot = match node.kind {
                NodeKind::Module => 0,
                NodeKind::Class => 1,
                NodeKind::Function => 2,
                NodeKind::Method => 3,
            };
            kind_counts[slot] += 1;
            if node.reachable {
                reachable += 1;
            }
        }
        let edges_by_kind = graph
            .edges_by_kind()
            .into_iter()
            .map(|(kind, count)| (kind.as_str().to_string(), count))
            .collect();

        Self {
            files_parsed,
            files_skipped,
            modules: kind_counts[0],
            classes: kind_counts[1],
            functions: kind_counts[2],
            methods: kind_counts[3],
            edges: graph.edge_count(),
            edges_by_kind,
            entrypoints,
            reachable,
            warnings,
            elapsed_secs,
        }
    }
}

/// Print a summary of the analyze run.
///
/// - `json = true`: emit a pretty-printed JSON object to stdout.
/// - `json = false`: emit a cargo-style human-readable summary to stdout.
///
/// If `stats.files_skipped > 0`, a warning line goes to **stderr** so the
/// stdout stream stays clean for downstream JSON consumers.
pub fn print_summary(stats: &AnalyzeStats, json: bool) {
    if json {
        match serde_json::to_string_pretty(stats) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("error serialising stats: {}", e),
        }
        return;
    }

    println!(
        "Analyzed {} files in {:.2}s",
        stats.files_parsed, stats.elapsed_secs
    );
    println!(
        "  {} modules, {} classes, {} functions, {} methods",
        stats.modules, stats.classes, stats.functions, stats.methods,
    );
    println!("  {} edges", stats.edges);
    println!(
        "  {} entrypoints, {} reachable nodes",
        stats.entrypoints, stats.reachable
    );

    if stats.files_skipped > 0 {
        eprintln!("  {} files skipped (read or parse errors)", stats.files_skipped);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::graph::edge::{EdgeKind, Resolution, ResolutionCase};

    fn node(id: &str, kind: NodeKind) -> Node {
        Node {
            id: id.into(),
            kind,
            layer: "unassigned".into(),
            file: PathBuf::from("x.py"),
            name: id.rsplit('.').next().unwrap().into(),
            start_line: 1,
            end_line: 1,
            line_count: 1,
            docstring: None,
            attributes: Vec::new(),
            params: Vec::new(),
            return_type: None,
            return_vars: Vec::new(),
            reachable: false,
            context: "module".into(),
        }
    }

    #[test]
    fn test_document_ordering_is_deterministic() {
        let mut graph = CodeGraph::new();
        let b = graph.add_node(node("b.helper", NodeKind::Function));
        let a = graph.add_node(node("a.root", NodeKind::Function));
        graph.add_edge(
            b,
            a,
            EdgeKind::CallsFunction,
            2,
            "root()".into(),
            Some(Resolution::exact(ResolutionCase::ImportedFunctionCall)),
        );
        graph.add_edge(
            a,
            b,
            EdgeKind::CallsFunction,
            1,
            "helper()".into(),
            Some(Resolution::exact(ResolutionCase::ImportedFunctionCall)),
        );

        let doc = to_document(&graph);
        let ids: Vec<&str> = doc.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a.root", "b.helper"], "nodes sorted by id");
        assert_eq!(doc.edges[0].source, "a.root", "edges sorted by triple");

        let json_once = serde_json::to_string(&doc).unwrap();
        let json_again = serde_json::to_string(&to_document(&graph)).unwrap();
        assert_eq!(json_once, json_again, "serialization is byte-stable");
    }
}
