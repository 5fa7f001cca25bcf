use std::path::PathBuf;

use petgraph::Direction;
use petgraph::visit::EdgeRef;

use crate::graph::CodeGraph;
use crate::graph::edge::Confidence;
use crate::graph::node::NodeKind;

// ---------------------------------------------------------------------------
// Dead-code classifier
//
// Combines the reachability verdict with two corroboration signals: inbound
// graph usage and a caller-supplied textual search. The search is supporting
// evidence only — a textual hit downgrades "likely dead" to "uncertain", it
// never upgrades anything to "in use".
// ---------------------------------------------------------------------------

/// Final classification of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerdictKind {
    LikelyDead,
    Uncertain,
    InUse,
}

impl VerdictKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VerdictKind::LikelyDead => "likely-dead",
            VerdictKind::Uncertain => "uncertain",
            VerdictKind::InUse => "in-use",
        }
    }
}

/// Per-node dead-code verdict.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Verdict {
    pub id: String,
    pub kind: NodeKind,
    pub file: PathBuf,
    pub line: u32,
    pub reachable: bool,
    pub has_graph_usage: bool,
    pub has_textual_hits: bool,
    pub verdict: VerdictKind,
    pub reason: String,
}

/// Classify every non-module node, sorted by id.
///
/// `search` is the external corroboration function: given a bare name, it
/// returns the files containing it textually. Hits in the node's own
/// defining file are discounted — the definition always mentions itself.
pub fn classify_dead_code<F>(graph: &CodeGraph, search: F) -> Vec<Verdict>
where
    F: Fn(&str) -> Vec<PathBuf>,
{
    let mut verdicts = Vec::new();

    for idx in graph.graph.node_indices() {
        let node = &graph.graph[idx];
        if node.kind == NodeKind::Module {
            continue;
        }

        let inbound: Vec<Confidence> = graph
            .graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| e.weight().kind.carries_reachability())
            .filter_map(|e| e.weight().resolution.map(|r| r.confidence))
            .collect();
        let has_graph_usage = !inbound.is_empty();
        let only_fuzzy_usage =
            has_graph_usage && inbound.iter().all(|&c| c == Confidence::Fuzzy);

        let hits = search(&node.name);
        let external_hits = hits.iter().filter(|f| *f != &node.file).count();
        let has_textual_hits = external_hits > 0;

        let (verdict, reason) = if node.reachable {
            if only_fuzzy_usage {
                (
                    VerdictKind::Uncertain,
                    "reachable, but only through low-confidence references".to_string(),
                )
            } else {
                (
                    VerdictKind::InUse,
                    "reachable from entrypoints".to_string(),
                )
            }
        } else if has_graph_usage && has_textual_hits {
            (
                VerdictKind::Uncertain,
                "unreachable, but referenced from unreachable code and named elsewhere".to_string(),
            )
        } else if has_graph_usage {
            (
                VerdictKind::Uncertain,
                "unreachable, but referenced from unreachable code".to_string(),
            )
        } else if has_textual_hits {
            (
                VerdictKind::Uncertain,
                format!("unreachable, but named textually in {external_hits} other file(s)"),
            )
        } else {
            (
                VerdictKind::LikelyDead,
                "unreachable, no graph references, no textual corroboration".to_string(),
            )
        };

        verdicts.push(Verdict {
            id: node.id.clone(),
            kind: node.kind,
            file: node.file.clone(),
            line: node.start_line,
            reachable: node.reachable,
            has_graph_usage,
            has_textual_hits,
            verdict,
            reason,
        });
    }

    verdicts.sort_by(|a, b| a.id.cmp(&b.id));
    verdicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge::{EdgeKind, Resolution, ResolutionCase};
    use crate::graph::node::Node;

    fn node(id: &str, reachable: bool) -> Node {
        Node {
            id: id.into(),
            kind: NodeKind::Function,
            layer: "unassigned".into(),
            file: PathBuf::from(format!("{}.py", id.split('.').next().unwrap())),
            name: id.rsplit('.').next().unwrap().into(),
            start_line: 1,
            end_line: 1,
            line_count: 1,
            docstring: None,
            attributes: Vec::new(),
            params: Vec::new(),
            return_type: None,
            return_vars: Vec::new(),
            reachable,
            context: "module".into(),
        }
    }

    fn no_hits(_: &str) -> Vec<PathBuf> {
        Vec::new()
    }

    #[test]
    fn test_reachable_node_is_in_use() {
        let mut graph = CodeGraph::new();
        graph.add_node(node("a.root", true));
        let verdicts = classify_dead_code(&graph, no_hits);
        assert_eq!(verdicts[0].verdict, VerdictKind::InUse);
    }

    #[test]
    fn test_unreachable_uncorroborated_node_is_likely_dead() {
        let mut graph = CodeGraph::new();
        graph.add_node(node("c.orphan", false));
        let verdicts = classify_dead_code(&graph, no_hits);
        assert_eq!(verdicts[0].verdict, VerdictKind::LikelyDead);
        assert!(!verdicts[0].has_graph_usage);
        assert!(!verdicts[0].has_textual_hits);
    }

    #[test]
    fn test_textual_hit_downgrades_to_uncertain() {
        let mut graph = CodeGraph::new();
        graph.add_node(node("c.orphan", false));
        let verdicts = classify_dead_code(&graph, |name| {
            assert_eq!(name, "orphan");
            vec![PathBuf::from("docs/usage.py")]
        });
        assert_eq!(verdicts[0].verdict, VerdictKind::Uncertain);
        assert!(verdicts[0].has_textual_hits);
    }

    #[test]
    fn test_own_file_hits_are_discounted() {
        let mut graph = CodeGraph::new();
        graph.add_node(node("c.orphan", false));
        let verdicts = classify_dead_code(&graph, |_| vec![PathBuf::from("c.py")]);
        assert!(
            !verdicts[0].has_textual_hits,
            "a definition naming itself is not corroboration"
        );
        assert_eq!(verdicts[0].verdict, VerdictKind::LikelyDead);
    }

    #[test]
    fn test_only_fuzzy_references_never_better_than_uncertain() {
        let mut graph = CodeGraph::new();
        let caller = graph.add_node(node("a.run", true));
        let callee = graph.add_node(node("b.job", true));
        graph.add_edge(
            caller,
            callee,
            EdgeKind::CallsDependency,
            3,
            "job()".into(),
            Some(Resolution::fuzzy(ResolutionCase::InjectedCallable)),
        );
        let verdicts = classify_dead_code(&graph, no_hits);
        let job = verdicts.iter().find(|v| v.id == "b.job").unwrap();
        assert_eq!(
            job.verdict,
            VerdictKind::Uncertain,
            "fuzzy-only usage keeps the verdict uncertain even when reachable"
        );
    }

    #[test]
    fn test_unreachable_with_graph_usage_is_uncertain() {
        let mut graph = CodeGraph::new();
        let caller = graph.add_node(node("a.dead_caller", false));
        let callee = graph.add_node(node("b.helper", false));
        graph.add_edge(
            caller,
            callee,
            EdgeKind::CallsFunction,
            2,
            "helper()".into(),
            Some(Resolution::exact(ResolutionCase::ImportedFunctionCall)),
        );
        let verdicts = classify_dead_code(&graph, no_hits);
        let helper = verdicts.iter().find(|v| v.id == "b.helper").unwrap();
        assert_eq!(helper.verdict, VerdictKind::Uncertain);
        assert!(helper.has_graph_usage);
    }
}
