use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::Config;
use crate::graph::CodeGraph;
use crate::index::CallableIndex;
use crate::parser::edges::{RawEdge, extract_edges};
use crate::parser::nodes::extract_nodes;
use crate::parser::parse_python;

// ---------------------------------------------------------------------------
// Pipeline orchestration
//
// Two embarrassingly-parallel parse passes separated by one synchronization
// point: the callable index build. The index must be total before any edge
// resolves, so pass 2 cannot start until the sequential reduce completes.
// Merge and everything downstream are single-threaded whole-graph passes.
// ---------------------------------------------------------------------------

/// A non-fatal problem encountered during the build, with file context.
#[derive(Debug, Clone)]
pub struct Warning {
    pub file: PathBuf,
    pub line: Option<u32>,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}: {}", self.file.display(), self.message),
            None => write!(f, "{}: {}", self.file.display(), self.message),
        }
    }
}

/// Result of one graph build.
pub struct BuildOutcome {
    pub graph: CodeGraph,
    pub warnings: Vec<Warning>,
    pub files_parsed: usize,
    pub files_skipped: usize,
}

/// One file that survived pass 1, retained in memory for the edge pass.
struct ParsedFile {
    rel_path: PathBuf,
    source: Vec<u8>,
    nodes: Vec<crate::graph::node::Node>,
}

/// Build the whole-codebase graph from an ordered file list.
///
/// The graph is rebuilt from scratch on every invocation — there is no
/// incremental cross-run state. A file that fails to read or parse is
/// skipped with a warning and contributes zero nodes and edges.
pub fn build_graph(root: &Path, files: &[PathBuf], config: &Config) -> Result<BuildOutcome> {
    // --- Pass 1: node extraction, one task per file, no shared state. ---
    let pass1: Vec<std::result::Result<ParsedFile, Warning>> = files
        .par_iter()
        .map(|path| {
            let rel_path = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            let source = std::fs::read(path).map_err(|err| Warning {
                file: rel_path.clone(),
                line: None,
                message: format!("read failed: {err}"),
            })?;
            let tree = parse_python(&source).ok_or_else(|| Warning {
                file: rel_path.clone(),
                line: None,
                message: "parse failed: tree-sitter produced no tree".into(),
            })?;
            let layer = config.layer_for(&rel_path);
            let nodes = extract_nodes(&rel_path, &source, &tree, &layer);
            Ok(ParsedFile {
                rel_path,
                source,
                nodes,
            })
        })
        .collect();

    let mut warnings = Vec::new();
    let mut parsed = Vec::new();
    for outcome in pass1 {
        match outcome {
            Ok(file) => parsed.push(file),
            Err(warning) => {
                warn!("{warning}");
                warnings.push(warning);
            }
        }
    }

    // --- Index handoff: sequential reduce, completed before pass 2. ---
    let index = CallableIndex::build(parsed.iter().flat_map(|f| f.nodes.iter()));
    debug!(files = parsed.len(), "callable index built");

    // --- Pass 2: edge extraction against the read-only index. ---
    let per_file_edges: Vec<Vec<RawEdge>> = parsed
        .par_iter()
        .map(|file| match parse_python(&file.source) {
            Some(tree) => extract_edges(&file.rel_path, &file.source, &tree, &index),
            // Already parsed once in pass 1; a second parse of the same
            // bytes cannot fail, but the API still says Option.
            None => Vec::new(),
        })
        .collect();

    // --- Merge: union per-file subgraphs into one CodeGraph. ---
    let mut graph = CodeGraph::new();
    for file in &parsed {
        for node in &file.nodes {
            graph.add_node(node.clone());
        }
    }
    // Containment edges derive from the id prefix structure.
    let containments: Vec<(String, String)> = parsed
        .iter()
        .flat_map(|f| f.nodes.iter())
        .filter_map(|node| {
            node.parent_id()
                .map(|parent| (parent.to_string(), node.id.clone()))
        })
        .collect();
    for (parent_id, child_id) in containments {
        if let (Some(parent), Some(child)) =
            (graph.node_index(&parent_id), graph.node_index(&child_id))
        {
            graph.add_containment(parent, child);
        }
    }
    for raw in per_file_edges.iter().flatten() {
        let (Some(source), Some(target)) =
            (graph.node_index(&raw.source), graph.node_index(&raw.target))
        else {
            // Edge endpoints come from the index, which mirrors the node
            // set; a miss means a duplicate-id collision dropped the node.
            debug!(source = %raw.source, target = %raw.target, "dropping edge with missing endpoint");
            continue;
        };
        graph.add_edge(
            source,
            target,
            raw.kind,
            raw.line,
            raw.detail.clone(),
            Some(raw.resolution),
        );
    }

    Ok(BuildOutcome {
        graph,
        files_parsed: parsed.len(),
        files_skipped: files.len() - parsed.len(),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::graph::edge::EdgeKind;

    fn project(files: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut paths = Vec::new();
        for (rel, source) in files {
            let path = dir.path().join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, source).unwrap();
            paths.push(path);
        }
        paths.sort();
        (dir, paths)
    }

    #[test]
    fn test_build_merges_duplicate_call_sites_into_one_edge() {
        let (dir, files) = project(&[
            ("a.py", "import b\n\ndef root():\n    b.helper()\n    b.helper()\n"),
            ("b.py", "def helper():\n    pass\n"),
        ]);
        let outcome = build_graph(dir.path(), &files, &Config::default()).unwrap();
        let graph = outcome.graph;

        let calls: Vec<_> = graph
            .graph
            .edge_indices()
            .filter(|&e| graph.graph[e].kind == EdgeKind::CallsFunction)
            .collect();
        assert_eq!(calls.len(), 1, "two call sites collapse to one edge");
        assert_eq!(graph.graph[calls[0]].lines, vec![4, 5]);
    }

    #[test]
    fn test_unparsable_file_is_a_warning_not_fatal() {
        let (dir, files) = project(&[("ok.py", "def fine():\n    pass\n")]);
        // tree-sitter tolerates most garbage, so force a read failure by
        // pointing at a path that does not exist.
        let mut files = files;
        files.push(dir.path().join("vanished.py"));
        let outcome = build_graph(dir.path(), &files, &Config::default()).unwrap();
        assert_eq!(outcome.files_skipped, 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(
            outcome.graph.node("ok.fine").is_some(),
            "healthy files still contribute nodes"
        );
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let (dir, files) = project(&[
            ("a.py", "import b\n\ndef root():\n    b.helper()\n"),
            ("b.py", "def helper():\n    pass\n\ndef spare():\n    pass\n"),
        ]);
        let config = Config::default();
        let first = build_graph(dir.path(), &files, &config).unwrap().graph;
        let second = build_graph(dir.path(), &files, &config).unwrap().graph;

        let ids = |g: &CodeGraph| {
            let mut ids: Vec<String> =
                g.graph.node_indices().map(|i| g.graph[i].id.clone()).collect();
            ids.sort();
            ids
        };
        let triples = |g: &CodeGraph| {
            let mut triples: Vec<(String, String, &'static str)> = g
                .graph
                .edge_indices()
                .map(|e| {
                    let (s, t) = g.graph.edge_endpoints(e).unwrap();
                    (
                        g.graph[s].id.clone(),
                        g.graph[t].id.clone(),
                        g.graph[e].kind.as_str(),
                    )
                })
                .collect();
            triples.sort();
            triples
        };
        assert_eq!(ids(&first), ids(&second), "node ids identical across rebuilds");
        assert_eq!(
            triples(&first),
            triples(&second),
            "edge triples identical across rebuilds"
        );
    }
}
