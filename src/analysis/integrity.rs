use std::collections::HashMap;
use std::fmt;

use crate::graph::CodeGraph;
use crate::graph::edge::EdgeKind;

// ---------------------------------------------------------------------------
// Integrity verifier
//
// A build-time correctness gate, not a runtime feature. A violation here
// means the extractor or merger is buggy — not that the analyzed code is
// odd — so it aborts the run with an itemized report and a nonzero exit.
// ---------------------------------------------------------------------------

/// One broken invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// A reachability-carrying edge without a resolution-case tag.
    MissingResolution {
        source: String,
        target: String,
        kind: EdgeKind,
    },
    /// Two or more edges sharing a (source, target, kind) triple survived merge.
    DuplicateTriple {
        source: String,
        target: String,
        kind: EdgeKind,
        count: usize,
    },
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityViolation::MissingResolution {
                source,
                target,
                kind,
            } => write!(
                f,
                "edge {source} -> {target} [{}] lacks a resolution case",
                kind.as_str()
            ),
            IntegrityViolation::DuplicateTriple {
                source,
                target,
                kind,
                count,
            } => write!(
                f,
                "triple {source} -> {target} [{}] appears {count} times after merge",
                kind.as_str()
            ),
        }
    }
}

/// Fatal verification failure carrying every offending edge.
#[derive(Debug, thiserror::Error)]
#[error("graph integrity check failed: {} violation(s)", .violations.len())]
pub struct IntegrityError {
    pub violations: Vec<IntegrityViolation>,
}

/// Check structural invariants after build.
pub fn verify(graph: &CodeGraph) -> Result<(), IntegrityError> {
    let mut violations = Vec::new();

    let mut triples: HashMap<(String, String, EdgeKind), usize> = HashMap::new();
    for edge_idx in graph.graph.edge_indices() {
        let Some((source, target)) = graph.graph.edge_endpoints(edge_idx) else {
            continue;
        };
        let data = &graph.graph[edge_idx];
        let source_id = graph.graph[source].id.clone();
        let target_id = graph.graph[target].id.clone();

        if data.kind.carries_reachability() && data.resolution.is_none() {
            violations.push(IntegrityViolation::MissingResolution {
                source: source_id.clone(),
                target: target_id.clone(),
                kind: data.kind,
            });
        }
        *triples.entry((source_id, target_id, data.kind)).or_insert(0) += 1;
    }

    let mut duplicates: Vec<IntegrityViolation> = triples
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|((source, target, kind), count)| IntegrityViolation::DuplicateTriple {
            source,
            target,
            kind,
            count,
        })
        .collect();
    duplicates.sort_by(|a, b| format!("{a}").cmp(&format!("{b}")));
    violations.extend(duplicates);

    if violations.is_empty() {
        Ok(())
    } else {
        Err(IntegrityError { violations })
    }
}
