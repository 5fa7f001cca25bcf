use std::collections::HashMap;

use crate::graph::edge::Confidence;
use crate::graph::node::{Node, NodeKind};

/// Bare-name → candidate-ids lookup built after node extraction, used to
/// resolve cross-file calls during the edge pass.
///
/// Derived, read-only, scoped to one run. The build is a sequential reduce
/// over all extracted nodes and must fully complete before any edge
/// extraction starts — resolution correctness requires a total index.
pub struct CallableIndex {
    /// Bare name → sorted full ids ending in that name.
    names: HashMap<String, Vec<String>>,
    /// Full id → node kind, for classifying resolved targets.
    kinds: HashMap<String, NodeKind>,
}

impl CallableIndex {
    /// Build the index from every node of every file. Pure reduce; no edges.
    pub fn build<'a>(nodes: impl Iterator<Item = &'a Node>) -> Self {
        let mut names: HashMap<String, Vec<String>> = HashMap::new();
        let mut kinds: HashMap<String, NodeKind> = HashMap::new();
        for node in nodes {
            kinds.entry(node.id.clone()).or_insert(node.kind);
            let bucket = names.entry(node.name.clone()).or_default();
            if !bucket.contains(&node.id) {
                bucket.push(node.id.clone());
            }
        }
        // Sorted candidate lists keep tie-breaking deterministic.
        for bucket in names.values_mut() {
            bucket.sort();
        }
        Self { names, kinds }
    }

    /// Kind of the node with this exact id, if it exists.
    pub fn kind_of(&self, id: &str) -> Option<NodeKind> {
        self.kinds.get(id).copied()
    }

    /// Whether a node with this exact id exists.
    pub fn contains_id(&self, id: &str) -> bool {
        self.kinds.contains_key(id)
    }

    /// All candidate ids for a bare name, sorted.
    pub fn candidates(&self, name: &str) -> &[String] {
        self.names.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ranked resolution of a bare name from the point of view of
    /// `importing_module`.
    ///
    /// Preference: the candidate whose module path shares the longest dotted
    /// common prefix with the importing module, then the longest common
    /// suffix. A unique winner resolves at `Exact` confidence; a tie resolves
    /// to the lexicographically smallest tied candidate at `Fuzzy` — the
    /// resolver degrades gracefully, it never fails on ambiguity.
    pub fn resolve(&self, name: &str, importing_module: &str) -> Option<(String, Confidence)> {
        let candidates = self.candidates(name);
        match candidates {
            [] => None,
            [only] => Some((only.clone(), Confidence::Exact)),
            many => {
                let scored: Vec<(usize, usize, &String)> = many
                    .iter()
                    .map(|id| {
                        let module = id.rsplit_once('.').map(|(m, _)| m).unwrap_or("");
                        (
                            common_prefix_segments(module, importing_module),
                            common_suffix_segments(module, importing_module),
                            id,
                        )
                    })
                    .collect();
                let best = scored
                    .iter()
                    .map(|&(p, s, _)| (p, s))
                    .max()
                    .expect("non-empty candidate list");
                let mut winners: Vec<&String> = scored
                    .iter()
                    .filter(|&&(p, s, _)| (p, s) == best)
                    .map(|&(_, _, id)| id)
                    .collect();
                winners.sort();
                let confidence = if winners.len() == 1 {
                    Confidence::Exact
                } else {
                    Confidence::Fuzzy
                };
                Some((winners[0].clone(), confidence))
            }
        }
    }
}

fn common_prefix_segments(a: &str, b: &str) -> usize {
    a.split('.')
        .zip(b.split('.'))
        .take_while(|(x, y)| x == y)
        .count()
}

fn common_suffix_segments(a: &str, b: &str) -> usize {
    a.rsplit('.')
        .zip(b.rsplit('.'))
        .take_while(|(x, y)| x == y)
        .count()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

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
    fn test_single_candidate_resolves_exact() {
        let nodes = vec![node("pkg.svc.helper", NodeKind::Function)];
        let index = CallableIndex::build(nodes.iter());
        let (id, conf) = index.resolve("helper", "app.main").unwrap();
        assert_eq!(id, "pkg.svc.helper");
        assert_eq!(conf, Confidence::Exact);
    }

    #[test]
    fn test_prefix_proximity_wins() {
        let nodes = vec![
            node("app.util.helper", NodeKind::Function),
            node("vendor.lib.helper", NodeKind::Function),
        ];
        let index = CallableIndex::build(nodes.iter());
        let (id, conf) = index.resolve("helper", "app.main").unwrap();
        assert_eq!(id, "app.util.helper", "candidate sharing the module prefix wins");
        assert_eq!(conf, Confidence::Exact);
    }

    #[test]
    fn test_tie_degrades_to_fuzzy_deterministically() {
        let nodes = vec![
            node("x.helper", NodeKind::Function),
            node("y.helper", NodeKind::Function),
        ];
        let index = CallableIndex::build(nodes.iter());
        let (id, conf) = index.resolve("helper", "app.main").unwrap();
        assert_eq!(id, "x.helper", "ties break to the lexicographically smallest id");
        assert_eq!(conf, Confidence::Fuzzy, "ambiguous winner is tagged lower-confidence");
    }

    #[test]
    fn test_unknown_name_resolves_to_none() {
        let index = CallableIndex::build(std::iter::empty());
        assert!(index.resolve("ghost", "app").is_none());
    }
}
