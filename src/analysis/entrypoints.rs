use anyhow::{Context, Result};
use petgraph::stable_graph::NodeIndex;
use regex::Regex;
use tracing::warn;

use crate::config::EntrypointRuleConfig;
use crate::graph::CodeGraph;
use crate::graph::node::{Node, NodeKind};

// ---------------------------------------------------------------------------
// Entrypoint selection
//
// Which nodes count as reachability roots is policy, not analysis: HTTP
// handler naming, CLI command naming, worker run-loops all differ per
// project. The selector applies externally supplied rules; nothing here is
// hard-coded.
// ---------------------------------------------------------------------------

/// One compiled entrypoint rule. All present criteria must match.
pub struct EntrypointRule {
    /// Regex over the node's bare name.
    name: Option<Regex>,
    /// Accepted node kinds. Empty means any kind.
    kinds: Vec<NodeKind>,
    /// Glob over the node's project-relative file path.
    path: Option<glob::Pattern>,
}

impl EntrypointRule {
    pub fn compile(config: &EntrypointRuleConfig) -> Result<Self> {
        let name = config
            .name
            .as_deref()
            .map(Regex::new)
            .transpose()
            .with_context(|| format!("invalid entrypoint name pattern {:?}", config.name))?;
        let path = config
            .path
            .as_deref()
            .map(glob::Pattern::new)
            .transpose()
            .with_context(|| format!("invalid entrypoint path pattern {:?}", config.path))?;
        let kinds = config
            .kinds
            .as_deref()
            .unwrap_or(&[])
            .iter()
            .map(|k| parse_kind(k))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { name, kinds, path })
    }

    pub fn matches(&self, node: &Node) -> bool {
        if let Some(name) = &self.name
            && !name.is_match(&node.name)
        {
            return false;
        }
        if !self.kinds.is_empty() && !self.kinds.contains(&node.kind) {
            return false;
        }
        if let Some(path) = &self.path
            && !path.matches(&node.file.to_string_lossy())
        {
            return false;
        }
        true
    }
}

fn parse_kind(kind: &str) -> Result<NodeKind> {
    match kind {
        "module" => Ok(NodeKind::Module),
        "class" => Ok(NodeKind::Class),
        "function" => Ok(NodeKind::Function),
        "method" => Ok(NodeKind::Method),
        other => anyhow::bail!("unknown node kind in entrypoint rule: {other:?}"),
    }
}

/// Select every node matching `pred`, sorted by id for determinism.
pub fn select_where(graph: &CodeGraph, pred: impl Fn(&Node) -> bool) -> Vec<NodeIndex> {
    let mut matches: Vec<NodeIndex> = graph
        .graph
        .node_indices()
        .filter(|&idx| pred(&graph.graph[idx]))
        .collect();
    matches.sort_by(|&a, &b| graph.graph[a].id.cmp(&graph.graph[b].id));
    matches
}

/// Select reachability roots: nodes matching any rule.
///
/// An empty result is reported but not fatal — the run proceeds with an
/// empty reachable set, which downstream consumers must treat as
/// "everything unreachable".
pub fn select_entrypoints(graph: &CodeGraph, rules: &[EntrypointRule]) -> Vec<NodeIndex> {
    let roots = select_where(graph, |node| rules.iter().any(|r| r.matches(node)));
    if roots.is_empty() {
        warn!("no entrypoints matched any rule; every node will be unreachable");
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::NodeKind;
    use std::path::PathBuf;

    fn rule(name: Option<&str>, kinds: Option<Vec<&str>>, path: Option<&str>) -> EntrypointRule {
        EntrypointRule::compile(&EntrypointRuleConfig {
            name: name.map(String::from),
            kinds: kinds.map(|ks| ks.into_iter().map(String::from).collect()),
            path: path.map(String::from),
        })
        .expect("rule compiles")
    }

    fn node(id: &str, kind: NodeKind, file: &str) -> Node {
        Node {
            id: id.into(),
            kind,
            layer: "unassigned".into(),
            file: PathBuf::from(file),
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
    fn test_rule_matches_name_kind_and_path_together() {
        let r = rule(Some("^handle_"), Some(vec!["function"]), Some("api/**"));
        assert!(r.matches(&node("api.views.handle_login", NodeKind::Function, "api/views.py")));
        assert!(
            !r.matches(&node("api.views.login", NodeKind::Function, "api/views.py")),
            "name pattern must match"
        );
        assert!(
            !r.matches(&node("core.handle_login", NodeKind::Function, "core/util.py")),
            "path pattern must match"
        );
        assert!(
            !r.matches(&node("api.views.handle_x", NodeKind::Class, "api/views.py")),
            "kind filter must match"
        );
    }

    #[test]
    fn test_select_entrypoints_sorted_and_possibly_empty() {
        let mut graph = CodeGraph::new();
        graph.add_node(node("b.main", NodeKind::Function, "b.py"));
        graph.add_node(node("a.main", NodeKind::Function, "a.py"));

        let roots = select_entrypoints(&graph, &[rule(Some("^main$"), None, None)]);
        let ids: Vec<&str> = roots.iter().map(|&i| graph.graph[i].id.as_str()).collect();
        assert_eq!(ids, vec!["a.main", "b.main"], "roots sorted by id");

        let none = select_entrypoints(&graph, &[rule(Some("^never$"), None, None)]);
        assert!(none.is_empty(), "no match is reported, not fatal");
    }
}
