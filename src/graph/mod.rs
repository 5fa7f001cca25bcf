pub mod edge;
pub mod node;

use std::collections::HashMap;

use petgraph::Directed;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};

use edge::{EdgeData, EdgeKind, Resolution};
use node::Node;

/// The in-memory code graph: a directed petgraph StableGraph with O(1)
/// lookup indexes by node id and by (source, target, kind) edge triple.
///
/// Built once per run. After assembly the graph is immutable except for the
/// `Node.reachable` flag, which the reachability engine sets monotonically.
pub struct CodeGraph {
    /// The underlying directed graph, parameterised over node and edge payloads.
    pub graph: StableGraph<Node, EdgeData, Directed>,
    /// Maps fully-qualified node ids to their node indices.
    pub id_index: HashMap<String, NodeIndex>,
    /// Maps (source, target, kind) triples to the single edge carrying them —
    /// this is what enforces the no-duplicate-triple invariant during merge.
    edge_index: HashMap<(NodeIndex, NodeIndex, EdgeKind), EdgeIndex>,
}

impl CodeGraph {
    /// Create an empty code graph.
    pub fn new() -> Self {
        Self {
            graph: StableGraph::new(),
            id_index: HashMap::new(),
            edge_index: HashMap::new(),
        }
    }

    /// Add a node to the graph. Returns the new node's index.
    /// If a node with the same id has already been added, returns the
    /// existing index and leaves the first node in place.
    pub fn add_node(&mut self, node: Node) -> NodeIndex {
        if let Some(&existing) = self.id_index.get(&node.id) {
            return existing;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        idx
    }

    /// Look up a node index by fully-qualified id.
    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.id_index.get(id).copied()
    }

    /// Look up a node by fully-qualified id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index(id).map(|idx| &self.graph[idx])
    }

    /// Add one occurrence of a reachability-carrying edge, merging into an
    /// existing edge when the (source, target, kind) triple is already present.
    pub fn add_edge(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        kind: EdgeKind,
        line: u32,
        detail: String,
        resolution: Option<Resolution>,
    ) -> EdgeIndex {
        let key = (source, target, kind);
        if let Some(&existing) = self.edge_index.get(&key) {
            self.graph[existing].merge_occurrence(line, detail, resolution);
            return existing;
        }
        let idx = self
            .graph
            .add_edge(source, target, EdgeData::new(kind, line, detail, resolution));
        self.edge_index.insert(key, idx);
        idx
    }

    /// Add a structural containment edge. Idempotent per (parent, child).
    pub fn add_containment(&mut self, parent: NodeIndex, child: NodeIndex) -> EdgeIndex {
        let key = (parent, child, EdgeKind::Contains);
        if let Some(&existing) = self.edge_index.get(&key) {
            return existing;
        }
        let idx = self.graph.add_edge(parent, child, EdgeData::contains());
        self.edge_index.insert(key, idx);
        idx
    }

    /// Insert a pre-merged edge payload verbatim (used by the simplifier,
    /// which performs its own aggregation). Panics on a duplicate triple —
    /// callers must have merged already.
    pub fn insert_merged_edge(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        data: EdgeData,
    ) -> EdgeIndex {
        let key = (source, target, data.kind);
        debug_assert!(
            !self.edge_index.contains_key(&key),
            "insert_merged_edge called with an already-present triple"
        );
        let idx = self.graph.add_edge(source, target, data);
        self.edge_index.insert(key, idx);
        idx
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of merged edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Return a count of edges broken down by kind.
    pub fn edges_by_kind(&self) -> HashMap<EdgeKind, usize> {
        let mut map: HashMap<EdgeKind, usize> = HashMap::new();
        for idx in self.graph.edge_indices() {
            *map.entry(self.graph[idx].kind).or_insert(0) += 1;
        }
        map
    }

    /// Mark a node reachable. Monotonic — there is no way to clear the flag.
    pub fn mark_reachable(&mut self, idx: NodeIndex) {
        self.graph[idx].reachable = true;
    }
}

impl Default for CodeGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use edge::ResolutionCase;
    use node::NodeKind;

    pub(crate) fn test_node(id: &str, kind: NodeKind) -> Node {
        Node {
            id: id.into(),
            kind,
            layer: "unassigned".into(),
            file: PathBuf::from("a.py"),
            name: id.rsplit('.').next().unwrap().into(),
            start_line: 1,
            end_line: 2,
            line_count: 2,
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
    fn test_add_node_deduplicates_by_id() {
        let mut graph = CodeGraph::new();
        let a = graph.add_node(test_node("a.root", NodeKind::Function));
        let b = graph.add_node(test_node("a.root", NodeKind::Function));
        assert_eq!(a, b, "same id should return the same index");
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_add_edge_merges_duplicate_triples() {
        let mut graph = CodeGraph::new();
        let src = graph.add_node(test_node("a.root", NodeKind::Function));
        let dst = graph.add_node(test_node("b.helper", NodeKind::Function));

        let e1 = graph.add_edge(
            src,
            dst,
            EdgeKind::CallsFunction,
            3,
            "helper()".into(),
            Some(Resolution::exact(ResolutionCase::ImportedFunctionCall)),
        );
        let e2 = graph.add_edge(
            src,
            dst,
            EdgeKind::CallsFunction,
            9,
            "helper()".into(),
            None,
        );

        assert_eq!(e1, e2, "same triple should merge into one edge");
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.graph[e1].lines, vec![3, 9]);
    }

    #[test]
    fn test_different_kinds_stay_separate_edges() {
        let mut graph = CodeGraph::new();
        let src = graph.add_node(test_node("a.root", NodeKind::Function));
        let dst = graph.add_node(test_node("b.Helper", NodeKind::Class));

        graph.add_edge(
            src,
            dst,
            EdgeKind::CallsClass,
            3,
            "Helper()".into(),
            Some(Resolution::exact(ResolutionCase::ImportedClassCall)),
        );
        graph.add_edge(
            src,
            dst,
            EdgeKind::UsesType,
            1,
            "x: Helper".into(),
            Some(Resolution::exact(ResolutionCase::TypeAnnotation)),
        );

        assert_eq!(
            graph.edge_count(),
            2,
            "same endpoints with different kinds are distinct edges"
        );
    }

    #[test]
    fn test_containment_is_idempotent() {
        let mut graph = CodeGraph::new();
        let module = graph.add_node(test_node("a", NodeKind::Module));
        let func = graph.add_node(test_node("a.root", NodeKind::Function));

        let c1 = graph.add_containment(module, func);
        let c2 = graph.add_containment(module, func);
        assert_eq!(c1, c2);
        assert_eq!(graph.edge_count(), 1);
    }
}
