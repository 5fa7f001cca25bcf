use std::path::PathBuf;

/// The kind of code entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A source file, addressed by its dotted module path.
    Module,
    /// A class definition (possibly nested).
    Class,
    /// A free function, including functions nested inside other functions.
    Function,
    /// A function defined directly inside a class body.
    Method,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::Class => "class",
            NodeKind::Function => "function",
            NodeKind::Method => "method",
        }
    }
}

/// One code entity in the analyzed codebase.
///
/// The `id` is the fully-qualified dotted path (`pkg.mod.Class.method`) and is
/// unique per graph. A method's id is always prefixed by its class's id, a
/// class's or function's by its module's — containment edges are derived from
/// this prefix structure during graph assembly.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Node {
    /// Fully-qualified dotted id, unique per graph.
    pub id: String,
    /// Entity kind.
    pub kind: NodeKind,
    /// Architectural layer/category, assigned from the config path→layer map.
    /// `"unassigned"` when no mapping matches.
    pub layer: String,
    /// Project-relative path of the defining source file.
    pub file: PathBuf,
    /// Bare name (last dotted segment of `id`).
    pub name: String,
    /// 1-based line where the definition starts.
    pub start_line: u32,
    /// 1-based line where the definition ends (inclusive).
    pub end_line: u32,
    /// `end_line - start_line + 1`.
    pub line_count: u32,
    /// Leading docstring, if the first body statement is a string literal.
    pub docstring: Option<String>,
    /// Attribute names: class-body assignment targets plus `self.x` targets
    /// for classes; module-level assignment targets for modules.
    pub attributes: Vec<String>,
    /// Parameter names, in declaration order. Empty for modules and classes.
    pub params: Vec<String>,
    /// Source text of the return annotation, if any.
    pub return_type: Option<String>,
    /// Best-effort names of identifiers appearing in `return` statements.
    pub return_vars: Vec<String>,
    /// Set by the reachability pass — and only by it. Monotonic: once true,
    /// never reset within a run.
    pub reachable: bool,
    /// Discovery context: `"module"`, `"class:Name"`, or `"function:name"`.
    pub context: String,
}

impl Node {
    /// Id of the syntactic parent (`pkg.mod.Class.method` → `pkg.mod.Class`),
    /// or `None` for a module node.
    pub fn parent_id(&self) -> Option<&str> {
        if self.kind == NodeKind::Module {
            return None;
        }
        self.id.rsplit_once('.').map(|(parent, _)| parent)
    }
}
