use std::path::Path;

use tree_sitter::{Node as TsNode, Tree};

use crate::graph::node::{Node, NodeKind};
use crate::parser::node_text;

// ---------------------------------------------------------------------------
// Pass 1 — node extraction
//
// One parse per file. Emits a Node for the module and every (possibly
// nested) class, function, and method, in depth-first source order. No edges
// are produced here: cross-file resolution needs the completed callable
// index, which cannot exist until every file's nodes are known.
// ---------------------------------------------------------------------------

/// Syntactic context of the definition currently being walked.
#[derive(Clone)]
enum Ctx {
    Module,
    Class(String),
    Function(String),
}

impl Ctx {
    fn label(&self) -> String {
        match self {
            Ctx::Module => "module".into(),
            Ctx::Class(name) => format!("class:{name}"),
            Ctx::Function(name) => format!("function:{name}"),
        }
    }
}

/// Extract all nodes from one parsed file.
///
/// `rel_path` is the project-relative path (drives the dotted module id),
/// `layer` the caller-supplied architectural category for this file.
/// Output order is deterministic for unchanged input: module first, then
/// definitions in depth-first source order.
pub fn extract_nodes(rel_path: &Path, source: &[u8], tree: &Tree, layer: &str) -> Vec<Node> {
    let module_id = crate::parser::module_id_for_path(rel_path);
    let root = tree.root_node();
    let mut nodes = Vec::new();

    let end_line = (root.end_position().row as u32).max(1);
    nodes.push(Node {
        id: module_id.clone(),
        kind: NodeKind::Module,
        layer: layer.into(),
        file: rel_path.to_path_buf(),
        name: module_id.rsplit('.').next().unwrap_or(&module_id).into(),
        start_line: 1,
        end_line,
        line_count: end_line,
        docstring: docstring_of_block(root, source),
        attributes: assignment_targets(root, source),
        params: Vec::new(),
        return_type: None,
        return_vars: Vec::new(),
        reachable: false,
        context: "module".into(),
    });

    walk_block(root, source, rel_path, layer, &module_id, &Ctx::Module, &mut nodes);
    nodes
}

/// Recurse over the statements of `block`, emitting nodes for each
/// definition found and descending into definition bodies.
fn walk_block(
    block: TsNode,
    source: &[u8],
    rel_path: &Path,
    layer: &str,
    prefix: &str,
    ctx: &Ctx,
    out: &mut Vec<Node>,
) {
    let mut cursor = block.walk();
    for stmt in block.named_children(&mut cursor) {
        // Decorators wrap the definition one level down.
        let def = if stmt.kind() == "decorated_definition" {
            match stmt.child_by_field_name("definition") {
                Some(d) => d,
                None => continue,
            }
        } else {
            stmt
        };

        match def.kind() {
            "class_definition" => {
                let Some(name_node) = def.child_by_field_name("name") else {
                    continue;
                };
                let name = node_text(name_node, source).to_string();
                let id = format!("{prefix}.{name}");
                out.push(make_node(
                    &id,
                    NodeKind::Class,
                    &name,
                    def,
                    source,
                    rel_path,
                    layer,
                    ctx,
                ));
                if let Some(body) = def.child_by_field_name("body") {
                    walk_block(body, source, rel_path, layer, &id, &Ctx::Class(name), out);
                }
            }
            "function_definition" => {
                let Some(name_node) = def.child_by_field_name("name") else {
                    continue;
                };
                let name = node_text(name_node, source).to_string();
                let id = format!("{prefix}.{name}");
                let kind = match ctx {
                    Ctx::Class(_) => NodeKind::Method,
                    _ => NodeKind::Function,
                };
                out.push(make_node(&id, kind, &name, def, source, rel_path, layer, ctx));
                if let Some(body) = def.child_by_field_name("body") {
                    walk_block(body, source, rel_path, layer, &id, &Ctx::Function(name), out);
                }
            }
            _ => {}
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn make_node(
    id: &str,
    kind: NodeKind,
    name: &str,
    def: TsNode,
    source: &[u8],
    rel_path: &Path,
    layer: &str,
    ctx: &Ctx,
) -> Node {
    let start_line = def.start_position().row as u32 + 1;
    let end_line = def.end_position().row as u32 + 1;

    let body = def.child_by_field_name("body");
    let docstring = body.and_then(|b| docstring_of_block(b, source));

    let (params, return_type, return_vars, attributes) = match kind {
        NodeKind::Class => {
            let attrs = body
                .map(|b| class_attributes(b, source))
                .unwrap_or_default();
            (Vec::new(), None, Vec::new(), attrs)
        }
        _ => {
            let params = def
                .child_by_field_name("parameters")
                .map(|p| parameter_names(p, source))
                .unwrap_or_default();
            let return_type = def
                .child_by_field_name("return_type")
                .map(|t| node_text(t, source).to_string());
            let return_vars = body.map(|b| return_variable_names(b, source)).unwrap_or_default();
            (params, return_type, return_vars, Vec::new())
        }
    };

    Node {
        id: id.into(),
        kind,
        layer: layer.into(),
        file: rel_path.to_path_buf(),
        name: name.into(),
        start_line,
        end_line,
        line_count: end_line - start_line + 1,
        docstring,
        attributes,
        params,
        return_type,
        return_vars,
        reachable: false,
        context: ctx.label(),
    }
}

// ---------------------------------------------------------------------------
// Metadata helpers
// ---------------------------------------------------------------------------

/// Docstring of a block: the string literal of a leading expression statement.
fn docstring_of_block(block: TsNode, source: &[u8]) -> Option<String> {
    let first = block.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    if expr.kind() != "string" {
        return None;
    }
    let mut content = String::new();
    let mut cursor = expr.walk();
    for part in expr.named_children(&mut cursor) {
        if part.kind() == "string_content" {
            content.push_str(node_text(part, source));
        }
    }
    Some(content.trim().to_string())
}

/// Names bound by direct assignments in a block (module level or class body).
fn assignment_targets(block: TsNode, source: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = block.walk();
    for stmt in block.named_children(&mut cursor) {
        if stmt.kind() != "expression_statement" {
            continue;
        }
        let Some(expr) = stmt.named_child(0) else {
            continue;
        };
        if expr.kind() != "assignment" {
            continue;
        }
        if let Some(left) = expr.child_by_field_name("left")
            && left.kind() == "identifier"
        {
            push_unique(&mut names, node_text(left, source));
        }
    }
    names
}

/// Class attribute names: class-body assignment targets plus `self.x`
/// assignment targets found anywhere inside the class's method bodies.
fn class_attributes(body: TsNode, source: &[u8]) -> Vec<String> {
    let mut names = assignment_targets(body, source);
    collect_self_assignments(body, source, &mut names);
    names
}

fn collect_self_assignments(node: TsNode, source: &[u8], out: &mut Vec<String>) {
    if node.kind() == "assignment"
        && let Some(left) = node.child_by_field_name("left")
        && left.kind() == "attribute"
        && let Some(object) = left.child_by_field_name("object")
        && object.kind() == "identifier"
        && node_text(object, source) == "self"
        && let Some(attr) = left.child_by_field_name("attribute")
    {
        push_unique(out, node_text(attr, source));
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_self_assignments(child, source, out);
    }
}

/// Parameter names in declaration order, covering plain, typed, defaulted,
/// `*args`, and `**kwargs` forms. Bare `*` and `/` separators are skipped.
fn parameter_names(params: TsNode, source: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        match param.kind() {
            "identifier" => names.push(node_text(param, source).to_string()),
            "typed_parameter" => {
                if let Some(inner) = param.named_child(0)
                    && inner.kind() == "identifier"
                {
                    names.push(node_text(inner, source).to_string());
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                if let Some(name) = param.child_by_field_name("name") {
                    names.push(node_text(name, source).to_string());
                }
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                if let Some(inner) = param.named_child(0)
                    && inner.kind() == "identifier"
                {
                    names.push(node_text(inner, source).to_string());
                }
            }
            _ => {}
        }
    }
    names
}

/// Best-effort names of identifiers returned by a function body. Descends
/// into control flow but not into nested definitions, whose returns belong
/// to the nested entity.
fn return_variable_names(body: TsNode, source: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    collect_returns(body, source, &mut names);
    names
}

fn collect_returns(node: TsNode, source: &[u8], out: &mut Vec<String>) {
    if matches!(node.kind(), "function_definition" | "class_definition") {
        return;
    }
    if node.kind() == "return_statement" {
        if let Some(expr) = node.named_child(0) {
            match expr.kind() {
                "identifier" => push_unique(out, node_text(expr, source)),
                "expression_list" => {
                    let mut cursor = expr.walk();
                    for item in expr.named_children(&mut cursor) {
                        if item.kind() == "identifier" {
                            push_unique(out, node_text(item, source));
                        }
                    }
                }
                _ => {}
            }
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_returns(child, source, out);
    }
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::parser::parse_python;

    fn extract(source: &str) -> Vec<Node> {
        let tree = parse_python(source.as_bytes()).expect("fixture parses");
        extract_nodes(&PathBuf::from("pkg/mod.py"), source.as_bytes(), &tree, "unassigned")
    }

    #[test]
    fn test_module_class_method_function_ids() {
        let nodes = extract(
            "class Service:\n    def run(self):\n        pass\n\ndef helper():\n    pass\n",
        );
        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["pkg.mod", "pkg.mod.Service", "pkg.mod.Service.run", "pkg.mod.helper"],
            "ids follow depth-first source order with dotted nesting"
        );
        assert_eq!(nodes[2].kind, NodeKind::Method);
        assert_eq!(nodes[3].kind, NodeKind::Function);
    }

    #[test]
    fn test_nested_function_is_function_kind() {
        let nodes = extract("def outer():\n    def inner():\n        pass\n");
        let inner = nodes.iter().find(|n| n.name == "inner").unwrap();
        assert_eq!(inner.id, "pkg.mod.outer.inner");
        assert_eq!(inner.kind, NodeKind::Function);
        assert_eq!(inner.context, "function:outer");
    }

    #[test]
    fn test_docstring_params_and_return_type() {
        let nodes = extract(
            "def fetch(url, timeout=5) -> str:\n    \"\"\"Fetch a url.\"\"\"\n    body = get(url)\n    return body\n",
        );
        let fetch = nodes.iter().find(|n| n.name == "fetch").unwrap();
        assert_eq!(fetch.docstring.as_deref(), Some("Fetch a url."));
        assert_eq!(fetch.params, vec!["url", "timeout"]);
        assert_eq!(fetch.return_type.as_deref(), Some("str"));
        assert_eq!(fetch.return_vars, vec!["body"]);
    }

    #[test]
    fn test_class_attributes_include_self_assignments() {
        let nodes = extract(
            "class Config:\n    retries = 3\n    def __init__(self):\n        self.timeout = 10\n",
        );
        let class = nodes.iter().find(|n| n.name == "Config").unwrap();
        assert_eq!(class.attributes, vec!["retries", "timeout"]);
    }

    #[test]
    fn test_decorated_definitions_are_extracted() {
        let nodes = extract("@app.route('/')\ndef index():\n    pass\n");
        assert!(
            nodes.iter().any(|n| n.id == "pkg.mod.index"),
            "decorated function should still produce a node"
        );
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let source = "class A:\n    def m(self):\n        pass\n\ndef f():\n    pass\n";
        let first: Vec<String> = extract(source).into_iter().map(|n| n.id).collect();
        let second: Vec<String> = extract(source).into_iter().map(|n| n.id).collect();
        assert_eq!(first, second, "same input must yield identical node ids in order");
    }
}
