use tree_sitter::{Node as TsNode, Tree};

use crate::parser::node_text;

// ---------------------------------------------------------------------------
// Import binding collection
//
// Bindings map a local name to the fully-qualified dotted target it stands
// for. Module-level bindings are visible to every body in the file;
// function-local import statements are collected again during the edge walk
// and shadow the module-level map for that body only.
// ---------------------------------------------------------------------------

/// One name bound by an `import` / `from ... import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    /// Name visible in the importing scope.
    pub local: String,
    /// Dotted target the local name resolves to when dereferenced.
    /// For `import a.b` this is `a` — attribute chains extend it back to
    /// `a.b.*` at use sites.
    pub target: String,
    /// The module or symbol the statement itself names — the target of the
    /// IMPORTS edge. For `import a.b` this is `a.b`.
    pub imported: String,
    /// 1-based line of the import statement.
    pub line: u32,
}

/// Collect bindings from the module's top-level statements only.
pub fn module_level_bindings(tree: &Tree, source: &[u8], module_id: &str) -> Vec<ImportBinding> {
    let root = tree.root_node();
    let mut bindings = Vec::new();
    let mut cursor = root.walk();
    for stmt in root.named_children(&mut cursor) {
        bindings.extend(bindings_from_statement(stmt, source, module_id));
    }
    bindings
}

/// Extract bindings from a single statement, if it is an import form.
/// Returns an empty vec for any other statement kind.
pub fn bindings_from_statement(stmt: TsNode, source: &[u8], module_id: &str) -> Vec<ImportBinding> {
    match stmt.kind() {
        "import_statement" => import_bindings(stmt, source),
        "import_from_statement" => from_import_bindings(stmt, source, module_id),
        _ => Vec::new(),
    }
}

/// `import a.b`, `import a.b as c`, `import x, y`.
fn import_bindings(stmt: TsNode, source: &[u8]) -> Vec<ImportBinding> {
    let line = stmt.start_position().row as u32 + 1;
    let mut out = Vec::new();
    let mut cursor = stmt.walk();
    for child in stmt.children_by_field_name("name", &mut cursor) {
        match child.kind() {
            "dotted_name" => {
                let dotted = node_text(child, source).to_string();
                // `import a.b` binds the head segment; the chain resolver
                // rebuilds `a.b.*` from attribute accesses.
                let head = dotted.split('.').next().unwrap_or(&dotted).to_string();
                out.push(ImportBinding {
                    local: head.clone(),
                    target: head,
                    imported: dotted,
                    line,
                });
            }
            "aliased_import" => {
                if let Some(name) = child.child_by_field_name("name")
                    && let Some(alias) = child.child_by_field_name("alias")
                {
                    let dotted = node_text(name, source).to_string();
                    out.push(ImportBinding {
                        local: node_text(alias, source).to_string(),
                        target: dotted.clone(),
                        imported: dotted,
                        line,
                    });
                }
            }
            _ => {}
        }
    }
    out
}

/// `from p.m import X`, `from p.m import X as Y`, `from . import sib`.
/// Wildcard imports bind nothing — an accepted precision loss.
fn from_import_bindings(stmt: TsNode, source: &[u8], module_id: &str) -> Vec<ImportBinding> {
    let line = stmt.start_position().row as u32 + 1;
    let Some(module_node) = stmt.child_by_field_name("module_name") else {
        return Vec::new();
    };
    let Some(base) = resolve_source_module(module_node, source, module_id) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    let mut cursor = stmt.walk();
    for child in stmt.children_by_field_name("name", &mut cursor) {
        match child.kind() {
            "dotted_name" => {
                let name = node_text(child, source).to_string();
                let target = join_dotted(&base, &name);
                out.push(ImportBinding {
                    local: name,
                    target: target.clone(),
                    imported: target,
                    line,
                });
            }
            "aliased_import" => {
                if let Some(name) = child.child_by_field_name("name")
                    && let Some(alias) = child.child_by_field_name("alias")
                {
                    let target = join_dotted(&base, node_text(name, source));
                    out.push(ImportBinding {
                        local: node_text(alias, source).to_string(),
                        target: target.clone(),
                        imported: target,
                        line,
                    });
                }
            }
            _ => {}
        }
    }
    out
}

/// Resolve the `from X` part to a dotted module path. Relative imports
/// resolve against the importing module's package: one leading dot strips
/// the module's own segment, each further dot strips one more.
fn resolve_source_module(module_node: TsNode, source: &[u8], module_id: &str) -> Option<String> {
    match module_node.kind() {
        "dotted_name" => Some(node_text(module_node, source).to_string()),
        "relative_import" => {
            let mut level = 0usize;
            let mut suffix: Option<String> = None;
            let mut cursor = module_node.walk();
            for child in module_node.children(&mut cursor) {
                match child.kind() {
                    "import_prefix" => level = node_text(child, source).chars().count(),
                    "dotted_name" => suffix = Some(node_text(child, source).to_string()),
                    _ => {}
                }
            }
            if level == 0 {
                return suffix;
            }
            let segments: Vec<&str> = module_id.split('.').collect();
            if level > segments.len() {
                // Relative import escaping the project root — unresolvable.
                return None;
            }
            let base = segments[..segments.len() - level].join(".");
            Some(match suffix {
                Some(s) => join_dotted(&base, &s),
                None => base,
            })
        }
        _ => None,
    }
}

fn join_dotted(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_python;

    fn bindings(source: &str, module_id: &str) -> Vec<ImportBinding> {
        let tree = parse_python(source.as_bytes()).expect("fixture parses");
        module_level_bindings(&tree, source.as_bytes(), module_id)
    }

    #[test]
    fn test_plain_import_binds_head_segment() {
        let b = bindings("import os.path\n", "pkg.mod");
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].local, "os");
        assert_eq!(b[0].target, "os");
        assert_eq!(b[0].imported, "os.path");
    }

    #[test]
    fn test_aliased_import() {
        let b = bindings("import pkg.helpers as h\n", "app");
        assert_eq!(b[0].local, "h");
        assert_eq!(b[0].target, "pkg.helpers");
    }

    #[test]
    fn test_from_import_with_alias() {
        let b = bindings("from pkg.svc import Service as Svc, helper\n", "app");
        assert_eq!(b.len(), 2);
        assert_eq!(b[0].local, "Svc");
        assert_eq!(b[0].target, "pkg.svc.Service");
        assert_eq!(b[1].local, "helper");
        assert_eq!(b[1].target, "pkg.svc.helper");
    }

    #[test]
    fn test_relative_import_resolves_against_package() {
        let b = bindings("from .sibling import thing\n", "pkg.mod");
        assert_eq!(b[0].target, "pkg.sibling.thing");

        let b = bindings("from .. import top\n", "pkg.sub.mod");
        assert_eq!(b[0].target, "pkg.top");
    }

    #[test]
    fn test_relative_import_escaping_root_is_dropped() {
        let b = bindings("from ... import nothing\n", "pkg.mod");
        assert!(b.is_empty(), "imports escaping the project root bind nothing");
    }

    #[test]
    fn test_wildcard_import_binds_nothing() {
        let b = bindings("from pkg.mod import *\n", "app");
        assert!(b.is_empty());
    }
}
