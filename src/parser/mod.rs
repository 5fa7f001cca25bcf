pub mod edges;
pub mod imports;
pub mod nodes;

use std::cell::RefCell;
use std::path::Path;

use tree_sitter::{Node, Parser, Tree};

// Thread-local Parser instances — one per rayon worker thread, zero lock
// contention. Initialised once per thread with the Python grammar.
thread_local! {
    static PARSER_PY: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        p.set_language(&tree_sitter_python::LANGUAGE.into()).unwrap();
        p
    });
}

/// Parse Python source using the calling thread's Parser instance.
///
/// Returns `None` when tree-sitter cannot produce a tree (truncated or
/// non-UTF-8 input). A `None` here is a per-file warning for the caller,
/// never a run-level failure.
pub fn parse_python(source: &[u8]) -> Option<Tree> {
    PARSER_PY.with(|p| p.borrow_mut().parse(source, None))
}

/// Extract the UTF-8 text of a node from the original source bytes.
pub fn node_text<'a>(node: Node<'a>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// Derive the dotted module id from a project-relative path.
///
/// `pkg/mod.py` → `pkg.mod`; a package's `__init__.py` maps to the package
/// itself: `pkg/__init__.py` → `pkg`.
pub fn module_id_for_path(rel_path: &Path) -> String {
    let no_ext = rel_path.with_extension("");
    let mut segments: Vec<String> = no_ext
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.last().map(String::as_str) == Some("__init__") {
        segments.pop();
    }
    if segments.is_empty() {
        // A bare `__init__.py` at the project root.
        return "__init__".into();
    }
    segments.join(".")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_module_id_from_nested_path() {
        assert_eq!(
            module_id_for_path(&PathBuf::from("pkg/sub/mod.py")),
            "pkg.sub.mod"
        );
    }

    #[test]
    fn test_init_py_maps_to_package() {
        assert_eq!(module_id_for_path(&PathBuf::from("pkg/__init__.py")), "pkg");
    }

    #[test]
    fn test_top_level_file() {
        assert_eq!(module_id_for_path(&PathBuf::from("app.py")), "app");
    }

    #[test]
    fn test_parse_python_handles_valid_source() {
        let tree = parse_python(b"def f():\n    return 1\n").expect("valid source parses");
        assert_eq!(tree.root_node().kind(), "module");
    }
}
