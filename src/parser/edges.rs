use std::collections::{HashMap, HashSet};
use std::path::Path;

use tree_sitter::{Node as TsNode, Tree};

use crate::graph::edge::{Confidence, EdgeKind, Resolution, ResolutionCase};
use crate::graph::node::NodeKind;
use crate::index::CallableIndex;
use crate::parser::imports::{ImportBinding, bindings_from_statement, module_level_bindings};
use crate::parser::node_text;

// ---------------------------------------------------------------------------
// Pass 2 — edge extraction
//
// Re-parses each file with the completed callable index in hand and
// classifies every call-like expression into a typed, provenance-tagged
// edge. Resolution is best-effort and degrades gracefully: an expression
// that matches no pattern produces no edge, never an error.
// ---------------------------------------------------------------------------

/// One unmerged edge occurrence, produced per file. The graph builder merges
/// occurrences sharing a (source, target, kind) triple.
#[derive(Debug, Clone)]
pub struct RawEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    pub line: u32,
    pub detail: String,
    pub resolution: Resolution,
}

/// Per-body resolution scope.
struct Scope {
    /// Id of the node edges originate from: the enclosing function, method,
    /// class (for class-body statements), or the module itself.
    source_id: String,
    /// Import bindings visible here: module-level map, shadowed by any
    /// function-local imports encountered so far.
    bindings: HashMap<String, String>,
    /// Local variable → class id, tracked through `x = ClassName(...)`
    /// assignments. Reassignment overwrites — an accepted tradeoff, not
    /// type inference.
    local_classes: HashMap<String, String>,
    /// Parameter names of the enclosing function.
    params: HashSet<String>,
    /// Owning class id when the enclosing function is a method.
    self_class: Option<String>,
}

/// Extract all edges from one parsed file, resolving against `index`.
pub fn extract_edges(
    rel_path: &Path,
    source: &[u8],
    tree: &Tree,
    index: &CallableIndex,
) -> Vec<RawEdge> {
    let module_id = crate::parser::module_id_for_path(rel_path);
    let mut walker = EdgeWalker {
        source,
        module_id: module_id.clone(),
        index,
        edges: Vec::new(),
    };

    let root = tree.root_node();
    let module_bindings = module_level_bindings(tree, source, &module_id);
    let mut bindings = HashMap::new();
    for binding in &module_bindings {
        walker.emit_import(&module_id, binding);
        bindings.insert(binding.local.clone(), binding.target.clone());
    }

    // Module-level statements execute at import time; edges from them
    // originate at the module node.
    let mut scope = Scope {
        source_id: module_id.clone(),
        bindings,
        local_classes: HashMap::new(),
        params: HashSet::new(),
        self_class: None,
    };
    walker.walk_block(root, &mut scope, &module_id, None);
    walker.edges
}

struct EdgeWalker<'a> {
    source: &'a [u8],
    module_id: String,
    index: &'a CallableIndex,
    edges: Vec<RawEdge>,
}

impl<'a> EdgeWalker<'a> {
    // -- block / statement dispatch ------------------------------------------

    /// Walk the statements of a block. Definitions found here get their own
    /// scopes (and their own recursive walk); everything else is classified
    /// against the current scope.
    fn walk_block(
        &mut self,
        block: TsNode,
        scope: &mut Scope,
        prefix: &str,
        in_class: Option<&str>,
    ) {
        let mut cursor = block.walk();
        let children: Vec<TsNode> = block.named_children(&mut cursor).collect();
        for stmt in children {
            let def = if stmt.kind() == "decorated_definition" {
                match stmt.child_by_field_name("definition") {
                    Some(d) => d,
                    None => continue,
                }
            } else {
                stmt
            };

            match def.kind() {
                "class_definition" => self.walk_class(def, scope, prefix),
                "function_definition" => self.walk_function(def, scope, prefix, in_class),
                "import_statement" | "import_from_statement" => {
                    // Module-level imports were already collected (and their
                    // IMPORTS edges emitted) before the walk, so that later
                    // statements and earlier-defined bodies both see them.
                    let module_level = scope.source_id == self.module_id;
                    for binding in bindings_from_statement(def, self.source, &self.module_id) {
                        if !module_level {
                            self.emit_import(&scope.source_id, &binding);
                        }
                        scope.bindings.insert(binding.local, binding.target);
                    }
                }
                _ => self.walk_stmt(def, scope),
            }
        }
    }

    fn walk_class(&mut self, def: TsNode, outer: &Scope, prefix: &str) {
        let Some(name_node) = def.child_by_field_name("name") else {
            return;
        };
        let class_id = format!("{prefix}.{}", node_text(name_node, self.source));
        let Some(body) = def.child_by_field_name("body") else {
            return;
        };
        // Class-body statements (attribute defaults, annotations) originate
        // at the class node; methods get their own scopes below.
        let mut scope = Scope {
            source_id: class_id.clone(),
            bindings: outer.bindings.clone(),
            local_classes: HashMap::new(),
            params: HashSet::new(),
            self_class: None,
        };
        let class_name = node_text(name_node, self.source).to_string();
        self.walk_block(body, &mut scope, &class_id, Some(&class_name));
    }

    fn walk_function(
        &mut self,
        def: TsNode,
        outer: &Scope,
        prefix: &str,
        in_class: Option<&str>,
    ) {
        let Some(name_node) = def.child_by_field_name("name") else {
            return;
        };
        let fn_id = format!("{prefix}.{}", node_text(name_node, self.source));

        let params = def
            .child_by_field_name("parameters")
            .map(|p| self.annotated_params(p, &fn_id, outer))
            .unwrap_or_default();

        if let Some(ret) = def.child_by_field_name("return_type") {
            self.emit_annotation_refs(ret, &fn_id, outer);
        }

        let self_class = in_class.map(|_| prefix.to_string());
        let mut scope = Scope {
            source_id: fn_id.clone(),
            bindings: outer.bindings.clone(),
            local_classes: HashMap::new(),
            params,
            self_class,
        };
        if let Some(body) = def.child_by_field_name("body") {
            self.walk_block(body, &mut scope, &fn_id, None);
        }
    }

    /// A non-definition statement: track local class bindings, then classify
    /// every call-like expression in its subtree.
    fn walk_stmt(&mut self, stmt: TsNode, scope: &mut Scope) {
        if stmt.kind() == "expression_statement"
            && let Some(expr) = stmt.named_child(0)
            && expr.kind() == "assignment"
        {
            self.handle_assignment(expr, scope);
            return;
        }
        self.walk_expr(stmt, scope);
    }

    fn handle_assignment(&mut self, assign: TsNode, scope: &mut Scope) {
        // `x: Thing = ...` / `x: Thing` — the annotation is a type use.
        if let Some(ty) = assign.child_by_field_name("type") {
            let source_id = scope.source_id.clone();
            self.emit_annotation_refs(ty, &source_id, scope);
        }

        let left = assign.child_by_field_name("left");
        let right = assign.child_by_field_name("right");

        // `x = ClassName(...)` binds x to the class for later `x.method()`
        // classification. Any other right-hand side clears a previous binding.
        if let (Some(left), Some(right)) = (left, right) {
            if left.kind() == "identifier" {
                let var = node_text(left, self.source).to_string();
                match self.constructor_class(right, scope) {
                    Some(class_id) => {
                        scope.local_classes.insert(var, class_id);
                    }
                    None => {
                        scope.local_classes.remove(&var);
                    }
                }
            }
            self.walk_expr(right, scope);
        } else if let Some(right) = right {
            self.walk_expr(right, scope);
        }
    }

    /// If `expr` is a call whose callee resolves to a class, return that
    /// class's id.
    fn constructor_class(&self, expr: TsNode, scope: &Scope) -> Option<String> {
        if expr.kind() != "call" {
            return None;
        }
        let function = expr.child_by_field_name("function")?;
        let (target, kind, _, _) = self.resolve_callee(function, scope)?;
        (kind == NodeKind::Class).then_some(target)
    }

    // -- expression dispatch -------------------------------------------------

    /// Generic expression walk. Calls and bare attribute accesses are
    /// classified; nested definitions were already handled by walk_block and
    /// are skipped here.
    fn walk_expr(&mut self, node: TsNode, scope: &mut Scope) {
        match node.kind() {
            "function_definition" | "class_definition" | "decorated_definition" => {}
            "call" => {
                self.classify_call(node, scope);
                // Recurse into arguments and into a non-trivial callee
                // (e.g. `factory().run()` still classifies `factory()`).
                if let Some(function) = node.child_by_field_name("function") {
                    if function.kind() == "call" {
                        self.walk_expr(function, scope);
                    } else if function.kind() == "attribute"
                        && let Some(object) = function.child_by_field_name("object")
                        && !matches!(object.kind(), "identifier")
                    {
                        self.walk_expr(object, scope);
                    }
                }
                if let Some(args) = node.child_by_field_name("arguments") {
                    let mut cursor = args.walk();
                    let children: Vec<TsNode> = args.named_children(&mut cursor).collect();
                    for arg in children {
                        self.walk_expr(arg, scope);
                    }
                }
            }
            "attribute" => {
                self.classify_attribute_access(node, scope);
                if let Some(object) = node.child_by_field_name("object")
                    && !matches!(object.kind(), "identifier" | "attribute")
                {
                    self.walk_expr(object, scope);
                }
            }
            _ => {
                let mut cursor = node.walk();
                let children: Vec<TsNode> = node.named_children(&mut cursor).collect();
                for child in children {
                    self.walk_expr(child, scope);
                }
            }
        }
    }

    // -- classification ------------------------------------------------------

    /// Classify one call expression. Patterns are tried in priority order;
    /// anything unmatched falls through to no edge.
    fn classify_call(&mut self, call: TsNode, scope: &mut Scope) {
        let line = call.start_position().row as u32 + 1;
        let Some(function) = call.child_by_field_name("function") else {
            return;
        };
        let detail = format!("{}()", node_text(function, self.source));

        if let Some((target, target_kind, case, confidence)) = self.resolve_callee(function, scope) {
            let kind = if case == ResolutionCase::InjectedCallable {
                Some(EdgeKind::CallsDependency)
            } else {
                match target_kind {
                    NodeKind::Class => Some(EdgeKind::CallsClass),
                    NodeKind::Method => Some(EdgeKind::CallsMethod),
                    NodeKind::Function => Some(EdgeKind::CallsFunction),
                    NodeKind::Module => None,
                }
            };
            if let Some(kind) = kind {
                self.edges.push(RawEdge {
                    source: scope.source_id.clone(),
                    target,
                    kind,
                    line,
                    detail,
                    resolution: Resolution { case, confidence },
                });
            }
        }

        // A `target=` keyword naming a callable is a thread/worker start
        // handoff, reported in addition to any constructor edge above.
        self.classify_thread_target(call, scope, line);
    }

    /// Resolve a callee expression to (target id, target kind, case,
    /// confidence). Returns `None` for anything the syntactic patterns
    /// cannot resolve.
    fn resolve_callee(
        &self,
        function: TsNode,
        scope: &Scope,
    ) -> Option<(String, NodeKind, ResolutionCase, Confidence)> {
        match function.kind() {
            "identifier" => {
                let name = node_text(function, self.source);

                // 1–2. Bare name bound by an import.
                if let Some(target) = scope.bindings.get(name) {
                    let kind = self.index.kind_of(target)?;
                    let case = match kind {
                        NodeKind::Class => ResolutionCase::ImportedClassCall,
                        _ => ResolutionCase::ImportedFunctionCall,
                    };
                    return Some((target.clone(), kind, case, Confidence::Exact));
                }

                // 3. Sibling nested definition, then same-module definition.
                for candidate in [
                    format!("{}.{name}", scope.source_id),
                    format!("{}.{name}", self.module_id),
                ] {
                    if let Some(kind) = self.index.kind_of(&candidate) {
                        return Some((
                            candidate,
                            kind,
                            ResolutionCase::SameModuleCall,
                            Confidence::Exact,
                        ));
                    }
                }

                // 8. Injected parameter, invoked. Target is an index-ranked
                // guess by name — always lower confidence.
                if scope.params.contains(name) {
                    let (target, _) = self.index.resolve(name, &self.module_id)?;
                    let kind = self.index.kind_of(&target)?;
                    if kind == NodeKind::Module {
                        return None;
                    }
                    return Some((
                        target,
                        kind,
                        ResolutionCase::InjectedCallable,
                        Confidence::Fuzzy,
                    ));
                }

                None
            }
            "attribute" => {
                let chain = flatten_chain(function, self.source)?;
                let (head, rest) = chain.split_first()?;

                // 4a. `self.m()` inside a method.
                if head == "self"
                    && let Some(class_id) = &scope.self_class
                    && rest.len() == 1
                {
                    let candidate = format!("{class_id}.{}", rest[0]);
                    let kind = self.index.kind_of(&candidate)?;
                    return Some((candidate, kind, ResolutionCase::SelfMethod, Confidence::Exact));
                }

                // 4b. `obj.m()` where obj is a tracked local instance.
                if let Some(class_id) = scope.local_classes.get(head)
                    && rest.len() == 1
                {
                    let candidate = format!("{class_id}.{}", rest[0]);
                    let kind = self.index.kind_of(&candidate)?;
                    return Some((
                        candidate,
                        kind,
                        ResolutionCase::LocalInstanceMethod,
                        Confidence::Exact,
                    ));
                }

                // 5. `mod.f()` on an import binding.
                if let Some(base) = scope.bindings.get(head) {
                    let candidate = join_chain(base, rest);
                    let kind = self.index.kind_of(&candidate)?;
                    return Some((
                        candidate,
                        kind,
                        ResolutionCase::ModuleMemberCall,
                        Confidence::Exact,
                    ));
                }

                None
            }
            _ => None,
        }
    }

    /// Emit a `CallsThreadTarget` edge for `target=<callable>` keyword
    /// arguments that resolve to a known node.
    fn classify_thread_target(&mut self, call: TsNode, scope: &Scope, line: u32) {
        let Some(args) = call.child_by_field_name("arguments") else {
            return;
        };
        let mut cursor = args.walk();
        for arg in args.named_children(&mut cursor) {
            if arg.kind() != "keyword_argument" {
                continue;
            }
            let Some(name) = arg.child_by_field_name("name") else {
                continue;
            };
            if node_text(name, self.source) != "target" {
                continue;
            }
            let Some(value) = arg.child_by_field_name("value") else {
                continue;
            };
            if let Some((target, kind, _, confidence)) = self.resolve_callee(value, scope)
                && matches!(kind, NodeKind::Function | NodeKind::Method | NodeKind::Class)
            {
                self.edges.push(RawEdge {
                    source: scope.source_id.clone(),
                    target,
                    kind: EdgeKind::CallsThreadTarget,
                    line,
                    detail: format!("target={}", node_text(value, self.source)),
                    resolution: Resolution {
                        case: ResolutionCase::ThreadTarget,
                        confidence,
                    },
                });
            }
        }
    }

    /// A dotted access that is not itself a call: `mod.name` on a module
    /// binding references the named symbol without invoking it.
    fn classify_attribute_access(&mut self, attr: TsNode, scope: &Scope) {
        let Some(chain) = flatten_chain(attr, self.source) else {
            return;
        };
        let Some((head, rest)) = chain.split_first() else {
            return;
        };
        if head == "self" || scope.local_classes.contains_key(head) {
            return;
        }
        let Some(base) = scope.bindings.get(head) else {
            return;
        };
        let candidate = join_chain(base, rest);
        if !self.index.contains_id(&candidate) {
            return;
        }
        self.edges.push(RawEdge {
            source: scope.source_id.clone(),
            target: candidate,
            kind: EdgeKind::CallsAttribute,
            line: attr.start_position().row as u32 + 1,
            detail: node_text(attr, self.source).to_string(),
            resolution: Resolution::exact(ResolutionCase::ModuleAttribute),
        });
    }

    // -- annotations ---------------------------------------------------------

    /// Collect parameter names, emitting `UsesType` edges for any annotated
    /// parameter along the way.
    fn annotated_params(&mut self, params: TsNode, fn_id: &str, outer: &Scope) -> HashSet<String> {
        let mut names = HashSet::new();
        let mut cursor = params.walk();
        let children: Vec<TsNode> = params.named_children(&mut cursor).collect();
        for param in children {
            match param.kind() {
                "identifier" => {
                    names.insert(node_text(param, self.source).to_string());
                }
                "typed_parameter" | "typed_default_parameter" => {
                    let name = param
                        .child_by_field_name("name")
                        .or_else(|| param.named_child(0))
                        .filter(|n| n.kind() == "identifier");
                    if let Some(name) = name {
                        names.insert(node_text(name, self.source).to_string());
                    }
                    if let Some(ty) = param.child_by_field_name("type") {
                        self.emit_annotation_refs(ty, fn_id, outer);
                    }
                }
                "default_parameter" => {
                    if let Some(name) = param.child_by_field_name("name") {
                        names.insert(node_text(name, self.source).to_string());
                    }
                }
                "list_splat_pattern" | "dictionary_splat_pattern" => {
                    if let Some(inner) = param.named_child(0)
                        && inner.kind() == "identifier"
                    {
                        names.insert(node_text(inner, self.source).to_string());
                    }
                }
                _ => {}
            }
        }
        names
    }

    /// Emit `UsesType` edges for every class reference inside an annotation
    /// subtree. Handles bare names, dotted names, and names nested inside
    /// generics like `list[Service]`.
    fn emit_annotation_refs(&mut self, annotation: TsNode, source_id: &str, scope: &Scope) {
        let line = annotation.start_position().row as u32 + 1;
        let mut targets = Vec::new();
        collect_annotation_names(annotation, self.source, &mut targets);
        for chain in targets {
            let candidate = match chain.split_first() {
                Some((head, rest)) => {
                    if let Some(base) = scope.bindings.get(head) {
                        join_chain(base, rest)
                    } else if rest.is_empty() {
                        format!("{}.{head}", self.module_id)
                    } else {
                        continue;
                    }
                }
                None => continue,
            };
            if self.index.kind_of(&candidate) != Some(NodeKind::Class) {
                continue;
            }
            self.edges.push(RawEdge {
                source: source_id.to_string(),
                target: candidate,
                kind: EdgeKind::UsesType,
                line,
                detail: node_text(annotation, self.source).to_string(),
                resolution: Resolution::exact(ResolutionCase::TypeAnnotation),
            });
        }
    }

    // -- imports -------------------------------------------------------------

    /// IMPORTS edge from the importing scope to the imported module or
    /// symbol, when the target exists in the analyzed codebase.
    fn emit_import(&mut self, source_id: &str, binding: &ImportBinding) {
        if !self.index.contains_id(&binding.imported) {
            return;
        }
        self.edges.push(RawEdge {
            source: source_id.to_string(),
            target: binding.imported.clone(),
            kind: EdgeKind::Imports,
            line: binding.line,
            detail: binding.imported.clone(),
            resolution: Resolution::exact(ResolutionCase::ModuleImport),
        });
    }
}

// ---------------------------------------------------------------------------
// Chain helpers
// ---------------------------------------------------------------------------

/// Flatten a pure identifier attribute chain (`a.b.c`) into its segments.
/// Returns `None` when the chain's root is anything but an identifier.
fn flatten_chain(node: TsNode, source: &[u8]) -> Option<Vec<String>> {
    match node.kind() {
        "identifier" => Some(vec![node_text(node, source).to_string()]),
        "attribute" => {
            let object = node.child_by_field_name("object")?;
            let attr = node.child_by_field_name("attribute")?;
            let mut chain = flatten_chain(object, source)?;
            chain.push(node_text(attr, source).to_string());
            Some(chain)
        }
        _ => None,
    }
}

fn join_chain(base: &str, rest: &[String]) -> String {
    let mut id = base.to_string();
    for segment in rest {
        id.push('.');
        id.push_str(segment);
    }
    id
}

/// Collect identifier chains used in type position within an annotation,
/// descending through generics and unions.
fn collect_annotation_names(node: TsNode, source: &[u8], out: &mut Vec<Vec<String>>) {
    match node.kind() {
        "identifier" => out.push(vec![node_text(node, source).to_string()]),
        "attribute" => {
            if let Some(chain) = flatten_chain(node, source) {
                out.push(chain);
            }
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect_annotation_names(child, source, out);
            }
        }
    }
}
