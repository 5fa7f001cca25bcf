/// The kind of directed edge between two nodes in the code graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// Structural containment: module → class, class → method, module → function.
    /// Never traversed for reachability.
    Contains,
    /// Importing module → imported module or symbol.
    Imports,
    /// Call site → free function.
    CallsFunction,
    /// Call site → method, via an instance whose class is known.
    CallsMethod,
    /// Call site → class (constructor call).
    CallsClass,
    /// Non-call dotted access on a module-level import → referenced symbol.
    CallsAttribute,
    /// Call through a callee that arrived as an injected parameter.
    CallsDependency,
    /// Callable passed as a thread/worker start target.
    CallsThreadTarget,
    /// Type-annotation reference → class.
    UsesType,
}

impl EdgeKind {
    /// All kinds except `Contains` are traversed by the reachability engine.
    pub fn carries_reachability(self) -> bool {
        !matches!(self, EdgeKind::Contains)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Contains => "CONTAINS",
            EdgeKind::Imports => "IMPORTS",
            EdgeKind::CallsFunction => "CALLS_FUNCTION",
            EdgeKind::CallsMethod => "CALLS_METHOD",
            EdgeKind::CallsClass => "CALLS_CLASS",
            EdgeKind::CallsAttribute => "CALLS_ATTRIBUTE",
            EdgeKind::CallsDependency => "CALLS_DEPENDENCY",
            EdgeKind::CallsThreadTarget => "CALLS_THREAD_TARGET",
            EdgeKind::UsesType => "USES_TYPE",
        }
    }
}

/// How sure the resolver is about an edge's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Single unambiguous target.
    Exact,
    /// Best-of-many index candidates, or a name-only guess.
    Fuzzy,
}

/// The syntactic pattern that produced a call/type-use edge.
///
/// Recorded on every reachability-carrying edge so downstream audits can tell
/// *why* the analyzer believes a relationship exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionCase {
    /// `Thing()` where `Thing` is an import binding to a class.
    ImportedClassCall,
    /// `helper()` where `helper` is an import binding to a callable.
    ImportedFunctionCall,
    /// Bare call to a definition in the same module.
    SameModuleCall,
    /// `mod.f()` where `mod` is a module binding.
    ModuleMemberCall,
    /// `obj.m()` where `obj` is a local variable bound to a known class.
    LocalInstanceMethod,
    /// `self.m()` inside a method body.
    SelfMethod,
    /// `mod.name` dotted access without a call.
    ModuleAttribute,
    /// Call through a parameter of the enclosing function.
    InjectedCallable,
    /// Callable passed via a `target=` keyword argument.
    ThreadTarget,
    /// Class referenced from a type annotation.
    TypeAnnotation,
    /// An `import`/`from ... import` statement.
    ModuleImport,
}

impl ResolutionCase {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionCase::ImportedClassCall => "imported_class_call",
            ResolutionCase::ImportedFunctionCall => "imported_function_call",
            ResolutionCase::SameModuleCall => "same_module_call",
            ResolutionCase::ModuleMemberCall => "module_member_call",
            ResolutionCase::LocalInstanceMethod => "local_instance_method",
            ResolutionCase::SelfMethod => "self_method",
            ResolutionCase::ModuleAttribute => "module_attribute",
            ResolutionCase::InjectedCallable => "injected_callable",
            ResolutionCase::ThreadTarget => "thread_target",
            ResolutionCase::TypeAnnotation => "type_annotation",
            ResolutionCase::ModuleImport => "module_import",
        }
    }
}

/// Provenance tag carried by every reachability-carrying edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    pub case: ResolutionCase,
    pub confidence: Confidence,
}

impl Resolution {
    pub fn exact(case: ResolutionCase) -> Self {
        Self {
            case,
            confidence: Confidence::Exact,
        }
    }

    pub fn fuzzy(case: ResolutionCase) -> Self {
        Self {
            case,
            confidence: Confidence::Fuzzy,
        }
    }
}

/// Payload of one merged edge.
///
/// After graph assembly no two edges share the same (source, target, kind)
/// triple — occurrences of the same relationship collapse into one `EdgeData`
/// with the union of their line numbers and detail strings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EdgeData {
    pub kind: EdgeKind,
    /// Sorted, de-duplicated 1-based line numbers of every occurrence.
    pub lines: Vec<u32>,
    /// Per-occurrence detail strings, de-duplicated, original order.
    pub details: Vec<String>,
    /// Mandatory for every kind but `Contains`. When occurrences disagree,
    /// the first non-null tag wins.
    pub resolution: Option<Resolution>,
    /// Number of raw occurrences merged into this edge. For simplified
    /// graphs: distinct (method-pair, line) occurrences absorbed.
    pub call_count: usize,
}

impl EdgeData {
    pub fn new(kind: EdgeKind, line: u32, detail: String, resolution: Option<Resolution>) -> Self {
        Self {
            kind,
            lines: vec![line],
            details: vec![detail],
            resolution,
            call_count: 1,
        }
    }

    /// Structural containment carries no resolution tag and no line site.
    pub fn contains() -> Self {
        Self {
            kind: EdgeKind::Contains,
            lines: Vec::new(),
            details: Vec::new(),
            resolution: None,
            call_count: 0,
        }
    }

    /// Fold one more occurrence of the same (source, target, kind) triple
    /// into this edge.
    pub fn merge_occurrence(&mut self, line: u32, detail: String, resolution: Option<Resolution>) {
        if let Err(pos) = self.lines.binary_search(&line) {
            self.lines.insert(pos, line);
        }
        if !self.details.contains(&detail) {
            self.details.push(detail);
        }
        if self.resolution.is_none() {
            self.resolution = resolution;
        }
        self.call_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_the_only_structural_kind() {
        assert!(!EdgeKind::Contains.carries_reachability());
        for kind in [
            EdgeKind::Imports,
            EdgeKind::CallsFunction,
            EdgeKind::CallsMethod,
            EdgeKind::CallsClass,
            EdgeKind::CallsAttribute,
            EdgeKind::CallsDependency,
            EdgeKind::CallsThreadTarget,
            EdgeKind::UsesType,
        ] {
            assert!(
                kind.carries_reachability(),
                "{} should carry reachability",
                kind.as_str()
            );
        }
    }

    #[test]
    fn test_merge_occurrence_unions_lines_sorted_unique() {
        let mut edge = EdgeData::new(
            EdgeKind::CallsFunction,
            12,
            "helper()".into(),
            Some(Resolution::exact(ResolutionCase::SameModuleCall)),
        );
        edge.merge_occurrence(4, "helper()".into(), None);
        edge.merge_occurrence(12, "helper()".into(), None);

        assert_eq!(edge.lines, vec![4, 12], "lines union, sorted, de-duplicated");
        assert_eq!(edge.details.len(), 1, "identical details collapse");
        assert_eq!(edge.call_count, 3, "every raw occurrence is counted");
    }

    #[test]
    fn test_merge_keeps_first_resolution_tag() {
        let mut edge = EdgeData::new(EdgeKind::CallsFunction, 1, "f()".into(), None);
        edge.merge_occurrence(
            2,
            "f()".into(),
            Some(Resolution::fuzzy(ResolutionCase::ImportedFunctionCall)),
        );
        edge.merge_occurrence(
            3,
            "f()".into(),
            Some(Resolution::exact(ResolutionCase::SameModuleCall)),
        );

        let resolution = edge.resolution.expect("first non-null tag is kept");
        assert_eq!(resolution.case, ResolutionCase::ImportedFunctionCall);
    }
}
