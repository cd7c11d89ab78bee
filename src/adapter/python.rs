use std::cell::RefCell;
use std::path::Path;

use tree_sitter::{Node, Parser};

use crate::error::{CoreError, CoreResult};
use crate::model::{
    Edge, EdgeKind, ParsedFile, Symbol, SymbolKind, file_scope_id, file_scope_symbol, make_id,
    qualified_name,
};

use super::{AstAdapter, ScopeTable, end_line, node_text, start_line};

thread_local! {
    static PARSER_PY: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        p.set_language(&tree_sitter_python::LANGUAGE.into())
            .expect("valid python grammar");
        p
    });
}

pub struct PythonAdapter;

impl AstAdapter for PythonAdapter {
    fn parse(
        &self,
        project_root: &Path,
        absolute_path: &Path,
        relative_path: &str,
    ) -> CoreResult<ParsedFile> {
        let source = std::fs::read(absolute_path).map_err(|source| CoreError::Io {
            path: absolute_path.to_path_buf(),
            source,
        })?;
        let tree = PARSER_PY
            .with(|p| p.borrow_mut().parse(&source, None))
            .ok_or_else(|| CoreError::Parse {
                path: relative_path.to_string(),
                reason: "tree-sitter returned no tree".to_string(),
            })?;

        let mut walker = Walker {
            project_root,
            source: &source,
            file_path: relative_path.to_string(),
            scope: ScopeTable::new(relative_path),
            symbols: vec![file_scope_symbol(relative_path)],
            edges: Vec::new(),
            enclosing: Vec::new(),
            pending_method_calls: Vec::new(),
        };
        walker.collect_imports(tree.root_node());
        walker.walk(tree.root_node());
        walker.resolve_pending_method_calls();

        Ok(ParsedFile {
            file_path: relative_path.to_string(),
            symbols: walker.symbols,
            edges: walker.edges,
        })
    }
}

struct Walker<'a> {
    project_root: &'a Path,
    source: &'a [u8],
    file_path: String,
    scope: ScopeTable,
    symbols: Vec<Symbol>,
    edges: Vec<Edge>,
    enclosing: Vec<String>,
    /// Attribute calls on a receiver whose type can't be inferred: `(from_id, method_name, line)`,
    /// resolved once the full symbol table for this file is known.
    pending_method_calls: Vec<(String, String, usize)>,
}

impl<'a> Walker<'a> {
    fn enclosing_id(&self) -> String {
        self.enclosing
            .last()
            .cloned()
            .unwrap_or_else(|| file_scope_id(&self.file_path))
    }

    /// Fan out each pending unresolved-receiver call to every same-named method
    /// declared in this file; cross-file guesses are never made.
    fn resolve_pending_method_calls(&mut self) {
        for (from_id, name, line) in std::mem::take(&mut self.pending_method_calls) {
            for target in self
                .symbols
                .iter()
                .filter(|s| s.kind == SymbolKind::Method && s.name == name)
                .map(|s| s.id.clone())
                .collect::<Vec<_>>()
            {
                self.edges.push(Edge {
                    source: from_id.clone(),
                    target,
                    kind: EdgeKind::Calls,
                    file_path: self.file_path.clone(),
                    line,
                });
            }
        }
    }

    fn current_dir(&self) -> &Path {
        Path::new(&self.file_path).parent().unwrap_or_else(|| Path::new(""))
    }

    /// Resolve a relative-import module path (`.foo`, `..pkg.foo`, or bare `.`)
    /// to a project-relative file path, trying both `<path>.py` and
    /// `<path>/__init__.py`. Absolute (non-relative) imports are treated as
    /// external — Python gives no syntactic signal distinguishing a sibling
    /// project package from an installed one without the full project layout,
    /// so only dotted relative imports are resolved here.
    fn resolve_relative_module(&self, dots: usize, dotted_segments: &[&str]) -> Option<String> {
        let mut dir = self.current_dir().to_path_buf();
        // One leading dot means "this package" (the current file's directory);
        // each additional dot climbs one directory further up.
        for _ in 1..dots {
            dir = dir.parent().unwrap_or(Path::new("")).to_path_buf();
        }
        let joined = dotted_segments.iter().fold(dir, |acc, seg| acc.join(seg));
        let as_module = format!("{}.py", joined.to_string_lossy());
        let as_package = joined.join("__init__.py").to_string_lossy().into_owned();

        if self.project_root.join(&as_module).is_file() {
            Some(normalize_slashes(&as_module))
        } else if self.project_root.join(&as_package).is_file() {
            Some(normalize_slashes(&as_package))
        } else if dotted_segments.is_empty() {
            None
        } else {
            Some(normalize_slashes(&as_module))
        }
    }

    fn collect_imports(&mut self, root: Node) {
        let mut cursor = root.walk();
        for node in root.children(&mut cursor) {
            if node.kind() == "import_from_statement" {
                self.collect_from_import(node);
            }
        }
    }

    fn collect_from_import(&mut self, node: Node) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };

        let (dots, segments_text) = match module_node.kind() {
            "relative_import" => {
                let mut cursor = module_node.walk();
                let mut dots = 0usize;
                let mut dotted = None;
                for child in module_node.children(&mut cursor) {
                    match child.kind() {
                        "import_prefix" => dots = node_text(child, self.source).len(),
                        "dotted_name" => dotted = Some(node_text(child, self.source).to_string()),
                        _ => {}
                    }
                }
                (dots, dotted)
            }
            "dotted_name" => return, // absolute import: external, dropped
            _ => return,
        };

        let segments: Vec<&str> = segments_text
            .as_deref()
            .map(|s| s.split('.').collect())
            .unwrap_or_default();
        let Some(target_file) = self.resolve_relative_module(dots.max(1), &segments) else {
            return;
        };

        self.edges.push(Edge {
            source: file_scope_id(&self.file_path),
            target: file_scope_id(&target_file),
            kind: EdgeKind::Imports,
            file_path: self.file_path.clone(),
            line: start_line(node),
        });

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "dotted_name" => {
                    let imported = node_text(child, self.source);
                    self.scope
                        .add_import(imported, make_id(&target_file, imported));
                }
                "aliased_import" => {
                    let name_node = child.child_by_field_name("name");
                    let alias_node = child.child_by_field_name("alias");
                    if let (Some(name_node), Some(alias_node)) = (name_node, alias_node) {
                        let imported = node_text(name_node, self.source);
                        let alias = node_text(alias_node, self.source);
                        self.scope.add_import(alias, make_id(&target_file, imported));
                    }
                }
                _ => {}
            }
        }
    }

    fn walk(&mut self, node: Node) {
        match node.kind() {
            "function_definition" => self.visit_function(node),
            "class_definition" => self.visit_class(node),
            "assignment" => self.visit_assignment(node),
            "call" => self.visit_call(node),
            _ => {}
        }
        // Assignments are handled for their RHS inside visit_assignment, and
        // function/class definitions recurse into their own body with scope
        // push/pop — none of these three should be walked a second time here.
        if !matches!(node.kind(), "assignment" | "function_definition" | "class_definition") {
            self.recurse_children(node);
        }
    }

    fn recurse_children(&mut self, node: Node) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child);
        }
    }

    fn is_top_level(&self) -> bool {
        self.enclosing.is_empty()
    }

    fn visit_function(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();
        let scope = self.enclosing.last().cloned();
        let in_class = scope
            .as_deref()
            .map(|s| self.is_class_scope(s))
            .unwrap_or(false);
        let id = make_id(&self.file_path, &qualified_name(scope.as_deref(), &name));
        self.symbols.push(Symbol {
            id: id.clone(),
            name,
            kind: if in_class {
                SymbolKind::Method
            } else {
                SymbolKind::Function
            },
            file_path: self.file_path.clone(),
            start_line: start_line(node),
            end_line: end_line(node),
            exported: true, // Python has no access-modifier keyword; convention-based
            // leading-underscore privacy is left to callers to interpret from `name`.
            scope,
        });

        self.enclosing.push(id);
        self.scope.push_scope();
        if let Some(params) = node.child_by_field_name("parameters") {
            self.bind_params(params);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.recurse_children(body);
        }
        self.scope.pop_scope();
        self.enclosing.pop();
    }

    fn is_class_scope(&self, scope_name: &str) -> bool {
        self.symbols
            .iter()
            .any(|s| s.name == scope_name && s.kind == SymbolKind::Class)
    }

    fn bind_params(&mut self, params: Node) {
        let mut cursor = params.walk();
        for child in params.children(&mut cursor) {
            let ident = match child.kind() {
                "identifier" => Some(child),
                "typed_parameter" | "default_parameter" | "typed_default_parameter" => {
                    child.named_child(0)
                }
                _ => None,
            };
            if let Some(ident) = ident
                && ident.kind() == "identifier"
            {
                self.scope.bind_local(node_text(ident, self.source));
            }
        }
    }

    fn visit_class(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();
        let scope = self.enclosing.last().cloned();
        let id = make_id(&self.file_path, &qualified_name(scope.as_deref(), &name));
        self.symbols.push(Symbol {
            id: id.clone(),
            name: name.clone(),
            kind: SymbolKind::Class,
            file_path: self.file_path.clone(),
            start_line: start_line(node),
            end_line: end_line(node),
            exported: true,
            scope,
        });

        if let Some(bases) = node.child_by_field_name("superclasses") {
            let mut cursor = bases.walk();
            for base in bases.children(&mut cursor) {
                if base.kind() != "identifier" {
                    continue; // skip keyword args like metaclass=...
                }
                let base_name = node_text(base, self.source);
                if let Some(target) = self.scope.resolve(base_name) {
                    self.edges.push(Edge {
                        source: id.clone(),
                        target,
                        kind: EdgeKind::Extends,
                        file_path: self.file_path.clone(),
                        line: start_line(bases),
                    });
                }
            }
        }

        self.enclosing.push(id);
        if let Some(body) = node.child_by_field_name("body") {
            self.recurse_children(body);
        }
        self.enclosing.pop();
    }

    fn visit_assignment(&mut self, node: Node) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };

        if left.kind() == "identifier" {
            let name = node_text(left, self.source).to_string();
            if self.is_top_level() {
                let kind = if name.chars().all(|c| c.is_uppercase() || c == '_' || c.is_numeric())
                {
                    SymbolKind::Constant
                } else {
                    SymbolKind::Variable
                };
                self.symbols.push(Symbol {
                    id: make_id(&self.file_path, &name),
                    name,
                    kind,
                    file_path: self.file_path.clone(),
                    start_line: start_line(node),
                    end_line: end_line(node),
                    exported: true,
                    scope: None,
                });
            } else {
                self.scope.bind_local(name);
            }
        }

        if let Some(right) = node.child_by_field_name("right") {
            self.walk(right);
        }
    }

    fn visit_call(&mut self, node: Node) {
        let Some(callee) = node.child_by_field_name("function") else {
            return;
        };
        let from_id = self.enclosing_id();
        match callee.kind() {
            "identifier" => {
                let name = node_text(callee, self.source);
                let Some(target) = self.scope.resolve(name) else {
                    return;
                };
                // Whether `target` names a class (→ instantiates) or a function (→ calls)
                // can't always be answered from this file alone — an imported name may
                // resolve to a class defined elsewhere. The graph builder reclassifies
                // this edge once it has whole-project knowledge of node kinds.
                self.edges.push(Edge {
                    source: from_id,
                    target,
                    kind: EdgeKind::Calls,
                    file_path: self.file_path.clone(),
                    line: start_line(node),
                });
            }
            "attribute" => {
                if let Some(property) = callee.child_by_field_name("attribute") {
                    let name = node_text(property, self.source).to_string();
                    self.pending_method_calls.push((from_id, name, start_line(node)));
                }
            }
            _ => {}
        }
    }
}

fn normalize_slashes(path: &str) -> String {
    path.replace('\\', "/")
}
