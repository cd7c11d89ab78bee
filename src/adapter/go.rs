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
    static PARSER_GO: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        p.set_language(&tree_sitter_go::LANGUAGE.into())
            .expect("valid go grammar");
        p
    });
}

pub struct GoAdapter;

impl AstAdapter for GoAdapter {
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
        let tree = PARSER_GO
            .with(|p| p.borrow_mut().parse(&source, None))
            .ok_or_else(|| CoreError::Parse {
                path: relative_path.to_string(),
                reason: "tree-sitter returned no tree".to_string(),
            })?;

        let module_name = read_go_module_name(project_root);

        let mut walker = Walker {
            project_root,
            module_name: module_name.as_deref(),
            source: &source,
            file_path: relative_path.to_string(),
            scope: ScopeTable::new(relative_path),
            symbols: vec![file_scope_symbol(relative_path)],
            edges: Vec::new(),
            enclosing: Vec::new(),
            pending_method_calls: Vec::new(),
        };
        walker.walk(tree.root_node());
        walker.resolve_pending_method_calls();

        Ok(ParsedFile {
            file_path: relative_path.to_string(),
            symbols: walker.symbols,
            edges: walker.edges,
        })
    }
}

/// Read the module name from a `go.mod` at the project root, if present.
fn read_go_module_name(project_root: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(project_root.join("go.mod")).ok()?;
    contents.lines().find_map(|line| {
        let trimmed = line.trim();
        trimmed.strip_prefix("module ").map(|rest| rest.trim().to_string())
    })
}

struct Walker<'a> {
    project_root: &'a Path,
    module_name: Option<&'a str>,
    source: &'a [u8],
    file_path: String,
    scope: ScopeTable,
    symbols: Vec<Symbol>,
    edges: Vec<Edge>,
    enclosing: Vec<String>,
    /// Selector calls on a receiver whose type can't be inferred: `(from_id, method_name, line)`,
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

    fn walk(&mut self, node: Node) {
        match node.kind() {
            "import_declaration" => self.visit_import_declaration(node),
            // These walk their own body via walk_body with scope push/pop,
            // so the trailing recurse below must not re-walk them.
            "function_declaration" => {
                self.visit_function(node);
                return;
            }
            "method_declaration" => {
                self.visit_method(node);
                return;
            }
            "type_declaration" => self.visit_type_declaration(node),
            "const_declaration" => self.visit_const_or_var(node, true),
            "var_declaration" => self.visit_const_or_var(node, false),
            "call_expression" => self.visit_call(node),
            "composite_literal" => self.visit_composite_literal(node),
            _ => {}
        }
        self.recurse_children(node);
    }

    fn recurse_children(&mut self, node: Node) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.walk(child);
        }
    }

    fn visit_import_declaration(&mut self, node: Node) {
        let mut specs = Vec::new();
        collect_import_specs(node, &mut specs);
        for spec in specs {
            let Some(path_node) = spec.child_by_field_name("path") else {
                continue;
            };
            let import_path = node_text(path_node, self.source)
                .trim_matches('"')
                .to_string();
            self.emit_package_import(node, &import_path);
        }
    }

    fn emit_package_import(&mut self, import_node: Node, import_path: &str) {
        let Some(module_name) = self.module_name else {
            return;
        };
        let package_dir = if import_path == module_name {
            String::new()
        } else if let Some(rest) = import_path.strip_prefix(&format!("{module_name}/")) {
            rest.to_string()
        } else {
            return; // external package: stdlib or third-party, dropped
        };

        let dir = self.project_root.join(&package_dir);
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let is_go = path.extension().and_then(|e| e.to_str()) == Some("go");
            let is_test = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with("_test.go"))
                .unwrap_or(false);
            if !is_go || is_test {
                continue;
            }
            let rel = if package_dir.is_empty() {
                path.file_name().unwrap().to_string_lossy().into_owned()
            } else {
                format!("{package_dir}/{}", path.file_name().unwrap().to_string_lossy())
            };
            self.edges.push(Edge {
                source: file_scope_id(&self.file_path),
                target: file_scope_id(&rel),
                kind: EdgeKind::Imports,
                file_path: self.file_path.clone(),
                line: start_line(import_node),
            });
        }
    }

    fn visit_function(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();
        let id = make_id(&self.file_path, &name);
        self.symbols.push(Symbol {
            id: id.clone(),
            name: name.clone(),
            kind: SymbolKind::Function,
            file_path: self.file_path.clone(),
            start_line: start_line(node),
            end_line: end_line(node),
            exported: name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false),
            scope: None,
        });
        self.walk_body(node, id);
    }

    fn visit_method(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();
        let receiver_type = node
            .child_by_field_name("receiver")
            .and_then(|r| receiver_type_name(r, self.source));
        let id = make_id(
            &self.file_path,
            &qualified_name(receiver_type.as_deref(), &name),
        );
        self.symbols.push(Symbol {
            id: id.clone(),
            name: name.clone(),
            kind: SymbolKind::Method,
            file_path: self.file_path.clone(),
            start_line: start_line(node),
            end_line: end_line(node),
            exported: name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false),
            scope: receiver_type,
        });
        self.walk_body(node, id);
    }

    fn walk_body(&mut self, node: Node, id: String) {
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

    fn bind_params(&mut self, params: Node) {
        let mut cursor = params.walk();
        for child in params.children(&mut cursor) {
            if child.kind() != "parameter_declaration" {
                continue;
            }
            let mut name_cursor = child.walk();
            for grandchild in child.children(&mut name_cursor) {
                if grandchild.kind() == "identifier" {
                    self.scope.bind_local(node_text(grandchild, self.source));
                }
            }
        }
    }

    fn visit_type_declaration(&mut self, node: Node) {
        let mut specs = Vec::new();
        collect_type_specs(node, &mut specs);
        for spec in specs {
            let Some(name_node) = spec.child_by_field_name("name") else {
                continue;
            };
            let name = node_text(name_node, self.source).to_string();
            let Some(type_node) = spec.child_by_field_name("type") else {
                continue;
            };
            let kind = match type_node.kind() {
                "struct_type" => SymbolKind::Class,
                "interface_type" => SymbolKind::Interface,
                _ => SymbolKind::TypeAlias,
            };
            self.symbols.push(Symbol {
                id: make_id(&self.file_path, &name),
                name: name.clone(),
                kind,
                file_path: self.file_path.clone(),
                start_line: start_line(node),
                end_line: end_line(node),
                exported: name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false),
                scope: None,
            });
        }
    }

    fn visit_const_or_var(&mut self, node: Node, is_const: bool) {
        let spec_kind = if is_const { "const_spec" } else { "var_spec" };
        let mut cursor = node.walk();
        for spec in node.children(&mut cursor) {
            if spec.kind() != spec_kind {
                continue;
            }
            let Some(name_list) = spec.child_by_field_name("name") else {
                continue;
            };
            for name_node in collect_identifiers(name_list) {
                let name = node_text(name_node, self.source).to_string();
                if !self.enclosing.is_empty() {
                    self.scope.bind_local(name);
                    continue;
                }
                self.symbols.push(Symbol {
                    id: make_id(&self.file_path, &name),
                    name: name.clone(),
                    kind: if is_const {
                        SymbolKind::Constant
                    } else {
                        SymbolKind::Variable
                    },
                    file_path: self.file_path.clone(),
                    start_line: start_line(node),
                    end_line: end_line(node),
                    exported: name.chars().next().map(|c| c.is_uppercase()).unwrap_or(false),
                    scope: None,
                });
            }
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
                if name == "new" || name == "make" {
                    self.emit_instantiates_from_first_arg(node, &from_id);
                    return;
                }
                if let Some(target) = self.scope.resolve(name) {
                    self.edges.push(Edge {
                        source: from_id,
                        target,
                        kind: EdgeKind::Calls,
                        file_path: self.file_path.clone(),
                        line: start_line(node),
                    });
                }
            }
            "selector_expression" => {
                if let Some(field) = callee.child_by_field_name("field") {
                    let name = node_text(field, self.source).to_string();
                    // Receiver type cannot be inferred: fan out to every same-named
                    // method in this file once the full symbol table is known.
                    self.pending_method_calls.push((from_id, name, start_line(node)));
                }
            }
            _ => {}
        }
    }

    fn emit_instantiates_from_first_arg(&mut self, call_node: Node, from_id: &str) {
        let Some(args) = call_node.child_by_field_name("arguments") else {
            return;
        };
        let Some(first) = args.named_child(0) else {
            return;
        };
        if let Some(type_name) = base_type_name(first, self.source)
            && let Some(target) = self.scope.resolve(&type_name)
        {
            self.edges.push(Edge {
                source: from_id.to_string(),
                target,
                kind: EdgeKind::Instantiates,
                file_path: self.file_path.clone(),
                line: start_line(call_node),
            });
        }
    }

    fn visit_composite_literal(&mut self, node: Node) {
        let Some(type_node) = node.child_by_field_name("type") else {
            return;
        };
        let Some(type_name) = base_type_name(type_node, self.source) else {
            return;
        };
        let from_id = self.enclosing_id();
        if let Some(target) = self.scope.resolve(&type_name) {
            self.edges.push(Edge {
                source: from_id,
                target,
                kind: EdgeKind::Instantiates,
                file_path: self.file_path.clone(),
                line: start_line(node),
            });
        }
    }
}

fn collect_import_specs<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_spec" => out.push(child),
            "import_spec_list" => collect_import_specs(child, out),
            _ => {}
        }
    }
}

fn collect_type_specs<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "type_spec" => out.push(child),
            "type_spec_list" => collect_type_specs(child, out),
            _ => {}
        }
    }
}

fn collect_identifiers(node: Node) -> Vec<Node> {
    if node.kind() == "identifier" {
        return vec![node];
    }
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "identifier" {
            out.push(child);
        }
    }
    out
}

/// Name of the receiver's base type, stripped of a leading `*` for pointer
/// receivers: `func (d *Dog) Bark()` yields `Dog`.
fn receiver_type_name(receiver: Node, source: &[u8]) -> Option<String> {
    let mut cursor = receiver.walk();
    for param in receiver.children(&mut cursor) {
        if param.kind() != "parameter_declaration" {
            continue;
        }
        if let Some(type_node) = param.child_by_field_name("type") {
            return base_type_name(type_node, source);
        }
    }
    None
}

/// Strip a leading `*` (pointer type) and any package qualifier, returning the
/// bare type name.
fn base_type_name(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "pointer_type" => node.named_child(0).and_then(|c| base_type_name(c, source)),
        "type_identifier" | "identifier" => Some(node_text(node, source).to_string()),
        "qualified_type" => node
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string()),
        _ => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if let Some(found) = base_type_name(child, source) {
                    return Some(found);
                }
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse_snippet(source: &str) -> ParsedFile {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.go");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(source.as_bytes()).unwrap();
        GoAdapter.parse(dir.path(), &path, "a.go").unwrap()
    }

    #[test]
    fn extracts_function_and_struct() {
        let parsed = parse_snippet(
            "package main\n\nfunc Foo() {}\n\ntype Dog struct {\n    Name string\n}\n",
        );
        let foo = parsed.symbols.iter().find(|s| s.name == "Foo").unwrap();
        assert_eq!(foo.kind, SymbolKind::Function);
        assert!(foo.exported);
        let dog = parsed.symbols.iter().find(|s| s.name == "Dog").unwrap();
        assert_eq!(dog.kind, SymbolKind::Class);
    }

    #[test]
    fn method_scope_is_receiver_type() {
        let parsed = parse_snippet(
            "package main\n\ntype Dog struct{}\n\nfunc (d *Dog) Bark() {}\n",
        );
        let bark = parsed.symbols.iter().find(|s| s.name == "Bark").unwrap();
        assert_eq!(bark.kind, SymbolKind::Method);
        assert_eq!(bark.scope.as_deref(), Some("Dog"));
        assert_eq!(bark.id, "a.go::Dog.Bark");
    }

    #[test]
    fn interface_type_is_interface_kind() {
        let parsed = parse_snippet("package main\n\ntype Speaker interface {\n    Speak()\n}\n");
        let speaker = parsed.symbols.iter().find(|s| s.name == "Speaker").unwrap();
        assert_eq!(speaker.kind, SymbolKind::Interface);
    }

    #[test]
    fn unexported_lowercase_names_are_not_exported() {
        let parsed = parse_snippet("package main\n\nfunc helper() {}\n");
        let helper = parsed.symbols.iter().find(|s| s.name == "helper").unwrap();
        assert!(!helper.exported);
    }

    #[test]
    fn composite_literal_emits_instantiates() {
        let parsed = parse_snippet(
            "package main\n\ntype Dog struct{}\n\nfunc main() {\n    d := Dog{}\n    _ = d\n}\n",
        );
        let edge = parsed
            .edges
            .iter()
            .find(|e| e.kind == EdgeKind::Instantiates)
            .expect("instantiates edge");
        assert_eq!(edge.target, "a.go::Dog");
    }

    #[test]
    fn selector_call_on_unresolved_receiver_targets_the_scoped_method_id() {
        let parsed = parse_snippet(
            "package main\n\ntype Dog struct{}\n\nfunc (d *Dog) Bark() {}\n\nfunc use(d *Dog) {\n    d.Bark()\n}\n",
        );
        let calls: Vec<_> = parsed.edges.iter().filter(|e| e.kind == EdgeKind::Calls).collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target, "a.go::Dog.Bark");
    }

    #[test]
    fn selector_call_fans_out_to_every_same_named_method() {
        let parsed = parse_snippet(
            "package main\n\ntype Dog struct{}\ntype Seal struct{}\n\nfunc (d *Dog) Bark() {}\nfunc (s *Seal) Bark() {}\n\nfunc use(x interface{ Bark() }) {\n    x.Bark()\n}\n",
        );
        let targets: Vec<_> = parsed
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Calls)
            .map(|e| e.target.as_str())
            .collect();
        assert_eq!(targets.len(), 2);
        assert!(targets.contains(&"a.go::Dog.Bark"));
        assert!(targets.contains(&"a.go::Seal.Bark"));
    }

    #[test]
    fn selector_call_with_no_matching_method_emits_no_edge() {
        let parsed = parse_snippet("package main\n\nfunc use(x interface{ Bark() }) {\n    x.Bark()\n}\n");
        assert!(parsed.edges.iter().all(|e| e.kind != EdgeKind::Calls));
    }
}
