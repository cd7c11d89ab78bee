use std::cell::RefCell;

use std::path::Path;
use tree_sitter::{Node, Parser};

use crate::error::{CoreError, CoreResult};
use crate::model::{
    Edge, EdgeKind, ParsedFile, Symbol, SymbolKind, file_scope_id, file_scope_symbol, make_id,
    qualified_name,
};

use super::{AstAdapter, ScopeTable, end_line, node_text, resolve_relative_specifier, start_line};

const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

thread_local! {
    static PARSER_TS: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        p.set_language(&tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into())
            .expect("valid typescript grammar");
        p
    });
    static PARSER_TSX: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        p.set_language(&tree_sitter_typescript::LANGUAGE_TSX.into())
            .expect("valid tsx grammar");
        p
    });
    static PARSER_JS: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        p.set_language(&tree_sitter_javascript::LANGUAGE.into())
            .expect("valid javascript grammar");
        p
    });
}

pub struct TypeScriptAdapter;

impl AstAdapter for TypeScriptAdapter {
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
        let ext = absolute_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        let tree = match ext {
            "ts" => PARSER_TS.with(|p| p.borrow_mut().parse(&source, None)),
            "tsx" => PARSER_TSX.with(|p| p.borrow_mut().parse(&source, None)),
            "js" | "jsx" => PARSER_JS.with(|p| p.borrow_mut().parse(&source, None)),
            other => return Err(CoreError::UnsupportedExtension(other.to_string())),
        }
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
    /// Member calls on a receiver whose type can't be inferred: `(from_id, method_name, line)`,
    /// resolved once the full symbol table for this file is known, so a method declared later
    /// in the file still resolves.
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

    /// First pass: gather `import`/re-export statements into the scope table so
    /// forward references during the main walk resolve correctly regardless of
    /// where the import appears relative to its use.
    fn collect_imports(&mut self, root: Node) {
        let mut cursor = root.walk();
        for node in root.children(&mut cursor) {
            match node.kind() {
                "import_statement" => self.collect_import_statement(node),
                "export_statement" => {
                    if let Some(source) = node.child_by_field_name("source") {
                        self.collect_reexport(node, source);
                    }
                }
                _ => {}
            }
        }
    }

    fn resolve_specifier(&self, specifier: &str) -> Option<String> {
        if !specifier.starts_with('.') {
            return None; // bare specifier: external package, dropped
        }
        resolve_relative_specifier(
            self.project_root,
            &self.file_path,
            specifier,
            SOURCE_EXTENSIONS,
        )
    }

    fn collect_import_statement(&mut self, node: Node) {
        let Some(source_node) = node.child_by_field_name("source") else {
            return;
        };
        let specifier = strip_quotes(node_text(source_node, self.source));
        let Some(target_file) = self.resolve_specifier(specifier) else {
            return;
        };
        let target_file_scope = file_scope_id(&target_file);

        self.edges.push(Edge {
            source: file_scope_id(&self.file_path),
            target: target_file_scope,
            kind: EdgeKind::Imports,
            file_path: self.file_path.clone(),
            line: start_line(node),
        });

        let Some(clause) = node.child_by_field_name("import_clause") else {
            return;
        };
        self.collect_import_clause(clause, &target_file);
    }

    fn collect_import_clause(&mut self, clause: Node, target_file: &str) {
        let mut cursor = clause.walk();
        for child in clause.children(&mut cursor) {
            match child.kind() {
                "identifier" => {
                    // default import
                    let local = node_text(child, self.source);
                    self.scope
                        .add_import(local, make_id(target_file, "default"));
                }
                "namespace_import" => {
                    if let Some(ident) = child.named_child(0) {
                        let local = node_text(ident, self.source);
                        self.scope.add_import(local, file_scope_id(target_file));
                    }
                }
                "named_imports" => {
                    let mut spec_cursor = child.walk();
                    for spec in child.children(&mut spec_cursor) {
                        if spec.kind() != "import_specifier" {
                            continue;
                        }
                        let name_node = spec.child_by_field_name("name");
                        let alias_node = spec.child_by_field_name("alias");
                        if let Some(name_node) = name_node {
                            let imported = node_text(name_node, self.source);
                            let local = alias_node
                                .map(|a| node_text(a, self.source))
                                .unwrap_or(imported);
                            self.scope
                                .add_import(local, make_id(target_file, imported));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// `export { X } from './m'` — make `X`, used downstream, resolve through to
    /// the original definition in `./m` without a separate reference edge.
    fn collect_reexport(&mut self, node: Node, source_node: Node) {
        let specifier = strip_quotes(node_text(source_node, self.source));
        let Some(target_file) = self.resolve_specifier(specifier) else {
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
            if child.kind() != "export_clause" {
                continue;
            }
            let mut spec_cursor = child.walk();
            for spec in child.children(&mut spec_cursor) {
                if spec.kind() != "export_specifier" {
                    continue;
                }
                let name_node = spec.child_by_field_name("name");
                let alias_node = spec.child_by_field_name("alias");
                if let Some(name_node) = name_node {
                    let exported_name = node_text(name_node, self.source);
                    let local = alias_node
                        .map(|a| node_text(a, self.source))
                        .unwrap_or(exported_name);
                    self.scope
                        .add_import(local, make_id(&target_file, exported_name));
                }
            }
        }
    }

    fn walk(&mut self, node: Node) {
        match node.kind() {
            // These manage their own recursion into the body with scope
            // push/pop, so the trailing recurse below must not re-walk them.
            "function_declaration" => {
                self.visit_function(node);
                return;
            }
            "class_declaration" => {
                self.visit_class(node);
                return;
            }
            "interface_declaration" => self.visit_interface(node),
            "type_alias_declaration" => self.visit_type_alias(node),
            "enum_declaration" => self.visit_enum(node),
            "lexical_declaration" | "variable_declaration" => self.visit_variable(node),
            "call_expression" => self.visit_call(node),
            "new_expression" => self.visit_new(node),
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

    fn is_exported(&self, node: Node) -> bool {
        node.parent()
            .map(|p| p.kind() == "export_statement")
            .unwrap_or(false)
    }

    fn visit_function(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();
        let scope = self.enclosing.last().cloned();
        let id = make_id(&self.file_path, &qualified_name(scope.as_deref(), &name));
        self.symbols.push(Symbol {
            id: id.clone(),
            name,
            kind: SymbolKind::Function,
            file_path: self.file_path.clone(),
            start_line: start_line(node),
            end_line: end_line(node),
            exported: self.is_exported(node),
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

    fn bind_params(&mut self, params: Node) {
        let mut cursor = params.walk();
        for child in params.children(&mut cursor) {
            let ident = match child.kind() {
                "identifier" => Some(child),
                "required_parameter" | "optional_parameter" => child.child_by_field_name("pattern"),
                _ => None,
            };
            if let Some(ident) = ident {
                self.scope.bind_local(node_text(ident, self.source));
            }
        }
    }

    fn visit_class(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();
        let id = make_id(&self.file_path, &name);
        self.symbols.push(Symbol {
            id: id.clone(),
            name: name.clone(),
            kind: SymbolKind::Class,
            file_path: self.file_path.clone(),
            start_line: start_line(node),
            end_line: end_line(node),
            exported: self.is_exported(node),
            scope: None,
        });

        self.emit_heritage_edges(node, &id);

        self.enclosing.push(id.clone());
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_class_body(body, &name);
        }
        self.enclosing.pop();
    }

    fn emit_heritage_edges(&mut self, class_node: Node, from_id: &str) {
        let Some(heritage) = find_descendant(class_node, "class_heritage") else {
            // JS grammar: extends is a direct field on the class node.
            if let Some(superclass) = class_node.child_by_field_name("superclass")
                && let Some(target) = first_identifier_text(superclass, self.source)
            {
                self.emit_resolved_edge(from_id, target, EdgeKind::Extends, start_line(class_node));
            }
            return;
        };
        let mut cursor = heritage.walk();
        for clause in heritage.children(&mut cursor) {
            let kind = match clause.kind() {
                "extends_clause" => EdgeKind::Extends,
                "implements_clause" => EdgeKind::Implements,
                _ => continue,
            };
            let mut id_cursor = clause.walk();
            for ident_node in clause.children(&mut id_cursor) {
                if let Some(target) = first_identifier_text(ident_node, self.source) {
                    self.emit_resolved_edge(from_id, target, kind, start_line(clause));
                }
            }
        }
    }

    fn emit_resolved_edge(&mut self, from_id: &str, target_name: &str, kind: EdgeKind, line: usize) {
        if let Some(target) = self.scope.resolve(target_name) {
            self.edges.push(Edge {
                source: from_id.to_string(),
                target,
                kind,
                file_path: self.file_path.clone(),
                line,
            });
        }
    }

    fn visit_class_body(&mut self, body: Node, class_name: &str) {
        let mut cursor = body.walk();
        for member in body.children(&mut cursor) {
            if member.kind() != "method_definition" {
                continue;
            }
            let Some(name_node) = member.child_by_field_name("name") else {
                continue;
            };
            let name = node_text(name_node, self.source).to_string();
            let id = make_id(&self.file_path, &qualified_name(Some(class_name), &name));
            self.symbols.push(Symbol {
                id: id.clone(),
                name,
                kind: SymbolKind::Method,
                file_path: self.file_path.clone(),
                start_line: start_line(member),
                end_line: end_line(member),
                exported: false,
                scope: Some(class_name.to_string()),
            });

            self.enclosing.push(id);
            self.scope.push_scope();
            if let Some(params) = member.child_by_field_name("parameters") {
                self.bind_params(params);
            }
            if let Some(mbody) = member.child_by_field_name("body") {
                self.recurse_children(mbody);
            }
            self.scope.pop_scope();
            self.enclosing.pop();
        }
    }

    fn visit_interface(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();
        let id = make_id(&self.file_path, &name);
        self.symbols.push(Symbol {
            id: id.clone(),
            name,
            kind: SymbolKind::Interface,
            file_path: self.file_path.clone(),
            start_line: start_line(node),
            end_line: end_line(node),
            exported: self.is_exported(node),
            scope: None,
        });
        if let Some(extends) = find_descendant(node, "extends_type_clause")
            .or_else(|| find_descendant(node, "extends_clause"))
        {
            let mut cursor = extends.walk();
            for child in extends.children(&mut cursor) {
                if let Some(target) = first_identifier_text(child, self.source) {
                    self.emit_resolved_edge(&id, target, EdgeKind::Extends, start_line(extends));
                }
            }
        }
    }

    fn visit_type_alias(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();
        let id = make_id(&self.file_path, &name);
        self.symbols.push(Symbol {
            id,
            name,
            kind: SymbolKind::TypeAlias,
            file_path: self.file_path.clone(),
            start_line: start_line(node),
            end_line: end_line(node),
            exported: self.is_exported(node),
            scope: None,
        });
    }

    fn visit_enum(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();
        let id = make_id(&self.file_path, &name);
        self.symbols.push(Symbol {
            id,
            name,
            kind: SymbolKind::Enum,
            file_path: self.file_path.clone(),
            start_line: start_line(node),
            end_line: end_line(node),
            exported: self.is_exported(node),
            scope: None,
        });
    }

    /// Only top-level variable declarations become symbols; declarations
    /// nested inside a function body are local bindings, tracked in the
    /// scope table instead.
    fn visit_variable(&mut self, node: Node) {
        let is_const = node_text(node, self.source).trim_start().starts_with("const");
        let at_top_level = self.enclosing.is_empty();

        let mut cursor = node.walk();
        for declarator in node.children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                continue;
            }
            let Some(name_node) = declarator.child_by_field_name("name") else {
                continue;
            };
            if name_node.kind() != "identifier" {
                continue; // destructuring patterns are not modeled as symbols
            }
            let name = node_text(name_node, self.source).to_string();

            if !at_top_level {
                self.scope.bind_local(name);
                continue;
            }

            let kind = if is_const {
                SymbolKind::Constant
            } else {
                SymbolKind::Variable
            };
            let is_function_value = declarator
                .child_by_field_name("value")
                .map(|v| matches!(v.kind(), "arrow_function" | "function_expression"))
                .unwrap_or(false);
            let id = make_id(&self.file_path, &name);
            self.symbols.push(Symbol {
                id,
                name,
                kind: if is_function_value {
                    SymbolKind::Function
                } else {
                    kind
                },
                file_path: self.file_path.clone(),
                start_line: start_line(node),
                end_line: end_line(node),
                exported: self.is_exported(node),
                scope: None,
            });
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
                self.emit_resolved_edge(&from_id, name, EdgeKind::Calls, start_line(node));
            }
            "member_expression" => {
                if let Some(property) = callee.child_by_field_name("property") {
                    let name = node_text(property, self.source).to_string();
                    // Receiver type cannot be inferred: fan out to every same-named
                    // method in this file once the full symbol table is known.
                    self.pending_method_calls.push((from_id, name, start_line(node)));
                }
            }
            _ => {}
        }
    }

    fn visit_new(&mut self, node: Node) {
        let Some(callee) = node
            .child_by_field_name("constructor")
            .or_else(|| node.named_child(0))
        else {
            return;
        };
        if let Some(target) = first_identifier_text(callee, self.source) {
            let from_id = self.enclosing_id();
            self.emit_resolved_edge(&from_id, target, EdgeKind::Instantiates, start_line(node));
        }
    }
}

fn strip_quotes(text: &str) -> &str {
    text.trim_matches(|c| c == '\'' || c == '"' || c == '`')
}

fn find_descendant<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    if node.kind() == kind {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = find_descendant(child, kind) {
            return Some(found);
        }
    }
    None
}

fn first_identifier_text<'a>(node: Node, source: &'a [u8]) -> Option<&'a str> {
    match node.kind() {
        "identifier" | "type_identifier" | "property_identifier" => {
            Some(node_text(node, source))
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if let Some(found) = first_identifier_text(child, source) {
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

    fn parse_snippet(source: &str, ext: &str) -> ParsedFile {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("a.{ext}"));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(source.as_bytes()).unwrap();
        TypeScriptAdapter
            .parse(dir.path(), &path, &format!("a.{ext}"))
            .unwrap()
    }

    #[test]
    fn extracts_exported_function() {
        let parsed = parse_snippet("export function foo() {}\n", "ts");
        let sym = parsed
            .symbols
            .iter()
            .find(|s| s.name == "foo")
            .expect("foo symbol");
        assert_eq!(sym.kind, SymbolKind::Function);
        assert!(sym.exported);
        assert_eq!(sym.id, "a.ts::foo");
    }

    #[test]
    fn extracts_class_extends() {
        let parsed = parse_snippet("class Dog extends Animal {}\n", "ts");
        let edge = parsed
            .edges
            .iter()
            .find(|e| e.kind == EdgeKind::Extends)
            .expect("extends edge");
        assert_eq!(edge.source, "a.ts::Dog");
        assert_eq!(edge.target, "a.ts::Animal");
    }

    #[test]
    fn extracts_method_scope() {
        let parsed = parse_snippet("class Foo { bar() {} }\n", "ts");
        let method = parsed
            .symbols
            .iter()
            .find(|s| s.name == "bar")
            .expect("method symbol");
        assert_eq!(method.kind, SymbolKind::Method);
        assert_eq!(method.scope.as_deref(), Some("Foo"));
        assert_eq!(method.id, "a.ts::Foo.bar");
    }

    #[test]
    fn top_level_const_is_constant_unless_function_valued() {
        let parsed = parse_snippet("export const X = 1;\nconst f = () => {};\n", "ts");
        let x = parsed.symbols.iter().find(|s| s.name == "X").unwrap();
        assert_eq!(x.kind, SymbolKind::Constant);
        let f = parsed.symbols.iter().find(|s| s.name == "f").unwrap();
        assert_eq!(f.kind, SymbolKind::Function);
    }

    #[test]
    fn new_expression_emits_instantiates() {
        let parsed = parse_snippet("function main() { new UserService(); }\n", "ts");
        let edge = parsed
            .edges
            .iter()
            .find(|e| e.kind == EdgeKind::Instantiates)
            .expect("instantiates edge");
        assert_eq!(edge.source, "a.ts::main");
        assert_eq!(edge.target, "a.ts::UserService");
    }

    #[test]
    fn bare_specifier_import_is_dropped() {
        let parsed = parse_snippet("import { useState } from 'react';\n", "ts");
        assert!(parsed.edges.iter().all(|e| e.kind != EdgeKind::Imports));
    }

    #[test]
    fn method_call_on_unresolved_receiver_targets_the_scoped_method_id() {
        let parsed = parse_snippet("class Dog { bark() {} }\nfunction use(d) { d.bark(); }\n", "ts");
        let calls: Vec<_> = parsed.edges.iter().filter(|e| e.kind == EdgeKind::Calls).collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target, "a.ts::Dog.bark");
        assert_eq!(calls[0].source, "a.ts::use");
    }

    #[test]
    fn method_call_on_unresolved_receiver_fans_out_to_every_same_named_method() {
        let parsed = parse_snippet(
            "class Dog { bark() {} }\nclass Seal { bark() {} }\nfunction use(x) { x.bark(); }\n",
            "ts",
        );
        let targets: Vec<_> = parsed
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Calls)
            .map(|e| e.target.as_str())
            .collect();
        assert_eq!(targets.len(), 2);
        assert!(targets.contains(&"a.ts::Dog.bark"));
        assert!(targets.contains(&"a.ts::Seal.bark"));
    }

    #[test]
    fn method_call_with_no_matching_method_emits_no_edge() {
        let parsed = parse_snippet("function use(x) { x.bark(); }\n", "ts");
        assert!(parsed.edges.iter().all(|e| e.kind != EdgeKind::Calls));
    }
}
