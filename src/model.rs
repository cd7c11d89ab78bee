use serde::{Deserialize, Serialize};

/// The closed set of symbol kinds this graph can represent. `Import` is synthetic —
/// reserved for the per-file anchor node, never emitted by an adapter as a regular
/// declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    TypeAlias,
    Enum,
    Variable,
    Constant,
    Import,
}

/// The closed set of edge kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Calls,
    References,
    Extends,
    Implements,
    Imports,
    Instantiates,
}

/// A declared named entity: function, type, class, variable, or the synthetic
/// per-file import anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "startLine")]
    pub start_line: usize,
    #[serde(rename = "endLine")]
    pub end_line: usize,
    pub exported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// A reference from one symbol to another, discovered while walking a file's AST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub line: usize,
}

/// The output of an AST adapter for a single source file: a normalized, still
/// unresolved-against-the-rest-of-the-project `(symbols, edges)` tuple.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub file_path: String,
    pub symbols: Vec<Symbol>,
    pub edges: Vec<Edge>,
}

/// Build a symbol id from a file path and a qualified name:
/// `name` for top-level declarations, `scope.name` for nested ones.
pub fn make_id(file_path: &str, qualified_name: &str) -> String {
    format!("{file_path}::{qualified_name}")
}

/// The synthetic per-file node id, anchor for `imports` edges leaving a file.
pub fn file_scope_id(file_path: &str) -> String {
    make_id(file_path, "__file__")
}

/// Compose a qualified name from an optional enclosing scope and a bare name.
pub fn qualified_name(scope: Option<&str>, name: &str) -> String {
    match scope {
        Some(s) => format!("{s}.{name}"),
        None => name.to_string(),
    }
}

/// Construct the synthetic file-scope symbol for `file_path`.
pub fn file_scope_symbol(file_path: &str) -> Symbol {
    Symbol {
        id: file_scope_id(file_path),
        name: "__file__".to_string(),
        kind: SymbolKind::Import,
        file_path: file_path.to_string(),
        start_line: 1,
        end_line: 1,
        exported: false,
        scope: None,
    }
}
