use std::collections::{HashMap, HashSet};

use crate::model::make_id;

/// Tracks the name-resolution context for one file while an adapter walks its
/// AST: locally bound names (which shadow everything), an import table mapping
/// a local name to the symbol id it stands for, and the file this table belongs
/// to (for building same-file fallback guesses).
///
/// Resolution order, per the reference-resolution rules: a local binding wins
/// and drops the reference entirely (no edge); otherwise an import table hit
/// gives the precise cross-file target; otherwise the name is assumed to name a
/// sibling top-level declaration in the same file, and the resulting id is
/// handed to the graph builder to confirm or drop.
#[derive(Debug, Default)]
pub struct ScopeTable {
    file_path: String,
    locals: Vec<HashSet<String>>,
    imports: HashMap<String, String>,
}

impl ScopeTable {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            locals: vec![HashSet::new()],
            imports: HashMap::new(),
        }
    }

    /// Register an import alias: the local name a file uses to refer to
    /// `target_id`, a fully qualified symbol id in another file.
    pub fn add_import(&mut self, local_name: impl Into<String>, target_id: impl Into<String>) {
        self.imports.insert(local_name.into(), target_id.into());
    }

    pub fn has_import(&self, local_name: &str) -> bool {
        self.imports.contains_key(local_name)
    }

    /// Push a new local-binding scope (entering a function/method body).
    pub fn push_scope(&mut self) {
        self.locals.push(HashSet::new());
    }

    pub fn pop_scope(&mut self) {
        if self.locals.len() > 1 {
            self.locals.pop();
        }
    }

    /// Bind a local name (parameter, local variable) in the current scope.
    pub fn bind_local(&mut self, name: impl Into<String>) {
        if let Some(top) = self.locals.last_mut() {
            top.insert(name.into());
        }
    }

    fn is_local(&self, name: &str) -> bool {
        self.locals.iter().rev().any(|scope| scope.contains(name))
    }

    /// Resolve a referenced name to a candidate target symbol id, or `None`
    /// if a local binding shadows it (in which case no edge should be
    /// emitted at all).
    pub fn resolve(&self, name: &str) -> Option<String> {
        if self.is_local(name) {
            return None;
        }
        if let Some(target) = self.imports.get(name) {
            return Some(target.clone());
        }
        Some(make_id(&self.file_path, name))
    }
}
