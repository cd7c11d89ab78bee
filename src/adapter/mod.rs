mod go;
mod python;
mod scope;
mod typescript;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::model::ParsedFile;

pub use scope::ScopeTable;

/// A per-language front end: AST in, normalized `(symbols, edges)` out.
///
/// Adapters are the only language-specific code in the core; adding a language
/// means adding one adapter and registering it by extension. `project_root` is
/// threaded through so an adapter can apply the language's own module-path
/// resolution rules (relative specifiers, package roots) against the project tree.
pub trait AstAdapter: Send + Sync {
    fn parse(
        &self,
        project_root: &Path,
        absolute_path: &Path,
        relative_path: &str,
    ) -> CoreResult<ParsedFile>;
}

/// Maps file extensions to the adapter that handles them.
pub struct AdapterRegistry {
    by_extension: HashMap<&'static str, Arc<dyn AstAdapter>>,
}

impl AdapterRegistry {
    /// Build the registry with the three adapters this crate ships:
    /// TypeScript/JavaScript, Python, and Go.
    pub fn with_default_adapters() -> Self {
        let mut by_extension: HashMap<&'static str, Arc<dyn AstAdapter>> = HashMap::new();

        let ts: Arc<dyn AstAdapter> = Arc::new(typescript::TypeScriptAdapter);
        for ext in ["ts", "tsx", "js", "jsx"] {
            by_extension.insert(ext, ts.clone());
        }

        let py: Arc<dyn AstAdapter> = Arc::new(python::PythonAdapter);
        by_extension.insert("py", py);

        let go: Arc<dyn AstAdapter> = Arc::new(go::GoAdapter);
        by_extension.insert("go", go);

        Self { by_extension }
    }

    pub fn get(&self, extension: &str) -> Option<&dyn AstAdapter> {
        self.by_extension.get(extension).map(|a| a.as_ref())
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.by_extension.contains_key(extension)
    }

    /// Parse one file, dispatching by its extension.
    pub fn parse_file(
        &self,
        project_root: &Path,
        absolute_path: &Path,
        relative_path: &str,
    ) -> CoreResult<ParsedFile> {
        let ext = absolute_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let adapter = self
            .get(ext)
            .ok_or_else(|| CoreError::UnsupportedExtension(ext.to_string()))?;
        adapter.parse(project_root, absolute_path, relative_path)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_default_adapters()
    }
}

/// Extract a node's source text, tolerating invalid UTF-8 boundaries by returning
/// an empty string rather than panicking (the core never panics on malformed input).
pub(crate) fn node_text<'a>(node: tree_sitter::Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

pub(crate) fn start_line(node: tree_sitter::Node) -> usize {
    node.start_position().row + 1
}

pub(crate) fn end_line(node: tree_sitter::Node) -> usize {
    node.end_position().row + 1
}

/// Resolve a relative module specifier (`./foo`, `../bar/baz`) against the
/// directory containing `from_relative_path`, probing candidate source
/// extensions and `index` files on disk, mirroring how a real module loader
/// would pick the file a bare specifier refers to.
pub(crate) fn resolve_relative_specifier(
    project_root: &Path,
    from_relative_path: &str,
    specifier: &str,
    extensions: &[&str],
) -> Option<String> {
    let from_dir = Path::new(from_relative_path).parent().unwrap_or_else(|| Path::new(""));
    let joined = normalize_path(&from_dir.join(specifier));

    let candidates: Vec<String> = {
        let mut c = Vec::new();
        for ext in extensions {
            c.push(format!("{joined}.{ext}"));
        }
        for ext in extensions {
            c.push(format!("{joined}/index.{ext}"));
        }
        c
    };

    for candidate in &candidates {
        if project_root.join(candidate).is_file() {
            return Some(candidate.clone());
        }
    }

    // No file found on disk under any known extension — return the bare
    // joined path as a best-effort guess. The graph builder drops the
    // resulting edge if no such file-scope node ever materializes.
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Join path segments, collapsing `.` and `..`, and normalize to forward slashes.
fn normalize_path(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                parts.pop();
            }
            other => parts.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }
    parts.join("/")
}
