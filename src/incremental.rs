use std::collections::HashMap;

use crate::graph::CodeGraph;
use crate::model::ParsedFile;

/// Holds the graph plus every file's last successful parse, so a single
/// changed file can be re-parsed and the graph rebuilt from the retained
/// per-file results rather than re-walking and re-parsing the whole project.
///
/// This is a deliberate simplification of patching individual unresolved-edge
/// placeholders: this graph has no persisted "unresolved" node to patch later
/// (a dropped edge just isn't committed), so a newly created file that other
/// files already reference needs every file's edges re-evaluated against the
/// now-larger node set. Re-running the (cheap, in-memory) three-pass build
/// over the retained parses gets that for free and stays correct under
/// create/modify/delete in any order.
#[derive(Debug, Default)]
pub struct Workspace {
    graph: CodeGraph,
    parsed: HashMap<String, ParsedFile>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(parsed_files: Vec<ParsedFile>) -> Self {
        let parsed: HashMap<String, ParsedFile> = parsed_files.into_iter().map(|pf| (pf.file_path.clone(), pf)).collect();
        let mut workspace = Self { graph: CodeGraph::new(), parsed };
        workspace.rebuild();
        workspace
    }

    pub fn graph(&self) -> &CodeGraph {
        &self.graph
    }

    pub fn file_count(&self) -> usize {
        self.parsed.len()
    }

    /// Replace one file's contribution. `Some(parsed)` for create/modify,
    /// `None` for delete. Rebuilds the whole graph from the retained
    /// per-file parses, which stays cheap since no file is re-parsed.
    pub fn update_file(&mut self, relative_path: &str, parsed: Option<ParsedFile>) {
        match parsed {
            Some(pf) => {
                self.parsed.insert(relative_path.to_string(), pf);
            }
            None => {
                self.parsed.remove(relative_path);
            }
        }
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let files: Vec<ParsedFile> = self.parsed.values().cloned().collect();
        self.graph = CodeGraph::build(&files);
    }
}
