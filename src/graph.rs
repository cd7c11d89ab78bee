use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableGraph};

use crate::model::{Edge, EdgeKind, ParsedFile, Symbol, SymbolKind, file_scope_symbol};

/// The in-memory dependency graph: symbols as nodes, references as edges,
/// backed by a `petgraph::StableGraph` with an id-keyed side index for O(1)
/// lookup by symbol id.
#[derive(Debug, Default)]
pub struct CodeGraph {
    graph: StableGraph<Symbol, Edge>,
    id_index: HashMap<String, NodeIndex>,
    edge_key_index: HashMap<(String, String, EdgeKind), petgraph::stable_graph::EdgeIndex>,
}

impl CodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a batch of parsed files using the three-pass
    /// algorithm: nodes, then synthetic file-scope nodes referenced by any
    /// edge endpoint, then edges (dropped silently if either endpoint is
    /// still missing after the first two passes).
    pub fn build(parsed_files: &[ParsedFile]) -> Self {
        let mut graph = Self::new();
        graph.ingest(parsed_files);
        graph
    }

    /// Merge a batch of parsed files into an existing graph using the same
    /// three passes. Used both by `build` (against an empty graph) and by the
    /// incremental updater (against a graph that already has foreign nodes
    /// the new file's edges may target).
    pub fn ingest(&mut self, parsed_files: &[ParsedFile]) {
        for pf in parsed_files {
            for symbol in &pf.symbols {
                self.add_node_first_writer_wins(symbol.clone());
            }
        }

        // Synthetic file-scope node pass: every file actually present in this
        // batch gets a file-scope node even if it declares no symbols of its
        // own — otherwise an `imports` edge into a file with no outgoing
        // imports of its own would be dropped for lack of a target node. This
        // is keyed off batch membership, not edge shape: an edge pointing at
        // a file that simply isn't part of the project yet must stay
        // unresolved rather than spuriously materializing a stub for it.
        for pf in parsed_files {
            self.add_node_first_writer_wins(file_scope_symbol(&pf.file_path));
        }

        for pf in parsed_files {
            for edge in &pf.edges {
                self.merge_edge(edge.clone());
            }
        }
    }

    fn add_node_first_writer_wins(&mut self, symbol: Symbol) -> NodeIndex {
        if let Some(&existing) = self.id_index.get(&symbol.id) {
            return existing;
        }
        let id = symbol.id.clone();
        let idx = self.graph.add_node(symbol);
        self.id_index.insert(id, idx);
        idx
    }

    /// Commit one edge into the graph under the multigraph key
    /// `(source, target, kind)`, dropping it silently if either endpoint is
    /// missing or the key is already present. Returns whether the edge was
    /// newly added.
    ///
    /// An adapter can only see its own file, so it cannot always tell whether a
    /// resolved call target is a class (an import used as a constructor) or a
    /// plain function — that's whole-project knowledge only the graph has at
    /// commit time. A `calls` edge whose target turns out to be a `Class` node
    /// is reclassified to `instantiates` here, once, before the edge is added.
    pub fn merge_edge(&mut self, mut edge: Edge) -> bool {
        let Some(&source_idx) = self.id_index.get(&edge.source) else {
            return false;
        };
        let Some(&target_idx) = self.id_index.get(&edge.target) else {
            return false;
        };
        if edge.kind == EdgeKind::Calls && self.graph[target_idx].kind == SymbolKind::Class {
            edge.kind = EdgeKind::Instantiates;
        }
        let key = (edge.source.clone(), edge.target.clone(), edge.kind);
        if self.edge_key_index.contains_key(&key) {
            return false;
        }
        let edge_idx = self.graph.add_edge(source_idx, target_idx, edge);
        self.edge_key_index.insert(key, edge_idx);
        true
    }

    /// Drop every node whose `file_path` equals `relative_path`, cascading
    /// their incident edges. Already-removed files are tolerated (a no-op).
    pub fn remove_file(&mut self, relative_path: &str) {
        let ids_to_remove: Vec<String> = self
            .graph
            .node_indices()
            .filter(|&idx| self.graph[idx].file_path == relative_path)
            .map(|idx| self.graph[idx].id.clone())
            .collect();

        for id in &ids_to_remove {
            if let Some(idx) = self.id_index.remove(id) {
                self.graph.remove_node(idx);
            }
        }

        let removed: HashSet<&String> = ids_to_remove.iter().collect();
        self.edge_key_index
            .retain(|(source, target, _), _| !removed.contains(source) && !removed.contains(target));
    }

    /// Replace a file's contribution atomically: drop its old nodes/edges,
    /// then re-ingest the freshly parsed file. Within this call either the
    /// old contribution is fully replaced or fully removed — there is no
    /// observable half-state.
    pub fn update_file(&mut self, relative_path: &str, parsed: Option<&ParsedFile>) {
        self.remove_file(relative_path);
        if let Some(parsed) = parsed {
            self.ingest(std::slice::from_ref(parsed));
        }
    }

    pub fn node(&self, id: &str) -> Option<&Symbol> {
        self.id_index.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_index.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Symbol> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_indices().map(move |idx| &self.graph[idx])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn in_degree(&self, id: &str) -> usize {
        match self.id_index.get(id) {
            Some(&idx) => self.graph.edges_directed(idx, Direction::Incoming).count(),
            None => 0,
        }
    }

    pub fn out_neighbors(&self, id: &str) -> Vec<&Symbol> {
        let Some(&idx) = self.id_index.get(id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| &self.graph[n])
            .collect()
    }

    pub fn in_neighbors(&self, id: &str) -> Vec<&Symbol> {
        let Some(&idx) = self.id_index.get(id) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| &self.graph[n])
            .collect()
    }

    /// Reverse BFS from `id`: every node that can reach `id` through some
    /// chain of edges, excluding `id` itself. Terminates on cyclic graphs via
    /// a visited set.
    pub fn reverse_reachable(&self, id: &str) -> Vec<&Symbol> {
        let Some(&start) = self.id_index.get(id) else {
            return Vec::new();
        };
        let mut visited = HashSet::new();
        visited.insert(start);
        let mut queue = VecDeque::new();
        queue.push_back(start);
        let mut result = Vec::new();

        while let Some(current) = queue.pop_front() {
            for neighbor in self.graph.neighbors_directed(current, Direction::Incoming) {
                if visited.insert(neighbor) {
                    result.push(&self.graph[neighbor]);
                    queue.push_back(neighbor);
                }
            }
        }
        result
    }
}
