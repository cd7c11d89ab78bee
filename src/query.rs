use std::collections::HashSet;

use serde::Serialize;

use crate::graph::CodeGraph;
use crate::model::{EdgeKind, Symbol};

/// A symbol match carrying its in-degree, as returned by `find_symbols`.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolMatch<'a> {
    #[serde(flatten)]
    pub symbol: &'a Symbol,
    #[serde(rename = "dependentCount")]
    pub dependent_count: usize,
}

/// An edge whose endpoints live in different files.
#[derive(Debug, Clone, Serialize)]
pub struct CrossFileEdge<'a> {
    pub source: &'a str,
    pub target: &'a str,
    #[serde(rename = "sourceFile")]
    pub source_file: &'a str,
    #[serde(rename = "targetFile")]
    pub target_file: &'a str,
    pub kind: EdgeKind,
}

/// The result of `getImpact`: direct and transitive dependents, plus the set
/// of files touched by either.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactResult<'a> {
    #[serde(rename = "directDependents")]
    pub direct_dependents: Vec<&'a Symbol>,
    #[serde(rename = "transitiveDependents")]
    pub transitive_dependents: Vec<&'a Symbol>,
    #[serde(rename = "affectedFiles")]
    pub affected_files: Vec<String>,
}

/// A per-file rollup: symbol count plus distinct source/target files of its
/// cross-file edges.
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "symbolCount")]
    pub symbol_count: usize,
    #[serde(rename = "incomingRefs")]
    pub incoming_refs: usize,
    #[serde(rename = "outgoingRefs")]
    pub outgoing_refs: usize,
}

/// A project-wide rollup.
#[derive(Debug, Clone, Serialize)]
pub struct ArchitectureSummary {
    #[serde(rename = "fileCount")]
    pub file_count: usize,
    #[serde(rename = "symbolCount")]
    pub symbol_count: usize,
    #[serde(rename = "edgeCount")]
    pub edge_count: usize,
    #[serde(rename = "mostConnectedFiles")]
    pub most_connected_files: Vec<(String, usize)>,
    #[serde(rename = "orphanFiles")]
    pub orphan_files: Vec<String>,
}

/// Resolve `query` against the graph: an exact `"file::qualifiedName"` id hit
/// short-circuits to a single match; otherwise every node whose name equals
/// `query` case-insensitively is returned, annotated with its in-degree and
/// sorted by that in-degree descending, ties broken by `(filePath, startLine)`.
pub fn find_symbols<'a>(graph: &'a CodeGraph, query: &str) -> Vec<SymbolMatch<'a>> {
    if query.contains("::")
        && let Some(symbol) = graph.node(query)
    {
        return vec![SymbolMatch { symbol, dependent_count: graph.in_degree(query) }];
    }

    let mut matches: Vec<SymbolMatch<'a>> = graph
        .nodes()
        .filter(|s| s.name.eq_ignore_ascii_case(query))
        .map(|s| SymbolMatch { symbol: s, dependent_count: graph.in_degree(&s.id) })
        .collect();

    matches.sort_by(|a, b| {
        b.dependent_count
            .cmp(&a.dependent_count)
            .then_with(|| (a.symbol.file_path.as_str(), a.symbol.start_line).cmp(&(b.symbol.file_path.as_str(), b.symbol.start_line)))
    });
    matches
}

/// Case-insensitive substring search over symbol names, in the graph's
/// natural (insertion) node order.
pub fn search_symbols<'a>(graph: &'a CodeGraph, query: &str) -> Vec<&'a Symbol> {
    let needle = query.to_lowercase();
    graph.nodes().filter(|s| s.name.to_lowercase().contains(&needle)).collect()
}

/// Everything `id` directly depends on. Empty if `id` is unknown.
pub fn get_dependencies<'a>(graph: &'a CodeGraph, id: &str) -> Vec<&'a Symbol> {
    graph.out_neighbors(id)
}

/// Everything that directly depends on `id`. Empty if `id` is unknown.
pub fn get_dependents<'a>(graph: &'a CodeGraph, id: &str) -> Vec<&'a Symbol> {
    graph.in_neighbors(id)
}

/// Direct and transitive dependents of `id`, plus the distinct files the
/// transitive set touches (sorted lexicographically). Terminates on cycles —
/// `reverse_reachable` tracks a visited set and excludes `id` itself.
pub fn get_impact<'a>(graph: &'a CodeGraph, id: &str) -> ImpactResult<'a> {
    let direct_dependents = graph.in_neighbors(id);
    let transitive_dependents = graph.reverse_reachable(id);

    let mut affected_files: Vec<String> = transitive_dependents
        .iter()
        .map(|s| s.file_path.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    affected_files.sort();

    ImpactResult { direct_dependents, transitive_dependents, affected_files }
}

/// Every edge whose source and target live in different files.
pub fn get_cross_file_edges(graph: &CodeGraph) -> Vec<CrossFileEdge<'_>> {
    graph
        .edges()
        .filter_map(|e| {
            let source_file = graph.node(&e.source)?.file_path.as_str();
            let target_file = graph.node(&e.target)?.file_path.as_str();
            if source_file == target_file {
                return None;
            }
            Some(CrossFileEdge { source: e.source.as_str(), target: e.target.as_str(), source_file, target_file, kind: e.kind })
        })
        .collect()
}

/// Per-file rollups for every file with at least one node, sorted by path.
pub fn get_file_summary(graph: &CodeGraph) -> Vec<FileSummary> {
    let mut files: Vec<&str> = graph.nodes().map(|s| s.file_path.as_str()).collect::<HashSet<_>>().into_iter().collect();
    files.sort();

    let cross_file = get_cross_file_edges(graph);

    files
        .into_iter()
        .map(|file| {
            let symbol_count = graph.nodes().filter(|s| s.file_path == file).count();
            let incoming_refs: HashSet<&str> = cross_file.iter().filter(|e| e.target_file == file).map(|e| e.source_file).collect();
            let outgoing_refs: HashSet<&str> = cross_file.iter().filter(|e| e.source_file == file).map(|e| e.target_file).collect();
            FileSummary { file_path: file.to_string(), symbol_count, incoming_refs: incoming_refs.len(), outgoing_refs: outgoing_refs.len() }
        })
        .collect()
}

/// Project-wide rollup: totals, the top 5 files by `incomingRefs + outgoingRefs`,
/// and files with zero cross-file refs in either direction.
pub fn get_architecture_summary(graph: &CodeGraph) -> ArchitectureSummary {
    let file_summaries = get_file_summary(graph);

    let mut most_connected_files: Vec<(String, usize)> =
        file_summaries.iter().map(|f| (f.file_path.clone(), f.incoming_refs + f.outgoing_refs)).collect();
    most_connected_files.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    most_connected_files.truncate(5);

    let orphan_files: Vec<String> =
        file_summaries.iter().filter(|f| f.incoming_refs == 0 && f.outgoing_refs == 0).map(|f| f.file_path.clone()).collect();

    ArchitectureSummary {
        file_count: file_summaries.len(),
        symbol_count: graph.node_count(),
        edge_count: graph.edge_count(),
        most_connected_files,
        orphan_files,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, ParsedFile, SymbolKind, file_scope_id, file_scope_symbol};

    fn sym(id: &str, name: &str, file: &str, line: usize) -> Symbol {
        Symbol { id: id.to_string(), name: name.to_string(), kind: SymbolKind::Function, file_path: file.to_string(), start_line: line, end_line: line, exported: true, scope: None }
    }

    fn edge(source: &str, target: &str, kind: EdgeKind, file: &str) -> Edge {
        Edge { source: source.to_string(), target: target.to_string(), kind, file_path: file.to_string(), line: 1 }
    }

    fn sample_graph() -> CodeGraph {
        let foo = sym("a.ts::foo", "foo", "a.ts", 1);
        let bar = sym("b.ts::bar", "bar", "b.ts", 5);
        let e = edge("b.ts::bar", "a.ts::foo", EdgeKind::Calls, "b.ts");
        CodeGraph::build(&[
            ParsedFile { file_path: "a.ts".into(), symbols: vec![foo], edges: vec![] },
            ParsedFile { file_path: "b.ts".into(), symbols: vec![bar], edges: vec![e] },
        ])
    }

    #[test]
    fn find_symbols_by_id_short_circuits_to_single_match() {
        let graph = sample_graph();
        let hits = find_symbols(&graph, "a.ts::foo");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].symbol.id, "a.ts::foo");
        assert_eq!(hits[0].dependent_count, 1);
    }

    #[test]
    fn find_symbols_by_name_is_case_insensitive_and_sorted_by_dependent_count() {
        let graph = sample_graph();
        let hits = find_symbols(&graph, "FOO");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].symbol.name, "foo");

        assert!(find_symbols(&graph, "nonexistent").is_empty());
    }

    #[test]
    fn search_symbols_is_case_insensitive_substring() {
        let graph = sample_graph();
        assert_eq!(search_symbols(&graph, "OO").len(), 1);
    }

    #[test]
    fn dependencies_and_dependents_are_symmetric() {
        let graph = sample_graph();
        let deps = get_dependencies(&graph, "b.ts::bar");
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].id, "a.ts::foo");

        let dependents = get_dependents(&graph, "a.ts::foo");
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].id, "b.ts::bar");

        assert!(get_dependencies(&graph, "unknown::id").is_empty());
    }

    #[test]
    fn impact_excludes_self_and_lists_affected_files() {
        let graph = sample_graph();
        let impact = get_impact(&graph, "a.ts::foo");
        assert_eq!(impact.direct_dependents.len(), 1);
        assert_eq!(impact.transitive_dependents.len(), 1);
        assert_eq!(impact.affected_files, vec!["b.ts".to_string()]);

        let no_impact = get_impact(&graph, "b.ts::bar");
        assert!(no_impact.transitive_dependents.is_empty());
        assert!(no_impact.affected_files.is_empty());
    }

    #[test]
    fn cross_file_edges_excludes_same_file_edges() {
        let same_file_edge = edge("a.ts::foo", "a.ts::foo", EdgeKind::Calls, "a.ts");
        let foo = sym("a.ts::foo", "foo", "a.ts", 1);
        let graph = CodeGraph::build(&[ParsedFile { file_path: "a.ts".into(), symbols: vec![foo], edges: vec![same_file_edge] }]);
        assert!(get_cross_file_edges(&graph).is_empty());

        let cross = sample_graph();
        let edges = get_cross_file_edges(&cross);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].source_file, "b.ts");
        assert_eq!(edges[0].target_file, "a.ts");
    }

    #[test]
    fn file_summary_counts_distinct_incoming_and_outgoing_files() {
        let graph = sample_graph();
        let summaries = get_file_summary(&graph);
        assert_eq!(summaries.len(), 2);
        let a = summaries.iter().find(|f| f.file_path == "a.ts").unwrap();
        assert_eq!(a.incoming_refs, 1);
        assert_eq!(a.outgoing_refs, 0);
        let b = summaries.iter().find(|f| f.file_path == "b.ts").unwrap();
        assert_eq!(b.incoming_refs, 0);
        assert_eq!(b.outgoing_refs, 1);
    }

    #[test]
    fn architecture_summary_ranks_most_connected_and_flags_orphans() {
        let graph = sample_graph();
        let summary = get_architecture_summary(&graph);
        assert_eq!(summary.file_count, 2);
        assert!(summary.orphan_files.is_empty());
        assert_eq!(summary.most_connected_files.first().unwrap().1, 1);
    }

    #[test]
    fn a_file_with_only_synthetic_import_node_and_no_edges_is_an_orphan() {
        let graph = CodeGraph::build(&[ParsedFile { file_path: "a.ts".into(), symbols: vec![file_scope_symbol("a.ts")], edges: vec![] }]);
        let summary = get_architecture_summary(&graph);
        assert_eq!(summary.orphan_files, vec!["a.ts".to_string()]);
        assert!(graph.contains(&file_scope_id("a.ts")));
    }
}
