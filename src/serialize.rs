use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::graph::CodeGraph;
use crate::model::{Edge, ParsedFile, Symbol};

/// The on-disk export document. Key order is alphabetical at every level and
/// `nodes`/`edges` are sorted for deterministic diffs — see `export`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDocument {
    pub edges: Vec<Edge>,
    pub files: Vec<String>,
    pub metadata: GraphMetadata,
    pub nodes: Vec<Symbol>,
    #[serde(rename = "projectRoot")]
    pub project_root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMetadata {
    #[serde(rename = "edgeCount")]
    pub edge_count: usize,
    #[serde(rename = "fileCount")]
    pub file_count: usize,
    #[serde(rename = "nodeCount")]
    pub node_count: usize,
    #[serde(rename = "parsedAt")]
    pub parsed_at: String,
}

/// Serialize the graph to the stable JSON document described by the schema:
/// sorted file list, nodes sorted by `(filePath, id)`, edges sorted by
/// `(source, target, kind, line)`.
pub fn export(graph: &CodeGraph, project_root: &str, parsed_at: chrono::DateTime<chrono::Utc>) -> GraphDocument {
    let mut files: Vec<String> = graph.nodes().map(|s| s.file_path.clone()).collect();
    files.sort();
    files.dedup();

    let mut nodes: Vec<Symbol> = graph.nodes().cloned().collect();
    nodes.sort_by(|a, b| (a.file_path.as_str(), a.id.as_str()).cmp(&(b.file_path.as_str(), b.id.as_str())));

    let mut edges: Vec<Edge> = graph.edges().cloned().collect();
    edges.sort_by(|a, b| {
        (a.source.as_str(), a.target.as_str(), a.kind as u8, a.line).cmp(&(b.source.as_str(), b.target.as_str(), b.kind as u8, b.line))
    });

    GraphDocument {
        metadata: GraphMetadata {
            edge_count: edges.len(),
            file_count: files.len(),
            node_count: nodes.len(),
            parsed_at: parsed_at.to_rfc3339(),
        },
        edges,
        files,
        nodes,
        project_root: project_root.to_string(),
    }
}

/// Parse a previously exported document back into `ParsedFile`s grouped by
/// file, suitable for feeding straight into `CodeGraph::build`. Unknown JSON
/// fields are ignored by serde's default behavior; a missing `scope` decodes
/// as `None`.
pub fn import(json: &str) -> CoreResult<Vec<ParsedFile>> {
    let doc: GraphDocument = serde_json::from_str(json).map_err(|e| CoreError::InvalidFormat(e.to_string()))?;

    let mut by_file: std::collections::HashMap<String, ParsedFile> = std::collections::HashMap::new();
    for file_path in &doc.files {
        by_file.entry(file_path.clone()).or_insert_with(|| ParsedFile { file_path: file_path.clone(), symbols: vec![], edges: vec![] });
    }
    for node in doc.nodes {
        by_file
            .entry(node.file_path.clone())
            .or_insert_with(|| ParsedFile { file_path: node.file_path.clone(), symbols: vec![], edges: vec![] })
            .symbols
            .push(node);
    }
    for edge in doc.edges {
        by_file
            .entry(edge.file_path.clone())
            .or_insert_with(|| ParsedFile { file_path: edge.file_path.clone(), symbols: vec![], edges: vec![] })
            .edges
            .push(edge);
    }

    Ok(by_file.into_values().collect())
}

/// Serialize an exported document to a pretty-printed JSON string.
pub fn to_json_string(doc: &GraphDocument) -> CoreResult<String> {
    serde_json::to_string_pretty(doc).map_err(|e| CoreError::InvalidFormat(e.to_string()))
}
