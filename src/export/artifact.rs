//! Artifact serialization: the graph dump the rendering application imports.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use serde::Serialize;
use tracing::info;

use crate::error::ExportError;
use crate::graph::LayoutGraph;
use crate::layout::Cluster;

/// Result type for export operations.
pub type ExportResult<T> = std::result::Result<T, ExportError>;

/// One exported layout: nodes with final positions, pruned edges, the
/// cluster map, and the snapshot timestamp.
#[derive(Debug, Serialize)]
pub struct Artifact {
    pub attributes: ArtifactAttrs,
    pub options: GraphOptions,
    pub nodes: Vec<SerializedNode>,
    pub edges: Vec<SerializedEdge>,
}

#[derive(Debug, Serialize)]
pub struct ArtifactAttrs {
    pub clusters: BTreeMap<String, Cluster>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
}

#[derive(Debug, Serialize)]
pub struct GraphOptions {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub multi: bool,
    #[serde(rename = "allowSelfLoops")]
    pub allow_self_loops: bool,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            kind: "directed",
            multi: true,
            allow_self_loops: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SerializedNode {
    pub key: String,
    pub attributes: NodeOut,
}

#[derive(Debug, Serialize)]
pub struct NodeOut {
    pub key: u32,
    pub did: String,
    pub label: String,
    pub community: String,
    pub size: f64,
    pub area: f64,
    pub total: f64,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "cType", skip_serializing_if = "Option::is_none")]
    pub c_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SerializedEdge {
    pub source: String,
    pub target: String,
    pub attributes: EdgeOut,
}

#[derive(Debug, Serialize)]
pub struct EdgeOut {
    pub weight: f64,
    pub size: f64,
    #[serde(rename = "ogWeight")]
    pub og_weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stay: Option<bool>,
}

/// Serialize the positioned, pruned graph into an artifact.
pub fn build_artifact(
    graph: &LayoutGraph,
    clusters: BTreeMap<String, Cluster>,
    last_updated: String,
) -> Artifact {
    let nodes = graph
        .node_indices()
        .map(|idx| {
            let attrs = &graph[idx];
            SerializedNode {
                key: attrs.key.to_string(),
                attributes: NodeOut {
                    key: attrs.key,
                    did: attrs.did.clone(),
                    label: attrs.label.clone(),
                    community: attrs.community.clone(),
                    size: attrs.size,
                    area: attrs.area,
                    total: attrs.total,
                    x: attrs.x,
                    y: attrs.y,
                    color: attrs.color.clone(),
                    c_type: attrs.c_type.clone(),
                },
            }
        })
        .collect();

    let edges = graph
        .edge_references()
        .map(|edge| SerializedEdge {
            source: (edge.source().index() as u32).to_string(),
            target: (edge.target().index() as u32).to_string(),
            attributes: EdgeOut {
                weight: edge.weight().weight,
                size: edge.weight().size,
                og_weight: edge.weight().og_weight,
                stay: edge.weight().stay.then_some(true),
            },
        })
        .collect();

    Artifact {
        attributes: ArtifactAttrs {
            clusters,
            last_updated,
        },
        options: GraphOptions::default(),
        nodes,
        edges,
    }
}

/// Write an artifact as a whole file: serialized to a temporary sibling and
/// renamed into place, so a failed run never leaves a partial artifact.
pub fn write_artifact(path: &Path, artifact: &Artifact) -> ExportResult<()> {
    let bytes = serde_json::to_vec(artifact).map_err(|e| ExportError::Serialize {
        message: e.to_string(),
    })?;
    write_atomic(path, &bytes)
}

/// Atomic whole-file write: temp sibling + rename. The temp name is unique
/// per call because layouts processed in parallel may target the same file
/// (the shared config snapshot copy).
pub fn write_atomic(path: &Path, bytes: &[u8]) -> ExportResult<()> {
    static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);
    let tmp = path.with_extension(format!(
        "tmp{}",
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let io_err = |source| ExportError::Io {
        path: path.display().to_string(),
        source,
    };
    std::fs::write(&tmp, bytes).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote artifact");
    Ok(())
}
