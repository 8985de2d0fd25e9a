//! Snapshot loading: parse, validate, and normalize a raw graph file.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::SnapshotError;

use super::{Relation, SnapshotNode};

/// Result type for snapshot operations.
pub type SnapshotResult<T> = std::result::Result<T, SnapshotError>;

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(rename = "graphVersion", default)]
    graph_version: Option<i64>,
    #[serde(default)]
    timestamp: Option<String>,
    nodes: Vec<SnapshotNode>,
    rels: Vec<Relation>,
}

/// A normalized, immutable graph snapshot: the source of truth for one
/// export run. Nodes are sorted ascending by did so downstream key
/// assignment is reproducible across runs on identical input.
#[derive(Debug)]
pub struct GraphSnapshot {
    /// Declared snapshot version; `None` for legacy snapshots.
    pub graph_version: Option<i64>,
    pub timestamp: Option<String>,
    pub nodes: Vec<SnapshotNode>,
    pub rels: Vec<Relation>,
}

/// Load a snapshot file and validate its declared version against the
/// configuration's expected graph version.
///
/// A declared version that differs from the expected one refuses the
/// snapshot; legacy snapshots without a version proceed under legacy rules.
pub fn load_snapshot(path: &Path, expected_version: i64) -> SnapshotResult<GraphSnapshot> {
    info!(path = %path.display(), "loading graph snapshot");

    let content = std::fs::read_to_string(path).map_err(|e| SnapshotError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    let raw: RawSnapshot = serde_json::from_str(&content).map_err(|e| SnapshotError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    match raw.graph_version {
        Some(found) if found != expected_version => {
            return Err(SnapshotError::VersionMismatch {
                path: path.display().to_string(),
                expected: expected_version,
                found,
            });
        }
        Some(_) => {}
        None => {
            warn!(path = %path.display(), "snapshot declares no graph version; using legacy rules");
        }
    }

    let mut nodes: Vec<SnapshotNode> = raw
        .nodes
        .into_iter()
        .map(|mut node| {
            if node.handle.is_none() {
                node.handle = Some(node.did.clone());
            }
            node
        })
        .collect();
    nodes.sort_by(|a, b| a.did.cmp(&b.did));

    info!(
        nodes = nodes.len(),
        rels = raw.rels.len(),
        "parsed graph snapshot"
    );

    Ok(GraphSnapshot {
        graph_version: raw.graph_version,
        timestamp: raw.timestamp,
        nodes,
        rels: raw.rels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_snapshot(dir: &tempfile::TempDir, content: &serde_json::Value) -> std::path::PathBuf {
        let path = dir.path().join("graph.json");
        std::fs::write(&path, serde_json::to_string(content).unwrap()).unwrap();
        path
    }

    #[test]
    fn nodes_sort_by_did_and_handle_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_snapshot(
            &dir,
            &serde_json::json!({
                "graphVersion": 2,
                "timestamp": "2024-05-01T00:00:00Z",
                "nodes": [
                    {"did": "did:c", "community": "1"},
                    {"did": "did:a", "handle": "alice", "community": "1"},
                    {"did": "did:b", "community": "2"}
                ],
                "rels": [{"source": "did:a", "target": "did:b", "weight": 3.0}]
            }),
        );

        let snapshot = load_snapshot(&path, 2).unwrap();
        let dids: Vec<&str> = snapshot.nodes.iter().map(|n| n.did.as_str()).collect();
        assert_eq!(dids, vec!["did:a", "did:b", "did:c"]);
        assert_eq!(snapshot.nodes[0].handle.as_deref(), Some("alice"));
        assert_eq!(snapshot.nodes[1].handle.as_deref(), Some("did:b"));
        assert_eq!(snapshot.timestamp.as_deref(), Some("2024-05-01T00:00:00Z"));
    }

    #[test]
    fn version_mismatch_is_refused() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_snapshot(
            &dir,
            &serde_json::json!({
                "graphVersion": 1,
                "nodes": [],
                "rels": []
            }),
        );

        let err = load_snapshot(&path, 2).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::VersionMismatch {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn legacy_snapshot_without_version_passes() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_snapshot(
            &dir,
            &serde_json::json!({"nodes": [], "rels": []}),
        );

        let snapshot = load_snapshot(&path, 2).unwrap();
        assert_eq!(snapshot.graph_version, None);
    }

    #[test]
    fn unreadable_snapshot_reports_path() {
        let err = load_snapshot(Path::new("/nonexistent/graph.json"), 1).unwrap_err();
        assert!(matches!(err, SnapshotError::Read { .. }));
        assert!(format!("{err}").contains("/nonexistent/graph.json"));
    }
}
