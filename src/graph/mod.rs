//! Graph ingestion and weighting: snapshot loading, dense indexing, edge
//! weighting, and node sizing.
//!
//! The in-memory layout graph is a petgraph [`StableDiGraph`]: nodes are
//! inserted in sorted-snapshot order so the dense export key of every node
//! equals its `NodeIndex`, and edge removal during pruning never disturbs
//! node indices.

pub mod index;
pub mod load;
pub mod size;
pub mod weigh;

use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Serialize};

pub use index::{IndexedGraph, add_nodes};
pub use load::{GraphSnapshot, load_snapshot};
pub use size::assign_node_sizes;
pub use weigh::add_edges;

/// A node as it appears in a raw snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotNode {
    pub did: String,
    #[serde(default)]
    pub handle: Option<String>,
    pub community: String,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(rename = "cType", default)]
    pub c_type: Option<String>,
}

impl SnapshotNode {
    /// The clustering key under a layout's configured community property.
    pub fn community_key(&self, property: &str) -> &str {
        match property {
            "community" => &self.community,
            "cType" => self.c_type.as_deref().unwrap_or(""),
            _ => &self.community,
        }
    }
}

/// A directed weighted relation between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

/// Attributes of a retained node in the layout graph.
#[derive(Debug, Clone)]
pub struct NodeAttrs {
    /// Dense export key; equals this node's index in the layout graph.
    pub key: u32,
    pub did: String,
    pub label: String,
    pub community: String,
    /// Raw `size` property from the snapshot, if any.
    pub input_size: Option<f64>,
    pub c_type: Option<String>,
    pub x: f64,
    pub y: f64,
    /// Display diameter.
    pub size: f64,
    /// Display area, π·(size/2)².
    pub area: f64,
    /// Aggregated weight the size was derived from.
    pub total: f64,
    pub color: Option<String>,
}

/// Attributes of a weighted edge in the layout graph.
#[derive(Debug, Clone)]
pub struct EdgeAttrs {
    /// Raw relation weight before the mutuality adjustment.
    pub og_weight: f64,
    /// Display weight after mutuality adjustment, rounded to 2 decimals.
    pub weight: f64,
    /// Display size on the fixed [0.2, 10] range.
    pub size: f64,
    /// Protected from pruning.
    pub stay: bool,
}

/// The mutable graph every pipeline stage operates on.
pub type LayoutGraph = StableDiGraph<NodeAttrs, EdgeAttrs>;

/// Round to 2 decimal places, conserving bits in the exported artifact.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
