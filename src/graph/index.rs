//! Node indexing: dense key assignment with exclusion handling.

use std::collections::{HashMap, HashSet};

use petgraph::stable_graph::NodeIndex;
use tracing::{debug, info};

use crate::config::{AtlasConfig, ResolvedLayout};

use super::{GraphSnapshot, LayoutGraph, NodeAttrs};

/// The layout graph under construction plus the lookups later stages need.
#[derive(Debug)]
pub struct IndexedGraph {
    pub graph: LayoutGraph,
    /// did → node index (== dense key) for retained nodes.
    pub by_did: HashMap<String, NodeIndex>,
    /// dids of nodes dropped by community exclusion; edges touching them
    /// are dropped too.
    pub hidden: HashSet<String>,
}

/// Index the snapshot's sorted nodes: excluded communities go to the hidden
/// set, everything else receives the next dense key.
pub fn add_nodes(
    snapshot: &GraphSnapshot,
    layout: &ResolvedLayout,
    config: &AtlasConfig,
) -> IndexedGraph {
    info!(layout = %layout.name, nodes = snapshot.nodes.len(), "adding nodes");

    let excluded = config.excluded_communities.get(&layout.name);
    if let Some(excluded) = excluded {
        if !excluded.is_empty() {
            debug!(layout = %layout.name, communities = ?excluded, "communities to be skipped");
        }
    }

    let property = &layout.settings.community_property;
    let mut graph = LayoutGraph::with_capacity(snapshot.nodes.len(), snapshot.rels.len());
    let mut by_did = HashMap::with_capacity(snapshot.nodes.len());
    let mut hidden = HashSet::new();

    for node in &snapshot.nodes {
        let community = node.community_key(property);
        if excluded.is_some_and(|set| set.contains(community)) {
            hidden.insert(node.did.clone());
            continue;
        }

        let key = graph.node_count() as u32;
        let idx = graph.add_node(NodeAttrs {
            key,
            did: node.did.clone(),
            label: node.handle.clone().unwrap_or_else(|| node.did.clone()),
            community: community.to_string(),
            input_size: node.size,
            c_type: node.c_type.clone(),
            x: 0.0,
            y: 0.0,
            size: 0.0,
            area: 0.0,
            total: 0.0,
            color: None,
        });
        debug_assert_eq!(idx.index() as u32, key);
        by_did.insert(node.did.clone(), idx);
    }

    info!(
        layout = %layout.name,
        retained = graph.node_count(),
        hidden = hidden.len(),
        "done adding nodes"
    );

    IndexedGraph {
        graph,
        by_did,
        hidden,
    }
}
