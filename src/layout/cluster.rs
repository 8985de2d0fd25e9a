//! Cluster building and outlier-filtered barycenter computation.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{AtlasConfig, ResolvedLayout};
use crate::graph::{LayoutGraph, round2};

/// A transient cluster member position.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A display cluster computed from the indexed graph: one per distinct
/// community value, created lazily on first sighting.
#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    /// The raw community id.
    pub idx: String,
    pub name: String,
    /// Member node count.
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prio: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub representative: Option<String>,
    /// Member positions accumulated for barycenter computation; cleared
    /// before the artifact is serialized.
    pub positions: Vec<Position>,
}

/// Build the cluster map from positioned nodes and truncate node positions
/// to 2-decimal precision. Truncation happens after the engine has fully
/// converged and before any position is read for aggregation.
pub fn initialize_clusters(
    graph: &mut LayoutGraph,
    layout: &ResolvedLayout,
    config: &AtlasConfig,
) -> BTreeMap<String, Cluster> {
    info!(layout = %layout.name, "initializing clusters");

    let mut clusters: BTreeMap<String, Cluster> = BTreeMap::new();
    for idx in graph.node_indices() {
        let community = graph[idx].community.clone();
        match clusters.get_mut(&community) {
            Some(cluster) => cluster.size += 1,
            None => {
                let configured = config.cluster_by_community(&community);
                clusters.insert(
                    community.clone(),
                    Cluster {
                        idx: community.clone(),
                        name: configured
                            .map(|c| c.name.clone())
                            .unwrap_or_else(|| community.clone()),
                        size: 1,
                        x: None,
                        y: None,
                        color: None,
                        prio: configured.and_then(|c| c.prio),
                        representative: configured.and_then(|c| c.leader.clone()),
                        positions: Vec::new(),
                    },
                );
            }
        }
    }

    debug!("truncating node position assignments");
    let indices: Vec<_> = graph.node_indices().collect();
    for idx in indices {
        let attrs = &mut graph[idx];
        attrs.x = round2(attrs.x);
        attrs.y = round2(attrs.y);
    }

    info!(clusters = clusters.len(), "done initializing clusters");
    clusters
}

/// Compute an outlier-filtered barycenter per cluster.
///
/// Mean and population standard deviation are taken per axis; member
/// positions more than 2σ from the mean on either axis are discarded. A
/// cluster whose filter empties stays unpositioned rather than falling back
/// to the unfiltered mean. All transient position lists are cleared before
/// returning.
pub fn assign_cluster_positions(graph: &LayoutGraph, clusters: &mut BTreeMap<String, Cluster>) {
    info!("assigning cluster positions");

    for idx in graph.node_indices() {
        let attrs = &graph[idx];
        if let Some(cluster) = clusters.get_mut(&attrs.community) {
            cluster.positions.push(Position {
                x: attrs.x,
                y: attrs.y,
            });
        }
    }

    for cluster in clusters.values_mut() {
        if cluster.positions.is_empty() {
            debug!(cluster = %cluster.name, "no member positions; skipping");
            continue;
        }

        let count = cluster.positions.len() as f64;
        let mean_x = cluster.positions.iter().map(|p| p.x).sum::<f64>() / count;
        let mean_y = cluster.positions.iter().map(|p| p.y).sum::<f64>() / count;
        let std_x = (cluster
            .positions
            .iter()
            .map(|p| (p.x - mean_x).powi(2))
            .sum::<f64>()
            / count)
            .sqrt();
        let std_y = (cluster
            .positions
            .iter()
            .map(|p| (p.y - mean_y).powi(2))
            .sum::<f64>()
            / count)
            .sqrt();

        let filtered: Vec<&Position> = cluster
            .positions
            .iter()
            .filter(|p| (p.x - mean_x).abs() <= 2.0 * std_x && (p.y - mean_y).abs() <= 2.0 * std_y)
            .collect();

        debug!(
            cluster = %cluster.name,
            members = cluster.positions.len(),
            filtered = filtered.len(),
            "filtered member positions"
        );

        if filtered.is_empty() {
            debug!(cluster = %cluster.name, "filter emptied the set; skipping");
            continue;
        }

        let flen = filtered.len() as f64;
        cluster.x = Some(round2(filtered.iter().map(|p| p.x).sum::<f64>() / flen));
        cluster.y = Some(round2(filtered.iter().map(|p| p.y).sum::<f64>() / flen));
    }

    for cluster in clusters.values_mut() {
        cluster.positions.clear();
    }

    for cluster in clusters.values() {
        debug!(
            cluster = %cluster.name,
            size = cluster.size,
            representative = cluster.representative.as_deref().unwrap_or("N/A"),
            "cluster summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeAttrs;

    fn config() -> AtlasConfig {
        let doc = serde_json::json!({
            "settings": {"graphVersion": 1, "configVersion": "1.0.0"},
            "layout": {"modes": {"default": ["atlas"]}, "layouts": [{
                "name": "atlas",
                "graphFilePath": "graph.json",
                "settings": {},
                "groups": {"main": [{"name": "web"}, {"name": "gaming"}]}
            }]},
            "clusters": [
                {"community": "1", "name": "web", "color": "#009ACD", "leader": "did:lead", "prio": 3},
                {"community": "2", "name": "gaming", "color": "#00BFFF"}
            ]
        });
        AtlasConfig::from_value(doc, "test").unwrap()
    }

    fn node(key: u32, community: &str, x: f64, y: f64) -> NodeAttrs {
        NodeAttrs {
            key,
            did: format!("did:{key}"),
            label: format!("node-{key}"),
            community: community.into(),
            input_size: None,
            c_type: None,
            x,
            y,
            size: 1.0,
            area: 1.0,
            total: 0.0,
            color: None,
        }
    }

    #[test]
    fn cluster_sizes_match_membership_and_labels_resolve() {
        let config = config();
        let layout = config.layout("atlas").unwrap();
        let mut graph = LayoutGraph::default();
        graph.add_node(node(0, "1", 1.0, 1.0));
        graph.add_node(node(1, "1", 2.0, 2.0));
        graph.add_node(node(2, "2", 3.0, 3.0));
        graph.add_node(node(3, "99", 4.0, 4.0));

        let clusters = initialize_clusters(&mut graph, layout, &config);
        assert_eq!(clusters.len(), 3);
        assert_eq!(clusters["1"].size, 2);
        assert_eq!(clusters["1"].name, "web");
        assert_eq!(clusters["1"].prio, Some(3));
        assert_eq!(clusters["1"].representative.as_deref(), Some("did:lead"));
        // Unconfigured community falls back to its raw id.
        assert_eq!(clusters["99"].name, "99");
        assert_eq!(clusters["99"].prio, None);
    }

    #[test]
    fn node_positions_are_truncated() {
        let config = config();
        let layout = config.layout("atlas").unwrap();
        let mut graph = LayoutGraph::default();
        let idx = graph.add_node(node(0, "1", 1.23456, -9.87654));

        initialize_clusters(&mut graph, layout, &config);
        assert_eq!(graph[idx].x, 1.23);
        assert_eq!(graph[idx].y, -9.88);
    }

    #[test]
    fn outlier_is_excluded_from_the_barycenter() {
        let config = config();
        let layout = config.layout("atlas").unwrap();
        let mut graph = LayoutGraph::default();
        // Ten tight points around (10, 10) plus one extreme outlier.
        for key in 0..10u32 {
            let jitter = key as f64 * 0.1;
            graph.add_node(node(key, "1", 10.0 + jitter, 10.0 - jitter));
        }
        graph.add_node(node(10, "1", 5000.0, 5000.0));

        let mut clusters = initialize_clusters(&mut graph, layout, &config);
        assign_cluster_positions(&graph, &mut clusters);

        let cluster = &clusters["1"];
        let x = cluster.x.unwrap();
        let y = cluster.y.unwrap();
        // The barycenter stays near the tight mass, not dragged toward the outlier.
        assert!((x - 10.45).abs() < 1.0, "x = {x}");
        assert!((y - 9.55).abs() < 1.0, "y = {y}");
    }

    #[test]
    fn positions_are_cleared_after_aggregation() {
        let config = config();
        let layout = config.layout("atlas").unwrap();
        let mut graph = LayoutGraph::default();
        graph.add_node(node(0, "1", 1.0, 2.0));

        let mut clusters = initialize_clusters(&mut graph, layout, &config);
        assign_cluster_positions(&graph, &mut clusters);
        assert!(clusters["1"].positions.is_empty());
        assert_eq!(clusters["1"].x, Some(1.0));
    }

    #[test]
    fn empty_cluster_stays_unpositioned() {
        let mut clusters = BTreeMap::new();
        clusters.insert(
            "1".to_string(),
            Cluster {
                idx: "1".into(),
                name: "web".into(),
                size: 0,
                x: None,
                y: None,
                color: None,
                prio: None,
                representative: None,
                positions: Vec::new(),
            },
        );
        let graph = LayoutGraph::default();
        assign_cluster_positions(&graph, &mut clusters);
        assert_eq!(clusters["1"].x, None);
    }
}
