//! Edge pruning: bound artifact size while preserving each node's strongest
//! relationships from both directions.

use petgraph::Direction;
use petgraph::stable_graph::EdgeIndex;
use petgraph::visit::EdgeRef;
use tracing::info;

use crate::config::{AtlasConfig, ResolvedLayout};
use crate::graph::LayoutGraph;

/// Prune each node's edges down to a bounded, deterministic subset.
///
/// Phase 1 marks every node's `topNonRemovableEdges` highest-weight incident
/// edges (either direction) as protected. Phase 2 keeps, per node, the
/// highest-weight outbound edges up to the cluster-group override for the
/// node's cluster (or the global `maxEdges` default) and drops everything
/// neither protected nor kept. Protection is absolute: an edge protected by
/// one endpoint survives the other endpoint's outbound pass.
pub fn filter_edges(graph: &mut LayoutGraph, layout: &ResolvedLayout, config: &AtlasConfig) {
    info!(layout = %layout.name, "filtering edges");

    let top_stay = layout.settings.top_non_removable_edges;
    let max_edges = layout.settings.max_edges;
    let overrides = config.max_edges_overrides.get(&layout.name);

    let nodes: Vec<_> = graph.node_indices().collect();

    for &node in &nodes {
        let mut incident: Vec<EdgeIndex> = graph
            .edges_directed(node, Direction::Outgoing)
            .chain(graph.edges_directed(node, Direction::Incoming))
            .map(|e| e.id())
            .collect();
        incident.sort();
        incident.dedup();
        sort_by_weight_desc(graph, &mut incident);

        for &edge in incident.iter().take(top_stay) {
            graph[edge].stay = true;
        }
    }

    let mut dropped = 0usize;
    for &node in &nodes {
        let mut outbound: Vec<EdgeIndex> = graph
            .edges_directed(node, Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        sort_by_weight_desc(graph, &mut outbound);

        let cluster_name = config
            .cluster_by_community(&graph[node].community)
            .map(|c| c.name.as_str());
        let keep = cluster_name
            .and_then(|name| overrides.and_then(|map| map.get(name).copied()))
            .unwrap_or(max_edges);

        for &edge in outbound.iter().skip(keep) {
            if graph[edge].stay {
                continue;
            }
            graph.remove_edge(edge);
            dropped += 1;
        }
    }

    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        dropped,
        "done filtering edges"
    );
}

fn sort_by_weight_desc(graph: &LayoutGraph, edges: &mut [EdgeIndex]) {
    edges.sort_by(|a, b| {
        graph[*b]
            .weight
            .partial_cmp(&graph[*a].weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeAttrs, NodeAttrs};
    use petgraph::stable_graph::NodeIndex;
    use std::collections::HashMap;

    fn config(override_max: Option<usize>) -> AtlasConfig {
        let mut group = serde_json::json!({"name": "web"});
        if let Some(max) = override_max {
            group["maxEdges"] = serde_json::json!(max);
        }
        let doc = serde_json::json!({
            "settings": {"graphVersion": 1, "configVersion": "1.0.0"},
            "layout": {"modes": {"default": ["atlas"]}, "layouts": [{
                "name": "atlas",
                "graphFilePath": "graph.json",
                "settings": {"maxEdges": 2, "topNonRemovableEdges": 3},
                "groups": {"main": [group, {"name": "anchor"}]}
            }]},
            "clusters": [
                {"community": "1", "name": "web", "color": "#009ACD"},
                {"community": "2", "name": "anchor", "color": "#00BFFF"}
            ]
        });
        AtlasConfig::from_value(doc, "test").unwrap()
    }

    struct Fixture {
        graph: LayoutGraph,
        nodes: HashMap<&'static str, NodeIndex>,
    }

    impl Fixture {
        fn new(names: &[(&'static str, &'static str)]) -> Self {
            let mut graph = LayoutGraph::default();
            let mut nodes = HashMap::new();
            for (i, (name, community)) in names.iter().enumerate() {
                let idx = graph.add_node(NodeAttrs {
                    key: i as u32,
                    did: format!("did:{name}"),
                    label: (*name).into(),
                    community: (*community).into(),
                    input_size: None,
                    c_type: None,
                    x: 0.0,
                    y: 0.0,
                    size: 1.0,
                    area: 1.0,
                    total: 0.0,
                    color: None,
                });
                nodes.insert(*name, idx);
            }
            Fixture { graph, nodes }
        }

        fn edge(&mut self, from: &str, to: &str, weight: f64) {
            self.graph.add_edge(
                self.nodes[from],
                self.nodes[to],
                EdgeAttrs {
                    og_weight: weight,
                    weight,
                    size: 1.0,
                    stay: false,
                },
            );
        }

        fn outbound(&self, name: &str) -> Vec<f64> {
            self.graph
                .edges_directed(self.nodes[name], Direction::Outgoing)
                .map(|e| e.weight().weight)
                .collect()
        }
    }

    /// Hub with six outbound edges; every target has three heavier anchor
    /// edges so nothing protects the hub's edges from the far side.
    fn hub_fixture() -> Fixture {
        let mut f = Fixture::new(&[
            ("a", "1"),
            ("t1", "2"),
            ("t2", "2"),
            ("t3", "2"),
            ("t4", "2"),
            ("t5", "2"),
            ("t6", "2"),
            ("x", "2"),
            ("y", "2"),
        ]);
        for (i, t) in ["t1", "t2", "t3", "t4", "t5", "t6"].iter().enumerate() {
            f.edge("a", t, 10.0 - i as f64);
            f.edge(t, "x", 100.0);
            f.edge("x", t, 95.0);
            f.edge(t, "y", 90.0);
        }
        f
    }

    #[test]
    fn outbound_survivors_bounded_by_stay_and_keep() {
        let config = config(None);
        let layout = config.layout("atlas").unwrap();
        let mut f = hub_fixture();

        filter_edges(&mut f.graph, layout, &config);

        // maxEdges=2 keeps {10, 9}; topNonRemovableEdges=3 protects {10, 9, 8}.
        let mut weights = f.outbound("a");
        weights.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert_eq!(weights, vec![10.0, 9.0, 8.0]);
        assert!(weights.len() <= layout.settings.top_non_removable_edges.max(layout.settings.max_edges));
    }

    #[test]
    fn cluster_override_shrinks_the_keep_count() {
        let config = config(Some(1));
        let layout = config.layout("atlas").unwrap();
        let mut f = hub_fixture();

        filter_edges(&mut f.graph, layout, &config);

        // Override 1 keeps only the heaviest outbound edge, but the stay set
        // still protects the top three incident edges.
        let mut weights = f.outbound("a");
        weights.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert_eq!(weights, vec![10.0, 9.0, 8.0]);
    }

    #[test]
    fn protection_by_the_far_endpoint_is_absolute() {
        let config = config(None);
        let layout = config.layout("atlas").unwrap();
        let mut f = Fixture::new(&[
            ("b", "1"),
            ("c", "2"),
            ("d", "2"),
            ("e", "2"),
            ("f", "2"),
        ]);
        // Three heavy outbound edges fill b's keep set and stay set...
        f.edge("b", "d", 50.0);
        f.edge("b", "e", 40.0);
        f.edge("b", "f", 30.0);
        // ...so this light edge is neither kept nor stay-marked by b, but c
        // has no other edges and protects it as its own top incident edge.
        f.edge("b", "c", 0.5);

        filter_edges(&mut f.graph, layout, &config);

        let weights = f.outbound("b");
        assert!(weights.contains(&0.5));
    }

    #[test]
    fn single_example_keeps_highest_outbound() {
        // Worked example: rels a→b 10, b→a 5, a→c 1 with maxEdges=1.
        let doc = serde_json::json!({
            "settings": {"graphVersion": 1, "configVersion": "1.0.0"},
            "layout": {"modes": {"default": ["atlas"]}, "layouts": [{
                "name": "atlas",
                "graphFilePath": "graph.json",
                "settings": {"maxEdges": 1, "topNonRemovableEdges": 0},
                "groups": {"main": [{"name": "web"}]}
            }]},
            "clusters": [{"community": "1", "name": "web", "color": "#009ACD"}]
        });
        let config = AtlasConfig::from_value(doc, "test").unwrap();
        let layout = config.layout("atlas").unwrap();

        let mut f = Fixture::new(&[("a", "1"), ("b", "1"), ("c", "1")]);
        f.edge("a", "b", 12.36);
        f.edge("b", "a", 12.36);
        f.edge("a", "c", 1.0);

        filter_edges(&mut f.graph, layout, &config);
        assert_eq!(f.outbound("a"), vec![12.36]);
    }
}
