//! Layout computation: force-directed positioning, cluster building, and
//! edge pruning.
//!
//! The force-directed algorithm itself is an external collaborator behind
//! the [`ForceLayoutEngine`] trait: it receives a seeded graph plus engine
//! settings and mutates node positions in place. Everything around it —
//! circular seeding, the optional rotation post-step, cluster barycenters,
//! pruning — lives here.

pub mod cluster;
pub mod prune;
pub mod spring;

use std::f64::consts::PI;

use tracing::info;

use crate::config::ResolvedLayout;
use crate::graph::LayoutGraph;

pub use cluster::{Cluster, assign_cluster_positions, initialize_clusters};
pub use prune::filter_edges;
pub use spring::SpringEngine;

/// Settings handed to the external layout engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Simulation iterations to run.
    pub iterations: usize,
    /// `> 0` enables Barnes–Hut spatial approximation (O(n log n) instead of
    /// O(n²)); a performance knob, not a correctness one.
    pub barnes_hut_theta: f64,
    /// Convergence hint scaled to graph order.
    pub delta_threshold: f64,
}

/// External force-directed layout engine contract.
///
/// The engine mutates each node's position in place. It is deterministic
/// only up to the initial seeding and floating-point summation order.
pub trait ForceLayoutEngine: Sync {
    fn run(&self, graph: &mut LayoutGraph, settings: &EngineSettings);
}

/// Radius of the circular seeding ring.
const SEED_RADIUS: f64 = 100.0;

/// Seed initial positions on a circle. Required precondition of the engine.
pub fn seed_circular(graph: &mut LayoutGraph) {
    let count = graph.node_count();
    if count == 0 {
        return;
    }
    let indices: Vec<_> = graph.node_indices().collect();
    for (i, idx) in indices.into_iter().enumerate() {
        let angle = (i as f64) * 2.0 * PI / count as f64;
        let attrs = &mut graph[idx];
        attrs.x = SEED_RADIUS * angle.cos();
        attrs.y = SEED_RADIUS * angle.sin();
    }
}

/// Rigidly rotate the whole point set by `radians` around the origin.
pub fn rotate(graph: &mut LayoutGraph, radians: f64) {
    let (sin, cos) = radians.sin_cos();
    let indices: Vec<_> = graph.node_indices().collect();
    for idx in indices {
        let attrs = &mut graph[idx];
        let (x, y) = (attrs.x, attrs.y);
        attrs.x = x * cos - y * sin;
        attrs.y = x * sin + y * cos;
    }
}

/// Run the full positioning step for one layout: circular seeding, the
/// external engine, and the optional rotation post-step.
pub fn run_layout(graph: &mut LayoutGraph, layout: &ResolvedLayout, engine: &dyn ForceLayoutEngine) {
    info!(layout = %layout.name, "assigning layout");

    if graph.node_count() == 0 {
        return;
    }

    seed_circular(graph);

    let settings = EngineSettings {
        iterations: layout.settings.iteration_count,
        barnes_hut_theta: layout.settings.barnes_hut_theta,
        delta_threshold: graph.node_count() as f64 * 0.001,
    };

    info!(
        iterations = settings.iterations,
        barnes_hut_theta = settings.barnes_hut_theta,
        "running force simulation"
    );
    engine.run(graph, &settings);
    info!("done running force simulation");

    if layout.settings.rotate {
        let radians = layout.settings.angle * PI;
        info!(radians, "rotating layout");
        rotate(graph, radians);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeAttrs, NodeAttrs};

    fn node(key: u32) -> NodeAttrs {
        NodeAttrs {
            key,
            did: format!("did:{key}"),
            label: format!("node-{key}"),
            community: "1".into(),
            input_size: None,
            c_type: None,
            x: 0.0,
            y: 0.0,
            size: 1.0,
            area: 1.0,
            total: 0.0,
            color: None,
        }
    }

    fn small_graph(n: u32) -> LayoutGraph {
        let mut graph = LayoutGraph::default();
        for key in 0..n {
            graph.add_node(node(key));
        }
        graph
    }

    #[test]
    fn circular_seed_places_nodes_on_the_ring() {
        let mut graph = small_graph(4);
        seed_circular(&mut graph);
        for idx in graph.node_indices() {
            let attrs = &graph[idx];
            let radius = (attrs.x * attrs.x + attrs.y * attrs.y).sqrt();
            assert!((radius - 100.0).abs() < 1e-9);
        }
        // Distinct angles: no two nodes coincide.
        let positions: Vec<(i64, i64)> = graph
            .node_indices()
            .map(|i| ((graph[i].x * 1000.0) as i64, (graph[i].y * 1000.0) as i64))
            .collect();
        let mut unique = positions.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), positions.len());
    }

    #[test]
    fn rotation_by_pi_negates_coordinates() {
        let mut graph = small_graph(3);
        seed_circular(&mut graph);
        let before: Vec<(f64, f64)> = graph.node_indices().map(|i| (graph[i].x, graph[i].y)).collect();
        rotate(&mut graph, PI);
        for (idx, (x0, y0)) in graph.node_indices().zip(before) {
            assert!((graph[idx].x + x0).abs() < 1e-9);
            assert!((graph[idx].y + y0).abs() < 1e-9);
        }
    }

    #[test]
    fn run_layout_moves_connected_nodes() {
        let config = test_config(false);
        let layout = config.layout("atlas").unwrap();
        let mut graph = small_graph(3);
        let a = graph.node_indices().next().unwrap();
        let b = graph.node_indices().nth(1).unwrap();
        graph.add_edge(
            a,
            b,
            EdgeAttrs {
                og_weight: 1.0,
                weight: 1.0,
                size: 1.0,
                stay: false,
            },
        );

        run_layout(&mut graph, layout, &SpringEngine::default());
        for idx in graph.node_indices() {
            assert!(graph[idx].x.is_finite());
            assert!(graph[idx].y.is_finite());
        }
    }

    #[test]
    fn empty_graph_is_a_no_op() {
        let config = test_config(true);
        let layout = config.layout("atlas").unwrap();
        let mut graph = LayoutGraph::default();
        run_layout(&mut graph, layout, &SpringEngine::default());
        assert_eq!(graph.node_count(), 0);
    }

    fn test_config(rotate: bool) -> crate::config::AtlasConfig {
        let doc = serde_json::json!({
            "settings": {"graphVersion": 1, "configVersion": "1.0.0"},
            "layout": {"modes": {"default": ["atlas"]}, "layouts": [{
                "name": "atlas",
                "graphFilePath": "graph.json",
                "settings": {"iterationCount": 30, "rotate": rotate, "angle": 0.5},
                "groups": {"main": [{"name": "web"}]}
            }]},
            "clusters": [{"community": "1", "name": "web", "color": "#009ACD"}]
        });
        crate::config::AtlasConfig::from_value(doc, "test").unwrap()
    }
}
