//! Built-in layout engine backed by the `force_graph` spring embedder.

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use crate::graph::LayoutGraph;

use super::{EngineSettings, ForceLayoutEngine};

/// Spring-embedder engine.
///
/// Charge, spring, and damping parameters follow the simulation defaults the
/// rendering stack uses. The Barnes–Hut knob in [`EngineSettings`] is accepted
/// but not used: this embedder computes pairwise forces directly, so the knob
/// only matters to engines that approximate.
#[derive(Debug, Clone)]
pub struct SpringEngine {
    pub force_charge: f32,
    pub force_spring: f32,
    pub force_max: f32,
    pub node_speed: f32,
    pub damping_factor: f32,
    /// Simulation time step per iteration, in seconds.
    pub time_step: f32,
}

impl Default for SpringEngine {
    fn default() -> Self {
        Self {
            force_charge: 150.0,
            force_spring: 0.05,
            force_max: 100.0,
            node_speed: 3000.0,
            damping_factor: 0.9,
            time_step: 1.0 / 30.0,
        }
    }
}

impl ForceLayoutEngine for SpringEngine {
    fn run(&self, graph: &mut LayoutGraph, settings: &EngineSettings) {
        let mut sim: ForceGraph<u32, ()> = ForceGraph::new(SimulationParameters {
            force_charge: self.force_charge,
            force_spring: self.force_spring,
            force_max: self.force_max,
            node_speed: self.node_speed,
            damping_factor: self.damping_factor,
        });

        let mut sim_indices = Vec::with_capacity(graph.node_count());
        for idx in graph.node_indices() {
            let attrs = &graph[idx];
            let sim_idx = sim.add_node(NodeData {
                x: attrs.x as f32,
                y: attrs.y as f32,
                mass: 10.0,
                is_anchor: false,
                user_data: attrs.key,
            });
            sim_indices.push((idx, sim_idx));
        }

        for edge in graph.edge_references() {
            // Self-loops carry no spring force.
            if edge.source() == edge.target() {
                continue;
            }
            let source = sim_indices[edge.source().index()].1;
            let target = sim_indices[edge.target().index()].1;
            sim.add_edge(source, target, EdgeData::default());
        }

        for _ in 0..settings.iterations {
            sim.update(self.time_step);
        }

        let mut positions = vec![(0.0f32, 0.0f32); graph.node_count()];
        sim.visit_nodes(|node| {
            positions[node.data.user_data as usize] = (node.x(), node.y());
        });

        for (idx, _) in sim_indices {
            let (x, y) = positions[graph[idx].key as usize];
            let attrs = &mut graph[idx];
            attrs.x = x as f64;
            attrs.y = y as f64;
        }
    }
}
