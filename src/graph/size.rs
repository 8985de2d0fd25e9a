//! Node sizing: direct property mapping or harmonic aggregation of
//! reciprocal edge weights.

use std::collections::HashMap;

use petgraph::stable_graph::NodeIndex;
use rand::Rng;
use tracing::{debug, info};

use crate::config::{MAPPING_FROM_NODE_PROPERTY, ResolvedLayout};
use crate::error::ConfigError;

use super::{LayoutGraph, round2};

/// Assign display size, area, and aggregated total to every node.
///
/// With a declared node-weight mapping the size derives directly from the
/// named node property. Without one, the legacy harmonic mode aggregates
/// `ln(1 + harmonic-mean)` over neighbors connected in both directions and
/// additionally draws a pseudo-random palette color per node.
pub fn assign_node_sizes<R: Rng>(
    graph: &mut LayoutGraph,
    layout: &ResolvedLayout,
    total_weight: f64,
    rng: &mut R,
) -> Result<(), ConfigError> {
    info!(layout = %layout.name, "assigning node attributes");

    let direct_property = layout
        .node_mapping
        .as_ref()
        .and_then(|m| m.weight.as_ref())
        .filter(|w| w.kind.as_deref() == Some(MAPPING_FROM_NODE_PROPERTY))
        .and_then(|w| w.node_property.clone());

    match direct_property {
        Some(property) => assign_direct(graph, layout, &property)?,
        None => assign_harmonic(graph, layout, rng),
    }

    info!(
        nodes = graph.node_count(),
        connections = graph.edge_count(),
        interactions = total_weight,
        "done assigning node attributes"
    );
    Ok(())
}

fn sized(total: f64, min_size: f64, max_size: f64, max_historic_weight_sum: f64) -> (f64, f64) {
    let size = min_size + (total / max_historic_weight_sum).sqrt() * (max_size - min_size);
    let radius = size / 2.0;
    let area = std::f64::consts::PI * radius * radius;
    (round2(size), round2(area))
}

fn assign_direct(
    graph: &mut LayoutGraph,
    layout: &ResolvedLayout,
    property: &str,
) -> Result<(), ConfigError> {
    debug!(property, "direct node size mapping");
    let settings = &layout.settings;

    let mut min_total = f64::INFINITY;
    let mut max_total = f64::NEG_INFINITY;

    let indices: Vec<NodeIndex> = graph.node_indices().collect();
    for idx in indices {
        let attrs = &graph[idx];
        let total = match property {
            "size" => attrs.input_size.unwrap_or(0.0),
            _ => {
                return Err(ConfigError::UnknownNodeProperty {
                    property: property.to_string(),
                });
            }
        };

        let (size, area) = sized(
            total,
            settings.min_size,
            settings.max_size,
            settings.max_historic_weight_sum,
        );
        min_total = min_total.min(total);
        max_total = max_total.max(total);

        let attrs = &mut graph[idx];
        attrs.total = total;
        attrs.size = size;
        attrs.area = area;
    }

    debug!(min_total, max_total, "direct weight range");
    Ok(())
}

fn assign_harmonic<R: Rng>(graph: &mut LayoutGraph, layout: &ResolvedLayout, rng: &mut R) {
    debug!("legacy harmonic node size generation");
    let settings = &layout.settings;
    let palette = &settings.colors;

    // Distinct per-neighbor weights, first relation per ordered pair wins;
    // self-loops never contribute.
    let mut in_weights: HashMap<NodeIndex, HashMap<NodeIndex, f64>> = HashMap::new();
    let mut out_weights: HashMap<NodeIndex, HashMap<NodeIndex, f64>> = HashMap::new();
    for edge in graph.edge_indices() {
        let Some((source, target)) = graph.edge_endpoints(edge) else {
            continue;
        };
        if source == target {
            continue;
        }
        let weight = graph[edge].weight;
        in_weights
            .entry(target)
            .or_default()
            .entry(source)
            .or_insert(weight);
        out_weights
            .entry(source)
            .or_default()
            .entry(target)
            .or_insert(weight);
    }

    let mut min_total = f64::INFINITY;
    let mut max_total = f64::NEG_INFINITY;

    let indices: Vec<NodeIndex> = graph.node_indices().collect();
    for idx in indices {
        let mut total = 0.0;
        if let (Some(outs), Some(ins)) = (out_weights.get(&idx), in_weights.get(&idx)) {
            for (neighbor, &out_weight) in outs {
                if let Some(&in_weight) = ins.get(neighbor) {
                    let sum = in_weight + out_weight;
                    let harmonic = if sum > 0.0 {
                        2.0 * in_weight * out_weight / sum
                    } else {
                        0.0
                    };
                    total += (1.0 + harmonic).ln();
                }
            }
        }

        min_total = min_total.min(total);
        max_total = max_total.max(total);

        let (size, area) = sized(
            total,
            settings.min_size,
            settings.max_size,
            settings.max_historic_weight_sum,
        );

        let color = if palette.is_empty() {
            None
        } else {
            Some(palette[rng.gen_range(0..palette.len())].clone())
        };

        let attrs = &mut graph[idx];
        attrs.total = total;
        attrs.size = size;
        attrs.area = area;
        attrs.color = color;
    }

    debug!(min_total, max_total, "harmonic weight sum range");
}
