//! Edge weighting: mutuality adjustment and log-scaled display sizes.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use super::{EdgeAttrs, IndexedGraph, Relation, round2};

const MIN_EDGE_SIZE: f64 = 0.2;
const MAX_EDGE_SIZE: f64 = 10.0;

/// Weigh every relation and add the surviving edges to the layout graph.
///
/// A relation with a reverse counterpart is reweighted by mutuality:
/// `both = w + w'`, `mutuality = (w/both)·(w'/both)`, and the adjusted weight
/// is `mutuality · both · (1 + ln both)`. Display size maps `ln(adjusted)`
/// linearly from the global raw-weight log range onto [0.2, 10]; a degenerate
/// range (no relations, or a single distinct weight) maps everything to the
/// midpoint. Edges touching hidden nodes are dropped.
///
/// Returns the total of all raw weights for summary reporting.
pub fn add_edges(indexed: &mut IndexedGraph, rels: &[Relation]) -> f64 {
    info!(rels = rels.len(), "adding edges");

    // Reverse lookup for the mutuality adjustment.
    let mut reverse: HashMap<(&str, &str), f64> = HashMap::with_capacity(rels.len());
    for rel in rels {
        reverse.insert((rel.source.as_str(), rel.target.as_str()), rel.weight);
    }

    let mut min_weight = f64::INFINITY;
    let mut max_weight = f64::NEG_INFINITY;
    let mut total_weight = 0.0;
    for rel in rels {
        min_weight = min_weight.min(rel.weight);
        max_weight = max_weight.max(rel.weight);
        total_weight += rel.weight;
    }

    let log_min = min_weight.ln();
    let log_max = max_weight.ln();
    let degenerate = rels.is_empty() || (log_max - log_min).abs() < f64::EPSILON;
    if degenerate && !rels.is_empty() {
        debug!("degenerate raw-weight range; mapping edge sizes to the midpoint");
    }

    let mut dropped_hidden = 0usize;
    let mut dropped_unknown = 0usize;

    for rel in rels {
        let mut weight = rel.weight;
        if let Some(&partner) = reverse.get(&(rel.target.as_str(), rel.source.as_str())) {
            let both = rel.weight + partner;
            let mutuality = (rel.weight / both) * (partner / both);
            weight = mutuality * both * (1.0 + both.ln());
        }

        let size = if degenerate {
            (MIN_EDGE_SIZE + MAX_EDGE_SIZE) / 2.0
        } else {
            MIN_EDGE_SIZE
                + ((weight.ln() - log_min) / (log_max - log_min)) * (MAX_EDGE_SIZE - MIN_EDGE_SIZE)
        };

        if indexed.hidden.contains(&rel.source) || indexed.hidden.contains(&rel.target) {
            dropped_hidden += 1;
            continue;
        }
        let (Some(&source), Some(&target)) = (
            indexed.by_did.get(&rel.source),
            indexed.by_did.get(&rel.target),
        ) else {
            dropped_unknown += 1;
            continue;
        };

        indexed.graph.add_edge(
            source,
            target,
            EdgeAttrs {
                og_weight: rel.weight,
                weight: round2(weight),
                size: round2(size),
                stay: false,
            },
        );
    }

    if dropped_unknown > 0 {
        warn!(dropped = dropped_unknown, "relations referenced unknown nodes");
    }
    info!(
        edges = indexed.graph.edge_count(),
        dropped_hidden,
        total_weight,
        "done adding edges"
    );

    total_weight
}
