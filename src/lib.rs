//! # skyatlas
//!
//! Offline exporter turning a social-interaction graph into pre-computed,
//! versioned visual layout artifacts: node/edge collections enriched with
//! position, size, color and cluster metadata, ready for direct rendering.
//!
//! ## Architecture
//!
//! - **Configuration** (`config`): layered settings with layout inheritance,
//!   cluster grouping, and exclusion rules, resolved once into an immutable
//!   [`config::AtlasConfig`]
//! - **Graph** (`graph`): snapshot loading, dense node indexing,
//!   mutuality-adjusted edge weighting, and node sizing over a petgraph
//!   substrate
//! - **Layout** (`layout`): circular seeding, the external force-directed
//!   engine seam, cluster barycenters, and edge pruning
//! - **Export** (`export`): per-layout orchestration with version-marker
//!   gated incremental regeneration
//!
//! ## Library usage
//!
//! ```no_run
//! use std::path::Path;
//!
//! use skyatlas::config::AtlasConfig;
//! use skyatlas::export::Exporter;
//! use skyatlas::layout::SpringEngine;
//!
//! let config = AtlasConfig::from_file(Path::new("input/config.json")).unwrap();
//! let engine = SpringEngine::default();
//! let exporter = Exporter::new(&config, None, Path::new("input"), Path::new("out"), &engine);
//! let summary = exporter.run(false).unwrap();
//! println!("generated {} layouts", summary.generated);
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod layout;
pub mod paths;
