//! Export orchestration: versioned, incremental layout generation.
//!
//! One layout is processed start-to-finish before its artifact is committed;
//! independent layouts are processed concurrently. Snapshot loading is
//! deduplicated by path. A failed layout aborts only itself — previously
//! committed artifacts are never touched, and a layout's version marker is
//! written only after its artifact write succeeds.

pub mod archive;
pub mod artifact;
pub mod version;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rayon::prelude::*;
use tracing::{debug, error, info};

use crate::config::{AtlasConfig, ResolvedLayout};
use crate::error::{AtlasResult, ExportError};
use crate::graph::{GraphSnapshot, add_edges, add_nodes, assign_node_sizes, load_snapshot};
use crate::layout::{
    ForceLayoutEngine, assign_cluster_positions, filter_edges, initialize_clusters, run_layout,
};
use crate::paths::OutputPaths;

pub use archive::extract_archive;
pub use artifact::{Artifact, build_artifact, write_artifact};
pub use version::{Decision, VersionMarker, decide, read_marker, write_marker};

/// Loaded snapshots keyed by input-relative path: one load per distinct file
/// regardless of how many layouts reference it.
type SnapshotCache = DashMap<String, Arc<GraphSnapshot>>;

/// Tally of one export run.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ExportSummary {
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// What happened to one layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Generated,
    Skipped,
}

/// Sequences the pipeline stages per layout and owns the versioning
/// protocol.
pub struct Exporter<'a> {
    root: &'a AtlasConfig,
    sub: Option<&'a AtlasConfig>,
    input_dir: PathBuf,
    paths: OutputPaths,
    engine: &'a dyn ForceLayoutEngine,
}

impl<'a> Exporter<'a> {
    pub fn new(
        root: &'a AtlasConfig,
        sub: Option<&'a AtlasConfig>,
        input_dir: &Path,
        out_dir: &Path,
        engine: &'a dyn ForceLayoutEngine,
    ) -> Self {
        Self {
            root,
            sub,
            input_dir: input_dir.to_path_buf(),
            paths: OutputPaths::new(out_dir),
            engine,
        }
    }

    /// Export every layout of the given display mode, then handle sub-layout
    /// packages: extracted pre-generated in normal runs, generated from the
    /// sub-layout configuration in dev mode.
    pub fn run(&self, moderator: bool) -> AtlasResult<ExportSummary> {
        info!(
            config_version = %self.root.config_version,
            graph_version = self.root.graph_version,
            "starting exporter"
        );
        self.paths.ensure_dirs()?;

        let layouts = self.root.layouts_by_mode(moderator);
        let cache = SnapshotCache::default();
        self.preload_snapshots(&layouts, &cache);

        let mut summary = ExportSummary::default();
        let results: Vec<Option<Outcome>> = layouts
            .par_iter()
            .map(|layout| self.try_layout(self.root, layout, &layout.graph_file_path, &cache))
            .collect();
        tally(&mut summary, &results);

        if self.root.is_dev {
            self.generate_sub_layouts(&mut summary, &cache);
        } else {
            self.unpack_sub_layouts(&layouts, &mut summary);
        }

        info!(
            generated = summary.generated,
            skipped = summary.skipped,
            failed = summary.failed,
            "exporter finished"
        );
        Ok(summary)
    }

    /// Load each distinct snapshot file once, in parallel. Failures are
    /// reported by the layouts that need the file.
    fn preload_snapshots(&self, layouts: &[&ResolvedLayout], cache: &SnapshotCache) {
        let distinct: BTreeSet<&str> = layouts.iter().map(|l| l.graph_file_path.as_str()).collect();
        let distinct: Vec<&str> = distinct.into_iter().collect();
        distinct.par_iter().for_each(|rel| {
            match load_snapshot(&self.input_dir.join(rel), self.root.graph_version) {
                Ok(snapshot) => {
                    cache.insert(rel.to_string(), Arc::new(snapshot));
                }
                Err(e) => debug!(path = rel, error = %e, "snapshot preload failed"),
            }
        });
    }

    fn snapshot(&self, cache: &SnapshotCache, rel: &str) -> AtlasResult<Arc<GraphSnapshot>> {
        if let Some(found) = cache.get(rel) {
            return Ok(Arc::clone(found.value()));
        }
        let snapshot = Arc::new(load_snapshot(
            &self.input_dir.join(rel),
            self.root.graph_version,
        )?);
        cache.insert(rel.to_string(), Arc::clone(&snapshot));
        Ok(snapshot)
    }

    fn try_layout(
        &self,
        config: &AtlasConfig,
        layout: &ResolvedLayout,
        snapshot_rel: &str,
        cache: &SnapshotCache,
    ) -> Option<Outcome> {
        match self.export_layout(config, layout, snapshot_rel, cache) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(layout = %layout.name, error = %e, "layout export failed");
                None
            }
        }
    }

    /// The per-layout state machine: skip, or run the full pipeline and
    /// commit artifact + markers.
    fn export_layout(
        &self,
        config: &AtlasConfig,
        layout: &ResolvedLayout,
        snapshot_rel: &str,
        cache: &SnapshotCache,
    ) -> AtlasResult<Outcome> {
        let artifact_path = self.paths.layout_artifact(&layout.name, layout.is_sub_layout);
        let marker_path = self.paths.layout_marker(&layout.name, layout.is_sub_layout);
        let artifact_exists = artifact_path.exists();

        // Sub-layout artifacts are immutable once present.
        if layout.is_sub_layout && artifact_exists {
            debug!(layout = %layout.name, "sub-layout artifact exists; skipping");
            return Ok(Outcome::Skipped);
        }

        let marker = read_marker(&marker_path);
        match decide(
            &self.root.config_version,
            self.root.graph_version,
            marker.as_ref(),
            artifact_exists,
        ) {
            Decision::Skip { patch_drift } => {
                info!(layout = %layout.name, "no changes requiring layout re-gen");
                if patch_drift {
                    info!(
                        layout = %layout.name,
                        version = %self.root.config_version,
                        "updating recorded version"
                    );
                }
                self.write_version_files(&marker_path)?;
                self.export_search(layout)?;
                Ok(Outcome::Skipped)
            }
            Decision::Regenerate => {
                info!(
                    layout = %layout.name,
                    config_version = %self.root.config_version,
                    "generating layout"
                );
                let snapshot = self.snapshot(cache, snapshot_rel)?;
                let artifact = self.generate(config, layout, &snapshot)?;
                write_artifact(&artifact_path, &artifact)?;
                self.export_search(layout)?;
                if !layout.is_sub_layout {
                    self.write_version_files(&marker_path)?;
                }
                Ok(Outcome::Generated)
            }
        }
    }

    /// Stages 2–9: index, weigh, size, position, cluster, prune, aggregate.
    fn generate(
        &self,
        config: &AtlasConfig,
        layout: &ResolvedLayout,
        snapshot: &GraphSnapshot,
    ) -> AtlasResult<Artifact> {
        let mut indexed = add_nodes(snapshot, layout, config);
        let total_weight = add_edges(&mut indexed, &snapshot.rels);

        let mut rng = rand::thread_rng();
        assign_node_sizes(&mut indexed.graph, layout, total_weight, &mut rng)?;

        run_layout(&mut indexed.graph, layout, self.engine);

        let mut clusters = initialize_clusters(&mut indexed.graph, layout, config);
        filter_edges(&mut indexed.graph, layout, config);
        assign_cluster_positions(&indexed.graph, &mut clusters);

        let last_updated = snapshot
            .timestamp
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        Ok(build_artifact(&indexed.graph, clusters, last_updated))
    }

    /// The independent search-index version check. The search marker is
    /// refreshed whether the packaged index was re-extracted or not.
    fn export_search(&self, layout: &ResolvedLayout) -> AtlasResult<()> {
        let marker_path = self.paths.search_marker(&layout.name, layout.is_sub_layout);
        let marker = read_marker(&marker_path);

        // Search gating compares versions only; there is no single artifact
        // file whose existence could be checked.
        match decide(
            &self.root.config_version,
            self.root.graph_version,
            marker.as_ref(),
            true,
        ) {
            Decision::Skip { .. } => {
                info!(layout = %layout.name, "no changes requiring search re-gen");
            }
            Decision::Regenerate => {
                if let Some(search) = &layout.search {
                    if let Some(src) = &search.search_src_file_name {
                        extract_archive(
                            &self.input_dir.join(src),
                            &self.paths.search_out(&search.out_dir),
                        )?;
                    }
                }
            }
        }

        write_marker(
            &marker_path,
            &VersionMarker::new(&self.root.config_version, self.root.graph_version),
        )?;
        Ok(())
    }

    /// Marker plus the versioned configuration snapshot copy. Only called
    /// after the corresponding artifact is on disk.
    fn write_version_files(&self, marker_path: &Path) -> AtlasResult<()> {
        debug!(path = %marker_path.display(), "writing version file");
        write_marker(
            marker_path,
            &VersionMarker::new(&self.root.config_version, self.root.graph_version),
        )?;

        let snapshot_path = self.paths.config_snapshot(&self.root.config_version);
        let bytes = serde_json::to_vec(self.root.raw()).map_err(|e| ExportError::Serialize {
            message: e.to_string(),
        })?;
        artifact::write_atomic(&snapshot_path, &bytes)?;
        Ok(())
    }

    /// Dev mode: generate sub-layouts from the sub-layout configuration
    /// against extracted snapshots, skipping absent files.
    fn generate_sub_layouts(&self, summary: &mut ExportSummary, cache: &SnapshotCache) {
        let Some(sub) = self.sub else {
            return;
        };
        let candidates: Vec<(&ResolvedLayout, String)> = sub
            .layouts
            .iter()
            .filter_map(|layout| {
                let rel = format!("sub_layouts/{}", layout.graph_file_path);
                if self.input_dir.join(&rel).exists() {
                    Some((layout, rel))
                } else {
                    debug!(layout = %layout.name, path = rel, "sub-layout snapshot absent");
                    None
                }
            })
            .collect();

        let results: Vec<Option<Outcome>> = candidates
            .par_iter()
            .map(|(layout, rel)| self.try_layout(sub, layout, rel, cache))
            .collect();
        tally(summary, &results);
    }

    /// Normal runs ship pre-generated sub-layout artifacts as a packaged
    /// archive next to the main snapshot.
    fn unpack_sub_layouts(&self, layouts: &[&ResolvedLayout], summary: &mut ExportSummary) {
        for layout in layouts {
            let Some(file) = &layout.sub_layouts_file_path else {
                continue;
            };
            let archive = self.input_dir.join(file);
            if !archive.exists() {
                debug!(layout = %layout.name, path = %archive.display(), "no sub-layout package");
                continue;
            }
            info!(layout = %layout.name, "unpacking sub-layout package");
            if let Err(e) = extract_archive(&archive, &self.paths.sub_layouts_dir) {
                error!(layout = %layout.name, error = %e, "sub-layout unpack failed");
                summary.failed += 1;
            }
        }
    }
}

fn tally(summary: &mut ExportSummary, results: &[Option<Outcome>]) {
    for result in results {
        match result {
            Some(Outcome::Generated) => summary.generated += 1,
            Some(Outcome::Skipped) => summary.skipped += 1,
            None => summary.failed += 1,
        }
    }
}
