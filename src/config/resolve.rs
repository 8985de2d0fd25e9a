//! Configuration resolution: inheritance flattening and per-layout indexes.
//!
//! `AtlasConfig` is an immutable value built once at startup and passed by
//! reference to every pipeline stage. All lookups are pure functions of the
//! resolved state.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use semver::Version;
use tracing::{debug, warn};

use crate::error::ConfigError;

use super::{
    ClusterConfig, DirectLayout, EffectiveSettings, GroupSection, LayoutDecl, Modes, NodeMapping,
    RawDocument, SearchConfig,
};

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// A layout with inheritance flattened and settings fully resolved.
#[derive(Debug, Clone)]
pub struct ResolvedLayout {
    pub name: String,
    pub is_sub_layout: bool,
    pub sub_layout_community_name: Option<String>,
    pub is_mobile: bool,
    pub nodes_are_communities: bool,
    pub label: HashMap<String, String>,
    pub graph_file_path: String,
    pub sub_layouts_file_path: Option<String>,
    pub search: Option<SearchConfig>,
    pub settings: EffectiveSettings,
    pub node_mapping: Option<NodeMapping>,
    pub groups: GroupSection,
    pub legend: Option<String>,
}

/// Representative ("leader") attribution for a cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterRepPrio {
    pub label: String,
    pub prio: u32,
}

/// The resolved configuration: flattened layouts plus the auxiliary indexes
/// every pipeline stage consults, all keyed by layout name.
#[derive(Debug)]
pub struct AtlasConfig {
    /// Parsed semantic config version; gates incremental regeneration.
    pub config_version: Version,
    /// Expected graph snapshot version.
    pub graph_version: i64,
    /// Dev mode: generate sub-layouts locally instead of unpacking them.
    pub is_dev: bool,
    pub modes: Modes,
    pub layouts: Vec<ResolvedLayout>,
    pub clusters: Vec<ClusterConfig>,
    /// (a) communities excluded from a layout: configured clusters that no
    /// group of the layout references.
    pub excluded_communities: HashMap<String, HashSet<String>>,
    /// (b) cluster names an inherited layout's groups introduce relative to
    /// its parent.
    pub folded_cluster_names: HashMap<String, HashSet<String>>,
    /// (c) per-layout maxEdges overrides, keyed by cluster name.
    pub max_edges_overrides: HashMap<String, HashMap<String, usize>>,
    /// (d) layouts exposing an overlay toggle.
    pub overlay_layouts: HashSet<String>,
    /// (e) hidden-cluster membership per layout.
    pub hidden_clusters: HashMap<String, HashSet<String>>,
    /// leader did → cluster attribution.
    pub cluster_representatives: HashMap<String, ClusterRepPrio>,
    /// The document as written, for lossless config snapshot copies.
    raw: serde_json::Value,
    by_name: HashMap<String, usize>,
    cluster_by_name: HashMap<String, usize>,
    cluster_by_community: HashMap<String, usize>,
}

impl AtlasConfig {
    /// Load and resolve a configuration document from disk.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Self::from_value(value, &path.display().to_string())
    }

    /// Resolve a configuration from an already-parsed JSON document.
    pub fn from_value(raw: serde_json::Value, origin: &str) -> ConfigResult<Self> {
        let doc: RawDocument =
            serde_json::from_value(raw.clone()).map_err(|e| ConfigError::Parse {
                path: origin.to_string(),
                message: e.to_string(),
            })?;

        let config_version =
            Version::parse(&doc.settings.config_version).map_err(|_| ConfigError::Version {
                value: doc.settings.config_version.clone(),
            })?;

        let (layouts, folded_cluster_names) = resolve_layouts(&doc);

        let mut excluded_communities: HashMap<String, HashSet<String>> = HashMap::new();
        let mut max_edges_overrides: HashMap<String, HashMap<String, usize>> = HashMap::new();
        let mut overlay_layouts: HashSet<String> = HashSet::new();
        let mut hidden_clusters: HashMap<String, HashSet<String>> = HashMap::new();

        for layout in &layouts {
            let mut included: HashSet<&str> = HashSet::new();
            let mut hidden: HashSet<String> = HashSet::new();
            let mut overrides: HashMap<String, usize> = HashMap::new();

            if let Some(hidden_groups) = &layout.groups.hidden {
                for group in hidden_groups {
                    hidden.insert(group.name.clone());
                    for under in group.underlay.iter().flatten() {
                        hidden.insert(under.clone());
                    }
                }
            }

            for group in layout.groups.all() {
                included.insert(&group.name);
                if let Some(overlay) = &group.overlay {
                    overlay_layouts.insert(layout.name.clone());
                    for name in overlay {
                        included.insert(name);
                    }
                }
                for name in group.underlay.iter().flatten() {
                    included.insert(name);
                }
                if let Some(max) = group.max_edges {
                    overrides.insert(group.name.clone(), max);
                    for name in group.overlay.iter().flatten() {
                        overrides.insert(name.clone(), max);
                    }
                    for name in group.underlay.iter().flatten() {
                        overrides.insert(name.clone(), max);
                    }
                }
            }

            let mut excluded: HashSet<String> = HashSet::new();
            for cluster in &doc.clusters {
                let referenced = included.contains(cluster.name.as_str());
                let own_detail = layout.sub_layout_community_name.as_deref()
                    == Some(cluster.name.as_str());
                if !referenced && !cluster.community.is_empty() && !layout.is_sub_layout && !own_detail
                {
                    excluded.insert(cluster.community.clone());
                }
            }
            debug!(
                layout = %layout.name,
                excluded = excluded.len(),
                hidden = hidden.len(),
                "resolved cluster membership"
            );

            excluded_communities.insert(layout.name.clone(), excluded);
            hidden_clusters.insert(layout.name.clone(), hidden);
            max_edges_overrides.insert(layout.name.clone(), overrides);
        }

        let mut cluster_representatives = HashMap::new();
        for cluster in &doc.clusters {
            if let Some(leader) = &cluster.leader {
                cluster_representatives.insert(
                    leader.clone(),
                    ClusterRepPrio {
                        label: cluster.name.clone(),
                        prio: cluster.prio.unwrap_or(0),
                    },
                );
            }
        }

        let by_name = layouts
            .iter()
            .enumerate()
            .map(|(i, l)| (l.name.clone(), i))
            .collect();
        let cluster_by_name = doc
            .clusters
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        let cluster_by_community = doc
            .clusters
            .iter()
            .enumerate()
            .map(|(i, c)| (c.community.clone(), i))
            .collect();

        Ok(AtlasConfig {
            config_version,
            graph_version: doc.settings.graph_version,
            is_dev: doc.settings.is_dev,
            modes: doc.layout.modes.clone(),
            layouts,
            clusters: doc.clusters,
            excluded_communities,
            folded_cluster_names,
            max_edges_overrides,
            overlay_layouts,
            hidden_clusters,
            cluster_representatives,
            raw,
            by_name,
            cluster_by_name,
            cluster_by_community,
        })
    }

    /// The document as written, for config snapshot copies.
    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    /// Resolve a layout by name.
    pub fn layout(&self, name: &str) -> Option<&ResolvedLayout> {
        self.by_name.get(name).map(|&i| &self.layouts[i])
    }

    /// Resolve a sub-layout by the community it details.
    pub fn sub_layout_by_community(&self, community_name: &str) -> Option<&ResolvedLayout> {
        self.layouts
            .iter()
            .find(|l| l.sub_layout_community_name.as_deref() == Some(community_name))
    }

    /// All layouts exposed by a display mode. Falls back to the default mode
    /// when the moderator mode lists nothing.
    pub fn layouts_by_mode(&self, moderator: bool) -> Vec<&ResolvedLayout> {
        let names = if moderator && !self.modes.moderator.is_empty() {
            &self.modes.moderator
        } else {
            &self.modes.default
        };
        self.layouts
            .iter()
            .filter(|l| names.contains(&l.name))
            .collect()
    }

    /// The first mode layout matching the mobile flag (desktop layouts
    /// double as mobile fallbacks).
    pub fn default_layout(&self, moderator: bool, mobile: bool) -> Option<&ResolvedLayout> {
        self.layouts_by_mode(moderator)
            .into_iter()
            .find(|l| mobile == l.is_mobile || !l.is_mobile)
    }

    /// Look up a cluster definition by display name.
    pub fn cluster_by_name(&self, name: &str) -> Option<&ClusterConfig> {
        self.cluster_by_name.get(name).map(|&i| &self.clusters[i])
    }

    /// Look up a cluster definition by raw community id.
    pub fn cluster_by_community(&self, community: &str) -> Option<&ClusterConfig> {
        self.cluster_by_community
            .get(community)
            .map(|&i| &self.clusters[i])
    }
}

/// Flatten every layout declaration. Inherited layouts copy their parent and
/// override settings field-by-field; a missing parent drops the layout with a
/// warning instead of aborting the run.
fn resolve_layouts(doc: &RawDocument) -> (Vec<ResolvedLayout>, HashMap<String, HashSet<String>>) {
    let defaults = &doc.settings.layout_defaults;
    let mut resolved = Vec::new();
    let mut folded: HashMap<String, HashSet<String>> = HashMap::new();

    for decl in &doc.layout.layouts {
        match decl {
            LayoutDecl::Direct(direct) => {
                resolved.push(resolve_direct(direct, defaults));
                folded.insert(direct.name.clone(), HashSet::new());
            }
            LayoutDecl::Inherited(child) => {
                let Some(parent) = find_direct(doc, &child.from) else {
                    warn!(
                        layout = %child.name,
                        parent = %child.from,
                        "parent layout not found; dropping inherited layout"
                    );
                    continue;
                };

                let settings = child.override_settings.merged_over(&parent.settings);
                let parent_names: HashSet<&str> =
                    parent.groups.all().map(|g| g.name.as_str()).collect();
                let introduced: HashSet<String> = child
                    .groups
                    .all()
                    .map(|g| g.name.clone())
                    .filter(|name| !parent_names.contains(name.as_str()))
                    .collect();
                folded.insert(child.name.clone(), introduced);

                resolved.push(ResolvedLayout {
                    name: child.name.clone(),
                    is_sub_layout: child.is_sub_layout.unwrap_or(parent.is_sub_layout),
                    sub_layout_community_name: parent.sub_layout_community_name.clone(),
                    is_mobile: child.is_mobile.unwrap_or(parent.is_mobile),
                    nodes_are_communities: parent.nodes_are_communities,
                    label: child.label.clone().unwrap_or_else(|| parent.label.clone()),
                    graph_file_path: parent.graph_file_path.clone(),
                    sub_layouts_file_path: parent.sub_layouts_file_path.clone(),
                    search: parent.search.clone(),
                    settings: EffectiveSettings::resolve(&settings, defaults),
                    node_mapping: parent.node_mapping.clone(),
                    groups: child.groups.clone(),
                    legend: parent.legend.clone(),
                });
            }
        }
    }

    (resolved, folded)
}

fn resolve_direct(direct: &DirectLayout, defaults: &super::LayoutSettings) -> ResolvedLayout {
    ResolvedLayout {
        name: direct.name.clone(),
        is_sub_layout: direct.is_sub_layout,
        sub_layout_community_name: direct.sub_layout_community_name.clone(),
        is_mobile: direct.is_mobile,
        nodes_are_communities: direct.nodes_are_communities,
        label: direct.label.clone(),
        graph_file_path: direct.graph_file_path.clone(),
        sub_layouts_file_path: direct.sub_layouts_file_path.clone(),
        search: direct.search.clone(),
        settings: EffectiveSettings::resolve(&direct.settings, defaults),
        node_mapping: direct.node_mapping.clone(),
        groups: direct.groups.clone(),
        legend: direct.legend.clone(),
    }
}

/// Inheritance parents must be direct declarations (one level only).
fn find_direct<'a>(doc: &'a RawDocument, name: &str) -> Option<&'a DirectLayout> {
    doc.layout.layouts.iter().find_map(|decl| match decl {
        LayoutDecl::Direct(d) if d.name == name => Some(d),
        _ => None,
    })
}
