//! Layered export configuration: raw document model and resolution.
//!
//! The configuration document is JSON with global settings, a layout list
//! (direct or inherited declarations), and cluster definitions. Parsing
//! produces the raw model in this module; [`resolve::AtlasConfig`] flattens
//! inheritance and precomputes the per-layout indexes every pipeline stage
//! consults.
//!
//! - **Raw model** (this module): serde types mirroring the document shape
//! - **Resolution** ([`resolve`]): inheritance flattening + auxiliary indexes
//! - **Lookups** ([`lookup`]): cluster identification and color resolution

pub mod lookup;
pub mod resolve;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub use lookup::ClusterIdentity;
pub use resolve::{AtlasConfig, ClusterRepPrio, ResolvedLayout};

/// Fallback node color when no cluster resolves for a community.
pub const FALLBACK_NODE_COLOR: &str = "#aaaaaa";

/// The full configuration document as written on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDocument {
    pub settings: GlobalSettings,
    pub layout: LayoutSection,
    #[serde(default)]
    pub clusters: Vec<ClusterConfig>,
    /// Legend/translation metadata, consumed by the presentation layer.
    /// Carried opaquely so config snapshot copies stay lossless.
    #[serde(default)]
    pub legend: Option<serde_json::Value>,
    #[serde(default)]
    pub optout: Option<serde_json::Value>,
}

/// Global settings block.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSettings {
    pub graph_version: i64,
    #[serde(default)]
    pub is_dev: bool,
    pub config_version: String,
    #[serde(default)]
    pub data_set_time: Option<serde_json::Value>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub layout_defaults: LayoutSettings,
}

/// Layout section: display-mode membership plus the layout declarations.
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutSection {
    pub modes: Modes,
    pub layouts: Vec<LayoutDecl>,
}

/// Which layouts each display mode exposes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Modes {
    #[serde(default)]
    pub default: Vec<String>,
    #[serde(default)]
    pub moderator: Vec<String>,
}

/// A layout declaration: either self-contained or inheriting from a parent.
///
/// Resolved once into [`ResolvedLayout`] before any pipeline stage runs;
/// no stage ever sees an unresolved inheritance reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LayoutDecl {
    Direct(DirectLayout),
    Inherited(InheritedLayout),
}

impl LayoutDecl {
    pub fn name(&self) -> &str {
        match self {
            LayoutDecl::Direct(l) => &l.name,
            LayoutDecl::Inherited(l) => &l.name,
        }
    }
}

/// A layout with its own settings block.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectLayout {
    pub name: String,
    #[serde(default)]
    pub is_sub_layout: bool,
    #[serde(default)]
    pub sub_layout_community_name: Option<String>,
    #[serde(default)]
    pub is_mobile: bool,
    #[serde(default)]
    pub nodes_are_communities: bool,
    #[serde(default)]
    pub label: HashMap<String, String>,
    pub graph_file_path: String,
    #[serde(default)]
    pub sub_layouts_file_path: Option<String>,
    #[serde(default)]
    pub search: Option<SearchConfig>,
    pub settings: LayoutSettings,
    #[serde(default)]
    pub node_mapping: Option<NodeMapping>,
    pub groups: GroupSection,
    #[serde(default)]
    pub legend: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// A layout copying a named parent and overriding settings field-by-field.
/// One level of inheritance only.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InheritedLayout {
    pub name: String,
    pub from: String,
    #[serde(default)]
    pub is_sub_layout: Option<bool>,
    #[serde(default)]
    pub is_mobile: Option<bool>,
    #[serde(default)]
    pub label: Option<HashMap<String, String>>,
    #[serde(rename = "override_settings", default)]
    pub override_settings: LayoutSettings,
    pub groups: GroupSection,
}

/// Per-layout settings. All fields optional; effective values fall back to
/// `settings.layoutDefaults` and then to the compiled-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSettings {
    pub show_labels: Option<bool>,
    pub community_property: Option<String>,
    pub top_size: Option<u32>,
    pub iteration_count: Option<usize>,
    pub globus: Option<bool>,
    pub rotate: Option<bool>,
    pub angle: Option<f64>,
    pub black_hole_gravity: Option<f64>,
    pub barnes_hut_theta: Option<f64>,
    pub max_historic_weight_sum: Option<f64>,
    pub min_size: Option<f64>,
    pub max_size: Option<f64>,
    pub top_non_removable_edges: Option<usize>,
    pub max_edges: Option<usize>,
    pub colors: Option<Vec<String>>,
    pub hidden_cluster_color: Option<String>,
}

impl LayoutSettings {
    /// Field-by-field merge: `self` wins, `parent` fills the gaps.
    pub fn merged_over(&self, parent: &LayoutSettings) -> LayoutSettings {
        LayoutSettings {
            show_labels: self.show_labels.or(parent.show_labels),
            community_property: self
                .community_property
                .clone()
                .or_else(|| parent.community_property.clone()),
            top_size: self.top_size.or(parent.top_size),
            iteration_count: self.iteration_count.or(parent.iteration_count),
            globus: self.globus.or(parent.globus),
            rotate: self.rotate.or(parent.rotate),
            angle: self.angle.or(parent.angle),
            black_hole_gravity: self.black_hole_gravity.or(parent.black_hole_gravity),
            barnes_hut_theta: self.barnes_hut_theta.or(parent.barnes_hut_theta),
            max_historic_weight_sum: self
                .max_historic_weight_sum
                .or(parent.max_historic_weight_sum),
            min_size: self.min_size.or(parent.min_size),
            max_size: self.max_size.or(parent.max_size),
            top_non_removable_edges: self
                .top_non_removable_edges
                .or(parent.top_non_removable_edges),
            max_edges: self.max_edges.or(parent.max_edges),
            colors: self.colors.clone().or_else(|| parent.colors.clone()),
            hidden_cluster_color: self
                .hidden_cluster_color
                .clone()
                .or_else(|| parent.hidden_cluster_color.clone()),
        }
    }
}

/// Fully-resolved settings for one layout, defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveSettings {
    pub show_labels: bool,
    pub community_property: String,
    pub top_size: u32,
    pub iteration_count: usize,
    pub globus: bool,
    pub rotate: bool,
    pub angle: f64,
    pub black_hole_gravity: f64,
    pub barnes_hut_theta: f64,
    pub max_historic_weight_sum: f64,
    pub min_size: f64,
    pub max_size: f64,
    pub top_non_removable_edges: usize,
    pub max_edges: usize,
    pub colors: Vec<String>,
    pub hidden_cluster_color: String,
}

/// Compiled-in defaults, applied after the layout and the global
/// `layoutDefaults` block have both had their say.
pub const DEFAULT_COMMUNITY_PROPERTY: &str = "community";
pub const DEFAULT_ITERATION_COUNT: usize = 600;
pub const DEFAULT_BARNES_HUT_THETA: f64 = 1.0;
pub const DEFAULT_MAX_HISTORIC_WEIGHT_SUM: f64 = 10_000_000.0;
pub const DEFAULT_MIN_SIZE: f64 = 1.5;
pub const DEFAULT_MAX_SIZE: f64 = 100.0;
pub const DEFAULT_TOP_NON_REMOVABLE_EDGES: usize = 3;
pub const DEFAULT_MAX_EDGES: usize = 10;
pub const DEFAULT_HIDDEN_CLUSTER_COLOR: &str = "#f5f5f5";

/// Sky Blue palette used when a layout configures no colors of its own.
pub const DEFAULT_COLORS: [&str; 7] = [
    "#009ACD", // DeepSkyBlue3
    "#1E90FF", // DodgerBlue
    "#00BFFF", // DeepSkyBlue
    "#7EC0EE", // SkyBlue2
    "#55eeFf", // LightSkyBlue1
    "#5B9BD5", // CornflowerBlue
    "#4A708B", // SkyBlue4
];

impl EffectiveSettings {
    /// Resolve a (possibly partial) settings block against the global
    /// defaults block and the compiled-in defaults.
    pub fn resolve(settings: &LayoutSettings, defaults: &LayoutSettings) -> Self {
        let s = settings.merged_over(defaults);
        EffectiveSettings {
            show_labels: s.show_labels.unwrap_or(true),
            community_property: s
                .community_property
                .unwrap_or_else(|| DEFAULT_COMMUNITY_PROPERTY.to_string()),
            top_size: s.top_size.unwrap_or(100),
            iteration_count: s.iteration_count.unwrap_or(DEFAULT_ITERATION_COUNT),
            globus: s.globus.unwrap_or(false),
            rotate: s.rotate.unwrap_or(false),
            angle: s.angle.unwrap_or(0.0),
            black_hole_gravity: s.black_hole_gravity.unwrap_or(0.0),
            barnes_hut_theta: s.barnes_hut_theta.unwrap_or(DEFAULT_BARNES_HUT_THETA),
            max_historic_weight_sum: s
                .max_historic_weight_sum
                .unwrap_or(DEFAULT_MAX_HISTORIC_WEIGHT_SUM),
            min_size: s.min_size.unwrap_or(DEFAULT_MIN_SIZE),
            max_size: s.max_size.unwrap_or(DEFAULT_MAX_SIZE),
            top_non_removable_edges: s
                .top_non_removable_edges
                .unwrap_or(DEFAULT_TOP_NON_REMOVABLE_EDGES),
            max_edges: s.max_edges.unwrap_or(DEFAULT_MAX_EDGES),
            colors: s
                .colors
                .unwrap_or_else(|| DEFAULT_COLORS.iter().map(|c| c.to_string()).collect()),
            hidden_cluster_color: s
                .hidden_cluster_color
                .unwrap_or_else(|| DEFAULT_HIDDEN_CLUSTER_COLOR.to_string()),
        }
    }
}

/// Cluster group inside a layout: a main visual cluster with optional
/// overlay (absorbed sub-clusters) and underlay (parent super-cluster)
/// memberships.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterGroup {
    pub name: String,
    #[serde(rename = "maxEdges", default)]
    pub max_edges: Option<usize>,
    #[serde(rename = "dropNodes", default)]
    pub drop_nodes: Option<bool>,
    #[serde(rename = "hide-label", default)]
    pub hide_label: bool,
    #[serde(rename = "hide-overlay-labels", default)]
    pub hide_overlay_labels: Option<bool>,
    #[serde(rename = "hide-underlay-labels", default)]
    pub hide_underlay_labels: Option<bool>,
    #[serde(default)]
    pub overlay: Option<Vec<String>>,
    #[serde(default)]
    pub underlay: Option<Vec<String>>,
}

/// Group membership for a layout: visible main groups plus hidden groups.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupSection {
    pub main: Vec<ClusterGroup>,
    #[serde(default)]
    pub hidden: Option<Vec<ClusterGroup>>,
}

impl GroupSection {
    /// Iterate main and hidden groups in declaration order.
    pub fn all(&self) -> impl Iterator<Item = &ClusterGroup> {
        self.main
            .iter()
            .chain(self.hidden.iter().flat_map(|h| h.iter()))
    }
}

/// A cluster definition: community → display name/color/label/leader.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    pub community: String,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub label: Option<HashMap<String, String>>,
    #[serde(default)]
    pub leader: Option<String>,
    #[serde(default)]
    pub hide: bool,
    #[serde(rename = "hide-label", default)]
    pub hide_label: bool,
    #[serde(rename = "type", default)]
    pub cluster_type: Option<String>,
    #[serde(default)]
    pub prio: Option<u32>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub legend: Option<serde_json::Value>,
}

/// Search index export configuration for a layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchConfig {
    #[serde(default)]
    pub search_src_file_name: Option<String>,
    pub out_dir: String,
    #[serde(default)]
    pub prefixes_file: Option<String>,
    #[serde(default)]
    pub communities_file: Option<String>,
    #[serde(default)]
    pub search_file_name_prefix: Option<String>,
    #[serde(default)]
    pub search_file_name_delimiter: Option<String>,
    #[serde(default)]
    pub search_file_name_extension: Option<String>,
}

/// How node identity/weight/label map from input attributes.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeMapping {
    #[serde(default)]
    pub id: Option<MappingRule>,
    #[serde(default)]
    pub weight: Option<MappingRule>,
    #[serde(default)]
    pub label: Option<MappingRule>,
    #[serde(default)]
    pub score: Option<MappingRule>,
}

/// One mapping rule: a kind tag plus an optional source property.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRule {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub node_property: Option<String>,
}

/// Mapping kind for weights taken directly from a node property.
pub const MAPPING_FROM_NODE_PROPERTY: &str = "fromNodeProperty";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_and_inherited_declarations_parse() {
        let json = r#"[
            {
                "name": "atlas",
                "graphFilePath": "graph.json",
                "settings": {"maxSize": 80},
                "groups": {"main": [{"name": "web"}]}
            },
            {
                "name": "atlas-mobile",
                "from": "atlas",
                "override_settings": {"maxSize": 50},
                "groups": {"main": [{"name": "web"}]}
            }
        ]"#;
        let decls: Vec<LayoutDecl> = serde_json::from_str(json).unwrap();
        assert!(matches!(decls[0], LayoutDecl::Direct(_)));
        assert!(matches!(decls[1], LayoutDecl::Inherited(_)));
        assert_eq!(decls[1].name(), "atlas-mobile");
    }

    #[test]
    fn settings_merge_prefers_child() {
        let parent = LayoutSettings {
            max_size: Some(80.0),
            min_size: Some(2.0),
            ..Default::default()
        };
        let child = LayoutSettings {
            max_size: Some(50.0),
            ..Default::default()
        };
        let merged = child.merged_over(&parent);
        assert_eq!(merged.max_size, Some(50.0));
        assert_eq!(merged.min_size, Some(2.0));
    }

    #[test]
    fn effective_settings_fall_back_to_compiled_defaults() {
        let eff = EffectiveSettings::resolve(&LayoutSettings::default(), &LayoutSettings::default());
        assert_eq!(eff.iteration_count, DEFAULT_ITERATION_COUNT);
        assert_eq!(eff.max_edges, DEFAULT_MAX_EDGES);
        assert_eq!(eff.top_non_removable_edges, DEFAULT_TOP_NON_REMOVABLE_EDGES);
        assert_eq!(eff.colors.len(), 7);
    }

    #[test]
    fn layout_defaults_sit_between_layout_and_compiled_defaults() {
        let defaults = LayoutSettings {
            iteration_count: Some(300),
            ..Default::default()
        };
        let layout = LayoutSettings {
            max_edges: Some(4),
            ..Default::default()
        };
        let eff = EffectiveSettings::resolve(&layout, &defaults);
        assert_eq!(eff.iteration_count, 300);
        assert_eq!(eff.max_edges, 4);
        assert_eq!(eff.min_size, DEFAULT_MIN_SIZE);
    }

    #[test]
    fn hyphenated_group_flags_parse() {
        let json = r#"{
            "name": "web",
            "maxEdges": 20,
            "hide-label": true,
            "overlay": ["web-art"],
            "underlay": ["everything"]
        }"#;
        let group: ClusterGroup = serde_json::from_str(json).unwrap();
        assert!(group.hide_label);
        assert_eq!(group.max_edges, Some(20));
        assert_eq!(group.overlay.as_deref(), Some(&["web-art".to_string()][..]));
    }
}
