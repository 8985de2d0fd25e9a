//! Cluster identification: resolving a raw community to its display cluster
//! within a layout context.
//!
//! Precedence climbs overlay → main → superCluster: a community absorbed by a
//! group's overlay resolves to that group's cluster, a community that names a
//! group directly resolves to itself, and a community only referenced through
//! an underlay resolves to its super-cluster.

use tracing::debug;

use super::{AtlasConfig, ClusterConfig, ClusterGroup, FALLBACK_NODE_COLOR, ResolvedLayout};

/// The clusters a community resolves to within one layout.
#[derive(Debug, Default)]
pub struct ClusterIdentity<'a> {
    /// The community's own cluster, when it is absorbed as an overlay detail.
    pub detailed: Option<&'a ClusterConfig>,
    /// The display cluster the community folds into.
    pub main: Option<&'a ClusterConfig>,
    /// The super-cluster the main cluster nests under, if any.
    pub super_cluster: Option<&'a ClusterConfig>,
    /// Communities of the main cluster's overlay children, when the community
    /// resolved through an overlay.
    pub main_cluster_children: Option<Vec<String>>,
}

impl AtlasConfig {
    /// Resolve the display clusters for a raw community id in a layout.
    pub fn identify_clusters(&self, community: &str, layout_name: &str) -> ClusterIdentity<'_> {
        let Some(layout) = self.layout(layout_name) else {
            return ClusterIdentity::default();
        };

        let cluster = self.cluster_by_community(community);
        let cluster_name = cluster.map(|c| c.name.as_str());

        let underlay_group = find_group(layout, |g| contains(&g.underlay, cluster_name));
        let overlay_main = layout
            .groups
            .main
            .iter()
            .find(|g| contains(&g.overlay, cluster_name));
        let overlay_hidden = layout
            .groups
            .hidden
            .as_deref()
            .and_then(|groups| groups.iter().find(|g| contains(&g.overlay, cluster_name)));
        let main_by_overlay = overlay_main.or(overlay_hidden).map(|g| g.name.as_str());

        let named_group = find_group(layout, |g| Some(g.name.as_str()) == cluster_name);
        let super_only = underlay_group.and_then(|g| g.underlay.as_deref());

        let mut main = match main_by_overlay {
            Some(name) => self.cluster_by_name(name),
            None if super_only.is_some() => None,
            None => named_group.and_then(|g| self.cluster_by_name(&g.name)),
        };

        let super_by_main = main.and_then(|m| {
            find_group(layout, |g| g.underlay.is_some() && g.name == m.name)
                .and_then(|g| g.underlay.as_deref())
        });
        let super_cluster = match super_only {
            Some(names) => names.first().and_then(|n| self.cluster_by_name(n)),
            None => super_by_main
                .and_then(|names| names.first())
                .and_then(|n| self.cluster_by_name(n)),
        };

        let detailed = if main_by_overlay.is_some() { cluster } else { None };

        let mut main_cluster_children = None;
        if let (Some(m), Some(group)) = (main, overlay_main.or(overlay_hidden)) {
            if m.name == group.name {
                main_cluster_children = group.overlay.as_ref().map(|names| {
                    names
                        .iter()
                        .filter_map(|n| self.cluster_by_name(n))
                        .map(|c| c.community.clone())
                        .collect()
                });
            }
        }

        // Sub-layouts named `<parent>_<community>` may carry no main cluster
        // of their own; the community segment of the name resolves it then.
        // Kept as an explicit special case for that naming convention.
        if main.is_none() && layout.is_sub_layout {
            if let Some((_, community_part)) = layout.name.split_once('_') {
                debug!(
                    layout = %layout.name,
                    community = community_part,
                    "resolving main cluster from sub-layout name"
                );
                main = self.cluster_by_community(community_part);
            }
        }

        ClusterIdentity {
            detailed,
            main,
            super_cluster,
            main_cluster_children,
        }
    }

    /// Display color for a community in a layout, climbing the
    /// detailed → main → super-cluster chain.
    pub fn node_color(
        &self,
        community: &str,
        layout_name: &str,
        use_subcluster_overlay: bool,
    ) -> String {
        let identity = self.identify_clusters(community, layout_name);
        if use_subcluster_overlay {
            if let Some(detailed) = identity.detailed {
                return detailed.color.clone();
            }
        }
        identity
            .main
            .map(|c| c.color.clone())
            .or_else(|| identity.super_cluster.map(|c| c.color.clone()))
            .unwrap_or_else(|| FALLBACK_NODE_COLOR.to_string())
    }
}

/// First main group matching, then first hidden group matching.
fn find_group<'a>(
    layout: &'a ResolvedLayout,
    pred: impl Fn(&ClusterGroup) -> bool,
) -> Option<&'a ClusterGroup> {
    layout
        .groups
        .main
        .iter()
        .find(|g| pred(g))
        .or_else(|| {
            layout
                .groups
                .hidden
                .as_deref()
                .and_then(|groups| groups.iter().find(|g| pred(g)))
        })
}

fn contains(list: &Option<Vec<String>>, name: Option<&str>) -> bool {
    match (list, name) {
        (Some(list), Some(name)) => list.iter().any(|n| n == name),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::super::AtlasConfig;

    fn config() -> AtlasConfig {
        let doc = serde_json::json!({
            "settings": {
                "graphVersion": 1,
                "configVersion": "1.0.0"
            },
            "layout": {
                "modes": {"default": ["atlas", "nebula_7"]},
                "layouts": [
                    {
                        "name": "atlas",
                        "graphFilePath": "graph.json",
                        "settings": {},
                        "groups": {
                            "main": [
                                {"name": "web", "overlay": ["web-art"]},
                                {"name": "infra", "underlay": ["everything"]}
                            ],
                            "hidden": [
                                {"name": "spam"}
                            ]
                        }
                    },
                    {
                        "name": "nebula_7",
                        "isSubLayout": true,
                        "graphFilePath": "nebula.json",
                        "settings": {},
                        "groups": {"main": []}
                    }
                ]
            },
            "clusters": [
                {"community": "1", "name": "web", "color": "#009ACD"},
                {"community": "2", "name": "web-art", "color": "#1E90FF"},
                {"community": "3", "name": "infra", "color": "#00BFFF"},
                {"community": "4", "name": "spam", "color": "#4A708B"},
                {"community": "7", "name": "nebula", "color": "#5B9BD5"},
                {"community": "9", "name": "unplaced", "color": "#7EC0EE"},
                {"community": "", "name": "everything", "color": "#ffffff"}
            ]
        });
        AtlasConfig::from_value(doc, "test").unwrap()
    }

    #[test]
    fn overlay_community_resolves_to_absorbing_cluster() {
        let config = config();
        let identity = config.identify_clusters("2", "atlas");
        assert_eq!(identity.main.unwrap().name, "web");
        assert_eq!(identity.detailed.unwrap().name, "web-art");
        // Children carry the overlay communities.
        assert_eq!(identity.main_cluster_children, Some(vec!["2".to_string()]));
    }

    #[test]
    fn named_community_resolves_to_itself() {
        let config = config();
        let identity = config.identify_clusters("1", "atlas");
        assert_eq!(identity.main.unwrap().name, "web");
        assert!(identity.detailed.is_none());
    }

    #[test]
    fn underlay_resolves_super_cluster() {
        let config = config();
        let identity = config.identify_clusters("3", "atlas");
        assert_eq!(identity.main.unwrap().name, "infra");
        assert_eq!(identity.super_cluster.unwrap().name, "everything");
    }

    #[test]
    fn hidden_group_community_still_resolves() {
        let config = config();
        let identity = config.identify_clusters("4", "atlas");
        assert_eq!(identity.main.unwrap().name, "spam");
    }

    #[test]
    fn unplaced_community_resolves_to_nothing() {
        let config = config();
        let identity = config.identify_clusters("9", "atlas");
        assert!(identity.main.is_none());
        assert!(identity.super_cluster.is_none());
    }

    #[test]
    fn sub_layout_name_fallback_resolves_cluster() {
        let config = config();
        let identity = config.identify_clusters("9", "nebula_7");
        assert_eq!(identity.main.unwrap().name, "nebula");
    }

    #[test]
    fn node_color_prefers_detailed_with_overlay_toggle() {
        let config = config();
        assert_eq!(config.node_color("2", "atlas", true), "#1E90FF");
        assert_eq!(config.node_color("2", "atlas", false), "#009ACD");
        assert_eq!(config.node_color("9", "atlas", false), "#aaaaaa");
    }
}
