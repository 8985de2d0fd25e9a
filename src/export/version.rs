//! Version markers: persisted per-layout records gating regeneration.

use std::path::Path;

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::artifact::{ExportResult, write_atomic};
use crate::error::ExportError;

/// The configuration/graph version an artifact was generated against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionMarker {
    pub config_version: String,
    pub graph_version: i64,
}

impl VersionMarker {
    pub fn new(config_version: &Version, graph_version: i64) -> Self {
        Self {
            config_version: config_version.to_string(),
            graph_version,
        }
    }

    /// Parse the recorded config version, if it is a valid semver.
    pub fn parsed_config_version(&self) -> Option<Version> {
        Version::parse(&self.config_version).ok()
    }
}

/// Read a marker file. Missing or corrupt markers mean "no prior version"
/// and force regeneration; they are never fatal.
pub fn read_marker(path: &Path) -> Option<VersionMarker> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no readable version marker");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(marker) => Some(marker),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "corrupt version marker; ignoring");
            None
        }
    }
}

/// Persist a marker. Called only after the artifact it describes has been
/// committed.
pub fn write_marker(path: &Path, marker: &VersionMarker) -> ExportResult<()> {
    let bytes = serde_json::to_vec(marker).map_err(|e| ExportError::Serialize {
        message: e.to_string(),
    })?;
    write_atomic(path, &bytes)
}

/// Outcome of comparing the current configuration against a stored marker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// No regeneration needed. `patch_drift` notes a patch-level config bump
    /// that refreshes the marker without regenerating.
    Skip { patch_drift: bool },
    Regenerate,
}

/// Decide whether an artifact needs regeneration.
///
/// Skip requires: the artifact exists, the marker parses, the stored graph
/// version is at least the current one, and the stored major and minor config
/// versions are at least the current ones. Patch-level differences never
/// force regeneration.
pub fn decide(
    current: &Version,
    current_graph: i64,
    marker: Option<&VersionMarker>,
    artifact_exists: bool,
) -> Decision {
    let Some(marker) = marker else {
        return Decision::Regenerate;
    };
    let Some(stored) = marker.parsed_config_version() else {
        return Decision::Regenerate;
    };
    if artifact_exists
        && current_graph <= marker.graph_version
        && current.major <= stored.major
        && current.minor <= stored.minor
    {
        Decision::Skip {
            patch_drift: current.patch > stored.patch,
        }
    } else {
        Decision::Regenerate
    }
}
