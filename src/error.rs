//! Rich diagnostic error types for the skyatlas exporter.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so operators know exactly
//! what went wrong in a batch run and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the exporter.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum AtlasError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] crate::paths::PathError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read configuration: {path}")]
    #[diagnostic(
        code(skyatlas::config::read),
        help("Ensure the configuration file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {path}")]
    #[diagnostic(
        code(skyatlas::config::parse),
        help(
            "Check the JSON syntax of the configuration document. \
             Every layout must either declare its own `settings` block or \
             name a parent via `from` + `override_settings`."
        )
    )]
    Parse { path: String, message: String },

    #[error("could not parse config version \"{value}\"")]
    #[diagnostic(
        code(skyatlas::config::version),
        help(
            "`settings.configVersion` must be a semantic version such as \"1.4.2\". \
             Without a parseable version no layout can be compared against its \
             version marker, so the whole run is aborted."
        )
    )]
    Version { value: String },

    #[error("layout \"{name}\" not found")]
    #[diagnostic(
        code(skyatlas::config::layout_not_found),
        help("List resolved layouts with `skyatlas layouts`.")
    )]
    LayoutNotFound { name: String },

    #[error("node mapping references unknown node property \"{property}\"")]
    #[diagnostic(
        code(skyatlas::config::node_property),
        help(
            "Direct node sizing reads a numeric property from the input nodes. \
             Only `size` is carried by the snapshot format."
        )
    )]
    UnknownNodeProperty { property: String },
}

// ---------------------------------------------------------------------------
// Snapshot errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SnapshotError {
    #[error("failed to read graph snapshot: {path}")]
    #[diagnostic(
        code(skyatlas::snapshot::read),
        help("Check that the snapshot file exists under the input directory.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse graph snapshot: {path}")]
    #[diagnostic(
        code(skyatlas::snapshot::parse),
        help(
            "The snapshot must be JSON of shape \
             {{graphVersion?, timestamp?, nodes: [...], rels: [...]}}."
        )
    )]
    Parse { path: String, message: String },

    #[error(
        "graph version mismatch in {path}: configuration expects {expected}, snapshot declares {found}"
    )]
    #[diagnostic(
        code(skyatlas::snapshot::version_mismatch),
        help(
            "Regenerate the snapshot against the current graph version, or bump \
             `settings.graphVersion` in the configuration. Layouts referencing a \
             mismatched snapshot are refused; legacy snapshots without a declared \
             version are processed under legacy rules."
        )
    )]
    VersionMismatch {
        path: String,
        expected: i64,
        found: i64,
    },
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExportError {
    #[error("I/O error writing {path}")]
    #[diagnostic(
        code(skyatlas::export::io),
        help(
            "A filesystem operation failed while committing an artifact. \
             Check permissions and free space on the output directory. \
             The version marker for this layout was NOT updated."
        )
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize layout artifact: {message}")]
    #[diagnostic(code(skyatlas::export::serialize))]
    Serialize { message: String },

    #[error("failed to extract packaged archive {path}: {message}")]
    #[diagnostic(
        code(skyatlas::export::archive),
        help("The packaged file must be a gzip-compressed tar archive.")
    )]
    Archive { path: String, message: String },

    #[error("{failed} of {total} layouts failed to export")]
    #[diagnostic(
        code(skyatlas::export::partial_failure),
        help(
            "Each failed layout is logged above with its own diagnostic. \
             Artifacts committed before the failure are intact."
        )
    )]
    PartialFailure { failed: usize, total: usize },
}

/// Convenience alias for functions returning skyatlas results.
pub type AtlasResult<T> = std::result::Result<T, AtlasError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_atlas_error() {
        let err = ConfigError::Version {
            value: "not-a-version".into(),
        };
        let atlas: AtlasError = err.into();
        assert!(matches!(atlas, AtlasError::Config(ConfigError::Version { .. })));
    }

    #[test]
    fn snapshot_error_converts_to_atlas_error() {
        let err = SnapshotError::VersionMismatch {
            path: "graph.json".into(),
            expected: 3,
            found: 2,
        };
        let atlas: AtlasError = err.into();
        assert!(matches!(
            atlas,
            AtlasError::Snapshot(SnapshotError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = SnapshotError::VersionMismatch {
            path: "graph.json".into(),
            expected: 3,
            found: 2,
        };
        let msg = format!("{err}");
        assert!(msg.contains("graph.json"));
        assert!(msg.contains('3'));
        assert!(msg.contains('2'));
    }
}
