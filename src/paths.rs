//! Output directory layout for exported artifacts and version markers.
//!
//! ```text
//! out/
//!   layouts/              {name}_layout.json
//!   layouts/sub_layouts/  sub-layout artifacts
//!   versions/             {name}_layout_version.json, {name}_search_version.json,
//!                         {configVersion}_config.json
//!   versions/sub_layouts/ sub-layout markers
//!   search/               extracted search indexes, one directory per layout
//! ```

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Errors from output path handling.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(skyatlas::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Resolved output directories for one export run.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub out_dir: PathBuf,
    pub layouts_dir: PathBuf,
    pub sub_layouts_dir: PathBuf,
    pub versions_dir: PathBuf,
    pub sub_versions_dir: PathBuf,
    pub search_dir: PathBuf,
}

impl OutputPaths {
    pub fn new(out_dir: &Path) -> Self {
        let layouts_dir = out_dir.join("layouts");
        let versions_dir = out_dir.join("versions");
        Self {
            out_dir: out_dir.to_path_buf(),
            sub_layouts_dir: layouts_dir.join("sub_layouts"),
            sub_versions_dir: versions_dir.join("sub_layouts"),
            search_dir: out_dir.join("search"),
            layouts_dir,
            versions_dir,
        }
    }

    /// Create all output directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [
            &self.out_dir,
            &self.layouts_dir,
            &self.sub_layouts_dir,
            &self.versions_dir,
            &self.sub_versions_dir,
            &self.search_dir,
        ] {
            std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    fn layout_dir(&self, is_sub_layout: bool) -> &Path {
        if is_sub_layout {
            &self.sub_layouts_dir
        } else {
            &self.layouts_dir
        }
    }

    fn version_dir(&self, is_sub_layout: bool) -> &Path {
        if is_sub_layout {
            &self.sub_versions_dir
        } else {
            &self.versions_dir
        }
    }

    /// Path of a layout's exported artifact.
    pub fn layout_artifact(&self, name: &str, is_sub_layout: bool) -> PathBuf {
        self.layout_dir(is_sub_layout)
            .join(format!("{name}_layout.json"))
    }

    /// Path of a layout's version marker.
    pub fn layout_marker(&self, name: &str, is_sub_layout: bool) -> PathBuf {
        self.version_dir(is_sub_layout)
            .join(format!("{name}_layout_version.json"))
    }

    /// Path of a layout's search-index version marker.
    pub fn search_marker(&self, name: &str, is_sub_layout: bool) -> PathBuf {
        self.version_dir(is_sub_layout)
            .join(format!("{name}_search_version.json"))
    }

    /// Path of the configuration snapshot copy for a resolved version.
    pub fn config_snapshot(&self, config_version: &semver::Version) -> PathBuf {
        self.versions_dir
            .join(format!("{config_version}_config.json"))
    }

    /// Extraction directory for a layout's search index.
    pub fn search_out(&self, out_dir_name: &str) -> PathBuf {
        self.search_dir.join(out_dir_name)
    }
}
