//! Packaged archive extraction for search indexes and sub-layout snapshots.

use std::path::Path;

use flate2::read::GzDecoder;
use tracing::info;

use super::artifact::ExportResult;
use crate::error::ExportError;

/// Extract a gzip-compressed tar archive into `dest`, emptying any previous
/// extraction first.
pub fn extract_archive(archive: &Path, dest: &Path) -> ExportResult<()> {
    let archive_err = |message: String| ExportError::Archive {
        path: archive.display().to_string(),
        message,
    };

    if dest.exists() {
        info!(dest = %dest.display(), "emptying extraction directory");
        std::fs::remove_dir_all(dest).map_err(|e| archive_err(e.to_string()))?;
    }
    std::fs::create_dir_all(dest).map_err(|e| archive_err(e.to_string()))?;

    info!(archive = %archive.display(), dest = %dest.display(), "extracting archive");
    let file = std::fs::File::open(archive).map_err(|e| archive_err(e.to_string()))?;
    let mut tarball = tar::Archive::new(GzDecoder::new(file));
    tarball
        .unpack(dest)
        .map_err(|e| archive_err(e.to_string()))?;
    info!("done extracting archive");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn pack(dir: &Path, entries: &[(&str, &str)]) -> std::path::PathBuf {
        let archive_path = dir.join("package.tar.gz");
        let file = std::fs::File::create(&archive_path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
        archive_path
    }

    #[test]
    fn extraction_unpacks_entries_and_empties_previous_content() {
        let dir = tempfile::TempDir::new().unwrap();
        let archive = pack(dir.path(), &[("a_layout.json", "{}"), ("b_layout.json", "{}")]);

        let dest = dir.path().join("out");
        std::fs::create_dir_all(&dest).unwrap();
        std::fs::write(dest.join("stale.json"), "old").unwrap();

        extract_archive(&archive, &dest).unwrap();
        assert!(dest.join("a_layout.json").exists());
        assert!(dest.join("b_layout.json").exists());
        assert!(!dest.join("stale.json").exists());
    }

    #[test]
    fn missing_archive_reports_its_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = extract_archive(&dir.path().join("missing.tar.gz"), &dir.path().join("out"))
            .unwrap_err();
        assert!(format!("{err}").contains("missing.tar.gz"));
    }
}
