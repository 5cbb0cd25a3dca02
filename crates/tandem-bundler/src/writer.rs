//! Bundle output writing.
//!
//! Every file is written to a temporary sibling and renamed into place, so a
//! browser reloading mid-write never reads a torn bundle. Output names are
//! validated against the output directory before anything touches disk.

use std::io::Write;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use rolldown::BundleOutput;
use rolldown_common::Output;

use crate::{Error, Result};

/// Write every chunk and asset of `output` under `dir`.
///
/// Returns the written paths in output order.
pub fn write_bundle_to(output: &BundleOutput, dir: &Path) -> Result<Vec<PathBuf>> {
    let dir = dir.clean();

    let mut operations = Vec::with_capacity(output.assets.len());
    for item in &output.assets {
        match item {
            Output::Chunk(chunk) => {
                let target = validate_output_path(&dir, chunk.filename.as_str())?;
                operations.push((target, chunk.code.as_bytes()));
            }
            Output::Asset(asset) => {
                let target = validate_output_path(&dir, asset.filename.as_str())?;
                operations.push((target, asset.source.as_bytes()));
            }
        }
    }

    let mut written = Vec::with_capacity(operations.len());
    for (target, content) in operations {
        write_atomic(&target, content)?;
        written.push(target);
    }
    Ok(written)
}

/// Atomically replace `path` with `content`, creating parent directories.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to create directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| {
        Error::WriteFailure(format!(
            "Failed to create temporary file in '{}': {}",
            parent.display(),
            e
        ))
    })?;

    temp.write_all(content).map_err(|e| {
        Error::WriteFailure(format!("Failed to write '{}': {}", path.display(), e))
    })?;

    temp.persist(path).map_err(|e| {
        Error::WriteFailure(format!("Failed to rename into '{}': {}", path.display(), e.error))
    })?;

    Ok(())
}

/// Resolve `filename` under `base_dir`, rejecting names that escape it.
fn validate_output_path(base_dir: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        return Err(Error::InvalidOutputPath(
            "Filename contains null byte".to_string(),
        ));
    }

    let full_path = base_dir.join(Path::new(filename).clean()).clean();

    if !full_path.starts_with(base_dir) {
        return Err(Error::InvalidOutputPath(format!(
            "Path '{}' escapes output directory '{}'",
            filename,
            base_dir.display()
        )));
    }

    Ok(full_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_output_path_nested() {
        let base = Path::new("/tmp/output");
        assert_eq!(
            validate_output_path(base, "chunks/a.js").unwrap(),
            Path::new("/tmp/output/chunks/a.js")
        );
    }

    #[test]
    fn test_validate_output_path_traversal() {
        let base = Path::new("/tmp/output");
        assert!(validate_output_path(base, "../../etc/passwd").is_err());
        assert!(validate_output_path(base, "a\0b").is_err());
    }

    #[test]
    fn test_write_atomic_replaces_contents() {
        let temp = tempfile::TempDir::new().unwrap();
        let target = temp.path().join("public/player.js");

        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"second");
        let leftovers = std::fs::read_dir(temp.path().join("public")).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
