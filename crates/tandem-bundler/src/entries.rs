//! Entry set for a client bundle: the role entry plus every sibling sharing
//! its extension, so dynamic imports between siblings resolve to real chunks.

use std::fs;
use std::path::{Path, PathBuf};

use rolldown::InputItem;

use crate::{Error, Result};

/// One named bundle input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Expand `<entry dir>/*<entry ext>`.
///
/// The role entry comes first and is named `output_stem`; siblings follow in
/// file name order and are named by their own stem. A sibling whose stem
/// collides with `output_stem` is skipped.
pub fn sibling_entries(entry: &Path, output_stem: &str) -> Result<Vec<BundleEntry>> {
    if !entry.is_file() {
        return Err(Error::EntryNotFound(entry.to_path_buf()));
    }

    let dir = entry.parent().unwrap_or_else(|| Path::new("."));
    let ext = entry.extension();

    let mut siblings: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| Error::IoError {
            message: format!("Failed to list {}", dir.display()),
            source: e,
        })?
        .filter_map(|dir_entry| dir_entry.ok().map(|d| d.path()))
        .filter(|path| path.is_file() && path.extension() == ext && path != entry)
        .collect();
    siblings.sort();

    let mut entries = vec![BundleEntry {
        name: output_stem.to_string(),
        path: entry.to_path_buf(),
    }];

    for path in siblings {
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        if stem == output_stem {
            tracing::warn!(
                "skipping {}: its name collides with the bundle {}",
                path.display(),
                output_stem
            );
            continue;
        }
        entries.push(BundleEntry { name: stem, path });
    }

    Ok(entries)
}

/// Convert entries to Rolldown inputs.
pub fn to_input_items(entries: &[BundleEntry]) -> Vec<InputItem> {
    entries
        .iter()
        .map(|entry| InputItem {
            name: Some(entry.name.clone()),
            import: entry.path.to_string_lossy().into_owned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_siblings_with_same_extension() {
        let temp = TempDir::new().unwrap();
        let clients = temp.path().join("clients");
        fs::create_dir_all(&clients).unwrap();
        for name in ["player.js", "thing.js", "notes.ts", "style.css"] {
            fs::write(clients.join(name), "").unwrap();
        }

        let entries = sibling_entries(&clients.join("player.js"), "player").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["player", "thing"]);
    }

    #[test]
    fn test_index_entry_named_after_role() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("clients/player");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("index.ts"), "").unwrap();
        fs::write(dir.join("helpers.ts"), "").unwrap();

        let entries = sibling_entries(&dir.join("index.ts"), "player").unwrap();
        assert_eq!(entries[0].name, "player");
        assert_eq!(entries[0].path, dir.join("index.ts"));
        assert_eq!(entries[1].name, "helpers");
    }

    #[test]
    fn test_missing_entry() {
        let err = sibling_entries(Path::new("/nope/player.js"), "player").unwrap_err();
        assert!(matches!(err, Error::EntryNotFound(_)));
    }
}
