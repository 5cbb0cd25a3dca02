//! Entry point discovery for roles.

use std::path::{Path, PathBuf};

use tandem_compiler::RECOGNIZED_EXTENSIONS;

use crate::error::BuildError;

/// Role whose files live directly under the root instead of `clients/`.
pub const SERVER_ROLE: &str = "server";

const CLIENTS_DIR: &str = "clients";

/// Candidate files for `role` under `root`, in lookup order.
///
/// `<base>/<role>.<ext>` for every extension, then `<base>/<role>/index.<ext>`,
/// where `<base>` is `root` for the server role and `root/clients` otherwise.
pub fn role_candidates(root: &Path, role: &str, extensions: &[&str]) -> Vec<PathBuf> {
    let base = if role == SERVER_ROLE {
        root.to_path_buf()
    } else {
        root.join(CLIENTS_DIR)
    };

    let flat = extensions.iter().map(|ext| base.join(format!("{role}.{ext}")));
    let nested = extensions
        .iter()
        .map(|ext| base.join(role).join(format!("index.{ext}")));

    flat.chain(nested).collect()
}

/// First existing entry file for `role` in the source tree.
pub fn locate_entry_point(src_root: &Path, role: &str) -> Result<PathBuf, BuildError> {
    let searched = role_candidates(src_root, role, RECOGNIZED_EXTENSIONS);
    match searched.iter().find(|path| path.is_file()) {
        Some(found) => Ok(found.clone()),
        None => Err(BuildError::EntryNotFound {
            role: role.to_string(),
            searched,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_candidate_order() {
        let candidates = role_candidates(Path::new("/src"), "player", &["js", "ts"]);
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/src/clients/player.js"),
                PathBuf::from("/src/clients/player.ts"),
                PathBuf::from("/src/clients/player/index.js"),
                PathBuf::from("/src/clients/player/index.ts"),
            ]
        );
    }

    #[test]
    fn test_server_lives_at_root() {
        let candidates = role_candidates(Path::new("/build"), SERVER_ROLE, &["js"]);
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/build/server.js"),
                PathBuf::from("/build/server/index.js"),
            ]
        );
    }

    #[test]
    fn test_flat_file_wins_over_index() {
        let temp = TempDir::new().unwrap();
        let clients = temp.path().join("clients");
        fs::create_dir_all(clients.join("player")).unwrap();
        fs::write(clients.join("player/index.js"), "").unwrap();
        fs::write(clients.join("player.tsx"), "").unwrap();

        assert_eq!(
            locate_entry_point(temp.path(), "player").unwrap(),
            clients.join("player.tsx")
        );
    }

    #[test]
    fn test_index_file_is_found() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("clients/controller");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("index.ts"), "").unwrap();

        assert_eq!(
            locate_entry_point(temp.path(), "controller").unwrap(),
            dir.join("index.ts")
        );
    }

    #[test]
    fn test_missing_entry_names_role() {
        let temp = TempDir::new().unwrap();
        let err = locate_entry_point(temp.path(), "ghost").unwrap_err();
        match &err {
            BuildError::EntryNotFound { role, searched } => {
                assert_eq!(role, "ghost");
                assert_eq!(searched.len(), RECOGNIZED_EXTENSIONS.len() * 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("\"ghost\""));
    }
}
