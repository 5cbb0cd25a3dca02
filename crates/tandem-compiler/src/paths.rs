//! Output path derivation between the source root and the build root.

use std::path::{Component, Path, PathBuf};

use path_clean::PathClean;

use crate::{Error, Result};

/// Extensions that are transpiled rather than copied, in discovery order.
pub const RECOGNIZED_EXTENSIONS: &[&str] = &["js", "mjs", "jsx", "ts", "tsx"];

/// Extension every transpiled file is rewritten to.
pub const TARGET_EXTENSION: &str = "js";

/// Returns true when the file extension is transpiled by the compiler.
pub fn is_recognized(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| RECOGNIZED_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Sibling source map path of an artifact (`foo.js` -> `foo.js.map`).
pub fn map_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_os_string();
    name.push(".map");
    PathBuf::from(name)
}

/// Trailing comment linking an artifact to its sibling map, relative to the
/// artifact's own directory.
pub fn source_map_reference(artifact: &Path) -> String {
    let name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("//# sourceMappingURL=./{name}.map")
}

/// Path of `path` relative to `root`, or an error if it escapes the root.
pub(crate) fn relative_to(root: &Path, path: &Path) -> Result<PathBuf> {
    let root = absolutize(root);
    let path = absolutize(path);

    path.strip_prefix(&root)
        .map(Path::to_path_buf)
        .map_err(|_| Error::OutsideSourceRoot(path.clone()))
}

/// Mirror `path` from `src_root` into `build_root` without touching the
/// extension.
pub(crate) fn mirror_path(src_root: &Path, build_root: &Path, path: &Path) -> Result<PathBuf> {
    let relative = relative_to(src_root, path)?;
    Ok(build_root.join(relative))
}

/// Mirror `path` into the build root, rewriting recognized extensions to
/// [`TARGET_EXTENSION`].
pub fn output_path(src_root: &Path, build_root: &Path, path: &Path) -> Result<PathBuf> {
    let mirrored = mirror_path(src_root, build_root, path)?;
    if is_recognized(path) {
        Ok(mirrored.with_extension(TARGET_EXTENSION))
    } else {
        Ok(mirrored)
    }
}

/// Relative path from directory `from` to file `to`, used for the `sources`
/// entry of a source map.
pub(crate) fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from = absolutize(from);
    let to = absolutize(to);

    let from_parts: Vec<Component<'_>> = from.components().collect();
    let to_parts: Vec<Component<'_>> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..from_parts.len() {
        relative.push("..");
    }
    for part in &to_parts[common..] {
        relative.push(part.as_os_str());
    }
    relative
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf().clean()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
            .clean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_recognized() {
        assert!(is_recognized(Path::new("src/server.ts")));
        assert!(is_recognized(Path::new("src/clients/player.mjs")));
        assert!(is_recognized(Path::new("src/view.tsx")));
        assert!(!is_recognized(Path::new("src/styles.css")));
        assert!(!is_recognized(Path::new("src/README")));
    }

    #[test]
    fn test_output_path_rewrites_recognized_extensions() {
        let out = output_path(
            Path::new("/app/src"),
            Path::new("/app/.build"),
            Path::new("/app/src/clients/player.ts"),
        )
        .unwrap();
        assert_eq!(out, PathBuf::from("/app/.build/clients/player.js"));
    }

    #[test]
    fn test_output_path_keeps_other_extensions() {
        let out = output_path(
            Path::new("/app/src"),
            Path::new("/app/.build"),
            Path::new("/app/src/assets/logo.png"),
        )
        .unwrap();
        assert_eq!(out, PathBuf::from("/app/.build/assets/logo.png"));
    }

    #[test]
    fn test_output_path_rejects_foreign_paths() {
        let err = output_path(
            Path::new("/app/src"),
            Path::new("/app/.build"),
            Path::new("/elsewhere/file.js"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::OutsideSourceRoot(_)));
    }

    #[test]
    fn test_map_path_and_reference() {
        let artifact = Path::new("/app/.build/server.js");
        assert_eq!(map_path(artifact), PathBuf::from("/app/.build/server.js.map"));
        assert_eq!(
            source_map_reference(artifact),
            "//# sourceMappingURL=./server.js.map"
        );
    }

    #[test]
    fn test_relative_path_between_trees() {
        let rel = relative_path(
            Path::new("/app/.build/lib"),
            Path::new("/app/src/lib/utils.ts"),
        );
        assert_eq!(rel, PathBuf::from("../../src/lib/utils.ts"));
    }
}
