//! Project layout and application configuration.

mod app;

pub use app::{AppConfig, RoleDescriptor, RoleRuntime};
pub(crate) use app::config_display_path;

use std::path::{Path, PathBuf};

/// Directory names every tandem project shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub cwd: PathBuf,
    pub src_dir: PathBuf,
    pub build_dir: PathBuf,
    pub config_dir: PathBuf,
}

impl ProjectLayout {
    pub const SRC_DIR: &'static str = "src";
    pub const BUILD_DIR: &'static str = ".build";
    pub const CONFIG_DIR: &'static str = "config";
    /// Name reserved inside the source root for bundled clients.
    pub const PUBLIC_DIR: &'static str = "public";

    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            src_dir: PathBuf::from(Self::SRC_DIR),
            build_dir: PathBuf::from(Self::BUILD_DIR),
            config_dir: PathBuf::from(Self::CONFIG_DIR),
        }
    }

    pub fn src_root(&self) -> PathBuf {
        self.cwd.join(&self.src_dir)
    }

    pub fn build_root(&self) -> PathBuf {
        self.cwd.join(&self.build_dir)
    }

    pub fn config_root(&self) -> PathBuf {
        self.cwd.join(&self.config_dir)
    }

    /// `src/public`, which must not exist.
    pub fn reserved_path(&self) -> PathBuf {
        self.src_root().join(Self::PUBLIC_DIR)
    }

    pub fn public_dir(&self) -> PathBuf {
        self.build_root().join(Self::PUBLIC_DIR)
    }

    /// Output path of a browser role's bundle.
    pub fn bundle_output(&self, role: &str) -> PathBuf {
        self.public_dir().join(format!("{role}.js"))
    }

    /// Path relative to the working directory, for messages.
    pub fn display_path<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.cwd).unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = ProjectLayout::new("/app");
        assert_eq!(layout.src_root(), PathBuf::from("/app/src"));
        assert_eq!(layout.build_root(), PathBuf::from("/app/.build"));
        assert_eq!(layout.reserved_path(), PathBuf::from("/app/src/public"));
        assert_eq!(
            layout.bundle_output("player"),
            PathBuf::from("/app/.build/public/player.js")
        );
        assert_eq!(
            layout.display_path(Path::new("/app/src/public")),
            Path::new("src/public")
        );
    }
}
