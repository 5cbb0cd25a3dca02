//! `tandem delete-build`.

use crate::config::ProjectLayout;
use crate::error::{Result, ResultExt};
use crate::ui;

/// Remove the build directory. A missing directory is not an error.
pub async fn execute(layout: ProjectLayout) -> Result<()> {
    let build_root = layout.build_root();

    match tokio::fs::remove_dir_all(&build_root).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("{} does not exist", build_root.display());
        }
        Err(e) => {
            return Err(e).context(format!("Failed to delete {}", build_root.display()));
        }
    }

    ui::success("deleted build folder");
    Ok(())
}
