//! Host runtime version check.

use tokio::process::Command;

/// Oldest node major version with a usable `--watch`.
pub const MIN_NODE_MAJOR: u64 = 18;

/// Major version out of `node --version` output such as `v20.11.1`.
pub fn parse_major(version: &str) -> Option<u64> {
    version
        .trim()
        .trim_start_matches('v')
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
}

/// Major version of `program`, or `None` when it cannot be determined.
pub async fn node_major(program: &str) -> Option<u64> {
    let output = Command::new(program).arg("--version").output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    parse_major(&String::from_utf8_lossy(&output.stdout))
}

/// Warn when the runtime is older than [`MIN_NODE_MAJOR`] or unknown.
///
/// Never fails: an old runtime may still work.
pub async fn check_node_version(program: &str) -> Option<u64> {
    let major = node_major(program).await;
    match major {
        Some(major) if major >= MIN_NODE_MAJOR => {
            tracing::debug!("{} major version {}", program, major);
        }
        Some(major) => crate::ui::warning(&format!(
            "{program} v{major} found; v{MIN_NODE_MAJOR} or newer is required for --watch"
        )),
        None => crate::ui::warning(&format!(
            "Cannot determine the {program} version; v{MIN_NODE_MAJOR} or newer is required"
        )),
    }
    major
}
