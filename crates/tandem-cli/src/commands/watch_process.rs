//! `tandem watch-process`.

use tokio::signal;

use crate::cli::WatchProcessArgs;
use crate::config::{AppConfig, ProjectLayout};
use crate::error::Result;
use crate::supervisor::ProcessSupervisor;
use crate::ui;

/// Launch the role and wait for it.
///
/// Returns the child's exit code, or 0 when interrupted.
pub async fn execute(args: WatchProcessArgs, layout: ProjectLayout) -> Result<i32> {
    let config = AppConfig::load_from_env(&layout)?;
    let supervisor = ProcessSupervisor::new(layout, config);

    let mut process = supervisor.launch(&args.role, args.inspect).await?;
    ui::info(&format!("watching process \"{}\"", args.role));
    if let Some(port) = process.inspect_port() {
        ui::info(&format!("debugger listening on 127.0.0.1:{port}"));
    }

    let exited = tokio::select! {
        status = process.wait() => Some(status?),
        _ = signal::ctrl_c() => None,
    };

    match exited {
        Some(status) => {
            tracing::debug!("process \"{}\" exited: {}", args.role, status);
            Ok(status.code().unwrap_or(1))
        }
        None => {
            ui::info("EXIT");
            process.terminate().await?;
            Ok(0)
        }
    }
}
