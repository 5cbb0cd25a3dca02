//! `tandem build`.

use tandem_bundler::BundleOutcome;
use tokio::signal;

use crate::cli::BuildArgs;
use crate::config::{AppConfig, ProjectLayout};
use crate::error::Result;
use crate::orchestrator::BuildOrchestrator;
use crate::ui;

/// Execute the build command.
///
/// # Build Process
///
/// 1. Load the application config (no config means no clients to bundle)
/// 2. Check preconditions: reserved path, bundler override, client entries
/// 3. Compile `src/` into `.build/` and bundle every browser client
/// 4. One-shot: print a summary. Watch: keep rebuilding until Ctrl+C
pub async fn execute(args: BuildArgs, layout: ProjectLayout) -> Result<()> {
    let roles = match AppConfig::load_from_env(&layout)? {
        Some(config) => config.roles()?,
        None => {
            tracing::debug!("no application config, building without clients");
            Vec::new()
        }
    };

    let orchestrator = BuildOrchestrator::new(layout, roles);

    if !args.watch {
        let report = orchestrator.build().await?;
        ui::print_build_summary(&report);
        for (role, outcome) in &report.bundles {
            if let BundleOutcome::Failed { .. } = outcome {
                ui::error(&format!(
                    "client \"{role}\" failed to bundle, its bundle now shows the error"
                ));
            }
        }
        if report.is_clean() {
            ui::success("Build complete");
        } else {
            ui::warning("Build finished with errors");
        }
        return Ok(());
    }

    let session = orchestrator.watch().await?;
    if let Some(report) = session.initial_compile() {
        ui::info(&format!(
            "{} compiled, {} copied, {} failed",
            report.compiled, report.copied, report.failed
        ));
    }
    ui::info("Watching for changes (Ctrl+C to stop)");

    let interrupted = signal::ctrl_c().await;
    ui::info("EXIT");
    session.stop().await;
    interrupted?;

    Ok(())
}
