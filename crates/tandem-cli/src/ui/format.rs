//! Formatting utilities for durations and build summaries.

use std::time::Duration;

use console::Term;
use owo_colors::OwoColorize;
use tandem_bundler::BundleOutcome;

use super::colors_enabled;
use crate::orchestrator::BuildReport;

/// Format duration in human-readable format.
///
/// ```
/// use std::time::Duration;
/// use tandem_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Print the outcome of a one-shot build to stderr.
pub fn print_build_summary(report: &BuildReport) {
    let width = (Term::stderr().size().1 as usize).clamp(20, 80);
    let title = "Build Summary";

    if colors_enabled() {
        eprintln!("\n{}", title.bold().underline());
    } else {
        eprintln!("\n{title}");
    }
    eprintln!("{}", "─".repeat(width));

    let compile = &report.compile;
    eprintln!(
        "  sources    {} compiled, {} copied, {} failed",
        compile.compiled, compile.copied, compile.failed
    );

    for (role, outcome) in &report.bundles {
        let status = match outcome {
            BundleOutcome::Bundled { .. } => "bundled",
            BundleOutcome::Failed { .. } => "FAILED",
        };
        eprintln!("  client     {:<20} {}", role, status);
    }

    eprintln!("{}", "─".repeat(width));
    eprintln!("  done in {}", format_duration(report.duration));
}
