//! Miette diagnostic conversion for CLI errors.

use crate::error::{BuildError, CliError};
use miette::Report;

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => build_error_to_miette(e),
        CliError::Bundler(e) => Report::new(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        CliError::Process(e) => miette::miette!("{}", e),
        _ => miette::miette!("{}", err),
    }
}

/// Convert BuildError to miette Report
pub fn build_error_to_miette(err: BuildError) -> Report {
    match err {
        BuildError::ReservedPath(path) => miette::miette!(
            code = "RESERVED_PATH",
            help = "Rename this file or directory, and restart the build process",
            "The path \"{}\" is reserved by the application build process",
            path.display()
        ),
        other => miette::miette!("{}", other),
    }
}
