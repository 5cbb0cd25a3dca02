//! # tandem-bundler
//!
//! Rolldown-based bundling of browser client roles.
//!
//! A [`ClientBundler`] takes one role's entry file and an explicit output
//! path, loads every module through [`TranspilePlugin`] (the same oxc
//! transform `tandem-compiler` applies to the whole tree) and writes a single
//! minified ESM bundle with a linked source map.
//!
//! Build failures are contained: instead of an error the bundler writes an
//! error artifact to the output path, so a browser reloading during a broken
//! edit shows the diagnostic instead of a stale bundle.
//!
//! ```no_run
//! use tandem_bundler::{BundleOutcome, BundleSettings, ClientBundler};
//!
//! # #[tokio::main]
//! # async fn main() -> tandem_bundler::Result<()> {
//! let bundler = ClientBundler::new(
//!     "src/clients/player.js",
//!     ".build/public/player.js",
//!     std::env::current_dir()?,
//!     BundleSettings::default(),
//! )?;
//!
//! if let BundleOutcome::Failed { message } = bundler.build().await {
//!     eprintln!("{message}");
//! }
//! # Ok(()) }
//! ```

pub mod bundler;
pub mod diagnostics;
pub mod entries;
pub mod error_artifact;
pub mod plugin;
pub mod settings;
pub mod writer;

pub use bundler::{BundleOutcome, BundleWatch, ClientBundler};
pub use diagnostics::{DiagnosticKind, ExtractedDiagnostic};
pub use plugin::TranspilePlugin;
pub use settings::{
    BundleFormat, BundlePlatform, BundleSettings, ConfigOverride, JsonFileOverride,
    OVERRIDE_FILE, SourceMapMode, resolve_settings, validate_override,
};

use std::path::{Path, PathBuf};

/// Error types for tandem-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error from Rolldown bundler.
    #[error("Rolldown bundler error: {}", format_bundler_error(.0))]
    Bundler(Vec<diagnostics::ExtractedDiagnostic>),

    /// Invalid packaging configuration or override.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Bundle entry point does not exist.
    #[error("Entry point not found: {}", .0.display())]
    EntryNotFound(PathBuf),

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// Error from the filesystem notification backend.
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// I/O error with context message.
    #[error("{message}: {source}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for tandem-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a bundler error from Rolldown's batched diagnostics, with
    /// paths shown relative to `cwd`.
    pub fn from_rolldown_batch(batch: &rolldown_error::BatchedBuildDiagnostic, cwd: &Path) -> Self {
        Error::Bundler(diagnostics::extract_from_batch(batch, cwd))
    }
}

fn format_bundler_error(diagnostics: &[diagnostics::ExtractedDiagnostic]) -> String {
    match diagnostics {
        [] => "Unknown bundler error".to_string(),
        [diag] => format!("{}: {}", diag.kind, diag.message),
        many => format!(
            "{} errors: {}",
            many.len(),
            many.iter()
                .map(|d| format!("{}: {}", d.kind, d.message))
                .collect::<Vec<_>>()
                .join("; ")
        ),
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Bundler(_) => "BUNDLER_ERROR",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Error::InvalidOutputPath(_) => "INVALID_OUTPUT_PATH",
            Error::WriteFailure(_) => "WRITE_FAILURE",
            Error::Watch(_) => "WATCH_ERROR",
            Error::IoError { .. } | Error::Io(_) => "IO_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::InvalidConfig(_) => Some(Box::new(format!(
                "Check \"{}\": it must be a JSON object whose keys are format, minify, keepNames, sourcemap, platform or external.",
                settings::OVERRIDE_FILE
            ))),
            Error::EntryNotFound(path) => Some(Box::new(format!(
                "Create {} or fix the role name in config/application.json.",
                path.display()
            ))),
            Error::WriteFailure(_) => Some(Box::new(
                "Failed to write file. Check disk space and permissions.",
            )),
            Error::Bundler(diagnostics) => diagnostics
                .first()
                .and_then(|d| d.help.as_ref())
                .map(|h| Box::new(h.clone()) as Box<dyn std::fmt::Display>),
            _ => None,
        }
    }
}
