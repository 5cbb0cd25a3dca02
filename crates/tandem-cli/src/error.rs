//! Error handling for the tandem CLI.
//!
//! `CliError` is the top-level type returned by commands. Domain errors
//! (`ConfigError`, `BuildError`, `ProcessError`) convert into it through
//! `#[from]`, and every fatal precondition names the role or path involved.

pub mod miette;

pub use self::miette::cli_error_to_miette;

use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors (file not found, invalid role description)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Build preconditions that abort before anything is written
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Supervised process errors
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// Errors from the source compiler
    #[error("Compiler error: {0}")]
    Compiler(#[from] tandem_compiler::Error),

    /// Errors from the client bundler
    #[error("Bundler error: {0}")]
    Bundler(#[from] tandem_bundler::Error),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

/// Application configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file doesn't exist at the expected location
    #[error("Config file not found: {}\n\nHint: Create config/application.json declaring your clients", .0.display())]
    NotFound(PathBuf),

    /// Config file could not be parsed or merged
    #[error("Invalid application config: {0}\n\nHint: Check config/application.json syntax and field types")]
    Invalid(String),

    /// Mutually exclusive options were specified
    #[error("Conflicting options: {0}\n\nHint: `target` and `runtime` are synonyms, keep only one")]
    ConflictingOptions(String),

    /// Missing required configuration field
    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField {
        /// Name of the missing field
        field: String,
        /// Helpful hint for providing the field
        hint: String,
    },

    /// Invalid value for a configuration option
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The invalid value
        value: String,
        /// Helpful hint for correct values
        hint: String,
    },
}

/// Build preconditions.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A reserved path exists in the source tree
    #[error("The path \"{}\" is reserved by the application build process\n\nHint: Rename this file or directory, and restart the build process", .0.display())]
    ReservedPath(PathBuf),

    /// No entry point for a browser role
    #[error("No entry point found for client \"{role}\" (searched {})\n\nHint: Create one of these files or fix the role name in config/application.json", format_paths(.searched))]
    EntryNotFound {
        /// Role name
        role: String,
        /// Candidates tried, in order
        searched: Vec<PathBuf>,
    },
}

/// Process supervision errors.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Role missing from the application config
    #[error("Process \"{role}\" not declared in {}", .config.display())]
    UndeclaredRole {
        /// Role name
        role: String,
        /// Config file consulted
        config: PathBuf,
    },

    /// Role declared with a runtime other than node
    #[error("Process \"{role}\" not declared as \"node\" runtime (found \"{runtime}\")")]
    NotNodeRole {
        /// Role name
        role: String,
        /// Declared runtime
        runtime: String,
    },

    /// Built artifact for the role does not exist
    #[error("Cannot watch process \"{role}\", file {} does not exist\n\nHint: Run `tandem build` first", format_paths(.searched))]
    ArtifactMissing {
        /// Role name
        role: String,
        /// Candidates tried, in order
        searched: Vec<PathBuf>,
    },

    /// No debugger port available
    #[error("No available inspector port in range {start}-{end}")]
    NoFreePort {
        /// First port tried
        start: u16,
        /// Last port tried
        end: u16,
    },

    /// The host runtime could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Prefix the error message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}
