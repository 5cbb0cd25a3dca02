//! # tandem-compiler
//!
//! Mirrors a source tree into a build tree. Files with a recognized script
//! extension (`js`, `mjs`, `jsx`, `ts`, `tsx`) are transpiled with the oxc
//! transformer and written next to an external source map; every other file is
//! copied byte-for-byte.
//!
//! Two modes are provided:
//!
//! - **one-shot**: [`SourceCompiler::compile_all`] converts every file
//!   concurrently and reports per-file failures without aborting the batch.
//! - **continuous**: [`SourceCompiler::watch`] subscribes to the source root
//!   through a [`SourceWatcher`] and applies each [`WatchEvent`] in order.
//!
//! ```no_run
//! use tandem_compiler::SourceCompiler;
//!
//! # #[tokio::main]
//! # async fn main() -> tandem_compiler::Result<()> {
//! let compiler = SourceCompiler::new("src", ".build");
//! let report = compiler.compile_all().await?;
//! println!("{} compiled, {} copied", report.compiled, report.copied);
//! # Ok(()) }
//! ```

pub mod compiler;
pub mod paths;
pub mod transpile;
pub mod watcher;

pub use compiler::{CompileOutcome, CompileReport, CompileWatch, SourceCompiler};
pub use paths::{
    RECOGNIZED_EXTENSIONS, TARGET_EXTENSION, is_recognized, map_path, output_path,
    source_map_reference,
};
pub use transpile::{DEFAULT_TARGET, TranspileOptions, TranspileOutput, transpile};
pub use watcher::{DEFAULT_SETTLE, SourceWatcher, WatchEvent, WatchEventKind};

use std::path::PathBuf;

/// Error types for tandem-compiler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A recognized source file could not be parsed or transformed.
    #[error("Transform error in {}: {message}", .file.display())]
    Transpile { file: PathBuf, message: String },

    /// A path handed to the compiler does not live under its source root.
    #[error("Path is outside the source root: {}", .0.display())]
    OutsideSourceRoot(PathBuf),

    /// The source root to compile or watch does not exist.
    #[error("Source root not found: {}", .0.display())]
    SourceRootMissing(PathBuf),

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

impl Error {
    pub(crate) fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Error::IoError {
            message: message.into(),
            source,
        }
    }
}

/// Result type alias for tandem-compiler operations.
pub type Result<T> = std::result::Result<T, Error>;
