//! Command-line interface definition.
//!
//! # Command Structure
//!
//! - `tandem build [--watch]` - compile the source tree and bundle browser roles
//! - `tandem watch-process <role> [--inspect]` - run a built role under `node --watch`
//! - `tandem delete-build` - remove the build directory

mod commands;

use std::path::PathBuf;

use clap::Parser;

pub use commands::{BuildArgs, Command, WatchProcessArgs};

/// Tandem - build and supervise multi-role JavaScript/TypeScript applications
#[derive(Parser, Debug)]
#[command(
    name = "tandem",
    version,
    about = "Build and supervise multi-role JavaScript/TypeScript applications",
    long_about = "Tandem mirrors src/ into .build/ with per-file transpilation, bundles every\n\
                  browser client into .build/public/<role>.js and runs node roles under\n\
                  the runtime's own --watch mode."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    ///
    /// Logs every file compiled, copied or removed.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Project directory (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Project directory the command runs against.
    pub fn project_dir(&self) -> std::io::Result<PathBuf> {
        match &self.cwd {
            Some(dir) if dir.is_absolute() => Ok(dir.clone()),
            Some(dir) => Ok(std::env::current_dir()?.join(dir)),
            None => std::env::current_dir(),
        }
    }
}
