//! Tandem CLI - build, watch and supervise multi-role applications.
//!
//! A tandem project has a `src/` tree holding a server role and client roles
//! (`src/clients/<role>`), each declared in `config/application.json` with a
//! `browser` or `node` runtime.
//!
//! - [`orchestrator`] mirrors `src/` into `.build/` through
//!   [`tandem_compiler`] and bundles every browser client through
//!   [`tandem_bundler`]
//! - [`supervisor`] runs a built node role under `node --watch`
//! - [`config`] loads the project layout and application config
//! - [`error`], [`logger`] and [`ui`] hold the ambient plumbing
//!
//! # Example
//!
//! ```no_run
//! use tandem_cli::config::{ProjectLayout, RoleRuntime};
//! use tandem_cli::orchestrator::BuildOrchestrator;
//!
//! # async fn run() -> tandem_cli::Result<()> {
//! let layout = ProjectLayout::new("/path/to/app");
//! let orchestrator =
//!     BuildOrchestrator::new(layout, vec![("player".into(), RoleRuntime::Browser)]);
//! let report = orchestrator.build().await?;
//! assert!(report.is_clean());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod orchestrator;
pub mod supervisor;
pub mod ui;

pub use error::{BuildError, CliError, ConfigError, ProcessError, Result, ResultExt};
