//! Command implementations.
//!
//! - [`build`] - compile the source tree and bundle browser clients
//! - [`watch_process`] - run a built node role under the runtime's watch mode
//! - [`delete_build`] - remove the build directory
//!
//! Each command takes its parsed arguments and the resolved project layout.

pub mod build;
pub mod delete_build;
pub mod watch_process;

pub use build::execute as build_execute;
pub use delete_build::execute as delete_build_execute;
pub use watch_process::execute as watch_process_execute;
