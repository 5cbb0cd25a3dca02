use clap::{Args, Subcommand};

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile src/ into .build/ and bundle every browser client
    ///
    /// Aborts before writing anything when src/public exists or a browser
    /// client has no entry point. Bundling errors never abort: the bundle is
    /// replaced by a page that shows the error.
    Build(BuildArgs),

    /// Run a built node role, restarting it when its files change
    ///
    /// The role must be `server` or declared with runtime "node" in
    /// config/application.json, and must have been built first.
    WatchProcess(WatchProcessArgs),

    /// Remove the build directory
    DeleteBuild,
}

/// Arguments for the `build` command.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Keep running and rebuild on every change until Ctrl+C
    #[arg(short, long)]
    pub watch: bool,
}

/// Arguments for the `watch-process` command.
#[derive(Args, Debug, Clone)]
pub struct WatchProcessArgs {
    /// Role to run (`server` or a client declared with runtime "node")
    #[arg(value_name = "ROLE")]
    pub role: String,

    /// Attach a debugger on the first free port from 9229
    #[arg(long)]
    pub inspect: bool,
}
