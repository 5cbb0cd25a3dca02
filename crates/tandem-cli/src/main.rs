//! Tandem CLI entry point: argument parsing, logging setup and dispatch.

use clap::Parser;
use miette::Result;
use tandem_cli::config::ProjectLayout;
use tandem_cli::{cli, commands, error, logger, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let cwd = args
        .project_dir()
        .map_err(|e| error::cli_error_to_miette(e.into()))?;
    let layout = ProjectLayout::new(cwd);

    let result = match args.command {
        cli::Command::Build(build_args) => commands::build_execute(build_args, layout)
            .await
            .map(|()| 0),
        cli::Command::WatchProcess(process_args) => {
            commands::watch_process_execute(process_args, layout).await
        }
        cli::Command::DeleteBuild => commands::delete_build_execute(layout).await.map(|()| 0),
    };

    match result.map_err(error::cli_error_to_miette)? {
        0 => Ok(()),
        code => std::process::exit(code),
    }
}
