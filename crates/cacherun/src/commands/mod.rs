pub mod cache;
pub mod run;

use std::ffi::OsString;
use std::time::Duration;
use tracing::instrument;

#[derive(Debug, Clone)]
pub enum Command {
    Run {
        cache_time: Duration,
        argv: Vec<OsString>,
    },
    ListCaches,
    ResetCache {
        identifier: String,
    },
    DeleteCache {
        identifier: Option<String>,
    },
    Help,
}

#[instrument]
pub async fn execute(command: Command) -> miette::Result<()> {
    match command {
        Command::Run { cache_time, argv } => run::execute_run(cache_time, &argv).await,
        Command::ListCaches => cache::execute_list(),
        Command::ResetCache { identifier } => cache::execute_reset(&identifier),
        Command::DeleteCache { identifier } => cache::execute_delete(identifier.as_deref()),
        Command::Help => {
            use clap::CommandFactory;
            crate::cli::Cli::command()
                .print_help()
                .map_err(|e| miette::miette!("Failed to print help: {e}"))
        }
    }
}
