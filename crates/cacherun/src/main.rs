mod cli;
mod commands;
mod logging;

use crate::cli::parse;
use crate::commands::Command;
use crate::logging::TracingConfig;
use tracing::instrument;

#[tokio::main(flavor = "current_thread")]
#[allow(clippy::print_stderr)]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    if let Err(error) = run_main().await {
        eprintln!("{error:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> miette::Result<()> {
    let cli = parse();

    crate::logging::init_tracing(TracingConfig {
        format: cli.log_format.clone(),
        level: cli.log_level.clone().into(),
    })?;

    run_cli(cli.into()).await
}

#[instrument]
async fn run_cli(command: Command) -> miette::Result<()> {
    commands::execute(command).await
}
