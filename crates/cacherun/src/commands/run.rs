//! Run a command through the output cache

use cacherun_executor::{ExecutorConfig, OutputCachingExecutor, RunOutcome};
use std::ffi::OsString;
use std::time::Duration;
use tracing::instrument;

/// Serve cached output for `argv` or run it.
///
/// A command that exits unsuccessfully still counts as a successful run.
#[instrument]
pub async fn execute_run(cache_time: Duration, argv: &[OsString]) -> miette::Result<()> {
    let executor = OutputCachingExecutor::new(ExecutorConfig {
        cache_time,
        ..ExecutorConfig::default()
    });

    let outcome = executor
        .run_cached_command(argv, &mut std::io::stdout(), &mut std::io::stderr())
        .await?;

    match outcome {
        RunOutcome::Cached => tracing::debug!("Replayed cached output"),
        RunOutcome::Executed { status } => {
            tracing::debug!(code = ?status.code(), "Command executed");
        }
        RunOutcome::AwaitingFirstResult => {
            tracing::info!("Command is already running without output; nothing to show yet");
        }
    }

    Ok(())
}
