//! Cache management commands: list, reset and delete

use cacherun_executor::{CacheRegistry, RunDirectory, render_table};
use tracing::instrument;

fn registry() -> miette::Result<CacheRegistry> {
    Ok(CacheRegistry::new(RunDirectory::resolve()?))
}

#[instrument]
#[allow(clippy::print_stdout)]
pub fn execute_list() -> miette::Result<()> {
    let commands = registry()?.list()?;
    print!("{}", render_table(&commands));
    Ok(())
}

#[instrument]
pub fn execute_reset(identifier: &str) -> miette::Result<()> {
    registry()?.reset(identifier)?;
    Ok(())
}

#[instrument]
pub fn execute_delete(identifier: Option<&str>) -> miette::Result<()> {
    let removed = registry()?.delete(identifier)?;
    tracing::debug!(removed, "Deleted cache files");
    Ok(())
}
