//! Resolution of a user command to an executable path.

use crate::{Error, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve `command` against the `PATH` value.
///
/// Commands starting with `.` are rejected. Absolute paths are returned
/// untouched; a missing file surfaces later as a spawn error. Anything else
/// is searched for in each `PATH` directory, in order.
pub fn resolve_command(command: &str, path_env: Option<&OsStr>) -> Result<PathBuf> {
    ensure_not_relative(command)?;

    let candidate = Path::new(command);
    if candidate.is_absolute() {
        return Ok(candidate.to_path_buf());
    }

    let not_found = || Error::bad_command(format!("{command} is not a valid path or command name"));
    let path_env = path_env.ok_or_else(not_found)?;

    std::env::split_paths(path_env)
        .filter(|dir| dir.is_absolute())
        .map(|dir| dir.join(command))
        .find(|path| is_executable_file(path))
        .inspect(|path| debug!(command, resolved = %path.display(), "Resolved command on PATH"))
        .ok_or_else(not_found)
}

/// Reject commands given relative to the current directory
pub fn ensure_not_relative(command: &str) -> Result<()> {
    if command.starts_with('.') {
        return Err(Error::bad_command(
            "Relative path to command not allowed. Use full path or command name only",
        ));
    }
    Ok(())
}

/// Regular file with at least one execute bit set
#[cfg(unix)]
pub fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Regular file; Windows has no execute bit
#[cfg(not(unix))]
pub fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}
