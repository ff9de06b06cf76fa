//! Detection of a concurrent run of the same command.
//!
//! A pid marker only says some process was started. Before trusting it, the
//! live process table is consulted and the process's argv is re-hashed; a
//! recycled pid running something else does not match.
//!
//! Interpreted scripts never match: for a `#!` script the kernel replaces
//! argv with `interpreter script args`, so a concurrent run of a script reads
//! as an orphaned marker and the command runs again.

use crate::key::CacheKey;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

/// Check whether `pid` is alive and running the command identified by `expected`.
///
/// Every lookup failure reads as "not the same command".
#[must_use]
pub fn is_same_command(pid: u32, expected: &CacheKey) -> bool {
    match process_command_line(pid) {
        Some(command_line) => {
            let matches = CacheKey::from_command_line(&command_line) == *expected;
            debug!(pid, %command_line, matches, "Compared live process to cache key");
            matches
        }
        None => {
            debug!(pid, "No command line available for process");
            false
        }
    }
}

/// Space-joined argv of a live process, if it can be read
fn process_command_line(pid: u32) -> Option<String> {
    let mut system = System::new();
    let process_pid = Pid::from_u32(pid);
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[process_pid]),
        false,
        ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
    );

    let process = system.process(process_pid)?;
    let argv = process.cmd();
    if argv.is_empty() {
        return None;
    }

    Some(
        argv.iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" "),
    )
}
