//! Classification of a cache entry before deciding whether to run.

use crate::detector;
use crate::key::CacheKey;
use crate::run_dir::CacheEntryPaths;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// What to do with a cache entry on this invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Cached data is younger than the cache time; serve it
    Fresh,
    /// Cached data is missing or too old; run the command
    Stale,
    /// Another invocation is running this command and has not produced
    /// output yet
    AwaitingFirstResult,
}

/// Classify the entry at `entry` for `key`.
///
/// A pid marker that does not belong to a live run of the same command is
/// removed. A confirmed marker is also removed once the entry has data.
pub fn evaluate(entry: &CacheEntryPaths, key: &CacheKey, max_age: Duration) -> CacheState {
    let still_running = entry.pid.is_file() && {
        let confirmed = read_pid(&entry.pid).is_some_and(|pid| detector::is_same_command(pid, key));
        if !confirmed {
            info!(pid_file = %entry.pid.display(), "Removing orphaned pid marker");
            std::fs::remove_file(&entry.pid).ok();
        }
        confirmed
    };

    if still_running && !entry.data.is_file() {
        debug!(key = %key.short(), "Concurrent run has no output yet");
        return CacheState::AwaitingFirstResult;
    }

    if still_running {
        std::fs::remove_file(&entry.pid).ok();
    }

    if is_stale(&entry.data, max_age) {
        CacheState::Stale
    } else {
        CacheState::Fresh
    }
}

/// A file is stale when it is missing, its mtime is unreadable, or it is at
/// least `max_age` old.
#[must_use]
pub fn is_stale(path: &Path, max_age: Duration) -> bool {
    let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) else {
        return true;
    };

    match SystemTime::now().duration_since(modified) {
        Ok(age) => age >= max_age,
        // Modified in the future: only trust it within the window
        Err(e) => e.duration() >= max_age,
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    let contents = std::fs::read_to_string(path).ok()?;
    contents.trim().parse::<u32>().ok()
}
