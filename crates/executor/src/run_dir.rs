//! Location of the flat directory holding every cache entry.
//!
//! Resolution order:
//! 1. `CACHERUN_DIR` environment variable
//! 2. Platform cache directory + `/cacherun`
//! 3. `<temp dir>/cacherun` when neither is available or creatable

use crate::key::CacheKey;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the subdirectory created under the platform cache directory
pub const RUN_DIR_NAME: &str = "cacherun";

/// Extension of the captured stdout file
pub const DATA_EXTENSION: &str = "data";
/// Extension of the in-flight pid marker
pub const PID_EXTENSION: &str = "pid";
/// Extension of the display command line file
pub const CMD_EXTENSION: &str = "cmd";

/// All extensions that make up a cache entry
pub const ENTRY_EXTENSIONS: [&str; 3] = [PID_EXTENSION, DATA_EXTENSION, CMD_EXTENSION];

/// Directory where cache entry files live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirectory {
    path: PathBuf,
}

impl RunDirectory {
    /// Wrap an explicit path without touching the filesystem
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolve the preferred location, without creating it
    #[must_use]
    pub fn locate() -> Self {
        if let Ok(dir) = std::env::var("CACHERUN_DIR")
            && !dir.is_empty()
        {
            return Self::new(dir);
        }

        match dirs::cache_dir() {
            Some(base) => Self::new(base.join(RUN_DIR_NAME)),
            None => Self::fallback(),
        }
    }

    /// The directory an executor with no override writes to: the preferred
    /// location, or the fallback when it cannot be created
    pub fn resolve() -> Result<Self> {
        Self::locate().ensure()
    }

    /// The fixed location used when the preferred one is unusable
    #[must_use]
    pub fn fallback() -> Self {
        Self::new(std::env::temp_dir().join(RUN_DIR_NAME))
    }

    /// Create the directory if needed, falling back to the temp location
    /// when creation fails.
    pub fn ensure(self) -> Result<Self> {
        match std::fs::create_dir_all(&self.path) {
            Ok(()) => Ok(self),
            Err(e) => {
                let fallback = Self::fallback();
                if fallback == self {
                    return Err(Error::io(e, Some(self.path), "create run directory"));
                }
                warn!(
                    path = %self.path.display(),
                    fallback = %fallback.path.display(),
                    error = %e,
                    "Could not create run directory, using fallback"
                );
                std::fs::create_dir_all(&fallback.path).map_err(|e| {
                    Error::io(e, Some(fallback.path.clone()), "create run directory")
                })?;
                Ok(fallback)
            }
        }
    }

    /// Path of the directory
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File paths of the entry for `key`
    #[must_use]
    pub fn entry(&self, key: &CacheKey) -> CacheEntryPaths {
        let stem = key.as_str();
        debug!(run_dir = %self.path.display(), key = %stem, "Resolving cache entry paths");
        CacheEntryPaths {
            pid: self.path.join(format!("{stem}.{PID_EXTENSION}")),
            data: self.path.join(format!("{stem}.{DATA_EXTENSION}")),
            cmd: self.path.join(format!("{stem}.{CMD_EXTENSION}")),
        }
    }
}

/// The three files of one cache entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntryPaths {
    /// Process id of an in-flight run
    pub pid: PathBuf,
    /// Captured standard output
    pub data: PathBuf,
    /// Command line, for display
    pub cmd: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_locate_honors_override() {
        temp_env::with_var("CACHERUN_DIR", Some("/custom/cacherun"), || {
            assert_eq!(RunDirectory::locate().path(), Path::new("/custom/cacherun"));
        });
    }

    #[test]
    fn test_locate_ignores_empty_override() {
        temp_env::with_var("CACHERUN_DIR", Some(""), || {
            let dir = RunDirectory::locate();
            assert!(dir.path().ends_with(RUN_DIR_NAME));
            assert_ne!(dir.path(), Path::new(""));
        });
    }

    #[test]
    fn test_resolve_creates_located_directory() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("resolved");
        temp_env::with_var("CACHERUN_DIR", Some(&target), || {
            let dir = RunDirectory::resolve().unwrap();
            assert_eq!(dir.path(), target);
            assert!(target.is_dir());
        });
    }

    #[test]
    fn test_ensure_creates_directory() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("nested").join("cacherun");
        let dir = RunDirectory::new(&target).ensure().unwrap();
        assert_eq!(dir.path(), target);
        assert!(target.is_dir());
    }

    #[test]
    fn test_ensure_falls_back_when_uncreatable() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let dir = RunDirectory::new(blocker.join("cacherun")).ensure().unwrap();
        assert_eq!(dir, RunDirectory::fallback());
        assert!(dir.path().is_dir());
    }

    #[test]
    fn test_entry_paths_share_stem() {
        let dir = RunDirectory::new("/runs");
        let key = CacheKey::from_command_line("echo hi");
        let entry = dir.entry(&key);
        assert_eq!(entry.pid, PathBuf::from(format!("/runs/{key}.pid")));
        assert_eq!(entry.data, PathBuf::from(format!("/runs/{key}.data")));
        assert_eq!(entry.cmd, PathBuf::from(format!("/runs/{key}.cmd")));
    }
}
