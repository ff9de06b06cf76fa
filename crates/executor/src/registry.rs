//! Out-of-band inspection and maintenance of cache entries.
//!
//! Entries are addressed by a prefix of their hash, usually the seven
//! character identifier shown by [`CacheRegistry::list`].

use crate::key::SHORT_HASH_LEN;
use crate::run_dir::{CMD_EXTENSION, DATA_EXTENSION, ENTRY_EXTENSIONS, RunDirectory};
use crate::{Error, Result};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Display format for the last run column
const DATE_FORMAT: &str = "%m-%d at %H:%M:%S";

/// A cached command as shown by `--list-caches`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    /// Short hash identifying the entry
    pub hash: String,
    /// Command line as it was run
    pub command_line: String,
    /// Time of the last completed run
    pub last_update: DateTime<Local>,
}

/// Lists, resets and deletes entries in a run directory
#[derive(Debug, Clone)]
pub struct CacheRegistry {
    run_dir: RunDirectory,
}

impl CacheRegistry {
    /// Create a registry over `run_dir`
    #[must_use]
    pub fn new(run_dir: RunDirectory) -> Self {
        Self { run_dir }
    }

    /// Every entry with a recorded command line, most recent first
    pub fn list(&self) -> Result<Vec<CommandInfo>> {
        let mut commands: Vec<CommandInfo> = self
            .find_cache_files(None, Some(CMD_EXTENSION))?
            .iter()
            .filter_map(|path| read_command_info(path))
            .collect();

        commands.sort_by(|a, b| {
            b.last_update
                .cmp(&a.last_update)
                .then_with(|| a.hash.cmp(&b.hash))
        });
        Ok(commands)
    }

    /// Delete the cached output of the entry matching `identifier`, keeping
    /// its command line and any pid marker.
    pub fn reset(&self, identifier: &str) -> Result<PathBuf> {
        validate_identifier(identifier)?;

        let data = self
            .find_cache_files(Some(identifier), Some(DATA_EXTENSION))?
            .into_iter()
            .next()
            .ok_or_else(|| no_match(identifier))?;

        remove(&data)?;
        info!(identifier, path = %data.display(), "Reset cached output");
        Ok(data)
    }

    /// Delete every file of the entries matching `identifier`, or of all
    /// entries when no identifier is given. Returns the number of files
    /// removed.
    ///
    /// Deleting everything skips files that cannot be removed.
    pub fn delete(&self, identifier: Option<&str>) -> Result<usize> {
        let Some(identifier) = identifier else {
            let files = self.find_cache_files(None, None)?;
            let removed = files
                .iter()
                .filter(|path| match std::fs::remove_file(path) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Could not delete cache file");
                        false
                    }
                })
                .count();
            info!(removed, "Deleted all cache files");
            return Ok(removed);
        };

        validate_identifier(identifier)?;
        let files = self.find_cache_files(Some(identifier), None)?;
        if files.is_empty() {
            return Err(no_match(identifier));
        }

        for path in &files {
            remove(path)?;
        }
        info!(identifier, removed = files.len(), "Deleted cache entry");
        Ok(files.len())
    }

    /// Cache files in the run directory, filtered by stem prefix and
    /// extension. A missing run directory holds no files.
    fn find_cache_files(&self, prefix: Option<&str>, extension: Option<&str>) -> Result<Vec<PathBuf>> {
        let dir = self.run_dir.path();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(e, Some(dir.to_path_buf()), "read run directory")),
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
                    return false;
                };
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    return false;
                };
                ENTRY_EXTENSIONS.contains(&ext)
                    && extension.is_none_or(|wanted| wanted == ext)
                    && prefix.is_none_or(|p| stem.starts_with(p))
            })
            .collect();

        files.sort();
        debug!(dir = %dir.display(), ?prefix, ?extension, count = files.len(), "Found cache files");
        Ok(files)
    }
}

/// Render entries as a three column table
#[must_use]
pub fn render_table(commands: &[CommandInfo]) -> String {
    if commands.is_empty() {
        return "No cached commands found.\n".to_string();
    }

    let mut table = format!("{:<10}{:<20}{}\n", "Hash", "Last Run Date", "Command");
    for cmd in commands {
        let _ = writeln!(
            table,
            "{:<10}{:<20}{}",
            cmd.hash,
            cmd.last_update.format(DATE_FORMAT).to_string(),
            cmd.command_line
        );
    }
    table
}

fn read_command_info(path: &Path) -> Option<CommandInfo> {
    let command_line = std::fs::read_to_string(path).ok()?;
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let stem = path.file_stem()?.to_str()?;

    Some(CommandInfo {
        hash: stem.chars().take(SHORT_HASH_LEN).collect(),
        command_line: command_line.trim_end().to_string(),
        last_update: DateTime::<Local>::from(modified),
    })
}

fn validate_identifier(identifier: &str) -> Result<()> {
    if identifier.is_empty() {
        return Err(Error::file("cache identifier must not be empty"));
    }
    Ok(())
}

fn no_match(identifier: &str) -> Error {
    Error::file(format!("no cache file found with identifier: {identifier}"))
}

fn remove(path: &Path) -> Result<()> {
    std::fs::remove_file(path).map_err(|e| Error::io(e, Some(path.to_path_buf()), "delete cache file"))
}
