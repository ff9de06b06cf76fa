//! Output-caching command execution for cacherun
//!
//! This crate memoizes the standard output of external commands in a flat
//! run directory:
//! - Cache keys are SHA-256 digests of the space-joined command line
//! - Fresh output is replayed without running the command again
//! - Stale output triggers a run whose stdout is teed to the caller and the
//!   cache, while stderr is only forwarded
//! - A pid marker plus a process-table check detects a concurrent run of the
//!   same command
//!
//! # Layout
//!
//! Every entry is up to three files named after its key: `<key>.data` holds
//! the captured output, `<key>.pid` the process id of an in-flight run and
//! `<key>.cmd` the command line for display. [`CacheRegistry`] lists, resets
//! and deletes entries by hash prefix.

pub mod cleanup;
pub mod detector;
pub mod error;
pub mod executor;
pub mod key;
pub mod registry;
pub mod resolve;
pub mod run_dir;
pub mod runner;
pub mod state;

pub use error::{Error, Result};
pub use executor::{DEFAULT_CACHE_TIME, ExecutorConfig, OutputCachingExecutor, RunOutcome};
pub use key::CacheKey;
pub use registry::{CacheRegistry, CommandInfo, render_table};
pub use run_dir::{CacheEntryPaths, RunDirectory};
pub use state::CacheState;
