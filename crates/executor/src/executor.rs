//! Output-caching executor: serve fresh cached output or run the command

use crate::key::{CacheKey, join_command_line};
use crate::resolve::{ensure_not_relative, resolve_command};
use crate::run_dir::RunDirectory;
use crate::runner::{run_and_capture, write_live};
use crate::state::{CacheState, evaluate};
use crate::{Error, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use tracing::{debug, info};

/// Default freshness window
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(60);

/// Executor configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// How long cached output stays fresh
    pub cache_time: Duration,
    /// Run directory override; the platform location is used when unset
    pub run_dir: Option<PathBuf>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            cache_time: DEFAULT_CACHE_TIME,
            run_dir: None,
        }
    }
}

/// Result of a successful invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Fresh cached output was written to the caller
    Cached,
    /// The command ran and its output was cached
    Executed {
        /// Exit status of the command
        status: ExitStatus,
    },
    /// Another invocation is still producing the first result
    AwaitingFirstResult,
}

/// Memoizes the standard output of commands in a run directory
#[derive(Debug, Clone)]
pub struct OutputCachingExecutor {
    cache_time: Duration,
    run_dir: RunDirectory,
}

impl OutputCachingExecutor {
    /// Create an executor from configuration
    #[must_use]
    pub fn new(config: ExecutorConfig) -> Self {
        let run_dir = config
            .run_dir
            .map_or_else(RunDirectory::locate, RunDirectory::new);
        Self::with_run_directory(config.cache_time, run_dir)
    }

    /// Create an executor over an explicit run directory
    #[must_use]
    pub fn with_run_directory(cache_time: Duration, run_dir: RunDirectory) -> Self {
        Self { cache_time, run_dir }
    }

    /// The run directory this executor was configured with
    #[must_use]
    pub fn run_directory(&self) -> &RunDirectory {
        &self.run_dir
    }

    /// Run `argv` or replay its cached output.
    ///
    /// Standard output goes to `out` whether it comes from the cache or the
    /// live command; the command's standard error goes to `err` and is never
    /// cached.
    pub async fn run_cached_command<O, E>(
        &self,
        argv: &[OsString],
        out: &mut O,
        err: &mut E,
    ) -> Result<RunOutcome>
    where
        O: Write,
        E: Write,
    {
        let command = argv
            .first()
            .ok_or_else(|| Error::bad_command("no command given"))?;
        let command = command
            .to_str()
            .ok_or_else(|| Error::hash_failure(command.to_string_lossy()))?;
        ensure_not_relative(command)?;

        let key = CacheKey::derive(argv)?;
        let run_dir = self.run_dir.clone().ensure()?;
        let entry = run_dir.entry(&key);

        match evaluate(&entry, &key, self.cache_time) {
            CacheState::AwaitingFirstResult => {
                info!(key = %key.short(), "Command already running, no output yet");
                return Ok(RunOutcome::AwaitingFirstResult);
            }
            CacheState::Fresh => {
                debug!(key = %key.short(), "Serving cached output");
                let data = tokio::fs::read(&entry.data)
                    .await
                    .map_err(|e| Error::io(e, Some(entry.data.clone()), "read cache data"))?;
                write_live(out, &data, "stdout");
                return Ok(RunOutcome::Cached);
            }
            CacheState::Stale => {
                debug!(key = %key.short(), "Cache is stale, running command");
            }
        }

        let path_env = std::env::var_os("PATH");
        let program = resolve_command(command, path_env.as_deref())?;
        let status = run_and_capture(&program, argv, &entry, out, err).await?;

        let command_line = join_command_line(argv)?;
        tokio::fs::write(&entry.cmd, &command_line)
            .await
            .map_err(|e| Error::io(e, Some(entry.cmd.clone()), "write command line"))?;

        info!(key = %key.short(), command = %command_line, "Cached command output");
        Ok(RunOutcome::Executed { status })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::registry::CacheRegistry;
    use tempfile::TempDir;

    fn argv(parts: &[&str]) -> Vec<OsString> {
        parts.iter().map(OsString::from).collect()
    }

    fn executor(temp: &TempDir, cache_time: Duration) -> OutputCachingExecutor {
        OutputCachingExecutor::with_run_directory(cache_time, RunDirectory::new(temp.path()))
    }

    async fn run(executor: &OutputCachingExecutor, argv: &[OsString]) -> (RunOutcome, String) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let outcome = executor
            .run_cached_command(argv, &mut out, &mut err)
            .await
            .unwrap();
        (outcome, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_cached_execution() {
        let temp = TempDir::new().unwrap();
        let executor = executor(&temp, Duration::from_secs(1));
        let argv = argv(&["/bin/sh", "-c", "echo Thu Jan  1 00:00:00 UTC 1970"]);
        let entry = executor.run_directory().entry(&CacheKey::derive(&argv).unwrap());

        let (outcome, output) = run(&executor, &argv).await;
        assert!(matches!(outcome, RunOutcome::Executed { status } if status.success()));
        assert_eq!(output.trim(), "Thu Jan 1 00:00:00 UTC 1970");

        // Inject different content; a fresh entry is served untouched
        std::fs::write(&entry.data, "Thu Jan  2 00:00:00 UTC 1970\n").unwrap();
        let (outcome, output) = run(&executor, &argv).await;
        assert_eq!(outcome, RunOutcome::Cached);
        assert_eq!(output.trim(), "Thu Jan  2 00:00:00 UTC 1970");

        // Past the cache time the command runs again and overwrites the data
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let (outcome, output) = run(&executor, &argv).await;
        assert!(matches!(outcome, RunOutcome::Executed { .. }));
        assert_eq!(output.trim(), "Thu Jan 1 00:00:00 UTC 1970");
        assert_eq!(
            std::fs::read_to_string(&entry.data).unwrap().trim(),
            "Thu Jan 1 00:00:00 UTC 1970"
        );
    }

    #[tokio::test]
    async fn test_cmd_file_records_command_line() {
        let temp = TempDir::new().unwrap();
        let executor = executor(&temp, Duration::from_secs(60));
        let argv = argv(&["/bin/sh", "-c", "echo listed"]);

        run(&executor, &argv).await;

        let commands = CacheRegistry::new(executor.run_directory().clone())
            .list()
            .unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command_line, "/bin/sh -c echo listed");
        assert_eq!(commands[0].hash, CacheKey::derive(&argv).unwrap().short());
    }

    #[tokio::test]
    async fn test_reset_forces_rerun_and_keeps_history() {
        let temp = TempDir::new().unwrap();
        let executor = executor(&temp, Duration::from_secs(60));
        let counter = temp.path().join("runs");
        let script = format!("echo x >> {0}; wc -l < {0}", counter.display());
        let argv = argv(&["/bin/sh", "-c", &script]);
        let key = CacheKey::derive(&argv).unwrap();
        let registry = CacheRegistry::new(executor.run_directory().clone());

        let (_, first) = run(&executor, &argv).await;
        let (outcome, cached) = run(&executor, &argv).await;
        assert_eq!(outcome, RunOutcome::Cached);
        assert_eq!(first, cached);

        registry.reset(key.short()).unwrap();
        assert_eq!(registry.list().unwrap().len(), 1);

        let (outcome, second) = run(&executor, &argv).await;
        assert!(matches!(outcome, RunOutcome::Executed { .. }));
        assert_eq!(first.trim(), "1");
        assert_eq!(second.trim(), "2");
    }

    #[tokio::test]
    async fn test_stderr_is_forwarded_not_cached() {
        let temp = TempDir::new().unwrap();
        let executor = executor(&temp, Duration::from_secs(60));
        let argv = argv(&["/bin/ls", "i-dont-exist-in-the-fs"]);

        let (mut out, mut err) = (Vec::new(), Vec::new());
        let outcome = executor
            .run_cached_command(&argv, &mut out, &mut err)
            .await
            .unwrap();

        assert!(matches!(outcome, RunOutcome::Executed { status } if !status.success()));
        assert!(String::from_utf8_lossy(&err).contains("i-dont-exist-in-the-fs"));
        let entry = executor.run_directory().entry(&CacheKey::derive(&argv).unwrap());
        assert_eq!(std::fs::read(&entry.data).unwrap(), b"");
    }

    #[tokio::test]
    async fn test_relative_command_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let run_dir = temp.path().join("runs");
        let executor =
            OutputCachingExecutor::with_run_directory(DEFAULT_CACHE_TIME, RunDirectory::new(&run_dir));

        let result = executor
            .run_cached_command(&argv(&["./foo"]), &mut Vec::new(), &mut Vec::new())
            .await;

        assert!(matches!(result, Err(Error::BadCommand { .. })));
        assert!(!run_dir.exists());
    }

    #[tokio::test]
    async fn test_unknown_command_is_bad_command() {
        let temp = TempDir::new().unwrap();
        let executor = executor(&temp, DEFAULT_CACHE_TIME);

        let result = executor
            .run_cached_command(
                &argv(&["cacherun-no-such-command-anywhere"]),
                &mut Vec::new(),
                &mut Vec::new(),
            )
            .await;

        assert!(matches!(result, Err(Error::BadCommand { .. })));
    }

    #[tokio::test]
    async fn test_missing_absolute_command_is_system_error() {
        let temp = TempDir::new().unwrap();
        let executor = executor(&temp, DEFAULT_CACHE_TIME);

        let result = executor
            .run_cached_command(&argv(&["/fake/command"]), &mut Vec::new(), &mut Vec::new())
            .await;

        assert!(matches!(result, Err(Error::SystemError { .. })));
    }

    #[tokio::test]
    async fn test_empty_argv_is_bad_command() {
        let temp = TempDir::new().unwrap();
        let executor = executor(&temp, DEFAULT_CACHE_TIME);

        let result = executor
            .run_cached_command(&[], &mut Vec::new(), &mut Vec::new())
            .await;

        assert!(matches!(result, Err(Error::BadCommand { .. })));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }
    }

    #[tokio::test]
    async fn test_closed_stdout_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let executor = executor(&temp, Duration::from_secs(60));
        let argv = argv(&["/bin/sh", "-c", "echo piped"]);
        let entry = executor.run_directory().entry(&CacheKey::derive(&argv).unwrap());

        let outcome = executor
            .run_cached_command(&argv, &mut ClosedPipe, &mut Vec::new())
            .await
            .unwrap();
        assert!(matches!(outcome, RunOutcome::Executed { .. }));
        assert_eq!(std::fs::read(&entry.data).unwrap(), b"piped\n");

        let outcome = executor
            .run_cached_command(&argv, &mut ClosedPipe, &mut Vec::new())
            .await
            .unwrap();
        assert_eq!(outcome, RunOutcome::Cached);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_concurrent_run_without_output_is_awaiting() {
        let temp = TempDir::new().unwrap();
        let executor = executor(&temp, DEFAULT_CACHE_TIME);
        let argv = argv(&["sleep", "30"]);
        let entry = executor.run_directory().entry(&CacheKey::derive(&argv).unwrap());

        let mut running = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        std::fs::write(&entry.pid, running.id().to_string()).unwrap();

        let (mut out, mut err) = (Vec::new(), Vec::new());
        let outcome = executor.run_cached_command(&argv, &mut out, &mut err).await;

        running.kill().ok();
        running.wait().ok();
        assert_eq!(outcome.unwrap(), RunOutcome::AwaitingFirstResult);
        assert!(out.is_empty());
        assert!(err.is_empty());
        assert!(!entry.data.exists());
        assert!(!entry.cmd.exists());
    }

    #[test]
    fn test_config_default() {
        let config = ExecutorConfig::default();
        assert_eq!(config.cache_time, Duration::from_secs(60));
        assert!(config.run_dir.is_none());

        let executor = OutputCachingExecutor::new(ExecutorConfig {
            run_dir: Some(PathBuf::from("/custom/runs")),
            ..ExecutorConfig::default()
        });
        assert_eq!(executor.run_directory().path(), std::path::Path::new("/custom/runs"));
    }
}
