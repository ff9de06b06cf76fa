//! Child process execution with output teed to the caller and the cache.
//!
//! Each pipe is drained by its own task so the child never blocks on a full
//! pipe buffer. Chunks travel through a channel to a single consumer that
//! writes stdout to the live sink and the data file, and stderr to the live
//! error sink only.

use crate::cleanup::CleanupGuard;
use crate::run_dir::CacheEntryPaths;
use crate::{Error, Result};
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Read buffer size for each pipe
const CHUNK_SIZE: usize = 8 * 1024;

/// Output received from one of the child's pipes
#[derive(Debug)]
enum Chunk {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
}

/// Run `program` with the arguments in `argv[1..]`, streaming its output.
///
/// `argv[0]` becomes the child's process name, so the process table shows
/// the command line the cache key was derived from. The pid marker in
/// `entry` exists for as long as the child runs and is removed on every exit
/// path. Standard output accumulates in the data file; standard error is
/// only forwarded.
pub async fn run_and_capture<O, E>(
    program: &Path,
    argv: &[OsString],
    entry: &CacheEntryPaths,
    out: &mut O,
    err: &mut E,
) -> Result<ExitStatus>
where
    O: Write,
    E: Write,
{
    let pid_guard = CleanupGuard::new(|| {
        if std::fs::remove_file(&entry.pid).is_ok() {
            debug!(pid_file = %entry.pid.display(), "Removed pid marker");
        }
    });

    let mut cmd = Command::new(program);
    cmd.args(argv.iter().skip(1))
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        if let Some(arg0) = argv.first() {
            cmd.arg0(arg0);
        }
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| Error::io(e, Some(program.to_path_buf()), "spawn command"))?;

    if let Some(pid) = child.id() {
        std::fs::write(&entry.pid, pid.to_string())
            .map_err(|e| Error::io(e, Some(entry.pid.clone()), "write pid marker"))?;
        info!(pid, program = %program.display(), "Spawned command");
    }

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::io(pipe_missing(), None, "capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| Error::io(pipe_missing(), None, "capture stderr"))?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let stdout_task = spawn_reader(stdout, tx.clone(), Chunk::Stdout);
    let stderr_task = spawn_reader(stderr, tx, Chunk::Stderr);

    let mut data_file: Option<File> = None;
    let mut captured = 0usize;
    while let Some(chunk) = rx.recv().await {
        match chunk {
            Chunk::Stdout(bytes) => {
                write_live(out, &bytes, "stdout");
                if data_file.is_none() {
                    data_file = Some(create_data_file(&entry.data).await?);
                }
                if let Some(file) = data_file.as_mut() {
                    file.write_all(&bytes)
                        .await
                        .map_err(|e| Error::io(e, Some(entry.data.clone()), "write cache data"))?;
                }
                captured += bytes.len();
            }
            Chunk::Stderr(bytes) => write_live(err, &bytes, "stderr"),
        }
    }

    for task in [stdout_task, stderr_task] {
        task.await
            .map_err(|e| Error::io(std::io::Error::other(e), None, "join output reader"))?
            .map_err(|e| Error::io(e, None, "read command output"))?;
    }

    let status = child
        .wait()
        .await
        .map_err(|e| Error::io(e, Some(program.to_path_buf()), "wait for command"))?;
    pid_guard.cleanup();

    match data_file {
        Some(mut file) => file
            .flush()
            .await
            .map_err(|e| Error::io(e, Some(entry.data.clone()), "flush cache data"))?,
        None => {
            create_data_file(&entry.data).await?;
        }
    }

    if status.success() {
        debug!(bytes = captured, "Command finished");
    } else {
        warn!(code = ?status.code(), bytes = captured, "Command exited unsuccessfully");
    }

    Ok(status)
}

fn spawn_reader<R>(
    mut reader: R,
    tx: UnboundedSender<Chunk>,
    wrap: fn(Vec<u8>) -> Chunk,
) -> JoinHandle<std::io::Result<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 || tx.send(wrap(buf[..n].to_vec())).is_err() {
                return Ok(());
            }
        }
    })
}

async fn create_data_file(path: &Path) -> Result<File> {
    File::create(path)
        .await
        .map_err(|e| Error::io(e, Some(path.to_path_buf()), "create cache data"))
}

/// Write to a live sink; failures are logged and ignored
pub(crate) fn write_live<W: Write>(sink: &mut W, bytes: &[u8], stream: &str) {
    if let Err(e) = sink.write_all(bytes).and_then(|()| sink.flush()) {
        debug!(stream, error = %e, "Dropping live output");
    }
}

fn pipe_missing() -> std::io::Error {
    std::io::Error::other("pipe not available")
}
