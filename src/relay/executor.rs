//! Host-side process execution for the relay.

use crate::command::{CommandResult, HostCommand};
use crate::config::RelayConfig;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

/// How long to keep reading output once a timed-out child is killed.
/// Grandchildren may still hold the pipes open.
const DRAIN_AFTER_KILL: Duration = Duration::from_secs(2);

/// How long output pipes may stay open after the child itself exited.
pub const OUTPUT_GRACE: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 8 * 1024;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("program `{program}` is not allowed")]
    NotAllowed { program: String },

    #[error("failed to start `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` timed out after {}s", .after.as_secs())]
    TimedOut {
        command: String,
        after: Duration,
        stdout: String,
        stderr: String,
    },

    #[error("I/O error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Runs allow-listed programs directly, never through a shell.
#[derive(Debug, Clone)]
pub struct Executor {
    allowed: BTreeSet<String>,
    program_paths: BTreeMap<String, PathBuf>,
    default_timeout: Duration,
    max_timeout: Duration,
    max_output_bytes: usize,
}

impl Executor {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            allowed: config.allowed_commands.iter().cloned().collect(),
            program_paths: config.program_paths.clone(),
            default_timeout: config.default_timeout(),
            max_timeout: config.max_timeout(),
            max_output_bytes: config.max_output_bytes,
        }
    }

    pub fn is_allowed(&self, program: &str) -> bool {
        self.allowed.contains(program)
    }

    pub fn allowed_programs(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    /// Executable to spawn for `program`, honoring configured overrides.
    pub fn resolve(&self, program: &str) -> PathBuf {
        self.program_paths
            .get(program)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(program))
    }

    /// Requested timeout clamped to the relay maximum, or the default.
    pub fn effective_timeout(&self, requested: Option<Duration>) -> Duration {
        match requested {
            Some(t) if t > self.max_timeout => {
                debug!(
                    "Requested timeout {}s exceeds maximum, clamping to {}s",
                    t.as_secs(),
                    self.max_timeout.as_secs()
                );
                self.max_timeout
            }
            Some(t) => t,
            None => self.default_timeout,
        }
    }

    /// Run `command` to completion or until its timeout.
    ///
    /// The timeout bounds both the process and the collection of its output.
    /// A child that exits while a background grandchild keeps its pipes open
    /// gets at most [`OUTPUT_GRACE`] more for the pipes to close; whatever was
    /// captured by then is returned and flagged `truncated`.
    pub async fn run(&self, command: &HostCommand) -> Result<CommandResult, ExecError> {
        if !self.is_allowed(&command.program) {
            warn!("🚫 Refusing disallowed program: {}", command.program);
            return Err(ExecError::NotAllowed {
                program: command.program.clone(),
            });
        }

        let timeout = self.effective_timeout(command.timeout);
        let rendered = command.to_string();
        info!("▶️  Executing: {}", rendered);

        let mut process = Command::new(self.resolve(&command.program));
        process
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.cwd {
            process.current_dir(dir);
        }

        let started = Instant::now();
        let deadline = started + timeout;
        let mut child = process.spawn().map_err(|source| ExecError::Launch {
            program: command.program.clone(),
            source,
        })?;

        let limit = self.max_output_bytes;
        let mut stdout = Capture::new(child.stdout.take(), limit);
        let mut stderr = Capture::new(child.stderr.take(), limit);
        let io_error = |source: io::Error| ExecError::Io {
            command: rendered.clone(),
            source,
        };

        let status = loop {
            tokio::select! {
                status = child.wait() => break Some(status.map_err(io_error)?),
                read = stdout.read_chunk(), if stdout.is_open() => read.map_err(io_error)?,
                read = stderr.read_chunk(), if stderr.is_open() => read.map_err(io_error)?,
                _ = sleep_until(deadline) => break None,
            }
        };

        let Some(status) = status else {
            warn!("⏱️  `{}` timed out after {}s, killing", rendered, timeout.as_secs());
            if let Err(e) = child.kill().await {
                warn!("Failed to kill timed-out child: {}", e);
            }
            drain(&mut stdout, &mut stderr, Instant::now() + DRAIN_AFTER_KILL).await;
            return Err(ExecError::TimedOut {
                command: rendered,
                after: timeout,
                stdout: stdout.text(),
                stderr: stderr.text(),
            });
        };

        let closed = drain(
            &mut stdout,
            &mut stderr,
            deadline.min(Instant::now() + OUTPUT_GRACE),
        )
        .await;
        if !closed {
            warn!(
                "`{}` exited but its output pipes are still held open, returning partial output",
                rendered
            );
        }

        let result = CommandResult {
            exit_status: status.code().unwrap_or(-1),
            stdout: stdout.text(),
            stderr: stderr.text(),
            truncated: stdout.truncated || stderr.truncated || !closed,
        };

        info!(
            "✅ `{}` exited with {} in {:?}",
            rendered,
            result.exit_status,
            started.elapsed()
        );
        if result.success() && result.has_stderr() {
            warn!("`{}` succeeded but wrote to stderr: {}", rendered, result.stderr.trim());
        }
        if stdout.truncated || stderr.truncated {
            warn!("Output of `{}` truncated at {} bytes", rendered, limit);
        }

        Ok(result)
    }
}

/// One output pipe, read in chunks up to `limit` bytes. Bytes past the
/// limit are read and discarded so the child never blocks on a full pipe.
struct Capture<R> {
    reader: Option<R>,
    buf: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl<R: AsyncRead + Unpin> Capture<R> {
    fn new(reader: Option<R>, limit: usize) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            limit,
            truncated: false,
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Read one chunk; EOF closes the capture.
    async fn read_chunk(&mut self) -> io::Result<()> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(());
        };
        let mut chunk = [0u8; READ_CHUNK];
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            self.reader = None;
            return Ok(());
        }
        let keep = n.min(self.limit.saturating_sub(self.buf.len()));
        self.buf.extend_from_slice(&chunk[..keep]);
        if keep < n {
            self.truncated = true;
        }
        Ok(())
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}

/// Keep reading both pipes until they close or `until` passes. Returns
/// whether both closed.
async fn drain<A, B>(stdout: &mut Capture<A>, stderr: &mut Capture<B>, until: Instant) -> bool
where
    A: AsyncRead + Unpin,
    B: AsyncRead + Unpin,
{
    while stdout.is_open() || stderr.is_open() {
        tokio::select! {
            read = stdout.read_chunk(), if stdout.is_open() => {
                if let Err(e) = read {
                    debug!("stdout read failed: {}", e);
                    stdout.reader = None;
                }
            }
            read = stderr.read_chunk(), if stderr.is_open() => {
                if let Err(e) = read {
                    debug!("stderr read failed: {}", e);
                    stderr.reader = None;
                }
            }
            _ = sleep_until(until) => return false,
        }
    }
    true
}
