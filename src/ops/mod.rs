//! Domain operations: build a host command, run it through a
//! [`CommandRunner`], parse the output.
//!
//! Mutations are fire-and-observe. Success means the host command completed
//! with exit status 0, not that the requested end state holds.

pub mod compose;
pub mod docker;
pub mod tailscale;
pub mod validate;

pub use docker::{ContainerLogs, NetworkSpec};
pub use tailscale::FunnelProtocol;

use crate::client::CommandRunner;
use crate::command::{CommandResult, HostCommand};
use crate::error::{Result, TailbrainError};
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_COMPOSE_TIMEOUT: Duration = Duration::from_secs(600);

/// Result of a mutation: `{success, message, output}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
    pub output: String,
}

impl ActionOutcome {
    fn completed(message: impl Into<String>, result: CommandResult) -> Self {
        Self {
            success: true,
            message: message.into(),
            output: result.stdout,
        }
    }
}

/// Entry point for every host-facing operation.
#[derive(Clone)]
pub struct HostOps {
    runner: Arc<dyn CommandRunner>,
    compose_timeout: Duration,
}

impl HostOps {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            compose_timeout: DEFAULT_COMPOSE_TIMEOUT,
        }
    }

    pub fn with_compose_timeout(mut self, timeout: Duration) -> Self {
        self.compose_timeout = timeout;
        self
    }

    /// Run a command and require exit status 0.
    async fn run(&self, command: HostCommand) -> Result<CommandResult> {
        let result = self.runner.run_host_command(&command).await?;
        if !result.success() {
            return Err(TailbrainError::CommandFailed {
                command: command.to_string(),
                exit_status: result.exit_status,
                stdout: result.stdout,
                stderr: result.stderr,
            });
        }
        if result.has_stderr() {
            warn!("`{}` wrote to stderr: {}", command, result.stderr.trim());
        }
        debug!("`{}` completed ({} bytes of output)", command, result.stdout.len());
        Ok(result)
    }
}

/// Collapse any failure into `T::default()`, logging it.
///
/// For reads whose callers prefer an empty answer over an error.
pub fn best_effort<T, E>(context: &str, result: std::result::Result<T, E>) -> T
where
    T: Default,
    E: Display,
{
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("{} failed, returning empty result: {}", context, e);
            T::default()
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::client::MockCommandRunner;
    use crate::error::RelayError;

    #[test]
    fn test_best_effort_defaults_on_error() {
        let value: Vec<u8> = best_effort("read", Err::<Vec<u8>, _>("boom"));
        assert!(value.is_empty());
        assert_eq!(best_effort("read", Ok::<_, String>(vec![1u8])), vec![1]);
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_command_failed() {
        let runner = expect_argv(&["docker", "stop", "web"], failed(1, "No such container: web"));
        let ops = HostOps::new(Arc::new(runner));
        let err = ops.stop_container("web").await.unwrap_err();
        match err {
            TailbrainError::CommandFailed {
                exit_status, stderr, ..
            } => {
                assert_eq!(exit_status, 1);
                assert_eq!(stderr, "No such container: web");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_stderr_with_success_is_not_an_error() {
        let result = CommandResult {
            stderr: "WARNING: something".to_string(),
            ..ok("web\n")
        };
        let runner = expect_argv(&["docker", "restart", "web"], result);
        let ops = HostOps::new(Arc::new(runner));
        let outcome = ops.restart_container("web").await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.output, "web\n");
    }

    #[tokio::test]
    async fn test_transport_error_passes_through() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run_host_command().returning(|_| {
            Err(RelayError::Unavailable {
                url: "http://relay:7655".to_string(),
                reason: "connection refused".to_string(),
            })
        });
        let ops = HostOps::new(Arc::new(runner));
        let err = ops.list_containers().await.unwrap_err();
        assert!(matches!(err, TailbrainError::Relay(e) if e.is_transport()));
    }
}
