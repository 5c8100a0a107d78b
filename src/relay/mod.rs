//! Host Command Relay: a small HTTP gateway that runs allow-listed host
//! programs on behalf of the containerized dashboard.

pub mod executor;

pub use executor::{ExecError, Executor};

use crate::command::{HostCommand, split_command_line};
use crate::config::RelayConfig;
use crate::error::{Result, TailbrainError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

/// Largest accepted `/execute` body.
const MAX_REQUEST_BYTES: u64 = 64 * 1024;

/// Body of `POST /execute`.
///
/// With `args` present the command is `[command] ++ args`. Without it,
/// `command` is a full command line split with POSIX-like quoting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ExecuteRequest {
    pub fn from_command(command: &HostCommand) -> Self {
        Self {
            command: Some(command.program.clone()),
            args: Some(command.args.clone()),
            cwd: command.cwd.clone(),
            timeout_secs: command.timeout.map(|t| t.as_secs().max(1)),
        }
    }

    pub fn into_command(self) -> std::result::Result<HostCommand, String> {
        let line = self
            .command
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| "Command is required".to_string())?;

        let mut argv = match self.args {
            Some(args) => std::iter::once(line.trim().to_string()).chain(args).collect(),
            None => split_command_line(&line).map_err(|e| format!("Invalid command line: {}", e))?,
        };
        if argv.is_empty() {
            return Err("Command is required".to_string());
        }

        let program = argv.remove(0);
        let mut command = HostCommand::new(program).args(argv);
        if let Some(dir) = self.cwd {
            command = command.current_dir(dir);
        }
        match self.timeout_secs {
            Some(0) => return Err("timeoutSecs must be positive".to_string()),
            Some(secs) => command = command.timeout(Duration::from_secs(secs)),
            None => {}
        }
        Ok(command)
    }
}

/// Error body for 400/403 relay responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayErrorBody {
    pub error: String,
}

/// Error body for 500 relay responses: launch failure or timeout.
///
/// `code` is the OS error number of a launch failure and `null` otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionErrorBody {
    pub error: String,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub code: Option<i32>,
}

#[derive(Debug)]
enum RelayRejection {
    BadRequest(String),
    Exec(ExecError),
}

impl warp::reject::Reject for RelayRejection {}

/// Relay gateway server
pub struct RelayServer {
    executor: Arc<Executor>,
    addr: SocketAddr,
}

impl RelayServer {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            executor: Arc::new(Executor::new(config)),
            addr: SocketAddr::new(config.bind, config.port),
        }
    }

    pub fn with_address(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub async fn start(self) -> Result<()> {
        info!("🛰️  Starting host command relay on {}", self.addr);
        if !self.addr.ip().is_loopback() {
            warn!(
                "⚠️  Relay is bound to non-loopback address {}; it has no authentication, restrict access to the dashboard host",
                self.addr
            );
        }
        let allowed: Vec<&str> = self.executor.allowed_programs().collect();
        info!("Allowed programs: {}", allowed.join(", "));

        let (addr, server) = warp::serve(routes(self.executor.clone()))
            .try_bind_with_graceful_shutdown(self.addr, shutdown_signal())
            .map_err(|e| {
                TailbrainError::Other(anyhow::anyhow!("failed to bind relay on {}: {}", self.addr, e))
            })?;

        info!("✅ Relay listening on http://{}", addr);
        server.await;
        info!("Relay stopped");
        Ok(())
    }
}

pub(crate) async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// All relay routes with error recovery, CORS and access logging.
pub fn routes(
    executor: Arc<Executor>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "status": "ok" })));

    let test = warp::path("test")
        .and(warp::path::end())
        .and(warp::get())
        .map(test_reply);

    let execute = warp::path("execute")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_REQUEST_BYTES))
        .and(warp::body::bytes())
        .and_then(move |body: Bytes| {
            let executor = executor.clone();
            async move { execute_handler(executor, body).await }
        });

    health
        .or(test)
        .or(execute)
        .with(warp::cors().allow_any_origin().allow_methods(vec!["GET", "POST"]).allow_header("content-type"))
        .recover(handle_rejection)
        .with(warp::log("tailbrain::relay"))
}

fn test_reply() -> warp::reply::Json {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string());
    warp::reply::json(&json!({
        "status": "ok",
        "message": "Host command relay is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "hostname": hostname,
    }))
}

async fn execute_handler(
    executor: Arc<Executor>,
    body: Bytes,
) -> std::result::Result<warp::reply::Json, Rejection> {
    let request: ExecuteRequest = serde_json::from_slice(&body).map_err(|e| {
        warp::reject::custom(RelayRejection::BadRequest(format!("Invalid request body: {}", e)))
    })?;
    let command = request
        .into_command()
        .map_err(|e| warp::reject::custom(RelayRejection::BadRequest(e)))?;

    // Detached so a caller that disconnects does not take the host process
    // down with the request; only the timeout kills it.
    let rendered = command.to_string();
    let outcome = tokio::spawn(async move { executor.run(&command).await })
        .await
        .map_err(|e| ExecError::Io {
            command: rendered,
            source: std::io::Error::other(e),
        })
        .and_then(|run| run);

    match outcome {
        Ok(result) => Ok(warp::reply::json(&result)),
        Err(e) => Err(warp::reject::custom(RelayRejection::Exec(e))),
    }
}

async fn handle_rejection(err: Rejection) -> std::result::Result<impl Reply, Infallible> {
    let reply = if let Some(RelayRejection::Exec(e)) = err.find::<RelayRejection>() {
        match e {
            ExecError::NotAllowed { .. } => error_reply(StatusCode::FORBIDDEN, &e.to_string()),
            _ => warp::reply::with_status(
                warp::reply::json(&execution_body(e)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        }
    } else if let Some(RelayRejection::BadRequest(reason)) = err.find::<RelayRejection>() {
        error_reply(StatusCode::BAD_REQUEST, reason)
    } else if err.is_not_found() {
        error_reply(StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        error_reply(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        error_reply(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        error_reply(StatusCode::LENGTH_REQUIRED, "Content-Length required")
    } else {
        warn!("Unhandled relay rejection: {:?}", err);
        error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    };

    Ok(reply)
}

fn error_reply(status: StatusCode, error: &str) -> warp::reply::WithStatus<warp::reply::Json> {
    let body = RelayErrorBody {
        error: error.to_string(),
    };
    warp::reply::with_status(warp::reply::json(&body), status)
}

fn execution_body(error: &ExecError) -> ExecutionErrorBody {
    match error {
        ExecError::TimedOut {
            command,
            after,
            stdout,
            stderr,
        } => ExecutionErrorBody {
            error: format!("Command `{}` timed out after {}s", command, after.as_secs()),
            stdout: stdout.clone(),
            stderr: stderr.clone(),
            code: None,
        },
        ExecError::Launch { source, .. } => ExecutionErrorBody {
            error: error.to_string(),
            code: source.raw_os_error(),
            ..ExecutionErrorBody::default()
        },
        _ => ExecutionErrorBody {
            error: error.to_string(),
            ..ExecutionErrorBody::default()
        },
    }
}
