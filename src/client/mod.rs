//! Client side of the relay protocol.

use crate::command::{CommandResult, HostCommand};
use crate::error::RelayError;
use crate::relay::{ExecuteRequest, ExecutionErrorBody, RelayErrorBody};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Extra time the HTTP call waits beyond the command timeout, so the relay
/// reports its own timeout before the client gives up.
pub const TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Runs one command on the host. Domain operations only see this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run_host_command(&self, command: &HostCommand) -> Result<CommandResult, RelayError>;
}

/// HTTP client for a relay gateway
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: Client,
    base_url: String,
    default_timeout: Duration,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>, default_timeout: Duration) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            default_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /health` on the relay.
    pub async fn health(&self) -> Result<(), RelayError> {
        let url = self.url("/health");
        let response = self
            .client
            .get(&url)
            .timeout(self.default_timeout)
            .send()
            .await
            .map_err(|e| self.unavailable(&e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(RelayError::Unavailable {
                url,
                reason: format!("health check returned HTTP {}", response.status()),
            })
        }
    }

    fn unavailable(&self, error: &reqwest::Error) -> RelayError {
        let reason = if error.is_timeout() {
            format!("request timed out: {}", error)
        } else if error.is_connect() {
            format!("connection failed: {}", error)
        } else {
            error.to_string()
        };
        RelayError::Unavailable {
            url: self.base_url.clone(),
            reason,
        }
    }
}

#[async_trait]
impl CommandRunner for RelayClient {
    async fn run_host_command(&self, command: &HostCommand) -> Result<CommandResult, RelayError> {
        let timeout = command.timeout.unwrap_or(self.default_timeout);
        let rendered = command.to_string();
        let request = ExecuteRequest::from_command(&command.clone().timeout(timeout));

        debug!("Sending `{}` to relay at {}", rendered, self.base_url);
        let response = self
            .client
            .post(self.url("/execute"))
            .json(&request)
            .timeout(timeout + TIMEOUT_GRACE)
            .send()
            .await
            .map_err(|e| {
                warn!("Relay call for `{}` failed: {}", rendered, e);
                self.unavailable(&e)
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.unavailable(&e))?;

        match status {
            StatusCode::OK => serde_json::from_slice::<CommandResult>(&body).map_err(|e| {
                RelayError::InvalidResponse {
                    command: rendered,
                    reason: format!("malformed result body: {}", e),
                }
            }),
            StatusCode::BAD_REQUEST | StatusCode::FORBIDDEN => {
                let message = serde_json::from_slice::<RelayErrorBody>(&body)
                    .map(|b| b.error)
                    .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
                Err(RelayError::Rejected {
                    command: rendered,
                    status: status.as_u16(),
                    message,
                })
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                let error = match serde_json::from_slice::<ExecutionErrorBody>(&body) {
                    Ok(b) => RelayError::Execution {
                        command: rendered,
                        message: b.error,
                        code: b.code,
                        stdout: b.stdout,
                        stderr: b.stderr,
                    },
                    Err(_) => RelayError::Execution {
                        command: rendered,
                        message: String::from_utf8_lossy(&body).into_owned(),
                        code: None,
                        stdout: String::new(),
                        stderr: String::new(),
                    },
                };
                Err(error)
            }
            other => Err(RelayError::InvalidResponse {
                command: rendered,
                reason: format!("unexpected HTTP status {}", other),
            }),
        }
    }
}
