use thiserror::Error;

/// Tailbrain error types, one nested enum per concern
#[derive(Error, Debug)]
pub enum TailbrainError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Command `{command}` exited with status {exit_status}: {stderr}")]
    CommandFailed {
        command: String,
        exit_status: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Generic error: {0}")]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found at path: {path}")]
    FileNotFound { path: String },

    #[error("Invalid config file format: {reason}")]
    InvalidFormat { reason: String },

    #[error("Invalid value {value:?} for {option}: {reason}")]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },
}

/// Failures talking to, or reported by, the host command relay.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Relay unreachable or the request timed out. Safe to retry.
    #[error("Relay at {url} is unavailable: {reason}")]
    Unavailable { url: String, reason: String },

    /// The relay refused the request (bad request or program not allowed).
    #[error("Relay refused `{command}` (HTTP {status}): {message}")]
    Rejected {
        command: String,
        status: u16,
        message: String,
    },

    /// The relay could not launch the process, or killed it on timeout.
    #[error("Relay failed to execute `{command}`: {message}")]
    Execution {
        command: String,
        message: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Relay returned an unexpected response for `{command}`: {reason}")]
    InvalidResponse { command: String, reason: String },
}

impl RelayError {
    pub fn is_transport(&self) -> bool {
        matches!(self, RelayError::Unavailable { .. })
    }
}

/// Tool output that did not have the expected shape.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("failed to parse {format} output: {reason}")]
pub struct ParseError {
    pub format: &'static str,
    pub reason: String,
    /// The offending raw text, kept for operator diagnosis.
    pub raw: String,
}

impl ParseError {
    pub fn new(format: &'static str, reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            format,
            reason: reason.into(),
            raw: raw.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid port {value:?}: must be an integer between 1 and 65535")]
    InvalidPort { value: String },

    #[error("Invalid {field} {value:?}")]
    InvalidIdentifier { field: String, value: String },

    #[error("Path must be a .yml or .yaml file: {path}")]
    InvalidComposePath { path: String },

    #[error("Invalid {field}: {reason}")]
    InvalidArguments { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read registry file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry file {path} is not a valid app list: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write registry file {path}: {reason}")]
    Write { path: String, reason: String },
}

/// Convenience type alias for Tailbrain results
pub type Result<T, E = TailbrainError> = std::result::Result<T, E>;
