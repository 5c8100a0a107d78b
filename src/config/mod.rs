use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Programs the relay will run unless configured otherwise.
pub const DEFAULT_ALLOWED_COMMANDS: &[&str] = &["docker", "tailscale", "docker-compose"];

/// Name of the compose registry document inside the data directory.
pub const REGISTRY_FILE_NAME: &str = "compose-apps.json";

/// Complete configuration: defaults, then an optional TOML file, then
/// environment variables, then command-line flags.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TailbrainConfig {
    pub relay: RelayConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
}

/// Host-side relay gateway settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub allowed_commands: Vec<String>,
    /// Executable overrides, keyed by the program name a request uses.
    pub program_paths: BTreeMap<String, PathBuf>,
    pub default_timeout_secs: u64,
    pub max_timeout_secs: u64,
    pub max_output_bytes: usize,
}

/// Dashboard API server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub relay_url: String,
    pub data_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub compose_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
    pub json: bool,
    pub file: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 7655,
            allowed_commands: DEFAULT_ALLOWED_COMMANDS.iter().map(|c| c.to_string()).collect(),
            program_paths: BTreeMap::new(),
            default_timeout_secs: 30,
            max_timeout_secs: 900,
            max_output_bytes: 8 * 1024 * 1024,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 7654,
            relay_url: "http://host.docker.internal:7655".to_string(),
            data_dir: default_data_dir(),
            request_timeout_secs: 30,
            compose_timeout_secs: 600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("tailbrain"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

impl RelayConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn max_timeout(&self) -> Duration {
        Duration::from_secs(self.max_timeout_secs)
    }
}

impl DashboardConfig {
    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join(REGISTRY_FILE_NAME)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn compose_timeout(&self) -> Duration {
        Duration::from_secs(self.compose_timeout_secs)
    }
}

/// One recognized option, as enumerated at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOption {
    pub env: &'static str,
    pub description: &'static str,
    pub value: String,
}

impl TailbrainConfig {
    /// Load defaults, the optional config file, and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::InvalidFormat {
            reason: e.to_string(),
        })
    }

    /// Overlay environment variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("HOST_RELAY_URL") {
            self.dashboard.relay_url = url.trim().to_string();
        }
        if let Some(v) = parse_var(&var, "DASHBOARD_BIND")? {
            self.dashboard.bind = v;
        }
        if let Some(v) = parse_var(&var, "DASHBOARD_PORT")? {
            self.dashboard.port = v;
        }
        if let Some(dir) = var("DATA_DIR") {
            self.dashboard.data_dir = PathBuf::from(dir);
        }
        if let Some(v) = parse_var(&var, "RELAY_REQUEST_TIMEOUT_SECS")? {
            self.dashboard.request_timeout_secs = v;
        }
        if let Some(v) = parse_var(&var, "COMPOSE_TIMEOUT_SECS")? {
            self.dashboard.compose_timeout_secs = v;
        }

        if let Some(v) = parse_var(&var, "RELAY_BIND")? {
            self.relay.bind = v;
        }
        if let Some(v) = parse_var(&var, "RELAY_PORT")? {
            self.relay.port = v;
        }
        if let Some(list) = var("RELAY_ALLOWED_COMMANDS") {
            self.relay.allowed_commands = list
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = parse_var(&var, "RELAY_DEFAULT_TIMEOUT_SECS")? {
            self.relay.default_timeout_secs = v;
        }
        if let Some(v) = parse_var(&var, "RELAY_MAX_TIMEOUT_SECS")? {
            self.relay.max_timeout_secs = v;
        }
        if let Some(v) = parse_var(&var, "RELAY_MAX_OUTPUT_BYTES")? {
            self.relay.max_output_bytes = v;
        }
        for (env, program) in [
            ("DOCKER_CMD_PATH", "docker"),
            ("TAILSCALE_CMD_PATH", "tailscale"),
            ("DOCKER_COMPOSE_CMD_PATH", "docker-compose"),
        ] {
            if let Some(path) = var(env) {
                self.relay
                    .program_paths
                    .insert(program.to_string(), PathBuf::from(path));
            }
        }

        if let Some(filter) = var("TAILBRAIN_LOG").or_else(|| var("RUST_LOG")) {
            self.logging.filter = filter;
        }
        if let Some(json) = var("TAILBRAIN_LOG_JSON") {
            self.logging.json = parse_bool("TAILBRAIN_LOG_JSON", &json)?;
        }
        if let Some(file) = var("TAILBRAIN_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        reqwest::Url::parse(&self.dashboard.relay_url).map_err(|e| ConfigError::InvalidValue {
            option: "HOST_RELAY_URL".to_string(),
            value: self.dashboard.relay_url.clone(),
            reason: e.to_string(),
        })?;

        if self.relay.default_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                option: "RELAY_DEFAULT_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }
        if self.relay.max_timeout_secs < self.relay.default_timeout_secs {
            return Err(ConfigError::InvalidValue {
                option: "RELAY_MAX_TIMEOUT_SECS".to_string(),
                value: self.relay.max_timeout_secs.to_string(),
                reason: format!(
                    "must not be lower than the default timeout ({}s)",
                    self.relay.default_timeout_secs
                ),
            });
        }
        Ok(())
    }

    /// Every recognized option with its effective value.
    pub fn options(&self) -> Vec<ConfigOption> {
        let path = |program: &str| {
            self.relay
                .program_paths
                .get(program)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| format!("(PATH lookup of `{}`)", program))
        };

        vec![
            option("HOST_RELAY_URL", "Relay base URL used by the dashboard", self.dashboard.relay_url.clone()),
            option("DASHBOARD_BIND", "Dashboard API listen address", self.dashboard.bind.to_string()),
            option("DASHBOARD_PORT", "Dashboard API listen port", self.dashboard.port.to_string()),
            option("DATA_DIR", "Directory holding compose-apps.json", self.dashboard.data_dir.display().to_string()),
            option("RELAY_REQUEST_TIMEOUT_SECS", "Default host command timeout", self.dashboard.request_timeout_secs.to_string()),
            option("COMPOSE_TIMEOUT_SECS", "Timeout for docker-compose up/down", self.dashboard.compose_timeout_secs.to_string()),
            option("RELAY_BIND", "Relay listen address", self.relay.bind.to_string()),
            option("RELAY_PORT", "Relay listen port", self.relay.port.to_string()),
            option("RELAY_ALLOWED_COMMANDS", "Programs the relay may run", self.relay.allowed_commands.join(",")),
            option("RELAY_DEFAULT_TIMEOUT_SECS", "Relay timeout when a request names none", self.relay.default_timeout_secs.to_string()),
            option("RELAY_MAX_TIMEOUT_SECS", "Upper bound on a requested timeout", self.relay.max_timeout_secs.to_string()),
            option("RELAY_MAX_OUTPUT_BYTES", "Cap on captured stdout/stderr each", self.relay.max_output_bytes.to_string()),
            option("DOCKER_CMD_PATH", "Executable used for `docker`", path("docker")),
            option("TAILSCALE_CMD_PATH", "Executable used for `tailscale`", path("tailscale")),
            option("DOCKER_COMPOSE_CMD_PATH", "Executable used for `docker-compose`", path("docker-compose")),
            option("TAILBRAIN_LOG", "Log filter directive", self.logging.filter.clone()),
            option("TAILBRAIN_LOG_JSON", "Emit JSON logs", self.logging.json.to_string()),
            option(
                "TAILBRAIN_LOG_FILE",
                "Daily-rolling JSON log file",
                self.logging
                    .file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(disabled)".to_string()),
            ),
        ]
    }

    pub fn log_options(&self) {
        for opt in self.options() {
            info!("  {} = {}  ({})", opt.env, opt.value, opt.description);
        }
    }
}

fn option(env: &'static str, description: &'static str, value: String) -> ConfigOption {
    ConfigOption {
        env,
        description,
        value,
    }
}

fn parse_var<T, F>(var: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                option: name.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        None => Ok(None),
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            option: name.to_string(),
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
