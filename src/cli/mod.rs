use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;
use tailbrain::TailbrainConfig;

#[derive(Parser)]
#[command(name = "tailbrain")]
#[command(about = "Tailscale serve/funnel and Docker dashboard backed by a host command relay")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the host command relay (on the Docker host)
    Relay {
        /// Listen address
        #[arg(long)]
        bind: Option<IpAddr>,

        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Allowed program (repeatable, replaces the configured list)
        #[arg(long = "allow")]
        allow: Vec<String>,
    },

    /// Run the dashboard API server
    Serve {
        /// Listen address
        #[arg(long)]
        bind: Option<IpAddr>,

        /// Listen port
        #[arg(short, long)]
        port: Option<u16>,

        /// Relay base URL
        #[arg(long)]
        relay_url: Option<String>,

        /// Directory holding compose-apps.json
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Send one command through the relay and print the result
    Exec {
        /// Relay base URL
        #[arg(long)]
        relay_url: Option<String>,

        /// Command timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Working directory on the host
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Program and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        argv: Vec<String>,
    },

    /// Print every recognized configuration option and its effective value
    Options,
}

impl Cli {
    /// Apply command-line flags, the last configuration layer.
    pub fn apply_overrides(&self, config: &mut TailbrainConfig) {
        if self.json_logs {
            config.logging.json = true;
        }

        match &self.command {
            Commands::Relay { bind, port, allow } => {
                if let Some(bind) = bind {
                    config.relay.bind = *bind;
                }
                if let Some(port) = port {
                    config.relay.port = *port;
                }
                if !allow.is_empty() {
                    config.relay.allowed_commands = allow.clone();
                }
            }
            Commands::Serve {
                bind,
                port,
                relay_url,
                data_dir,
            } => {
                if let Some(bind) = bind {
                    config.dashboard.bind = *bind;
                }
                if let Some(port) = port {
                    config.dashboard.port = *port;
                }
                if let Some(url) = relay_url {
                    config.dashboard.relay_url = url.clone();
                }
                if let Some(dir) = data_dir {
                    config.dashboard.data_dir = dir.clone();
                }
            }
            Commands::Exec { relay_url, .. } => {
                if let Some(url) = relay_url {
                    config.dashboard.relay_url = url.clone();
                }
            }
            Commands::Options => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_relay_flags_override_config() {
        let cli = Cli::parse_from([
            "tailbrain", "relay", "--bind", "127.0.0.1", "--port", "9000", "--allow", "docker",
        ]);
        let mut config = TailbrainConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.relay.bind.to_string(), "127.0.0.1");
        assert_eq!(config.relay.port, 9000);
        assert_eq!(config.relay.allowed_commands, vec!["docker"]);
    }

    #[test]
    fn test_exec_keeps_hyphenated_arguments() {
        let cli = Cli::parse_from(["tailbrain", "exec", "docker", "ps", "--format", "{{json .}}"]);
        match cli.command {
            Commands::Exec { argv, .. } => {
                assert_eq!(argv, vec!["docker", "ps", "--format", "{{json .}}"]);
            }
            _ => panic!("expected exec"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["tailbrain", "serve", "--json-logs", "-v"]);
        assert!(cli.verbose);
        let mut config = TailbrainConfig::default();
        cli.apply_overrides(&mut config);
        assert!(config.logging.json);
    }
}
