mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tailbrain::api::{ApiServer, ApiState};
use tailbrain::client::{CommandRunner, RelayClient};
use tailbrain::monitoring::init_tracing;
use tailbrain::ops::HostOps;
use tailbrain::registry::ComposeRegistry;
use tailbrain::relay::RelayServer;
use tailbrain::{HostCommand, TailbrainConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = TailbrainConfig::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let guard = init_tracing(&config.logging, cli.verbose)?;
    info!("🧠 tailbrain starting up...");

    match cli.command {
        Commands::Relay { .. } => {
            info!("Configuration:");
            config.log_options();
            RelayServer::new(&config.relay).start().await?;
        }

        Commands::Serve { .. } => {
            info!("Configuration:");
            config.log_options();

            let registry = ComposeRegistry::open(config.dashboard.registry_path())
                .await
                .context("failed to open compose app registry")?;
            let client = RelayClient::new(
                config.dashboard.relay_url.clone(),
                config.dashboard.request_timeout(),
            );
            if let Err(e) = client.health().await {
                warn!("⚠️  Relay is not reachable yet: {}", e);
            }

            let ops = HostOps::new(Arc::new(client))
                .with_compose_timeout(config.dashboard.compose_timeout());
            let state = ApiState::new(ops, Arc::new(registry));
            let addr = SocketAddr::new(config.dashboard.bind, config.dashboard.port);
            ApiServer::new(state, addr).start().await?;
        }

        Commands::Exec {
            timeout, cwd, argv, ..
        } => {
            let mut argv = argv.into_iter();
            let program = argv.next().context("a program is required")?;
            let mut command = HostCommand::new(program).args(argv);
            if let Some(dir) = cwd {
                command = command.current_dir(dir);
            }
            if let Some(secs) = timeout {
                command = command.timeout(Duration::from_secs(secs));
            }

            let client = RelayClient::new(
                config.dashboard.relay_url.clone(),
                config.dashboard.request_timeout(),
            );
            let result = client.run_host_command(&command).await?;

            print!("{}", result.stdout);
            eprint!("{}", result.stderr);
            if result.truncated {
                warn!("Output was truncated by the relay");
            }
            if !result.success() {
                drop(guard);
                std::process::exit(result.exit_status.clamp(1, 255));
            }
        }

        Commands::Options => {
            for opt in config.options() {
                println!("{:<28} {:<40} {}", opt.env, opt.value, opt.description);
            }
        }
    }

    Ok(())
}
