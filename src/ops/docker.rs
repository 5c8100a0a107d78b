use super::validate::validate_identifier;
use super::{ActionOutcome, HostOps, best_effort};
use crate::command::HostCommand;
use crate::error::{Result, ValidationError};
use crate::parsers::{
    parse_container_list, parse_container_networks, parse_network_inspect, parse_network_list,
    parse_stats,
};
use crate::types::{ContainerNetworks, ContainerRecord, NetworkDetail, NetworkRecord, StatsSnapshot};
use serde::Serialize;
use tracing::{debug, info};

pub const DEFAULT_LOG_LINES: u32 = 100;
pub const DEFAULT_NETWORK_DRIVER: &str = "bridge";

const JSON_FORMAT: &str = "{{json .}}";
const NETWORKS_FORMAT: &str = "{{json .NetworkSettings.Networks}}";

/// Output of `docker logs`. The tool writes the container's stderr stream
/// to its own stderr, so both are returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerLogs {
    pub success: bool,
    pub logs: String,
    pub error_output: String,
}

/// Parameters of `docker network create`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkSpec {
    pub name: String,
    pub driver: Option<String>,
    /// `key=value` driver options, each passed with `--opt`.
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerAction {
    Stop,
    Kill,
    Restart,
}

impl ContainerAction {
    fn verb(self) -> &'static str {
        match self {
            ContainerAction::Stop => "stop",
            ContainerAction::Kill => "kill",
            ContainerAction::Restart => "restart",
        }
    }

    fn done(self) -> &'static str {
        match self {
            ContainerAction::Stop => "stopped",
            ContainerAction::Kill => "killed",
            ContainerAction::Restart => "restarted",
        }
    }
}

fn docker() -> HostCommand {
    HostCommand::new("docker")
}

impl HostOps {
    pub async fn list_containers(&self) -> Result<Vec<ContainerRecord>> {
        let result = self
            .run(docker().args(["ps", "--format", JSON_FORMAT]))
            .await?;
        Ok(parse_container_list(&result.stdout)?)
    }

    pub async fn stop_container(&self, id: &str) -> Result<ActionOutcome> {
        self.container_action(ContainerAction::Stop, id).await
    }

    pub async fn kill_container(&self, id: &str) -> Result<ActionOutcome> {
        self.container_action(ContainerAction::Kill, id).await
    }

    pub async fn restart_container(&self, id: &str) -> Result<ActionOutcome> {
        self.container_action(ContainerAction::Restart, id).await
    }

    async fn container_action(&self, action: ContainerAction, id: &str) -> Result<ActionOutcome> {
        let id = validate_identifier("container", id)?;
        info!("🐳 {} container {}", action.verb(), id);
        let result = self.run(docker().args([action.verb(), id])).await?;
        Ok(ActionOutcome::completed(
            format!("Container {} successfully", action.done()),
            result,
        ))
    }

    pub async fn container_logs(&self, id: &str, lines: Option<u32>) -> Result<ContainerLogs> {
        let id = validate_identifier("container", id)?;
        let lines = lines.unwrap_or(DEFAULT_LOG_LINES);
        let result = self
            .run(docker().arg("logs").arg(format!("--tail={}", lines)).arg(id))
            .await?;
        Ok(ContainerLogs {
            success: true,
            logs: result.stdout,
            error_output: result.stderr,
        })
    }

    pub async fn container_stats(&self, id: &str) -> Result<StatsSnapshot> {
        let id = validate_identifier("container", id)?;
        let result = self
            .run(docker().args(["stats", id, "--no-stream", "--format", JSON_FORMAT]))
            .await?;
        Ok(parse_stats(&result.stdout)?)
    }

    /// Networks a container is attached to. Never fails: relay errors,
    /// non-zero exits and unreadable output all yield an empty map.
    pub async fn container_networks(&self, id: &str) -> Result<ContainerNetworks> {
        let id = validate_identifier("container", id)?;
        let command = docker().args(["container", "inspect", "--format", NETWORKS_FORMAT, id]);
        let context = format!("network lookup for container {}", id);

        let output = best_effort(&context, self.run(command).await.map(|r| r.stdout));
        let networks = best_effort(&context, parse_container_networks(&output));
        debug!(
            "Container {} is attached to [{}]",
            id,
            networks.names().collect::<Vec<_>>().join(", ")
        );
        Ok(networks)
    }

    pub async fn list_networks(&self) -> Result<Vec<NetworkRecord>> {
        let result = self
            .run(docker().args(["network", "ls", "--format", JSON_FORMAT]))
            .await?;
        Ok(parse_network_list(&result.stdout)?)
    }

    /// `None` when Docker prints an empty array for the id.
    pub async fn inspect_network(&self, id: &str) -> Result<Option<NetworkDetail>> {
        let id = validate_identifier("network", id)?;
        let result = self.run(docker().args(["network", "inspect", id])).await?;
        Ok(parse_network_inspect(&result.stdout)?)
    }

    /// Create a network and return the id Docker prints.
    pub async fn create_network(&self, spec: &NetworkSpec) -> Result<String> {
        let name = validate_identifier("name", &spec.name)?;
        let driver = match spec.driver.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => validate_identifier("driver", d)?,
            _ => DEFAULT_NETWORK_DRIVER,
        };
        for option in &spec.options {
            if option.trim().is_empty() || option.starts_with('-') {
                return Err(ValidationError::InvalidArguments {
                    field: "options".to_string(),
                    reason: format!("invalid driver option {:?}", option),
                }
                .into());
            }
        }

        let mut command = docker().args(["network", "create", "--driver", driver]);
        for option in &spec.options {
            command = command.arg("--opt").arg(option.as_str());
        }
        command = command.arg(name);

        info!("🔗 Creating network {} ({})", name, driver);
        let result = self.run(command).await?;
        Ok(result.stdout.trim().to_string())
    }

    pub async fn remove_network(&self, id: &str) -> Result<ActionOutcome> {
        let id = validate_identifier("network", id)?;
        info!("🔗 Removing network {}", id);
        let result = self.run(docker().args(["network", "rm", id])).await?;
        Ok(ActionOutcome::completed(
            format!("Network {} removed successfully", id),
            result,
        ))
    }

    pub async fn connect_network(&self, container: &str, network: &str) -> Result<ActionOutcome> {
        let container = validate_identifier("container", container)?;
        let network = validate_identifier("network", network)?;
        info!("🔗 Connecting {} to {}", container, network);
        let result = self
            .run(docker().args(["network", "connect", network, container]))
            .await?;
        Ok(ActionOutcome::completed(
            format!("Container {} connected to network {} successfully", container, network),
            result,
        ))
    }

    pub async fn disconnect_network(&self, container: &str, network: &str) -> Result<ActionOutcome> {
        let container = validate_identifier("container", container)?;
        let network = validate_identifier("network", network)?;
        info!("🔗 Disconnecting {} from {}", container, network);
        let result = self
            .run(docker().args(["network", "disconnect", network, container]))
            .await?;
        Ok(ActionOutcome::completed(
            format!(
                "Container {} disconnected from network {} successfully",
                container, network
            ),
            result,
        ))
    }
}
