use super::validate::{validate_identifier, validate_port};
use super::{ActionOutcome, HostOps};
use crate::command::HostCommand;
use crate::error::{Result, ValidationError};
use crate::parsers::{parse_funnel_status, parse_serve_status};
use crate::types::{FunnelStatus, ServeEntry};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Protocol argument of `tailscale funnel`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FunnelProtocol {
    #[default]
    Tcp,
    Http,
    Https,
}

impl FunnelProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunnelProtocol::Tcp => "tcp",
            FunnelProtocol::Http => "http",
            FunnelProtocol::Https => "https",
        }
    }
}

impl fmt::Display for FunnelProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FunnelProtocol {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "tcp" => Ok(FunnelProtocol::Tcp),
            "http" => Ok(FunnelProtocol::Http),
            "https" => Ok(FunnelProtocol::Https),
            _ => Err(ValidationError::InvalidArguments {
                field: "protocol".to_string(),
                reason: format!("unsupported protocol {:?}, expected tcp, http or https", s),
            }),
        }
    }
}

fn tailscale() -> HostCommand {
    HostCommand::new("tailscale")
}

impl HostOps {
    pub async fn serve_status(&self) -> Result<Vec<ServeEntry>> {
        let result = self.run(tailscale().args(["serve", "status"])).await?;
        Ok(parse_serve_status(&result.stdout))
    }

    /// `service` is a display label only; the host command does not take it.
    pub async fn add_serve_port(
        &self,
        port: u16,
        service: Option<&str>,
        local_url: &str,
    ) -> Result<ActionOutcome> {
        let port = validate_port(port)?;
        let local_url = validate_identifier("localUrl", local_url)?;

        info!(
            "🌐 Serving :{} -> {} ({})",
            port,
            local_url,
            service.unwrap_or("unnamed")
        );
        let result = self
            .run(
                tailscale()
                    .args(["serve", "add"])
                    .arg(format!(":{}", port))
                    .arg(local_url),
            )
            .await?;
        Ok(ActionOutcome::completed("Port added successfully", result))
    }

    pub async fn remove_serve_port(&self, port: u16) -> Result<ActionOutcome> {
        let port = validate_port(port)?;
        info!("🌐 Removing serve :{}", port);
        let result = self
            .run(tailscale().args(["serve", "remove"]).arg(format!(":{}", port)))
            .await?;
        Ok(ActionOutcome::completed("Port removed successfully", result))
    }

    pub async fn funnel_status(&self) -> Result<FunnelStatus> {
        let result = self
            .run(tailscale().args(["funnel", "status", "--json"]))
            .await?;
        Ok(parse_funnel_status(&result.stdout)?)
    }

    pub async fn add_funnel_port(&self, port: u16, protocol: FunnelProtocol) -> Result<ActionOutcome> {
        let port = validate_port(port)?;
        info!("🕳️  Funneling {} ({})", port, protocol);
        let result = self
            .run(tailscale().args(["funnel".to_string(), port.to_string(), protocol.to_string()]))
            .await?;
        Ok(ActionOutcome::completed("Port funneled successfully", result))
    }

    pub async fn remove_funnel_port(
        &self,
        port: u16,
        protocol: FunnelProtocol,
    ) -> Result<ActionOutcome> {
        let port = validate_port(port)?;
        info!("🕳️  Removing funnel {} ({})", port, protocol);
        let target = match protocol {
            FunnelProtocol::Tcp => format!("--tcp={}", port),
            FunnelProtocol::Http => format!("--http={}", port),
            FunnelProtocol::Https => port.to_string(),
        };
        let result = self
            .run(tailscale().args(["funnel".to_string(), target, "off".to_string()]))
            .await?;
        Ok(ActionOutcome::completed("Port funnel removed successfully", result))
    }
}
