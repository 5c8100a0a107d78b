//! Typed records produced by the output parsers.
//!
//! Docker records keep Docker's own field names on the wire and preserve any
//! field they do not model in `extra`, so the dashboard never loses data the
//! tool printed.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One line of `tailscale serve status`.
///
/// `id` is positional and only meaningful within a single response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServeEntry {
    pub id: String,
    pub raw_line: String,
    pub port: Option<u16>,
    pub service: String,
    pub status_text: String,
    /// Every listed entry is reported active; the tool does not distinguish
    /// configured-but-inactive entries in this output.
    pub active: bool,
    pub details: String,
}

/// `tailscale funnel status --json`, kept in the tool's own shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunnelStatus(pub Map<String, Value>);

impl FunnelStatus {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One line of `docker ps --format {{json .}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecord {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Names", default)]
    pub names: String,
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Ports", default)]
    pub ports: String,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContainerRecord {
    pub fn port_mappings(&self) -> Vec<PortMapping> {
        crate::parsers::docker::parse_port_mappings(&self.ports)
    }
}

/// One entry of a container's `Ports` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub display_text: String,
    pub host_ip: Option<String>,
    /// `None` for unpublished ports.
    pub host_port: Option<String>,
    pub container_port: Option<String>,
    pub protocol: Option<String>,
    /// Only present for published TCP ports.
    pub url: Option<String>,
}

impl PortMapping {
    pub fn is_published(&self) -> bool {
        self.host_port.is_some()
    }
}

/// One line of `docker network ls --format {{json .}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkRecord {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Driver", default)]
    pub driver: String,
    #[serde(rename = "Scope", default)]
    pub scope: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The single object printed by `docker network inspect <id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkDetail {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Driver", default)]
    pub driver: String,
    #[serde(rename = "Scope", default)]
    pub scope: String,
    #[serde(rename = "IPAM", default, deserialize_with = "null_as_default")]
    pub ipam: Ipam,
    #[serde(rename = "Containers", default, deserialize_with = "null_as_default")]
    pub containers: BTreeMap<String, NetworkContainer>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ipam {
    #[serde(rename = "Driver", default)]
    pub driver: String,
    #[serde(rename = "Config", default, deserialize_with = "null_as_default")]
    pub config: Vec<IpamConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IpamConfig {
    #[serde(rename = "Subnet", default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    #[serde(rename = "Gateway", default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkContainer {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "IPv4Address", default)]
    pub ipv4_address: String,
    #[serde(rename = "IPv6Address", default)]
    pub ipv6_address: String,
    #[serde(rename = "MacAddress", default)]
    pub mac_address: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `docker stats --no-stream --format {{json .}}` for one container.
///
/// Percentages stay display strings; use [`percent_value`] for numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(rename = "Container", default)]
    pub container: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "CPUPerc", default)]
    pub cpu_perc: String,
    #[serde(rename = "MemUsage", default)]
    pub mem_usage: String,
    #[serde(rename = "MemPerc", default)]
    pub mem_perc: String,
    #[serde(rename = "NetIO", default)]
    pub net_io: String,
    #[serde(rename = "BlockIO", default)]
    pub block_io: String,
    #[serde(rename = "PIDs", default)]
    pub pids: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatsSnapshot {
    pub fn cpu_percent(&self) -> f64 {
        percent_value(&self.cpu_perc)
    }

    pub fn mem_percent(&self) -> f64 {
        percent_value(&self.mem_perc)
    }
}

/// Numeric value of a `"12.5%"` display string, 0 when unparsable.
pub fn percent_value(display: &str) -> f64 {
    display
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// `NetworkSettings.Networks` of one container: network name → endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerNetworks(pub BTreeMap<String, Value>);

impl ContainerNetworks {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
