use super::funnel::json_kind;
use crate::error::ParseError;
use crate::types::{ContainerNetworks, NetworkDetail};
use serde_json::Value;

const INSPECT_FORMAT: &str = "docker network inspect";
const CONTAINER_NETWORKS_FORMAT: &str = "docker container inspect .NetworkSettings.Networks";

/// Parse `docker network inspect <id>`: a JSON array holding one network,
/// or `None` for an empty array. Missing or `null` containers and IPAM
/// config become empty.
pub fn parse_network_inspect(raw: &str) -> Result<Option<NetworkDetail>, ParseError> {
    let mut details: Vec<NetworkDetail> = serde_json::from_str(raw.trim())
        .map_err(|e| ParseError::new(INSPECT_FORMAT, e.to_string(), raw))?;

    match details.len() {
        0 => Ok(None),
        1 => Ok(details.pop()),
        n => Err(ParseError::new(
            INSPECT_FORMAT,
            format!("expected one network, got {}", n),
            raw,
        )),
    }
}

/// Parse `docker container inspect --format {{json .NetworkSettings.Networks}}`.
///
/// Empty output and a literal `null` mean "no networks". Other malformed
/// output is an error here; callers that must never fail wrap this with
/// [`crate::ops::best_effort`].
pub fn parse_container_networks(raw: &str) -> Result<ContainerNetworks, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(ContainerNetworks::default());
    }

    let value: Value = serde_json::from_str(trimmed)
        .map_err(|e| ParseError::new(CONTAINER_NETWORKS_FORMAT, e.to_string(), raw))?;

    match value {
        Value::Object(map) => Ok(ContainerNetworks(map.into_iter().collect())),
        Value::Null => Ok(ContainerNetworks::default()),
        other => Err(ParseError::new(
            CONTAINER_NETWORKS_FORMAT,
            format!("expected a JSON object, got {}", json_kind(&other)),
            raw,
        )),
    }
}
