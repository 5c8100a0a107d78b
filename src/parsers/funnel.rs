use crate::error::ParseError;
use crate::types::FunnelStatus;
use serde_json::Value;

const FORMAT: &str = "tailscale funnel status --json";

/// Parse `tailscale funnel status --json`.
///
/// There is no textual fallback for this format, so anything that is not a
/// JSON object (including empty output) is an error.
pub fn parse_funnel_status(raw: &str) -> Result<FunnelStatus, ParseError> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| ParseError::new(FORMAT, e.to_string(), raw))?;

    match value {
        Value::Object(map) => Ok(FunnelStatus(map)),
        other => Err(ParseError::new(
            FORMAT,
            format!("expected a JSON object, got {}", json_kind(&other)),
            raw,
        )),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
