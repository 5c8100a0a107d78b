use crate::error::ParseError;
use crate::types::StatsSnapshot;

const FORMAT: &str = "docker stats";

/// Parse `docker stats <id> --no-stream --format {{json .}}`.
///
/// Percentages are left as the tool's display strings.
pub fn parse_stats(raw: &str) -> Result<StatsSnapshot, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::new(FORMAT, "no stats output", raw));
    }
    serde_json::from_str(trimmed).map_err(|e| ParseError::new(FORMAT, e.to_string(), raw))
}
