//! Output parsers: one pure function per tool output format.
//!
//! Every parser takes the raw stdout of one command and returns either a
//! typed record set or a [`ParseError`] that carries the offending text.
//! Nothing here talks to the relay.

pub mod docker;
pub mod funnel;
pub mod network;
pub mod serve;
pub mod stats;

pub use docker::{parse_container_list, parse_network_list, parse_port_mappings};
pub use funnel::parse_funnel_status;
pub use network::{parse_container_networks, parse_network_inspect};
pub use serve::parse_serve_status;
pub use stats::parse_stats;

use crate::error::ParseError;
use serde::de::DeserializeOwned;

/// Parse JSON-Lines output: one object per non-blank line, in input order.
///
/// A malformed line fails the whole batch; a truncated line from the tool
/// must be surfaced, not skipped.
pub fn parse_json_lines<T: DeserializeOwned>(
    format: &'static str,
    raw: &str,
) -> Result<Vec<T>, ParseError> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line.trim()).map_err(|e| {
                ParseError::new(format, format!("line {}: {}", index + 1, e), line)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_json_lines_skips_blank_lines() {
        let values: Vec<Value> = parse_json_lines("test", "{\"a\":1}\n\n  \n{\"a\":2}\n").unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[1]["a"], 2);
    }

    #[test]
    fn test_json_lines_fails_fast_with_offending_line() {
        let err = parse_json_lines::<Value>("test", "{\"a\":1}\n{\"a\":\n{\"a\":3}").unwrap_err();
        assert_eq!(err.raw, "{\"a\":");
        assert!(err.reason.starts_with("line 2"));
    }
}
