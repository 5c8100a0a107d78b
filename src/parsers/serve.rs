use crate::types::ServeEntry;
use regex::Regex;
use std::sync::OnceLock;

const FUNNEL_ON: &str = "(Funnel on)";
const FUNNEL_OFF: &str = "(Funnel off)";

fn trailing_port() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":(\d+)(?:/\S*)?$").expect("static regex"))
}

/// Parse `tailscale serve status`.
///
/// The format is loose text, so this never fails: a leading `No services`
/// line or empty output yields no entries, and every other non-blank line
/// becomes one entry.
pub fn parse_serve_status(raw: &str) -> Vec<ServeEntry> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with("No services") {
        return Vec::new();
    }

    trimmed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, line)| parse_line(index, line))
        .collect()
}

fn parse_line(index: usize, line: &str) -> ServeEntry {
    let mut parts = line.split_whitespace();
    let service = parts.next().unwrap_or_default().to_string();
    let details = parts.collect::<Vec<_>>().join(" ");

    let status_text = if line.contains(FUNNEL_ON) {
        "Funnel on"
    } else if line.contains(FUNNEL_OFF) {
        "Funnel off"
    } else {
        "Status unknown"
    };

    ServeEntry {
        id: format!("serve-{}", index),
        raw_line: line.to_string(),
        port: service_port(&service),
        service,
        status_text: status_text.to_string(),
        active: true,
        details,
    }
}

/// Explicit `:<port>` at the end of the address, else the scheme default.
fn service_port(service: &str) -> Option<u16> {
    if let Some(port) = trailing_port()
        .captures(service)
        .and_then(|caps| caps[1].parse::<u16>().ok())
    {
        return Some(port);
    }

    let lower = service.to_ascii_lowercase();
    if lower == "https" || lower.starts_with("https://") {
        Some(443)
    } else if lower == "http" || lower.starts_with("http://") {
        Some(80)
    } else {
        None
    }
}
