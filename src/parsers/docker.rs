use super::parse_json_lines;
use crate::error::ParseError;
use crate::types::{ContainerRecord, NetworkRecord, PortMapping};
use regex::Regex;
use std::sync::OnceLock;

/// Parse `docker ps --format {{json .}}` (JSON-Lines).
pub fn parse_container_list(raw: &str) -> Result<Vec<ContainerRecord>, ParseError> {
    parse_json_lines("docker ps", raw)
}

/// Parse `docker network ls --format {{json .}}` (JSON-Lines).
pub fn parse_network_list(raw: &str) -> Result<Vec<NetworkRecord>, ParseError> {
    parse_json_lines("docker network ls", raw)
}

fn published_port() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:(?P<ip>.+):)?(?P<host>\d+(?:-\d+)?)->(?P<container>\d+(?:-\d+)?)/(?P<proto>[A-Za-z0-9]+)$",
        )
        .expect("static regex")
    })
}

fn exposed_port() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<container>\d+(?:-\d+)?)/(?P<proto>[A-Za-z0-9]+)$").expect("static regex")
    })
}

/// Split a container's `Ports` column into mappings.
///
/// `0.0.0.0:8080->80/tcp` is published and gets a URL; `80/tcp` is exposed
/// but unpublished and gets neither a host port nor a URL. Anything else is
/// kept as display text only.
pub fn parse_port_mappings(ports: &str) -> Vec<PortMapping> {
    ports
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_port_mapping)
        .collect()
}

fn parse_port_mapping(part: &str) -> PortMapping {
    if let Some(caps) = published_port().captures(part) {
        let host_port = caps["host"].to_string();
        let protocol = caps["proto"].to_ascii_lowercase();
        let url = (protocol == "tcp").then(|| {
            let first = host_port.split('-').next().unwrap_or(&host_port);
            format!("http://localhost:{}", first)
        });
        return PortMapping {
            display_text: part.to_string(),
            host_ip: caps.name("ip").map(|m| m.as_str().to_string()),
            host_port: Some(host_port),
            container_port: Some(caps["container"].to_string()),
            protocol: Some(protocol),
            url,
        };
    }

    if let Some(caps) = exposed_port().captures(part) {
        return PortMapping {
            display_text: part.to_string(),
            host_ip: None,
            host_port: None,
            container_port: Some(caps["container"].to_string()),
            protocol: Some(caps["proto"].to_ascii_lowercase()),
            url: None,
        };
    }

    PortMapping {
        display_text: part.to_string(),
        host_ip: None,
        host_port: None,
        container_port: None,
        protocol: None,
        url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_published_mapping() {
        let mappings = parse_port_mappings("0.0.0.0:8080->80/tcp");
        assert_eq!(
            mappings,
            vec![PortMapping {
                display_text: "0.0.0.0:8080->80/tcp".to_string(),
                host_ip: Some("0.0.0.0".to_string()),
                host_port: Some("8080".to_string()),
                container_port: Some("80".to_string()),
                protocol: Some("tcp".to_string()),
                url: Some("http://localhost:8080".to_string()),
            }]
        );
    }

    #[test]
    fn test_unpublished_mapping_has_no_url() {
        let mappings = parse_port_mappings("80/tcp");
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].host_port, None);
        assert_eq!(mappings[0].url, None);
        assert_eq!(mappings[0].container_port.as_deref(), Some("80"));
        assert!(!mappings[0].is_published());
    }

    #[test]
    fn test_mixed_ipv6_and_udp_mappings() {
        let mappings =
            parse_port_mappings("0.0.0.0:8080->80/tcp, :::8080->80/tcp, [::]:5353->53/udp, 443/tcp");
        assert_eq!(mappings.len(), 4);
        assert_eq!(mappings[1].host_ip.as_deref(), Some("::"));
        assert_eq!(mappings[1].host_port.as_deref(), Some("8080"));
        assert_eq!(mappings[2].host_ip.as_deref(), Some("[::]"));
        assert_eq!(mappings[2].protocol.as_deref(), Some("udp"));
        assert_eq!(mappings[2].url, None);
        assert!(!mappings[3].is_published());
    }

    #[test]
    fn test_port_range_links_first_port() {
        let mappings = parse_port_mappings("0.0.0.0:9000-9001->9000-9001/tcp");
        assert_eq!(mappings[0].host_port.as_deref(), Some("9000-9001"));
        assert_eq!(mappings[0].url.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn test_unrecognized_mapping_is_display_only() {
        let mappings = parse_port_mappings("N/A");
        assert_eq!(mappings[0].display_text, "N/A");
        assert!(!mappings[0].is_published());
        assert_eq!(mappings[0].protocol, None);
    }

    #[test]
    fn test_empty_ports_column() {
        assert!(parse_port_mappings("").is_empty());
        assert!(parse_port_mappings(" , ").is_empty());
    }

    #[test]
    fn test_container_list_in_input_order() {
        let raw = concat!(
            r#"{"ID":"a1","Names":"web","Image":"nginx","Status":"Up 2 hours","Ports":"0.0.0.0:8080->80/tcp","CreatedAt":"2024-01-01"}"#,
            "\n\n",
            r#"{"ID":"b2","Names":"db","Image":"postgres","Status":"Up 1 hour","Ports":"5432/tcp","CreatedAt":"2024-01-02"}"#,
            "\n"
        );
        let containers = parse_container_list(raw).unwrap();
        let ids: Vec<&str> = containers.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "b2"]);
        assert_eq!(containers[0].port_mappings()[0].host_port.as_deref(), Some("8080"));
    }

    #[test]
    fn test_container_list_fails_on_truncated_line() {
        let raw = "{\"ID\":\"a1\"}\n{\"ID\":\"b2\",\"Na";
        let err = parse_container_list(raw).unwrap_err();
        assert_eq!(err.format, "docker ps");
        assert_eq!(err.raw, "{\"ID\":\"b2\",\"Na");
    }

    #[test]
    fn test_network_list() {
        let raw = "{\"ID\":\"n1\",\"Name\":\"bridge\",\"Driver\":\"bridge\",\"Scope\":\"local\",\"IPv6\":\"false\"}\n";
        let networks = parse_network_list(raw).unwrap();
        assert_eq!(networks.len(), 1);
        assert_eq!(networks[0].name, "bridge");
        assert_eq!(networks[0].extra["IPv6"], "false");
    }
}
