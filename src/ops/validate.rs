//! Input checks applied before anything is sent to the relay.

use crate::error::ValidationError;
use serde_json::Value;

/// Accept a port given as text (path segments, query strings).
pub fn parse_port(raw: &str) -> Result<u16, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField {
            field: "port".to_string(),
        });
    }
    trimmed
        .parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| ValidationError::InvalidPort {
            value: raw.to_string(),
        })
}

/// Accept a port given in a JSON body, either as a number or a string.
pub fn port_from_json(value: Option<&Value>) -> Result<u16, ValidationError> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::MissingField {
            field: "port".to_string(),
        }),
        Some(Value::String(s)) => parse_port(s),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|p| u16::try_from(p).ok())
            .filter(|p| *p != 0)
            .ok_or_else(|| ValidationError::InvalidPort {
                value: n.to_string(),
            }),
        Some(other) => Err(ValidationError::InvalidPort {
            value: other.to_string(),
        }),
    }
}

pub fn validate_port(port: u16) -> Result<u16, ValidationError> {
    if port == 0 {
        return Err(ValidationError::InvalidPort {
            value: port.to_string(),
        });
    }
    Ok(port)
}

/// Container, network and similar names that end up as a single argument.
/// A leading `-` would be read as an option by the host tool.
pub fn validate_identifier<'a>(field: &str, value: &'a str) -> Result<&'a str, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
    if value.starts_with('-') || value.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidIdentifier {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value)
}

pub fn require<'a>(field: &str, value: Option<&'a str>) -> Result<&'a str, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField {
            field: field.to_string(),
        }),
    }
}

pub fn validate_compose_path(path: &str) -> Result<&str, ValidationError> {
    let path = require("path", Some(path))?;
    if !(path.ends_with(".yml") || path.ends_with(".yaml")) {
        return Err(ValidationError::InvalidComposePath {
            path: path.to_string(),
        });
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("80" => Ok(80); "plain")]
    #[test_case(" 443 " => Ok(443); "padded")]
    #[test_case("65535" => Ok(65535); "upper bound")]
    #[test_case("0" => Err(ValidationError::InvalidPort { value: "0".into() }); "zero")]
    #[test_case("65536" => Err(ValidationError::InvalidPort { value: "65536".into() }); "too large")]
    #[test_case("-1" => Err(ValidationError::InvalidPort { value: "-1".into() }); "negative")]
    #[test_case("http" => Err(ValidationError::InvalidPort { value: "http".into() }); "word")]
    #[test_case("" => Err(ValidationError::MissingField { field: "port".into() }); "empty")]
    fn test_parse_port(raw: &str) -> Result<u16, ValidationError> {
        parse_port(raw)
    }

    #[test]
    fn test_port_from_json() {
        assert_eq!(port_from_json(Some(&json!(8080))), Ok(8080));
        assert_eq!(port_from_json(Some(&json!("8080"))), Ok(8080));
        assert!(port_from_json(Some(&json!(70000))).is_err());
        assert!(port_from_json(Some(&json!(80.5))).is_err());
        assert!(port_from_json(Some(&json!(true))).is_err());
        assert!(matches!(
            port_from_json(None),
            Err(ValidationError::MissingField { .. })
        ));
    }

    #[test_case("web" => true; "name")]
    #[test_case("3f2a9c1b" => true; "short id")]
    #[test_case("my_net.v2" => true; "punctuation")]
    #[test_case("" => false; "empty")]
    #[test_case("-rf" => false; "option lookalike")]
    #[test_case("a b" => false; "space")]
    #[test_case("a\tb" => false; "tab")]
    fn test_identifier(value: &str) -> bool {
        validate_identifier("container", value).is_ok()
    }

    #[test]
    fn test_compose_path_extension() {
        assert!(validate_compose_path("/srv/app/docker-compose.yml").is_ok());
        assert!(validate_compose_path("/srv/app/compose.yaml").is_ok());
        assert_eq!(
            validate_compose_path("/x/compose.txt"),
            Err(ValidationError::InvalidComposePath {
                path: "/x/compose.txt".to_string()
            })
        );
        assert!(matches!(
            validate_compose_path("  "),
            Err(ValidationError::MissingField { .. })
        ));
    }
}
