//! Redis health reporting

use std::time::Duration;

use serde::Serialize;

/// Result of a single PING + `INFO server` probe
#[derive(Debug, Clone, Serialize)]
pub struct RedisHealth {
    /// Did the server answer PING?
    pub healthy: bool,
    /// Round-trip time of the probe
    #[serde(with = "millis")]
    pub latency: Duration,
    /// `redis_version` reported by `INFO server`, when available
    pub server_version: Option<String>,
    /// Configured pool size
    pub pool_size: usize,
    /// Error message if unhealthy
    pub error: Option<String>,
}

impl RedisHealth {
    pub(crate) fn healthy(latency: Duration, info: Option<&str>, pool_size: usize) -> Self {
        Self {
            healthy: true,
            latency,
            server_version: info.and_then(parse_server_version),
            pool_size,
            error: None,
        }
    }

    pub(crate) fn unhealthy(latency: Duration, error: impl Into<String>, pool_size: usize) -> Self {
        Self {
            healthy: false,
            latency,
            server_version: None,
            pool_size,
            error: Some(error.into()),
        }
    }
}

/// Extract `redis_version` from an `INFO server` payload.
fn parse_server_version(info: &str) -> Option<String> {
    info.lines()
        .find_map(|line| line.trim().strip_prefix("redis_version:"))
        .map(str::to_string)
}

mod millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_version() {
        let info = "# Server\r\nredis_version:7.2.4\r\nredis_mode:standalone\r\n";
        assert_eq!(parse_server_version(info).as_deref(), Some("7.2.4"));
        assert_eq!(parse_server_version("# Server\r\n"), None);
    }

    #[test]
    fn test_health_serializes_latency_as_millis() {
        let health = RedisHealth::unhealthy(Duration::from_millis(42), "Connection error", 10);
        let json = serde_json::to_value(&health).unwrap();
        assert_eq!(json["latency"], 42);
        assert_eq!(json["healthy"], false);
        assert_eq!(json["error"], "Connection error");
    }
}
