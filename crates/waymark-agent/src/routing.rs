//! Strict parsing of the model's routing decision.
//!
//! The reply must be exactly one JSON object with a single string field
//! named by the routing key, e.g. `{"pipeline": "release_pipeline"}`.
//! Surrounding prose or markdown fences are rejected, not stripped.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("could not parse orchestrator response: {0}")]
    Parse(String),

    #[error("unknown agent/pipeline: '{0}'")]
    UnknownPipeline(String),
}

/// Extract the chosen pipeline name from `reply`.
pub fn parse_routing(reply: &str, routing_key: &str) -> Result<String, RoutingError> {
    let object: Map<String, Value> =
        serde_json::from_str(reply).map_err(|e| RoutingError::Parse(e.to_string()))?;

    if object.len() != 1 {
        return Err(RoutingError::Parse(format!(
            "expected a single '{}' field, got {} fields",
            routing_key,
            object.len()
        )));
    }
    match object.get(routing_key) {
        Some(Value::String(name)) if !name.trim().is_empty() => Ok(name.clone()),
        Some(Value::String(_)) => Err(RoutingError::Parse(format!(
            "'{}' is empty",
            routing_key
        ))),
        Some(other) => Err(RoutingError::Parse(format!(
            "'{}' must be a string, got {}",
            routing_key, other
        ))),
        None => Err(RoutingError::Parse(format!("missing '{}' field", routing_key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"pipeline": "release_pipeline"}"#, "release_pipeline")]
    #[case("  {\"pipeline\":\"chat_pipeline\"}\n", "chat_pipeline")]
    fn test_accepts_single_key_object(#[case] reply: &str, #[case] expected: &str) {
        assert_eq!(parse_routing(reply, "pipeline").unwrap(), expected);
    }

    #[rstest]
    #[case::prose("not json")]
    #[case::fenced("```json\n{\"pipeline\": \"chat_pipeline\"}\n```")]
    #[case::trailing_prose(r#"{"pipeline": "chat_pipeline"} hope that helps"#)]
    #[case::leading_prose(r#"Sure: {"pipeline": "chat_pipeline"}"#)]
    #[case::array(r#"["chat_pipeline"]"#)]
    #[case::wrong_key(r#"{"agent": "chat_pipeline"}"#)]
    #[case::extra_key(r#"{"pipeline": "chat_pipeline", "why": "chat"}"#)]
    #[case::not_string(r#"{"pipeline": 3}"#)]
    #[case::blank(r#"{"pipeline": "  "}"#)]
    #[case::empty("")]
    fn test_rejects_protocol_violations(#[case] reply: &str) {
        let err = parse_routing(reply, "pipeline").unwrap_err();
        assert!(matches!(err, RoutingError::Parse(_)));
        assert!(err.to_string().starts_with("could not parse orchestrator response"));
    }

    #[test]
    fn test_custom_routing_key() {
        assert_eq!(parse_routing(r#"{"agent": "x"}"#, "agent").unwrap(), "x");
    }
}
