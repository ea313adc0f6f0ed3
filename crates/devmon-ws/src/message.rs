//! Hub frame types.
//!
//! A text frame carries one or more JSON records, each terminated by the
//! ASCII record separator. Records are told apart by their `type` field;
//! only invocations are forwarded downstream.

use crate::error::{WsError, WsResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Record terminator used by the hub framing.
pub const RECORD_SEPARATOR: char = '\u{1e}';

const TYPE_INVOCATION: u64 = 1;
const TYPE_PING: u64 = 6;
const TYPE_CLOSE: u64 = 7;

/// A server-to-client method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubInvocation {
    /// Method name, e.g. `ReceiveMessage`.
    pub target: String,
    #[serde(default)]
    pub arguments: Vec<Value>,
    #[serde(
        rename = "invocationId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub invocation_id: Option<String>,
}

impl HubInvocation {
    pub fn new(target: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            target: target.into(),
            arguments,
            invocation_id: None,
        }
    }
}

/// One decoded hub record.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Invocation(HubInvocation),
    /// Keepalive record; consumed by the adapter.
    Ping,
    /// Server requested the connection be closed.
    Close { error: Option<String> },
    /// Handshake responses, completions and acks. Consumed by the adapter.
    Other(Value),
}

impl HubMessage {
    /// Decode a single record (without its terminator).
    pub fn parse_record(record: &str) -> WsResult<Self> {
        let value: Value = serde_json::from_str(record)?;
        let Value::Object(ref obj) = value else {
            return Err(WsError::ParseError(format!(
                "hub record is not an object: {}",
                truncate(record)
            )));
        };

        let record_type = obj.get("type").and_then(Value::as_u64);
        match record_type {
            Some(TYPE_PING) => Ok(Self::Ping),
            Some(TYPE_CLOSE) => Ok(Self::Close {
                error: obj.get("error").and_then(Value::as_str).map(String::from),
            }),
            Some(TYPE_INVOCATION) | None if obj.contains_key("target") => {
                if !obj.get("arguments").map_or(true, Value::is_array) {
                    return Err(WsError::ParseError(
                        "invocation arguments must be an array".to_string(),
                    ));
                }
                let invocation: HubInvocation = serde_json::from_value(value)?;
                Ok(Self::Invocation(invocation))
            }
            _ => Ok(Self::Other(value)),
        }
    }
}

/// Split a text frame into its non-empty records.
pub fn split_records(text: &str) -> impl Iterator<Item = &str> {
    text.split(RECORD_SEPARATOR)
        .map(str::trim)
        .filter(|r| !r.is_empty())
}

/// Encode an invocation as a single terminated record.
pub fn encode_invocation(invocation: &HubInvocation) -> WsResult<String> {
    let mut value = serde_json::to_value(invocation)?;
    if let Value::Object(ref mut obj) = value {
        obj.insert("type".to_string(), Value::from(TYPE_INVOCATION));
    }
    let mut frame = serde_json::to_string(&value)?;
    frame.push(RECORD_SEPARATOR);
    Ok(frame)
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(64) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_invocation() {
        let record = r#"{"type":1,"target":"ReceiveMessage","arguments":["D1","online"]}"#;
        let msg = HubMessage::parse_record(record).unwrap();
        match msg {
            HubMessage::Invocation(inv) => {
                assert_eq!(inv.target, "ReceiveMessage");
                assert_eq!(inv.arguments, vec![json!("D1"), json!("online")]);
                assert!(inv.invocation_id.is_none());
            }
            other => panic!("Expected invocation, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_ping_and_close() {
        assert_eq!(
            HubMessage::parse_record(r#"{"type":6}"#).unwrap(),
            HubMessage::Ping
        );
        assert_eq!(
            HubMessage::parse_record(r#"{"type":7,"error":"going away"}"#).unwrap(),
            HubMessage::Close {
                error: Some("going away".to_string())
            }
        );
    }

    #[test]
    fn test_parse_handshake_response_is_other() {
        let msg = HubMessage::parse_record("{}").unwrap();
        assert!(matches!(msg, HubMessage::Other(_)));

        let msg = HubMessage::parse_record(r#"{"type":3,"invocationId":"1"}"#).unwrap();
        assert!(matches!(msg, HubMessage::Other(_)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            HubMessage::parse_record("not json"),
            Err(WsError::Json(_))
        ));
        assert!(matches!(
            HubMessage::parse_record("[1,2]"),
            Err(WsError::ParseError(_))
        ));
        assert!(matches!(
            HubMessage::parse_record(r#"{"type":1,"target":"X","arguments":"nope"}"#),
            Err(WsError::ParseError(_))
        ));
    }

    #[test]
    fn test_split_records() {
        let frame = "{\"type\":6}\u{1e}{\"type\":6}\u{1e}";
        let records: Vec<_> = split_records(frame).collect();
        assert_eq!(records.len(), 2);

        assert_eq!(split_records("\u{1e}\u{1e}").count(), 0);
        assert_eq!(split_records("{\"type\":6}").count(), 1);
    }

    #[test]
    fn test_encode_invocation_frame() {
        let inv = HubInvocation::new("ReceiveMessage", vec![json!("D1"), json!({"a": 1})]);
        let frame = encode_invocation(&inv).unwrap();
        assert!(frame.ends_with(RECORD_SEPARATOR));

        let record = split_records(&frame).next().unwrap();
        assert_eq!(
            HubMessage::parse_record(record).unwrap(),
            HubMessage::Invocation(inv)
        );
    }
}
