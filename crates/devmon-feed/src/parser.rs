//! Hub invocation parsing.
//!
//! Turns raw `ReceiveMessage` invocations into validated [`FeedMessage`]s.
//!
//! Two argument shapes are accepted:
//! 1. `(deviceId, response)`
//! 2. `(deviceId, min, max, response)`
//!
//! `response` is discriminated by shape: a string is a status notice, an
//! object is channel telemetry, anything else is passed through as `Other`.

use crate::error::{FeedError, FeedResult};
use devmon_core::{FeedMessage, FeedPayload, PowerLimits};
use devmon_ws::HubInvocation;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

/// Hub method that carries device telemetry.
pub const RECEIVE_METHOD: &str = "ReceiveMessage";

/// Parser counters.
#[derive(Debug, Default)]
pub struct ParseStats {
    /// Messages turned into a `FeedMessage`.
    pub accepted_count: AtomicU64,
    /// Invocations ignored by method or device filter.
    pub filtered_count: AtomicU64,
    /// Invocations that failed to parse or validate.
    pub rejected_count: AtomicU64,
}

impl ParseStats {
    pub fn record_accepted(&self) {
        self.accepted_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filtered(&self) {
        self.filtered_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn accepted(&self) -> u64 {
        self.accepted_count.load(Ordering::Relaxed)
    }

    pub fn filtered(&self) -> u64 {
        self.filtered_count.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected_count.load(Ordering::Relaxed)
    }
}

/// Invocation parser.
pub struct MessageParser {
    method: String,
    /// Device-ID substrings to accept. Empty accepts every device.
    device_filter: Vec<String>,
    stats: ParseStats,
}

impl MessageParser {
    /// Parser for `ReceiveMessage` accepting every device.
    pub fn new() -> Self {
        Self::with_method(RECEIVE_METHOD)
    }

    pub fn with_method(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            device_filter: Vec::new(),
            stats: ParseStats::default(),
        }
    }

    /// Only accept devices whose ID contains one of `patterns`.
    pub fn with_device_filter<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.device_filter = patterns
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.is_empty())
            .collect();
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Whether a device passes the configured filter.
    pub fn accepts_device(&self, device_id: &str) -> bool {
        self.device_filter.is_empty() || self.device_filter.iter().any(|p| device_id.contains(p))
    }

    /// Parse an invocation into a feed message.
    ///
    /// Returns `Ok(None)` for other methods and filtered devices.
    pub fn parse_invocation(&self, invocation: &HubInvocation) -> FeedResult<Option<FeedMessage>> {
        if invocation.target != self.method {
            trace!(method = %invocation.target, "Ignoring hub method");
            self.stats.record_filtered();
            return Ok(None);
        }

        match self.parse_arguments(&invocation.arguments) {
            Ok(Some(message)) => {
                self.stats.record_accepted();
                Ok(Some(message))
            }
            Ok(None) => {
                self.stats.record_filtered();
                Ok(None)
            }
            Err(e) => {
                self.stats.record_rejected();
                warn!(error = %e, "Rejected feed message");
                Err(e)
            }
        }
    }

    fn parse_arguments(&self, args: &[Value]) -> FeedResult<Option<FeedMessage>> {
        let (device_arg, limits, response) = match args {
            [device, response] => (device, None, response),
            [device, min, max, response] => {
                let limits = PowerLimits {
                    min: parse_number(min, "min")?,
                    max: parse_number(max, "max")?,
                };
                (device, Some(limits), response)
            }
            _ => {
                return Err(FeedError::ParseError(format!(
                    "expected 2 or 4 arguments, got {}",
                    args.len()
                )))
            }
        };

        let device_id = parse_device_id(device_arg)?;
        if !self.accepts_device(&device_id) {
            debug!(device_id = %device_id, "Device filtered out");
            return Ok(None);
        }

        let payload = FeedPayload::from_value(response.clone()).map_err(|e| {
            FeedError::ParseError(format!("invalid telemetry for device {device_id}: {e}"))
        })?;

        let mut message = FeedMessage::new(device_id, payload);
        if let Some(limits) = limits {
            message = message.with_limits(limits);
        }
        message.validate()?;

        Ok(Some(message))
    }
}

impl Default for MessageParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_device_id(value: &Value) -> FeedResult<String> {
    let id = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(FeedError::ParseError(format!(
                "device id must be a string or number, got {other}"
            )))
        }
    };
    if id.is_empty() {
        return Err(FeedError::ParseError("empty device id".to_string()));
    }
    Ok(id)
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn parse_number(value: &Value, field: &str) -> FeedResult<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|n| n.is_finite())
        .ok_or_else(|| FeedError::ParseError(format!("invalid {field} value: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use devmon_core::{DeviceStatus, FaultKind};
    use serde_json::json;

    fn telemetry() -> Value {
        json!({
            "channel": "A",
            "address": "Gate 3",
            "lon": 121.47,
            "lat": 31.23,
            "power": 3.5,
            "state": 1
        })
    }

    fn invocation(args: Vec<Value>) -> HubInvocation {
        HubInvocation::new(RECEIVE_METHOD, args)
    }

    #[test]
    fn test_parse_two_argument_telemetry() {
        let parser = MessageParser::new();
        let msg = parser
            .parse_invocation(&invocation(vec![json!("D1"), telemetry()]))
            .unwrap()
            .unwrap();

        assert_eq!(msg.device_id, "D1");
        assert!(msg.limits.is_none());
        let record = msg.payload.as_telemetry().unwrap();
        assert_eq!(record.channel, "A");
        assert_eq!(record.state, DeviceStatus::Alarm);
        assert_eq!(parser.stats().accepted(), 1);
    }

    #[test]
    fn test_parse_four_argument_variant() {
        let parser = MessageParser::new();
        let msg = parser
            .parse_invocation(&invocation(vec![
                json!("D1"),
                json!("1.5"),
                json!(9),
                telemetry(),
            ]))
            .unwrap()
            .unwrap();

        assert_eq!(msg.limits, Some(PowerLimits { min: 1.5, max: 9.0 }));
    }

    #[test]
    fn test_parse_status_string() {
        let parser = MessageParser::new();
        let msg = parser
            .parse_invocation(&invocation(vec![json!(42), json!("connected")]))
            .unwrap()
            .unwrap();
        assert_eq!(msg.device_id, "42");
        assert_eq!(msg.payload, FeedPayload::Status("connected".to_string()));
    }

    #[test]
    fn test_other_method_ignored() {
        let parser = MessageParser::new();
        let inv = HubInvocation::new("Broadcast", vec![json!("D1"), telemetry()]);
        assert!(parser.parse_invocation(&inv).unwrap().is_none());
        assert_eq!(parser.stats().filtered(), 1);
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let parser = MessageParser::new();
        let err = parser
            .parse_invocation(&invocation(vec![json!("D1")]))
            .unwrap_err();
        assert!(matches!(err, FeedError::ParseError(_)));
        assert_eq!(err.kind(), FaultKind::Parse);

        let err = parser
            .parse_invocation(&invocation(vec![json!("D1"), json!(1), telemetry()]))
            .unwrap_err();
        assert!(matches!(err, FeedError::ParseError(_)));
        assert_eq!(parser.stats().rejected(), 2);
    }

    #[test]
    fn test_bad_device_id_rejected() {
        let parser = MessageParser::new();
        assert!(parser
            .parse_invocation(&invocation(vec![json!(""), telemetry()]))
            .is_err());
        assert!(parser
            .parse_invocation(&invocation(vec![json!(null), telemetry()]))
            .is_err());
    }

    #[test]
    fn test_malformed_telemetry_is_parse_error() {
        let parser = MessageParser::new();
        let err = parser
            .parse_invocation(&invocation(vec![json!("D1"), json!({"channel": "A"})]))
            .unwrap_err();
        assert_eq!(err.kind(), FaultKind::Parse);
    }

    #[test]
    fn test_out_of_range_coordinates_is_validation_error() {
        let parser = MessageParser::new();
        let mut bad = telemetry();
        bad["lat"] = json!(95.0);
        let err = parser
            .parse_invocation(&invocation(vec![json!("D1"), bad]))
            .unwrap_err();
        assert!(matches!(err, FeedError::InvalidData(_)));
        assert_eq!(err.kind(), FaultKind::Validation);
    }

    #[test]
    fn test_bad_limits_rejected() {
        let parser = MessageParser::new();
        let err = parser
            .parse_invocation(&invocation(vec![
                json!("D1"),
                json!("low"),
                json!(5),
                telemetry(),
            ]))
            .unwrap_err();
        assert!(matches!(err, FeedError::ParseError(_)));
    }

    #[test]
    fn test_device_filter() {
        let parser = MessageParser::new().with_device_filter(["SH-", "BJ-"]);
        assert!(parser.accepts_device("SH-001"));
        assert!(!parser.accepts_device("GZ-001"));

        assert!(parser
            .parse_invocation(&invocation(vec![json!("GZ-001"), telemetry()]))
            .unwrap()
            .is_none());
        assert!(parser
            .parse_invocation(&invocation(vec![json!("BJ-7"), telemetry()]))
            .unwrap()
            .is_some());
        assert_eq!(parser.stats().filtered(), 1);
        assert_eq!(parser.stats().accepted(), 1);
    }

    #[test]
    fn test_empty_filter_accepts_all() {
        let parser = MessageParser::new().with_device_filter(Vec::<String>::new());
        assert!(parser.accepts_device("anything"));
        let parser = MessageParser::new().with_device_filter([""]);
        assert!(parser.accepts_device("anything"));
    }
}
