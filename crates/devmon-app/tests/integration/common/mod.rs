pub mod mock_hub;

use devmon_ws::{encode_invocation, HubInvocation};
use serde_json::{json, Value};

/// One `ReceiveMessage` frame carrying channel telemetry.
pub fn telemetry_frame(device: &str, channel: &str, state: u8) -> String {
    let invocation = HubInvocation::new(
        "ReceiveMessage",
        vec![
            json!(device),
            json!({
                "channel": channel,
                "address": "North gate",
                "lon": 121.47,
                "lat": 31.23,
                "power": 12.5,
                "state": state,
            }),
        ],
    );
    encode_invocation(&invocation).unwrap()
}

/// A frame with the given arguments for `ReceiveMessage`.
pub fn raw_frame(arguments: Vec<Value>) -> String {
    encode_invocation(&HubInvocation::new("ReceiveMessage", arguments)).unwrap()
}
