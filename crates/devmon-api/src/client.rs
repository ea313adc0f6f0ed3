//! HTTP client for the device backend.
//!
//! Responses may be wrapped in a `{code, message, data}` envelope. Codes
//! `200` and `0` mean success and unwrap `data`; any other code is a
//! business failure. Bodies without a `code` field are decoded as-is.

use crate::error::{ApiError, ApiResult};
use crate::types::{DeviceInfo, StatusBody};
use devmon_core::DeviceStatus;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const SUCCESS_CODES: [i64; 2] = [200, 0];

/// Client for the device REST API.
#[derive(Debug, Clone)]
pub struct DeviceApiClient {
    client: Client,
    base_url: Url,
}

impl DeviceApiClient {
    /// Create a client with the default timeout.
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. `https://backend.example.com/api`
    pub fn new(base_url: &str) -> ApiResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /Device/GetList`
    pub async fn get_device_list(&self) -> ApiResult<Vec<DeviceInfo>> {
        let devices: Vec<DeviceInfo> = self.get(&["Device", "GetList"]).await?;
        info!(count = devices.len(), "Fetched device list");
        Ok(devices)
    }

    /// `GET /Device/GetDetail/{id}`
    pub async fn get_device_detail(&self, device_id: &str) -> ApiResult<DeviceInfo> {
        self.get(&["Device", "GetDetail", device_id]).await
    }

    /// `GET /Device/GetStatus/{id}`
    pub async fn get_device_status(&self, device_id: &str) -> ApiResult<DeviceStatus> {
        let body: StatusBody = self.get(&["Device", "GetStatus", device_id]).await?;
        Ok(body.into_status())
    }

    /// Build an endpoint URL. Segments are percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        let url = self.endpoint(segments)?;
        debug!(url = %url, "API request");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("GET {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), "API request failed");
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(format!("Failed to parse response: {e}")))?;

        unwrap_envelope(body)
    }
}

/// Unwrap an optional `{code, message, data}` envelope and decode the payload.
pub fn unwrap_envelope<T: DeserializeOwned>(body: Value) -> ApiResult<T> {
    let payload = match body {
        Value::Object(mut obj) if obj.contains_key("code") => {
            let code = obj
                .get("code")
                .and_then(parse_code)
                .ok_or_else(|| ApiError::Decode(format!("invalid envelope code: {:?}", obj.get("code"))))?;

            if !SUCCESS_CODES.contains(&code) {
                let message = obj
                    .get("message")
                    .or_else(|| obj.get("msg"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                return Err(ApiError::Business { code, message });
            }
            obj.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };

    serde_json::from_value(payload).map_err(|e| ApiError::Decode(e.to_string()))
}

fn parse_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
