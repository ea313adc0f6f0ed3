//! DeviceApiClient tests against an in-process mock backend.

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use devmon_api::{ApiError, DeviceApiClient};
use devmon_core::{DeviceStatus, FaultKind};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

async fn device_list() -> Json<Value> {
    Json(json!({
        "code": 200,
        "message": "ok",
        "data": [
            {"id": "D1", "name": "Pump 1", "status": 0, "lon": 121.4, "lat": 31.2},
            {"id": "D2", "name": "Pump 2", "status": 1}
        ]
    }))
}

async fn device_detail(Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    match id.as_str() {
        // Unwrapped body
        "D1" => Ok(Json(json!({"id": "D1", "address": "North gate"}))),
        "broken" => Ok(Json(json!({"code": 4001, "message": "Device not registered"}))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn device_status(Path(id): Path<String>) -> Json<Value> {
    let state = if id == "D2" { 1 } else { 0 };
    Json(json!({"code": 0, "data": {"status": state}}))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!([]))
}

/// Start the mock backend and return its base URL.
async fn start_backend() -> String {
    let app = Router::new()
        .route("/api/Device/GetList", get(device_list))
        .route("/api/Device/GetDetail/{id}", get(device_detail))
        .route("/api/Device/GetStatus/{id}", get(device_status))
        .route("/slow/Device/GetList", get(slow));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_get_device_list_unwraps_envelope() {
    let base = start_backend().await;
    let client = DeviceApiClient::new(&format!("{base}/api")).unwrap();

    let devices = client.get_device_list().await.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].id, "D1");
    assert!(devices[0].position().is_some());
    assert_eq!(devices[1].status, DeviceStatus::Alarm);
}

#[tokio::test]
async fn test_get_device_detail_raw_body() {
    let base = start_backend().await;
    let client = DeviceApiClient::new(&format!("{base}/api")).unwrap();

    let detail = client.get_device_detail("D1").await.unwrap();
    assert_eq!(detail.address, "North gate");
}

#[tokio::test]
async fn test_business_error_carries_server_message() {
    let base = start_backend().await;
    let client = DeviceApiClient::new(&format!("{base}/api")).unwrap();

    let err = client.get_device_detail("broken").await.unwrap_err();
    assert_eq!(err.kind(), FaultKind::Api);
    assert_eq!(err.user_message(), Some("Device not registered"));
}

#[tokio::test]
async fn test_non_2xx_is_http_error() {
    let base = start_backend().await;
    let client = DeviceApiClient::new(&format!("{base}/api")).unwrap();

    let err = client.get_device_detail("missing").await.unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 404, .. }));
}

#[tokio::test]
async fn test_get_device_status() {
    let base = start_backend().await;
    let client = DeviceApiClient::new(&format!("{base}/api")).unwrap();

    assert_eq!(
        client.get_device_status("D2").await.unwrap(),
        DeviceStatus::Alarm
    );
    assert_eq!(
        client.get_device_status("D1").await.unwrap(),
        DeviceStatus::Normal
    );
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let base = start_backend().await;
    let client =
        DeviceApiClient::with_timeout(&format!("{base}/slow"), Duration::from_millis(200)).unwrap();

    let err = client.get_device_list().await.unwrap_err();
    assert_eq!(err.kind(), FaultKind::Network);
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let client = DeviceApiClient::new("http://127.0.0.1:1/api").unwrap();
    let err = client.get_device_list().await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}
