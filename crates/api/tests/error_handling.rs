//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server or
//! router is involved.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use scorepush_api::error::AppError;
use scorepush_store::StoreError;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn method_not_allowed_returns_405() {
    let (status, json) = error_to_response(AppError::MethodNotAllowed).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(json["code"], "METHOD_NOT_ALLOWED");
    assert_eq!(json["error"], "Method not allowed");
}

#[tokio::test]
async fn unauthorized_returns_401() {
    let (status, json) = error_to_response(AppError::Unauthorized).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");
    assert_eq!(json["error"], "Unauthorized");
}

#[tokio::test]
async fn vapid_not_configured_returns_500() {
    let (status, json) = error_to_response(AppError::VapidNotConfigured).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "VAPID_NOT_CONFIGURED");
    assert_eq!(json["error"], "VAPID keys not configured");
}

// ---------------------------------------------------------------------------
// Test: backend details never leak into the response body
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_error_hides_backend_detail() {
    let err = AppError::Fetch(StoreError::Rpc {
        function: "api_get_pending_notifications",
        status: 500,
        body: "relation \"notifications\" does not exist".to_string(),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "FETCH_FAILED");
    assert_eq!(json["error"], "Failed to fetch notifications");
    assert!(!json.to_string().contains("relation"));
}

#[tokio::test]
async fn internal_error_hides_message() {
    let (status, json) = error_to_response(AppError::Internal("secret detail".into())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "Internal server error");
}

#[tokio::test]
async fn dispatch_timeout_returns_500() {
    let (status, json) = error_to_response(AppError::DispatchTimeout).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "DISPATCH_TIMEOUT");
    assert_eq!(json["error"], "Dispatch timed out");
}
