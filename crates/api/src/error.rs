use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use scorepush_store::StoreError;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce `{"error": ..., "code": ...}`
/// bodies. Server-side failures are logged and replaced with a fixed
/// message so backend details never reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The route exists but not for this HTTP method.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Missing or malformed `Authorization: Bearer` header.
    #[error("Unauthorized")]
    Unauthorized,

    /// One or more of the VAPID environment values is missing.
    #[error("VAPID keys not configured")]
    VapidNotConfigured,

    /// The dispatch run outlived the request deadline. The run itself keeps
    /// going in the background.
    #[error("Dispatch did not finish within the request timeout")]
    DispatchTimeout,

    /// The pending batch could not be fetched from the backend.
    #[error("Failed to fetch notifications: {0}")]
    Fetch(#[source] StoreError),

    /// Anything else that went wrong on the server side.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "METHOD_NOT_ALLOWED",
                "Method not allowed",
            ),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Unauthorized"),
            AppError::VapidNotConfigured => {
                tracing::error!("VAPID credentials missing, refusing to dispatch");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "VAPID_NOT_CONFIGURED",
                    "VAPID keys not configured",
                )
            }
            AppError::DispatchTimeout => {
                tracing::warn!("Dispatch still running at request deadline, responding early");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DISPATCH_TIMEOUT",
                    "Dispatch timed out",
                )
            }
            AppError::Fetch(err) => {
                tracing::error!(error = %err, "Fetch error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "FETCH_FAILED",
                    "Failed to fetch notifications",
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error",
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
