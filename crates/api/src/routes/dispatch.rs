//! Dispatch trigger endpoint, called by cron or a database webhook.
//!
//! ```text
//! POST /send-push-notification
//! POST /functions/v1/send-push-notification
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::dispatch::{run_dispatch, DispatchResponse};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::BearerToken;
use crate::state::AppState;

/// Run one dispatch cycle and return its summary.
///
/// Checks happen in order: bearer header, then VAPID configuration. Both
/// fail before the backend is touched.
///
/// The cycle runs on its own task. If the caller disconnects or the
/// deadline passes, the run still finishes and reconciles what it sent;
/// only the response is lost.
async fn send_push_notifications(
    State(state): State<AppState>,
    _token: BearerToken,
) -> AppResult<Json<DispatchResponse>> {
    let transport = state
        .transport
        .clone()
        .ok_or(AppError::VapidNotConfigured)?;
    let store = Arc::clone(&state.store);
    let concurrency = state.config.dispatch.concurrency;

    let run = tokio::spawn(async move {
        run_dispatch(store.as_ref(), transport.as_ref(), concurrency).await
    });

    let deadline = Duration::from_secs(state.config.request_timeout_secs);
    let report = tokio::time::timeout(deadline, run)
        .await
        .map_err(|_| AppError::DispatchTimeout)?
        .map_err(|e| AppError::Internal(format!("dispatch task failed: {e}")))?
        .map_err(AppError::Fetch)?;

    Ok(Json(report.into()))
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

pub fn router() -> Router<AppState> {
    let trigger = post(send_push_notifications).fallback(method_not_allowed);

    Router::new()
        .route("/send-push-notification", trigger.clone())
        .route("/functions/v1/send-push-notification", trigger)
}
