//! PostgREST RPC client for the Supabase-hosted notification queue.
//!
//! Each operation is a `POST /rest/v1/rpc/<function>` with a JSON object of
//! named parameters, authenticated with the service-role key.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use scorepush_core::types::DbId;
use scorepush_core::{NotificationStatus, PendingNotification};

use crate::{NotificationStore, StoreError};

const FN_GET_PENDING: &str = "api_get_pending_notifications";
const FN_MARK_STATUS: &str = "api_mark_notifications_sent";
const FN_CLEANUP_SUBSCRIPTIONS: &str = "api_cleanup_push_subscriptions";

/// HTTP request timeout for a single RPC call.
const RPC_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection settings for the backend.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`.
    pub url: String,
    /// Service-role key; bypasses row-level security.
    pub service_role_key: String,
}

impl SupabaseConfig {
    /// Load from `SUPABASE_URL` and `SUPABASE_SERVICE_ROLE_KEY`.
    ///
    /// Panics when either is missing; the service cannot run without a
    /// backend.
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("SUPABASE_URL").expect("SUPABASE_URL must be set"),
            service_role_key: std::env::var("SUPABASE_SERVICE_ROLE_KEY")
                .expect("SUPABASE_SERVICE_ROLE_KEY must be set"),
        }
    }
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("service_role_key", &"<redacted>")
            .finish()
    }
}

/// Envelope returned by `api_get_pending_notifications`.
#[derive(Debug, Deserialize)]
struct PendingBatch {
    #[serde(default)]
    notifications: Option<Vec<PendingNotification>>,
}

/// [`NotificationStore`] backed by Supabase PostgREST RPC.
pub struct SupabaseRpcStore {
    client: reqwest::Client,
    rpc_base: String,
    service_role_key: String,
}

impl SupabaseRpcStore {
    pub fn new(config: SupabaseConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(RPC_TIMEOUT).build()?;
        Ok(Self {
            client,
            rpc_base: format!("{}/rest/v1/rpc", config.url.trim_end_matches('/')),
            service_role_key: config.service_role_key,
        })
    }

    /// Invoke an RPC function and return the raw body of a 2xx response.
    async fn call(
        &self,
        function: &'static str,
        params: serde_json::Value,
    ) -> Result<String, StoreError> {
        let response = self
            .client
            .post(format!("{}/{function}", self.rpc_base))
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .json(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        if !status.is_success() {
            return Err(StoreError::Rpc {
                function,
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl NotificationStore for SupabaseRpcStore {
    async fn fetch_pending(&self, limit: u32) -> Result<Vec<PendingNotification>, StoreError> {
        let body = self.call(FN_GET_PENDING, json!({ "p_limit": limit })).await?;

        // The function may return SQL NULL, which PostgREST renders as `null`
        // or an empty body.
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let batch: Option<PendingBatch> = serde_json::from_str(&body)?;
        let notifications = batch.and_then(|b| b.notifications).unwrap_or_default();

        tracing::debug!(count = notifications.len(), "Fetched pending notifications");
        Ok(notifications)
    }

    async fn mark_status(
        &self,
        ids: &[DbId],
        status: NotificationStatus,
    ) -> Result<(), StoreError> {
        self.call(
            FN_MARK_STATUS,
            json!({ "p_notification_ids": ids, "p_status": status.as_str() }),
        )
        .await?;
        Ok(())
    }

    async fn delete_subscription(&self, endpoint: &str) -> Result<(), StoreError> {
        self.call(FN_CLEANUP_SUBSCRIPTIONS, json!({ "p_endpoint": endpoint }))
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
