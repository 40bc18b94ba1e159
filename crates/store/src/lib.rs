//! Access to the backend notification queue and subscription store.
//!
//! The backend owns the tables; this crate only calls its RPC functions.
//! [`NotificationStore`] is the seam the dispatcher depends on and
//! [`SupabaseRpcStore`] is the production implementation.

pub mod rpc;

use async_trait::async_trait;
use scorepush_core::types::DbId;
use scorepush_core::{NotificationStatus, PendingNotification};

pub use rpc::{SupabaseConfig, SupabaseRpcStore};

/// Errors from the backend collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("Backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The RPC function returned a non-2xx status.
    #[error("RPC {function} returned HTTP {status}: {body}")]
    Rpc {
        function: &'static str,
        status: u16,
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("Failed to decode RPC response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Queue and subscription operations used by a dispatch run.
///
/// Every call is independent and idempotent by id or endpoint; no call
/// holds a lock or a transaction across another.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Fetch up to `limit` pending notifications with their subscriptions.
    async fn fetch_pending(&self, limit: u32) -> Result<Vec<PendingNotification>, StoreError>;

    /// Record the final status of the given notifications.
    async fn mark_status(
        &self,
        ids: &[DbId],
        status: NotificationStatus,
    ) -> Result<(), StoreError>;

    /// Delete every subscription registered with `endpoint`.
    async fn delete_subscription(&self, endpoint: &str) -> Result<(), StoreError>;
}
