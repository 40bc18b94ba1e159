//! Write batch results back to the backend.
//!
//! Marking sent, marking failed and purging expired subscriptions are
//! three independent operations. A failure in one is logged and does not
//! stop the others.

use std::collections::BTreeSet;

use futures::future::join_all;

use scorepush_core::types::DbId;
use scorepush_core::NotificationStatus;
use scorepush_store::NotificationStore;

use super::processor::ProcessedBatch;

/// Counts of what the write-back achieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Backend calls that returned an error.
    pub failed_operations: usize,
    /// Expired endpoints successfully deleted.
    pub endpoints_deleted: usize,
}

/// Persist the outcome of `batch`.
pub async fn reconcile(store: &dyn NotificationStore, batch: &ProcessedBatch) -> ReconcileReport {
    let (sent_ok, failed_ok, (deleted, delete_failures)) = tokio::join!(
        mark(store, &batch.sent_ids, NotificationStatus::Sent),
        mark(store, &batch.failed_ids, NotificationStatus::Failed),
        purge_expired(store, &batch.expired_endpoints),
    );

    ReconcileReport {
        failed_operations: usize::from(!sent_ok) + usize::from(!failed_ok) + delete_failures,
        endpoints_deleted: deleted,
    }
}

/// Mark `ids` with `status`. Returns `false` if the backend call failed.
async fn mark(store: &dyn NotificationStore, ids: &[DbId], status: NotificationStatus) -> bool {
    if ids.is_empty() {
        return true;
    }

    match store.mark_status(ids, status).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(
                status = status.as_str(),
                count = ids.len(),
                error = %e,
                "Failed to mark notifications"
            );
            false
        }
    }
}

/// Delete each endpoint; returns `(deleted, failed)`.
async fn purge_expired(
    store: &dyn NotificationStore,
    endpoints: &BTreeSet<String>,
) -> (usize, usize) {
    let results = join_all(
        endpoints
            .iter()
            .map(|endpoint| store.delete_subscription(endpoint)),
    )
    .await;

    let mut deleted = 0;
    let mut failed = 0;
    for result in results {
        match result {
            Ok(()) => deleted += 1,
            Err(e) => {
                tracing::error!(error = %e, "Failed to delete expired subscription");
                failed += 1;
            }
        }
    }
    (deleted, failed)
}
