//! One dispatch run: fetch → deliver → reconcile.
//!
//! Both the HTTP trigger and the interval scheduler call [`run_dispatch`].
//! A run is stateless apart from the backend it reads and writes, so a
//! crashed run can simply be repeated (at-least-once delivery).

pub mod processor;
pub mod reconciler;

use serde::Serialize;

use scorepush_core::BatchResult;
use scorepush_store::{NotificationStore, StoreError};
use scorepush_webpush::PushTransport;

pub use processor::{process_batch, ProcessedBatch};
pub use reconciler::{reconcile, ReconcileReport};

/// Upper bound on notifications fetched per run. Keeps the number of
/// outbound push requests per invocation bounded.
pub const MAX_BATCH_SIZE: u32 = 50;

/// What a dispatch run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchReport {
    /// Nothing was pending; no push or write-back calls were made.
    Empty,
    Completed(BatchResult),
}

/// JSON body returned by the dispatch endpoint.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DispatchResponse {
    Empty {
        processed: usize,
        message: &'static str,
    },
    Completed(BatchResult),
}

impl From<DispatchReport> for DispatchResponse {
    fn from(report: DispatchReport) -> Self {
        match report {
            DispatchReport::Empty => DispatchResponse::Empty {
                processed: 0,
                message: "No pending notifications",
            },
            DispatchReport::Completed(result) => DispatchResponse::Completed(result),
        }
    }
}

/// Run one full dispatch cycle.
///
/// Only the initial fetch can fail the run. Delivery failures are folded
/// into the batch result and write-back failures are logged; the next run
/// picks up anything still pending.
pub async fn run_dispatch(
    store: &dyn NotificationStore,
    transport: &dyn PushTransport,
    concurrency: usize,
) -> Result<DispatchReport, StoreError> {
    let notifications = store.fetch_pending(MAX_BATCH_SIZE).await?;

    if notifications.is_empty() {
        tracing::debug!("No pending notifications");
        return Ok(DispatchReport::Empty);
    }

    let batch = process_batch(transport, &notifications, concurrency).await;
    let reconciled = reconcile(store, &batch).await;

    let result = BatchResult {
        processed: notifications.len(),
        sent: batch.sent_ids.len(),
        failed: batch.failed_ids.len(),
        expired_cleaned: batch.expired_endpoints.len(),
    };

    tracing::info!(
        processed = result.processed,
        sent = result.sent,
        failed = result.failed,
        expired_cleaned = result.expired_cleaned,
        reconcile_failures = reconciled.failed_operations,
        "Dispatch run complete"
    );

    Ok(DispatchReport::Completed(result))
}
