//! Batch delivery across notifications and their subscriptions.
//!
//! A notification counts as sent when at least one of its subscriptions
//! accepted the push. Notifications run concurrently (bounded); the
//! subscriptions of one notification are tried one after another.

use std::collections::BTreeSet;

use futures::stream::{self, StreamExt};

use scorepush_core::types::DbId;
use scorepush_core::{PendingNotification, PushPayload};
use scorepush_webpush::PushTransport;

/// Aggregated outcome of a batch, ready for reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedBatch {
    pub sent_ids: Vec<DbId>,
    pub failed_ids: Vec<DbId>,
    /// Distinct endpoints the push service reported as gone.
    pub expired_endpoints: BTreeSet<String>,
}

/// Per-notification result, merged into [`ProcessedBatch`] afterwards.
struct NotificationResult {
    id: DbId,
    delivered: bool,
    expired: Vec<String>,
}

impl NotificationResult {
    fn failed(id: DbId) -> Self {
        Self {
            id,
            delivered: false,
            expired: Vec::new(),
        }
    }
}

/// Deliver every notification in `notifications`, at most `concurrency` at
/// a time.
///
/// Id lists keep the input order regardless of completion order.
pub async fn process_batch(
    transport: &dyn PushTransport,
    notifications: &[PendingNotification],
    concurrency: usize,
) -> ProcessedBatch {
    // Futures are lazy; `buffered` polls at most `concurrency` at once.
    let deliveries: Vec<_> = notifications
        .iter()
        .map(|notification| deliver_notification(transport, notification))
        .collect();

    let results: Vec<NotificationResult> = stream::iter(deliveries)
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut batch = ProcessedBatch::default();
    for result in results {
        if result.delivered {
            batch.sent_ids.push(result.id);
        } else {
            batch.failed_ids.push(result.id);
        }
        batch.expired_endpoints.extend(result.expired);
    }
    batch
}

async fn deliver_notification(
    transport: &dyn PushTransport,
    notification: &PendingNotification,
) -> NotificationResult {
    if notification.subscriptions.is_empty() {
        tracing::debug!(notification_id = notification.id, "No subscriptions, marking failed");
        return NotificationResult::failed(notification.id);
    }

    let payload = match PushPayload::for_notification(notification).to_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(
                notification_id = notification.id,
                error = %e,
                "Failed to encode payload"
            );
            return NotificationResult::failed(notification.id);
        }
    };

    let mut delivered = false;
    let mut expired = Vec::new();

    for subscription in &notification.subscriptions {
        let outcome = transport.send(subscription, &payload).await;
        if outcome.success {
            delivered = true;
        } else if outcome.expired {
            expired.push(subscription.endpoint.clone());
        }
    }

    tracing::debug!(
        notification_id = notification.id,
        subscriptions = notification.subscriptions.len(),
        delivered,
        expired = expired.len(),
        "Notification processed"
    );

    NotificationResult {
        id: notification.id,
        delivered,
        expired,
    }
}
