//! Pending score-change notifications and the push payload built from them.

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::DbId;

/// Icon shown by the service worker next to the notification.
pub const NOTIFICATION_ICON: &str = "/icons/icon-192x192.png";

/// Monochrome badge used on platforms that support it.
pub const NOTIFICATION_BADGE: &str = "/icons/badge-72x72.png";

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Which way a product's score moved.
///
/// Lower scores are better, so `Improved` means the score went down. The
/// label is decided upstream; anything other than `"improved"` renders as
/// `Worsened`. The raw label itself is kept on [`PendingNotification`] and
/// passed through to [`PayloadData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Improved,
    Worsened,
}

impl Direction {
    pub fn from_label(label: &str) -> Self {
        if label == "improved" {
            Self::Improved
        } else {
            Self::Worsened
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Improved => "improved",
            Self::Worsened => "worsened",
        }
    }

    fn emoji(self) -> &'static str {
        match self {
            Self::Improved => "📉",
            Self::Worsened => "📈",
        }
    }

    fn arrow(self) -> &'static str {
        match self {
            Self::Improved => "↓",
            Self::Worsened => "↑",
        }
    }
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// Client key material from `PushSubscription.toJSON()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Client P-256 ECDH public key (base64url).
    pub p256dh: String,
    /// Client auth secret (base64url).
    pub auth: String,
}

/// One browser/device push registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    /// Push service URL; unique per device and browser install.
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

// ---------------------------------------------------------------------------
// PendingNotification
// ---------------------------------------------------------------------------

/// A queued score-change event awaiting delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingNotification {
    pub id: DbId,
    pub product_id: DbId,
    pub product_name: String,
    pub old_score: i32,
    pub new_score: i32,
    /// Upstream direction label, normally `"improved"` or `"worsened"`.
    #[serde(rename = "direction")]
    pub direction_label: String,
    /// Device subscriptions of the owning user. `null` decodes as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub subscriptions: Vec<PushSubscription>,
}

impl PendingNotification {
    pub fn direction(&self) -> Direction {
        Direction::from_label(&self.direction_label)
    }

    /// Signed score change, `new_score - old_score`.
    pub fn delta(&self) -> i32 {
        self.new_score - self.old_score
    }

    pub fn abs_delta(&self) -> u32 {
        self.delta().unsigned_abs()
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Status written back to the queue once a notification is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }
}

// ---------------------------------------------------------------------------
// PushPayload
// ---------------------------------------------------------------------------

/// Structured data the service worker uses for click handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadData {
    pub product_id: DbId,
    pub old_score: i32,
    pub new_score: i32,
    /// Upstream label, unchanged.
    pub direction: String,
}

/// The JSON document delivered to the service worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// In-app deep link to the product page.
    pub url: String,
    pub data: PayloadData,
}

impl PushPayload {
    /// Build the user-visible message for a score change.
    pub fn for_notification(notification: &PendingNotification) -> Self {
        let direction = notification.direction();
        Self {
            title: format!("{} Score {}", direction.emoji(), direction.as_str()),
            body: format!(
                "{}: {} → {} ({}{})",
                notification.product_name,
                notification.old_score,
                notification.new_score,
                direction.arrow(),
                notification.abs_delta(),
            ),
            icon: NOTIFICATION_ICON.to_string(),
            badge: NOTIFICATION_BADGE.to_string(),
            url: format!("/app/product/{}", notification.product_id),
            data: PayloadData {
                product_id: notification.product_id,
                old_score: notification.old_score,
                new_score: notification.new_score,
                direction: notification.direction_label.clone(),
            },
        }
    }

    /// Serialise to the bytes sent as the push message body.
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
