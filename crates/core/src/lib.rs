//! Shared domain types for the score-change push dispatcher.
//!
//! - [`codec`]: URL-safe, unpadded base64 used by JWS and VAPID keys.
//! - [`notification`]: pending notifications, subscriptions, and the
//!   user-visible push payload built from them.
//! - [`outcome`]: per-subscription delivery outcomes and batch summaries.

pub mod codec;
pub mod error;
pub mod notification;
pub mod outcome;
pub mod types;

pub use error::DecodeError;
pub use notification::{
    Direction, NotificationStatus, PendingNotification, PushPayload, PushSubscription,
    SubscriptionKeys,
};
pub use outcome::{BatchResult, DispatchOutcome};
