//! Delivery outcomes for a single subscription and for a whole batch.

use serde::{Deserialize, Serialize};

/// Result of one push attempt against one subscription endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub success: bool,
    /// HTTP status from the push service; `0` when no response was received.
    pub status: u16,
    /// The push service reported the subscription as permanently gone.
    pub expired: bool,
}

impl DispatchOutcome {
    /// Classify a push service response status.
    ///
    /// 2xx is delivered, 404/410 mean the subscription is dead, everything
    /// else is a transient failure left for the next dispatch cycle.
    pub fn from_status(status: u16) -> Self {
        Self {
            success: (200..300).contains(&status),
            status,
            expired: matches!(status, 404 | 410),
        }
    }

    /// Outcome for a request that never produced a response (DNS, TLS,
    /// timeout, signing failure).
    pub fn network_failure() -> Self {
        Self {
            success: false,
            status: 0,
            expired: false,
        }
    }
}

/// Summary returned to the caller of a dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
    pub expired_cleaned: usize,
}
