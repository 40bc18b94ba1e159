use std::sync::Arc;

use scorepush_store::NotificationStore;
use scorepush_webpush::PushTransport;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Backend notification queue and subscription store.
    pub store: Arc<dyn NotificationStore>,
    /// Push delivery, built once from the VAPID credentials. `None` when
    /// they are not configured, which every caller treats as "push
    /// disabled" rather than an error to raise.
    pub transport: Option<Arc<dyn PushTransport>>,
}

impl AppState {
    pub fn push_enabled(&self) -> bool {
        self.transport.is_some()
    }
}
