#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use scorepush_api::config::{DispatchSettings, ServerConfig};
use scorepush_api::router::build_app_router;
use scorepush_api::state::AppState;
use scorepush_core::types::DbId;
use scorepush_core::{
    DispatchOutcome, NotificationStatus, PendingNotification, PushSubscription, SubscriptionKeys,
};
use scorepush_store::{NotificationStore, StoreError};
use scorepush_webpush::PushTransport;

pub const DISPATCH_PATH: &str = "/send-push-notification";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        dispatch: DispatchSettings {
            concurrency: 4,
            ..DispatchSettings::default()
        },
    }
}

/// Build the full application router with all middleware layers.
///
/// `transport: None` simulates missing VAPID configuration.
pub fn build_test_app(store: Arc<MockStore>, transport: Option<Arc<MockTransport>>) -> Router {
    build_test_app_with_config(test_config(), store, transport)
}

pub fn build_test_app_with_config(
    config: ServerConfig,
    store: Arc<MockStore>,
    transport: Option<Arc<MockTransport>>,
) -> Router {
    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        transport: transport.map(|t| t as Arc<dyn PushTransport>),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn send(app: Router, method: Method, uri: &str, auth: Option<&str>) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = auth {
        builder = builder.header("authorization", value);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn post_with_auth(app: Router, uri: &str) -> Response {
    send(app, Method::POST, uri, Some("Bearer test-service-role-key")).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn subscription(endpoint: &str) -> PushSubscription {
    PushSubscription {
        endpoint: endpoint.to_string(),
        keys: SubscriptionKeys {
            p256dh: "BOr3pZ7jC0v0pY4t8b1eA3nVb6Wq5KxB9mQ2hZ8c".to_string(),
            auth: "k9dL2mN4pQ6rS8tU".to_string(),
        },
    }
}

pub fn notification(id: DbId, endpoints: &[&str]) -> PendingNotification {
    PendingNotification {
        id,
        product_id: 100 + id,
        product_name: format!("Product {id}"),
        old_score: 55,
        new_score: 72,
        direction_label: "improved".to_string(),
        subscriptions: endpoints.iter().map(|e| subscription(e)).collect(),
    }
}

// ---------------------------------------------------------------------------
// MockStore
// ---------------------------------------------------------------------------

/// In-memory store that records every write-back call.
#[derive(Default)]
pub struct MockStore {
    pending: Mutex<Vec<PendingNotification>>,
    fail_fetch: bool,
    fail_mark: Option<NotificationStatus>,
    fail_deletes: HashSet<String>,
    pub fetch_calls: AtomicUsize,
    pub fetch_limits: Mutex<Vec<u32>>,
    pub marks: Mutex<Vec<(NotificationStatus, Vec<DbId>)>>,
    pub deleted: Mutex<Vec<String>>,
}

impl MockStore {
    pub fn with_pending(pending: Vec<PendingNotification>) -> Self {
        Self {
            pending: Mutex::new(pending),
            ..Self::default()
        }
    }

    pub fn failing_fetch() -> Self {
        Self {
            fail_fetch: true,
            ..Self::default()
        }
    }

    /// Make every `mark_status` call for `status` return an error.
    pub fn fail_marking(mut self, status: NotificationStatus) -> Self {
        self.fail_mark = Some(status);
        self
    }

    /// Make `delete_subscription` fail for `endpoint`.
    pub fn fail_delete(mut self, endpoint: &str) -> Self {
        self.fail_deletes.insert(endpoint.to_string());
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Ids marked with `status`, across all calls.
    pub fn marked(&self, status: NotificationStatus) -> Vec<DbId> {
        self.marks
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == status)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    pub fn mark_call_count(&self) -> usize {
        self.marks.lock().unwrap().len()
    }

    pub fn deleted_endpoints(&self) -> Vec<String> {
        let mut deleted = self.deleted.lock().unwrap().clone();
        deleted.sort();
        deleted
    }
}

#[async_trait]
impl NotificationStore for MockStore {
    async fn fetch_pending(&self, limit: u32) -> Result<Vec<PendingNotification>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_limits.lock().unwrap().push(limit);
        if self.fail_fetch {
            return Err(StoreError::Rpc {
                function: "api_get_pending_notifications",
                status: 500,
                body: "connection refused".to_string(),
            });
        }
        let pending = self.pending.lock().unwrap();
        Ok(pending.iter().take(limit as usize).cloned().collect())
    }

    async fn mark_status(
        &self,
        ids: &[DbId],
        status: NotificationStatus,
    ) -> Result<(), StoreError> {
        self.marks.lock().unwrap().push((status, ids.to_vec()));
        if self.fail_mark == Some(status) {
            return Err(StoreError::Rpc {
                function: "api_mark_notifications_sent",
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn delete_subscription(&self, endpoint: &str) -> Result<(), StoreError> {
        if self.fail_deletes.contains(endpoint) {
            return Err(StoreError::Rpc {
                function: "api_cleanup_push_subscriptions",
                status: 500,
                body: "deadlock detected".to_string(),
            });
        }
        self.deleted.lock().unwrap().push(endpoint.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

/// Transport that answers with a scripted status per endpoint.
///
/// Unscripted endpoints get `201 Created`. A status of `0` simulates a
/// network failure.
#[derive(Default)]
pub struct MockTransport {
    statuses: HashMap<String, u16>,
    delay: Option<Duration>,
    pub calls: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, endpoint: &str, status: u16) -> Self {
        self.statuses.insert(endpoint.to_string(), status);
        self
    }

    /// Sleep for `delay` before answering each send.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn called_endpoints(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(endpoint, _)| endpoint.clone())
            .collect()
    }
}

#[async_trait]
impl PushTransport for MockTransport {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> DispatchOutcome {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls
            .lock()
            .unwrap()
            .push((subscription.endpoint.clone(), payload.to_vec()));

        match self.statuses.get(&subscription.endpoint).copied().unwrap_or(201) {
            0 => DispatchOutcome::network_failure(),
            status => DispatchOutcome::from_status(status),
        }
    }
}
