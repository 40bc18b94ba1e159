//! Push message delivery to a single subscription endpoint.
//!
//! [`WebPushClient`] POSTs an opaque `aes128gcm` body to the push service
//! with a VAPID `Authorization` header and maps the response to a
//! [`DispatchOutcome`]. Delivery never returns an error: network failures,
//! timeouts and signing failures all become a failed outcome with status 0,
//! so one bad subscription cannot abort a batch.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};

use scorepush_core::{DispatchOutcome, PushSubscription};

use crate::vapid::{audience_for_endpoint, VapidError, VapidSigner};

/// Default per-request timeout for a push POST.
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time the push service keeps an undelivered message (24 h).
pub const DEFAULT_TTL_SECS: u32 = 86_400;

// ---------------------------------------------------------------------------
// PushTransport
// ---------------------------------------------------------------------------

/// Delivers one payload to one subscription.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Attempt delivery. Infallible by contract: every failure is reported
    /// through the returned outcome.
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> DispatchOutcome;
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Reasons a push attempt produced no HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error(transparent)]
    Vapid(#[from] VapidError),

    /// The HTTP request failed (DNS, connect, TLS, timeout).
    #[error("Push request failed: {0}")]
    Request(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// WebPushClient
// ---------------------------------------------------------------------------

/// Tunables for [`WebPushClient`].
#[derive(Debug, Clone, Copy)]
pub struct TransportSettings {
    pub timeout: Duration,
    pub ttl_secs: u32,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PUSH_TIMEOUT,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

/// reqwest-backed [`PushTransport`] that signs with a [`VapidSigner`].
///
/// Holds a single pooled HTTP client; share one instance across a batch.
#[derive(Debug)]
pub struct WebPushClient {
    client: reqwest::Client,
    signer: VapidSigner,
    ttl_secs: u32,
}

impl WebPushClient {
    pub fn new(signer: VapidSigner, settings: TransportSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            client,
            signer,
            ttl_secs: settings.ttl_secs,
        })
    }

    /// Sign for `audience`, POST, and return the response status.
    async fn try_send(
        &self,
        subscription: &PushSubscription,
        audience: &str,
        payload: &[u8],
    ) -> Result<u16, PushError> {
        let jwt = self.signer.token_for(audience)?;

        let response = self
            .client
            .post(&subscription.endpoint)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_ENCODING, "aes128gcm")
            .header("TTL", self.ttl_secs.to_string())
            .header(
                AUTHORIZATION,
                format!("vapid t={jwt}, k={}", self.signer.public_key()),
            )
            .body(payload.to_vec())
            .send()
            .await?;

        Ok(response.status().as_u16())
    }
}

#[async_trait]
impl PushTransport for WebPushClient {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> DispatchOutcome {
        let origin = match audience_for_endpoint(&subscription.endpoint) {
            Ok(origin) => origin,
            Err(e) => {
                tracing::warn!(error = %e, "Push send error");
                return DispatchOutcome::network_failure();
            }
        };

        match self.try_send(subscription, &origin, payload).await {
            Ok(status) => {
                let outcome = DispatchOutcome::from_status(status);
                if outcome.success {
                    tracing::debug!(%origin, status, "Push delivered");
                } else if outcome.expired {
                    tracing::info!(%origin, status, "Push subscription expired");
                } else {
                    tracing::warn!(%origin, status, "Push service rejected message");
                }
                outcome
            }
            Err(e) => {
                tracing::warn!(%origin, error = %e, "Push send error");
                DispatchOutcome::network_failure()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use scorepush_core::codec::base64url_to_bytes;
    use scorepush_core::SubscriptionKeys;
    use wiremock::matchers::{body_bytes, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::vapid::{VapidCredentials, VapidKeyPair};

    fn client_with(keys: &VapidKeyPair, settings: TransportSettings) -> WebPushClient {
        let signer = VapidSigner::new(VapidCredentials {
            public_key: keys.public_key.clone(),
            private_key: keys.private_key.clone(),
            subject: "mailto:ops@example.com".to_string(),
        });
        WebPushClient::new(signer, settings).expect("client should build")
    }

    fn subscription(endpoint: String) -> PushSubscription {
        PushSubscription {
            endpoint,
            keys: SubscriptionKeys {
                p256dh: "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA_0QTpQtUbVlUls0VJXg7A8u-Ts1XbjhazAkj7I99e8QcYP7DkM".to_string(),
                auth: "tBHItJI5svbpez7KI4CCXg".to_string(),
            },
        }
    }

    async fn outcome_for_status(status: u16) -> DispatchOutcome {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/push/device"))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with(&VapidKeyPair::generate(), TransportSettings::default());
        client
            .send(&subscription(format!("{}/push/device", server.uri())), b"{}")
            .await
    }

    #[tokio::test]
    async fn created_is_success() {
        let outcome = outcome_for_status(201).await;
        assert_eq!(
            outcome,
            DispatchOutcome {
                success: true,
                status: 201,
                expired: false,
            }
        );
    }

    #[tokio::test]
    async fn ok_is_success() {
        assert!(outcome_for_status(200).await.success);
    }

    #[tokio::test]
    async fn gone_is_expired() {
        let outcome = outcome_for_status(410).await;
        assert!(!outcome.success);
        assert!(outcome.expired);
    }

    #[tokio::test]
    async fn not_found_is_expired() {
        let outcome = outcome_for_status(404).await;
        assert!(!outcome.success);
        assert!(outcome.expired);
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let outcome = outcome_for_status(500).await;
        assert_eq!(
            outcome,
            DispatchOutcome {
                success: false,
                status: 500,
                expired: false,
            }
        );
    }

    #[tokio::test]
    async fn rate_limited_is_transient() {
        let outcome = outcome_for_status(429).await;
        assert!(!outcome.success);
        assert!(!outcome.expired);
    }

    #[tokio::test]
    async fn sends_web_push_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wpush/v2/abc"))
            .and(header("content-type", "application/octet-stream"))
            .and(header("content-encoding", "aes128gcm"))
            .and(header("ttl", "86400"))
            .and(body_bytes(b"opaque-payload".to_vec()))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let keys = VapidKeyPair::generate();
        let client = client_with(&keys, TransportSettings::default());
        let outcome = client
            .send(&subscription(format!("{}/wpush/v2/abc", server.uri())), b"opaque-payload")
            .await;
        assert!(outcome.success);

        let requests = server.received_requests().await.expect("recording enabled");
        let authorization = requests[0]
            .headers
            .get("authorization")
            .expect("authorization header")
            .to_str()
            .unwrap()
            .to_string();

        let rest = authorization.strip_prefix("vapid t=").expect("vapid scheme");
        let (jwt, k) = rest.split_once(", k=").expect("k parameter");
        assert_eq!(k, keys.public_key);

        let claims: serde_json::Value = serde_json::from_slice(
            &base64url_to_bytes(jwt.split('.').nth(1).unwrap()).unwrap(),
        )
        .unwrap();
        assert_eq!(claims["aud"], server.uri());
        assert_eq!(claims["sub"], "mailto:ops@example.com");
    }

    #[tokio::test]
    async fn endpoints_on_one_origin_share_a_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_with(&VapidKeyPair::generate(), TransportSettings::default());
        for device in ["a", "b?x=1"] {
            let endpoint = format!("{}/push/{device}", server.uri());
            assert!(client.send(&subscription(endpoint), b"{}").await.success);
        }

        let requests = server.received_requests().await.expect("recording enabled");
        let tokens: Vec<_> = requests
            .iter()
            .map(|r| r.headers.get("authorization").unwrap().to_str().unwrap())
            .collect();
        assert_eq!(tokens[0], tokens[1]);
    }

    #[tokio::test]
    async fn network_error_is_status_zero() {
        // Reserve a port, then close it so the connection is refused.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/push/device", listener.local_addr().unwrap());
        drop(listener);

        let client = client_with(&VapidKeyPair::generate(), TransportSettings::default());
        let outcome = client.send(&subscription(endpoint), b"{}").await;

        assert_eq!(outcome, DispatchOutcome::network_failure());
    }

    #[tokio::test]
    async fn timeout_is_status_zero() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let settings = TransportSettings {
            timeout: Duration::from_millis(200),
            ..TransportSettings::default()
        };
        let client = client_with(&VapidKeyPair::generate(), settings);
        let outcome = client
            .send(&subscription(format!("{}/slow", server.uri())), b"{}")
            .await;

        assert_eq!(outcome, DispatchOutcome::network_failure());
    }

    #[tokio::test]
    async fn signing_failure_is_status_zero_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let a = VapidKeyPair::generate();
        let b = VapidKeyPair::generate();
        let mismatched = VapidKeyPair {
            public_key: a.public_key,
            private_key: b.private_key,
        };
        let client = client_with(&mismatched, TransportSettings::default());
        let outcome = client
            .send(&subscription(format!("{}/push", server.uri())), b"{}")
            .await;

        assert_eq!(outcome, DispatchOutcome::network_failure());
    }

    #[tokio::test]
    async fn invalid_endpoint_is_status_zero() {
        let client = client_with(&VapidKeyPair::generate(), TransportSettings::default());
        let outcome = client.send(&subscription("nonsense".to_string()), b"{}").await;
        assert_eq!(outcome, DispatchOutcome::network_failure());
    }

    #[test]
    fn push_error_display_wraps_vapid_error() {
        let err = PushError::from(VapidError::InvalidPublicKey);
        assert_eq!(
            err.to_string(),
            "VAPID public key must be a 65-byte uncompressed P-256 point"
        );
    }
}
