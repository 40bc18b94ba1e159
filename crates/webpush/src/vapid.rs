//! VAPID (RFC 8292) credentials and ES256 JWT signing.
//!
//! Keys use the formats browsers and push tooling exchange:
//!
//! - public key: base64url of the 65-byte uncompressed SEC1 point
//!   `0x04 || X(32) || Y(32)` (the `applicationServerKey`);
//! - private key: base64url of the raw 32-byte P-256 scalar `d`.
//!
//! A token is bound to one push-service origin (`aud`), so every distinct
//! origin gets its own JWT. [`VapidSigner`] keeps one per origin while it
//! still has plenty of validity left.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use p256::ecdsa::SigningKey;
use p256::elliptic_curve::rand_core::OsRng;
use p256::elliptic_curve::JwkEcKey;
use p256::pkcs8::EncodePrivateKey;
use p256::SecretKey;
use serde::{Deserialize, Serialize};

use scorepush_core::codec::{base64url_to_bytes, bytes_to_base64url};
use scorepush_core::DecodeError;

/// Lifetime of a signed token. RFC 8292 caps this at 24 hours.
pub const VAPID_TOKEN_LIFETIME: Duration = Duration::from_secs(12 * 60 * 60);

/// A cached token is re-signed once less than this much validity remains.
const TOKEN_REUSE_MARGIN: Duration = Duration::from_secs(60 * 60);

/// Length of an uncompressed SEC1 P-256 point.
const PUBLIC_KEY_LEN: usize = 65;

/// Leading byte of an uncompressed SEC1 point.
const UNCOMPRESSED_POINT_TAG: u8 = 0x04;

/// Length of a P-256 scalar / field element.
const SCALAR_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors raised while preparing or signing a VAPID token.
#[derive(Debug, thiserror::Error)]
pub enum VapidError {
    /// A key was not valid base64url.
    #[error("VAPID {0} is not valid base64url: {1}")]
    Encoding(&'static str, #[source] DecodeError),

    /// The public key is not a 65-byte uncompressed point.
    #[error("VAPID public key must be a 65-byte uncompressed P-256 point")]
    InvalidPublicKey,

    /// The private key is not a 32-byte scalar.
    #[error("VAPID private key must be a 32-byte P-256 scalar, got {0} bytes")]
    InvalidPrivateKeyLength(usize),

    /// The crypto library refused the key pair (invalid scalar, point not on
    /// the curve, or public key not matching the private scalar).
    #[error("VAPID key pair rejected: {0}")]
    KeyPair(String),

    /// The JWS signer failed.
    #[error("Failed to sign VAPID JWT: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The subscription endpoint has no usable origin.
    #[error("Invalid push endpoint: {0}")]
    InvalidEndpoint(String),
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Application server identity used to sign every push request.
#[derive(Clone, PartialEq, Eq)]
pub struct VapidCredentials {
    /// Base64url uncompressed public key, sent as `k=` in the header.
    pub public_key: String,
    /// Base64url raw private scalar.
    pub private_key: String,
    /// `mailto:` or `https:` contact for the push service operator.
    pub subject: String,
}

impl VapidCredentials {
    /// Build credentials only when all three values are present and non-empty.
    ///
    /// Returns `None` otherwise; callers treat that as "push disabled".
    pub fn from_values(
        public_key: Option<String>,
        private_key: Option<String>,
        subject: Option<String>,
    ) -> Option<Self> {
        let non_empty = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Some(Self {
            public_key: non_empty(public_key)?,
            private_key: non_empty(private_key)?,
            subject: non_empty(subject)?,
        })
    }

    /// Load from `VAPID_PUBLIC_KEY`, `VAPID_PRIVATE_KEY` and `VAPID_SUBJECT`.
    pub fn from_env() -> Option<Self> {
        Self::from_values(
            std::env::var("VAPID_PUBLIC_KEY").ok(),
            std::env::var("VAPID_PRIVATE_KEY").ok(),
            std::env::var("VAPID_SUBJECT").ok(),
        )
    }

    /// Check that the key material decodes and forms a matching pair.
    ///
    /// Signing performs the same checks; this exists so startup can warn
    /// early about a bad deployment.
    pub fn validate(&self) -> Result<(), VapidError> {
        let (public, private) = self.decode_keys()?;
        signing_key_from_raw(&public, &private).map(|_| ())
    }

    fn decode_keys(&self) -> Result<(Vec<u8>, Vec<u8>), VapidError> {
        let public = base64url_to_bytes(&self.public_key)
            .map_err(|e| VapidError::Encoding("public key", e))?;
        let private = base64url_to_bytes(&self.private_key)
            .map_err(|e| VapidError::Encoding("private key", e))?;
        Ok((public, private))
    }
}

impl fmt::Debug for VapidCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidCredentials")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("subject", &self.subject)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Key generation
// ---------------------------------------------------------------------------

/// A freshly generated VAPID key pair in the raw base64url formats.
#[derive(Debug, Clone)]
pub struct VapidKeyPair {
    pub public_key: String,
    pub private_key: String,
}

impl VapidKeyPair {
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_point = signing_key.verifying_key().to_encoded_point(false);

        Self {
            public_key: bytes_to_base64url(public_point.as_bytes()),
            private_key: bytes_to_base64url(&signing_key.to_bytes()[..]),
        }
    }
}

// ---------------------------------------------------------------------------
// Signing
// ---------------------------------------------------------------------------

/// JWT claims carried by a VAPID token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VapidClaims {
    pub aud: String,
    pub exp: i64,
    pub sub: String,
}

/// Turn raw VAPID key bytes into an ES256 signing key.
///
/// This is the only place that knows the raw byte layout:
///
/// - `public_key`: 65 bytes, `[0] == 0x04`, `x = [1..33]`, `y = [33..65]`;
/// - `private_key`: 32 bytes, the scalar `d`.
///
/// The pair is imported as a P-256 JWK `{x, y, d}`. The public coordinates
/// are taken from the supplied public key, never derived here, and the
/// import fails unless they match `d`. The key is then re-encoded as PKCS#8
/// for the JWS signer, whose ES256 output is the fixed 64-byte `r || s`
/// form JWS requires (not DER).
pub fn signing_key_from_raw(
    public_key: &[u8],
    private_key: &[u8],
) -> Result<EncodingKey, VapidError> {
    if public_key.len() != PUBLIC_KEY_LEN || public_key[0] != UNCOMPRESSED_POINT_TAG {
        return Err(VapidError::InvalidPublicKey);
    }
    if private_key.len() != SCALAR_LEN {
        return Err(VapidError::InvalidPrivateKeyLength(private_key.len()));
    }

    let jwk = serde_json::json!({
        "kty": "EC",
        "crv": "P-256",
        "x": bytes_to_base64url(&public_key[1..1 + SCALAR_LEN]),
        "y": bytes_to_base64url(&public_key[1 + SCALAR_LEN..]),
        "d": bytes_to_base64url(private_key),
    });
    let jwk: JwkEcKey =
        serde_json::from_value(jwk).map_err(|e| VapidError::KeyPair(e.to_string()))?;

    let secret = SecretKey::from_jwk(&jwk).map_err(|_| {
        VapidError::KeyPair("private scalar is invalid or does not match the public key".into())
    })?;
    let der = secret
        .to_pkcs8_der()
        .map_err(|e| VapidError::KeyPair(e.to_string()))?;

    Ok(EncodingKey::from_ec_der(der.as_bytes()))
}

/// Sign a VAPID JWT for `audience` that expires [`VAPID_TOKEN_LIFETIME`]
/// from now.
///
/// `audience` must be the push service origin (`scheme://host[:port]`),
/// see [`audience_for_endpoint`].
pub fn create_vapid_jwt(
    audience: &str,
    subject: &str,
    public_key: &str,
    private_key: &str,
) -> Result<String, VapidError> {
    let credentials = VapidCredentials {
        public_key: public_key.to_string(),
        private_key: private_key.to_string(),
        subject: subject.to_string(),
    };
    sign_at(&credentials, audience, chrono::Utc::now().timestamp())
}

fn sign_at(
    credentials: &VapidCredentials,
    audience: &str,
    issued_at: i64,
) -> Result<String, VapidError> {
    let (public, private) = credentials.decode_keys()?;
    let key = signing_key_from_raw(&public, &private)?;

    let claims = VapidClaims {
        aud: audience.to_string(),
        exp: issued_at + VAPID_TOKEN_LIFETIME.as_secs() as i64,
        sub: credentials.subject.clone(),
    };

    // Header::new sets typ = "JWT".
    Ok(jsonwebtoken::encode(
        &Header::new(Algorithm::ES256),
        &claims,
        &key,
    )?)
}

/// The origin of a subscription endpoint, used as the JWT audience.
///
/// The port is included only when it is not the scheme default; the path
/// and query are dropped.
pub fn audience_for_endpoint(endpoint: &str) -> Result<String, VapidError> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|e| VapidError::InvalidEndpoint(e.to_string()))?;

    if !matches!(url.scheme(), "https" | "http") {
        return Err(VapidError::InvalidEndpoint(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }

    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(VapidError::InvalidEndpoint("endpoint has no origin".into()));
    }
    Ok(origin.ascii_serialization())
}

// ---------------------------------------------------------------------------
// VapidSigner
// ---------------------------------------------------------------------------

struct CachedToken {
    token: String,
    expires_at: i64,
}

/// Signs and caches VAPID tokens for one set of credentials.
///
/// Tokens are cached per audience and reused until less than an hour of
/// validity remains. The cache lock is never held across an await.
pub struct VapidSigner {
    credentials: VapidCredentials,
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl VapidSigner {
    pub fn new(credentials: VapidCredentials) -> Self {
        Self {
            credentials,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Base64url public key for the `k=` parameter.
    pub fn public_key(&self) -> &str {
        &self.credentials.public_key
    }

    /// Return a valid token for `audience`, signing a new one if needed.
    pub fn token_for(&self, audience: &str) -> Result<String, VapidError> {
        let now = chrono::Utc::now().timestamp();
        let margin = TOKEN_REUSE_MARGIN.as_secs() as i64;

        if let Some(cached) = self.lock_cache().get(audience) {
            if cached.expires_at - now > margin {
                return Ok(cached.token.clone());
            }
        }

        let token = sign_at(&self.credentials, audience, now)?;
        tracing::debug!(audience, "Signed new VAPID token");

        self.lock_cache().insert(
            audience.to_string(),
            CachedToken {
                token: token.clone(),
                expires_at: now + VAPID_TOKEN_LIFETIME.as_secs() as i64,
            },
        );
        Ok(token)
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, CachedToken>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for VapidSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidSigner")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
