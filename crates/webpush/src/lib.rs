//! Web Push delivery (RFC 8030) with VAPID sender identification (RFC 8292).
//!
//! - [`vapid`]: key handling and ES256 JWT signing, one token per
//!   push-service origin.
//! - [`transport`]: the [`PushTransport`] seam and its reqwest-backed
//!   implementation, [`WebPushClient`].

pub mod transport;
pub mod vapid;

pub use transport::{PushTransport, TransportSettings, WebPushClient};
pub use vapid::{VapidCredentials, VapidError, VapidKeyPair, VapidSigner};
