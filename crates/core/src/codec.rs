//! Base64url codec (RFC 4648 §5, no padding) for JWS segments and VAPID keys.
//!
//! Standard base64 is never acceptable here: push services reject JWTs and
//! `k=` parameters that contain `+`, `/` or `=`.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::error::DecodeError;

/// URL-safe engine that emits no padding and accepts input with or without it.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes as unpadded base64url.
pub fn bytes_to_base64url(bytes: &[u8]) -> String {
    BASE64URL.encode(bytes)
}

/// Decode a base64url string, padded or not.
///
/// Characters from the standard alphabet (`+`, `/`) are rejected.
pub fn base64url_to_bytes(input: &str) -> Result<Vec<u8>, DecodeError> {
    Ok(BASE64URL.decode(input)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
