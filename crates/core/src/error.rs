/// Failure to decode a base64url string.
///
/// Raised for characters outside the URL-safe alphabet or an impossible
/// length. For VAPID keys this is a configuration error; for subscription
/// data it only affects the one delivery.
#[derive(Debug, thiserror::Error)]
#[error("Invalid base64url input: {0}")]
pub struct DecodeError(#[from] base64::DecodeError);
