//! Print a fresh VAPID key pair as `.env` lines.
//!
//! ```text
//! cargo run -p scorepush-api --bin vapid-keygen >> .env
//! ```
//!
//! The public key is what browsers pass as `applicationServerKey` when
//! subscribing.

use scorepush_webpush::VapidKeyPair;

fn main() {
    let pair = VapidKeyPair::generate();
    println!("VAPID_PUBLIC_KEY={}", pair.public_key);
    println!("VAPID_PRIVATE_KEY={}", pair.private_key);
}
