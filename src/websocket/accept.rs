//! Sec-WebSocket-Accept derivation (RFC 6455 §1.3).

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use sha1::{Digest, Sha1};

/// GUID appended to the client nonce before hashing.
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Compute the accept token for a client nonce: `base64(sha1(nonce + GUID))`.
///
/// The nonce is hashed as raw bytes and never validated.
pub fn accept_key(nonce: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha1::new();
    hasher.update(nonce.as_ref());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Generate a fresh `Sec-WebSocket-Key`: 16 random bytes, base64 encoded.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE64.encode(bytes)
}
