//! Handshake header rewriting for both legs of the bridge.
//!
//! # Responsibilities
//! - Copy client headers for the backend dial, minus the handshake headers
//!   the dialer generates itself
//! - Pin `Host` to the host the client asked for
//! - Build the `101 Switching Protocols` headers for the client
//!
//! # Design Decisions
//! - The stripped set is a constant; it is never mutated at runtime
//! - `Host` is overwritten so virtual-hosted backends see the original name
//!   instead of one inferred from the dial URL

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::websocket::accept::accept_key;
use crate::websocket::request::UpgradeRequest;

/// Headers the dialer regenerates for its own handshake.
pub const STRIPPED_HEADERS: [HeaderName; 5] = [
    header::UPGRADE,
    header::CONNECTION,
    header::SEC_WEBSOCKET_KEY,
    header::SEC_WEBSOCKET_VERSION,
    header::SEC_WEBSOCKET_EXTENSIONS,
];

/// Copy `headers` for the backend handshake.
///
/// Every value of every header survives except the [`STRIPPED_HEADERS`].
/// `Host` is replaced with `host`; an unrepresentable host removes it so no
/// stale value is forwarded.
pub fn outbound_headers(headers: &HeaderMap, host: &str) -> HeaderMap {
    let mut outbound = headers.clone();
    for name in &STRIPPED_HEADERS {
        outbound.remove(name);
    }

    match HeaderValue::from_str(host) {
        Ok(value) => {
            outbound.insert(header::HOST, value);
        }
        Err(_) => {
            tracing::debug!(host = %host, "Host is not a valid header value, dropping it");
            outbound.remove(header::HOST);
        }
    }

    outbound
}

/// Headers completing the handshake toward the original client.
pub fn response_headers(request: &UpgradeRequest) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(3);
    headers.insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
    headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
    headers.insert(header::SEC_WEBSOCKET_ACCEPT, accept_header(request));
    headers
}

/// `Sec-WebSocket-Accept` value for the client's own nonce.
pub(crate) fn accept_header(request: &UpgradeRequest) -> HeaderValue {
    // base64 output is always a valid header value
    HeaderValue::from_str(&accept_key(request.nonce()))
        .unwrap_or_else(|_| HeaderValue::from_static(""))
}
