//! Inbound scheme to WebSocket scheme translation.

use axum::http::Uri;

/// Map a URL scheme to its WebSocket equivalent.
///
/// `https` becomes `wss`, `http` and the empty scheme become `ws`,
/// anything else passes through untouched.
pub fn websocket_scheme(scheme: &str) -> &str {
    match scheme {
        "https" => "wss",
        "http" | "" => "ws",
        other => other,
    }
}

/// Scheme translation for a request URI. Origin-form URIs have no scheme.
pub fn uri_websocket_scheme(uri: &Uri) -> &str {
    websocket_scheme(uri.scheme_str().unwrap_or(""))
}
