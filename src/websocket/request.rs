//! Inbound upgrade request descriptor.

use axum::http::{header, request::Parts, HeaderMap, HeaderValue, Method, Request, Uri};

/// The parts of an inbound request the bridge needs.
///
/// Header names in [`HeaderMap`] are stored lower-cased, so every lookup is
/// case-insensitive regardless of how the client spelled them.
#[derive(Debug, Clone)]
pub struct UpgradeRequest {
    pub method: Method,
    pub uri: Uri,
    /// Host the client asked for (`Host` header, else the URI authority).
    pub host: String,
    pub headers: HeaderMap,
}

impl UpgradeRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        let host = headers
            .get(header::HOST)
            .and_then(host_from_header)
            .or_else(|| uri.authority().map(|a| a.to_string()))
            .unwrap_or_default();

        Self {
            method,
            uri,
            host,
            headers,
        }
    }

    /// Snapshot an inbound request without consuming its body or extensions.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::new(
            request.method().clone(),
            request.uri().clone(),
            request.headers().clone(),
        )
    }

    pub fn from_parts(parts: &Parts) -> Self {
        Self::new(parts.method.clone(), parts.uri.clone(), parts.headers.clone())
    }

    /// The client's `Sec-WebSocket-Key`, or the empty nonce when absent.
    pub fn nonce(&self) -> &[u8] {
        self.headers
            .get(header::SEC_WEBSOCKET_KEY)
            .map(|v| v.as_bytes())
            .unwrap_or_default()
    }

    /// Point the request at another origin, keeping path and query.
    pub fn retarget(&mut self, origin: &Uri) {
        let mut parts = origin.clone().into_parts();
        parts.path_and_query = self.uri.path_and_query().cloned();
        if let Ok(uri) = Uri::from_parts(parts) {
            self.uri = uri;
        }
    }
}

/// The `Host` value as sent. Non-ASCII UTF-8 is kept byte for byte; only a
/// value that is not UTF-8 at all is given up on.
fn host_from_header(value: &HeaderValue) -> Option<String> {
    match std::str::from_utf8(value.as_bytes()) {
        Ok(host) => Some(host.to_string()),
        Err(_) => {
            tracing::debug!(host = ?value, "Host header is not UTF-8, using the URI authority");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_prefers_header() {
        let req = Request::builder()
            .uri("http://internal:3000/ws")
            .header("host", "public.example.com")
            .body(())
            .unwrap();
        let upgrade = UpgradeRequest::from_request(&req);
        assert_eq!(upgrade.host, "public.example.com");
    }

    #[test]
    fn host_falls_back_to_authority() {
        let req = Request::builder()
            .uri("http://internal:3000/ws")
            .body(())
            .unwrap();
        assert_eq!(UpgradeRequest::from_request(&req).host, "internal:3000");

        let req = Request::builder().uri("/ws").body(()).unwrap();
        assert_eq!(UpgradeRequest::from_request(&req).host, "");
    }

    #[test]
    fn non_ascii_host_is_kept_as_sent() {
        let raw = "b\u{fc}cher.example".as_bytes();
        let req = Request::builder()
            .uri("http://internal:3000/ws")
            .header("host", HeaderValue::from_bytes(raw).unwrap())
            .body(())
            .unwrap();
        let upgrade = UpgradeRequest::from_request(&req);
        assert_eq!(upgrade.host.as_bytes(), raw);

        let outbound = crate::websocket::outbound_headers(&upgrade.headers, &upgrade.host);
        assert_eq!(outbound.get(header::HOST).unwrap().as_bytes(), raw);
    }

    #[test]
    fn non_utf8_host_falls_back_to_authority() {
        let req = Request::builder()
            .uri("http://internal:3000/ws")
            .header("host", HeaderValue::from_bytes(b"bad\xffhost").unwrap())
            .body(())
            .unwrap();
        assert_eq!(UpgradeRequest::from_request(&req).host, "internal:3000");
    }

    #[test]
    fn missing_nonce_is_empty() {
        let req = Request::builder().uri("/ws").body(()).unwrap();
        assert!(UpgradeRequest::from_request(&req).nonce().is_empty());

        let req = Request::builder()
            .uri("/ws")
            .header("Sec-WebSocket-Key", "abc")
            .body(())
            .unwrap();
        assert_eq!(UpgradeRequest::from_request(&req).nonce(), b"abc");
    }

    #[test]
    fn retarget_keeps_path_and_query() {
        let req = Request::builder().uri("/chat?room=7").body(()).unwrap();
        let mut upgrade = UpgradeRequest::from_request(&req);
        upgrade.retarget(&"https://backend.internal:8443".parse().unwrap());
        assert_eq!(
            upgrade.uri.to_string(),
            "https://backend.internal:8443/chat?room=7"
        );
    }
}
