//! Backend leg of the bridge.
//!
//! # Responsibilities
//! - Rewrite the request URL to a ws/wss URL
//! - Sanitize headers for the dialer
//! - Dial, then stamp the client's accept token on the handshake response
//!
//! # Design Decisions
//! - Dial errors are returned exactly as the dialer produced them
//! - No retries; the caller decides what the client sees

use axum::http::header;
use url::Url;

use crate::websocket::dialer::{DialError, Dialer, HandshakeResponse, WsDialer};
use crate::websocket::headers::{accept_header, outbound_headers};
use crate::websocket::request::UpgradeRequest;
use crate::websocket::scheme::uri_websocket_scheme;

/// Connect to the backend named by `request`, using `dialer` or, when
/// `None`, a default [`WsDialer`] that honors environment proxies.
///
/// The caller owns the returned connection and is responsible for closing it.
pub async fn client_connect(
    request: &UpgradeRequest,
    dialer: Option<&WsDialer>,
) -> Result<(reqwest::Upgraded, HandshakeResponse), DialError> {
    match dialer {
        Some(dialer) => connect_with(request, dialer).await,
        None => connect_with(request, &WsDialer::from_env()?).await,
    }
}

/// Connect to the backend through any [`Dialer`].
pub async fn connect_with<D: Dialer>(
    request: &UpgradeRequest,
    dialer: &D,
) -> Result<(D::Conn, HandshakeResponse), DialError> {
    let url = backend_url(request)?;
    let headers = outbound_headers(&request.headers, &request.host);

    let (conn, mut response) = dialer.dial(&url, headers).await?;

    // The backend answered our nonce; the client needs the token for its own.
    response
        .headers_mut()
        .insert(header::SEC_WEBSOCKET_ACCEPT, accept_header(request));

    Ok((conn, response))
}

/// The request URL with its scheme translated to ws/wss.
///
/// Origin-form URIs (`/path`) take their authority from the request host.
/// An empty authority, or one carrying anything beyond host and port, is an
/// invalid URL rather than letting the path stand in for the host.
pub fn backend_url(request: &UpgradeRequest) -> Result<Url, DialError> {
    let scheme = uri_websocket_scheme(&request.uri);
    let authority = request
        .uri
        .authority()
        .map(|a| a.as_str())
        .unwrap_or(request.host.as_str());
    if authority.is_empty() {
        return Err(DialError::InvalidUrl(url::ParseError::EmptyHost));
    }

    let mut target = Url::parse(&format!("{scheme}://{authority}"))?;
    if target.host_str().map_or(true, str::is_empty)
        || !matches!(target.path(), "" | "/")
        || target.query().is_some()
        || target.fragment().is_some()
    {
        return Err(DialError::InvalidUrl(url::ParseError::InvalidDomainCharacter));
    }

    target.set_path(request.uri.path());
    target.set_query(request.uri.query());
    Ok(target)
}
