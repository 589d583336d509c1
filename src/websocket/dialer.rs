//! Backend transport: the WebSocket client handshake.
//!
//! # Responsibilities
//! - Define the [`Dialer`] seam the connector dials through
//! - Provide [`WsDialer`], an HTTP/1.1 upgrade dialer built on reqwest
//! - Regenerate Upgrade/Connection/Sec-WebSocket-Key/Sec-WebSocket-Version
//! - Verify the backend's `Sec-WebSocket-Accept` against our own nonce
//!
//! # Design Decisions
//! - The dialed connection is the raw upgraded byte stream, not a framed one
//! - Environment proxies (`HTTP_PROXY`, `HTTPS_PROXY`, `NO_PROXY`) are honored
//!   unless the config says otherwise
//! - ws/wss are dialed as http/https; the upgrade itself is plain HTTP/1.1

use std::future::Future;
use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue, Response, StatusCode, Version};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use url::Url;

pub use crate::config::schema::DialerConfig;
use crate::websocket::accept::{accept_key, generate_nonce};

/// Status line and headers of a backend handshake. The body is never read.
pub type HandshakeResponse = Response<()>;

/// Errors that can occur while dialing a backend.
#[derive(Debug, Error)]
pub enum DialError {
    /// Backend URL could not be parsed.
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Scheme is neither ws/wss nor http/https.
    #[error("unsupported backend scheme: {0}")]
    UnsupportedScheme(String),

    /// HTTP client could not be constructed (bad proxy URL, TLS backend).
    #[error("dialer setup failed: {0}")]
    Client(reqwest::Error),

    /// DNS, connect, TLS or I/O failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    /// Backend answered with something other than 101.
    #[error("backend rejected handshake with status {}", .response.status())]
    Rejected { response: HandshakeResponse },

    /// Backend switched protocols but did not prove it saw our nonce.
    #[error("backend returned a mismatched Sec-WebSocket-Accept")]
    BadAccept { response: HandshakeResponse },

    /// Connection could not be taken over after the 101.
    #[error("connection upgrade failed: {0}")]
    Upgrade(reqwest::Error),
}

impl DialError {
    /// The backend's handshake response, when it got that far.
    pub fn response(&self) -> Option<&HandshakeResponse> {
        match self {
            DialError::Rejected { response } | DialError::BadAccept { response } => Some(response),
            _ => None,
        }
    }

    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            DialError::InvalidUrl(_) | DialError::UnsupportedScheme(_) => "url",
            DialError::Client(_) => "client",
            DialError::Transport(_) => "transport",
            DialError::Rejected { .. } => "rejected",
            DialError::BadAccept { .. } => "bad_accept",
            DialError::Upgrade(_) => "upgrade",
        }
    }
}

/// Something that can open a WebSocket connection to a backend.
///
/// Implementations own the handshake headers listed in
/// [`STRIPPED_HEADERS`](crate::websocket::headers::STRIPPED_HEADERS) and
/// must send every other header they are given.
pub trait Dialer: Send + Sync {
    /// Raw byte stream left over once the handshake completes.
    type Conn: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn dial(
        &self,
        url: &Url,
        headers: HeaderMap,
    ) -> impl Future<Output = Result<(Self::Conn, HandshakeResponse), DialError>> + Send;
}

/// Default dialer: a GET with upgrade headers over an HTTP/1.1-only client.
#[derive(Debug, Clone)]
pub struct WsDialer {
    client: reqwest::Client,
}

impl WsDialer {
    pub fn new(config: &DialerConfig) -> Result<Self, DialError> {
        let mut builder = reqwest::Client::builder()
            .http1_only()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));

        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str()).map_err(DialError::Client)?;
            builder = builder.proxy(proxy);
        } else if !config.use_env_proxy {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(DialError::Client)?;
        Ok(Self { client })
    }

    /// Dialer with default settings, proxies taken from the environment.
    pub fn from_env() -> Result<Self, DialError> {
        Self::new(&DialerConfig::default())
    }
}

impl Dialer for WsDialer {
    type Conn = reqwest::Upgraded;

    async fn dial(
        &self,
        url: &Url,
        headers: HeaderMap,
    ) -> Result<(Self::Conn, HandshakeResponse), DialError> {
        let target = transport_url(url)?;
        let nonce = generate_nonce();

        tracing::debug!(url = %url, "Dialing backend");

        let response = self
            .client
            .get(target)
            .version(Version::HTTP_11)
            .headers(headers)
            .header(header::CONNECTION, HeaderValue::from_static("Upgrade"))
            .header(header::UPGRADE, HeaderValue::from_static("websocket"))
            .header(header::SEC_WEBSOCKET_VERSION, HeaderValue::from_static("13"))
            .header(header::SEC_WEBSOCKET_KEY, nonce.as_str())
            .send()
            .await
            .map_err(DialError::Transport)?;

        let handshake = handshake_response(&response);

        if response.status() != StatusCode::SWITCHING_PROTOCOLS {
            return Err(DialError::Rejected { response: handshake });
        }

        let expected = accept_key(&nonce);
        let accepted = response
            .headers()
            .get(header::SEC_WEBSOCKET_ACCEPT)
            .is_some_and(|v| v.as_bytes() == expected.as_bytes());
        if !accepted {
            return Err(DialError::BadAccept { response: handshake });
        }

        let conn = response.upgrade().await.map_err(DialError::Upgrade)?;
        Ok((conn, handshake))
    }
}

/// ws → http, wss → https; http/https are accepted as-is.
fn transport_url(url: &Url) -> Result<Url, DialError> {
    let scheme = match url.scheme() {
        "ws" | "http" => "http",
        "wss" | "https" => "https",
        other => return Err(DialError::UnsupportedScheme(other.to_string())),
    };

    let mut target = url.clone();
    if target.set_scheme(scheme).is_err() {
        return Err(DialError::UnsupportedScheme(url.scheme().to_string()));
    }
    Ok(target)
}

fn handshake_response(response: &reqwest::Response) -> HandshakeResponse {
    let mut handshake = Response::new(());
    *handshake.status_mut() = response.status();
    *handshake.version_mut() = response.version();
    *handshake.headers_mut() = response.headers().clone();
    handshake
}
