//! HTTP server setup and the upgrade handler.
//!
//! # Responsibilities
//! - Create Axum Router with the bridge handler
//! - Wire up middleware (tracing, request ID)
//! - Gate requests on WebSocket upgrade intent
//! - Dial the upstream, answer the client with 101, relay the session
//! - Stop accepting and close sessions on shutdown

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::config::BridgeConfig;
use crate::lifecycle::{shutdown, SessionTracker, Shutdown};
use crate::observability::metrics;
use crate::websocket::{
    connect_with, is_websocket_upgrade, relay, response_headers, DialError, UpgradeRequest,
    WsDialer,
};

/// Errors raised while assembling the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configured upstream is not a usable URI.
    #[error("invalid upstream url '{url}': {reason}")]
    InvalidUpstream { url: String, reason: String },

    /// Default dialer could not be built.
    #[error(transparent)]
    Dialer(#[from] DialError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Uri,
    pub preserve_host: bool,
    pub dialer: WsDialer,
    pub handshake_timeout: Duration,
    pub sessions: SessionTracker,
    pub shutdown: Shutdown,
}

/// HTTP front end of the bridge.
pub struct BridgeServer {
    router: Router,
    config: BridgeConfig,
    sessions: SessionTracker,
    shutdown: Shutdown,
}

impl BridgeServer {
    /// Create a new server. `shutdown` stops it and every live session.
    pub fn new(config: BridgeConfig, shutdown: Shutdown) -> Result<Self, ServerError> {
        let upstream: Uri = config
            .upstream
            .url
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| ServerError::InvalidUpstream {
                url: config.upstream.url.clone(),
                reason: e.to_string(),
            })?;
        if upstream.authority().is_none() {
            return Err(ServerError::InvalidUpstream {
                url: config.upstream.url.clone(),
                reason: "missing host".to_string(),
            });
        }

        let dialer = WsDialer::new(&config.dialer)?;
        let sessions = SessionTracker::new();

        let state = AppState {
            upstream,
            preserve_host: config.upstream.preserve_host,
            dialer,
            handshake_timeout: Duration::from_secs(config.timeouts.handshake_secs),
            sessions: sessions.clone(),
            shutdown: shutdown.clone(),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            sessions,
            shutdown,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(bridge_handler))
            .route("/", any(bridge_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Returns after shutdown once live sessions drained or the drain
    /// deadline passed.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.url,
            "Bridge server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(self.shutdown.subscribe()))
            .await?;

        let remaining = self
            .sessions
            .drain(Duration::from_secs(self.config.timeouts.drain_secs))
            .await;
        if remaining > 0 {
            tracing::warn!(sessions = remaining, "Sessions still live at drain deadline");
        }

        tracing::info!("Bridge server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Live session tracker.
    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }
}

/// Upgrade handler.
/// Dials the upstream, completes the client handshake and spawns the relay.
async fn bridge_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    mut request: Request<Body>,
) -> Response {
    // Subscribed before the dial so a shutdown during it is not missed.
    let shutdown_rx = state.shutdown.subscribe();

    if !is_websocket_upgrade(request.headers()) {
        tracing::debug!(peer = %peer, path = %request.uri().path(), "Not a WebSocket upgrade");
        return (
            StatusCode::UPGRADE_REQUIRED,
            [(header::UPGRADE, HeaderValue::from_static("websocket"))],
            "WebSocket upgrade required",
        )
            .into_response();
    }

    let mut upgrade = UpgradeRequest::from_request(&request);
    upgrade.retarget(&state.upstream);
    if !state.preserve_host {
        upgrade.host = state
            .upstream
            .authority()
            .map(|a| a.to_string())
            .unwrap_or_default();
    }

    let dial = tokio::time::timeout(
        state.handshake_timeout,
        connect_with(&upgrade, &state.dialer),
    )
    .await;
    let (backend, backend_response) = match dial {
        Ok(Ok(connected)) => connected,
        Ok(Err(e)) => {
            tracing::warn!(
                peer = %peer,
                upstream = %upgrade.uri,
                error = %e,
                "Backend dial failed"
            );
            metrics::record_dial_failure(e.reason());
            return dial_error_response(&e);
        }
        Err(_) => {
            tracing::warn!(peer = %peer, upstream = %upgrade.uri, "Backend handshake timed out");
            metrics::record_dial_failure("timeout");
            return (StatusCode::GATEWAY_TIMEOUT, "Backend handshake timed out").into_response();
        }
    };

    if state.shutdown.is_triggered() {
        tracing::info!(peer = %peer, "Shutting down, refusing new session");
        return (StatusCode::SERVICE_UNAVAILABLE, "Bridge is shutting down").into_response();
    }

    let on_upgrade = hyper::upgrade::on(&mut request);
    let guard = state.sessions.track();
    let span = tracing::info_span!(
        "session",
        session_id = %guard.id(),
        peer = %peer,
        host = %upgrade.host
    );

    tokio::spawn(
        async move {
            let _guard = guard;
            let client = match on_upgrade.await {
                Ok(upgraded) => TokioIo::new(upgraded),
                Err(e) => {
                    tracing::warn!(error = %e, "Client upgrade failed");
                    return;
                }
            };

            tracing::info!("Session established");
            tokio::select! {
                session = relay::stream(client, backend) => {
                    tracing::info!(finished = ?session.finished(), "Session ended");
                    session.close().await;
                }
                _ = shutdown::wait(shutdown_rx) => {
                    tracing::info!("Session closed for shutdown");
                }
            }
        }
        .instrument(span),
    );

    let mut headers = response_headers(&upgrade);
    if let Some(protocol) = backend_response.headers().get(header::SEC_WEBSOCKET_PROTOCOL) {
        headers.insert(header::SEC_WEBSOCKET_PROTOCOL, protocol.clone());
    }

    (StatusCode::SWITCHING_PROTOCOLS, headers).into_response()
}

/// Map a dial failure to what the client sees.
///
/// A backend that answered with an error status has that status passed on;
/// anything else is a 502.
fn dial_error_response(err: &DialError) -> Response {
    match err.response().map(|r| r.status()) {
        Some(status) if status.is_client_error() || status.is_server_error() => {
            (status, "Backend rejected WebSocket handshake").into_response()
        }
        _ => (StatusCode::BAD_GATEWAY, "Backend WebSocket handshake failed").into_response(),
    }
}
