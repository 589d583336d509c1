//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;

use ws_bridge::{BridgeConfig, BridgeServer, Shutdown};

/// `Host` header the echo backend saw on its most recent handshake.
pub type SeenHost = Arc<Mutex<Option<String>>>;

/// Start a WebSocket backend that echoes text and binary messages.
///
/// Records the `Host` header of each handshake and agrees to the `chat`
/// subprotocol when asked for it.
#[allow(dead_code)]
pub async fn start_echo_backend() -> (SocketAddr, SeenHost) {
    start_delayed_echo_backend(Duration::ZERO).await
}

/// Echo backend that holds each connection for `delay` before answering the
/// handshake.
#[allow(dead_code)]
pub async fn start_delayed_echo_backend(delay: Duration) -> (SocketAddr, SeenHost) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: SeenHost = Arc::new(Mutex::new(None));
    let seen_task = seen.clone();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let seen = seen_task.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let callback = move |request: &Request,
                                     mut response: Response|
                      -> Result<Response, ErrorResponse> {
                    *seen.lock().unwrap() = request
                        .headers()
                        .get("host")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    if request.headers().get("sec-websocket-protocol").is_some() {
                        response
                            .headers_mut()
                            .insert("sec-websocket-protocol", HeaderValue::from_static("chat"));
                    }
                    Ok(response)
                };

                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(socket, callback).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    if msg.is_text() || msg.is_binary() {
                        if ws.send(msg).await.is_err() {
                            break;
                        }
                    }
                }
            });
        }
    });

    (addr, seen)
}

/// Start a plain HTTP backend that refuses every upgrade with `status`.
#[allow(dead_code)]
pub async fn start_rejecting_backend(status: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Start a bridge in front of `upstream`. Returns its address and the
/// shutdown handle that stops it.
#[allow(dead_code)]
pub async fn start_bridge(upstream: SocketAddr) -> (SocketAddr, Shutdown) {
    let mut config = BridgeConfig::default();
    config.upstream.url = format!("http://{}", upstream);
    config.dialer.use_env_proxy = false;
    config.timeouts.handshake_secs = 5;
    config.timeouts.drain_secs = 1;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = BridgeServer::new(config, shutdown.clone()).unwrap();

    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    (addr, shutdown)
}
