//! Library-level tests: dial a real backend and relay raw frames.

use std::time::Duration;

use axum::http::{HeaderMap, HeaderValue, Method, Uri};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use ws_bridge::config::DialerConfig;
use ws_bridge::websocket::{
    client_connect, relay, DialError, HandshakeResponse, UpgradeRequest, WsDialer,
};

mod common;

fn no_proxy_dialer() -> WsDialer {
    WsDialer::new(&DialerConfig {
        use_env_proxy: false,
        ..DialerConfig::default()
    })
    .unwrap()
}

type DialResult = Result<(reqwest::Upgraded, HandshakeResponse), DialError>;

fn dial_error(result: DialResult) -> DialError {
    match result {
        Ok(_) => panic!("dial should have failed"),
        Err(e) => e,
    }
}

fn upgrade_request(uri: String) -> UpgradeRequest {
    let mut headers = HeaderMap::new();
    headers.insert("upgrade", HeaderValue::from_static("websocket"));
    headers.insert("connection", HeaderValue::from_static("Upgrade"));
    headers.insert(
        "sec-websocket-key",
        HeaderValue::from_static("dGhlIHNhbXBsZSBub25jZQ=="),
    );
    headers.insert("sec-websocket-version", HeaderValue::from_static("13"));
    UpgradeRequest::new(Method::GET, uri.parse::<Uri>().unwrap(), headers)
}

#[tokio::test]
async fn test_client_connect_returns_client_accept_token() {
    let (backend_addr, _) = common::start_echo_backend().await;
    let request = upgrade_request(format!("http://{}/echo", backend_addr));
    let dialer = no_proxy_dialer();

    let (_conn, response) = client_connect(&request, Some(&dialer)).await.unwrap();

    assert_eq!(response.status().as_u16(), 101);
    assert_eq!(
        response.headers().get("sec-websocket-accept").unwrap(),
        "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
    );
}

#[tokio::test]
async fn test_client_connect_without_dialer_uses_environment_default() {
    // Any proxy configured in the environment must not capture loopback.
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    std::env::set_var("no_proxy", "127.0.0.1,localhost");

    let (backend_addr, _) = common::start_echo_backend().await;
    let request = upgrade_request(format!("http://{}/echo", backend_addr));

    let (_conn, response) = client_connect(&request, None).await.unwrap();

    assert_eq!(response.status().as_u16(), 101);
    assert_eq!(
        response.headers().get("sec-websocket-accept").unwrap(),
        "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
    );
}

#[tokio::test]
async fn test_raw_frames_relay_after_dial() {
    let (backend_addr, _) = common::start_echo_backend().await;
    let request = upgrade_request(format!("http://{}/echo", backend_addr));
    let dialer = no_proxy_dialer();

    let (backend, _) = client_connect(&request, Some(&dialer)).await.unwrap();
    let (mut client_peer, client_side) = tokio::io::duplex(1024);
    let relay = tokio::spawn(relay::stream(client_side, backend));

    // Masked text frame "hi" with an all-zero mask.
    client_peer
        .write_all(&[0x81, 0x82, 0, 0, 0, 0, b'h', b'i'])
        .await
        .unwrap();

    let mut echoed = [0u8; 4];
    tokio::time::timeout(Duration::from_secs(2), client_peer.read_exact(&mut echoed))
        .await
        .expect("echo in time")
        .unwrap();
    assert_eq!(echoed, [0x81, 0x02, b'h', b'i']);

    drop(client_peer);
    let session = tokio::time::timeout(Duration::from_secs(2), relay)
        .await
        .unwrap()
        .unwrap();
    session.close().await;
}

#[tokio::test]
async fn test_refused_backend_surfaces_transport_error() {
    let addr = common::refused_addr().await;
    let request = upgrade_request(format!("http://{}/", addr));
    let dialer = no_proxy_dialer();

    let err = dial_error(client_connect(&request, Some(&dialer)).await);
    assert!(matches!(err, DialError::Transport(_)), "got {err}");
    assert!(err.response().is_none());
}

#[tokio::test]
async fn test_rejection_keeps_partial_response() {
    let addr = common::start_rejecting_backend("404 Not Found").await;
    let request = upgrade_request(format!("http://{}/missing", addr));
    let dialer = no_proxy_dialer();

    let err = dial_error(client_connect(&request, Some(&dialer)).await);
    assert_eq!(err.response().unwrap().status().as_u16(), 404);
}
