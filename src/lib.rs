//! WebSocket upgrade bridge for tunneling reverse proxies.
//!
//! Detects upgrade requests, dials the backend with regenerated handshake
//! headers, answers the client with its own accept token and relays raw
//! bytes until either side goes away.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod websocket;

pub use config::BridgeConfig;
pub use http::BridgeServer;
pub use lifecycle::Shutdown;
