//! WebSocket upgrade bridging subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound HTTP request
//!     → upgrade.rs (is this a websocket upgrade?)
//!     → request.rs (UpgradeRequest: method, uri, host, headers)
//!     → connector.rs
//!         → scheme.rs (http → ws, https → wss)
//!         → headers.rs (strip handshake headers, pin Host)
//!         → dialer.rs (backend handshake over HTTP/1.1)
//!         → accept.rs (Sec-WebSocket-Accept for the client's nonce)
//!     → headers.rs (101 response headers for the client)
//!     → relay.rs (raw bytes both ways until one side ends)
//!
//! Client ←──── raw frames ────→ Bridge ←──── raw frames ────→ Backend
//! ```
//!
//! # Design Decisions
//! - Frames are never parsed; after the handshake both legs are opaque bytes
//! - The dialer regenerates Upgrade/Connection/Sec-WebSocket-* itself
//! - The client always gets an accept token derived from its own nonce
//! - First direction to finish ends the session

pub mod accept;
pub mod connector;
pub mod dialer;
pub mod headers;
pub mod relay;
pub mod request;
pub mod scheme;
pub mod upgrade;

pub use accept::accept_key;
pub use connector::{client_connect, connect_with};
pub use dialer::{DialError, Dialer, DialerConfig, HandshakeResponse, WsDialer};
pub use headers::{outbound_headers, response_headers};
pub use relay::{stream, Direction, RelaySession};
pub use request::UpgradeRequest;
pub use scheme::websocket_scheme;
pub use upgrade::is_websocket_upgrade;
