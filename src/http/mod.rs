//! HTTP front end of the bridge.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → bridge_handler (upgrade? → dial upstream → 101)
//!     → hyper upgrade hands over the client connection
//!     → websocket::relay for the session lifetime
//! ```

pub mod server;

pub use server::{AppState, BridgeServer, ServerError};
