//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Broadcast → server stops accepting → sessions close their relays
//!
//! Sessions (sessions.rs):
//!     Upgrade bridged → track() → guard dropped when relay ends
//!     Shutdown → drain() waits for the live count to reach zero
//! ```
//!
//! # Design Decisions
//! - Shutdown has timeout: sessions still live after the deadline are left
//!   to process exit

pub mod sessions;
pub mod shutdown;
pub mod signals;

pub use sessions::{SessionGuard, SessionId, SessionTracker};
pub use shutdown::Shutdown;
