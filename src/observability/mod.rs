//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Relay copy failures are DEBUG diagnostics, never control flow
//! - Each bridged session carries a session id in its span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
