//! Bridged session tracking.
//!
//! # Responsibilities
//! - Generate unique session IDs for tracing
//! - Count live relay sessions for graceful shutdown
//! - Keep the active-sessions gauge in step

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use uuid::Uuid;

use crate::observability::metrics;

/// Unique identifier for a bridged session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ws-{}", self.0)
    }
}

/// Tracks live sessions so shutdown can wait for them.
///
/// The live count is held in a watch channel; draining waits on it instead
/// of polling.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    active_count: Arc<watch::Sender<u64>>,
}

impl Default for SessionTracker {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            active_count: Arc::new(tx),
        }
    }
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new live session. Returns a guard that decrements on drop.
    pub fn track(&self) -> SessionGuard {
        self.active_count.send_modify(|n| *n += 1);
        metrics::record_session_started();
        SessionGuard {
            active_count: Arc::clone(&self.active_count),
            id: SessionId::new(),
        }
    }

    /// Get current live session count.
    pub fn active_count(&self) -> u64 {
        *self.active_count.borrow()
    }

    /// Wait until every session has ended or `timeout` elapses.
    ///
    /// Returns the number of sessions still live when it gave up.
    pub async fn drain(&self, timeout: Duration) -> u64 {
        let mut rx = self.active_count.subscribe();
        // The sender lives in `self`, so `wait_for` only ends on the count.
        let _ = tokio::time::timeout(timeout, rx.wait_for(|n| *n == 0)).await;
        self.active_count()
    }
}

/// Guard that tracks a session's lifetime.
/// Decrements the live count when dropped.
#[derive(Debug)]
pub struct SessionGuard {
    active_count: Arc<watch::Sender<u64>>,
    id: SessionId,
}

impl SessionGuard {
    pub fn id(&self) -> SessionId {
        self.id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active_count.send_modify(|n| *n = n.saturating_sub(1));
        metrics::record_session_ended();
        tracing::trace!(session_id = %self.id, "Session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert!(SessionId::new().to_string().starts_with("ws-"));
    }

    #[test]
    fn tracker_counts() {
        let tracker = SessionTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.track();
        let guard2 = tracker.track();
        assert_eq!(tracker.active_count(), 2);
        assert_ne!(guard1.id(), guard2.id());

        drop(guard1);
        assert_eq!(tracker.active_count(), 1);
        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn drain_returns_when_sessions_end() {
        let tracker = SessionTracker::new();
        let guard = tracker.track();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            drop(guard);
        });

        assert_eq!(tracker.drain(Duration::from_secs(2)).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_wakes_on_last_session_not_on_a_tick() {
        let tracker = SessionTracker::new();
        let guard = tracker.track();
        let drain_tracker = tracker.clone();
        let drain =
            tokio::spawn(async move { drain_tracker.drain(Duration::from_secs(60)).await });

        tokio::task::yield_now().await;
        assert!(!drain.is_finished());

        let started = tokio::time::Instant::now();
        drop(guard);
        assert_eq!(drain.await.unwrap(), 0);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn drain_with_no_sessions_returns_immediately() {
        let tracker = SessionTracker::new();
        assert_eq!(tracker.drain(Duration::ZERO).await, 0);
    }

    #[tokio::test]
    async fn drain_gives_up_after_timeout() {
        let tracker = SessionTracker::new();
        let _guard = tracker.track();
        assert_eq!(tracker.drain(Duration::from_millis(100)).await, 1);
    }
}
