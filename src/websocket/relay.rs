//! Bidirectional byte relay between the client and backend legs.
//!
//! # Responsibilities
//! - Copy client → backend and backend → client concurrently
//! - Return as soon as either direction finishes (EOF or error)
//! - Report copy failures as diagnostics only
//!
//! # Design Decisions
//! - One task per direction; completion is signalled over a channel sized
//!   for both, and only the first signal is awaited
//! - The direction still running when [`stream`] returns is owned by the
//!   returned [`RelaySession`]; dropping the session aborts it, which drops
//!   both streams and closes the connections
//! - No timeouts here; the streams themselves carry any deadline

use std::fmt;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::observability::metrics;

/// Which way bytes flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    ClientToBackend,
    BackendToClient,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ClientToBackend => "client_to_backend",
            Direction::BackendToClient => "backend_to_client",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Completion = (Direction, io::Result<u64>);

/// A relay that has seen its first direction finish.
///
/// Holds the copy tasks. Dropping it (or calling [`close`](Self::close))
/// aborts whatever is still running and releases both streams.
#[must_use = "dropping the session closes both streams"]
#[derive(Debug)]
pub struct RelaySession {
    finished: Option<Direction>,
    result: io::Result<u64>,
    tasks: CopyTasks,
}

/// Both copy tasks; aborted together on drop.
#[derive(Debug)]
struct CopyTasks([JoinHandle<()>; 2]);

impl Drop for CopyTasks {
    fn drop(&mut self) {
        for task in &self.0 {
            task.abort();
        }
    }
}

impl RelaySession {
    /// The direction that ended the session.
    ///
    /// `None` only if both copy tasks died without reporting.
    pub fn finished(&self) -> Option<Direction> {
        self.finished
    }

    /// Bytes copied by the finishing direction, or the error that ended it.
    pub fn result(&self) -> &io::Result<u64> {
        &self.result
    }

    /// Abort the straggling direction and wait until both streams are released.
    pub async fn close(mut self) {
        for task in &self.tasks.0 {
            task.abort();
        }
        for task in &mut self.tasks.0 {
            let _ = task.await;
        }
    }
}

/// Relay raw bytes between `client` and `backend` until one direction ends.
///
/// Both streams move into the relay. The call returns on the first EOF or
/// error in either direction; the other direction keeps running until the
/// returned [`RelaySession`] is dropped or closed. Dropping the future
/// before it completes aborts both directions.
pub async fn stream<C, B>(client: C, backend: B) -> RelaySession
where
    C: AsyncRead + AsyncWrite + Send + 'static,
    B: AsyncRead + AsyncWrite + Send + 'static,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (backend_read, backend_write) = tokio::io::split(backend);
    let (done_tx, mut done_rx) = mpsc::channel::<Completion>(2);

    let upstream = spawn_copy(
        Direction::ClientToBackend,
        client_read,
        backend_write,
        done_tx.clone(),
    );
    let downstream = spawn_copy(
        Direction::BackendToClient,
        backend_read,
        client_write,
        done_tx,
    );
    let tasks = CopyTasks([upstream, downstream]);

    let (finished, result) = match done_rx.recv().await {
        Some((direction, result)) => (Some(direction), result),
        None => (
            None,
            Err(io::Error::other("relay tasks exited without reporting")),
        ),
    };

    tracing::debug!(
        finished = finished.map(|d| d.as_str()).unwrap_or("none"),
        "Relay ended"
    );

    RelaySession {
        finished,
        result,
        tasks,
    }
}

fn spawn_copy<R, W>(
    direction: Direction,
    mut reader: R,
    mut writer: W,
    done: mpsc::Sender<Completion>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let result = tokio::io::copy(&mut reader, &mut writer).await;
        match &result {
            Ok(bytes) => {
                metrics::record_relay_bytes(direction, *bytes);
                tracing::trace!(direction = %direction, bytes, "Copy finished");
            }
            Err(e) => {
                tracing::debug!(direction = %direction, error = %e, "Copy failed");
            }
        }
        // Receiver is gone once the session returned; that is fine.
        let _ = done.send((direction, result)).await;
    })
}
