//! Connection handles and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Carry the session claim decoded at handshake time
//! - Queue outbound frames for the socket writer, waiting when the queue is full
//! - Count live connections for the connection limit and metrics

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::dispatch::Message;
use crate::observability::metrics;
use crate::session::SessionClaim;

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0.simple())
    }
}

/// Frames a connection may have queued before `send` waits on the writer.
pub const OUTBOUND_CAPACITY: usize = 64;

/// The dispatcher's view of one client connection.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    claim: SessionClaim,
    outbound: mpsc::Sender<Message>,
}

impl Connection {
    pub fn new(claim: SessionClaim, outbound: mpsc::Sender<Message>) -> Self {
        Self {
            id: ConnectionId::new(),
            claim,
            outbound,
        }
    }

    /// A connection whose outbound frames land in the returned receiver.
    pub fn channel(claim: SessionClaim) -> (Self, mpsc::Receiver<Message>) {
        Self::with_capacity(claim, OUTBOUND_CAPACITY)
    }

    pub fn with_capacity(claim: SessionClaim, capacity: usize) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(claim, tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn claim(&self) -> &SessionClaim {
        &self.claim
    }

    /// Queue a frame, blocking while the queue is full so a client that
    /// stops reading stalls its own dispatch loop. Returns false when the
    /// socket has gone away.
    ///
    /// Must not be called from async code; dispatch passes run on the
    /// blocking pool.
    pub fn send(&self, message: Message) -> bool {
        if self.outbound.blocking_send(message).is_err() {
            tracing::debug!(connection_id = %self.id, "Dropping frame for closed connection");
            return false;
        }
        true
    }
}

/// Tracks active connections against a limit.
#[derive(Debug, Clone)]
pub struct ConnectionTracker {
    /// Current count of active connections.
    active_count: Arc<AtomicU64>,
    max_connections: u64,
}

impl ConnectionTracker {
    pub fn new(max_connections: usize) -> Self {
        Self {
            active_count: Arc::new(AtomicU64::new(0)),
            max_connections: max_connections as u64,
        }
    }

    /// Record a new active connection, or `None` when the limit is reached.
    /// The returned guard decrements the count on drop.
    pub fn try_track(&self) -> Option<ConnectionGuard> {
        let admitted = self
            .active_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < self.max_connections).then_some(n + 1)
            });
        match admitted {
            Ok(previous) => {
                metrics::set_active_connections(previous + 1);
                Some(ConnectionGuard {
                    active_count: Arc::clone(&self.active_count),
                })
            }
            Err(_) => None,
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a connection's lifetime.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let previous = self.active_count.fetch_sub(1, Ordering::SeqCst);
        metrics::set_active_connections(previous.saturating_sub(1));
    }
}
