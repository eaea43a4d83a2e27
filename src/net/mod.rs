//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! WebSocket upgrade accepted
//!     → ConnectionTracker::try_track (limit check)
//!     → Connection (id, claim, outbound queue)
//!     → handed to the dispatcher for every inbound request
//! ```

pub mod connection;

pub use connection::{Connection, ConnectionGuard, ConnectionId, ConnectionTracker};
