//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown_signal() resolves
//!
//! Shutdown (shutdown.rs):
//!     trigger() → every signaled() future resolves
//!     → server stops accepting → open sockets drain
//! ```
//!
//! # Design Decisions
//! - Startup is linear in `App::new`; any error there is fatal
//! - Shutdown is broadcast so tests can stop a server without OS signals

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
