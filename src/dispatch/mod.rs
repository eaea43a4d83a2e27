//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! WebSocket binary frame
//!     → message.rs (decode event + payload)
//!     → dispatcher.rs (route lookup, tier, fields, load, render)
//!     → message.rs (encode "response" frame)
//!     → Connection outbound queue
//! ```

pub mod dispatcher;
pub mod message;

pub use dispatcher::{render_reply, DispatchOutcome, Dispatcher, HandlerContext};
pub use message::{FrameError, Message, REQUEST_EVENT, RESPONSE_EVENT};
