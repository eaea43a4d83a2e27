//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (axum router, request IDs, timeouts, tracing)
//!     ├─ GET /ws            → websocket.rs (claim from cookie, frame loop → Dispatcher)
//!     ├─ POST /register etc → auth.rs (Accounts → Set-Cookie)
//!     ├─ /static/*          → ServeDir
//!     └─ anything else      → base template rendered with the caller's claim
//! ```

pub mod auth;
pub mod server;
pub mod websocket;

pub use server::{AppState, HttpServer};
