//! Session and authentication subsystem.
//!
//! # Data Flow
//! ```text
//! POST /register, /login
//!     → accounts.rs (salted SHA-256 hash in the `auth` table)
//!     → cookie.rs (signed cookie carrying alias + privilege)
//!
//! WebSocket handshake
//!     → claim.rs (verify cookie → SessionClaim, anonymous on any failure)
//!     → attached to the connection, read by the tier resolver
//! ```
//!
//! # Design Decisions
//! - The claim is recomputed from the cookie, never stored server-side
//! - A missing or forged cookie is indistinguishable from an anonymous visitor

pub mod accounts;
pub mod claim;
pub mod cookie;

pub use accounts::{AccountError, Accounts};
pub use claim::{resolve_claim, SessionClaim};
pub use cookie::{CookieCodec, CookieError};
