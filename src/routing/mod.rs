//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound path
//!     → table.rs (added routes, then declared routes)
//!     → pattern.rs (compiled regex, capture groups)
//!     → tier.rs (general / authorized / admin)
//!     → field.rs ($n placeholders → captured substrings)
//!     → ResolvedRoute (table, key, template, controllers)
//!
//! Route Compilation (at startup):
//!     RouteDecl[] + added handlers
//!     → Compile patterns once
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins (added before declared, then list order)

pub mod field;
pub mod pattern;
pub mod table;
pub mod tier;

pub use pattern::{Captures, CompiledPattern};
pub use table::{AddedRoute, ResolvedRoute, Route, RouteHandler, RouteMatch, RouteTable, RouteTableBuilder, TableError};
pub use tier::{resolve_tier, Tier};
