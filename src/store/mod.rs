//! Keyed JSON record storage.
//!
//! # Data Flow
//! ```text
//! table → key → JSON text
//!     → Store::get_one / get_all (raw access, typed errors)
//!     → DataLoader (fail-soft: misses and bad JSON become empty values)
//!     → Renderer
//! ```
//!
//! # Design Decisions
//! - Values are stored as JSON text and parsed on read; no schema validation
//! - `insert` is an upsert: last writer wins
//! - `get_all` returns records ordered by key so replies are reproducible
//! - Adapters own identifier safety; table names arrive verbatim from routes

pub mod loader;
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::config::{StoreBackend, StoreConfig};

pub use loader::DataLoader;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors raised by store adapters.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no record {key:?} in table {table:?}")]
    NotFound { table: String, key: String },

    #[error("record {key:?} already exists in table {table:?}")]
    Conflict { table: String, key: String },

    #[error("stored value for {key:?} in table {table:?} is not valid JSON: {source}")]
    Malformed {
        table: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid table name {0:?}")]
    InvalidTable(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A keyed JSON blob store: `table → key → value`.
///
/// Implementations must be safe to call from concurrent dispatch passes.
pub trait Store: Send + Sync {
    /// Fetch and parse one record.
    fn get_one(&self, table: &str, key: &str) -> StoreResult<Value>;

    /// Fetch and parse every record of a table, ordered by key.
    fn get_all(&self, table: &str) -> StoreResult<Vec<Value>>;

    /// Insert or replace the raw JSON text stored under `key`.
    fn insert(&self, table: &str, key: &str, value: &str) -> StoreResult<()>;

    /// Insert only when `key` is absent.
    fn create(&self, table: &str, key: &str, value: &str) -> StoreResult<()>;

    /// Make sure the given tables exist.
    fn prepare_tables(&self, tables: &[String]) -> StoreResult<()>;
}

/// Open the store described by `config`.
pub fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn Store>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.path)?)),
    }
}

pub(crate) fn parse_record(table: &str, key: &str, text: &str) -> StoreResult<Value> {
    serde_json::from_str(text).map_err(|source| StoreError::Malformed {
        table: table.to_string(),
        key: key.to_string(),
        source,
    })
}
