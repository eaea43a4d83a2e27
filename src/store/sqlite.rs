//! SQLite-backed store.
//!
//! Every table has the shape `(id INTEGER PRIMARY KEY, key TEXT UNIQUE NOT
//! NULL, value TEXT)`. Table names are validated as plain identifiers before
//! being spliced into SQL, keys and values are always bound parameters.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde_json::Value;

use crate::store::{parse_record, Store, StoreError, StoreResult};

/// Maximum accepted table name length.
const MAX_TABLE_NAME: usize = 64;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        tracing::info!(path = %path.as_ref().display(), "SQLite store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }
}

/// Quote `table` after checking it is a plain identifier.
fn table_ident(table: &str) -> StoreResult<String> {
    let valid = !table.is_empty()
        && table.len() <= MAX_TABLE_NAME
        && table
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        && !table.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(format!("\"{table}\""))
    } else {
        Err(StoreError::InvalidTable(table.to_string()))
    }
}

fn create_table(conn: &Connection, ident: &str) -> StoreResult<()> {
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {ident} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT UNIQUE NOT NULL,
                value TEXT
            )"
        ),
        [],
    )?;
    Ok(())
}

fn is_missing_table(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.starts_with("no such table"))
}

impl Store for SqliteStore {
    fn get_one(&self, table: &str, key: &str) -> StoreResult<Value> {
        let ident = table_ident(table)?;
        let not_found = || StoreError::NotFound {
            table: table.to_string(),
            key: key.to_string(),
        };

        let text: Option<Option<String>> = self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT value FROM {ident} WHERE key = ?1"),
                    params![key],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional();
            match row {
                Ok(row) => Ok(row),
                Err(e) if is_missing_table(&e) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })?;

        match text {
            Some(Some(text)) => parse_record(table, key, &text),
            Some(None) => Ok(Value::Null),
            None => Err(not_found()),
        }
    }

    fn get_all(&self, table: &str) -> StoreResult<Vec<Value>> {
        let ident = table_ident(table)?;
        let rows: Vec<(String, Option<String>)> = self.with_conn(|conn| {
            let mut stmt = match conn.prepare(&format!("SELECT key, value FROM {ident} ORDER BY key")) {
                Ok(stmt) => stmt,
                Err(e) if is_missing_table(&e) => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        rows.iter()
            .map(|(key, text)| match text {
                Some(text) => parse_record(table, key, text),
                None => Ok(Value::Null),
            })
            .collect()
    }

    fn insert(&self, table: &str, key: &str, value: &str) -> StoreResult<()> {
        let ident = table_ident(table)?;
        self.with_conn(|conn| {
            create_table(conn, &ident)?;
            conn.execute(
                &format!(
                    "INSERT INTO {ident} (key, value) VALUES (?1, ?2)
                     ON CONFLICT (key) DO UPDATE SET value = excluded.value"
                ),
                params![key, value],
            )?;
            Ok(())
        })
    }

    fn create(&self, table: &str, key: &str, value: &str) -> StoreResult<()> {
        let ident = table_ident(table)?;
        self.with_conn(|conn| {
            create_table(conn, &ident)?;
            let result = conn.execute(
                &format!("INSERT INTO {ident} (key, value) VALUES (?1, ?2)"),
                params![key, value],
            );
            match result {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::Conflict {
                        table: table.to_string(),
                        key: key.to_string(),
                    })
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn prepare_tables(&self, tables: &[String]) -> StoreResult<()> {
        let idents = tables
            .iter()
            .map(|t| table_ident(t))
            .collect::<StoreResult<Vec<_>>>()?;
        self.with_conn(|conn| {
            for ident in &idents {
                create_table(conn, ident)?;
            }
            Ok(())
        })?;
        tracing::debug!(tables = ?tables, "Tables prepared");
        Ok(())
    }
}
