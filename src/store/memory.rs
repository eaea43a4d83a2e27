//! In-process store backed by a concurrent map.

use std::collections::BTreeMap;

use dashmap::DashMap;
use serde_json::Value;

use crate::store::{parse_record, Store, StoreError, StoreResult};

/// A thread-safe in-memory store.
///
/// Each table is a `BTreeMap` so `get_all` iterates in key order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<String, BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in `table`.
    pub fn count(&self, table: &str) -> usize {
        self.tables.get(table).map(|t| t.len()).unwrap_or(0)
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }
}

impl Store for MemoryStore {
    fn get_one(&self, table: &str, key: &str) -> StoreResult<Value> {
        let text = self
            .tables
            .get(table)
            .and_then(|t| t.get(key).cloned())
            .ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                key: key.to_string(),
            })?;
        parse_record(table, key, &text)
    }

    fn get_all(&self, table: &str) -> StoreResult<Vec<Value>> {
        let rows: Vec<(String, String)> = match self.tables.get(table) {
            Some(t) => t.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            None => return Ok(Vec::new()),
        };
        rows.iter()
            .map(|(key, text)| parse_record(table, key, text))
            .collect()
    }

    fn insert(&self, table: &str, key: &str, value: &str) -> StoreResult<()> {
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn create(&self, table: &str, key: &str, value: &str) -> StoreResult<()> {
        let mut entry = self.tables.entry(table.to_string()).or_default();
        if entry.contains_key(key) {
            return Err(StoreError::Conflict {
                table: table.to_string(),
                key: key.to_string(),
            });
        }
        entry.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn prepare_tables(&self, tables: &[String]) -> StoreResult<()> {
        for table in tables {
            self.tables.entry(table.clone()).or_default();
        }
        Ok(())
    }
}
