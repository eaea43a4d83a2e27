//! Fail-soft data loading for the dispatch pipeline.
//!
//! A matched route must always produce a reply, so every store failure here
//! degrades to an empty value instead of propagating.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::observability::metrics;
use crate::store::Store;

#[derive(Clone)]
pub struct DataLoader {
    store: Arc<dyn Store>,
}

impl DataLoader {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// One record, or an empty object on miss or error.
    pub fn fetch_one(&self, table: &str, key: &str) -> Value {
        match self.store.get_one(table, key) {
            Ok(value) => value,
            Err(e) => {
                if e.is_not_found() {
                    tracing::debug!(table, key, "Record not found");
                } else {
                    tracing::warn!(table, key, error = %e, "Failed to load record");
                }
                metrics::record_store_soft_failure("fetch_one");
                Value::Object(Map::new())
            }
        }
    }

    /// Every record of a table, or an empty list on error.
    pub fn fetch_all(&self, table: &str) -> Vec<Value> {
        match self.store.get_all(table) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(table, error = %e, "Failed to load table");
                metrics::record_store_soft_failure("fetch_all");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn loader() -> (Arc<MemoryStore>, DataLoader) {
        let store = Arc::new(MemoryStore::new());
        let loader = DataLoader::new(store.clone());
        (store, loader)
    }

    #[test]
    fn test_fetch_one_hit_and_miss() {
        let (store, loader) = loader();
        store.insert("widgets", "abc", r#"{"color":"red"}"#).unwrap();
        assert_eq!(loader.fetch_one("widgets", "abc"), json!({"color": "red"}));
        assert_eq!(loader.fetch_one("widgets", "nope"), json!({}));
    }

    #[test]
    fn test_malformed_is_soft() {
        let (store, loader) = loader();
        store.insert("widgets", "bad", "nope{").unwrap();
        store.insert("widgets", "good", "{}").unwrap();
        assert_eq!(loader.fetch_one("widgets", "bad"), json!({}));
        assert!(loader.fetch_all("widgets").is_empty());
    }

    #[test]
    fn test_fetch_all() {
        let (store, loader) = loader();
        store.insert("t", "1", r#"{"i":1}"#).unwrap();
        store.insert("t", "2", r#"{"i":2}"#).unwrap();
        assert_eq!(loader.fetch_all("t"), vec![json!({"i": 1}), json!({"i": 2})]);
        assert!(loader.fetch_all("empty").is_empty());
    }
}
