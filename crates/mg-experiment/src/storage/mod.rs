//! Persistent key-value storage capability
//!
//! Stands in for browser-origin storage: string keys, string values, scoped
//! to one profile and surviving reloads until explicitly cleared. Every
//! component reads through a [`SharedStore`] and re-parses on each read; no
//! component keeps an in-memory copy between calls.
//!
//! Writers and readers agree on key names through [`StorageKeys`] only.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// Default names of the five persisted records
pub mod keys {
    /// Sticky pricing assignment
    pub const PRICING_ASSIGNMENT: &str = "mergeguard_variant";
    /// Sticky messaging assignment
    pub const MESSAGING_ASSIGNMENT: &str = "mergeguard_message";
    /// Aggregate counters
    pub const METRICS: &str = "mergeguard_metrics";
    /// Event log
    pub const EVENTS: &str = "mergeguard_events";
    /// Waitlist submissions
    pub const SUBMISSIONS: &str = "mergeguard_waitlist";
}

/// String-keyed, string-valued synchronous store
///
/// Methods take `&self`; implementations provide their own interior
/// mutability. There is no transaction across keys.
pub trait KeyValueStore: Send + Sync + Debug {
    /// Read a value, `None` when absent
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a value; removing an absent key succeeds
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// All keys currently present, sorted
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Store handle shared by every component
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Names of the five persisted records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageKeys {
    /// Sticky pricing assignment
    pub pricing_assignment: String,
    /// Sticky messaging assignment
    pub messaging_assignment: String,
    /// Aggregate counters
    pub metrics: String,
    /// Event log
    pub events: String,
    /// Waitlist submissions
    pub submissions: String,
}

impl StorageKeys {
    /// All keys in declaration order
    #[must_use]
    pub fn all(&self) -> [&str; 5] {
        [
            &self.pricing_assignment,
            &self.messaging_assignment,
            &self.metrics,
            &self.events,
            &self.submissions,
        ]
    }

    /// Keys cleared by a console reset (assignments stay sticky)
    #[must_use]
    pub fn resettable(&self) -> [&str; 3] {
        [&self.metrics, &self.events, &self.submissions]
    }

    /// First key used for more than one record, if any
    #[must_use]
    pub fn first_duplicate(&self) -> Option<&str> {
        let all = self.all();
        all.iter()
            .enumerate()
            .find(|(i, key)| all[..*i].contains(key))
            .map(|(_, key)| *key)
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            pricing_assignment: keys::PRICING_ASSIGNMENT.to_string(),
            messaging_assignment: keys::MESSAGING_ASSIGNMENT.to_string(),
            metrics: keys::METRICS.to_string(),
            events: keys::EVENTS.to_string(),
            submissions: keys::SUBMISSIONS.to_string(),
        }
    }
}

/// Read and parse a persisted JSON value
///
/// Absent keys, a literal `null`, and unparseable text all mean "no data
/// yet" and read as `None`. Only a failing store is an error.
pub fn read_json(store: &dyn KeyValueStore, key: &str) -> Result<Option<Value>, StoreError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding unparseable persisted value");
            Ok(None)
        }
    }
}

/// Read a persisted JSON array, entries kept exactly as stored
///
/// Anything other than an array reads as empty.
pub fn read_json_array(store: &dyn KeyValueStore, key: &str) -> Result<Vec<Value>, StoreError> {
    match read_json(store, key)? {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => {
            tracing::warn!(key, found = json_kind(&other), "persisted log is not an array");
            Ok(Vec::new())
        }
        None => Ok(Vec::new()),
    }
}

/// Append one entry to a persisted JSON array and return the new length
///
/// Existing entries are written back untouched, whatever their shape.
pub fn append_json<T>(store: &dyn KeyValueStore, key: &str, entry: &T) -> Result<usize, StoreError>
where
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(entry).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })?;
    let mut items = read_json_array(store, key)?;
    items.push(value);
    write_json(store, key, &items)?;
    Ok(items.len())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Serialize a full record and persist it under `key`
pub fn write_json<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keys_are_distinct() {
        let keys = StorageKeys::default();
        assert_eq!(keys.first_duplicate(), None);
        assert_eq!(keys.resettable(), ["mergeguard_metrics", "mergeguard_events", "mergeguard_waitlist"]);
    }

    #[test]
    fn duplicate_key_detected() {
        let keys = StorageKeys {
            events: "mergeguard_metrics".to_string(),
            ..StorageKeys::default()
        };
        assert_eq!(keys.first_duplicate(), Some("mergeguard_metrics"));
    }

    #[test]
    fn unparseable_and_null_read_as_none() {
        let store = MemoryStore::with_entries([("bad", "{not json"), ("null", "null")]);
        assert_eq!(read_json(&store, "bad").unwrap(), None);
        assert_eq!(read_json(&store, "null").unwrap(), None);
        assert_eq!(read_json(&store, "absent").unwrap(), None);
    }

    #[test]
    fn non_array_log_reads_as_empty() {
        let store = MemoryStore::with_entries([("scalar", "\"text\""), ("object", "{\"a\":1}")]);
        assert!(read_json_array(&store, "scalar").unwrap().is_empty());
        assert!(read_json_array(&store, "object").unwrap().is_empty());
    }

    #[test]
    fn append_keeps_off_shape_entries() {
        let store = MemoryStore::with_entries([("log", r#"[1,{"odd":null},"x"]"#)]);
        let len = append_json(&store, "log", &serde_json::json!({"type": "new"})).unwrap();

        assert_eq!(len, 4);
        assert_eq!(
            store.get("log").unwrap().as_deref(),
            Some(r#"[1,{"odd":null},"x",{"type":"new"}]"#)
        );
    }

    #[test]
    fn write_then_read() {
        let store = MemoryStore::new();
        write_json(&store, "list", &vec![1u32, 2, 3]).unwrap();
        assert_eq!(store.get("list").unwrap().as_deref(), Some("[1,2,3]"));
        assert_eq!(read_json(&store, "list").unwrap(), Some(serde_json::json!([1, 2, 3])));
    }
}
