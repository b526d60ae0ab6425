//! Namespaced persistence over a pluggable key/value medium.
//!
//! [`KeyValueStore`] is the raw contract. [`Persistence`] layers the record
//! format and the soft-failure policy on top of it: read and write errors are
//! logged and reported as "nothing there" / `false`, never propagated.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::GroceryError;

pub const DEFAULT_NAMESPACE: &str = "grocer_grocery_";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Returns whether a value was present.
    fn remove(&self, key: &str) -> Result<bool>;
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;
}

/// In-process store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries()?.remove(key).is_some())
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// A stored payload stamped with its write time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<T> {
    #[serde(flatten)]
    pub payload: T,
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
}

/// Payload shape shared by the purchased, pantry and missing-items records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemsPayload<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    pub key_count: usize,
    pub total_bytes: usize,
}

impl StorageUsage {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn formatted_size(&self) -> String {
        format!("{:.2} KB", self.total_bytes as f64 / 1024.0)
    }
}

#[derive(Clone)]
pub struct Persistence {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
}

impl Persistence {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_namespace(store, DEFAULT_NAMESPACE)
    }

    #[must_use]
    pub fn with_namespace(store: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        Self {
            store,
            namespace: namespace.to_string(),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.namespace)
    }

    /// Read and decode the record under `key`.
    ///
    /// Missing, unreadable and malformed records all come back as `None`.
    pub fn read_record<T: DeserializeOwned>(&self, key: &str) -> Option<Record<T>> {
        let full_key = self.full_key(key);
        let raw = match self.store.get(&full_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(source) => {
                let err = GroceryError::Persistence {
                    key: full_key,
                    source,
                };
                tracing::warn!(error = %err, cause = %err_cause(&err), "grocery storage read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(source) => {
                let err = GroceryError::MalformedData {
                    key: full_key,
                    source,
                };
                tracing::warn!(error = %err, cause = %err_cause(&err), "discarding malformed grocery record");
                None
            }
        }
    }

    /// Stamp `payload` with the current time and store it under `key`.
    pub fn write_record<T: Serialize>(&self, key: &str, payload: &T) -> bool {
        let full_key = self.full_key(key);
        let record = Record {
            payload,
            last_updated: Utc::now(),
        };
        let result = serde_json::to_string(&record)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.store.set(&full_key, &json));

        match result {
            Ok(()) => {
                tracing::debug!(key = %full_key, "grocery record written");
                true
            }
            Err(source) => {
                let err = GroceryError::Persistence {
                    key: full_key,
                    source,
                };
                tracing::warn!(error = %err, cause = %err_cause(&err), "grocery storage write failed");
                false
            }
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        let full_key = self.full_key(key);
        match self.store.remove(&full_key) {
            Ok(existed) => existed,
            Err(source) => {
                let err = GroceryError::Persistence {
                    key: full_key,
                    source,
                };
                tracing::warn!(error = %err, cause = %err_cause(&err), "grocery storage delete failed");
                false
            }
        }
    }

    /// Every key in this namespace, namespace prefix included.
    pub fn keys(&self) -> Vec<String> {
        self.store
            .list_keys(&self.namespace)
            .unwrap_or_else(|err| {
                tracing::warn!(error = %err, "failed to list grocery storage keys");
                Vec::new()
            })
    }

    /// Remove every key in this namespace. Returns how many were removed.
    pub fn clear_all(&self) -> usize {
        let mut removed = 0;
        for key in self.keys() {
            match self.store.remove(&key) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(err) => tracing::warn!(key = %key, error = %err, "failed to clear grocery key"),
            }
        }
        removed
    }

    pub fn usage(&self) -> StorageUsage {
        let keys = self.keys();
        let total_bytes = keys
            .iter()
            .filter_map(|key| match self.store.get(key) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "failed to read grocery key size");
                    None
                }
            })
            .map(|value| value.len())
            .sum();
        StorageUsage {
            key_count: keys.len(),
            total_bytes,
        }
    }
}

fn err_cause(err: &GroceryError) -> String {
    std::error::Error::source(err).map_or_else(String::new, ToString::to_string)
}
