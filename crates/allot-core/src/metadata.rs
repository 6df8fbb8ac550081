//! Durable namespaced key/value metadata with explicit save semantics.
//!
//! A [`MetaDict`] is a JSON object persisted as a single blob. State is
//! loaded lazily on first access and mutations stay in memory until
//! [`MetaDict::save`] flushes the whole namespace, so every key set between
//! two saves becomes durable together. Read-modify-write is the caller's
//! responsibility; nothing persists as a side effect of mutation.

use crate::store::{BlobStore, StoreError};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

type Entries = IndexMap<String, Value>;

pub struct MetaDict {
    store: Arc<dyn BlobStore>,
    path: String,
    entries: Option<Entries>,
}

impl MetaDict {
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
            entries: None,
        }
    }

    /// The blob path this namespace persists to.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw value for `key`, if present.
    pub fn get(&mut self, key: &str) -> Result<Option<&Value>, StoreError> {
        Ok(self.entries()?.get(key))
    }

    /// Typed value for `key`, if present.
    pub fn get_as<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, StoreError> {
        let path = self.path.clone();
        self.entries()?
            .get(key)
            .cloned()
            .map(|value| {
                serde_json::from_value(value).map_err(|e| StoreError::Corrupt { path, source: e })
            })
            .transpose()
    }

    pub fn contains(&mut self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries()?.contains_key(key))
    }

    /// Set `key` in memory. Not durable until [`MetaDict::save`].
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let path = self.path.clone();
        let value =
            serde_json::to_value(value).map_err(|e| StoreError::Corrupt { path, source: e })?;
        self.entries()?.insert(key.to_string(), value);
        Ok(())
    }

    /// Insertion-ordered keys of the namespace.
    pub fn keys(&mut self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries()?.keys().cloned().collect())
    }

    /// Flush the whole namespace durably.
    pub fn save(&mut self) -> Result<(), StoreError> {
        let encoded = {
            let entries = self.entries()?;
            serde_json::to_vec(&*entries)
        };
        let bytes = encoded.map_err(|e| StoreError::Corrupt {
            path: self.path.clone(),
            source: e,
        })?;
        self.store.write(&self.path, &bytes)?;
        debug!(path = %self.path, "metadata saved");
        Ok(())
    }

    fn entries(&mut self) -> Result<&mut Entries, StoreError> {
        if self.entries.is_none() {
            let entries = match self.store.read(&self.path) {
                Ok(bytes) => {
                    serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                        path: self.path.clone(),
                        source: e,
                    })?
                }
                Err(StoreError::NotFound(_)) => Entries::new(),
                Err(other) => return Err(other),
            };
            self.entries = Some(entries);
        }
        Ok(self.entries.get_or_insert_with(Entries::new))
    }
}
