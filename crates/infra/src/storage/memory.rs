//! Process-local key-value store

use std::collections::HashMap;

use async_trait::async_trait;
use bookmart_core::KeyValueStore;
use bookmart_domain::StorageError;
use parking_lot::RwLock;
use serde_json::Value;

/// Keeps the session for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}
