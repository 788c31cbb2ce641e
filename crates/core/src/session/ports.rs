//! Port interfaces for durable session storage
//!
//! The session store only needs read/write/remove by key. Backends decide
//! how values survive a process restart.

use async_trait::async_trait;
use bookmart_domain::StorageError;
use serde_json::Value;

/// Durable key-value storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, `None` when absent.
    async fn read(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn write(&self, key: &str, value: Value) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
