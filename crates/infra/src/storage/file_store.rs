//! Session storage in a single JSON document on disk
//!
//! The whole document is rewritten on every mutation: write to a sibling
//! temp file, then rename over the original. A crash mid-write leaves either
//! the old or the new document, never a torn one.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bookmart_core::KeyValueStore;
use bookmart_domain::StorageError;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::errors::conversions::{storage_error, StorageOp};

type Document = Map<String, Value>;

/// [`KeyValueStore`] persisted as one JSON object.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self, key: &str) -> Result<Document, StorageError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(Document::new()),
            Err(err) => return Err(storage_error(StorageOp::Read, key, &err)),
        };
        if contents.trim().is_empty() {
            return Ok(Document::new());
        }

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(document)) => Ok(document),
            Ok(_) => Err(StorageError::Read {
                key: key.to_string(),
                message: format!("{} does not hold a JSON object", self.path.display()),
            }),
            Err(err) => Err(StorageError::Read {
                key: key.to_string(),
                message: format!("{} is not valid JSON: {err}", self.path.display()),
            }),
        }
    }

    async fn persist(
        &self,
        op: StorageOp,
        key: &str,
        document: &Document,
    ) -> Result<(), StorageError> {
        let encoded = serde_json::to_vec_pretty(document).map_err(|err| StorageError::Write {
            key: key.to_string(),
            message: err.to_string(),
        })?;

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| storage_error(op, key, &err))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, encoded).await.map_err(|err| storage_error(op, key, &err))?;
        tokio::fs::rename(&temp, &self.path).await.map_err(|err| storage_error(op, key, &err))?;
        debug!(path = %self.path.display(), entries = document.len(), "session document persisted");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(ToOwned::to_owned).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load(key).await?;
        Ok(document.remove(key))
    }

    #[instrument(skip(self, value), fields(path = %self.path.display()))]
    async fn write(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load(key).await?;
        document.insert(key.to_string(), value);
        self.persist(StorageOp::Write, key, &document).await
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load(key).await?;
        if document.remove(key).is_none() {
            return Ok(());
        }
        self.persist(StorageOp::Remove, key, &document).await
    }
}
