//! Session store over durable key-value storage

use std::sync::Arc;

use bookmart_domain::constants::{
    DEVICE_ID_PREFIX, DEVICE_ID_SUFFIX_LEN, DEVICE_KEY, TOKEN_KEY, USER_KEY,
};
use bookmart_domain::{Session, StorageError, UserProfile};
use rand::Rng;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::ports::KeyValueStore;

/// Persists the bearer token, the user profile snapshot and the device id.
///
/// No network access. Storage failures propagate unchanged.
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    // Serializes first-time device id generation.
    device_id_lock: Mutex<()>,
}

impl SessionStore {
    /// Create a session store backed by `store`
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store, device_id_lock: Mutex::new(()) }
    }

    /// Current bearer token. Empty or non-string values read as absent.
    ///
    /// # Errors
    /// Returns the backend's error if the read fails.
    pub async fn get_token(&self) -> Result<Option<String>, StorageError> {
        self.read_string(TOKEN_KEY).await
    }

    /// Store a bearer token. An empty token clears the session token.
    ///
    /// # Errors
    /// Returns the backend's error if the write fails.
    pub async fn set_token(&self, token: &str) -> Result<(), StorageError> {
        if token.is_empty() {
            return self.clear_token().await;
        }
        self.store.write(TOKEN_KEY, Value::String(token.to_string())).await
    }

    /// Remove the bearer token.
    ///
    /// # Errors
    /// Returns the backend's error if the removal fails.
    pub async fn clear_token(&self) -> Result<(), StorageError> {
        debug!("clearing session token");
        self.store.remove(TOKEN_KEY).await
    }

    /// Last stored user profile snapshot.
    ///
    /// # Errors
    /// Returns the backend's error if the read fails.
    pub async fn get_user(&self) -> Result<Option<UserProfile>, StorageError> {
        let value = self.store.read(USER_KEY).await?;
        Ok(value.filter(|value| !value.is_null()).map(UserProfile::from))
    }

    /// Replace the user profile snapshot; `None` removes it.
    ///
    /// # Errors
    /// Returns the backend's error if the write fails.
    pub async fn set_user(&self, user: Option<UserProfile>) -> Result<(), StorageError> {
        match user {
            Some(user) => self.store.write(USER_KEY, user.into_value()).await,
            None => self.store.remove(USER_KEY).await,
        }
    }

    /// Stable per-installation identifier.
    ///
    /// Generated and persisted on first access; every later call returns the
    /// stored value.
    ///
    /// # Errors
    /// Returns the backend's error if reading or persisting the id fails.
    pub async fn get_device_id(&self) -> Result<String, StorageError> {
        if let Some(device_id) = self.read_string(DEVICE_KEY).await? {
            return Ok(device_id);
        }

        let _guard = self.device_id_lock.lock().await;
        if let Some(device_id) = self.read_string(DEVICE_KEY).await? {
            return Ok(device_id);
        }

        let device_id = generate_device_id();
        self.store.write(DEVICE_KEY, Value::String(device_id.clone())).await?;
        info!(device_id = %device_id, "generated device id");
        Ok(device_id)
    }

    /// Read the whole session at once.
    ///
    /// # Errors
    /// Returns the backend's error if any read fails.
    pub async fn snapshot(&self) -> Result<Session, StorageError> {
        Ok(Session {
            token: self.get_token().await?,
            user: self.get_user().await?,
            device_id: self.get_device_id().await?,
        })
    }

    /// Logout: drop the token and the user snapshot. The device id survives.
    ///
    /// # Errors
    /// Returns the backend's error if a removal fails.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.clear_token().await?;
        self.set_user(None).await
    }

    async fn read_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self.store.read(key).await?;
        Ok(match value {
            Some(Value::String(text)) if !text.is_empty() => Some(text),
            _ => None,
        })
    }
}

/// Build a fresh device id: `dev_<unix-millis>_<8 hex chars>`.
pub fn generate_device_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().gen();
    let suffix = format!("{suffix:0width$x}", width = DEVICE_ID_SUFFIX_LEN);
    format!("{DEVICE_ID_PREFIX}_{millis}_{suffix}")
}
