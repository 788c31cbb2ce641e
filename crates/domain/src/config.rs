//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_LEGACY_ASSET_PREFIXES, DEFAULT_TIMEOUT_SECS, LOGIN_PATH, PROD_API_BASE,
    UPLOAD_SELL_IMAGE_PATH,
};

/// API client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub environment: EnvironmentConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Canonical production base; always the final fallback candidate and
    /// the host that asset URLs are rewritten to.
    pub production_base: String,
    /// Host prefixes that asset URLs may still reference.
    pub legacy_asset_prefixes: Vec<String>,
    pub timeout_secs: u64,
    pub login_path: String,
    pub upload_path: String,
}

/// Durable session storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the JSON document holding the session. `None` keeps the
    /// session in memory only.
    pub path: Option<String>,
}

/// Host environment configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Application identifier sent with the login exchange.
    pub app_id: String,
    /// Marks the runtime as a trusted debug environment, which enables the
    /// operator-supplied API base override.
    pub debug: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            production_base: PROD_API_BASE.to_string(),
            legacy_asset_prefixes: DEFAULT_LEGACY_ASSET_PREFIXES
                .iter()
                .map(|prefix| (*prefix).to_string())
                .collect(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            login_path: LOGIN_PATH.to_string(),
            upload_path: UPLOAD_SELL_IMAGE_PATH.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { path: Some("bookmart-session.json".to_string()) }
    }
}
