//! Application constants
//!
//! Centralized location for the storage keys, endpoints and wire defaults
//! used by the API access layer.

// Endpoints
pub const PROD_API_BASE: &str = "https://api.example.com";
pub const DEFAULT_LEGACY_ASSET_PREFIXES: &[&str] =
    &["http://api.example.com", "https://api.example.com"];
pub const UPLOADS_PATH_PREFIX: &str = "/uploads/";

// Durable storage keys
pub const TOKEN_KEY: &str = "bm_token";
pub const USER_KEY: &str = "bm_user";
pub const DEVICE_KEY: &str = "bm_device_id";
pub const API_BASE_OVERRIDE_KEY: &str = "bm_api_base_override";

// Device identifiers look like `dev_<unix-millis>_<hex>`
pub const DEVICE_ID_PREFIX: &str = "dev";
pub const DEVICE_ID_SUFFIX_LEN: usize = 8;

// Route table
pub const LOGIN_PATH: &str = "/api/wx/login";
pub const UPLOAD_SELL_IMAGE_PATH: &str = "/api/uploads/sell-image";
pub const UPLOAD_FIELD_NAME: &str = "file";

// Transport
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const ATTEMPTED_BASES_MARKER: &str = "base=";
