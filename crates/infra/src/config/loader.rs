//! Configuration loader
//!
//! Loads client configuration from a file and environment variables.
//!
//! ## Loading Strategy
//! 1. Start from the file named by `BOOKMART_CONFIG`, or the first file found
//!    by [`probe_config_paths`], or the built-in defaults
//! 2. Apply environment variable overrides on top
//! 3. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `BOOKMART_CONFIG`: Explicit config file path
//! - `BOOKMART_API_BASE`: Canonical production base URL
//! - `BOOKMART_APP_ID`: Application id sent with the login exchange
//! - `BOOKMART_STORAGE_PATH`: Session document path (empty for memory only)
//! - `BOOKMART_TIMEOUT_SECS`: Per-request timeout in seconds
//! - `BOOKMART_DEBUG_ENV`: Whether the runtime is a trusted debug environment
//! - `BOOKMART_LEGACY_ASSET_PREFIXES`: Comma-separated legacy asset hosts
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./bookmart.json` or `./bookmart.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. Parent directory, then relative to the executable location

use std::path::{Path, PathBuf};

use bookmart_domain::{ApiError, ClientConfig, Result};

const ENV_CONFIG_PATH: &str = "BOOKMART_CONFIG";
const ENV_API_BASE: &str = "BOOKMART_API_BASE";
const ENV_APP_ID: &str = "BOOKMART_APP_ID";
const ENV_STORAGE_PATH: &str = "BOOKMART_STORAGE_PATH";
const ENV_TIMEOUT_SECS: &str = "BOOKMART_TIMEOUT_SECS";
const ENV_DEBUG: &str = "BOOKMART_DEBUG_ENV";
const ENV_LEGACY_PREFIXES: &str = "BOOKMART_LEGACY_ASSET_PREFIXES";

const CONFIG_FILE_NAMES: [&str; 4] =
    ["bookmart.json", "bookmart.toml", "config.json", "config.toml"];

/// Load configuration: file (explicit or probed) or defaults, then
/// environment overrides.
///
/// # Errors
/// Returns `ApiError::Config` if the file cannot be read or parsed, or an
/// environment variable holds an invalid value.
pub fn load() -> Result<ClientConfig> {
    let base = match std::env::var(ENV_CONFIG_PATH).ok().filter(|path| !path.trim().is_empty()) {
        Some(path) => load_from_file(Some(PathBuf::from(path)))?,
        None => match probe_config_paths() {
            Some(path) => load_from_file(Some(path))?,
            None => {
                tracing::debug!("No config file found, using defaults");
                ClientConfig::default()
            }
        },
    };

    let config = apply_env_overrides(base)?;
    tracing::info!(
        production_base = %config.api.production_base,
        debug = config.environment.debug,
        persistent_session = config.storage.path.is_some(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Load configuration from environment variables over the defaults.
///
/// # Errors
/// Returns `ApiError::Config` if a variable holds an invalid value.
pub fn load_from_env() -> Result<ClientConfig> {
    apply_env_overrides(ClientConfig::default())
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `ApiError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ApiError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ApiError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ApiError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Apply `BOOKMART_*` overrides to `config`.
///
/// # Errors
/// Returns `ApiError::Config` if the timeout is not a positive integer.
pub fn apply_env_overrides(mut config: ClientConfig) -> Result<ClientConfig> {
    if let Some(base) = env_string(ENV_API_BASE) {
        config.api.production_base = base;
    }
    if let Some(app_id) = env_string(ENV_APP_ID) {
        config.environment.app_id = app_id;
    }
    if let Ok(path) = std::env::var(ENV_STORAGE_PATH) {
        let path = path.trim();
        config.storage.path = if path.is_empty() { None } else { Some(path.to_string()) };
    }
    if let Some(timeout) = env_string(ENV_TIMEOUT_SECS) {
        config.api.timeout_secs = timeout
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| ApiError::Config(format!("Invalid timeout seconds: {timeout}")))?;
    }
    config.environment.debug = env_bool(ENV_DEBUG, config.environment.debug);
    if let Some(prefixes) = env_string(ENV_LEGACY_PREFIXES) {
        config.api.legacy_asset_prefixes = prefixes
            .split(',')
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
            .map(ToString::to_string)
            .collect();
    }
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `ApiError::Config` if format is invalid or parsing fails.
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ApiError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ApiError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ApiError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Searches the current working directory, its parent, then the executable's
/// directory.
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join(".."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Non-blank environment variable value.
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
