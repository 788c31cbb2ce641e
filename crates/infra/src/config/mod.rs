//! Configuration loading
//!
//! This module provides utilities for loading client configuration from
//! environment variables and files.

pub mod loader;

pub use loader::{apply_env_overrides, load, load_from_env, load_from_file, probe_config_paths};
