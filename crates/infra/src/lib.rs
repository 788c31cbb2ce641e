//! # BookMart Infrastructure
//!
//! Infrastructure implementations of the core ports.
//!
//! This crate contains:
//! - The reqwest HTTP transport
//! - File and in-memory session storage
//! - The configuration-backed host environment probe
//! - Configuration loading and tracing bootstrap
//! - The wired client and marketplace commands
//!
//! ## Architecture
//! - Implements traits defined in `bookmart-core`
//! - Depends on `bookmart-domain` and `bookmart-core`
//! - Contains all "impure" code (network, filesystem, environment)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod platform;
pub mod storage;

// Re-export commonly used items
pub use api::{BookMartClient, BookMartClientBuilder, MarketplaceCommands};
pub use errors::InfraError;
pub use http::{HttpTransport, HttpTransportBuilder};
pub use observability::init_tracing;
pub use platform::HostEnvironment;
pub use storage::{FileKeyValueStore, MemoryKeyValueStore};
