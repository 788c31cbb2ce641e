//! # BookMart Domain
//!
//! Domain types shared by every BookMart crate.
//!
//! This crate contains:
//! - Request descriptors and HTTP method vocabulary
//! - Session, user profile and list-envelope types
//! - The classified API error taxonomy and Result alias
//! - Client configuration structures and constants
//!
//! ## Architecture
//! - No dependencies on other BookMart crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
