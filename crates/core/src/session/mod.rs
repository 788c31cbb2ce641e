//! Session persistence
//!
//! [`SessionStore`] wraps a [`ports::KeyValueStore`] and owns the bearer
//! token, the user profile snapshot and the per-installation device id.

pub mod ports;
mod store;

pub use store::{generate_device_id, SessionStore};
