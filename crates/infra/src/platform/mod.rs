//! Host platform adapters

pub mod host;

pub use host::HostEnvironment;
