//! Marketplace API surface
//!
//! [`BookMartClient`] wires the access layer from configuration;
//! [`MarketplaceCommands`] maps each marketplace operation onto a request.

pub mod client;
pub mod commands;

pub use client::{BookMartClient, BookMartClientBuilder};
pub use commands::MarketplaceCommands;
