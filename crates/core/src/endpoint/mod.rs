//! Endpoint discovery
//!
//! [`EndpointResolver`] turns the canonical production base, an optional
//! debug override and the sticky last-successful base into the ordered
//! candidate list the dispatcher walks on every call.

pub mod ports;
mod resolver;

pub use resolver::{normalize_base, EndpointResolver};
