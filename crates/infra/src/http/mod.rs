//! HTTP transport adapter

pub mod transport;

pub use transport::{HttpTransport, HttpTransportBuilder};
