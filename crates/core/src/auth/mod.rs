//! Authentication around the request dispatcher
//!
//! The orchestrator makes sure a bearer token exists before authenticated
//! calls and performs exactly one re-login and replay when the server
//! rejects the token.

mod orchestrator;
pub mod ports;

pub use orchestrator::AuthOrchestrator;
