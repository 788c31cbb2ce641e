//! Testing utilities
//!
//! Mock implementations of the core ports, shared by the unit tests in this
//! crate and (behind the `test-utils` feature) by downstream crates.

pub mod mocks;

pub use mocks::{CountingLoginCodes, InMemoryStore, RecordedCall, ScriptedTransport, StaticProbe};
