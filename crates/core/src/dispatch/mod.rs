//! Resilient request dispatch
//!
//! The dispatcher walks the resolver's candidate bases and fails over only
//! when a base is unreachable. A server that answers, even with an error,
//! ends the walk.

mod dispatcher;
pub mod ports;

pub use dispatcher::{Attempt, RequestDispatcher};
