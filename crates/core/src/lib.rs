//! # BookMart Core
//!
//! Pure orchestration of the marketplace API access layer - no
//! infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for storage, transport, host login and
//!   environment probing
//! - The session store, endpoint resolver and response normalizer
//! - The resilient request dispatcher and the auth orchestrator built on it
//!
//! ## Architecture Principles
//! - Only depends on `bookmart-domain`
//! - No HTTP, filesystem or platform code
//! - All external dependencies via traits
//!
//! ## Data flow
//!
//! ```text
//! domain call
//!   └─► AuthOrchestrator     (ensure token, one re-auth on 401)
//!         └─► RequestDispatcher  (candidate bases, failover on transport failure)
//!               └─► Transport       (one request against one base, normalized body)
//! ```

pub mod auth;
pub mod dispatch;
pub mod endpoint;
pub mod messages;
pub mod normalizer;
pub mod session;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export specific items to avoid ambiguity
pub use auth::ports::LoginCodeProvider;
pub use auth::AuthOrchestrator;
pub use dispatch::ports::Transport;
pub use dispatch::RequestDispatcher;
pub use endpoint::ports::EnvironmentProbe;
pub use endpoint::{normalize_base, EndpointResolver};
pub use messages::error_message;
pub use normalizer::AssetUrlNormalizer;
pub use session::ports::KeyValueStore;
pub use session::SessionStore;
