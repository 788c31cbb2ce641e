//! Port interfaces for the host login primitive

use async_trait::async_trait;
use bookmart_domain::Result;

/// Produces one-time login codes from the host platform.
///
/// Each call yields a fresh code; codes are exchanged for a bearer token by
/// the auth orchestrator and never reused.
#[async_trait]
pub trait LoginCodeProvider: Send + Sync {
    /// Obtain a login code.
    ///
    /// # Errors
    /// Returns [`bookmart_domain::ApiError::Login`] when the host refuses or
    /// returns no code.
    async fn login_code(&self) -> Result<String>;
}
