//! Port interfaces for network transport

use async_trait::async_trait;
use bookmart_domain::{RequestDescriptor, Result, UploadDescriptor};
use serde_json::Value;

/// Issues one request against one concrete base URL.
///
/// Implementations attach the bearer token for authenticated descriptors,
/// classify every failure into an [`bookmart_domain::ApiError`] and return
/// 2xx bodies already passed through the response normalizer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a JSON request to `base + request.path`.
    async fn send(&self, base: &str, request: &RequestDescriptor) -> Result<Value>;

    /// Upload a file as multi-part form data to `base + upload.path`.
    async fn upload(&self, base: &str, upload: &UploadDescriptor) -> Result<Value>;
}
