//! Endpoint failover around a single transport call

use std::sync::Arc;

use bookmart_domain::{ApiError, HttpMethod, RequestDescriptor, Result, UploadDescriptor};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::ports::Transport;
use crate::endpoint::EndpointResolver;

/// One unit of work the dispatcher can replay against several bases.
#[derive(Debug, Clone, Copy)]
pub enum Attempt<'a> {
    Send(&'a RequestDescriptor),
    Upload(&'a UploadDescriptor),
}

impl Attempt<'_> {
    pub fn path(&self) -> &str {
        match self {
            Self::Send(request) => &request.path,
            Self::Upload(upload) => &upload.path,
        }
    }

    pub fn method(&self) -> HttpMethod {
        match self {
            Self::Send(request) => request.method,
            Self::Upload(_) => HttpMethod::Post,
        }
    }
}

/// Orchestrates the transport across the resolver's candidate list.
///
/// - success on a base records it as the sticky preference and returns
/// - a transport failure advances to the next base, if any remain
/// - any other failure returns immediately; the server was reached
pub struct RequestDispatcher {
    resolver: Arc<EndpointResolver>,
    transport: Arc<dyn Transport>,
}

impl RequestDispatcher {
    pub fn new(resolver: Arc<EndpointResolver>, transport: Arc<dyn Transport>) -> Self {
        Self { resolver, transport }
    }

    pub fn resolver(&self) -> &Arc<EndpointResolver> {
        &self.resolver
    }

    /// Dispatch a JSON request with endpoint failover.
    ///
    /// # Errors
    /// Returns the last observed error, annotated with the bases attempted.
    pub async fn dispatch(&self, request: &RequestDescriptor) -> Result<Value> {
        self.execute(Attempt::Send(request)).await
    }

    /// Upload a file with endpoint failover.
    ///
    /// # Errors
    /// Returns the last observed error, annotated with the bases attempted.
    pub async fn upload(&self, upload: &UploadDescriptor) -> Result<Value> {
        self.execute(Attempt::Upload(upload)).await
    }

    /// Run `attempt` against each candidate base until one answers.
    ///
    /// Attempts are strictly sequential; an issued attempt always runs to
    /// completion before the next base is tried.
    ///
    /// # Errors
    /// Returns the last observed error, annotated with the bases attempted.
    #[instrument(skip(self, attempt), fields(method = %attempt.method(), path = %attempt.path()))]
    pub async fn execute(&self, attempt: Attempt<'_>) -> Result<Value> {
        let candidates = self.resolver.resolve_candidates().await;
        let mut attempted: Vec<String> = Vec::with_capacity(candidates.len());
        let mut last_error = None;

        for (index, base) in candidates.iter().enumerate() {
            attempted.push(base.clone());
            debug!(base = %base, attempt = index + 1, "dispatching request");

            let outcome = match attempt {
                Attempt::Send(request) => self.transport.send(base, request).await,
                Attempt::Upload(upload) => self.transport.upload(base, upload).await,
            };

            match outcome {
                Ok(body) => {
                    self.resolver.record_success(base);
                    if index > 0 {
                        info!(
                            base = %base,
                            failed_bases = index,
                            "request succeeded after failover"
                        );
                    }
                    return Ok(body);
                }
                Err(err) => {
                    let has_next = index + 1 < candidates.len();
                    let fail_over = has_next && err.is_failover_eligible();
                    warn!(
                        base = %base,
                        kind = %err.kind(),
                        status = ?err.status(),
                        error = %err,
                        fail_over,
                        "request attempt failed"
                    );
                    last_error = Some(err);
                    if !fail_over {
                        break;
                    }
                }
            }
        }

        let err = last_error.unwrap_or_else(|| ApiError::transport("network request failed"));
        Err(err.with_attempted_bases(&attempted))
    }
}
