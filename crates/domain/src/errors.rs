//! Error types used throughout the API access layer
//!
//! Every failure that leaves the transport is classified into an
//! [`ApiError`]. The dispatcher reads [`ApiError::kind`] to decide on endpoint
//! failover and the auth orchestrator reads it to decide on re-authentication.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::constants::ATTEMPTED_BASES_MARKER;

/// Classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connectivity, DNS, TLS or timeout failure. The server was never reached.
    TransportFailure,
    /// The server answered with a non-2xx status other than 401.
    HttpError,
    /// The server answered 401; the session token is no longer accepted.
    AuthExpired,
    /// The server answered but the body could not be understood.
    InvalidResponse,
    /// The durable key-value storage failed.
    Storage,
    /// The host login primitive could not produce a login code.
    Login,
    /// The client was configured inconsistently.
    Config,
}

impl ErrorKind {
    /// Stable label suitable for structured logging.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TransportFailure => "transport_failure",
            Self::HttpError => "http_error",
            Self::AuthExpired => "auth_expired",
            Self::InvalidResponse => "invalid_response",
            Self::Storage => "storage",
            Self::Login => "login",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by a durable key-value storage backend.
///
/// These propagate unchanged through the session store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("failed to read '{key}': {message}")]
    Read { key: String, message: String },

    #[error("failed to write '{key}': {message}")]
    Write { key: String, message: String },

    #[error("failed to remove '{key}': {message}")]
    Remove { key: String, message: String },

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Classified API error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("{message}")]
    Transport { message: String },

    /// The server responded with a non-2xx status.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        /// Parsed response body, if the server sent one.
        body: Option<Value>,
    },

    /// The response body was malformed.
    #[error("{message}")]
    InvalidResponse { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Login failed: {0}")]
    Login(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Build a transport failure, substituting a generic message when the
    /// underlying one is blank.
    pub fn transport(message: impl Into<String>) -> Self {
        let message = message.into();
        let message =
            if message.trim().is_empty() { "network request failed".to_string() } else { message };
        Self::Transport { message }
    }

    /// Build an HTTP error from a status code and the parsed response body.
    ///
    /// The message is the body's `error` field when present, `HTTP <status>`
    /// otherwise.
    pub fn http(status: u16, body: Option<Value>) -> Self {
        let message = body
            .as_ref()
            .and_then(server_error_field)
            .map_or_else(|| format!("HTTP {status}"), ToString::to_string);
        Self::Http { status, message, body }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse { message: message.into() }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::TransportFailure,
            Self::Http { status: 401, .. } => ErrorKind::AuthExpired,
            Self::Http { .. } => ErrorKind::HttpError,
            Self::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Login(_) => ErrorKind::Login,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// HTTP status carried by the error, if the server was reached.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server rejected the bearer token.
    pub fn is_auth_expired(&self) -> bool {
        self.kind() == ErrorKind::AuthExpired
    }

    /// Whether the dispatcher may try the same request against another base.
    ///
    /// Only connectivity failures qualify: a server that answered and refused
    /// must not be masked as a network problem.
    pub fn is_failover_eligible(&self) -> bool {
        self.kind() == ErrorKind::TransportFailure
    }

    /// The `error` string from the server's response body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Http { body: Some(body), .. } => server_error_field(body),
            _ => None,
        }
    }

    /// Annotate the message with the bases that were attempted, e.g.
    /// `connection reset (base=https://a -> https://b)`.
    ///
    /// Already annotated messages and the parsed server body are left alone.
    #[must_use]
    pub fn with_attempted_bases(mut self, bases: &[String]) -> Self {
        if bases.is_empty() {
            return self;
        }
        let trail = bases.join(" -> ");
        if let Self::Transport { message }
        | Self::Http { message, .. }
        | Self::InvalidResponse { message } = &mut self
        {
            if !message.contains(ATTEMPTED_BASES_MARKER) {
                *message = format!("{message} ({ATTEMPTED_BASES_MARKER}{trail})");
            }
        }
        self
    }
}

fn server_error_field(body: &Value) -> Option<&str> {
    body.get("error").and_then(Value::as_str).filter(|message| !message.is_empty())
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
