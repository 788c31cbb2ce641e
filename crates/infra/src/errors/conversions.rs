//! Conversions from external infrastructure errors into domain errors.

use std::io::{Error as IoError, ErrorKind as IoErrorKind};

use bookmart_domain::{ApiError, StorageError};
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;
use thiserror::Error;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InfraError(#[from] pub ApiError);

impl From<InfraError> for ApiError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

trait IntoApiError {
    fn into_api(self) -> ApiError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ApiError */
/* -------------------------------------------------------------------------- */

impl IntoApiError for HttpError {
    fn into_api(self) -> ApiError {
        if let Some(status) = self.status() {
            return ApiError::http(status.as_u16(), None);
        }

        let target = self.url().map(|url| format!(" ({url})")).unwrap_or_default();
        if self.is_timeout() {
            return ApiError::transport(format!("HTTP request timed out{target}"));
        }
        if self.is_connect() {
            return ApiError::transport(format!("HTTP connection failure{target}: {self}"));
        }
        if self.is_decode() {
            return ApiError::invalid_response(format!("failed to decode response body: {self}"));
        }
        if self.is_builder() {
            return ApiError::transport(format!("invalid request{target}: {self}"));
        }

        ApiError::transport(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_api())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → ApiError */
/* -------------------------------------------------------------------------- */

impl IntoApiError for JsonError {
    fn into_api(self) -> ApiError {
        ApiError::invalid_response(format!("malformed JSON: {self}"))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        Self(value.into_api())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → StorageError */
/* -------------------------------------------------------------------------- */

/// Storage operation an I/O error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Read,
    Write,
    Remove,
}

/// Map an I/O failure on `key` into the matching [`StorageError`].
pub fn storage_error(op: StorageOp, key: &str, err: &IoError) -> StorageError {
    let message = match err.kind() {
        IoErrorKind::PermissionDenied => format!("permission denied: {err}"),
        _ => err.to_string(),
    };
    let key = key.to_string();
    match op {
        StorageOp::Read => StorageError::Read { key, message },
        StorageOp::Write => StorageError::Write { key, message },
        StorageOp::Remove => StorageError::Remove { key, message },
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        Self(ApiError::Storage(StorageError::Unavailable(value.to_string())))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
