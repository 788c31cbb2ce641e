//! Request descriptors
//!
//! A descriptor is built once by the domain-call layer and handed to the
//! dispatcher, which may replay it against several bases (and, after a
//! re-authentication, once more). Descriptors are therefore immutable.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::UPLOAD_FIELD_NAME;

/// HTTP verbs used by the marketplace API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One JSON request against a path relative to the selected base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub path: String,
    pub method: HttpMethod,
    pub body: Option<Value>,
    pub requires_auth: bool,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self { path: path.into(), method, body: None, requires_auth: false }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Attach a JSON body. A `null` body is treated as no body at all.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = if body.is_null() { None } else { Some(body) };
        self
    }

    /// Mark the request as requiring the bearer token.
    #[must_use]
    pub fn authenticated(mut self) -> Self {
        self.requires_auth = true;
        self
    }
}

/// One multi-part file upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDescriptor {
    pub path: String,
    pub file_path: PathBuf,
    /// Multi-part field carrying the file.
    pub field_name: String,
    pub requires_auth: bool,
}

impl UploadDescriptor {
    pub fn new(path: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file_path: file_path.into(),
            field_name: UPLOAD_FIELD_NAME.to_string(),
            requires_auth: false,
        }
    }

    #[must_use]
    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = field_name.into();
        self
    }

    #[must_use]
    pub fn authenticated(mut self) -> Self {
        self.requires_auth = true;
        self
    }
}
