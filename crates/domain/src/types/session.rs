//! Session types
//!
//! The session is owned by the session store. It is mutated only by login
//! (token + user), logout (token, and user on full logout) and profile
//! updates (user).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque user profile record as returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(pub Value);

impl UserProfile {
    /// Read a top-level string field, e.g. `nickname`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for UserProfile {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Point-in-time view of the persisted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
    pub device_id: String,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|token| !token.is_empty())
    }
}

/// Body of the login exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// One-time code from the host login primitive.
    pub code: String,
    pub app_id: String,
    pub device_id: String,
}

/// Response of the login exchange.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}
