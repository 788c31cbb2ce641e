//! Mock implementations of the core ports
//!
//! Provides mock objects for testing purposes.

// Test mocks keep their error contracts obvious from the signatures.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bookmart_domain::{ApiError, HttpMethod, RequestDescriptor, StorageError, UploadDescriptor};
use parking_lot::Mutex;
use serde_json::Value;

use crate::auth::ports::LoginCodeProvider;
use crate::dispatch::ports::Transport;
use crate::endpoint::ports::EnvironmentProbe;
use crate::session::ports::KeyValueStore;
use crate::session::SessionStore;

type Responder = Box<dyn Fn(&RecordedCall) -> Result<Value, ApiError> + Send + Sync>;

/// In-memory key-value store with write-failure injection
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: Mutex<HashMap<String, Value>>,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without going through the port.
    pub fn insert(&self, key: &str, value: Value) {
        self.data.lock().insert(key.to_string(), value);
    }

    /// Peek at a value without going through the port.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.lock().get(key).cloned()
    }

    /// Make every subsequent write and remove fail.
    pub fn fail_writes(&self, enabled: bool) {
        self.fail_writes.store(enabled, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.data.lock().get(key).cloned())
    }

    async fn write(&self, key: &str, value: Value) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Write { key: key.to_string(), message: "injected".into() });
        }
        self.data.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Remove { key: key.to_string(), message: "injected".into() });
        }
        self.data.lock().remove(key);
        Ok(())
    }
}

/// Environment probe with fixed answers
#[derive(Debug, Clone, Default)]
pub struct StaticProbe {
    pub debug: bool,
    pub app_id: String,
}

impl StaticProbe {
    pub fn production() -> Self {
        Self { debug: false, app_id: "wx-test-app".to_string() }
    }

    pub fn debug() -> Self {
        Self { debug: true, app_id: "wx-test-app".to_string() }
    }
}

impl EnvironmentProbe for StaticProbe {
    fn is_debug_environment(&self) -> bool {
        self.debug
    }

    fn app_id(&self) -> String {
        self.app_id.clone()
    }
}

/// Login code provider that hands out `code-1`, `code-2`, ... and counts calls
#[derive(Debug, Default)]
pub struct CountingLoginCodes {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl CountingLoginCodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let provider = Self::default();
        provider.fail.store(true, Ordering::SeqCst);
        provider
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LoginCodeProvider for CountingLoginCodes {
    async fn login_code(&self) -> Result<String, ApiError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::Login("host login did not return a code".into()));
        }
        Ok(format!("code-{call}"))
    }
}

/// One transport invocation as seen by [`ScriptedTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub base: String,
    pub path: String,
    pub method: HttpMethod,
    pub body: Option<Value>,
    /// Bearer token that would have been attached.
    pub token: Option<String>,
    pub upload: bool,
}

/// Transport whose answers come from a closure over the recorded call
pub struct ScriptedTransport {
    session: Option<Arc<SessionStore>>,
    responder: Responder,
    latency: Duration,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&RecordedCall) -> Result<Value, ApiError> + Send + Sync + 'static,
    {
        Self {
            session: None,
            responder: Box::new(responder),
            latency: Duration::ZERO,
            calls: Mutex::default(),
        }
    }

    /// Read bearer tokens from `session` for authenticated calls.
    #[must_use]
    pub fn with_session(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Sleep before answering, so concurrent callers overlap.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls.lock().iter().filter(|call| call.path == path).cloned().collect()
    }

    async fn token_for(&self, requires_auth: bool) -> Result<Option<String>, ApiError> {
        match (&self.session, requires_auth) {
            (Some(session), true) => Ok(session.get_token().await?),
            _ => Ok(None),
        }
    }

    async fn answer(&self, call: RecordedCall) -> Result<Value, ApiError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.calls.lock().push(call.clone());
        (self.responder)(&call)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, base: &str, request: &RequestDescriptor) -> Result<Value, ApiError> {
        let call = RecordedCall {
            base: base.to_string(),
            path: request.path.clone(),
            method: request.method,
            body: request.body.clone(),
            token: self.token_for(request.requires_auth).await?,
            upload: false,
        };
        self.answer(call).await
    }

    async fn upload(&self, base: &str, upload: &UploadDescriptor) -> Result<Value, ApiError> {
        let call = RecordedCall {
            base: base.to_string(),
            path: upload.path.clone(),
            method: HttpMethod::Post,
            body: None,
            token: self.token_for(upload.requires_auth).await?,
            upload: true,
        };
        self.answer(call).await
    }
}
