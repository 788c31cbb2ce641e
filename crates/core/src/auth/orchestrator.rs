//! Auth orchestrator: ensure token, single re-auth on 401

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bookmart_domain::constants::LOGIN_PATH;
use bookmart_domain::{
    ApiError, LoginRequest, LoginResponse, RequestDescriptor, Result, Session, UploadDescriptor,
};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::ports::LoginCodeProvider;
use crate::dispatch::{Attempt, RequestDispatcher};
use crate::endpoint::ports::EnvironmentProbe;
use crate::session::SessionStore;

/// Wraps the dispatcher with the token lifecycle.
///
/// State machine per authenticated call:
///
/// ```text
/// start ─► ensure token (login when absent) ─► call
///   call ok            ─► done
///   call 401           ─► clear token ─► login ─► replay once ─► done / error
///   call other error   ─► error
/// ```
///
/// Logins are single-flight. Every successful login bumps a generation
/// counter; a caller that finds the generation moved while it waited for the
/// login lock reuses that login instead of starting another.
pub struct AuthOrchestrator {
    dispatcher: Arc<RequestDispatcher>,
    session: Arc<SessionStore>,
    login_codes: Arc<dyn LoginCodeProvider>,
    probe: Arc<dyn EnvironmentProbe>,
    login_path: String,
    login_lock: Mutex<()>,
    login_generation: AtomicU64,
}

impl AuthOrchestrator {
    pub fn new(
        dispatcher: Arc<RequestDispatcher>,
        session: Arc<SessionStore>,
        login_codes: Arc<dyn LoginCodeProvider>,
        probe: Arc<dyn EnvironmentProbe>,
    ) -> Self {
        Self {
            dispatcher,
            session,
            login_codes,
            probe,
            login_path: LOGIN_PATH.to_string(),
            login_lock: Mutex::new(()),
            login_generation: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Exchange a fresh host login code for a bearer token and user profile.
    ///
    /// # Errors
    /// - `Login` when the host produces no code
    /// - any dispatcher error from the login exchange
    /// - `InvalidResponse` when the response carries no token
    /// - `Storage` when persisting the session fails
    pub async fn login(&self) -> Result<Session> {
        let _guard = self.login_lock.lock().await;
        self.login_locked().await?;
        Ok(self.session.snapshot().await?)
    }

    /// Drop the token and the user snapshot.
    ///
    /// # Errors
    /// Returns `Storage` when a removal fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        self.session.clear().await?;
        info!("logged out");
        Ok(())
    }

    /// Route a request by its `requires_auth` flag.
    ///
    /// # Errors
    /// See [`Self::authenticated_dispatch`] and [`RequestDispatcher::dispatch`].
    pub async fn dispatch(&self, request: &RequestDescriptor) -> Result<Value> {
        if request.requires_auth {
            self.authenticated_dispatch(request).await
        } else {
            self.dispatcher.dispatch(request).await
        }
    }

    /// Dispatch `request` with the bearer token, re-authenticating once on
    /// `AuthExpired`.
    ///
    /// # Errors
    /// The replay's error propagates unchanged; a second `AuthExpired` does
    /// not trigger another login.
    pub async fn authenticated_dispatch(&self, request: &RequestDescriptor) -> Result<Value> {
        let request: Cow<'_, RequestDescriptor> = if request.requires_auth {
            Cow::Borrowed(request)
        } else {
            Cow::Owned(request.clone().authenticated())
        };
        self.with_reauth(Attempt::Send(&request)).await
    }

    /// Upload with the bearer token under the same state machine as
    /// [`Self::authenticated_dispatch`].
    ///
    /// # Errors
    /// The replay's error propagates unchanged.
    pub async fn authenticated_upload(&self, upload: &UploadDescriptor) -> Result<Value> {
        let upload: Cow<'_, UploadDescriptor> = if upload.requires_auth {
            Cow::Borrowed(upload)
        } else {
            Cow::Owned(upload.clone().authenticated())
        };
        self.with_reauth(Attempt::Upload(&upload)).await
    }

    #[instrument(skip(self, attempt), fields(path = %attempt.path()))]
    async fn with_reauth(&self, attempt: Attempt<'_>) -> Result<Value> {
        let generation = self.ensure_token().await?;

        match self.dispatcher.execute(attempt).await {
            Err(err) if err.is_auth_expired() => {
                warn!(error = %err, "token rejected, re-authenticating once");
                self.reauthenticate(generation).await?;
                self.dispatcher.execute(attempt).await
            }
            outcome => outcome,
        }
    }

    /// Make sure a token is stored, logging in if not. Returns the login
    /// generation the token belongs to.
    async fn ensure_token(&self) -> Result<u64> {
        let observed = self.login_generation.load(Ordering::SeqCst);
        if self.session.get_token().await?.is_some() {
            return Ok(observed);
        }

        let _guard = self.login_lock.lock().await;
        let current = self.login_generation.load(Ordering::SeqCst);
        if current != observed && self.session.get_token().await?.is_some() {
            debug!(generation = current, "reusing concurrent login");
            return Ok(current);
        }
        debug!("no session token, logging in");
        self.login_locked().await
    }

    /// Replace a token the server rejected. `observed` is the generation the
    /// rejected call was made under.
    async fn reauthenticate(&self, observed: u64) -> Result<u64> {
        let _guard = self.login_lock.lock().await;
        let current = self.login_generation.load(Ordering::SeqCst);
        if current != observed && self.session.get_token().await?.is_some() {
            debug!(generation = current, "token already refreshed by a concurrent caller");
            return Ok(current);
        }
        self.session.clear_token().await?;
        self.login_locked().await
    }

    /// Run the login exchange. Callers hold `login_lock`.
    #[instrument(skip(self), fields(login_path = %self.login_path))]
    async fn login_locked(&self) -> Result<u64> {
        let code = self.login_codes.login_code().await?;
        let request = LoginRequest {
            code,
            app_id: self.probe.app_id(),
            device_id: self.session.get_device_id().await?,
        };
        let body = serde_json::to_value(&request)
            .map_err(|err| ApiError::Login(format!("failed to encode login request: {err}")))?;

        let response = self
            .dispatcher
            .dispatch(&RequestDescriptor::post(self.login_path.as_str()).with_body(body))
            .await?;
        let LoginResponse { token, user } = serde_json::from_value(response)
            .map_err(|err| ApiError::invalid_response(format!("Invalid login response: {err}")))?;
        let token = token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::invalid_response("Login response did not include a token"))?;

        self.session.set_token(&token).await?;
        self.session.set_user(user).await?;

        let generation = self.login_generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, "login succeeded");
        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bookmart_domain::constants::{TOKEN_KEY, USER_KEY};
    use bookmart_domain::ErrorKind;
    use futures::future::join_all;
    use serde_json::json;

    use super::*;
    use crate::endpoint::EndpointResolver;
    use crate::testing::{
        CountingLoginCodes, InMemoryStore, RecordedCall, ScriptedTransport, StaticProbe,
    };

    const PROD: &str = "https://api.example.com";

    struct Harness {
        store: Arc<InMemoryStore>,
        codes: Arc<CountingLoginCodes>,
        transport: Arc<ScriptedTransport>,
        auth: AuthOrchestrator,
    }

    /// Login answers `tok-<code>`; everything else goes to `resource`.
    fn harness<F>(codes: CountingLoginCodes, latency: Duration, resource: F) -> Harness
    where
        F: Fn(&RecordedCall) -> Result<Value> + Send + Sync + 'static,
    {
        let store = Arc::new(InMemoryStore::new());
        let session = Arc::new(SessionStore::new(store.clone()));
        let probe = Arc::new(StaticProbe::production());
        let transport = Arc::new(
            ScriptedTransport::new(move |call| {
                if call.path == LOGIN_PATH {
                    let code = call.body.as_ref().and_then(|body| body["code"].as_str());
                    Ok(json!({
                        "token": format!("tok-{}", code.unwrap_or_default()),
                        "user": { "nickname": "ann" }
                    }))
                } else {
                    resource(call)
                }
            })
            .with_session(session.clone())
            .with_latency(latency),
        );
        let resolver = Arc::new(EndpointResolver::new(PROD, probe.clone(), store.clone()));
        let dispatcher = Arc::new(RequestDispatcher::new(resolver, transport.clone()));
        let codes = Arc::new(codes);
        let auth = AuthOrchestrator::new(dispatcher, session, codes.clone(), probe);
        Harness { store, codes, transport, auth }
    }

    fn accept_fresh_tokens(call: &RecordedCall) -> Result<Value> {
        match call.token.as_deref() {
            Some(token) if token.starts_with("tok-") => Ok(json!({ "ok": true })),
            _ => Err(ApiError::http(401, Some(json!({ "error": "unauthorized" })))),
        }
    }

    #[tokio::test]
    async fn login_stores_token_user_and_sends_device_id() {
        let h = harness(CountingLoginCodes::new(), Duration::ZERO, accept_fresh_tokens);

        let session = h.auth.login().await.unwrap();

        assert_eq!(session.token.as_deref(), Some("tok-code-1"));
        assert_eq!(session.user.unwrap().field("nickname"), Some("ann"));
        assert_eq!(h.store.get(TOKEN_KEY), Some(json!("tok-code-1")));

        let login = &h.transport.calls_to(LOGIN_PATH)[0];
        let body = login.body.clone().unwrap();
        assert_eq!(body["code"], "code-1");
        assert_eq!(body["appId"], "wx-test-app");
        assert_eq!(body["deviceId"], json!(session.device_id));
        assert_eq!(login.token, None);
    }

    #[tokio::test]
    async fn login_without_token_is_invalid_response() {
        let store = Arc::new(InMemoryStore::new());
        let session = Arc::new(SessionStore::new(store.clone()));
        let probe = Arc::new(StaticProbe::production());
        let transport = Arc::new(ScriptedTransport::new(|_| Ok(json!({ "user": {} }))));
        let resolver = Arc::new(EndpointResolver::new(PROD, probe.clone(), store.clone()));
        let dispatcher = Arc::new(RequestDispatcher::new(resolver, transport));
        let auth =
            AuthOrchestrator::new(dispatcher, session, Arc::new(CountingLoginCodes::new()), probe);

        let err = auth.login().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
        assert_eq!(store.get(TOKEN_KEY), None);
    }

    #[tokio::test]
    async fn missing_token_triggers_exactly_one_login_first() {
        let h = harness(CountingLoginCodes::new(), Duration::ZERO, accept_fresh_tokens);

        let body = h
            .auth
            .authenticated_dispatch(&RequestDescriptor::get("/api/cart"))
            .await
            .unwrap();

        assert_eq!(body, json!({ "ok": true }));
        assert_eq!(h.codes.calls(), 1);
        let paths: Vec<_> = h.transport.calls().into_iter().map(|call| call.path).collect();
        assert_eq!(paths, vec![LOGIN_PATH.to_string(), "/api/cart".to_string()]);
        assert_eq!(h.transport.calls_to("/api/cart")[0].token.as_deref(), Some("tok-code-1"));
    }

    #[tokio::test]
    async fn rejected_token_is_replaced_and_call_replayed_once() {
        let h = harness(CountingLoginCodes::new(), Duration::ZERO, accept_fresh_tokens);
        h.store.insert(TOKEN_KEY, json!("stale"));

        let body = h
            .auth
            .authenticated_dispatch(&RequestDescriptor::get("/api/orders").authenticated())
            .await
            .unwrap();

        assert_eq!(body, json!({ "ok": true }));
        assert_eq!(h.codes.calls(), 1);
        let tokens: Vec<_> =
            h.transport.calls_to("/api/orders").into_iter().map(|call| call.token).collect();
        assert_eq!(tokens, vec![Some("stale".to_string()), Some("tok-code-1".to_string())]);
    }

    #[tokio::test]
    async fn second_rejection_propagates_without_third_login() {
        let h = harness(CountingLoginCodes::new(), Duration::ZERO, |_| {
            Err(ApiError::http(401, Some(json!({ "error": "unauthorized" }))))
        });

        let err = h
            .auth
            .authenticated_dispatch(&RequestDescriptor::get("/api/me"))
            .await
            .unwrap_err();

        assert!(err.is_auth_expired());
        assert_eq!(h.codes.calls(), 2);
        assert_eq!(h.transport.calls_to("/api/me").len(), 2);
    }

    #[tokio::test]
    async fn other_errors_propagate_without_login() {
        let h = harness(CountingLoginCodes::new(), Duration::ZERO, |_| {
            Err(ApiError::http(400, Some(json!({ "error": "bad price" }))))
        });
        h.store.insert(TOKEN_KEY, json!("tok-existing"));

        let err = h
            .auth
            .authenticated_dispatch(&RequestDescriptor::post("/api/sell-requests"))
            .await
            .unwrap_err();

        assert_eq!(err.server_message(), Some("bad price"));
        assert_eq!(h.codes.calls(), 0);
        assert_eq!(h.transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn login_code_failure_propagates() {
        let h = harness(CountingLoginCodes::failing(), Duration::ZERO, accept_fresh_tokens);

        let err = h
            .auth
            .authenticated_dispatch(&RequestDescriptor::get("/api/cart"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Login);
        assert!(h.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn unauthenticated_requests_skip_the_token_lifecycle() {
        let h = harness(CountingLoginCodes::new(), Duration::ZERO, |_| Ok(json!([])));

        h.auth.dispatch(&RequestDescriptor::get("/api/books")).await.unwrap();

        assert_eq!(h.codes.calls(), 0);
        assert_eq!(h.transport.calls()[0].token, None);
    }

    #[tokio::test]
    async fn uploads_follow_the_same_reauth_path() {
        let h = harness(CountingLoginCodes::new(), Duration::ZERO, accept_fresh_tokens);
        h.store.insert(TOKEN_KEY, json!("stale"));

        let upload = UploadDescriptor::new("/api/uploads/sell-image", "/tmp/cover.png");
        h.auth.authenticated_upload(&upload).await.unwrap();

        let calls = h.transport.calls_to("/api/uploads/sell-image");
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|call| call.upload));
        assert_eq!(h.codes.calls(), 1);
    }

    #[tokio::test]
    async fn concurrent_rejections_share_one_login() {
        let h = harness(CountingLoginCodes::new(), Duration::from_millis(20), accept_fresh_tokens);
        h.store.insert(TOKEN_KEY, json!("stale"));
        let request = RequestDescriptor::get("/api/favorites").authenticated();

        let results =
            join_all((0..8).map(|_| h.auth.authenticated_dispatch(&request))).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(h.codes.calls(), 1);
        assert_eq!(h.transport.calls_to(LOGIN_PATH).len(), 1);
    }

    #[tokio::test]
    async fn concurrent_first_calls_share_one_login() {
        let h = harness(CountingLoginCodes::new(), Duration::from_millis(20), accept_fresh_tokens);
        let request = RequestDescriptor::get("/api/cart").authenticated();

        let results =
            join_all((0..5).map(|_| h.auth.authenticated_dispatch(&request))).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(h.codes.calls(), 1);
    }

    #[tokio::test]
    async fn logout_keeps_device_id() {
        let h = harness(CountingLoginCodes::new(), Duration::ZERO, accept_fresh_tokens);
        let session = h.auth.login().await.unwrap();

        h.auth.logout().await.unwrap();

        assert_eq!(h.store.get(TOKEN_KEY), None);
        assert_eq!(h.store.get(USER_KEY), None);
        assert_eq!(h.auth.session().get_device_id().await.unwrap(), session.device_id);
    }
}
