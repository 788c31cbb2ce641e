use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bookmart_core::{normalize_base, AssetUrlNormalizer, SessionStore, Transport};
use bookmart_domain::constants::{CONTENT_TYPE_JSON, DEFAULT_TIMEOUT_SECS};
use bookmart_domain::{ApiError, HttpMethod, RequestDescriptor, Result, UploadDescriptor};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::errors::InfraError;

const INVALID_UPLOAD_RESPONSE: &str = "Invalid upload response";

/// reqwest-backed [`Transport`] issuing one request against one base.
///
/// Every 2xx body passes through the [`AssetUrlNormalizer`] before it is
/// returned. No retries happen here; failover across bases belongs to the
/// dispatcher.
#[derive(Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    session: Arc<SessionStore>,
    normalizer: AssetUrlNormalizer,
}

impl HttpTransport {
    /// Start building a new transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    async fn authorize(
        &self,
        builder: RequestBuilder,
        requires_auth: bool,
    ) -> Result<RequestBuilder> {
        if !requires_auth {
            return Ok(builder);
        }
        match self.session.get_token().await? {
            Some(token) => Ok(builder.bearer_auth(token)),
            None => Ok(builder),
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<(StatusCode, String)> {
        let response = builder.send().await.map_err(|err| ApiError::from(InfraError::from(err)))?;
        let status = response.status();
        let text = response.text().await.map_err(|err| ApiError::from(InfraError::from(err)))?;
        Ok((status, text))
    }

    fn finish(&self, status: StatusCode, body: Value) -> Result<Value> {
        if status.is_success() {
            Ok(self.normalizer.normalize(body))
        } else {
            let body = if body.is_null() { None } else { Some(body) };
            Err(ApiError::http(status.as_u16(), body))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn send(&self, base: &str, request: &RequestDescriptor) -> Result<Value> {
        let url = join_url(base, &request.path);
        let mut builder = self.client.request(to_method(request.method), &url);
        if let Some(body) = &request.body {
            builder = builder.header(CONTENT_TYPE, CONTENT_TYPE_JSON).json(body);
        }
        let builder = self.authorize(builder, request.requires_auth).await?;

        debug!(%url, "sending HTTP request");
        let (status, text) = self.execute(builder).await.inspect_err(|err| {
            warn!(%url, error = %err, "HTTP request failed");
        })?;
        debug!(%url, %status, "received HTTP response");

        self.finish(status, parse_lenient(&text))
    }

    #[instrument(
        skip(self, upload),
        fields(path = %upload.path, file = %upload.file_path.display())
    )]
    async fn upload(&self, base: &str, upload: &UploadDescriptor) -> Result<Value> {
        let url = join_url(base, &upload.path);
        let bytes = tokio::fs::read(&upload.file_path).await.map_err(|err| {
            ApiError::invalid_response(format!(
                "failed to read upload file {}: {err}",
                upload.file_path.display()
            ))
        })?;
        let file_name = upload
            .file_path
            .file_name()
            .map_or_else(|| "upload".to_string(), |name| name.to_string_lossy().into_owned());
        let part = Part::bytes(bytes).file_name(file_name);
        let form = Form::new().part(upload.field_name.clone(), part);

        let builder = self.client.post(&url).multipart(form);
        let builder = self.authorize(builder, upload.requires_auth).await?;

        debug!(%url, "uploading file");
        let (status, text) = self.execute(builder).await.inspect_err(|err| {
            warn!(%url, error = %err, "upload failed");
        })?;
        debug!(%url, %status, "received upload response");

        let body = if text.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&text).map_err(|err| {
                warn!(%url, %status, error = %err, "upload response is not JSON");
                ApiError::invalid_response(INVALID_UPLOAD_RESPONSE)
            })?
        };
        self.finish(status, body)
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
    normalizer: AssetUrlNormalizer,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: None,
            default_headers: None,
            normalizer: AssetUrlNormalizer::default(),
        }
    }
}

impl HttpTransportBuilder {
    /// Per-request timeout, covering connect through body read.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    #[must_use]
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    #[must_use]
    pub fn normalizer(mut self, normalizer: AssetUrlNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Build the transport, reading bearer tokens from `session`.
    ///
    /// # Errors
    /// Returns `ApiError::Config` when the underlying client cannot be built.
    pub fn build(self, session: Arc<SessionStore>) -> Result<HttpTransport> {
        let agent = self
            .user_agent
            .unwrap_or_else(|| concat!("bookmart-client/", env!("CARGO_PKG_VERSION")).to_string());
        let mut builder =
            ReqwestClient::builder().timeout(self.timeout).user_agent(agent).no_proxy();

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder
            .build()
            .map_err(|err| ApiError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpTransport { client, session, normalizer: self.normalizer })
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{path}", normalize_base(base))
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Empty body → `null`; non-JSON text → a JSON string.
fn parse_lenient(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::TcpListener;

    use bookmart_core::testing::InMemoryStore;
    use bookmart_domain::constants::TOKEN_KEY;
    use bookmart_domain::ErrorKind;
    use tempfile::NamedTempFile;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn transport_with(store: &Arc<InMemoryStore>) -> HttpTransport {
        HttpTransport::builder()
            .timeout(Duration::from_millis(500))
            .build(Arc::new(SessionStore::new(store.clone())))
            .unwrap()
    }

    #[tokio::test]
    async fn authenticated_request_carries_bearer_and_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cart/items"))
            .and(header("authorization", "Bearer tok-1"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "bookId": 3, "quantity": 1 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryStore::new());
        store.insert(TOKEN_KEY, json!("tok-1"));
        let request = RequestDescriptor::post("/api/cart/items")
            .with_body(json!({ "bookId": 3, "quantity": 1 }))
            .authenticated();

        let body = transport_with(&store).send(&server.uri(), &request).await.unwrap();
        assert_eq!(body, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn content_type_is_declared_only_with_a_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryStore::new());
        let transport = transport_with(&store);
        transport.send(&server.uri(), &RequestDescriptor::get("/api/books")).await.unwrap();
        transport.send(&server.uri(), &RequestDescriptor::post("/api/favorites/3")).await.unwrap();
        let order = RequestDescriptor::post("/api/orders").with_body(json!({}));
        transport.send(&server.uri(), &order).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let content_types: Vec<Option<&str>> = requests
            .iter()
            .map(|request| {
                request.headers.get("content-type").and_then(|value| value.to_str().ok())
            })
            .collect();
        assert_eq!(content_types, vec![None, None, Some("application/json")]);
    }

    #[tokio::test]
    async fn builder_headers_reach_every_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/categories"))
            .and(header("user-agent", "campus-kiosk/2"))
            .and(header("x-client", "kiosk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-client", reqwest::header::HeaderValue::from_static("kiosk"));
        let transport = HttpTransport::builder()
            .user_agent("campus-kiosk/2")
            .default_headers(headers)
            .build(Arc::new(SessionStore::new(Arc::new(InMemoryStore::new()))))
            .unwrap();

        let request = RequestDescriptor::get("/api/categories");
        assert_eq!(transport.send(&server.uri(), &request).await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn no_authorization_header_without_token_or_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryStore::new());
        let transport = transport_with(&store);
        let me = RequestDescriptor::get("/api/me").authenticated();
        transport.send(&server.uri(), &me).await.unwrap();

        store.insert(TOKEN_KEY, json!("tok-1"));
        transport.send(&server.uri(), &RequestDescriptor::get("/api/books")).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|request| !request.headers.contains_key("authorization")));
    }

    #[tokio::test]
    async fn success_bodies_are_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/books/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7,
                "cover": "/uploads/7.png",
                "gallery": ["http://api.example.com/uploads/7b.png"]
            })))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryStore::new());
        let body = transport_with(&store)
            .send(&format!("{}/", server.uri()), &RequestDescriptor::get("/api/books/7"))
            .await
            .unwrap();

        assert_eq!(body["cover"], "https://api.example.com/uploads/7.png");
        assert_eq!(body["gallery"][0], "https://api.example.com/uploads/7b.png");
        assert_eq!(body["id"], 7);
    }

    #[tokio::test]
    async fn empty_and_text_bodies_are_tolerated() {
        let server = MockServer::start().await;
        Mock::given(path("/api/cart/items/3"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(path("/api/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryStore::new());
        let transport = transport_with(&store);

        let deleted =
            transport.send(&server.uri(), &RequestDescriptor::delete("/api/cart/items/3")).await;
        assert_eq!(deleted.unwrap(), Value::Null);

        let text = transport.send(&server.uri(), &RequestDescriptor::get("/api/ping")).await;
        assert_eq!(text.unwrap(), json!("pong"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_http_error_with_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "error": "bad price" })),
            )
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryStore::new());
        let err = transport_with(&store)
            .send(&server.uri(), &RequestDescriptor::post("/api/sell-requests"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::HttpError);
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "bad price");
    }

    #[tokio::test]
    async fn unauthorized_is_auth_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryStore::new());
        let err = transport_with(&store)
            .send(&server.uri(), &RequestDescriptor::get("/api/me"))
            .await
            .unwrap_err();

        assert!(err.is_auth_expired());
        assert_eq!(err.to_string(), "HTTP 401");
    }

    #[tokio::test]
    async fn unreachable_base_is_a_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = Arc::new(InMemoryStore::new());
        let err = transport_with(&store)
            .send(&format!("http://{addr}"), &RequestDescriptor::get("/api/books"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransportFailure);
    }

    #[tokio::test]
    async fn slow_server_times_out_as_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryStore::new());
        let err = transport_with(&store)
            .send(&server.uri(), &RequestDescriptor::get("/api/books"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransportFailure);
    }

    fn upload_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG fake image").unwrap();
        file
    }

    #[tokio::test]
    async fn upload_sends_multipart_file_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/uploads/sell-image"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"url":"/uploads/sell/1.png"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryStore::new());
        store.insert(TOKEN_KEY, json!("tok-1"));
        let file = upload_file();
        let upload = UploadDescriptor::new("/api/uploads/sell-image", file.path()).authenticated();

        let body = transport_with(&store).upload(&server.uri(), &upload).await.unwrap();
        assert_eq!(body["url"], "https://api.example.com/uploads/sell/1.png");

        let requests = server.received_requests().await.unwrap();
        let content_type = requests[0].headers.get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data"));
        let payload = String::from_utf8_lossy(&requests[0].body);
        assert!(payload.contains(r#"name="file""#));
        assert!(payload.contains("fake image"));
    }

    #[tokio::test]
    async fn upload_with_empty_body_yields_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryStore::new());
        let file = upload_file();
        let upload = UploadDescriptor::new("/api/uploads/sell-image", file.path());

        let body = transport_with(&store).upload(&server.uri(), &upload).await.unwrap();
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn upload_with_unparseable_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryStore::new());
        let file = upload_file();
        let upload = UploadDescriptor::new("/api/uploads/sell-image", file.path());

        let err = transport_with(&store).upload(&server.uri(), &upload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
        assert_eq!(err.to_string(), INVALID_UPLOAD_RESPONSE);
    }

    #[tokio::test]
    async fn upload_rejection_carries_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(413).set_body_string(r#"{"error":"file too large"}"#),
            )
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryStore::new());
        let file = upload_file();
        let upload = UploadDescriptor::new("/api/uploads/sell-image", file.path());

        let err = transport_with(&store).upload(&server.uri(), &upload).await.unwrap_err();
        assert_eq!(err.status(), Some(413));
        assert_eq!(err.server_message(), Some("file too large"));
    }

    #[tokio::test]
    async fn missing_upload_file_fails_before_any_request() {
        let server = MockServer::start().await;
        let store = Arc::new(InMemoryStore::new());
        let upload = UploadDescriptor::new("/api/uploads/sell-image", "/nonexistent/cover.png");

        let err = transport_with(&store).upload(&server.uri(), &upload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
        assert!(err.to_string().contains("/nonexistent/cover.png"));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
