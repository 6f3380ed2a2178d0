use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Minimal HTTP method enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// HTTP headers represented as key/value pairs.
///
/// Header names are treated case-insensitively by helper functions.
pub type HttpHeaders = Vec<(String, String)>;

/// A minimal HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a JSON body and the matching content type.
    #[must_use]
    pub fn json_body(mut self, body: &serde_json::Value) -> Self {
        self.body = body.to_string().into_bytes();
        self.header("Content-Type", "application/json")
    }
}

/// A minimal HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as text, lossily decoded.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("http transport error: {0}")]
    Transport(String),

    #[error("no mock response registered for {method} {url}")]
    NoMockResponse { method: String, url: String },
}

/// Transport boundary for all HTTP I/O.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Get the first header value matching `name` (case-insensitive).
#[must_use]
pub fn header_get<'a>(headers: &'a HttpHeaders, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(any(feature = "github", feature = "gitlab"))]
pub mod reqwest_transport {
    use super::*;

    use std::time::Duration as StdDuration;

    /// A real HTTP transport backed by reqwest.
    #[derive(Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(client: reqwest::Client) -> Self {
            Self { client }
        }

        pub fn with_timeout(timeout: StdDuration) -> Result<Self, HttpError> {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| HttpError::Transport(e.to_string()))?;
            Ok(Self { client })
        }
    }

    #[async_trait]
    impl HttpTransport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            let method = match request.method {
                HttpMethod::Get => reqwest::Method::GET,
                HttpMethod::Post => reqwest::Method::POST,
                HttpMethod::Put => reqwest::Method::PUT,
                HttpMethod::Delete => reqwest::Method::DELETE,
            };

            let mut builder = self.client.request(method, &request.url);
            for (k, v) in request.headers {
                builder = builder.header(&k, &v);
            }

            if !request.body.is_empty() {
                builder = builder.body(request.body);
            }

            let resp = builder
                .send()
                .await
                .map_err(|e| HttpError::Transport(e.to_string()))?;

            let status = resp.status().as_u16();
            let headers: HttpHeaders = resp
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        value.to_str().unwrap_or_default().to_string(),
                    )
                })
                .collect();

            let body = resp
                .bytes()
                .await
                .map_err(|e| HttpError::Transport(e.to_string()))?
                .to_vec();

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
    }
}

// ---------- Test-only mock transport ----------

#[cfg(test)]
use std::collections::{HashMap, VecDeque};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// In-memory mock transport.
///
/// Designed for unit tests: no sockets, no loopback HTTP servers.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[cfg(test)]
#[derive(Default)]
struct MockTransportInner {
    routes: HashMap<(HttpMethod, String), VecDeque<Result<HttpResponse, String>>>,
    requests: Vec<HttpRequest>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response for a method + URL.
    ///
    /// Multiple responses for the same key are returned in FIFO order.
    pub fn push_response(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        response: HttpResponse,
    ) {
        self.push(method, url.into(), Ok(response));
    }

    /// Register a JSON response with extra headers.
    pub fn push_json_with_headers(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        status: u16,
        body: serde_json::Value,
        headers: &[(&str, &str)],
    ) {
        let mut all: HttpHeaders = vec![("Content-Type".to_string(), "application/json".to_string())];
        all.extend(
            headers
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
        );
        self.push_response(
            method,
            url,
            HttpResponse {
                status,
                headers: all,
                body: body.to_string().into_bytes(),
            },
        );
    }

    pub fn push_json(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        status: u16,
        body: serde_json::Value,
    ) {
        self.push_json_with_headers(method, url, status, body, &[]);
    }

    /// Register a transport-level failure (connection refused, reset, ...).
    pub fn push_transport_error(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.push(method, url.into(), Err(message.into()));
    }

    fn push(&self, method: HttpMethod, url: String, entry: Result<HttpResponse, String>) {
        let mut inner = self
            .inner
            .lock()
            .expect("mock transport lock should not be poisoned");
        inner.routes.entry((method, url)).or_default().push_back(entry);
    }

    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        let inner = self
            .inner
            .lock()
            .expect("mock transport lock should not be poisoned");
        inner.requests.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut inner = self
            .inner
            .lock()
            .expect("mock transport lock should not be poisoned");

        let key = (request.method, request.url.clone());
        inner.requests.push(request);

        match inner.routes.get_mut(&key).and_then(|q| q.pop_front()) {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(message)) => Err(HttpError::Transport(message)),
            None => Err(HttpError::NoMockResponse {
                method: key.0.as_str().to_string(),
                url: key.1,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_get_is_case_insensitive_and_returns_first_match() {
        let headers: HttpHeaders = vec![
            ("X-Next-Page".to_string(), "2".to_string()),
            ("x-next-page".to_string(), "3".to_string()),
        ];
        assert_eq!(header_get(&headers, "x-next-page"), Some("2"));
        assert_eq!(header_get(&headers, "X-NEXT-PAGE"), Some("2"));
        assert_eq!(header_get(&headers, "missing"), None);
    }

    #[test]
    fn http_method_as_str_matches_expected_values() {
        assert_eq!(HttpMethod::Get.as_str(), "GET");
        assert_eq!(HttpMethod::Post.as_str(), "POST");
        assert_eq!(HttpMethod::Put.as_str(), "PUT");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }

    #[test]
    fn json_body_sets_content_type() {
        let req = HttpRequest::new(HttpMethod::Post, "https://example.com/projects")
            .header("Accept", "application/json")
            .json_body(&json!({"name": "demo"}));

        assert_eq!(header_get(&req.headers, "content-type"), Some("application/json"));
        assert_eq!(header_get(&req.headers, "accept"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(body["name"], "demo");
    }

    #[test]
    fn http_response_helpers() {
        let resp = HttpResponse {
            status: 201,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: br#"{"id": 7}"#.to_vec(),
        };
        assert!(resp.is_success());
        assert_eq!(resp.header("content-type"), Some("application/json"));
        let value: serde_json::Value = resp.json().unwrap();
        assert_eq!(value["id"], 7);

        let not_found = HttpResponse {
            status: 404,
            headers: Vec::new(),
            body: b"missing".to_vec(),
        };
        assert!(!not_found.is_success());
        assert_eq!(not_found.text(), "missing");
    }

    #[tokio::test]
    async fn mock_transport_returns_registered_responses_in_order() {
        let transport = MockTransport::new();
        let url = "https://example.com/api";
        transport.push_json(HttpMethod::Get, url, 503, json!({}));
        transport.push_json_with_headers(HttpMethod::Get, url, 200, json!({"ok": true}), &[("X-Test", "ok")]);

        let req = HttpRequest::new(HttpMethod::Get, url);
        let first = transport.send(req.clone()).await.expect("first response");
        let second = transport.send(req.clone()).await.expect("second response");

        assert_eq!(first.status, 503);
        assert_eq!(second.status, 200);
        assert_eq!(second.header("x-test"), Some("ok"));
        assert_eq!(transport.requests(), vec![req.clone(), req]);
    }

    #[tokio::test]
    async fn mock_transport_errors_when_no_response_is_registered() {
        let transport = MockTransport::new();
        let err = transport
            .send(HttpRequest::new(HttpMethod::Delete, "https://example.com/missing"))
            .await
            .expect_err("missing mock should error");
        match err {
            HttpError::NoMockResponse { method, url } => {
                assert_eq!(method, "DELETE");
                assert_eq!(url, "https://example.com/missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn mock_transport_can_simulate_transport_failures() {
        let transport = MockTransport::new();
        transport.push_transport_error(HttpMethod::Get, "https://example.com/", "connection reset");
        let err = transport
            .send(HttpRequest::new(HttpMethod::Get, "https://example.com/"))
            .await
            .expect_err("transport error");
        assert!(matches!(err, HttpError::Transport(m) if m == "connection reset"));
    }

    #[test]
    #[cfg(any(feature = "github", feature = "gitlab"))]
    fn reqwest_transport_with_timeout_builds_client() {
        let transport = reqwest_transport::ReqwestTransport::with_timeout(
            std::time::Duration::from_millis(1),
        )
        .expect("reqwest transport should build");
        let _ = transport;
    }

    #[tokio::test]
    #[cfg(any(feature = "github", feature = "gitlab"))]
    async fn reqwest_transport_send_returns_transport_error_for_invalid_url() {
        let transport = reqwest_transport::ReqwestTransport::new(reqwest::Client::new());
        let err = transport
            .send(HttpRequest::new(HttpMethod::Get, "not a url"))
            .await
            .expect_err("expected error");
        assert!(matches!(err, HttpError::Transport(_)));
    }
}
