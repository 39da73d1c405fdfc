//! In-process client for driving handlers in tests
//!
//! Requests go straight through [`dispatch`], so no socket is bound and the
//! whole round trip stays on the test task.
//!
//! ```rust,ignore
//! use redactlog_core::{TestClient, TestRequest};
//!
//! let client = TestClient::new(app);
//! let response = client
//!     .request(TestRequest::post("/login").body(r#"{"password":"pw"}"#))
//!     .await;
//! response.assert_status(200u16);
//! ```

use crate::handler::Handler;
use crate::request::Request;
use crate::server::dispatch;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use http_body_util::BodyExt;
use serde::{de::DeserializeOwned, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

/// Sends requests to a handler without a network
#[derive(Clone)]
pub struct TestClient {
    handler: Arc<dyn Handler>,
    remote_addr: Option<SocketAddr>,
}

impl TestClient {
    /// Client for `handler`
    pub fn new<H: Handler>(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            remote_addr: None,
        }
    }

    /// Stamp every request with this peer address
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// `GET path` with no body
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(TestRequest::get(path)).await
    }

    /// `POST path` with `body` serialized as JSON
    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> TestResponse {
        self.request(TestRequest::post(path).json(body)).await
    }

    /// Send a fully built request
    pub async fn request(&self, req: TestRequest) -> TestResponse {
        let mut head = http::Request::new(());
        *head.method_mut() = req.method;
        *head.uri_mut() = req.path.parse().unwrap_or_else(|_| http::Uri::from_static("/"));
        *head.headers_mut() = req.headers;

        let mut request = Request::from_http_request(head, req.body);
        if let Some(addr) = self.remote_addr {
            request = request.with_remote_addr(addr);
        }

        let (parts, body) = dispatch(self.handler.as_ref(), request).await.into_parts();
        TestResponse {
            status: parts.status,
            headers: parts.headers,
            body: body.collect().await.map(|b| b.to_bytes()).unwrap_or_default(),
        }
    }
}

/// Request description for [`TestClient::request`]
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
}

impl TestRequest {
    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// `GET` request
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST` request
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    /// Add a header; invalid names or values are skipped
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (name.parse::<HeaderName>(), HeaderValue::from_str(value)) {
            self.headers.insert(name, value);
        }
        self
    }

    /// JSON body with a matching `Content-Type`
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        if let Ok(bytes) = serde_json::to_vec(body) {
            self.body = bytes.into();
            self.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        self
    }

    /// Raw body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// Collected response of a [`TestClient`] request
#[derive(Debug)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Response status
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Body decoded as UTF-8, lossily
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Panics unless the status equals `expected`
    pub fn assert_status<S: TryInto<StatusCode>>(&self, expected: S) -> &Self {
        let Ok(expected) = expected.try_into() else {
            panic!("invalid expected status code");
        };
        assert_eq!(
            self.status,
            expected,
            "unexpected status, body: {}",
            self.text()
        );
        self
    }

    /// Panics unless header `name` equals `expected`
    pub fn assert_header(&self, name: &str, expected: &str) -> &Self {
        let actual = self.headers.get(name).and_then(|v| v.to_str().ok());
        assert_eq!(actual, Some(expected), "header {}", name);
        self
    }
}
