//! Request/response logging middleware with body redaction.
//!
//! [`LoggerMiddleware::wrap`] turns any [`Handler`] into one that logs every
//! request it serves. For each request it:
//!
//! 1. reads the request body and puts it back for the handler,
//! 2. runs the handler against a [`CapturingResponse`],
//! 3. redacts both bodies and sends the redacted response to the caller,
//! 4. emits one [`LogRecord`] to the configured [`LogSink`].
//!
//! # Example
//!
//! ```rust,ignore
//! use redactlog::{LoggerMiddleware, TracingSink};
//!
//! let logger = LoggerMiddleware::new(["password", "token"], TracingSink::new());
//! redactlog_core::serve("127.0.0.1:8080", logger.wrap(api)).await?;
//! ```

use crate::capture::CapturingResponse;
use crate::pool::BufferPool;
use crate::record::{format_latency, LogRecord};
use crate::redact::Redactor;
use crate::request_id::generate_request_id;
use crate::sink::LogSink;
use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use redactlog_core::{BoxFuture, Handler, Request, ResponseWriter, DEFAULT_BODY_LIMIT};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, debug_span, Instrument};

/// Logging middleware.
///
/// Cheap to clone; all clones share the sink, field list and buffer pool.
#[derive(Clone)]
pub struct LoggerMiddleware {
    redactor: Redactor,
    sink: Arc<dyn LogSink>,
    pool: BufferPool,
    body_limit: usize,
    trust_forwarded_for: bool,
}

impl LoggerMiddleware {
    /// Create a middleware masking `sensitive_fields` and logging to `sink`.
    pub fn new<I, S, K>(sensitive_fields: I, sink: K) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        K: LogSink,
    {
        Self {
            redactor: Redactor::new(sensitive_fields),
            sink: Arc::new(sink),
            pool: BufferPool::new(),
            body_limit: DEFAULT_BODY_LIMIT,
            trust_forwarded_for: false,
        }
    }

    /// Create a middleware from loaded configuration.
    #[cfg(feature = "config")]
    pub fn from_config<K: LogSink>(config: &crate::config::LoggerConfig, sink: K) -> Self {
        Self::new(config.sensitive_fields.iter().cloned(), sink)
            .with_pool(BufferPool::with_limits(
                config.pool_max_buffers,
                config.pool_max_capacity,
            ))
            .body_limit(config.body_limit)
            .trust_forwarded_for(config.trust_forwarded_for)
    }

    /// Use a specific buffer pool, e.g. one shared between middlewares.
    pub fn with_pool(mut self, pool: BufferPool) -> Self {
        self.pool = pool;
        self
    }

    /// Largest request body read into memory, in bytes (default 1MB).
    ///
    /// Larger bodies are reported to the sink's error channel and the
    /// handler sees an empty body.
    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Take `client_ip` from `X-Forwarded-For` / `X-Real-IP` when present.
    ///
    /// Only enable this behind a proxy that overwrites those headers.
    pub fn trust_forwarded_for(mut self, enabled: bool) -> Self {
        self.trust_forwarded_for = enabled;
        self
    }

    /// The redactor applied to bodies
    pub fn redactor(&self) -> &Redactor {
        &self.redactor
    }

    /// The buffer pool used for response capture
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Wrap a handler.
    pub fn wrap<H: Handler>(&self, inner: H) -> Logged<H> {
        Logged {
            middleware: self.clone(),
            inner,
        }
    }

    async fn handle<H: Handler + ?Sized>(
        &self,
        inner: &H,
        mut req: Request,
        res: &mut dyn ResponseWriter,
    ) {
        let buffer = self.pool.acquire();
        let start = Instant::now();
        let request_id = generate_request_id();

        let request_body = match req.buffer_body(self.body_limit).await {
            Ok(body) => body,
            Err(err) => {
                self.sink
                    .error(&format!("Error reading request body: {}", err));
                Bytes::new()
            }
        };
        let meta = RequestMeta::capture(&req, self.trust_forwarded_for);

        let mut proxy = CapturingResponse::new(&mut *res, buffer);
        inner
            .serve(req, &mut proxy)
            .instrument(debug_span!("logged_request", request_id = %request_id))
            .await;
        let (status, captured) = proxy.into_parts();
        let status = status.unwrap_or(StatusCode::OK);

        let request_body = self.redactor.redact(&request_body);
        let response_body = self.redactor.redact(&captured);

        self.flush(res, status, captured.len(), &response_body);

        let record = LogRecord {
            client_ip: meta.client_ip,
            method: meta.method,
            status_code: status.as_u16(),
            body_size: captured.len(),
            request_body: String::from_utf8_lossy(&request_body).into_owned(),
            response_body: String::from_utf8_lossy(&response_body).into_owned(),
            path: meta.path,
            user_agent: meta.user_agent,
            request_id,
            host: meta.host,
            latency_ms: format_latency(start.elapsed()),
        };
        self.emit(&record);
    }

    fn flush(
        &self,
        res: &mut dyn ResponseWriter,
        status: StatusCode,
        captured_len: usize,
        body: &[u8],
    ) {
        if body.len() != captured_len {
            if let Some(length) = res.headers_mut().get_mut(header::CONTENT_LENGTH) {
                *length = HeaderValue::from(body.len());
            }
        }
        res.set_status(status);
        if let Err(err) = res.write_all(body) {
            self.sink.error(&format!("Error writing response: {}", err));
        }
    }

    fn emit(&self, record: &LogRecord) {
        match record.encode() {
            Ok(line) => {
                if let Err(err) = self.sink.record(&line) {
                    tracing::error!(error = %err, request_id = %record.request_id, "failed to emit log record");
                }
            }
            Err(err) => self
                .sink
                .error(&format!("Error marshalling log details: {}", err)),
        }
        debug!(
            request_id = %record.request_id,
            status = record.status_code,
            latency = %record.latency_ms,
            "request logged"
        );
    }
}

impl std::fmt::Debug for LoggerMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerMiddleware")
            .field("sensitive_fields", &self.redactor.fields())
            .field("pool", &self.pool)
            .field("body_limit", &self.body_limit)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .finish_non_exhaustive()
    }
}

/// A handler wrapped by [`LoggerMiddleware`].
#[derive(Clone)]
pub struct Logged<H> {
    middleware: LoggerMiddleware,
    inner: H,
}

impl<H> Logged<H> {
    /// The wrapped handler
    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H: Handler> Handler for Logged<H> {
    fn serve<'a>(&'a self, req: Request, res: &'a mut dyn ResponseWriter) -> BoxFuture<'a, ()> {
        Box::pin(self.middleware.handle(&self.inner, req, res))
    }
}

/// Request fields copied out before the handler takes ownership.
struct RequestMeta {
    client_ip: String,
    method: String,
    path: String,
    user_agent: String,
    host: String,
}

impl RequestMeta {
    fn capture(req: &Request, trust_forwarded_for: bool) -> Self {
        Self {
            client_ip: client_ip(req, trust_forwarded_for),
            method: req.method().to_string(),
            path: req.path().to_string(),
            user_agent: req.user_agent().unwrap_or_default().to_string(),
            host: req.host().unwrap_or_default().to_string(),
        }
    }
}

fn client_ip(req: &Request, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(ip) = forwarded_ip(req) {
            return ip;
        }
    }
    req.remote_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_default()
}

fn forwarded_ip(req: &Request) -> Option<String> {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next());
    let real_ip = req.headers().get("x-real-ip").and_then(|v| v.to_str().ok());

    [forwarded, real_ip]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|ip| ip.parse::<IpAddr>().is_ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use redactlog_core::{handler_fn, ResponseRecorder};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySink {
        records: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
    }

    impl LogSink for MemorySink {
        fn record(&self, line: &str) -> crate::sink::SinkResult<()> {
            self.records.lock().unwrap().push(line.to_string());
            Ok(())
        }

        fn error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }

    fn request(builder: http::request::Builder, body: &'static str) -> Request {
        Request::from_http_request(builder.body(()).unwrap(), body)
    }

    #[tokio::test]
    async fn default_status_is_ok() {
        let sink = Arc::new(MemorySink::default());
        let logged = LoggerMiddleware::new(["password"], sink.clone()).wrap(handler_fn(
            |_req, res| {
                Box::pin(async move {
                    let _ = res.write_all(b"plain");
                })
            },
        ));

        let mut real = ResponseRecorder::new();
        logged
            .serve(request(http::Request::get("/"), ""), &mut real)
            .await;

        assert_eq!(real.status(), StatusCode::OK);
        assert_eq!(real.body(), b"plain");
        let records = sink.records.lock().unwrap();
        let record = codec::decode(records[0].as_bytes()).unwrap();
        assert_eq!(record["status_code"], codec::Value::Float(200.0));
        assert_eq!(record["body_size"], codec::Value::Float(5.0));
    }

    #[tokio::test]
    async fn content_length_follows_redaction() {
        let sink = Arc::new(MemorySink::default());
        let logged = LoggerMiddleware::new(["token"], sink.clone()).wrap(handler_fn(
            |_req, res| {
                Box::pin(async move {
                    let body = br#"{"token":"abcdef123456"}"#;
                    res.headers_mut()
                        .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
                    let _ = res.write_all(body);
                })
            },
        ));

        let mut real = ResponseRecorder::new();
        logged
            .serve(request(http::Request::get("/"), ""), &mut real)
            .await;

        assert_eq!(real.body(), br#"{"token":"****"}"#);
        assert_eq!(real.headers()[header::CONTENT_LENGTH], "16");
    }

    #[test]
    fn client_ip_prefers_forwarded_only_when_trusted() {
        let req = request(
            http::Request::get("/")
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .header("x-real-ip", "198.51.100.2"),
            "",
        )
        .with_remote_addr("10.0.0.1:4000".parse().unwrap());

        assert_eq!(client_ip(&req, false), "10.0.0.1:4000");
        assert_eq!(client_ip(&req, true), "203.0.113.9");
    }

    #[test]
    fn client_ip_falls_back_through_headers() {
        let req = request(
            http::Request::get("/")
                .header("x-forwarded-for", "not-an-ip")
                .header("x-real-ip", "198.51.100.2"),
            "",
        );
        assert_eq!(client_ip(&req, true), "198.51.100.2");

        let bare = request(http::Request::get("/"), "");
        assert_eq!(client_ip(&bare, true), "");
    }

    #[test]
    fn debug_lists_fields() {
        let logger = LoggerMiddleware::new(["password"], MemorySink::default());
        assert!(format!("{:?}", logger).contains("password"));
    }
}
