//! Request types for redactlog
//!
//! A [`Request`] owns the head of an inbound HTTP request and its body. The
//! body starts out either streaming (straight from hyper) or already buffered.
//! Middleware that needs to look at the payload calls
//! [`Request::buffer_body`], which drains the stream once and keeps the bytes
//! so the downstream handler can still read them.

use crate::error::{BoxError, Error, Result};
use bytes::Bytes;
use http::{request::Parts, HeaderMap, Method};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::net::SocketAddr;

/// Default cap on buffered request bodies: 1MB
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Type-erased streaming request body
pub type BoxBody = UnsyncBoxBody<Bytes, BoxError>;

pub(crate) enum BodyVariant {
    Buffered(Bytes),
    Streaming(BoxBody),
    Taken,
}

/// HTTP Request wrapper
///
/// Provides access to all parts of an incoming HTTP request.
pub struct Request {
    pub(crate) parts: Parts,
    pub(crate) body: BodyVariant,
    pub(crate) remote_addr: Option<SocketAddr>,
}

impl Request {
    /// Create a request whose body is already in memory
    pub fn from_parts(parts: Parts, body: impl Into<Bytes>) -> Self {
        Self {
            parts,
            body: BodyVariant::Buffered(body.into()),
            remote_addr: None,
        }
    }

    /// Create a request backed by a streaming body
    pub fn streaming<B>(parts: Parts, body: B) -> Self
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self {
            parts,
            body: BodyVariant::Streaming(body.map_err(Into::into).boxed_unsync()),
            remote_addr: None,
        }
    }

    /// Build a buffered request from an `http::Request`
    pub fn from_http_request<B>(req: http::Request<B>, body: impl Into<Bytes>) -> Self {
        let (parts, _) = req.into_parts();
        Self::from_parts(parts, body)
    }

    /// Attach the peer address of the connection
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Get the HTTP method
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Get the headers
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Get mutable headers
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    /// Get the request path
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Peer address of the connection, when known
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Host the request was addressed to.
    ///
    /// Uses the `Host` header, falling back to the URI authority.
    pub fn host(&self) -> Option<&str> {
        self.parts
            .headers
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.parts.uri.authority().map(|a| a.as_str()))
    }

    /// Value of the `User-Agent` header
    pub fn user_agent(&self) -> Option<&str> {
        self.parts
            .headers
            .get(http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
    }

    /// Read the whole body into memory without consuming it.
    ///
    /// A streaming body is drained and replaced by the buffered bytes, so a
    /// later [`take_body`](Self::take_body) still sees the full payload.
    /// Returns an empty buffer once the body has been taken.
    ///
    /// Reading stops after `limit` bytes with [`Error::PayloadTooLarge`]. On
    /// that or any stream error the body is left empty.
    pub async fn buffer_body(&mut self, limit: usize) -> Result<Bytes> {
        let bytes = match std::mem::replace(&mut self.body, BodyVariant::Taken) {
            BodyVariant::Buffered(bytes) if bytes.len() > limit => {
                return Err(Error::PayloadTooLarge { limit });
            }
            BodyVariant::Buffered(bytes) => bytes,
            BodyVariant::Streaming(stream) => collect_limited(stream, limit)
                .await
                .map_err(|err| {
                    if err.is::<LengthLimitError>() {
                        Error::PayloadTooLarge { limit }
                    } else {
                        Error::BodyRead(err)
                    }
                })?
                .to_bytes(),
            BodyVariant::Taken => return Ok(Bytes::new()),
        };
        self.body = BodyVariant::Buffered(bytes.clone());
        Ok(bytes)
    }

    /// Take the body bytes (can only be called once)
    ///
    /// Subsequent calls return an empty buffer.
    pub async fn take_body(&mut self) -> Result<Bytes> {
        match std::mem::replace(&mut self.body, BodyVariant::Taken) {
            BodyVariant::Buffered(bytes) => Ok(bytes),
            BodyVariant::Streaming(stream) => Ok(stream
                .collect()
                .await
                .map_err(Error::BodyRead)?
                .to_bytes()),
            BodyVariant::Taken => Ok(Bytes::new()),
        }
    }

    /// Whether the body has already been taken by a reader
    pub fn is_body_taken(&self) -> bool {
        matches!(self.body, BodyVariant::Taken)
    }
}

/// Collect a limited body behind a boxed `Send` future.
///
/// Boxing keeps the `Limited` collect future out of `buffer_body`'s state,
/// which otherwise trips a higher-ranked lifetime error in `Send` checks.
fn collect_limited(
    stream: BoxBody,
    limit: usize,
) -> std::pin::Pin<
    Box<
        dyn std::future::Future<
                Output = std::result::Result<http_body_util::Collected<Bytes>, BoxError>,
            > + Send,
    >,
> {
    Box::pin(Limited::new(stream, limit).collect())
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}
