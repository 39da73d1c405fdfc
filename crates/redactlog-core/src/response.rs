//! Response types for redactlog
//!
//! Handlers do not return a response value. They write into a
//! [`ResponseWriter`]: set headers, fix the status once, then stream body
//! bytes. This is the seam middleware hooks into: a wrapper can hand the
//! inner handler its own writer and decide later what reaches the real one.
//!
//! [`ResponseRecorder`] is the writer the server hands to the outermost
//! handler. It collects everything and turns it into a hyper response.
//!
//! # Example
//!
//! ```rust,ignore
//! use redactlog_core::{ResponseRecorder, ResponseWriter};
//! use http::StatusCode;
//!
//! let mut rec = ResponseRecorder::new();
//! rec.headers_mut().insert("content-type", "application/json".parse()?);
//! rec.set_status(StatusCode::CREATED);
//! rec.write_all(br#"{"id":1}"#)?;
//! let response = rec.into_response();
//! ```

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use std::io;

/// HTTP Response type
pub type Response = http::Response<Full<Bytes>>;

/// Destination a handler writes its response into
pub trait ResponseWriter: Send {
    /// Header map of the response.
    ///
    /// Headers must be set before the status is finalized.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Fix the response status. Only the first call has an effect.
    fn set_status(&mut self, status: StatusCode);

    /// Append body bytes, returning how many were accepted.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Write the whole buffer, retrying short writes.
    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole response body",
                    ))
                }
                Ok(n) => buf = &buf[n..],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl<W: ResponseWriter + ?Sized> ResponseWriter for &mut W {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        (**self).headers_mut()
    }

    fn set_status(&mut self, status: StatusCode) {
        (**self).set_status(status)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }
}

/// In-memory response sink that becomes a hyper [`Response`]
///
/// Mirrors the usual server semantics: the first status wins, and writing
/// body bytes before any status implies `200 OK`.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseRecorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Status recorded so far, `200 OK` if none was set
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// Whether a status has been fixed
    pub fn has_status(&self) -> bool {
        self.status.is_some()
    }

    /// Recorded headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Body written so far
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Convert into a hyper response
    pub fn into_response(self) -> Response {
        let mut response = http::Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseWriter for ResponseRecorder {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn set_status(&mut self, status: StatusCode) {
        match self.status {
            None => self.status = Some(status),
            Some(current) => {
                tracing::debug!(
                    current = %current.as_u16(),
                    ignored = %status.as_u16(),
                    "superfluous set_status call"
                );
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn first_status_wins() {
        let mut rec = ResponseRecorder::new();
        rec.set_status(StatusCode::CREATED);
        rec.set_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(rec.status(), StatusCode::CREATED);
    }

    #[test]
    fn write_implies_ok() {
        let mut rec = ResponseRecorder::new();
        rec.write_all(b"hello").unwrap();
        rec.set_status(StatusCode::NOT_FOUND);
        assert_eq!(rec.status(), StatusCode::OK);
        assert_eq!(rec.body(), b"hello");
    }

    #[test]
    fn default_status_is_ok_without_writes() {
        let rec = ResponseRecorder::new();
        assert!(!rec.has_status());
        assert_eq!(rec.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn into_response_carries_status_headers_and_body() {
        let mut rec = ResponseRecorder::new();
        rec.headers_mut()
            .insert(http::header::CONTENT_TYPE, "text/plain".parse().unwrap());
        rec.set_status(StatusCode::ACCEPTED);
        rec.write_all(b"queued").unwrap();

        let response = rec.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()["content-type"], "text/plain");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from("queued"));
    }

    struct ShortWriter {
        inner: ResponseRecorder,
    }

    impl ResponseWriter for ShortWriter {
        fn headers_mut(&mut self) -> &mut HeaderMap {
            self.inner.headers_mut()
        }

        fn set_status(&mut self, status: StatusCode) {
            self.inner.set_status(status)
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(2);
            self.inner.write(&buf[..n])
        }
    }

    #[test]
    fn write_all_retries_short_writes() {
        let mut writer = ShortWriter {
            inner: ResponseRecorder::new(),
        };
        writer.write_all(b"abcdefg").unwrap();
        assert_eq!(writer.inner.body(), b"abcdefg");
    }
}
