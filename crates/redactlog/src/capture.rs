//! Response writer that holds back everything the wrapped handler writes.

use crate::pool::PooledBuffer;
use http::{HeaderMap, StatusCode};
use redactlog_core::ResponseWriter;
use std::io;
use tracing::debug;

/// Stands in for the real response while the wrapped handler runs.
///
/// Body bytes and the status are buffered; the status is taken from the first
/// `set_status` call only. Headers go straight to the real response, since
/// nothing has been sent yet. The middleware flushes the (redacted) result
/// once the handler returns.
pub struct CapturingResponse<'a> {
    inner: &'a mut dyn ResponseWriter,
    body: PooledBuffer,
    status: Option<StatusCode>,
}

impl<'a> CapturingResponse<'a> {
    /// Capture into `body`, forwarding headers to `inner`.
    pub fn new(inner: &'a mut dyn ResponseWriter, body: PooledBuffer) -> Self {
        Self {
            inner,
            body,
            status: None,
        }
    }

    /// Status recorded so far, if any
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Bytes captured so far
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Release the real response and hand back what was captured.
    pub fn into_parts(self) -> (Option<StatusCode>, PooledBuffer) {
        (self.status, self.body)
    }
}

impl ResponseWriter for CapturingResponse<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn set_status(&mut self, status: StatusCode) {
        match self.status {
            Some(first) => debug!(%first, ignored = %status, "status already captured"),
            None => self.status = Some(status),
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }
}
