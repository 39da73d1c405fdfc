//! The per-request access log record.

use crate::codec::{self, CodecError, KeyValue};
use std::time::Duration;

/// One access log entry.
///
/// Encodes to a JSON object whose keys always appear in field declaration
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Peer address, or forwarded client address when trusted
    pub client_ip: String,
    /// Request method
    pub method: String,
    /// Response status sent to the caller
    pub status_code: u16,
    /// Captured response size before redaction
    pub body_size: usize,
    /// Redacted request body
    pub request_body: String,
    /// Redacted response body
    pub response_body: String,
    /// Request path
    pub path: String,
    /// `User-Agent` header
    pub user_agent: String,
    /// Correlation id
    pub request_id: String,
    /// `Host` header or URI authority
    pub host: String,
    /// Elapsed time, see [`format_latency`]
    pub latency_ms: String,
}

impl LogRecord {
    /// Fields as an ordered pair sequence
    pub fn to_pairs(&self) -> Vec<KeyValue> {
        vec![
            KeyValue::new("client_ip", self.client_ip.as_str()),
            KeyValue::new("method", self.method.as_str()),
            KeyValue::new("status_code", self.status_code),
            KeyValue::new("body_size", self.body_size),
            KeyValue::new("request_body", self.request_body.as_str()),
            KeyValue::new("response_body", self.response_body.as_str()),
            KeyValue::new("path", self.path.as_str()),
            KeyValue::new("user_agent", self.user_agent.as_str()),
            KeyValue::new("request_id", self.request_id.as_str()),
            KeyValue::new("host", self.host.as_str()),
            KeyValue::new("latency_ms", self.latency_ms.as_str()),
        ]
    }

    /// Encode as one line of JSON
    pub fn encode(&self) -> Result<String, CodecError> {
        codec::encode(&self.to_pairs())
    }
}

/// Milliseconds with four decimals and an `ms` suffix, e.g. `1.2345ms`.
pub fn format_latency(elapsed: Duration) -> String {
    format!("{:.4}ms", elapsed.as_secs_f64() * 1000.0)
}
