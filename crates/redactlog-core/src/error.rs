//! Error types for redactlog-core

/// Boxed error used for arbitrary body and service failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for redactlog-core operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the handler contract
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The inbound body stream failed before it was fully read.
    #[error("failed to read request body: {0}")]
    BodyRead(#[source] BoxError),

    /// The inbound body is larger than the caller allowed.
    #[error("request body exceeds limit of {limit} bytes")]
    PayloadTooLarge {
        /// Maximum accepted size
        limit: usize,
    },
}
