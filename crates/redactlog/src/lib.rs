//! # redactlog
//!
//! Request/response logging middleware that masks sensitive fields.
//!
//! Wrap any [`redactlog_core::Handler`] with [`LoggerMiddleware`] and every
//! request it serves produces one JSON log line: client address, method,
//! status, response size, both bodies with the configured fields replaced by
//! `"****"`, path, user agent, a request id, host and latency. The caller
//! receives the redacted response body as well.
//!
//! ## Features
//!
//! - `config` - `LoggerConfig` from `REDACTLOG_*` variables and `.env` files,
//!   plus `init_tracing` (enabled by default)
//!
//! ## Example
//!
//! ```rust,ignore
//! use redactlog::{LoggerMiddleware, WriterSink};
//!
//! let logger = LoggerMiddleware::new(["password", "token"], WriterSink::stdout());
//! let app = logger.wrap(api);
//! redactlog_core::serve("0.0.0.0:8080", app).await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod capture;
pub mod codec;
pub mod middleware;
pub mod pool;
pub mod record;
pub mod redact;
pub mod request_id;
pub mod sink;

// Configuration management module
#[cfg(feature = "config")]
pub mod config;

pub use capture::CapturingResponse;
pub use codec::{BodyMap, CodecError, KeyValue, Value};
pub use middleware::{Logged, LoggerMiddleware};
pub use pool::{BufferPool, PooledBuffer};
pub use record::LogRecord;
pub use redact::{Redactor, MASK};
pub use request_id::generate_request_id;
pub use sink::{LogSink, SinkError, SinkResult, TracingSink, WriterSink};

#[cfg(feature = "config")]
pub use config::{init_tracing, load_dotenv, ConfigError, LoggerConfig};
