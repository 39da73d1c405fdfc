//! Destinations for encoded log records.
//!
//! The middleware hands every finished record to a [`LogSink`] as a single
//! line of JSON. Operational failures (a record that could not be encoded, a
//! response that could not be written) go to the sink's error channel.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Error type for sink operations.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// IO error while writing a record.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Sink is closed or its lock is poisoned.
    #[error("log sink unavailable: {0}")]
    Unavailable(String),
}

/// Result type for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Receives log records and operational errors.
///
/// Implement this trait to route records somewhere custom.
pub trait LogSink: Send + Sync + 'static {
    /// Emit one encoded record.
    fn record(&self, line: &str) -> SinkResult<()>;

    /// Report an operational error.
    fn error(&self, message: &str);
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn record(&self, line: &str) -> SinkResult<()> {
        (**self).record(line)
    }

    fn error(&self, message: &str) {
        (**self).error(message)
    }
}

impl<S: LogSink + ?Sized> LogSink for Box<S> {
    fn record(&self, line: &str) -> SinkResult<()> {
        (**self).record(line)
    }

    fn error(&self, message: &str) {
        (**self).error(message)
    }
}

/// Sink that emits records as `tracing` events.
///
/// Records are logged at `INFO` under the `redactlog::access` target, errors
/// at `ERROR` under the same target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Create a tracing sink
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for TracingSink {
    fn record(&self, line: &str) -> SinkResult<()> {
        tracing::info!(target: "redactlog::access", "{}", line);
        Ok(())
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "redactlog::access", "{}", message);
    }
}

/// Sink writing one line per record to any [`Write`].
///
/// Every line starts with the configured prefix. Errors are written to the
/// same writer; if that fails too they are logged through `tracing`.
///
/// # Example
///
/// ```rust,ignore
/// use redactlog::WriterSink;
///
/// let sink = WriterSink::stdout().with_prefix("access: ");
/// ```
pub struct WriterSink<W> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send + 'static> WriterSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self {
            prefix: String::new(),
            writer: Mutex::new(writer),
        }
    }

    /// Set the prefix written before every line
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_line(&self, line: &str) -> SinkResult<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        writeln!(writer, "{}{}", self.prefix, line)?;
        writer.flush()?;
        Ok(())
    }
}

impl WriterSink<io::Stdout> {
    /// Sink writing to standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send + 'static> LogSink for WriterSink<W> {
    fn record(&self, line: &str) -> SinkResult<()> {
        self.write_line(line)
    }

    fn error(&self, message: &str) {
        if let Err(err) = self.write_line(message) {
            tracing::error!(error = %err, "{}", message);
        }
    }
}

impl<W> std::fmt::Debug for WriterSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterSink")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
