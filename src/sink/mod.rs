//! Result sinks
//!
//! Sinks are the external consumers of extracted `(source address, match)`
//! pairs. The crawl engine drives exactly one sink through a single consumer
//! task, so implementations take `&mut self` and need no internal locking.
//! A sink's `close` is invoked exactly once after the crawl finishes, even
//! when the crawl aborts on a fatal pre-flight error.

mod console;
mod csv;

pub use console::ConsoleSink;
pub use csv::CsvFileSink;

use thiserror::Error;

/// Errors that can occur while writing to or closing a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write result: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// A write-only consumer of extracted results.
pub trait ResultSink: Send {
    /// Records one extracted match together with the address it came from.
    fn write(&mut self, source: &str, content: &str) -> SinkResult<()>;

    /// Flushes and releases the sink. Called exactly once, after the last
    /// write.
    fn close(&mut self) -> SinkResult<()>;
}
