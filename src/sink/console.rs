//! Console sink writing CSV lines to stdout

use super::{ResultSink, SinkResult};

/// Writes `source,content` lines straight to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl ResultSink for ConsoleSink {
    fn write(&mut self, source: &str, content: &str) -> SinkResult<()> {
        println!("{},{}", source, content);
        Ok(())
    }

    fn close(&mut self) -> SinkResult<()> {
        Ok(())
    }
}
