//! CSV file sink

use super::{ResultSink, SinkResult};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Appends `source,content` lines to a CSV file through a buffered writer.
/// The buffer is flushed on close.
pub struct CsvFileSink {
    writer: BufWriter<std::fs::File>,
}

impl CsvFileSink {
    /// Opens the file at `path` for appending, creating it if missing.
    pub fn new(path: &Path) -> SinkResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl ResultSink for CsvFileSink {
    fn write(&mut self, source: &str, content: &str) -> SinkResult<()> {
        writeln!(self.writer, "{},{}", source, content)?;
        Ok(())
    }

    fn close(&mut self) -> SinkResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_are_flushed_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = CsvFileSink::new(&path).unwrap();
        sink.write("http://h/a", "one").unwrap();
        sink.write("http://h/b", "two").unwrap();
        sink.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "http://h/a,one\nhttp://h/b,two\n");
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut sink = CsvFileSink::new(&path).unwrap();
        sink.write("http://h/a", "one").unwrap();
        sink.close().unwrap();

        let mut sink = CsvFileSink::new(&path).unwrap();
        sink.write("http://h/b", "two").unwrap();
        sink.close().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
