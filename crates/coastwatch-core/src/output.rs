//! Writing analysis records as JSON or JSON Lines.
//!
//! JSON Lines streams one record per line as results arrive. JSON collects
//! records and emits them on [`RecordWriter::finish`]: a lone record as an
//! object, anything else as an array.

use std::io::Write;
use std::str::FromStr;

use serde::Serialize;

use crate::error::Result as CoastwatchResult;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    JsonLines,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Ok(Self::JsonLines),
            other => Err(format!("Unknown output format '{other}' (expected json or jsonl)")),
        }
    }
}

/// Serializes records to an underlying writer.
pub struct RecordWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    pending: Vec<serde_json::Value>,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    /// `pretty` only affects JSON output.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            pending: Vec::new(),
            written: 0,
        }
    }

    pub fn push<T: Serialize>(&mut self, record: &T) -> CoastwatchResult<()> {
        match self.format {
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, record)?;
                writeln!(self.writer)?;
                self.writer.flush()?;
            }
            OutputFormat::Json => {
                self.pending.push(serde_json::to_value(record)?);
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Number of records accepted so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Emit buffered records and hand back the writer.
    pub fn finish(mut self) -> CoastwatchResult<W> {
        if self.format == OutputFormat::Json && !self.pending.is_empty() {
            let pending = std::mem::take(&mut self.pending);
            let document = if pending.len() == 1 {
                pending.into_iter().next().unwrap_or_default()
            } else {
                serde_json::Value::Array(pending)
            };
            if self.pretty {
                serde_json::to_writer_pretty(&mut self.writer, &document)
            } else {
                serde_json::to_writer(&mut self.writer, &document)
            }?;
            writeln!(self.writer)?;
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoastwatchError;
    use crate::types::GeoTag;
    use std::collections::BTreeMap;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_jsonl_streams_one_record_per_line() {
        let mut writer = RecordWriter::new(Vec::new(), OutputFormat::JsonLines, true);
        writer.push(&GeoTag::absent()).unwrap();
        writer.push(&GeoTag::at(1.5, -2.0)).unwrap();
        assert_eq!(writer.written(), 2);

        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"has_gps":false}"#);
    }

    #[test]
    fn test_json_single_record_is_an_object() {
        let mut writer = RecordWriter::new(Vec::new(), OutputFormat::Json, false);
        writer.push(&GeoTag::at(1.5, -2.0)).unwrap();
        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert!(output.starts_with('{'));
        assert!(output.contains("\"longitude\":-2.0"));
    }

    #[test]
    fn test_json_batch_is_an_array() {
        let mut writer = RecordWriter::new(Vec::new(), OutputFormat::Json, false);
        writer.push(&GeoTag::absent()).unwrap();
        writer.push(&GeoTag::absent()).unwrap();
        let output = String::from_utf8(writer.finish().unwrap()).unwrap();
        let parsed: Vec<GeoTag> = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_json_without_records_writes_nothing() {
        let writer = RecordWriter::new(Vec::new(), OutputFormat::Json, false);
        assert!(writer.finish().unwrap().is_empty());
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("NDJSON".parse::<OutputFormat>(), Ok(OutputFormat::JsonLines));
        assert!("csv".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_write_failure_is_an_io_error() {
        let mut writer = RecordWriter::new(ClosedPipe, OutputFormat::JsonLines, false);
        let err = writer.push(&GeoTag::absent()).unwrap_err();
        assert!(matches!(err, CoastwatchError::Io(_) | CoastwatchError::Json(_)));
        assert_eq!(writer.written(), 0);
    }

    #[test]
    fn test_unserializable_record_is_a_json_error() {
        let mut record = BTreeMap::new();
        record.insert(vec![1u8, 2], "not a string key");
        let mut writer = RecordWriter::new(Vec::new(), OutputFormat::Json, false);
        let err = writer.push(&record).unwrap_err();
        assert!(matches!(err, CoastwatchError::Json(_)), "{err}");
    }
}
