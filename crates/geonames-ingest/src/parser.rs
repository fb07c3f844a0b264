//! Streaming TSV record parser
//!
//! [`RecordParser`] reads a local file line by line and yields one
//! [`Record`] per data line. Nothing is buffered beyond the current line, so
//! multi-gigabyte dumps parse in constant memory.
//!
//! Line handling:
//! - lines are read up to a maximum length; a longer line is an error
//! - the trailing `\n` (and `\r`) is dropped
//! - empty lines and lines starting with `#` produce nothing
//! - the first data line is dropped for shapes with a header row
//! - fields are split on `\t` and mapped by position into the shape
//! - a line with fewer fields than its shape needs is malformed

use crate::error::{IngestError, Result};
use crate::models::{FieldValue, Record};
use crate::schema::RecordShape;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

pub use crate::config::DEFAULT_MAX_LINE_LENGTH;

pub struct RecordParser<R> {
    reader: R,
    path: PathBuf,
    shape: &'static RecordShape,
    max_line_length: usize,
    line_number: usize,
    header_pending: bool,
    buf: Vec<u8>,
    done: bool,
}

impl RecordParser<BufReader<File>> {
    /// Open `path` for parsing as `shape`
    pub fn open(path: impl AsRef<Path>, shape: &'static RecordShape) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            IngestError::Io(std::io::Error::new(
                e.kind(),
                format!("Impossible to open file {}: {}", path.display(), e),
            ))
        })?;

        Ok(Self::from_reader(BufReader::new(file), path, shape))
    }
}

impl<R: BufRead> RecordParser<R> {
    /// Parse from any buffered reader; `path` is only used in error messages
    pub fn from_reader(reader: R, path: impl Into<PathBuf>, shape: &'static RecordShape) -> Self {
        Self {
            reader,
            path: path.into(),
            shape,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            line_number: 0,
            header_pending: shape.has_header,
            buf: Vec::new(),
            done: false,
        }
    }

    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    pub fn shape(&self) -> &'static RecordShape {
        self.shape
    }

    /// 1-based number of the line read last
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Map one line (without its terminator) into `shape`
    pub fn parse_line(
        line: &str,
        shape: &'static RecordShape,
        path: &Path,
        line_number: usize,
    ) -> Result<Record> {
        let fields: Vec<&str> = line.split('\t').collect();
        let required = shape.required_fields();

        if fields.len() < required {
            return Err(IngestError::MalformedRecord {
                path: path.to_path_buf(),
                line: line_number,
                reason: format!(
                    "{} requires {} fields, found {}",
                    shape.name,
                    required,
                    fields.len()
                ),
            });
        }

        let values = shape
            .columns
            .iter()
            .map(|column| FieldValue::parse(fields[column.position], column.kind))
            .collect();

        Ok(Record::new(shape, values))
    }

    /// Read the next raw line into `self.buf`; `false` at end of input
    ///
    /// The limit applies to the line content, so a `\r\n` terminator never
    /// pushes a line over it.
    fn read_line(&mut self) -> Result<bool> {
        self.buf.clear();

        let limit = self.max_line_length as u64 + 2;
        let read = (&mut self.reader).take(limit).read_until(b'\n', &mut self.buf)?;

        if read == 0 {
            return Ok(false);
        }

        self.line_number += 1;

        let terminated = self.buf.last() == Some(&b'\n');
        if terminated {
            self.buf.pop();
        }
        while self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }

        if (!terminated && read as u64 == limit) || self.buf.len() > self.max_line_length {
            return Err(IngestError::LineTooLong {
                path: self.path.clone(),
                line: self.line_number,
                max: self.max_line_length,
            });
        }

        Ok(true)
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            if !self.read_line()? {
                return Ok(None);
            }

            if self.buf.is_empty() || self.buf[0] == b'#' {
                continue;
            }

            if self.header_pending {
                self.header_pending = false;
                continue;
            }

            let line = std::str::from_utf8(&self.buf).map_err(|e| IngestError::MalformedRecord {
                path: self.path.clone(),
                line: self.line_number,
                reason: format!("invalid UTF-8: {e}"),
            })?;

            return Self::parse_line(line, self.shape, &self.path, self.line_number).map(Some);
        }
    }
}

impl<R: BufRead> Iterator for RecordParser<R> {
    type Item = Result<Record>;

    /// Malformed lines are yielded as errors and parsing can continue past
    /// them; I/O failures and over-long lines end the sequence.
    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                if !e.is_malformed_record() {
                    self.done = true;
                }
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schema::{ADMIN_DIVISION, ALTERNATE_NAME, FEATURE, TIMEZONE};
    use std::io::Cursor;

    fn parse_all(input: &str, shape: &'static RecordShape) -> Vec<Result<Record>> {
        RecordParser::from_reader(Cursor::new(input.to_string()), "test.txt", shape).collect()
    }

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let input = "\n#ISO\tName\n\nA.ADM1\tfirst-order division\tdesc\n";
        let records = parse_all(input, &FEATURE);

        assert_eq!(records.len(), 1);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.text("code"), Some("A.ADM1"));
        assert_eq!(record.text("description"), Some("desc"));
    }

    #[test]
    fn test_crlf_is_stripped() {
        let records = parse_all("AD.07\tAndorra la Vella\tAndorra la Vella\t3041566\r\n", &ADMIN_DIVISION);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.integer("name_id"), Some(3041566));
    }

    #[test]
    fn test_header_row_is_dropped() {
        let input = "TimeZoneId\tGMT offset\tDST offset\nEurope/Andorra\t1.0\t2.0\n";
        let records = parse_all(input, &TIMEZONE);

        assert_eq!(records.len(), 1);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.text("id"), Some("Europe/Andorra"));
        assert_eq!(record.get("dst_offset").unwrap().as_f64(), Some(2.0));
    }

    #[test]
    fn test_published_timezone_layout_loads() {
        let input = "CountryCode\tTimeZoneId\tGMT offset 1. Jan 2024\tDST offset 1. Jul 2024\trawOffset (independant of DST)\n\
                     AD\tEurope/Andorra\t1.0\t2.0\t1.0\n";
        let records = parse_all(input, &TIMEZONE);

        assert_eq!(records.len(), 1);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.text("id"), Some("AD"));
        assert!(record.get("gmt_offset").unwrap().is_null());
        assert_eq!(record.get("dst_offset").unwrap().as_f64(), Some(1.0));
    }

    #[test]
    fn test_alternate_name_skips_position_zero() {
        let line = "ignored\t1\t3041565\ten\tAndorra la Vella\t1\t\t0\t\n";
        let records = parse_all(line, &ALTERNATE_NAME);
        let record = records[0].as_ref().unwrap();

        assert_eq!(record.integer("id"), Some(1));
        assert_eq!(record.integer("name_id"), Some(3041565));
        assert_eq!(record.get("is_preferred").unwrap().as_bool(), Some(true));
        assert!(record.get("is_short").unwrap().is_null());
        assert_eq!(record.get("is_colloquial").unwrap().as_bool(), Some(false));
    }

    #[test]
    fn test_published_alternate_name_layout_loads() {
        let line = "1284820\t3041565\ten\tAndorra la Vella\t1\t\t\t\t\t\n";
        let records = parse_all(line, &ALTERNATE_NAME);
        let record = records[0].as_ref().unwrap();

        assert_eq!(record.integer("id"), Some(3041565));
        assert!(record.get("name_id").unwrap().is_null());
        assert_eq!(record.text("iso_language"), Some("Andorra la Vella"));
        assert!(record.get("is_preferred").unwrap().is_null());
    }

    #[test]
    fn test_malformed_line_does_not_end_the_stream() {
        let input = "A.ADM1\tonly two\nA.ADM2\tsecond-order\tdesc\n";
        let records = parse_all(input, &FEATURE);

        assert_eq!(records.len(), 2);
        match &records[0] {
            Err(IngestError::MalformedRecord { line, .. }) => assert_eq!(*line, 1),
            other => panic!("expected malformed record, got {other:?}"),
        }
        assert!(records[1].is_ok());
    }

    #[test]
    fn test_type_mismatch_becomes_null() {
        let records = parse_all("AD.07\tAndorra\tAndorra\tnot-a-number\n", &ADMIN_DIVISION);
        let record = records[0].as_ref().unwrap();

        assert_eq!(record.text("code"), Some("AD.07"));
        assert!(record.get("name_id").unwrap().is_null());
    }

    #[test]
    fn test_line_too_long_ends_the_stream() {
        let long = "x".repeat(64);
        let input = format!("{long}\tb\tc\nA\tB\tC\n");
        let records: Vec<_> =
            RecordParser::from_reader(Cursor::new(input), "test.txt", &FEATURE)
                .with_max_line_length(16)
                .collect();

        assert_eq!(records.len(), 1);
        assert!(matches!(records[0], Err(IngestError::LineTooLong { line: 1, max: 16, .. })));
    }

    #[test]
    fn test_line_at_exact_limit_is_accepted() {
        let input = "abc\tdef\tghi\n";
        let records: Vec<_> =
            RecordParser::from_reader(Cursor::new(input), "test.txt", &FEATURE)
                .with_max_line_length(11)
                .collect();

        assert_eq!(records.len(), 1);
        assert!(records[0].is_ok());
    }

    #[test]
    fn test_crlf_line_at_exact_limit_is_accepted() {
        let input = "abc\tdef\tghi\r\nA\tB\tC\r\n";
        let records: Vec<_> =
            RecordParser::from_reader(Cursor::new(input), "test.txt", &FEATURE)
                .with_max_line_length(11)
                .collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].as_ref().unwrap().text("description"), Some("ghi"));
        assert!(records[1].is_ok());
    }

    #[test]
    fn test_crlf_line_over_limit_is_rejected() {
        let input = "abc\tdef\tghij\r\n";
        let records: Vec<_> =
            RecordParser::from_reader(Cursor::new(input), "test.txt", &FEATURE)
                .with_max_line_length(11)
                .collect();

        assert_eq!(records.len(), 1);
        assert!(matches!(records[0], Err(IngestError::LineTooLong { line: 1, .. })));
    }

    #[test]
    fn test_last_line_without_newline() {
        let records = parse_all("A\tB\tC", &FEATURE);
        assert_eq!(records.len(), 1);
        assert!(records[0].is_ok());
    }
}
