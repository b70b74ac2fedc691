use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

/// A physical line beginning with this pattern opens a new record; anything
/// else continues the previous one (stack traces, wrapped messages).
static RECORD_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2} ").expect("record start regex is valid"));

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid file pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// One logical log record: a header line plus any continuation lines,
/// joined with `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// 1-based line number of the header line
    pub line_number: u64,
    pub text: String,
}

/// Reads logical records from a line-oriented log.
pub struct LineReader<R> {
    input: R,
    raw: Vec<u8>,
    physical_line: u64,
    buffered: Option<RawLine>,
    orphaned_lines: u64,
    eof_reached: bool,
}

impl LineReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, ReaderError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> LineReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            raw: Vec::new(),
            physical_line: 0,
            buffered: None,
            orphaned_lines: 0,
            eof_reached: false,
        }
    }

    /// Continuation lines seen before the first header line. They cannot be
    /// attributed to any record and are dropped.
    pub fn orphaned_lines(&self) -> u64 {
        self.orphaned_lines
    }

    /// Read the next logical record, or `None` at end of input.
    pub fn next_record(&mut self) -> Result<Option<RawLine>, ReaderError> {
        loop {
            if self.eof_reached {
                return Ok(self.buffered.take());
            }

            self.raw.clear();
            let bytes_read = self.input.read_until(b'\n', &mut self.raw)?;
            if bytes_read == 0 {
                self.eof_reached = true;
                continue;
            }
            self.physical_line += 1;

            // Invalid UTF-8 becomes U+FFFD rather than failing the file
            let decoded = String::from_utf8_lossy(&self.raw);
            let line = decoded.trim_end_matches(['\n', '\r']);

            if RECORD_START.is_match(line) {
                let next = RawLine {
                    line_number: self.physical_line,
                    text: line.to_string(),
                };
                // Emit the previous record now that we know it is complete
                if let Some(complete) = self.buffered.replace(next) {
                    return Ok(Some(complete));
                }
            } else if let Some(buffered) = self.buffered.as_mut() {
                buffered.text.push('\n');
                buffered.text.push_str(line);
            } else {
                self.orphaned_lines += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(input: &str) -> (Vec<RawLine>, u64) {
        let mut reader = LineReader::new(Cursor::new(input.as_bytes().to_vec()));
        let mut records = Vec::new();
        while let Some(record) = reader.next_record().unwrap() {
            records.push(record);
        }
        (records, reader.orphaned_lines())
    }

    #[test]
    fn test_single_line_records() {
        let (records, orphans) = read_all("2018-01-01 a\n2018-01-01 b\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].line_number, 1);
        assert_eq!(records[1].text, "2018-01-01 b");
        assert_eq!(orphans, 0);
    }

    #[test]
    fn test_continuation_lines_join_previous_record() {
        let input = "2018-01-01 ERROR boom\n\tat Foo.bar(Foo.java:1)\n\tat Baz.qux(Baz.java:2)\n2018-01-01 next\n";
        let (records, _) = read_all(input);
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].text,
            "2018-01-01 ERROR boom\n\tat Foo.bar(Foo.java:1)\n\tat Baz.qux(Baz.java:2)"
        );
        assert_eq!(records[1].line_number, 4);
    }

    #[test]
    fn test_leading_orphans_are_counted_and_dropped() {
        let (records, orphans) = read_all("garbage\nmore garbage\n2018-01-01 real\n");
        assert_eq!(records.len(), 1);
        assert_eq!(orphans, 2);
    }

    #[test]
    fn test_crlf_and_missing_trailing_newline() {
        let (records, _) = read_all("2018-01-01 a\r\n2018-01-01 b");
        assert_eq!(records[0].text, "2018-01-01 a");
        assert_eq!(records[1].text, "2018-01-01 b");
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_fatal() {
        let input = b"2018-01-01 before\n2018-01-01 user caf\xe9 logged in\n\tat caf\xe9\n2018-01-01 after\n";
        let mut reader = LineReader::new(Cursor::new(input.to_vec()));
        let mut records = Vec::new();
        while let Some(record) = reader.next_record().unwrap() {
            records.push(record);
        }

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].text, "2018-01-01 before");
        assert_eq!(records[1].text, "2018-01-01 user caf\u{FFFD} logged in\n\tat caf\u{FFFD}");
        assert_eq!(records[2].line_number, 4);
        assert_eq!(records[2].text, "2018-01-01 after");
    }

    #[test]
    fn test_empty_input() {
        let (records, orphans) = read_all("");
        assert!(records.is_empty());
        assert_eq!(orphans, 0);
    }
}
