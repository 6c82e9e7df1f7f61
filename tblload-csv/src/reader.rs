use std::io::{BufRead, Read};
use std::path::PathBuf;

use tblload_result::{Error, Result};
use tblload_types::Schema;

/// Default upper bound on a dataset line, terminator excluded.
pub const DEFAULT_MAX_LINE_LEN: usize = 4096;

/// Split `line` on every occurrence of `delimiter`.
///
/// There is no quoting or escaping; an empty line yields one empty token.
///
/// ```
/// use tblload_csv::split_line;
///
/// assert_eq!(split_line("Springfield,200,30000", ','), ["Springfield", "200", "30000"]);
/// assert_eq!(split_line("", ','), [""]);
/// ```
pub fn split_line(line: &str, delimiter: char) -> Vec<&str> {
    line.split(delimiter).collect()
}

/// Derive a [`Schema`] from a `name:TYPE` header line.
pub fn parse_schema(header: &str, delimiter: char) -> Result<Schema> {
    Schema::parse_header(header, delimiter)
}

/// One data line, numbered from 1 with the header as line 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub number: usize,
    pub text: String,
}

/// Line-at-a-time reader over a dataset.
pub struct RowReader<R: BufRead> {
    inner: R,
    source: PathBuf,
    max_line_len: usize,
    line_no: usize,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> RowReader<R> {
    pub fn new(inner: R, max_line_len: usize) -> Self {
        Self {
            inner,
            source: PathBuf::from("<input>"),
            max_line_len,
            line_no: 0,
            buf: Vec::with_capacity(max_line_len.min(DEFAULT_MAX_LINE_LEN) + 2),
            done: false,
        }
    }

    /// Name the input in [`Error::DatasetUnreadable`] diagnostics.
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = source.into();
        self
    }

    /// Number of the last physical line read.
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    /// Read the header line. Must be called before [`RowReader::next_line`].
    pub fn read_header(&mut self) -> Result<String> {
        match self.read_physical()? {
            Some(line) if !line.trim().is_empty() => Ok(line),
            Some(_) => Err(Error::dataset_unreadable(&self.source, "header line is empty")),
            None => Err(Error::dataset_unreadable(&self.source, "missing header line")),
        }
    }

    /// Next non-blank data line, or `None` at end of input.
    ///
    /// A [`Error::LineTooLong`] leaves the reader positioned at the following
    /// line, so callers may skip it and keep reading.
    pub fn next_line(&mut self) -> Option<Result<RawLine>> {
        loop {
            match self.read_physical() {
                Ok(Some(text)) if text.is_empty() => continue,
                Ok(Some(text)) => {
                    return Some(Ok(RawLine {
                        number: self.line_no,
                        text,
                    }));
                }
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }

    fn read_physical(&mut self) -> Result<Option<String>> {
        if self.done {
            return Ok(None);
        }
        self.buf.clear();
        // Longest accepted line plus a CRLF terminator.
        let limit = self.max_line_len.saturating_add(2);
        let n = self
            .inner
            .by_ref()
            .take(limit as u64)
            .read_until(b'\n', &mut self.buf)
            .map_err(|e| Error::dataset_unreadable(&self.source, e))?;
        if n == 0 {
            self.done = true;
            return Ok(None);
        }
        self.line_no += 1;

        let terminated = self.buf.last() == Some(&b'\n');
        if !terminated && n == limit {
            self.skip_rest_of_line()?;
            return Err(Error::LineTooLong {
                line: self.line_no,
                limit: self.max_line_len,
            });
        }
        if terminated {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        if self.buf.len() > self.max_line_len {
            return Err(Error::LineTooLong {
                line: self.line_no,
                limit: self.max_line_len,
            });
        }
        match std::str::from_utf8(&self.buf) {
            Ok(s) => Ok(Some(s.to_owned())),
            Err(e) => Err(Error::dataset_unreadable(
                &self.source,
                format!("line {}: {e}", self.line_no),
            )),
        }
    }

    /// Discard input up to and including the next newline.
    fn skip_rest_of_line(&mut self) -> Result<()> {
        loop {
            let (consumed, found) = {
                let available = self
                    .inner
                    .fill_buf()
                    .map_err(|e| Error::dataset_unreadable(&self.source, e))?;
                if available.is_empty() {
                    return Ok(());
                }
                match available.iter().position(|&b| b == b'\n') {
                    Some(i) => (i + 1, true),
                    None => (available.len(), false),
                }
            };
            self.inner.consume(consumed);
            if found {
                return Ok(());
            }
        }
    }
}

impl<R: BufRead> Iterator for RowReader<R> {
    type Item = Result<RawLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line()
    }
}
