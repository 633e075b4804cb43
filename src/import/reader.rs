//! Delimited text reader: a byte stream plus a separator in, rows out.

use std::io::{self, Read};

use csv::{ReaderBuilder, StringRecord};

use crate::errors::ImportError;
use crate::sanitize::{sanitize_column_name, synthesized_headers};

/// One parsed record. Width may differ from the header; the batch writer fits it.
pub type Row = Vec<String>;

/// Header names paired 1:1 with their sanitized column identifiers.
///
/// Distinct raw names that sanitize to the same identifier are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedHeader {
    raw: Vec<String>,
    columns: Vec<String>,
}

impl ParsedHeader {
    #[must_use]
    pub fn from_raw(raw: Vec<String>) -> Self {
        let columns = raw.iter().map(|r| sanitize_column_name(r)).collect();
        Self { raw, columns }
    }

    #[must_use]
    pub fn raw(&self) -> &[String] {
        &self.raw
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Lazy, non-restartable row sequence over a delimited byte stream.
///
/// Quoting follows the usual CSV rules leniently; unquoted leading
/// whitespace is trimmed from every field; blank lines are skipped.
pub struct DelimitedReader<R: Read> {
    rdr: csv::Reader<TrimLeadingSpace<R>>,
    record: StringRecord,
    header: ParsedHeader,
    // First data row of a header-less file, read to size the header.
    pending: Option<Row>,
    finished: bool,
}

impl<R: Read> DelimitedReader<R> {
    /// Consume the header row, or synthesize `col1..colN` from the first row.
    ///
    /// # Errors
    /// Returns [`ImportError::MalformedRecord`] if the stream is empty or the
    /// first record cannot be tokenized.
    pub fn new(reader: R, delimiter: u8, has_header: bool) -> Result<Self, ImportError> {
        let rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(TrimLeadingSpace::new(reader, delimiter));
        let mut this = Self {
            rdr,
            record: StringRecord::new(),
            header: ParsedHeader::from_raw(Vec::new()),
            pending: None,
            finished: false,
        };
        let Some(first) = this.read_row()? else {
            let what = if has_header { "missing header row" } else { "no rows to import" };
            return Err(ImportError::MalformedRecord { line: 1, reason: what.to_string() });
        };
        if has_header {
            this.header = ParsedHeader::from_raw(first);
        } else {
            this.header = ParsedHeader::from_raw(synthesized_headers(first.len()));
            this.pending = Some(first);
        }
        Ok(this)
    }

    #[must_use]
    pub fn header(&self) -> &ParsedHeader {
        &self.header
    }

    /// Next row, `Ok(None)` at end of stream.
    ///
    /// # Errors
    /// Returns [`ImportError::MalformedRecord`] when a record cannot be read.
    pub fn next_row(&mut self) -> Result<Option<Row>, ImportError> {
        if let Some(row) = self.pending.take() {
            return Ok(Some(row));
        }
        self.read_row()
    }

    fn read_row(&mut self) -> Result<Option<Row>, ImportError> {
        if self.finished {
            return Ok(None);
        }
        match self.rdr.read_record(&mut self.record) {
            Ok(true) => Ok(Some(self.record.iter().map(str::to_string).collect())),
            Ok(false) => {
                self.finished = true;
                Ok(None)
            }
            Err(e) => {
                self.finished = true;
                Err(malformed(&e))
            }
        }
    }
}

impl<R: Read> Iterator for DelimitedReader<R> {
    type Item = Result<Row, ImportError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    Start,
    Unquoted,
    Quoted,
    // A quote seen inside a quoted field: either an escape or the closing quote.
    QuoteInQuoted,
}

/// Drops spaces and tabs at the start of each field before the tokenizer
/// sees them, so a quote after leading blanks still opens a quoted field and
/// whitespace inside quotes is kept. The delimiter itself is never dropped.
struct TrimLeadingSpace<R> {
    inner: R,
    delimiter: u8,
    state: FieldState,
}

impl<R: Read> TrimLeadingSpace<R> {
    fn new(inner: R, delimiter: u8) -> Self {
        Self { inner, delimiter, state: FieldState::Start }
    }

    fn keep(&mut self, b: u8) -> bool {
        let ends_field = b == self.delimiter || b == b'\n' || b == b'\r';
        self.state = match self.state {
            FieldState::Start if ends_field => FieldState::Start,
            FieldState::Start if b == b' ' || b == b'\t' => return false,
            FieldState::Start if b == b'"' => FieldState::Quoted,
            FieldState::Start => FieldState::Unquoted,
            FieldState::Quoted if b == b'"' => FieldState::QuoteInQuoted,
            FieldState::Quoted => FieldState::Quoted,
            FieldState::QuoteInQuoted if b == b'"' => FieldState::Quoted,
            FieldState::Unquoted | FieldState::QuoteInQuoted if ends_field => FieldState::Start,
            FieldState::Unquoted | FieldState::QuoteInQuoted => FieldState::Unquoted,
        };
        true
    }
}

impl<R: Read> Read for TrimLeadingSpace<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }
            let mut kept = 0;
            for i in 0..n {
                let b = buf[i];
                if self.keep(b) {
                    buf[kept] = b;
                    kept += 1;
                }
            }
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}

fn malformed(err: &csv::Error) -> ImportError {
    let line = err.position().map_or(0, csv::Position::line);
    let reason = match err.kind() {
        csv::ErrorKind::Io(io) => format!("read failed: {io}"),
        _ => err.to_string(),
    };
    ImportError::MalformedRecord { line, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(data: &[u8], delimiter: u8, has_header: bool) -> (ParsedHeader, Vec<Row>) {
        let rdr = DelimitedReader::new(data, delimiter, has_header).unwrap();
        let header = rdr.header().clone();
        let rows = rdr.collect::<Result<Vec<_>, _>>().unwrap();
        (header, rows)
    }

    #[test]
    fn header_row_is_consumed() {
        let (h, rows) = collect(b"a,b,c\n1,2,3\n4,5,6\n", b',', true);
        assert_eq!(h.raw(), ["a", "b", "c"]);
        assert_eq!(rows, vec![vec!["1", "2", "3"], vec!["4", "5", "6"]]);
    }

    #[test]
    fn headerless_first_row_is_data() {
        let (h, rows) = collect(b"1,Alice,30\n2,Bob,25\n", b',', false);
        assert_eq!(h.columns(), ["col1", "col2", "col3"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["1", "Alice", "30"]);
    }

    #[test]
    fn header_names_are_sanitized() {
        let (h, _) = collect(b"User Name,1col\nx,y\n", b',', true);
        assert_eq!(h.raw(), ["User Name", "1col"]);
        assert_eq!(h.columns(), ["User_Name", "col_1col"]);
    }

    #[test]
    fn quoted_fields_and_leading_space() {
        let (_, rows) = collect(b"a,b\n\"x, y\",  z\n\"say \"\"hi\"\"\",w\n", b',', true);
        assert_eq!(rows[0], vec!["x, y", "z"]);
        assert_eq!(rows[1], vec!["say \"hi\"", "w"]);
    }

    #[test]
    fn ragged_rows_are_passed_through() {
        let (_, rows) = collect(b"a,b,c\n1\n1,2,3,4\n", b',', true);
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[1].len(), 4);
    }

    #[test]
    fn tab_delimiter() {
        let (h, rows) = collect(b"a\tb\n1\t2\n", b'\t', true);
        assert_eq!(h.len(), 2);
        assert_eq!(rows, vec![vec!["1", "2"]]);
    }

    #[test]
    fn header_only_has_no_rows() {
        let (h, rows) = collect(b"a,b\n", b',', true);
        assert_eq!(h.len(), 2);
        assert!(rows.is_empty());
    }

    #[test]
    fn empty_stream_is_malformed() {
        let err = DelimitedReader::new(&b""[..], b',', true).err().unwrap();
        assert!(matches!(err, ImportError::MalformedRecord { line: 1, .. }));
    }

    #[test]
    fn invalid_utf8_is_malformed_and_ends_sequence() {
        let mut rdr = DelimitedReader::new(&b"a,b\n1,2\n3,\xff\n5,6\n"[..], b',', true).unwrap();
        assert!(rdr.next().unwrap().is_ok());
        let err = rdr.next().unwrap().unwrap_err();
        assert!(matches!(err, ImportError::MalformedRecord { .. }));
        assert!(rdr.next().is_none());
    }

    #[test]
    fn whitespace_inside_quotes_is_kept() {
        let (_, rows) = collect(b"a,b\n\"  x\",y\n", b',', true);
        assert_eq!(rows, vec![vec!["  x", "y"]]);
    }

    #[test]
    fn quote_after_leading_space_opens_quoted_field() {
        let (_, rows) = collect(b"a,b\n1, \"x,y\"\n", b',', true);
        assert_eq!(rows, vec![vec!["1", "x,y"]]);
    }

    #[test]
    fn tab_delimited_empty_fields_survive_trimming() {
        let (_, rows) = collect(b"a\tb\tc\n1\t\t  3\n", b'\t', true);
        assert_eq!(rows, vec![vec!["1", "", "3"]]);
    }

    #[test]
    fn escaped_quotes_keep_quoted_state() {
        let (_, rows) = collect(b"a,b\n\"he said \"\" hi\"\" \", z\n", b',', true);
        assert_eq!(rows, vec![vec!["he said \" hi\" ", "z"]]);
    }

    #[test]
    fn unterminated_quote_runs_to_end_of_stream() {
        let (_, rows) = collect(b"a,b\n1,\"open\n2,3\n", b',', true);
        assert_eq!(rows, vec![vec!["1", "open\n2,3\n"]]);
    }
}
