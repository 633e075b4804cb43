use std::io::Read;
use std::time::Instant;

use rusqlite::Connection;

use crate::errors::ImportError;
use crate::source;
use crate::store::{Store, create_table, insert_batch};

use super::events::{EventChannel, EventKind, FileEvents};
use super::options::{FileInput, ImportOptions, ImportResult};
use super::reader::{DelimitedReader, ParsedHeader, Row};

/// Where a [`FileImporter`] is in its single pass over one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    Init,
    HeaderRead,
    Streaming,
    Finalizing,
    Done,
    Failed,
}

/// Streams one [`FileInput`] into its table in bounded batches.
///
/// Parsing and writing interleave: at most one batch of rows is held in
/// memory. The first error moves the importer to [`ImportPhase::Failed`]
/// and is returned as-is; nothing is retried.
pub struct FileImporter<'a> {
    input: &'a FileInput,
    opts: &'a ImportOptions,
    events: FileEvents<'a>,
    phase: ImportPhase,
    rows_read: u64,
    rows_written: u64,
}

impl<'a> FileImporter<'a> {
    pub fn new(input: &'a FileInput, opts: &'a ImportOptions, events: &'a EventChannel) -> Self {
        Self {
            input,
            opts,
            events: events.scoped(&input.path, &input.table),
            phase: ImportPhase::Init,
            rows_read: 0,
            rows_written: 0,
        }
    }

    #[must_use]
    pub fn phase(&self) -> ImportPhase {
        self.phase
    }

    #[must_use]
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Open the input's byte source and stream it through `conn`.
    ///
    /// # Errors
    /// Returns the first [`ImportError`] raised while opening, parsing or writing.
    pub fn run(&mut self, conn: &mut Connection) -> Result<ImportResult, ImportError> {
        self.events.emit(EventKind::ParseStart);
        let started = Instant::now();
        let outcome = source::open(&self.input.path).and_then(|r| self.stream(conn, r));
        self.finish(outcome, started)
    }

    /// Stream an already-open byte source through `conn`.
    ///
    /// # Errors
    /// Returns the first [`ImportError`] raised while parsing or writing.
    pub fn run_reader<R: Read>(
        &mut self,
        conn: &mut Connection,
        reader: R,
    ) -> Result<ImportResult, ImportError> {
        self.events.emit(EventKind::ParseStart);
        let started = Instant::now();
        let outcome = self.stream(conn, reader);
        self.finish(outcome, started)
    }

    fn stream<R: Read>(&mut self, conn: &mut Connection, reader: R) -> Result<(), ImportError> {
        let input = self.input;
        let mut rows = DelimitedReader::new(reader, input.delimiter, input.has_header)?;
        self.phase = ImportPhase::HeaderRead;
        let header = rows.header().clone();
        create_table(conn, &input.table, &header)?;
        self.events.emit(EventKind::WriteStart);

        self.phase = ImportPhase::Streaming;
        let capacity = self.opts.effective_batch_size();
        let progress_every = self.opts.progress_every.filter(|n| *n > 0).map(|n| n as u64);
        let mut batch: Vec<Row> = Vec::with_capacity(capacity);
        while let Some(row) = rows.next_row()? {
            batch.push(row);
            self.rows_read += 1;
            if let Some(every) = progress_every
                && self.rows_read % every == 0
            {
                self.events.emit(EventKind::ParseProgress { rows: self.rows_read });
            }
            if batch.len() >= capacity {
                self.flush(conn, &header, &mut batch)?;
            }
        }

        self.phase = ImportPhase::Finalizing;
        self.flush(conn, &header, &mut batch)
    }

    fn flush(
        &mut self,
        conn: &mut Connection,
        header: &ParsedHeader,
        batch: &mut Vec<Row>,
    ) -> Result<(), ImportError> {
        if batch.is_empty() {
            return Ok(());
        }
        insert_batch(conn, &self.input.table, header, batch)?;
        self.rows_written += batch.len() as u64;
        batch.clear();
        log::debug!(
            target: "tabulite::import",
            "import: flushed path={}, table={}, rows={}",
            self.input.path,
            self.input.table,
            self.rows_written
        );
        self.events.emit(EventKind::WriteProgress { rows: self.rows_written });
        Ok(())
    }

    fn finish(
        &mut self,
        outcome: Result<(), ImportError>,
        started: Instant,
    ) -> Result<ImportResult, ImportError> {
        match outcome {
            Ok(()) => {
                self.phase = ImportPhase::Done;
                let rows = self.rows_written;
                let duration = started.elapsed();
                self.events.emit(EventKind::ParseComplete { rows, duration });
                self.events.emit(EventKind::WriteComplete { rows });
                log::info!(
                    target: "tabulite::import",
                    "import: done path={}, table={}, rows={}, elapsed_ms={}",
                    self.input.path,
                    self.input.table,
                    rows,
                    duration.as_millis()
                );
                Ok(ImportResult {
                    path: self.input.path.clone(),
                    table_name: self.input.table.clone(),
                    row_count: rows,
                })
            }
            Err(e) => {
                self.phase = ImportPhase::Failed;
                let error = e.to_string();
                if e.is_parse_failure() {
                    self.events.emit(EventKind::ParseError { error });
                } else {
                    self.events.emit(EventKind::WriteError { error });
                }
                log::warn!(
                    target: "tabulite::import",
                    "import: failed path={}, table={}: {e}",
                    self.input.path,
                    self.input.table
                );
                Err(e)
            }
        }
    }
}

/// Import one file through a fresh connection to `store`.
///
/// # Errors
/// Returns [`ImportError::Schema`] if no connection can be opened, otherwise
/// the first error raised by the import itself.
pub fn import_file(
    store: &Store,
    input: &FileInput,
    opts: &ImportOptions,
    events: &EventChannel,
) -> Result<ImportResult, ImportError> {
    log::info!(target: "tabulite::import", "import: path={}, table={}", input.path, input.table);
    let mut conn = store
        .connect()
        .map_err(|e| ImportError::schema(&input.table, format!("connect failed: {e}")))?;
    FileImporter::new(input, opts, events).run(&mut conn)
}

/// Import from an arbitrary reader; `input.path` is used only for labelling.
///
/// # Errors
/// Same as [`import_file`], minus source-open failures.
pub fn import_from_reader<R: Read>(
    conn: &mut Connection,
    reader: R,
    input: &FileInput,
    opts: &ImportOptions,
    events: &EventChannel,
) -> Result<ImportResult, ImportError> {
    FileImporter::new(input, opts, events).run_reader(conn, reader)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::import::ProgressEvent;

    fn recorder() -> (EventChannel, Arc<Mutex<Vec<EventKind>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let ch = EventChannel::new(move |e: &ProgressEvent| sink.lock().push(e.kind.clone()));
        (ch, seen)
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn streams_rows_and_reaches_done() {
        let mut conn = Connection::open_in_memory().unwrap();
        let input = FileInput::new("mem.csv", "people");
        let opts = ImportOptions::default();
        let ch = EventChannel::silent();
        let mut imp = FileImporter::new(&input, &opts, &ch);
        let res = imp.run_reader(&mut conn, &b"id,name\n1,a\n2,b\n3,c\n"[..]).unwrap();
        assert_eq!(res.row_count, 3);
        assert_eq!(res.table_name, "people");
        assert_eq!(imp.phase(), ImportPhase::Done);
        assert_eq!(count(&conn, "people"), 3);
    }

    #[test]
    fn batches_and_progress_are_independent() {
        let mut conn = Connection::open_in_memory().unwrap();
        let input = FileInput::new("mem.csv", "t");
        let opts = ImportOptions { batch_size: 4, progress_every: Some(3) };
        let (ch, seen) = recorder();
        let mut data = String::from("v\n");
        for i in 0..10 {
            data.push_str(&format!("{i}\n"));
        }
        let res = import_from_reader(&mut conn, data.as_bytes(), &input, &opts, &ch).unwrap();
        assert_eq!(res.row_count, 10);

        let seen = seen.lock();
        let writes: Vec<u64> = seen
            .iter()
            .filter_map(|k| match k {
                EventKind::WriteProgress { rows } => Some(*rows),
                _ => None,
            })
            .collect();
        assert_eq!(writes, vec![4, 8, 10]);
        let parses: Vec<u64> = seen
            .iter()
            .filter_map(|k| match k {
                EventKind::ParseProgress { rows } => Some(*rows),
                _ => None,
            })
            .collect();
        assert_eq!(parses, vec![3, 6, 9]);
        assert_eq!(seen.first(), Some(&EventKind::ParseStart));
        assert_eq!(seen.last(), Some(&EventKind::WriteComplete { rows: 10 }));
    }

    #[test]
    fn header_only_file_creates_empty_table() {
        let mut conn = Connection::open_in_memory().unwrap();
        let input = FileInput::new("mem.csv", "empty");
        let opts = ImportOptions::default();
        let res =
            import_from_reader(&mut conn, &b"a,b,c\n"[..], &input, &opts, &EventChannel::silent())
                .unwrap();
        assert_eq!(res.row_count, 0);
        assert_eq!(count(&conn, "empty"), 0);
    }

    #[test]
    fn malformed_record_fails_and_reports_parse_error() {
        let mut conn = Connection::open_in_memory().unwrap();
        let input = FileInput::new("mem.csv", "bad");
        let opts = ImportOptions { batch_size: 100, progress_every: None };
        let (ch, seen) = recorder();
        let mut imp = FileImporter::new(&input, &opts, &ch);
        let err = imp.run_reader(&mut conn, &b"a\nok\n\xff\n"[..]).unwrap_err();
        assert!(matches!(err, ImportError::MalformedRecord { .. }));
        assert_eq!(imp.phase(), ImportPhase::Failed);
        assert!(matches!(seen.lock().last(), Some(EventKind::ParseError { .. })));
        // The partial batch was never flushed.
        assert_eq!(count(&conn, "bad"), 0);
    }

    #[test]
    fn write_failure_reports_write_error() {
        let mut conn = Connection::open_in_memory().unwrap();
        let input = FileInput::new("mem.csv", "t");
        let opts = ImportOptions::default();
        let (ch, seen) = recorder();
        // Duplicate sanitized columns make table creation fail.
        let err = import_from_reader(&mut conn, &b"a b,a_b\n1,2\n"[..], &input, &opts, &ch)
            .unwrap_err();
        assert!(matches!(err, ImportError::Schema { .. }));
        assert!(matches!(seen.lock().last(), Some(EventKind::WriteError { .. })));
    }

    #[test]
    fn missing_file_fails_in_init() {
        let mut conn = Connection::open_in_memory().unwrap();
        let input = FileInput::new("/definitely/not/here.csv", "t");
        let opts = ImportOptions::default();
        let ch = EventChannel::silent();
        let mut imp = FileImporter::new(&input, &opts, &ch);
        let err = imp.run(&mut conn).unwrap_err();
        assert!(matches!(err, ImportError::StreamOpen { .. }));
        assert_eq!(imp.phase(), ImportPhase::Failed);
    }
}
