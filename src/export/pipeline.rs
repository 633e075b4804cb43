use std::io::{self, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use tempfile::NamedTempFile;

use crate::errors::ExportError;
use crate::source::Compression;

use super::options::{ExportOptions, ExportReport, OutputTarget};
use super::sinks::{DelimitedSink, RowSink};

/// Run `sql` and write its result set to `output` (stdout when `None`).
/// Returns the number of data rows written.
///
/// # Errors
/// Returns an error if the query fails or the output cannot be written.
pub fn execute_query(
    conn: &Connection,
    sql: &str,
    output: Option<&Path>,
    delimiter: u8,
) -> Result<u64, ExportError> {
    let opts = ExportOptions { delimiter, ..ExportOptions::default() };
    let target = match output {
        Some(p) => OutputTarget::from_arg(Some(&*p.to_string_lossy())),
        None => OutputTarget::Stdout,
    };
    let report = match target {
        OutputTarget::Stdout => {
            let stdout = io::stdout();
            query_to_writer(conn, sql, stdout.lock(), &opts)?
        }
        OutputTarget::File(path) => export_file(conn, sql, &path, &opts)?,
    };
    Ok(report.rows)
}

/// Write the result of `sql` to a file atomically via a temp file + persist.
/// A `.gz` suffix compresses the output; `.bz2` is rejected.
///
/// # Errors
/// Returns an error if the destination cannot be created or the write/persist fails.
pub fn export_file(
    conn: &Connection,
    sql: &str,
    path: impl AsRef<Path>,
    opts: &ExportOptions,
) -> Result<ExportReport, ExportError> {
    let dest = path.as_ref();
    log::info!("export: path={}", dest.display());
    let compression = Compression::from_path(&dest.to_string_lossy());
    if compression == Compression::Bzip2 {
        return Err(ExportError::UnsupportedCompression(format!(
            "bzip2 output is not supported: {}",
            dest.display()
        )));
    }
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = tempfile::Builder::new().suffix(&opts.temp_suffix).tempfile_in(parent)?;
    let (report, tmp) = if compression == Compression::Gzip {
        let enc = GzEncoder::new(tmp, flate2::Compression::default());
        let (report, enc) = write_query(conn, sql, enc, opts)?;
        (report, enc.finish()?)
    } else {
        write_query(conn, sql, tmp, opts)?
    };
    persist(tmp, dest)?;
    Ok(report)
}

/// Write the result of `sql` to an arbitrary writer.
///
/// # Errors
/// Returns an error if the query fails or writing fails.
pub fn query_to_writer<W: Write>(
    conn: &Connection,
    sql: &str,
    writer: W,
    opts: &ExportOptions,
) -> Result<ExportReport, ExportError> {
    let (report, mut w) = write_query(conn, sql, writer, opts)?;
    w.flush()?;
    Ok(report)
}

fn write_query<W: Write>(
    conn: &Connection,
    sql: &str,
    writer: W,
    opts: &ExportOptions,
) -> Result<(ExportReport, W), ExportError> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let mut sink = DelimitedSink::new(writer, opts.delimiter);
    if opts.write_header && !columns.is_empty() {
        sink.write_header(&columns)?;
    }
    let mut report = ExportReport { rows: 0, columns: columns.len() };
    let mut rows = stmt.query([])?;
    let mut record: Vec<String> = Vec::with_capacity(columns.len());
    while let Some(row) = rows.next()? {
        record.clear();
        for i in 0..columns.len() {
            record.push(value_to_string(row.get_ref(i)?));
        }
        sink.write_row(&record)?;
        report.rows += 1;
    }
    log::debug!("export: wrote {} rows, {} columns", report.rows, report.columns);
    Ok((report, sink.finish()?))
}

fn value_to_string(v: ValueRef<'_>) -> String {
    match v {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
    }
}

/// Persist with a few retries; Windows can briefly hold the destination open.
fn persist(mut tmp: NamedTempFile, dest: &Path) -> Result<(), ExportError> {
    let mut last_err: Option<io::Error> = None;
    for attempt in 0..5 {
        match tmp.persist(dest) {
            Ok(_) => return Ok(()),
            Err(pe) => {
                last_err = Some(pe.error);
                tmp = pe.file;
                std::thread::sleep(std::time::Duration::from_millis(10 + attempt * 5));
            }
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::other("failed to persist export file")).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER, name TEXT, score REAL, note TEXT);
             INSERT INTO t VALUES (1, 'Alice', 9.5, NULL), (2, 'Bob, Jr.', 7.0, 'x');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn header_then_rows_with_nulls_blank() {
        let conn = sample();
        let mut out = Vec::new();
        let report =
            query_to_writer(&conn, "SELECT * FROM t ORDER BY id", &mut out, &ExportOptions::default())
                .unwrap();
        assert_eq!(report.rows, 2);
        assert_eq!(report.columns, 4);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "id,name,score,note\n1,Alice,9.5,\n2,\"Bob, Jr.\",7,x\n");
    }

    #[test]
    fn gzip_file_output() {
        use std::io::Read;
        let conn = sample();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out/result.csv.gz");
        let report =
            export_file(&conn, "SELECT id FROM t", &dest, &ExportOptions::default()).unwrap();
        assert_eq!(report.rows, 2);
        let mut s = String::new();
        flate2::read::GzDecoder::new(std::fs::File::open(&dest).unwrap())
            .read_to_string(&mut s)
            .unwrap();
        assert_eq!(s.lines().count(), 3);
    }

    #[test]
    fn bzip2_output_is_rejected() {
        let conn = sample();
        let dir = tempfile::tempdir().unwrap();
        let err = export_file(&conn, "SELECT 1", dir.path().join("o.csv.bz2"), &ExportOptions::default())
            .unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedCompression(_)));
    }

    #[test]
    fn bad_sql_is_query_error() {
        let conn = sample();
        let err = query_to_writer(&conn, "SELEC nope", Vec::new(), &ExportOptions::default())
            .unwrap_err();
        assert!(matches!(err, ExportError::Query(_)));
    }
}
