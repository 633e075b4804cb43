//! Decompression-aware byte sources for import.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use bzip2::read::BzDecoder;
use flate2::read::MultiGzDecoder;

use crate::errors::ImportError;

const READ_BUFFER: usize = 256 * 1024;

/// Compression applied to a source, derived from its file suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        match extension(path).as_deref() {
            Some("gz") => Self::Gzip,
            Some("bz2") => Self::Bzip2,
            _ => Self::None,
        }
    }
}

/// True when `path` designates standard input.
#[must_use]
pub fn is_stdin(path: &str) -> bool {
    path.is_empty() || path == "-"
}

/// Open `path` as a buffered byte stream, decompressing by suffix.
///
/// The first buffer is filled before returning so a corrupt or truncated
/// compressed header fails here rather than mid-import.
///
/// # Errors
/// Returns [`ImportError::StreamOpen`] when the file is missing, unreadable,
/// or its compressed header cannot be decoded.
pub fn open(path: &str) -> Result<Box<dyn BufRead + Send>, ImportError> {
    let stream_err = |source: io::Error| ImportError::StreamOpen { path: path.to_string(), source };
    if is_stdin(path) {
        log::debug!("source: reading standard input");
        return Ok(Box::new(BufReader::with_capacity(READ_BUFFER, io::stdin())));
    }
    let file = File::open(path).map_err(stream_err)?;
    let compression = Compression::from_path(path);
    log::debug!("source: path={path}, compression={compression:?}");
    let mut reader: Box<dyn BufRead + Send> = match compression {
        Compression::Gzip => {
            Box::new(BufReader::with_capacity(READ_BUFFER, MultiGzDecoder::new(file)))
        }
        Compression::Bzip2 => Box::new(BufReader::with_capacity(READ_BUFFER, BzDecoder::new(file))),
        Compression::None => Box::new(BufReader::with_capacity(READ_BUFFER, file)),
    };
    reader.fill_buf().map_err(stream_err)?;
    Ok(reader)
}

/// Wrap an arbitrary reader the same way [`open`] wraps files.
pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Box<dyn BufRead + Send> {
    Box::new(BufReader::with_capacity(READ_BUFFER, reader))
}

/// Tab for `.tsv` (after stripping `.gz`/`.bz2`), comma otherwise.
#[must_use]
pub fn detect_delimiter(path: &str) -> u8 {
    match extension(strip_compression(path)).as_deref() {
        Some("tsv") => b'\t',
        _ => b',',
    }
}

/// Remove any trailing compression suffixes from `path`.
#[must_use]
pub fn strip_compression(path: &str) -> &str {
    let mut rest = path;
    while Compression::from_path(rest) != Compression::None {
        match rest.rfind('.') {
            Some(dot) => rest = &rest[..dot],
            None => break,
        }
    }
    rest
}

fn extension(path: &str) -> Option<String> {
    Path::new(path).extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn delimiter_by_extension() {
        let cases = [
            ("data.csv", b','),
            ("data.tsv", b'\t'),
            ("data.csv.gz", b','),
            ("data.tsv.gz", b'\t'),
            ("data.csv.bz2", b','),
            ("data.TSV.BZ2", b'\t'),
            ("data", b','),
            ("data.txt", b','),
        ];
        for (path, want) in cases {
            assert_eq!(detect_delimiter(path), want, "path {path}");
        }
    }

    #[test]
    fn strip_compression_suffixes() {
        assert_eq!(strip_compression("a.tsv.gz"), "a.tsv");
        assert_eq!(strip_compression("a.csv.gz.bz2"), "a.csv");
        assert_eq!(strip_compression("plain.csv"), "plain.csv");
    }

    #[test]
    fn stdin_markers() {
        assert!(is_stdin("-"));
        assert!(is_stdin(""));
        assert!(!is_stdin("data.csv"));
    }

    #[test]
    fn open_gzip_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.csv.gz");
        let mut enc = flate2::write::GzEncoder::new(
            File::create(&path).unwrap(),
            flate2::Compression::default(),
        );
        enc.write_all(b"a,b\n1,2\n").unwrap();
        enc.finish().unwrap();
        let mut s = String::new();
        open(path.to_str().unwrap()).unwrap().read_to_string(&mut s).unwrap();
        assert_eq!(s, "a,b\n1,2\n");
    }

    #[test]
    fn open_bzip2_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.tsv.bz2");
        let mut enc = bzip2::write::BzEncoder::new(
            File::create(&path).unwrap(),
            bzip2::Compression::default(),
        );
        enc.write_all(b"a\tb\n1\t2\n").unwrap();
        enc.finish().unwrap();
        let mut s = String::new();
        open(path.to_str().unwrap()).unwrap().read_to_string(&mut s).unwrap();
        assert_eq!(s, "a\tb\n1\t2\n");
    }

    #[test]
    fn corrupt_gzip_fails_at_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv.gz");
        std::fs::write(&path, b"this is not gzip").unwrap();
        let err = open(path.to_str().unwrap()).err().unwrap();
        assert!(matches!(err, ImportError::StreamOpen { .. }));
    }

    #[test]
    fn missing_file_fails_at_open() {
        let err = open("/definitely/not/here.csv").err().unwrap();
        assert!(matches!(err, ImportError::StreamOpen { .. }));
        assert!(err.to_string().contains("/definitely/not/here.csv"));
    }
}
