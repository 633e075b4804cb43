use std::io::{self, BufWriter, Write};

use crate::errors::ExportError;

/// Destination for a header and a stream of text rows.
pub trait RowSink {
    fn write_header(&mut self, columns: &[String]) -> Result<(), ExportError>;
    fn write_row(&mut self, row: &[String]) -> Result<(), ExportError>;
}

/// Delimited text writer with standard quoting.
pub struct DelimitedSink<W: Write> {
    w: csv::Writer<BufWriter<W>>,
}

impl<W: Write> DelimitedSink<W> {
    pub fn new(inner: W, delimiter: u8) -> Self {
        let w = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_writer(BufWriter::new(inner));
        Self { w }
    }

    /// Flush everything and hand back the inner writer.
    ///
    /// # Errors
    /// Returns an I/O error if buffered output cannot be flushed.
    pub fn finish(self) -> Result<W, ExportError> {
        let buffered = self
            .w
            .into_inner()
            .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()))?;
        buffered.into_inner().map_err(|e| ExportError::Io(e.into_error()))
    }
}

impl<W: Write> RowSink for DelimitedSink<W> {
    fn write_header(&mut self, columns: &[String]) -> Result<(), ExportError> {
        self.w.write_record(columns)?;
        Ok(())
    }

    fn write_row(&mut self, row: &[String]) -> Result<(), ExportError> {
        self.w.write_record(row)?;
        Ok(())
    }
}
