//! Record stage: zips a parsed row against the configured header into a
//! field-name→value map, and projects records back into rows on write
//! (spec §4.4 [RECORD]).

use std::io::{Read, Write};

use indexmap::IndexMap;

use crate::error::IoStreamsError;
use crate::line::LineOptions;
use crate::row::{RowReader, RowWriter};
use crate::tabular::Tabular;

pub struct RecordReader<R: Read> {
    rows: RowReader<R>,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R, line_opts: LineOptions, tabular: Tabular) -> Self {
        Self {
            rows: RowReader::new(inner, line_opts, tabular),
        }
    }

    pub fn from_row_reader(rows: RowReader<R>) -> Self {
        Self { rows }
    }

    pub fn ensure_header(&mut self) -> Result<(), IoStreamsError> {
        self.rows.ensure_header()
    }

    /// Read the next record. `Ok(None)` at end of stream.
    pub fn read_record(&mut self) -> Result<Option<IndexMap<String, Option<String>>>, IoStreamsError> {
        let Some(row) = self.rows.read_row()? else {
            return Ok(None);
        };
        Ok(Some(self.rows.tabular().record_parse(row)?))
    }
}

pub struct RecordWriter<W: Write> {
    rows: RowWriter<W>,
    header_written: bool,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(inner: W, line_opts: LineOptions, tabular: Tabular) -> Self {
        Self {
            rows: RowWriter::new(inner, line_opts, tabular),
            header_written: false,
        }
    }

    fn ensure_header_written(&mut self) -> Result<(), IoStreamsError> {
        if self.header_written {
            return Ok(());
        }
        self.header_written = true;
        if let Some(header) = &self.rows.tabular().header {
            let columns = header.columns().to_vec();
            self.rows.write_row(&columns)?;
        }
        Ok(())
    }

    pub fn write_record(&mut self, record: &IndexMap<String, Option<String>>) -> Result<(), IoStreamsError> {
        self.ensure_header_written()?;
        let row = self.rows.tabular().record_render(record)?;
        self.rows.write_row(&row)
    }

    pub fn flush(&mut self) -> Result<(), IoStreamsError> {
        self.rows.flush()
    }
}
