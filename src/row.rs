//! Row stage: lines to field arrays, riding on top of the line framer and
//! the tabular format a stage was configured with (spec §4.4 [ROW]).

use std::io::{Read, Write};

use anyhow::Result;

use crate::error::IoStreamsError;
use crate::line::{LineOptions, LineReader, LineWriter};
use crate::tabular::Tabular;

pub struct RowReader<R: Read> {
    lines: LineReader<R>,
    tabular: Tabular,
    line_number: usize,
}

impl<R: Read> RowReader<R> {
    pub fn new(inner: R, line_opts: LineOptions, tabular: Tabular) -> Self {
        Self {
            lines: LineReader::new(inner, line_opts),
            tabular,
            line_number: 0,
        }
    }

    pub fn tabular(&self) -> &Tabular {
        &self.tabular
    }

    pub fn tabular_mut(&mut self) -> &mut Tabular {
        &mut self.tabular
    }

    /// If `columns` were supplied as an option, that header is already
    /// known and no line is consumed from the input. Otherwise the header
    /// is inferred by consuming the stream's first line. A no-op for
    /// formats that don't frame a literal header line (`json`, `array`,
    /// `hash`, `fixed`).
    pub fn ensure_header(&mut self) -> Result<(), IoStreamsError> {
        if !matches!(self.tabular.format, crate::tabular::TabularFormat::Csv | crate::tabular::TabularFormat::Psv) {
            return Ok(());
        }
        if self.tabular.header.is_some() {
            return Ok(());
        }
        let Some(raw) = self.lines.read_line()? else {
            return Ok(());
        };
        self.line_number += 1;
        let text = String::from_utf8_lossy(&raw).into_owned();
        self.tabular.parse_header(&text)
    }

    /// Read and parse the next row. `Ok(None)` at end of stream.
    pub fn read_row(&mut self) -> Result<Option<Vec<String>>, IoStreamsError> {
        let Some(raw) = self.lines.read_line()? else {
            return Ok(None);
        };
        self.line_number += 1;
        let text = String::from_utf8_lossy(&raw).into_owned();
        Ok(Some(self.tabular.parse(&text, self.line_number)?))
    }
}

pub struct RowWriter<W: Write> {
    lines: LineWriter<W>,
    tabular: Tabular,
}

impl<W: Write> RowWriter<W> {
    pub fn new(inner: W, line_opts: LineOptions, tabular: Tabular) -> Self {
        Self {
            lines: LineWriter::new(inner, line_opts),
            tabular,
        }
    }

    pub fn tabular(&self) -> &Tabular {
        &self.tabular
    }

    pub fn write_row(&mut self, row: &[String]) -> Result<(), IoStreamsError> {
        let rendered = self.tabular.render(row)?;
        self.lines
            .write_line(rendered.as_bytes())
            .map_err(|e| IoStreamsError::CommunicationsFailure(e.to_string()))
    }

    pub fn flush(&mut self) -> Result<(), IoStreamsError> {
        self.lines.flush().map_err(|e| IoStreamsError::CommunicationsFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::OptionBag;

    #[test]
    fn reads_rows_in_order() -> Result<(), IoStreamsError> {
        let data = b"a,b\nc,d\n".to_vec();
        let tabular = Tabular::from_bag(&OptionBag::new())?;
        let mut reader = RowReader::new(data.as_slice(), LineOptions::from_bag(&OptionBag::new())?, tabular);
        assert_eq!(reader.read_row()?, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(reader.read_row()?, Some(vec!["c".to_string(), "d".to_string()]));
        assert_eq!(reader.read_row()?, None);
        Ok(())
    }

    #[test]
    fn writes_rows_with_line_delimiter() -> Result<(), IoStreamsError> {
        let mut out = Vec::new();
        {
            let tabular = Tabular::from_bag(&OptionBag::new())?;
            let mut writer = RowWriter::new(&mut out, LineOptions::from_bag(&OptionBag::new())?, tabular);
            writer.write_row(&["a".to_string(), "b".to_string()])?;
            writer.flush()?;
        }
        assert_eq!(out, b"a,b\n");
        Ok(())
    }
}
