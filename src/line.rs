//! Line framer: turns a byte stream into logical lines (spec §4.3).
//!
//! The reader refills a fixed-size buffer, auto-detects which delimiter is
//! in use (tries `\r\n`, `\n\r`, `\n`, `\r` in that order, first one found
//! wins and is sticky for the rest of the stream), and yields one record per
//! call. A full buffer with no delimiter is [`IoStreamsError::DelimiterNotFound`];
//! a final partial segment at EOF with no trailing delimiter is still
//! yielded as the last record.

use std::io::{self, Read, Write};

use anyhow::Result;

use crate::error::IoStreamsError;
use crate::options::OptionBag;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;
const CANDIDATE_DELIMITERS: &[&[u8]] = &[b"\r\n", b"\n\r", b"\n", b"\r"];

pub const RECOGNIZED: &[&str] = &["delimiter", "buffer_size", "strip_non_printable"];

pub struct LineOptions {
    pub delimiter: Option<Vec<u8>>,
    pub buffer_size: usize,
    pub strip_non_printable: bool,
}

impl LineOptions {
    pub fn from_bag(opts: &OptionBag) -> Result<Self, IoStreamsError> {
        opts.check_recognized("line", RECOGNIZED)?;
        let delimiter = opts.get_str("delimiter").map(|s| s.as_bytes().to_vec());
        let buffer_size = opts
            .get_int("buffer_size")
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_BUFFER_SIZE);
        if buffer_size == 0 {
            return Err(IoStreamsError::Configuration("line buffer_size must be > 0".into()));
        }
        let strip_non_printable = opts.get_bool("strip_non_printable").unwrap_or(false);
        Ok(Self {
            delimiter,
            buffer_size,
            strip_non_printable,
        })
    }
}

fn strip_non_printable(buf: &mut Vec<u8>) {
    buf.retain(|&b| matches!(b, 0x20..=0x7e | b'\r' | b'\n' | b'\t'));
}

/// Reads delimiter-framed lines out of an inner byte stream.
pub struct LineReader<R: Read> {
    inner: R,
    buf: Vec<u8>,
    start: usize,
    delimiter: Option<Vec<u8>>,
    buffer_size: usize,
    strip: bool,
    eof: bool,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R, opts: LineOptions) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            start: 0,
            delimiter: opts.delimiter,
            buffer_size: opts.buffer_size,
            strip: opts.strip_non_printable,
            eof: false,
        }
    }

    fn find_delimiter(&self, haystack: &[u8]) -> Option<(usize, usize)> {
        if let Some(d) = &self.delimiter {
            return find_subslice(haystack, d).map(|i| (i, d.len()));
        }
        CANDIDATE_DELIMITERS
            .iter()
            .filter_map(|d| find_subslice(haystack, d).map(|i| (i, d.len())))
            .min_by_key(|(i, _)| *i)
    }

    fn refill(&mut self) -> io::Result<bool> {
        if self.eof {
            return Ok(false);
        }
        // Drop the already-consumed prefix so memory stays bounded by
        // buffer_size rather than growing with the whole stream.
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        let mut chunk = vec![0u8; self.buffer_size];
        let n = self.inner.read(&mut chunk)?;
        if n == 0 {
            self.eof = true;
            return Ok(false);
        }
        chunk.truncate(n);
        if self.strip {
            strip_non_printable(&mut chunk);
        }
        self.buf.extend_from_slice(&chunk);
        Ok(true)
    }

    /// Read the next logical line, without its delimiter. `Ok(None)` at
    /// end of stream.
    pub fn read_line(&mut self) -> Result<Option<Vec<u8>>, IoStreamsError> {
        loop {
            let window = &self.buf[self.start..];
            if let Some((idx, dlen)) = self.find_delimiter(window) {
                if self.delimiter.is_none() {
                    // Lock in autodetected delimiter for the rest of the stream.
                    self.delimiter = Some(window[idx..idx + dlen].to_vec());
                }
                let line = window[..idx].to_vec();
                self.start += idx + dlen;
                return Ok(Some(line));
            }

            let grew = self
                .refill()
                .map_err(|e| IoStreamsError::CommunicationsFailure(e.to_string()))?;
            if !grew {
                let remainder = self.buf[self.start..].to_vec();
                self.start = self.buf.len();
                if remainder.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(remainder));
            }

            if self.buf.len() - self.start > self.buffer_size {
                return Err(IoStreamsError::DelimiterNotFound);
            }
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Writes records as delimiter-terminated lines.
pub struct LineWriter<W: Write> {
    inner: W,
    delimiter: Vec<u8>,
    strip: bool,
}

impl<W: Write> LineWriter<W> {
    pub fn new(inner: W, opts: LineOptions) -> Self {
        Self {
            inner,
            delimiter: opts.delimiter.unwrap_or_else(|| b"\n".to_vec()),
            strip: opts.strip_non_printable,
        }
    }

    pub fn write_line(&mut self, record: &[u8]) -> io::Result<()> {
        if self.strip {
            let mut buf = record.to_vec();
            strip_non_printable(&mut buf);
            self.inner.write_all(&buf)?;
        } else {
            self.inner.write_all(record)?;
        }
        self.inner.write_all(&self.delimiter)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(delimiter: Option<&str>) -> LineOptions {
        let mut bag = OptionBag::new();
        if let Some(d) = delimiter {
            bag = bag.with("delimiter", d);
        }
        LineOptions::from_bag(&bag).unwrap()
    }

    #[test]
    fn splits_on_explicit_delimiter() -> Result<()> {
        let data = b"a,b|c,d|e,f".to_vec();
        let mut reader = LineReader::new(data.as_slice(), options(Some("|")));
        assert_eq!(reader.read_line()?, Some(b"a,b".to_vec()));
        assert_eq!(reader.read_line()?, Some(b"c,d".to_vec()));
        assert_eq!(reader.read_line()?, Some(b"e,f".to_vec()));
        assert_eq!(reader.read_line()?, None);
        Ok(())
    }

    #[test]
    fn autodetects_lf_delimiter() -> Result<()> {
        let data = b"one\ntwo\nthree".to_vec();
        let mut reader = LineReader::new(data.as_slice(), options(None));
        assert_eq!(reader.read_line()?, Some(b"one".to_vec()));
        assert_eq!(reader.read_line()?, Some(b"two".to_vec()));
        assert_eq!(reader.read_line()?, Some(b"three".to_vec()));
        assert_eq!(reader.read_line()?, None);
        Ok(())
    }

    #[test]
    fn autodetects_crlf_over_lf() -> Result<()> {
        let data = b"one\r\ntwo\r\n".to_vec();
        let mut reader = LineReader::new(data.as_slice(), options(None));
        assert_eq!(reader.read_line()?, Some(b"one".to_vec()));
        assert_eq!(reader.read_line()?, Some(b"two".to_vec()));
        assert_eq!(reader.read_line()?, None);
        Ok(())
    }

    #[test]
    fn final_partial_segment_is_yielded() -> Result<()> {
        let data = b"one\ntwo".to_vec();
        let mut reader = LineReader::new(data.as_slice(), options(None));
        assert_eq!(reader.read_line()?, Some(b"one".to_vec()));
        assert_eq!(reader.read_line()?, Some(b"two".to_vec()));
        assert_eq!(reader.read_line()?, None);
        Ok(())
    }

    #[test]
    fn writer_appends_delimiter() -> Result<()> {
        let mut out = Vec::new();
        {
            let mut writer = LineWriter::new(&mut out, options(Some(",")));
            writer.write_line(b"a")?;
            writer.write_line(b"b")?;
        }
        assert_eq!(out, b"a,b,");
        Ok(())
    }

    #[test]
    fn concatenation_reconstructs_input() -> Result<()> {
        let original = "alpha\nbeta\ngamma\n";
        let mut reader = LineReader::new(original.as_bytes(), options(None));
        let mut rebuilt = Vec::new();
        while let Some(line) = reader.read_line()? {
            rebuilt.extend_from_slice(&line);
            rebuilt.push(b'\n');
        }
        assert_eq!(rebuilt, original.as_bytes());
        Ok(())
    }
}
