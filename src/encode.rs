//! Encode stage: character-encoding conversion and non-printable cleansing
//! (spec §4.2). Wraps a reader/writer the same shape as a [`crate::codec`]
//! stage, but operates on decoded text blocks rather than opaque bytes.

use std::io::{self, Read, Write};

use anyhow::Result;
use encoding_rs::Encoding;

use crate::error::IoStreamsError;
use crate::options::OptionBag;

/// How non-printable bytes are handled after charset conversion.
#[derive(Clone)]
pub enum Cleaner {
    /// Pass decoded text through unchanged.
    None,
    /// Drop any byte outside printable ASCII plus CR/LF.
    Printable,
    /// Replace non-printable bytes with a fixed string (default empty).
    ReplaceNonPrintable(String),
    /// Caller-supplied transform, given the raw block and the charset name.
    Custom(std::sync::Arc<dyn Fn(&[u8], &str) -> Vec<u8> + Send + Sync>),
}

impl std::fmt::Debug for Cleaner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "Cleaner::None"),
            Self::Printable => write!(f, "Cleaner::Printable"),
            Self::ReplaceNonPrintable(s) => write!(f, "Cleaner::ReplaceNonPrintable({s:?})"),
            Self::Custom(_) => write!(f, "Cleaner::Custom(..)"),
        }
    }
}

fn is_printable(b: u8) -> bool {
    matches!(b, 0x20..=0x7e | b'\r' | b'\n' | b'\t')
}

impl Cleaner {
    fn apply(&self, bytes: &[u8], charset: &str) -> Vec<u8> {
        match self {
            Self::None => bytes.to_vec(),
            Self::Printable => bytes.iter().copied().filter(|b| is_printable(*b)).collect(),
            Self::ReplaceNonPrintable(replacement) => {
                let mut out = Vec::with_capacity(bytes.len());
                for &b in bytes {
                    if is_printable(b) {
                        out.push(b);
                    } else {
                        out.extend_from_slice(replacement.as_bytes());
                    }
                }
                out
            }
            Self::Custom(f) => f(bytes, charset),
        }
    }
}

/// Parsed encode-stage options (spec §4.1: `encoding`, `cleaner`, `replace`).
pub struct EncodeOptions {
    pub encoding: &'static Encoding,
    pub cleaner: Cleaner,
}

pub const RECOGNIZED: &[&str] = &["encoding", "cleaner", "replace"];

impl EncodeOptions {
    pub fn from_bag(opts: &OptionBag) -> Result<Self, IoStreamsError> {
        opts.check_recognized("encode", RECOGNIZED)?;
        let encoding_name = opts.get_str("encoding").unwrap_or("utf-8");
        let encoding = Encoding::for_label(encoding_name.as_bytes())
            .ok_or_else(|| IoStreamsError::EncodingError(format!("unknown encoding '{encoding_name}'")))?;
        let cleaner = match opts.get_str("cleaner").unwrap_or("none") {
            "none" => Cleaner::None,
            "printable" => Cleaner::Printable,
            "replace_non_printable" => {
                Cleaner::ReplaceNonPrintable(opts.get_str("replace").unwrap_or("").to_string())
            }
            other => {
                return Err(IoStreamsError::Configuration(format!(
                    "unknown cleaner '{other}' for encode stage"
                )))
            }
        };
        Ok(Self { encoding, cleaner })
    }
}

/// Decodes bytes from a source encoding into UTF-8, applying cleansing,
/// as they're read.
pub struct EncodeReader<R: Read> {
    inner: R,
    opts: EncodeOptions,
    raw: Vec<u8>,
    out: Vec<u8>,
    pos: usize,
    eof: bool,
}

impl<R: Read> EncodeReader<R> {
    pub fn new(inner: R, opts: EncodeOptions) -> Self {
        Self {
            inner,
            opts,
            raw: vec![0u8; 64 * 1024],
            out: Vec::new(),
            pos: 0,
            eof: false,
        }
    }

    fn refill(&mut self) -> io::Result<()> {
        if self.eof || self.pos < self.out.len() {
            return Ok(());
        }
        let n = self.inner.read(&mut self.raw)?;
        if n == 0 {
            self.eof = true;
            self.out.clear();
            self.pos = 0;
            return Ok(());
        }
        let (cow, _, had_errors) = self.opts.encoding.decode(&self.raw[..n]);
        if had_errors && std::ptr::eq(self.opts.encoding, encoding_rs::UTF_8) {
            return Err(io::Error::other("invalid byte sequence for declared encoding"));
        }
        let decoded = cow.into_owned();
        self.out = self.opts.cleaner.apply(decoded.as_bytes(), self.opts.encoding.name());
        self.pos = 0;
        Ok(())
    }
}

impl<R: Read> Read for EncodeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.refill()?;
        if self.pos >= self.out.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.out.len() - self.pos);
        buf[..n].copy_from_slice(&self.out[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Encodes UTF-8 text into the target encoding, applying cleansing, as
/// it's written.
pub struct EncodeWriter<W: Write> {
    inner: W,
    opts: EncodeOptions,
}

impl<W: Write> EncodeWriter<W> {
    pub fn new(inner: W, opts: EncodeOptions) -> Self {
        Self { inner, opts }
    }
}

impl<W: Write> Write for EncodeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let cleansed = self.opts.cleaner.apply(buf, self.opts.encoding.name());
        let text = String::from_utf8_lossy(&cleansed);
        let (encoded, _, had_errors) = self.opts.encoding.encode(&text);
        if had_errors {
            return Err(io::Error::other("value not representable in target encoding"));
        }
        self.inner.write_all(&encoded)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read as _;

    #[test]
    fn round_trips_utf8() -> Result<()> {
        let opts = EncodeOptions::from_bag(&OptionBag::new())?;
        let data = b"hello, world\n".to_vec();
        let mut reader = EncodeReader::new(data.as_slice(), opts);
        let mut out = String::new();
        reader.read_to_string(&mut out)?;
        assert_eq!(out, "hello, world\n");
        Ok(())
    }

    #[test]
    fn printable_cleaner_drops_control_bytes() -> Result<()> {
        let opts = EncodeOptions::from_bag(&OptionBag::new().with("cleaner", "printable"))?;
        let data = vec![b'a', 0x01, b'b', b'\n'];
        let mut reader = EncodeReader::new(data.as_slice(), opts);
        let mut out = String::new();
        reader.read_to_string(&mut out)?;
        assert_eq!(out, "ab\n");
        Ok(())
    }

    #[test]
    fn replace_non_printable_substitutes() -> Result<()> {
        let opts = EncodeOptions::from_bag(
            &OptionBag::new().with("cleaner", "replace_non_printable").with("replace", "?"),
        )?;
        let data = vec![b'a', 0x01, b'b'];
        let mut reader = EncodeReader::new(data.as_slice(), opts);
        let mut out = String::new();
        reader.read_to_string(&mut out)?;
        assert_eq!(out, "a?b");
        Ok(())
    }

    #[test]
    fn unknown_cleaner_is_rejected() {
        let err = EncodeOptions::from_bag(&OptionBag::new().with("cleaner", "bogus"));
        assert!(matches!(err, Err(IoStreamsError::Configuration(_))));
    }
}
