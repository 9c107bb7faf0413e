//! Gzip codec, grounded on the teacher's `GzipCodec` in
//! `src/io/compression.rs` (same crate, same default compression level).

use std::io::{Read, Write};

use anyhow::Result;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::options::OptionBag;

use super::StreamingCodec;

pub struct GzipCodec;

impl StreamingCodec for GzipCodec {
    fn wrap_reader(&self, inner: Box<dyn Read + Send>, _opts: &OptionBag) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(GzDecoder::new(inner)))
    }

    fn wrap_writer(&self, inner: Box<dyn Write + Send>, _opts: &OptionBag) -> Result<Box<dyn Write + Send>> {
        Ok(Box::new(GzEncoder::new(inner, Compression::default())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Read as _;

    #[test]
    fn round_trips_bytes() -> Result<()> {
        let tmp = tempfile::NamedTempFile::new()?;
        {
            let f = File::create(tmp.path())?;
            let mut w = GzipCodec.wrap_writer(Box::new(f), &OptionBag::new())?;
            w.write_all(b"hello, gzip")?;
        }
        let f = File::open(tmp.path())?;
        let mut r = GzipCodec.wrap_reader(Box::new(f), &OptionBag::new())?;
        let mut out = String::new();
        r.read_to_string(&mut out)?;
        assert_eq!(out, "hello, gzip");
        Ok(())
    }
}
