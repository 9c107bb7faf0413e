//! Zstd codec, grounded on the teacher's `ZstdCodec`
//! (`src/io/compression.rs`). The teacher treats zstd as a first-class
//! built-in compression codec; this crate keeps it for the same reason
//! (spec §6: "the teacher's own zst|zstd codec is kept ... registration is
//! explicitly open").

use std::io::{Read, Write};

use anyhow::Result;

use crate::options::OptionBag;

use super::StreamingCodec;

pub struct ZstdCodec;

impl StreamingCodec for ZstdCodec {
    fn wrap_reader(&self, inner: Box<dyn Read + Send>, _opts: &OptionBag) -> Result<Box<dyn Read + Send>> {
        let decoder = zstd::stream::read::Decoder::new(inner)?;
        Ok(Box::new(decoder))
    }

    fn wrap_writer(&self, inner: Box<dyn Write + Send>, _opts: &OptionBag) -> Result<Box<dyn Write + Send>> {
        let encoder = zstd::stream::write::Encoder::new(inner, 3)?;
        Ok(Box::new(encoder.auto_finish()))
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
            let mut w = ZstdCodec.wrap_writer(Box::new(f), &OptionBag::new())?;
            w.write_all(b"hello, zstd")?;
        }
        let f = File::open(tmp.path())?;
        let mut r = ZstdCodec.wrap_reader(Box::new(f), &OptionBag::new())?;
        let mut out = String::new();
        r.read_to_string(&mut out)?;
        assert_eq!(out, "hello, zstd");
        Ok(())
    }
}
