//! Bzip2 codec, grounded on the teacher's `Bzip2Codec`
//! (`src/io/compression.rs`). Resolves spec §9's open question (bzip2-ffi
//! vs rbzip2) in favor of the `bzip2` crate, matching the teacher's choice.

use std::io::{Read, Write};

use anyhow::Result;
use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use bzip2::Compression;

use crate::options::OptionBag;

use super::StreamingCodec;

pub struct Bzip2Codec;

impl StreamingCodec for Bzip2Codec {
    fn wrap_reader(&self, inner: Box<dyn Read + Send>, _opts: &OptionBag) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(BzDecoder::new(inner)))
    }

    fn wrap_writer(&self, inner: Box<dyn Write + Send>, _opts: &OptionBag) -> Result<Box<dyn Write + Send>> {
        Ok(Box::new(BzEncoder::new(inner, Compression::default())))
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
            let mut w = Bzip2Codec.wrap_writer(Box::new(f), &OptionBag::new())?;
            w.write_all(b"hello, bzip2")?;
        }
        let f = File::open(tmp.path())?;
        let mut r = Bzip2Codec.wrap_reader(Box::new(f), &OptionBag::new())?;
        let mut out = String::new();
        r.read_to_string(&mut out)?;
        assert_eq!(out, "hello, bzip2");
        Ok(())
    }
}
