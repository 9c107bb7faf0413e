//! Zip (and xlsx) codec: file-only, reduced to "yield a single inner byte
//! stream" per spec §1 Non-goals — neither multi-entry archives nor xlsx
//! sheet iteration are modeled. xlsx containers are zip containers, so the
//! same codec backs both [`crate::registry::StageKind::Zip`] and
//! [`crate::registry::StageKind::Xlsx`].

use std::fs::File;
use std::io::{copy, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::options::OptionBag;

use super::FileCodec;

pub struct ZipCodec;

impl FileCodec for ZipCodec {
    /// Decode: open the zip archive at `src` and copy its first entry's
    /// bytes to `dst`.
    fn decode_file(&self, src: &Path, dst: &Path, _opts: &OptionBag) -> Result<()> {
        let f = File::open(src).with_context(|| format!("open zip archive {}", src.display()))?;
        let mut archive = ZipArchive::new(f).with_context(|| format!("read zip archive {}", src.display()))?;
        if archive.is_empty() {
            bail!("zip archive {} has no entries", src.display());
        }
        let mut entry = archive.by_index(0)?;
        let mut out = File::create(dst).with_context(|| format!("create {}", dst.display()))?;
        copy(&mut entry, &mut out)?;
        Ok(())
    }

    /// Encode: wrap `src`'s bytes as the single entry of a new zip archive
    /// at `dst`.
    fn encode_file(&self, src: &Path, dst: &Path, _opts: &OptionBag) -> Result<()> {
        let mut input = File::open(src).with_context(|| format!("open {}", src.display()))?;
        let out = File::create(dst).with_context(|| format!("create {}", dst.display()))?;
        let mut zip = ZipWriter::new(out);
        let entry_name = src
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data".to_string());
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        zip.start_file(entry_name, options)?;
        copy(&mut input, &mut zip)?;
        zip.finish()?.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn round_trips_single_entry() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let src = dir.path().join("payload.txt");
        fs::write(&src, b"inner bytes")?;

        let archive = dir.path().join("payload.zip");
        ZipCodec.encode_file(&src, &archive, &OptionBag::new())?;

        let restored = dir.path().join("restored.txt");
        ZipCodec.decode_file(&archive, &restored, &OptionBag::new())?;

        assert_eq!(fs::read(&restored)?, b"inner bytes");
        Ok(())
    }
}
