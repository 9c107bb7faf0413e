//! Copy engine: pumps bytes from one [`crate::path::Path`] to another,
//! optionally running each end's codec stages, with best-effort cleanup of a
//! partially-written target on failure (spec §4.5 [COPY]).

use std::io::{Read, Write};

use anyhow::{Context, Result};

use crate::options::OptionBag;
use crate::path::Path;

pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Copy `source` to `target`.
///
/// When `convert` is `true`, `source`'s codec stages (decompression,
/// decryption) are applied on read and `target`'s codec stages
/// (compression, encryption) are applied on write — so `abc.csv.gz` can be
/// copied to `abc.csv.pgp`. When `convert` is `false`, both ends' codec
/// stages are skipped and bytes are copied verbatim; this is what
/// [`crate::path::Path::move_to`] uses, since source and target share a
/// file name there.
///
/// `source_options`/`target_options` configure each end's codec stages
/// (e.g. an `enc` stage's `compress` flag) the same way [`crate::builder::Builder`]'s
/// per-stage options do; pass an empty bag when the inferred stages need no
/// extra configuration.
pub fn copy(
    source: &Path,
    target: &Path,
    source_options: &OptionBag,
    target_options: &OptionBag,
    buffer_size: usize,
    convert: bool,
) -> Result<()> {
    let result = if convert {
        copy_with_codecs(source, target, source_options, target_options, buffer_size)
    } else {
        copy_verbatim(source, target, buffer_size)
    };

    if result.is_err() {
        // Best-effort: a failed delete here must not mask the original error.
        let _ = target.delete();
    }
    result
}

fn pump(mut reader: impl Read, mut writer: impl Write, buffer_size: usize) -> Result<()> {
    let mut buf = vec![0u8; buffer_size.max(1)];
    loop {
        let n = reader.read(&mut buf).context("read source block")?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n]).context("write target block")?;
    }
    writer.flush().context("flush target")?;
    Ok(())
}

fn copy_verbatim(source: &Path, target: &Path, buffer_size: usize) -> Result<()> {
    let reader = source.raw_reader()?;
    let writer = target.raw_writer()?;
    pump(reader, writer, buffer_size)
}

fn copy_with_codecs(
    source: &Path,
    target: &Path,
    source_options: &OptionBag,
    target_options: &OptionBag,
    buffer_size: usize,
) -> Result<()> {
    let mut reader = source.codec_reader(source_options)?;
    let mut writer = target.codec_writer(target_options)?;
    let mut buf = vec![0u8; buffer_size.max(1)];
    loop {
        let n = reader.read(&mut buf).context("read source block")?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
    }
    writer.finish()
}
