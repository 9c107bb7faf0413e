//! Symmetric encryption codec (spec §4.1 `enc` stage).
//!
//! Unlike `zip`/`pgp`, `enc` is a streaming codec: plaintext is split into
//! fixed-size chunks, each sealed independently with AES-256-GCM under a
//! nonce derived from a random per-stream base nonce plus a frame counter
//! (a STREAM-style construction), and framed with a 4-byte big-endian
//! length prefix. The reader has no need to know the frame count ahead of
//! time — it simply reads length-prefixed frames until the inner stream
//! hits EOF.
//!
//! The symmetric key is deliberately *not* one of the stage's enumerated
//! option keys (spec §4.1 lists only `compress` for `enc`): it is supplied
//! out-of-band via [`crate::builder::Builder::with_encryption_key`], which
//! stashes it in the option bag under a reserved key the builder controls
//! (see [`KEY_OPTION`]) before invoking this codec.

use std::io::{self, Read, Write};

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use anyhow::{anyhow, Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::options::OptionBag;

use super::StreamingCodec;

/// Reserved option key the builder uses to pass the symmetric key through.
pub const KEY_OPTION: &str = "__enc_key";

const CHUNK_SIZE: usize = 64 * 1024;
const TAG_OVERHEAD: usize = 16;

pub struct EncCodec;

fn cipher_from_opts(opts: &OptionBag) -> Result<Aes256Gcm> {
    let key_bytes = opts
        .get_bytes(KEY_OPTION)
        .ok_or_else(|| anyhow!("enc stage requires an encryption key (Builder::with_encryption_key)"))?;
    if key_bytes.len() != 32 {
        return Err(anyhow!("enc stage key must be 32 bytes, got {}", key_bytes.len()));
    }
    Ok(Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key_bytes)))
}

/// Derive the per-frame nonce: base nonce with its last 4 bytes XORed by
/// the big-endian frame counter.
fn frame_nonce(base: &[u8; 12], counter: u32) -> [u8; 12] {
    let mut nonce = *base;
    let ctr = counter.to_be_bytes();
    for i in 0..4 {
        nonce[8 + i] ^= ctr[i];
    }
    nonce
}

struct FrameEncryptWriter<W: Write> {
    inner: W,
    cipher: Aes256Gcm,
    base_nonce: [u8; 12],
    counter: u32,
    buf: Vec<u8>,
    finished: bool,
}

impl<W: Write> FrameEncryptWriter<W> {
    fn new(mut inner: W, cipher: Aes256Gcm) -> Result<Self> {
        let base_nonce: [u8; 12] = Aes256Gcm::generate_nonce(&mut OsRng).into();
        inner.write_all(&base_nonce).context("write enc stream header")?;
        Ok(Self {
            inner,
            cipher,
            base_nonce,
            counter: 0,
            buf: Vec::with_capacity(CHUNK_SIZE),
            finished: false,
        })
    }

    fn seal_and_emit(&mut self, chunk: &[u8]) -> io::Result<()> {
        let nonce_bytes = frame_nonce(&self.base_nonce, self.counter);
        self.counter += 1;
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), chunk)
            .map_err(|e| io::Error::other(format!("enc: seal failed: {e}")))?;
        let len = u32::try_from(ciphertext.len()).map_err(io::Error::other)?;
        self.inner.write_all(&len.to_be_bytes())?;
        self.inner.write_all(&ciphertext)?;
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let tail = std::mem::take(&mut self.buf);
        if !tail.is_empty() {
            self.seal_and_emit(&tail)?;
        }
        self.inner.flush()
    }
}

impl<W: Write> Write for FrameEncryptWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        while self.buf.len() >= CHUNK_SIZE {
            let chunk: Vec<u8> = self.buf.drain(..CHUNK_SIZE).collect();
            self.seal_and_emit(&chunk)?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: Write> Drop for FrameEncryptWriter<W> {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

struct FrameDecryptReader<R: Read> {
    inner: R,
    cipher: Aes256Gcm,
    base_nonce: [u8; 12],
    counter: u32,
    plaintext: Vec<u8>,
    pos: usize,
    eof: bool,
}

impl<R: Read> FrameDecryptReader<R> {
    fn new(mut inner: R, cipher: Aes256Gcm) -> Result<Self> {
        let mut base_nonce = [0u8; 12];
        inner.read_exact(&mut base_nonce).context("read enc stream header")?;
        Ok(Self {
            inner,
            cipher,
            base_nonce,
            counter: 0,
            plaintext: Vec::new(),
            pos: 0,
            eof: false,
        })
    }

    fn fill(&mut self) -> io::Result<()> {
        if self.eof || self.pos < self.plaintext.len() {
            return Ok(());
        }
        let mut len_buf = [0u8; 4];
        match read_exact_or_eof(&mut self.inner, &mut len_buf)? {
            false => {
                self.eof = true;
                return Ok(());
            }
            true => {}
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        if len < TAG_OVERHEAD {
            return Err(io::Error::other("enc: corrupt frame length"));
        }
        let mut ciphertext = vec![0u8; len];
        self.inner.read_exact(&mut ciphertext)?;
        let nonce_bytes = frame_nonce(&self.base_nonce, self.counter);
        self.counter += 1;
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|e| io::Error::other(format!("enc: open failed: {e}")))?;
        self.plaintext = plaintext;
        self.pos = 0;
        Ok(())
    }
}

/// Like `read_exact`, but returns `Ok(false)` instead of erroring if the
/// stream is at EOF before any byte of `buf` is read.
fn read_exact_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "enc: truncated frame header"));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

impl<R: Read> Read for FrameDecryptReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.fill()?;
        if self.pos >= self.plaintext.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.plaintext.len() - self.pos);
        buf[..n].copy_from_slice(&self.plaintext[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl StreamingCodec for EncCodec {
    fn wrap_reader(&self, inner: Box<dyn Read + Send>, opts: &OptionBag) -> Result<Box<dyn Read + Send>> {
        let cipher = cipher_from_opts(opts)?;
        let frame_reader = FrameDecryptReader::new(inner, cipher)?;
        if opts.get_bool("compress").unwrap_or(false) {
            Ok(Box::new(GzDecoder::new(frame_reader)))
        } else {
            Ok(Box::new(frame_reader))
        }
    }

    fn wrap_writer(&self, inner: Box<dyn Write + Send>, opts: &OptionBag) -> Result<Box<dyn Write + Send>> {
        let cipher = cipher_from_opts(opts)?;
        let frame_writer = FrameEncryptWriter::new(inner, cipher)?;
        if opts.get_bool("compress").unwrap_or(false) {
            Ok(Box::new(GzEncoder::new(frame_writer, Compression::default())))
        } else {
            Ok(Box::new(frame_writer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Read as _;

    fn key_opts(compress: bool) -> OptionBag {
        OptionBag::new()
            .with(KEY_OPTION, crate::options::OptionValue::Bytes(vec![7u8; 32]))
            .with("compress", compress)
    }

    #[test]
    fn round_trips_plaintext() -> Result<()> {
        let tmp = tempfile::NamedTempFile::new()?;
        let opts = key_opts(false);
        {
            let f = File::create(tmp.path())?;
            let mut w = EncCodec.wrap_writer(Box::new(f), &opts)?;
            w.write_all(b"top secret pipeline bytes, spanning more than one chunk boundary maybe")?;
        }
        let f = File::open(tmp.path())?;
        let mut r = EncCodec.wrap_reader(Box::new(f), &opts)?;
        let mut out = String::new();
        r.read_to_string(&mut out)?;
        assert_eq!(out, "top secret pipeline bytes, spanning more than one chunk boundary maybe");
        Ok(())
    }

    #[test]
    fn round_trips_with_compress() -> Result<()> {
        let tmp = tempfile::NamedTempFile::new()?;
        let opts = key_opts(true);
        let payload = "a".repeat(10_000);
        {
            let f = File::create(tmp.path())?;
            let mut w = EncCodec.wrap_writer(Box::new(f), &opts)?;
            w.write_all(payload.as_bytes())?;
        }
        let f = File::open(tmp.path())?;
        let mut r = EncCodec.wrap_reader(Box::new(f), &opts)?;
        let mut out = String::new();
        r.read_to_string(&mut out)?;
        assert_eq!(out, payload);
        Ok(())
    }

    #[test]
    fn missing_key_is_an_error() {
        let opts = OptionBag::new();
        let buf: Vec<u8> = Vec::new();
        let err = EncCodec.wrap_reader(Box::new(buf.as_slice()), &opts);
        assert!(err.is_err());
    }
}
