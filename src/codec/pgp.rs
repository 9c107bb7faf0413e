//! PGP codec: file-only, subprocess-backed per spec's design note 9
//! ("Model as a child process with stdin/stdout/stderr pipes; capture
//! stderr for diagnostics; always wait for exit status; convert broken pipe
//! into the subprocess's reported error"). Shells out to the `gpg` binary;
//! no PGP implementation lives in this crate.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{anyhow, bail, Context, Result};

use crate::options::OptionBag;

use super::FileCodec;

pub struct PgpCodec;

/// Run `gpg` with `args`, optionally piping `passphrase` to stdin via
/// `--passphrase-fd 0`. A non-zero exit status is always fatal; its stderr
/// becomes the error message, matching a broken-pipe failure being reported
/// as "the subprocess's reported error".
fn run_gpg(args: &[String], passphrase: Option<&str>) -> Result<()> {
    let mut cmd = Command::new("gpg");
    cmd.args(args);
    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = cmd.spawn().context("spawn gpg subprocess")?;

    if let Some(passphrase) = passphrase {
        let mut stdin = child.stdin.take().ok_or_else(|| anyhow!("gpg stdin unavailable"))?;
        stdin
            .write_all(passphrase.as_bytes())
            .context("write passphrase to gpg stdin")?;
    }
    drop(child.stdin.take());

    let output = child.wait_with_output().context("wait for gpg subprocess")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        bail!("gpg exited with {}: {}", output.status, stderr);
    }
    Ok(())
}

impl FileCodec for PgpCodec {
    fn decode_file(&self, src: &Path, dst: &Path, opts: &OptionBag) -> Result<()> {
        let mut args = vec![
            "--batch".to_string(),
            "--yes".to_string(),
            "--output".to_string(),
            dst.display().to_string(),
        ];
        let passphrase = opts.get_str("passphrase");
        if passphrase.is_some() {
            args.push("--passphrase-fd".to_string());
            args.push("0".to_string());
        }
        args.push("--decrypt".to_string());
        args.push(src.display().to_string());
        run_gpg(&args, passphrase)
    }

    fn encode_file(&self, src: &Path, dst: &Path, opts: &OptionBag) -> Result<()> {
        let mut args = vec!["--batch".to_string(), "--yes".to_string()];

        if let Some(algo) = opts.get_str("compress") {
            args.push("--compress-algo".to_string());
            args.push(algo.to_string());
        }
        if let Some(level) = opts.get_int("compress_level") {
            args.push("--compress-level".to_string());
            args.push(level.to_string());
        }
        if let Some(signer) = opts.get_str("signer") {
            args.push("--local-user".to_string());
            args.push(signer.to_string());
            args.push("--sign".to_string());
        }

        args.push("--output".to_string());
        args.push(dst.display().to_string());

        let passphrase = opts
            .get_str("signer_passphrase")
            .or_else(|| opts.get_str("passphrase"));

        if let Some(recipient) = opts.get_str("recipient") {
            if passphrase.is_some() {
                args.push("--passphrase-fd".to_string());
                args.push("0".to_string());
            }
            args.push("--encrypt".to_string());
            args.push("--recipient".to_string());
            args.push(recipient.to_string());
        } else {
            args.push("--passphrase-fd".to_string());
            args.push("0".to_string());
            args.push("--symmetric".to_string());
        }
        args.push(src.display().to_string());

        run_gpg(&args, passphrase)
    }
}
