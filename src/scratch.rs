//! Process-wide scratch directory for file-only stages.
//!
//! Some codecs (zip, pgp) can't operate against an arbitrary `Read`/`Write`;
//! the builder materializes the adjacent byte direction into a uniquely
//! named file here, runs the stage against it, and copies the result back.
//! Naming follows spec §6: `iostreams_<stage>_<uniq>`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use anyhow::{Context, Result};
use tempfile::{Builder as TempBuilder, NamedTempFile};

static ROOT: RwLock<Option<PathBuf>> = RwLock::new(None);
static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Override the scratch directory root. Like the extension registry, this
/// is process-wide state: call it before any pipeline opens a stream.
pub fn set_root(dir: impl Into<PathBuf>) {
    let mut root = ROOT.write().unwrap();
    *root = Some(dir.into());
}

fn root() -> PathBuf {
    let root = ROOT.read().unwrap();
    root.clone().unwrap_or_else(std::env::temp_dir)
}

/// Create a uniquely named temp file for `stage` under the scratch root.
///
/// The returned [`NamedTempFile`] deletes itself on drop, which is how this
/// crate guarantees temp files are removed on every exit path (success,
/// error, or panic unwind) without a manual `finally`.
pub fn temp_file(stage: &str) -> Result<NamedTempFile> {
    let dir = root();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("create scratch directory {}", dir.display()))?;
    let uniq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let prefix = format!("iostreams_{stage}_{uniq}_");
    TempBuilder::new()
        .prefix(&prefix)
        .tempfile_in(&dir)
        .with_context(|| format!("create scratch file for stage '{stage}' in {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_files_get_unique_names() -> Result<()> {
        let a = temp_file("gz")?;
        let b = temp_file("gz")?;
        assert_ne!(a.path(), b.path());
        assert!(a.path().file_name().unwrap().to_string_lossy().starts_with("iostreams_gz_"));
        Ok(())
    }
}
