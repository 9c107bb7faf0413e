//! Path abstraction: combines "where bytes live" (a [`Backend`]) with "how
//! to interpret them" (a [`crate::builder::Builder`]) (spec §4.6 [PATH]).

use std::collections::HashSet;
use std::io::{Read, Write};
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use regex::Regex;

use crate::builder::Builder;

/// A storage scheme prefix (`scheme://authority/key`). Only [`Scheme::Local`]
/// has a built-in [`Backend`]; other variants exist so callers can
/// recognize network path strings without this crate providing their
/// backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scheme {
    Local,
    Other(String),
}

fn parse_scheme(value: &str) -> Scheme {
    match value.split_once("://") {
        Some((scheme, _)) => Scheme::Other(scheme.to_string()),
        None => Scheme::Local,
    }
}

fn compressed_extension_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\.(zip|gz|gzip|xlsx|xls|xlsb|xlsm|bz2|bzip2|zst|zstd)$").unwrap())
}

fn encrypted_extension_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\.(pgp|gpg|enc)$").unwrap())
}

/// A byte-level storage backend: local disk, and (as trait boundaries only)
/// cloud/network stores.
pub trait Backend: Send + Sync {
    fn exists(&self, path: &str) -> Result<bool>;
    fn size(&self, path: &str) -> Result<u64>;
    fn delete(&self, path: &str) -> Result<()>;
    fn delete_all(&self, path: &str) -> Result<()>;
    /// Ensure the parent directory of `path` exists.
    fn mkpath(&self, path: &str) -> Result<()>;
    /// Ensure `path` itself exists as a directory.
    fn mkdir(&self, path: &str) -> Result<()>;
    /// List immediate children of `path` matching `pattern` (a glob
    /// pattern, or `None` for all children).
    fn each_child(
        &self,
        path: &str,
        pattern: Option<&str>,
        case_sensitive: bool,
        directories: bool,
        hidden: bool,
    ) -> Result<Vec<String>>;
    fn reader(&self, path: &str) -> Result<Box<dyn Read + Send>>;
    fn writer(&self, path: &str) -> Result<Box<dyn Write + Send>>;

    /// Whether a reader opened mid-write sees partial content (true for
    /// local disk; object stores typically hide partial uploads).
    fn partial_files_visible(&self) -> bool {
        true
    }

    fn realpath(&self, path: &str) -> Result<String> {
        Ok(path.to_string())
    }
}

/// An immutable path string with a lazily-constructed pipeline [`Builder`].
#[derive(Clone)]
pub struct Path {
    value: String,
    backend: Arc<dyn Backend>,
    builder: Arc<OnceLock<Builder>>,
}

impl std::fmt::Debug for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Path").field(&self.value).finish()
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl Eq for Path {}

impl PartialOrd for Path {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Path {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}
impl std::hash::Hash for Path {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl Path {
    pub fn new(value: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        Self {
            value: value.into(),
            backend,
            builder: Arc::new(OnceLock::new()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn scheme(&self) -> Scheme {
        parse_scheme(&self.value)
    }

    pub fn is_absolute(&self) -> bool {
        self.value.starts_with('/')
    }

    pub fn relative(&self) -> bool {
        !self.is_absolute()
    }

    /// Append `component`, normalizing `/` separators and skipping a
    /// leading duplicate of the final path segment if `component` already
    /// starts with it.
    pub fn join(&self, component: &str) -> Self {
        let base = self.value.trim_end_matches('/');
        let comp = component.trim_start_matches('/');
        let last_segment = base.rsplit('/').next().unwrap_or(base);
        let joined = if !last_segment.is_empty() && comp.starts_with(last_segment) && comp.len() > last_segment.len()
        {
            format!("{base}/{}", &comp[last_segment.len()..].trim_start_matches('/'))
        } else {
            format!("{base}/{comp}")
        };
        Self {
            value: joined,
            backend: self.backend.clone(),
            builder: Arc::new(OnceLock::new()),
        }
    }

    /// The parent directory: everything before the final `/`.
    pub fn directory(&self) -> Self {
        let dir = match self.value.rfind('/') {
            Some(0) => "/".to_string(),
            Some(idx) => self.value[..idx].to_string(),
            None => String::new(),
        };
        Self {
            value: dir,
            backend: self.backend.clone(),
            builder: Arc::new(OnceLock::new()),
        }
    }

    pub fn file_name(&self) -> &str {
        self.value.rsplit('/').next().unwrap_or(&self.value)
    }

    pub fn realpath(&self) -> Result<String> {
        self.backend.realpath(&self.value)
    }

    pub fn is_compressed(&self) -> bool {
        compressed_extension_re().is_match(&self.value)
    }

    pub fn is_encrypted(&self) -> bool {
        encrypted_extension_re().is_match(&self.value)
    }

    fn builder(&self) -> &Builder {
        self.builder.get_or_init(|| Builder::from_file_name(self.file_name()))
    }

    pub fn with_builder(&self, configure: impl FnOnce(&mut Builder)) -> Self {
        let mut builder = Builder::from_file_name(self.file_name());
        configure(&mut builder);
        let cell = OnceLock::new();
        let _ = cell.set(builder);
        Self {
            value: self.value.clone(),
            backend: self.backend.clone(),
            builder: Arc::new(cell),
        }
    }

    pub fn exists(&self) -> Result<bool> {
        self.backend.exists(&self.value)
    }

    pub fn size(&self) -> Result<u64> {
        self.backend.size(&self.value)
    }

    pub fn delete(&self) -> Result<()> {
        self.backend.delete(&self.value)
    }

    pub fn delete_all(&self) -> Result<()> {
        self.backend.delete_all(&self.value)
    }

    pub fn mkpath(&self) -> Result<()> {
        self.backend.mkpath(&self.value)
    }

    pub fn mkdir(&self) -> Result<()> {
        self.backend.mkdir(&self.value)
    }

    pub fn each_child(
        &self,
        pattern: Option<&str>,
        case_sensitive: bool,
        directories: bool,
        hidden: bool,
    ) -> Result<Vec<String>> {
        self.backend.each_child(&self.value, pattern, case_sensitive, directories, hidden)
    }

    /// Open a record-level reader through this path's pipeline.
    pub fn reader(&self) -> Result<crate::record::RecordReader<Box<dyn Read + Send>>> {
        let raw = self.backend.reader(&self.value)?;
        let std_path = std::path::Path::new(&self.value);
        self.builder().reader(Some(std_path), raw)
    }

    /// Open a record-level writer through this path's pipeline.
    pub fn writer(&self) -> Result<crate::builder::PipelineWriter> {
        self.builder().writer(std::path::Path::new(&self.value))
    }

    /// Open this path's backend reader directly, bypassing every codec
    /// stage. Used by [`crate::copy::copy`]'s `convert: false` mode.
    pub fn raw_reader(&self) -> Result<Box<dyn Read + Send>> {
        self.backend.reader(&self.value)
    }

    /// Open this path's backend writer directly, bypassing every codec
    /// stage.
    pub fn raw_writer(&self) -> Result<Box<dyn Write + Send>> {
        self.backend.writer(&self.value)
    }

    /// Open a byte-level reader that runs this path's codec stages
    /// (decompression/decryption) but not the encode/tabular/record
    /// layers. `options` configures the sole stage when the pipeline has
    /// exactly one (e.g. an `enc` stage's `compress` flag); it's ignored
    /// for zero or multiple stages, where per-stage configuration should
    /// go through [`Path::with_builder`] instead.
    pub fn codec_reader(&self, options: &crate::options::OptionBag) -> Result<Box<dyn Read + Send>> {
        let raw = self.backend.reader(&self.value)?;
        let std_path = std::path::Path::new(&self.value);
        let builder = self.builder_for_codec_options(options)?;
        builder.byte_reader(Some(std_path), raw)
    }

    /// Open a byte-level writer counterpart to [`Path::codec_reader`].
    pub fn codec_writer(&self, options: &crate::options::OptionBag) -> Result<crate::builder::RawPipelineWriter> {
        let std_path = std::path::Path::new(&self.value);
        let builder = self.builder_for_codec_options(options)?;
        builder.byte_writer(std_path)
    }

    fn builder_for_codec_options(&self, options: &crate::options::OptionBag) -> Result<Builder> {
        let mut builder = Builder::from_file_name(self.file_name());
        if !options.is_empty() {
            let kinds = builder.stage_kinds();
            if kinds.len() == 1 {
                builder.configure_stage(kinds[0], options.clone())?;
            }
        }
        Ok(builder)
    }

    /// Move this path's bytes to `target` without converting between
    /// pipelines (used by [`crate::copy::copy`] in `convert: false` mode).
    pub fn move_to(&self, target: &Path) -> Result<()> {
        crate::copy::copy(self, target, &HashSet::new(), &HashSet::new(), 64 * 1024, false)?;
        self.delete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct LocalTestBackend;
    impl Backend for LocalTestBackend {
        fn exists(&self, path: &str) -> Result<bool> {
            Ok(std::path::Path::new(path).exists())
        }
        fn size(&self, path: &str) -> Result<u64> {
            Ok(fs::metadata(path)?.len())
        }
        fn delete(&self, path: &str) -> Result<()> {
            Ok(fs::remove_file(path)?)
        }
        fn delete_all(&self, path: &str) -> Result<()> {
            Ok(fs::remove_dir_all(path)?)
        }
        fn mkpath(&self, path: &str) -> Result<()> {
            if let Some(parent) = std::path::Path::new(path).parent() {
                fs::create_dir_all(parent)?;
            }
            Ok(())
        }
        fn mkdir(&self, path: &str) -> Result<()> {
            Ok(fs::create_dir_all(path)?)
        }
        fn each_child(
            &self,
            _path: &str,
            _pattern: Option<&str>,
            _case_sensitive: bool,
            _directories: bool,
            _hidden: bool,
        ) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        fn reader(&self, path: &str) -> Result<Box<dyn Read + Send>> {
            Ok(Box::new(fs::File::open(path)?))
        }
        fn writer(&self, path: &str) -> Result<Box<dyn Write + Send>> {
            Ok(Box::new(fs::File::create(path)?))
        }
    }

    #[test]
    fn join_avoids_duplicating_leading_segment() {
        let backend: Arc<dyn Backend> = Arc::new(LocalTestBackend);
        let base = Path::new("/data/logs", backend);
        assert_eq!(base.join("logs/today.csv").as_str(), "/data/logs/today.csv");
        assert_eq!(base.join("archive/today.csv").as_str(), "/data/logs/archive/today.csv");
    }

    #[test]
    fn directory_strips_final_component() {
        let backend: Arc<dyn Backend> = Arc::new(LocalTestBackend);
        let path = Path::new("/data/logs/today.csv", backend);
        assert_eq!(path.directory().as_str(), "/data/logs");
    }

    #[test]
    fn is_compressed_and_encrypted_by_extension() {
        let backend: Arc<dyn Backend> = Arc::new(LocalTestBackend);
        assert!(Path::new("data.csv.gz", backend.clone()).is_compressed());
        assert!(Path::new("data.csv.pgp", backend.clone()).is_encrypted());
        assert!(!Path::new("data.csv", backend).is_compressed());
    }

    #[test]
    fn round_trips_through_pipeline() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let location = dir.path().join("rows.csv.gz").to_string_lossy().to_string();
        let backend: Arc<dyn Backend> = Arc::new(LocalTestBackend);
        // Known columns on the write side: the header line is rendered.
        let write_path = Path::new(location.clone(), backend.clone()).with_builder(|b| {
            b.tabular_options(crate::options::OptionBag::new().with("columns", vec!["id".to_string()]));
        });

        let mut writer = write_path.writer()?;
        let mut record = indexmap::IndexMap::new();
        record.insert("id".to_string(), Some("1".to_string()));
        writer.write_record(&record)?;
        writer.finish()?;

        // No columns pre-supplied on the read side: the header is inferred
        // from the line the writer just rendered.
        let read_path = Path::new(location, backend);
        let mut reader = read_path.reader()?;
        let first = reader.read_record()?.expect("one record written");
        assert_eq!(first.get("id").unwrap().as_deref(), Some("1"));
        Ok(())
    }
}
