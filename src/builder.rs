//! Pipeline builder: assembles the stage stack from path extensions and
//! explicit options, validates every stage's options up front, and composes
//! the reader/writer chain (spec §4.1 [BUILDER]).
//!
//! Mirrors the teacher's boxed-trait-object composition style
//! (`auto_detect_reader` in `src/io/compression.rs`) rather than generic
//! monomorphization — an open-ended, data-driven stage list can't be
//! expressed as nested generics without knowing its shape at compile time.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

use crate::codec::{self, enc as enc_codec};
use crate::encode::{EncodeOptions, EncodeReader, EncodeWriter};
use crate::error::IoStreamsError;
use crate::line::LineOptions;
use crate::options::OptionBag;
use crate::record::{RecordReader, RecordWriter};
use crate::registry::{self, StageKind};
use crate::row::RowReader;
use crate::tabular::Tabular;

#[derive(Clone, Copy, PartialEq, Eq)]
enum StageOrigin {
    Inferred,
    Explicit,
}

struct PipelineStage {
    kind: StageKind,
    options: OptionBag,
    origin: StageOrigin,
}

/// Assembles a codec/encode/line/tabular stack and opens a reader or
/// writer against it.
pub struct Builder {
    stages: Vec<PipelineStage>,
    encode_options: OptionBag,
    line_options: OptionBag,
    tabular_options: OptionBag,
    encryption_key: Option<[u8; 32]>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            encode_options: OptionBag::new(),
            line_options: OptionBag::new(),
            tabular_options: OptionBag::new(),
            encryption_key: None,
        }
    }

    /// Parse the trailing extensions of `file_name` into an ordered,
    /// outer-to-inner stage list via the process-wide registry.
    pub fn from_file_name(file_name: &str) -> Self {
        let mut builder = Self::new();
        for kind in registry::infer_stages(file_name) {
            builder.stages.push(PipelineStage {
                kind,
                options: OptionBag::new(),
                origin: StageOrigin::Inferred,
            });
        }
        builder
    }

    /// Attach options to a stage already present from extension inference.
    pub fn configure_stage(&mut self, kind: StageKind, options: OptionBag) -> Result<&mut Self, IoStreamsError> {
        let stage = self
            .stages
            .iter_mut()
            .find(|s| s.kind == kind)
            .ok_or_else(|| IoStreamsError::Configuration(format!("no '{}' stage in this pipeline", kind.name())))?;
        stage.options = options;
        Ok(self)
    }

    /// Explicitly add a stage not implied by the file name. Conflicts with
    /// a stage already present (inferred or explicit) of the same kind.
    pub fn add_stage(&mut self, kind: StageKind, options: OptionBag) -> Result<&mut Self, IoStreamsError> {
        if self.stages.iter().any(|s| s.kind == kind) {
            return Err(IoStreamsError::Configuration(format!(
                "stage '{}' already present in this pipeline",
                kind.name()
            )));
        }
        self.stages.push(PipelineStage {
            kind,
            options,
            origin: StageOrigin::Explicit,
        });
        Ok(self)
    }

    /// The stage kinds currently in this builder's pipeline, outer to
    /// inner. Used by the copy engine to decide whether a single
    /// undifferentiated options bag can be applied unambiguously.
    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind).collect()
    }

    pub fn encode_options(&mut self, options: OptionBag) -> &mut Self {
        self.encode_options = options;
        self
    }

    pub fn line_options(&mut self, options: OptionBag) -> &mut Self {
        self.line_options = options;
        self
    }

    pub fn tabular_options(&mut self, options: OptionBag) -> &mut Self {
        self.tabular_options = options;
        self
    }

    /// Supply the symmetric key used by an `enc` stage. Not itself a
    /// user-facing option key on that stage (spec §4.1 lists only
    /// `compress` there); stashed in a reserved option slot at assembly
    /// time instead.
    pub fn with_encryption_key(&mut self, key: [u8; 32]) -> &mut Self {
        self.encryption_key = Some(key);
        self
    }

    fn enc_opts_with_key(&self, stage: &PipelineStage) -> OptionBag {
        let mut opts = stage.options.clone();
        if stage.kind == StageKind::Enc {
            if let Some(key) = self.encryption_key {
                opts = opts.with(enc_codec::KEY_OPTION, crate::options::OptionValue::Bytes(key.to_vec()));
            }
        }
        opts
    }

    /// Validate every stage's options against its closed, enumerated set.
    /// Called automatically by `reader`/`writer`; exposed so callers can
    /// fail fast before touching any I/O.
    pub fn validate(&self) -> Result<(), IoStreamsError> {
        for stage in &self.stages {
            stage.options.check_recognized(stage.kind.name(), codec::recognized_options(stage.kind))?;
        }
        self.encode_options.check_recognized("encode", crate::encode::RECOGNIZED)?;
        self.line_options.check_recognized("line", crate::line::RECOGNIZED)?;
        self.tabular_options.check_recognized("tabular", crate::tabular::RECOGNIZED)?;
        Ok(())
    }

    /// Open a record-level reader, given the raw source. `source_path`, if
    /// given, lets file-only stages operate directly on the real file
    /// instead of a materialized copy when they're the outermost stage.
    pub fn reader(
        &self,
        source_path: Option<&Path>,
        raw: Box<dyn Read + Send>,
    ) -> Result<RecordReader<Box<dyn Read + Send>>> {
        self.validate()?;
        let byte_reader = self.open_byte_reader(source_path, raw)?;
        let line_opts = LineOptions::from_bag(&self.line_options)?;
        let encode_opts = EncodeOptions::from_bag(&self.encode_options)?;
        let encoded: Box<dyn Read + Send> = Box::new(EncodeReader::new(byte_reader, encode_opts));
        let tabular = Tabular::from_bag(&self.tabular_options)?;
        let row_reader = RowReader::new(encoded, line_opts, tabular);
        let mut record_reader = RecordReader::from_row_reader(row_reader);
        record_reader.ensure_header()?;
        Ok(record_reader)
    }

    /// Open a record-level writer against `dest_path`. Unlike `reader`,
    /// file-only codec stages on the write side must always land in a real
    /// destination file, so a path is required rather than optional.
    ///
    /// Writes the record/row/line/encode layers straight into a scratch
    /// file (or, if the pipeline has no stages, directly into `dest_path`);
    /// [`PipelineWriter::finish`] then walks the stage list innermost to
    /// outermost, applying each one (streaming stages by piping the
    /// previous stage's bytes through `wrap_writer`, file-only stages via
    /// `encode_file`) to reach the final destination. This keeps the two
    /// stage shapes uniform even when they alternate, at the cost of one
    /// extra temp-file hop for the plaintext itself.
    pub fn writer(&self, dest_path: &Path) -> Result<PipelineWriter> {
        self.validate()?;
        let line_opts = LineOptions::from_bag(&self.line_options)?;
        let encode_opts = EncodeOptions::from_bag(&self.encode_options)?;
        let tabular = Tabular::from_bag(&self.tabular_options)?;

        let (head_writer, head_temp): (Box<dyn Write + Send>, Option<NamedTempFile>) = if self.stages.is_empty() {
            let file = File::create(dest_path).with_context(|| format!("create {}", dest_path.display()))?;
            (Box::new(file), None)
        } else {
            let temp = crate::scratch::temp_file("builder")?;
            let file = temp.reopen().context("reopen scratch file for writing")?;
            (Box::new(file), Some(temp))
        };

        // Innermost stage applies first; mirror the stage list (outer-first)
        // by walking it in reverse.
        let pending_stages: Vec<(StageKind, OptionBag)> =
            self.stages.iter().rev().map(|s| (s.kind, self.enc_opts_with_key(s))).collect();

        let encoded: Box<dyn Write + Send> = Box::new(EncodeWriter::new(head_writer, encode_opts));
        let record_writer = RecordWriter::new(encoded, line_opts, tabular);

        Ok(PipelineWriter {
            record_writer: Some(record_writer),
            head_temp,
            pending_stages,
            destination: dest_path.to_path_buf(),
            finished: false,
        })
    }

    /// Open just the codec-stage chain, skipping the encode/tabular/record
    /// layers. Used by the copy engine, which pumps raw bytes rather than
    /// records.
    pub fn byte_reader(&self, source_path: Option<&Path>, raw: Box<dyn Read + Send>) -> Result<Box<dyn Read + Send>> {
        self.validate()?;
        self.open_byte_reader(source_path, raw)
    }

    /// Open a raw byte-level writer that applies this builder's codec
    /// stages (but not encode/tabular/record) on `finish`.
    pub fn byte_writer(&self, dest_path: &Path) -> Result<RawPipelineWriter> {
        self.validate()?;
        let (head_writer, head_temp): (Box<dyn Write + Send>, Option<NamedTempFile>) = if self.stages.is_empty() {
            let file = File::create(dest_path).with_context(|| format!("create {}", dest_path.display()))?;
            (Box::new(file), None)
        } else {
            let temp = crate::scratch::temp_file("copy")?;
            let file = temp.reopen().context("reopen scratch file for writing")?;
            (Box::new(file), Some(temp))
        };
        let pending_stages: Vec<(StageKind, OptionBag)> =
            self.stages.iter().rev().map(|s| (s.kind, self.enc_opts_with_key(s))).collect();
        Ok(RawPipelineWriter {
            writer: Some(head_writer),
            head_temp,
            pending_stages,
            destination: dest_path.to_path_buf(),
            finished: false,
        })
    }

    fn open_byte_reader(
        &self,
        source_path: Option<&Path>,
        raw: Box<dyn Read + Send>,
    ) -> Result<Box<dyn Read + Send>> {
        enum State {
            Streaming(Box<dyn Read + Send>),
            File(PathBuf, Option<NamedTempFile>),
        }

        let mut state = match source_path {
            Some(p) if self.stages.first().is_some_and(|s| s.kind.is_file_only()) => {
                State::File(p.to_path_buf(), None)
            }
            _ => State::Streaming(raw),
        };

        for stage in &self.stages {
            let opts = self.enc_opts_with_key(stage);
            state = match (state, stage.kind.is_file_only()) {
                (State::Streaming(reader), false) => State::Streaming(codec::wrap_reader(stage.kind, reader, &opts)?),
                (State::File(path, guard), false) => {
                    let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
                    let next = State::Streaming(codec::wrap_reader(stage.kind, Box::new(file), &opts)?);
                    drop(guard);
                    next
                }
                (State::Streaming(reader), true) => {
                    let (temp, path) = materialize(reader, stage.kind.name())?;
                    let out = crate::scratch::temp_file(stage.kind.name())?;
                    let out_path = out.path().to_path_buf();
                    codec::decode_file(stage.kind, &path, &out_path, &opts)?;
                    drop(temp);
                    State::File(out_path, Some(out))
                }
                (State::File(path, guard), true) => {
                    let out = crate::scratch::temp_file(stage.kind.name())?;
                    let out_path = out.path().to_path_buf();
                    codec::decode_file(stage.kind, &path, &out_path, &opts)?;
                    drop(guard);
                    State::File(out_path, Some(out))
                }
            };
        }

        match state {
            State::Streaming(reader) => Ok(reader),
            State::File(path, guard) => {
                let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
                drop(guard);
                Ok(Box::new(file))
            }
        }
    }
}

fn materialize(mut reader: Box<dyn Read + Send>, stage: &str) -> Result<(NamedTempFile, PathBuf)> {
    let temp = crate::scratch::temp_file(stage)?;
    let path = temp.path().to_path_buf();
    let mut file = temp.reopen().context("reopen scratch file for materialization")?;
    io::copy(&mut reader, &mut file).context("materialize stream to scratch file")?;
    Ok((temp, path))
}

/// A record-level writer whose final bytes may still need to pass through
/// one or more file-only codec stages. Call [`PipelineWriter::finish`] to
/// flush the streaming layers and run those stages; dropping without
/// calling it is treated as an incomplete write and logged.
pub struct PipelineWriter {
    record_writer: Option<RecordWriter<Box<dyn Write + Send>>>,
    head_temp: Option<NamedTempFile>,
    pending_stages: Vec<(StageKind, OptionBag)>,
    destination: PathBuf,
    finished: bool,
}

impl PipelineWriter {
    pub fn write_record(&mut self, record: &indexmap::IndexMap<String, Option<String>>) -> Result<()> {
        self.record_writer
            .as_mut()
            .expect("write_record called after finish")
            .write_record(record)
            .map_err(Into::into)
    }

    /// Flush the plaintext layers, then apply every codec stage
    /// (innermost to outermost) to reach the final destination.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        let mut writer = self.record_writer.take().expect("finish called twice");
        writer.flush()?;
        drop(writer);

        if self.pending_stages.is_empty() {
            return Ok(());
        }
        let head_temp = self.head_temp.take();
        run_pending_stages(head_temp, &self.destination, std::mem::take(&mut self.pending_stages))
    }
}

impl Drop for PipelineWriter {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("PipelineWriter dropped without calling finish(); output may be incomplete");
        }
    }
}

/// Apply `pending_stages` (innermost to outermost) starting from the
/// plaintext at `head_temp` (or `destination` itself if there were no
/// codec stages to begin with), landing the final bytes at `destination`.
/// Shared by [`PipelineWriter::finish`] and [`RawPipelineWriter::finish`].
fn run_pending_stages(
    head_temp: Option<NamedTempFile>,
    destination: &Path,
    pending_stages: Vec<(StageKind, OptionBag)>,
) -> Result<()> {
    let mut current_path = head_temp.as_ref().map(|t| t.path().to_path_buf()).unwrap_or_else(|| destination.to_path_buf());
    let mut current_temp = head_temp;

    let last = pending_stages.len() - 1;
    for (i, (kind, opts)) in pending_stages.into_iter().enumerate() {
        let is_last = i == last;
        let (dst_path, next_temp) = if is_last {
            (destination.to_path_buf(), None)
        } else {
            let temp = crate::scratch::temp_file(kind.name())?;
            let path = temp.path().to_path_buf();
            (path, Some(temp))
        };

        if kind.is_file_only() {
            codec::encode_file(kind, &current_path, &dst_path, &opts)?;
        } else {
            let dst_file = File::create(&dst_path).with_context(|| format!("create {}", dst_path.display()))?;
            let mut wrapped = codec::wrap_writer(kind, Box::new(dst_file), &opts)?;
            let mut src_file = File::open(&current_path).with_context(|| format!("open {}", current_path.display()))?;
            io::copy(&mut src_file, &mut wrapped).context("stream stage output to next segment")?;
            wrapped.flush()?;
            drop(wrapped);
        }

        current_temp = next_temp;
        current_path = dst_path;
    }
    drop(current_temp);
    Ok(())
}

/// A raw byte-level writer that applies codec stages only (no
/// encode/tabular/record layers) — used by the copy engine.
pub struct RawPipelineWriter {
    writer: Option<Box<dyn Write + Send>>,
    head_temp: Option<NamedTempFile>,
    pending_stages: Vec<(StageKind, OptionBag)>,
    destination: PathBuf,
    finished: bool,
}

impl RawPipelineWriter {
    pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.writer.as_mut().expect("write_all called after finish").write_all(buf)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        let mut writer = self.writer.take().expect("finish called twice");
        writer.flush()?;
        drop(writer);

        if self.pending_stages.is_empty() {
            return Ok(());
        }
        let head_temp = self.head_temp.take();
        run_pending_stages(head_temp, &self.destination, std::mem::take(&mut self.pending_stages))
    }
}

impl Drop for RawPipelineWriter {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("RawPipelineWriter dropped without calling finish(); output may be incomplete");
        }
    }
}
