//! # iostreams
//!
//! A composable streaming I/O pipeline: decompression/decryption, character
//! encoding, line framing, and row/record parsing layered over a single
//! reader or writer.
//!
//! ## Layers, innermost first
//!
//! - **Byte stream** — a [`path::Backend`] ([`backend::LocalBackend`] is the
//!   provided implementation; others are trait boundaries).
//! - **Codec** ([`codec`]) — decompress/compress, decrypt/encrypt. Stackable;
//!   dispatch is driven by [`registry::StageKind`].
//! - **Encode** ([`encode`]) — target character encoding plus non-printable
//!   cleansing.
//! - **Line** ([`line`]) — frames bytes into logical lines, explicit or
//!   autodetected delimiter.
//! - **Row** ([`row`]) — parses a line into an ordered field array (csv,
//!   psv, json, array, hash, fixed-width).
//! - **Record** ([`record`]) — zips a row against a header into a
//!   field-name→value map.
//!
//! [`builder::Builder`] assembles the stack (from a file name's trailing
//! extensions, explicit stage configuration, or both) and opens a
//! [`record::RecordReader`]/[`builder::PipelineWriter`] against it.
//! [`path::Path`] wraps a location string, its [`path::Backend`], and a
//! lazily-built `Builder` into one handle; [`copy::copy`] moves bytes
//! between two `Path`s, optionally running each end's codec stages.
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use iostreams::backend::LocalBackend;
//! use iostreams::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let backend: Arc<dyn iostreams::path::Backend> = Arc::new(LocalBackend);
//! let path = Path::new("data/rows.csv.gz", backend);
//!
//! let mut writer = path.writer()?;
//! let mut record = indexmap::IndexMap::new();
//! record.insert("id".to_string(), Some("1".to_string()));
//! writer.write_record(&record)?;
//! writer.finish()?;
//!
//! let mut reader = path.reader()?;
//! while let Some(record) = reader.read_record()? {
//!     println!("{record:?}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! - `compression-gzip` / `compression-zstd` / `compression-bzip2` — the
//!   streaming compression codecs (enabled by default).
//! - `codec-zip` — zip/xlsx, implemented as file-only (materializes to a
//!   scratch file rather than streaming).
//! - `codec-pgp` — PGP, shelled out to a local `gpg` binary.
//! - `codec-enc` — AES-256-GCM symmetric encryption with optional gzip
//!   composition.
//!
//! ## Module overview
//!
//! - [`error`] — the library's internal error type.
//! - [`scratch`] — the process-wide scratch-directory root for file-only
//!   codec stages.
//! - [`registry`] — the extension→stage-kind registry `Builder` consults.
//! - [`options`] — closed-enumeration option bags passed to each stage.
//! - [`codec`] — the compression/encryption stage implementations.
//! - [`encode`], [`line`], [`tabular`], [`row`], [`record`] — the text/shape
//!   layers above the codec stack.
//! - [`builder`] — assembles and opens the full stack.
//! - [`path`], [`backend`] — the location/backend abstraction on top of
//!   `Builder`.
//! - [`copy`] — the copy engine.

pub mod backend;
pub mod builder;
pub mod codec;
pub mod copy;
pub mod encode;
pub mod error;
pub mod line;
pub mod options;
pub mod path;
pub mod record;
pub mod registry;
pub mod row;
pub mod scratch;
pub mod tabular;

pub use builder::Builder;
pub use error::IoStreamsError;
pub use options::{OptionBag, OptionValue};
pub use path::{Backend, Path};
pub use record::{RecordReader, RecordWriter};
