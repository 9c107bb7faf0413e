//! Error taxonomy for the streaming I/O pipeline.
//!
//! Mirrors the hand-written error/kind split the cloud I/O traits use
//! (`CloudIOError`/`ErrorKind`), but with variants specific to this crate's
//! pipeline: header shaping, line framing, and tabular parsing failures.
//! Call sites that need to chain several fallible steps still reach for
//! `anyhow::Context`; call sites that need to match on a specific failure
//! kind use this enum directly.

use std::fmt;

/// A single error surfaced by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoStreamsError {
    /// Header malformed, duplicate after cleansing, or an unknown column
    /// without `skip_unknown`.
    InvalidHeader(String),
    /// A `required_columns` entry is absent from the header.
    MissingHeader(String),
    /// A stage or extension name is not in the registry.
    UnknownFormat(String),
    /// Input to a stage is not of the expected shape.
    TypeMismatch(String),
    /// Backend I/O failure.
    CommunicationsFailure(String),
    /// The line framer exhausted its buffer without finding a delimiter.
    DelimiterNotFound,
    /// A fixed-width line's length did not match the layout.
    InvalidLineLength { expected: usize, actual: usize },
    /// A fixed-width value was longer than its field on render.
    ValueTooLong { field: String, max: usize, actual: usize },
    /// A fixed-width layout option was missing or empty.
    InvalidLayout(String),
    /// A CSV/PSV line failed to parse, carrying the 1-based line number.
    MalformedDataError { line: usize, message: String },
    /// A pipeline/stage was misconfigured at assembly time.
    Configuration(String),
    /// A character-encoding conversion failed.
    EncodingError(String),
}

impl fmt::Display for IoStreamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHeader(msg) => write!(f, "invalid header: {msg}"),
            Self::MissingHeader(col) => write!(f, "missing required column: {col}"),
            Self::UnknownFormat(name) => write!(f, "unknown format or stage: {name}"),
            Self::TypeMismatch(msg) => write!(f, "type mismatch: {msg}"),
            Self::CommunicationsFailure(msg) => write!(f, "communications failure: {msg}"),
            Self::DelimiterNotFound => write!(f, "no line delimiter found within buffer"),
            Self::InvalidLineLength { expected, actual } => write!(
                f,
                "invalid line length: expected {expected}, got {actual}"
            ),
            Self::ValueTooLong { field, max, actual } => write!(
                f,
                "value for field '{field}' too long: max {max}, got {actual}"
            ),
            Self::InvalidLayout(msg) => write!(f, "invalid fixed-width layout: {msg}"),
            Self::MalformedDataError { line, message } => {
                write!(f, "malformed data at line {line}: {message}")
            }
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::EncodingError(msg) => write!(f, "encoding error: {msg}"),
        }
    }
}

impl std::error::Error for IoStreamsError {}

/// Convenience alias for fallible operations that want to match on
/// [`IoStreamsError`] directly rather than going through `anyhow`.
pub type Result<T> = std::result::Result<T, IoStreamsError>;
