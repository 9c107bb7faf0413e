//! Tabular stage: turns lines into ordered field arrays (rows) and rows
//! into field-name→value maps (records), with header handling, cleansing,
//! and per-format parsing (spec §4.4).

pub mod formats;

use std::collections::HashSet;
use std::sync::OnceLock;

use anyhow::Result;
use indexmap::IndexMap;
use regex::Regex;

use crate::error::IoStreamsError;
use crate::options::OptionBag;

fn whitespace_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Supported row/record formats.
#[derive(Debug, Clone)]
pub enum TabularFormat {
    Csv,
    Psv,
    Json,
    Array,
    Hash,
    Fixed(Vec<FixedField>),
}

/// One field of a fixed-width layout: name and column width.
#[derive(Debug, Clone)]
pub struct FixedField {
    pub name: String,
    pub width: usize,
}

pub const RECOGNIZED: &[&str] = &[
    "format",
    "columns",
    "allowed_columns",
    "required_columns",
    "skip_unknown",
    "layout",
];

/// A cleansed, de-duplicated header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header(Vec<String>);

impl Header {
    /// Cleanse raw header values: trim, lowercase, collapse whitespace runs
    /// to `_`, strip anything outside `[a-z0-9_]`, then reject duplicates.
    pub fn cleanse(raw: &[String]) -> Result<Self, IoStreamsError> {
        let cleaned: Vec<String> = raw
            .iter()
            .map(|s| {
                let lowered = s.trim().to_lowercase();
                let collapsed = whitespace_run_re().replace_all(&lowered, "_");
                collapsed.chars().filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_').collect()
            })
            .collect();
        let mut seen = HashSet::new();
        for name in &cleaned {
            if !seen.insert(name.clone()) {
                return Err(IoStreamsError::InvalidHeader(format!("duplicate column '{name}'")));
            }
        }
        Ok(Self(cleaned))
    }

    pub fn columns(&self) -> &[String] {
        &self.0
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|c| c == name)
    }
}

/// Tabular stage configuration and shared header state.
pub struct Tabular {
    pub format: TabularFormat,
    pub header: Option<Header>,
    pub allowed_columns: HashSet<String>,
    pub required_columns: HashSet<String>,
    pub skip_unknown: bool,
}

impl Tabular {
    pub fn from_bag(opts: &OptionBag) -> Result<Self, IoStreamsError> {
        opts.check_recognized("tabular", RECOGNIZED)?;
        let format = match opts.get_str("format").unwrap_or("csv") {
            "csv" => TabularFormat::Csv,
            "psv" => TabularFormat::Psv,
            "json" => TabularFormat::Json,
            "array" => TabularFormat::Array,
            "hash" => TabularFormat::Hash,
            "fixed" => {
                let layout = opts.get_list("layout").ok_or_else(|| {
                    IoStreamsError::InvalidLayout("fixed format requires a 'layout' option".into())
                })?;
                if layout.is_empty() {
                    return Err(IoStreamsError::InvalidLayout("fixed layout must not be empty".into()));
                }
                TabularFormat::Fixed(parse_layout(layout)?)
            }
            other => return Err(IoStreamsError::UnknownFormat(other.to_string())),
        };

        let header = match opts.get_list("columns") {
            Some(cols) => Some(Header::cleanse(cols)?),
            None => None,
        };

        let allowed_columns = opts
            .get_list("allowed_columns")
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default();
        let required_columns = opts
            .get_list("required_columns")
            .map(|l| l.iter().cloned().collect())
            .unwrap_or_default();
        let skip_unknown = opts.get_bool("skip_unknown").unwrap_or(false);

        Ok(Self {
            format,
            header,
            allowed_columns,
            required_columns,
            skip_unknown,
        })
    }

    /// Parse a raw header line (only meaningful for delimited formats).
    pub fn parse_header(&mut self, line: &str) -> Result<(), IoStreamsError> {
        let raw = formats::csv::split_delimited(line, self.delimiter())?;
        let header = Header::cleanse(&raw)?;
        self.check_required(&header)?;
        self.header = Some(header);
        Ok(())
    }

    fn check_required(&self, header: &Header) -> Result<(), IoStreamsError> {
        for required in &self.required_columns {
            if header.position_of(required).is_none() {
                return Err(IoStreamsError::MissingHeader(required.clone()));
            }
        }
        Ok(())
    }

    fn delimiter(&self) -> u8 {
        match self.format {
            TabularFormat::Psv => b'|',
            _ => b',',
        }
    }

    /// Parse one line into an ordered field array.
    pub fn parse(&self, line: &str, line_number: usize) -> Result<Vec<String>, IoStreamsError> {
        match &self.format {
            TabularFormat::Csv => formats::csv::parse(line, b',', line_number),
            TabularFormat::Psv => formats::csv::parse(line, b'|', line_number),
            TabularFormat::Json => formats::json::parse(line, line_number),
            TabularFormat::Array => formats::array::parse(line, line_number),
            TabularFormat::Hash => formats::hash::parse_as_row(line, self.header.as_ref(), line_number),
            TabularFormat::Fixed(layout) => formats::fixed::parse(line, layout),
        }
    }

    /// Render a field array back into one line (no trailing delimiter).
    pub fn render(&self, row: &[String]) -> Result<String, IoStreamsError> {
        match &self.format {
            TabularFormat::Csv => formats::csv::render(row, b','),
            TabularFormat::Psv => formats::csv::render(row, b'|'),
            TabularFormat::Json => formats::json::render(row),
            TabularFormat::Array => formats::array::render(row),
            TabularFormat::Hash => formats::hash::render_as_row(row, self.header.as_ref()),
            TabularFormat::Fixed(layout) => formats::fixed::render(row, layout),
        }
    }

    pub fn render_header(&self) -> Option<String> {
        self.header.as_ref().and_then(|h| self.render(h.columns()).ok())
    }

    /// Zip a parsed row against the header into a field-name→value record.
    /// Missing trailing fields become `None`; columns outside
    /// `allowed_columns` (when non-empty) are rejected unless
    /// `skip_unknown`.
    pub fn record_parse(&self, row: Vec<String>) -> Result<IndexMap<String, Option<String>>, IoStreamsError> {
        let header = self
            .header
            .as_ref()
            .ok_or_else(|| IoStreamsError::MissingHeader("no header configured for record parsing".into()))?;

        let mut record = IndexMap::new();
        for (idx, column) in header.columns().iter().enumerate() {
            if !self.allowed_columns.is_empty() && !self.allowed_columns.contains(column) {
                if self.skip_unknown {
                    continue;
                }
                return Err(IoStreamsError::InvalidHeader(format!("unknown column '{column}'")));
            }
            record.insert(column.clone(), row.get(idx).cloned());
        }
        Ok(record)
    }

    /// Project a record back into a row following header column order.
    pub fn record_render(&self, record: &IndexMap<String, Option<String>>) -> Result<Vec<String>, IoStreamsError> {
        let header = self
            .header
            .as_ref()
            .ok_or_else(|| IoStreamsError::MissingHeader("no header configured for record rendering".into()))?;
        Ok(header
            .columns()
            .iter()
            .map(|c| record.get(c).cloned().flatten().unwrap_or_default())
            .collect())
    }
}

fn parse_layout(raw: &[String]) -> Result<Vec<FixedField>, IoStreamsError> {
    raw.iter()
        .map(|entry| {
            let (name, width) = entry
                .split_once(':')
                .ok_or_else(|| IoStreamsError::InvalidLayout(format!("malformed layout entry '{entry}'")))?;
            let width: usize = width
                .parse()
                .map_err(|_| IoStreamsError::InvalidLayout(format!("non-numeric width in '{entry}'")))?;
            Ok(FixedField {
                name: name.to_string(),
                width,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_rejects_duplicates() {
        let err = Header::cleanse(&["a".into(), "b".into(), "a".into()]);
        assert!(matches!(err, Err(IoStreamsError::InvalidHeader(_))));
    }

    #[test]
    fn header_trims_whitespace() -> Result<(), IoStreamsError> {
        let header = Header::cleanse(&[" a ".into(), "b".into()])?;
        assert_eq!(header.columns(), &["a".to_string(), "b".to_string()]);
        Ok(())
    }

    #[test]
    fn header_lowercases_collapses_whitespace_and_strips_punctuation() -> Result<(), IoStreamsError> {
        let header = Header::cleanse(&["First Name".into(), "E-Mail!".into(), "  Zip  Code  ".into()])?;
        assert_eq!(
            header.columns(),
            &["first_name".to_string(), "email".to_string(), "zip_code".to_string()]
        );
        Ok(())
    }

    #[test]
    fn record_parse_fills_missing_as_none() -> Result<(), IoStreamsError> {
        let mut bag = OptionBag::new();
        bag = bag.with("columns", vec!["a".to_string(), "b".to_string(), "c".to_string()]);
        let tabular = Tabular::from_bag(&bag)?;
        let record = tabular.record_parse(vec!["1".to_string(), "2".to_string()])?;
        assert_eq!(record.get("a").unwrap().as_deref(), Some("1"));
        assert_eq!(record.get("b").unwrap().as_deref(), Some("2"));
        assert_eq!(record.get("c").unwrap(), &None);
        Ok(())
    }

    #[test]
    fn required_columns_missing_from_header_errors() {
        let mut bag = OptionBag::new();
        bag = bag.with("required_columns", vec!["id".to_string()]);
        let mut tabular = Tabular::from_bag(&bag).unwrap();
        let err = tabular.parse_header("name,value");
        assert!(matches!(err, Err(IoStreamsError::MissingHeader(_))));
    }
}
