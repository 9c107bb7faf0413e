//! Extension registry: maps file-name extensions to pipeline stage kinds.
//!
//! Generalizes the teacher crate's `CODEC_REGISTRY` (a `compression.rs`-local
//! global holding only compression codecs) into a single process-wide table
//! covering every extension-inferred stage this crate knows about — codec,
//! container, and encryption stages alike. Registration/deregistration is
//! only supported before any pipeline opens a stream (spec §5).

use std::sync::RwLock;

/// A pipeline stage that can be inferred from a trailing path extension.
///
/// This is a closed set — see spec §3 "Builder" invariant: "each stage_kind
/// is from a closed registry". Adding a genuinely new stage kind means
/// adding a variant here, not just registering a new extension string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Gzip,
    Bzip2,
    Zstd,
    Zip,
    Xlsx,
    Pgp,
    Enc,
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gzip => "gz",
            Self::Bzip2 => "bz2",
            Self::Zstd => "zst",
            Self::Zip => "zip",
            Self::Xlsx => "xlsx",
            Self::Pgp => "pgp",
            Self::Enc => "enc",
        }
    }

    /// Whether this stage must materialize to a scratch file rather than
    /// streaming against an arbitrary `Read`/`Write` (spec §4.1).
    pub fn is_file_only(&self) -> bool {
        matches!(self, Self::Zip | Self::Xlsx | Self::Pgp)
    }
}

struct RegistryEntry {
    extension: String,
    kind: StageKind,
}

fn default_entries() -> Vec<RegistryEntry> {
    let pairs: &[(&str, StageKind)] = &[
        ("gz", StageKind::Gzip),
        ("gzip", StageKind::Gzip),
        ("bz2", StageKind::Bzip2),
        ("bzip2", StageKind::Bzip2),
        ("zst", StageKind::Zstd),
        ("zstd", StageKind::Zstd),
        ("zip", StageKind::Zip),
        ("xlsx", StageKind::Xlsx),
        ("pgp", StageKind::Pgp),
        ("gpg", StageKind::Pgp),
        ("enc", StageKind::Enc),
    ];
    pairs
        .iter()
        .map(|(ext, kind)| RegistryEntry {
            extension: (*ext).to_string(),
            kind: *kind,
        })
        .collect()
}

static REGISTRY: RwLock<Option<Vec<RegistryEntry>>> = RwLock::new(None);

fn with_registry<R>(f: impl FnOnce(&[RegistryEntry]) -> R) -> R {
    {
        let read = REGISTRY.read().unwrap();
        if let Some(entries) = read.as_ref() {
            return f(entries);
        }
    }
    let mut write = REGISTRY.write().unwrap();
    if write.is_none() {
        *write = Some(default_entries());
    }
    f(write.as_ref().unwrap())
}

/// Register an extension (without leading dot), case-insensitively, as
/// mapping to `kind`. A later registration for the same extension shadows
/// earlier ones (first match in lookup order wins, and new entries are
/// pushed to the front).
pub fn register(extension: &str, kind: StageKind) {
    let mut write = REGISTRY.write().unwrap();
    let entries = write.get_or_insert_with(default_entries);
    entries.insert(
        0,
        RegistryEntry {
            extension: extension.to_lowercase(),
            kind,
        },
    );
}

/// Remove every registration for `extension`.
pub fn deregister(extension: &str) {
    let mut write = REGISTRY.write().unwrap();
    let entries = write.get_or_insert_with(default_entries);
    let ext = extension.to_lowercase();
    entries.retain(|e| e.extension != ext);
}

/// Look up the stage kind for a bare extension (no leading dot), case-insensitively.
pub fn lookup(extension: &str) -> Option<StageKind> {
    let ext = extension.to_lowercase();
    with_registry(|entries| entries.iter().find(|e| e.extension == ext).map(|e| e.kind))
}

/// Parse the trailing dot-separated components of a file name into an
/// ordered stage list, outermost first (spec §4.1): `abc.xlsx.gz.pgp`
/// yields `[Pgp, Gzip, Xlsx]`.
pub fn infer_stages(file_name: &str) -> Vec<StageKind> {
    let mut stages = Vec::new();
    let mut remainder = file_name;
    loop {
        let Some(idx) = remainder.rfind('.') else {
            break;
        };
        let ext = &remainder[idx + 1..];
        if ext.is_empty() {
            break;
        }
        match lookup(ext) {
            Some(kind) => {
                stages.push(kind);
                remainder = &remainder[..idx];
            }
            None => break,
        }
    }
    stages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_outer_to_inner_order() {
        let stages = infer_stages("abc.xlsx.gz.pgp");
        assert_eq!(stages, vec![StageKind::Pgp, StageKind::Gzip, StageKind::Xlsx]);
    }

    #[test]
    fn stops_at_first_unknown_extension() {
        let stages = infer_stages("report.2024.csv.gz");
        assert_eq!(stages, vec![StageKind::Gzip]);
    }

    #[test]
    fn no_recognized_extension_yields_empty_pipeline() {
        assert!(infer_stages("plain.txt").is_empty());
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("GZ"), Some(StageKind::Gzip));
    }

    #[test]
    fn register_and_deregister_round_trip() {
        register("myz", StageKind::Zstd);
        assert_eq!(lookup("myz"), Some(StageKind::Zstd));
        deregister("myz");
        assert_eq!(lookup("myz"), None);
    }
}
