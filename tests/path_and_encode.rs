//! `Path::join` concatenation property and an end-to-end encode-stage
//! cleansing pass through the full pipeline.

use std::sync::Arc;

use anyhow::Result;
use indexmap::IndexMap;
use iostreams::backend::LocalBackend;
use iostreams::options::OptionBag;
use iostreams::path::{Backend, Path};

fn local_path(s: &str) -> Path {
    let backend: Arc<dyn Backend> = Arc::new(LocalBackend);
    Path::new(s.to_string(), backend)
}

#[test]
fn join_never_duplicates_a_shared_trailing_segment() {
    let base = local_path("/data/reports");
    assert_eq!(base.join("orders.csv").as_str(), "/data/reports/orders.csv");

    // Joining a path that already starts with the base's last segment
    // does not duplicate it.
    let base2 = local_path("/data/reports/orders");
    assert_eq!(base2.join("orders/detail.csv").as_str(), "/data/reports/orders/detail.csv");
}

#[test]
fn join_then_directory_then_file_name_round_trips() {
    let base = local_path("/data/reports");
    let joined = base.join("orders.csv");
    assert_eq!(joined.file_name(), "orders.csv");
    assert_eq!(joined.directory().as_str(), "/data/reports");
}

#[test]
fn encode_replace_non_printable_runs_through_the_full_pipeline() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let location = dir.path().join("notes.csv").to_string_lossy().to_string();
    let backend: Arc<dyn Backend> = Arc::new(LocalBackend);

    // Known columns on the write side render the header line.
    let write_path = Path::new(location.clone(), backend.clone()).with_builder(|b| {
        b.tabular_options(OptionBag::new().with("columns", vec!["id".to_string(), "note".to_string()]));
        b.encode_options(OptionBag::new().with("cleaner", "replace_non_printable").with("replace", "?"));
    });

    let mut writer = write_path.writer()?;
    let mut record = IndexMap::new();
    record.insert("id".to_string(), Some("1".to_string()));
    record.insert("note".to_string(), Some("clean text".to_string()));
    writer.write_record(&record)?;
    writer.finish()?;

    // No columns pre-supplied on the read side: the header is inferred
    // from the line the writer just rendered.
    let read_path = Path::new(location, backend).with_builder(|b| {
        b.encode_options(OptionBag::new().with("cleaner", "replace_non_printable").with("replace", "?"));
    });
    let mut reader = read_path.reader()?;
    let record = reader.read_record()?.expect("one record");
    assert_eq!(record.get("note").unwrap().as_deref(), Some("clean text"));
    Ok(())
}
