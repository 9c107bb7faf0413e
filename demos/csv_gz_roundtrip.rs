//! Writes a gzip-compressed CSV file through the full pipeline, then reads
//! it back, to demonstrate the record-level API end to end.

use std::sync::Arc;

use anyhow::Result;
use indexmap::IndexMap;
use iostreams::backend::LocalBackend;
use iostreams::options::OptionBag;
use iostreams::path::Path;

fn main() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let location = dir.path().join("orders.csv.gz").to_string_lossy().to_string();
    let backend: Arc<dyn iostreams::path::Backend> = Arc::new(LocalBackend);

    // Columns known on the write side: the header line is rendered.
    let write_path = Path::new(location.clone(), backend.clone()).with_builder(|builder| {
        builder.tabular_options(
            OptionBag::new().with("columns", vec!["id".to_string(), "item".to_string(), "qty".to_string()]),
        );
    });

    let mut writer = write_path.writer()?;
    for (id, item, qty) in [("1", "widget", "3"), ("2", "gadget", "7")] {
        let mut record = IndexMap::new();
        record.insert("id".to_string(), Some(id.to_string()));
        record.insert("item".to_string(), Some(item.to_string()));
        record.insert("qty".to_string(), Some(qty.to_string()));
        writer.write_record(&record)?;
    }
    writer.finish()?;

    println!("wrote {}", write_path.as_str());

    // No columns pre-supplied on the read side: the header is inferred
    // from the line the writer just rendered.
    let read_path = Path::new(location, backend);
    let mut reader = read_path.reader()?;
    while let Some(record) = reader.read_record()? {
        println!("{record:?}");
    }
    Ok(())
}
