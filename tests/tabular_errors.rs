//! Tabular/header error paths, exercised through the public `row`/`record`
//! modules rather than internal unit tests.

use iostreams::error::IoStreamsError;
use iostreams::options::OptionBag;
use iostreams::record::RecordReader;
use iostreams::row::RowReader;
use iostreams::tabular::Tabular;

#[test]
fn unclosed_quote_reports_malformed_data_with_line_number() {
    let data = b"id,name\n1,\"unterminated\n2,bob\n".to_vec();
    let tabular = Tabular::from_bag(&OptionBag::new()).unwrap();
    let mut reader = RowReader::new(data.as_slice(), iostreams::line::LineOptions::from_bag(&OptionBag::new()).unwrap(), tabular);
    reader.ensure_header().unwrap();
    let err = reader.read_row();
    match err {
        Err(IoStreamsError::MalformedDataError { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected MalformedDataError, got {other:?}"),
    }
}

#[test]
fn missing_required_column_is_rejected_at_header() {
    let data = b"id,value\n1,2\n".to_vec();
    let bag = OptionBag::new().with("required_columns", vec!["name".to_string()]);
    let tabular = Tabular::from_bag(&bag).unwrap();
    let mut reader = RowReader::new(data.as_slice(), iostreams::line::LineOptions::from_bag(&OptionBag::new()).unwrap(), tabular);
    let err = reader.ensure_header();
    assert!(matches!(err, Err(IoStreamsError::MissingHeader(_))));
}

#[test]
fn record_reader_surfaces_header_then_records() {
    let data = b"id,name\n1,alice\n".to_vec();
    let tabular = Tabular::from_bag(&OptionBag::new()).unwrap();
    let mut reader = RecordReader::new(data.as_slice(), iostreams::line::LineOptions::from_bag(&OptionBag::new()).unwrap(), tabular);
    reader.ensure_header().unwrap();
    let record = reader.read_record().unwrap().expect("one record");
    assert_eq!(record.get("name").unwrap().as_deref(), Some("alice"));
    assert!(reader.read_record().unwrap().is_none());
}
