//! CSV/PSV field tokenizing, delegated to the `csv` crate for quoting rules
//! (grounded on the teacher's `src/io/csv.rs`, which reaches for the same
//! crate rather than hand-rolling a tokenizer).

use crate::error::IoStreamsError;

/// `true` if `line` opens a quoted field (at the start of the line or right
/// after a delimiter) that never closes before end of line. The `csv` crate
/// treats a trailing unterminated quote as the rest of the field rather than
/// an error, so this is checked separately before handing the line to it.
fn has_unterminated_quote(line: &str, delimiter: u8) -> bool {
    let bytes = line.as_bytes();
    let mut field_start = true;
    let mut in_quotes = false;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if in_quotes {
            if b == b'"' {
                if bytes.get(i + 1) == Some(&b'"') {
                    i += 2;
                } else {
                    in_quotes = false;
                    i += 1;
                }
            } else {
                i += 1;
            }
            continue;
        }
        let was_field_start = field_start;
        field_start = false;
        if was_field_start && b == b'"' {
            in_quotes = true;
        } else if b == delimiter {
            field_start = true;
        }
        i += 1;
    }
    in_quotes
}

/// Tokenize one already-framed line with `delimiter`, surfacing parse
/// failures as [`IoStreamsError::MalformedDataError`] carrying `line`.
pub fn parse(line: &str, delimiter: u8, line_number: usize) -> Result<Vec<String>, IoStreamsError> {
    if has_unterminated_quote(line, delimiter) {
        return Err(IoStreamsError::MalformedDataError {
            line: line_number,
            message: "unterminated quoted field".to_string(),
        });
    }
    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_reader(line.as_bytes());
    let mut iter = reader.records();
    match iter.next() {
        Some(Ok(record)) => Ok(record.iter().map(|f| f.to_string()).collect()),
        Some(Err(e)) => Err(IoStreamsError::MalformedDataError {
            line: line_number,
            message: e.to_string(),
        }),
        None => Ok(Vec::new()),
    }
}

/// Tokenize a line with no associated line number context (used for
/// header rows, where a malformed header is an [`IoStreamsError::InvalidHeader`]
/// rather than a line-numbered data error).
pub fn split_delimited(line: &str, delimiter: u8) -> Result<Vec<String>, IoStreamsError> {
    parse(line, delimiter, 0).map_err(|e| match e {
        IoStreamsError::MalformedDataError { message, .. } => IoStreamsError::InvalidHeader(message),
        other => other,
    })
}

pub fn render(row: &[String], delimiter: u8) -> Result<String, IoStreamsError> {
    let mut writer = ::csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(row)
        .map_err(|e| IoStreamsError::TypeMismatch(e.to_string()))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| IoStreamsError::TypeMismatch(e.to_string()))?;
    let mut text = String::from_utf8(bytes).map_err(|e| IoStreamsError::TypeMismatch(e.to_string()))?;
    while text.ends_with('\n') || text.ends_with('\r') {
        text.pop();
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_then_render_round_trips() -> Result<(), IoStreamsError> {
        let row = parse("a,\"b,c\",d", b',', 1)?;
        assert_eq!(row, vec!["a", "b,c", "d"]);
        let rendered = render(&row, b',')?;
        let reparsed = parse(&rendered, b',', 1)?;
        assert_eq!(reparsed, row);
        Ok(())
    }

    #[test]
    fn unclosed_quote_is_malformed_with_line_number() {
        let err = parse("a,\"unterminated", b',', 42);
        match err {
            Err(IoStreamsError::MalformedDataError { line, .. }) => assert_eq!(line, 42),
            other => panic!("expected MalformedDataError, got {other:?}"),
        }
    }

    #[test]
    fn psv_uses_pipe_delimiter() -> Result<(), IoStreamsError> {
        let row = parse("a|b|c", b'|', 1)?;
        assert_eq!(row, vec!["a", "b", "c"]);
        Ok(())
    }
}
