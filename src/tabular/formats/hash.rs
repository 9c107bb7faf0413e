//! Hash row format: each line is a JSON object keyed by column name,
//! the structured counterpart to [`super::array`] (spec §4.4).

use serde_json::Value;

use crate::error::IoStreamsError;
use crate::tabular::Header;

pub fn parse_as_row(line: &str, header: Option<&Header>, line_number: usize) -> Result<Vec<String>, IoStreamsError> {
    let value: Value = serde_json::from_str(line).map_err(|e| IoStreamsError::MalformedDataError {
        line: line_number,
        message: e.to_string(),
    })?;
    let Value::Object(map) = value else {
        return Err(IoStreamsError::TypeMismatch("expected a JSON object row".into()));
    };
    let header = header.ok_or_else(|| IoStreamsError::MissingHeader("hash format requires a header".into()))?;
    Ok(header
        .columns()
        .iter()
        .map(|c| match map.get(c) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        })
        .collect())
}

pub fn render_as_row(row: &[String], header: Option<&Header>) -> Result<String, IoStreamsError> {
    let header = header.ok_or_else(|| IoStreamsError::MissingHeader("hash format requires a header".into()))?;
    let mut map = serde_json::Map::new();
    for (column, value) in header.columns().iter().zip(row.iter()) {
        map.insert(column.clone(), Value::String(value.clone()));
    }
    serde_json::to_string(&Value::Object(map)).map_err(|e| IoStreamsError::TypeMismatch(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_then_render_round_trips() -> Result<(), IoStreamsError> {
        let header = Header::cleanse(&["a".into(), "b".into()])?;
        let row = parse_as_row(r#"{"a":"1","b":"2"}"#, Some(&header), 1)?;
        assert_eq!(row, vec!["1", "2"]);
        let rendered = render_as_row(&row, Some(&header))?;
        assert_eq!(parse_as_row(&rendered, Some(&header), 1)?, row);
        Ok(())
    }
}
