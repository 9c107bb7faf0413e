//! JSON row format: one `serde_json::Value::Array` per line.

use serde_json::Value;

use crate::error::IoStreamsError;

pub fn parse(line: &str, line_number: usize) -> Result<Vec<String>, IoStreamsError> {
    let value: Value = serde_json::from_str(line).map_err(|e| IoStreamsError::MalformedDataError {
        line: line_number,
        message: e.to_string(),
    })?;
    match value {
        Value::Array(items) => Ok(items.into_iter().map(value_to_field).collect()),
        other => Err(IoStreamsError::TypeMismatch(format!(
            "expected a JSON array row, got {other}"
        ))),
    }
}

pub fn render(row: &[String]) -> Result<String, IoStreamsError> {
    let values: Vec<Value> = row.iter().map(|s| Value::String(s.clone())).collect();
    serde_json::to_string(&Value::Array(values)).map_err(|e| IoStreamsError::TypeMismatch(e.to_string()))
}

fn value_to_field(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_then_render_round_trips() -> Result<(), IoStreamsError> {
        let row = parse(r#"["a","b","c"]"#, 1)?;
        assert_eq!(row, vec!["a", "b", "c"]);
        let rendered = render(&row)?;
        assert_eq!(parse(&rendered, 1)?, row);
        Ok(())
    }

    #[test]
    fn non_array_row_is_type_mismatch() {
        let err = parse(r#"{"a": 1}"#, 1);
        assert!(matches!(err, Err(IoStreamsError::TypeMismatch(_))));
    }
}
