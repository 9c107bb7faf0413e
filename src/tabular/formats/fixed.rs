//! Fixed-width row format.

use crate::error::IoStreamsError;
use crate::tabular::FixedField;

pub fn parse(line: &str, layout: &[FixedField]) -> Result<Vec<String>, IoStreamsError> {
    let expected: usize = layout.iter().map(|f| f.width).sum();
    if line.len() != expected {
        return Err(IoStreamsError::InvalidLineLength {
            expected,
            actual: line.len(),
        });
    }
    let mut row = Vec::with_capacity(layout.len());
    let mut pos = 0;
    for field in layout {
        let value = &line[pos..pos + field.width];
        row.push(value.trim_end().to_string());
        pos += field.width;
    }
    Ok(row)
}

pub fn render(row: &[String], layout: &[FixedField]) -> Result<String, IoStreamsError> {
    if row.len() != layout.len() {
        return Err(IoStreamsError::InvalidLayout(format!(
            "row has {} values but layout has {} fields",
            row.len(),
            layout.len()
        )));
    }
    let mut line = String::new();
    for (value, field) in row.iter().zip(layout.iter()) {
        if value.len() > field.width {
            return Err(IoStreamsError::ValueTooLong {
                field: field.name.clone(),
                max: field.width,
                actual: value.len(),
            });
        }
        line.push_str(value);
        for _ in value.len()..field.width {
            line.push(' ');
        }
    }
    Ok(line)
}
