//! Array row format: a pre-structured `Vec<String>` that passes through
//! unchanged, used when the upstream producer is already structured rather
//! than textual (spec §4.4 — Ruby's duck typing has no equivalent here, so
//! this is modeled as its own format rather than silently accepted anywhere
//! a string would do).

use crate::error::IoStreamsError;

pub fn parse(line: &str, _line_number: usize) -> Result<Vec<String>, IoStreamsError> {
    Ok(line.split('\x1f').map(|s| s.to_string()).collect())
}

pub fn render(row: &[String]) -> Result<String, IoStreamsError> {
    Ok(row.join("\x1f"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_then_render_round_trips() -> Result<(), IoStreamsError> {
        let row = vec!["a".to_string(), "b".to_string()];
        let rendered = render(&row)?;
        assert_eq!(parse(&rendered, 1)?, row);
        Ok(())
    }
}
