// src/template/parser.rs

use crate::errors::TemplateError;

const OPEN: &str = "<%=";
const CLOSE: &str = "%>";

/// One piece of a template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    /// A dotted config path, already trimmed.
    Placeholder(&'a str),
}

/// Returns true if `s` contains at least one placeholder opener.
pub fn contains_placeholder(s: &str) -> bool {
    s.contains(OPEN)
}

/// Split `input` into literal text and placeholders.
///
/// Only dotted paths are accepted inside a placeholder
/// (`[A-Za-z0-9_$-]` segments separated by `.`).
pub fn parse_segments(input: &str) -> Result<Vec<Segment<'_>>, TemplateError> {
    let mut segments = Vec::new();
    let mut rest = input;

    while let Some(start) = rest.find(OPEN) {
        if start > 0 {
            segments.push(Segment::Literal(&rest[..start]));
        }
        let after_open = &rest[start + OPEN.len()..];
        let end = after_open.find(CLOSE).ok_or_else(|| {
            TemplateError::Malformed(format!("unterminated placeholder in {input:?}"))
        })?;

        let expr = after_open[..end].trim();
        validate_path(expr, input)?;
        segments.push(Segment::Placeholder(expr));

        rest = &after_open[end + CLOSE.len()..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }

    Ok(segments)
}

/// If the whole of `input` is exactly one placeholder, return its path.
pub fn sole_placeholder(input: &str) -> Result<Option<&str>, TemplateError> {
    if !input.starts_with(OPEN) {
        return Ok(None);
    }
    match parse_segments(input)?.as_slice() {
        [Segment::Placeholder(path)] => Ok(Some(path)),
        _ => Ok(None),
    }
}

fn validate_path(expr: &str, input: &str) -> Result<(), TemplateError> {
    if expr.is_empty() {
        return Err(TemplateError::Malformed(format!(
            "empty placeholder in {input:?}"
        )));
    }

    let valid = expr.split('.').all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-'))
    });

    if valid {
        Ok(())
    } else {
        Err(TemplateError::Malformed(format!(
            "unsupported placeholder expression '{expr}' (only dotted paths are allowed)"
        )))
    }
}
