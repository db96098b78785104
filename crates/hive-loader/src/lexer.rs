//! Line tokenizer for the descriptor text subset.
//!
//! Each meaningful source line becomes one [`Line`]: its indentation, whether
//! it opens a sequence item, and what follows. Blank lines and `#` comment
//! lines never reach the parser.

use hive_core::{HiveError, Result};

/// What a line carries after its indentation (and dash, for items).
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// `key:` or `key: value`.
    Entry { key: String, value: Option<String> },
    /// A bare scalar, only valid as a sequence item.
    Scalar(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// 1-based source line number.
    pub number: usize,
    /// Column of the first non-space character (the dash for items).
    pub indent: usize,
    /// The line starts with `- `.
    pub dash: bool,
    /// Column where `content` starts; differs from `indent` only for items.
    pub content_indent: usize,
    pub content: Option<Content>,
}

pub fn tokenize(source: &str) -> Result<Vec<Line>> {
    let mut lines = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let number = idx + 1;
        let text = raw.trim_end();
        let body = text.trim_start_matches(' ');
        if body.is_empty() || body.starts_with('#') {
            continue;
        }
        if body.starts_with('\t') {
            return Err(parse_error(number, "tabs are not allowed in indentation"));
        }
        let indent = text.len() - body.len();

        let line = if body == "-" || body.starts_with("- ") {
            let rest = body[1..].trim_start_matches(' ');
            let content_indent = indent + (body.len() - rest.len());
            Line {
                number,
                indent,
                dash: true,
                content_indent,
                content: if rest.is_empty() {
                    None
                } else {
                    Some(split_content(rest))
                },
            }
        } else {
            match split_content(body) {
                Content::Scalar(s) => {
                    return Err(parse_error(
                        number,
                        format!("expected `key: value`, found `{}`", s),
                    ))
                }
                entry => Line {
                    number,
                    indent,
                    dash: false,
                    content_indent: indent,
                    content: Some(entry),
                },
            }
        };
        lines.push(line);
    }

    Ok(lines)
}

/// Split `key: value` / `key:` from a bare scalar.
///
/// Quoted text is always a scalar, so `- "a: b"` stays a string.
fn split_content(text: &str) -> Content {
    if text.starts_with('"') || text.starts_with('\'') {
        return Content::Scalar(text.to_string());
    }
    if let Some(key) = text.strip_suffix(':') {
        if !key.contains(": ") {
            return Content::Entry {
                key: key.trim_end().to_string(),
                value: None,
            };
        }
    }
    match text.split_once(": ") {
        Some((key, value)) => {
            let value = value.trim();
            Content::Entry {
                key: key.trim_end().to_string(),
                value: (!value.is_empty()).then(|| value.to_string()),
            }
        }
        None => Content::Scalar(text.to_string()),
    }
}

pub(crate) fn parse_error(line: usize, message: impl Into<String>) -> HiveError {
    HiveError::Parse {
        line,
        message: message.into(),
    }
}
