//! Recursive-descent parser over tokenized lines.
//!
//! Indentation drives nesting: a block owns every following line at its base
//! column, a deeper line opens a child block, and a shallower line closes it.

use hive_core::{Mapping, Result, Value};

use crate::lexer::{parse_error, tokenize, Content, Line};

/// Parse descriptor text into a [`Value`] tree. The document root must be a
/// mapping; an empty document yields an empty mapping.
pub fn parse(source: &str) -> Result<Value> {
    let lines = tokenize(source)?;
    let mut parser = Parser { lines: &lines, pos: 0 };

    let Some(first) = parser.peek() else {
        return Ok(Value::Map(Mapping::new()));
    };
    if first.dash {
        return Err(parse_error(
            first.number,
            "document root must be a mapping, found a sequence",
        ));
    }

    let root = parser.mapping(first.indent, None)?;
    if let Some(line) = parser.peek() {
        let message = if line.dash {
            "sequence item without an owning key"
        } else {
            "unexpected indentation"
        };
        return Err(parse_error(line.number, message));
    }
    Ok(root)
}

struct Parser<'a> {
    lines: &'a [Line],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Line> {
        self.lines.get(self.pos)
    }

    /// Parse whatever block starts at the next line.
    fn block(&mut self, indent: usize) -> Result<Value> {
        match self.peek() {
            Some(line) if line.dash => self.sequence(indent),
            Some(_) => self.mapping(indent, None),
            None => Ok(Value::Null),
        }
    }

    /// Value of a `key:` entry or a bare `-` item. The child block must be
    /// deeper than `owner`; a mapping entry may also own a sequence at its
    /// own column.
    fn nested(&mut self, owner: usize, same_column_seq: bool) -> Result<Value> {
        match self.peek() {
            Some(next)
                if next.indent > owner || (same_column_seq && next.indent == owner && next.dash) =>
            {
                self.block(next.indent)
            }
            _ => Ok(Value::Null),
        }
    }

    /// Parse mapping entries at `indent`. `first` carries an entry already
    /// consumed from a `- key: value` item line.
    fn mapping(
        &mut self,
        indent: usize,
        first: Option<(&'a Line, &'a str, Option<&'a str>)>,
    ) -> Result<Value> {
        let mut map = Mapping::new();

        if let Some((line, key, value)) = first {
            let v = self.entry_value(indent, line, value)?;
            map.insert(key, v);
        }

        while let Some(line) = self.peek() {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(parse_error(line.number, "unexpected indentation"));
            }
            if line.dash {
                // A sequence at this column belongs to an enclosing entry.
                break;
            }
            let Some(Content::Entry { key, value }) = &line.content else {
                return Err(parse_error(line.number, "expected `key: value`"));
            };
            self.pos += 1;
            let v = self.entry_value(indent, line, value.as_deref())?;
            if map.insert(key.clone(), v).is_some() {
                return Err(parse_error(line.number, format!("duplicate key `{}`", key)));
            }
        }

        Ok(Value::Map(map))
    }

    fn entry_value(&mut self, indent: usize, line: &Line, value: Option<&str>) -> Result<Value> {
        match value {
            Some(text) => scalar(text, line.number),
            None => self.nested(indent, true),
        }
    }

    fn sequence(&mut self, indent: usize) -> Result<Value> {
        let mut items = Vec::new();

        while let Some(line) = self.peek() {
            if line.indent < indent || (line.indent == indent && !line.dash) {
                break;
            }
            if line.indent > indent {
                return Err(parse_error(line.number, "unexpected indentation"));
            }
            self.pos += 1;
            let item = match &line.content {
                None => self.nested(indent, false)?,
                Some(Content::Scalar(text)) => scalar(text, line.number)?,
                Some(Content::Entry { key, value }) => {
                    self.mapping(line.content_indent, Some((line, key.as_str(), value.as_deref())))?
                }
            };
            items.push(item);
        }

        Ok(Value::Seq(items))
    }
}

/// Interpret one scalar literal.
pub fn scalar(text: &str, line: usize) -> Result<Value> {
    let text = text.trim();
    match text {
        "" | "null" | "~" => return Ok(Value::Null),
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "[]" => return Ok(Value::Seq(Vec::new())),
        "{}" => return Ok(Value::Map(Mapping::new())),
        _ => {}
    }

    if let Some(rest) = text.strip_prefix('"') {
        return double_quoted(rest, line).map(Value::Str);
    }
    if let Some(rest) = text.strip_prefix('\'') {
        return single_quoted(rest, line).map(Value::Str);
    }

    if let Ok(i) = text.parse::<i64>() {
        return Ok(Value::Int(i));
    }
    if looks_numeric(text) {
        if let Ok(f) = text.parse::<f64>() {
            return Ok(Value::Float(f));
        }
    }

    Ok(Value::Str(text.to_string()))
}

// Keeps words like `inf` or `NaN` as strings.
fn looks_numeric(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit())
        && text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
}

fn double_quoted(rest: &str, line: usize) -> Result<String> {
    let mut out = String::with_capacity(rest.len());
    let mut chars = rest.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                return if chars.as_str().trim().is_empty() {
                    Ok(out)
                } else {
                    Err(parse_error(line, "unexpected text after closing quote"))
                };
            }
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('"') => out.push('"'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => break,
            },
            c => out.push(c),
        }
    }

    Err(parse_error(line, "unterminated double-quoted string"))
}

fn single_quoted(rest: &str, line: usize) -> Result<String> {
    let mut out = String::with_capacity(rest.len());
    let mut chars = rest.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                out.push('\'');
                continue;
            }
            let tail: String = chars.collect();
            return if tail.trim().is_empty() {
                Ok(out)
            } else {
                Err(parse_error(line, "unexpected text after closing quote"))
            };
        }
        out.push(c);
    }

    Err(parse_error(line, "unterminated single-quoted string"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::HiveError;

    fn map(value: &Value) -> &Mapping {
        value.as_map().unwrap()
    }

    #[test]
    fn scalars() {
        assert_eq!(scalar("true", 1).unwrap(), Value::Bool(true));
        assert_eq!(scalar("null", 1).unwrap(), Value::Null);
        assert_eq!(scalar("42", 1).unwrap(), Value::Int(42));
        assert_eq!(scalar("-3", 1).unwrap(), Value::Int(-3));
        assert_eq!(scalar("0.7", 1).unwrap(), Value::Float(0.7));
        assert_eq!(scalar("1e3", 1).unwrap(), Value::Float(1000.0));
        assert_eq!(scalar("inf", 1).unwrap(), Value::Str("inf".into()));
        assert_eq!(scalar("gpt-4o", 1).unwrap(), Value::Str("gpt-4o".into()));
        assert_eq!(scalar("\"a \\\"b\\\"\"", 1).unwrap(), Value::Str("a \"b\"".into()));
        assert_eq!(scalar("'it''s'", 1).unwrap(), Value::Str("it's".into()));
        assert_eq!(scalar("\"42\"", 1).unwrap(), Value::Str("42".into()));
        assert_eq!(scalar("[]", 1).unwrap(), Value::Seq(vec![]));
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let err = scalar("\"open", 7).unwrap_err();
        assert!(matches!(err, HiveError::Parse { line: 7, .. }));
    }

    #[test]
    fn parses_full_descriptor() {
        let src = r#"
# researcher
name: researcher
description: "Collects sources"
goals:
  - Find recent papers
  - Summarize them
tasks:
- Search the web
depends_on: planner
llm:
  provider: mistral
  temperature: 0.2
  max_tokens: 800
prompts:
  system: You are careful.
tools:
  - web-scraper
on_error: continue
"#;
        let root = parse(src).unwrap();
        let m = map(&root);
        assert_eq!(m.get("name"), Some(&Value::Str("researcher".into())));
        assert_eq!(m.get("description"), Some(&Value::Str("Collects sources".into())));
        assert_eq!(m.get("goals").unwrap().as_seq().unwrap().len(), 2);
        assert_eq!(
            m.get("tasks").unwrap().as_seq().unwrap()[0],
            Value::Str("Search the web".into())
        );
        let llm = map(m.get("llm").unwrap());
        assert_eq!(llm.get("temperature"), Some(&Value::Float(0.2)));
        assert_eq!(llm.get("max_tokens"), Some(&Value::Int(800)));
        assert_eq!(
            root.get("prompts").unwrap().get("system").unwrap().as_str(),
            Some("You are careful.")
        );
        assert_eq!(m.get("on_error"), Some(&Value::Str("continue".into())));
    }

    #[test]
    fn sequence_of_inline_mappings() {
        let src = "steps:\n  - name: a\n    weight: 1\n  - name: b\n";
        let root = parse(src).unwrap();
        let steps = root.get("steps").unwrap().as_seq().unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].get("name").unwrap().as_str(), Some("a"));
        assert_eq!(steps[0].get("weight"), Some(&Value::Int(1)));
        assert_eq!(steps[1].get("name").unwrap().as_str(), Some("b"));
        assert!(steps[1].get("weight").is_none());
    }

    #[test]
    fn lower_indent_closes_block() {
        let src = "llm:\n  provider: openai\n  model: gpt-4o\nname: after\n";
        let root = parse(src).unwrap();
        assert_eq!(map(root.get("llm").unwrap()).len(), 2);
        assert_eq!(root.get("name").unwrap().as_str(), Some("after"));
    }

    #[test]
    fn key_without_value_or_child_is_null() {
        let root = parse("description:\nname: x\n").unwrap();
        assert_eq!(root.get("description"), Some(&Value::Null));
    }

    #[test]
    fn nested_sequence_in_item() {
        let src = "matrix:\n  -\n    - 1\n    - 2\n  - 3\n";
        let root = parse(src).unwrap();
        let items = root.get("matrix").unwrap().as_seq().unwrap();
        assert_eq!(items[0], Value::Seq(vec![Value::Int(1), Value::Int(2)]));
        assert_eq!(items[1], Value::Int(3));
    }

    #[test]
    fn empty_document_is_empty_mapping() {
        assert_eq!(parse("# nothing\n").unwrap(), Value::Map(Mapping::new()));
    }

    #[test]
    fn rejects_unexpected_indentation() {
        let err = parse("name: a\n    goals: b\n").unwrap_err();
        assert!(matches!(err, HiveError::Parse { line: 2, .. }));
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = parse("name: a\nname: b\n").unwrap_err();
        assert!(matches!(err, HiveError::Parse { line: 2, .. }));
    }

    #[test]
    fn rejects_sequence_root() {
        let err = parse("- a\n- b\n").unwrap_err();
        assert!(matches!(err, HiveError::Parse { line: 1, .. }));
    }
}
