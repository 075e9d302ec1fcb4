use crate::{Bind, BindStrategy, Result, SluiceError, SqlWriter, Value};
use std::collections::{HashMap, HashSet};

/// Piece of a query template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Positional,
    /// Named placeholder, without the leading `:`.
    Named(&'a str),
}

/// A template ready for the backend: SQL text and, under [`BindStrategy::ParameterMarker`], the
/// positional arguments in marker order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compiled {
    pub sql: String,
    pub args: Vec<Value>,
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split a template into text and placeholders.
///
/// Placeholders inside string literals, quoted identifiers and comments are text. `::` is the
/// cast operator. A named placeholder is a `:` not preceded by an identifier character, followed
/// by the longest identifier.
pub fn scan(template: &str, placeholder: char) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut chars = template.char_indices().peekable();
    let mut start = 0;
    let mut previous = None::<char>;
    while let Some((i, c)) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                for (_, next) in chars.by_ref() {
                    if next == c {
                        break;
                    }
                }
            }
            '-' if chars.peek().map(|v| v.1) == Some('-') => {
                for (_, next) in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek().map(|v| v.1) == Some('*') => {
                chars.next();
                let mut star = false;
                for (_, next) in chars.by_ref() {
                    if star && next == '/' {
                        break;
                    }
                    star = next == '*';
                }
            }
            ':' if chars.peek().map(|v| v.1) == Some(':') => {
                chars.next();
                previous = Some(':');
                continue;
            }
            ':' if !previous.is_some_and(is_identifier_char)
                && chars
                    .peek()
                    .is_some_and(|v| v.1.is_alphabetic() || v.1 == '_') =>
            {
                if start < i {
                    segments.push(Segment::Text(&template[start..i]));
                }
                let name_start = i + 1;
                let mut name_end = name_start;
                while let Some(&(j, next)) = chars.peek()
                    && is_identifier_char(next)
                {
                    name_end = j + next.len_utf8();
                    chars.next();
                }
                segments.push(Segment::Named(&template[name_start..name_end]));
                start = name_end;
                previous = template[..name_end].chars().next_back();
                continue;
            }
            _ if c == placeholder => {
                if start < i {
                    segments.push(Segment::Text(&template[start..i]));
                }
                segments.push(Segment::Positional);
                start = i + c.len_utf8();
            }
            _ => {}
        }
        previous = Some(c);
    }
    if start < template.len() {
        segments.push(Segment::Text(&template[start..]));
    }
    segments
}

/// Flatten nested lists depth-first, preserving order.
pub fn flatten_args(args: &[Value]) -> Vec<Value> {
    fn flatten(out: &mut Vec<Value>, value: &Value) {
        match value {
            Value::List(Some(items), ..) => items.iter().for_each(|v| flatten(out, v)),
            _ => out.push(value.clone()),
        }
    }
    let mut out = Vec::with_capacity(args.len());
    args.iter().for_each(|v| flatten(&mut out, v));
    out
}

/// Compile `template` with its positional `args` and named `binds` into backend SQL.
///
/// Fails before any I/O when the positional counts differ, a named placeholder has no bind, a
/// bind has no placeholder or a value cannot be escaped. When the same name is bound more than
/// once the last bind wins.
pub fn compile<W: SqlWriter + ?Sized>(
    writer: &W,
    template: &str,
    args: &[Value],
    binds: &[Bind],
    strategy: BindStrategy,
    placeholder: char,
) -> Result<Compiled> {
    let segments = scan(template, placeholder);
    let args = flatten_args(args);
    let expected = segments
        .iter()
        .filter(|v| matches!(v, Segment::Positional))
        .count();
    if expected != args.len() {
        return Err(SluiceError::BindCountMismatch {
            expected,
            actual: args.len(),
        }
        .into());
    }
    let binds: HashMap<&str, &Bind> = binds.iter().map(|v| (v.name.as_str(), v)).collect();
    let mut used = HashSet::new();
    let mut sql = String::with_capacity(template.len() + args.len() * 4);
    let mut position = 0;
    for segment in &segments {
        match segment {
            Segment::Text(text) => sql.push_str(text),
            Segment::Positional => {
                position += 1;
                match strategy {
                    BindStrategy::InlineLiteral => {
                        writer.write_literal(&mut sql, &args[position - 1])?
                    }
                    BindStrategy::ParameterMarker => {
                        writer.write_parameter_marker(&mut sql, position)
                    }
                }
            }
            Segment::Named(name) => {
                let Some(bind) = binds.get(name) else {
                    return Err(SluiceError::UnboundPlaceholder(name.to_string()).into());
                };
                used.insert(*name);
                writer.write_bind_value(&mut sql, bind)?;
            }
        }
    }
    if let Some(name) = binds.keys().find(|v| !used.contains(*v)) {
        return Err(SluiceError::UnknownBind(name.to_string()).into());
    }
    Ok(Compiled {
        sql,
        args: match strategy {
            BindStrategy::InlineLiteral => Vec::new(),
            BindStrategy::ParameterMarker => args,
        },
    })
}
