//! Textual codec for entity keys.
//!
//! A simple key encodes as one literal: quoted with apostrophe-doubling when
//! the declared type is textual, bare when numeric or boolean, and a
//! `datetime'…'` form for timestamps. A composite key encodes as
//! `Name1=Value1,Name2=Value2` in declared-property order, each value
//! quoted per its own type. The scheme is reversible:
//! `decode(encode(k), shape) == k` for every valid key.

use crate::{
    key::{EntityKey, KeyError, KeyShape, KeyValue},
    value::{ScalarKind, Timestamp},
};
use std::fmt::Write;

const DATETIME_OPEN: &str = "datetime'";

/// Encode a key into its canonical path-segment literal.
#[must_use]
pub fn encode(key: &EntityKey) -> String {
    match key {
        EntityKey::Single(value) => encode_value(value),
        EntityKey::Composite(pairs) => {
            let mut out = String::new();
            for (i, (name, value)) in pairs.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{name}={}", encode_value(value));
            }

            out
        }
    }
}

/// Encode one key value into its literal form.
#[must_use]
pub fn encode_value(value: &KeyValue) -> String {
    match value {
        KeyValue::Bool(v) => v.to_string(),
        KeyValue::Int(v) => v.to_string(),
        KeyValue::Uint(v) => v.to_string(),
        KeyValue::Text(v) => quote(v),
        KeyValue::Timestamp(v) => format!("{DATETIME_OPEN}{}'", v.to_rfc3339()),
    }
}

/// Decode a path-segment literal against the declared key shape.
///
/// A composite-looking literal is rejected when the shape is simple and
/// vice versa; property names, kinds, and multiplicity are all checked.
pub fn decode(text: &str, shape: &KeyShape) -> Result<EntityKey, KeyError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(KeyError::Empty);
    }

    let parts = split_top_level(text)?;
    let named = parts.iter().any(|p| find_unquoted(p, b'=').is_some());

    if parts.len() == 1 && !named {
        if !shape.is_simple() {
            return Err(KeyError::ExpectedComposite {
                expected: shape.len(),
            });
        }

        let value = decode_value(parts[0], shape.properties()[0].kind)?;
        return Ok(EntityKey::Single(value));
    }

    if shape.is_simple() {
        return Err(KeyError::ExpectedSimple);
    }

    let mut pairs = Vec::with_capacity(parts.len());
    for part in parts {
        let Some(idx) = find_unquoted(part, b'=') else {
            return Err(KeyError::UnnamedComponent {
                literal: part.to_string(),
            });
        };

        let name = part[..idx].trim();
        let literal = part[idx + 1..].trim();

        let Some(declared) = shape.property(name) else {
            return Err(KeyError::UnknownProperty {
                name: name.to_string(),
            });
        };

        let value = decode_value(literal, declared.kind).map_err(|err| match err {
            KeyError::InvalidLiteral { .. } | KeyError::Empty => KeyError::TypeMismatch {
                name: name.to_string(),
                expected: declared.kind,
                literal: literal.to_string(),
            },
            other => other,
        })?;

        pairs.push((name.to_string(), value));
    }

    shape.key_from_pairs(pairs)
}

fn decode_value(literal: &str, kind: ScalarKind) -> Result<KeyValue, KeyError> {
    let literal = literal.trim();
    if literal.is_empty() {
        return Err(KeyError::Empty);
    }

    let invalid = || KeyError::InvalidLiteral {
        kind,
        literal: literal.to_string(),
    };

    match kind {
        ScalarKind::Bool => match literal {
            "true" => Ok(KeyValue::Bool(true)),
            "false" => Ok(KeyValue::Bool(false)),
            _ => Err(invalid()),
        },

        ScalarKind::Int => literal.parse().map(KeyValue::Int).map_err(|_| invalid()),

        ScalarKind::Uint => literal.parse().map(KeyValue::Uint).map_err(|_| invalid()),

        ScalarKind::Text => unquote(literal),

        ScalarKind::Timestamp => {
            let inner = literal
                .strip_prefix(DATETIME_OPEN)
                .and_then(|rest| rest.strip_suffix('\''))
                .ok_or_else(invalid)?;

            Timestamp::parse_rfc3339(inner)
                .map(KeyValue::Timestamp)
                .map_err(|_| invalid())
        }

        ScalarKind::Float | ScalarKind::Binary => Err(invalid()),
    }
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for ch in text.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');

    out
}

fn unquote(literal: &str) -> Result<KeyValue, KeyError> {
    let invalid = || KeyError::InvalidLiteral {
        kind: ScalarKind::Text,
        literal: literal.to_string(),
    };

    let inner = literal
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .ok_or_else(invalid)?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\'' {
            match chars.next() {
                Some('\'') => out.push('\''),
                _ => return Err(invalid()),
            }
        } else {
            out.push(ch);
        }
    }

    Ok(KeyValue::Text(out))
}

/// Split a composite literal on top-level commas, honoring quoted text.
fn split_top_level(text: &str) -> Result<Vec<&str>, KeyError> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                if in_quote && bytes.get(i + 1) == Some(&b'\'') {
                    i += 1;
                } else {
                    in_quote = !in_quote;
                }
            }
            b',' if !in_quote => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    if in_quote {
        return Err(KeyError::UnterminatedQuote {
            literal: text.to_string(),
        });
    }

    parts.push(&text[start..]);
    Ok(parts)
}

/// Index of the first unquoted occurrence of `needle`, if any.
fn find_unquoted(text: &str, needle: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut in_quote = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                if in_quote && bytes.get(i + 1) == Some(&b'\'') {
                    i += 1;
                } else {
                    in_quote = !in_quote;
                }
            }
            b if b == needle && !in_quote => return Some(i),
            _ => {}
        }
        i += 1;
    }

    None
}
