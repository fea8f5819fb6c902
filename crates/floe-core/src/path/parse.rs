use crate::{
    error::Error,
    key::codec,
    model::EdmModel,
    path::{PathError, PathSegment, ResourcePath},
};

/// Parse a producer-side inbound path against the model.
///
/// Each key literal is decoded with the key shape of the entity type in
/// scope at that hop, so `Orders(1)/Lines(OrderId=1,LineNo=2)` resolves both
/// keys with their own shapes. The final hop may instead name a structural
/// property of the type in scope (scalar/complex property addressing).
/// Rebuilding the result yields the canonical input unchanged.
pub fn parse(text: &str, model: &EdmModel) -> Result<ResourcePath, Error> {
    let text = text.trim().trim_matches('/');
    if text.is_empty() {
        return Err(PathError::Empty.into());
    }

    let raw = split_segments(text);
    let mut segments = Vec::with_capacity(raw.len());
    let mut scope = None;

    for (position, raw_segment) in raw.iter().enumerate() {
        let (name, key_literal) = split_key_suffix(raw_segment)?;
        if name.is_empty() {
            return Err(PathError::EmptyName { position }.into());
        }

        if position == 0 {
            let ty = model.type_for_set(name)?;
            segments.push(PathSegment::Set(name.to_string()));

            if let Some(literal) = key_literal {
                let key = codec::decode(literal, &ty.key_shape())?;
                segments.push(PathSegment::Key(key));
            }

            scope = Some(ty);
            continue;
        }

        let Some(ty) = scope else {
            return Err(PathError::MissingEntitySet.into());
        };

        if let Some(nav) = ty.navigation(name) {
            segments.push(PathSegment::Nav(name.to_string()));

            let target = model.type_for_set(&nav.target_set)?;
            if let Some(literal) = key_literal {
                let key = codec::decode(literal, &target.key_shape())?;
                segments.push(PathSegment::Key(key));
            }

            scope = Some(target);
        } else if ty.property(name).is_some() && key_literal.is_none() && position == raw.len() - 1
        {
            // trailing structural-property hop
            segments.push(PathSegment::Nav(name.to_string()));
        } else {
            return Err(Error::unknown_navigation(&ty.qualified_name(), name));
        }
    }

    ResourcePath::try_from_segments(segments).map_err(Error::from)
}

/// Split on `/` outside quoted text, so keyed segments like
/// `Products('a/b')` stay whole.
fn split_segments(text: &str) -> Vec<&str> {
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
            b'/' if !in_quote => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    parts.push(&text[start..]);
    parts
}

/// Split `Name(KeyLiteral)` into name and literal; plain names pass through.
fn split_key_suffix(segment: &str) -> Result<(&str, Option<&str>), PathError> {
    let bytes = segment.as_bytes();
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
            b'(' if !in_quote => {
                let malformed = || PathError::MalformedKeySuffix {
                    segment: segment.to_string(),
                };

                let inner = segment[i..]
                    .strip_prefix('(')
                    .and_then(|rest| rest.strip_suffix(')'))
                    .ok_or_else(malformed)?;
                if inner.is_empty() {
                    return Err(malformed());
                }

                return Ok((&segment[..i], Some(inner)));
            }
            _ => {}
        }
        i += 1;
    }

    Ok((segment, None))
}
