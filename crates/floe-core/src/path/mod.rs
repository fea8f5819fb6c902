mod parse;


pub use parse::parse;

use crate::{
    error::{Error, ErrorKind, ErrorOrigin},
    key::{EntityKey, codec},
};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};
use thiserror::Error as ThisError;

///
/// PathSegment
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum PathSegment {
    Set(String),
    Key(EntityKey),
    Nav(String),
}

///
/// ResourcePath
///
/// Validated canonical resource address: exactly one leading entity set, an
/// optional key, then navigation hops each optionally keyed —
/// `EntitySet[(Key)][/NavProp[(Key)]]*`. A trailing key-less hop addresses
/// every entity related through that navigation property; a keyed hop
/// addresses one specific related entity.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ResourcePath {
    segments: Vec<PathSegment>,
}

impl ResourcePath {
    /// Address a whole entity set.
    #[must_use]
    pub fn collection(set: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Set(set.into())],
        }
    }

    /// Address one entity by key.
    #[must_use]
    pub fn entity(set: impl Into<String>, key: EntityKey) -> Self {
        Self {
            segments: vec![PathSegment::Set(set.into()), PathSegment::Key(key)],
        }
    }

    /// Append a key-less navigation hop.
    #[must_use]
    pub fn hop(mut self, nav: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Nav(nav.into()));
        self
    }

    /// Append a keyed navigation hop.
    #[must_use]
    pub fn hop_key(mut self, nav: impl Into<String>, key: EntityKey) -> Self {
        self.segments.push(PathSegment::Nav(nav.into()));
        self.segments.push(PathSegment::Key(key));
        self
    }

    /// Validate an arbitrary segment sequence against the shape invariant.
    pub fn try_from_segments(segments: Vec<PathSegment>) -> Result<Self, PathError> {
        check_shape(&segments)?;

        Ok(Self { segments })
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Name of the leading entity set segment.
    #[must_use]
    pub fn entity_set(&self) -> &str {
        match &self.segments[0] {
            PathSegment::Set(name) => name,
            // unreachable by construction; the invariant pins segment 0
            _ => "",
        }
    }

    /// Key directly following the entity set segment, if any.
    #[must_use]
    pub fn key(&self) -> Option<&EntityKey> {
        match self.segments.get(1) {
            Some(PathSegment::Key(key)) => Some(key),
            _ => None,
        }
    }

    /// Render the canonical textual form.
    #[must_use]
    pub fn build(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                PathSegment::Set(name) => out.push_str(name),
                PathSegment::Key(key) => {
                    let _ = write!(out, "({})", codec::encode(key));
                }
                PathSegment::Nav(name) => {
                    out.push('/');
                    out.push_str(name);
                }
            }
        }

        out
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

fn check_shape(segments: &[PathSegment]) -> Result<(), PathError> {
    if segments.is_empty() {
        return Err(PathError::Empty);
    }

    // segment 0 must be the entity set
    match &segments[0] {
        PathSegment::Set(name) if name.is_empty() => {
            return Err(PathError::EmptyName { position: 0 });
        }
        PathSegment::Set(_) => {}
        _ => return Err(PathError::MissingEntitySet),
    }

    let mut key_allowed = true;
    for (position, segment) in segments.iter().enumerate().skip(1) {
        match segment {
            PathSegment::Set(_) => return Err(PathError::UnexpectedSet { position }),

            PathSegment::Key(_) => {
                if !key_allowed {
                    return Err(PathError::UnexpectedKey { position });
                }
                key_allowed = false;
            }

            PathSegment::Nav(name) => {
                if name.is_empty() {
                    return Err(PathError::EmptyName { position });
                }
                key_allowed = true;
            }
        }
    }

    Ok(())
}

///
/// PathError
///
/// Shape-invariant violations; the invalid-path entry of the public
/// taxonomy.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PathError {
    #[error("empty path")]
    Empty,

    #[error("path must start with an entity set segment")]
    MissingEntitySet,

    #[error("entity set segment only allowed at position 0 (found at {position})")]
    UnexpectedSet { position: usize },

    #[error("key segment at position {position} must directly follow an entity set or navigation segment")]
    UnexpectedKey { position: usize },

    #[error("empty segment name at position {position}")]
    EmptyName { position: usize },

    #[error("malformed key suffix in segment '{segment}'")]
    MalformedKeySuffix { segment: String },
}

impl From<PathError> for Error {
    fn from(err: PathError) -> Self {
        Self::new(ErrorKind::InvalidPath, ErrorOrigin::Path, err.to_string())
    }
}
