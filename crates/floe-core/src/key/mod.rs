pub mod codec;

#[cfg(test)]
mod tests;

use crate::{
    error::{Error, ErrorKind, ErrorOrigin},
    value::{ScalarKind, Timestamp, Value},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

///
/// KeyValue
///
/// Typed scalar permitted inside an entity key. A deliberate subset of
/// [`Value`]: key values are totally ordered, hashable, and never null.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum KeyValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Timestamp(Timestamp),
    Uint(u64),
}

impl KeyValue {
    #[must_use]
    pub const fn kind(&self) -> ScalarKind {
        match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::Int(_) => ScalarKind::Int,
            Self::Text(_) => ScalarKind::Text,
            Self::Timestamp(_) => ScalarKind::Timestamp,
            Self::Uint(_) => ScalarKind::Uint,
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Bool(v) => Value::Bool(*v),
            Self::Int(v) => Value::Int(*v),
            Self::Text(v) => Value::Text(v.clone()),
            Self::Timestamp(v) => Value::Timestamp(*v),
            Self::Uint(v) => Value::Uint(*v),
        }
    }

    /// Narrow a property value into a key value, `None` when the value is
    /// null, complex, or of a kind keys do not permit.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(Self::Bool(*v)),
            Value::Int(v) => Some(Self::Int(*v)),
            Value::Text(v) => Some(Self::Text(v.clone())),
            Value::Timestamp(v) => Some(Self::Timestamp(*v)),
            Value::Uint(v) => Some(Self::Uint(*v)),
            _ => None,
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&codec::encode_value(self))
    }
}

/// Implements `From<T> for KeyValue` for simple conversions.
macro_rules! impl_from_key_value {
    ( $( $ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$ty> for KeyValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    }
}

impl_from_key_value! {
    bool => Bool,
    i8  => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8  => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
    &str => Text,
    String => Text,
    Timestamp => Timestamp,
}

///
/// EntityKey
///
/// A single typed scalar or a composite name→value mapping. Composite pairs
/// are held in declared-property order; the [`KeyShape`] canonicalizes them
/// at construction, so stored-form equality is order-independent with
/// respect to the order the caller supplied properties in.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum EntityKey {
    Single(KeyValue),
    Composite(Vec<(String, KeyValue)>),
}

impl EntityKey {
    #[must_use]
    pub fn single(value: impl Into<KeyValue>) -> Self {
        Self::Single(value.into())
    }

    #[must_use]
    pub const fn is_composite(&self) -> bool {
        matches!(self, Self::Composite(_))
    }

    #[must_use]
    pub const fn as_single(&self) -> Option<&KeyValue> {
        match self {
            Self::Single(v) => Some(v),
            Self::Composite(_) => None,
        }
    }

    /// Value of a named key property; a simple key answers any name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&KeyValue> {
        match self {
            Self::Single(v) => Some(v),
            Self::Composite(pairs) => pairs.iter().find(|(n, _)| n == name).map(|(_, v)| v),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&codec::encode(self))
    }
}

impl From<KeyValue> for EntityKey {
    fn from(v: KeyValue) -> Self {
        Self::Single(v)
    }
}

///
/// KeyProperty
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct KeyProperty {
    pub name: String,
    pub kind: ScalarKind,
}

///
/// KeyShape
///
/// Decode and construction hint: the declared key properties of an entity
/// type, in declaration order. One property means a simple key.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct KeyShape {
    properties: Vec<KeyProperty>,
}

impl KeyShape {
    #[must_use]
    pub const fn new(properties: Vec<KeyProperty>) -> Self {
        Self { properties }
    }

    #[must_use]
    pub fn simple(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            properties: vec![KeyProperty {
                name: name.into(),
                kind,
            }],
        }
    }

    #[must_use]
    pub fn is_simple(&self) -> bool {
        self.properties.len() == 1
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    #[must_use]
    pub fn properties(&self) -> &[KeyProperty] {
        &self.properties
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&KeyProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Build a key from caller-supplied pairs, canonicalizing into
    /// declaration order. Every declared property must appear exactly once
    /// with a matching kind.
    pub fn key_from_pairs(
        &self,
        pairs: Vec<(String, KeyValue)>,
    ) -> Result<EntityKey, KeyError> {
        for (name, _) in &pairs {
            if self.property(name).is_none() {
                return Err(KeyError::UnknownProperty { name: name.clone() });
            }
        }

        for (i, (name, _)) in pairs.iter().enumerate() {
            if pairs[..i].iter().any(|(n, _)| n == name) {
                return Err(KeyError::DuplicateProperty { name: name.clone() });
            }
        }

        let mut ordered = Vec::with_capacity(self.properties.len());
        for declared in &self.properties {
            let Some((_, value)) = pairs.iter().find(|(n, _)| *n == declared.name) else {
                return Err(KeyError::MissingProperty {
                    name: declared.name.clone(),
                });
            };

            if value.kind() != declared.kind {
                return Err(KeyError::TypeMismatch {
                    name: declared.name.clone(),
                    expected: declared.kind,
                    literal: value.to_string(),
                });
            }

            ordered.push((declared.name.clone(), value.clone()));
        }

        if ordered.len() == 1 {
            let (_, value) = ordered.remove(0);
            Ok(EntityKey::Single(value))
        } else {
            Ok(EntityKey::Composite(ordered))
        }
    }

    /// Build a simple key from one value.
    pub fn key_from_value(&self, value: KeyValue) -> Result<EntityKey, KeyError> {
        if !self.is_simple() {
            return Err(KeyError::ExpectedComposite {
                expected: self.len(),
            });
        }

        let declared = &self.properties[0];
        if value.kind() != declared.kind {
            return Err(KeyError::TypeMismatch {
                name: declared.name.clone(),
                expected: declared.kind,
                literal: value.to_string(),
            });
        }

        Ok(EntityKey::Single(value))
    }
}

///
/// KeyError
///
/// Failures while constructing or decoding an entity key. This is the
/// malformed-key entry of the public taxonomy.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum KeyError {
    #[error("empty key literal")]
    Empty,

    #[error("expected a simple key, found a composite literal")]
    ExpectedSimple,

    #[error("expected a composite key with {expected} properties, found a simple literal")]
    ExpectedComposite { expected: usize },

    #[error("composite key component has no property name: '{literal}'")]
    UnnamedComponent { literal: String },

    #[error("unknown key property: '{name}'")]
    UnknownProperty { name: String },

    #[error("duplicate key property: '{name}'")]
    DuplicateProperty { name: String },

    #[error("missing key property: '{name}'")]
    MissingProperty { name: String },

    #[error("key property '{name}' expects {expected}, found '{literal}'")]
    TypeMismatch {
        name: String,
        expected: ScalarKind,
        literal: String,
    },

    #[error("unterminated quoted literal: {literal}")]
    UnterminatedQuote { literal: String },

    #[error("invalid {kind} literal: '{literal}'")]
    InvalidLiteral { kind: ScalarKind, literal: String },
}

impl From<KeyError> for Error {
    fn from(err: KeyError) -> Self {
        Self::new(ErrorKind::MalformedKey, ErrorOrigin::Key, err.to_string())
    }
}
