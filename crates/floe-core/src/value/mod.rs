#[cfg(test)]
mod tests;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::BTreeMap, fmt};
use thiserror::Error as ThisError;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

///
/// Value
///
/// Scalar or complex property value carried by entities, property responses,
/// and write payloads. Constructed per request and never mutated in place.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
    Timestamp(Timestamp),
    Binary(Vec<u8>),
    Complex(BTreeMap<String, Value>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Scalar kind of this value, `None` for `Null` and `Complex`.
    #[must_use]
    pub const fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Self::Bool(_) => Some(ScalarKind::Bool),
            Self::Int(_) => Some(ScalarKind::Int),
            Self::Uint(_) => Some(ScalarKind::Uint),
            Self::Float(_) => Some(ScalarKind::Float),
            Self::Text(_) => Some(ScalarKind::Text),
            Self::Timestamp(_) => Some(ScalarKind::Timestamp),
            Self::Binary(_) => Some(ScalarKind::Binary),
            Self::Null | Self::Complex(_) => None,
        }
    }

    #[must_use]
    pub fn matches(&self, kind: ScalarKind) -> bool {
        self.scalar_kind() == Some(kind)
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Uint(_) => 3,
            Self::Float(_) => 4,
            Self::Text(_) => 5,
            Self::Timestamp(_) => 6,
            Self::Binary(_) => 7,
            Self::Complex(_) => 8,
        }
    }
}

/// Total ordering over values.
///
/// Same-kind values compare on content (floats via `total_cmp`); cross-kind
/// comparison falls back to a fixed variant rank so sorting is deterministic
/// over heterogeneous columns.
#[must_use]
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Uint(x), Value::Uint(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
        (Value::Binary(x), Value::Binary(y)) => x.cmp(y),

        _ => a.rank().cmp(&b.rank()),
    }
}

/// Implements `From<T> for Value` for simple conversions.
macro_rules! impl_from_value {
    ( $( $ty:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    }
}

impl_from_value! {
    bool => Bool,
    i8  => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8  => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
    f32 => Float,
    f64 => Float,
    &str => Text,
    String => Text,
    Timestamp => Timestamp,
    Vec<u8> => Binary,
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Self::Complex(v)
    }
}

///
/// ScalarKind
/// Declared scalar type of a property; answers textual-ness, key
/// eligibility, and the type default used by replace-update semantics.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum ScalarKind {
    Bool,
    Int,
    Uint,
    Float,
    Text,
    Timestamp,
    Binary,
}

impl ScalarKind {
    /// Textual kinds are quoted in key literals; the rest encode bare.
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::Text)
    }

    /// Kinds permitted in entity keys.
    #[must_use]
    pub const fn is_key_eligible(self) -> bool {
        !matches!(self, Self::Float | Self::Binary)
    }

    #[must_use]
    pub fn default_value(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Int => Value::Int(0),
            Self::Uint => Value::Uint(0),
            Self::Float => Value::Float(0.0),
            Self::Text => Value::Text(String::new()),
            Self::Timestamp => Value::Timestamp(Timestamp::EPOCH),
            Self::Binary => Value::Binary(Vec::new()),
        }
    }
}

///
/// Timestamp
///
/// UTC instant with second precision; canonical textual form is RFC 3339.
/// Stored seconds are clamped to the RFC 3339-representable year range at
/// construction, so formatting cannot fail later.
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const EPOCH: Self = Self(0);

    /// 9999-12-31T23:59:59Z
    pub const MAX_SECONDS: i64 = 253_402_300_799;

    /// 0000-01-01T00:00:00Z
    pub const MIN_SECONDS: i64 = -62_167_219_200;

    const EPOCH_TEXT: &'static str = "1970-01-01T00:00:00Z";

    #[must_use]
    pub const fn from_seconds(secs: i64) -> Self {
        if secs < Self::MIN_SECONDS {
            Self(Self::MIN_SECONDS)
        } else if secs > Self::MAX_SECONDS {
            Self(Self::MAX_SECONDS)
        } else {
            Self(secs)
        }
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn to_rfc3339(self) -> String {
        OffsetDateTime::from_unix_timestamp(self.0)
            .ok()
            .and_then(|dt| dt.format(&Rfc3339).ok())
            .unwrap_or_else(|| Self::EPOCH_TEXT.to_string())
    }

    pub fn parse_rfc3339(text: &str) -> Result<Self, TimestampParseError> {
        let dt = OffsetDateTime::parse(text, &Rfc3339).map_err(|_| TimestampParseError {
            text: text.to_string(),
        })?;

        Ok(Self::from_seconds(dt.unix_timestamp()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

///
/// TimestampParseError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("invalid RFC 3339 timestamp: '{text}'")]
pub struct TimestampParseError {
    pub text: String,
}
