use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///
/// Addressing failures (malformed key, invalid path) are raised at the call
/// site, before any transport or storage call. Transport failures are
/// propagated with their own kind, never reinterpreted.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    // --- canonical constructors ---

    #[must_use]
    pub fn unknown_entity_set(name: &str) -> Self {
        Self::new(
            ErrorKind::UnknownEntitySet,
            ErrorOrigin::Model,
            format!("unknown entity set: '{name}'"),
        )
    }

    #[must_use]
    pub fn unknown_navigation(type_name: &str, nav: &str) -> Self {
        Self::new(
            ErrorKind::UnknownNavigationProperty,
            ErrorOrigin::Model,
            format!("unknown navigation property '{nav}' on {type_name}"),
        )
    }

    #[must_use]
    pub fn entity_not_found(set: &str, key: &dyn fmt::Display) -> Self {
        Self::new(
            ErrorKind::EntityNotFound,
            ErrorOrigin::Producer,
            format!("entity not found: {set}({key})"),
        )
    }

    #[must_use]
    pub fn link_not_found(set: &str, key: &dyn fmt::Display, nav: &str) -> Self {
        Self::new(
            ErrorKind::LinkNotFound,
            ErrorOrigin::Producer,
            format!("link not found: {set}({key})/{nav}"),
        )
    }

    pub fn constraint_violation(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConstraintViolation, origin, message)
    }

    pub fn unsupported(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, origin, message)
    }

    pub fn transport(kind: TransportKind, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport(kind), ErrorOrigin::Transport, message)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::EntityNotFound | ErrorKind::LinkNotFound
        )
    }

    #[must_use]
    pub fn display_with_origin(&self) -> String {
        format!("{}: {}", self.origin, self.message)
    }
}

///
/// ErrorKind
/// Closed failure taxonomy shared by producer and consumer. Consumer-side
/// callers see the same kinds whether a failure originated locally or was
/// mapped from a transport status.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// Key text does not parse per the declared shape.
    MalformedKey,

    /// Segment sequence violates the canonical path grammar.
    InvalidPath,

    UnknownEntitySet,
    UnknownNavigationProperty,
    EntityNotFound,
    LinkNotFound,

    /// Uniqueness, required-property, or type rule violated on write.
    ConstraintViolation,

    /// Valid request for a feature this producer does not implement.
    Unsupported,

    /// Transport-reported failure, propagated distinctly.
    Transport(TransportKind),

    /// The caller cannot remediate this.
    Internal,
}

///
/// TransportKind
/// Distinct transport failure classes; cancellation and timeout are never
/// folded into a generic failure.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum TransportKind {
    #[display("cancelled")]
    Cancelled,

    #[display("connection")]
    Connection,

    #[display("payload")]
    Payload,

    #[display("protocol")]
    Protocol,

    #[display("timeout")]
    Timeout,
}

///
/// ErrorOrigin
/// Where in the layer the failure was detected.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    #[display("consumer")]
    Consumer,

    #[display("key")]
    Key,

    #[display("model")]
    Model,

    #[display("path")]
    Path,

    #[display("producer")]
    Producer,

    #[display("query")]
    Query,

    #[display("transport")]
    Transport,
}
