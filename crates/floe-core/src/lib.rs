//! Core vocabulary for the floe protocol layer: property values, entity keys
//! and their textual codec, resource paths, query constraints, entities and
//! entity references, response envelopes, and the EDM metadata model shared
//! by producer and consumer.

pub mod entity;
pub mod error;
pub mod key;
pub mod method;
pub mod model;
pub mod path;
pub mod query;
pub mod response;
pub mod value;

pub use error::{Error, ErrorKind, ErrorOrigin, TransportKind};
pub use key::{EntityKey, KeyShape, KeyValue};
pub use value::{ScalarKind, Timestamp, Value};

///
/// Prelude
///
/// Domain vocabulary only. Codecs, builders, and boundary helpers are
/// imported from their modules.
///

pub mod prelude {
    pub use crate::{
        entity::{Entity, EntityRef},
        error::{Error, ErrorKind, ErrorOrigin, TransportKind},
        key::{EntityKey, KeyShape, KeyValue},
        method::Method,
        model::{EdmModel, Multiplicity},
        path::{PathSegment, ResourcePath},
        query::{Direction, QueryInfo},
        response::{EntityCollection, Envelope, Links, PropertyValue},
        value::{ScalarKind, Timestamp, Value},
    };
}
