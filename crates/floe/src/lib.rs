//! ## Crate layout
//! - `core`: protocol vocabulary — values, keys and their codec, paths,
//!   query constraints, entities, response envelopes, the EDM model, and
//!   the shared error taxonomy.
//! - `producer`: the server-side operation surface, route helper, and the
//!   in-memory producer.
//! - `consumer`: the client-side request executor and its transport and
//!   wire-codec boundaries.
//!
//! The `prelude` module mirrors the vocabulary both sides share.

pub use floe_consumer as consumer;
pub use floe_core as core;
pub use floe_producer as producer;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::prelude::*;

    pub use crate::{
        consumer::{Consumer, Transport as _, TransportError, TransportRequest, TransportResponse},
        producer::{MemoryProducer, Producer as _, RouteBody, RouteOutcome},
    };
}
