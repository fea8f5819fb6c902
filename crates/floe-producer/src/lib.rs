//! Server-side operation surface of the floe protocol: the [`Producer`]
//! capability trait, the dispatch-boundary [`route`] helper, the metadata
//! rendering boundary, and a complete in-memory producer.

mod memory;
mod route;


pub use memory::MemoryProducer;
pub use route::{RouteBody, RouteOutcome, route};

use floe_core::{
    entity::{Entity, EntityRef},
    error::Error,
    key::EntityKey,
    model::EdmModel,
    query::QueryInfo,
    response::{EntityCollection, Envelope, Links},
};

///
/// Producer
///
/// Server-side capability surface. Every backing store implements this trait
/// independently; there is no shared base. An implementation holds its own
/// [`EdmModel`], so multiple producers never interfere.
///
/// Each operation is an independent transaction from the caller's point of
/// view. Data failures (`EntityNotFound`, `ConstraintViolation`,
/// `LinkNotFound`) are typed results, never control flow through panics.
///

pub trait Producer: Send + Sync {
    /// Service metadata for this producer instance.
    fn metadata(&self) -> &EdmModel;

    /// All entities of a set, constrained by the query.
    fn get_entities(&self, set: &str, query: &QueryInfo) -> Result<EntityCollection, Error>;

    /// One entity by key; honors select and expand constraints.
    fn get_entity(&self, set: &str, key: &EntityKey, query: &QueryInfo) -> Result<Entity, Error>;

    /// Follow a navigation or structural property from one entity.
    ///
    /// The envelope variant is fixed by the declared target: a to-one
    /// navigation never yields a collection, a key-less to-many navigation
    /// never yields a bare entity, a structural property yields a property
    /// value.
    fn get_nav_property(
        &self,
        set: &str,
        key: &EntityKey,
        nav: &str,
        query: &QueryInfo,
    ) -> Result<Envelope, Error>;

    /// Create an entity; the result is the entity as persisted, including
    /// any server-generated key and filled defaults.
    fn create_entity(&self, set: &str, entity: Entity) -> Result<Entity, Error>;

    /// Create an entity and establish the navigation link from an existing
    /// entity atomically.
    fn create_related(
        &self,
        set: &str,
        key: &EntityKey,
        nav: &str,
        entity: Entity,
    ) -> Result<Entity, Error>;

    fn delete_entity(&self, set: &str, key: &EntityKey) -> Result<(), Error>;

    /// Merge semantics: only the properties present on the payload change;
    /// the payload carries its key properties.
    fn merge_entity(&self, set: &str, entity: Entity) -> Result<(), Error>;

    /// Update semantics: all non-key properties are replaced; unspecified
    /// ones reset to their declared or type default.
    fn update_entity(&self, set: &str, entity: Entity) -> Result<(), Error>;

    /// Current links of a navigation property: one reference for a to-one
    /// property, a reference collection otherwise.
    fn get_links(&self, source: &EntityRef, nav: &str) -> Result<Links, Error>;

    fn create_link(
        &self,
        source: &EntityRef,
        nav: &str,
        target: &EntityRef,
    ) -> Result<(), Error>;

    /// Replace one link. On a collection-valued property the old target key
    /// is required and must match an existing link; on a to-one property it
    /// must be absent.
    fn update_link(
        &self,
        source: &EntityRef,
        nav: &str,
        old_target_key: Option<&EntityKey>,
        target: &EntityRef,
    ) -> Result<(), Error>;

    /// Remove one link. The target key is required on a collection-valued
    /// property and must be absent on a to-one property.
    fn delete_link(
        &self,
        source: &EntityRef,
        nav: &str,
        target_key: Option<&EntityKey>,
    ) -> Result<(), Error>;

    /// Release producer resources. Default: nothing to release.
    fn close(&self) {}
}

///
/// MetadataWriter
///
/// Rendering boundary for the metadata document. The producer side supplies
/// the model; the writer owns the serialization format. This layer never
/// serializes the model itself.
///

pub trait MetadataWriter {
    fn render(&self, model: &EdmModel) -> Result<String, Error>;
}
