use crate::{
    entity::{Entity, EntityRef},
    value::Value,
};
use serde::{Deserialize, Serialize};

///
/// Envelope
///
/// Closed, tagged result of every read and navigation operation. Callers
/// pattern-match on the variant; there is no common base type and no runtime
/// type probing. Envelopes are constructed per request, immutable once
/// built, and discarded after delivery.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum Envelope {
    Entity(Entity),
    Collection(EntityCollection),
    Property(PropertyValue),
    Links(Links),
}

impl Envelope {
    /// Variant label for diagnostics.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Entity(_) => "entity",
            Self::Collection(_) => "collection",
            Self::Property(_) => "property",
            Self::Links(_) => "links",
        }
    }

    #[must_use]
    pub fn into_entity(self) -> Option<Entity> {
        match self {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_collection(self) -> Option<EntityCollection> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_property(self) -> Option<PropertyValue> {
        match self {
            Self::Property(property) => Some(property),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_links(self) -> Option<Links> {
        match self {
            Self::Links(links) => Some(links),
            _ => None,
        }
    }
}

///
/// EntityCollection
///
/// Ordered entity sequence with an optional pre-paging total and an opaque
/// continuation token. The token must be treated as uninterpreted text.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct EntityCollection {
    pub entities: Vec<Entity>,
    pub inline_count: Option<u64>,
    pub next_token: Option<String>,
}

impl EntityCollection {
    #[must_use]
    pub const fn new(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            inline_count: None,
            next_token: None,
        }
    }

    #[must_use]
    pub const fn with_inline_count(mut self, count: u64) -> Self {
        self.inline_count = Some(count);
        self
    }

    #[must_use]
    pub fn with_next_token(mut self, token: impl Into<String>) -> Self {
        self.next_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }
}

///
/// PropertyValue
///
/// One named scalar or complex value addressed through an entity.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PropertyValue {
    pub name: String,
    pub value: Value,
}

impl PropertyValue {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

///
/// Links
///
/// Link-operation payload: one reference when the navigation property is
/// to-one, an ordered reference sequence otherwise.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Links {
    One(EntityRef),
    Many(Vec<EntityRef>),
}

impl Links {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(refs) => refs.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::EntityKey;

    #[test]
    fn envelope_tags_are_stable() {
        let entity = Envelope::Entity(Entity::new());
        let links = Envelope::Links(Links::Many(Vec::new()));

        assert_eq!(entity.tag(), "entity");
        assert_eq!(links.tag(), "links");
    }

    #[test]
    fn into_accessors_are_variant_exact() {
        let envelope = Envelope::Collection(EntityCollection::new(Vec::new()));

        assert!(envelope.clone().into_entity().is_none());
        assert!(envelope.into_collection().is_some());
    }

    #[test]
    fn links_len_counts_both_shapes() {
        let one = Links::One(EntityRef::new("Products", EntityKey::single(1_i64)));
        let many = Links::Many(Vec::new());

        assert_eq!(one.len(), 1);
        assert!(many.is_empty());
    }
}
