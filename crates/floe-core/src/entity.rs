use crate::{key::EntityKey, path::ResourcePath, value::Value};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

///
/// Entity
///
/// Per-request property bag with an optional fully-qualified type name.
/// Properties are held in name order, so textual renderings are
/// deterministic. Entities are built, delivered, and discarded — nothing in
/// this layer survives across requests.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Entity {
    type_name: Option<String>,
    properties: BTreeMap<String, Value>,
}

impl Entity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn of(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            properties: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn set_prop(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    #[must_use]
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

///
/// EntityRef
///
/// Stable identity of one entity: set name, key, and an optional qualified
/// type name. Identity only — an `EntityRef` never carries property data;
/// its canonical form is the single-hop path `Set(Key)`.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct EntityRef {
    pub entity_set: String,
    pub key: EntityKey,
    pub type_name: Option<String>,
}

impl EntityRef {
    #[must_use]
    pub fn new(entity_set: impl Into<String>, key: EntityKey) -> Self {
        Self {
            entity_set: entity_set.into(),
            key,
            type_name: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Set + key identity, ignoring the optional type annotation.
    #[must_use]
    pub fn same_entity(&self, other: &Self) -> bool {
        self.entity_set == other.entity_set && self.key == other.key
    }

    #[must_use]
    pub fn to_path(&self) -> ResourcePath {
        ResourcePath::entity(self.entity_set.clone(), self.key.clone())
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.entity_set, self.key)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_order_is_canonical() {
        let entity = Entity::new().prop("b", 2_i64).prop("a", 1_i64);
        let names: Vec<&str> = entity.properties().map(|(n, _)| n).collect();

        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn entity_ref_renders_single_hop_path() {
        let entity_ref = EntityRef::new("Products", EntityKey::single(1_i64));

        assert_eq!(entity_ref.to_string(), "Products(1)");
        assert_eq!(entity_ref.to_path().build(), "Products(1)");
    }

    #[test]
    fn same_entity_ignores_type_annotation() {
        let plain = EntityRef::new("Products", EntityKey::single(1_i64));
        let typed = EntityRef::new("Products", EntityKey::single(1_i64)).with_type("Shop.Product");

        assert!(plain.same_entity(&typed));
        assert_ne!(plain, typed);
    }
}
