mod builder;

#[cfg(test)]
mod tests;

pub use builder::{EdmModelBuilder, ModelError};

use crate::{
    entity::Entity,
    error::{Error, ErrorKind, ErrorOrigin},
    key::{EntityKey, KeyError, KeyProperty, KeyShape, KeyValue},
    value::{ScalarKind, Value},
};
use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// Multiplicity
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum Multiplicity {
    #[display("1")]
    One,

    #[display("0..1")]
    ZeroOrOne,

    #[display("*")]
    Many,
}

impl Multiplicity {
    #[must_use]
    pub const fn is_single(self) -> bool {
        !matches!(self, Self::Many)
    }
}

///
/// PropertyModel
/// Declared structural property of an entity type.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PropertyModel {
    pub name: String,
    pub kind: ScalarKind,
    pub nullable: bool,
    pub is_key: bool,

    /// Declared default, used when writes leave the property unspecified.
    pub default: Option<Value>,
}

///
/// NavigationModel
/// Declared navigation property: target set plus multiplicity.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NavigationModel {
    pub name: String,
    pub target_set: String,
    pub multiplicity: Multiplicity,
}

///
/// EntityTypeModel
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EntityTypeModel {
    pub namespace: String,
    pub name: String,
    pub properties: Vec<PropertyModel>,
    pub navigations: Vec<NavigationModel>,
}

impl EntityTypeModel {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            properties: Vec::new(),
            navigations: Vec::new(),
        }
    }

    // --- construction (consuming, builder-style) ---

    /// Declare a key property (non-nullable).
    #[must_use]
    pub fn with_key(mut self, name: impl Into<String>, kind: ScalarKind) -> Self {
        self.properties.push(PropertyModel {
            name: name.into(),
            kind,
            nullable: false,
            is_key: true,
            default: None,
        });
        self
    }

    /// Declare a required structural property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, kind: ScalarKind) -> Self {
        self.properties.push(PropertyModel {
            name: name.into(),
            kind,
            nullable: false,
            is_key: false,
            default: None,
        });
        self
    }

    /// Declare a nullable structural property.
    #[must_use]
    pub fn with_nullable(mut self, name: impl Into<String>, kind: ScalarKind) -> Self {
        self.properties.push(PropertyModel {
            name: name.into(),
            kind,
            nullable: true,
            is_key: false,
            default: None,
        });
        self
    }

    /// Declare a property with an explicit default value.
    #[must_use]
    pub fn with_default(
        mut self,
        name: impl Into<String>,
        kind: ScalarKind,
        default: impl Into<Value>,
    ) -> Self {
        self.properties.push(PropertyModel {
            name: name.into(),
            kind,
            nullable: false,
            is_key: false,
            default: Some(default.into()),
        });
        self
    }

    /// Declare a navigation property.
    #[must_use]
    pub fn with_navigation(
        mut self,
        name: impl Into<String>,
        target_set: impl Into<String>,
        multiplicity: Multiplicity,
    ) -> Self {
        self.navigations.push(NavigationModel {
            name: name.into(),
            target_set: target_set.into(),
            multiplicity,
        });
        self
    }

    // --- lookups ---

    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyModel> {
        self.properties.iter().find(|p| p.name == name)
    }

    #[must_use]
    pub fn navigation(&self, name: &str) -> Option<&NavigationModel> {
        self.navigations.iter().find(|n| n.name == name)
    }

    pub fn key_properties(&self) -> impl Iterator<Item = &PropertyModel> {
        self.properties.iter().filter(|p| p.is_key)
    }

    /// Extract an entity's key from its own key properties.
    ///
    /// Write payloads carry their key this way; a missing or mistyped key
    /// property is a malformed key, not a constraint violation.
    pub fn entity_key(&self, entity: &Entity) -> Result<EntityKey, KeyError> {
        let shape = self.key_shape();
        let mut pairs = Vec::with_capacity(shape.len());

        for declared in shape.properties() {
            let value = entity
                .get(&declared.name)
                .and_then(KeyValue::from_value)
                .ok_or_else(|| KeyError::MissingProperty {
                    name: declared.name.clone(),
                })?;

            pairs.push((declared.name.clone(), value));
        }

        shape.key_from_pairs(pairs)
    }

    /// Key shape in declaration order.
    #[must_use]
    pub fn key_shape(&self) -> KeyShape {
        KeyShape::new(
            self.key_properties()
                .map(|p| KeyProperty {
                    name: p.name.clone(),
                    kind: p.kind,
                })
                .collect(),
        )
    }
}

///
/// EntitySetModel
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntitySetModel {
    pub name: String,
    pub entity_type: String,
}

///
/// EdmModel
///
/// Per-instance service metadata. Each producer and consumer holds its own
/// model; there is no process-wide registry, so instances never interfere.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EdmModel {
    pub namespace: String,
    types: Vec<EntityTypeModel>,
    sets: Vec<EntitySetModel>,
}

impl EdmModel {
    pub(crate) const fn from_parts(
        namespace: String,
        types: Vec<EntityTypeModel>,
        sets: Vec<EntitySetModel>,
    ) -> Self {
        Self {
            namespace,
            types,
            sets,
        }
    }

    #[must_use]
    pub fn builder(namespace: impl Into<String>) -> EdmModelBuilder {
        EdmModelBuilder::new(namespace)
    }

    #[must_use]
    pub fn sets(&self) -> &[EntitySetModel] {
        &self.sets
    }

    #[must_use]
    pub fn types(&self) -> &[EntityTypeModel] {
        &self.types
    }

    pub fn entity_set(&self, name: &str) -> Result<&EntitySetModel, Error> {
        self.sets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::unknown_entity_set(name))
    }

    #[must_use]
    pub fn entity_type(&self, name: &str) -> Option<&EntityTypeModel> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Entity type backing a named set. The builder guarantees resolution;
    /// a miss past that point is an internal fault, not a caller error.
    pub fn type_for_set(&self, set_name: &str) -> Result<&EntityTypeModel, Error> {
        let set = self.entity_set(set_name)?;

        self.entity_type(&set.entity_type).ok_or_else(|| {
            Error::new(
                ErrorKind::Internal,
                ErrorOrigin::Model,
                format!(
                    "entity set '{set_name}' references missing type '{}'",
                    set.entity_type
                ),
            )
        })
    }

    /// Resolve a navigation property declared on a set's entity type.
    pub fn resolve_navigation(
        &self,
        set_name: &str,
        nav: &str,
    ) -> Result<&NavigationModel, Error> {
        let ty = self.type_for_set(set_name)?;

        ty.navigation(nav)
            .ok_or_else(|| Error::unknown_navigation(&ty.qualified_name(), nav))
    }
}
