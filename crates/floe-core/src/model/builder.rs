use crate::{
    error::{Error, ErrorKind, ErrorOrigin},
    model::{EdmModel, EntitySetModel, EntityTypeModel},
};
use thiserror::Error as ThisError;

///
/// EdmModelBuilder
///
/// Collects entity types and sets, then validates the whole model at once:
/// names are unique, every set's type and every navigation target resolve,
/// every type carries at least one key-eligible key property.
///

#[derive(Debug, Default)]
pub struct EdmModelBuilder {
    namespace: String,
    types: Vec<EntityTypeModel>,
    sets: Vec<EntitySetModel>,
}

impl EdmModelBuilder {
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            types: Vec::new(),
            sets: Vec::new(),
        }
    }

    #[must_use]
    pub fn entity_type(mut self, ty: EntityTypeModel) -> Self {
        self.types.push(ty);
        self
    }

    #[must_use]
    pub fn entity_set(mut self, name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        self.sets.push(EntitySetModel {
            name: name.into(),
            entity_type: entity_type.into(),
        });
        self
    }

    pub fn build(self) -> Result<EdmModel, ModelError> {
        for (i, ty) in self.types.iter().enumerate() {
            if self.types[..i].iter().any(|t| t.name == ty.name) {
                return Err(ModelError::DuplicateType {
                    name: ty.name.clone(),
                });
            }

            validate_type(ty)?;
        }

        for (i, set) in self.sets.iter().enumerate() {
            if self.sets[..i].iter().any(|s| s.name == set.name) {
                return Err(ModelError::DuplicateSet {
                    name: set.name.clone(),
                });
            }

            if !self.types.iter().any(|t| t.name == set.entity_type) {
                return Err(ModelError::UnknownSetType {
                    set: set.name.clone(),
                    entity_type: set.entity_type.clone(),
                });
            }
        }

        for ty in &self.types {
            for nav in &ty.navigations {
                if !self.sets.iter().any(|s| s.name == nav.target_set) {
                    return Err(ModelError::UnknownNavigationTarget {
                        type_name: ty.name.clone(),
                        nav: nav.name.clone(),
                        target_set: nav.target_set.clone(),
                    });
                }
            }
        }

        Ok(EdmModel::from_parts(self.namespace, self.types, self.sets))
    }
}

fn validate_type(ty: &EntityTypeModel) -> Result<(), ModelError> {
    for (i, prop) in ty.properties.iter().enumerate() {
        if ty.properties[..i].iter().any(|p| p.name == prop.name) {
            return Err(ModelError::DuplicateProperty {
                type_name: ty.name.clone(),
                name: prop.name.clone(),
            });
        }

        if prop.is_key && !prop.kind.is_key_eligible() {
            return Err(ModelError::KeyKindNotAllowed {
                type_name: ty.name.clone(),
                name: prop.name.clone(),
                kind: prop.kind,
            });
        }

        if let Some(default) = &prop.default
            && !default.matches(prop.kind)
        {
            return Err(ModelError::DefaultKindMismatch {
                type_name: ty.name.clone(),
                name: prop.name.clone(),
                kind: prop.kind,
            });
        }
    }

    for (i, nav) in ty.navigations.iter().enumerate() {
        if ty.navigations[..i].iter().any(|n| n.name == nav.name)
            || ty.properties.iter().any(|p| p.name == nav.name)
        {
            return Err(ModelError::DuplicateProperty {
                type_name: ty.name.clone(),
                name: nav.name.clone(),
            });
        }
    }

    if ty.key_properties().next().is_none() {
        return Err(ModelError::NoKeyProperties {
            type_name: ty.name.clone(),
        });
    }

    Ok(())
}

///
/// ModelError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ModelError {
    #[error("duplicate entity type: '{name}'")]
    DuplicateType { name: String },

    #[error("duplicate entity set: '{name}'")]
    DuplicateSet { name: String },

    #[error("duplicate property '{name}' on type '{type_name}'")]
    DuplicateProperty { type_name: String, name: String },

    #[error("entity set '{set}' references unknown type '{entity_type}'")]
    UnknownSetType { set: String, entity_type: String },

    #[error("navigation '{nav}' on type '{type_name}' targets unknown set '{target_set}'")]
    UnknownNavigationTarget {
        type_name: String,
        nav: String,
        target_set: String,
    },

    #[error("entity type '{type_name}' declares no key properties")]
    NoKeyProperties { type_name: String },

    #[error("key property '{name}' on type '{type_name}' has non-key kind {kind}")]
    KeyKindNotAllowed {
        type_name: String,
        name: String,
        kind: crate::value::ScalarKind,
    },

    #[error("default for property '{name}' on type '{type_name}' does not match kind {kind}")]
    DefaultKindMismatch {
        type_name: String,
        name: String,
        kind: crate::value::ScalarKind,
    },
}

impl From<ModelError> for Error {
    fn from(err: ModelError) -> Self {
        Self::new(ErrorKind::Internal, ErrorOrigin::Model, err.to_string())
    }
}
