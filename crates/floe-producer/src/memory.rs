use crate::Producer;
use floe_core::{
    entity::{Entity, EntityRef},
    error::{Error, ErrorKind, ErrorOrigin},
    key::{EntityKey, KeyValue},
    model::{EdmModel, EntityTypeModel, NavigationModel},
    query::{Direction, QueryInfo},
    response::{EntityCollection, Envelope, Links, PropertyValue},
    value::{self, ScalarKind, Value},
};
use std::{
    collections::BTreeMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::debug;

/// Link table key: source set, source key, navigation property.
type LinkKey = (String, EntityKey, String);

///
/// MemoryProducer
///
/// Complete in-memory [`Producer`]: ordered per-set entity maps plus a
/// unidirectional link table. Intended as the test backbone and as a
/// reference for storage-backed implementations. All state sits behind one
/// `RwLock`, so a shared instance is safe to call from multiple threads and
/// `create_related` is atomic.
///
/// The opaque `$filter` constraint is not interpreted here; a query carrying
/// one fails `Unsupported` rather than being silently ignored. `$expand` is
/// accepted and ignored: related entities are reachable through links, never
/// inlined.
///

pub struct MemoryProducer {
    model: EdmModel,
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    sets: BTreeMap<String, BTreeMap<EntityKey, Entity>>,
    links: BTreeMap<LinkKey, Vec<EntityRef>>,
    next_id: BTreeMap<String, u64>,
}

impl MemoryProducer {
    #[must_use]
    pub fn new(model: EdmModel) -> Self {
        let mut state = State::default();
        for set in model.sets() {
            state.sets.insert(set.name.clone(), BTreeMap::new());
        }

        Self {
            model,
            state: RwLock::new(state),
        }
    }

    // --- lock plumbing ---

    fn read_state(&self) -> Result<RwLockReadGuard<'_, State>, Error> {
        self.state
            .read()
            .map_err(|_| Self::poisoned())
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, State>, Error> {
        self.state
            .write()
            .map_err(|_| Self::poisoned())
    }

    fn poisoned() -> Error {
        Error::new(
            ErrorKind::Internal,
            ErrorOrigin::Producer,
            "producer state lock poisoned",
        )
    }

    // --- entity helpers ---

    /// Reject undeclared properties, kind mismatches, and nulls in
    /// non-nullable slots.
    fn validate_properties(ty: &EntityTypeModel, entity: &Entity) -> Result<(), Error> {
        for (name, value) in entity.properties() {
            let Some(declared) = ty.property(name) else {
                return Err(Error::constraint_violation(
                    ErrorOrigin::Producer,
                    format!("undeclared property '{name}' on {}", ty.qualified_name()),
                ));
            };

            match value {
                Value::Null if declared.nullable => {}
                Value::Null => {
                    return Err(Error::constraint_violation(
                        ErrorOrigin::Producer,
                        format!("property '{name}' is not nullable"),
                    ));
                }
                v if v.matches(declared.kind) => {}
                _ => {
                    return Err(Error::constraint_violation(
                        ErrorOrigin::Producer,
                        format!("property '{name}' expects {}", declared.kind),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Validate an addressed key against the type's declared shape.
    fn check_key(ty: &EntityTypeModel, key: &EntityKey) -> Result<(), Error> {
        let shape = ty.key_shape();

        match key {
            EntityKey::Single(value) => shape.key_from_value(value.clone()).map(|_| ()),
            EntityKey::Composite(pairs) => shape.key_from_pairs(pairs.clone()).map(|_| ()),
        }
        .map_err(Error::from)
    }

    /// Value an unspecified property resets to under replace semantics.
    fn reset_value(declared_default: Option<&Value>, nullable: bool, kind: ScalarKind) -> Value {
        if let Some(default) = declared_default {
            default.clone()
        } else if nullable {
            Value::Null
        } else {
            kind.default_value()
        }
    }

    /// Create inside an already-held write lock, so `create_related` can
    /// link atomically.
    fn create_in(
        &self,
        state: &mut State,
        set: &str,
        entity: Entity,
    ) -> Result<Entity, Error> {
        let ty = self.model.type_for_set(set)?;
        Self::validate_properties(ty, &entity)?;

        let key = Self::resolve_create_key(state, ty, set, &entity)?;

        let mut stored = Entity::of(ty.qualified_name());
        for declared in &ty.properties {
            if declared.is_key {
                let Some(value) = key.property(&declared.name) else {
                    return Err(Error::new(
                        ErrorKind::Internal,
                        ErrorOrigin::Producer,
                        format!("resolved key lacks property '{}'", declared.name),
                    ));
                };
                stored.set_prop(declared.name.clone(), value.to_value());
            } else if let Some(value) = entity.get(&declared.name) {
                stored.set_prop(declared.name.clone(), value.clone());
            } else if let Some(default) = &declared.default {
                stored.set_prop(declared.name.clone(), default.clone());
            } else if declared.nullable {
                stored.set_prop(declared.name.clone(), Value::Null);
            } else {
                return Err(Error::constraint_violation(
                    ErrorOrigin::Producer,
                    format!("required property '{}' missing", declared.name),
                ));
            }
        }

        let rows = state
            .sets
            .entry(set.to_string())
            .or_default();
        if rows.contains_key(&key) {
            return Err(Error::constraint_violation(
                ErrorOrigin::Producer,
                format!("duplicate key: {set}({key})"),
            ));
        }

        rows.insert(key.clone(), stored.clone());
        debug!(set, key = %key, "entity created");

        Ok(stored)
    }

    /// Key supplied by the payload, or a generated one when the single
    /// integer key property was left out.
    fn resolve_create_key(
        state: &mut State,
        ty: &EntityTypeModel,
        set: &str,
        entity: &Entity,
    ) -> Result<EntityKey, Error> {
        let shape = ty.key_shape();

        let supplied = shape
            .properties()
            .iter()
            .all(|p| entity.get(&p.name).is_some_and(|v| !v.is_null()));
        if supplied {
            return ty.entity_key(entity).map_err(Error::from);
        }

        if shape.is_simple() {
            let declared = &shape.properties()[0];
            let generated = matches!(declared.kind, ScalarKind::Int | ScalarKind::Uint)
                && entity.get(&declared.name).is_none();

            if generated {
                let counter = state.next_id.entry(set.to_string()).or_insert(0);
                let rows = state.sets.entry(set.to_string()).or_default();

                loop {
                    *counter += 1;
                    let key = match declared.kind {
                        ScalarKind::Uint => EntityKey::Single(KeyValue::Uint(*counter)),
                        _ => EntityKey::Single(KeyValue::Int(i64::try_from(*counter).map_err(
                            |_| {
                                Error::new(
                                    ErrorKind::Internal,
                                    ErrorOrigin::Producer,
                                    "generated key overflow",
                                )
                            },
                        )?)),
                    };
                    if !rows.contains_key(&key) {
                        return Ok(key);
                    }
                }
            }
        }

        Err(Error::constraint_violation(
            ErrorOrigin::Producer,
            format!("entity for '{set}' is missing key properties"),
        ))
    }

    /// Project an entity down to the selected properties; unknown names are
    /// skipped, an empty selection keeps everything.
    fn project(entity: &Entity, selection: &[String]) -> Entity {
        if selection.is_empty() {
            return entity.clone();
        }

        let mut projected = match entity.type_name() {
            Some(name) => Entity::of(name),
            None => Entity::new(),
        };
        for name in selection {
            if let Some(value) = entity.get(name) {
                projected.set_prop(name.clone(), value.clone());
            }
        }

        projected
    }

    /// Apply ordering, paging, inline count, and projection. The constraint
    /// kinds compose: the count is taken before paging, projection after,
    /// so observable output does not depend on evaluation order.
    fn apply_query(
        mut entities: Vec<Entity>,
        query: &QueryInfo,
    ) -> Result<EntityCollection, Error> {
        if query.filter_text().is_some() {
            return Err(Error::unsupported(
                ErrorOrigin::Query,
                "filter expressions are not supported by the memory producer",
            ));
        }

        for order in query.ordering().iter().rev() {
            entities.sort_by(|a, b| {
                let left = a.get(&order.field).unwrap_or(&Value::Null);
                let right = b.get(&order.field).unwrap_or(&Value::Null);
                let ordering = value::compare(left, right);

                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        let total = entities.len() as u64;

        let skip = usize::try_from(query.skip_offset().unwrap_or(0)).unwrap_or(usize::MAX);
        let mut page: Vec<Entity> = entities.into_iter().skip(skip).collect();
        if let Some(top) = query.top_limit() {
            page.truncate(usize::try_from(top).unwrap_or(usize::MAX));
        }

        let projected = page
            .iter()
            .map(|e| Self::project(e, query.selection()))
            .collect();

        let mut collection = EntityCollection::new(projected);
        if query.wants_inline_count() {
            collection = collection.with_inline_count(total);
        }

        Ok(collection)
    }

    fn entity_in<'a>(
        state: &'a State,
        set: &str,
        key: &EntityKey,
    ) -> Result<&'a Entity, Error> {
        state
            .sets
            .get(set)
            .and_then(|rows| rows.get(key))
            .ok_or_else(|| Error::entity_not_found(set, key))
    }

    /// Current links of one navigation property.
    fn links_of(state: &State, set: &str, key: &EntityKey, nav: &str) -> Vec<EntityRef> {
        state
            .links
            .get(&(set.to_string(), key.clone(), nav.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Validate a link source against model and store, returning the
    /// navigation declaration.
    fn check_link_source<'a>(
        &'a self,
        state: &State,
        source: &EntityRef,
        nav: &str,
    ) -> Result<&'a NavigationModel, Error> {
        let nav_model = self.model.resolve_navigation(&source.entity_set, nav)?;
        Self::check_key(self.model.type_for_set(&source.entity_set)?, &source.key)?;
        Self::entity_in(state, &source.entity_set, &source.key)?;

        Ok(nav_model)
    }

    /// Validate a link target against the navigation declaration and store.
    fn check_link_target(
        state: &State,
        nav_model: &NavigationModel,
        target: &EntityRef,
    ) -> Result<(), Error> {
        if target.entity_set != nav_model.target_set {
            return Err(Error::constraint_violation(
                ErrorOrigin::Producer,
                format!(
                    "link target must live in '{}', found '{}'",
                    nav_model.target_set, target.entity_set
                ),
            ));
        }
        Self::entity_in(state, &target.entity_set, &target.key)?;

        Ok(())
    }

    fn incomplete_link_address(nav: &str) -> Error {
        Error::new(
            ErrorKind::InvalidPath,
            ErrorOrigin::Producer,
            format!("link operation on collection-valued '{nav}' requires a target key"),
        )
    }

    fn spurious_link_key(nav: &str) -> Error {
        Error::new(
            ErrorKind::InvalidPath,
            ErrorOrigin::Producer,
            format!("link operation on to-one '{nav}' does not take a target key"),
        )
    }
}

impl Producer for MemoryProducer {
    fn metadata(&self) -> &EdmModel {
        &self.model
    }

    fn get_entities(&self, set: &str, query: &QueryInfo) -> Result<EntityCollection, Error> {
        self.model.entity_set(set)?;
        let state = self.read_state()?;

        let entities: Vec<Entity> = state
            .sets
            .get(set)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default();
        debug!(set, count = entities.len(), "entities read");

        Self::apply_query(entities, query)
    }

    fn get_entity(&self, set: &str, key: &EntityKey, query: &QueryInfo) -> Result<Entity, Error> {
        Self::check_key(self.model.type_for_set(set)?, key)?;
        let state = self.read_state()?;

        let entity = Self::entity_in(&state, set, key)?;

        Ok(Self::project(entity, query.selection()))
    }

    fn get_nav_property(
        &self,
        set: &str,
        key: &EntityKey,
        nav: &str,
        query: &QueryInfo,
    ) -> Result<Envelope, Error> {
        let ty = self.model.type_for_set(set)?;
        Self::check_key(ty, key)?;
        let state = self.read_state()?;
        let source = Self::entity_in(&state, set, key)?;

        // structural property addressing
        if ty.property(nav).is_some() {
            let value = source.get(nav).cloned().unwrap_or(Value::Null);
            return Ok(Envelope::Property(PropertyValue::new(nav, value)));
        }

        let Some(nav_model) = ty.navigation(nav) else {
            return Err(Error::unknown_navigation(&ty.qualified_name(), nav));
        };

        let links = Self::links_of(&state, set, key, nav);

        if nav_model.multiplicity.is_single() {
            let Some(target) = links.first() else {
                return Err(Error::new(
                    ErrorKind::EntityNotFound,
                    ErrorOrigin::Producer,
                    format!("no '{nav}' entity linked from {set}({key})"),
                ));
            };
            let entity = Self::entity_in(&state, &target.entity_set, &target.key)?;

            return Ok(Envelope::Entity(Self::project(entity, query.selection())));
        }

        let mut targets = Vec::with_capacity(links.len());
        for target in &links {
            targets.push(Self::entity_in(&state, &target.entity_set, &target.key)?.clone());
        }

        Self::apply_query(targets, query).map(Envelope::Collection)
    }

    fn create_entity(&self, set: &str, entity: Entity) -> Result<Entity, Error> {
        let mut state = self.write_state()?;

        self.create_in(&mut state, set, entity)
    }

    fn create_related(
        &self,
        set: &str,
        key: &EntityKey,
        nav: &str,
        entity: Entity,
    ) -> Result<Entity, Error> {
        let mut state = self.write_state()?;

        let nav_model = self.model.resolve_navigation(set, nav)?;
        Self::check_key(self.model.type_for_set(set)?, key)?;
        Self::entity_in(&state, set, key)?;

        // to-one occupancy is checked before creating, so a failure leaves
        // no half-created entity behind
        if nav_model.multiplicity.is_single()
            && !Self::links_of(&state, set, key, nav).is_empty()
        {
            return Err(Error::constraint_violation(
                ErrorOrigin::Producer,
                format!("to-one navigation '{nav}' is already linked"),
            ));
        }

        let target_set = nav_model.target_set.clone();
        let created = self.create_in(&mut state, &target_set, entity)?;

        let target_ty = self.model.type_for_set(&target_set)?;
        let created_key = target_ty.entity_key(&created)?;
        let target_ref =
            EntityRef::new(target_set, created_key).with_type(target_ty.qualified_name());

        state
            .links
            .entry((set.to_string(), key.clone(), nav.to_string()))
            .or_default()
            .push(target_ref);
        debug!(set, key = %key, nav, "entity created and linked");

        Ok(created)
    }

    fn delete_entity(&self, set: &str, key: &EntityKey) -> Result<(), Error> {
        Self::check_key(self.model.type_for_set(set)?, key)?;
        let mut state = self.write_state()?;

        let removed = state
            .sets
            .get_mut(set)
            .and_then(|rows| rows.remove(key));
        if removed.is_none() {
            return Err(Error::entity_not_found(set, key));
        }

        // drop the entity's own link rows and any links pointing at it
        state
            .links
            .retain(|(source_set, source_key, _), _| {
                !(source_set == set && source_key == key)
            });
        for targets in state.links.values_mut() {
            targets.retain(|target| !(target.entity_set == set && target.key == *key));
        }
        debug!(set, key = %key, "entity deleted");

        Ok(())
    }

    fn merge_entity(&self, set: &str, entity: Entity) -> Result<(), Error> {
        let ty = self.model.type_for_set(set)?;
        Self::validate_properties(ty, &entity)?;
        let key = ty.entity_key(&entity)?;

        let mut state = self.write_state()?;
        let rows = state
            .sets
            .get_mut(set)
            .ok_or_else(|| Error::entity_not_found(set, &key))?;
        let Some(existing) = rows.get_mut(&key) else {
            return Err(Error::entity_not_found(set, &key));
        };

        for declared in &ty.properties {
            if declared.is_key {
                continue;
            }
            if let Some(value) = entity.get(&declared.name) {
                existing.set_prop(declared.name.clone(), value.clone());
            }
        }
        debug!(set, key = %key, "entity merged");

        Ok(())
    }

    fn update_entity(&self, set: &str, entity: Entity) -> Result<(), Error> {
        let ty = self.model.type_for_set(set)?;
        Self::validate_properties(ty, &entity)?;
        let key = ty.entity_key(&entity)?;

        let mut state = self.write_state()?;
        let rows = state
            .sets
            .get_mut(set)
            .ok_or_else(|| Error::entity_not_found(set, &key))?;
        let Some(existing) = rows.get_mut(&key) else {
            return Err(Error::entity_not_found(set, &key));
        };

        let mut replaced = Entity::of(ty.qualified_name());
        for declared in &ty.properties {
            let value = if declared.is_key {
                existing.get(&declared.name).cloned().unwrap_or(Value::Null)
            } else if let Some(value) = entity.get(&declared.name) {
                value.clone()
            } else {
                Self::reset_value(declared.default.as_ref(), declared.nullable, declared.kind)
            };
            replaced.set_prop(declared.name.clone(), value);
        }

        *existing = replaced;
        debug!(set, key = %key, "entity updated");

        Ok(())
    }

    fn get_links(&self, source: &EntityRef, nav: &str) -> Result<Links, Error> {
        let state = self.read_state()?;
        let nav_model = self.check_link_source(&state, source, nav)?;

        let links = Self::links_of(&state, &source.entity_set, &source.key, nav);

        if nav_model.multiplicity.is_single() {
            let Some(target) = links.into_iter().next() else {
                return Err(Error::link_not_found(
                    &source.entity_set,
                    &source.key,
                    nav,
                ));
            };

            return Ok(Links::One(target));
        }

        Ok(Links::Many(links))
    }

    fn create_link(&self, source: &EntityRef, nav: &str, target: &EntityRef) -> Result<(), Error> {
        let mut state = self.write_state()?;
        let nav_model = self.check_link_source(&state, source, nav)?;
        Self::check_link_target(&state, nav_model, target)?;

        let existing = Self::links_of(&state, &source.entity_set, &source.key, nav);
        if nav_model.multiplicity.is_single() && !existing.is_empty() {
            return Err(Error::constraint_violation(
                ErrorOrigin::Producer,
                format!("to-one navigation '{nav}' is already linked"),
            ));
        }
        if existing.iter().any(|r| r.same_entity(target)) {
            return Err(Error::constraint_violation(
                ErrorOrigin::Producer,
                format!("link to {target} already exists"),
            ));
        }

        state
            .links
            .entry((source.entity_set.clone(), source.key.clone(), nav.to_string()))
            .or_default()
            .push(target.clone());
        debug!(source = %source, nav, target = %target, "link created");

        Ok(())
    }

    fn update_link(
        &self,
        source: &EntityRef,
        nav: &str,
        old_target_key: Option<&EntityKey>,
        target: &EntityRef,
    ) -> Result<(), Error> {
        let mut state = self.write_state()?;
        let nav_model = self.check_link_source(&state, source, nav)?;
        Self::check_link_target(&state, nav_model, target)?;

        let link_key = (
            source.entity_set.clone(),
            source.key.clone(),
            nav.to_string(),
        );

        if nav_model.multiplicity.is_single() {
            if old_target_key.is_some() {
                return Err(Self::spurious_link_key(nav));
            }

            let Some(targets) = state.links.get_mut(&link_key) else {
                return Err(Error::link_not_found(&source.entity_set, &source.key, nav));
            };
            if targets.is_empty() {
                return Err(Error::link_not_found(&source.entity_set, &source.key, nav));
            }

            targets.clear();
            targets.push(target.clone());
        } else {
            let Some(old_key) = old_target_key else {
                return Err(Self::incomplete_link_address(nav));
            };

            let targets = state.links.entry(link_key).or_default();
            let Some(slot) = targets.iter_mut().find(|r| r.key == *old_key) else {
                return Err(Error::link_not_found(&source.entity_set, &source.key, nav));
            };

            *slot = target.clone();
        }
        debug!(source = %source, nav, target = %target, "link updated");

        Ok(())
    }

    fn delete_link(
        &self,
        source: &EntityRef,
        nav: &str,
        target_key: Option<&EntityKey>,
    ) -> Result<(), Error> {
        let mut state = self.write_state()?;
        let nav_model = self.check_link_source(&state, source, nav)?;

        let link_key = (
            source.entity_set.clone(),
            source.key.clone(),
            nav.to_string(),
        );

        if nav_model.multiplicity.is_single() {
            if target_key.is_some() {
                return Err(Self::spurious_link_key(nav));
            }

            let had_link = state
                .links
                .get_mut(&link_key)
                .is_some_and(|targets| !std::mem::take(targets).is_empty());
            if !had_link {
                return Err(Error::link_not_found(&source.entity_set, &source.key, nav));
            }
        } else {
            let Some(key) = target_key else {
                return Err(Self::incomplete_link_address(nav));
            };

            let removed = state.links.get_mut(&link_key).is_some_and(|targets| {
                let before = targets.len();
                targets.retain(|r| r.key != *key);
                targets.len() < before
            });
            if !removed {
                return Err(Error::link_not_found(&source.entity_set, &source.key, nav));
            }
        }
        debug!(source = %source, nav, "link deleted");

        Ok(())
    }
}
