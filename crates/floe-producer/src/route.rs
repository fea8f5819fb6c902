use crate::Producer;
use floe_core::{
    entity::{Entity, EntityRef},
    error::{Error, ErrorKind, ErrorOrigin},
    key::{EntityKey, codec},
    method::Method,
    path::{self, PathSegment, ResourcePath},
    query::QueryInfo,
    response::Envelope,
};
use tracing::debug;

const LINKS_INFIX: &str = "/$links/";

///
/// RouteBody
/// Normalized request payload: entity for writes, reference for link
/// mutation, nothing for reads and deletes.
///

#[derive(Clone, Debug, PartialEq)]
pub enum RouteBody {
    None,
    Entity(Entity),
    Ref(EntityRef),
}

///
/// RouteOutcome
///

#[derive(Clone, Debug, PartialEq)]
pub enum RouteOutcome {
    Envelope(Envelope),
    Created(Entity),
    NoContent,
}

/// Route one inbound request onto the producer surface.
///
/// The host's dispatch layer owns raw-request concerns: URL decoding and
/// parsing the query string into [`QueryInfo`] happen before this call.
/// `$links` addressing is split off here; everything else goes through the
/// canonical path grammar.
pub fn route(
    producer: &dyn Producer,
    method: Method,
    path_text: &str,
    query: &QueryInfo,
    body: RouteBody,
) -> Result<RouteOutcome, Error> {
    debug!(%method, path = path_text, "routing request");

    if let Some((source, rest)) = path_text.split_once(LINKS_INFIX) {
        return route_links(producer, method, source, rest, body);
    }

    let parsed = path::parse(path_text, producer.metadata())?;

    match method {
        Method::Get => route_get(producer, &parsed, query).map(RouteOutcome::Envelope),
        Method::Post => route_post(producer, &parsed, body),
        Method::Put | Method::Merge => route_write(producer, method, &parsed, body),
        Method::Delete => route_delete(producer, &parsed),
    }
}

fn route_get(
    producer: &dyn Producer,
    parsed: &ResourcePath,
    query: &QueryInfo,
) -> Result<Envelope, Error> {
    let segments = parsed.segments();
    let set = parsed.entity_set();

    match (segments.len(), parsed.key()) {
        (1, None) => {
            return producer.get_entities(set, query).map(Envelope::Collection);
        }
        (2, Some(key)) => {
            return producer.get_entity(set, key, query).map(Envelope::Entity);
        }
        (_, Some(_)) => {}
        (_, None) => {
            return Err(navigation_from_collection(set));
        }
    }

    walk_chain(producer, parsed, query)
}

/// Resolve a navigation chain hop by hop.
///
/// Every hop but the last must pin a single entity: either the hop carries a
/// key, or the navigation is to-one. The final hop is delegated to
/// `get_nav_property` (key-less) or `get_entity` (keyed, after a membership
/// check against the collection).
fn walk_chain(
    producer: &dyn Producer,
    parsed: &ResourcePath,
    query: &QueryInfo,
) -> Result<Envelope, Error> {
    let model = producer.metadata();
    let segments = parsed.segments();

    let mut current_set = parsed.entity_set().to_string();
    let mut current_key = match parsed.key() {
        Some(key) => key.clone(),
        None => return Err(navigation_from_collection(&current_set)),
    };

    let mut index = 2;
    while index < segments.len() {
        let PathSegment::Nav(nav) = &segments[index] else {
            return Err(Error::new(
                ErrorKind::Internal,
                ErrorOrigin::Path,
                "navigation chain lost its shape",
            ));
        };

        let hop_key = match segments.get(index + 1) {
            Some(PathSegment::Key(key)) => Some(key),
            _ => None,
        };
        let is_last = index + hop_key.map_or(1, |_| 2) == segments.len();

        if is_last {
            return match hop_key {
                None => producer.get_nav_property(&current_set, &current_key, nav, query),
                Some(key) => {
                    let target_set =
                        resolve_member(producer, &current_set, &current_key, nav, key)?;

                    producer.get_entity(&target_set, key, query).map(Envelope::Entity)
                }
            };
        }

        // middle hop: must resolve to exactly one entity
        let nav_model = model.resolve_navigation(&current_set, nav)?;
        let target_set = nav_model.target_set.clone();

        match hop_key {
            Some(key) => {
                resolve_member(producer, &current_set, &current_key, nav, key)?;
                current_key = key.clone();
            }
            None => {
                if !nav_model.multiplicity.is_single() {
                    return Err(Error::new(
                        ErrorKind::InvalidPath,
                        ErrorOrigin::Path,
                        format!("navigation chain continues past unkeyed collection '{nav}'"),
                    ));
                }

                let envelope = producer.get_nav_property(
                    &current_set,
                    &current_key,
                    nav,
                    &QueryInfo::new(),
                )?;
                let Some(entity) = envelope.into_entity() else {
                    return Err(Error::new(
                        ErrorKind::Internal,
                        ErrorOrigin::Producer,
                        format!("to-one navigation '{nav}' did not yield an entity"),
                    ));
                };

                let target_ty = model.type_for_set(&target_set)?;
                current_key = target_ty.entity_key(&entity)?;
            }
        }

        current_set = target_set;
        index += hop_key.map_or(1, |_| 2);
    }

    Err(Error::new(
        ErrorKind::Internal,
        ErrorOrigin::Path,
        "navigation chain ended without a terminal hop",
    ))
}

/// Verify that `key` is a member of the navigation's current target
/// collection, returning the target set name.
fn resolve_member(
    producer: &dyn Producer,
    set: &str,
    source_key: &EntityKey,
    nav: &str,
    key: &EntityKey,
) -> Result<String, Error> {
    let model = producer.metadata();
    let nav_model = model.resolve_navigation(set, nav)?;
    let target_set = nav_model.target_set.clone();
    let target_ty = model.type_for_set(&target_set)?;

    let envelope = producer.get_nav_property(set, source_key, nav, &QueryInfo::new())?;

    let member = match envelope {
        Envelope::Collection(collection) => collection
            .entities
            .iter()
            .any(|entity| target_ty.entity_key(entity).as_ref() == Ok(key)),
        Envelope::Entity(entity) => target_ty.entity_key(&entity)? == *key,
        _ => false,
    };

    if member {
        Ok(target_set)
    } else {
        Err(Error::entity_not_found(&target_set, key))
    }
}

fn route_post(
    producer: &dyn Producer,
    parsed: &ResourcePath,
    body: RouteBody,
) -> Result<RouteOutcome, Error> {
    let RouteBody::Entity(entity) = body else {
        return Err(entity_body_required());
    };

    let segments = parsed.segments();
    match (segments.len(), parsed.key()) {
        (1, None) => producer
            .create_entity(parsed.entity_set(), entity)
            .map(RouteOutcome::Created),

        (3, Some(key)) => {
            let PathSegment::Nav(nav) = &segments[2] else {
                return Err(unroutable(parsed));
            };

            producer
                .create_related(parsed.entity_set(), key, nav, entity)
                .map(RouteOutcome::Created)
        }

        _ => Err(unroutable(parsed)),
    }
}

fn route_write(
    producer: &dyn Producer,
    method: Method,
    parsed: &ResourcePath,
    body: RouteBody,
) -> Result<RouteOutcome, Error> {
    let RouteBody::Entity(mut entity) = body else {
        return Err(entity_body_required());
    };

    let (2, Some(key)) = (parsed.segments().len(), parsed.key()) else {
        return Err(unroutable(parsed));
    };
    let set = parsed.entity_set();

    // the addressed key is authoritative; inject it over the payload
    let ty = producer.metadata().type_for_set(set)?;
    for declared in ty.key_shape().properties() {
        let Some(value) = key.property(&declared.name) else {
            return Err(codec_shape_mismatch(set, key));
        };
        entity.set_prop(declared.name.clone(), value.to_value());
    }

    match method {
        Method::Merge => producer.merge_entity(set, entity)?,
        _ => producer.update_entity(set, entity)?,
    }

    Ok(RouteOutcome::NoContent)
}

fn route_delete(producer: &dyn Producer, parsed: &ResourcePath) -> Result<RouteOutcome, Error> {
    let (2, Some(key)) = (parsed.segments().len(), parsed.key()) else {
        return Err(unroutable(parsed));
    };

    producer.delete_entity(parsed.entity_set(), key)?;

    Ok(RouteOutcome::NoContent)
}

fn route_links(
    producer: &dyn Producer,
    method: Method,
    source_text: &str,
    rest: &str,
    body: RouteBody,
) -> Result<RouteOutcome, Error> {
    let model = producer.metadata();

    let source_path = path::parse(source_text, model)?;
    let (2, Some(source_key)) = (source_path.segments().len(), source_path.key()) else {
        return Err(Error::new(
            ErrorKind::InvalidPath,
            ErrorOrigin::Path,
            format!("link source must address one entity: '{source_text}'"),
        ));
    };
    let source = EntityRef::new(source_path.entity_set(), source_key.clone());

    // `Nav` or `Nav(Key)` after the $links infix
    let (nav, target_key) = match rest.find('(') {
        None => (rest, None),
        Some(open) => {
            let Some(literal) = rest[open..]
                .strip_prefix('(')
                .and_then(|inner| inner.strip_suffix(')'))
            else {
                return Err(Error::new(
                    ErrorKind::InvalidPath,
                    ErrorOrigin::Path,
                    format!("malformed link segment: '{rest}'"),
                ));
            };

            let nav = &rest[..open];
            let nav_model = model.resolve_navigation(&source.entity_set, nav)?;
            let target_ty = model.type_for_set(&nav_model.target_set)?;
            let key = codec::decode(literal, &target_ty.key_shape())?;

            (nav, Some(key))
        }
    };

    match method {
        Method::Get => {
            if target_key.is_some() {
                return Err(Error::new(
                    ErrorKind::InvalidPath,
                    ErrorOrigin::Path,
                    "link reads address the whole link set",
                ));
            }

            producer
                .get_links(&source, nav)
                .map(|links| RouteOutcome::Envelope(Envelope::Links(links)))
        }

        Method::Post => {
            let RouteBody::Ref(target) = body else {
                return Err(ref_body_required());
            };

            producer.create_link(&source, nav, &target)?;
            Ok(RouteOutcome::NoContent)
        }

        Method::Put => {
            let RouteBody::Ref(target) = body else {
                return Err(ref_body_required());
            };

            producer.update_link(&source, nav, target_key.as_ref(), &target)?;
            Ok(RouteOutcome::NoContent)
        }

        Method::Delete => {
            producer.delete_link(&source, nav, target_key.as_ref())?;
            Ok(RouteOutcome::NoContent)
        }

        Method::Merge => Err(Error::unsupported(
            ErrorOrigin::Producer,
            "MERGE is not defined for link resources",
        )),
    }
}

// --- error helpers ---

fn navigation_from_collection(set: &str) -> Error {
    Error::new(
        ErrorKind::InvalidPath,
        ErrorOrigin::Path,
        format!("navigation requires a keyed entity, '{set}' addresses a collection"),
    )
}

fn entity_body_required() -> Error {
    Error::constraint_violation(ErrorOrigin::Producer, "entity body required")
}

fn ref_body_required() -> Error {
    Error::constraint_violation(ErrorOrigin::Producer, "entity reference body required")
}

fn unroutable(parsed: &ResourcePath) -> Error {
    Error::new(
        ErrorKind::InvalidPath,
        ErrorOrigin::Path,
        format!("no operation routes to '{parsed}'"),
    )
}

fn codec_shape_mismatch(set: &str, key: &EntityKey) -> Error {
    Error::new(
        ErrorKind::MalformedKey,
        ErrorOrigin::Key,
        format!("key {key} does not match the key shape of '{set}'"),
    )
}
