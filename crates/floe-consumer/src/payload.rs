//! JSON wire codec, v2-shaped: response documents arrive under a `d`
//! wrapper, collections as `{"results": [..], "__count", "__next"}`, links
//! as `uri` objects, and entities carry their qualified type under
//! `__metadata`. Timestamps travel as RFC 3339 text, binary as byte arrays.

use floe_core::{
    entity::{Entity, EntityRef},
    error::{Error, ErrorKind, ErrorOrigin, TransportKind},
    model::{EdmModel, EntityTypeModel},
    path,
    response::{EntityCollection, Links, PropertyValue},
    value::{ScalarKind, Timestamp, Value},
};
use serde_json::{Map, Number, json};
use std::collections::BTreeMap;

const METADATA: &str = "__metadata";
const COUNT: &str = "__count";
const NEXT: &str = "__next";
const RESULTS: &str = "results";
const URI: &str = "uri";
const WRAPPER: &str = "d";

fn payload_error(message: impl Into<String>) -> Error {
    Error::new(
        ErrorKind::Transport(TransportKind::Payload),
        ErrorOrigin::Consumer,
        message.into(),
    )
}

// ------------------------------------------------------------------
// Encoding
// ------------------------------------------------------------------

/// Request-body form of an entity: a bare property object.
#[must_use]
pub fn encode_entity(entity: &Entity) -> String {
    entity_to_json(entity).to_string()
}

/// Request-body form of an entity reference.
#[must_use]
pub fn encode_ref(service_root: &str, target: &EntityRef) -> String {
    json!({ URI: ref_uri(service_root, target) }).to_string()
}

/// Response document for a single entity.
#[must_use]
pub fn encode_entity_document(entity: &Entity) -> String {
    json!({ WRAPPER: entity_to_json(entity) }).to_string()
}

/// Response document for an entity collection.
#[must_use]
pub fn encode_collection_document(collection: &EntityCollection) -> String {
    let mut inner = Map::new();
    inner.insert(
        RESULTS.to_string(),
        serde_json::Value::Array(collection.iter().map(entity_to_json).collect()),
    );
    if let Some(count) = collection.inline_count {
        inner.insert(COUNT.to_string(), json!(count.to_string()));
    }
    if let Some(token) = &collection.next_token {
        inner.insert(NEXT.to_string(), json!(token));
    }

    json!({ WRAPPER: inner }).to_string()
}

/// Response document for one named property.
#[must_use]
pub fn encode_property_document(property: &PropertyValue) -> String {
    json!({ WRAPPER: { property.name.clone(): value_to_json(&property.value) } }).to_string()
}

/// Response document for a link set.
#[must_use]
pub fn encode_links_document(service_root: &str, links: &Links) -> String {
    let inner = match links {
        Links::One(target) => json!({ URI: ref_uri(service_root, target) }),
        Links::Many(targets) => json!({
            RESULTS: targets
                .iter()
                .map(|target| json!({ URI: ref_uri(service_root, target) }))
                .collect::<Vec<_>>()
        }),
    };

    json!({ WRAPPER: inner }).to_string()
}

fn ref_uri(service_root: &str, target: &EntityRef) -> String {
    format!("{service_root}{}", target.to_path().build())
}

fn entity_to_json(entity: &Entity) -> serde_json::Value {
    let mut object = Map::new();
    if let Some(type_name) = entity.type_name() {
        object.insert(METADATA.to_string(), json!({ "type": type_name }));
    }
    for (name, value) in entity.properties() {
        object.insert(name.to_string(), value_to_json(value));
    }

    serde_json::Value::Object(object)
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(v) => json!(v),
        Value::Int(v) => json!(v),
        Value::Uint(v) => json!(v),
        Value::Float(v) => Number::from_f64(*v)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::Text(v) => json!(v),
        Value::Timestamp(v) => json!(v.to_rfc3339()),
        Value::Binary(v) => serde_json::Value::Array(v.iter().map(|b| json!(b)).collect()),
        Value::Complex(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

// ------------------------------------------------------------------
// Decoding
// ------------------------------------------------------------------

/// Decode a single-entity document against its declared type.
pub fn decode_entity(body: &str, ty: &EntityTypeModel) -> Result<Entity, Error> {
    let root = parse_document(body)?;

    entity_from_json(&root, ty)
}

/// Decode a collection document; a bare array is tolerated.
pub fn decode_collection(body: &str, ty: &EntityTypeModel) -> Result<EntityCollection, Error> {
    let root = parse_document(body)?;

    let (rows, count, next) = match &root {
        serde_json::Value::Array(rows) => (rows, None, None),
        serde_json::Value::Object(object) => {
            let Some(serde_json::Value::Array(rows)) = object.get(RESULTS) else {
                return Err(payload_error("collection document has no results array"));
            };

            let count = match object.get(COUNT) {
                None => None,
                Some(serde_json::Value::String(text)) => Some(
                    text.parse::<u64>()
                        .map_err(|_| payload_error(format!("bad {COUNT}: '{text}'")))?,
                ),
                Some(serde_json::Value::Number(n)) => n.as_u64(),
                Some(_) => return Err(payload_error(format!("bad {COUNT} value"))),
            };
            let next = match object.get(NEXT) {
                Some(serde_json::Value::String(token)) => Some(token.clone()),
                _ => None,
            };

            (rows, count, next)
        }
        _ => return Err(payload_error("collection document is not an object")),
    };

    let mut entities = Vec::with_capacity(rows.len());
    for row in rows {
        entities.push(entity_from_json(row, ty)?);
    }

    let mut collection = EntityCollection::new(entities);
    if let Some(count) = count {
        collection = collection.with_inline_count(count);
    }
    if let Some(token) = next {
        collection = collection.with_next_token(token);
    }

    Ok(collection)
}

/// Decode a one-property document.
pub fn decode_property(
    body: &str,
    name: &str,
    ty: &EntityTypeModel,
) -> Result<PropertyValue, Error> {
    let root = parse_document(body)?;
    let serde_json::Value::Object(object) = &root else {
        return Err(payload_error("property document is not an object"));
    };

    let Some(raw) = object.get(name) else {
        return Err(payload_error(format!("property document lacks '{name}'")));
    };

    let kind = ty.property(name).map(|p| p.kind);
    let value = json_to_value(raw, kind)?;

    Ok(PropertyValue::new(name, value))
}

/// Decode a link document into references, resolving each `uri` against the
/// service root and model.
pub fn decode_links(
    body: &str,
    service_root: &str,
    model: &EdmModel,
    single: bool,
) -> Result<Links, Error> {
    let root = parse_document(body)?;
    let serde_json::Value::Object(object) = &root else {
        return Err(payload_error("link document is not an object"));
    };

    if single {
        let Some(serde_json::Value::String(uri)) = object.get(URI) else {
            return Err(payload_error("link document lacks a uri"));
        };

        return Ok(Links::One(ref_from_uri(uri, service_root, model)?));
    }

    let Some(serde_json::Value::Array(rows)) = object.get(RESULTS) else {
        return Err(payload_error("link document has no results array"));
    };

    let mut refs = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(serde_json::Value::String(uri)) = row.get(URI) else {
            return Err(payload_error("link entry lacks a uri"));
        };
        refs.push(ref_from_uri(uri, service_root, model)?);
    }

    Ok(Links::Many(refs))
}

/// Resolve a link uri (absolute or service-relative) into a reference.
fn ref_from_uri(uri: &str, service_root: &str, model: &EdmModel) -> Result<EntityRef, Error> {
    let relative = uri.strip_prefix(service_root).unwrap_or(uri);

    let parsed = path::parse(relative.trim_matches('/'), model)
        .map_err(|err| payload_error(format!("bad link uri '{uri}': {err}")))?;
    let Some(key) = parsed.key() else {
        return Err(payload_error(format!("link uri '{uri}' has no key")));
    };
    if parsed.segments().len() != 2 {
        return Err(payload_error(format!("link uri '{uri}' is not an entity address")));
    }

    let ty = model.type_for_set(parsed.entity_set())?;

    Ok(EntityRef::new(parsed.entity_set(), key.clone()).with_type(ty.qualified_name()))
}

fn parse_document(body: &str) -> Result<serde_json::Value, Error> {
    let mut root: serde_json::Value = serde_json::from_str(body)
        .map_err(|err| payload_error(format!("response body is not JSON: {err}")))?;

    // unwrap the v2 `d` envelope when present
    if let serde_json::Value::Object(object) = &mut root
        && object.len() == 1
        && object.contains_key(WRAPPER)
    {
        return object
            .remove(WRAPPER)
            .ok_or_else(|| payload_error("empty response wrapper"));
    }

    Ok(root)
}

fn entity_from_json(row: &serde_json::Value, ty: &EntityTypeModel) -> Result<Entity, Error> {
    let serde_json::Value::Object(object) = row else {
        return Err(payload_error("entity row is not an object"));
    };

    let type_name = object
        .get(METADATA)
        .and_then(|meta| meta.get("type"))
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| ty.qualified_name(), ToString::to_string);

    let mut entity = Entity::of(type_name);
    for (name, raw) in object {
        if name == METADATA {
            continue;
        }

        let kind = ty.property(name).map(|p| p.kind);
        entity.set_prop(name.clone(), json_to_value(raw, kind)?);
    }

    Ok(entity)
}

fn json_to_value(raw: &serde_json::Value, kind: Option<ScalarKind>) -> Result<Value, Error> {
    let mismatch = |expected: ScalarKind| {
        payload_error(format!("value {raw} does not decode as {expected}"))
    };

    match kind {
        None => infer_value(raw),

        Some(_) if raw.is_null() => Ok(Value::Null),

        Some(ScalarKind::Bool) => raw
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| mismatch(ScalarKind::Bool)),

        Some(ScalarKind::Int) => raw
            .as_i64()
            .map(Value::Int)
            .ok_or_else(|| mismatch(ScalarKind::Int)),

        Some(ScalarKind::Uint) => raw
            .as_u64()
            .map(Value::Uint)
            .ok_or_else(|| mismatch(ScalarKind::Uint)),

        Some(ScalarKind::Float) => raw
            .as_f64()
            .map(Value::Float)
            .ok_or_else(|| mismatch(ScalarKind::Float)),

        Some(ScalarKind::Text) => raw
            .as_str()
            .map(|s| Value::Text(s.to_string()))
            .ok_or_else(|| mismatch(ScalarKind::Text)),

        Some(ScalarKind::Timestamp) => raw
            .as_str()
            .and_then(|s| Timestamp::parse_rfc3339(s).ok())
            .map(Value::Timestamp)
            .ok_or_else(|| mismatch(ScalarKind::Timestamp)),

        Some(ScalarKind::Binary) => {
            let serde_json::Value::Array(raw_bytes) = raw else {
                return Err(mismatch(ScalarKind::Binary));
            };

            let mut bytes = Vec::with_capacity(raw_bytes.len());
            for b in raw_bytes {
                let byte = b
                    .as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| mismatch(ScalarKind::Binary))?;
                bytes.push(byte);
            }

            Ok(Value::Binary(bytes))
        }
    }
}

/// Best-effort decode for undeclared properties.
fn infer_value(raw: &serde_json::Value) -> Result<Value, Error> {
    match raw {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(v) => Ok(Value::Bool(*v)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_u64().map(Value::Uint))
            .or_else(|| n.as_f64().map(Value::Float))
            .ok_or_else(|| payload_error(format!("unrepresentable number {n}"))),
        serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
        serde_json::Value::Object(object) => {
            let mut map = BTreeMap::new();
            for (name, value) in object {
                map.insert(name.clone(), infer_value(value)?);
            }
            Ok(Value::Complex(map))
        }
        serde_json::Value::Array(_) => {
            Err(payload_error("array values need a declared binary kind"))
        }
    }
}
