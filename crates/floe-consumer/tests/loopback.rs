//! End-to-end loopback: a real `Consumer` talking to a real `MemoryProducer`
//! through the wire codec, with a minimal in-process host standing in for
//! the dispatch collaborator (URL decoding, query-string parsing, status
//! selection).

use floe_consumer::{
    Consumer, Transport, TransportError, TransportRequest, TransportResponse, payload,
};
use floe_core::{
    entity::{Entity, EntityRef},
    error::{Error, ErrorKind},
    key::{EntityKey, KeyValue},
    model::{EdmModel, EntityTypeModel, Multiplicity},
    path,
    query::{Direction, QueryInfo},
    response::{Envelope, Links},
    value::{ScalarKind, Value},
};
use floe_producer::{MemoryProducer, Producer, RouteBody, RouteOutcome, route};
use std::sync::Arc;

const ROOT: &str = "http://local.test/svc/";

fn shop_model() -> EdmModel {
    EdmModel::builder("Shop")
        .entity_type(
            EntityTypeModel::new("Shop", "Product")
                .with_key("Id", ScalarKind::Int)
                .with_property("Name", ScalarKind::Text)
                .with_nullable("Price", ScalarKind::Float)
                .with_default("Stock", ScalarKind::Uint, 0_u64)
                .with_navigation("Category", "Categories", Multiplicity::One)
                .with_navigation("Parts", "Parts", Multiplicity::Many),
        )
        .entity_type(
            EntityTypeModel::new("Shop", "Category")
                .with_key("Id", ScalarKind::Int)
                .with_property("Name", ScalarKind::Text),
        )
        .entity_type(
            EntityTypeModel::new("Shop", "Part")
                .with_key("ProductId", ScalarKind::Int)
                .with_key("Serial", ScalarKind::Int)
                .with_nullable("Note", ScalarKind::Text),
        )
        .entity_set("Products", "Product")
        .entity_set("Categories", "Category")
        .entity_set("Parts", "Part")
        .build()
        .unwrap()
}

///
/// Loopback
/// In-process host: decodes the URL, rebuilds the QueryInfo, routes into
/// the producer, and encodes the outcome the way a serving host would.
///

struct Loopback {
    producer: Arc<MemoryProducer>,
}

impl Transport for Loopback {
    fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let rest = request
            .url
            .strip_prefix(ROOT)
            .expect("request escaped the service root");
        let (raw_path, raw_query) = match rest.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (rest, None),
        };

        let path_text = urlencoding::decode(raw_path).expect("path is valid utf-8");
        let query = raw_query.map_or_else(QueryInfo::new, parse_query);
        let body = decode_body(&self.producer, &path_text, request.body);

        let outcome = route(
            self.producer.as_ref(),
            request.method,
            &path_text,
            &query,
            body,
        );

        Ok(respond(outcome))
    }
}

/// Rebuild a QueryInfo from its rendered query string.
fn parse_query(raw: &str) -> QueryInfo {
    let mut query = QueryInfo::new();

    for pair in raw.split('&') {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = urlencoding::decode(value).expect("query value is valid utf-8");

        match name {
            "$select" => query = query.select(value.split(',')),
            "$expand" => query = query.expand(value.split(',')),
            "$filter" => query = query.filter(value.as_ref()),
            "$orderby" => {
                for field in value.split(',') {
                    query = match field.strip_suffix(" desc") {
                        Some(bare) => query.order_by(bare, Direction::Desc),
                        None => query.order_by(field, Direction::Asc),
                    };
                }
            }
            "$top" => query = query.top(value.parse().expect("numeric $top")),
            "$skip" => query = query.skip(value.parse().expect("numeric $skip")),
            "$inlinecount" => query = query.inline_count(),
            other => query = query.custom(other, value.as_ref()),
        }
    }

    query
}

/// Decode a request body into the routed form, using the model to pick the
/// entity type the payload must decode against.
fn decode_body(producer: &MemoryProducer, path_text: &str, body: Option<String>) -> RouteBody {
    let Some(body) = body else {
        return RouteBody::None;
    };
    let model = producer.metadata();

    if path_text.contains("/$links/") {
        let links = payload::decode_links(&body, ROOT, model, true).expect("reference body");
        let Links::One(target) = links else {
            panic!("reference body decoded as a collection");
        };

        return RouteBody::Ref(target);
    }

    let parsed = path::parse(path_text, model).expect("body target path");
    let ty = match parsed.segments().last() {
        Some(floe_core::path::PathSegment::Nav(nav)) => {
            let target = model
                .resolve_navigation(parsed.entity_set(), nav)
                .expect("nav body target")
                .target_set
                .clone();
            model.type_for_set(&target).expect("nav body type")
        }
        _ => model.type_for_set(parsed.entity_set()).expect("body type"),
    };

    RouteBody::Entity(payload::decode_entity(&body, ty).expect("entity body"))
}

fn respond(outcome: Result<RouteOutcome, Error>) -> TransportResponse {
    let (status, body) = match outcome {
        Ok(RouteOutcome::Created(entity)) => (201, Some(payload::encode_entity_document(&entity))),
        Ok(RouteOutcome::NoContent) => (204, None),
        Ok(RouteOutcome::Envelope(envelope)) => {
            let body = match &envelope {
                Envelope::Entity(entity) => payload::encode_entity_document(entity),
                Envelope::Collection(collection) => {
                    payload::encode_collection_document(collection)
                }
                Envelope::Property(property) => payload::encode_property_document(property),
                Envelope::Links(links) => payload::encode_links_document(ROOT, links),
            };
            (200, Some(body))
        }
        Err(err) => (status_of(&err), None),
    };

    TransportResponse {
        status,
        headers: Vec::new(),
        body,
    }
}

fn status_of(err: &Error) -> u16 {
    match err.kind {
        ErrorKind::EntityNotFound
        | ErrorKind::LinkNotFound
        | ErrorKind::UnknownEntitySet
        | ErrorKind::UnknownNavigationProperty => 404,
        ErrorKind::MalformedKey | ErrorKind::InvalidPath => 400,
        ErrorKind::ConstraintViolation => 409,
        ErrorKind::Unsupported => 501,
        _ => 500,
    }
}

fn loopback_pair() -> (Consumer, Arc<MemoryProducer>) {
    let producer = Arc::new(MemoryProducer::new(shop_model()));
    let consumer = Consumer::new(
        ROOT,
        shop_model(),
        Box::new(Loopback {
            producer: Arc::clone(&producer),
        }),
    );

    (consumer, producer)
}

// ------------------------------------------------------------------
// Scenarios
// ------------------------------------------------------------------

#[test]
fn create_then_get_round_trips_over_the_wire() {
    let (consumer, _) = loopback_pair();

    let created = consumer
        .create_entity(
            "Products",
            Entity::new().prop("Name", "Widget").prop("Price", 2.5_f64),
        )
        .unwrap();
    assert_eq!(created.get("Id"), Some(&Value::Int(1)));
    assert_eq!(created.get("Stock"), Some(&Value::Uint(0)));

    let fetched = consumer
        .get_entity("Products", &EntityKey::single(1_i64), &QueryInfo::new())
        .unwrap();
    assert_eq!(fetched.get("Name"), Some(&Value::Text("Widget".into())));
    assert_eq!(fetched.get("Price"), Some(&Value::Float(2.5)));
    assert_eq!(fetched.type_name(), Some("Shop.Product"));
}

#[test]
fn query_constraints_survive_the_wire() {
    let (consumer, _) = loopback_pair();
    for name in ["Bolt", "Anvil", "Clamp"] {
        consumer
            .create_entity("Products", Entity::new().prop("Name", name))
            .unwrap();
    }

    let page = consumer
        .get_entities(
            "Products",
            &QueryInfo::new()
                .order_by("Name", Direction::Asc)
                .skip(1)
                .top(1)
                .inline_count()
                .select(["Name"]),
        )
        .unwrap();

    assert_eq!(page.len(), 1);
    assert_eq!(page.inline_count, Some(3));
    assert_eq!(
        page.entities[0].get("Name"),
        Some(&Value::Text("Bolt".into()))
    );
    assert!(page.entities[0].get("Price").is_none());
}

#[test]
fn navigation_and_links_round_trip() {
    let (consumer, _) = loopback_pair();

    consumer
        .create_entity("Products", Entity::new().prop("Name", "Widget"))
        .unwrap();
    consumer
        .create_entity("Categories", Entity::new().prop("Name", "Tools"))
        .unwrap();

    let source = EntityRef::new("Products", EntityKey::single(1_i64));
    let target = EntityRef::new("Categories", EntityKey::single(1_i64));
    consumer.create_link(&source, "Category", &target).unwrap();

    // to-one navigation arrives as an entity
    let envelope = consumer
        .get_nav_property(
            "Products",
            &EntityKey::single(1_i64),
            "Category",
            &QueryInfo::new(),
        )
        .unwrap();
    match envelope {
        Envelope::Entity(category) => {
            assert_eq!(category.get("Name"), Some(&Value::Text("Tools".into())));
        }
        other => panic!("expected entity envelope, got {}", other.tag()),
    }

    // and as a single link
    match consumer.get_links(&source, "Category").unwrap() {
        Links::One(linked) => assert!(linked.same_entity(&target)),
        Links::Many(_) => panic!("to-one link set must be single"),
    }
}

#[test]
fn create_related_links_atomically_over_the_wire() {
    let (consumer, _) = loopback_pair();
    consumer
        .create_entity("Products", Entity::new().prop("Name", "Widget"))
        .unwrap();

    let part = consumer
        .create_related(
            "Products",
            &EntityKey::single(1_i64),
            "Parts",
            Entity::new().prop("ProductId", 1_i64).prop("Serial", 9_i64),
        )
        .unwrap();
    assert_eq!(part.get("Serial"), Some(&Value::Int(9)));

    let source = EntityRef::new("Products", EntityKey::single(1_i64));
    match consumer.get_links(&source, "Parts").unwrap() {
        Links::Many(targets) => assert_eq!(targets.len(), 1),
        Links::One(_) => panic!("to-many link set must be a collection"),
    }
}

#[test]
fn merge_and_update_semantics_hold_over_the_wire() {
    let (consumer, _) = loopback_pair();
    consumer
        .create_entity(
            "Products",
            Entity::new()
                .prop("Name", "Widget")
                .prop("Price", 9.5_f64)
                .prop("Stock", 7_u64),
        )
        .unwrap();

    consumer
        .merge_entity(
            "Products",
            Entity::new().prop("Id", 1_i64).prop("Name", "Gadget"),
        )
        .unwrap();
    let merged = consumer
        .get_entity("Products", &EntityKey::single(1_i64), &QueryInfo::new())
        .unwrap();
    assert_eq!(merged.get("Price"), Some(&Value::Float(9.5)));
    assert_eq!(merged.get("Stock"), Some(&Value::Uint(7)));

    consumer
        .update_entity(
            "Products",
            Entity::new().prop("Id", 1_i64).prop("Name", "Gadget"),
        )
        .unwrap();
    let updated = consumer
        .get_entity("Products", &EntityKey::single(1_i64), &QueryInfo::new())
        .unwrap();
    assert_eq!(updated.get("Price"), Some(&Value::Null));
    assert_eq!(updated.get("Stock"), Some(&Value::Uint(0)));
}

#[test]
fn delete_then_get_is_not_found_over_the_wire() {
    let (consumer, _) = loopback_pair();
    consumer
        .create_entity("Products", Entity::new().prop("Name", "Widget"))
        .unwrap();

    consumer
        .delete_entity("Products", &EntityKey::single(1_i64))
        .unwrap();

    let err = consumer
        .get_entity("Products", &EntityKey::single(1_i64), &QueryInfo::new())
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::EntityNotFound);
}

#[test]
fn composite_keys_round_trip_through_urls() {
    let (consumer, producer) = loopback_pair();
    consumer
        .create_entity("Products", Entity::new().prop("Name", "Widget"))
        .unwrap();
    consumer
        .create_related(
            "Products",
            &EntityKey::single(1_i64),
            "Parts",
            Entity::new()
                .prop("ProductId", 1_i64)
                .prop("Serial", 2_i64)
                .prop("Note", "spare"),
        )
        .unwrap();

    let shape = producer
        .metadata()
        .type_for_set("Parts")
        .unwrap()
        .key_shape();
    let key = shape
        .key_from_pairs(vec![
            ("Serial".to_string(), KeyValue::Int(2)),
            ("ProductId".to_string(), KeyValue::Int(1)),
        ])
        .unwrap();

    let part = consumer
        .get_entity("Parts", &key, &QueryInfo::new())
        .unwrap();
    assert_eq!(part.get("Note"), Some(&Value::Text("spare".into())));
}

#[test]
fn update_link_with_stale_key_is_link_not_found_over_the_wire() {
    let (consumer, _) = loopback_pair();
    consumer
        .create_entity("Products", Entity::new().prop("Name", "Widget"))
        .unwrap();
    consumer
        .create_related(
            "Products",
            &EntityKey::single(1_i64),
            "Parts",
            Entity::new().prop("ProductId", 1_i64).prop("Serial", 1_i64),
        )
        .unwrap();
    consumer
        .create_entity(
            "Parts",
            Entity::new().prop("ProductId", 1_i64).prop("Serial", 2_i64),
        )
        .unwrap();

    let source = EntityRef::new("Products", EntityKey::single(1_i64));
    let shape = shop_model().type_for_set("Parts").unwrap().key_shape();
    let stale = shape
        .key_from_pairs(vec![
            ("ProductId".to_string(), KeyValue::Int(1)),
            ("Serial".to_string(), KeyValue::Int(99)),
        ])
        .unwrap();
    let replacement = EntityRef::new(
        "Parts",
        shape
            .key_from_pairs(vec![
                ("ProductId".to_string(), KeyValue::Int(1)),
                ("Serial".to_string(), KeyValue::Int(2)),
            ])
            .unwrap(),
    );

    let err = consumer
        .update_link(&source, "Parts", Some(&stale), &replacement)
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::LinkNotFound);
}
