use super::*;
use crate::key::codec;
use proptest::prelude::*;

fn order_line_shape() -> KeyShape {
    KeyShape::new(vec![
        KeyProperty {
            name: "OrderId".to_string(),
            kind: ScalarKind::Int,
        },
        KeyProperty {
            name: "LineNo".to_string(),
            kind: ScalarKind::Int,
        },
    ])
}

#[test]
fn simple_int_key_round_trip() {
    let shape = KeyShape::simple("Id", ScalarKind::Int);
    let key = EntityKey::single(1_i64);

    assert_eq!(codec::encode(&key), "1");
    assert_eq!(codec::decode("1", &shape).unwrap(), key);
}

#[test]
fn simple_text_key_is_quoted() {
    let shape = KeyShape::simple("Code", ScalarKind::Text);
    let key = EntityKey::single("widget");

    assert_eq!(codec::encode(&key), "'widget'");
    assert_eq!(codec::decode("'widget'", &shape).unwrap(), key);
}

#[test]
fn embedded_apostrophes_are_doubled() {
    let shape = KeyShape::simple("Name", ScalarKind::Text);
    let key = EntityKey::single("O'Brien");

    let literal = codec::encode(&key);
    assert_eq!(literal, "'O''Brien'");
    assert_eq!(codec::decode(&literal, &shape).unwrap(), key);
}

#[test]
fn text_key_with_separator_characters_round_trips() {
    let shape = KeyShape::simple("Code", ScalarKind::Text);
    let key = EntityKey::single("a,b=c/d('x')");

    let literal = codec::encode(&key);
    assert_eq!(codec::decode(&literal, &shape).unwrap(), key);
}

#[test]
fn composite_key_encodes_in_declaration_order() {
    let shape = order_line_shape();
    let key = shape
        .key_from_pairs(vec![
            ("OrderId".to_string(), KeyValue::Int(10)),
            ("LineNo".to_string(), KeyValue::Int(2)),
        ])
        .unwrap();

    assert_eq!(codec::encode(&key), "OrderId=10,LineNo=2");
    assert_eq!(codec::decode("OrderId=10,LineNo=2", &shape).unwrap(), key);
}

#[test]
fn composite_order_is_canonical_regardless_of_supplied_order() {
    let shape = order_line_shape();

    let supplied_forward = shape
        .key_from_pairs(vec![
            ("OrderId".to_string(), KeyValue::Int(10)),
            ("LineNo".to_string(), KeyValue::Int(2)),
        ])
        .unwrap();
    let supplied_reversed = shape
        .key_from_pairs(vec![
            ("LineNo".to_string(), KeyValue::Int(2)),
            ("OrderId".to_string(), KeyValue::Int(10)),
        ])
        .unwrap();

    assert_eq!(supplied_forward, supplied_reversed);
    assert_eq!(codec::encode(&supplied_reversed), "OrderId=10,LineNo=2");
}

#[test]
fn decode_accepts_any_component_order() {
    let shape = order_line_shape();
    let key = codec::decode("LineNo=2,OrderId=10", &shape).unwrap();

    assert_eq!(codec::encode(&key), "OrderId=10,LineNo=2");
}

#[test]
fn composite_literal_rejected_for_simple_shape() {
    let shape = KeyShape::simple("Id", ScalarKind::Int);

    assert_eq!(
        codec::decode("OrderId=10,LineNo=2", &shape),
        Err(KeyError::ExpectedSimple)
    );
}

#[test]
fn simple_literal_rejected_for_composite_shape() {
    let shape = order_line_shape();

    assert_eq!(
        codec::decode("10", &shape),
        Err(KeyError::ExpectedComposite { expected: 2 })
    );
}

#[test]
fn decode_rejects_unknown_property() {
    let shape = order_line_shape();

    assert!(matches!(
        codec::decode("OrderId=10,Wrong=2", &shape),
        Err(KeyError::UnknownProperty { .. })
    ));
}

#[test]
fn decode_rejects_duplicate_property() {
    let shape = order_line_shape();

    assert!(matches!(
        codec::decode("OrderId=10,OrderId=2", &shape),
        Err(KeyError::DuplicateProperty { .. })
    ));
}

#[test]
fn decode_rejects_missing_property() {
    let shape = order_line_shape();

    assert!(matches!(
        codec::decode("OrderId=10", &shape),
        Err(KeyError::MissingProperty { .. })
    ));
}

#[test]
fn decode_rejects_type_mismatch() {
    let shape = KeyShape::simple("Id", ScalarKind::Int);

    assert!(matches!(
        codec::decode("'ten'", &shape),
        Err(KeyError::InvalidLiteral { .. })
    ));
}

#[test]
fn decode_rejects_unterminated_quote() {
    let shape = KeyShape::simple("Name", ScalarKind::Text);

    assert!(matches!(
        codec::decode("'oops", &shape),
        Err(KeyError::UnterminatedQuote { .. })
    ));
}

#[test]
fn decode_rejects_empty_literal() {
    let shape = KeyShape::simple("Id", ScalarKind::Int);

    assert_eq!(codec::decode("  ", &shape), Err(KeyError::Empty));
}

#[test]
fn timestamp_key_uses_datetime_literal() {
    let shape = KeyShape::simple("At", ScalarKind::Timestamp);
    let key = EntityKey::single(Timestamp::from_seconds(1_311_548_400));

    let literal = codec::encode(&key);
    assert!(literal.starts_with("datetime'"), "got {literal}");
    assert_eq!(codec::decode(&literal, &shape).unwrap(), key);
}

#[test]
fn bool_and_uint_keys_encode_bare() {
    assert_eq!(codec::encode(&EntityKey::single(true)), "true");
    assert_eq!(codec::encode(&EntityKey::single(42_u64)), "42");
}

#[test]
fn key_from_pairs_rejects_kind_mismatch() {
    let shape = order_line_shape();

    assert!(matches!(
        shape.key_from_pairs(vec![
            ("OrderId".to_string(), KeyValue::Text("x".to_string())),
            ("LineNo".to_string(), KeyValue::Int(2)),
        ]),
        Err(KeyError::TypeMismatch { .. })
    ));
}

#[test]
fn key_from_value_rejects_composite_shape() {
    let shape = order_line_shape();

    assert!(matches!(
        shape.key_from_value(KeyValue::Int(1)),
        Err(KeyError::ExpectedComposite { .. })
    ));
}

///
/// PROPTESTS
///

fn arb_key_value() -> impl Strategy<Value = KeyValue> {
    prop_oneof![
        any::<bool>().prop_map(KeyValue::Bool),
        any::<i64>().prop_map(KeyValue::Int),
        any::<u64>().prop_map(KeyValue::Uint),
        "[ -~]{0,24}".prop_map(KeyValue::Text),
        (0_i64..4_000_000_000).prop_map(|s| KeyValue::Timestamp(Timestamp::from_seconds(s))),
    ]
}

fn shape_for(values: &[KeyValue]) -> KeyShape {
    KeyShape::new(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| KeyProperty {
                name: format!("P{i}"),
                kind: v.kind(),
            })
            .collect(),
    )
}

proptest! {
    #[test]
    fn simple_key_round_trips(value in arb_key_value()) {
        let shape = shape_for(std::slice::from_ref(&value));
        let key = EntityKey::Single(value);

        let literal = codec::encode(&key);
        let decoded = codec::decode(&literal, &shape).unwrap();

        prop_assert_eq!(decoded, key);
    }

    #[test]
    fn composite_key_round_trips(values in proptest::collection::vec(arb_key_value(), 2..4)) {
        let shape = shape_for(&values);
        let pairs: Vec<(String, KeyValue)> = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (format!("P{i}"), v))
            .collect();

        let key = shape.key_from_pairs(pairs).unwrap();
        let literal = codec::encode(&key);
        let decoded = codec::decode(&literal, &shape).unwrap();

        prop_assert_eq!(decoded, key);
    }
}
