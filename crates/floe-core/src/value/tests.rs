use super::*;

#[test]
fn default_value_matches_its_kind() {
    let kinds = [
        ScalarKind::Bool,
        ScalarKind::Int,
        ScalarKind::Uint,
        ScalarKind::Float,
        ScalarKind::Text,
        ScalarKind::Timestamp,
        ScalarKind::Binary,
    ];

    for kind in kinds {
        let value = kind.default_value();
        assert!(value.matches(kind), "default for {kind:?} has wrong kind");
    }
}

#[test]
fn only_text_is_textual() {
    assert!(ScalarKind::Text.is_textual());
    assert!(!ScalarKind::Int.is_textual());
    assert!(!ScalarKind::Timestamp.is_textual());
}

#[test]
fn float_and_binary_are_not_key_eligible() {
    assert!(!ScalarKind::Float.is_key_eligible());
    assert!(!ScalarKind::Binary.is_key_eligible());
    assert!(ScalarKind::Int.is_key_eligible());
    assert!(ScalarKind::Text.is_key_eligible());
}

#[test]
fn compare_is_total_within_a_kind() {
    assert_eq!(
        compare(&Value::Int(-1), &Value::Int(1)),
        Ordering::Less
    );
    assert_eq!(
        compare(&Value::Text("a".into()), &Value::Text("b".into())),
        Ordering::Less
    );
    assert_eq!(
        compare(&Value::Float(f64::NAN), &Value::Float(f64::NAN)),
        Ordering::Equal
    );
}

#[test]
fn compare_falls_back_to_rank_across_kinds() {
    let mut values = vec![
        Value::Text("z".into()),
        Value::Int(5),
        Value::Null,
        Value::Bool(true),
    ];
    values.sort_by(compare);

    assert_eq!(
        values,
        vec![
            Value::Null,
            Value::Bool(true),
            Value::Int(5),
            Value::Text("z".into()),
        ]
    );
}

#[test]
fn timestamp_rfc3339_round_trip() {
    let ts = Timestamp::from_seconds(1_311_548_400);
    let text = ts.to_rfc3339();
    let back = Timestamp::parse_rfc3339(&text).unwrap();

    assert_eq!(back, ts);
}

#[test]
fn timestamp_clamps_out_of_range_seconds() {
    assert_eq!(
        Timestamp::from_seconds(i64::MAX).get(),
        Timestamp::MAX_SECONDS
    );
    assert_eq!(
        Timestamp::from_seconds(i64::MIN).get(),
        Timestamp::MIN_SECONDS
    );
}

#[test]
fn timestamp_rejects_garbage() {
    assert!(Timestamp::parse_rfc3339("not a date").is_err());
    assert!(Timestamp::parse_rfc3339("2011-07-24").is_err());
}

#[test]
fn null_has_no_scalar_kind() {
    assert_eq!(Value::Null.scalar_kind(), None);
    assert_eq!(Value::Complex(BTreeMap::new()).scalar_kind(), None);
}
