use tessel_core::{
    Document, FieldDescriptor, MapKind, TypeDescriptor, TypeFlags, TypeRegistry, Value, ValueType,
};
use tessel_json::{DeserErrorKind, Features, ParserConfig, from_str, from_str_with_config};
use tessel_testhelpers::test;

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register_record(
            TypeDescriptor::builder("User")
                .field(FieldDescriptor::builder("id", ValueType::LONG))
                .field(FieldDescriptor::builder("user_name", ValueType::Str))
                .field(FieldDescriptor::builder("active", ValueType::BOOL))
                .field(FieldDescriptor::builder("score", ValueType::DOUBLE))
                .field(FieldDescriptor::builder("nick", ValueType::Str).alias("nickname"))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_record(
            TypeDescriptor::builder("Point")
                .flags(TypeFlags::ARRAY_MAPPING)
                .field(FieldDescriptor::builder("x", ValueType::INT))
                .field(FieldDescriptor::builder("y", ValueType::INT))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_record(
            TypeDescriptor::builder("Bag")
                .field(FieldDescriptor::builder("items", ValueType::list(ValueType::Str)).read_only())
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_record(
            TypeDescriptor::builder("Address")
                .field(FieldDescriptor::builder("city", ValueType::Str))
                .field(FieldDescriptor::builder("zip", ValueType::Str))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_record(
            TypeDescriptor::builder("Person")
                .field(FieldDescriptor::builder("name", ValueType::Str))
                .field(FieldDescriptor::builder("address", ValueType::record("Address")).unwrapped())
                .field(
                    FieldDescriptor::builder(
                        "attrs",
                        ValueType::map_of(MapKind::Linked, ValueType::Str, ValueType::Any),
                    )
                    .unwrapped(),
                )
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
}

fn user(input: &str) -> Document {
    from_str(input, &ValueType::record("User"), &registry()).unwrap()
}

fn user_with(input: &str, features: Features) -> Document {
    let config = ParserConfig::builder().features(features).build();
    from_str_with_config(input, &ValueType::record("User"), &registry(), &config).unwrap()
}

#[test]
fn keys_in_declaration_order() {
    let doc = user(r#"{"id": 7, "user_name": "ann", "active": true, "score": 1.5, "nick": "a"}"#);
    let user = doc.record_at("$").unwrap();
    assert_eq!(user.type_name(), "User");
    assert_eq!(
        user.slots(),
        [
            Value::Int(7),
            Value::from("ann"),
            Value::Bool(true),
            Value::Float(1.5),
            Value::from("a"),
        ]
    );
    assert!(user.extras().is_empty());
}

#[test]
fn keys_in_any_order() {
    let doc = user(r#"{"nick": "a", "score": 1.5, "id": 7, "active": true, "user_name": "ann"}"#);
    let user = doc.record_at("$").unwrap();
    assert_eq!(user.get("id"), Some(&Value::Int(7)));
    assert_eq!(user.get("user_name"), Some(&Value::from("ann")));
    assert_eq!(user.get("active"), Some(&Value::Bool(true)));
    assert_eq!(user.get("nick"), Some(&Value::from("a")));
}

#[test]
fn missing_fields_keep_their_defaults() {
    let doc = user("{}");
    let user = doc.record_at("$").unwrap();
    assert_eq!(
        user.slots(),
        [
            Value::Int(0),
            Value::Null,
            Value::Bool(false),
            Value::Float(0.0),
            Value::Null,
        ]
    );

    let doc = user_with("{}", Features::INIT_STRING_FIELD_AS_EMPTY);
    assert_eq!(doc.at("$.user_name"), Some(&Value::from("")));
}

#[test]
fn null_primitives_become_zero() {
    let doc = user(r#"{"id": null, "active": null, "user_name": null}"#);
    let user = doc.record_at("$").unwrap();
    assert_eq!(user.get("id"), Some(&Value::Int(0)));
    assert_eq!(user.get("active"), Some(&Value::Bool(false)));
    assert_eq!(user.get("user_name"), Some(&Value::Null));
}

#[test]
fn repeated_key_last_one_wins() {
    let doc = user(r#"{"id": 1, "id": 2}"#);
    assert_eq!(doc.at("$.id"), Some(&Value::Int(2)));
}

#[test]
fn smart_match_ignores_case_separators_and_is_prefix() {
    let doc = user(r#"{"UserName": "bob", "isActive": true, "NICK-NAME": "b"}"#);
    let user = doc.record_at("$").unwrap();
    assert_eq!(user.get("user_name"), Some(&Value::from("bob")));
    assert_eq!(user.get("active"), Some(&Value::Bool(true)));
    assert_eq!(user.get("nick"), Some(&Value::from("b")));
    assert!(user.extras().is_empty());
}

#[test]
fn smart_match_can_be_disabled() {
    let doc = user_with(r#"{"UserName": "bob"}"#, Features::DISABLE_FIELD_SMART_MATCH);
    let user = doc.record_at("$").unwrap();
    assert_eq!(user.get("user_name"), Some(&Value::Null));
    assert_eq!(user.extras().get("UserName"), Some(&Value::from("bob")));
}

#[test]
fn smart_match_never_overwrites_an_assigned_field() {
    let doc = user(r#"{"user_name": "a", "UserName": "b"}"#);
    let user = doc.record_at("$").unwrap();
    assert_eq!(user.get("user_name"), Some(&Value::from("a")));
    assert_eq!(user.extras().get("UserName"), Some(&Value::from("b")));
}

#[test]
fn underscore_prefixed_keys_match_smartly() {
    let doc = user(r#"{"_user_name": "x", "_id": 4}"#);
    let record = doc.record_at("$").unwrap();
    assert_eq!(record.get("user_name"), Some(&Value::from("x")));
    assert_eq!(record.get("id"), Some(&Value::Int(4)));
    assert!(record.extras().is_empty());

    let doc = user(r#"{"user_name": "a", "_user_name": "b"}"#);
    let record = doc.record_at("$").unwrap();
    assert_eq!(record.get("user_name"), Some(&Value::from("a")));
    assert_eq!(record.extras().get("_user_name"), Some(&Value::from("b")));
}

#[test]
fn aliases_match_exactly() {
    let doc = user(r#"{"nickname": "x"}"#);
    assert_eq!(doc.at("$.nick"), Some(&Value::from("x")));
}

#[test]
fn unknown_keys_are_kept_as_extras() {
    let doc = user(r#"{"id": 1, "extra": {"a": [1, 2]}, "flag": false}"#);
    let user = doc.record_at("$").unwrap();
    assert_eq!(
        user.extras().keys().map(String::as_str).collect::<Vec<_>>(),
        ["extra", "flag"]
    );
    assert_eq!(doc.at("$.extra.a[1]"), Some(&Value::Int(2)));
    assert_eq!(doc.at("$.flag"), Some(&Value::Bool(false)));
}

#[test]
fn unknown_keys_can_be_rejected_with_a_suggestion() {
    let config = ParserConfig::builder()
        .features(Features::FAIL_ON_UNKNOWN_PROPERTIES)
        .build();
    let err = from_str_with_config(
        r#"{"id": 1, "usr_name": "x"}"#,
        &ValueType::record("User"),
        &registry(),
        &config,
    )
    .unwrap_err();
    match &err.kind {
        DeserErrorKind::UnmappedField { field, suggestion } => {
            assert_eq!(field, "usr_name");
            assert_eq!(suggestion.as_deref(), Some("user_name"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.type_name.as_deref(), Some("User"));
}

#[test]
fn long_runs_of_unknown_keys_fall_back_to_lookup() {
    let mut builder = TypeDescriptor::builder("Wide");
    for i in 0..20 {
        builder = builder.field(FieldDescriptor::builder(format!("f{i}"), ValueType::INT));
    }
    let mut registry = TypeRegistry::new();
    registry.register_record(builder.build().unwrap()).unwrap();

    let unknown = (0..17).map(|i| format!(r#""x{i}": {i}"#));
    let known = (0..20).rev().map(|i| format!(r#""f{i}": {}"#, i * 10));
    let members: Vec<String> = unknown.chain(known).collect();
    let input = format!("{{{}}}", members.join(", "));

    let doc = from_str(&input, &ValueType::record("Wide"), &registry).unwrap();
    let wide = doc.record_at("$").unwrap();
    let expected: Vec<Value> = (0..20).map(|i| Value::Int(i * 10)).collect();
    assert_eq!(wide.slots(), expected);
    let extras: Vec<&str> = wide.extras().keys().map(String::as_str).collect();
    assert_eq!(extras.len(), 17);
    assert_eq!(extras[0], "x0");
    assert_eq!(extras[16], "x16");
    assert_eq!(wide.extras()["x16"], Value::Int(16));

    // a single miss leaves the remaining keys aligned
    let doc = from_str(
        r#"{"f0": 1, "skip": true, "f2": 3, "f3": 4}"#,
        &ValueType::record("Wide"),
        &registry,
    )
    .unwrap();
    let wide = doc.record_at("$").unwrap();
    assert_eq!(wide.get("f0"), Some(&Value::Int(1)));
    assert_eq!(wide.get("f1"), Some(&Value::Int(0)));
    assert_eq!(wide.get("f2"), Some(&Value::Int(3)));
    assert_eq!(wide.get("f3"), Some(&Value::Int(4)));
    assert_eq!(wide.extras().get("skip"), Some(&Value::Bool(true)));
}

#[test]
fn scalars_are_coerced_to_the_field_type() {
    let doc = user(r#"{"id": "42", "active": "true", "score": 3, "user_name": 12}"#);
    let user = doc.record_at("$").unwrap();
    assert_eq!(user.get("id"), Some(&Value::Int(42)));
    assert_eq!(user.get("active"), Some(&Value::Bool(true)));
    assert_eq!(user.get("score"), Some(&Value::Float(3.0)));
    assert_eq!(user.get("user_name"), Some(&Value::from("12")));
}

#[test]
fn mismatched_values_fail_with_the_field() {
    let err = from_str(r#"{"id": [1]}"#, &ValueType::record("User"), &registry()).unwrap_err();
    assert!(err.is_mismatch());
    assert_eq!(err.field.as_deref(), Some("id"));
    assert_eq!(err.type_name.as_deref(), Some("User"));
}

#[test]
fn mismatched_values_can_be_kept_as_extras() {
    let doc = user_with(
        r#"{"id": [1], "user_name": "a", "active": {"no": 1}}"#,
        Features::IGNORE_MISMATCHED_VALUES,
    );
    let user = doc.record_at("$").unwrap();
    assert_eq!(user.get("id"), Some(&Value::Int(0)));
    assert_eq!(user.get("user_name"), Some(&Value::from("a")));
    assert_eq!(user.get("active"), Some(&Value::Bool(false)));
    assert_eq!(
        doc.graph().seq(&user.extras()["id"]).unwrap().items(),
        [Value::Int(1)]
    );
    assert!(doc.graph().map(&user.extras()["active"]).is_some());
}

#[test]
fn positional_arrays_match_the_object_form() {
    let point = ValueType::record("Point");
    let registry = registry();
    let positional = from_str("[1, 2]", &point, &registry).unwrap();
    let object = from_str(r#"{"x": 1, "y": 2}"#, &point, &registry).unwrap();
    assert_eq!(
        positional.record_at("$").unwrap().slots(),
        object.record_at("$").unwrap().slots()
    );
}

#[test]
fn positional_arrays_need_every_field() {
    let point = ValueType::record("Point");
    let registry = registry();
    let err = from_str("[1]", &point, &registry).unwrap_err();
    insta::assert_snapshot!(err, @"invalid value: expected 2 elements for `Point`, found 1 (in `Point`)");
    let err = from_str("[1, 2, 3]", &point, &registry).unwrap_err();
    insta::assert_snapshot!(err, @"invalid value: expected 2 elements for `Point`, found more (in `Point`)");
}

#[test]
fn positional_arrays_need_the_feature() {
    let mut registry = TypeRegistry::new();
    registry
        .register_record(
            TypeDescriptor::builder("Pair")
                .field(FieldDescriptor::builder("a", ValueType::INT))
                .field(FieldDescriptor::builder("b", ValueType::INT))
                .build()
                .unwrap(),
        )
        .unwrap();
    let pair = ValueType::record("Pair");
    assert!(from_str("[1, 2]", &pair, &registry).is_err());

    let config = ParserConfig::builder()
        .features(Features::SUPPORT_ARRAY_TO_BEAN)
        .build();
    let doc = from_str_with_config("[1, 2]", &pair, &registry, &config).unwrap();
    assert_eq!(doc.at("$.b"), Some(&Value::Int(2)));
}

#[test]
fn read_only_containers_are_filled_in_place() {
    let bag = ValueType::record("Bag");
    let registry = registry();

    let doc = from_str(r#"{"items": ["a", "b"]}"#, &bag, &registry).unwrap();
    let items = doc.graph().seq(doc.at("$.items").unwrap()).unwrap();
    assert_eq!(items.items(), [Value::from("a"), Value::from("b")]);

    // null leaves the container alone
    let doc = from_str(r#"{"items": null}"#, &bag, &registry).unwrap();
    let items = doc.graph().seq(doc.at("$.items").unwrap()).unwrap();
    assert!(items.is_empty());
}

#[test]
fn unwrapped_fields_take_keys_from_this_level() {
    let doc = from_str(
        r#"{"name": "a", "city": "Paris", "zip": "75001", "color": "red"}"#,
        &ValueType::record("Person"),
        &registry(),
    )
    .unwrap();
    let address = doc.record_at("$.address").unwrap();
    assert_eq!(address.type_name(), "Address");
    assert_eq!(address.get("city"), Some(&Value::from("Paris")));
    assert_eq!(address.get("zip"), Some(&Value::from("75001")));
    let attrs = doc.graph().map(doc.at("$.attrs").unwrap()).unwrap();
    assert_eq!(attrs.get_str("color"), Some(&Value::from("red")));
    assert!(doc.record_at("$").unwrap().extras().is_empty());
}

#[test]
fn nested_records_and_empty_strings() {
    let mut registry = registry();
    registry
        .register_record(
            TypeDescriptor::builder("Team")
                .field(FieldDescriptor::builder("lead", ValueType::record("User")))
                .field(FieldDescriptor::builder(
                    "members",
                    ValueType::list(ValueType::record("User")),
                ))
                .build()
                .unwrap(),
        )
        .unwrap();
    let doc = from_str(
        r#"{"lead": {"id": 1}, "members": [{"id": 2}, "", null]}"#,
        &ValueType::record("Team"),
        &registry,
    )
    .unwrap();
    assert_eq!(doc.at("$.lead.id"), Some(&Value::Int(1)));
    assert_eq!(doc.at("$.members[0].id"), Some(&Value::Int(2)));
    assert_eq!(doc.at("$.members[1]"), Some(&Value::Null));
    assert_eq!(doc.at("$.members[2]"), Some(&Value::Null));
}
