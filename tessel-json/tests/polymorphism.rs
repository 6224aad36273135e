use tessel_core::{AllowList, FieldDescriptor, TypeDescriptor, TypeRegistry, Value, ValueType};
use tessel_json::{DeserErrorKind, Features, ParserConfig, from_str, from_str_with_config};
use tessel_testhelpers::test;

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register_record(
            TypeDescriptor::builder("Shape")
                .field(FieldDescriptor::builder("label", ValueType::Str))
                .subtype("Circle")
                .subtype("Square")
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_record(
            TypeDescriptor::builder("Circle")
                .tag("circle")
                .extends("Shape")
                .field(FieldDescriptor::builder("label", ValueType::Str))
                .field(FieldDescriptor::builder("radius", ValueType::DOUBLE))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_record(
            TypeDescriptor::builder("Square")
                .extends("Shape")
                .field(FieldDescriptor::builder("label", ValueType::Str))
                .field(FieldDescriptor::builder("side", ValueType::DOUBLE))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_record(
            TypeDescriptor::builder("app.Triangle")
                .extends("Shape")
                .field(FieldDescriptor::builder("label", ValueType::Str))
                .field(FieldDescriptor::builder("base", ValueType::DOUBLE))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_record(
            TypeDescriptor::builder("app.Other")
                .field(FieldDescriptor::builder("x", ValueType::INT))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
}

fn shape() -> ValueType {
    ValueType::record("Shape")
}

#[test]
fn leading_discriminator_selects_the_subtype() {
    let doc = from_str(
        r#"{"@type": "circle", "label": "c", "radius": 2}"#,
        &shape(),
        &registry(),
    )
    .unwrap();
    let circle = doc.record_at("$").unwrap();
    assert_eq!(circle.type_name(), "Circle");
    assert_eq!(circle.get("label"), Some(&Value::from("c")));
    assert_eq!(circle.get("radius"), Some(&Value::Float(2.0)));
    assert!(circle.extras().is_empty());
}

#[test]
fn discriminator_may_be_the_type_name() {
    let doc = from_str(r#"{"@type": "Square", "side": 1.5}"#, &shape(), &registry()).unwrap();
    let square = doc.record_at("$").unwrap();
    assert_eq!(square.type_name(), "Square");
    assert_eq!(square.get("side"), Some(&Value::Float(1.5)));
}

#[test]
fn late_discriminator_rereads_the_object() {
    let doc = from_str(
        r#"{"label": "late", "radius": 3, "@type": "circle"}"#,
        &shape(),
        &registry(),
    )
    .unwrap();
    let circle = doc.record_at("$").unwrap();
    assert_eq!(circle.type_name(), "Circle");
    assert_eq!(circle.get("label"), Some(&Value::from("late")));
    assert_eq!(circle.get("radius"), Some(&Value::Float(3.0)));
}

#[test]
fn own_name_keeps_the_declared_type() {
    let doc = from_str(r#"{"@type": "Shape", "label": "plain"}"#, &shape(), &registry()).unwrap();
    let shape = doc.record_at("$").unwrap();
    assert_eq!(shape.type_name(), "Shape");
    assert_eq!(shape.get("label"), Some(&Value::from("plain")));
    assert!(shape.extras().is_empty());
}

#[test]
fn no_discriminator_keeps_the_declared_type() {
    let doc = from_str(r#"{"label": "x", "radius": 1}"#, &shape(), &registry()).unwrap();
    let shape = doc.record_at("$").unwrap();
    assert_eq!(shape.type_name(), "Shape");
    assert_eq!(shape.extras().get("radius"), Some(&Value::Int(1)));
}

#[test]
fn elements_pick_their_own_subtypes() {
    let doc = from_str(
        r#"[{"@type": "circle", "radius": 1}, {"@type": "Square", "side": 2}, {"label": "s"}]"#,
        &ValueType::list(shape()),
        &registry(),
    )
    .unwrap();
    let names: Vec<_> = (0..3)
        .map(|i| doc.record_at(&format!("$[{i}]")).unwrap().type_name().to_owned())
        .collect();
    assert_eq!(names, ["Circle", "Square", "Shape"]);
}

#[test]
fn undeclared_subtypes_need_a_guard() {
    let registry = registry();
    let input = r#"{"@type": "app.Triangle", "base": 4}"#;

    let err = from_str(input, &shape(), &registry).unwrap_err();
    insta::assert_snapshot!(err, @"cannot use type `app.Triangle`: type is not allowed (in `Shape`)");

    let config = ParserConfig::builder().guard(AllowList::new(["app."])).build();
    let doc = from_str_with_config(input, &shape(), &registry, &config).unwrap();
    let triangle = doc.record_at("$").unwrap();
    assert_eq!(triangle.type_name(), "app.Triangle");
    assert_eq!(triangle.get("base"), Some(&Value::Float(4.0)));
}

#[test]
fn safe_mode_only_trusts_declared_subtypes() {
    let registry = registry();
    let config = ParserConfig::builder()
        .features(Features::SAFE_MODE)
        .guard(AllowList::new(["app."]))
        .build();

    let err = from_str_with_config(
        r#"{"@type": "app.Triangle"}"#,
        &shape(),
        &registry,
        &config,
    )
    .unwrap_err();
    assert!(matches!(
        err.kind,
        DeserErrorKind::UnknownType {
            reason: tessel_core::SubtypeError::Disallowed,
            ..
        }
    ));

    let doc = from_str_with_config(r#"{"@type": "circle"}"#, &shape(), &registry, &config).unwrap();
    assert_eq!(doc.record_at("$").unwrap().type_name(), "Circle");
}

#[test]
fn unrelated_types_are_rejected() {
    let config = ParserConfig::builder().guard(AllowList::new(["app."])).build();
    let err = from_str_with_config(r#"{"@type": "app.Other"}"#, &shape(), &registry(), &config)
        .unwrap_err();
    insta::assert_snapshot!(err, @"cannot use type `app.Other`: type is not a subtype of the expected type (in `Shape`)");
}

#[test]
fn unknown_type_names_get_a_suggestion() {
    let err = from_str(r#"{"@type": "Circel"}"#, &shape(), &registry()).unwrap_err();
    match &err.kind {
        DeserErrorKind::UnknownType {
            name,
            reason,
            suggestion,
        } => {
            assert_eq!(name, "Circel");
            assert_eq!(*reason, tessel_core::SubtypeError::Unregistered);
            assert_eq!(suggestion.as_deref(), Some("Circle"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn discriminator_must_be_a_string() {
    let err = from_str(r#"{"@type": 1}"#, &shape(), &registry()).unwrap_err();
    assert!(err.is_mismatch());
}

#[test]
fn custom_type_key() {
    let registry = registry();
    let config = ParserConfig::builder().type_key("kind").build();
    let doc = from_str_with_config(
        r#"{"kind": "circle", "radius": 1, "@type": "Square"}"#,
        &shape(),
        &registry,
        &config,
    )
    .unwrap();
    let circle = doc.record_at("$").unwrap();
    assert_eq!(circle.type_name(), "Circle");
    // the default key is an ordinary unknown key now
    assert_eq!(circle.extras().get("@type"), Some(&Value::from("Square")));
}

#[test]
fn special_keys_can_be_disabled() {
    let config = ParserConfig::builder()
        .features(Features::DISABLE_SPECIAL_KEY_DETECT)
        .build();
    let doc = from_str_with_config(
        r#"{"@type": "circle", "radius": 1}"#,
        &shape(),
        &registry(),
        &config,
    )
    .unwrap();
    let shape = doc.record_at("$").unwrap();
    assert_eq!(shape.type_name(), "Shape");
    assert_eq!(shape.extras().get("@type"), Some(&Value::from("circle")));
}

#[test]
fn untyped_positions_only_redirect_through_the_guard() {
    let registry = registry();
    let input = r#"{"@type": "circle", "radius": 1}"#;

    let doc = from_str(input, &ValueType::Any, &registry).unwrap();
    let map = doc.graph().map(doc.root()).unwrap();
    assert_eq!(map.get_str("@type"), Some(&Value::from("circle")));

    let config = ParserConfig::builder().guard(AllowList::new(["Circle"])).build();
    let doc = from_str_with_config(input, &ValueType::Any, &registry, &config).unwrap();
    let circle = doc.record_at("$").unwrap();
    assert_eq!(circle.type_name(), "Circle");
    assert_eq!(circle.get("radius"), Some(&Value::Float(1.0)));
}

#[test]
fn positional_arrays_with_a_discriminator() {
    let config = ParserConfig::builder()
        .features(Features::SUPPORT_ARRAY_TO_BEAN)
        .build();
    let doc = from_str_with_config(
        r#"["@type": "circle", "c", 2]"#,
        &shape(),
        &registry(),
        &config,
    )
    .unwrap();
    let circle = doc.record_at("$").unwrap();
    assert_eq!(circle.type_name(), "Circle");
    assert_eq!(circle.get("radius"), Some(&Value::Float(2.0)));
}
