use miette::Diagnostic;
use tessel_core::{FieldDescriptor, TypeDescriptor, TypeRegistry, Value, ValueType};
use tessel_json::{
    DeserError, DeserErrorKind, Features, ParserConfig, from_str, from_str_with_config, parse,
};
use tessel_testhelpers::test;

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register_record(
            TypeDescriptor::builder("User")
                .field(FieldDescriptor::builder("id", ValueType::LONG))
                .field(FieldDescriptor::builder("user_name", ValueType::Str))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_record(
            TypeDescriptor::builder("Account")
                .field(FieldDescriptor::builder("id", ValueType::LONG))
                .field(FieldDescriptor::builder("owner", ValueType::record("User")))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
}

fn user_err(input: &str) -> DeserError {
    from_str(input, &ValueType::record("User"), &registry()).unwrap_err()
}

#[test]
fn truncated_input() {
    let err = user_err(r#"{"id": 1"#);
    insta::assert_snapshot!(err, @"unexpected end of input, expected `,` or `}` (in `User`)");
    assert_eq!(err.code().unwrap().to_string(), "tessel::unexpected_eof");
}

#[test]
fn trailing_input() {
    let err = user_err("{} 1");
    insta::assert_snapshot!(err, @"trailing input after the top-level value: number `1`");
    assert_eq!(err.code().unwrap().to_string(), "tessel::trailing_input");
}

#[test]
fn mismatched_field_names_the_field() {
    let err = user_err(r#"{"id": "abc"}"#);
    insta::assert_snapshot!(err, @r#"type mismatch: expected long, found string "abc" (at `User.id`)"#);
}

#[test]
fn array_for_a_record_is_a_mismatch() {
    let input = r#"{"id": 1, "owner": [1, 2]}"#;
    let account = ValueType::record("Account");
    let err = from_str(input, &account, &registry()).unwrap_err();
    insta::assert_snapshot!(err, @"type mismatch: expected User, found `[` (in `User`)");
    assert!(err.is_mismatch());
    assert_eq!(err.span.map(|span| span.offset), Some(19));

    let config = ParserConfig::builder()
        .features(Features::IGNORE_MISMATCHED_VALUES)
        .build();
    let doc = from_str_with_config(input, &account, &registry(), &config).unwrap();
    let record = doc.record_at("$").unwrap();
    assert_eq!(record.get("id"), Some(&Value::Int(1)));
    assert_eq!(record.get("owner"), Some(&Value::Null));
    let owner = doc.graph().seq(&record.extras()["owner"]).unwrap();
    assert_eq!(owner.items(), [Value::Int(1), Value::Int(2)]);
}

#[test]
fn deep_nesting_stops_at_the_depth_limit() {
    let input = format!("{}{}", "[".repeat(20_000), "]".repeat(20_000));
    let err = parse(&input).unwrap_err();
    insta::assert_snapshot!(err.kind, @"arrays and objects are nested deeper than 128 levels");
    assert_eq!(err.kind.code(), "tessel::depth_limit_exceeded");
    assert_eq!(err.span.map(|span| span.offset), Some(128));

    let config = ParserConfig::builder().max_depth(3).build();
    let list = ValueType::list(ValueType::Any);
    let doc = from_str_with_config("[[[1]]]", &list, &registry(), &config).unwrap();
    assert_eq!(doc.at("$[0][0][0]"), Some(&Value::Int(1)));
    let err = from_str_with_config("[[[[1]]]]", &list, &registry(), &config).unwrap_err();
    assert_eq!(err.kind, DeserErrorKind::DepthLimitExceeded { limit: 3 });

    let nested = r#"{"id": 1, "owner": {"id": 2}}"#;
    let account = ValueType::record("Account");
    assert!(from_str_with_config(nested, &account, &registry(), &config).is_ok());
    let config = ParserConfig::builder().max_depth(1).build();
    let err = from_str_with_config(nested, &account, &registry(), &config).unwrap_err();
    assert_eq!(err.kind, DeserErrorKind::DepthLimitExceeded { limit: 1 });
}

#[test]
fn unknown_field_points_at_the_key() {
    let config = ParserConfig::builder()
        .features(Features::FAIL_ON_UNKNOWN_PROPERTIES)
        .build();
    let input = r#"{"usr_name": "x"}"#;
    let err = from_str_with_config(input, &ValueType::record("User"), &registry(), &config)
        .unwrap_err();

    insta::assert_snapshot!(err, @"unknown field `usr_name` (in `User`)");
    assert_eq!(err.code().unwrap().to_string(), "tessel::unmapped_field");
    assert_eq!(
        err.help().unwrap().to_string(),
        "did you mean `user_name`?"
    );
    let label = err.labels().unwrap().next().unwrap();
    assert_eq!(label.offset(), 1);
    assert_eq!(label.label(), Some("unknown field `usr_name`"));
    assert!(err.source_code().is_some());
}

#[test]
fn unregistered_declared_type() {
    let err = from_str("{}", &ValueType::record("Usr"), &registry()).unwrap_err();
    insta::assert_snapshot!(err, @"cannot use type `Usr`: type is not registered");
    assert_eq!(err.help().unwrap().to_string(), "did you mean `User`?");
}

#[test]
fn errors_render_as_reports() {
    let err = user_err(r#"{"id": 1"#);
    let report = miette::Report::new(err);
    assert!(format!("{report:?}").contains("tessel::unexpected_eof"));
}
