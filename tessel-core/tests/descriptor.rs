use tessel_core::{
    DescriptorError, EnumConstant, EnumDescriptor, FieldDescriptor, TypeDescriptor, TypeFlags,
    ValueType, hash,
};
use tessel_testhelpers::test;

fn account() -> TypeDescriptor {
    TypeDescriptor::builder("Account")
        .field(FieldDescriptor::builder("user_name", ValueType::Str))
        .field(FieldDescriptor::builder("id", ValueType::LONG).alias("account_id"))
        .field(FieldDescriptor::builder("active", ValueType::BOOL))
        .field(FieldDescriptor::builder("balance", ValueType::DOUBLE))
        .field(FieldDescriptor::builder("ssn", ValueType::Str).exact_only())
        .build()
        .unwrap()
}

#[test]
fn sorted_order_is_a_permutation_of_declaration_order() {
    let ty = account();
    let mut sorted = ty.sorted().to_vec();
    let names: Vec<&str> = sorted.iter().map(|&i| ty.fields()[i].name()).collect();
    assert_eq!(names, ["active", "balance", "id", "ssn", "user_name"]);
    sorted.sort_unstable();
    assert_eq!(sorted, (0..ty.fields().len()).collect::<Vec<_>>());
}

#[test]
fn fields_know_their_declaration_index() {
    let ty = account();
    for (i, field) in ty.fields().iter().enumerate() {
        assert_eq!(field.index(), i);
        assert_eq!(ty.find_exact(field.name()), Some(i));
        assert_eq!(field.hash(), hash::fnv1a_64(field.name()));
    }
    assert_eq!(ty.find_exact("missing"), None);
}

#[test]
fn aliases_resolve_through_the_exact_table() {
    let ty = account();
    assert_eq!(ty.find_exact("account_id"), None);
    assert_eq!(ty.find("account_id"), Some(1));
}

#[test]
fn exact_and_smart_tables_agree_on_every_field_name() {
    let ty = account();
    for field in ty.fields() {
        assert_eq!(ty.tables().exact(field.name()), Some(field.index()));
        if !field.has(tessel_core::FieldFlags::NO_SMART_MATCH) {
            assert_eq!(ty.smart_match(field.name()), Some(field.index()));
        }
    }
}

#[test]
fn smart_match_ignores_case_and_separators() {
    let ty = account();
    assert_eq!(ty.smart_match("UserName"), Some(0));
    assert_eq!(ty.smart_match("user-name"), Some(0));
    assert_eq!(ty.smart_match("USER_NAME"), Some(0));
    assert_eq!(ty.smart_match("AccountId"), Some(1));
    assert_eq!(ty.smart_match("nickname"), None);
}

#[test]
fn exact_only_fields_are_not_smart_matched() {
    let ty = account();
    assert_eq!(ty.find("ssn"), Some(4));
    assert_eq!(ty.smart_match("SSN"), None);
}

#[test]
fn is_prefix_is_only_stripped_for_booleans() {
    let ty = account();
    assert_eq!(ty.smart_match("isActive"), Some(2));
    assert_eq!(ty.smart_match("is_active"), Some(2));
    assert_eq!(ty.smart_match("isBalance"), None);
}

#[test]
fn colliding_smart_names_never_match() {
    let ty = TypeDescriptor::builder("Clash")
        .field(FieldDescriptor::builder("userId", ValueType::LONG))
        .field(FieldDescriptor::builder("user_id", ValueType::LONG))
        .build()
        .unwrap();
    assert_eq!(ty.find("userId"), Some(0));
    assert_eq!(ty.find("user_id"), Some(1));
    assert_eq!(ty.smart_match("UserId"), None);
}

#[test]
fn type_flag_disables_smart_match() {
    let ty = TypeDescriptor::builder("Strict")
        .field(FieldDescriptor::builder("user_name", ValueType::Str))
        .flags(TypeFlags::NO_SMART_MATCH)
        .build()
        .unwrap();
    assert_eq!(ty.smart_match("userName"), None);
    assert_eq!(ty.find("user_name"), Some(0));
}

#[test]
fn duplicate_field_names_are_rejected() {
    let err = TypeDescriptor::builder("Twice")
        .field(FieldDescriptor::builder("a", ValueType::INT))
        .field(FieldDescriptor::builder("b", ValueType::INT))
        .field(FieldDescriptor::builder("a", ValueType::Str))
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        DescriptorError::DuplicateField {
            type_name: "Twice".into(),
            field: "a".into(),
        }
    );
    assert_eq!(err.to_string(), "type `Twice` declares field `a` twice");
}

#[test]
fn tag_defaults_to_name() {
    let ty = account();
    assert_eq!(ty.tag(), "Account");
    let tagged = TypeDescriptor::builder("Circle").tag("circle").build().unwrap();
    assert_eq!(tagged.tag(), "circle");
}

#[test]
fn enum_lookup_is_case_sensitive_first() {
    let color = EnumDescriptor::new(
        "Color",
        [
            EnumConstant::new("RED"),
            EnumConstant::new("Green").alias("verde"),
            EnumConstant::new("green"),
        ],
    );
    assert_eq!(color.lookup("RED"), Some(0));
    assert_eq!(color.lookup("red"), Some(0));
    assert_eq!(color.lookup("Green"), Some(1));
    assert_eq!(color.lookup("green"), Some(2));
    assert_eq!(color.lookup("VERDE"), Some(1));
    // "GREEN" folds onto two constants
    assert_eq!(color.lookup("GREEN"), None);
    assert_eq!(color.lookup("blue"), None);
    assert_eq!(color.by_ordinal(2).map(|c| c.name()), Some("green"));
    assert!(color.by_ordinal(3).is_none());
}
