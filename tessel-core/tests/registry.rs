use std::sync::Arc;

use tessel_core::{
    AllowList, Document, FieldDescriptor, Graph, Key, MapKind, MapNode, Node, Record, SeqKind,
    RegistryError, SeqNode, SubtypeError, TypeDescriptor, TypeRegistry, Value, ValueType,
};
use tessel_testhelpers::test;

fn shapes() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register_record(
            TypeDescriptor::builder("Shape")
                .subtype("Circle")
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_record(
            TypeDescriptor::builder("Circle")
                .tag("circle")
                .extends("Shape")
                .subtype("Ring")
                .field(FieldDescriptor::builder("radius", ValueType::DOUBLE))
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_record(
            TypeDescriptor::builder("Ring")
                .extends("Circle")
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_record(
            TypeDescriptor::builder("app.Square")
                .extends("Shape")
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register_record(TypeDescriptor::builder("app.Unrelated").build().unwrap())
        .unwrap();
    registry
}

#[test]
fn declared_subtypes_are_always_trusted() {
    let registry = shapes();
    let shape = registry.record("Shape").unwrap();
    let circle = registry.resolve_subtype("circle", shape, None, false).unwrap();
    assert_eq!(circle.name(), "Circle");
    let ring = registry.resolve_subtype("Ring", shape, None, true).unwrap();
    assert_eq!(ring.name(), "Ring");
}

#[test]
fn other_registered_types_need_the_guard() {
    let registry = shapes();
    let shape = registry.record("Shape").unwrap();
    assert_eq!(
        registry.resolve_subtype("app.Square", shape, None, false).unwrap_err(),
        SubtypeError::Disallowed
    );
    let guard = AllowList::new(["app."]);
    let square = registry
        .resolve_subtype("app.Square", shape, Some(&guard), false)
        .unwrap();
    assert_eq!(square.name(), "app.Square");
    assert_eq!(
        registry
            .resolve_subtype("app.Square", shape, Some(&guard), true)
            .unwrap_err(),
        SubtypeError::Disallowed
    );
}

#[test]
fn unrelated_and_unknown_types_are_rejected() {
    let registry = shapes();
    let shape = registry.record("Shape").unwrap();
    let guard = AllowList::new(["app."]);
    assert_eq!(
        registry
            .resolve_subtype("app.Unrelated", shape, Some(&guard), false)
            .unwrap_err(),
        SubtypeError::NotAssignable
    );
    assert_eq!(
        registry
            .resolve_subtype("Triangle", shape, Some(&guard), false)
            .unwrap_err(),
        SubtypeError::Unregistered
    );
}

#[test]
fn assignability_follows_the_supertype_chain() {
    let registry = shapes();
    let shape = registry.record("Shape").unwrap();
    let ring = registry.record("Ring").unwrap();
    let circle = registry.record("Circle").unwrap();
    assert!(registry.is_assignable(ring, shape));
    assert!(registry.is_assignable(ring, circle));
    assert!(!registry.is_assignable(circle, ring));
}

#[test]
fn tags_belong_to_one_type() {
    let mut registry = shapes();
    let err = registry
        .register_record(TypeDescriptor::builder("Disc").tag("circle").build().unwrap())
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::DuplicateTag {
            tag: "circle".into(),
            owner: "Circle".into(),
        }
    );
    assert!(registry.record("Disc").is_none());
    assert_eq!(registry.by_tag("circle").unwrap().name(), "Circle");

    // re-registering a name replaces the type and releases its old tag
    registry
        .register_record(TypeDescriptor::builder("Circle").tag("round").build().unwrap())
        .unwrap();
    assert!(registry.record("Circle").unwrap().fields().is_empty());
    assert_eq!(registry.by_tag("round").unwrap().name(), "Circle");
    assert!(registry.by_tag("circle").is_none());
    registry
        .register_record(TypeDescriptor::builder("Disc").tag("circle").build().unwrap())
        .unwrap();
    assert_eq!(registry.by_tag("circle").unwrap().name(), "Disc");
}

#[test]
fn graph_paths_walk_records_maps_and_sequences() {
    let registry = shapes();
    let circle = registry.record("Circle").unwrap().clone();

    let mut graph = Graph::new();
    let record = graph.alloc(Node::Record(Record::new(
        Arc::clone(&circle),
        vec![Value::Float(2.5)],
    )));
    let mut seq = SeqNode::new(SeqKind::List);
    seq.push(Value::Node(record));
    let list = graph.alloc(Node::Seq(seq));
    let mut map = MapNode::new(MapKind::Linked);
    map.insert(Key::from("shapes"), Value::Node(list));
    let root = graph.alloc(Node::Map(map));

    let doc = Document::new(graph, Value::Node(root));
    assert_eq!(doc.at("$.shapes[0].radius"), Some(&Value::Float(2.5)));
    assert_eq!(doc.record_at("$.shapes[0]").unwrap().type_name(), "Circle");
    assert_eq!(doc.at("$.shapes[1]"), None);
    assert_eq!(doc.at("shapes"), None);
}

#[test]
fn sets_deduplicate_and_sorted_containers_sort_on_finish() {
    let mut graph = Graph::new();
    let mut set = SeqNode::new(SeqKind::SortedSet);
    for n in [3, 1, 3, 2] {
        set.push(Value::Int(n));
    }
    let id = graph.alloc(Node::Seq(set));
    graph.finish(id);
    let items = graph.seq(&Value::Node(id)).unwrap().items();
    assert_eq!(items, [Value::Int(1), Value::Int(2), Value::Int(3)]);

    let mut map = MapNode::new(MapKind::Sorted);
    map.insert(Key::from("b"), Value::Int(2));
    map.insert(Key::from("a"), Value::Int(1));
    let id = graph.alloc(Node::Map(map));
    graph.finish(id);
    let keys: Vec<String> = graph
        .map(&Value::Node(id))
        .unwrap()
        .entries()
        .keys()
        .map(|k| k.to_string())
        .collect();
    assert_eq!(keys, ["a", "b"]);

    let mut set = SeqNode::new(SeqKind::SortedSet);
    for value in [Value::Float(2.5), Value::Int(-3), Value::Float(-0.5), Value::Int(2)] {
        set.push(value);
    }
    let id = graph.alloc(Node::Seq(set));
    graph.finish(id);
    let items = graph.seq(&Value::Node(id)).unwrap().items();
    assert_eq!(
        items,
        [Value::Int(-3), Value::Float(-0.5), Value::Int(2), Value::Float(2.5)]
    );
}

#[test]
fn keys_order_numbers_by_value() {
    let mut keys = vec![
        Key::from(&Value::Float(10.0)),
        Key::from(&Value::Float(-1.0)),
        Key::from(&Value::Int(3)),
        Key::from(&Value::Float(3.0)),
        Key::from("a"),
        Key::from(&Value::Bool(true)),
    ];
    keys.sort();
    let text: Vec<String> = keys.iter().map(ToString::to_string).collect();
    assert_eq!(text, ["true", "-1", "3", "3", "10", "a"]);
    assert_eq!(keys[2], Key::Int(3));
    assert_ne!(Key::from(&Value::Int(3)), Key::from(&Value::Float(3.0)));
}

#[test]
fn concurrent_maps_skip_nulls() {
    let mut map = MapNode::new(MapKind::Concurrent);
    map.insert(Key::from("a"), Value::Null);
    map.insert(Key::from("b"), Value::Int(1));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get_str("b"), Some(&Value::Int(1)));
}
