//! Arena holding every container produced by one parse.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::ops::{Index, IndexMut};
use std::collections::HashSet;

use indexmap::IndexMap;

use crate::{Key, MapKind, Path, PathStep, SeqKind, TypeDescriptor, Value};

/// Handle to a node in a [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Instance of a record type.
#[derive(Debug, Clone)]
pub struct Record {
    ty: Arc<TypeDescriptor>,
    slots: Vec<Value>,
    extras: IndexMap<String, Value>,
}

impl Record {
    /// Instance of `ty` holding `slots` in field declaration order.
    pub fn new(ty: Arc<TypeDescriptor>, slots: Vec<Value>) -> Self {
        Self {
            ty,
            slots,
            extras: IndexMap::new(),
        }
    }

    /// Descriptor of the instance's type.
    pub fn ty(&self) -> &Arc<TypeDescriptor> {
        &self.ty
    }

    /// Registered name of the instance's type.
    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    /// Field values in declaration order.
    pub fn slots(&self) -> &[Value] {
        &self.slots
    }

    /// Value of field `index`.
    pub fn slot(&self, index: usize) -> Option<&Value> {
        self.slots.get(index)
    }

    /// Value of the field named `name` (or aliased so), falling back to extras.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.ty.find(name) {
            Some(index) => self.slots.get(index),
            None => self.extras.get(name),
        }
    }

    /// Assign field `index`. Out of range indices are ignored.
    pub fn set(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = value;
        }
    }

    /// Keys that matched no field, in document order.
    pub fn extras(&self) -> &IndexMap<String, Value> {
        &self.extras
    }

    /// Store an unmatched key.
    pub fn set_extra(&mut self, key: String, value: Value) {
        self.extras.insert(key, value);
    }
}

/// Associative container.
#[derive(Debug, Clone, Default)]
pub struct MapNode {
    kind: MapKind,
    entries: IndexMap<Key, Value>,
}

impl MapNode {
    /// Empty map of the given flavour.
    pub fn new(kind: MapKind) -> Self {
        Self {
            kind,
            entries: IndexMap::new(),
        }
    }

    /// Container flavour.
    pub fn kind(&self) -> &MapKind {
        &self.kind
    }

    /// Entries; insertion order unless the map is sorted.
    pub fn entries(&self) -> &IndexMap<Key, Value> {
        &self.entries
    }

    /// Value under `key`.
    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Value under a string key.
    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.entries.get(&Key::Str(key.into()))
    }

    /// Insert, replacing any previous value. Concurrent maps drop null values.
    pub fn insert(&mut self, key: Key, value: Value) {
        if self.kind == MapKind::Concurrent && value.is_null() {
            return;
        }
        self.entries.insert(key, value);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn finish(&mut self) {
        if self.kind == MapKind::Sorted {
            self.entries.sort_keys();
        }
    }
}

/// Sequence container.
#[derive(Debug, Clone, Default)]
pub struct SeqNode {
    kind: SeqKind,
    items: Vec<Value>,
    seen: HashSet<Key>,
}

impl SeqNode {
    /// Empty sequence of the given flavour.
    pub fn new(kind: SeqKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Container flavour.
    pub fn kind(&self) -> SeqKind {
        self.kind
    }

    /// Elements.
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Append; sets ignore an element equal to one already present.
    ///
    /// Returns the element's position, or `None` if it was dropped.
    pub fn push(&mut self, value: Value) -> Option<usize> {
        if self.kind.is_set() && !self.seen.insert(Key::from(&value)) {
            return None;
        }
        self.items.push(value);
        Some(self.items.len() - 1)
    }

    /// Append a null placeholder, exempt from deduplication, and return its
    /// position. The element is filled in later with [`set`](Self::set) and the
    /// set semantics restored by [`Graph::renormalize`].
    pub fn reserve_slot(&mut self) -> usize {
        self.items.push(Value::Null);
        self.items.len() - 1
    }

    /// Replace the element at `index`. Out of range indices are ignored.
    pub fn set(&mut self, index: usize, value: Value) {
        if let Some(item) = self.items.get_mut(index) {
            *item = value;
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the sequence has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop duplicates again after elements were replaced in place.
    fn renormalize(&mut self) {
        if !self.kind.is_set() {
            return;
        }
        self.seen.clear();
        let items = core::mem::take(&mut self.items);
        for item in items {
            self.push(item);
        }
    }

    fn finish(&mut self) {
        if self.kind == SeqKind::SortedSet {
            self.items.sort_by_cached_key(|item| Key::from(item));
        }
    }
}

/// Error value: message, cause and stack trace.
#[derive(Debug, Clone, Default)]
pub struct ErrorNode {
    /// Discriminator value, if the object carried one.
    pub type_name: Option<String>,
    /// `message`
    pub message: Option<String>,
    /// `cause`, another error node or null.
    pub cause: Value,
    /// `stackTrace`, kept untyped.
    pub stack_trace: Value,
    /// Every other key.
    pub extras: IndexMap<String, Value>,
}

/// A container in the graph.
#[derive(Debug, Clone)]
pub enum Node {
    /// record instance
    Record(Record),
    /// map
    Map(MapNode),
    /// list or set
    Seq(SeqNode),
    /// error value
    Error(ErrorNode),
}

impl Node {
    /// Child reached by one path step.
    pub fn child(&self, step: &PathStep) -> Option<&Value> {
        match (self, step) {
            (Node::Record(record), PathStep::Field(name)) => record.get(name),
            (Node::Map(map), PathStep::Field(name)) => map.get_str(name),
            (Node::Map(map), PathStep::Index(i)) => map
                .get(&Key::Int(*i as i64))
                .or_else(|| map.get_str(&i.to_string())),
            (Node::Seq(seq), PathStep::Index(i)) => seq.items.get(*i),
            (Node::Error(error), PathStep::Field(name)) => match name.as_str() {
                "cause" => Some(&error.cause),
                "stackTrace" => Some(&error.stack_trace),
                _ => error.extras.get(name),
            },
            _ => None,
        }
    }
}

/// Arena of nodes addressed by [`NodeId`].
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its handle.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Node behind `id`.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Mutable node behind `id`.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The record behind `value`, if it is one.
    pub fn record(&self, value: &Value) -> Option<&Record> {
        match self.get(value.as_node()?)? {
            Node::Record(record) => Some(record),
            _ => None,
        }
    }

    /// The map behind `value`, if it is one.
    pub fn map(&self, value: &Value) -> Option<&MapNode> {
        match self.get(value.as_node()?)? {
            Node::Map(map) => Some(map),
            _ => None,
        }
    }

    /// The sequence behind `value`, if it is one.
    pub fn seq(&self, value: &Value) -> Option<&SeqNode> {
        match self.get(value.as_node()?)? {
            Node::Seq(seq) => Some(seq),
            _ => None,
        }
    }

    /// The error behind `value`, if it is one.
    pub fn error(&self, value: &Value) -> Option<&ErrorNode> {
        match self.get(value.as_node()?)? {
            Node::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Follow `path` starting at `from`.
    pub fn eval<'g>(&'g self, from: &'g Value, path: &Path) -> Option<&'g Value> {
        path.steps().iter().try_fold(from, |value, step| {
            self.get(value.as_node()?)?.child(step)
        })
    }

    /// Apply the container's completion rule (sorting for sorted flavours).
    pub fn finish(&mut self, id: NodeId) {
        match self.get_mut(id) {
            Some(Node::Map(map)) => map.finish(),
            Some(Node::Seq(seq)) => seq.finish(),
            _ => {}
        }
    }

    /// Deduplicate and re-sort a set after elements were replaced in place.
    pub fn renormalize(&mut self, id: NodeId) {
        if let Some(Node::Seq(seq)) = self.get_mut(id) {
            seq.renormalize();
            seq.finish();
        }
    }
}

impl Index<NodeId> for Graph {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

impl IndexMut<NodeId> for Graph {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }
}

/// Result of a parse: the graph and the root value.
#[derive(Debug, Clone, Default)]
pub struct Document {
    graph: Graph,
    root: Value,
}

impl Document {
    /// Pair a graph with its root.
    pub fn new(graph: Graph, root: Value) -> Self {
        Self { graph, root }
    }

    /// The arena.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The top-level value.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Split into parts.
    pub fn into_parts(self) -> (Graph, Value) {
        (self.graph, self.root)
    }

    /// Value at `path` (`$`, `$.a.b[0]`). `None` if the path is malformed or
    /// leads nowhere.
    pub fn at(&self, path: &str) -> Option<&Value> {
        let path = Path::parse(path)?;
        self.graph.eval(&self.root, &path)
    }

    /// The record at `path`.
    pub fn record_at(&self, path: &str) -> Option<&Record> {
        self.graph.record(self.at(path)?)
    }
}
