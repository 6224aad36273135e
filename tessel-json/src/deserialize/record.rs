//! Record types.
//!
//! Objects are read in two phases. The fast path walks the declared fields in
//! order and expects the next key to be the next field, which is how most
//! producers write them; a key that is not gives up one guess and goes through
//! generic lookup. After too many misses in a row every remaining key goes through
//! generic lookup: exact name or alias, then smart match, then unwrapped
//! fields, then extras.
//!
//! Types with a default creator exist in the graph before their first field is
//! read. Types with a constructor or factory buffer their fields and are
//! created when the object ends.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use indexmap::IndexMap;
use tessel_core::{
    Built, Creator, FieldDescriptor, FieldFlags, Key, MapNode, Node, NodeId, Record, SeqNode,
    TypeDescriptor, Value, ValueType,
};

use super::{ValueDeserializer, array_mapping, deserializer_for, deserializer_for_field};
use crate::context::{CtxId, PathKey};
use crate::error::{DeserError, DeserErrorKind, Result, suggest};
use crate::lexer::{FieldMatch, Scalar, ScanKind, Snapshot, Span, TokenKind};
use crate::reader::JsonReader;
use crate::resolve::Slot;
use crate::Features;

/// Keys that did not match the fast-path guess before the guessing stops.
const MAX_FAST_MISSES: usize = 16;

/// Objects, positional arrays and single-argument scalars into records.
#[derive(Debug, Clone)]
pub struct RecordDeserializer {
    ty: Arc<TypeDescriptor>,
}

/// Where the object started, for re-reading it as a subtype.
#[derive(Debug, Clone, Copy)]
pub(super) struct Origin {
    snapshot: Snapshot,
    tasks: usize,
}

enum Flow {
    Next,
    Done(Value),
}

impl RecordDeserializer {
    /// Deserializer for instances of `ty`.
    pub fn new(ty: Arc<TypeDescriptor>) -> Self {
        Self { ty }
    }

    /// The record type.
    pub fn ty(&self) -> &Arc<TypeDescriptor> {
        &self.ty
    }

    pub(crate) fn deserialize(&self, reader: &mut JsonReader<'_>, key: PathKey) -> Result<Value> {
        self.dispatch(reader, key)
            .map_err(|err| err.with_type(self.ty.name()))
    }

    /// Continue an object whose `{` and discriminator were already consumed by
    /// an untyped reader. The current token is the `,` or `}` after the
    /// discriminator value.
    pub(crate) fn resume(&self, reader: &mut JsonReader<'_>, key: PathKey) -> Result<Value> {
        let start = reader.lexer.span();
        let features = reader.config.features().for_type(&self.ty);
        let build = RecordBuild::new(Arc::clone(&self.ty), features, key, start, None);
        self.continue_object(reader, build)
            .map_err(|err| err.with_type(self.ty.name()))
    }

    fn dispatch(&self, reader: &mut JsonReader<'_>, key: PathKey) -> Result<Value> {
        let features = reader.config.features().for_type(&self.ty);
        let token = reader.lexer.token();
        match token {
            TokenKind::Null => {
                reader.lexer.next_token()?;
                Ok(Value::Null)
            }
            TokenKind::LBrace => {
                let origin = Origin {
                    snapshot: reader.lexer.snapshot(),
                    tasks: reader.state.tasks.len(),
                };
                let start = reader.lexer.span();
                reader.lexer.next_token()?;
                let build =
                    RecordBuild::new(Arc::clone(&self.ty), features, key, start, Some(origin));
                self.read_object(reader, build)
            }
            TokenKind::LBracket if features.contains(Features::SUPPORT_ARRAY_TO_BEAN) => {
                array_mapping::read(self, reader, key, features)
            }
            TokenKind::LBracket => Err(reader.lexer.mismatch(self.ty.name())),
            TokenKind::Str if reader.lexer.string_value().is_empty() => {
                reader.lexer.next_token()?;
                Ok(Value::Null)
            }
            _ if token.is_scalar() => {
                if self.ty.single_param().is_some() {
                    self.from_single(reader)
                } else {
                    Err(reader.lexer.mismatch(self.ty.name()))
                }
            }
            _ => Err(reader.lexer.unexpected("`{`")),
        }
    }

    /// A scalar standing in for the whole instance: it becomes the only
    /// argument of the constructor or factory.
    fn from_single(&self, reader: &mut JsonReader<'_>) -> Result<Value> {
        let span = reader.lexer.span();
        let Some(param) = self.ty.single_param() else {
            return Err(reader.lexer.mismatch(self.ty.name()));
        };
        let de = deserializer_for(&param.ty, reader.registry).map_err(|err| err.or_span(span))?;
        let value = de.deserialize(reader, PathKey::Root)?;
        trace!("`{}` from single argument {:?}", self.ty.name(), value);

        match self.construct(vec![value], span)? {
            Built::Slots(slots) => {
                let record = Record::new(Arc::clone(&self.ty), slots);
                let id = reader.state.graph.alloc(Node::Record(record));
                self.post_build(reader, id, span)
            }
            Built::Value(value) => Ok(value),
        }
    }

    fn continue_object(&self, reader: &mut JsonReader<'_>, build: RecordBuild) -> Result<Value> {
        match reader.lexer.token() {
            TokenKind::Comma => reader.lexer.next_token()?,
            TokenKind::RBrace => {}
            _ => return Err(reader.lexer.unexpected("`,` or `}`")),
        }
        self.read_object(reader, build)
    }

    /// Read members up to and including the closing `}`.
    fn read_object(&self, reader: &mut JsonReader<'_>, mut build: RecordBuild) -> Result<Value> {
        let result = self.read_members(reader, &mut build);
        build.close(reader);
        result
    }

    fn read_members(&self, reader: &mut JsonReader<'_>, build: &mut RecordBuild) -> Result<Value> {
        let ty = Arc::clone(&self.ty);
        let mut misses = 0;

        for (i, field) in ty.fields().iter().enumerate() {
            if misses >= MAX_FAST_MISSES {
                break;
            }
            if reader.lexer.token() == TokenKind::RBrace {
                reader.lexer.next_token()?;
                return self.finish(reader, build);
            }

            let span = reader.lexer.span();
            match reader.lexer.scan_field(field.name(), scan_kind(field.ty()))? {
                FieldMatch::Full(scalar) => {
                    self.assign_scalar(reader, build, field, scalar, span)?;
                    reader.lexer.end_member()?;
                    misses = 0;
                }
                FieldMatch::End(scalar) => {
                    self.assign_scalar(reader, build, field, scalar, span)?;
                    return self.finish(reader, build);
                }
                FieldMatch::Null { end } => {
                    if !field.has(FieldFlags::READ_ONLY) {
                        self.assign_scalar(reader, build, field, Scalar::Null, span)?;
                    }
                    if end {
                        return self.finish(reader, build);
                    }
                    reader.lexer.end_member()?;
                    misses = 0;
                }
                FieldMatch::NamePending => {
                    self.read_field(reader, build, i)?;
                    reader.lexer.end_member()?;
                    misses = 0;
                }
                FieldMatch::NoMatch => {
                    misses += 1;
                    if let Flow::Done(value) = self.member(reader, build)? {
                        return Ok(value);
                    }
                }
            }
        }

        loop {
            if let Flow::Done(value) = self.member(reader, build)? {
                return Ok(value);
            }
        }
    }

    /// One member through generic lookup, or the end of the object.
    fn member(&self, reader: &mut JsonReader<'_>, build: &mut RecordBuild) -> Result<Flow> {
        let span = reader.lexer.span();
        let Some(name) = reader.lexer.scan_key()? else {
            return self.finish(reader, build).map(Flow::Done);
        };

        let special = !build.features.contains(Features::DISABLE_SPECIAL_KEY_DETECT);
        if special && !build.started && name == "$ref" {
            let value = reader.read_ref()?;
            reader.lexer.advance(TokenKind::RBrace)?;
            return Ok(Flow::Done(value));
        }
        if special && name == reader.config.type_key_for(&self.ty) {
            return self.discriminator(reader, build);
        }

        if let Some(i) = self.ty.find(&name) {
            self.read_field(reader, build, i)?;
        } else if let Some(i) = self.smart_match(&name, build) {
            if build.set.contains(i) {
                trace!("`{name}` smart-matches an assigned field, kept as extra");
                self.read_extra(reader, build, name)?;
            } else {
                self.read_field(reader, build, i)?;
            }
        } else if !self.read_unwrapped(reader, build, &name)? {
            if build.features.contains(Features::FAIL_ON_UNKNOWN_PROPERTIES) {
                let suggestion =
                    suggest(&name, self.ty.fields().iter().map(|field| field.name()));
                return Err(DeserError::new(
                    DeserErrorKind::UnmappedField {
                        field: name,
                        suggestion,
                    },
                    span,
                ));
            }
            debug!("`{name}` matches no field of `{}`, kept as extra", self.ty.name());
            self.read_extra(reader, build, name)?;
        }

        reader.lexer.end_member()?;
        Ok(Flow::Next)
    }

    fn smart_match(&self, name: &str, build: &RecordBuild) -> Option<usize> {
        if build.features.contains(Features::DISABLE_FIELD_SMART_MATCH) {
            return None;
        }
        self.ty.smart_match(name)
    }

    /// The type key's value names the concrete type of this object.
    fn discriminator(&self, reader: &mut JsonReader<'_>, build: &mut RecordBuild) -> Result<Flow> {
        if reader.lexer.token() != TokenKind::Str {
            return Err(reader.lexer.mismatch("a type name"));
        }
        let span = reader.lexer.span();
        let tag = reader.lexer.take_string();
        reader.lexer.next_token()?;

        if tag == self.ty.tag() || tag == self.ty.name() {
            reader.lexer.end_member()?;
            return Ok(Flow::Next);
        }

        let registry = reader.registry;
        let sub = registry
            .resolve_subtype(
                &tag,
                &self.ty,
                reader.config.guard(),
                build.features.contains(Features::SAFE_MODE),
            )
            .map_err(|reason| {
                DeserError::new(
                    DeserErrorKind::UnknownType {
                        suggestion: suggest(&tag, registry.names()),
                        name: tag.clone(),
                        reason,
                    },
                    span,
                )
            })?;
        let sub = RecordDeserializer::new(sub);

        if !build.started {
            trace!("`{}` is a `{}`", self.ty.name(), sub.ty.name());
            let features = reader.config.features().for_type(&sub.ty);
            let next = RecordBuild::new(
                Arc::clone(&sub.ty),
                features,
                build.key.clone(),
                build.start,
                build.origin,
            );
            return sub
                .continue_object(reader, next)
                .map(Flow::Done)
                .map_err(|err| err.with_type(sub.ty.name()));
        }

        let Some(origin) = build.origin else {
            return Err(DeserError::new(
                DeserErrorKind::InvalidValue {
                    message: format!(
                        "type key `{}` must precede the fields of `{}`",
                        reader.config.type_key_for(&self.ty),
                        self.ty.name()
                    ),
                },
                span,
            ));
        };
        debug!(
            "type key after fields of `{}`, re-reading as `{}`",
            self.ty.name(),
            sub.ty.name()
        );
        build.close(reader);
        reader.state.tasks.truncate(origin.tasks);
        reader.lexer.restore(origin.snapshot)?;
        sub.deserialize(reader, build.key.clone()).map(Flow::Done)
    }

    /// Read the value of field `i` with its declared deserializer.
    pub(super) fn read_field(
        &self,
        reader: &mut JsonReader<'_>,
        build: &mut RecordBuild,
        i: usize,
    ) -> Result<()> {
        let ty = Arc::clone(&self.ty);
        let Some(field) = ty.field(i) else {
            return Ok(());
        };
        build.begin(reader);

        let span = reader.lexer.span();
        let de = deserializer_for_field(field, reader.registry)
            .map_err(|err| err.or_span(span).with_context(field.name(), ty.name()))?;
        let origin = Origin {
            snapshot: reader.lexer.snapshot(),
            tasks: reader.state.tasks.len(),
        };
        let key = PathKey::Field(field.name().into());

        let result = match build.live_container(reader, field) {
            Some(existing) => fill_in_place(&de, reader, existing, key).map(|()| None),
            None => reader.read_slot(&de, key).map(Some),
        };
        match result {
            Ok(None) => {
                build.set.insert(i);
                Ok(())
            }
            Ok(Some((value, deferred))) => build.assign(reader, field, value, deferred, span),
            Err(err)
                if err.is_mismatch()
                    && build.features.contains(Features::IGNORE_MISMATCHED_VALUES) =>
            {
                debug!("`{}.{}`: {err}, kept as extra", ty.name(), field.name());
                reader.lexer.restore(origin.snapshot)?;
                reader.state.tasks.truncate(origin.tasks);
                self.read_extra(reader, build, field.name().into())
            }
            Err(err) => Err(err.with_context(field.name(), ty.name())),
        }
    }

    /// Assign a scalar the fast path already consumed.
    fn assign_scalar(
        &self,
        reader: &mut JsonReader<'_>,
        build: &mut RecordBuild,
        field: &FieldDescriptor,
        scalar: Scalar,
        span: Span,
    ) -> Result<()> {
        let de = deserializer_for_field(field, reader.registry).map_err(|err| err.or_span(span))?;
        let raw = build
            .features
            .contains(Features::IGNORE_MISMATCHED_VALUES)
            .then(|| scalar.clone());
        match (de.from_scalar(reader, scalar, span), raw) {
            (Ok(value), _) => build.assign(reader, field, value, None, span),
            (Err(err), Some(raw)) if err.is_mismatch() => {
                debug!("`{}.{}`: {err}, kept as extra", self.ty.name(), field.name());
                build.begin(reader);
                build.put_extra(reader, field.name().into(), raw.into_value(), None);
                Ok(())
            }
            (Err(err), _) => Err(err.with_context(field.name(), self.ty.name())),
        }
    }

    fn read_extra(
        &self,
        reader: &mut JsonReader<'_>,
        build: &mut RecordBuild,
        name: String,
    ) -> Result<()> {
        build.begin(reader);
        let (value, deferred) =
            reader.read_slot(&ValueDeserializer::Any, PathKey::Field(name.clone()))?;
        build.put_extra(reader, name, value, deferred);
        Ok(())
    }

    /// Offer `name` to the unwrapped fields: nested records first, then maps.
    /// Returns whether one of them took it.
    fn read_unwrapped(
        &self,
        reader: &mut JsonReader<'_>,
        build: &mut RecordBuild,
        name: &str,
    ) -> Result<bool> {
        let ty = Arc::clone(&self.ty);
        let unwrapped = || ty.fields().iter().filter(|f| f.has(FieldFlags::UNWRAPPED));

        for field in unwrapped() {
            let ValueType::Record(inner) = field.ty() else {
                continue;
            };
            let Some(inner) = reader.registry.record(inner) else {
                continue;
            };
            let Some(j) = inner.find(name) else {
                continue;
            };
            if !inner.creator().is_default() {
                continue;
            }
            let inner = Arc::clone(inner);
            let Some(inner_field) = inner.field(j) else {
                continue;
            };

            build.begin(reader);
            let id = match build.slot_node(reader, field.index()) {
                Some(id) => id,
                None => {
                    let empty_strings =
                        build.features.contains(Features::INIT_STRING_FIELD_AS_EMPTY);
                    let slots = inner.default_slots(empty_strings);
                    let record = Record::new(Arc::clone(&inner), slots);
                    let id = reader.state.graph.alloc(Node::Record(record));
                    build.store(reader, field.index(), Value::Node(id));
                    id
                }
            };

            let span = reader.lexer.span();
            let de = deserializer_for_field(inner_field, reader.registry)
                .map_err(|err| err.or_span(span))?;
            let (value, deferred) = reader
                .read_slot(&de, PathKey::Field(name.into()))
                .map_err(|err| err.with_context(inner_field.name(), inner.name()))?;
            let value = match deferred {
                Some(task) => {
                    reader.bind(task, Slot::Field(id, j));
                    value
                }
                None => inner_field
                    .convert(value)
                    .map_err(|message| invalid(message, span))?,
            };
            if let Some(Node::Record(record)) = reader.state.graph.get_mut(id) {
                record.set(j, value);
            }
            return Ok(true);
        }

        for field in unwrapped() {
            let ValueType::Map { kind, value, .. } = field.ty() else {
                continue;
            };
            build.begin(reader);
            let id = match build.slot_node(reader, field.index()) {
                Some(id) => id,
                None => {
                    let id = reader
                        .state
                        .graph
                        .alloc(Node::Map(MapNode::new(kind.clone())));
                    build.store(reader, field.index(), Value::Node(id));
                    id
                }
            };

            let span = reader.lexer.span();
            let de = deserializer_for(value, reader.registry).map_err(|err| err.or_span(span))?;
            let (value, deferred) = reader.read_slot(&de, PathKey::Field(name.into()))?;
            let key = Key::Str(name.into());
            if let Some(Node::Map(map)) = reader.state.graph.get_mut(id) {
                map.insert(key.clone(), value);
            }
            if let Some(task) = deferred {
                reader.bind(task, Slot::Entry(id, key));
            }
            return Ok(true);
        }

        Ok(false)
    }

    /// The object ended: create the instance if it does not exist yet, then run
    /// the post-build step.
    pub(super) fn finish(
        &self,
        reader: &mut JsonReader<'_>,
        build: &mut RecordBuild,
    ) -> Result<Value> {
        build.begin(reader);

        let id = match build.node {
            Some(id) => id,
            None => {
                let args = build.take_args();
                match self.construct(args, build.start)? {
                    Built::Value(value) => {
                        trace!("factory of `{}` returned a stand-in value", self.ty.name());
                        build.close(reader);
                        return Ok(value);
                    }
                    Built::Slots(slots) => {
                        let mut record = Record::new(Arc::clone(&self.ty), slots);
                        for (i, value) in build.pending.drain(..).enumerate() {
                            if let Some(value) = value {
                                record.set(i, value);
                            }
                        }
                        for (name, value) in build.extras.drain(..) {
                            record.set_extra(name, value);
                        }
                        let id = reader.state.graph.alloc(Node::Record(record));
                        build.node = Some(id);
                        id
                    }
                }
            }
        };

        if let Some(ctx) = build.ctx {
            reader.state.contexts.link(ctx, id);
        }
        for (target, task) in build.deferred.drain(..) {
            let slot = match target {
                Target::Field(i) => Slot::Field(id, i),
                Target::Extra(name) => Slot::Extra(id, name),
            };
            reader.bind(task, slot);
        }
        build.close(reader);
        trace!("finished `{}` as {id}", self.ty.name());
        self.post_build(reader, id, build.start)
    }

    /// Invoke the constructor or factory.
    fn construct(&self, args: Vec<Value>, span: Span) -> Result<Built> {
        let expected = self.ty.fields().len();
        let check = |slots: Vec<Value>| {
            if slots.len() == expected {
                Ok(Built::Slots(slots))
            } else {
                Err(construction(
                    format!(
                        "`{}` was built with {} slots, expected {expected}",
                        self.ty.name(),
                        slots.len()
                    ),
                    span,
                ))
            }
        };
        match self.ty.creator() {
            Creator::Default => Ok(Built::Slots(self.ty.default_slots(false))),
            Creator::Constructor { invoke, .. } => {
                check(invoke(args).map_err(|message| construction(message, span))?)
            }
            Creator::Factory { invoke, .. } => {
                match invoke(args).map_err(|message| construction(message, span))? {
                    Built::Slots(slots) => check(slots),
                    built @ Built::Value(_) => Ok(built),
                }
            }
        }
    }

    fn post_build(&self, reader: &JsonReader<'_>, id: NodeId, span: Span) -> Result<Value> {
        let Some(Node::Record(record)) = reader.state.graph.get(id) else {
            return Ok(Value::Node(id));
        };
        match self.ty.finish(record) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Ok(Value::Node(id)),
            Err(message) => Err(construction(message, span)),
        }
    }
}

fn construction(message: String, span: Span) -> DeserError {
    DeserError::new(DeserErrorKind::Construction { message }, span)
}

fn invalid(message: String, span: Span) -> DeserError {
    DeserError::new(DeserErrorKind::InvalidValue { message }, span)
}

/// Which tokens the fast path may consume on a field's behalf.
fn scan_kind(ty: &ValueType) -> ScanKind {
    use tessel_core::Primitive;

    match ty {
        ValueType::Primitive(p) | ValueType::Boxed(p) => match p {
            Primitive::Bool => ScanKind::Bool,
            Primitive::Int | Primitive::Long => ScanKind::Int,
            Primitive::Double => ScanKind::Float,
        },
        ValueType::Decimal => ScanKind::Decimal,
        ValueType::Str => ScanKind::Str,
        ValueType::Date => ScanKind::Date,
        _ => ScanKind::Value,
    }
}

/// Read a container into the one a read-only field already holds.
fn fill_in_place(
    de: &ValueDeserializer<'_>,
    reader: &mut JsonReader<'_>,
    existing: NodeId,
    key: PathKey,
) -> Result<()> {
    match de {
        ValueDeserializer::Collection(de) => de.read_into(reader, Some(existing), key)?,
        ValueDeserializer::Map(de) => de.read_into(reader, Some(existing), key)?,
        other => other.deserialize(reader, key)?,
    };
    reader.state.pending_ref = None;
    Ok(())
}

/// Bit per declared field: assigned or not.
#[derive(Debug, Default)]
struct FieldSet {
    bits: Vec<u64>,
}

impl FieldSet {
    fn insert(&mut self, i: usize) {
        let (word, bit) = (i / 64, i % 64);
        if self.bits.len() <= word {
            self.bits.resize(word + 1, 0);
        }
        self.bits[word] |= 1 << bit;
    }

    fn contains(&self, i: usize) -> bool {
        self.bits
            .get(i / 64)
            .is_some_and(|word| word & (1 << (i % 64)) != 0)
    }
}

#[derive(Debug, PartialEq)]
enum Target {
    Field(usize),
    Extra(String),
}

/// State of one object being read.
pub(super) struct RecordBuild {
    ty: Arc<TypeDescriptor>,
    features: Features,
    key: PathKey,
    start: Span,
    origin: Option<Origin>,
    started: bool,
    ctx: Option<CtxId>,
    node: Option<NodeId>,
    /// buffered field values, for types without a default creator
    pending: Vec<Option<Value>>,
    extras: IndexMap<String, Value>,
    set: FieldSet,
    /// deferred references and where they go once the instance exists
    deferred: Vec<(Target, usize)>,
}

impl RecordBuild {
    pub(super) fn new(
        ty: Arc<TypeDescriptor>,
        features: Features,
        key: PathKey,
        start: Span,
        origin: Option<Origin>,
    ) -> Self {
        Self {
            ty,
            features,
            key,
            start,
            origin,
            started: false,
            ctx: None,
            node: None,
            pending: Vec::new(),
            extras: IndexMap::new(),
            set: FieldSet::default(),
            deferred: Vec::new(),
        }
    }

    /// Enter the object's context, creating the instance if the type allows it.
    /// Called before the first value is read.
    fn begin(&mut self, reader: &mut JsonReader<'_>) {
        if self.started {
            return;
        }
        self.started = true;

        let node = if self.ty.creator().is_default() {
            let empty_strings = self.features.contains(Features::INIT_STRING_FIELD_AS_EMPTY);
            let mut slots = self.ty.default_slots(empty_strings);
            for field in self.ty.fields().iter().filter(|f| f.has(FieldFlags::READ_ONLY)) {
                let container = match field.ty() {
                    ValueType::List { kind, .. } => Node::Seq(SeqNode::new(*kind)),
                    ValueType::Map { kind, .. } => Node::Map(MapNode::new(kind.clone())),
                    _ => continue,
                };
                let id = reader.state.graph.alloc(container);
                if let Some(slot) = slots.get_mut(field.index()) {
                    *slot = Value::Node(id);
                }
            }
            let record = Record::new(Arc::clone(&self.ty), slots);
            let id = reader.state.graph.alloc(Node::Record(record));
            self.node = Some(id);
            Some(id)
        } else {
            self.pending = vec![None; self.ty.fields().len()];
            None
        };
        self.ctx = Some(reader.state.contexts.push(node, self.key.clone()));
    }

    /// Leave the object's context. Idempotent.
    pub(super) fn close(&mut self, reader: &mut JsonReader<'_>) {
        if let Some(ctx) = self.ctx.take() {
            reader.state.contexts.pop(ctx);
        }
    }

    /// The container a read-only field of a live instance already holds.
    fn live_container(&self, reader: &JsonReader<'_>, field: &FieldDescriptor) -> Option<NodeId> {
        if !field.has(FieldFlags::READ_ONLY)
            || !matches!(field.ty(), ValueType::List { .. } | ValueType::Map { .. })
        {
            return None;
        }
        self.node?;
        self.slot_node(reader, field.index())
    }

    /// The node currently held by field `i`, live or buffered.
    fn slot_node(&self, reader: &JsonReader<'_>, i: usize) -> Option<NodeId> {
        match self.node {
            Some(id) => match reader.state.graph.get(id)? {
                Node::Record(record) => record.slot(i)?.as_node(),
                _ => None,
            },
            None => self.pending.get(i)?.as_ref()?.as_node(),
        }
    }

    /// Convert and store a field value. Repeated keys overwrite.
    fn assign(
        &mut self,
        reader: &mut JsonReader<'_>,
        field: &FieldDescriptor,
        value: Value,
        deferred: Option<usize>,
        span: Span,
    ) -> Result<()> {
        let i = field.index();
        let value = match deferred {
            Some(_) => value,
            None => field.convert(value).map_err(|message| {
                invalid(message, span).with_context(field.name(), self.ty.name())
            })?,
        };
        self.begin(reader);
        self.deferred.retain(|(target, _)| *target != Target::Field(i));
        if let Some(task) = deferred {
            self.deferred.push((Target::Field(i), task));
        }
        self.store(reader, i, value);
        Ok(())
    }

    fn store(&mut self, reader: &mut JsonReader<'_>, i: usize, value: Value) {
        self.set.insert(i);
        match self.node {
            Some(id) => {
                if let Some(Node::Record(record)) = reader.state.graph.get_mut(id) {
                    record.set(i, value);
                }
            }
            None => {
                if let Some(slot) = self.pending.get_mut(i) {
                    *slot = Some(value);
                }
            }
        }
    }

    fn put_extra(
        &mut self,
        reader: &mut JsonReader<'_>,
        name: String,
        value: Value,
        deferred: Option<usize>,
    ) {
        self.deferred
            .retain(|(target, _)| !matches!(target, Target::Extra(n) if *n == name));
        if let Some(task) = deferred {
            self.deferred.push((Target::Extra(name.clone()), task));
        }
        match self.node {
            Some(id) => {
                if let Some(Node::Record(record)) = reader.state.graph.get_mut(id) {
                    record.set_extra(name, value);
                }
            }
            None => {
                self.extras.insert(name, value);
            }
        }
    }

    /// Creator arguments in parameter order. A parameter takes the field of the
    /// same name, else the field at its position; missing values default.
    fn take_args(&mut self) -> Vec<Value> {
        let empty_strings = self.features.contains(Features::INIT_STRING_FIELD_AS_EMPTY);
        let fields = self.ty.fields().len();
        let ty = Arc::clone(&self.ty);
        ty.creator()
            .params()
            .iter()
            .enumerate()
            .map(|(pos, param)| {
                let index = ty
                    .find_exact(&param.name)
                    .or_else(|| (pos < fields).then_some(pos));
                index
                    .and_then(|i| self.pending.get_mut(i)?.take())
                    .unwrap_or_else(|| match &param.ty {
                        ValueType::Primitive(p) => p.zero(),
                        ValueType::Str if empty_strings => Value::Str(String::new()),
                        _ => Value::Null,
                    })
            })
            .collect()
    }
}
