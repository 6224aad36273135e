use tessel_core::{Key, MapKind, MapNode, Node, NodeId, Value, ValueType};

use super::{RecordDeserializer, ValueDeserializer, deserializer_for};
use crate::context::{CtxId, PathKey};
use crate::error::{DeserError, DeserErrorKind, Result};
use crate::lexer::TokenKind;
use crate::reader::JsonReader;
use crate::resolve::Slot;
use crate::Features;

/// JSON objects into maps.
#[derive(Debug, Clone)]
pub struct MapDeserializer<'t> {
    kind: MapKind,
    key: &'t ValueType,
    value: &'t ValueType,
}

impl<'t> MapDeserializer<'t> {
    /// Deserializer for a `kind` map from `key` to `value`.
    pub fn new(kind: MapKind, key: &'t ValueType, value: &'t ValueType) -> Self {
        Self { kind, key, value }
    }

    /// Read an object. With `existing`, entries go into that map instead of a
    /// new one, and `null` leaves it untouched.
    pub(crate) fn read_into(
        &self,
        reader: &mut JsonReader<'_>,
        existing: Option<NodeId>,
        key: PathKey,
    ) -> Result<Value> {
        match reader.lexer.token() {
            TokenKind::LBrace => {}
            TokenKind::Null => {
                reader.lexer.next_token()?;
                return Ok(existing.map_or(Value::Null, Value::Node));
            }
            TokenKind::Str if reader.lexer.string_value().is_empty() => {
                reader.lexer.next_token()?;
                return Ok(existing.map_or(Value::Null, Value::Node));
            }
            _ => return Err(reader.lexer.mismatch("an object")),
        }
        let span = reader.lexer.span();
        reader.lexer.next_token()?;

        if self.kind == MapKind::EnumKeyed && !matches!(self.key, ValueType::Enum(_)) {
            return Err(reader.lexer.error(DeserErrorKind::InvalidValue {
                message: format!("enum-keyed map declared with `{}` keys", self.key),
            }));
        }
        let value_de = deserializer_for(self.value, reader.registry)
            .map_err(|err| err.or_span(span))?;
        let key_de = match self.key {
            ValueType::Str | ValueType::Any => None,
            ty => Some(deserializer_for(ty, reader.registry).map_err(|err| err.or_span(span))?),
        };

        let mut entries = Entries {
            node: existing,
            ctx: None,
            key,
        };
        let result = self.read_entries(reader, &mut entries, &value_de, key_de.as_ref());
        if let Some(ctx) = entries.ctx {
            reader.state.contexts.pop(ctx);
        }
        let redirected = result?;
        if let Some(value) = redirected {
            return Ok(value);
        }

        let id = entries.node(self, reader);
        reader.state.graph.finish(id);
        Ok(Value::Node(id))
    }

    /// Returns `Some` when the object turned out to be a reference or a record.
    fn read_entries(
        &self,
        reader: &mut JsonReader<'_>,
        entries: &mut Entries,
        value_de: &ValueDeserializer<'_>,
        key_de: Option<&ValueDeserializer<'_>>,
    ) -> Result<Option<Value>> {
        let special = !reader.config.has(Features::DISABLE_SPECIAL_KEY_DETECT);
        let mut first = entries.node.is_none();

        loop {
            let span = reader.lexer.span();
            let Some(name) = reader.lexer.scan_key()? else {
                return Ok(None);
            };

            if first && special {
                if name == "$ref" {
                    let value = reader.read_ref()?;
                    reader.lexer.advance(TokenKind::RBrace)?;
                    return Ok(Some(value));
                }
                if name == reader.config.type_key()
                    && reader.lexer.token() == TokenKind::Str
                    && let Ok(ty) = reader.registry.resolve_untyped(
                        reader.lexer.string_value(),
                        reader.config.guard(),
                        reader.config.has(Features::SAFE_MODE),
                    )
                {
                    trace!("map redirected to record `{}`", ty.name());
                    reader.lexer.next_token()?;
                    let key = core::mem::replace(&mut entries.key, PathKey::Root);
                    return RecordDeserializer::new(ty).resume(reader, key).map(Some);
                }
            }
            first = false;

            let id = entries.node(self, reader);
            let map_key = match key_de {
                None => Key::Str(name.clone()),
                Some(de) => {
                    let key = reader.read_key(&name, self.key, de, span)?;
                    if self.kind == MapKind::EnumKeyed && key.as_enum().is_none() {
                        return Err(DeserError::new(
                            DeserErrorKind::InvalidValue {
                                message: format!("`{name}` is not a constant of `{}`", self.key),
                            },
                            span,
                        ));
                    }
                    Key::from(&key)
                }
            };

            let (value, deferred) = reader.read_slot(value_de, PathKey::Field(name))?;
            if let Some(Node::Map(map)) = reader.state.graph.get_mut(id) {
                map.insert(map_key.clone(), value);
            }
            if let Some(task) = deferred {
                reader.bind(task, Slot::Entry(id, map_key));
            }
            reader.lexer.end_member()?;
        }
    }
}

/// Map node and context, both created at the first ordinary entry.
struct Entries {
    node: Option<NodeId>,
    ctx: Option<CtxId>,
    key: PathKey,
}

impl Entries {
    fn node(&mut self, de: &MapDeserializer<'_>, reader: &mut JsonReader<'_>) -> NodeId {
        let id = match self.node {
            Some(id) => id,
            None => {
                let id = reader
                    .state
                    .graph
                    .alloc(Node::Map(MapNode::new(de.kind.clone())));
                self.node = Some(id);
                id
            }
        };
        if self.ctx.is_none() {
            let key = core::mem::replace(&mut self.key, PathKey::Root);
            self.ctx = Some(reader.state.contexts.push(Some(id), key));
        }
        id
    }
}
