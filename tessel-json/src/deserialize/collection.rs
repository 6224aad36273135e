use tessel_core::{Node, NodeId, SeqKind, SeqNode, Value, ValueType};

use super::deserializer_for;
use crate::context::PathKey;
use crate::error::Result;
use crate::lexer::TokenKind;
use crate::reader::JsonReader;
use crate::resolve::Slot;

/// JSON arrays into lists and sets.
#[derive(Debug, Clone, Copy)]
pub struct CollectionDeserializer<'t> {
    kind: SeqKind,
    elem: &'t ValueType,
}

impl<'t> CollectionDeserializer<'t> {
    /// Deserializer for a `kind` container of `elem`.
    pub fn new(kind: SeqKind, elem: &'t ValueType) -> Self {
        Self { kind, elem }
    }

    /// Read an array. With `existing`, elements are appended to that sequence
    /// instead of a new one, and `null` leaves it untouched.
    pub(crate) fn read_into(
        &self,
        reader: &mut JsonReader<'_>,
        existing: Option<NodeId>,
        key: PathKey,
    ) -> Result<Value> {
        match reader.lexer.token() {
            TokenKind::LBracket => {}
            TokenKind::Null => {
                reader.lexer.next_token()?;
                return Ok(existing.map_or(Value::Null, Value::Node));
            }
            TokenKind::Str if reader.lexer.string_value().is_empty() => {
                reader.lexer.next_token()?;
                return Ok(existing.map_or(Value::Null, Value::Node));
            }
            _ => return Err(reader.lexer.mismatch(format!("an array ({})", self.kind_name()))),
        }
        reader.lexer.next_token()?;

        let elem = deserializer_for(self.elem, reader.registry)
            .map_err(|err| err.or_span(reader.lexer.span()))?;
        let id = match existing {
            Some(id) => id,
            None => reader
                .state
                .graph
                .alloc(Node::Seq(SeqNode::new(self.kind))),
        };
        trace!("collection {id} of {}", self.elem);

        let ctx = reader.state.contexts.push(Some(id), key);
        let result = self.read_elements(reader, &elem, id);
        reader.state.contexts.pop(ctx);
        result?;

        reader.state.graph.finish(id);
        Ok(Value::Node(id))
    }

    fn read_elements(
        &self,
        reader: &mut JsonReader<'_>,
        elem: &super::ValueDeserializer<'_>,
        id: NodeId,
    ) -> Result<()> {
        let mut index = 0;
        while reader.lexer.token() != TokenKind::RBracket {
            let (value, deferred) = reader.read_slot(elem, PathKey::Index(index))?;
            let reserved = match reader.state.graph.get_mut(id) {
                Some(Node::Seq(seq)) => match deferred {
                    Some(task) => Some((task, seq.reserve_slot())),
                    None => {
                        seq.push(value);
                        None
                    }
                },
                _ => None,
            };
            if let Some((task, at)) = reserved {
                reader.bind(task, Slot::Index(id, at));
            }
            index += 1;
            reader.lexer.end_element()?;
        }
        reader.lexer.next_token()
    }

    fn kind_name(&self) -> &'static str {
        match self.kind {
            SeqKind::List => "list",
            SeqKind::Set => "set",
            SeqKind::SortedSet => "sorted set",
            SeqKind::LinkedSet => "linked set",
        }
    }
}
