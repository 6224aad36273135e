use alloc::string::String;

use tessel_core::{ErrorNode, Node, NodeId, Value};

use super::{ValueDeserializer, scalar};
use crate::Features;
use crate::context::PathKey;
use crate::error::Result;
use crate::lexer::TokenKind;
use crate::reader::JsonReader;
use crate::resolve::Slot;

/// Error values: `message`, a nested `cause`, an untyped `stackTrace`, and any
/// other key as an extra.
pub(crate) fn deserialize(reader: &mut JsonReader<'_>, key: PathKey) -> Result<Value> {
    match reader.lexer.token() {
        TokenKind::LBrace => {}
        TokenKind::Null => {
            reader.lexer.next_token()?;
            return Ok(Value::Null);
        }
        _ => return Err(reader.lexer.mismatch("an error object")),
    }
    reader.lexer.next_token()?;

    let special = !reader.config.has(Features::DISABLE_SPECIAL_KEY_DETECT);
    let first = reader.lexer.scan_key()?;
    if special && first.as_deref() == Some("$ref") {
        let value = reader.read_ref()?;
        reader.lexer.advance(TokenKind::RBrace)?;
        return Ok(value);
    }

    let id = reader
        .state
        .graph
        .alloc(Node::Error(ErrorNode::default()));
    let ctx = reader.state.contexts.push(Some(id), key);
    let result = read_members(reader, id, first, special);
    reader.state.contexts.pop(ctx);
    result?;
    Ok(Value::Node(id))
}

fn read_members(
    reader: &mut JsonReader<'_>,
    id: NodeId,
    first: Option<String>,
    special: bool,
) -> Result<()> {
    let config = reader.config;
    let mut next = first;
    while let Some(name) = next {
        if special && name == config.type_key() {
            if reader.lexer.token() != TokenKind::Str {
                return Err(reader.lexer.mismatch("a type name"));
            }
            let tag = reader.lexer.take_string();
            reader.lexer.next_token()?;
            if let Some(error) = error_node(reader, id) {
                error.type_name = Some(tag);
            }
        } else if name == "message" {
            let message = match scalar::deserialize(reader)? {
                Value::Str(message) => Some(message),
                _ => None,
            };
            if let Some(error) = error_node(reader, id) {
                error.message = message;
            }
        } else {
            let de = match name.as_str() {
                "cause" => ValueDeserializer::Throwable,
                _ => ValueDeserializer::Any,
            };
            let (value, deferred) = reader.read_slot(&de, PathKey::Field(name.clone()))?;
            if let Some(error) = error_node(reader, id) {
                match name.as_str() {
                    "cause" => error.cause = value,
                    "stackTrace" => error.stack_trace = value,
                    _ => {
                        error.extras.insert(name.clone(), value);
                    }
                }
            }
            if let Some(task) = deferred {
                reader.bind(task, Slot::Extra(id, name));
            }
        }
        reader.lexer.end_member()?;
        next = reader.lexer.scan_key()?;
    }
    Ok(())
}

fn error_node<'r>(reader: &'r mut JsonReader<'_>, id: NodeId) -> Option<&'r mut ErrorNode> {
    match reader.state.graph.get_mut(id)? {
        Node::Error(error) => Some(error),
        _ => None,
    }
}
