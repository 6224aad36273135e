//! `$ref` back-references.
//!
//! A reference whose target already exists is resolved on the spot. Anything
//! else becomes a [`ResolveTask`] bound to the slot the value would have gone
//! into, and the queue is drained in FIFO order once the root value is complete.

use alloc::string::String;
use alloc::vec::Vec;

use tessel_core::{Key, Node, NodeId, Path, Value};

use crate::context::CtxId;
use crate::error::{DeserError, DeserErrorKind, Result};
use crate::lexer::Span;
use crate::reader::ParseState;

/// What a `$ref` points at.
#[derive(Debug, Clone, PartialEq)]
pub enum RefTarget {
    /// `@`: the container holding the reference
    Current,
    /// `..`: that container's parent
    Parent,
    /// `$`: the root value
    Root,
    /// `$.a.b[0]`: a path from the root
    Path(Path),
}

impl RefTarget {
    /// Parse reference text. `None` if it is not a reference path.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "@" => Some(RefTarget::Current),
            ".." => Some(RefTarget::Parent),
            "$" => Some(RefTarget::Root),
            _ => Path::parse(text).map(RefTarget::Path),
        }
    }
}

/// Place a resolved reference is written to.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// the document root
    Root,
    /// record field by declaration index
    Field(NodeId, usize),
    /// record extra, or an error node's member
    Extra(NodeId, String),
    /// map entry
    Entry(NodeId, Key),
    /// sequence element
    Index(NodeId, usize),
}

/// A reference waiting for its target.
#[derive(Debug, Clone)]
pub struct ResolveTask {
    /// context the reference appeared in
    pub ctx: Option<CtxId>,
    /// where it points
    pub target: RefTarget,
    /// reference as written, for diagnostics
    pub text: String,
    /// where it was written
    pub span: Span,
    /// where the value goes; unbound tasks are checked but discarded
    pub slot: Option<Slot>,
}

/// Resolve every queued task in order and write the targets into their slots.
pub(crate) fn drain(state: &mut ParseState, root: &mut Value) -> Result<()> {
    let tasks = core::mem::take(&mut state.tasks);
    let mut touched: Vec<NodeId> = Vec::new();
    trace!("draining {} deferred references", tasks.len());

    for task in tasks {
        let value = match &task.target {
            RefTarget::Current => task
                .ctx
                .and_then(|ctx| state.contexts.node(ctx))
                .map(Value::Node),
            RefTarget::Parent => task
                .ctx
                .and_then(|ctx| state.contexts.parent(ctx))
                .and_then(|ctx| state.contexts.node(ctx))
                .map(Value::Node),
            RefTarget::Root => Some(root.clone()),
            RefTarget::Path(path) => state.graph.eval(root, path).cloned(),
        };
        let Some(value) = value else {
            return Err(DeserError::new(
                DeserErrorKind::UnresolvedReference { path: task.text },
                task.span,
            ));
        };
        trace!("resolved `{}` to {:?}", task.text, value);

        let Some(slot) = task.slot else {
            continue;
        };
        match slot {
            Slot::Root => *root = value,
            Slot::Field(id, index) => {
                if let Some(Node::Record(record)) = state.graph.get_mut(id) {
                    record.set(index, value);
                }
            }
            Slot::Extra(id, name) => match state.graph.get_mut(id) {
                Some(Node::Record(record)) => record.set_extra(name, value),
                Some(Node::Error(error)) => match name.as_str() {
                    "cause" => error.cause = value,
                    "stackTrace" => error.stack_trace = value,
                    _ => {
                        error.extras.insert(name, value);
                    }
                },
                Some(Node::Map(map)) => map.insert(Key::Str(name), value),
                _ => {}
            },
            Slot::Entry(id, key) => {
                if let Some(Node::Map(map)) = state.graph.get_mut(id) {
                    map.insert(key, value);
                }
            }
            Slot::Index(id, index) => {
                if let Some(Node::Seq(seq)) = state.graph.get_mut(id) {
                    seq.set(index, value);
                    touched.push(id);
                }
            }
        }
    }

    touched.sort_unstable();
    touched.dedup();
    for id in touched {
        state.graph.renormalize(id);
    }
    Ok(())
}
