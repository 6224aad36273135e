//! Parse context: where in the document the current value lives.
//!
//! Every container pushes a node when it starts receiving children and pops it
//! on every exit path. Nodes stay in the arena until the parse ends so that
//! deferred references can name them by index.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write as _;

use tessel_core::NodeId;

/// Index of a node in the [`ContextArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtxId(u32);

/// How a value was reached from its parent container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKey {
    /// top-level value
    Root,
    /// object member
    Field(String),
    /// array element
    Index(usize),
}

#[derive(Debug)]
struct CtxNode {
    parent: Option<CtxId>,
    node: Option<NodeId>,
    key: PathKey,
}

/// Parent-linked context nodes of one parse.
#[derive(Debug, Default)]
pub struct ContextArena {
    nodes: Vec<CtxNode>,
    current: Option<CtxId>,
}

impl ContextArena {
    /// Enter a container reached by `key`. `node` is `None` while the container
    /// does not exist yet (deferred construction).
    pub fn push(&mut self, node: Option<NodeId>, key: PathKey) -> CtxId {
        let id = CtxId(self.nodes.len() as u32);
        self.nodes.push(CtxNode {
            parent: self.current,
            node,
            key,
        });
        self.current = Some(id);
        id
    }

    /// Leave `id`; its parent becomes current.
    pub fn pop(&mut self, id: CtxId) {
        self.current = self.parent(id);
    }

    /// Record the container once it exists.
    pub fn link(&mut self, id: CtxId, node: NodeId) {
        if let Some(ctx) = self.nodes.get_mut(id.0 as usize) {
            ctx.node = Some(node);
        }
    }

    /// Container of `id`, if it exists yet.
    pub fn node(&self, id: CtxId) -> Option<NodeId> {
        self.nodes.get(id.0 as usize)?.node
    }

    /// Enclosing context of `id`.
    pub fn parent(&self, id: CtxId) -> Option<CtxId> {
        self.nodes.get(id.0 as usize)?.parent
    }

    /// Innermost open context.
    pub fn current(&self) -> Option<CtxId> {
        self.current
    }

    /// Outermost ancestor of `id`.
    pub fn root_of(&self, id: CtxId) -> CtxId {
        let mut id = id;
        while let Some(parent) = self.parent(id) {
            id = parent;
        }
        id
    }

    /// `$.a[0]`-style rendering of the path to `id`.
    pub fn path_of(&self, id: CtxId) -> String {
        let mut keys = Vec::new();
        let mut cursor = Some(id);
        while let Some(id) = cursor {
            let Some(ctx) = self.nodes.get(id.0 as usize) else {
                break;
            };
            keys.push(&ctx.key);
            cursor = ctx.parent;
        }

        let mut path = String::from("$");
        for key in keys.into_iter().rev() {
            match key {
                PathKey::Root => {}
                PathKey::Field(name) => {
                    let _ = write!(path, ".{name}");
                }
                PathKey::Index(i) => {
                    let _ = write!(path, "[{i}]");
                }
            }
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_core::{Graph, MapNode, Node};
    use tessel_testhelpers::test;

    #[test]
    fn push_and_pop_restore_the_parent() {
        let mut graph = Graph::new();
        let map = graph.alloc(Node::Map(MapNode::default()));

        let mut arena = ContextArena::default();
        let root = arena.push(Some(map), PathKey::Root);
        let items = arena.push(None, PathKey::Field("items".into()));
        let first = arena.push(None, PathKey::Index(0));
        assert_eq!(arena.current(), Some(first));
        assert_eq!(arena.path_of(first), "$.items[0]");
        assert_eq!(arena.root_of(first), root);

        arena.pop(first);
        assert_eq!(arena.current(), Some(items));
        arena.link(items, map);
        assert_eq!(arena.node(items), Some(map));
        arena.pop(items);
        arena.pop(root);
        assert_eq!(arena.current(), None);
        // popped nodes stay addressable
        assert_eq!(arena.parent(first), Some(items));
    }
}
