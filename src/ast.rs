// program ::= instr*
// instr   ::= '+' | '-' | '<' | '>' | '.' | ',' | loop
// loop    ::= '[' instr* ']'
//
// Any other byte is a comment.

use std::fmt;

use crate::token::{Position, TokenKind};

/// Index of a node in its [`Tree`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub kind: TokenKind,
    pub pos: Position,
    /// Only used to report the enclosing context; never followed for
    /// control flow.
    pub parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A program tree stored in an arena. The root is always [`NodeId::ROOT`].
///
/// Trees are only built by [`crate::builder`]; once handed out they are
/// immutable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub(crate) fn with_capacity(capacity: usize) -> Tree {
        let mut nodes = Vec::with_capacity(capacity.max(1));
        nodes.push(Node {
            kind: TokenKind::Root,
            pos: Position::START,
            parent: None,
            children: Vec::new(),
        });
        Tree { nodes }
    }

    /// Appends a new node as the last child of `parent`.
    pub(crate) fn push(&mut self, parent: NodeId, kind: TokenKind, pos: Position) -> NodeId {
        debug_assert!(self.kind(parent).is_container());
        debug_assert!(!matches!(kind, TokenKind::Root | TokenKind::None));
        let id = NodeId(u32::try_from(self.nodes.len()).expect("tree exceeds u32::MAX nodes"));
        self.nodes.push(Node {
            kind,
            pos,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> TokenKind {
        self.node(id).kind
    }

    pub fn pos(&self, id: NodeId) -> Position {
        self.node(id).pos
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children()
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Maximum loop nesting depth. A program without loops has depth 0.
    pub fn depth(&self) -> usize {
        let mut current = 0usize;
        let mut max = 0;
        for event in self.events() {
            match event {
                Event::Enter(id) if self.kind(id) == TokenKind::Loop => {
                    current += 1;
                    max = max.max(current);
                }
                Event::Exit(id) if self.kind(id) == TokenKind::Loop => current -= 1,
                _ => {}
            }
        }
        max
    }

    /// Walks the tree in program order.
    pub fn events(&self) -> Events<'_> {
        Events {
            tree: self,
            stack: Vec::new(),
            started: false,
        }
    }

    /// Pre-order iterator over every node id, root first.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.events().filter_map(|event| match event {
            Event::Enter(id) => Some(id),
            Event::Exit(_) => None,
        })
    }

    /// Renders the tree back into source symbols, with comments dropped.
    pub fn flatten(&self) -> String {
        let mut buf = String::with_capacity(self.nodes.len() * 2);
        for event in self.events() {
            match event {
                Event::Enter(id) => buf.extend(self.kind(id).symbol()),
                Event::Exit(id) if self.kind(id) == TokenKind::Loop => buf.push(']'),
                Event::Exit(_) => {}
            }
        }
        buf
    }
}

/// A step of a program-order walk. Container nodes (root and loops) produce
/// an `Enter` and a matching `Exit`; every other node only an `Enter`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Enter(NodeId),
    Exit(NodeId),
}

pub struct Events<'t> {
    tree: &'t Tree,
    /// Open containers with the index of their next child to visit.
    stack: Vec<(NodeId, usize)>,
    started: bool,
}

impl Iterator for Events<'_> {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            self.stack.push((NodeId::ROOT, 0));
            return Some(Event::Enter(NodeId::ROOT));
        }
        let (id, next_child) = self.stack.last_mut()?;
        let id = *id;
        match self.tree.children(id).get(*next_child).copied() {
            Some(child) => {
                *next_child += 1;
                if self.tree.kind(child).is_container() {
                    self.stack.push((child, 0));
                }
                Some(Event::Enter(child))
            }
            None => {
                self.stack.pop();
                Some(Event::Exit(id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Tree {
        // +[->]
        let mut tree = Tree::with_capacity(8);
        let root = tree.root();
        tree.push(root, TokenKind::Increment, Position::new(1, 1, 0));
        let lp = tree.push(root, TokenKind::Loop, Position::new(1, 2, 1));
        tree.push(lp, TokenKind::Decrement, Position::new(1, 3, 2));
        tree.push(lp, TokenKind::MoveRight, Position::new(1, 4, 3));
        tree
    }

    #[test]
    fn test_events() {
        let tree = sample();
        let events: Vec<_> = tree.events().collect();
        let (r, l) = (NodeId(0), NodeId(2));
        assert_eq!(
            events,
            [
                Event::Enter(r),
                Event::Enter(NodeId(1)),
                Event::Enter(l),
                Event::Enter(NodeId(3)),
                Event::Enter(NodeId(4)),
                Event::Exit(l),
                Event::Exit(r),
            ]
        );
    }

    #[test]
    fn test_parent_links() {
        let tree = sample();
        assert_eq!(tree.parent(tree.root()), None);
        assert_eq!(tree.parent(NodeId(3)), Some(NodeId(2)));
        assert_eq!(tree.parent(NodeId(2)), Some(NodeId::ROOT));
    }

    #[test]
    fn test_flatten_and_depth() {
        let tree = sample();
        assert_eq!(tree.flatten(), "+[->]");
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.node_count(), 5);
        assert_eq!(Tree::with_capacity(0).depth(), 0);
    }
}
