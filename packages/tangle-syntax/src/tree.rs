//! Arena-backed immutable syntax tree.

use la_arena::{Arena, Idx};

use crate::kind::NodeKind;
use crate::span::Span;

pub type NodeId = Idx<NodeData>;

/// One node of the tree. Nodes are addressed by [`NodeId`] and never change
/// once the builder has finished.
#[derive(Debug)]
pub struct NodeData {
    kind: NodeKind,
    span: Span,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An immutable syntax tree over one unit of source code.
///
/// The tree stores kinds and byte spans only; identifier text is sliced out
/// of the source text by the consumer. Produced by [`TreeBuilder`].
#[derive(Debug, Default)]
pub struct SyntaxTree {
    nodes: Arena<NodeData>,
    root: Option<NodeId>,
}

impl SyntaxTree {
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id].span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Slice the node's span out of the source this tree was parsed from.
    pub fn text<'s>(&self, id: NodeId, source: &'s str) -> &'s str {
        self.span(id).text(source)
    }
}

/// Builds a [`SyntaxTree`] from nested `start_node`/`token`/`finish_node`
/// events, in the order a parser emits them.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: SyntaxTree,
    stack: Vec<NodeId>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an interior node. Its span becomes the hull of its children once
    /// [`finish_node`](Self::finish_node) is called; a node finished without
    /// children keeps an empty span.
    pub fn start_node(&mut self, kind: NodeKind) {
        let id = self.alloc(kind, Span::new(0, 0));
        self.stack.push(id);
    }

    /// Add a childless node with an explicit span.
    pub fn token(&mut self, kind: NodeKind, span: Span) {
        self.alloc(kind, span);
    }

    /// Close the most recently opened node.
    pub fn finish_node(&mut self) {
        let id = self
            .stack
            .pop()
            .expect("finish_node without matching start_node");
        let children = &self.tree.nodes[id].children;
        if let (Some(&first), Some(&last)) = (children.first(), children.last()) {
            let span = Span::new(self.tree.nodes[first].span.start, self.tree.nodes[last].span.end);
            self.tree.nodes[id].span = span;
        }
    }

    pub fn finish(self) -> SyntaxTree {
        assert!(self.stack.is_empty(), "unbalanced start_node/finish_node");
        self.tree
    }

    fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let parent = self.stack.last().copied();
        let id = self.tree.nodes.alloc(NodeData {
            kind,
            span,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.tree.nodes[parent].children.push(id),
            None => {
                assert!(self.tree.root.is_none(), "tree already has a root node");
                self.tree.root = Some(id);
            }
        }
        id
    }
}
