//! Lazy, chainable node sequences.
//!
//! An [`Axis`] describes a sequence (the children of a parent, or the ancestors of a node) plus
//! optional restrictions, and produces nodes only when a terminal operation runs:
//!
//! ```text
//! source -> range restriction -> text exclusion -> predicates (in order) -> index window
//! ```
//!
//! The range restriction (`in_range`, `before`, `after`) and each end of the index window
//! (`from_index`, `to_index`) can be set once; setting one again is an error.
//!
//! The index window comes last, so `from_index` and `to_index` count only the nodes that
//! passed every other stage: `matching(p).from_index(1)` skips the first node satisfying
//! `p`, not the first child. The order is the same whatever order the builder methods
//! are called in.
//!
//! # Cost
//!
//! `is_empty` and `first` stop at the first match. Every other terminal operation walks the
//! whole filtered sequence, so it is linear in the number of nodes it passes.

use crate::error::DocumentError;
use crate::node::{NodeId, NodeKind, NodeRef};
use crate::range::ContentRange;
use crate::tree::Tree;
use std::fmt;
use xmledit_names::QualifiedName;

/// A node together with the tree it belongs to.
#[derive(Clone, Copy)]
pub struct NodeView<'a> {
    tree: &'a Tree,
    node: NodeRef,
}

impl<'a> NodeView<'a> {
    pub(crate) fn new(tree: &'a Tree, node: NodeRef) -> Self {
        Self { tree, node }
    }

    /// The node handle.
    pub fn node(&self) -> NodeRef {
        self.node
    }

    /// The stored id, `None` for text.
    pub fn id(&self) -> Option<NodeId> {
        self.node.id()
    }

    /// Node kind.
    pub fn kind(&self) -> NodeKind {
        self.tree.kind(self.node).unwrap_or(NodeKind::Text)
    }

    /// Returns `true` for text runs.
    pub fn is_text(&self) -> bool {
        self.node.is_text()
    }

    /// Element name, `None` for other kinds.
    pub fn name(&self) -> Option<&'a QualifiedName> {
        let id = self.node.id()?;
        self.tree.element(id).ok().map(|element| element.name())
    }

    /// Content range.
    pub fn range(&self) -> Result<ContentRange, DocumentError> {
        self.tree.range(self.node)
    }

    /// Character data.
    pub fn text(&self) -> Result<String, DocumentError> {
        self.tree.text(self.node)
    }

    /// Parent node.
    pub fn parent(&self) -> Option<NodeId> {
        self.tree.parent(self.node).ok().flatten()
    }

    /// The tree this view reads from.
    pub fn tree(&self) -> &'a Tree {
        self.tree
    }
}

impl fmt::Debug for NodeView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeView")
            .field("node", &self.node)
            .field("kind", &self.kind())
            .finish()
    }
}

impl PartialEq for NodeView<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.node == other.node
    }
}

#[derive(Debug, Clone, Copy)]
enum AxisSource {
    Children(NodeId),
    Ancestors(NodeRef),
}

#[derive(Debug, Clone, Copy)]
enum Restriction {
    In(ContentRange),
    Before(usize),
    After(usize),
}

enum Window {
    All,
    Range(ContentRange),
    Empty,
}

type Predicate<'a> = Box<dyn Fn(&NodeView<'a>) -> bool + 'a>;

/// A lazy node sequence. See the [module documentation](self).
pub struct Axis<'a> {
    tree: &'a Tree,
    source: AxisSource,
    restriction: Option<Restriction>,
    include_text: bool,
    from: Option<usize>,
    to: Option<usize>,
    predicates: Vec<Predicate<'a>>,
}

impl<'a> Axis<'a> {
    pub(crate) fn children(tree: &'a Tree, parent: NodeId) -> Self {
        Self::new(tree, AxisSource::Children(parent))
    }

    pub(crate) fn ancestors(tree: &'a Tree, node: NodeRef) -> Self {
        Self::new(tree, AxisSource::Ancestors(node))
    }

    fn new(tree: &'a Tree, source: AxisSource) -> Self {
        Self {
            tree,
            source,
            restriction: None,
            include_text: true,
            from: None,
            to: None,
            predicates: Vec::new(),
        }
    }

    fn restrict(mut self, restriction: Restriction) -> Result<Self, DocumentError> {
        if self.restriction.is_some() {
            return Err(DocumentError::AxisAlreadyRestricted("in/before/after"));
        }
        self.restriction = Some(restriction);
        Ok(self)
    }

    /// Keep only nodes lying completely inside `range`.
    pub fn in_range(self, range: ContentRange) -> Result<Self, DocumentError> {
        self.restrict(Restriction::In(range))
    }

    /// Keep only nodes ending before `offset`.
    pub fn before(self, offset: usize) -> Result<Self, DocumentError> {
        self.restrict(Restriction::Before(offset))
    }

    /// Keep only nodes starting after `offset`.
    pub fn after(self, offset: usize) -> Result<Self, DocumentError> {
        self.restrict(Restriction::After(offset))
    }

    /// Drop text runs.
    pub fn without_text(mut self) -> Self {
        self.include_text = false;
        self
    }

    /// Skip the first `index` nodes of the filtered sequence.
    pub fn from_index(mut self, index: usize) -> Result<Self, DocumentError> {
        if self.from.is_some() {
            return Err(DocumentError::AxisAlreadyRestricted("from"));
        }
        self.from = Some(index);
        Ok(self)
    }

    /// Stop after the node at `index` (inclusive) of the filtered sequence.
    pub fn to_index(mut self, index: usize) -> Result<Self, DocumentError> {
        if self.to.is_some() {
            return Err(DocumentError::AxisAlreadyRestricted("to"));
        }
        self.to = Some(index);
        Ok(self)
    }

    /// Keep only nodes matching `predicate`. Predicates apply in the order they were added.
    pub fn matching(mut self, predicate: impl Fn(&NodeView<'a>) -> bool + 'a) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    /// Keep only elements.
    pub fn elements(self) -> Self {
        self.matching(|node| node.kind() == NodeKind::Element)
    }

    fn window(&self) -> Window {
        match self.restriction {
            None => Window::All,
            Some(Restriction::In(range)) => Window::Range(range),
            Some(Restriction::Before(0)) => Window::Empty,
            Some(Restriction::Before(offset)) => Window::Range(ContentRange::new(0, offset - 1)),
            Some(Restriction::After(offset)) => {
                let len = self.tree.content().len();
                if offset + 1 >= len {
                    Window::Empty
                } else {
                    Window::Range(ContentRange::new(offset + 1, len - 1))
                }
            }
        }
    }

    fn source_nodes(&self) -> Box<dyn Iterator<Item = NodeRef> + 'a> {
        let tree = self.tree;
        let window = self.window();
        match (self.source, window) {
            (_, Window::Empty) => Box::new(std::iter::empty()),
            (AxisSource::Children(parent), Window::All) => match tree.child_nodes(parent, None) {
                Ok(nodes) => Box::new(nodes),
                Err(_) => Box::new(std::iter::empty()),
            },
            (AxisSource::Children(parent), Window::Range(range)) => {
                match tree.child_nodes(parent, Some(range)) {
                    Ok(nodes) => Box::new(nodes),
                    Err(_) => Box::new(std::iter::empty()),
                }
            }
            (AxisSource::Ancestors(node), Window::All) => {
                Box::new(tree.ancestor_ids(node).map(NodeRef::Node))
            }
            (AxisSource::Ancestors(node), Window::Range(range)) => Box::new(
                tree.ancestor_ids(node)
                    .map(NodeRef::Node)
                    .filter(move |node| tree.is_in_range(*node, range).unwrap_or(false)),
            ),
        }
    }

    /// Iterate the filtered sequence.
    pub fn iter(&self) -> impl Iterator<Item = NodeView<'a>> + '_ {
        let tree = self.tree;
        let include_text = self.include_text;
        let from = self.from.unwrap_or(0);
        let take = match self.to {
            Some(to) if to < from => 0,
            Some(to) => to - from + 1,
            None => usize::MAX,
        };

        self.source_nodes()
            .filter(move |node| include_text || !node.is_text())
            .map(move |node| NodeView::new(tree, node))
            .filter(move |view| self.predicates.iter().all(|predicate| predicate(view)))
            .skip(from)
            .take(take)
    }

    /// Returns `true` if the sequence has no nodes.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// First node.
    pub fn first(&self) -> Result<NodeView<'a>, DocumentError> {
        self.iter().next().ok_or(DocumentError::EmptyAxis)
    }

    /// Last node.
    pub fn last(&self) -> Result<NodeView<'a>, DocumentError> {
        self.iter().last().ok_or(DocumentError::EmptyAxis)
    }

    /// Node at `index`.
    pub fn get(&self, index: usize) -> Result<NodeView<'a>, DocumentError> {
        let mut len = 0;
        for (position, node) in self.iter().enumerate() {
            if position == index {
                return Ok(node);
            }
            len = position + 1;
        }
        Err(DocumentError::IndexOutOfBounds { index, len })
    }

    /// Collect the sequence.
    pub fn to_vec(&self) -> Vec<NodeView<'a>> {
        self.iter().collect()
    }

    /// Collect the node handles.
    pub fn nodes(&self) -> Vec<NodeRef> {
        self.iter().map(|view| view.node()).collect()
    }

    /// Number of nodes.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Hand every node to `visitor`, in order.
    pub fn accept(&self, mut visitor: impl FnMut(NodeView<'a>)) {
        for node in self.iter() {
            visitor(node);
        }
    }
}

impl fmt::Debug for Axis<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Axis")
            .field("source", &self.source)
            .field("restriction", &self.restriction)
            .field("include_text", &self.include_text)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("predicates", &self.predicates.len())
            .finish()
    }
}
