//! Node arena bound to a content buffer.
//!
//! A [`Tree`] owns one [`Content`] and every stored node associated with it. Each stored
//! node is bound to an inclusive range of that content through two [`crate::Position`]s, so
//! node ranges follow edits automatically. Parent nodes keep their stored children sorted by
//! start offset; text between them is synthesized on demand by [`ChildNodes`].
//!
//! Reading is public. Mutation is crate-private: only the document edit operations and the
//! copy machinery change a tree, and they keep content and nodes consistent together.

use crate::axis::Axis;
use crate::content::Content;
use crate::error::{DocumentError, ValidationError};
use crate::node::{
    Association, ElementData, IncludeData, NamespaceDeclarations, NodeBody, NodeData, NodeId,
    NodeKind, NodeRef,
};
use crate::range::ContentRange;
use crate::validator::PCDATA;
use std::collections::{BTreeMap, BTreeSet};
use xmledit_names::{QualifiedName, XML_NAMESPACE_URI, XML_PREFIX};

/// A node arena plus the content its nodes are bound to.
#[derive(Debug)]
pub struct Tree {
    content: Content,
    nodes: BTreeMap<NodeId, NodeData>,
    next_id: u64,
    root: NodeId,
}

impl Tree {
    pub(crate) fn new(content: Content, root: NodeBody) -> Self {
        let mut tree = Self {
            content,
            nodes: BTreeMap::new(),
            next_id: 0,
            root: NodeId(0),
        };
        tree.root = tree.alloc(root);
        tree
    }

    /// The document or fragment node at the top of the tree.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The content buffer all nodes are bound to.
    pub fn content(&self) -> &Content {
        &self.content
    }

    pub(crate) fn content_mut(&mut self) -> &mut Content {
        &mut self.content
    }

    /// Number of stored nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if `id` names a live node of this tree.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub(crate) fn data(&self, id: NodeId) -> Result<&NodeData, DocumentError> {
        self.nodes.get(&id).ok_or(DocumentError::UnknownNode(id))
    }

    pub(crate) fn data_mut(&mut self, id: NodeId) -> Result<&mut NodeData, DocumentError> {
        self.nodes.get_mut(&id).ok_or(DocumentError::UnknownNode(id))
    }

    /// Kind-specific payload of a stored node.
    pub fn body(&self, id: NodeId) -> Result<&NodeBody, DocumentError> {
        Ok(&self.data(id)?.body)
    }

    /// Kind of any node.
    pub fn kind(&self, node: impl Into<NodeRef>) -> Result<NodeKind, DocumentError> {
        match node.into() {
            NodeRef::Node(id) => Ok(self.body(id)?.kind()),
            NodeRef::Text { .. } => Ok(NodeKind::Text),
        }
    }

    /// Element payload of `id`.
    pub fn element(&self, id: NodeId) -> Result<&ElementData, DocumentError> {
        match self.body(id)? {
            NodeBody::Element(element) => Ok(element),
            _ => Err(DocumentError::NotAnElement(id)),
        }
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DocumentError> {
        match &mut self.data_mut(id)?.body {
            NodeBody::Element(element) => Ok(element),
            _ => Err(DocumentError::NotAnElement(id)),
        }
    }

    /// Target of the processing instruction `id`.
    pub fn processing_instruction_target(&self, id: NodeId) -> Result<&str, DocumentError> {
        match self.body(id)? {
            NodeBody::ProcessingInstruction { target } => Ok(target),
            _ => Err(DocumentError::NotAProcessingInstruction(id)),
        }
    }

    /// Include payload of `id`, if it is an include.
    pub fn include(&self, id: NodeId) -> Result<Option<&IncludeData>, DocumentError> {
        match self.body(id)? {
            NodeBody::Include(include) => Ok(Some(include)),
            _ => Ok(None),
        }
    }

    /// Parent of any node. `None` for the root and for detached nodes.
    pub fn parent(&self, node: impl Into<NodeRef>) -> Result<Option<NodeId>, DocumentError> {
        match node.into() {
            NodeRef::Node(id) => Ok(self.data(id)?.parent),
            NodeRef::Text { parent, .. } => Ok(Some(parent)),
        }
    }

    /// Stored (non-text) children of `id`, in document order.
    pub fn stored_children(&self, id: NodeId) -> Result<&[NodeId], DocumentError> {
        Ok(&self.data(id)?.children)
    }

    /// Returns `true` if `id` is bound to a content range.
    pub fn is_associated(&self, id: NodeId) -> bool {
        self.nodes
            .get(&id)
            .is_some_and(|data| data.association.is_some())
    }

    /// Content range of any node, boundary markers included.
    pub fn range(&self, node: impl Into<NodeRef>) -> Result<ContentRange, DocumentError> {
        match node.into() {
            NodeRef::Node(id) => self
                .data(id)?
                .association
                .as_ref()
                .map(Association::range)
                .ok_or(DocumentError::Dissociated(id)),
            NodeRef::Text { range, .. } => Ok(range),
        }
    }

    /// Character data of a node, markers left out.
    pub fn text(&self, node: impl Into<NodeRef>) -> Result<String, DocumentError> {
        let range = self.range(node)?;
        self.content.text(range)
    }

    /// Cells of a node, markers included.
    pub fn raw_text(&self, node: impl Into<NodeRef>) -> Result<String, DocumentError> {
        let range = self.range(node)?;
        self.content.raw_text(range)
    }

    /// Returns `true` if the node holds nothing between its two boundary markers.
    pub fn is_empty(&self, id: NodeId) -> Result<bool, DocumentError> {
        let range = self.range(id)?;
        Ok(range.end - range.start == 1)
    }

    /// Returns `true` if `offset` lies within the node's range.
    pub fn contains_offset(
        &self,
        node: impl Into<NodeRef>,
        offset: usize,
    ) -> Result<bool, DocumentError> {
        Ok(self.range(node)?.contains_offset(offset))
    }

    /// Returns `true` if the node's range lies completely inside `range`.
    pub fn is_in_range(
        &self,
        node: impl Into<NodeRef>,
        range: ContentRange,
    ) -> Result<bool, DocumentError> {
        Ok(range.contains(&self.range(node)?))
    }

    /// Name a node contributes to a validation sequence.
    ///
    /// Text maps to [`PCDATA`], elements to their name, includes to `xi:include`. Comments
    /// and processing instructions are invisible to validation.
    pub fn validation_name(
        &self,
        node: impl Into<NodeRef>,
    ) -> Result<Option<QualifiedName>, DocumentError> {
        match node.into() {
            NodeRef::Text { .. } => Ok(Some(PCDATA.clone())),
            NodeRef::Node(id) => Ok(match self.body(id)? {
                NodeBody::Element(element) => Some(element.name().clone()),
                NodeBody::Include(_) => Some(QualifiedName::xinclude()),
                NodeBody::Document
                | NodeBody::Fragment(_)
                | NodeBody::Comment
                | NodeBody::ProcessingInstruction { .. } => None,
            }),
        }
    }

    /// Validation names of a node sequence, skipping nodes invisible to validation.
    pub fn validation_names<I>(&self, nodes: I) -> Result<Vec<QualifiedName>, DocumentError>
    where
        I: IntoIterator<Item = NodeRef>,
    {
        let mut names = Vec::new();
        for node in nodes {
            if let Some(name) = self.validation_name(node)? {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// All children of `parent`, text included, as a lazy [`Axis`].
    pub fn children(&self, parent: NodeId) -> Result<Axis<'_>, DocumentError> {
        self.range(parent)?;
        Ok(Axis::children(self, parent))
    }

    /// Ancestors of `node`, nearest first, up to and including the root.
    pub fn ancestors(&self, node: impl Into<NodeRef>) -> Result<Axis<'_>, DocumentError> {
        let node = node.into();
        self.range(node)?;
        Ok(Axis::ancestors(self, node))
    }

    /// Children of `parent` within `range`, text synthesized from the gaps.
    ///
    /// Without a range the whole interior of the parent is walked. A stored child surfaces only
    /// if the range contains it completely; a partly covered child contributes nothing, and the
    /// text around it is still reported.
    pub fn child_nodes(
        &self,
        parent: NodeId,
        range: Option<ContentRange>,
    ) -> Result<ChildNodes<'_>, DocumentError> {
        let data = self.data(parent)?;
        let window = self.child_window(parent)?;
        let window = match (window, range) {
            (Some(window), Some(range)) => window.intersection(&range),
            (window, None) => window,
            (None, Some(_)) => None,
        };

        let (index, cursor) = match window {
            Some(window) => (
                data.children
                    .partition_point(|child| self.range(*child).is_ok_and(|r| r.end < window.start)),
                window.start,
            ),
            None => (0, 0),
        };

        Ok(ChildNodes {
            tree: self,
            parent,
            children: &data.children,
            index,
            cursor,
            window,
            pending: None,
        })
    }

    /// The part of a node's range its children may occupy.
    ///
    /// Documents and elements exclude their own boundary markers. Fragments have no markers of
    /// their own and expose their whole range. Leaves have no children.
    fn child_window(&self, id: NodeId) -> Result<Option<ContentRange>, DocumentError> {
        let range = self.range(id)?;
        Ok(match self.body(id)?.kind() {
            NodeKind::Fragment => Some(range),
            NodeKind::Document | NodeKind::Element => range.resize_by(1, -1),
            NodeKind::Text | NodeKind::Comment | NodeKind::ProcessingInstruction | NodeKind::Include => {
                None
            }
        })
    }

    /// Deepest node containing `offset`, searching from the root.
    pub fn child_at(&self, offset: usize) -> Result<NodeRef, DocumentError> {
        self.child_at_in(self.root, offset)
    }

    /// Deepest node below `parent` (or `parent` itself) containing `offset`.
    ///
    /// An offset on a node's own boundary marker yields that node. An offset between stored
    /// children yields the text run around it.
    pub fn child_at_in(&self, parent: NodeId, offset: usize) -> Result<NodeRef, DocumentError> {
        let range = self.range(parent)?;
        if !range.contains_offset(offset) {
            return Err(DocumentError::offset(offset, range.start, range.end));
        }

        let mut current = parent;
        loop {
            let data = self.data(current)?;
            let children = &data.children;
            let index = children
                .partition_point(|child| self.range(*child).is_ok_and(|r| r.end < offset));

            if let Some(&child) = children.get(index) {
                let child_range = self.range(child)?;
                if child_range.start <= offset {
                    if self.body(child)?.kind() == NodeKind::Element {
                        current = child;
                        continue;
                    }
                    return Ok(NodeRef::Node(child));
                }
            }

            let own = self.range(current)?;
            let kind = data.body.kind();
            if kind != NodeKind::Fragment && (offset == own.start || offset == own.end) {
                return Ok(NodeRef::Node(current));
            }

            let Some(window) = self.child_window(current)? else {
                return Ok(NodeRef::Node(current));
            };
            let start = match index.checked_sub(1) {
                Some(previous) => self.range(children[previous])?.end + 1,
                None => window.start,
            };
            let end = match children.get(index) {
                Some(&next) => self.range(next)?.start - 1,
                None => window.end,
            };
            return Ok(NodeRef::Text {
                parent: current,
                range: ContentRange::new(start, end),
            });
        }
    }

    /// The node responsible for an insertion at `offset`.
    ///
    /// Inserting exactly at a node's start offset means inserting before it, so the node's
    /// parent is responsible. Inserting at its end offset means inserting inside it, before the
    /// end marker. Text resolves to its parent.
    pub fn node_for_insertion_at(&self, offset: usize) -> Result<NodeId, DocumentError> {
        match self.child_at(offset)? {
            NodeRef::Text { parent, .. } => Ok(parent),
            NodeRef::Node(id) => {
                let range = self.range(id)?;
                if offset == range.start {
                    self.parent(id)?.ok_or_else(|| {
                        DocumentError::offset(offset, range.start + 1, range.end)
                    })
                } else {
                    Ok(id)
                }
            }
        }
    }

    /// Deepest stored node whose range strictly surrounds `offset` (markers excluded).
    ///
    /// Two offsets are balanced when they resolve to the same node here. An offset on a child's
    /// own marker resolves to the child's parent, so a run of whole siblings is balanced and a
    /// range cutting through a child is not.
    pub(crate) fn enclosing_node(&self, offset: usize) -> Result<NodeId, DocumentError> {
        let mut current = self.root;
        loop {
            let children = &self.data(current)?.children;
            let index = children
                .partition_point(|child| self.range(*child).is_ok_and(|r| r.end < offset));
            match children.get(index) {
                Some(&child) => {
                    let range = self.range(child)?;
                    if range.start < offset && offset < range.end {
                        current = child;
                    } else {
                        return Ok(current);
                    }
                }
                None => return Ok(current),
            }
        }
    }

    /// Check that `range` lies inside `parent`'s markers and never cuts through a stored
    /// child of `parent`: every child is either completely inside the range or disjoint
    /// from it.
    pub(crate) fn check_balanced(
        &self,
        parent: NodeId,
        range: ContentRange,
    ) -> Result<(), DocumentError> {
        let own = self.range(parent)?;
        let interior = match self.body(parent)?.kind() {
            NodeKind::Fragment => Some(own),
            _ => own.resize_by(1, -1),
        };
        if !interior.is_some_and(|interior| interior.contains(&range)) {
            return Err(ValidationError::UnbalancedRange(range).into());
        }
        for child in &self.data(parent)?.children {
            let child_range = self.range(*child)?;
            if child_range.intersects(&range) && !range.contains(&child_range) {
                return Err(ValidationError::UnbalancedRange(range).into());
            }
        }
        Ok(())
    }

    /// Ids of `node`'s ancestors, nearest first.
    pub(crate) fn ancestor_ids(&self, node: NodeRef) -> AncestorIds<'_> {
        let next = self.parent(node).ok().flatten();
        AncestorIds { tree: self, next }
    }

    /// Stored descendants of `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Result<Vec<NodeId>, DocumentError> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.data(id)?.children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.data(next)?.children.iter().rev().copied());
        }
        Ok(result)
    }

    // ---- namespace scoping ----

    fn scopes(&self, id: NodeId) -> impl Iterator<Item = &NamespaceDeclarations> + '_ {
        std::iter::once(id)
            .chain(self.ancestor_ids(NodeRef::Node(id)))
            .filter_map(|id| self.nodes.get(&id))
            .filter_map(|data| data.body.namespaces())
    }

    /// Namespace URI bound to `prefix` at `id`, searching outward through ancestors.
    pub fn namespace_uri(&self, id: NodeId, prefix: &str) -> Option<&str> {
        if prefix == XML_PREFIX {
            return Some(XML_NAMESPACE_URI);
        }
        self.scopes(id)
            .find_map(|scope| scope.prefixes.get(prefix))
            .map(String::as_str)
    }

    /// Default namespace in effect at `id`.
    pub fn default_namespace_uri(&self, id: NodeId) -> Option<&str> {
        self.scopes(id)
            .find_map(|scope| scope.default.as_deref())
    }

    /// A prefix bound to `uri` at `id` that is not shadowed by a nearer declaration.
    pub fn namespace_prefix(&self, id: NodeId, uri: &str) -> Option<&str> {
        if uri == XML_NAMESPACE_URI {
            return Some(XML_PREFIX);
        }
        self.scopes(id)
            .flat_map(|scope| scope.prefixes.iter())
            .filter(|(_, bound)| bound.as_str() == uri)
            .map(|(prefix, _)| prefix.as_str())
            .find(|prefix| self.namespace_uri(id, prefix) == Some(uri))
    }

    /// Returns `true` if names in `uri` can be written at `id` without a new declaration.
    pub fn is_namespace_visible(&self, id: NodeId, uri: &str) -> bool {
        self.default_namespace_uri(id) == Some(uri) || self.namespace_prefix(id, uri).is_some()
    }

    /// Prefixes declared on `id` itself.
    pub fn declared_namespace_prefixes(&self, id: NodeId) -> Result<BTreeSet<&str>, DocumentError> {
        Ok(self
            .body(id)?
            .namespaces()
            .map(|scope| scope.prefixes.keys().map(String::as_str).collect())
            .unwrap_or_default())
    }

    /// All prefixes visible at `id`.
    pub fn namespace_prefixes(&self, id: NodeId) -> BTreeSet<&str> {
        self.scopes(id)
            .flat_map(|scope| scope.prefixes.keys().map(String::as_str))
            .collect()
    }

    /// Every binding visible at `id`, nearer declarations winning.
    pub(crate) fn visible_namespaces(&self, id: NodeId) -> NamespaceDeclarations {
        let mut visible = NamespaceDeclarations::default();
        for scope in self.scopes(id) {
            for (prefix, uri) in &scope.prefixes {
                visible
                    .prefixes
                    .entry(prefix.clone())
                    .or_insert_with(|| uri.clone());
            }
            if visible.default.is_none() {
                visible.default = scope.default.clone();
            }
        }
        visible
    }

    // ---- mutation ----

    pub(crate) fn alloc(&mut self, body: NodeBody) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, NodeData::new(body));
        id
    }

    /// Bind `id` to `range`, replacing any previous binding.
    pub(crate) fn associate(&mut self, id: NodeId, range: ContentRange) -> Result<(), DocumentError> {
        self.data(id)?;
        if range.end >= self.content.len() {
            return Err(DocumentError::RangeOutOfBounds {
                range,
                length: self.content.len(),
            });
        }
        self.dissociate(id)?;

        let start = self.content.create_position(range.start)?;
        let end = self.content.create_position(range.end)?;
        self.data_mut(id)?.association = Some(Association { start, end });
        Ok(())
    }

    /// Release the positions binding `id`.
    pub(crate) fn dissociate(&mut self, id: NodeId) -> Result<(), DocumentError> {
        if let Some(mut association) = self.data_mut(id)?.association.take() {
            self.content.remove_position(&mut association.start);
            self.content.remove_position(&mut association.end);
        }
        Ok(())
    }

    /// Insert `child` among `parent`'s stored children, keeping them ordered by start offset.
    pub(crate) fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DocumentError> {
        let start = self.range(child)?.start;
        let index = self
            .data(parent)?
            .children
            .partition_point(|sibling| self.range(*sibling).is_ok_and(|r| r.start < start));
        self.data_mut(parent)?.children.insert(index, child);
        self.data_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Detach `child` from `parent` and drop it with its whole subtree.
    pub(crate) fn remove_subtree(&mut self, parent: NodeId, child: NodeId) -> Result<(), DocumentError> {
        self.data_mut(parent)?.children.retain(|id| *id != child);

        let mut doomed = self.descendants(child)?;
        doomed.push(child);
        for id in doomed {
            self.dissociate(id)?;
            self.nodes.remove(&id);
        }
        Ok(())
    }
}

/// Lazy iterator over a parent's children, text runs synthesized between stored children.
///
/// Created by [`Tree::child_nodes`].
pub struct ChildNodes<'a> {
    tree: &'a Tree,
    parent: NodeId,
    children: &'a [NodeId],
    index: usize,
    cursor: usize,
    window: Option<ContentRange>,
    pending: Option<NodeId>,
}

impl ChildNodes<'_> {
    fn text(&self, start: usize, end: usize) -> NodeRef {
        NodeRef::Text {
            parent: self.parent,
            range: ContentRange::new(start, end),
        }
    }
}

impl Iterator for ChildNodes<'_> {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        if let Some(child) = self.pending.take() {
            return Some(NodeRef::Node(child));
        }
        let window = self.window?;

        loop {
            if self.cursor > window.end {
                return None;
            }

            let Some(&child) = self.children.get(self.index) else {
                let text = self.text(self.cursor, window.end);
                self.cursor = window.end + 1;
                return Some(text);
            };
            let Ok(range) = self.tree.range(child) else {
                self.index += 1;
                continue;
            };

            if range.end < self.cursor {
                self.index += 1;
                continue;
            }
            if range.start > window.end {
                self.index = self.children.len();
                continue;
            }
            if range.start < self.cursor {
                // Overlaps the window start: only the text after it counts.
                self.cursor = range.end + 1;
                self.index += 1;
                continue;
            }
            if range.end > window.end {
                // Overlaps the window end: only the text before it counts.
                let start = self.cursor;
                self.cursor = window.end + 1;
                if start < range.start {
                    return Some(self.text(start, range.start - 1));
                }
                return None;
            }

            self.index += 1;
            let start = self.cursor;
            self.cursor = range.end + 1;
            if start < range.start {
                self.pending = Some(child);
                return Some(self.text(start, range.start - 1));
            }
            return Some(NodeRef::Node(child));
        }
    }
}

/// Iterator over ancestor ids, nearest first.
pub(crate) struct AncestorIds<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for AncestorIds<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.nodes.get(&current).and_then(|data| data.parent);
        Some(current)
    }
}
