//! Shallow and deep node copies.
//!
//! [`shallow_copy`] clones one node's payload (name, attributes, namespace declarations,
//! target, href) without children or content. [`DeepCopy`] walks a subtree, copies the
//! characters it spans into a fresh [`Content`] and rebuilds the stored nodes there with their
//! ranges shifted, producing a [`DocumentFragment`]. Text is never copied as nodes: it comes
//! back on its own once the characters are in place.

use crate::content::Content;
use crate::error::DocumentError;
use crate::fragment::DocumentFragment;
use crate::node::{NodeBody, NodeId, NodeKind, NodeRef};
use crate::range::ContentRange;
use crate::tree::Tree;

/// Copy the payload of `id`, without children and without a content binding.
///
/// Documents and fragments are not relocatable and fail with
/// [`DocumentError::NotCopyable`].
pub fn shallow_copy(tree: &Tree, id: NodeId) -> Result<NodeBody, DocumentError> {
    let body = tree.body(id)?;
    match body {
        NodeBody::Document | NodeBody::Fragment(_) => {
            Err(DocumentError::NotCopyable(body.kind().label()))
        }
        NodeBody::Element(_)
        | NodeBody::Comment
        | NodeBody::ProcessingInstruction { .. }
        | NodeBody::Include(_) => Ok(body.clone()),
    }
}

/// Copy the subtrees rooted at `roots` from `source` into `dest`, under `dest_parent`.
///
/// Every copy is bound to its original range moved by `delta`; the destination content must
/// already hold the characters there. Returns the ids of the copied roots.
pub(crate) fn deep_copy_into(
    source: &Tree,
    roots: &[NodeId],
    dest: &mut Tree,
    dest_parent: NodeId,
    delta: isize,
) -> Result<Vec<NodeId>, DocumentError> {
    let mut copied = Vec::with_capacity(roots.len());
    let mut pending: Vec<(NodeId, NodeId)> = roots.iter().map(|root| (*root, dest_parent)).collect();
    pending.reverse();

    while let Some((original, parent)) = pending.pop() {
        let body = shallow_copy(source, original)?;
        let range = source.range(original)?;
        let moved = range.move_by(delta).ok_or(DocumentError::RangeOutOfBounds {
            range,
            length: dest.content().len(),
        })?;

        let copy = dest.alloc(body);
        dest.associate(copy, moved)?;
        dest.add_child(parent, copy)?;
        if parent == dest_parent {
            copied.push(copy);
        }

        for child in source.stored_children(original)?.iter().rev() {
            pending.push((*child, copy));
        }
    }
    Ok(copied)
}

/// Entry points for subtree copies.
pub struct DeepCopy;

impl DeepCopy {
    /// Copy one node (with its subtree) into a new fragment whose content starts at 0.
    ///
    /// Copying a text view yields a fragment holding only the characters.
    pub fn node(tree: &Tree, node: impl Into<NodeRef>) -> Result<DocumentFragment, DocumentError> {
        let node = node.into();
        match node {
            NodeRef::Text { parent, range } => Self::build(tree, parent, range, &[]),
            NodeRef::Node(id) => {
                let kind = tree.kind(id)?;
                if matches!(kind, NodeKind::Document | NodeKind::Fragment) {
                    return Err(DocumentError::NotCopyable(kind.label()));
                }
                let range = tree.range(id)?;
                let scope = tree.parent(id)?.unwrap_or(id);
                Self::build(tree, scope, range, &[id])
            }
        }
    }

    /// Copy the part of `parent`'s content inside `range`, with every stored child of
    /// `parent` the range contains.
    ///
    /// The range must lie between `parent`'s own markers and must not cut through a stored
    /// child; otherwise it fails with [`crate::ValidationError::UnbalancedRange`].
    pub fn range(
        tree: &Tree,
        parent: NodeId,
        range: ContentRange,
    ) -> Result<DocumentFragment, DocumentError> {
        tree.check_balanced(parent, range)?;
        let roots: Vec<NodeId> = tree
            .stored_children(parent)?
            .iter()
            .copied()
            .filter(|child| tree.is_in_range(*child, range).unwrap_or(false))
            .collect();
        Self::build(tree, parent, range, &roots)
    }

    fn build(
        tree: &Tree,
        scope: NodeId,
        range: ContentRange,
        roots: &[NodeId],
    ) -> Result<DocumentFragment, DocumentError> {
        let content: Content = tree.content().content(range)?;
        if content.is_empty() {
            return Err(DocumentError::EmptyFragment);
        }

        let mut copy = Tree::new(content, NodeBody::Fragment(tree.visible_namespaces(scope)));
        let root = copy.root();
        let length = copy.content().len();
        copy.associate(root, ContentRange::with_length(0, length))?;

        let delta = -(range.start as isize);
        deep_copy_into(tree, roots, &mut copy, root, delta)?;
        DocumentFragment::from_tree(copy)
    }
}
