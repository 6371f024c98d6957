//! Change notifications.
//!
//! A [`crate::Document`] dispatches events to registered [`DocumentListener`]s synchronously,
//! on the caller's stack: a `before_*` call right before the content and tree change, the
//! matching after-call right after. Listeners receive owned event values and never a handle
//! to the document, so they cannot edit it or change the listener list while a dispatch is
//! running.

use crate::node::NodeId;
use crate::range::ContentRange;
use xmledit_names::QualifiedName;

/// Identifier returned by [`crate::Document::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub(crate) u64);

impl ListenerId {
    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Content was (or is about to be) inserted or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChangeEvent {
    /// The node whose content changes.
    pub parent: NodeId,
    /// First affected offset.
    pub offset: usize,
    /// Number of affected cells.
    pub length: usize,
    /// `true` if nodes are added or removed, `false` for pure text edits.
    pub structural: bool,
}

impl ContentChangeEvent {
    /// The affected cells as a range.
    pub fn range(&self) -> ContentRange {
        ContentRange::with_length(self.offset, self.length)
    }
}

/// An attribute value changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChangeEvent {
    /// The element carrying the attribute.
    pub element: NodeId,
    /// Attribute name.
    pub name: QualifiedName,
    /// Value before the change, `None` if the attribute was absent.
    pub old_value: Option<String>,
    /// Value after the change, `None` if the attribute was removed.
    pub new_value: Option<String>,
}

/// A namespace declaration changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceChangeEvent {
    /// The element carrying the declaration.
    pub element: NodeId,
    /// Declared prefix; `None` for the default namespace.
    pub prefix: Option<String>,
    /// URI before the change.
    pub old_uri: Option<String>,
    /// URI after the change.
    pub new_uri: Option<String>,
}

/// Observer of document changes. Every method defaults to doing nothing.
pub trait DocumentListener {
    /// Content is about to be inserted.
    fn before_content_inserted(&mut self, _event: &ContentChangeEvent) {}

    /// Content was inserted.
    fn content_inserted(&mut self, _event: &ContentChangeEvent) {}

    /// Content is about to be deleted.
    fn before_content_deleted(&mut self, _event: &ContentChangeEvent) {}

    /// Content was deleted.
    fn content_deleted(&mut self, _event: &ContentChangeEvent) {}

    /// An attribute changed.
    fn attribute_changed(&mut self, _event: &AttributeChangeEvent) {}

    /// A namespace declaration changed.
    fn namespace_changed(&mut self, _event: &NamespaceChangeEvent) {}
}
