//! Error types.
//!
//! Two kinds of failure exist:
//!
//! - **Precondition errors** ([`DocumentError`] variants other than `Validation`): an offset
//!   outside its window, a node that is no longer part of the tree, a misused [`crate::Axis`].
//!   These are programming errors; retrying without changing the call fails again.
//! - **Structural validation errors** ([`ValidationError`], wrapped in
//!   [`DocumentError::Validation`]): the edit would produce a document the current
//!   [`crate::Validator`] rejects. Such an error guarantees that neither the content buffer nor
//!   the node tree was touched.

use crate::node::NodeId;
use crate::range::ContentRange;
use thiserror::Error;
use xmledit_names::{QualifiedName, TargetViolation};

/// Errors returned by content, tree and document operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("offset {offset} is outside [{min}, {max}]")]
    /// An offset argument fell outside its valid window.
    OffsetOutOfRange {
        /// The rejected offset.
        offset: usize,
        /// Smallest accepted offset.
        min: usize,
        /// Largest accepted offset.
        max: usize,
    },

    #[error("range {range} is outside [0, {length}) of the content")]
    /// A range argument does not lie inside the content.
    RangeOutOfBounds {
        /// The rejected range.
        range: ContentRange,
        /// Length of the content it was applied to.
        length: usize,
    },

    #[error("invalid range: start {start} is after end {end}")]
    /// A range whose start lies after its end.
    InvalidRange {
        /// Start offset.
        start: usize,
        /// End offset.
        end: usize,
    },

    #[error("node {0} is not associated with any content")]
    /// The node has no content range.
    Dissociated(NodeId),

    #[error("node {0} does not exist in this tree")]
    /// The id does not name a live node (it was deleted, or belongs to another tree).
    UnknownNode(NodeId),

    #[error("node {0} is not an element")]
    /// An element-only operation was applied to another node kind.
    NotAnElement(NodeId),

    #[error("node {0} is not a processing instruction")]
    /// A processing-instruction-only operation was applied to another node kind.
    NotAProcessingInstruction(NodeId),

    #[error("{0} nodes cannot be copied")]
    /// Documents and fragments are not relocatable units.
    NotCopyable(&'static str),

    #[error("axis restriction '{0}' can only be set once")]
    /// An axis range restriction or index window was set twice.
    AxisAlreadyRestricted(&'static str),

    #[error("axis is empty")]
    /// `first`/`last` on an empty axis.
    EmptyAxis,

    #[error("index {index} is out of bounds for an axis of {len} nodes")]
    /// `get` past the end of an axis.
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of nodes in the axis.
        len: usize,
    },

    #[error("'{0}' is not a valid XML name")]
    /// Element or attribute local name is not an NCName.
    InvalidName(String),

    #[error("prefix '{0}' is reserved")]
    /// `xmlns` can never be declared; `xml` only for its own namespace.
    ReservedPrefix(String),

    #[error("a document fragment needs non-empty content")]
    /// Fragments always hold at least one character.
    EmptyFragment,

    #[error(transparent)]
    /// The edit is structurally invalid; nothing was modified.
    Validation(#[from] ValidationError),
}

impl DocumentError {
    /// Returns `true` for structural validation failures (as opposed to precondition errors).
    pub fn is_validation(&self) -> bool {
        matches!(self, DocumentError::Validation(_))
    }

    pub(crate) fn offset(offset: usize, min: usize, max: usize) -> Self {
        DocumentError::OffsetOutOfRange { offset, min, max }
    }
}

/// An edit was rejected because it would make the document structurally invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("text is not allowed at offset {offset}")]
    /// Character data is not allowed at the insertion point.
    TextNotAllowed {
        /// Insertion offset.
        offset: usize,
    },

    #[error("element {name} is not allowed at offset {offset}")]
    /// The element may not be inserted at the insertion point.
    ElementNotAllowed {
        /// Name of the rejected element.
        name: QualifiedName,
        /// Insertion offset.
        offset: usize,
    },

    #[error("a comment is not allowed at offset {offset}")]
    /// The insertion point is inside a comment, PI or include.
    CommentNotAllowed {
        /// Insertion offset.
        offset: usize,
    },

    #[error("a processing instruction is not allowed at offset {offset}")]
    /// The insertion point is inside a comment, PI or include, or the element forbids PIs.
    ProcessingInstructionNotAllowed {
        /// Insertion offset.
        offset: usize,
    },

    #[error("invalid processing instruction target '{target}': {violation}")]
    /// A processing-instruction target failed the syntax check.
    InvalidTarget {
        /// The rejected target.
        target: String,
        /// Which rule it broke.
        violation: TargetViolation,
    },

    #[error("the fragment [{names}] is not allowed at offset {offset}")]
    /// The fragment's root-level node sequence is not allowed at the insertion point.
    FragmentNotAllowed {
        /// Root-level node names of the fragment, comma separated.
        names: String,
        /// Insertion offset.
        offset: usize,
    },

    #[error("range {0} is unbalanced")]
    /// Start and end of a range resolve to different enclosing nodes.
    UnbalancedRange(ContentRange),

    #[error("deleting {0} would leave the document invalid")]
    /// Removing the range would violate the content model of its enclosing node.
    DeletionNotAllowed(ContentRange),

    #[error("the content of {kind} would contain '{sequence}'")]
    /// Editing a comment or PI would embed its terminator.
    ForbiddenSequence {
        /// "comment" or "processing instruction".
        kind: &'static str,
        /// The forbidden sequence.
        sequence: &'static str,
    },

    #[error("value '{value}' is not allowed for attribute {name}")]
    /// The validator declares the attribute with an enumeration that excludes the value.
    AttributeValueNotAllowed {
        /// Attribute name.
        name: QualifiedName,
        /// Rejected value.
        value: String,
    },
}
