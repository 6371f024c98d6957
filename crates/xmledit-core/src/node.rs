//! Node data model.
//!
//! Structural nodes (elements, comments, processing instructions, includes and the
//! document/fragment roots) live in a [`crate::Tree`] arena and are addressed by [`NodeId`].
//! Text is never stored: it is whatever lies between stored children, and is handed out as
//! [`NodeRef::Text`] views that are rebuilt on every query.

use crate::position::Position;
use crate::range::ContentRange;
use std::collections::BTreeMap;
use std::fmt;
use xmledit_names::QualifiedName;

/// Opaque identifier of a stored node in a [`crate::Tree`].
///
/// Ids are never reused within a tree, so an id that outlived its node fails lookups with
/// [`crate::DocumentError::UnknownNode`] instead of naming some other node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    /// Get the underlying numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The document root.
    Document,
    /// A detached fragment root.
    Fragment,
    /// An element.
    Element,
    /// A synthesized run of character data.
    Text,
    /// A comment.
    Comment,
    /// A processing instruction.
    ProcessingInstruction,
    /// An XInclude reference.
    Include,
}

impl NodeKind {
    /// Returns `true` for kinds that can hold children.
    pub fn is_parent(self) -> bool {
        matches!(
            self,
            NodeKind::Document | NodeKind::Fragment | NodeKind::Element
        )
    }

    /// Human readable name, used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Fragment => "document fragment",
            NodeKind::Element => "element",
            NodeKind::Text => "text",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing instruction",
            NodeKind::Include => "include",
        }
    }
}

/// A handle to any node, stored or synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    /// A stored structural node.
    Node(NodeId),
    /// A text run between stored children of `parent`.
    ///
    /// The range is a snapshot taken when the view was synthesized; it is not updated by
    /// later edits.
    Text {
        /// The parent the text belongs to.
        parent: NodeId,
        /// The characters covered by the run.
        range: ContentRange,
    },
}

impl NodeRef {
    /// The stored node id, or `None` for text.
    pub fn id(self) -> Option<NodeId> {
        match self {
            NodeRef::Node(id) => Some(id),
            NodeRef::Text { .. } => None,
        }
    }

    /// Returns `true` for text runs.
    pub fn is_text(self) -> bool {
        matches!(self, NodeRef::Text { .. })
    }
}

impl From<NodeId> for NodeRef {
    fn from(id: NodeId) -> Self {
        NodeRef::Node(id)
    }
}

/// Prefix to namespace URI bindings declared on one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceDeclarations {
    /// Prefixed bindings.
    pub prefixes: BTreeMap<String, String>,
    /// The default namespace, if declared here.
    pub default: Option<String>,
}

impl NamespaceDeclarations {
    /// Returns `true` if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.default.is_none()
    }
}

/// Element payload: name, attributes and namespace declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    name: QualifiedName,
    attributes: BTreeMap<QualifiedName, String>,
    namespaces: NamespaceDeclarations,
}

impl ElementData {
    /// A new element with no attributes and no declarations.
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            attributes: BTreeMap::new(),
            namespaces: NamespaceDeclarations::default(),
        }
    }

    /// Qualified name of the element.
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Attribute value by name.
    pub fn attribute(&self, name: &QualifiedName) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attributes in canonical name order.
    pub fn attributes(&self) -> &BTreeMap<QualifiedName, String> {
        &self.attributes
    }

    /// Namespace declarations made on this element.
    pub fn namespaces(&self) -> &NamespaceDeclarations {
        &self.namespaces
    }

    pub(crate) fn set_attribute(&mut self, name: QualifiedName, value: String) -> Option<String> {
        self.attributes.insert(name, value)
    }

    pub(crate) fn remove_attribute(&mut self, name: &QualifiedName) -> Option<String> {
        self.attributes.remove(name)
    }

    pub(crate) fn namespaces_mut(&mut self) -> &mut NamespaceDeclarations {
        &mut self.namespaces
    }
}

/// How an XInclude reference is to be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IncludeParse {
    /// Include as markup.
    #[default]
    Xml,
    /// Include as character data.
    Text,
}

/// Include payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeData {
    /// Referenced resource.
    pub href: String,
    /// Parse mode.
    pub parse: IncludeParse,
}

/// Kind-specific payload of a stored node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeBody {
    /// Document root.
    Document,
    /// Fragment root. Carries the namespace bindings visible where the fragment was taken.
    Fragment(NamespaceDeclarations),
    /// Element.
    Element(ElementData),
    /// Comment; its text is the content between its markers.
    Comment,
    /// Processing instruction; its data is the content between its markers.
    ProcessingInstruction {
        /// PI target.
        target: String,
    },
    /// XInclude reference.
    Include(IncludeData),
}

impl NodeBody {
    /// Kind of this payload.
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeBody::Document => NodeKind::Document,
            NodeBody::Fragment(_) => NodeKind::Fragment,
            NodeBody::Element(_) => NodeKind::Element,
            NodeBody::Comment => NodeKind::Comment,
            NodeBody::ProcessingInstruction { .. } => NodeKind::ProcessingInstruction,
            NodeBody::Include(_) => NodeKind::Include,
        }
    }

    /// Namespace declarations carried by this payload, if the kind has any.
    pub fn namespaces(&self) -> Option<&NamespaceDeclarations> {
        match self {
            NodeBody::Element(element) => Some(element.namespaces()),
            NodeBody::Fragment(scope) => Some(scope),
            NodeBody::Document
            | NodeBody::Comment
            | NodeBody::ProcessingInstruction { .. }
            | NodeBody::Include(_) => None,
        }
    }
}

/// The two positions binding a node to its content range.
#[derive(Debug)]
pub(crate) struct Association {
    pub(crate) start: Position,
    pub(crate) end: Position,
}

impl Association {
    pub(crate) fn range(&self) -> ContentRange {
        ContentRange::new(self.start.offset(), self.end.offset())
    }
}

/// A stored node in the arena.
#[derive(Debug)]
pub(crate) struct NodeData {
    pub(crate) body: NodeBody,
    pub(crate) parent: Option<NodeId>,
    /// Ascending by start offset, non-overlapping.
    pub(crate) children: Vec<NodeId>,
    pub(crate) association: Option<Association>,
}

impl NodeData {
    pub(crate) fn new(body: NodeBody) -> Self {
        Self {
            body,
            parent: None,
            children: Vec::new(),
            association: None,
        }
    }
}
