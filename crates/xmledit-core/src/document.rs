//! The document and its L1 edit operations.
//!
//! Every structural edit follows the same protocol:
//!
//! 1. Check the offsets against the document window. Bad offsets fail with a precondition
//!    error before anything else runs.
//! 2. Resolve the insertion node ([`Tree::node_for_insertion_at`]) or, for deletes, the node
//!    enclosing both ends of the range.
//! 3. Build the validation sequence (names before the edit point, the names inserted, names
//!    after it) and ask the [`Validator`] whether it is acceptable as a partial sequence.
//!    A rejection returns [`ValidationError`] and leaves content and tree untouched.
//! 4. Notify listeners, change the content and the stored children together, notify again.
//!
//! The document node spans the whole content and holds two markers of its own. The root
//! element sits between them; comments and processing instructions may be placed before or
//! after it, text and elements may not.

use crate::axis::Axis;
use crate::config::DocumentConfig;
use crate::content::Content;
use crate::copy::{DeepCopy, deep_copy_into};
use crate::error::{DocumentError, ValidationError};
use crate::events::{
    AttributeChangeEvent, ContentChangeEvent, DocumentListener, ListenerId, NamespaceChangeEvent,
};
use crate::fragment::DocumentFragment;
use crate::node::{ElementData, IncludeData, IncludeParse, NodeBody, NodeId, NodeKind, NodeRef};
use crate::range::ContentRange;
use crate::tree::Tree;
use crate::validator::{PCDATA, Validator};
use log::debug;
use std::collections::BTreeSet;
use std::fmt;
use url::Url;
use xmledit_names::{
    QualifiedName, XML_NAMESPACE_URI, check_processing_instruction_target, is_valid_ncname,
};

const COMMENT_TERMINATOR: &str = "--";
const PROCESSING_INSTRUCTION_TERMINATOR: &str = "?>";

/// An editable document: content, node tree, validator and listeners.
pub struct Document {
    tree: Tree,
    root_element: NodeId,
    validator: Option<Box<dyn Validator>>,
    listeners: Vec<(ListenerId, Box<dyn DocumentListener>)>,
    next_listener_id: u64,
    public_id: Option<String>,
    system_id: Option<String>,
    encoding: Option<String>,
    base_uri: Option<String>,
}

impl Document {
    /// Create a document holding an empty root element named `root`.
    pub fn new(root: QualifiedName) -> Result<Self, DocumentError> {
        Self::with_config(root, DocumentConfig::default())
    }

    /// Create a document with explicit options.
    pub fn with_config(root: QualifiedName, config: DocumentConfig) -> Result<Self, DocumentError> {
        if !root.is_valid() {
            return Err(DocumentError::InvalidName(root.to_string()));
        }

        let mut content = Content::with_config(config.content);
        for offset in 0..4 {
            content.insert_tag_marker(offset)?;
        }

        let mut tree = Tree::new(content, NodeBody::Document);
        let document = tree.root();
        tree.associate(document, ContentRange::new(0, 3))?;

        let root_element = tree.alloc(NodeBody::Element(ElementData::new(root)));
        tree.associate(root_element, ContentRange::new(1, 2))?;
        tree.add_child(document, root_element)?;

        Ok(Self {
            tree,
            root_element,
            validator: None,
            listeners: Vec::new(),
            next_listener_id: 0,
            public_id: None,
            system_id: None,
            encoding: config.encoding,
            base_uri: None,
        })
    }

    // ---- structure ----

    /// The node tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The content buffer.
    pub fn content(&self) -> &Content {
        self.tree.content()
    }

    /// Number of cells, markers included.
    pub fn len(&self) -> usize {
        self.tree.content().len()
    }

    /// Always `false`: a document holds at least its own markers and the root element's.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The document node.
    pub fn document_node(&self) -> NodeId {
        self.tree.root()
    }

    /// The root element.
    pub fn root_element(&self) -> NodeId {
        self.root_element
    }

    /// Character data in `range`, markers left out.
    pub fn text(&self, range: ContentRange) -> Result<String, DocumentError> {
        self.tree.content().text(range)
    }

    /// Children of `parent`, text included.
    pub fn children(&self, parent: NodeId) -> Result<Axis<'_>, DocumentError> {
        self.tree.children(parent)
    }

    // ---- validator and listeners ----

    /// Install or remove the validator. Without one every well-formed edit is accepted.
    pub fn set_validator(&mut self, validator: Option<Box<dyn Validator>>) {
        self.validator = validator;
    }

    /// The current validator.
    pub fn validator(&self) -> Option<&dyn Validator> {
        self.validator.as_deref()
    }

    /// Register a listener.
    pub fn add_listener(&mut self, listener: Box<dyn DocumentListener>) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Unregister a listener, handing it back.
    pub fn remove_listener(&mut self, id: ListenerId) -> Option<Box<dyn DocumentListener>> {
        let index = self.listeners.iter().position(|(existing, _)| *existing == id)?;
        Some(self.listeners.remove(index).1)
    }

    fn notify(&mut self, mut call: impl FnMut(&mut dyn DocumentListener)) {
        for (_, listener) in &mut self.listeners {
            call(listener.as_mut());
        }
    }

    // ---- metadata ----

    /// Public identifier of the document type.
    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    /// Set the public identifier.
    pub fn set_public_id(&mut self, public_id: Option<String>) {
        self.public_id = public_id;
    }

    /// System identifier of the document type.
    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    /// Set the system identifier.
    pub fn set_system_id(&mut self, system_id: Option<String>) {
        self.system_id = system_id;
    }

    /// Declared character encoding.
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Set the declared encoding.
    pub fn set_encoding(&mut self, encoding: Option<String>) {
        self.encoding = encoding;
    }

    /// Base URI of the document itself.
    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }

    /// Set the document base URI.
    pub fn set_base_uri(&mut self, base_uri: Option<String>) {
        self.base_uri = base_uri;
    }

    /// Base URI in effect at `node`, applying `xml:base` attributes from the root down.
    pub fn base_uri_of(&self, node: impl Into<NodeRef>) -> Result<Option<String>, DocumentError> {
        let node = node.into();
        let mut chain = Vec::new();
        if let NodeRef::Node(id) = node {
            chain.push(id);
        }
        chain.extend(self.tree.ancestor_ids(node));

        let xml_base = QualifiedName::xml_base();
        let mut base = self.base_uri.clone();
        for id in chain.into_iter().rev() {
            if let Ok(element) = self.tree.element(id)
                && let Some(reference) = element.attribute(&xml_base)
            {
                base = Some(resolve_reference(base.as_deref(), reference));
            }
        }
        Ok(base)
    }

    // ---- offset checks ----

    fn document_range(&self) -> Result<ContentRange, DocumentError> {
        self.tree.range(self.tree.root())
    }

    fn check_insertion_offset(&self, offset: usize) -> Result<(), DocumentError> {
        let range = self.document_range()?;
        if offset <= range.start || offset > range.end {
            return Err(DocumentError::offset(offset, range.start + 1, range.end));
        }
        Ok(())
    }

    fn check_deletion_range(&self, range: ContentRange) -> Result<(), DocumentError> {
        if range.start > range.end {
            return Err(DocumentError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        let document = self.document_range()?;
        for offset in [range.start, range.end] {
            if offset <= document.start || offset >= document.end {
                return Err(DocumentError::offset(
                    offset,
                    document.start + 1,
                    document.end - 1,
                ));
            }
        }
        Ok(())
    }

    // ---- validation helpers ----

    /// Validation names of `element`'s children ending before `before` and starting after
    /// `after`.
    fn surrounding_names(
        &self,
        element: NodeId,
        before: usize,
        after: usize,
    ) -> Result<(Vec<QualifiedName>, Vec<QualifiedName>), DocumentError> {
        let prefix = self.tree.children(element)?.before(before)?.nodes();
        let suffix = self.tree.children(element)?.after(after)?.nodes();
        Ok((
            self.tree.validation_names(prefix)?,
            self.tree.validation_names(suffix)?,
        ))
    }

    /// Would inserting `names` at `offset` inside `element` keep it acceptable?
    fn accepts_insertion(
        &self,
        element: NodeId,
        offset: usize,
        names: &[QualifiedName],
    ) -> Result<bool, DocumentError> {
        let Some(validator) = self.validator.as_deref() else {
            return Ok(true);
        };
        let name = self.tree.element(element)?.name();
        let (prefix, suffix) = self.surrounding_names(element, offset, offset - 1)?;
        Ok(validator.is_valid_sequence(name, &prefix, names, &suffix, true))
    }

    /// The leaf text `node` would hold after replacing `removed` cells at `at` with `inserted`.
    fn edited_leaf_text(
        &self,
        node: NodeId,
        at: usize,
        removed: usize,
        inserted: &str,
    ) -> Result<String, DocumentError> {
        let start = self.tree.range(node)?.start + 1;
        let current: Vec<char> = self.tree.text(node)?.chars().collect();
        let index = at - start;
        let mut text: String = current[..index].iter().collect();
        text.push_str(inserted);
        text.extend(&current[(index + removed).min(current.len())..]);
        Ok(text)
    }

    fn check_leaf_text(kind: NodeKind, text: &str) -> Result<(), ValidationError> {
        match kind {
            NodeKind::Comment if text.contains(COMMENT_TERMINATOR) => {
                Err(ValidationError::ForbiddenSequence {
                    kind: kind.label(),
                    sequence: COMMENT_TERMINATOR,
                })
            }
            NodeKind::ProcessingInstruction if text.contains(PROCESSING_INSTRUCTION_TERMINATOR) => {
                Err(ValidationError::ForbiddenSequence {
                    kind: kind.label(),
                    sequence: PROCESSING_INSTRUCTION_TERMINATOR,
                })
            }
            _ => Ok(()),
        }
    }

    fn reject(operation: &str, error: ValidationError) -> DocumentError {
        debug!("{operation} rejected: {error}");
        DocumentError::Validation(error)
    }

    // ---- text ----

    /// Check a text insertion, returning the node that would receive it.
    fn check_insert_text(&self, offset: usize, text: &str) -> Result<NodeId, DocumentError> {
        self.check_insertion_offset(offset)?;
        let node = self.tree.node_for_insertion_at(offset)?;
        let kind = self.tree.kind(node)?;
        match kind {
            NodeKind::Element => {
                if !self.accepts_insertion(node, offset, &[PCDATA.clone()])? {
                    return Err(ValidationError::TextNotAllowed { offset }.into());
                }
            }
            NodeKind::Comment | NodeKind::ProcessingInstruction => {
                let edited = self.edited_leaf_text(node, offset, 0, text)?;
                Self::check_leaf_text(kind, &edited)?;
            }
            NodeKind::Document | NodeKind::Fragment | NodeKind::Text | NodeKind::Include => {
                return Err(ValidationError::TextNotAllowed { offset }.into());
            }
        }
        Ok(node)
    }

    /// Returns `true` if [`Document::insert_text`] would succeed.
    pub fn can_insert_text(&self, offset: usize, text: &str) -> bool {
        self.check_insert_text(offset, &normalize_text(text)).is_ok()
    }

    /// Insert character data at `offset`.
    ///
    /// Control characters other than newline are replaced with spaces. Text is accepted inside
    /// elements whose content model allows character data, and inside comments and processing
    /// instructions as long as it does not create their terminator.
    pub fn insert_text(&mut self, offset: usize, text: &str) -> Result<(), DocumentError> {
        let text = normalize_text(text);
        let parent = match self.check_insert_text(offset, &text) {
            Ok(parent) => parent,
            Err(DocumentError::Validation(error)) => return Err(Self::reject("insert_text", error)),
            Err(error) => return Err(error),
        };
        let length = text.chars().count();
        if length == 0 {
            return Ok(());
        }

        let event = ContentChangeEvent {
            parent,
            offset,
            length,
            structural: false,
        };
        self.notify(|listener| listener.before_content_inserted(&event));
        self.tree.content_mut().insert_text(offset, &text)?;
        self.notify(|listener| listener.content_inserted(&event));

        debug!("inserted {length} characters at {offset} into {parent}");
        Ok(())
    }

    // ---- structural leaves and elements ----

    fn check_insert_element(
        &self,
        offset: usize,
        name: &QualifiedName,
    ) -> Result<NodeId, DocumentError> {
        self.check_insertion_offset(offset)?;
        if !name.is_valid() {
            return Err(DocumentError::InvalidName(name.to_string()));
        }
        let node = self.tree.node_for_insertion_at(offset)?;
        if self.tree.kind(node)? != NodeKind::Element
            || !self.accepts_insertion(node, offset, std::slice::from_ref(name))?
        {
            return Err(ValidationError::ElementNotAllowed {
                name: name.clone(),
                offset,
            }
            .into());
        }
        Ok(node)
    }

    fn check_insert_comment(&self, offset: usize) -> Result<NodeId, DocumentError> {
        self.check_insertion_offset(offset)?;
        let node = self.tree.node_for_insertion_at(offset)?;
        match self.tree.kind(node)? {
            NodeKind::Element | NodeKind::Document => Ok(node),
            NodeKind::Fragment
            | NodeKind::Text
            | NodeKind::Comment
            | NodeKind::ProcessingInstruction
            | NodeKind::Include => Err(ValidationError::CommentNotAllowed { offset }.into()),
        }
    }

    fn check_insert_processing_instruction(
        &self,
        offset: usize,
        target: &str,
    ) -> Result<NodeId, DocumentError> {
        self.check_insertion_offset(offset)?;
        check_processing_instruction_target(target).map_err(|violation| {
            ValidationError::InvalidTarget {
                target: target.to_string(),
                violation,
            }
        })?;

        let node = self.tree.node_for_insertion_at(offset)?;
        let allowed = match self.tree.kind(node)? {
            NodeKind::Document => true,
            NodeKind::Element => match self.validator.as_deref() {
                Some(validator) => {
                    validator.allows_processing_instructions(self.tree.element(node)?.name())
                }
                None => true,
            },
            NodeKind::Fragment
            | NodeKind::Text
            | NodeKind::Comment
            | NodeKind::ProcessingInstruction
            | NodeKind::Include => false,
        };
        if !allowed {
            return Err(ValidationError::ProcessingInstructionNotAllowed { offset }.into());
        }
        Ok(node)
    }

    fn check_insert_include(&self, offset: usize) -> Result<NodeId, DocumentError> {
        self.check_insert_element(offset, &QualifiedName::xinclude())
    }

    /// Returns `true` if [`Document::insert_element`] would succeed.
    pub fn can_insert_element(&self, offset: usize, name: &QualifiedName) -> bool {
        self.check_insert_element(offset, name).is_ok()
    }

    /// Returns `true` if [`Document::insert_comment`] would succeed.
    pub fn can_insert_comment(&self, offset: usize) -> bool {
        self.check_insert_comment(offset).is_ok()
    }

    /// Returns `true` if [`Document::insert_processing_instruction`] would succeed.
    pub fn can_insert_processing_instruction(&self, offset: usize, target: &str) -> bool {
        self.check_insert_processing_instruction(offset, target)
            .is_ok()
    }

    /// Returns `true` if [`Document::insert_include`] would succeed.
    pub fn can_insert_include(&self, offset: usize) -> bool {
        self.check_insert_include(offset).is_ok()
    }

    /// Insert a pair of markers at `offset` and bind a new node with `body` to them.
    fn insert_marked_node(
        &mut self,
        parent: NodeId,
        offset: usize,
        body: NodeBody,
    ) -> Result<NodeId, DocumentError> {
        let event = ContentChangeEvent {
            parent,
            offset,
            length: 2,
            structural: true,
        };
        self.notify(|listener| listener.before_content_inserted(&event));

        let content = self.tree.content_mut();
        content.insert_tag_marker(offset)?;
        content.insert_tag_marker(offset)?;
        let kind = body.kind();
        let node = self.tree.alloc(body);
        self.tree.associate(node, ContentRange::new(offset, offset + 1))?;
        self.tree.add_child(parent, node)?;

        self.notify(|listener| listener.content_inserted(&event));
        debug!("inserted {} {node} at {offset} into {parent}", kind.label());
        Ok(node)
    }

    /// Insert an empty element named `name` at `offset`.
    pub fn insert_element(
        &mut self,
        offset: usize,
        name: QualifiedName,
    ) -> Result<NodeId, DocumentError> {
        let parent = match self.check_insert_element(offset, &name) {
            Ok(parent) => parent,
            Err(DocumentError::Validation(error)) => {
                return Err(Self::reject("insert_element", error));
            }
            Err(error) => return Err(error),
        };
        self.insert_marked_node(parent, offset, NodeBody::Element(ElementData::new(name)))
    }

    /// Insert an empty comment at `offset`. Fill it with [`Document::insert_text`].
    pub fn insert_comment(&mut self, offset: usize) -> Result<NodeId, DocumentError> {
        let parent = match self.check_insert_comment(offset) {
            Ok(parent) => parent,
            Err(DocumentError::Validation(error)) => {
                return Err(Self::reject("insert_comment", error));
            }
            Err(error) => return Err(error),
        };
        self.insert_marked_node(parent, offset, NodeBody::Comment)
    }

    /// Insert an empty processing instruction with `target` at `offset`.
    pub fn insert_processing_instruction(
        &mut self,
        offset: usize,
        target: &str,
    ) -> Result<NodeId, DocumentError> {
        let parent = match self.check_insert_processing_instruction(offset, target) {
            Ok(parent) => parent,
            Err(DocumentError::Validation(error)) => {
                return Err(Self::reject("insert_processing_instruction", error));
            }
            Err(error) => return Err(error),
        };
        self.insert_marked_node(
            parent,
            offset,
            NodeBody::ProcessingInstruction {
                target: target.to_string(),
            },
        )
    }

    /// Insert an XInclude reference to `href` at `offset`.
    pub fn insert_include(
        &mut self,
        offset: usize,
        href: impl Into<String>,
        parse: IncludeParse,
    ) -> Result<NodeId, DocumentError> {
        let parent = match self.check_insert_include(offset) {
            Ok(parent) => parent,
            Err(DocumentError::Validation(error)) => {
                return Err(Self::reject("insert_include", error));
            }
            Err(error) => return Err(error),
        };
        let include = IncludeData {
            href: href.into(),
            parse,
        };
        self.insert_marked_node(parent, offset, NodeBody::Include(include))
    }

    /// Change the target of a processing instruction.
    pub fn set_processing_instruction_target(
        &mut self,
        id: NodeId,
        target: &str,
    ) -> Result<(), DocumentError> {
        self.tree.processing_instruction_target(id)?;
        check_processing_instruction_target(target).map_err(|violation| {
            Self::reject(
                "set_processing_instruction_target",
                ValidationError::InvalidTarget {
                    target: target.to_string(),
                    violation,
                },
            )
        })?;
        self.tree.data_mut(id)?.body = NodeBody::ProcessingInstruction {
            target: target.to_string(),
        };
        debug!("processing instruction {id} now targets '{target}'");
        Ok(())
    }

    // ---- fragments ----

    fn check_insert_fragment(
        &self,
        offset: usize,
        fragment: &DocumentFragment,
    ) -> Result<NodeId, DocumentError> {
        self.check_insertion_offset(offset)?;
        let names = fragment.node_names()?;
        let node = self.tree.node_for_insertion_at(offset)?;
        if self.tree.kind(node)? != NodeKind::Element || !self.accepts_insertion(node, offset, &names)? {
            let names: Vec<String> = names.iter().map(ToString::to_string).collect();
            return Err(ValidationError::FragmentNotAllowed {
                names: names.join(", "),
                offset,
            }
            .into());
        }
        Ok(node)
    }

    /// Returns `true` if [`Document::insert_fragment`] would succeed.
    pub fn can_insert_fragment(&self, offset: usize, fragment: &DocumentFragment) -> bool {
        self.check_insert_fragment(offset, fragment).is_ok()
    }

    /// Copy the nodes and content of `range` into a new fragment.
    ///
    /// The range must be balanced, just like a delete range.
    pub fn fragment(&self, range: ContentRange) -> Result<DocumentFragment, DocumentError> {
        self.check_deletion_range(range)?;
        let parent = self.balanced_parent(range)?;
        DeepCopy::range(&self.tree, parent, range)
    }

    /// Insert a copy of `fragment` at `offset`, returning the ids of the inserted root-level
    /// nodes.
    ///
    /// The fragment's root-level sequence is validated in one piece. Namespace URIs its
    /// names use that are not visible at the destination get declared on the receiving
    /// element, under the prefix they had in the fragment when that prefix is still free.
    pub fn insert_fragment(
        &mut self,
        offset: usize,
        fragment: &DocumentFragment,
    ) -> Result<Vec<NodeId>, DocumentError> {
        let parent = match self.check_insert_fragment(offset, fragment) {
            Ok(parent) => parent,
            Err(DocumentError::Validation(error)) => {
                return Err(Self::reject("insert_fragment", error));
            }
            Err(error) => return Err(error),
        };
        let external = fragment.external_namespaces()?;

        let event = ContentChangeEvent {
            parent,
            offset,
            length: fragment.len(),
            structural: !fragment.roots().is_empty(),
        };
        self.notify(|listener| listener.before_content_inserted(&event));

        self.tree
            .content_mut()
            .insert_content(offset, fragment.content())?;
        let inserted = deep_copy_into(
            fragment.tree(),
            fragment.roots(),
            &mut self.tree,
            parent,
            offset as isize,
        )?;

        for (uri, preferred) in external {
            if self.tree.is_namespace_visible(parent, &uri) {
                continue;
            }
            let prefix = match preferred {
                Some(prefix) if self.tree.namespace_uri(parent, &prefix).is_none() => prefix,
                _ => self.generate_prefix(parent),
            };
            self.declare_namespace(parent, &prefix, &uri)?;
        }

        self.notify(|listener| listener.content_inserted(&event));
        debug!(
            "inserted fragment of {} cells ({} nodes) at {offset} into {parent}",
            event.length,
            inserted.len()
        );
        Ok(inserted)
    }

    fn generate_prefix(&self, element: NodeId) -> String {
        (1..)
            .map(|n| format!("ns{n}"))
            .find(|prefix| self.tree.namespace_uri(element, prefix).is_none())
            .unwrap_or_default()
    }

    // ---- deletion ----

    fn balanced_parent(&self, range: ContentRange) -> Result<NodeId, DocumentError> {
        let start = self.tree.enclosing_node(range.start)?;
        let end = self.tree.enclosing_node(range.end)?;
        if start != end {
            return Err(ValidationError::UnbalancedRange(range).into());
        }
        self.tree.check_balanced(start, range)?;
        Ok(start)
    }

    fn check_delete(&self, range: ContentRange) -> Result<NodeId, DocumentError> {
        self.check_deletion_range(range)?;
        let node = self.balanced_parent(range)?;

        let kind = self.tree.kind(node)?;
        match kind {
            NodeKind::Document => {
                if range.intersects(&self.tree.range(self.root_element)?) {
                    return Err(ValidationError::DeletionNotAllowed(range).into());
                }
            }
            NodeKind::Element => {
                if let Some(validator) = self.validator.as_deref() {
                    let name = self.tree.element(node)?.name();
                    let (prefix, suffix) = self.surrounding_names(node, range.start, range.end)?;
                    if !validator.is_valid_sequence(name, &prefix, &[], &suffix, true) {
                        return Err(ValidationError::DeletionNotAllowed(range).into());
                    }
                }
            }
            NodeKind::Comment | NodeKind::ProcessingInstruction => {
                let edited = self.edited_leaf_text(node, range.start, range.length(), "")?;
                Self::check_leaf_text(kind, &edited)?;
            }
            NodeKind::Fragment | NodeKind::Text | NodeKind::Include => {
                return Err(ValidationError::DeletionNotAllowed(range).into());
            }
        }
        Ok(node)
    }

    /// Returns `true` if [`Document::delete`] would succeed.
    pub fn can_delete(&self, range: ContentRange) -> bool {
        self.check_delete(range).is_ok()
    }

    /// Delete the cells in `range`, markers and every node they bound included.
    ///
    /// The range must be balanced: both ends must resolve to the same enclosing node, so a
    /// delete removes either content strictly inside one node or a run of whole siblings.
    pub fn delete(&mut self, range: ContentRange) -> Result<(), DocumentError> {
        let parent = match self.check_delete(range) {
            Ok(parent) => parent,
            Err(DocumentError::Validation(error)) => return Err(Self::reject("delete", error)),
            Err(error) => return Err(error),
        };

        let mut doomed = Vec::new();
        for child in self.tree.stored_children(parent)? {
            if self.tree.is_in_range(*child, range)? {
                doomed.push(*child);
            }
        }

        let event = ContentChangeEvent {
            parent,
            offset: range.start,
            length: range.length(),
            structural: !doomed.is_empty(),
        };
        self.notify(|listener| listener.before_content_deleted(&event));

        for child in &doomed {
            self.tree.remove_subtree(parent, *child)?;
        }
        self.tree.content_mut().remove(range)?;

        self.notify(|listener| listener.content_deleted(&event));
        debug!(
            "deleted {range} from {parent} ({} nodes removed)",
            doomed.len()
        );
        Ok(())
    }

    /// Names the validator allows somewhere in the element receiving an insertion at
    /// `offset`. Empty without a validator or outside the root element.
    pub fn valid_items_at(&self, offset: usize) -> Result<BTreeSet<QualifiedName>, DocumentError> {
        self.check_insertion_offset(offset)?;
        let node = self.tree.node_for_insertion_at(offset)?;
        match (self.validator.as_deref(), self.tree.element(node)) {
            (Some(validator), Ok(element)) => Ok(validator.valid_items(element.name())),
            _ => Ok(BTreeSet::new()),
        }
    }

    // ---- attributes ----

    /// Attribute value of `element`.
    pub fn attribute(
        &self,
        element: NodeId,
        name: &QualifiedName,
    ) -> Result<Option<&str>, DocumentError> {
        Ok(self.tree.element(element)?.attribute(name))
    }

    /// Set an attribute, returning the previous value.
    ///
    /// When the validator declares the attribute with an enumerated type, only the listed
    /// values are accepted.
    pub fn set_attribute(
        &mut self,
        element: NodeId,
        name: QualifiedName,
        value: impl Into<String>,
    ) -> Result<Option<String>, DocumentError> {
        let value = value.into();
        let element_name = self.tree.element(element)?.name().clone();
        if !name.is_valid() {
            return Err(DocumentError::InvalidName(name.to_string()));
        }
        if let Some(validator) = self.validator.as_deref()
            && validator
                .attribute_definitions(&element_name)
                .iter()
                .any(|definition| definition.name == name && !definition.accepts(&value))
        {
            return Err(Self::reject(
                "set_attribute",
                ValidationError::AttributeValueNotAllowed { name, value },
            ));
        }

        let old_value = self
            .tree
            .element_mut(element)?
            .set_attribute(name.clone(), value.clone());
        let event = AttributeChangeEvent {
            element,
            name,
            old_value: old_value.clone(),
            new_value: Some(value),
        };
        self.notify(|listener| listener.attribute_changed(&event));
        debug!("set attribute {} on {element}", event.name);
        Ok(old_value)
    }

    /// Remove an attribute, returning its value. Nothing is notified if it was absent.
    pub fn remove_attribute(
        &mut self,
        element: NodeId,
        name: &QualifiedName,
    ) -> Result<Option<String>, DocumentError> {
        let Some(old_value) = self.tree.element_mut(element)?.remove_attribute(name) else {
            return Ok(None);
        };
        let event = AttributeChangeEvent {
            element,
            name: name.clone(),
            old_value: Some(old_value.clone()),
            new_value: None,
        };
        self.notify(|listener| listener.attribute_changed(&event));
        debug!("removed attribute {name} from {element}");
        Ok(Some(old_value))
    }

    // ---- namespace declarations ----

    fn notify_namespace(
        &mut self,
        element: NodeId,
        prefix: Option<&str>,
        old_uri: Option<String>,
        new_uri: Option<String>,
    ) {
        if old_uri == new_uri {
            return;
        }
        let event = NamespaceChangeEvent {
            element,
            prefix: prefix.map(str::to_string),
            old_uri,
            new_uri,
        };
        self.notify(|listener| listener.namespace_changed(&event));
        debug!("namespace declaration {:?} changed on {element}", event.prefix);
    }

    /// Bind `prefix` to `uri` on `element`, returning the previous local binding.
    ///
    /// `xmlns` is never accepted and `xml` only with [`XML_NAMESPACE_URI`].
    pub fn declare_namespace(
        &mut self,
        element: NodeId,
        prefix: &str,
        uri: &str,
    ) -> Result<Option<String>, DocumentError> {
        if !is_valid_ncname(prefix) {
            return Err(DocumentError::InvalidName(prefix.to_string()));
        }
        if prefix.eq_ignore_ascii_case("xmlns") || (prefix == "xml" && uri != XML_NAMESPACE_URI) {
            return Err(DocumentError::ReservedPrefix(prefix.to_string()));
        }
        let old_uri = self
            .tree
            .element_mut(element)?
            .namespaces_mut()
            .prefixes
            .insert(prefix.to_string(), uri.to_string());
        self.notify_namespace(element, Some(prefix), old_uri.clone(), Some(uri.to_string()));
        Ok(old_uri)
    }

    /// Remove the binding of `prefix` declared on `element`.
    pub fn remove_namespace_declaration(
        &mut self,
        element: NodeId,
        prefix: &str,
    ) -> Result<Option<String>, DocumentError> {
        let old_uri = self
            .tree
            .element_mut(element)?
            .namespaces_mut()
            .prefixes
            .remove(prefix);
        self.notify_namespace(element, Some(prefix), old_uri.clone(), None);
        Ok(old_uri)
    }

    /// Declare the default namespace on `element`.
    pub fn declare_default_namespace(
        &mut self,
        element: NodeId,
        uri: &str,
    ) -> Result<Option<String>, DocumentError> {
        let old_uri = self
            .tree
            .element_mut(element)?
            .namespaces_mut()
            .default
            .replace(uri.to_string());
        self.notify_namespace(element, None, old_uri.clone(), Some(uri.to_string()));
        Ok(old_uri)
    }

    /// Remove the default namespace declared on `element`.
    pub fn remove_default_namespace(
        &mut self,
        element: NodeId,
    ) -> Result<Option<String>, DocumentError> {
        let old_uri = self
            .tree
            .element_mut(element)?
            .namespaces_mut()
            .default
            .take();
        self.notify_namespace(element, None, old_uri.clone(), None);
        Ok(old_uri)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("tree", &self.tree)
            .field("root_element", &self.root_element)
            .field("validator", &self.validator.is_some())
            .field("listeners", &self.listeners.len())
            .field("public_id", &self.public_id)
            .field("system_id", &self.system_id)
            .field("encoding", &self.encoding)
            .field("base_uri", &self.base_uri)
            .finish()
    }
}

/// Replace control characters other than newline with spaces.
fn normalize_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() && c != '\n' { ' ' } else { c })
        .collect()
}

/// Resolve `reference` against `base` the way `xml:base` chains are resolved.
///
/// Without an absolute base the reference is returned as written.
fn resolve_reference(base: Option<&str>, reference: &str) -> String {
    base.and_then(|base| Url::parse(base).ok())
        .and_then(|base| base.join(reference).ok())
        .map(String::from)
        .unwrap_or_else(|| reference.to_string())
}
