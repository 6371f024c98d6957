//! Detached document fragments.

use crate::axis::Axis;
use crate::content::Content;
use crate::error::DocumentError;
use crate::node::{NamespaceDeclarations, NodeBody, NodeId, NodeKind, NodeRef};
use crate::range::ContentRange;
use crate::tree::Tree;
use std::collections::BTreeMap;
use xmledit_names::{QualifiedName, XML_NAMESPACE_URI};

/// A detached subtree with its own private content.
///
/// Produced by [`crate::DeepCopy`] and [`crate::Document::fragment`], consumed by
/// [`crate::Document::insert_fragment`]. The root-level nodes sit directly under a fragment
/// root that spans the whole content; the content always holds at least one cell.
#[derive(Debug)]
pub struct DocumentFragment {
    tree: Tree,
}

impl DocumentFragment {
    pub(crate) fn from_tree(tree: Tree) -> Result<Self, DocumentError> {
        if tree.content().is_empty() {
            return Err(DocumentError::EmptyFragment);
        }
        Ok(Self { tree })
    }

    /// The fragment's node tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The fragment's private content.
    pub fn content(&self) -> &Content {
        self.tree.content()
    }

    /// Number of cells, markers included.
    pub fn len(&self) -> usize {
        self.tree.content().len()
    }

    /// Always `false`: fragments hold at least one cell.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The range covering the whole fragment.
    pub fn range(&self) -> ContentRange {
        ContentRange::with_length(0, self.len())
    }

    /// Character data of the whole fragment, markers left out.
    pub fn text(&self) -> String {
        self.tree.content().text(self.range()).unwrap_or_default()
    }

    /// Root-level stored nodes, in document order.
    pub fn roots(&self) -> &[NodeId] {
        self.tree
            .stored_children(self.tree.root())
            .unwrap_or_default()
    }

    /// Root-level nodes, text included.
    pub fn children(&self) -> Axis<'_> {
        Axis::children(&self.tree, self.tree.root())
    }

    /// Namespace bindings that were visible where the fragment was taken.
    pub fn namespaces(&self) -> &NamespaceDeclarations {
        match self.tree.body(self.tree.root()) {
            Ok(NodeBody::Fragment(scope)) => scope,
            _ => &EMPTY_SCOPE,
        }
    }

    /// Validation names of the root-level sequence.
    pub fn node_names(&self) -> Result<Vec<QualifiedName>, DocumentError> {
        self.tree.validation_names(self.children().nodes())
    }

    /// Namespace URIs the fragment's names use but do not declare themselves, each with the
    /// prefix it was bound to at the extraction point, if any.
    pub fn external_namespaces(&self) -> Result<BTreeMap<String, Option<String>>, DocumentError> {
        let root = self.tree.root();
        let mut external = BTreeMap::new();

        for id in self.tree.descendants(root)? {
            if self.tree.kind(id)? != NodeKind::Element {
                continue;
            }
            let element = self.tree.element(id)?;
            let uris = std::iter::once(element.name())
                .chain(element.attributes().keys())
                .filter_map(|name| name.qualifier())
                .filter(|uri| *uri != XML_NAMESPACE_URI);

            for uri in uris {
                if external.contains_key(uri) || self.declared_inside(id, uri) {
                    continue;
                }
                let prefix = self
                    .namespaces()
                    .prefixes
                    .iter()
                    .find(|(_, bound)| bound.as_str() == uri)
                    .map(|(prefix, _)| prefix.clone());
                external.insert(uri.to_string(), prefix);
            }
        }
        Ok(external)
    }

    /// Is `uri` declared on `id` or an ancestor below the fragment root?
    fn declared_inside(&self, id: NodeId, uri: &str) -> bool {
        std::iter::once(id)
            .chain(self.tree.ancestor_ids(NodeRef::Node(id)))
            .filter_map(|id| self.tree.element(id).ok())
            .map(|element| element.namespaces())
            .any(|scope| {
                scope.default.as_deref() == Some(uri) || scope.prefixes.values().any(|bound| bound == uri)
            })
    }
}

static EMPTY_SCOPE: NamespaceDeclarations = NamespaceDeclarations {
    prefixes: BTreeMap::new(),
    default: None,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy::DeepCopy;
    use crate::node::ElementData;

    #[test]
    fn test_empty_content_is_rejected() {
        let tree = Tree::new(
            Content::new(),
            NodeBody::Fragment(NamespaceDeclarations::default()),
        );
        assert_eq!(
            DocumentFragment::from_tree(tree).unwrap_err(),
            DocumentError::EmptyFragment
        );
    }

    #[test]
    fn test_external_namespaces_use_captured_prefix() {
        let mut content = Content::new();
        content.insert_text(0, "\0\0\0x\0").unwrap();
        let mut scope = NamespaceDeclarations::default();
        scope.prefixes.insert("a".into(), "urn:a".into());
        let mut tree = Tree::new(content, NodeBody::Fragment(scope));
        tree.associate(tree.root(), ContentRange::new(0, 4)).unwrap();

        let outer = tree.alloc(NodeBody::Element(ElementData::new(QualifiedName::namespaced(
            "urn:a", "outer",
        ))));
        tree.associate(outer, ContentRange::new(0, 4)).unwrap();
        tree.add_child(tree.root(), outer).unwrap();

        let mut inner_data = ElementData::new(QualifiedName::namespaced("urn:b", "inner"));
        inner_data.namespaces_mut().default = Some("urn:b".into());
        let inner = tree.alloc(NodeBody::Element(inner_data));
        tree.associate(inner, ContentRange::new(1, 2)).unwrap();
        tree.add_child(outer, inner).unwrap();

        let fragment = DeepCopy::node(&tree, outer).unwrap();
        let external = fragment.external_namespaces().unwrap();
        assert_eq!(external.len(), 1);
        assert_eq!(external.get("urn:a"), Some(&Some("a".to_string())));
        assert_eq!(fragment.text(), "x");
        assert_eq!(fragment.node_names().unwrap(), vec![QualifiedName::namespaced("urn:a", "outer")]);
    }
}
