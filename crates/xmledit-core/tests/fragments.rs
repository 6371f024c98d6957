use pretty_assertions::assert_eq;
use xmledit_core::{
    ContentRange, DeepCopy, Document, DocumentError, NodeId, NodeKind, PCDATA, QualifiedName,
    ValidationError, shallow_copy,
};

/// `<root>ab<x a="1">cd<z/></x>ef</root>`: root [1, 12], x [4, 9], z [7, 8].
fn sample() -> (Document, NodeId, NodeId) {
    let mut document = Document::new(QualifiedName::new("root")).unwrap();
    document.insert_text(2, "ab").unwrap();
    let x = document.insert_element(4, QualifiedName::new("x")).unwrap();
    document.insert_text(5, "cd").unwrap();
    let z = document.insert_element(7, QualifiedName::new("z")).unwrap();
    document.insert_text(10, "ef").unwrap();
    document
        .set_attribute(x, QualifiedName::new("a"), "1")
        .unwrap();
    (document, x, z)
}

#[test]
fn test_sample_layout() {
    let (document, x, z) = sample();
    let tree = document.tree();
    assert_eq!(tree.range(document.root_element()).unwrap(), ContentRange::new(1, 12));
    assert_eq!(tree.range(x).unwrap(), ContentRange::new(4, 9));
    assert_eq!(tree.range(z).unwrap(), ContentRange::new(7, 8));
}

#[test]
fn test_fragment_round_trip_shifts_ranges() {
    let (mut document, x, z) = sample();
    let original_x = document.tree().range(x).unwrap();
    let original_z = document.tree().range(z).unwrap();

    let fragment = document.fragment(original_x).unwrap();
    assert_eq!(fragment.len(), original_x.length());
    assert_eq!(fragment.text(), "cd");

    let destination = document.tree().range(document.root_element()).unwrap().end;
    let inserted = document.insert_fragment(destination, &fragment).unwrap();
    assert_eq!(inserted.len(), 1);

    let tree = document.tree();
    let copy = inserted[0];
    let delta = destination - original_x.start;
    assert_eq!(tree.kind(copy).unwrap(), NodeKind::Element);
    assert_eq!(tree.range(copy).unwrap(), original_x.move_by(delta as isize).unwrap());

    let copied_children = tree.stored_children(copy).unwrap();
    assert_eq!(copied_children.len(), 1);
    assert_eq!(tree.kind(copied_children[0]).unwrap(), NodeKind::Element);
    assert_eq!(
        tree.range(copied_children[0]).unwrap(),
        original_z.move_by(delta as isize).unwrap()
    );

    assert_eq!(
        tree.element(copy).unwrap().attribute(&QualifiedName::new("a")),
        Some("1")
    );
    assert_eq!(tree.text(document.root_element()).unwrap(), "abcdefcd");
    assert_eq!(tree.stored_children(document.root_element()).unwrap(), &[x, copy]);
}

#[test]
fn test_copy_survives_deleting_the_original() {
    let (mut document, x, _) = sample();
    let root = document.root_element();
    document.declare_namespace(root, "p", "urn:p").unwrap();

    let copy = DeepCopy::node(document.tree(), x).unwrap();
    let range = document.tree().range(x).unwrap();
    document.delete(range).unwrap();

    let tree = copy.tree();
    let copied = copy.roots()[0];
    assert_eq!(tree.text(copied).unwrap(), "cd");
    assert_eq!(
        tree.element(copied).unwrap().attribute(&QualifiedName::new("a")),
        Some("1")
    );
    assert_eq!(tree.namespace_prefix(copied, "urn:p"), Some("p"));
    assert!(tree.namespace_prefixes(copied).contains("p"));
    assert_eq!(document.tree().text(root).unwrap(), "abef");
}

#[test]
fn test_text_only_fragment() {
    let (mut document, x, _) = sample();
    let fragment = document.fragment(ContentRange::new(2, 3)).unwrap();
    assert!(fragment.roots().is_empty());
    assert_eq!(fragment.node_names().unwrap(), vec![PCDATA.clone()]);

    let x_end = document.tree().range(x).unwrap().end;
    let inserted = document.insert_fragment(x_end, &fragment).unwrap();
    assert!(inserted.is_empty());
    assert_eq!(document.tree().text(x).unwrap(), "cdab");
}

#[test]
fn test_mixed_fragment_keeps_order() {
    let (document, x, _) = sample();
    let fragment = document.fragment(ContentRange::new(3, 11)).unwrap();
    let kinds: Vec<NodeKind> = fragment.children().iter().map(|node| node.kind()).collect();
    assert_eq!(kinds, vec![NodeKind::Text, NodeKind::Element, NodeKind::Text]);
    assert_eq!(fragment.text(), "bcdef");
    assert_eq!(
        fragment.node_names().unwrap(),
        vec![
            PCDATA.clone(),
            document.tree().element(x).unwrap().name().clone(),
            PCDATA.clone()
        ]
    );
}

#[test]
fn test_unbalanced_fragment_is_rejected() {
    let (document, _, _) = sample();
    assert!(matches!(
        document.fragment(ContentRange::new(3, 5)),
        Err(DocumentError::Validation(_))
    ));
}

#[test]
fn test_documents_and_fragments_are_not_copyable() {
    let (document, x, _) = sample();
    let tree = document.tree();
    assert_eq!(
        shallow_copy(tree, document.document_node()),
        Err(DocumentError::NotCopyable("document"))
    );
    assert!(matches!(
        DeepCopy::node(tree, document.document_node()),
        Err(DocumentError::NotCopyable("document"))
    ));

    let fragment = DeepCopy::node(tree, x).unwrap();
    assert_eq!(
        shallow_copy(fragment.tree(), fragment.tree().root()),
        Err(DocumentError::NotCopyable("document fragment"))
    );
}

#[test]
fn test_fragment_cannot_land_outside_root() {
    let (mut document, x, _) = sample();
    let fragment = DeepCopy::node(document.tree(), x).unwrap();
    let length = document.len();
    let error = document.insert_fragment(1, &fragment).unwrap_err();
    assert!(error.is_validation());
    assert!(!document.can_insert_fragment(1, &fragment));
    assert_eq!(document.len(), length);
}

#[test]
fn test_fragment_cannot_cut_through_a_node() {
    let (document, x, z) = sample();
    for range in [
        ContentRange::new(9, 10),
        ContentRange::new(4, 4),
        ContentRange::new(2, 4),
    ] {
        assert_eq!(
            document.fragment(range).unwrap_err(),
            DocumentError::Validation(ValidationError::UnbalancedRange(range)),
            "{range}"
        );
    }
    assert!(matches!(
        DeepCopy::range(document.tree(), x, ContentRange::new(6, 7)),
        Err(DocumentError::Validation(ValidationError::UnbalancedRange(_)))
    ));
    assert!(DeepCopy::range(document.tree(), x, document.tree().range(z).unwrap()).is_ok());
}
