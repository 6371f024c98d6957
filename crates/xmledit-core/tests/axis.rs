use pretty_assertions::assert_eq;
use xmledit_core::{ContentRange, Document, DocumentError, NodeId, NodeKind, QualifiedName};

/// `<root>ab<x>c</x>d<!--note-->e</root>`, root [1, 15], x [4, 6], comment [8, 13].
fn sample() -> (Document, NodeId, NodeId) {
    let mut document = Document::new(QualifiedName::new("root")).unwrap();
    document.insert_text(2, "ab").unwrap();
    let x = document.insert_element(4, QualifiedName::new("x")).unwrap();
    document.insert_text(5, "c").unwrap();
    document.insert_text(7, "d").unwrap();
    let comment = document.insert_comment(8).unwrap();
    document.insert_text(9, "note").unwrap();
    document.insert_text(14, "e").unwrap();
    (document, x, comment)
}

fn kinds(axis: &xmledit_core::Axis<'_>) -> Vec<NodeKind> {
    axis.iter().map(|node| node.kind()).collect()
}

#[test]
fn test_text_exclusion_and_predicates() {
    let (document, x, comment) = sample();
    let root = document.root_element();

    assert_eq!(document.children(root).unwrap().count(), 5);

    let stored = document.children(root).unwrap().without_text();
    assert_eq!(stored.count(), 2);
    assert_eq!(stored.first().unwrap().id(), Some(x));
    assert_eq!(stored.last().unwrap().id(), Some(comment));

    let elements = document.children(root).unwrap().elements();
    assert_eq!(elements.count(), 1);
    assert_eq!(
        elements.first().unwrap().name(),
        Some(&QualifiedName::new("x"))
    );

    let short_text = document
        .children(root)
        .unwrap()
        .matching(|node| node.is_text())
        .matching(|node| node.text().is_ok_and(|text| text.len() == 1));
    assert_eq!(short_text.count(), 2);
}

#[test]
fn test_index_window_is_inclusive() {
    let (document, x, _) = sample();
    let root = document.root_element();
    let window = document
        .children(root)
        .unwrap()
        .from_index(1)
        .unwrap()
        .to_index(2)
        .unwrap();
    assert_eq!(kinds(&window), vec![NodeKind::Element, NodeKind::Text]);
    assert_eq!(window.get(0).unwrap().id(), Some(x));
    assert_eq!(window.get(1).unwrap().text().unwrap(), "d");
}

#[test]
fn test_index_window_applies_after_filters() {
    let (document, _, comment) = sample();
    let root = document.root_element();
    let second_stored = document
        .children(root)
        .unwrap()
        .without_text()
        .from_index(1)
        .unwrap();
    assert_eq!(second_stored.count(), 1);
    assert_eq!(second_stored.first().unwrap().id(), Some(comment));
}

fn single_letters(axis: xmledit_core::Axis<'_>) -> xmledit_core::Axis<'_> {
    axis.matching(|node| node.is_text())
        .matching(|node| node.text().is_ok_and(|text| text.len() == 1))
}

#[test]
fn test_index_window_counts_matching_nodes() {
    let (document, _, _) = sample();
    let root = document.root_element();
    // Children are "ab", x, "d", the comment and "e"; the window indexes "d" and "e".
    let second = single_letters(document.children(root).unwrap())
        .from_index(1)
        .unwrap();
    assert_eq!(second.count(), 1);
    assert_eq!(second.first().unwrap().text().unwrap(), "e");

    // Setting the window before the predicates changes nothing.
    let windowed_first = single_letters(
        document
            .children(root)
            .unwrap()
            .to_index(0)
            .unwrap(),
    );
    assert_eq!(windowed_first.count(), 1);
    assert_eq!(windowed_first.first().unwrap().text().unwrap(), "d");
}

#[test]
fn test_range_restrictions() {
    let (document, x, comment) = sample();
    let root = document.root_element();

    let before = document.children(root).unwrap().before(8).unwrap();
    assert_eq!(
        kinds(&before),
        vec![NodeKind::Text, NodeKind::Element, NodeKind::Text]
    );

    let after = document.children(root).unwrap().after(7).unwrap();
    assert_eq!(after.first().unwrap().id(), Some(comment));
    assert_eq!(after.last().unwrap().text().unwrap(), "e");

    let inside = document
        .children(root)
        .unwrap()
        .in_range(ContentRange::new(3, 7))
        .unwrap();
    assert_eq!(inside.count(), 3);
    assert_eq!(inside.first().unwrap().text().unwrap(), "b");
    assert_eq!(inside.get(1).unwrap().id(), Some(x));

    assert!(document.children(root).unwrap().before(0).unwrap().is_empty());
}

#[test]
fn test_restrictions_can_only_be_set_once() {
    let (document, _, _) = sample();
    let root = document.root_element();

    let error = document
        .children(root)
        .unwrap()
        .before(5)
        .unwrap()
        .after(2)
        .unwrap_err();
    assert!(matches!(error, DocumentError::AxisAlreadyRestricted(_)));

    let error = document
        .children(root)
        .unwrap()
        .from_index(0)
        .unwrap()
        .from_index(1)
        .unwrap_err();
    assert!(matches!(error, DocumentError::AxisAlreadyRestricted("from")));

    let error = document
        .children(root)
        .unwrap()
        .to_index(0)
        .unwrap()
        .to_index(1)
        .unwrap_err();
    assert!(matches!(error, DocumentError::AxisAlreadyRestricted("to")));
}

#[test]
fn test_terminal_errors() {
    let (document, x, _) = sample();
    let root = document.root_element();

    let empty = document.children(x).unwrap().without_text();
    assert!(empty.is_empty());
    assert_eq!(empty.first().unwrap_err(), DocumentError::EmptyAxis);
    assert_eq!(empty.last().unwrap_err(), DocumentError::EmptyAxis);

    assert_eq!(
        document.children(root).unwrap().get(5).unwrap_err(),
        DocumentError::IndexOutOfBounds { index: 5, len: 5 }
    );
}

#[test]
fn test_ancestors_and_visitor() {
    let (document, x, _) = sample();
    let root = document.root_element();
    let inner_text = document.children(x).unwrap().first().unwrap().node();

    let ancestors = document.tree().ancestors(inner_text).unwrap();
    let ids: Vec<Option<NodeId>> = ancestors.iter().map(|node| node.id()).collect();
    assert_eq!(
        ids,
        vec![Some(x), Some(root), Some(document.document_node())]
    );

    let mut seen = Vec::new();
    document
        .tree()
        .ancestors(x)
        .unwrap()
        .elements()
        .accept(|node| seen.push(node.name().cloned()));
    assert_eq!(seen, vec![Some(QualifiedName::new("root"))]);
}
