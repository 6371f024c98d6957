use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;
use xmledit_core::{
    AttributeChangeEvent, ContentChangeEvent, ContentRange, Document, DocumentListener,
    QualifiedName,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Seen {
    BeforeInsert(ContentChangeEvent),
    Inserted(ContentChangeEvent),
    BeforeDelete(ContentChangeEvent),
    Deleted(ContentChangeEvent),
    Attribute(AttributeChangeEvent),
}

struct Recorder {
    seen: Rc<RefCell<Vec<Seen>>>,
}

impl DocumentListener for Recorder {
    fn before_content_inserted(&mut self, event: &ContentChangeEvent) {
        self.seen.borrow_mut().push(Seen::BeforeInsert(event.clone()));
    }

    fn content_inserted(&mut self, event: &ContentChangeEvent) {
        self.seen.borrow_mut().push(Seen::Inserted(event.clone()));
    }

    fn before_content_deleted(&mut self, event: &ContentChangeEvent) {
        self.seen.borrow_mut().push(Seen::BeforeDelete(event.clone()));
    }

    fn content_deleted(&mut self, event: &ContentChangeEvent) {
        self.seen.borrow_mut().push(Seen::Deleted(event.clone()));
    }

    fn attribute_changed(&mut self, event: &AttributeChangeEvent) {
        self.seen.borrow_mut().push(Seen::Attribute(event.clone()));
    }
}

fn recorded() -> (Document, Rc<RefCell<Vec<Seen>>>, xmledit_core::ListenerId) {
    let mut document = Document::new(QualifiedName::new("root")).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let id = document.add_listener(Box::new(Recorder {
        seen: Rc::clone(&seen),
    }));
    (document, seen, id)
}

#[test]
fn test_insertions_are_bracketed() {
    let (mut document, seen, _) = recorded();
    let root = document.root_element();

    let element = document.insert_element(2, QualifiedName::new("e")).unwrap();
    document.insert_text(3, "abc").unwrap();

    let structural = ContentChangeEvent {
        parent: root,
        offset: 2,
        length: 2,
        structural: true,
    };
    let text = ContentChangeEvent {
        parent: element,
        offset: 3,
        length: 3,
        structural: false,
    };
    assert_eq!(
        *seen.borrow(),
        vec![
            Seen::BeforeInsert(structural.clone()),
            Seen::Inserted(structural),
            Seen::BeforeInsert(text.clone()),
            Seen::Inserted(text),
        ]
    );
}

#[test]
fn test_deletions_report_structure() {
    let (mut document, seen, _) = recorded();
    let root = document.root_element();
    document.insert_text(2, "xy").unwrap();
    let element = document.insert_element(3, QualifiedName::new("e")).unwrap();
    seen.borrow_mut().clear();

    let range = document.tree().range(element).unwrap();
    document.delete(range).unwrap();
    document.delete(ContentRange::new(2, 2)).unwrap();

    let structural = ContentChangeEvent {
        parent: root,
        offset: 3,
        length: 2,
        structural: true,
    };
    let text = ContentChangeEvent {
        parent: root,
        offset: 2,
        length: 1,
        structural: false,
    };
    assert_eq!(
        *seen.borrow(),
        vec![
            Seen::BeforeDelete(structural.clone()),
            Seen::Deleted(structural),
            Seen::BeforeDelete(text.clone()),
            Seen::Deleted(text),
        ]
    );
}

#[test]
fn test_rejected_edits_notify_nobody() {
    let (mut document, seen, _) = recorded();
    assert!(document.insert_text(1, "outside").is_err());
    assert!(document.insert_element(0, QualifiedName::new("e")).is_err());
    assert!(seen.borrow().is_empty());
}

#[test]
fn test_attribute_changes() {
    let (mut document, seen, _) = recorded();
    let root = document.root_element();
    let name = QualifiedName::new("id");

    assert_eq!(document.set_attribute(root, name.clone(), "a").unwrap(), None);
    assert_eq!(
        document.set_attribute(root, name.clone(), "b").unwrap(),
        Some("a".to_string())
    );
    assert_eq!(document.attribute(root, &name).unwrap(), Some("b"));
    assert_eq!(
        document.remove_attribute(root, &name).unwrap(),
        Some("b".to_string())
    );
    assert_eq!(document.remove_attribute(root, &name).unwrap(), None);

    let change = |old: Option<&str>, new: Option<&str>| {
        Seen::Attribute(AttributeChangeEvent {
            element: root,
            name: name.clone(),
            old_value: old.map(str::to_string),
            new_value: new.map(str::to_string),
        })
    };
    assert_eq!(
        *seen.borrow(),
        vec![
            change(None, Some("a")),
            change(Some("a"), Some("b")),
            change(Some("b"), None),
        ]
    );
}

#[test]
fn test_removed_listener_stops_receiving() {
    let (mut document, seen, id) = recorded();
    assert!(document.remove_listener(id).is_some());
    assert!(document.remove_listener(id).is_none());

    document.insert_text(2, "quiet").unwrap();
    assert!(seen.borrow().is_empty());
}
