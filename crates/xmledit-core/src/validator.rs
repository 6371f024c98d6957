//! The validation seam.
//!
//! The engine never interprets a schema itself. Before every structural edit it asks the
//! document's [`Validator`] whether the resulting child sequence of the affected element is
//! still acceptable. A document without a validator accepts every well-formed edit.

use std::collections::BTreeSet;
use std::sync::LazyLock;
use xmledit_names::QualifiedName;

/// Pseudo-name standing for character data in validation sequences.
pub static PCDATA: LazyLock<QualifiedName> = LazyLock::new(|| QualifiedName::new("#PCDATA"));

/// Declared type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeType {
    /// Free character data.
    Cdata,
    /// A document-unique identifier.
    Id,
    /// A reference to an identifier.
    IdRef,
    /// A name token.
    NmToken,
    /// One of a fixed set of values.
    Enumeration(Vec<String>),
}

/// Declaration of an attribute an element may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    /// Attribute name.
    pub name: QualifiedName,
    /// Declared type.
    pub attribute_type: AttributeType,
    /// Value assumed when the attribute is absent.
    pub default_value: Option<String>,
    /// Whether the attribute must be present.
    pub required: bool,
}

impl AttributeDefinition {
    /// A CDATA attribute with no default.
    pub fn cdata(name: QualifiedName) -> Self {
        Self {
            name,
            attribute_type: AttributeType::Cdata,
            default_value: None,
            required: false,
        }
    }

    /// Returns `true` if `value` satisfies the declared type.
    pub fn accepts(&self, value: &str) -> bool {
        match &self.attribute_type {
            AttributeType::Enumeration(values) => values.iter().any(|allowed| allowed == value),
            AttributeType::Cdata | AttributeType::Id | AttributeType::IdRef | AttributeType::NmToken => {
                true
            }
        }
    }
}

/// Content-model oracle consulted before structural edits.
///
/// Sequences contain element names and [`PCDATA`]; comments and processing instructions never
/// appear in them. `partial` asks whether the sequence is acceptable so far, i.e. could still
/// become valid by adding more children.
pub trait Validator {
    /// Is `sequence` an acceptable child sequence of `element`?
    fn is_valid_full_sequence(
        &self,
        element: &QualifiedName,
        sequence: &[QualifiedName],
        partial: bool,
    ) -> bool;

    /// Is `prefix ++ to_insert ++ suffix` an acceptable child sequence of `element`?
    fn is_valid_sequence(
        &self,
        element: &QualifiedName,
        prefix: &[QualifiedName],
        to_insert: &[QualifiedName],
        suffix: &[QualifiedName],
        partial: bool,
    ) -> bool {
        let sequence: Vec<QualifiedName> = prefix
            .iter()
            .chain(to_insert)
            .chain(suffix)
            .cloned()
            .collect();
        self.is_valid_full_sequence(element, &sequence, partial)
    }

    /// Names that may appear somewhere in the content of `element`.
    fn valid_items(&self, element: &QualifiedName) -> BTreeSet<QualifiedName>;

    /// Attributes `element` may carry.
    fn attribute_definitions(&self, element: &QualifiedName) -> Vec<AttributeDefinition>;

    /// Whether processing instructions may appear directly inside `element`.
    fn allows_processing_instructions(&self, _element: &QualifiedName) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OnlyParagraphs;

    impl Validator for OnlyParagraphs {
        fn is_valid_full_sequence(
            &self,
            _element: &QualifiedName,
            sequence: &[QualifiedName],
            _partial: bool,
        ) -> bool {
            sequence.iter().all(|name| name.local_name() == "p")
        }

        fn valid_items(&self, _element: &QualifiedName) -> BTreeSet<QualifiedName> {
            BTreeSet::from([QualifiedName::new("p")])
        }

        fn attribute_definitions(&self, _element: &QualifiedName) -> Vec<AttributeDefinition> {
            Vec::new()
        }
    }

    #[test]
    fn test_default_sequence_concatenates() {
        let validator = OnlyParagraphs;
        let p = QualifiedName::new("p");
        let root = QualifiedName::new("root");
        assert!(validator.is_valid_sequence(&root, &[p.clone()], &[p.clone()], &[p.clone()], true));
        assert!(!validator.is_valid_sequence(&root, &[p.clone()], &[PCDATA.clone()], &[], true));
        assert!(validator.allows_processing_instructions(&root));
    }

    #[test]
    fn test_enumerated_attribute_definition() {
        let definition = AttributeDefinition {
            name: QualifiedName::new("align"),
            attribute_type: AttributeType::Enumeration(vec!["left".into(), "right".into()]),
            default_value: Some("left".into()),
            required: false,
        };
        assert!(definition.accepts("right"));
        assert!(!definition.accepts("center"));
        assert!(AttributeDefinition::cdata(QualifiedName::new("x")).accepts("anything"));
    }
}
