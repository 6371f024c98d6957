#![warn(missing_docs)]
//! `xmledit-names` - qualified names and XML name rules shared by `xmledit-core` and its hosts.
//!
//! This crate stays small on purpose: it knows nothing about documents or content buffers.
//! It provides the [`QualifiedName`] value type used for elements, attributes and validator
//! sequences, the well-known namespace URIs, and syntactic checks for NCNames and
//! processing-instruction targets.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// The namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// The namespace of `xmlns` declarations themselves.
pub const XMLNS_NAMESPACE_URI: &str = "http://www.w3.org/2000/xmlns/";

/// The XInclude namespace (`xi:include`).
pub const XINCLUDE_NAMESPACE_URI: &str = "http://www.w3.org/2001/XInclude";

/// The reserved `xml` prefix.
pub const XML_PREFIX: &str = "xml";

static NCNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}_][\p{L}\p{N}\p{M}_.\-\x{B7}]*$").expect("valid NCName regex")
});

/// A namespace-qualified name: an optional namespace URI plus a local name.
///
/// Ordering is canonical (namespace first, then local name), so maps keyed by
/// `QualifiedName` iterate in a stable order. The display form is Clark notation,
/// `{uri}local`, or just `local` when there is no namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName {
    qualifier: Option<String>,
    local_name: String,
}

impl QualifiedName {
    /// Create a name without a namespace.
    pub fn new(local_name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            local_name: local_name.into(),
        }
    }

    /// Create a name in the given namespace.
    ///
    /// An empty URI is treated as "no namespace".
    pub fn namespaced(uri: impl Into<String>, local_name: impl Into<String>) -> Self {
        let uri = uri.into();
        Self {
            qualifier: if uri.is_empty() { None } else { Some(uri) },
            local_name: local_name.into(),
        }
    }

    /// Namespace URI, if any.
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Local part of the name.
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Returns `true` if the local part is a syntactically valid NCName.
    pub fn is_valid(&self) -> bool {
        is_valid_ncname(&self.local_name)
    }

    /// `xi:include`, the element name XInclude references are validated under.
    pub fn xinclude() -> Self {
        Self::namespaced(XINCLUDE_NAMESPACE_URI, "include")
    }

    /// `xml:base`.
    pub fn xml_base() -> Self {
        Self::namespaced(XML_NAMESPACE_URI, "base")
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(uri) => write!(f, "{{{}}}{}", uri, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// Error returned when parsing a [`QualifiedName`] from Clark notation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNameError(String);

impl fmt::Display for ParseNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid qualified name: {}", self.0)
    }
}

impl std::error::Error for ParseNameError {}

impl FromStr for QualifiedName {
    type Err = ParseNameError;

    /// Parse `local` or `{uri}local`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = match s.strip_prefix('{') {
            Some(rest) => {
                let (uri, local) = rest
                    .split_once('}')
                    .ok_or_else(|| ParseNameError(s.to_string()))?;
                Self::namespaced(uri, local)
            }
            None => Self::new(s),
        };

        if name.is_valid() {
            Ok(name)
        } else {
            Err(ParseNameError(s.to_string()))
        }
    }
}

/// Returns `true` if `name` is a valid non-colonized XML name.
pub fn is_valid_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// Why a processing-instruction target was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetViolation {
    /// The target is empty.
    Empty,
    /// The target starts with `xml` (any case), which is reserved.
    ReservedPrefix,
    /// The target contains whitespace.
    Whitespace,
    /// The target contains the `?>` terminator.
    Terminator,
}

impl fmt::Display for TargetViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetViolation::Empty => write!(f, "target is empty"),
            TargetViolation::ReservedPrefix => write!(f, "target must not start with 'xml'"),
            TargetViolation::Whitespace => write!(f, "target must not contain whitespace"),
            TargetViolation::Terminator => write!(f, "target must not contain '?>'"),
        }
    }
}

/// Check a processing-instruction target.
pub fn check_processing_instruction_target(target: &str) -> Result<(), TargetViolation> {
    if target.is_empty() {
        return Err(TargetViolation::Empty);
    }
    if target
        .get(..3)
        .is_some_and(|head| head.eq_ignore_ascii_case(XML_PREFIX))
    {
        return Err(TargetViolation::ReservedPrefix);
    }
    if target.chars().any(char::is_whitespace) {
        return Err(TargetViolation::Whitespace);
    }
    if target.contains("?>") {
        return Err(TargetViolation::Terminator);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse_clark_notation() {
        let name = QualifiedName::namespaced("http://example.com/ns", "para");
        assert_eq!(name.to_string(), "{http://example.com/ns}para");
        assert_eq!("{http://example.com/ns}para".parse::<QualifiedName>(), Ok(name));
        assert_eq!("para".parse::<QualifiedName>(), Ok(QualifiedName::new("para")));
        assert!("{unterminated".parse::<QualifiedName>().is_err());
        assert!("1abc".parse::<QualifiedName>().is_err());
    }

    #[test]
    fn test_empty_uri_means_no_namespace() {
        let name = QualifiedName::namespaced("", "a");
        assert_eq!(name.qualifier(), None);
        assert_eq!(name, QualifiedName::new("a"));
    }

    #[test]
    fn test_canonical_ordering() {
        let mut names = vec![
            QualifiedName::namespaced("urn:b", "a"),
            QualifiedName::new("z"),
            QualifiedName::namespaced("urn:a", "b"),
        ];
        names.sort();
        assert_eq!(names[0], QualifiedName::new("z"));
        assert_eq!(names[1].qualifier(), Some("urn:a"));
    }

    #[test]
    fn test_ncname() {
        assert!(is_valid_ncname("para"));
        assert!(is_valid_ncname("_x.y-z1"));
        assert!(is_valid_ncname("été"));
        assert!(!is_valid_ncname(""));
        assert!(!is_valid_ncname("a:b"));
        assert!(!is_valid_ncname("-a"));
        assert!(!is_valid_ncname("a b"));
    }

    #[test]
    fn test_processing_instruction_target() {
        assert_eq!(check_processing_instruction_target("php"), Ok(()));
        assert_eq!(
            check_processing_instruction_target("XmL-stylesheet"),
            Err(TargetViolation::ReservedPrefix)
        );
        assert_eq!(
            check_processing_instruction_target("a b"),
            Err(TargetViolation::Whitespace)
        );
        assert_eq!(
            check_processing_instruction_target("a?>"),
            Err(TargetViolation::Terminator)
        );
        assert_eq!(
            check_processing_instruction_target(""),
            Err(TargetViolation::Empty)
        );
        assert_eq!(check_processing_instruction_target("xm"), Ok(()));
    }
}
