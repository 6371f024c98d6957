#![warn(missing_docs)]
//! XML Edit Core - Headless Structured Document Editing Engine
//!
//! # Overview
//!
//! `xmledit-core` keeps a well-formed XML-like document as two coupled representations: one
//! linear character buffer holding the text plus zero-width tag markers, and a tree of
//! structural nodes bound to ranges of that buffer. Edits go through document-level
//! operations that validate first and then change both representations together.
//! Parsing, serialization, styling and layout are left to the host.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Document (L1 edits, validation, events)    │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  DeepCopy / DocumentFragment                │  ← Copy & paste
//! ├─────────────────────────────────────────────┤
//! │  Axis (lazy node sequences)                 │  ← Queries
//! ├─────────────────────────────────────────────┤
//! │  Tree (node arena, synthesized text)        │  ← Structure
//! ├─────────────────────────────────────────────┤
//! │  Content (gap buffer) + Position            │  ← Storage
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Offsets
//!
//! All ranges are inclusive: `[start, end]` covers `end - start + 1` cells. A node's range
//! includes its own two boundary markers, so an empty element occupies two cells.
//!
//! # Quick Start
//!
//! ```rust
//! use xmledit_core::{ContentRange, Document, QualifiedName};
//!
//! let mut document = Document::new(QualifiedName::new("root")).unwrap();
//! let root = document.root_element();
//!
//! // An empty root element spans [1, 2]; inserting at its end offset inserts inside it.
//! let para = document.insert_element(2, QualifiedName::new("para")).unwrap();
//! let end = document.tree().range(para).unwrap().end;
//! document.insert_text(end, "Hello").unwrap();
//!
//! assert_eq!(document.tree().text(root).unwrap(), "Hello");
//! assert_eq!(document.children(root).unwrap().count(), 1);
//!
//! // Deleting the element's whole range removes it together with its markers.
//! let range = document.tree().range(para).unwrap();
//! document.delete(range).unwrap();
//! assert_eq!(document.tree().range(root).unwrap(), ContentRange::new(1, 2));
//! ```
//!
//! # Module Description
//!
//! - [`content`] - gap buffer with tag markers and live positions
//! - [`tree`] - node arena, child materialization and namespace scoping
//! - [`axis`] - lazy, chainable node sequences
//! - [`document`] - the document and its validated edit operations
//! - [`copy`] / [`fragment`] - subtree copies and detached fragments
//! - [`validator`] / [`events`] - the seams to schema validators and change observers

pub mod axis;
pub mod config;
pub mod content;
pub mod copy;
pub mod document;
pub mod error;
pub mod events;
pub mod fragment;
pub mod node;
mod position;
pub mod range;
pub mod tree;
pub mod validator;

pub use axis::{Axis, NodeView};
pub use config::{ContentConfig, DocumentConfig};
pub use content::{Content, TAG_MARKER};
pub use copy::{DeepCopy, shallow_copy};
pub use document::Document;
pub use error::{DocumentError, ValidationError};
pub use events::{
    AttributeChangeEvent, ContentChangeEvent, DocumentListener, ListenerId, NamespaceChangeEvent,
};
pub use fragment::DocumentFragment;
pub use node::{
    ElementData, IncludeData, IncludeParse, NamespaceDeclarations, NodeBody, NodeId, NodeKind,
    NodeRef,
};
pub use position::Position;
pub use range::ContentRange;
pub use tree::{ChildNodes, Tree};
pub use validator::{AttributeDefinition, AttributeType, PCDATA, Validator};
pub use xmledit_names::{QualifiedName, XML_NAMESPACE_URI};
