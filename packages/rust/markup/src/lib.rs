//! Order-preserving XML tree for track files.
//!
//! This crate provides:
//! - [`tree`]: arena-backed [`Document`] with [`NodeId`] handles
//! - [`parse`]: XML text → [`Document`] (via `quick-xml`)
//! - [`serialize`]: [`Document`] → XML text, restoring the declaration

pub mod parser;
pub mod serializer;
pub mod tree;

pub use parser::parse;
pub use serializer::{DEFAULT_DECLARATION, ensure_declaration, serialize};
pub use tree::{Document, Element, Field, FieldKind, MarkupNode, NodeId};
