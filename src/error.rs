//! Error types for graph export and import.

use std::io;

use thiserror::Error;

/// Errors that can occur while exporting an object graph.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The object's type name is not registered, so its declared schema
    /// versions cannot be queried.
    #[error("class '{class_name}' is not registered")]
    UnknownClass { class_name: String },

    /// A buffer produced a different number of elements than its limit.
    #[error("buffer field '{field}': wrote {written} element(s), limit is {limit}")]
    BufferIntegrity {
        field: String,
        written: usize,
        limit: usize,
    },

    /// Byte-level encoding of the finished document failed.
    #[error("format error: {0}")]
    Format(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Errors that can occur while importing an object graph.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A required structural node is missing from the document.
    #[error("document is corrupt, node '{node}' not located")]
    Corrupt { node: &'static str },

    /// The document was produced by a newer format revision than this
    /// reader supports.
    #[error("document format version {found} is newer than supported version {supported}")]
    FutureVersion { found: u64, supported: u32 },

    /// An object node carries no class name, so no type can be instantiated.
    #[error("object node has no class name")]
    MissingClass,

    /// An object node carries no instance id, so back-references to it
    /// could never resolve.
    #[error("object node for class '{class_name}' has no instance id")]
    MissingId { class_name: String },

    /// A field value had an unexpected kind or was out of range.
    #[error("type mismatch for field '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: String,
    },

    /// An element inside an array field could not be converted.
    #[error("field '{field}': element {index} is not a valid {expected}")]
    InvalidElement {
        field: String,
        index: String,
        expected: &'static str,
    },

    /// A reference node names an instance id that was never registered.
    #[error("unresolved reference '{id}'")]
    UnresolvedReference { id: String },

    /// The class name is not registered with the importer's registry.
    #[error("class '{class_name}' not found in the registry")]
    UnknownClass { class_name: String },

    /// Version resolution was asked about a type outside the class lineage.
    #[error("'{ancestor}' is not an ancestor of '{class_name}'")]
    UnknownAncestor {
        class_name: String,
        ancestor: String,
    },

    /// A map entry node has no key; map keys can never be null.
    #[error("map field '{field}': entry [{index}] has no key")]
    MissingMapKey { field: String, index: usize },

    /// Byte-level decoding of the document failed.
    #[error("format error: {0}")]
    Format(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
