//! # scene-codec
//!
//! Identity-preserving, versioned JSON serialization for polymorphic
//! scene-object graphs.
//!
//! An arbitrary graph of [`SceneObject`]s — shared references and cycles
//! included — exports to a tree-shaped, human-readable document and back.
//! Aliased objects collapse to back-references instead of being duplicated,
//! every node carries its class's schema-version vector so field layouts
//! can evolve, and fields equal to their declared defaults are omitted from
//! the document entirely.
//!
//! ## Core Types
//!
//! - [`SceneObject`] / [`ObjectRef`] — the read/write capability contract
//!   and the shared handle objects travel behind
//! - [`ClassRegistry`] — type name to factory, plus declared schema lineages
//! - [`Exporter`] / [`OutputCapsule`] — graph writer and its per-object
//!   field handle
//! - [`Importer`] / [`InputCapsule`] — graph reader and its per-object
//!   field handle
//! - [`DataBuffer`] — fixed-capacity cursor buffer for bulk numeric fields
//! - [`Format`] / [`encode`] / [`decode`] — byte-level document encoding
//!
//! ## Example
//!
//! ```ignore
//! let mut registry = ClassRegistry::new();
//! registry.register("demo.Box", 1, || object_ref(BoxShape::default()));
//!
//! let root = object_ref(BoxShape { width: 2.0, ..Default::default() });
//! let document = Exporter::new(&registry).export(&root)?;
//! let restored = Importer::new(&registry).import(document)?;
//! ```
//!
//! See `DESIGN.md` for architecture decisions.

mod buffer;
mod document;
mod error;
mod export;
mod format;
mod import;
mod input_capsule;
mod object;
mod output_capsule;
mod registry;

pub use buffer::DataBuffer;
pub use document::Scalar;
pub use error::{LoadError, SaveError};
pub use export::Exporter;
pub use format::{decode, encode, Format, FORMAT_VERSION, SIGNATURE};
pub use import::Importer;
pub use input_capsule::InputCapsule;
pub use object::{downcast_mut, downcast_ref, object_ref, ObjectRef, SceneObject};
pub use output_capsule::OutputCapsule;
pub use registry::ClassRegistry;

// The bit-set field type is part of the public capsule API.
pub use fixedbitset::FixedBitSet;
