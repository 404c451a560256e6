//! Graph reader.
//!
//! [`Importer`] validates the document's format metadata once, then walks
//! the tree depth-first, mirroring the writer: a full object node is
//! instantiated through the class registry and registered under its
//! instance id *before* its fields are populated, so back-references —
//! including cyclic ones — always find a live object. A reference node that
//! names an unregistered id fails the whole import; the writer can never
//! emit a forward reference, so an unknown id means corruption.
//!
//! An importer is good for exactly one import; the entry points consume it.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::{Map, Value};

use crate::document as doc;
use crate::error::LoadError;
use crate::format::{self, Format, FORMAT_VERSION, SIGNATURE};
use crate::input_capsule::InputCapsule;
use crate::object::ObjectRef;
use crate::registry::ClassRegistry;

/// One-shot reader for a single document.
pub struct Importer<'r> {
    registry: &'r ClassRegistry,
    /// Instance id of every reconstructed object, mapped to its handle.
    references: HashMap<String, ObjectRef>,
    format_version: u32,
}

impl<'r> Importer<'r> {
    pub fn new(registry: &'r ClassRegistry) -> Self {
        Self {
            registry,
            references: HashMap::new(),
            format_version: 0,
        }
    }

    /// Format version of the document being imported, available to objects
    /// through their capsule while their fields are read.
    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub(crate) fn registry(&self) -> &ClassRegistry {
        self.registry
    }

    /// Import a complete document tree and return its root object.
    pub fn import(mut self, document: Value) -> Result<ObjectRef, LoadError> {
        let top = document
            .as_object()
            .ok_or(LoadError::Corrupt { node: "document" })?;

        let metadata =
            doc::get_object(top, doc::META_KEY).ok_or(LoadError::Corrupt { node: doc::META_KEY })?;
        match doc::get_u64(metadata, doc::SIGNATURE_KEY) {
            Some(signature) if signature == u64::from(SIGNATURE) => {
                let version = doc::get_u64(metadata, doc::FORMAT_VERSION_KEY).ok_or(
                    LoadError::Corrupt {
                        node: doc::FORMAT_VERSION_KEY,
                    },
                )?;
                if version > u64::from(FORMAT_VERSION) {
                    return Err(LoadError::FutureVersion {
                        found: version,
                        supported: FORMAT_VERSION,
                    });
                }
                self.format_version = version as u32;
            }
            _ => {
                // Documents that predate the signature are read as the
                // oldest format.
                log::warn!("document carries no recognizable signature, assuming format version 0");
                self.format_version = 0;
            }
        }

        let root =
            doc::get_object(top, doc::ROOT_KEY).ok_or(LoadError::Corrupt { node: doc::ROOT_KEY })?;
        let object = self.resolve(root)?;
        log::debug!(
            "imported {} object(s) at format version {}",
            self.references.len(),
            self.format_version
        );
        Ok(object)
    }

    /// Import pretty-printed JSON from a reader.
    pub fn load_from_reader<R: Read>(self, reader: &mut R) -> Result<ObjectRef, LoadError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let document = format::decode::<Value>(&bytes, Format::Json)?;
        self.import(document)
    }

    /// Import a document from a file.
    pub fn load_from_path<P: AsRef<Path>>(self, path: P) -> Result<ObjectRef, LoadError> {
        let mut file = File::open(path)?;
        self.load_from_reader(&mut file)
    }

    /// Reconstruct the object a node stands for: a previously registered
    /// object for a reference node, a fresh one otherwise.
    pub(crate) fn resolve(&mut self, node: &Map<String, Value>) -> Result<ObjectRef, LoadError> {
        if let Some(id) = doc::get_str(node, doc::REFERENCE_KEY) {
            return self
                .references
                .get(id)
                .cloned()
                .ok_or_else(|| LoadError::UnresolvedReference { id: id.to_owned() });
        }

        let class_name = doc::get_str(node, doc::CLASS_KEY).ok_or(LoadError::MissingClass)?;
        let object = self.registry.instantiate(class_name)?;

        let versions = match doc::get_array(node, doc::VERSIONS_KEY) {
            None => None,
            Some(items) => {
                let mut parsed = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let version = item.as_u64().ok_or_else(|| LoadError::InvalidElement {
                        field: doc::VERSIONS_KEY.to_owned(),
                        index: format!("[{index}]"),
                        expected: "version number",
                    })?;
                    parsed.push(version as u32);
                }
                Some(parsed)
            }
        };

        let id = doc::get_str(node, doc::ID_KEY).ok_or_else(|| LoadError::MissingId {
            class_name: class_name.to_owned(),
        })?;
        self.references.insert(id.to_owned(), object.clone());

        {
            let mut target = object.borrow_mut();
            let mut capsule = InputCapsule::new(node, class_name, versions, self);
            target.read(&mut capsule)?;
        }

        Ok(object)
    }
}
