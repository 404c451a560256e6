//! Graph writer.
//!
//! [`Exporter`] walks an object graph depth-first and produces one document
//! node per distinct object. The identity map is keyed by pointer identity;
//! the first visit of an object emits its full node (class name, instance
//! id, schema-version vector, then fields through an [`OutputCapsule`]),
//! every later visit emits a small reference node carrying only the id.
//! Registering the id *before* the field pass is what lets cyclic graphs
//! terminate: an object that reaches itself again sees a map hit.
//!
//! An exporter is good for exactly one export; the entry points consume it.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde_json::{Map, Value};

use crate::document as doc;
use crate::error::SaveError;
use crate::format::{self, Format, FORMAT_VERSION, SIGNATURE};
use crate::object::{self, ObjectRef};
use crate::output_capsule::OutputCapsule;
use crate::registry::ClassRegistry;

/// One-shot writer for a single object graph.
pub struct Exporter<'r> {
    registry: &'r ClassRegistry,
    /// Pointer identity of every emitted object, mapped to its instance id.
    written: HashMap<usize, String>,
    /// Strong handles to everything registered in `written`, so a pointer
    /// value can never be freed and reused while this export is running.
    retained: Vec<ObjectRef>,
    next_id: u64,
}

impl<'r> Exporter<'r> {
    pub fn new(registry: &'r ClassRegistry) -> Self {
        Self {
            registry,
            written: HashMap::new(),
            retained: Vec::new(),
            next_id: 0,
        }
    }

    /// Export the graph rooted at `root` into a complete document tree.
    pub fn export(mut self, root: &ObjectRef) -> Result<Value, SaveError> {
        let mut metadata = Map::new();
        metadata.insert(doc::SIGNATURE_KEY.to_owned(), Value::from(SIGNATURE));
        metadata.insert(
            doc::FORMAT_VERSION_KEY.to_owned(),
            Value::from(FORMAT_VERSION),
        );

        let root_node = self.visit(root)?;

        let mut document = Map::new();
        document.insert(doc::META_KEY.to_owned(), Value::Object(metadata));
        document.insert(doc::ROOT_KEY.to_owned(), root_node);

        log::debug!("exported {} object(s)", self.written.len());
        Ok(Value::Object(document))
    }

    /// Export and write the document as pretty-printed JSON.
    pub fn save_to_writer<W: Write>(self, root: &ObjectRef, writer: &mut W) -> Result<(), SaveError> {
        let document = self.export(root)?;
        let bytes = format::encode(&document, Format::Json)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Export to a file, optionally creating missing parent directories.
    pub fn save_to_path<P: AsRef<Path>>(
        self,
        root: &ObjectRef,
        path: P,
        create_dirs: bool,
    ) -> Result<(), SaveError> {
        let path = path.as_ref();
        if create_dirs {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
        }
        let mut writer = BufWriter::new(File::create(path)?);
        self.save_to_writer(root, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Produce the document node for one object: a full node on first
    /// visit, a reference node afterwards.
    pub(crate) fn visit(&mut self, object: &ObjectRef) -> Result<Value, SaveError> {
        let key = object::identity(object);
        if let Some(id) = self.written.get(&key) {
            let mut reference = Map::new();
            reference.insert(doc::REFERENCE_KEY.to_owned(), Value::from(id.as_str()));
            return Ok(Value::Object(reference));
        }

        let guard = object.borrow();
        let type_name = guard.type_name();
        let versions =
            self.registry
                .declared_versions(type_name)
                .ok_or_else(|| SaveError::UnknownClass {
                    class_name: type_name.to_owned(),
                })?;

        let id = format!("{type_name}@{}", self.next_id);
        self.next_id += 1;

        let mut node = Map::new();
        node.insert(doc::CLASS_KEY.to_owned(), Value::from(type_name));
        node.insert(doc::ID_KEY.to_owned(), Value::from(id.as_str()));
        node.insert(
            doc::VERSIONS_KEY.to_owned(),
            Value::Array(versions.into_iter().map(Value::from).collect()),
        );

        self.written.insert(key, id);
        self.retained.push(object.clone());

        {
            let mut capsule = OutputCapsule::new(&mut node, self);
            guard.write(&mut capsule)?;
        }

        Ok(Value::Object(node))
    }
}
