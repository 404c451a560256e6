//! Read-side capsule.
//!
//! An [`InputCapsule`] binds one object's document node to the importer for
//! the duration of that object's field pass. Every `read_*` operation takes
//! the field name and a caller-supplied default; the default is returned
//! unchanged when the name is empty or the field is absent or null. This is
//! the schema-evolution mechanism: a field introduced in a newer class
//! version simply reads its default against an older document.
//!
//! A field that is present with the wrong kind, or an array element that
//! cannot be converted, is a hard failure — only absence is soft. String-
//! and object-valued array slots tolerate null elements; numeric and
//! boolean slots do not.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use fixedbitset::FixedBitSet;
use serde_json::{Map, Value};

use crate::buffer::DataBuffer;
use crate::document::{self as doc, Scalar};
use crate::error::LoadError;
use crate::import::Importer;
use crate::object::ObjectRef;

/// Per-object read handle. Borrowed for one field pass, never retained.
pub struct InputCapsule<'a, 'r> {
    node: &'a Map<String, Value>,
    class_name: &'a str,
    versions: Option<Vec<u32>>,
    importer: &'a mut Importer<'r>,
}

impl<'a, 'r> InputCapsule<'a, 'r> {
    pub(crate) fn new(
        node: &'a Map<String, Value>,
        class_name: &'a str,
        versions: Option<Vec<u32>>,
        importer: &'a mut Importer<'r>,
    ) -> Self {
        Self {
            node,
            class_name,
            versions,
            importer,
        }
    }

    /// Schema version of `ancestor`'s field layout in the document being
    /// read. Pre-versioning documents resolve to 0 for every ancestor.
    pub fn version_of(&self, ancestor: &str) -> Result<u32, LoadError> {
        self.importer.registry().resolved_version(
            self.class_name,
            ancestor,
            self.versions.as_deref(),
            self.importer.format_version(),
        )
    }

    /// Format version of the surrounding document.
    pub fn format_version(&self) -> u32 {
        self.importer.format_version()
    }

    fn field(&self, name: &str) -> Option<&'a Value> {
        if !doc::valid_name(name) {
            return None;
        }
        doc::get_field(self.node, name)
    }

    // -----------------------------------------------------------------------
    // Scalars and strings
    // -----------------------------------------------------------------------

    /// Read a scalar field (any integer width, float width, or bool).
    pub fn read<T: Scalar>(&self, name: &str, default: T) -> Result<T, LoadError> {
        match self.field(name) {
            None => Ok(default),
            Some(node) => T::from_node(node).ok_or_else(|| mismatch(name, T::KIND, node)),
        }
    }

    pub fn read_string(&self, name: &str, default: &str) -> Result<String, LoadError> {
        match self.field(name) {
            None => Ok(default.to_owned()),
            Some(node) => node
                .as_str()
                .map(str::to_owned)
                .ok_or_else(|| mismatch(name, "string", node)),
        }
    }

    /// Read an enum-like field from its display form.
    pub fn read_enum<T: FromStr>(&self, name: &str, default: T) -> Result<T, LoadError> {
        let Some(node) = self.field(name) else {
            return Ok(default);
        };
        let text = node
            .as_str()
            .ok_or_else(|| mismatch(name, "string", node))?;
        text.parse().map_err(|_| LoadError::TypeMismatch {
            field: name.to_owned(),
            expected: std::any::type_name::<T>(),
            found: text.to_owned(),
        })
    }

    // -----------------------------------------------------------------------
    // Arrays
    // -----------------------------------------------------------------------

    pub fn read_array<T: Scalar>(&self, name: &str, default: Vec<T>) -> Result<Vec<T>, LoadError> {
        let Some(node) = self.field(name) else {
            return Ok(default);
        };
        let items = node
            .as_array()
            .ok_or_else(|| mismatch(name, "array", node))?;
        scalar_row(items, name, |i| format!("[{i}]"))
    }

    /// Read a two-dimensional scalar array. A null outer slot yields `None`;
    /// elements inside a present row must all convert.
    pub fn read_array_2d<T: Scalar>(
        &self,
        name: &str,
        default: Vec<Option<Vec<T>>>,
    ) -> Result<Vec<Option<Vec<T>>>, LoadError> {
        let Some(node) = self.field(name) else {
            return Ok(default);
        };
        let rows = node
            .as_array()
            .ok_or_else(|| mismatch(name, "array", node))?;
        let mut out = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            out.push(match row {
                Value::Null => None,
                Value::Array(inner) => Some(scalar_row(inner, name, |j| format!("[{i}][{j}]"))?),
                _ => {
                    return Err(invalid(name, format!("[{i}]"), "array"));
                }
            });
        }
        Ok(out)
    }

    pub fn read_string_array(
        &self,
        name: &str,
        default: Vec<Option<String>>,
    ) -> Result<Vec<Option<String>>, LoadError> {
        let Some(node) = self.field(name) else {
            return Ok(default);
        };
        let items = node
            .as_array()
            .ok_or_else(|| mismatch(name, "array", node))?;
        string_row(items, name, |i| format!("[{i}]"))
    }

    pub fn read_string_array_2d(
        &self,
        name: &str,
        default: Vec<Option<Vec<Option<String>>>>,
    ) -> Result<Vec<Option<Vec<Option<String>>>>, LoadError> {
        let Some(node) = self.field(name) else {
            return Ok(default);
        };
        let rows = node
            .as_array()
            .ok_or_else(|| mismatch(name, "array", node))?;
        let mut out = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            out.push(match row {
                Value::Null => None,
                Value::Array(inner) => Some(string_row(inner, name, |j| format!("[{i}][{j}]"))?),
                _ => {
                    return Err(invalid(name, format!("[{i}]"), "array"));
                }
            });
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Bit sets and buffers
    // -----------------------------------------------------------------------

    /// Read a bit set from the array of its set-bit indices.
    pub fn read_bit_set(&self, name: &str, default: FixedBitSet) -> Result<FixedBitSet, LoadError> {
        let Some(node) = self.field(name) else {
            return Ok(default);
        };
        let items = node
            .as_array()
            .ok_or_else(|| mismatch(name, "array", node))?;
        let mut bits = FixedBitSet::new();
        for (i, item) in items.iter().enumerate() {
            let index = item
                .as_u64()
                .ok_or_else(|| invalid(name, format!("[{i}]"), "bit index"))?
                as usize;
            bits.grow(index + 1);
            bits.insert(index);
        }
        Ok(bits)
    }

    /// Read a buffer; the result has its limit at the stored length and its
    /// cursor at the start.
    pub fn read_buffer<T: Scalar>(
        &self,
        name: &str,
        default: Option<DataBuffer<T>>,
    ) -> Result<Option<DataBuffer<T>>, LoadError> {
        let Some(node) = self.field(name) else {
            return Ok(default);
        };
        let items = node
            .as_array()
            .ok_or_else(|| mismatch(name, "array", node))?;
        let values = scalar_row(items, name, |i| format!("[{i}]"))?;
        Ok(Some(DataBuffer::from_vec(values)))
    }

    pub fn read_buffer_list<T: Scalar>(
        &self,
        name: &str,
        default: Vec<Option<DataBuffer<T>>>,
    ) -> Result<Vec<Option<DataBuffer<T>>>, LoadError> {
        let Some(node) = self.field(name) else {
            return Ok(default);
        };
        let slots = node
            .as_array()
            .ok_or_else(|| mismatch(name, "array", node))?;
        let mut out = Vec::with_capacity(slots.len());
        for (i, slot) in slots.iter().enumerate() {
            out.push(match slot {
                Value::Null => None,
                Value::Array(inner) => {
                    let values = scalar_row(inner, name, |j| format!("[{i}][{j}]"))?;
                    Some(DataBuffer::from_vec(values))
                }
                _ => {
                    return Err(invalid(name, format!("[{i}]"), "array"));
                }
            });
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Nested objects
    // -----------------------------------------------------------------------

    /// Read a nested object field. Decoding is delegated to the importer,
    /// which resolves reference nodes against already-loaded objects.
    pub fn read_object(
        &mut self,
        name: &str,
        default: Option<ObjectRef>,
    ) -> Result<Option<ObjectRef>, LoadError> {
        let Some(node) = self.field(name) else {
            return Ok(default);
        };
        let map = node
            .as_object()
            .ok_or_else(|| mismatch(name, "object", node))?;
        Ok(Some(self.importer.resolve(map)?))
    }

    pub fn read_object_array(
        &mut self,
        name: &str,
        default: Vec<Option<ObjectRef>>,
    ) -> Result<Vec<Option<ObjectRef>>, LoadError> {
        let Some(node) = self.field(name) else {
            return Ok(default);
        };
        let items = node
            .as_array()
            .ok_or_else(|| mismatch(name, "array", node))?;
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            out.push(self.object_slot(item, name, || format!("[{i}]"))?);
        }
        Ok(out)
    }

    pub fn read_object_array_2d(
        &mut self,
        name: &str,
        default: Vec<Option<Vec<Option<ObjectRef>>>>,
    ) -> Result<Vec<Option<Vec<Option<ObjectRef>>>>, LoadError> {
        let Some(node) = self.field(name) else {
            return Ok(default);
        };
        let rows = node
            .as_array()
            .ok_or_else(|| mismatch(name, "array", node))?;
        let mut out = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            out.push(match row {
                Value::Null => None,
                Value::Array(inner) => {
                    let mut slots = Vec::with_capacity(inner.len());
                    for (j, item) in inner.iter().enumerate() {
                        slots.push(self.object_slot(item, name, || format!("[{i}][{j}]"))?);
                    }
                    Some(slots)
                }
                _ => {
                    return Err(invalid(name, format!("[{i}]"), "array"));
                }
            });
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Maps
    // -----------------------------------------------------------------------

    /// Read an object-keyed map from its array of key/value entry nodes.
    /// A missing key is a hard failure; a null value is permitted.
    pub fn read_object_map(
        &mut self,
        name: &str,
        default: Vec<(ObjectRef, Option<ObjectRef>)>,
    ) -> Result<Vec<(ObjectRef, Option<ObjectRef>)>, LoadError> {
        let Some(node) = self.field(name) else {
            return Ok(default);
        };
        let entries = node
            .as_array()
            .ok_or_else(|| mismatch(name, "array", node))?;
        let mut out = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let entry = entry
                .as_object()
                .ok_or_else(|| invalid(name, format!("[{i}]"), "map entry"))?;
            let key_node =
                doc::get_object(entry, doc::MAP_KEY_KEY).ok_or_else(|| LoadError::MissingMapKey {
                    field: name.to_owned(),
                    index: i,
                })?;
            let key = self.importer.resolve(key_node)?;
            let value = match doc::get(entry, doc::MAP_VALUE_KEY) {
                None => None,
                Some(value) => self.object_slot(value, name, || format!("[{i}]"))?,
            };
            out.push((key, value));
        }
        Ok(out)
    }

    pub fn read_string_map(
        &mut self,
        name: &str,
        default: HashMap<String, Option<ObjectRef>>,
    ) -> Result<HashMap<String, Option<ObjectRef>>, LoadError> {
        let Some(node) = self.field(name) else {
            return Ok(default);
        };
        let map = node
            .as_object()
            .ok_or_else(|| mismatch(name, "object", node))?;
        let mut out = HashMap::with_capacity(map.len());
        for (key, slot) in map {
            let value = self.object_slot(slot, name, || format!("['{key}']"))?;
            out.insert(key.clone(), value);
        }
        Ok(out)
    }

    pub fn read_int_map(
        &mut self,
        name: &str,
        default: BTreeMap<i32, Option<ObjectRef>>,
    ) -> Result<BTreeMap<i32, Option<ObjectRef>>, LoadError> {
        let Some(node) = self.field(name) else {
            return Ok(default);
        };
        let map = node
            .as_object()
            .ok_or_else(|| mismatch(name, "object", node))?;
        let mut out = BTreeMap::new();
        for (key, slot) in map {
            let parsed: i32 = key.parse().map_err(|_| LoadError::TypeMismatch {
                field: name.to_owned(),
                expected: "integer key",
                found: key.clone(),
            })?;
            let value = self.object_slot(slot, name, || format!("['{key}']"))?;
            out.insert(parsed, value);
        }
        Ok(out)
    }

    fn object_slot(
        &mut self,
        slot: &Value,
        name: &str,
        index: impl Fn() -> String,
    ) -> Result<Option<ObjectRef>, LoadError> {
        match slot {
            Value::Null => Ok(None),
            Value::Object(map) => Ok(Some(self.importer.resolve(map)?)),
            _ => Err(invalid(name, index(), "object")),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn mismatch(name: &str, expected: &'static str, found: &Value) -> LoadError {
    LoadError::TypeMismatch {
        field: name.to_owned(),
        expected,
        found: doc::kind_name(found).to_owned(),
    }
}

fn invalid(name: &str, index: String, expected: &'static str) -> LoadError {
    LoadError::InvalidElement {
        field: name.to_owned(),
        index,
        expected,
    }
}

/// Convert one array of scalar elements; every element must convert.
fn scalar_row<T: Scalar>(
    items: &[Value],
    name: &str,
    index: impl Fn(usize) -> String,
) -> Result<Vec<T>, LoadError> {
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let value = T::from_node(item).ok_or_else(|| LoadError::InvalidElement {
            field: name.to_owned(),
            index: index(i),
            expected: T::KIND,
        })?;
        out.push(value);
    }
    Ok(out)
}

/// Convert one array of string elements; null slots are tolerated.
fn string_row(
    items: &[Value],
    name: &str,
    index: impl Fn(usize) -> String,
) -> Result<Vec<Option<String>>, LoadError> {
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        out.push(match item {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            _ => {
                return Err(LoadError::InvalidElement {
                    field: name.to_owned(),
                    index: index(i),
                    expected: "string",
                });
            }
        });
    }
    Ok(out)
}
