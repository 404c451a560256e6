//! Write-side capsule.
//!
//! An [`OutputCapsule`] binds one object's document node to the exporter
//! for the duration of that object's field pass. Every `write_*` operation
//! takes the field value, its name, and its declared default; a value equal
//! to its default is omitted from the document entirely, which is the only
//! compaction mechanism the format has. An empty field name makes the call
//! a no-op.
//!
//! Equality for the elision check is value equality for scalars, strings
//! and plain arrays, content equality for buffers, and pointer identity for
//! objects and object collections.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use fixedbitset::FixedBitSet;
use serde_json::{Map, Value};

use crate::buffer::DataBuffer;
use crate::document::{self as doc, Scalar};
use crate::error::SaveError;
use crate::export::Exporter;
use crate::object::{self, ObjectRef};

/// Per-object write handle. Borrowed for one field pass, never retained.
pub struct OutputCapsule<'a, 'r> {
    node: &'a mut Map<String, Value>,
    exporter: &'a mut Exporter<'r>,
}

impl<'a, 'r> OutputCapsule<'a, 'r> {
    pub(crate) fn new(node: &'a mut Map<String, Value>, exporter: &'a mut Exporter<'r>) -> Self {
        Self { node, exporter }
    }

    fn insert(&mut self, name: &str, value: Value) {
        self.node.insert(doc::field_key(name), value);
    }

    // -----------------------------------------------------------------------
    // Scalars and strings
    // -----------------------------------------------------------------------

    /// Write a scalar field (any integer width, float width, or bool).
    pub fn write<T: Scalar>(&mut self, value: T, name: &str, default: T) -> Result<(), SaveError> {
        if !doc::valid_name(name) || value == default {
            return Ok(());
        }
        self.insert(name, value.to_node());
        Ok(())
    }

    pub fn write_str(&mut self, value: &str, name: &str, default: &str) -> Result<(), SaveError> {
        if !doc::valid_name(name) || value == default {
            return Ok(());
        }
        self.insert(name, Value::from(value));
        Ok(())
    }

    /// Write an enum-like field by its display form.
    pub fn write_enum<T: Display + PartialEq>(
        &mut self,
        value: &T,
        name: &str,
        default: &T,
    ) -> Result<(), SaveError> {
        if !doc::valid_name(name) || value == default {
            return Ok(());
        }
        self.insert(name, Value::from(value.to_string()));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Arrays
    // -----------------------------------------------------------------------

    pub fn write_array<T: Scalar>(
        &mut self,
        value: &[T],
        name: &str,
        default: &[T],
    ) -> Result<(), SaveError> {
        if !doc::valid_name(name) || value == default {
            return Ok(());
        }
        let items = value.iter().map(|v| v.to_node()).collect();
        self.insert(name, Value::Array(items));
        Ok(())
    }

    /// Write a two-dimensional scalar array. An absent inner array is
    /// emitted as an explicit null slot so the outer positions survive the
    /// round trip.
    pub fn write_array_2d<T: Scalar>(
        &mut self,
        value: &[Option<Vec<T>>],
        name: &str,
        default: &[Option<Vec<T>>],
    ) -> Result<(), SaveError> {
        if !doc::valid_name(name) || value == default {
            return Ok(());
        }
        let rows = value
            .iter()
            .map(|row| match row {
                None => Value::Null,
                Some(inner) => Value::Array(inner.iter().map(|v| v.to_node()).collect()),
            })
            .collect();
        self.insert(name, Value::Array(rows));
        Ok(())
    }

    pub fn write_string_array(
        &mut self,
        value: &[Option<String>],
        name: &str,
        default: &[Option<String>],
    ) -> Result<(), SaveError> {
        if !doc::valid_name(name) || value == default {
            return Ok(());
        }
        let items = value.iter().map(string_slot).collect();
        self.insert(name, Value::Array(items));
        Ok(())
    }

    pub fn write_string_array_2d(
        &mut self,
        value: &[Option<Vec<Option<String>>>],
        name: &str,
        default: &[Option<Vec<Option<String>>>],
    ) -> Result<(), SaveError> {
        if !doc::valid_name(name) || value == default {
            return Ok(());
        }
        let rows = value
            .iter()
            .map(|row| match row {
                None => Value::Null,
                Some(inner) => Value::Array(inner.iter().map(string_slot).collect()),
            })
            .collect();
        self.insert(name, Value::Array(rows));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bit sets and buffers
    // -----------------------------------------------------------------------

    /// Write a bit set as the array of its set-bit indices.
    pub fn write_bit_set(
        &mut self,
        value: &FixedBitSet,
        name: &str,
        default: &FixedBitSet,
    ) -> Result<(), SaveError> {
        if !doc::valid_name(name) || value == default {
            return Ok(());
        }
        let items = value.ones().map(|i| Value::from(i as u64)).collect();
        self.insert(name, Value::Array(items));
        Ok(())
    }

    /// Write a buffer's content from its start to its limit. The cursor is
    /// left untouched.
    pub fn write_buffer<T: Scalar>(
        &mut self,
        value: Option<&DataBuffer<T>>,
        name: &str,
        default: Option<&DataBuffer<T>>,
    ) -> Result<(), SaveError> {
        if !doc::valid_name(name) || buffers_equal(value, default) {
            return Ok(());
        }
        let Some(buffer) = value else {
            return Ok(());
        };
        let node = buffer_node(buffer, name)?;
        self.insert(name, node);
        Ok(())
    }

    pub fn write_buffer_list<T: Scalar>(
        &mut self,
        value: &[Option<DataBuffer<T>>],
        name: &str,
        default: &[Option<DataBuffer<T>>],
    ) -> Result<(), SaveError> {
        if !doc::valid_name(name) || value == default {
            return Ok(());
        }
        let mut slots = Vec::with_capacity(value.len());
        for buffer in value {
            slots.push(match buffer {
                None => Value::Null,
                Some(buffer) => buffer_node(buffer, name)?,
            });
        }
        self.insert(name, Value::Array(slots));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Nested objects
    // -----------------------------------------------------------------------

    /// Write a nested object field. Encoding is delegated to the exporter,
    /// which collapses repeated objects into reference nodes.
    pub fn write_object(
        &mut self,
        value: Option<&ObjectRef>,
        name: &str,
        default: Option<&ObjectRef>,
    ) -> Result<(), SaveError> {
        if !doc::valid_name(name) || object::same_object(value, default) {
            return Ok(());
        }
        let Some(object) = value else {
            return Ok(());
        };
        let node = self.exporter.visit(object)?;
        self.insert(name, node);
        Ok(())
    }

    pub fn write_object_array(
        &mut self,
        value: &[Option<ObjectRef>],
        name: &str,
        default: &[Option<ObjectRef>],
    ) -> Result<(), SaveError> {
        if !doc::valid_name(name) || object_slice_eq(value, default) {
            return Ok(());
        }
        let mut items = Vec::with_capacity(value.len());
        for slot in value {
            items.push(self.object_slot(slot.as_ref())?);
        }
        self.insert(name, Value::Array(items));
        Ok(())
    }

    pub fn write_object_array_2d(
        &mut self,
        value: &[Option<Vec<Option<ObjectRef>>>],
        name: &str,
        default: &[Option<Vec<Option<ObjectRef>>>],
    ) -> Result<(), SaveError> {
        if !doc::valid_name(name) || object_grid_eq(value, default) {
            return Ok(());
        }
        let mut rows = Vec::with_capacity(value.len());
        for row in value {
            rows.push(match row {
                None => Value::Null,
                Some(inner) => {
                    let mut items = Vec::with_capacity(inner.len());
                    for slot in inner {
                        items.push(self.object_slot(slot.as_ref())?);
                    }
                    Value::Array(items)
                }
            });
        }
        self.insert(name, Value::Array(rows));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Maps
    // -----------------------------------------------------------------------

    /// Write an object-keyed map as an array of key/value entry nodes.
    pub fn write_object_map(
        &mut self,
        value: &[(ObjectRef, Option<ObjectRef>)],
        name: &str,
        default: &[(ObjectRef, Option<ObjectRef>)],
    ) -> Result<(), SaveError> {
        if !doc::valid_name(name) || entry_slice_eq(value, default) {
            return Ok(());
        }
        let mut entries = Vec::with_capacity(value.len());
        for (map_key, map_value) in value {
            let mut entry = Map::new();
            entry.insert(doc::MAP_KEY_KEY.to_owned(), self.exporter.visit(map_key)?);
            entry.insert(
                doc::MAP_VALUE_KEY.to_owned(),
                self.object_slot(map_value.as_ref())?,
            );
            entries.push(Value::Object(entry));
        }
        self.insert(name, Value::Array(entries));
        Ok(())
    }

    /// Write a string-keyed map as an object node. Keys are emitted in
    /// sorted order so output is deterministic.
    pub fn write_string_map(
        &mut self,
        value: &HashMap<String, Option<ObjectRef>>,
        name: &str,
        default: &HashMap<String, Option<ObjectRef>>,
    ) -> Result<(), SaveError> {
        if !doc::valid_name(name) || string_map_eq(value, default) {
            return Ok(());
        }
        let mut keys: Vec<&String> = value.keys().collect();
        keys.sort();
        let mut node = Map::new();
        for key in keys {
            let slot = self.object_slot(value[key].as_ref())?;
            node.insert(key.clone(), slot);
        }
        self.insert(name, Value::Object(node));
        Ok(())
    }

    /// Write an integer-keyed map as an object node keyed by the decimal
    /// form of each key.
    pub fn write_int_map(
        &mut self,
        value: &BTreeMap<i32, Option<ObjectRef>>,
        name: &str,
        default: &BTreeMap<i32, Option<ObjectRef>>,
    ) -> Result<(), SaveError> {
        if !doc::valid_name(name) || int_map_eq(value, default) {
            return Ok(());
        }
        let mut node = Map::new();
        for (key, slot) in value {
            let slot = self.object_slot(slot.as_ref())?;
            node.insert(key.to_string(), slot);
        }
        self.insert(name, Value::Object(node));
        Ok(())
    }

    fn object_slot(&mut self, slot: Option<&ObjectRef>) -> Result<Value, SaveError> {
        match slot {
            None => Ok(Value::Null),
            Some(object) => self.exporter.visit(object),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn string_slot(slot: &Option<String>) -> Value {
    match slot {
        None => Value::Null,
        Some(s) => Value::from(s.as_str()),
    }
}

/// Serialize a buffer's content and verify the element count against its
/// limit; a mismatch means the buffer changed underneath the export.
fn buffer_node<T: Scalar>(buffer: &DataBuffer<T>, field: &str) -> Result<Value, SaveError> {
    let mut items = Vec::with_capacity(buffer.limit());
    for value in buffer.contents() {
        items.push(value.to_node());
    }
    if items.len() != buffer.limit() {
        return Err(SaveError::BufferIntegrity {
            field: field.to_owned(),
            written: items.len(),
            limit: buffer.limit(),
        });
    }
    Ok(Value::Array(items))
}

fn buffers_equal<T: Scalar>(a: Option<&DataBuffer<T>>, b: Option<&DataBuffer<T>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn slot_eq(a: &Option<ObjectRef>, b: &Option<ObjectRef>) -> bool {
    object::same_object(a.as_ref(), b.as_ref())
}

fn object_slice_eq(a: &[Option<ObjectRef>], b: &[Option<ObjectRef>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| slot_eq(x, y))
}

fn object_grid_eq(
    a: &[Option<Vec<Option<ObjectRef>>>],
    b: &[Option<Vec<Option<ObjectRef>>>],
) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => object_slice_eq(x, y),
            _ => false,
        })
}

fn entry_slice_eq(
    a: &[(ObjectRef, Option<ObjectRef>)],
    b: &[(ObjectRef, Option<ObjectRef>)],
) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|((ka, va), (kb, vb))| std::rc::Rc::ptr_eq(ka, kb) && slot_eq(va, vb))
}

fn string_map_eq(
    a: &HashMap<String, Option<ObjectRef>>,
    b: &HashMap<String, Option<ObjectRef>>,
) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(k, v)| b.get(k).is_some_and(|w| slot_eq(v, w)))
}

fn int_map_eq(
    a: &BTreeMap<i32, Option<ObjectRef>>,
    b: &BTreeMap<i32, Option<ObjectRef>>,
) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(k, v)| b.get(k).is_some_and(|w| slot_eq(v, w)))
}
