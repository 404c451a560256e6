//! Tree-document adapter.
//!
//! Every access to the underlying JSON tree goes through this module. A
//! missing key, an explicit JSON null, and a node of the wrong structural
//! kind all read as "not present" for structural lookups; typed field
//! conversion is handled by the [`Scalar`] trait so the capsules stay
//! generic over the numeric catalog.

use serde_json::{Map, Value};

/// Top-level key holding the signature/version record.
pub(crate) const META_KEY: &str = "metadata";
/// Top-level key holding the root object node.
pub(crate) const ROOT_KEY: &str = "root";

pub(crate) const CLASS_KEY: &str = "class";
pub(crate) const ID_KEY: &str = "id";
pub(crate) const VERSIONS_KEY: &str = "versions";
pub(crate) const REFERENCE_KEY: &str = "reference";
pub(crate) const MAP_KEY_KEY: &str = "mapKey";
pub(crate) const MAP_VALUE_KEY: &str = "mapValue";

pub(crate) const SIGNATURE_KEY: &str = "signature";
pub(crate) const FORMAT_VERSION_KEY: &str = "formatVersion";

/// Namespace prefix for user field keys. Keeps them disjoint from the
/// structural keys above no matter what an object names its fields.
pub(crate) const FIELD_PREFIX: &str = "sc.";

pub(crate) fn field_key(name: &str) -> String {
    format!("{FIELD_PREFIX}{name}")
}

/// An empty field name is the "skip this field" signal, not an error.
pub(crate) fn valid_name(name: &str) -> bool {
    !name.is_empty()
}

/// Look up a key, folding an explicit null into absence.
pub(crate) fn get<'a>(node: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    match node.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => Some(value),
    }
}

/// Look up a namespaced field key, folding an explicit null into absence.
pub(crate) fn get_field<'a>(node: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    get(node, &field_key(name))
}

pub(crate) fn get_object<'a>(
    node: &'a Map<String, Value>,
    key: &str,
) -> Option<&'a Map<String, Value>> {
    get(node, key).and_then(Value::as_object)
}

pub(crate) fn get_array<'a>(node: &'a Map<String, Value>, key: &str) -> Option<&'a Vec<Value>> {
    get(node, key).and_then(Value::as_array)
}

pub(crate) fn get_str<'a>(node: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    get(node, key).and_then(Value::as_str)
}

pub(crate) fn get_u64(node: &Map<String, Value>, key: &str) -> Option<u64> {
    get(node, key).and_then(Value::as_u64)
}

/// Structural kind of a node, for error messages.
pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Scalar conversion
// ---------------------------------------------------------------------------

/// Conversion between a catalog scalar and a document node.
///
/// Implemented for the signed integer widths, both float widths, and
/// `bool`. Narrow integers are range-checked: a stored value outside the
/// type's range converts to `None` and surfaces as a type mismatch.
pub trait Scalar: Copy + PartialEq + 'static {
    /// Kind name used in error messages.
    const KIND: &'static str;

    fn to_node(self) -> Value;

    fn from_node(node: &Value) -> Option<Self>;
}

macro_rules! impl_int_scalar {
    ($($ty:ty => $kind:literal),* $(,)?) => {$(
        impl Scalar for $ty {
            const KIND: &'static str = $kind;

            fn to_node(self) -> Value {
                Value::from(self)
            }

            fn from_node(node: &Value) -> Option<Self> {
                node.as_i64().and_then(|v| <$ty>::try_from(v).ok())
            }
        }
    )*};
}

impl_int_scalar!(i8 => "i8", i16 => "i16", i32 => "i32", i64 => "i64");

impl Scalar for f32 {
    const KIND: &'static str = "f32";

    fn to_node(self) -> Value {
        Value::from(self)
    }

    fn from_node(node: &Value) -> Option<Self> {
        node.as_f64().map(|v| v as f32)
    }
}

impl Scalar for f64 {
    const KIND: &'static str = "f64";

    fn to_node(self) -> Value {
        Value::from(self)
    }

    fn from_node(node: &Value) -> Option<Self> {
        node.as_f64()
    }
}

impl Scalar for bool {
    const KIND: &'static str = "bool";

    fn to_node(self) -> Value {
        Value::from(self)
    }

    fn from_node(node: &Value) -> Option<Self> {
        node.as_bool()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_keys_are_prefixed() {
        assert_eq!(field_key("width"), "sc.width");
        assert!(valid_name("width"));
        assert!(!valid_name(""));
    }

    #[test]
    fn null_reads_as_absent() {
        let node = json!({ "a": null, "b": 1 });
        let node = node.as_object().unwrap();
        assert!(get(node, "a").is_none());
        assert!(get(node, "missing").is_none());
        assert!(get(node, "b").is_some());
    }

    #[test]
    fn structural_getters_filter_kind() {
        let node = json!({ "s": "x", "n": 3, "arr": [1], "obj": {} });
        let node = node.as_object().unwrap();
        assert_eq!(get_str(node, "s"), Some("x"));
        assert!(get_str(node, "n").is_none());
        assert!(get_array(node, "arr").is_some());
        assert!(get_array(node, "obj").is_none());
        assert!(get_object(node, "obj").is_some());
        assert_eq!(get_u64(node, "n"), Some(3));
    }

    #[test]
    fn narrow_integers_are_range_checked() {
        assert_eq!(i8::from_node(&json!(127)), Some(127));
        assert_eq!(i8::from_node(&json!(128)), None);
        assert_eq!(i16::from_node(&json!(-40000)), None);
        assert_eq!(i64::from_node(&json!(1_i64 << 40)), Some(1 << 40));
    }

    #[test]
    fn scalar_kind_mismatch_is_none() {
        assert_eq!(i32::from_node(&json!("7")), None);
        assert_eq!(bool::from_node(&json!(1)), None);
        assert_eq!(f32::from_node(&json!(2)), Some(2.0));
    }
}
