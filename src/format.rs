//! Document format identity and byte-level encoding.
//!
//! The signature constant marks a document as produced by this codec; the
//! format version is bumped whenever the document layout itself changes
//! (it is independent of the per-class schema versions). [`encode`] and
//! [`decode`] convert between serde-serializable values and byte buffers;
//! JSON is always available, RON sits behind the `serialize-ron` feature.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{LoadError, SaveError};

/// Signature stamped into every document's metadata ("SCG1").
pub const SIGNATURE: u32 = 0x5343_4731;

/// Newest document format revision this build reads and writes. Documents
/// carrying a larger value are rejected as coming from the future.
pub const FORMAT_VERSION: u32 = 2;

/// Supported byte-level encodings of the document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Pretty-printed JSON, the codec's native form.
    Json,
    /// RON rendition of the same tree.
    #[cfg(feature = "serialize-ron")]
    Ron,
}

/// Encode a serde-serializable value to bytes in the given format.
pub fn encode<T: Serialize>(value: &T, format: Format) -> Result<Vec<u8>, SaveError> {
    match format {
        Format::Json => {
            serde_json::to_vec_pretty(value).map_err(|e| SaveError::Format(e.to_string()))
        }
        #[cfg(feature = "serialize-ron")]
        Format::Ron => ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
            .map(|s| s.into_bytes())
            .map_err(|e| SaveError::Format(e.to_string())),
    }
}

/// Decode bytes in the given format to a serde-deserializable value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8], format: Format) -> Result<T, LoadError> {
    match format {
        Format::Json => serde_json::from_slice(bytes).map_err(|e| LoadError::Format(e.to_string())),
        #[cfg(feature = "serialize-ron")]
        Format::Ron => {
            let s = std::str::from_utf8(bytes).map_err(|e| LoadError::Format(e.to_string()))?;
            ron::from_str(s).map_err(|e| LoadError::Format(e.to_string()))
        }
    }
}
