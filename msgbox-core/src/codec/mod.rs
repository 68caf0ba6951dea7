//! Minimal self-describing binary codec (a CBOR subset).
//!
//! Every item starts with one head byte: the top 3 bits select the major type,
//! the low 5 bits carry either the value itself (0..=23) or a marker for a
//! following 1/2/4/8-byte big-endian argument.
//!
//! The codec is not canonical. The encoder always picks the shortest head, but
//! the decoder accepts any argument width, so two encoders may produce
//! different bytes for equal values. Nothing in the protocol hashes these bytes.

pub mod writer;
pub mod reader;
pub mod json;

pub use reader::decode;
pub use writer::encode;

use thiserror::Error;

pub(crate) const MAJOR_UNSIGNED: u8 = 0;
pub(crate) const MAJOR_NEGATIVE: u8 = 1;
pub(crate) const MAJOR_BYTES: u8 = 2;
pub(crate) const MAJOR_TEXT: u8 = 3;
pub(crate) const MAJOR_ARRAY: u8 = 4;
pub(crate) const MAJOR_MAP: u8 = 5;
pub(crate) const MAJOR_TAG: u8 = 6;
pub(crate) const MAJOR_SIMPLE: u8 = 7;

pub(crate) const INFO_U8: u8 = 24;
pub(crate) const INFO_U16: u8 = 25;
pub(crate) const INFO_U32: u8 = 26;
pub(crate) const INFO_U64: u8 = 27;

pub(crate) const SIMPLE_FALSE: u8 = 20;
pub(crate) const SIMPLE_TRUE: u8 = 21;
pub(crate) const SIMPLE_NULL: u8 = 22;
pub(crate) const SIMPLE_UNDEFINED: u8 = 23;

/// Nesting limit for arrays and maps on decode.
pub const MAX_DEPTH: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("input truncated: needed {needed} bytes at offset {offset}")]
    Truncated { needed: usize, offset: usize },
    #[error("unsupported major type {0}")]
    UnsupportedMajorType(u8),
    #[error("unsupported tag byte 0x{0:02x}")]
    UnsupportedTag(u8),
    #[error("text string is not valid UTF-8")]
    InvalidUtf8,
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    #[error("nesting deeper than {MAX_DEPTH}")]
    DepthExceeded,
}

/// A decoded value. Numbers are IEEE-754 doubles, matching what the wire can
/// represent once the integer fast paths run out.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    /// Distinct from `Null` on the wire.
    Undefined,
    Bool(bool),
    Number(f64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Value>),
    /// Entries in producer order; no key ordering is implied.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Look up a text key in a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find_map(|(k, v)| match k {
                Value::Text(t) if t == key => Some(v),
                _ => None,
            }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(t) => Some(t),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Value {
        Value::Map(vec![
            (Value::from("null"), Value::Null),
            (Value::from("undefined"), Value::Undefined),
            (Value::from("yes"), Value::Bool(true)),
            (Value::from("no"), Value::Bool(false)),
            (
                Value::from("thresholds"),
                Value::Array(
                    [0u32, 23, 24, 255, 256, 65535, 65536, u32::MAX]
                        .iter()
                        .map(|n| Value::from(*n))
                        .collect(),
                ),
            ),
            (
                Value::from("negatives"),
                Value::Array(vec![
                    Value::Number(-1.0),
                    Value::Number(-24.0),
                    Value::Number(-25.0),
                    Value::Number(-100_000.0),
                ]),
            ),
            (Value::from("float"), Value::Number(3.25)),
            (Value::from("big"), Value::Number(4_294_967_296.0)),
            (Value::from("text"), Value::from("héllo wörld")),
            (Value::from("bytes"), Value::Bytes(vec![0, 1, 2, 0xff])),
            (
                Value::from("nested"),
                Value::Array(vec![
                    Value::Array(vec![]),
                    Value::Map(vec![(Value::from("k"), Value::Array(vec![Value::Null]))]),
                ]),
            ),
            (Value::Number(7.0), Value::from("non-text key")),
        ])
    }

    #[test]
    fn test_roundtrip_representative_value() {
        let value = sample();
        let bytes = encode(&value);
        assert_eq!(decode(&bytes).unwrap(), value);
    }

    #[test]
    fn test_roundtrip_long_strings_cross_length_thresholds() {
        for len in [23usize, 24, 255, 256, 65535, 65536] {
            let value = Value::Text("x".repeat(len));
            assert_eq!(decode(&encode(&value)).unwrap(), value, "len {len}");
        }
    }

    #[test]
    fn test_map_get() {
        let value = sample();
        assert_eq!(value.get("yes"), Some(&Value::Bool(true)));
        assert_eq!(value.get("missing"), None);
        assert_eq!(Value::Null.get("yes"), None);
    }
}
