//! Typed cache payload encoding
//!
//! Cached responses are heterogeneous: plain text, binary audio, and nested
//! containers mixing both. `CacheValue` is a closed tagged variant over the
//! supported shapes; encode/decode round-trips every shape exactly,
//! including byte-for-byte fidelity for binary payloads.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// A cache payload value.
///
/// The wire form stores primitives as bare JSON and everything else as a
/// tagged object `{"__type": tag, "data": ...}` with tags `bytes`, `list`,
/// `tuple`, `dict`, and `repr`. `Opaque` carries the textual rendering of a
/// value with no structural encoding; it decodes back to that text (lossy
/// by design).
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<CacheValue>),
    Tuple(Vec<CacheValue>),
    Map(BTreeMap<String, CacheValue>),
    Opaque(String),
}

impl CacheValue {
    /// Encode into the JSON wire form.
    pub fn encode(&self) -> Value {
        match self {
            CacheValue::Null => Value::Null,
            CacheValue::Bool(b) => Value::Bool(*b),
            CacheValue::Int(i) => json!(i),
            CacheValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            CacheValue::Text(s) => Value::String(s.clone()),
            CacheValue::Bytes(data) => tagged("bytes", Value::String(BASE64.encode(data))),
            CacheValue::List(items) => {
                tagged("list", Value::Array(items.iter().map(Self::encode).collect()))
            }
            CacheValue::Tuple(items) => {
                tagged("tuple", Value::Array(items.iter().map(Self::encode).collect()))
            }
            CacheValue::Map(entries) => {
                let mut data = Map::new();
                for (k, v) in entries {
                    data.insert(k.clone(), v.encode());
                }
                tagged("dict", Value::Object(data))
            }
            CacheValue::Opaque(text) => tagged("repr", Value::String(text.clone())),
        }
    }

    /// Decode from the JSON wire form.
    ///
    /// Returns `None` on any shape `encode` cannot have produced; callers
    /// treat a failed decode as a cache miss, never as an error.
    pub fn decode(value: &Value) -> Option<CacheValue> {
        match value {
            Value::Null => Some(CacheValue::Null),
            Value::Bool(b) => Some(CacheValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(CacheValue::Int(i))
                } else {
                    n.as_f64().map(CacheValue::Float)
                }
            }
            Value::String(s) => Some(CacheValue::Text(s.clone())),
            Value::Object(obj) => {
                let tag = obj.get("__type")?.as_str()?;
                let data = obj.get("data")?;
                match tag {
                    "bytes" => {
                        let encoded = data.as_str()?;
                        BASE64.decode(encoded).ok().map(CacheValue::Bytes)
                    }
                    "list" => decode_items(data).map(CacheValue::List),
                    "tuple" => decode_items(data).map(CacheValue::Tuple),
                    "dict" => {
                        let entries = data.as_object()?;
                        let mut decoded = BTreeMap::new();
                        for (k, v) in entries {
                            decoded.insert(k.clone(), Self::decode(v)?);
                        }
                        Some(CacheValue::Map(decoded))
                    }
                    "repr" => data.as_str().map(|s| CacheValue::Opaque(s.to_string())),
                    _ => None,
                }
            }
            // Bare arrays are never produced by encode.
            Value::Array(_) => None,
        }
    }

    /// Borrow the inner text, if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CacheValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Consume into the inner text, if this is a `Text` value.
    pub fn into_text(self) -> Option<String> {
        match self {
            CacheValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for CacheValue {
    fn from(s: &str) -> Self {
        CacheValue::Text(s.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(s: String) -> Self {
        CacheValue::Text(s)
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(data: Vec<u8>) -> Self {
        CacheValue::Bytes(data)
    }
}

fn tagged(tag: &str, data: Value) -> Value {
    let mut obj = Map::new();
    obj.insert("__type".to_string(), Value::String(tag.to_string()));
    obj.insert("data".to_string(), data);
    Value::Object(obj)
}

fn decode_items(data: &Value) -> Option<Vec<CacheValue>> {
    data.as_array()?
        .iter()
        .map(CacheValue::decode)
        .collect::<Option<Vec<_>>>()
}
