//! Order-preserving encoding for flat JSON objects.
//!
//! [`encode`] writes a sequence of [`KeyValue`] pairs as a compact JSON object
//! whose keys appear exactly in sequence order. Log consumers rely on that
//! order, which a generic map serializer cannot give.
//!
//! [`decode`] goes the other way through `serde_json` into a [`BodyMap`]. The
//! map is for lookup only; the original key order is not recoverable from it.
//!
//! # Value formatting
//!
//! | Variant | Output |
//! |---------|--------|
//! | `String` | JSON string, escaped |
//! | `Integer` | base-10, no fraction |
//! | `Float` | six fractional digits, e.g. `30.500000` |
//! | `Bool` | `true` / `false` |
//! | `Null`, `Opaque` | `null` |
//!
//! Decoding turns every JSON number into `Float`, so `{"age":30}` comes back
//! out as `{"age":30.000000}`.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Error type for codec operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Input is not a JSON object.
    #[error("error decoding JSON object: {0}")]
    Decode(#[source] serde_json::Error),

    /// A string could not be escaped.
    #[error("error encoding JSON string: {0}")]
    Encode(#[source] serde_json::Error),

    /// NaN and infinities have no JSON representation.
    #[error("field `{key}` holds a non-finite float")]
    NonFiniteFloat {
        /// Key of the offending pair
        key: String,
    },
}

/// A field value in a flat body.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text
    String(String),
    /// Whole number
    Integer(i64),
    /// Floating-point number
    Float(f64),
    /// Boolean
    Bool(bool),
    /// Explicit JSON null
    Null,
    /// Nested array or object; carried through as `null`
    Opaque,
}

impl Value {
    fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Value::Opaque,
        }
    }

    /// Borrow the text of a `String` value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// One entry of an ordered key-value sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    /// Field name
    pub key: String,
    /// Field value
    pub value: Value,
}

impl KeyValue {
    /// Create a pair
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Decoded flat object, keyed by field name.
pub type BodyMap = BTreeMap<String, Value>;

/// Encode pairs as a compact JSON object, keys in sequence order.
pub fn encode(pairs: &[KeyValue]) -> Result<String, CodecError> {
    let mut buf = String::with_capacity(pairs.len() * 32);
    buf.push('{');
    for (i, pair) in pairs.iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        write_str(&mut buf, &pair.key)?;
        buf.push(':');
        match &pair.value {
            Value::String(s) => write_str(&mut buf, s)?,
            Value::Integer(n) => {
                let _ = write!(buf, "{}", n);
            }
            Value::Float(f) => {
                if !f.is_finite() {
                    return Err(CodecError::NonFiniteFloat {
                        key: pair.key.clone(),
                    });
                }
                let _ = write!(buf, "{:.6}", f);
            }
            Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
            Value::Null | Value::Opaque => buf.push_str("null"),
        }
    }
    buf.push('}');
    Ok(buf)
}

fn write_str(buf: &mut String, s: &str) -> Result<(), CodecError> {
    let quoted = serde_json::to_string(s).map_err(CodecError::Encode)?;
    buf.push_str(&quoted);
    Ok(())
}

/// Decode a JSON object into a lookup map.
///
/// Anything other than a single JSON object (plain text, arrays, scalars,
/// empty input, malformed JSON) is a [`CodecError::Decode`].
pub fn decode(bytes: &[u8]) -> Result<BodyMap, CodecError> {
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(bytes).map_err(CodecError::Decode)?;
    Ok(object
        .into_iter()
        .map(|(key, value)| (key, Value::from_json(value)))
        .collect())
}

/// Turn a decoded map into a pair sequence, in ascending key order.
pub fn pairs_from_map(map: BodyMap) -> Vec<KeyValue> {
    map.into_iter()
        .map(|(key, value)| KeyValue { key, value })
        .collect()
}
