/// Payload value tree for Socket.IO packets.
///
/// Mirrors JSON with one extra leaf: `Binary`, a byte buffer that travels as
/// a separate transport frame. At encode time every binary leaf is replaced
/// in-tree by a `{"_placeholder":true,"num":k}` object and collected into an
/// ordered attachment list; decoding reverses the substitution once all
/// attachment frames have arrived. Objects preserve insertion order so that
/// decoded payloads re-encode byte for byte.
use bytes::Bytes;
use indexmap::IndexMap;
use serde_json::Number;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Binary(Bytes),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    /// Convert a plain JSON value; never produces `Binary` leaves.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn has_binary(&self) -> bool {
        match self {
            Value::Binary(_) => true,
            Value::Array(items) => items.iter().any(Value::has_binary),
            Value::Object(map) => map.values().any(Value::has_binary),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Split the tree into a JSON value with placeholders and the ordered
    /// list of binary attachments the placeholders refer to.
    pub fn deconstruct(&self) -> (serde_json::Value, Vec<Bytes>) {
        let mut attachments = Vec::new();
        let json = self.replace_binary(&mut attachments);
        (json, attachments)
    }

    fn replace_binary(&self, attachments: &mut Vec<Bytes>) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Binary(buf) => {
                let num = attachments.len();
                attachments.push(buf.clone());
                serde_json::json!({"_placeholder": true, "num": num})
            }
            Value::Array(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|item| item.replace_binary(attachments))
                    .collect(),
            ),
            Value::Object(map) => {
                let mut out = serde_json::Map::new();
                for (key, value) in map {
                    out.insert(key.clone(), value.replace_binary(attachments));
                }
                serde_json::Value::Object(out)
            }
        }
    }

    /// Rebuild the tree from decoded JSON, substituting each placeholder with
    /// the attachment it indexes.
    pub fn reconstruct(json: serde_json::Value, attachments: &[Bytes]) -> Result<Self> {
        match json {
            serde_json::Value::Object(map) => {
                if let Some(num) = placeholder_index(&map) {
                    let buf = attachments.get(num).ok_or_else(|| {
                        Error::InvalidPacket(format!("placeholder {num} out of range"))
                    })?;
                    return Ok(Value::Binary(buf.clone()));
                }
                let mut out = IndexMap::with_capacity(map.len());
                for (key, value) in map {
                    out.insert(key, Value::reconstruct(value, attachments)?);
                }
                Ok(Value::Object(out))
            }
            serde_json::Value::Array(items) => Ok(Value::Array(
                items
                    .into_iter()
                    .map(|item| Value::reconstruct(item, attachments))
                    .collect::<Result<_>>()?,
            )),
            other => Ok(Value::from_json(other)),
        }
    }
}

fn placeholder_index(map: &serde_json::Map<String, serde_json::Value>) -> Option<usize> {
    if map.get("_placeholder")?.as_bool()? {
        map.get("num")?.as_u64().map(|n| n as usize)
    } else {
        None
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
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

impl From<Bytes> for Value {
    fn from(buf: Bytes) -> Self {
        Value::Binary(buf)
    }
}

impl From<Vec<u8>> for Value {
    fn from(buf: Vec<u8>) -> Self {
        Value::Binary(Bytes::from(buf))
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::from_json(value)
    }
}

/// Argument shaping for emitted events and acknowledgement replies.
///
/// `Args` spreads its members into separate handler arguments; `One` always
/// stays a single argument, so `One(Value::Array(..))` delivers the whole
/// array as one argument instead of spreading it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    None,
    One(Value),
    Args(Vec<Value>),
}

impl Payload {
    pub fn args(args: Vec<Value>) -> Self {
        Payload::Args(args)
    }

    /// Flatten into the positional argument list that goes on the wire.
    pub fn into_args(self) -> Vec<Value> {
        match self {
            Payload::None => Vec::new(),
            Payload::One(value) => vec![value],
            Payload::Args(values) => values,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::One(value)
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Payload::None
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::One(s.into())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::One(s.into())
    }
}

impl From<bool> for Payload {
    fn from(b: bool) -> Self {
        Payload::One(b.into())
    }
}

impl From<i64> for Payload {
    fn from(n: i64) -> Self {
        Payload::One(n.into())
    }
}

impl From<Bytes> for Payload {
    fn from(buf: Bytes) -> Self {
        Payload::One(buf.into())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::One(value.into())
    }
}
