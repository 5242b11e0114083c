// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! A tagged-variant value used to carry heterogeneous `args`/`kwargs` through
//! decoder -> handler -> encoder for codecs B and P, per the "Dynamic argument lists" design note.

use std::collections::BTreeMap;
use std::fmt;

/// A dynamically-typed value flowing through the binary and pickled codecs.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Renders this value as the raw bytes a codec-S/U response body carries (§4.4-§4.5): `Bytes`
    /// passes through untouched, `Str` is encoded with the connection's text encoding, and every
    /// other variant falls back to its `Display` form -- there is no wire representation for a
    /// nested array/map in these two codecs, so stringifying is the best a non-stream result gets.
    pub fn to_wire_bytes(&self, encoding: crate::text_encoding::TextEncoding) -> Vec<u8> {
        match self {
            Value::Bytes(b) => b.clone(),
            Value::Str(s) => encoding.encode(s),
            other => encoding.encode(&other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<rmpv::Value> for Value {
    fn from(v: rmpv::Value) -> Self {
        use rmpv::Value as R;
        match v {
            R::Nil => Value::Nil,
            R::Boolean(b) => Value::Bool(b),
            R::Integer(i) => Value::Int(i.as_i64().unwrap_or_default()),
            R::F32(x) => Value::Float(x as f64),
            R::F64(x) => Value::Float(x),
            R::String(s) => Value::Str(s.into_str().unwrap_or_default()),
            R::Binary(b) => Value::Bytes(b),
            R::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            R::Map(entries) => {
                let mut map = BTreeMap::new();
                for (k, v) in entries {
                    let key = k.as_str().map(str::to_string).unwrap_or_else(|| k.to_string());
                    map.insert(key, Value::from(v));
                }
                Value::Map(map)
            }
            R::Ext(_, data) => Value::Bytes(data),
        }
    }
}

impl From<Value> for rmpv::Value {
    fn from(v: Value) -> Self {
        use rmpv::Value as R;
        match v {
            Value::Nil => R::Nil,
            Value::Bool(b) => R::Boolean(b),
            Value::Int(i) => R::Integer(i.into()),
            Value::Float(x) => R::F64(x),
            Value::Str(s) => R::String(s.into()),
            Value::Bytes(b) => R::Binary(b),
            Value::Array(items) => R::Array(items.into_iter().map(rmpv::Value::from).collect()),
            Value::Map(m) => R::Map(
                m.into_iter()
                    .map(|(k, v)| (R::String(k.into()), rmpv::Value::from(v)))
                    .collect(),
            ),
        }
    }
}
