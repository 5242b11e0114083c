// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Codec P -- pickled object graph (§4.3). Tuple shapes are identical to codec B; only the wire
//! serialization differs. Gated behind the `pickle` feature (on by default) per the "Pickled
//! codec" design note: a target lacking a compatible serializer can still build and serve the
//! other three codecs, with the `PICKLES:` magic always answering with a protocol error.

use crate::error::ProtocolError;
use crate::message::Request;
use crate::value::Value;

#[cfg(feature = "pickle")]
pub use enabled::*;

#[cfg(not(feature = "pickle"))]
pub use disabled::*;

#[cfg(feature = "pickle")]
mod enabled {
    use std::collections::BTreeMap;

    use serde_pickle::{DeOptions, HashableValue, SerOptions};

    use super::*;
    use crate::message::{Codec, REQUEST_TAG, RESPONSE_TAG};

    fn value_to_pickle(v: Value) -> serde_pickle::Value {
        match v {
            Value::Nil => serde_pickle::Value::None,
            Value::Bool(b) => serde_pickle::Value::Bool(b),
            Value::Int(i) => serde_pickle::Value::I64(i),
            Value::Float(f) => serde_pickle::Value::F64(f),
            Value::Str(s) => serde_pickle::Value::String(s),
            Value::Bytes(b) => serde_pickle::Value::Bytes(b),
            Value::Array(items) => {
                serde_pickle::Value::List(items.into_iter().map(value_to_pickle).collect())
            }
            Value::Map(m) => serde_pickle::Value::Dict(
                m.into_iter()
                    .map(|(k, v)| (HashableValue::String(k), value_to_pickle(v)))
                    .collect(),
            ),
        }
    }

    fn pickle_to_value(v: serde_pickle::Value) -> Value {
        match v {
            serde_pickle::Value::None => Value::Nil,
            serde_pickle::Value::Bool(b) => Value::Bool(b),
            serde_pickle::Value::I64(i) => Value::Int(i),
            serde_pickle::Value::Int(big) => Value::Int(big.to_string().parse().unwrap_or(0)),
            serde_pickle::Value::F64(f) => Value::Float(f),
            serde_pickle::Value::Bytes(b) => Value::Bytes(b),
            serde_pickle::Value::String(s) => Value::Str(s),
            serde_pickle::Value::List(items) | serde_pickle::Value::Tuple(items) => {
                Value::Array(items.into_iter().map(pickle_to_value).collect())
            }
            serde_pickle::Value::Dict(entries) => {
                let mut map = BTreeMap::new();
                for (k, v) in entries {
                    map.insert(hashable_to_string(&k), pickle_to_value(v));
                }
                Value::Map(map)
            }
            serde_pickle::Value::Set(items) | serde_pickle::Value::FrozenSet(items) => {
                Value::Array(items.into_iter().map(|h| pickle_to_value(hashable_to_value(h))).collect())
            }
        }
    }

    fn hashable_to_string(h: &HashableValue) -> String {
        match h {
            HashableValue::String(s) => s.clone(),
            other => format!("{other:?}"),
        }
    }

    fn hashable_to_value(h: HashableValue) -> serde_pickle::Value {
        match h {
            HashableValue::None => serde_pickle::Value::None,
            HashableValue::Bool(b) => serde_pickle::Value::Bool(b),
            HashableValue::I64(i) => serde_pickle::Value::I64(i),
            HashableValue::Int(i) => serde_pickle::Value::Int(i),
            HashableValue::F64(f) => serde_pickle::Value::F64(f.into_inner()),
            HashableValue::Bytes(b) => serde_pickle::Value::Bytes(b),
            HashableValue::String(s) => serde_pickle::Value::String(s),
            HashableValue::Tuple(items) => serde_pickle::Value::Tuple(
                items.into_iter().map(hashable_to_value).collect(),
            ),
            HashableValue::FrozenSet(items) => serde_pickle::Value::FrozenSet(items),
        }
    }

    /// Decodes one pickled request, assumed (per §4.3) to be the entire contents of a single
    /// `recv` call.
    pub fn decode_request(data: &[u8]) -> Result<Request, ProtocolError> {
        let value: serde_pickle::Value = serde_pickle::from_slice(data, DeOptions::default())
            .map_err(|e| ProtocolError::Decode(e.to_string()))?;

        let items = match value {
            serde_pickle::Value::Tuple(items) | serde_pickle::Value::List(items) => items,
            other => {
                return Err(ProtocolError::Decode(format!(
                    "expected a tuple, got {other:?}"
                )))
            }
        };

        if items.len() != 5 {
            return Err(ProtocolError::WrongArity {
                expected: 5,
                got: items.len(),
            });
        }

        let mut items = items.into_iter();
        let tag = match items.next().unwrap() {
            serde_pickle::Value::I64(i) => i,
            other => {
                return Err(ProtocolError::Decode(format!(
                    "request tag is not an integer: {other:?}"
                )))
            }
        };
        if tag != REQUEST_TAG {
            return Err(ProtocolError::WrongTag {
                expected: REQUEST_TAG as u8,
                got: tag,
            });
        }

        let msg_id = match items.next().unwrap() {
            serde_pickle::Value::I64(i) => i,
            other => {
                return Err(ProtocolError::Decode(format!(
                    "msg_id is not an integer: {other:?}"
                )))
            }
        };

        let method_name = match pickle_to_value(items.next().unwrap()) {
            Value::Str(s) => s,
            other => return Err(ProtocolError::Decode(format!("method name is not a string: {other}"))),
        };

        let args = match pickle_to_value(items.next().unwrap()) {
            Value::Array(a) => a,
            Value::Nil => Vec::new(),
            other => return Err(ProtocolError::Decode(format!("args is not a sequence: {other}"))),
        };

        let kwargs = match pickle_to_value(items.next().unwrap()) {
            Value::Map(m) => m,
            Value::Nil => BTreeMap::new(),
            other => return Err(ProtocolError::Decode(format!("kwargs is not a mapping: {other}"))),
        };

        Ok(Request {
            codec: Codec::Pickled,
            msg_id,
            method_name,
            args,
            kwargs,
        })
    }

    /// Encodes a 4-tuple response `(1, msg_id, error_or_none, result_or_none)`.
    pub fn encode_response(msg_id: i64, error: Option<&str>, result: Value) -> Vec<u8> {
        let error_value = match error {
            Some(e) => serde_pickle::Value::String(e.to_string()),
            None => serde_pickle::Value::None,
        };
        let tuple = serde_pickle::Value::Tuple(vec![
            serde_pickle::Value::I64(RESPONSE_TAG),
            serde_pickle::Value::I64(msg_id),
            error_value,
            value_to_pickle(result),
        ]);
        serde_pickle::to_vec(&tuple, SerOptions::default()).expect("encoding to a Vec never fails")
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn request_round_trips() {
            let mut kwargs = BTreeMap::new();
            kwargs.insert("k".to_string(), Value::Str("v".to_string()));
            let tuple = serde_pickle::Value::Tuple(vec![
                serde_pickle::Value::I64(REQUEST_TAG),
                serde_pickle::Value::I64(9),
                serde_pickle::Value::String("sum".to_string()),
                serde_pickle::Value::List(vec![serde_pickle::Value::I64(1), serde_pickle::Value::I64(2)]),
                serde_pickle::Value::Dict(
                    kwargs
                        .iter()
                        .map(|(k, v)| (HashableValue::String(k.clone()), value_to_pickle(v.clone())))
                        .collect(),
                ),
            ]);
            let bytes = serde_pickle::to_vec(&tuple, SerOptions::default()).unwrap();

            let req = decode_request(&bytes).unwrap();
            assert_eq!(req.msg_id, 9);
            assert_eq!(req.method_name, "sum");
            assert_eq!(req.args, vec![Value::Int(1), Value::Int(2)]);
            assert_eq!(req.kwargs, kwargs);
        }

        #[test]
        fn response_encodes_without_error() {
            let bytes = encode_response(4, None, Value::Int(10));
            assert!(!bytes.is_empty());
        }
    }
}

#[cfg(not(feature = "pickle"))]
mod disabled {
    use super::*;

    pub fn decode_request(_data: &[u8]) -> Result<Request, ProtocolError> {
        Err(ProtocolError::PickleDisabled)
    }

    pub fn encode_response(_msg_id: i64, _error: Option<&str>, _result: Value) -> Vec<u8> {
        Vec::new()
    }
}
