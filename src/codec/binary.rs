// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Codec B -- binary packed, length-self-describing (§4.2). Requests are a 5-tuple
//! `(0, msg_id, method_name, args, kwargs)`; responses a 4-tuple
//! `(1, msg_id, error_or_nil, result_or_nil)`, both packed as MessagePack arrays.

use std::collections::BTreeMap;

use rmpv::Value as Packed;

use crate::error::ProtocolError;
use crate::message::{Codec, Request, REQUEST_TAG, RESPONSE_TAG};
use crate::value::Value;

/// Turns one already-decoded MessagePack value (produced by `BinaryDecoder::try_decode`) into a
/// `Request`, applying the tag/arity checks of `_msgpack_parse_request`.
pub fn decode_request(value: Packed) -> Result<Request, ProtocolError> {
    let items = match value {
        Packed::Array(items) => items,
        other => {
            return Err(ProtocolError::Decode(format!(
                "expected an array, got {other:?}"
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
    let tag = items.next().unwrap();
    let tag = tag
        .as_i64()
        .ok_or_else(|| ProtocolError::Decode("request tag is not an integer".to_string()))?;
    if tag != REQUEST_TAG {
        return Err(ProtocolError::WrongTag {
            expected: REQUEST_TAG as u8,
            got: tag,
        });
    }

    let msg_id = items
        .next()
        .unwrap()
        .as_i64()
        .ok_or_else(|| ProtocolError::Decode("msg_id is not an integer".to_string()))?;

    let method_name = items
        .next()
        .unwrap()
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ProtocolError::Decode("method name is not a string".to_string()))?;

    let args = match Value::from(items.next().unwrap()) {
        Value::Array(a) => a,
        Value::Nil => Vec::new(),
        other => return Err(ProtocolError::Decode(format!("args is not a sequence: {other}"))),
    };

    let kwargs = match Value::from(items.next().unwrap()) {
        Value::Map(m) => m,
        Value::Nil => BTreeMap::new(),
        other => return Err(ProtocolError::Decode(format!("kwargs is not a mapping: {other}"))),
    };

    Ok(Request {
        codec: Codec::Binary,
        msg_id,
        method_name,
        args,
        kwargs,
    })
}

/// Encodes a 5-tuple request; exposed for client-side callers and round-trip tests.
pub fn encode_request(
    msg_id: i64,
    method_name: &str,
    args: &[Value],
    kwargs: &BTreeMap<String, Value>,
) -> Vec<u8> {
    let packed = Packed::Array(vec![
        Packed::from(REQUEST_TAG),
        Packed::from(msg_id),
        Packed::from(method_name),
        Value::Array(args.to_vec()).into(),
        Value::Map(kwargs.clone()).into(),
    ]);
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &packed).expect("encoding to a Vec never fails");
    buf
}

/// Encodes a 4-tuple response. Exactly one of `error`/`result` should carry content; the other is
/// `Value::Nil`.
pub fn encode_response(msg_id: i64, error: Option<&str>, result: Value) -> Vec<u8> {
    let error_value = match error {
        Some(e) => Packed::from(e),
        None => Packed::Nil,
    };
    let packed = Packed::Array(vec![
        Packed::from(RESPONSE_TAG),
        Packed::from(msg_id),
        error_value,
        result.into(),
    ]);
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &packed).expect("encoding to a Vec never fails");
    buf
}

/// Decodes a 4-tuple response, mainly useful to clients and tests.
pub fn decode_response(value: Packed) -> Result<(i64, Option<String>, Value), ProtocolError> {
    let items = match value {
        Packed::Array(items) => items,
        other => {
            return Err(ProtocolError::Decode(format!(
                "expected an array, got {other:?}"
            )))
        }
    };
    if items.len() != 4 {
        return Err(ProtocolError::WrongArity {
            expected: 4,
            got: items.len(),
        });
    }
    let mut items = items.into_iter();
    let tag = items
        .next()
        .unwrap()
        .as_i64()
        .ok_or_else(|| ProtocolError::Decode("response tag is not an integer".to_string()))?;
    if tag != RESPONSE_TAG {
        return Err(ProtocolError::WrongTag {
            expected: RESPONSE_TAG as u8,
            got: tag,
        });
    }
    let msg_id = items
        .next()
        .unwrap()
        .as_i64()
        .ok_or_else(|| ProtocolError::Decode("msg_id is not an integer".to_string()))?;
    let error = match Value::from(items.next().unwrap()) {
        Value::Nil => None,
        Value::Str(s) => Some(s),
        other => Some(other.to_string()),
    };
    let result = Value::from(items.next().unwrap());
    Ok((msg_id, error, result))
}
