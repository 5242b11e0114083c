// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Codec U -- URL-form, "URIHTTP:" (§4.5). Requests are a fixed 512-byte, space-padded URL-like
//! string; responses reuse codec S's 30-byte header. Decoding follows
//! `original_source/mprpc/server_tornado.py`'s `decode_urihttp` rule-for-rule.

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;

use crate::error::ProtocolError;
use crate::message::{Codec, Request};
use crate::text_encoding::TextEncoding;
use crate::value::Value;

/// The distinguished kwarg that becomes `msg_id` and is never passed through to the handler.
const MSG_ID_KEY: &str = "msgsysid";

/// Decodes a codec-U payload (already stripped of its 512-byte padding by the caller) into a
/// `Request`. `raw` is decoded with `encoding` before parsing; the percent-escapes inside query
/// values are always interpreted as UTF-8 bytes regardless of `encoding`, matching the source's
/// treatment of `%XX` escapes as a separate, codec-independent layer.
pub fn decode_request(raw: &[u8], encoding: TextEncoding) -> Result<Request, ProtocolError> {
    let decoded = encoding.decode(raw);
    let mut payload = decoded.trim().to_string();

    if !payload.contains('?') && payload.contains('|') {
        payload = payload.replacen('|', "?", 1);
    }

    let (path_part, query_part) = match payload.split_once('?') {
        Some((path, query)) => {
            let query = query.split('#').next().unwrap_or("");
            (path.to_string(), query.to_string())
        }
        None => (payload.clone(), String::new()),
    };

    let segments: Vec<&str> = path_part
        .trim_matches('/')
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let method_name = segments.first().copied().unwrap_or("").to_string();
    let method_name = if method_name.is_empty() {
        "default".to_string()
    } else {
        method_name
    };

    let args: Vec<Value> = segments
        .iter()
        .skip(1)
        .map(|s| Value::Str(s.to_string()))
        .collect();

    let mut kwargs = BTreeMap::new();
    for pair in query_part.split('&') {
        if pair.is_empty() {
            continue;
        }
        let Some((key, raw_value)) = pair.split_once('=') else {
            continue;
        };
        let value = if raw_value.contains('%') {
            percent_decode_str(raw_value)
                .decode_utf8()
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| raw_value.to_string())
        } else {
            raw_value.to_string()
        };
        kwargs.insert(key.to_string(), Value::Str(value));
    }

    let msg_id = match kwargs.remove(MSG_ID_KEY) {
        Some(Value::Str(s)) => s
            .parse()
            .map_err(|_| ProtocolError::Decode(format!("invalid {MSG_ID_KEY}: {s:?}")))?,
        _ => 0,
    };

    Ok(Request {
        codec: Codec::UriHttp,
        msg_id,
        method_name,
        args,
        kwargs,
    })
}

/// Builds a codec-U request payload, for client use and round-trip tests. Does not pad to the
/// wire's fixed 512-byte width -- that is the caller's responsibility.
pub fn encode_request(method_name: &str, args: &[&str], kwargs: &BTreeMap<String, String>, msg_id: i64) -> String {
    let mut path = method_name.to_string();
    for arg in args {
        path.push('/');
        path.push_str(arg);
    }

    let mut all_kwargs = kwargs.clone();
    all_kwargs.insert(MSG_ID_KEY.to_string(), msg_id.to_string());

    let query: Vec<String> = all_kwargs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();

    format!("{path}?{}", query.join("&"))
}
