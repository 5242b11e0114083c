// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Codec S -- fixed-width ASCII, "STRINGS:" (§4.4). Both requests and responses use the same
//! 30-byte header layout; ported field-for-field from the source's
//! `req=data[0:1],data[1:9],data[9:METHOD_STRINGS_SIZE]` and `'%1d%8d%21s' % (...)` formatting.
//!
//! Note: `original_source/mprpc/server_tornado.py` formats all three fields with Python's `%`
//! operator (`'%1d%8d%21s'`), which right-justifies string fields (pads on the *left*) -- the
//! distilled spec's prose says the method-name/error field is left-aligned, but its own worked
//! boundary example (`"0       1                 bday"`) matches the original's right-justified
//! behavior. This implementation follows the original and the worked example.

use crate::error::ProtocolError;
use crate::frame::STRINGS_HEADER_SIZE;
use crate::message::{Codec, Request};
use crate::text_encoding::TextEncoding;

const MSG_ID_WIDTH: usize = 8;
const NAME_WIDTH: usize = 21;

/// Parses the fixed 30-byte header of a codec-S request. `args`/`kwargs` are always empty for
/// this codec; any request body is read separately via the connection's `read(n)` escape hatch.
pub fn decode_request(
    header: &[u8; STRINGS_HEADER_SIZE],
    encoding: TextEncoding,
) -> Result<Request, ProtocolError> {
    let type_byte = header[0];
    if type_byte != b'0' {
        return Err(ProtocolError::Decode(format!(
            "expected request type '0', got {:?}",
            type_byte as char
        )));
    }

    let msg_id = parse_msg_id(&header[1..1 + MSG_ID_WIDTH])?;

    let name_field = encoding.decode(&header[1 + MSG_ID_WIDTH..STRINGS_HEADER_SIZE]);
    let method_name = name_field.trim().to_string();

    Ok(Request {
        codec: Codec::Strings,
        msg_id,
        method_name,
        args: Vec::new(),
        kwargs: Default::default(),
    })
}

fn parse_msg_id(field: &[u8]) -> Result<i64, ProtocolError> {
    let text = std::str::from_utf8(field)
        .map_err(|_| ProtocolError::Decode("msg_id field is not valid ASCII".to_string()))?;
    text.trim()
        .parse()
        .map_err(|_| ProtocolError::Decode(format!("invalid msg_id: {text:?}")))
}

/// Encodes the 30-byte response header. `error`, when present, occupies the 21-byte slot that a
/// request would use for the method name (the source's field-reuse, preserved verbatim -- see
/// SPEC_FULL.md §9 on the collision ambiguity this creates). Both the msg_id and the name/error
/// field are right-justified (space-padded on the left), matching `'%1d%8d%21s'`.
pub fn encode_header(
    msg_id: i64,
    error: Option<&str>,
    encoding: TextEncoding,
) -> [u8; STRINGS_HEADER_SIZE] {
    let mut header = [b' '; STRINGS_HEADER_SIZE];
    header[0] = b'1';

    let msg_id_str = format!("{msg_id:>width$}", width = MSG_ID_WIDTH);
    header[1..1 + MSG_ID_WIDTH].copy_from_slice(msg_id_str.as_bytes());

    let field = error.unwrap_or("");
    let truncated = &field[..field.len().min(NAME_WIDTH)];
    let padded = format!("{truncated:>width$}", width = NAME_WIDTH);
    let encoded = encoding.encode(&padded);
    header[1 + MSG_ID_WIDTH..STRINGS_HEADER_SIZE].copy_from_slice(&encoded);

    header
}

/// Parses a 30-byte response header, mainly useful to clients and tests. Per §4.4, any
/// non-space byte in the 21-byte field marks an error.
pub fn decode_header(
    header: &[u8; STRINGS_HEADER_SIZE],
    encoding: TextEncoding,
) -> Result<(i64, Option<String>), ProtocolError> {
    if header[0] != b'1' {
        return Err(ProtocolError::Decode(format!(
            "expected response type '1', got {:?}",
            header[0] as char
        )));
    }
    let msg_id = parse_msg_id(&header[1..1 + MSG_ID_WIDTH])?;

    let field = encoding.decode(&header[1 + MSG_ID_WIDTH..STRINGS_HEADER_SIZE]);

    let error = if field.trim().is_empty() {
        None
    } else {
        Some(field.trim().to_string())
    };

    Ok((msg_id, error))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(s: &str) -> [u8; STRINGS_HEADER_SIZE] {
        let mut out = [b' '; STRINGS_HEADER_SIZE];
        let bytes = s.as_bytes();
        out[..bytes.len()].copy_from_slice(bytes);
        out
    }

    #[test]
    fn decodes_the_boundary_example() {
        // "0" + msg_id=1 right-justified in 8 + "bday" right-justified in 21, per
        // original_source's `'%1d%8d%21s' % (0, 1, 'bday')`.
        let header = header_bytes("0       1                 bday");
        let req = decode_request(&header, TextEncoding::Utf8).unwrap();
        assert_eq!(req.msg_id, 1);
        assert_eq!(req.method_name, "bday");
        assert!(req.args.is_empty());
    }

    #[test]
    fn encodes_a_successful_response_header() {
        let header = encode_header(1, None, TextEncoding::Utf8);
        let expected = format!("1{:>8}{:>21}", 1, "");
        assert_eq!(&header, expected.as_bytes());
    }

    #[test]
    fn error_field_strips_leading_space_on_msg_id() {
        let header = header_bytes("1       7            not found");
        let (msg_id, error) = decode_header(&header, TextEncoding::Utf8).unwrap();
        assert_eq!(msg_id, 7);
        assert_eq!(error.as_deref(), Some("not found"));
    }
}
