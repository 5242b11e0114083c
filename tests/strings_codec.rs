// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

mod common;

use std::io::{Read, Write};
use std::sync::Arc;
use std::thread;

use rpc_protocol::codec::strings;
use rpc_protocol::connection::{Connection, MAGIC_STRINGS};
use rpc_protocol::handler::MethodTable;
use rpc_protocol::text_encoding::TextEncoding;
use rpc_protocol::value::Value;

fn build_table() -> MethodTable<common::Endpoint> {
    let mut table = MethodTable::new();
    // Mirrors SPEC_FULL.md's boundary scenario 3: `bday` doesn't receive its body through
    // `args`/`kwargs` (codec S always dispatches with both empty) -- it consumes the body itself
    // via the connection's `read(n)` escape hatch (§4.8).
    table.register("bday", |_args, _kwargs, conn| {
        let body = conn.read(5).map_err(|e| e.to_string())?;
        Ok(Value::Bytes(body).into())
    });
    table.register("raw", |_args, _kwargs, _conn| {
        Ok(Value::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF]).into())
    });
    table
}

#[test]
fn bday_request_over_codec_s_consumes_its_body_via_read_and_returns_it() {
    let (server_end, mut client_end) = common::pipe().unwrap();
    let table = Arc::new(build_table());

    let handle = thread::spawn(move || {
        let conn = Connection::new(server_end, None, TextEncoding::Utf8);
        conn.serve(table).unwrap();
    });

    client_end.write_all(MAGIC_STRINGS).unwrap();
    // "0" + msg_id=1 right-justified in 8 + "bday" right-justified in 21, followed by a 5-byte
    // body the runner itself never reads -- only `bday`'s own `conn.read(5)` call consumes it.
    let request = b"0       1                 bday";
    client_end.write_all(request).unwrap();
    client_end.write_all(b"HELLO").unwrap();

    let mut header = [0u8; 30];
    client_end.read_exact(&mut header).unwrap();
    let (msg_id, error) = strings::decode_header(&header, TextEncoding::Utf8).unwrap();
    assert_eq!(msg_id, 1);
    assert_eq!(error, None);

    let mut body = [0u8; 5];
    client_end.read_exact(&mut body).unwrap();
    assert_eq!(&body, b"HELLO");

    drop(client_end);
    handle.join().unwrap();
}

#[test]
fn raw_bytes_result_is_written_verbatim_not_stringified() {
    let (server_end, mut client_end) = common::pipe().unwrap();
    let table = Arc::new(build_table());

    let handle = thread::spawn(move || {
        let conn = Connection::new(server_end, None, TextEncoding::Utf8);
        conn.serve(table).unwrap();
    });

    client_end.write_all(MAGIC_STRINGS).unwrap();
    let request = b"0       2                  raw";
    client_end.write_all(request).unwrap();

    let mut header = [0u8; 30];
    client_end.read_exact(&mut header).unwrap();
    let (msg_id, error) = strings::decode_header(&header, TextEncoding::Utf8).unwrap();
    assert_eq!(msg_id, 2);
    assert_eq!(error, None);

    let mut body = [0u8; 4];
    client_end.read_exact(&mut body).unwrap();
    assert_eq!(&body, &[0xDE, 0xAD, 0xBE, 0xEF]);

    drop(client_end);
    handle.join().unwrap();
}

#[test]
fn a_second_request_re_prefixed_with_its_own_magic_is_served_correctly() {
    // Mirrors `original_source/mprpc/client_simple.py`'s `_strings_create_request`, which
    // prepends the `STRINGS:` magic on *every* call, not just the connection's first.
    let (server_end, mut client_end) = common::pipe().unwrap();
    let table = Arc::new(build_table());

    let handle = thread::spawn(move || {
        let conn = Connection::new(server_end, None, TextEncoding::Utf8);
        conn.serve(table).unwrap();
    });

    client_end.write_all(MAGIC_STRINGS).unwrap();
    let request = b"0       1                  raw";
    client_end.write_all(request).unwrap();

    let mut header = [0u8; 30];
    client_end.read_exact(&mut header).unwrap();
    let (msg_id, error) = strings::decode_header(&header, TextEncoding::Utf8).unwrap();
    assert_eq!(msg_id, 1);
    assert_eq!(error, None);
    let mut body = [0u8; 4];
    client_end.read_exact(&mut body).unwrap();
    assert_eq!(&body, &[0xDE, 0xAD, 0xBE, 0xEF]);

    client_end.write_all(MAGIC_STRINGS).unwrap();
    let request = b"0       2                  raw";
    client_end.write_all(request).unwrap();

    let mut header = [0u8; 30];
    client_end.read_exact(&mut header).unwrap();
    let (msg_id, error) = strings::decode_header(&header, TextEncoding::Utf8).unwrap();
    assert_eq!(msg_id, 2);
    assert_eq!(error, None);
    let mut body = [0u8; 4];
    client_end.read_exact(&mut body).unwrap();
    assert_eq!(&body, &[0xDE, 0xAD, 0xBE, 0xEF]);

    drop(client_end);
    handle.join().unwrap();
}

#[test]
fn unregistered_method_reports_error_in_header_field() {
    let (server_end, mut client_end) = common::pipe().unwrap();
    let table = Arc::new(build_table());

    let handle = thread::spawn(move || {
        let conn = Connection::new(server_end, None, TextEncoding::Utf8);
        conn.serve(table).unwrap();
    });

    client_end.write_all(MAGIC_STRINGS).unwrap();
    let request = strings::encode_header(1, None, TextEncoding::Utf8);
    // Re-encode as a request header (type byte '0') naming an unregistered method.
    let mut request = request;
    request[0] = b'0';
    let name_field = format!("{:>21}", "nope");
    request[9..30].copy_from_slice(name_field.as_bytes());
    client_end.write_all(&request).unwrap();

    let mut header = [0u8; 30];
    client_end.read_exact(&mut header).unwrap();
    let (_msg_id, error) = strings::decode_header(&header, TextEncoding::Utf8).unwrap();
    assert!(error.is_some());

    drop(client_end);
    handle.join().unwrap();
}
