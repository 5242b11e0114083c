// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

mod common;

use std::io::{Read, Write};
use std::sync::Arc;
use std::thread;

use rpc_protocol::codec::binary;
use rpc_protocol::connection::Connection;
use rpc_protocol::handler::MethodTable;
use rpc_protocol::text_encoding::TextEncoding;
use rpc_protocol::value::Value;

fn build_table() -> MethodTable<common::Endpoint> {
    let mut table = MethodTable::new();
    table.register("sum", |args, _kwargs, _conn| {
        let total: i64 = args.iter().filter_map(Value::as_i64).sum();
        Ok(Value::Int(total).into())
    });
    table
}

#[test]
fn reserved_magic_drops_the_connection() {
    let (server_end, mut client_end) = common::pipe().unwrap();
    let table = Arc::new(build_table());

    let handle = thread::spawn(move || {
        let conn = Connection::new(server_end, None, TextEncoding::Utf8);
        conn.serve(table)
    });

    client_end.write_all(b"UNKOWNS:").unwrap();
    drop(client_end);

    let result = handle.join().unwrap();
    assert!(result.is_err());
}

#[test]
fn unrecognized_magic_falls_back_to_codec_b() {
    let (server_end, mut client_end) = common::pipe().unwrap();
    let table = Arc::new(build_table());

    let handle = thread::spawn(move || {
        let conn = Connection::new(server_end, None, TextEncoding::Utf8);
        conn.serve(table).unwrap();
    });

    // An ordinary msgpack request, encoded without any recognized 8-byte magic prefix: the wire
    // bytes just happen to start with a msgpack array marker rather than one of the known magics.
    let request = binary::encode_request(1, "sum", &[Value::Int(1), Value::Int(1)], &Default::default());
    client_end.write_all(&request).unwrap();

    let mut buf = [0u8; 4096];
    let n = client_end.read(&mut buf).unwrap();
    let mut cursor = std::io::Cursor::new(&buf[..n]);
    let value = rmpv::decode::read_value(&mut cursor).unwrap();
    let (msg_id, error, result) = binary::decode_response(value).unwrap();

    assert_eq!(msg_id, 1);
    assert_eq!(error, None);
    assert_eq!(result, Value::Int(2));

    drop(client_end);
    handle.join().unwrap();
}

#[test]
fn a_fallback_codec_b_request_is_followed_by_a_properly_magic_prefixed_one() {
    use rpc_protocol::connection::MAGIC_BINARY;

    let (server_end, mut client_end) = common::pipe().unwrap();
    let table = Arc::new(build_table());

    let handle = thread::spawn(move || {
        let conn = Connection::new(server_end, None, TextEncoding::Utf8);
        conn.serve(table).unwrap();
    });

    let request = binary::encode_request(1, "sum", &[Value::Int(1), Value::Int(1)], &Default::default());
    client_end.write_all(&request).unwrap();

    let mut buf = [0u8; 4096];
    let n = client_end.read(&mut buf).unwrap();
    let mut cursor = std::io::Cursor::new(&buf[..n]);
    let value = rmpv::decode::read_value(&mut cursor).unwrap();
    let (msg_id, error, result) = binary::decode_response(value).unwrap();
    assert_eq!(msg_id, 1);
    assert_eq!(error, None);
    assert_eq!(result, Value::Int(2));

    // The follow-up call re-sends an explicit magic, per the reference client's behavior. The
    // connection must not have left the fallback decoder stuck waiting on leftover state.
    client_end.write_all(MAGIC_BINARY).unwrap();
    let request = binary::encode_request(2, "sum", &[Value::Int(5), Value::Int(6)], &Default::default());
    client_end.write_all(&request).unwrap();

    let mut buf = [0u8; 4096];
    let n = client_end.read(&mut buf).unwrap();
    let mut cursor = std::io::Cursor::new(&buf[..n]);
    let value = rmpv::decode::read_value(&mut cursor).unwrap();
    let (msg_id, error, result) = binary::decode_response(value).unwrap();
    assert_eq!(msg_id, 2);
    assert_eq!(error, None);
    assert_eq!(result, Value::Int(11));

    drop(client_end);
    handle.join().unwrap();
}
