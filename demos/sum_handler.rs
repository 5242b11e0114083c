// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Minimal end-to-end demonstration: registers a single `sum` method and serves it over an
//! in-memory socket pair rather than a real TCP listener, so this runs without opening a port.

use std::io::{Read, Write};
use std::sync::Arc;

use rpc_protocol::codec::binary;
use rpc_protocol::connection::{Connection, MAGIC_BINARY};
use rpc_protocol::handler::MethodTable;
use rpc_protocol::text_encoding::TextEncoding;
use rpc_protocol::value::Value;

/// A simple in-memory duplex byte pipe, standing in for a `TcpStream` in this demo.
struct Pipe {
    inbound: std::collections::VecDeque<u8>,
    outbound: Vec<u8>,
}

impl Read for Pipe {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = buf.len().min(self.inbound.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.inbound.pop_front().unwrap();
        }
        Ok(n)
    }
}

impl Write for Pipe {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.outbound.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn main() {
    let mut table = MethodTable::new();
    table.register("sum", |args, _kwargs, _conn| {
        let total: i64 = args.iter().filter_map(Value::as_i64).sum();
        Ok(Value::Int(total).into())
    });

    let request = binary::encode_request(1, "sum", &[Value::Int(2), Value::Int(40)], &Default::default());

    let mut inbound = std::collections::VecDeque::new();
    inbound.extend(MAGIC_BINARY.iter().copied());
    inbound.extend(request);

    let pipe = Pipe {
        inbound,
        outbound: Vec::new(),
    };

    let connection = Connection::new(pipe, None, TextEncoding::Utf8);
    let table = Arc::new(table);
    connection.serve(table).expect("demo connection should not error");
}
