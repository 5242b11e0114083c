// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The blocking-TCP host (§5): accepts connections and drives each one to completion against a
//! shared [`MethodTable`], generalizing the source's single-service `run_blocking_tcp_server` loop
//! to the one-listener-many-codecs model of §2.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use log::{error, info};

use crate::connection::Connection;
use crate::error::Error;
use crate::handler::MethodTable;
use crate::text_encoding::TextEncoding;

/// Runs a blocking TCP server on `listener`, spawning one thread per accepted connection so that
/// concurrent clients are served independently -- each connection still serializes its own writes
/// through its own [`crate::arbiter::SendArbiter`] (§4.7), but connections never block each other.
///
/// `table` is shared by reference-count across every connection; register every method before
/// calling this.
pub fn run_blocking_tcp_server(
    listener: TcpListener,
    table: Arc<MethodTable<TcpStream>>,
    text_encoding: TextEncoding,
) {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                error!("error accepting connection: {e}");
                continue;
            }
        };
        let table = Arc::clone(&table);
        thread::spawn(move || {
            if let Err(e) = serve_one(stream, table, text_encoding) {
                error!("connection ended with error: {e}");
            }
        });
    }
}

fn serve_one(
    stream: TcpStream,
    table: Arc<MethodTable<TcpStream>>,
    text_encoding: TextEncoding,
) -> Result<(), Error> {
    let peer_addr = stream.peer_addr().ok();
    info!("accepted connection from {peer_addr:?}");
    let connection = Connection::new(stream, peer_addr, text_encoding);
    connection.serve(table)
}
