// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::net::TcpListener;
use std::sync::Arc;

use clap::Parser;

use rpc_protocol::handler::MethodTable;
use rpc_protocol::server::run_blocking_tcp_server;
use rpc_protocol::text_encoding::TextEncoding;
use rpc_protocol::value::Value;

#[derive(Parser)]
struct Cli {
    #[arg(long, default_value_t = 9090)]
    port: u16,

    /// Character encoding used for the fixed-width ASCII and URI-form codecs' text fields.
    #[arg(long, value_enum, default_value_t = Encoding::Utf8)]
    encoding: Encoding,
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum Encoding {
    Utf8,
    Latin1,
}

impl From<Encoding> for TextEncoding {
    fn from(e: Encoding) -> Self {
        match e {
            Encoding::Utf8 => TextEncoding::Utf8,
            Encoding::Latin1 => TextEncoding::Latin1,
        }
    }
}

fn main() {
    env_logger::init();

    let args = Cli::parse();
    let address = format!("0.0.0.0:{}", args.port);

    let mut table = MethodTable::new();
    table.register("sum", |args, _kwargs, _conn| {
        let total: i64 = args.iter().filter_map(Value::as_i64).sum();
        Ok(Value::Int(total).into())
    });
    table.register("echo", |args, _kwargs, _conn| {
        Ok(args.first().cloned().unwrap_or(Value::Nil).into())
    });

    let listener = TcpListener::bind(&address).expect("failed to bind listener");
    log::info!("listening on {address}");

    run_blocking_tcp_server(listener, Arc::new(table), args.encoding.into());
}
