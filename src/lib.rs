// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! A multi-codec RPC server: one listening TCP port multiplexes four independent wire encodings
//! (binary/msgpack, pickled, fixed-width ASCII, and URI-form) selected by an 8-byte magic prefix
//! read once per connection (§2).
//!
//! Build a [`handler::MethodTable`], register methods on it, wrap it in an `Arc`, and pass it to
//! [`server::run_blocking_tcp_server`]. See `src/bin/echo_server.rs` for a complete example.

pub mod arbiter;
pub mod codec;
pub mod connection;
pub mod error;
pub mod frame;
pub mod handler;
pub mod message;
pub mod server;
pub mod text_encoding;
pub mod value;

pub use connection::Connection;
pub use error::{Error, ErrorKind, ProtocolError};
pub use handler::{MethodTable, Outcome};
pub use message::{Codec, Request};
pub use text_encoding::TextEncoding;
pub use value::Value;
