// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The per-connection multiplexer (§2, §5): reads the 8-byte magic off the wire once *per request
//! cycle*, then drives exactly one request through whichever codec that magic names, before
//! looping back to read the next request's magic -- mirroring the reference client
//! (`original_source/mprpc/client_simple.py`), which prepends its magic on every call, not just the
//! connection's first.

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::arbiter::SendArbiter;
use crate::codec::{binary, pickled, strings, uri};
use crate::error::{Error, ProtocolError};
use crate::frame::{self, BinaryDecoder, STRINGS_HEADER_SIZE, URIHTTP_REQUEST_SIZE};
use crate::handler::{resolve, MethodTable, Outcome};
use crate::message::Request;
use crate::text_encoding::TextEncoding;
use crate::value::Value;

/// The 8-byte magic prefixes (§2.1) that select a wire codec. Each is ASCII, colon-terminated,
/// padded to 8 bytes -- `MSGPACK:`, `PICKLES:`, `STRINGS:`, `URIHTTP:`.
pub const MAGIC_BINARY: &[u8; 8] = b"MSGPACK:";
pub const MAGIC_PICKLED: &[u8; 8] = b"PICKLES:";
pub const MAGIC_STRINGS: &[u8; 8] = b"STRINGS:";
pub const MAGIC_URI: &[u8; 8] = b"URIHTTP:";

/// Magics reserved by the source for codecs this implementation does not carry forward (§2.1,
/// Non-goals). A connection that opens with one of these is told so and dropped, rather than
/// silently misinterpreted as codec B.
const RESERVED_MAGICS: &[&[u8; 8]] = &[
    b"UNKOWNS:",
    b"FILEOBJ:",
    b"BUFFERS:",
    b"JSONSTR:",
    b"BSONSTR:",
];

/// What a per-request runner returns once it has handled exactly one request cycle.
enum Disposition {
    /// Keep serving: go back to the top of the connection loop and read the next magic.
    Continue,
    /// The peer disconnected cleanly (EOF) before or during this request cycle.
    Disconnect,
}

/// One live connection, multiplexed across whichever codec its opening magic selected.
///
/// `S` is the underlying transport; callers drive it over a `TcpStream` in production and over an
/// in-memory duplex pipe in tests.
pub struct Connection<S> {
    stream: S,
    peer_addr: Option<SocketAddr>,
    arbiter: SendArbiter,
    binary_decoder: BinaryDecoder,
    text_encoding: TextEncoding,
}

impl<S: Read + Write> Connection<S> {
    pub fn new(stream: S, peer_addr: Option<SocketAddr>, text_encoding: TextEncoding) -> Self {
        Self {
            stream,
            peer_addr,
            arbiter: SendArbiter::new(),
            binary_decoder: BinaryDecoder::new(),
            text_encoding,
        }
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Reads `n` bytes directly off the underlying stream, bypassing codec framing. Exposed to
    /// handler methods that need to consume a request body the registration table's closure
    /// signature doesn't carry (§4.8).
    pub fn read(&mut self, n: usize) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.stream.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Writes raw bytes directly to the underlying stream, serialized against the connection's
    /// own response writes by the same arbiter (§4.7-§4.8).
    pub fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.arbiter.send(&mut self.stream, bytes)
    }

    /// Drives the connection to completion: reads the 8-byte magic, dispatches exactly one
    /// request cycle through whichever codec it named, then loops back to read the *next*
    /// request's magic (§4.1 steps 3/4), until the peer disconnects or a fatal I/O error occurs.
    pub fn serve(mut self, table: Arc<MethodTable<S>>) -> Result<(), Error> {
        loop {
            let magic = match frame::read_exact_or_eof(&mut self.stream, 8)? {
                Some(bytes) => bytes,
                None => {
                    debug!("peer {:?} disconnected before sending a magic", self.peer_addr);
                    return Ok(());
                }
            };
            let magic: [u8; 8] =
                magic.try_into().expect("read_exact_or_eof returns exactly n bytes");

            if let Some(reserved) = RESERVED_MAGICS.iter().find(|m| ***m == magic) {
                warn!(
                    "peer {:?} requested reserved codec {:?}",
                    self.peer_addr,
                    String::from_utf8_lossy(reserved.as_slice())
                );
                return Err(Error::Protocol(ProtocolError::ReservedMagic(magic)));
            }

            trace!(
                "peer {:?} opened a request cycle with magic {:?}",
                self.peer_addr,
                String::from_utf8_lossy(&magic)
            );

            let disposition = if magic == *MAGIC_PICKLED {
                self.run_pickled_once(&table)?
            } else if magic == *MAGIC_STRINGS {
                self.run_strings_once(&table)?
            } else if magic == *MAGIC_URI {
                self.run_uri_once(&table)?
            } else {
                // Unrecognized, non-reserved magics fall back to codec B, matching the source's
                // behavior of defaulting to its msgpack unpacker whenever the leading bytes don't
                // match one of its other known prefixes -- the 8 bytes already read are really the
                // start of a msgpack value and must be fed back into the decoder.
                if magic != *MAGIC_BINARY {
                    self.binary_decoder.feed(&magic);
                }
                self.run_binary_once(&table)?
            };

            match disposition {
                Disposition::Continue => continue,
                Disposition::Disconnect => return Ok(()),
            }
        }
    }

    fn call_method(
        &mut self,
        table: &MethodTable<S>,
        request: &Request,
    ) -> Result<Outcome, (i64, String)> {
        let method = match resolve(table, &request.method_name) {
            Ok(m) => m,
            Err(e) => return Err((request.msg_id, e.to_string())),
        };
        method(&request.args, &request.kwargs, self).map_err(|e| (request.msg_id, e))
    }

    /// Handles exactly one codec-B request cycle: the binary decoder is connection state
    /// (§4.2's "persistent per connection" note), so bytes fed in while resolving a prior
    /// fallback-magic or left over after this frame stay buffered for the *next* cycle -- but
    /// this call returns as soon as one request has been answered, handing control back to
    /// [`Self::serve`] to read the next cycle's magic.
    fn run_binary_once(&mut self, table: &Arc<MethodTable<S>>) -> Result<Disposition, Error> {
        loop {
            match self.binary_decoder.try_decode() {
                Ok(Some(value)) => {
                    match binary::decode_request(value) {
                        Ok(request) => {
                            let outcome = self.call_method(table, &request);
                            self.respond_binary(&request, outcome)?;
                        }
                        // A decode error below the frame boundary (wrong arity/tag) never
                        // recovered a msg_id, so it is reported against msg_id 0 (§4.9) and the
                        // connection keeps serving -- unlike codecs S/U, whose fixed framing makes
                        // a bad frame unrecoverable.
                        Err(e) => {
                            let frame = binary::encode_response(0, Some(&e.to_string()), Value::Nil);
                            self.arbiter.send(&mut self.stream, &frame)?;
                        }
                    }
                    return Ok(Disposition::Continue);
                }
                Ok(None) => {}
                Err(e) => {
                    let frame = binary::encode_response(0, Some(&e.to_string()), Value::Nil);
                    self.arbiter.send(&mut self.stream, &frame)?;
                    // There is no reliable resynchronization point within a malformed frame's
                    // bytes; drop them and keep the connection open for the next request cycle.
                    self.binary_decoder.clear();
                    return Ok(Disposition::Continue);
                }
            }

            let chunk = match frame::read_some(&mut self.stream)? {
                Some(bytes) => bytes,
                None => return Ok(Disposition::Disconnect),
            };
            self.binary_decoder.feed(&chunk);
        }
    }

    fn respond_binary(
        &mut self,
        request: &Request,
        outcome: Result<Outcome, (i64, String)>,
    ) -> Result<(), Error> {
        let frame = match outcome {
            Ok(Outcome::Value(v)) => binary::encode_response(request.msg_id, None, v),
            Ok(Outcome::Stream(mut r)) => {
                let mut buf = Vec::new();
                r.read_to_end(&mut buf)?;
                binary::encode_response(request.msg_id, None, Value::Bytes(buf))
            }
            Err((msg_id, e)) => binary::encode_response(msg_id, Some(&e), Value::Nil),
        };
        self.arbiter.send(&mut self.stream, &frame)?;
        Ok(())
    }

    /// Handles exactly one codec-P request cycle: one `recv` is assumed to carry one complete
    /// pickled request (§4.3).
    fn run_pickled_once(&mut self, table: &Arc<MethodTable<S>>) -> Result<Disposition, Error> {
        let chunk = match frame::read_some(&mut self.stream)? {
            Some(bytes) => bytes,
            None => return Ok(Disposition::Disconnect),
        };

        let request = match pickled::decode_request(&chunk) {
            Ok(r) => r,
            // Mirrors codec B (§4.9): a decode failure never recovered a msg_id, so it is
            // reported against msg_id 0 and the connection keeps serving.
            Err(e) => {
                let frame = pickled::encode_response(0, Some(&e.to_string()), Value::Nil);
                self.arbiter.send(&mut self.stream, &frame)?;
                return Ok(Disposition::Continue);
            }
        };
        let outcome = self.call_method(table, &request);
        let frame = match outcome {
            Ok(Outcome::Value(v)) => pickled::encode_response(request.msg_id, None, v),
            Ok(Outcome::Stream(mut r)) => {
                let mut buf = Vec::new();
                r.read_to_end(&mut buf)?;
                pickled::encode_response(request.msg_id, None, Value::Bytes(buf))
            }
            Err((msg_id, e)) => pickled::encode_response(msg_id, Some(&e), Value::Nil),
        };
        self.arbiter.send(&mut self.stream, &frame)?;
        Ok(Disposition::Continue)
    }

    /// Handles exactly one codec-S request cycle: one 30-byte header (§4.4), plus whatever body
    /// the handler chooses to consume via `read(n)`.
    fn run_strings_once(&mut self, table: &Arc<MethodTable<S>>) -> Result<Disposition, Error> {
        let header = match frame::read_exact_or_eof(&mut self.stream, STRINGS_HEADER_SIZE)? {
            Some(bytes) => bytes,
            None => return Ok(Disposition::Disconnect),
        };
        let header: [u8; STRINGS_HEADER_SIZE] =
            header.try_into().expect("read_exact_or_eof returns exactly n bytes");

        let request = match strings::decode_request(&header, self.text_encoding) {
            Ok(r) => r,
            Err(e) => return Err(Error::Protocol(e)),
        };
        let outcome = self.call_method(table, &request);
        self.respond_strings_or_uri(request.msg_id, outcome)?;
        Ok(Disposition::Continue)
    }

    /// Handles exactly one codec-U request cycle: one 512-byte payload (§4.5).
    fn run_uri_once(&mut self, table: &Arc<MethodTable<S>>) -> Result<Disposition, Error> {
        let payload = match frame::read_exact_or_eof(&mut self.stream, URIHTTP_REQUEST_SIZE)? {
            Some(bytes) => bytes,
            None => return Ok(Disposition::Disconnect),
        };

        let request = match uri::decode_request(&payload, self.text_encoding) {
            Ok(r) => r,
            Err(e) => return Err(Error::Protocol(e)),
        };
        let outcome = self.call_method(table, &request);
        self.respond_strings_or_uri(request.msg_id, outcome)?;
        Ok(Disposition::Continue)
    }

    /// Codecs S and U share the same 30-byte response envelope (§4.4, §4.5): success carries an
    /// empty error field with the result sent separately via `write`, failure carries the error
    /// message in the 21-byte field.
    fn respond_strings_or_uri(
        &mut self,
        msg_id: i64,
        outcome: Result<Outcome, (i64, String)>,
    ) -> Result<(), Error> {
        match outcome {
            Ok(Outcome::Value(v)) => {
                let header = strings::encode_header(msg_id, None, self.text_encoding);
                self.arbiter.send(&mut self.stream, &header)?;
                if !v.is_nil() {
                    let body = v.to_wire_bytes(self.text_encoding);
                    self.arbiter.send(&mut self.stream, &body)?;
                }
            }
            Ok(Outcome::Stream(mut r)) => {
                let header = strings::encode_header(msg_id, None, self.text_encoding);
                self.arbiter.send(&mut self.stream, &header)?;
                let mut buf = Vec::new();
                r.read_to_end(&mut buf)?;
                self.arbiter.send(&mut self.stream, &buf)?;
            }
            Err((id, e)) => {
                let header = strings::encode_header(id, Some(&e), self.text_encoding);
                self.arbiter.send(&mut self.stream, &header)?;
            }
        }
        Ok(())
    }
}
