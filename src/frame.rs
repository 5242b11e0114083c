// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The frame reader (§2.2): reads exactly the bytes each codec's framing demands from the stream,
//! and -- for codec B only -- keeps a persistent decode buffer across frames, mirroring the source
//! unpacker's `feed`/`next` cycle (`self._unpacker.feed(data); req = self._unpacker.next()`).

use std::io::{self, Cursor, Read};

/// Maximum chunk size read per `recv` call, matching the source's `SOCKET_RECV_SIZE`.
pub const SOCKET_RECV_SIZE: usize = 1024 * 1024;

/// Fixed width of the codec-S/U response and codec-S request header (§4.4).
pub const STRINGS_HEADER_SIZE: usize = 30;

/// Fixed width of a codec-U request payload (§4.5).
pub const URIHTTP_REQUEST_SIZE: usize = 512;

/// Reads exactly `n` bytes from `stream`.
///
/// Returns `Ok(None)` if the stream was at EOF *before any bytes were read* (a clean disconnect
/// between requests). Returns `Err` if EOF is hit mid-read (a partial, unrecoverable frame).
pub fn read_exact_or_eof<S: Read>(stream: &mut S, n: usize) -> io::Result<Option<Vec<u8>>> {
    let mut buf = vec![0u8; n];
    let mut filled = 0;
    while filled < n {
        let read = stream.read(&mut buf[filled..])?;
        if read == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed mid-frame",
            ));
        }
        filled += read;
    }
    Ok(Some(buf))
}

/// Reads whatever is available in a single `read` call, up to `SOCKET_RECV_SIZE` bytes, mirroring
/// the source's `sock.recv(SOCKET_RECV_SIZE)`. Unlike [`read_exact_or_eof`], this does not block
/// waiting for a specific length -- codec B's frames are self-describing, so the decoder is fed
/// whatever arrives and re-tried. Returns `Ok(None)` on a clean EOF.
pub fn read_some<S: Read>(stream: &mut S) -> io::Result<Option<Vec<u8>>> {
    let mut buf = vec![0u8; SOCKET_RECV_SIZE];
    let read = stream.read(&mut buf)?;
    if read == 0 {
        return Ok(None);
    }
    buf.truncate(read);
    Ok(Some(buf))
}

/// A persistent streaming decoder for codec B's self-describing binary frames. Bytes beyond the
/// current request remain buffered for the next decode cycle, exactly as the source's
/// `msgpack.Unpacker` instance is held for the lifetime of the connection.
#[derive(Default)]
pub struct BinaryDecoder {
    buf: Vec<u8>,
}

impl BinaryDecoder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Drops all currently-buffered bytes. Used after a genuinely malformed (not merely
    /// truncated) frame, since there is no reliable resynchronization point within the buffer.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Tries to decode exactly one complete MessagePack value from the buffered bytes.
    ///
    /// Returns `Ok(None)` when the buffer doesn't yet hold a complete value (more `feed`s are
    /// needed). Returns `Err` for genuinely malformed data (not merely truncated).
    pub fn try_decode(&mut self) -> Result<Option<rmpv::Value>, rmpv::decode::Error> {
        let mut cursor = Cursor::new(self.buf.as_slice());
        match rmpv::decode::read_value(&mut cursor) {
            Ok(value) => {
                let consumed = cursor.position() as usize;
                self.buf.drain(..consumed);
                Ok(Some(value))
            }
            Err(e) if is_truncated(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn is_truncated(err: &rmpv::decode::Error) -> bool {
    // rmpv surfaces a short read as an io::ErrorKind::UnexpectedEof wrapped inside the decode
    // error variants; anything else is a genuine malformed-frame error.
    let io_err: Option<&io::Error> = match err {
        rmpv::decode::Error::InvalidMarkerRead(e) => Some(e),
        rmpv::decode::Error::InvalidDataRead(e) => Some(e),
    };
    matches!(io_err.map(|e| e.kind()), Some(io::ErrorKind::UnexpectedEof))
}
