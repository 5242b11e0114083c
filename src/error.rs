// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::fmt;

/// The possible errors that can arise while decoding, dispatching, or replying to a request.
///
/// These map onto the four error kinds of the wire protocol (see `ErrorKind`), not onto the four
/// codecs: every codec can raise every kind.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Wrong frame shape, wrong leading tag, wrong arity, or a reserved magic.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The requested method does not exist, is private, or is not callable.
    #[error("{0}")]
    MethodNotFound(String),

    /// Errors returned by I/O failures. These always terminate the connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Protocol(_) => ErrorKind::Protocol,
            Error::MethodNotFound(_) => ErrorKind::MethodNotFound,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

/// The error kinds from the wire protocol's error-handling design (distinct from handler errors,
/// which are reported to the client but never constructed as an `Error` value — they are caught at
/// the dispatch boundary and stringified directly into the response envelope).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Protocol,
    MethodNotFound,
    Handler,
    Io,
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed request: {0}")]
    Decode(String),

    #[error("wrong request tag: expected {expected}, got {got}")]
    WrongTag { expected: u8, got: i64 },

    #[error("wrong arity: expected {expected} elements, got {got}")]
    WrongArity { expected: usize, got: usize },

    #[error("reserved magic {0:?} is not implemented")]
    ReservedMagic([u8; 8]),

    #[error("pickle codec is disabled in this build")]
    PickleDisabled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Protocol => "protocol",
            ErrorKind::MethodNotFound => "method-not-found",
            ErrorKind::Handler => "handler",
            ErrorKind::Io => "io",
        };
        write!(f, "{s}")
    }
}
