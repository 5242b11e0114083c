// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The `pack_encoding`/`unpack_encoding` character encodings from §6's exposed factory signature.
//! MessagePack and the pickled codec carry their own text encoding, so this only affects how the
//! codec-S/U ASCII fields are interpreted.

/// Character encoding used to decode/encode the text fields of codecs S and U.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl TextEncoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }

    pub fn encode(self, s: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => s.as_bytes().to_vec(),
            TextEncoding::Latin1 => s.chars().map(|c| c as u8).collect(),
        }
    }
}
