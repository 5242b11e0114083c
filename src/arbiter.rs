// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The per-connection send arbiter (§4.7): a mutual-exclusion primitive guaranteeing that
//! concurrent logical writes to one socket are serialized as whole frames.

use std::io::{self, Write};
use std::sync::Mutex;

/// Serializes writes to a single stream so that two logical writers (the runner's response write
/// and a handler's out-of-band `write(bytes)`) never interleave mid-frame.
///
/// In a strictly single-threaded cooperative runtime the arbiter degenerates to an uncontended
/// lock/unlock pair around every write, which is indistinguishable in cost from its absence.
pub struct SendArbiter {
    lock: Mutex<()>,
}

impl SendArbiter {
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(()),
        }
    }

    /// Acquire the arbiter, write the whole frame, then release -- on every exit path, including
    /// a failed or partial write.
    pub fn send<W: Write>(&self, stream: &mut W, frame: &[u8]) -> io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        stream.write_all(frame)
    }
}

impl Default for SendArbiter {
    fn default() -> Self {
        Self::new()
    }
}
