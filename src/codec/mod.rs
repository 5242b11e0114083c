// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! Codec primitives (§4.2-4.5): pure encode/decode functions, no I/O. Each submodule owns one
//! codec's framing and tuple shape.

pub mod binary;
pub mod pickled;
pub mod strings;
pub mod uri;
