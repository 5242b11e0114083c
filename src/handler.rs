// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

//! The method resolver (§4.6) and the registration table that stands in for the source's
//! reflective `getattr(self, method_name)` lookup, per the "Reflective method dispatch" design
//! note: a builder that maps method-name strings to typed wrappers over `(args, kwargs) -> result`.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use crate::connection::Connection;
use crate::error::Error;
use crate::value::Value;

/// What a handler method may return: an ordinary value, or a streaming result (§4.8) that the
/// codec S/U encoders will drain directly onto the wire without re-framing.
pub enum Outcome {
    Value(Value),
    Stream(Box<dyn Read + Send>),
}

impl From<Value> for Outcome {
    fn from(v: Value) -> Self {
        Outcome::Value(v)
    }
}

/// A single registered RPC endpoint. `conn` gives the implementation access to the stream escape
/// hatches (`read`/`write`) described in §4.8.
pub type MethodFn<S> = dyn Fn(&[Value], &BTreeMap<String, Value>, &mut Connection<S>) -> Result<Outcome, String>
    + Send
    + Sync;

/// Maps method names to their implementations. Built once per handler and shared (via `Arc`)
/// across every connection driven by that handler.
pub struct MethodTable<S> {
    methods: BTreeMap<String, Arc<MethodFn<S>>>,
}

impl<S> Default for MethodTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> MethodTable<S> {
    /// A fresh table already carries the implicit `test_connect` liveness probe (§4.6); callers
    /// may `register("test_connect", ...)` over it to replace the default.
    pub fn new() -> Self {
        let mut methods: BTreeMap<String, Arc<MethodFn<S>>> = BTreeMap::new();
        methods.insert(
            "test_connect".to_string(),
            Arc::new(|_args, _kwargs, _conn| Ok(Outcome::Value(Value::Str("1".to_string())))),
        );
        Self { methods }
    }

    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&[Value], &BTreeMap<String, Value>, &mut Connection<S>) -> Result<Outcome, String>
            + Send
            + Sync
            + 'static,
    {
        self.methods.insert(name.into(), Arc::new(f));
        self
    }

    fn get(&self, name: &str) -> Option<Arc<MethodFn<S>>> {
        self.methods.get(name).cloned()
    }
}

/// Resolve `method_name` against `table`, applying the three rules of §4.6 in order. All three
/// failure modes collapse to the same `MethodNotFound` error, carrying the offending name.
pub fn resolve<S>(table: &MethodTable<S>, method_name: &str) -> Result<Arc<MethodFn<S>>, Error> {
    if method_name.is_empty() || method_name.starts_with('_') {
        return Err(Error::MethodNotFound(format!(
            "Method not found: {method_name}"
        )));
    }

    table
        .get(method_name)
        .ok_or_else(|| Error::MethodNotFound(format!("Method not found: {method_name}")))
}
