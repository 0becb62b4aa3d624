//! `EvaluationContext` (§4.5): everything an expression evaluation is run
//! against besides the expression itself.

use crate::store::{EntityStore, EntityStoreSnapshot};
use crate::value::Value;
use isl_ast::Domain;
use std::collections::HashMap;

/// Bundles `input`/`result`/`error`/the entity store/an optional `old`
/// snapshot/the enclosing domain/the clock/and bound variables — every
/// source of data an expression can reference (§4.5).
///
/// Borrows its store and domain rather than owning them: a single
/// `EvaluationContext` is built once per check run and handed to many
/// `evaluate` calls (preconditions, postconditions, invariants all share
/// one), so cloning the store or domain per call would be wasteful and is
/// never required — nothing here mutates them (§5).
pub struct EvaluationContext<'a> {
    pub input: Value,
    pub result: Option<Value>,
    pub error: Option<Value>,
    pub store: &'a dyn EntityStore,
    pub old_snapshot: Option<&'a EntityStoreSnapshot>,
    pub domain: &'a Domain,
    pub now: Value,
    pub variables: HashMap<String, Value>,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(domain: &'a Domain, store: &'a dyn EntityStore) -> Self {
        Self {
            input: Value::map([]),
            result: None,
            error: None,
            store,
            old_snapshot: None,
            domain,
            now: Value::Number(0.0),
            variables: HashMap::new(),
        }
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_error(mut self, error: Value) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_now(mut self, now: Value) -> Self {
        self.now = now;
        self
    }

    pub fn with_old_snapshot(mut self, snapshot: &'a EntityStoreSnapshot) -> Self {
        self.old_snapshot = Some(snapshot);
        self
    }

    /// Returns a context identical to this one but with `name` bound to
    /// `value` in `variables` — used to push a quantifier's loop variable
    /// or a scenario `given` binding without disturbing the parent scope.
    pub(crate) fn with_binding(&self, name: &str, value: Value) -> EvaluationContext<'_> {
        let mut variables = self.variables.clone();
        variables.insert(name.to_string(), value);
        EvaluationContext {
            input: self.input.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            store: self.store,
            old_snapshot: self.old_snapshot,
            domain: self.domain,
            now: self.now.clone(),
            variables,
        }
    }

    /// Returns a context that reads through `snapshot` instead of the live
    /// store, for `old(expr)` sub-evaluation (§4.5). The snapshot itself
    /// carries no further `old` state, matching the glossary's description
    /// of a snapshot as a point-in-time copy rather than a chain.
    pub(crate) fn with_snapshot_store<'s>(&self, snapshot: &'s EntityStoreSnapshot) -> EvaluationContext<'s>
    where
        's: 'a,
    {
        EvaluationContext {
            input: self.input.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            store: snapshot,
            old_snapshot: None,
            domain: self.domain,
            now: self.now.clone(),
            variables: self.variables.clone(),
        }
    }
}
