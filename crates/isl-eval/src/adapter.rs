//! The pluggable `ExpressionAdapter` interface (§4.5) the evaluator calls
//! out to for domain primitives it cannot compute from syntax alone, plus
//! the default adapter §4.5 specifies in full.

use crate::store::EntityStore;
use crate::tristate::TriState;
use crate::value::Value;

/// `length(value)`'s result: either a known size or `Unknown` when the
/// value's shape has no defined length (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthResult {
    Known(usize),
    Unknown,
}

/// `lookup(entity, criteria)`'s result. Distinct from a bare
/// `Option<Value>` because "no instance matched" (a concrete, provable
/// absence) and "the store could not answer" (an information failure) map
/// to different `TriState`s downstream — `False` vs. `Unknown` — and a
/// two-armed `Option` cannot tell them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Value),
    NotFound,
    Unknown,
}

/// Domain-primitive operations the expression language defers to a host
/// adapter for, rather than baking in. `is_valid`/`length` are pure
/// functions of a `Value`; `exists`/`lookup` additionally take the entity
/// store, since they resolve against entity instances rather than ordinary
/// data.
pub trait ExpressionAdapter: Send + Sync {
    fn is_valid(&self, value: &Value) -> TriState;
    fn length(&self, value: &Value) -> LengthResult;
    fn exists(&self, store: &dyn EntityStore, entity_name: &str, criteria: Option<&Value>) -> TriState;
    fn lookup(&self, store: &dyn EntityStore, entity_name: &str, criteria: &Value) -> Lookup;
}

/// The default adapter §4.5 specifies: `is_valid` is "non-empty strings,
/// non-NaN finite numbers, non-empty arrays, non-null booleans, objects";
/// `length` covers strings (codepoints) and arrays; `exists`/`lookup`
/// delegate straight to the store, treated as always-available (a host
/// that can genuinely fail to answer should supply its own adapter that
/// maps that failure to `Unknown` — this default has no such failure mode
/// to model).
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAdapter;

impl ExpressionAdapter for DefaultAdapter {
    fn is_valid(&self, value: &Value) -> TriState {
        TriState::from_bool(match value {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => n.is_finite(),
            Value::Duration { value, .. } => value.is_finite(),
            Value::List(items) => !items.is_empty(),
            Value::Bool(_) | Value::Map(_) => true,
        })
    }

    fn length(&self, value: &Value) -> LengthResult {
        match value {
            Value::String(s) => LengthResult::Known(s.chars().count()),
            Value::List(items) => LengthResult::Known(items.len()),
            _ => LengthResult::Unknown,
        }
    }

    fn exists(&self, store: &dyn EntityStore, entity_name: &str, criteria: Option<&Value>) -> TriState {
        TriState::from_bool(store.exists(entity_name, criteria))
    }

    fn lookup(&self, store: &dyn EntityStore, entity_name: &str, criteria: &Value) -> Lookup {
        match store.lookup(entity_name, criteria) {
            Some(v) => Lookup::Found(v),
            None => Lookup::NotFound,
        }
    }
}

/// A process-wide default adapter instance, so call sites that just want
/// "the default behavior" (most of [`crate::EvaluationOptions::default`])
/// don't need to construct one.
pub static DEFAULT_ADAPTER: DefaultAdapter = DefaultAdapter;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EntityStoreSnapshot;

    #[test]
    fn is_valid_matches_spec_examples() {
        let a = DefaultAdapter;
        assert_eq!(a.is_valid(&Value::String("x".into())), TriState::True);
        assert_eq!(a.is_valid(&Value::String(String::new())), TriState::False);
        assert_eq!(a.is_valid(&Value::Number(1.0)), TriState::True);
        assert_eq!(a.is_valid(&Value::Number(f64::NAN)), TriState::False);
        assert_eq!(a.is_valid(&Value::List(vec![])), TriState::False);
        assert_eq!(a.is_valid(&Value::Bool(false)), TriState::True);
        assert_eq!(a.is_valid(&Value::Null), TriState::False);
    }

    #[test]
    fn length_known_for_strings_and_arrays_else_unknown() {
        let a = DefaultAdapter;
        assert_eq!(a.length(&Value::String("hé".into())), LengthResult::Known(2));
        assert_eq!(a.length(&Value::List(vec![Value::Null, Value::Null])), LengthResult::Known(2));
        assert_eq!(a.length(&Value::Number(1.0)), LengthResult::Unknown);
    }

    #[test]
    fn lookup_distinguishes_not_found_from_found() {
        let a = DefaultAdapter;
        let store = EntityStoreSnapshot::default();
        let criteria = Value::map([("id".to_string(), Value::String("x".into()))]);
        assert_eq!(a.lookup(&store, "User", &criteria), Lookup::NotFound);
    }
}
