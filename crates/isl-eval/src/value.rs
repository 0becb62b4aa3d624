//! Runtime values the evaluator reads from `input`/`result`/the entity
//! store and produces while folding an expression tree. Distinct from
//! `isl_ast::Expr`'s *literal* nodes: `Value` is data, `Expr` is syntax.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A runtime value. `Map` uses a `BTreeMap` rather than insertion-ordered
/// storage: the evaluator only ever builds criteria maps and reads entity
/// instances, never prints a map back out in source order the way the
/// unparser does for AST map literals, so deterministic key order (for
/// `deep_eq`/`Debug` stability) is all that matters here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Duration { value: f64, unit: String },
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn map(entries: impl IntoIterator<Item = (String, Value)>) -> Value {
        Value::Map(entries.into_iter().collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Duration { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Duration { value, unit } => write!(f, "{value}.{unit}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// General-purpose truthiness for a resolved value, used by `Member`,
/// `Identifier`, and `Index` resolution (§4.5: "it's the property's
/// truthiness"). Distinct from [`crate::adapter::default_is_valid`], which
/// answers "is this value present/well-formed" rather than "is this value's
/// own boolean sense true" — `is_valid("false")` and the truthiness of the
/// boolean value `false` are different questions. Not itself specified
/// beyond literal nodes (§4.5's literal bullet); extended here the same way
/// literals are: null and boolean-false are the only falsy shapes, recorded
/// as an open-question decision in DESIGN.md.
pub fn truthiness(value: &Value) -> crate::tristate::TriState {
    match value {
        Value::Null => crate::tristate::TriState::False,
        Value::Bool(b) => crate::tristate::TriState::from_bool(*b),
        _ => crate::tristate::TriState::True,
    }
}

/// An entity record returned by the [`crate::store::EntityStore`]. Entity
/// instances are just maps from field name to value; no dedicated struct is
/// needed since the evaluator never knows an entity's declared shape beyond
/// what the store hands back.
pub type EntityInstance = Value;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_literal_rule_for_boolean_and_null() {
        assert_eq!(truthiness(&Value::Bool(true)), crate::tristate::TriState::True);
        assert_eq!(truthiness(&Value::Bool(false)), crate::tristate::TriState::False);
        assert_eq!(truthiness(&Value::Null), crate::tristate::TriState::False);
    }

    #[test]
    fn truthiness_of_other_shapes_is_true() {
        assert_eq!(truthiness(&Value::String(String::new())), crate::tristate::TriState::True);
        assert_eq!(truthiness(&Value::Number(0.0)), crate::tristate::TriState::True);
        assert_eq!(truthiness(&Value::List(vec![])), crate::tristate::TriState::True);
    }

    #[test]
    fn map_builder_and_get() {
        let v = Value::map([("id".to_string(), Value::String("u1".to_string()))]);
        assert_eq!(v.get("id"), Some(&Value::String("u1".to_string())));
        assert_eq!(v.get("missing"), None);
    }

    #[test]
    fn deep_equality_ignores_map_insertion_order() {
        let a = Value::map([
            ("a".to_string(), Value::Number(1.0)),
            ("b".to_string(), Value::Number(2.0)),
        ]);
        let b = Value::map([
            ("b".to_string(), Value::Number(2.0)),
            ("a".to_string(), Value::Number(1.0)),
        ]);
        assert_eq!(a, b);
    }
}
