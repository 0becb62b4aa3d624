//! The entity store contract the evaluator is driven against (§5, §6).
//!
//! The mock entity store and any host-specific implementation loader are
//! out-of-scope external collaborators (§1) — this module defines only the
//! trait the evaluator calls through, plus the read-only snapshot type
//! `Old` evaluates against.

use crate::value::EntityInstance;
use std::collections::BTreeMap;

/// Read-only criteria/store contract consumed by the evaluator. Only the
/// five read operations named in §6 are exposed here; `create`/`update`/
/// `delete` belong to the host's own store type and are never reachable
/// through this trait, so there is no mutation path for the evaluator (or
/// an `Old` snapshot) to accidentally call (§5).
pub trait EntityStore: Send + Sync {
    fn get_all(&self, entity_name: &str) -> Vec<EntityInstance>;

    /// `criteria` is `None` for an unconditional existence check (any
    /// instance at all) and `Some` for a filtered one.
    fn exists(&self, entity_name: &str, criteria: Option<&crate::value::Value>) -> bool;

    fn lookup(&self, entity_name: &str, criteria: &crate::value::Value) -> Option<EntityInstance>;

    fn count(&self, entity_name: &str, criteria: Option<&crate::value::Value>) -> usize;

    /// Captures an independently readable, immutable view of the store for
    /// `old(expr)` to evaluate against.
    fn snapshot(&self) -> EntityStoreSnapshot;
}

/// An immutable, copy-on-write-by-construction view of an entity store's
/// contents, captured before a behavior's execution. Implements
/// [`EntityStore`] itself so `old(expr)`'s sub-evaluation can run against it
/// with exactly the same read surface as the live store (§4.5, §9
/// "cyclic references" — there is no pointer back to the live store, only
/// the data copied in at snapshot time).
#[derive(Debug, Clone, Default)]
pub struct EntityStoreSnapshot {
    entities: BTreeMap<String, Vec<EntityInstance>>,
}

impl EntityStoreSnapshot {
    pub fn new(entities: BTreeMap<String, Vec<EntityInstance>>) -> Self {
        Self { entities }
    }

    fn matches(criteria: &crate::value::Value, instance: &EntityInstance) -> bool {
        let Some(criteria_map) = criteria.as_map() else {
            return false;
        };
        criteria_map.iter().all(|(k, v)| instance.get(k) == Some(v))
    }
}

impl EntityStore for EntityStoreSnapshot {
    fn get_all(&self, entity_name: &str) -> Vec<EntityInstance> {
        self.entities.get(entity_name).cloned().unwrap_or_default()
    }

    fn exists(&self, entity_name: &str, criteria: Option<&crate::value::Value>) -> bool {
        let Some(instances) = self.entities.get(entity_name) else {
            return false;
        };
        match criteria {
            None => !instances.is_empty(),
            Some(c) => instances.iter().any(|i| Self::matches(c, i)),
        }
    }

    fn lookup(&self, entity_name: &str, criteria: &crate::value::Value) -> Option<EntityInstance> {
        self.entities.get(entity_name)?.iter().find(|i| Self::matches(criteria, i)).cloned()
    }

    fn count(&self, entity_name: &str, criteria: Option<&crate::value::Value>) -> usize {
        let Some(instances) = self.entities.get(entity_name) else {
            return 0;
        };
        match criteria {
            None => instances.len(),
            Some(c) => instances.iter().filter(|i| Self::matches(c, i)).count(),
        }
    }

    fn snapshot(&self) -> EntityStoreSnapshot {
        self.clone()
    }
}

/// An always-empty store, useful as a default/placeholder when a caller has
/// no entities to back `exists`/`lookup` calls with (e.g. pure-expression
/// unit tests that never touch the entity store).
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyStore;

impl EntityStore for EmptyStore {
    fn get_all(&self, _entity_name: &str) -> Vec<EntityInstance> {
        Vec::new()
    }

    fn exists(&self, _entity_name: &str, _criteria: Option<&crate::value::Value>) -> bool {
        false
    }

    fn lookup(&self, _entity_name: &str, _criteria: &crate::value::Value) -> Option<EntityInstance> {
        None
    }

    fn count(&self, _entity_name: &str, _criteria: Option<&crate::value::Value>) -> usize {
        0
    }

    fn snapshot(&self) -> EntityStoreSnapshot {
        EntityStoreSnapshot::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn sample_store() -> EntityStoreSnapshot {
        let mut entities = BTreeMap::new();
        entities.insert(
            "User".to_string(),
            vec![Value::map([
                ("id".to_string(), Value::String("u1".to_string())),
                ("active".to_string(), Value::Bool(true)),
            ])],
        );
        EntityStoreSnapshot::new(entities)
    }

    #[test]
    fn exists_without_criteria_checks_non_emptiness() {
        let store = sample_store();
        assert!(store.exists("User", None));
        assert!(!store.exists("Order", None));
    }

    #[test]
    fn lookup_matches_by_criteria() {
        let store = sample_store();
        let criteria = Value::map([("id".to_string(), Value::String("u1".to_string()))]);
        assert!(store.lookup("User", &criteria).is_some());
        let miss = Value::map([("id".to_string(), Value::String("nope".to_string()))]);
        assert!(store.lookup("User", &miss).is_none());
    }

    #[test]
    fn count_respects_criteria() {
        let store = sample_store();
        assert_eq!(store.count("User", None), 1);
        let criteria = Value::map([("active".to_string(), Value::Bool(false))]);
        assert_eq!(store.count("User", Some(&criteria)), 0);
    }

    #[test]
    fn empty_store_never_finds_anything() {
        let store = EmptyStore;
        assert!(!store.exists("User", None));
        assert!(store.get_all("User").is_empty());
    }
}
