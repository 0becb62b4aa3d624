//! Black-box end-to-end scenarios straight out of the contract this crate
//! implements: a minimal domain parse, round-trip stability, fuzzy
//! auto-fixing, a failing precondition, a postcondition driven by `old`,
//! and tri-state propagation under an adapter that cannot answer `exists`.

use isl::{
    check_invariants, check_preconditions, evaluate, parse, parse_fuzzy, unparse, DefaultAdapter,
    EmptyStore, EntityStore, EvaluationContext, EvaluationOptions, Lookup, TriState, Value, DEFAULT_ADAPTER,
};

const MINIMAL: &str =
    r#"domain Minimal { version: "1.0.0" entity User { id: UUID [immutable, unique] name: String } }"#;

#[test]
fn minimal_domain_parses_with_zero_diagnostics() {
    let out = parse(MINIMAL, None);
    assert!(out.success(), "diagnostics: {:?}", out.diagnostics);
    let ast = out.ast.expect("ast");
    assert_eq!(ast.name, "Minimal");
    assert_eq!(ast.entities.len(), 1);
    assert_eq!(ast.entities[0].name, "User");
    assert_eq!(ast.entities[0].fields.len(), 2);
    assert_eq!(ast.entities[0].fields[0].name, "id");
    assert_eq!(ast.entities[0].fields[1].name, "name");
}

#[test]
fn round_trip_is_structurally_stable() {
    let ast = parse(MINIMAL, None).ast.expect("ast");
    let text = unparse(&ast);
    let reparsed = parse(&text, None).ast.expect("reparsed ast");
    assert_eq!(ast, reparsed);
}

#[test]
fn fuzzy_auto_fix_synthesises_version_and_drops_trailing_comma() {
    let src = r#"domain Auth { entity User { email: String [format: email], active: boolean, } }"#;
    let out = parse_fuzzy(src, None);
    let ast = out.ast.expect("fuzzy parse should recover an ast");
    assert_eq!(ast.entities.len(), 1);
    assert_eq!(ast.entities[0].fields.len(), 2);
    assert_eq!(ast.version, "1.0.0");
    assert!(out.warnings.iter().any(|d| d.code == "F001"));

    let text = unparse(&ast);
    let reparsed = parse(&text, None).ast.expect("unparsed fuzzy ast should strict-reparse");
    assert_eq!(ast, reparsed);
}

#[test]
fn precondition_failure_blocks_execution() {
    let src = r#"
        domain Checkout {
            version: "1.0.0"
            behavior Login {
                input { email: String }
                output { errors { } }
                pre { input.email.length > 0 }
            }
        }
    "#;
    let ast = parse(src, None).ast.expect("ast");
    let behavior = &ast.behaviors[0];
    let store = EmptyStore;
    let ctx = EvaluationContext::new(&ast, &store)
        .with_input(Value::map([("email".to_string(), Value::String(String::new()))]));
    let options = EvaluationOptions::new(&DEFAULT_ADAPTER);
    let results = check_preconditions(behavior, &ctx, &options);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].value, TriState::False);
    let reason = results[0].reason.as_deref().unwrap_or_default();
    assert!(reason.contains("0"), "reason should mention the failed bound: {reason}");
}

#[test]
fn postcondition_with_old_sees_the_pre_behavior_snapshot() {
    let src = r#"
        domain Checkout {
            version: "1.0.0"
            entity User { id: UUID failed_attempts: Int }
            behavior Login {
                input { email: String }
                output { success: Boolean }
                post success { old(User.lookup(input.email).failed_attempts) == 3 }
            }
        }
    "#;
    let ast = parse(src, None).ast.expect("ast");
    let behavior = &ast.behaviors[0];

    struct OneUserStore(Value);
    impl EntityStore for OneUserStore {
        fn get_all(&self, _entity_name: &str) -> Vec<Value> {
            vec![self.0.clone()]
        }
        fn exists(&self, _entity_name: &str, _criteria: Option<&Value>) -> bool {
            true
        }
        fn lookup(&self, _entity_name: &str, _criteria: &Value) -> Option<Value> {
            Some(self.0.clone())
        }
        fn count(&self, _entity_name: &str, _criteria: Option<&Value>) -> usize {
            1
        }
        fn snapshot(&self) -> isl::EntityStoreSnapshot {
            let mut entities = std::collections::BTreeMap::new();
            entities.insert("User".to_string(), vec![self.0.clone()]);
            isl::EntityStoreSnapshot::new(entities)
        }
    }

    // `User.lookup(input.email)`'s single positional argument builds the
    // criteria `{id: <email>}` (§4.5), so the fixture's `id` is the email
    // address itself to make that lookup match.
    let user = Value::map([
        ("id".to_string(), Value::String("a@b.com".to_string())),
        ("failed_attempts".to_string(), Value::Number(3.0)),
    ]);
    let store = OneUserStore(user);
    let snapshot = store.snapshot();
    let ctx = EvaluationContext::new(&ast, &store)
        .with_input(Value::map([("email".to_string(), Value::String("a@b.com".to_string()))]))
        .with_result(Value::Bool(true))
        .with_old_snapshot(&snapshot);
    let options = EvaluationOptions::new(&DEFAULT_ADAPTER);

    let block = behavior.post_block_for("success").expect("success postblock");
    let result = evaluate(&block.predicates[0], &ctx, &options);
    assert_eq!(result.value, TriState::True, "reason: {:?}", result.reason);
}

#[test]
fn entity_invariant_is_checked_alongside_behavior_and_domain_invariants() {
    let src = r#"
        domain Checkout {
            version: "1.0.0"
            entity User {
                id: UUID
                balance: Int
                invariants { balance >= 0 }
            }
            behavior Login {
                input { email: String }
                output { success: Boolean }
            }
        }
    "#;
    let ast = parse(src, None).ast.expect("ast");
    let behavior = &ast.behaviors[0];
    let store = EmptyStore;
    let ctx = EvaluationContext::new(&ast, &store);
    let options = EvaluationOptions::new(&DEFAULT_ADAPTER);

    let results = check_invariants(behavior, &ast, &ctx, &options);
    assert_eq!(results.len(), 1, "entity invariant should be included alongside behavior/domain invariants");
    assert_eq!(results[0].value, TriState::False);
}

#[test]
fn unknown_exists_propagates_through_implies() {
    let src = r#"
        domain Checkout {
            version: "1.0.0"
            entity User { id: UUID }
            behavior Login {
                input { email: String }
                output { success: Boolean }
                invariants { User.exists(input.email) implies input.email.length > 0 }
            }
        }
    "#;
    let ast = parse(src, None).ast.expect("ast");
    let invariant = &ast.behaviors[0].invariants[0];

    struct UnreachableAdapter;
    impl isl::ExpressionAdapter for UnreachableAdapter {
        fn is_valid(&self, value: &Value) -> TriState {
            DefaultAdapter.is_valid(value)
        }
        fn length(&self, value: &Value) -> isl::LengthResult {
            DefaultAdapter.length(value)
        }
        fn exists(&self, _store: &dyn EntityStore, _entity_name: &str, _criteria: Option<&Value>) -> TriState {
            TriState::Unknown
        }
        fn lookup(&self, _store: &dyn EntityStore, _entity_name: &str, _criteria: &Value) -> Lookup {
            Lookup::Unknown
        }
    }

    let store = EmptyStore;
    let ctx = EvaluationContext::new(&ast, &store)
        .with_input(Value::map([("email".to_string(), Value::String("a@b.com".to_string()))]));
    let adapter = UnreachableAdapter;
    let options = EvaluationOptions::new(&adapter);
    let result = evaluate(invariant, &ctx, &options);
    assert_eq!(result.value, TriState::Unknown);
}
