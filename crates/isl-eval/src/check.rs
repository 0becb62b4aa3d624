//! The thin check driver (§4.6): wires `evaluate` up to a `Behavior`'s
//! preconditions, postconditions, and invariants, and classifies an
//! execution outcome into the tag a `PostBlock` is selected by.
//!
//! Deliberately thin — it owns no logic beyond expression selection and
//! `Outcome` classification; every truth-value decision still happens
//! inside [`crate::eval::evaluate`].

use crate::context::EvaluationContext;
use crate::eval::{evaluate, EvaluationOptions, EvaluationResult};
use crate::tristate::TriState;
use crate::value::Value;
use isl_ast::{Behavior, Domain};
use isl_position::Span;
use serde::{Deserialize, Serialize};

/// The resolved execution outcome a behavior run produced, used to select
/// which `PostBlock`s apply (§4.5's state machine, mirrored by
/// [`Behavior::post_block_for`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error(String),
    AnyError,
}

/// Classifies an outcome from the raw execution result: `error` is the
/// thrown/returned error value (if any) and `result` is the success value
/// (if any). A known `code` field on `error` that names a declared error on
/// `behavior` resolves to `Outcome::Error`; any other error value resolves to
/// the catch-all `Outcome::AnyError`; no error with a non-null result is
/// `Outcome::Success`.
pub fn classify_outcome(behavior: &Behavior, error: Option<&Value>, result: Option<&Value>) -> Outcome {
    if let Some(err) = error {
        if let Some(code) = err.get("code").and_then(Value::as_str) {
            if behavior.find_error(code).is_some() {
                return Outcome::Error(code.to_string());
            }
        }
        return Outcome::AnyError;
    }
    match result {
        Some(v) if !v.is_null() => Outcome::Success,
        _ => Outcome::AnyError,
    }
}

/// One check's outcome within a [`VerifyReport`]: which kind of check it
/// was, the span of the predicate it ran, and the evaluation result itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub kind: String,
    pub span: Span,
    pub value: TriState,
    pub reason: Option<String>,
    pub children: Vec<EvaluationResult>,
}

impl CheckResult {
    fn from_evaluation(kind: &str, result: EvaluationResult) -> CheckResult {
        CheckResult {
            kind: kind.to_string(),
            span: result.span,
            value: result.value,
            reason: result.reason,
            children: result.children,
        }
    }
}

/// Evaluates every precondition expression on `behavior` against `ctx`.
pub fn check_preconditions(
    behavior: &Behavior,
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
) -> Vec<CheckResult> {
    behavior
        .preconditions
        .iter()
        .map(|expr| CheckResult::from_evaluation("precondition", evaluate(expr, ctx, options)))
        .collect()
}

/// Selects and evaluates the `PostBlock`s matching `outcome`'s tag
/// (§4.5's exact-tag-wins-over-`any_error` selection, via
/// [`Behavior::post_block_for`]).
pub fn check_postconditions(
    behavior: &Behavior,
    ctx: &EvaluationContext<'_>,
    outcome: &Outcome,
    options: &EvaluationOptions<'_>,
) -> Vec<CheckResult> {
    let tag = match outcome {
        Outcome::Success => "success",
        Outcome::Error(name) => name.as_str(),
        Outcome::AnyError => "any_error",
    };
    let Some(block) = behavior.post_block_for(tag) else {
        return Vec::new();
    };
    block
        .predicates
        .iter()
        .map(|expr| CheckResult::from_evaluation("postcondition", evaluate(expr, ctx, options)))
        .collect()
}

/// Evaluates behavior invariants, domain-level invariants, and per-entity
/// invariants (§4.6). Entity invariants are read off each entity's own
/// constraint expressions via its type declaration's field constraints; this
/// driver does not re-derive them, it only walks what `Domain`/`Entity`
/// already carry.
pub fn check_invariants(
    behavior: &Behavior,
    domain: &Domain,
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
) -> Vec<CheckResult> {
    let mut results: Vec<CheckResult> = behavior
        .invariants
        .iter()
        .map(|expr| CheckResult::from_evaluation("invariant", evaluate(expr, ctx, options)))
        .collect();
    results.extend(
        domain
            .invariants
            .iter()
            .map(|expr| CheckResult::from_evaluation("invariant", evaluate(expr, ctx, options))),
    );
    results.extend(
        domain
            .entities
            .iter()
            .flat_map(|e| e.invariants.iter())
            .map(|expr| CheckResult::from_evaluation("invariant", evaluate(expr, ctx, options))),
    );
    results
}

/// Overall safety classification a [`VerifyReport`] carries, derived from
/// its checks (§4.6): `safe` only when every check is `True`, `unsafe` when
/// any is `False`, `risky` for the remaining case (no violation, but at
/// least one `Unknown`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Safe,
    Risky,
    Unsafe,
}

fn classify_verdict(checks: &[&CheckResult]) -> Verdict {
    if checks.iter().any(|c| c.value.is_false()) {
        Verdict::Unsafe
    } else if checks.iter().any(|c| c.value.is_unknown()) {
        Verdict::Risky
    } else {
        Verdict::Safe
    }
}

/// The full result of verifying one behavior run: every precondition,
/// postcondition, and invariant check plus the derived `verdict` and
/// parse-level-style `success` flag (§4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub preconditions: Vec<CheckResult>,
    pub postconditions: Vec<CheckResult>,
    pub invariants: Vec<CheckResult>,
    pub verdict: Verdict,
    pub success: bool,
}

/// Convenience wrapper combining [`check_preconditions`],
/// [`check_postconditions`], and [`check_invariants`] plus the derived
/// verdict/success fields (§4.6).
pub fn verify(
    behavior: &Behavior,
    domain: &Domain,
    ctx: &EvaluationContext<'_>,
    outcome: &Outcome,
    options: &EvaluationOptions<'_>,
) -> VerifyReport {
    let preconditions = check_preconditions(behavior, ctx, options);
    let postconditions = check_postconditions(behavior, ctx, outcome, options);
    let invariants = check_invariants(behavior, domain, ctx, options);

    let all_checks: Vec<&CheckResult> =
        preconditions.iter().chain(postconditions.iter()).chain(invariants.iter()).collect();
    let verdict = classify_verdict(&all_checks);
    let success = !all_checks.iter().any(|c| c.value.is_false());

    VerifyReport { preconditions, postconditions, invariants, verdict, success }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::DEFAULT_ADAPTER;
    use crate::store::EmptyStore;
    use isl_ast::{ErrorSpec, InputSpec, NodeSpan, OutputSpec, PostBlock};
    use isl_position::Span as PSpan;

    fn sp() -> NodeSpan {
        NodeSpan(PSpan::synthetic())
    }

    fn empty_domain() -> Domain {
        Domain {
            name: "D".to_string(),
            version: "1.0.0".to_string(),
            owner: None,
            imports: vec![],
            type_decls: vec![],
            entities: vec![],
            behaviors: vec![],
            policies: vec![],
            views: vec![],
            scenario_blocks: vec![],
            chaos_blocks: vec![],
            invariants: vec![],
            span: sp(),
        }
    }

    fn behavior_with(
        preconditions: Vec<isl_ast::Expr>,
        postconditions: Vec<PostBlock>,
        errors: Vec<ErrorSpec>,
    ) -> Behavior {
        Behavior {
            name: "Login".to_string(),
            description: None,
            actors: vec![],
            input: InputSpec { fields: vec![], span: sp() },
            output: OutputSpec { success_type: None, errors, span: sp() },
            preconditions,
            postconditions,
            invariants: vec![],
            temporal: vec![],
            security: vec![],
            compliance: vec![],
            observability: vec![],
            span: sp(),
        }
    }

    #[test]
    fn no_postconditions_evaluates_cleanly_with_zero_results() {
        let domain = empty_domain();
        let store = EmptyStore;
        let ctx = EvaluationContext::new(&domain, &store);
        let options = EvaluationOptions::new(&DEFAULT_ADAPTER);
        let behavior = behavior_with(vec![], vec![], vec![]);
        let results = check_postconditions(&behavior, &ctx, &Outcome::Success, &options);
        assert!(results.is_empty());
    }

    #[test]
    fn precondition_failure_marks_risky_or_unsafe() {
        let domain = empty_domain();
        let store = EmptyStore;
        let ctx = EvaluationContext::new(&domain, &store)
            .with_input(Value::map([("email".to_string(), Value::String(String::new()))]));
        let options = EvaluationOptions::new(&DEFAULT_ADAPTER);

        let length_expr = isl_ast::Expr::Member {
            object: Box::new(isl_ast::Expr::Input { property: "email".to_string(), span: sp() }),
            property: "length".to_string(),
            span: sp(),
        };
        let precondition = isl_ast::Expr::Binary {
            op: isl_ast::BinaryOp::Gt,
            left: Box::new(length_expr),
            right: Box::new(isl_ast::Expr::Number { value: 0.0, is_float: false, span: sp() }),
            span: sp(),
        };
        let behavior = behavior_with(vec![precondition], vec![], vec![]);
        let report = verify(&behavior, &domain, &ctx, &Outcome::AnyError, &options);
        assert!(!report.success);
        assert_ne!(report.verdict, Verdict::Safe);
    }

    #[test]
    fn classify_outcome_prefers_known_error_code() {
        let behavior = behavior_with(
            vec![],
            vec![],
            vec![ErrorSpec { name: "InvalidCredentials".to_string(), when: None, retriable: false, retry_after: None, span: sp() }],
        );
        let error = Value::map([("code".to_string(), Value::String("InvalidCredentials".to_string()))]);
        assert_eq!(classify_outcome(&behavior, Some(&error), None), Outcome::Error("InvalidCredentials".to_string()));

        let unknown_error = Value::map([("code".to_string(), Value::String("Boom".to_string()))]);
        assert_eq!(classify_outcome(&behavior, Some(&unknown_error), None), Outcome::AnyError);

        let result = Value::map([("session".to_string(), Value::String("abc".to_string()))]);
        assert_eq!(classify_outcome(&behavior, None, Some(&result)), Outcome::Success);
    }
}
