//! The AST for the ISL domain specification language: a closed set of
//! tagged-variant node types rooted at [`decl::Domain`].
//!
//! Every node carries a [`span::NodeSpan`] whose `PartialEq` always returns
//! `true`, so `#[derive(PartialEq)]` on every node struct gives "structural
//! equality ignoring spans" for free — the invariant the unparser's
//! round-trip guarantee and the parser's determinism property both depend
//! on.
//!
//! Module layout mirrors the shape of the grammar: declarations
//! ([`decl`]), type-level constructs ([`types`]), the expression language
//! ([`expr`]), behavior contracts ([`behavior`]), and scenario/chaos blocks
//! ([`scenario`]). `Expr` is the one genuinely deep, generically-traversed
//! family (walked by the evaluator, the unparser, and round-trip tests), so
//! it alone carries the `children`/`for_each_child`/`count_nodes`/`to_sexp`
//! traversal helpers; the declarative shell is walked structurally by callers
//! that already know its shape.

pub mod behavior;
pub mod decl;
pub mod expr;
pub mod scenario;
pub mod span;
pub mod types;

pub use behavior::{
    Behavior, ComplianceClause, ErrorSpec, InputSpec, ObservabilityClause, OutputSpec, PostBlock,
    SecurityClause, TemporalClause,
};
pub use decl::{
    Annotation, Domain, Effect, Entity, Field, Import, ImportItem, Lifecycle, LifecycleTransition,
    Policy, PolicyRule, TypeDecl, View,
};
pub use expr::{BinaryOp, Expr, MapEntry, Param, QuantifierKind, UnaryOp};
pub use scenario::{
    ChaosArgument, ChaosBlock, ChaosScenario, Injection, Scenario, ScenarioBlock, Stmt, WithClause,
};
pub use span::NodeSpan;
pub use types::{Constraint, Primitive, StructField, TypeDefinition, UnionVariant};

#[cfg(test)]
mod tests {
    use super::*;
    use isl_position::Span;

    fn sp() -> NodeSpan {
        NodeSpan(Span::synthetic())
    }

    /// A minimal domain roughly matching the literal example in SPEC_FULL
    /// §8 scenario 1, used to sanity-check that every public node type
    /// composes into a whole `Domain` value without friction.
    #[test]
    fn minimal_domain_constructs() {
        let domain = Domain {
            name: "Minimal".to_string(),
            version: "1.0.0".to_string(),
            owner: None,
            imports: vec![],
            type_decls: vec![],
            entities: vec![Entity {
                name: "User".to_string(),
                fields: vec![
                    Field {
                        name: "id".to_string(),
                        type_def: TypeDefinition::Primitive { name: Primitive::Uuid, span: sp() },
                        optional: false,
                        annotations: vec![Annotation::Immutable, Annotation::Unique],
                        span: sp(),
                    },
                    Field {
                        name: "name".to_string(),
                        type_def: TypeDefinition::Primitive { name: Primitive::String, span: sp() },
                        optional: false,
                        annotations: vec![],
                        span: sp(),
                    },
                ],
                invariants: vec![],
                lifecycle: None,
                span: sp(),
            }],
            behaviors: vec![],
            policies: vec![],
            views: vec![],
            scenario_blocks: vec![],
            chaos_blocks: vec![],
            invariants: vec![],
            span: sp(),
        };

        assert_eq!(domain.entities.len(), 1);
        assert_eq!(domain.entities[0].fields.len(), 2);
    }

    #[test]
    fn two_domains_built_identically_are_structurally_equal() {
        let build = || Domain {
            name: "Minimal".to_string(),
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
            span: NodeSpan(Span::new(None, 0, 10, 1, 1, 1, 11)),
        };
        let a = build();
        let b = Domain { span: NodeSpan(Span::new(None, 100, 110, 9, 9, 9, 19)), ..build() };
        assert_eq!(a, b);
    }
}
