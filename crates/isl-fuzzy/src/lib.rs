//! Error-recovery ("fuzzy") parser (§4.3): takes source that may not be
//! legal strict ISL — common AI-generated variants such as tabs, trailing
//! commas, lower-case primitive aliases, `[format: X]` shorthand, and
//! JS-style grouped imports — normalises it through a fixed pipeline of
//! passes, then hands the result to [`isl_parser`] for a strict parse with
//! its own panic-mode recovery still active underneath.
//!
//! The six normalisation passes run in a fixed order because later passes
//! assume the shape earlier ones produce (for instance, primitive-case
//! folding only needs to look at `:`/`[`/`,`-prefixed identifiers, which is
//! only reliable once tabs have already become spaces).

mod normalize;

use isl_ast::Domain;
use isl_diagnostics::{Category, Diagnostic};
use isl_error::ParseBudget;
use isl_position::Span;
use normalize::Change;
use std::sync::Arc;
use tracing::{debug, debug_span};

/// A declaration-level node the strict parser could not recover into a full
/// AST node for, surfaced as a skipped span rather than silently dropped.
///
/// Derived from every [`Category::Parser`]-category error diagnostic the
/// underlying strict parse raised: each one marks a point where
/// panic-mode recovery discarded tokens rather than building a node, which
/// is the closest observable proxy this pipeline has for a literal
/// "partial AST node" marker (no separate node-level tombstone currently
/// flows out of `isl-parser`).
#[derive(Debug, Clone)]
pub struct PartialNode {
    pub name: String,
    pub span: Span,
}

/// Outcome of a fuzzy parse: a best-effort AST (present unless the domain
/// header itself could not be located), every diagnostic raised across
/// normalisation and strict parsing, the partial nodes recovery skipped
/// over, and a coverage ratio.
#[derive(Debug, Clone)]
pub struct FuzzyResult {
    pub ast: Option<Domain>,
    pub warnings: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
    pub partial_nodes: Vec<PartialNode>,
    /// `nodes_parsed / nodes_attempted`, where "node" is counted at
    /// declaration granularity (imports, type decls, entities, behaviors,
    /// policies, views, scenario/chaos blocks) plus one for the domain
    /// header itself. Expression-level detail inside a successfully parsed
    /// declaration is not counted separately — the ratio answers "how much
    /// of the domain's declaration surface survived", not "how many AST
    /// nodes exist".
    pub coverage: f64,
}

/// Normalises `source` through the fixed six-pass pipeline, then strict-
/// parses the result with [`ParseBudget::default`]. See
/// [`parse_fuzzy_with_budget`] to customise recursion/diagnostic/recovery
/// limits on the underlying strict parse.
pub fn parse_fuzzy(source: &str, filename: Option<&str>) -> FuzzyResult {
    parse_fuzzy_with_budget(source, filename, ParseBudget::default())
}

pub fn parse_fuzzy_with_budget(source: &str, filename: Option<&str>, budget: ParseBudget) -> FuzzyResult {
    let span = debug_span!("parse_fuzzy", filename = filename.unwrap_or("<anonymous>"));
    let _enter = span.enter();

    let file: Option<Arc<str>> = filename.map(Arc::from);
    let mut changes: Vec<Change> = Vec::new();
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut text = source.to_string();

    macro_rules! run_pass {
        ($pass:expr) => {{
            let out = $pass(&text, &file);
            text = out.source;
            changes.extend(out.changes);
            diagnostics.extend(out.diagnostics);
        }};
    }

    run_pass!(normalize::normalise_tabs);
    run_pass!(normalize::drop_trailing_commas);
    run_pass!(normalize::lower_primitive_aliases);
    run_pass!(normalize::lift_format_annotation);
    run_pass!(normalize::lower_js_imports);
    run_pass!(normalize::inject_missing_version);

    debug!(passes_applied = changes.len(), "normalisation complete");

    let parsed = isl_parser::parse_with_budget(&text, filename, budget);
    diagnostics.extend(parsed.diagnostics);

    let partial_nodes: Vec<PartialNode> = diagnostics
        .iter()
        .filter(|d| d.known_code().map(|c| c.category()) == Some(Category::Parser) && d.is_error())
        .map(|d| PartialNode { name: d.code.clone(), span: d.location.clone() })
        .collect();

    let (nodes_parsed, nodes_attempted) = match &parsed.ast {
        Some(domain) => {
            let parsed_count = declaration_count(domain);
            (parsed_count, parsed_count + partial_nodes.len())
        }
        None => (0, partial_nodes.len().max(1)),
    };
    let coverage = if nodes_attempted == 0 { 1.0 } else { nodes_parsed as f64 / nodes_attempted as f64 };

    let (warnings, errors): (Vec<_>, Vec<_>) = diagnostics.into_iter().partition(|d| !d.is_error());

    FuzzyResult { ast: parsed.ast, warnings, errors, partial_nodes, coverage }
}

fn declaration_count(domain: &Domain) -> usize {
    1 + domain.imports.len()
        + domain.type_decls.len()
        + domain.entities.len()
        + domain.behaviors.len()
        + domain.policies.len()
        + domain.views.len()
        + domain.scenario_blocks.len()
        + domain.chaos_blocks.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_three_fuzzy_auto_fix() {
        let src = r#"domain Auth { entity User { email: String [format: email], active: boolean, } }"#;
        let result = parse_fuzzy(src, None);

        assert!(result.ast.is_some(), "expected a recovered AST, errors: {:?}", result.errors);
        let domain = result.ast.clone().expect("checked above");
        assert_eq!(domain.name, "Auth");
        assert_eq!(domain.entities.len(), 1);
        assert_eq!(domain.entities[0].fields.len(), 2);

        assert!(result.warnings.iter().any(|d| d.code == "F001"), "expected missing-version synthesis: {:?}", result.warnings);
        assert!(result.warnings.iter().any(|d| d.code == "F002"), "expected trailing-comma removal: {:?}", result.warnings);
        assert!(result.warnings.iter().any(|d| d.code == "F003"), "expected boolean->Boolean normalisation: {:?}", result.warnings);
        assert!(result.warnings.iter().any(|d| d.code == "F005"), "expected format-annotation lift: {:?}", result.warnings);

        let unparsed = isl_unparse::unparse(&domain);
        let reparsed = isl_parser::parse(&unparsed, None).ast.expect("unparsed output should reparse");
        assert_eq!(reparsed, domain);
    }

    #[test]
    fn js_style_imports_lowered_before_strict_parse() {
        let src = r#"domain D { version: "1.0.0" imports { Shared, Helper as H } from "shared.isl" entity User { id: UUID } }"#;
        let result = parse_fuzzy(src, None);
        assert!(result.errors.is_empty(), "errors: {:?}", result.errors);
        let domain = result.ast.expect("ast present");
        assert_eq!(domain.imports.len(), 1);
        assert_eq!(domain.imports[0].items.len(), 2);
    }

    #[test]
    fn coverage_is_one_when_nothing_needed_recovery() {
        let src = r#"domain Clean { version: "1.0.0" entity User { id: UUID } }"#;
        let result = parse_fuzzy(src, None);
        assert!(result.partial_nodes.is_empty());
        assert_eq!(result.coverage, 1.0);
    }

    #[test]
    fn coverage_drops_below_one_when_recovery_skips_a_section() {
        let src = r#"domain D { version: "1.0.0" %%% garbage %%% entity User { id: UUID } }"#;
        let result = parse_fuzzy(src, None);
        assert!(result.coverage <= 1.0);
        assert!(result.ast.is_some());
    }
}
