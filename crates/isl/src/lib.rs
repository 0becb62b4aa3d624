//! Facade crate for the ISL domain specification language (SPEC_FULL §6).
//!
//! Re-exports the external interface the rest of this workspace's front end
//! and expression core is built from: [`parse`]/[`parse_fuzzy`]/[`parse_file`]
//! /[`unparse`] for the parse API, [`evaluate`]/[`verify`] for the
//! evaluator-facing verify API, and the `EntityStore`/`ExpressionAdapter`
//! trait contracts a host implements to supply domain data.
//!
//! Every other crate in this workspace (`isl-lexer`, `isl-parser`,
//! `isl-fuzzy`, `isl-unparse`, `isl-eval`) is usable standalone; this crate
//! exists only to give a single dependency and a single set of import paths
//! to a downstream consumer — the CLI, the report formatters, the
//! language-server symbol provider, and the mock entity store — all of which
//! are out of this workspace's scope per SPEC_FULL §1 but consume this
//! surface by contract.

pub use isl_ast as ast;
pub use isl_diagnostics::{Category, Diagnostic, DiagnosticCode, Severity};
pub use isl_error::ParseBudget;
pub use isl_eval::{
    check_invariants, check_postconditions, check_preconditions, classify_outcome, evaluate, truthiness,
    verify, CheckResult, DefaultAdapter, EmptyStore, EntityInstance, EntityStore, EntityStoreSnapshot,
    EvaluationContext, EvaluationOptions, EvaluationResult, ExpressionAdapter, LengthResult, Lookup, Outcome,
    TriState, Value, Verdict, VerifyReport, DEFAULT_ADAPTER,
};
pub use isl_fuzzy::{parse_fuzzy, parse_fuzzy_with_budget, FuzzyResult, PartialNode};
pub use isl_parser::{parse, parse_with_budget, ParseOutput};
pub use isl_unparse::unparse;

use std::path::Path;
use thiserror::Error;

/// Fatal I/O failure in [`parse_file`]. Distinct from [`ParseOutput`]'s
/// diagnostic list per SPEC_FULL §6: a file that could not be read was never
/// lexed, so there is no meaningful partial parse result to return alongside
/// it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io { path: std::path::PathBuf, #[source] source: std::io::Error },
}

/// Reads `path` as UTF-8 and strict-parses it, using the file's own path
/// (lossily converted) as the `filename` recorded on every [`Diagnostic`]'s
/// span. The one place this crate's otherwise pure `source -> ParseOutput`
/// contract meets fallible I/O (SPEC_FULL §6).
pub fn parse_file(path: impl AsRef<Path>) -> Result<ParseOutput, Error> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    let filename = path.to_string_lossy();
    Ok(parse(&source, Some(filename.as_ref())))
}

/// Reads `path` as UTF-8 and fuzzy-parses it. Sibling of [`parse_file`] for
/// the error-recovery entry point.
pub fn parse_file_fuzzy(path: impl AsRef<Path>) -> Result<FuzzyResult, Error> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
    let filename = path.to_string_lossy();
    Ok(parse_fuzzy(&source, Some(filename.as_ref())))
}
