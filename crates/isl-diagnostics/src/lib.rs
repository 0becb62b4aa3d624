//! Stable diagnostic codes, severities, and the `Diagnostic` value emitted by
//! the lexer, strict parser, and fuzzy parser.
//!
//! Codes are centralised here rather than scattered as string literals across
//! the lexer/parser/fuzzy-parser crates, so the mapping from code to severity
//! and category stays a single source of truth.

use isl_position::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        };
        write!(f, "{s}")
    }
}

/// Which stage of the pipeline a diagnostic code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Lexer,
    Parser,
    FuzzyRecovery,
}

/// Well-known diagnostic codes. `Diagnostic::code` is a plain string so that
/// unknown/ad-hoc codes remain representable, but every code this crate emits
/// itself is enumerated here and converted through [`DiagnosticCode::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    /// L001: a character not recognised by any token production was skipped.
    UnrecognisedCharacter,
    /// L002: a string literal was not closed before EOF or end of line.
    UnterminatedString,
    /// L003: an escape sequence not in the recognised set was kept verbatim.
    InvalidEscapeSequence,
    /// L004: a numeric literal's shape did not match `[0-9]+('.'[0-9]+)?`.
    InvalidNumberLiteral,
    /// L006: a block comment `/* ... */` was not closed before EOF.
    UnterminatedBlockComment,
    /// P001: a token was found where the grammar expected something else.
    UnexpectedToken,
    /// P002: the token stream ended where more input was expected.
    UnexpectedEof,
    /// P003: an `ErrorSpec` name repeats within one behavior; first is kept.
    DuplicateErrorName,
    /// P004: an expression could not be parsed into any grammar production.
    MalformedExpression,
    /// P005: a bare `,,` was found where at most one trailing comma is legal.
    DoubleComma,
    /// P013: a `domain` block has no `version` field (strict mode only).
    MissingVersion,
    /// F001: the fuzzy parser synthesised `version: "1.0.0"`.
    MissingVersionSynthesized,
    /// F002: the fuzzy parser dropped a trailing comma before `}`/`)`.
    TrailingCommaRemoved,
    /// F003: the fuzzy parser lower-cased a primitive type alias.
    PrimitiveCaseNormalised,
    /// F004: the fuzzy parser replaced leading tabs with two spaces.
    TabsNormalised,
    /// F005: the fuzzy parser lifted `[format: X]` into a constraint block.
    FormatAnnotationLifted,
    /// F006: the fuzzy parser lowered a JS-style import form.
    JsImportLowered,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::UnrecognisedCharacter => "L001",
            DiagnosticCode::UnterminatedString => "L002",
            DiagnosticCode::InvalidEscapeSequence => "L003",
            DiagnosticCode::InvalidNumberLiteral => "L004",
            DiagnosticCode::UnterminatedBlockComment => "L006",
            DiagnosticCode::UnexpectedToken => "P001",
            DiagnosticCode::UnexpectedEof => "P002",
            DiagnosticCode::DuplicateErrorName => "P003",
            DiagnosticCode::MalformedExpression => "P004",
            DiagnosticCode::DoubleComma => "P005",
            DiagnosticCode::MissingVersion => "P013",
            DiagnosticCode::MissingVersionSynthesized => "F001",
            DiagnosticCode::TrailingCommaRemoved => "F002",
            DiagnosticCode::PrimitiveCaseNormalised => "F003",
            DiagnosticCode::TabsNormalised => "F004",
            DiagnosticCode::FormatAnnotationLifted => "F005",
            DiagnosticCode::JsImportLowered => "F006",
        }
    }

    pub fn parse_code(code: &str) -> Option<Self> {
        Some(match code {
            "L001" => DiagnosticCode::UnrecognisedCharacter,
            "L002" => DiagnosticCode::UnterminatedString,
            "L003" => DiagnosticCode::InvalidEscapeSequence,
            "L004" => DiagnosticCode::InvalidNumberLiteral,
            "L006" => DiagnosticCode::UnterminatedBlockComment,
            "P001" => DiagnosticCode::UnexpectedToken,
            "P002" => DiagnosticCode::UnexpectedEof,
            "P003" => DiagnosticCode::DuplicateErrorName,
            "P004" => DiagnosticCode::MalformedExpression,
            "P005" => DiagnosticCode::DoubleComma,
            "P013" => DiagnosticCode::MissingVersion,
            "F001" => DiagnosticCode::MissingVersionSynthesized,
            "F002" => DiagnosticCode::TrailingCommaRemoved,
            "F003" => DiagnosticCode::PrimitiveCaseNormalised,
            "F004" => DiagnosticCode::TabsNormalised,
            "F005" => DiagnosticCode::FormatAnnotationLifted,
            "F006" => DiagnosticCode::JsImportLowered,
            _ => return None,
        })
    }

    pub fn severity(self) -> Severity {
        match self {
            DiagnosticCode::UnterminatedString
            | DiagnosticCode::UnterminatedBlockComment
            | DiagnosticCode::UnexpectedToken
            | DiagnosticCode::UnexpectedEof
            | DiagnosticCode::DuplicateErrorName
            | DiagnosticCode::MalformedExpression
            | DiagnosticCode::DoubleComma
            | DiagnosticCode::MissingVersion
            | DiagnosticCode::InvalidNumberLiteral
            | DiagnosticCode::UnrecognisedCharacter => Severity::Error,
            DiagnosticCode::InvalidEscapeSequence => Severity::Warning,
            DiagnosticCode::MissingVersionSynthesized
            | DiagnosticCode::TrailingCommaRemoved
            | DiagnosticCode::PrimitiveCaseNormalised
            | DiagnosticCode::TabsNormalised
            | DiagnosticCode::FormatAnnotationLifted
            | DiagnosticCode::JsImportLowered => Severity::Warning,
        }
    }

    pub fn category(self) -> Category {
        match self {
            DiagnosticCode::UnrecognisedCharacter
            | DiagnosticCode::UnterminatedString
            | DiagnosticCode::InvalidEscapeSequence
            | DiagnosticCode::InvalidNumberLiteral
            | DiagnosticCode::UnterminatedBlockComment => Category::Lexer,
            DiagnosticCode::UnexpectedToken
            | DiagnosticCode::UnexpectedEof
            | DiagnosticCode::DuplicateErrorName
            | DiagnosticCode::MalformedExpression
            | DiagnosticCode::DoubleComma
            | DiagnosticCode::MissingVersion => Category::Parser,
            DiagnosticCode::MissingVersionSynthesized
            | DiagnosticCode::TrailingCommaRemoved
            | DiagnosticCode::PrimitiveCaseNormalised
            | DiagnosticCode::TabsNormalised
            | DiagnosticCode::FormatAnnotationLifted
            | DiagnosticCode::JsImportLowered => Category::FuzzyRecovery,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A diagnostic produced by the lexer, strict parser, or fuzzy parser.
///
/// `code` is a plain string rather than `DiagnosticCode` directly: "unknown
/// codes are allowed" per the wire contract, so a well-known code is recorded
/// as its canonical string and only re-interpreted as a [`DiagnosticCode`] on
/// demand via [`Diagnostic::known_code`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub location: Span,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>, location: Span) -> Self {
        Self { code: code.as_str().to_string(), severity: code.severity(), message: message.into(), location }
    }

    pub fn known_code(&self) -> Option<DiagnosticCode> {
        DiagnosticCode::parse_code(&self.code)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_strings_are_stable() {
        assert_eq!(DiagnosticCode::UnterminatedString.as_str(), "L002");
        assert_eq!(DiagnosticCode::UnterminatedBlockComment.as_str(), "L006");
        assert_eq!(DiagnosticCode::MissingVersion.as_str(), "P013");
        assert_eq!(DiagnosticCode::MissingVersionSynthesized.as_str(), "F001");
        assert_eq!(DiagnosticCode::TabsNormalised.as_str(), "F004");
    }

    #[test]
    fn round_trips_through_parse_code() {
        for code in [
            DiagnosticCode::UnrecognisedCharacter,
            DiagnosticCode::UnterminatedString,
            DiagnosticCode::InvalidEscapeSequence,
            DiagnosticCode::InvalidNumberLiteral,
            DiagnosticCode::UnterminatedBlockComment,
            DiagnosticCode::UnexpectedToken,
            DiagnosticCode::UnexpectedEof,
            DiagnosticCode::DuplicateErrorName,
            DiagnosticCode::MalformedExpression,
            DiagnosticCode::DoubleComma,
            DiagnosticCode::MissingVersion,
            DiagnosticCode::MissingVersionSynthesized,
            DiagnosticCode::TrailingCommaRemoved,
            DiagnosticCode::PrimitiveCaseNormalised,
            DiagnosticCode::TabsNormalised,
            DiagnosticCode::FormatAnnotationLifted,
            DiagnosticCode::JsImportLowered,
        ] {
            assert_eq!(DiagnosticCode::parse_code(code.as_str()), Some(code));
        }
        assert_eq!(DiagnosticCode::parse_code("X999"), None);
    }

    #[test]
    fn severities_match_spec() {
        assert_eq!(DiagnosticCode::MissingVersion.severity(), Severity::Error);
        assert_eq!(DiagnosticCode::TabsNormalised.severity(), Severity::Warning);
    }

    #[test]
    fn diagnostic_is_error_reflects_severity() {
        let d = Diagnostic::new(DiagnosticCode::MissingVersion, "missing version", Span::synthetic());
        assert!(d.is_error());
        let w = Diagnostic::new(DiagnosticCode::TabsNormalised, "tabs normalised", Span::synthetic());
        assert!(!w.is_error());
    }

    #[test]
    fn unknown_code_is_representable() {
        let d = Diagnostic {
            code: "X123".to_string(),
            severity: Severity::Info,
            message: "host-defined".to_string(),
            location: Span::synthetic(),
        };
        assert_eq!(d.known_code(), None);
    }
}
