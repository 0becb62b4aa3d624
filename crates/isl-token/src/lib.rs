//! Token types produced by the ISL lexer and consumed by the strict and
//! fuzzy parsers.

use isl_position::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Coarse-grained classification of a [`Token`], used by the parser to
/// decide how to interpret `value` and by callers who only care about the
/// broad shape of a token (e.g. "is this a literal").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenCategory {
    Keyword,
    Identifier,
    String,
    Number,
    Duration,
    Boolean,
    Punctuation,
    Operator,
    Comment,
    Eof,
}

/// Fine-grained token tag. Every keyword in the closed keyword set (§4.1) and
/// every punctuation/operator lexeme gets its own variant; `&&`/`||`/`!` are
/// represented by their own tags (`AmpAmp`/`PipePipe`/`Bang`) but carry the
/// same *meaning* as `AndKw`/`OrKw`/`NotKw` — the parser treats them as
/// aliases, the lexer does not collapse them, so diagnostics can still say
/// "expected `&&`" rather than "expected `and`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    Identifier,
    StringLiteral,
    NumberLiteral,
    DurationLiteral,
    True,
    False,

    // Keywords
    DomainKw,
    VersionKw,
    OwnerKw,
    EntityKw,
    BehaviorKw,
    TypeKw,
    EnumKw,
    ImportsKw,
    FromKw,
    AsKw,
    ViewKw,
    PolicyKw,
    ScenariosKw,
    ScenarioKw,
    ChaosKw,
    InjectKw,
    WhenKw,
    ThenKw,
    ExpectKw,
    GivenKw,
    WithKw,
    InputKw,
    OutputKw,
    ErrorsKw,
    PreKw,
    PreconditionsKw,
    PostKw,
    PostconditionsKw,
    InvariantsKw,
    LifecycleKw,
    TemporalKw,
    SecurityKw,
    ComplianceKw,
    ObservabilityKw,
    ActorsKw,
    FieldsKw,
    RulesKw,
    RuleKw,
    AllowKw,
    DenyKw,
    DefaultKw,
    AndKw,
    OrKw,
    NotKw,
    Implies,
    Iff,
    InKw,
    AllKw,
    AnyKw,
    NoneKw,
    CountKw,
    SumKw,
    FilterKw,
    OldKw,
    ResultKw,
    NowKw,
    NullKw,

    // Operators
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    Arrow,
    FatArrow,
    AmpAmp,
    PipePipe,
    Bang,
    Question,

    // Punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Dot,
    Pipe,

    Comment,
    Eof,
}

impl TokenKind {
    /// The [`TokenCategory`] this kind belongs to.
    pub fn category(self) -> TokenCategory {
        use TokenKind::*;
        match self {
            Identifier => TokenCategory::Identifier,
            StringLiteral => TokenCategory::String,
            NumberLiteral => TokenCategory::Number,
            DurationLiteral => TokenCategory::Duration,
            True | False => TokenCategory::Boolean,
            Comment => TokenCategory::Comment,
            Eof => TokenCategory::Eof,
            EqEq | NotEq | Lt | LtEq | Gt | GtEq | Plus | Minus | Star | Slash | Percent | Assign
            | Arrow | FatArrow | AmpAmp | PipePipe | Bang | Question => TokenCategory::Operator,
            LBrace | RBrace | LParen | RParen | LBracket | RBracket | Comma | Colon | Semicolon
            | Dot | Pipe => TokenCategory::Punctuation,
            _ => TokenCategory::Keyword,
        }
    }

    /// Whether this kind is one of the three logical/prefix aliases that the
    /// lexer tokenises distinctly from their keyword spelling but that mean
    /// the same thing to the parser (`&&`/`and`, `||`/`or`, `!`/`not`).
    pub fn is_symbolic_alias(self) -> bool {
        matches!(self, TokenKind::AmpAmp | TokenKind::PipePipe | TokenKind::Bang)
    }

    /// Looks up the fixed `Keyword`-category kind for an identifier-shaped
    /// lexeme, or `None` if it is an ordinary identifier.
    pub fn keyword_for(word: &str) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match word {
            "domain" => DomainKw,
            "version" => VersionKw,
            "owner" => OwnerKw,
            "entity" => EntityKw,
            "behavior" => BehaviorKw,
            "type" => TypeKw,
            "enum" => EnumKw,
            "imports" => ImportsKw,
            "from" => FromKw,
            "as" => AsKw,
            "view" => ViewKw,
            "policy" => PolicyKw,
            "scenarios" => ScenariosKw,
            "scenario" => ScenarioKw,
            "chaos" => ChaosKw,
            "inject" => InjectKw,
            "when" => WhenKw,
            "then" => ThenKw,
            "expect" => ExpectKw,
            "given" => GivenKw,
            "with" => WithKw,
            "input" => InputKw,
            "output" => OutputKw,
            "errors" => ErrorsKw,
            "pre" => PreKw,
            "preconditions" => PreconditionsKw,
            "post" => PostKw,
            "postconditions" => PostconditionsKw,
            "invariants" => InvariantsKw,
            "lifecycle" => LifecycleKw,
            "temporal" => TemporalKw,
            "security" => SecurityKw,
            "compliance" => ComplianceKw,
            "observability" => ObservabilityKw,
            "actors" => ActorsKw,
            "fields" => FieldsKw,
            "rules" => RulesKw,
            "rule" => RuleKw,
            "allow" => AllowKw,
            "deny" => DenyKw,
            "default" => DefaultKw,
            "and" => AndKw,
            "or" => OrKw,
            "not" => NotKw,
            "implies" => Implies,
            "iff" => Iff,
            "in" => InKw,
            "all" => AllKw,
            "any" => AnyKw,
            "none" => NoneKw,
            "count" => CountKw,
            "sum" => SumKw,
            "filter" => FilterKw,
            "old" => OldKw,
            "result" => ResultKw,
            "now" => NowKw,
            "true" => True,
            "false" => False,
            "null" => NullKw,
            _ => return None,
        })
    }
}

/// A single lexed token: its [`TokenCategory`], its finer [`TokenKind`], the
/// raw lexeme, and the [`Span`] it occupies in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub category: TokenCategory,
    pub kind: TokenKind,
    pub value: Arc<str>,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<Arc<str>>, span: Span) -> Self {
        Self { category: kind.category(), kind, value: value.into(), span }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// Whether this token may legally start an identifier-position reference
    /// even though it lexed as a keyword — quantifier keywords not followed
    /// by `(` act as identifiers (§4.1).
    pub fn is_quantifier_keyword(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::AllKw | TokenKind::AnyKw | TokenKind::NoneKw | TokenKind::CountKw | TokenKind::SumKw | TokenKind::FilterKw
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?})", self.kind, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup() {
        assert_eq!(TokenKind::keyword_for("domain"), Some(TokenKind::DomainKw));
        assert_eq!(TokenKind::keyword_for("implies"), Some(TokenKind::Implies));
        assert_eq!(TokenKind::keyword_for("notakeyword"), None);
    }

    #[test]
    fn categories() {
        assert_eq!(TokenKind::DomainKw.category(), TokenCategory::Keyword);
        assert_eq!(TokenKind::LBrace.category(), TokenCategory::Punctuation);
        assert_eq!(TokenKind::AmpAmp.category(), TokenCategory::Operator);
        assert_eq!(TokenKind::True.category(), TokenCategory::Boolean);
    }

    #[test]
    fn symbolic_aliases() {
        assert!(TokenKind::AmpAmp.is_symbolic_alias());
        assert!(!TokenKind::AndKw.is_symbolic_alias());
    }

    #[test]
    fn quantifier_keyword_detection() {
        let tok = Token::new(TokenKind::CountKw, "count", Span::synthetic());
        assert!(tok.is_quantifier_keyword());
        let tok = Token::new(TokenKind::DomainKw, "domain", Span::synthetic());
        assert!(!tok.is_quantifier_keyword());
    }
}
