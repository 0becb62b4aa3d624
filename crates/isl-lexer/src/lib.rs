//! Hand-written lexer for the ISL domain specification language (§4.1).
//!
//! The lexer never aborts a scan: every lexical failure (unterminated
//! string, unterminated block comment, an unrecognised character) becomes a
//! [`Diagnostic`] appended to the output's diagnostic list, and lexing
//! resumes at the next plausible boundary. There is no `Result::Err` exit
//! from [`lex`].

use isl_diagnostics::{Diagnostic, DiagnosticCode};
use isl_position::{LineIndex, Span};
use isl_token::{Token, TokenKind};
use std::sync::Arc;
use tracing::{debug, trace};

/// The full output of a lex pass: the token stream (comments included, EOF
/// terminated) plus whatever diagnostics were raised along the way.
#[derive(Debug, Clone)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

impl LexOutput {
    /// The token stream with `Comment` tokens filtered out, the shape the
    /// parser actually consumes (§3.2). Comments are still inspected
    /// separately for `#islVersion` directive scanning.
    pub fn parser_tokens(&self) -> Vec<Token> {
        self.tokens.iter().filter(|t| t.kind != TokenKind::Comment).cloned().collect()
    }

    /// Scans leading comment tokens for a `#islVersion "X"` directive,
    /// returning the version string if one is present before the first
    /// non-comment token.
    pub fn isl_version_directive(&self) -> Option<String> {
        for tok in &self.tokens {
            match tok.kind {
                TokenKind::Comment => {
                    let text = tok.value.trim_start_matches('#').trim();
                    if let Some(rest) = text.strip_prefix("islVersion") {
                        let rest = rest.trim();
                        if let Some(inner) = rest.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
                            return Some(inner.to_string());
                        }
                    }
                }
                TokenKind::Eof => break,
                _ => break,
            }
        }
        None
    }
}

struct Lexer<'a> {
    file: Option<Arc<str>>,
    source: &'a str,
    bytes: &'a [u8],
    index: LineIndex,
    pos: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

const DURATION_UNITS: &[&str] = &["ms", "seconds", "minutes", "hours", "days"];

impl<'a> Lexer<'a> {
    fn new(source: &'a str, file: Option<Arc<str>>) -> Self {
        Self {
            file,
            source,
            bytes: source.as_bytes(),
            index: LineIndex::new(source),
            pos: 0,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span::from_byte_range(self.file.clone(), self.source, &self.index, start, end)
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        let value = &self.source[start..end];
        self.tokens.push(Token::new(kind, value, self.span(start, end)));
    }

    fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, start: usize, end: usize) {
        let span = self.span(start, end);
        self.diagnostics.push(Diagnostic::new(code, message, span));
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn run(mut self) -> LexOutput {
        let span = tracing::debug_span!("lex", len = self.source.len());
        let _enter = span.enter();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let Some(byte) = self.peek() else {
                self.push(TokenKind::Eof, start, start);
                break;
            };
            trace!(pos = start, byte = %(byte as char), "lex token");
            match byte {
                b'/' if self.peek_at(1) == Some(b'/') => self.scan_line_comment(start, 2),
                b'#' => self.scan_line_comment(start, 1),
                b'/' if self.peek_at(1) == Some(b'*') => self.scan_block_comment(start),
                b'"' | b'\'' => self.scan_string(start, byte),
                b'0'..=b'9' => self.scan_number_or_duration(start),
                c if is_ident_start(c, self.source, start) => self.scan_identifier(start),
                b'=' if self.peek_at(1) == Some(b'=') => self.two_char(start, TokenKind::EqEq),
                b'=' if self.peek_at(1) == Some(b'>') => self.two_char(start, TokenKind::FatArrow),
                b'=' => self.one_char(start, TokenKind::Assign),
                b'!' if self.peek_at(1) == Some(b'=') => self.two_char(start, TokenKind::NotEq),
                b'!' => self.one_char(start, TokenKind::Bang),
                b'<' if self.peek_at(1) == Some(b'=') => self.two_char(start, TokenKind::LtEq),
                b'<' => self.one_char(start, TokenKind::Lt),
                b'>' if self.peek_at(1) == Some(b'=') => self.two_char(start, TokenKind::GtEq),
                b'>' => self.one_char(start, TokenKind::Gt),
                b'+' => self.one_char(start, TokenKind::Plus),
                b'-' if self.peek_at(1) == Some(b'>') => self.two_char(start, TokenKind::Arrow),
                b'-' => self.one_char(start, TokenKind::Minus),
                b'*' => self.one_char(start, TokenKind::Star),
                b'/' => self.one_char(start, TokenKind::Slash),
                b'%' => self.one_char(start, TokenKind::Percent),
                b'&' if self.peek_at(1) == Some(b'&') => self.two_char(start, TokenKind::AmpAmp),
                b'|' if self.peek_at(1) == Some(b'|') => self.two_char(start, TokenKind::PipePipe),
                b'|' => self.one_char(start, TokenKind::Pipe),
                b'?' => self.one_char(start, TokenKind::Question),
                b'{' => self.one_char(start, TokenKind::LBrace),
                b'}' => self.one_char(start, TokenKind::RBrace),
                b'(' => self.one_char(start, TokenKind::LParen),
                b')' => self.one_char(start, TokenKind::RParen),
                b'[' => self.one_char(start, TokenKind::LBracket),
                b']' => self.one_char(start, TokenKind::RBracket),
                b',' => self.one_char(start, TokenKind::Comma),
                b':' => self.one_char(start, TokenKind::Colon),
                b';' => self.one_char(start, TokenKind::Semicolon),
                b'.' => self.one_char(start, TokenKind::Dot),
                _ => {
                    let ch = self.source[start..].chars().next().unwrap_or('\u{FFFD}');
                    self.pos = start + ch.len_utf8();
                    self.error(
                        DiagnosticCode::UnrecognisedCharacter,
                        format!("unrecognised character {ch:?}"),
                        start,
                        self.pos,
                    );
                }
            }
        }
        debug!(tokens = self.tokens.len(), diagnostics = self.diagnostics.len(), "lex complete");
        LexOutput { tokens: self.tokens, diagnostics: self.diagnostics }
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn one_char(&mut self, start: usize, kind: TokenKind) {
        self.pos = start + 1;
        self.push(kind, start, self.pos);
    }

    fn two_char(&mut self, start: usize, kind: TokenKind) {
        self.pos = start + 2;
        self.push(kind, start, self.pos);
    }

    fn scan_line_comment(&mut self, start: usize, prefix_len: usize) {
        self.pos = start + prefix_len;
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.pos += 1;
        }
        self.push(TokenKind::Comment, start, self.pos);
    }

    fn scan_block_comment(&mut self, start: usize) {
        self.pos = start + 2;
        let mut terminated = false;
        while let Some(b) = self.peek() {
            if b == b'*' && self.peek_at(1) == Some(b'/') {
                self.pos += 2;
                terminated = true;
                break;
            }
            self.pos += 1;
        }
        if !terminated {
            self.error(
                DiagnosticCode::UnterminatedBlockComment,
                "unterminated block comment",
                start,
                self.pos,
            );
        }
        self.push(TokenKind::Comment, start, self.pos);
    }

    fn scan_string(&mut self, start: usize, quote: u8) {
        self.pos = start + 1;
        let mut value = String::new();
        let mut terminated = false;
        while let Some(b) = self.peek() {
            if b == quote {
                self.pos += 1;
                terminated = true;
                break;
            }
            if b == b'\n' {
                break;
            }
            if b == b'\\' {
                let escape_start = self.pos;
                self.pos += 1;
                match self.peek() {
                    Some(b'n') => {
                        value.push('\n');
                        self.pos += 1;
                    }
                    Some(b't') => {
                        value.push('\t');
                        self.pos += 1;
                    }
                    Some(b'r') => {
                        value.push('\r');
                        self.pos += 1;
                    }
                    Some(b'\\') => {
                        value.push('\\');
                        self.pos += 1;
                    }
                    Some(b'"') => {
                        value.push('"');
                        self.pos += 1;
                    }
                    Some(b'\'') => {
                        value.push('\'');
                        self.pos += 1;
                    }
                    Some(other) => {
                        // Unknown escapes are retained verbatim; a warning is emitted (§4.1).
                        value.push('\\');
                        value.push(other as char);
                        self.pos += 1;
                        self.error(
                            DiagnosticCode::InvalidEscapeSequence,
                            format!("unknown escape sequence '\\{}'", other as char),
                            escape_start,
                            self.pos,
                        );
                    }
                    None => break,
                }
                continue;
            }
            let ch_len = self.source[self.pos..].chars().next().map(char::len_utf8).unwrap_or(1);
            value.push_str(&self.source[self.pos..self.pos + ch_len]);
            self.pos += ch_len;
        }
        if !terminated {
            self.error(DiagnosticCode::UnterminatedString, "unterminated string literal", start, self.pos);
        }
        self.tokens.push(Token::new(TokenKind::StringLiteral, value, self.span(start, self.pos)));
    }

    fn scan_number_or_duration(&mut self, start: usize) {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        let mut has_dot_digits = false;
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            self.pos += 1;
            has_dot_digits = true;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        let number_end = self.pos;

        // A number directly (optionally through a single '.') followed by a
        // duration unit is a duration literal, not a plain number (§4.1):
        // both `100ms` and `100.ms` are accepted and mean the same thing.
        let mut unit_start = number_end;
        if !has_dot_digits && self.peek() == Some(b'.') {
            unit_start = number_end + 1;
        }
        if let Some(unit) = self.match_duration_unit(unit_start) {
            self.pos = unit_start + unit.len();
            self.push(TokenKind::DurationLiteral, start, self.pos);
            return;
        }

        self.pos = number_end;
        self.push(TokenKind::NumberLiteral, start, self.pos);
    }

    fn match_duration_unit(&self, at: usize) -> Option<&'static str> {
        DURATION_UNITS.iter().copied().find(|unit| self.source[at..].starts_with(unit))
    }

    fn scan_identifier(&mut self, start: usize) {
        self.pos = start + 1;
        while let Some(ch) = self.source[self.pos..].chars().next() {
            if unicode_ident::is_xid_continue(ch) || ch == '_' {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
        let word = &self.source[start..self.pos];
        let kind = TokenKind::keyword_for(word).unwrap_or(TokenKind::Identifier);
        self.push(kind, start, self.pos);
    }
}

fn is_ident_start(byte: u8, source: &str, pos: usize) -> bool {
    if byte.is_ascii_alphabetic() || byte == b'_' {
        return true;
    }
    if byte < 0x80 {
        return false;
    }
    source[pos..].chars().next().is_some_and(unicode_ident::is_xid_start)
}

/// Lexes `source` into a token stream plus diagnostics. `file` names the
/// source for spans; pass `None` for anonymous/in-memory sources.
pub fn lex(source: &str, file: Option<Arc<str>>) -> LexOutput {
    Lexer::new(source, file).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src, None).tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("domain Foo"),
            vec![TokenKind::DomainKw, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn string_literal_with_known_escapes() {
        let out = lex(r#""a\nb""#, None);
        assert_eq!(out.tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(&*out.tokens[0].value, "a\nb");
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn unknown_escape_is_retained_with_warning() {
        let out = lex(r#""a\qb""#, None);
        assert_eq!(&*out.tokens[0].value, "a\\qb");
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].code, "L003");
    }

    #[test]
    fn unterminated_string_at_eof_is_l002() {
        let out = lex("\"abc", None);
        assert_eq!(out.diagnostics[0].code, "L002");
        assert_eq!(out.diagnostics[0].location.end_byte, 4);
    }

    #[test]
    fn unterminated_block_comment_is_l006() {
        let out = lex("/* never closed", None);
        assert_eq!(out.diagnostics[0].code, "L006");
    }

    #[test]
    fn negative_numbers_are_minus_then_number() {
        assert_eq!(kinds("-5"), vec![TokenKind::Minus, TokenKind::NumberLiteral, TokenKind::Eof]);
    }

    #[test]
    fn duration_literal_with_and_without_dot() {
        assert_eq!(kinds("100ms"), vec![TokenKind::DurationLiteral, TokenKind::Eof]);
        assert_eq!(kinds("100.ms"), vec![TokenKind::DurationLiteral, TokenKind::Eof]);
        let a = lex("100ms", None);
        let b = lex("100.ms", None);
        assert_eq!(a.tokens[0].value, b.tokens[0].value.replace('.', ""));
    }

    #[test]
    fn plain_number_not_followed_by_unit() {
        assert_eq!(kinds("100"), vec![TokenKind::NumberLiteral, TokenKind::Eof]);
        assert_eq!(kinds("100.5"), vec![TokenKind::NumberLiteral, TokenKind::Eof]);
    }

    #[test]
    fn symbolic_operator_aliases() {
        assert_eq!(kinds("&&"), vec![TokenKind::AmpAmp, TokenKind::Eof]);
        assert_eq!(kinds("||"), vec![TokenKind::PipePipe, TokenKind::Eof]);
        assert_eq!(kinds("!"), vec![TokenKind::Bang, TokenKind::Eof]);
    }

    #[test]
    fn quantifier_keyword_lexes_as_keyword_regardless_of_following_token() {
        // Disambiguation between keyword-use and identifier-use happens in
        // the parser (§4.1); the lexer always emits the keyword kind.
        assert_eq!(kinds("count == 1"), vec![TokenKind::CountKw, TokenKind::EqEq, TokenKind::NumberLiteral, TokenKind::Eof]);
    }

    #[test]
    fn unrecognised_character_is_skipped_not_fatal() {
        let out = lex("domain § Foo", None);
        assert_eq!(out.diagnostics[0].code, "L001");
        assert_eq!(kinds("domain § Foo"), vec![TokenKind::DomainKw, TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn line_comment_and_hash_comment_are_both_filtered_from_parser_tokens() {
        let out = lex("domain Foo // trailing\n# also a comment\nentity", None);
        assert!(out.parser_tokens().iter().all(|t| t.kind != TokenKind::Comment));
    }

    #[test]
    fn isl_version_directive_detected_from_leading_comment() {
        let out = lex("#islVersion \"2.0\"\ndomain Foo", None);
        assert_eq!(out.isl_version_directive(), Some("2.0".to_string()));
    }

    #[test]
    fn trailing_comma_tokenizes_as_comma_not_special_cased() {
        // Trailing-comma acceptance is a strict-parser grammar concern
        // (§4.2), not a lexical one; the lexer just emits ordinary commas.
        assert_eq!(kinds("[1, 2,]"), vec![
            TokenKind::LBracket,
            TokenKind::NumberLiteral,
            TokenKind::Comma,
            TokenKind::NumberLiteral,
            TokenKind::Comma,
            TokenKind::RBracket,
            TokenKind::Eof,
        ]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The lexer never panics or hangs on arbitrary input, including
        /// invalid UTF-8-adjacent byte sequences reachable only through
        /// `char` generation, unterminated strings/comments, and stray
        /// control characters — L001/L002/L006 skip-and-recover handles all
        /// of it, so this is purely a crash/`unwrap` regression guard.
        #[test]
        fn lexing_arbitrary_text_never_panics(text in ".{0,200}") {
            let out = lex(&text, None);
            prop_assert!(out.tokens.last().map(|t| t.kind) == Some(TokenKind::Eof));
        }

        /// A run of ASCII identifier characters always lexes as a single
        /// `Identifier` token (never a keyword) once a non-keyword prefix is
        /// guaranteed by prefixing with `x`.
        #[test]
        fn ascii_identifier_lexes_as_one_token(rest in "[a-zA-Z0-9_]{0,20}") {
            let text = format!("x{rest}");
            let out = lex(&text, None);
            let parser_tokens = out.parser_tokens();
            prop_assert_eq!(parser_tokens.len(), 2);
            prop_assert_eq!(parser_tokens[0].kind, TokenKind::Identifier);
            prop_assert_eq!(parser_tokens[0].value.as_ref(), text.as_str());
        }

        /// Every plain non-negative integer literal not followed by a
        /// duration unit lexes as exactly one `NumberLiteral` token whose
        /// text round-trips the input digits.
        #[test]
        fn plain_integer_round_trips(n in 0u64..1_000_000) {
            let text = n.to_string();
            let out = lex(&text, None);
            let parser_tokens = out.parser_tokens();
            prop_assert_eq!(parser_tokens.len(), 2);
            prop_assert_eq!(parser_tokens[0].kind, TokenKind::NumberLiteral);
            prop_assert_eq!(parser_tokens[0].value.as_ref(), text.as_str());
        }
    }
}
