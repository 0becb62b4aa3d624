//! Source-level pre-normalisation passes (§4.3), applied in a fixed order
//! before the source is handed to the strict parser. Each pass is a pure
//! `&str -> (String, Vec<Change>, Vec<Diagnostic>)` transform operating on
//! plain text — the fuzzy parser does not get to assume a valid token
//! stream exists yet, since half the point of these passes is to produce one.
//!
//! Spans recorded on a `Change` describe a byte range in the text *as it
//! existed when that pass ran*, not the final normalised source — each pass
//! sees only its predecessor's output, so there is no single coordinate
//! space spanning every pass. Downstream diagnostics accept this the same
//! way the strict parser's own diagnostics are scoped to one parse.

use isl_diagnostics::{Diagnostic, DiagnosticCode};
use isl_position::{LineIndex, Span};
use std::sync::Arc;

/// One byte-range edit a normalisation pass made, independent of whether it
/// also raised a diagnostic.
#[derive(Debug, Clone)]
pub struct Change {
    pub label: String,
    pub span: Span,
}

pub struct PassOutput {
    pub source: String,
    pub changes: Vec<Change>,
    pub diagnostics: Vec<Diagnostic>,
}

fn span_at(text: &str, file: &Option<Arc<str>>, start: usize, end: usize) -> Span {
    let index = LineIndex::new(text);
    Span::from_byte_range(file.clone(), text, &index, start, end)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether `haystack[at..]` begins with `word` as a whole identifier (not a
/// prefix of a longer one).
fn matches_word_at(haystack: &str, at: usize, word: &str) -> bool {
    let Some(slice) = haystack.get(at..) else { return false };
    if !slice.starts_with(word) {
        return false;
    }
    let before_ok = haystack[..at].chars().next_back().is_none_or(|c| !is_ident_char(c));
    let after_ok = slice[word.len()..].chars().next().is_none_or(|c| !is_ident_char(c));
    before_ok && after_ok
}

/// Pass 1: leading tabs on a line become two spaces (F004).
pub fn normalise_tabs(source: &str, file: &Option<Arc<str>>) -> PassOutput {
    let mut out = String::with_capacity(source.len());
    let mut changes = Vec::new();
    let mut diagnostics = Vec::new();

    for line in source.split_inclusive('\n') {
        let leading_tabs = line.chars().take_while(|c| *c == '\t').count();
        if leading_tabs == 0 {
            out.push_str(line);
            continue;
        }
        let start = out.len();
        for _ in 0..leading_tabs {
            out.push_str("  ");
        }
        let rest = &line[leading_tabs..];
        out.push_str(rest);
        let span = span_at(source, file, start.min(source.len()), (start + leading_tabs).min(source.len()));
        diagnostics.push(Diagnostic::new(DiagnosticCode::TabsNormalised, "leading tabs replaced with two spaces", span.clone()));
        changes.push(Change { label: "tabs normalised".to_string(), span });
    }
    PassOutput { source: out, changes, diagnostics }
}

/// Pass 2: a comma directly before `}`/`)` (ignoring intervening whitespace)
/// is dropped (F002).
pub fn drop_trailing_commas(source: &str, file: &Option<Arc<str>>) -> PassOutput {
    let bytes = source.as_bytes();
    let mut out = String::with_capacity(source.len());
    let mut changes = Vec::new();
    let mut diagnostics = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b',' {
            let mut j = i + 1;
            while j < bytes.len() && (bytes[j] as char).is_whitespace() {
                j += 1;
            }
            if j < bytes.len() && (bytes[j] == b'}' || bytes[j] == b')') {
                let span = span_at(source, file, i, i + 1);
                diagnostics.push(Diagnostic::new(DiagnosticCode::TrailingCommaRemoved, "trailing comma removed", span.clone()));
                changes.push(Change { label: "trailing comma removed".to_string(), span });
                i += 1;
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    // The byte-at-a-time copy above is only safe for ASCII; fall back to a
    // UTF-8-aware rebuild when the source has any non-ASCII bytes.
    if !source.is_ascii() {
        return drop_trailing_commas_utf8(source, file);
    }
    PassOutput { source: out, changes, diagnostics }
}

fn drop_trailing_commas_utf8(source: &str, file: &Option<Arc<str>>) -> PassOutput {
    let mut out = String::with_capacity(source.len());
    let mut changes = Vec::new();
    let mut diagnostics = Vec::new();
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut idx = 0;
    while idx < chars.len() {
        let (byte_pos, c) = chars[idx];
        if c == ',' {
            let mut j = idx + 1;
            while j < chars.len() && chars[j].1.is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j].1 == '}' || chars[j].1 == ')') {
                let end = chars.get(idx + 1).map(|(p, _)| *p).unwrap_or(source.len());
                let span = span_at(source, file, byte_pos, end);
                diagnostics.push(Diagnostic::new(DiagnosticCode::TrailingCommaRemoved, "trailing comma removed", span.clone()));
                changes.push(Change { label: "trailing comma removed".to_string(), span });
                idx += 1;
                continue;
            }
        }
        out.push(c);
        idx += 1;
    }
    PassOutput { source: out, changes, diagnostics }
}

const PRIMITIVE_ALIASES: &[(&str, &str)] = &[("string", "String"), ("number", "Int"), ("boolean", "Boolean")];

/// Pass 3: lower-case primitive aliases in type position — immediately after
/// `:`, `[`, or `,` with only whitespace in between (F003).
pub fn lower_primitive_aliases(source: &str, file: &Option<Arc<str>>) -> PassOutput {
    let mut out = String::new();
    let mut changes = Vec::new();
    let mut diagnostics = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let byte_of: Vec<usize> = {
        let mut v = Vec::with_capacity(chars.len() + 1);
        let mut acc = 0;
        for c in &chars {
            v.push(acc);
            acc += c.len_utf8();
        }
        v.push(acc);
        v
    };

    let mut i = 0;
    'outer: while i < chars.len() {
        if chars[i].is_alphabetic() || chars[i] == '_' {
            let word_start = i;
            let mut j = i;
            while j < chars.len() && is_ident_char(chars[j]) {
                j += 1;
            }
            let word: String = chars[word_start..j].iter().collect();
            for (alias, canonical) in PRIMITIVE_ALIASES {
                if word == *alias {
                    // Look back past whitespace for a type-position starter.
                    let mut k = word_start;
                    while k > 0 && chars[k - 1].is_whitespace() {
                        k -= 1;
                    }
                    if k > 0 && matches!(chars[k - 1], ':' | '[' | ',') {
                        let start_byte = byte_of[word_start];
                        let end_byte = byte_of[j];
                        out.push_str(canonical);
                        let span = span_at(source, file, start_byte, end_byte);
                        diagnostics.push(Diagnostic::new(
                            DiagnosticCode::PrimitiveCaseNormalised,
                            format!("'{alias}' normalised to '{canonical}'"),
                            span.clone(),
                        ));
                        changes.push(Change { label: format!("primitive alias '{alias}' normalised"), span });
                        i = j;
                        continue 'outer;
                    }
                }
            }
            out.extend(chars[word_start..j].iter());
            i = j;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    PassOutput { source: out, changes, diagnostics }
}

/// Pass 4: `[format: X]` (X a bare word or a quoted string) becomes a
/// constraint block `{ format: "X" }` on the preceding type (F005).
pub fn lift_format_annotation(source: &str, file: &Option<Arc<str>>) -> PassOutput {
    let mut out = String::new();
    let mut changes = Vec::new();
    let mut diagnostics = Vec::new();
    let mut i = 0;
    while i < source.len() {
        if source.as_bytes()[i] == b'[' && matches_word_at(source, i + 1, "format") {
            let mut j = i + 1 + "format".len();
            while source[j..].starts_with(|c: char| c.is_whitespace()) {
                j += 1;
            }
            if source[j..].starts_with(':') {
                j += 1;
                while source[j..].starts_with(|c: char| c.is_whitespace()) {
                    j += 1;
                }
                let value_start = j;
                let value: String;
                if source[j..].starts_with('"') {
                    let rest = &source[j + 1..];
                    if let Some(close) = rest.find('"') {
                        value = rest[..close].to_string();
                        j = j + 1 + close + 1;
                    } else {
                        out.push(source.as_bytes()[i] as char);
                        i += 1;
                        continue;
                    }
                } else {
                    let mut k = j;
                    while source[k..].starts_with(|c: char| is_ident_char(c)) {
                        k += source[k..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
                    }
                    value = source[value_start..k].to_string();
                    j = k;
                }
                while source[j..].starts_with(|c: char| c.is_whitespace()) {
                    j += 1;
                }
                if source[j..].starts_with(']') {
                    let end = j + 1;
                    let span = span_at(source, file, i, end);
                    out.push_str(&format!("{{ format: \"{value}\" }}"));
                    diagnostics.push(Diagnostic::new(
                        DiagnosticCode::FormatAnnotationLifted,
                        "'[format: ...]' lifted to a constraint block",
                        span.clone(),
                    ));
                    changes.push(Change { label: "format annotation lifted".to_string(), span });
                    i = end;
                    continue;
                }
            }
        }
        let ch = source[i..].chars().next().unwrap_or('\u{0}');
        out.push(ch);
        i += ch.len_utf8();
    }
    PassOutput { source: out, changes, diagnostics }
}

/// Pass 5: `imports { A, B as C } from "path"` (one source outside the
/// braces) lowers to the canonical per-item form (F006).
pub fn lower_js_imports(source: &str, file: &Option<Arc<str>>) -> PassOutput {
    let mut out = String::new();
    let mut changes = Vec::new();
    let mut diagnostics = Vec::new();
    let mut i = 0;
    while i < source.len() {
        if matches_word_at(source, i, "imports") {
            let mut j = i + "imports".len();
            while source[j..].starts_with(|c: char| c.is_whitespace()) {
                j += 1;
            }
            if source[j..].starts_with('{') {
                if let Some(close_rel) = source[j..].find('}') {
                    let brace_open = j;
                    let brace_close = j + close_rel;
                    let items_text = &source[brace_open + 1..brace_close];
                    let mut k = brace_close + 1;
                    while source[k..].starts_with(|c: char| c.is_whitespace()) {
                        k += 1;
                    }
                    if matches_word_at(source, k, "from") {
                        let mut m = k + "from".len();
                        while source[m..].starts_with(|c: char| c.is_whitespace()) {
                            m += 1;
                        }
                        if source[m..].starts_with('"') {
                            let rest = &source[m + 1..];
                            if let Some(q_close) = rest.find('"') {
                                let path = &rest[..q_close];
                                let end = m + 1 + q_close + 1;
                                let rewritten = rewrite_js_import_items(items_text, path);
                                let span = span_at(source, file, i, end);
                                out.push_str(&format!("imports {{ {rewritten} }}"));
                                diagnostics.push(Diagnostic::new(
                                    DiagnosticCode::JsImportLowered,
                                    "JS-style 'imports { ... } from \"path\"' lowered to per-item form",
                                    span.clone(),
                                ));
                                changes.push(Change { label: "JS-style import lowered".to_string(), span });
                                i = end;
                                continue;
                            }
                        }
                    }
                }
            }
        }
        let ch = source[i..].chars().next().unwrap_or('\u{0}');
        out.push(ch);
        i += ch.len_utf8();
    }
    PassOutput { source: out, changes, diagnostics }
}

fn rewrite_js_import_items(items_text: &str, path: &str) -> String {
    items_text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|item| format!("{item} from \"{path}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Pass 6: if the domain block has no `version:` field anywhere, inject
/// `version: "1.0.0"` right after the opening `{` (or, in the brace-less
/// form, right after the domain name) (F001).
pub fn inject_missing_version(source: &str, file: &Option<Arc<str>>) -> PassOutput {
    let Some(domain_pos) = find_word(source, "domain", 0) else {
        return PassOutput { source: source.to_string(), changes: vec![], diagnostics: vec![] };
    };
    if find_word(source, "version", domain_pos).is_some() {
        return PassOutput { source: source.to_string(), changes: vec![], diagnostics: vec![] };
    }

    let mut j = domain_pos + "domain".len();
    while source[j..].starts_with(|c: char| c.is_whitespace()) {
        j += 1;
    }
    while source[j..].starts_with(|c: char| is_ident_char(c)) {
        j += source[j..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
    }
    let mut k = j;
    while source[k..].starts_with(|c: char| c.is_whitespace()) {
        k += 1;
    }
    let insert_at = if source[k..].starts_with('{') { k + 1 } else { j };

    let mut out = String::with_capacity(source.len() + 32);
    out.push_str(&source[..insert_at]);
    out.push_str(" version: \"1.0.0\" ");
    out.push_str(&source[insert_at..]);

    let span = span_at(source, file, insert_at, insert_at);
    let diagnostic = Diagnostic::new(DiagnosticCode::MissingVersionSynthesized, "missing 'version' field synthesised as \"1.0.0\"", span.clone());
    PassOutput {
        source: out,
        changes: vec![Change { label: "missing version synthesised".to_string(), span }],
        diagnostics: vec![diagnostic],
    }
}

fn find_word(haystack: &str, word: &str, from: usize) -> Option<usize> {
    let mut i = from;
    while i < haystack.len() {
        if matches_word_at(haystack, i, word) {
            return Some(i);
        }
        let ch = haystack[i..].chars().next()?;
        i += ch.len_utf8();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_become_two_spaces() {
        let out = normalise_tabs("\tentity User {\n\t\tid: UUID\n\t}", &None);
        assert!(!out.source.contains('\t'));
        assert_eq!(out.changes.len(), 2);
    }

    #[test]
    fn trailing_comma_before_brace_is_dropped() {
        let out = drop_trailing_commas("entity User { id: UUID, }", &None);
        assert_eq!(out.source, "entity User { id: UUID }");
        assert_eq!(out.changes.len(), 1);
    }

    #[test]
    fn non_trailing_comma_is_kept() {
        let out = drop_trailing_commas("entity User { id: UUID, name: String }", &None);
        assert_eq!(out.source, "entity User { id: UUID, name: String }");
        assert!(out.changes.is_empty());
    }

    #[test]
    fn primitive_alias_lowered_in_type_position_only() {
        let out = lower_primitive_aliases("entity User { active: boolean }", &None);
        assert!(out.source.contains("active: Boolean"));
        assert_eq!(out.changes.len(), 1);
    }

    #[test]
    fn primitive_alias_untouched_outside_type_position() {
        let out = lower_primitive_aliases("invariants { string == \"boolean\" }", &None);
        assert_eq!(out.changes.len(), 0);
    }

    #[test]
    fn format_annotation_lifted_to_constraint_block() {
        let out = lift_format_annotation("email: String [format: email]", &None);
        assert_eq!(out.source, "email: String { format: \"email\" }");
        assert_eq!(out.changes.len(), 1);
    }

    #[test]
    fn js_style_import_lowered_to_per_item_form() {
        let out = lower_js_imports(r#"imports { A, B as C } from "shared.isl""#, &None);
        assert_eq!(out.source, r#"imports { A from "shared.isl" B as C from "shared.isl" }"#);
        assert_eq!(out.changes.len(), 1);
    }

    #[test]
    fn missing_version_is_injected_after_opening_brace() {
        let out = inject_missing_version("domain Auth { entity User { id: UUID } }", &None);
        assert!(out.source.starts_with("domain Auth { version: \"1.0.0\""));
        assert_eq!(out.changes.len(), 1);
    }

    #[test]
    fn present_version_is_left_alone() {
        let out = inject_missing_version(r#"domain Auth { version: "2.0.0" }"#, &None);
        assert!(out.changes.is_empty());
        assert_eq!(out.source, r#"domain Auth { version: "2.0.0" }"#);
    }
}
