//! Canonical-form pretty-printer from the ISL AST back to source text
//! (§4.4). A pure, total function on [`isl_ast::Domain`]; contract is
//! `parse(unparse(a))` is structurally equal to `a` for every AST `a`
//! produced by [`isl_parser::parse`] (spans excluded — see
//! [`isl_ast::span::NodeSpan`]'s always-`true` `PartialEq`).
//!
//! Implemented as one `write_*` function per node family, mirroring the
//! AST's own module layout (`expr`, `types`, `decl`, `scenario`) rather than
//! a single monolithic traversal. Never reads `Span` fields: doing so would
//! make the output depend on source formatting instead of AST content,
//! which is exactly what the round-trip guarantee rules out.

mod decl;
mod expr;
mod scenario;
mod types;

use isl_ast::Domain;

/// A line-oriented writer with simple brace-block indentation. Declaration
/// bodies are one section per line, so this is deliberately not a
/// token-stream pretty-printer — the grammar's layout is free-form and the
/// unparser only needs to emit *a* valid, canonical rendering.
pub(crate) struct Writer {
    buf: String,
    indent: usize,
}

impl Writer {
    fn new() -> Self {
        Self { buf: String::new(), indent: 0 }
    }

    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.buf.push_str("    ");
        }
        self.buf.push_str(text.as_ref());
        self.buf.push('\n');
    }

    fn open(&mut self, header: impl AsRef<str>) {
        self.line(format!("{} {{", header.as_ref()));
        self.indent += 1;
    }

    fn close(&mut self) {
        self.indent -= 1;
        self.line("}");
    }

    fn finish(self) -> String {
        self.buf
    }
}

/// Renders `domain` back to canonical ISL source text.
pub fn unparse(domain: &Domain) -> String {
    let mut w = Writer::new();
    decl::write_domain(&mut w, domain);
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_ast::*;
    use isl_position::Span;

    fn sp() -> NodeSpan {
        NodeSpan(Span::synthetic())
    }

    #[test]
    fn minimal_domain_round_trips() {
        let domain = Domain {
            name: "Minimal".to_string(),
            version: "1.0.0".to_string(),
            owner: None,
            imports: vec![],
            type_decls: vec![],
            entities: vec![Entity {
                name: "User".to_string(),
                fields: vec![Field {
                    name: "id".to_string(),
                    type_def: TypeDefinition::Primitive { name: Primitive::Uuid, span: sp() },
                    optional: false,
                    annotations: vec![Annotation::Immutable, Annotation::Unique],
                    span: sp(),
                }],
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
        let text = unparse(&domain);
        let reparsed = isl_parser::parse(&text, None).ast.expect("unparsed output should reparse");
        assert_eq!(reparsed, domain, "unparsed text:\n{text}");
    }
}
