//! Pratt/precedence-climbing expression parser (§4.2 levels 1-10).

use crate::Parser;
use isl_ast::{BinaryOp, Expr, MapEntry, NodeSpan, QuantifierKind, UnaryOp};
use isl_diagnostics::DiagnosticCode;
use isl_token::TokenKind;

impl Parser {
    /// Entry point: level 1 (`implies`/`iff`), the lowest precedence.
    pub(crate) fn parse_expr(&mut self) -> Expr {
        if !self.enter_depth() {
            let span = self.peek().span.clone();
            self.diagnostic(DiagnosticCode::MalformedExpression, "maximum expression recursion depth exceeded", span.clone());
            return Expr::Null(NodeSpan::from(span));
        }
        let result = self.parse_implies_iff();
        self.exit_depth();
        result
    }

    fn parse_implies_iff(&mut self) -> Expr {
        let left = self.parse_or();
        match self.peek_kind() {
            TokenKind::Implies => {
                self.advance();
                // Right-associative: recurse into the same level.
                let right = self.parse_implies_iff();
                let span = left.span().union(right.span());
                Expr::Binary { op: BinaryOp::Implies, left: Box::new(left), right: Box::new(right), span: NodeSpan::from(span) }
            }
            TokenKind::Iff => {
                self.advance();
                // Non-associative: exactly one `iff` at this level.
                let right = self.parse_or();
                let span = left.span().union(right.span());
                Expr::Binary { op: BinaryOp::Iff, left: Box::new(left), right: Box::new(right), span: NodeSpan::from(span) }
            }
            _ => left,
        }
    }

    fn parse_or(&mut self) -> Expr {
        let mut left = self.parse_and();
        while matches!(self.peek_kind(), TokenKind::OrKw | TokenKind::PipePipe) {
            self.advance();
            let right = self.parse_and();
            let span = left.span().union(right.span());
            left = Expr::Binary { op: BinaryOp::Or, left: Box::new(left), right: Box::new(right), span: NodeSpan::from(span) };
        }
        left
    }

    fn parse_and(&mut self) -> Expr {
        let mut left = self.parse_equality_in();
        while matches!(self.peek_kind(), TokenKind::AndKw | TokenKind::AmpAmp) {
            self.advance();
            let right = self.parse_equality_in();
            let span = left.span().union(right.span());
            left = Expr::Binary { op: BinaryOp::And, left: Box::new(left), right: Box::new(right), span: NodeSpan::from(span) };
        }
        left
    }

    fn parse_equality_in(&mut self) -> Expr {
        let mut left = self.parse_relational();
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::InKw => BinaryOp::In,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational();
            let span = left.span().union(right.span());
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), span: NodeSpan::from(span) };
        }
        left
    }

    fn parse_relational(&mut self) -> Expr {
        let mut left = self.parse_additive();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive();
            let span = left.span().union(right.span());
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), span: NodeSpan::from(span) };
        }
        left
    }

    fn parse_additive(&mut self) -> Expr {
        let mut left = self.parse_multiplicative();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative();
            let span = left.span().union(right.span());
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), span: NodeSpan::from(span) };
        }
        left
    }

    fn parse_multiplicative(&mut self) -> Expr {
        let mut left = self.parse_unary();
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary();
            let span = left.span().union(right.span());
            left = Expr::Binary { op, left: Box::new(left), right: Box::new(right), span: NodeSpan::from(span) };
        }
        left
    }

    fn parse_unary(&mut self) -> Expr {
        match self.peek_kind() {
            TokenKind::NotKw | TokenKind::Bang => {
                let start = self.advance().span;
                let operand = self.parse_unary();
                let span = start.union(operand.span());
                Expr::Unary { op: UnaryOp::Not, operand: Box::new(operand), span: NodeSpan::from(span) }
            }
            TokenKind::Minus => {
                let start = self.advance().span;
                let operand = self.parse_unary();
                let span = start.union(operand.span());
                Expr::Unary { op: UnaryOp::Neg, operand: Box::new(operand), span: NodeSpan::from(span) }
            }
            _ => self.parse_postfix(),
        }
    }

    /// Level 9: postfix member/call/index chains, plus the ternary
    /// conditional `cond ? then : else` (the grammar's "ternary-free
    /// conditional via `cond implies then else?`" wording names no literal
    /// `if`/`else` keyword, so this parser reuses the `?`/`:` tokens the
    /// lexer already tokenises as `Question`/`Colon` for exactly this
    /// purpose — see DESIGN.md).
    fn parse_postfix(&mut self) -> Expr {
        let mut expr = self.parse_atom();
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let name_tok = self.expect(TokenKind::Identifier, "a property name after '.'");
                    let span = expr.span().union(&name_tok.span);
                    expr = Expr::Member { object: Box::new(expr), property: name_tok.value.to_string(), span: NodeSpan::from(span) };
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_expr_list(TokenKind::RParen);
                    let end = self.expect(TokenKind::RParen, "')' to close call arguments").span;
                    let span = expr.span().union(&end);
                    expr = Expr::Call { callee: Box::new(expr), args, span: NodeSpan::from(span) };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr();
                    let end = self.expect(TokenKind::RBracket, "']' to close index").span;
                    let span = expr.span().union(&end);
                    expr = Expr::Index { object: Box::new(expr), index: Box::new(index), span: NodeSpan::from(span) };
                }
                TokenKind::Question => {
                    self.advance();
                    let then_branch = self.parse_expr();
                    self.expect(TokenKind::Colon, "':' in conditional expression");
                    let else_branch = self.parse_expr();
                    let span = expr.span().union(else_branch.span());
                    expr = Expr::Conditional {
                        cond: Box::new(expr),
                        then_branch: Box::new(then_branch),
                        else_branch: Some(Box::new(else_branch)),
                        span: NodeSpan::from(span),
                    };
                }
                _ => break,
            }
        }
        expr
    }

    /// Parses a comma-separated expression list, accepting a trailing comma
    /// before `terminator` and rejecting a bare double comma (§4.2, P005).
    pub(crate) fn parse_expr_list(&mut self, terminator: TokenKind) -> Vec<Expr> {
        let mut items = Vec::new();
        if self.at(terminator) {
            return items;
        }
        loop {
            if self.at(TokenKind::Comma) {
                // A leading/doubled comma with no preceding element.
                let span = self.advance().span;
                self.diagnostic(DiagnosticCode::DoubleComma, "unexpected ',' with no preceding element", span);
                continue;
            }
            items.push(self.parse_expr());
            if self.eat(TokenKind::Comma).is_some() {
                if self.at(TokenKind::Comma) {
                    let span = self.peek().span.clone();
                    self.diagnostic(DiagnosticCode::DoubleComma, "double comma ',,' is not allowed", span);
                    self.advance();
                }
                if self.at(terminator) {
                    // Trailing comma before the closing delimiter: absorbed silently (§4.2).
                    break;
                }
                continue;
            }
            break;
        }
        items
    }

    fn parse_atom(&mut self) -> Expr {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::StringLiteral => {
                self.advance();
                Expr::String(tok.value.to_string(), NodeSpan::from(tok.span))
            }
            TokenKind::NumberLiteral => {
                self.advance();
                let is_float = tok.value.contains('.');
                let value = tok.value.parse::<f64>().unwrap_or(f64::NAN);
                Expr::Number { value, is_float, span: NodeSpan::from(tok.span) }
            }
            TokenKind::DurationLiteral => {
                self.advance();
                let (num, unit) = split_duration(&tok.value);
                Expr::Duration { value: num, unit, span: NodeSpan::from(tok.span) }
            }
            TokenKind::True => {
                self.advance();
                Expr::Boolean(true, NodeSpan::from(tok.span))
            }
            TokenKind::False => {
                self.advance();
                Expr::Boolean(false, NodeSpan::from(tok.span))
            }
            TokenKind::NullKw => {
                self.advance();
                Expr::Null(NodeSpan::from(tok.span))
            }
            TokenKind::OldKw => {
                self.advance();
                self.expect(TokenKind::LParen, "'(' after 'old'");
                let inner = self.parse_expr();
                let end = self.expect(TokenKind::RParen, "')' to close 'old(...)'").span;
                let span = tok.span.union(&end);
                Expr::Old { expr: Box::new(inner), span: NodeSpan::from(span) }
            }
            TokenKind::ResultKw => {
                self.advance();
                if self.eat(TokenKind::Dot).is_some() {
                    let name = self.expect(TokenKind::Identifier, "a property name after 'result.'");
                    let span = tok.span.union(&name.span);
                    Expr::Result { property: Some(name.value.to_string()), span: NodeSpan::from(span) }
                } else {
                    Expr::Result { property: None, span: NodeSpan::from(tok.span) }
                }
            }
            TokenKind::InputKw => {
                self.advance();
                if self.eat(TokenKind::Dot).is_some() {
                    let name = self.expect(TokenKind::Identifier, "a property name after 'input.'");
                    let span = tok.span.union(&name.span);
                    Expr::Input { property: name.value.to_string(), span: NodeSpan::from(span) }
                } else {
                    Expr::Identifier { name: "input".to_string(), span: NodeSpan::from(tok.span) }
                }
            }
            TokenKind::NowKw => {
                self.advance();
                Expr::Identifier { name: "now".to_string(), span: NodeSpan::from(tok.span) }
            }
            TokenKind::AllKw | TokenKind::AnyKw | TokenKind::NoneKw | TokenKind::CountKw | TokenKind::SumKw | TokenKind::FilterKw
                if self.peek_is_quantifier_call() =>
            {
                self.parse_quantifier()
            }
            TokenKind::Identifier
            | TokenKind::AllKw
            | TokenKind::AnyKw
            | TokenKind::NoneKw
            | TokenKind::CountKw
            | TokenKind::SumKw
            | TokenKind::FilterKw => {
                self.advance();
                self.parse_identifier_or_qualified(tok)
            }
            TokenKind::LParen => self.parse_paren_or_lambda(),
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LBrace => self.parse_map(),
            TokenKind::Eof => {
                self.error_eof("an expression");
                Expr::Null(NodeSpan::from(tok.span))
            }
            _ => {
                self.advance();
                self.diagnostic(
                    DiagnosticCode::MalformedExpression,
                    format!("expected an expression, found {:?} {:?}", tok.kind, tok.value),
                    tok.span.clone(),
                );
                Expr::Null(NodeSpan::from(tok.span))
            }
        }
    }

    /// A quantifier keyword only introduces a [`Expr::Quantifier`] when
    /// immediately followed by `(`; otherwise it acts as an ordinary
    /// identifier (§4.1) — e.g. `count == old(count) + 1` is valid.
    fn peek_is_quantifier_call(&self) -> bool {
        self.tokens.get(self.pos + 1).map(|t| t.kind) == Some(TokenKind::LParen)
    }

    fn parse_identifier_or_qualified(&mut self, first: isl_token::Token) -> Expr {
        let first_name = first.value.to_string();
        let mut parts = vec![first_name.clone()];
        let mut end_span = first.span.clone();
        while self.at(TokenKind::Dot) && self.next_is_identifier_like() {
            self.advance();
            let tok = self.advance();
            end_span = tok.span.clone();
            parts.push(tok.value.to_string());
        }
        if parts.len() == 1 {
            Expr::Identifier { name: first_name, span: NodeSpan::from(first.span) }
        } else {
            let span = first.span.union(&end_span);
            Expr::QualifiedName { parts, span: NodeSpan::from(span) }
        }
    }

    /// Whether the token after a `.` is itself a plain name continuation
    /// (used to decide `QualifiedName` vs. handing the `.` off to the
    /// postfix-member parser, which also wants plain identifiers — the two
    /// productions only diverge once a call/index follows, which the
    /// postfix loop in [`Parser::parse_postfix`] still gets a chance to
    /// apply to the resulting `QualifiedName`).
    fn next_is_identifier_like(&self) -> bool {
        self.tokens.get(self.pos + 1).is_some_and(|t| t.kind == TokenKind::Identifier)
    }

    fn parse_quantifier(&mut self) -> Expr {
        let start = self.peek().span.clone();
        let kind = match self.advance().kind {
            TokenKind::AllKw => QuantifierKind::All,
            TokenKind::AnyKw => QuantifierKind::Any,
            TokenKind::NoneKw => QuantifierKind::None,
            TokenKind::CountKw => QuantifierKind::Count,
            TokenKind::SumKw => QuantifierKind::Sum,
            TokenKind::FilterKw => QuantifierKind::Filter,
            _ => unreachable!("peek_is_quantifier_call only returns true for quantifier keywords"),
        };
        self.expect(TokenKind::LParen, "'(' after quantifier");

        // Two accepted call shapes (§4.2): `kw(collection, var => predicate)`
        // and `kw(var in collection: predicate)`.
        let (var, collection, predicate) = if self.looks_like_var_in_collection() {
            let var_tok = self.expect(TokenKind::Identifier, "a bound variable name");
            self.expect(TokenKind::InKw, "'in' after bound variable");
            let collection = self.parse_expr();
            self.expect(TokenKind::Colon, "':' before quantifier predicate");
            let predicate = self.parse_expr();
            (var_tok.value.to_string(), collection, predicate)
        } else {
            let collection = self.parse_expr();
            self.expect(TokenKind::Comma, "',' before quantifier lambda");
            let var_tok = self.expect(TokenKind::Identifier, "a bound variable name");
            self.expect(TokenKind::FatArrow, "'=>' in quantifier lambda");
            let predicate = self.parse_expr();
            (var_tok.value.to_string(), collection, predicate)
        };

        let end = self.expect(TokenKind::RParen, "')' to close quantifier call").span;
        let span = start.union(&end);
        Expr::Quantifier { kind, var, collection: Box::new(collection), predicate: Box::new(predicate), span: NodeSpan::from(span) }
    }

    fn looks_like_var_in_collection(&self) -> bool {
        self.at(TokenKind::Identifier) && self.tokens.get(self.pos + 1).map(|t| t.kind) == Some(TokenKind::InKw)
    }

    /// `(params) => expr` lambdas and parenthesised sub-expressions share a
    /// `(` lookahead; disambiguated by scanning for a matching `)` directly
    /// followed by `=>`.
    fn parse_paren_or_lambda(&mut self) -> Expr {
        if self.looks_like_lambda() {
            return self.parse_lambda();
        }
        let start = self.advance().span;
        let inner = self.parse_expr();
        let end = self.expect(TokenKind::RParen, "')' to close parenthesised expression").span;
        let _ = start.union(&end);
        inner
    }

    fn looks_like_lambda(&self) -> bool {
        let mut depth = 0usize;
        let mut i = self.pos;
        loop {
            let Some(tok) = self.tokens.get(i) else { return false };
            match tok.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return self.tokens.get(i + 1).map(|t| t.kind) == Some(TokenKind::FatArrow);
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            i += 1;
        }
    }

    fn parse_lambda(&mut self) -> Expr {
        let start = self.advance().span; // '('
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                let tok = self.expect(TokenKind::Identifier, "a lambda parameter name");
                params.push(tok.value.to_string());
                if self.eat(TokenKind::Comma).is_some() {
                    if self.at(TokenKind::RParen) {
                        break;
                    }
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::RParen, "')' to close lambda parameters");
        self.expect(TokenKind::FatArrow, "'=>' after lambda parameters");
        let body = self.parse_expr();
        let span = start.union(body.span());
        Expr::Lambda { params, body: Box::new(body), span: NodeSpan::from(span) }
    }

    fn parse_list(&mut self) -> Expr {
        let start = self.advance().span; // '['
        let elements = self.parse_expr_list(TokenKind::RBracket);
        let end = self.expect(TokenKind::RBracket, "']' to close list literal").span;
        let span = start.union(&end);
        Expr::List { elements, span: NodeSpan::from(span) }
    }

    fn parse_map(&mut self) -> Expr {
        let start = self.advance().span; // '{'
        let mut entries = Vec::new();
        if !self.at(TokenKind::RBrace) {
            loop {
                let key = self.parse_expr();
                self.expect(TokenKind::Colon, "':' between map key and value");
                let value = self.parse_expr();
                entries.push(MapEntry { key, value });
                if self.eat(TokenKind::Comma).is_some() {
                    if self.at(TokenKind::RBrace) {
                        break;
                    }
                    continue;
                }
                break;
            }
        }
        let end = self.expect(TokenKind::RBrace, "'}' to close map literal").span;
        let span = start.union(&end);
        Expr::Map { entries, span: NodeSpan::from(span) }
    }
}

fn split_duration(lexeme: &str) -> (f64, String) {
    let unit_start = lexeme.find(|c: char| c.is_alphabetic()).unwrap_or(lexeme.len());
    let (num_part, unit) = lexeme.split_at(unit_start);
    let num_part = num_part.trim_end_matches('.');
    (num_part.parse::<f64>().unwrap_or(f64::NAN), unit.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn parse_expr_standalone(src: &str) -> Expr {
        let wrapped = format!(r#"domain D {{ version: "1.0.0" invariants {{ {src} }} }}"#);
        let out = parse(&wrapped, None);
        let ast = out.ast.expect("ast should parse");
        ast.invariants.into_iter().next().expect("one invariant expression")
    }

    #[test]
    fn precedence_implies_binds_looser_than_or() {
        let e = parse_expr_standalone("a or b implies c");
        match e {
            Expr::Binary { op: BinaryOp::Implies, left, .. } => {
                assert!(matches!(*left, Expr::Binary { op: BinaryOp::Or, .. }));
            }
            other => panic!("expected implies at the top: {other:?}"),
        }
    }

    #[test]
    fn precedence_and_binds_tighter_than_or() {
        let e = parse_expr_standalone("a and b or c");
        match e {
            Expr::Binary { op: BinaryOp::Or, left, .. } => {
                assert!(matches!(*left, Expr::Binary { op: BinaryOp::And, .. }));
            }
            other => panic!("expected or at the top: {other:?}"),
        }
    }

    #[test]
    fn arithmetic_precedence() {
        let e = parse_expr_standalone("1 + 2 * 3");
        match e {
            Expr::Binary { op: BinaryOp::Add, right, .. } => {
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("expected + at the top: {other:?}"),
        }
    }

    #[test]
    fn quantifier_keyword_not_followed_by_paren_is_identifier() {
        let e = parse_expr_standalone("count == old(count) + 1");
        assert!(matches!(e, Expr::Binary { op: BinaryOp::Eq, .. }));
    }

    #[test]
    fn quantifier_both_call_shapes_normalise_to_same_node_kind() {
        let a = parse_expr_standalone("all(items, x => x.valid)");
        let b = parse_expr_standalone("all(x in items: x.valid)");
        assert!(matches!(a, Expr::Quantifier { kind: QuantifierKind::All, .. }));
        assert!(matches!(b, Expr::Quantifier { kind: QuantifierKind::All, .. }));
    }

    #[test]
    fn trailing_comma_accepted_double_comma_rejected() {
        let good = format!(r#"domain D {{ version: "1.0.0" invariants {{ [1, 2,].length == 2 }} }}"#);
        let out = parse(&good, None);
        assert!(out.success());

        let bad = format!(r#"domain D {{ version: "1.0.0" invariants {{ [1,, 2].length == 2 }} }}"#);
        let out = parse(&bad, None);
        assert!(out.diagnostics.iter().any(|d| d.code == "P005"));
    }

    #[test]
    fn duration_literal_splits_value_and_unit() {
        let e = parse_expr_standalone("100ms");
        match e {
            Expr::Duration { value, unit, .. } => {
                assert_eq!(value, 100.0);
                assert_eq!(unit, "ms");
            }
            other => panic!("expected duration: {other:?}"),
        }
    }

    #[test]
    fn lambda_parses_distinct_from_parenthesised_expr() {
        let e = parse_expr_standalone("(x) => x.valid");
        assert!(matches!(e, Expr::Lambda { .. }));
        let e2 = parse_expr_standalone("(1 + 2) * 3");
        assert!(matches!(e2, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn conditional_ternary_parses() {
        let e = parse_expr_standalone("a ? b : c");
        assert!(matches!(e, Expr::Conditional { .. }));
    }
}
