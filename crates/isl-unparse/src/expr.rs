//! Expression writer (§4.4). Parenthesisation is reconstructed from operator
//! precedence/associativity rather than carried on the AST: the strict
//! parser strips parentheses entirely (`parse_paren_or_lambda` returns the
//! inner expression unchanged), so this module has to derive, from
//! [`BinaryOp`] precedence alone, exactly the set of parens a reparse would
//! need to rebuild the same tree.

use isl_ast::{BinaryOp, Expr, MapEntry, QuantifierKind, UnaryOp};

/// Precedence tier, 1 (loosest) through 7 (tightest) — one level per `Expr`
/// grammar tier below `not`/unary (§4.2 levels 1-7; unary and postfix are
/// handled separately since neither ever needs parens around a binary
/// operand coming from the *other* direction: unary's tier is tighter than
/// every binary op, postfix's tighter still).
fn tier(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Implies | BinaryOp::Iff => 1,
        BinaryOp::Or => 2,
        BinaryOp::And => 3,
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::In => 4,
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => 5,
        BinaryOp::Add | BinaryOp::Sub => 6,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 7,
    }
}

/// Whether `child`, printed as the left operand of `parent_op`, needs
/// wrapping parens to reparse back to the same tree.
///
/// `implies` is right-associative and `iff` is non-associative: both read
/// their left side via a single `parse_or()` call (no recursion back into
/// `implies`/`iff`), so an unparenthesised same-tier child on the left is
/// never reachable from the parser — it always needs parens. Every other
/// operator is left-associative and loop-parsed, so a same-tier left child
/// is exactly what that loop produces unparenthesised.
fn left_needs_parens(child: &Expr, parent_op: BinaryOp) -> bool {
    let Expr::Binary { op: child_op, .. } = child else { return false };
    let (ct, pt) = (tier(*child_op), tier(parent_op));
    match ct.cmp(&pt) {
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => matches!(parent_op, BinaryOp::Implies | BinaryOp::Iff),
    }
}

/// Whether `child`, printed as the right operand of `parent_op`, needs
/// wrapping parens.
///
/// `implies`'s right side recurses through the full `implies`/`iff` level
/// again, so a same-tier right child (itself `implies` or `iff`) is
/// produced directly without parens — right-associative chaining is native.
/// Every other operator (including `iff`, whose right side is a single
/// `parse_or()` call) needs parens around a same-tier right child.
fn right_needs_parens(child: &Expr, parent_op: BinaryOp) -> bool {
    let Expr::Binary { op: child_op, .. } = child else { return false };
    let (ct, pt) = (tier(*child_op), tier(parent_op));
    match ct.cmp(&pt) {
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => !matches!(parent_op, BinaryOp::Implies),
    }
}

/// A unary operand needs parens iff it is itself a `Binary` node: `parse_unary`
/// never recurses into a binary tier without an intervening `(`
/// (`-a + b` and `-(a + b)` are different trees), but it happily accepts a
/// bare `Unary`, `Conditional`, or anything at postfix tier or tighter.
fn unary_operand_needs_parens(operand: &Expr) -> bool {
    matches!(operand, Expr::Binary { .. })
}

pub(crate) fn write_expr(e: &Expr) -> String {
    match e {
        Expr::String(s, _) => format!("\"{}\"", escape_string(s)),
        Expr::Number { value, is_float, .. } => write_number(*value, *is_float),
        Expr::Boolean(b, _) => b.to_string(),
        Expr::Null(_) => "null".to_string(),
        Expr::Duration { value, unit, .. } => write_duration(*value, unit),
        Expr::Regex { pattern, flags, .. } => format!("/{pattern}/{flags}"),
        Expr::Identifier { name, .. } => name.clone(),
        Expr::QualifiedName { parts, .. } => parts.join("."),
        Expr::Binary { op, left, right, .. } => {
            let l = write_expr(left);
            let r = write_expr(right);
            let l = if left_needs_parens(left, *op) { format!("({l})") } else { l };
            let r = if right_needs_parens(right, *op) { format!("({r})") } else { r };
            format!("{l} {} {r}", op.as_str())
        }
        Expr::Unary { op, operand, .. } => {
            let inner = write_expr(operand);
            let inner = if unary_operand_needs_parens(operand) { format!("({inner})") } else { inner };
            match op {
                UnaryOp::Not => format!("not {inner}"),
                UnaryOp::Neg => format!("-{inner}"),
            }
        }
        Expr::Call { callee, args, .. } => {
            format!("{}({})", write_expr(callee), args.iter().map(write_expr).collect::<Vec<_>>().join(", "))
        }
        Expr::Member { object, property, .. } => format!("{}.{}", write_expr(object), property),
        Expr::Index { object, index, .. } => format!("{}[{}]", write_expr(object), write_expr(index)),
        Expr::Quantifier { kind, var, collection, predicate, .. } => {
            format!("{}({}, {} => {})", kind.as_str(), write_expr(collection), var, write_expr(predicate))
        }
        Expr::Conditional { cond, then_branch, else_branch, .. } => match else_branch {
            Some(e) => format!("{} ? {} : {}", write_expr(cond), write_expr(then_branch), write_expr(e)),
            None => format!("{} ? {}", write_expr(cond), write_expr(then_branch)),
        },
        Expr::Lambda { params, body, .. } => format!("({}) => {}", params.join(", "), write_expr(body)),
        Expr::Old { expr, .. } => format!("old({})", write_expr(expr)),
        Expr::Result { property, .. } => match property {
            Some(p) => format!("result.{p}"),
            None => "result".to_string(),
        },
        Expr::Input { property, .. } => format!("input.{property}"),
        Expr::List { elements, .. } => format!("[{}]", elements.iter().map(write_expr).collect::<Vec<_>>().join(", ")),
        Expr::Map { entries, .. } => {
            format!("{{{}}}", entries.iter().map(write_map_entry).collect::<Vec<_>>().join(", "))
        }
    }
}

fn write_map_entry(entry: &MapEntry) -> String {
    format!("{}: {}", write_expr(&entry.key), write_expr(&entry.value))
}

/// Forces a decimal point onto whole-valued floats: `f64`'s `Display` drops
/// a trailing `.0` (`2.0` prints as `"2"`), which would flip `is_float` to
/// `false` on reparse.
fn write_number(value: f64, is_float: bool) -> String {
    if is_float && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Whole-valued durations print with the `<value>.<unit>` form the grammar
/// shows (§4.4); a fractional value must glue the unit directly (`1.5ms`,
/// never `1.5.ms` — the lexer only allows a bare `.` before the unit when
/// no fractional digits were already consumed).
fn write_duration(value: f64, unit: &str) -> String {
    if value.fract() == 0.0 {
        format!("{}.{unit}", value as i64)
    } else {
        format!("{value}{unit}")
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_ast::NodeSpan;
    use isl_position::Span;

    fn sp() -> NodeSpan {
        NodeSpan(Span::synthetic())
    }

    fn ident(name: &str) -> Expr {
        Expr::Identifier { name: name.to_string(), span: sp() }
    }

    fn bin(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary { op, left: Box::new(left), right: Box::new(right), span: sp() }
    }

    #[test]
    fn same_precedence_left_assoc_needs_no_left_parens() {
        // a - b - c, reachable directly as Binary{Sub, Binary{Sub,a,b}, c}
        let e = bin(BinaryOp::Sub, bin(BinaryOp::Sub, ident("a"), ident("b")), ident("c"));
        assert_eq!(write_expr(&e), "a - b - c");
    }

    #[test]
    fn same_precedence_right_operand_needs_parens() {
        // Binary{Sub, a, Binary{Sub,b,c}} is only reachable via "a - (b - c)".
        let e = bin(BinaryOp::Sub, ident("a"), bin(BinaryOp::Sub, ident("b"), ident("c")));
        assert_eq!(write_expr(&e), "a - (b - c)");
    }

    #[test]
    fn implies_right_assoc_chain_prints_bare() {
        let e = bin(BinaryOp::Implies, ident("a"), bin(BinaryOp::Implies, ident("b"), ident("c")));
        assert_eq!(write_expr(&e), "a implies b implies c");
    }

    #[test]
    fn implies_left_child_needs_parens() {
        let e = bin(BinaryOp::Implies, bin(BinaryOp::Implies, ident("a"), ident("b")), ident("c"));
        assert_eq!(write_expr(&e), "(a implies b) implies c");
    }

    #[test]
    fn unary_over_binary_operand_needs_parens() {
        let e = Expr::Unary {
            op: UnaryOp::Neg,
            operand: Box::new(bin(BinaryOp::Add, ident("a"), ident("b"))),
            span: sp(),
        };
        assert_eq!(write_expr(&e), "-(a + b)");
    }

    #[test]
    fn whole_number_float_keeps_decimal_point() {
        let e = Expr::Number { value: 2.0, is_float: true, span: sp() };
        assert_eq!(write_expr(&e), "2.0");
    }

    #[test]
    fn integer_literal_has_no_decimal_point() {
        let e = Expr::Number { value: 2.0, is_float: false, span: sp() };
        assert_eq!(write_expr(&e), "2");
    }

    #[test]
    fn whole_duration_uses_dot_unit_form() {
        let e = Expr::Duration { value: 500.0, unit: "ms".to_string(), span: sp() };
        assert_eq!(write_expr(&e), "500.ms");
    }

    #[test]
    fn fractional_duration_has_no_extra_dot() {
        let e = Expr::Duration { value: 1.5, unit: "ms".to_string(), span: sp() };
        assert_eq!(write_expr(&e), "1.5ms");
    }

    #[test]
    fn string_escapes_minimal_set() {
        let e = Expr::String("a\n\"b\"\\c".to_string(), sp());
        assert_eq!(write_expr(&e), "\"a\\n\\\"b\\\"\\\\c\"");
    }

    #[test]
    fn quantifier_prints_lambda_call_form() {
        let e = Expr::Quantifier {
            kind: QuantifierKind::All,
            var: "x".to_string(),
            collection: Box::new(ident("items")),
            predicate: Box::new(Expr::Member { object: Box::new(ident("x")), property: "valid".to_string(), span: sp() }),
            span: sp(),
        };
        assert_eq!(write_expr(&e), "all(items, x => x.valid)");
    }
}
