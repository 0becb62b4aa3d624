use crate::span::NodeSpan;

/// Binary operators. `and`/`or` absorb their `&&`/`||` lexer aliases; the
/// parser folds them into the same variant before the AST is built, since the
/// distinction only matters to diagnostics ("expected `&&`"), never to
/// evaluation or unparsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Implies,
    Iff,
    In,
}

impl BinaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Implies => "implies",
            BinaryOp::Iff => "iff",
            BinaryOp::In => "in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Neg => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantifierKind {
    All,
    Any,
    None,
    Count,
    Sum,
    Filter,
}

impl QuantifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuantifierKind::All => "all",
            QuantifierKind::Any => "any",
            QuantifierKind::None => "none",
            QuantifierKind::Count => "count",
            QuantifierKind::Sum => "sum",
            QuantifierKind::Filter => "filter",
        }
    }
}

/// A map-literal entry; kept as a dedicated struct (rather than a tuple)
/// since both the parser and unparser name the two sides differently from an
/// ordinary `(Expr, Expr)` pair drawn from elsewhere in the grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: Expr,
    pub value: Expr,
}

/// A single lambda parameter name — lambdas in this grammar never destructure,
/// so a parameter is just an identifier.
pub type Param = String;

/// The expression AST. A closed tagged-variant tree; every node carries a
/// [`NodeSpan`] so spans never participate in structural equality, matching
/// the round-trip and `parse(s) == parse(s)` invariants in the testable
/// properties.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    String(String, NodeSpan),
    Number { value: f64, is_float: bool, span: NodeSpan },
    Boolean(bool, NodeSpan),
    Null(NodeSpan),
    Duration { value: f64, unit: String, span: NodeSpan },
    Regex { pattern: String, flags: String, span: NodeSpan },

    Identifier { name: String, span: NodeSpan },
    QualifiedName { parts: Vec<String>, span: NodeSpan },

    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr>, span: NodeSpan },
    Unary { op: UnaryOp, operand: Box<Expr>, span: NodeSpan },

    Call { callee: Box<Expr>, args: Vec<Expr>, span: NodeSpan },
    Member { object: Box<Expr>, property: String, span: NodeSpan },
    Index { object: Box<Expr>, index: Box<Expr>, span: NodeSpan },

    Quantifier {
        kind: QuantifierKind,
        var: String,
        collection: Box<Expr>,
        predicate: Box<Expr>,
        span: NodeSpan,
    },

    Conditional { cond: Box<Expr>, then_branch: Box<Expr>, else_branch: Option<Box<Expr>>, span: NodeSpan },
    Lambda { params: Vec<Param>, body: Box<Expr>, span: NodeSpan },

    Old { expr: Box<Expr>, span: NodeSpan },
    Result { property: Option<String>, span: NodeSpan },
    Input { property: String, span: NodeSpan },

    List { elements: Vec<Expr>, span: NodeSpan },
    Map { entries: Vec<MapEntry>, span: NodeSpan },
}

impl Expr {
    pub fn span(&self) -> &isl_position::Span {
        match self {
            Expr::String(_, s)
            | Expr::Boolean(_, s)
            | Expr::Null(s)
            | Expr::Number { span: s, .. }
            | Expr::Duration { span: s, .. }
            | Expr::Regex { span: s, .. }
            | Expr::Identifier { span: s, .. }
            | Expr::QualifiedName { span: s, .. }
            | Expr::Binary { span: s, .. }
            | Expr::Unary { span: s, .. }
            | Expr::Call { span: s, .. }
            | Expr::Member { span: s, .. }
            | Expr::Index { span: s, .. }
            | Expr::Quantifier { span: s, .. }
            | Expr::Conditional { span: s, .. }
            | Expr::Lambda { span: s, .. }
            | Expr::Old { span: s, .. }
            | Expr::Result { span: s, .. }
            | Expr::Input { span: s, .. }
            | Expr::List { span: s, .. }
            | Expr::Map { span: s, .. } => s,
        }
    }

    /// Direct children of this node, in evaluation/operand order. Mirrors the
    /// `for_each_child`/`children()` traversal helpers on the tagged-variant
    /// AST this crate is grounded on: one generic way to walk the tree,
    /// rather than every caller (evaluator, unparser, round-trip tests)
    /// re-deriving its own match arms.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::String(..) | Expr::Number { .. } | Expr::Boolean(..) | Expr::Null(_)
            | Expr::Duration { .. } | Expr::Regex { .. } | Expr::Identifier { .. }
            | Expr::QualifiedName { .. } | Expr::Result { .. } | Expr::Input { .. } => vec![],
            Expr::Binary { left, right, .. } => vec![left, right],
            Expr::Unary { operand, .. } => vec![operand],
            Expr::Call { callee, args, .. } => {
                let mut v = vec![callee.as_ref()];
                v.extend(args.iter());
                v
            }
            Expr::Member { object, .. } => vec![object],
            Expr::Index { object, index, .. } => vec![object, index],
            Expr::Quantifier { collection, predicate, .. } => vec![collection, predicate],
            Expr::Conditional { cond, then_branch, else_branch, .. } => {
                let mut v = vec![cond.as_ref(), then_branch.as_ref()];
                if let Some(e) = else_branch {
                    v.push(e);
                }
                v
            }
            Expr::Lambda { body, .. } => vec![body],
            Expr::Old { expr, .. } => vec![expr],
            Expr::List { elements, .. } => elements.iter().collect(),
            Expr::Map { entries, .. } => entries.iter().flat_map(|e| vec![&e.key, &e.value]).collect(),
        }
    }

    pub fn first_child(&self) -> Option<&Expr> {
        self.children().into_iter().next()
    }

    pub fn for_each_child<'a>(&'a self, mut f: impl FnMut(&'a Expr)) {
        for child in self.children() {
            f(child);
        }
    }

    /// Counts this node plus every descendant.
    pub fn count_nodes(&self) -> usize {
        1 + self.children().iter().map(|c| c.count_nodes()).sum::<usize>()
    }

    /// Renders a tree-sitter-style S-expression, useful for debugging and for
    /// fixture-based tests that want a readable, diffable shape without
    /// depending on `Debug`'s exact formatting.
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        self.to_sexp_inner(&mut out);
        out
    }

    fn to_sexp_inner(&self, out: &mut String) {
        match self {
            Expr::String(v, _) => out.push_str(&format!("(string {v:?})")),
            Expr::Number { value, is_float, .. } => out.push_str(&format!("(number {value} float={is_float})")),
            Expr::Boolean(v, _) => out.push_str(&format!("(boolean {v})")),
            Expr::Null(_) => out.push_str("(null)"),
            Expr::Duration { value, unit, .. } => out.push_str(&format!("(duration {value} {unit})")),
            Expr::Regex { pattern, flags, .. } => out.push_str(&format!("(regex {pattern:?} {flags:?})")),
            Expr::Identifier { name, .. } => out.push_str(&format!("(identifier {name})")),
            Expr::QualifiedName { parts, .. } => out.push_str(&format!("(qualified-name {})", parts.join("."))),
            Expr::Binary { op, left, right, .. } => {
                out.push_str(&format!("(binary {} ", op.as_str()));
                left.to_sexp_inner(out);
                out.push(' ');
                right.to_sexp_inner(out);
                out.push(')');
            }
            Expr::Unary { op, operand, .. } => {
                out.push_str(&format!("(unary {} ", op.as_str()));
                operand.to_sexp_inner(out);
                out.push(')');
            }
            Expr::Call { callee, args, .. } => {
                out.push_str("(call ");
                callee.to_sexp_inner(out);
                for a in args {
                    out.push(' ');
                    a.to_sexp_inner(out);
                }
                out.push(')');
            }
            Expr::Member { object, property, .. } => {
                out.push_str("(member ");
                object.to_sexp_inner(out);
                out.push_str(&format!(" {property})"));
            }
            Expr::Index { object, index, .. } => {
                out.push_str("(index ");
                object.to_sexp_inner(out);
                out.push(' ');
                index.to_sexp_inner(out);
                out.push(')');
            }
            Expr::Quantifier { kind, var, collection, predicate, .. } => {
                out.push_str(&format!("(quantifier {} {var} ", kind.as_str()));
                collection.to_sexp_inner(out);
                out.push(' ');
                predicate.to_sexp_inner(out);
                out.push(')');
            }
            Expr::Conditional { cond, then_branch, else_branch, .. } => {
                out.push_str("(conditional ");
                cond.to_sexp_inner(out);
                out.push(' ');
                then_branch.to_sexp_inner(out);
                if let Some(e) = else_branch {
                    out.push(' ');
                    e.to_sexp_inner(out);
                }
                out.push(')');
            }
            Expr::Lambda { params, body, .. } => {
                out.push_str(&format!("(lambda ({}) ", params.join(" ")));
                body.to_sexp_inner(out);
                out.push(')');
            }
            Expr::Old { expr, .. } => {
                out.push_str("(old ");
                expr.to_sexp_inner(out);
                out.push(')');
            }
            Expr::Result { property, .. } => match property {
                Some(p) => out.push_str(&format!("(result {p})")),
                None => out.push_str("(result)"),
            },
            Expr::Input { property, .. } => out.push_str(&format!("(input {property})")),
            Expr::List { elements, .. } => {
                out.push_str("(list");
                for e in elements {
                    out.push(' ');
                    e.to_sexp_inner(out);
                }
                out.push(')');
            }
            Expr::Map { entries, .. } => {
                out.push_str("(map");
                for entry in entries {
                    out.push_str(" (entry ");
                    entry.key.to_sexp_inner(out);
                    out.push(' ');
                    entry.value.to_sexp_inner(out);
                    out.push(')');
                }
                out.push(')');
            }
        }
    }
}
