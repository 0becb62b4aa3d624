//! The tri-state expression evaluator (§4.5): `evaluate(expr, ctx, options) →
//! EvaluationResult`.
//!
//! Two representations are threaded through recursion: the public
//! [`EvaluationResult`] tree (a `TriState` plus span/reason/children, the
//! only thing `evaluate` returns) and, internally, a resolved [`Value`] per
//! node so that parent nodes — `Binary` comparisons, `Member`/`Index`
//! chains, `Call` argument/criteria building — can compose real data rather
//! than only truth values. `Resolved` never crosses the public API; it is an
//! implementation detail of the recursive walk, not a second result shape.

use crate::adapter::{ExpressionAdapter, Lookup};
use crate::context::EvaluationContext;
use crate::store::EntityStore;
use crate::tristate::TriState;
use crate::value::{truthiness, Value};
use isl_ast::{BinaryOp, Expr, QuantifierKind, UnaryOp};
use isl_position::Span;
use serde::{Deserialize, Serialize};

/// One node's outcome: the tri-state value, the span it covers, an optional
/// human-readable reason (set whenever `value` is not `True`, per §4.5), and
/// the child results in operand order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub value: TriState,
    pub span: Span,
    pub reason: Option<String>,
    pub children: Vec<EvaluationResult>,
}

impl EvaluationResult {
    fn leaf(value: TriState, span: Span, reason: Option<&str>) -> Self {
        Self { value, span, reason: reason.map(str::to_string), children: Vec::new() }
    }

    fn with_children(value: TriState, span: Span, reason: Option<String>, children: Vec<EvaluationResult>) -> Self {
        Self { value, span, reason, children }
    }
}

/// Knobs for a single `evaluate` call (§6). `adapter` defaults to
/// [`crate::adapter::DefaultAdapter`]; `max_depth` to 100 (§4.5's
/// configurable recursion cap); `collect_children` lets a caller who only
/// wants the root `value`/`reason` skip building the full child tree for
/// large expressions.
pub struct EvaluationOptions<'a> {
    pub adapter: &'a dyn ExpressionAdapter,
    pub max_depth: usize,
    pub collect_children: bool,
}

impl<'a> EvaluationOptions<'a> {
    pub fn new(adapter: &'a dyn ExpressionAdapter) -> Self {
        Self { adapter, max_depth: 100, collect_children: true }
    }
}

impl Default for EvaluationOptions<'static> {
    fn default() -> Self {
        Self { adapter: &crate::adapter::DEFAULT_ADAPTER, max_depth: 100, collect_children: true }
    }
}

/// A node's fully resolved outcome, used only inside recursion: the public
/// `TriState`/reason pair plus the underlying [`Value`] data (when one could
/// be produced) so an enclosing node can keep computing with real data
/// instead of only a truth value.
struct Resolved {
    tri: TriState,
    reason: Option<String>,
    value: Option<Value>,
    children: Vec<EvaluationResult>,
}

impl Resolved {
    fn truthy(value: Value, span: Span) -> Resolved {
        let tri = truthiness(&value);
        let reason = if tri.is_true() { None } else { Some("falsy value".to_string()) };
        Resolved { tri, reason, value: Some(value), children: Vec::new() }
    }

    fn tri_only(tri: TriState, reason: Option<String>) -> Resolved {
        Resolved { tri, reason, value: None, children: Vec::new() }
    }

    fn into_result(self, span: Span) -> EvaluationResult {
        EvaluationResult::with_children(self.tri, span, self.reason, self.children)
    }
}

/// Evaluates `expr` against `ctx` using `options`. Never panics and never
/// returns an `Err`: every failure mode this language can reach is encoded
/// as `False` (a concrete violation) or `Unknown` (an information failure)
/// inside the result tree itself (§7).
pub fn evaluate(expr: &Expr, ctx: &EvaluationContext<'_>, options: &EvaluationOptions<'_>) -> EvaluationResult {
    walk(expr, ctx, options, 0).into_result(*expr.span())
}

fn depth_exceeded() -> Resolved {
    Resolved::tri_only(TriState::False, Some("Maximum evaluation depth exceeded".to_string()))
}

fn walk(expr: &Expr, ctx: &EvaluationContext<'_>, options: &EvaluationOptions<'_>, depth: usize) -> Resolved {
    if depth > options.max_depth {
        return depth_exceeded();
    }
    match expr {
        Expr::String(s, _) => Resolved::truthy(Value::String(s.clone()), *expr.span()),
        Expr::Number { value, .. } => Resolved::truthy(Value::Number(*value), *expr.span()),
        Expr::Boolean(b, _) => Resolved::truthy(Value::Bool(*b), *expr.span()),
        Expr::Null(_) => Resolved {
            tri: TriState::False,
            reason: None,
            value: Some(Value::Null),
            children: Vec::new(),
        },
        Expr::Duration { value, unit, .. } => {
            Resolved::truthy(Value::Duration { value: *value, unit: unit.clone() }, *expr.span())
        }
        Expr::Regex { pattern, .. } => Resolved::truthy(Value::String(pattern.clone()), *expr.span()),

        Expr::Identifier { name, span } => eval_identifier(name, ctx, *span),
        Expr::QualifiedName { parts, span } => eval_identifier(&parts.join("."), ctx, *span),

        Expr::Binary { op, left, right, span } => eval_binary(*op, left, right, ctx, options, depth, *span),
        Expr::Unary { op, operand, span } => eval_unary(*op, operand, ctx, options, depth, *span),

        Expr::Member { object, property, span } => eval_member(object, property, ctx, options, depth, *span),
        Expr::Index { object, index, span } => eval_index(object, index, ctx, options, depth, *span),
        Expr::Call { callee, args, span } => eval_call(callee, args, ctx, options, depth, *span),

        Expr::Quantifier { kind, var, collection, predicate, span } => {
            eval_quantifier(*kind, var, collection, predicate, ctx, options, depth, *span)
        }

        Expr::Conditional { cond, then_branch, else_branch, span } => {
            eval_conditional(cond, then_branch, else_branch.as_deref(), ctx, options, depth, *span)
        }

        Expr::Lambda { .. } => Resolved::tri_only(TriState::True, None),

        Expr::Old { expr: inner, span } => eval_old(inner, ctx, options, depth, *span),
        Expr::Result { property, .. } => eval_optional_slot(ctx.result.as_ref(), property.as_deref()),
        Expr::Input { property, .. } => eval_property_of(&ctx.input, property),

        Expr::List { elements, span } => eval_list(elements, ctx, options, depth, *span),
        Expr::Map { entries, span } => eval_map(entries, ctx, options, depth, *span),
    }
}

fn eval_identifier(name: &str, ctx: &EvaluationContext<'_>, _span: Span) -> Resolved {
    if let Some(v) = ctx.variables.get(name) {
        return Resolved::truthy(v.clone(), _span);
    }
    match name {
        "true" => return Resolved::truthy(Value::Bool(true), _span),
        "false" => return Resolved::truthy(Value::Bool(false), _span),
        "null" => {
            return Resolved { tri: TriState::False, reason: None, value: Some(Value::Null), children: Vec::new() }
        }
        "now" => return Resolved::truthy(ctx.now.clone(), _span),
        "result" => {
            return match &ctx.result {
                Some(v) => Resolved::truthy(v.clone(), _span),
                None => Resolved::tri_only(TriState::False, Some("Unknown identifier".to_string())),
            }
        }
        "error" => {
            return match &ctx.error {
                Some(v) => Resolved::truthy(v.clone(), _span),
                None => Resolved::tri_only(TriState::False, Some("Unknown identifier".to_string())),
            }
        }
        "input" => return Resolved::truthy(ctx.input.clone(), _span),
        _ => {}
    }
    if let Some(v) = ctx.input.get(name) {
        return Resolved::truthy(v.clone(), _span);
    }
    if ctx.domain.find_entity(name).is_some() {
        return Resolved::truthy(Value::String(name.to_string()), _span);
    }
    Resolved::tri_only(TriState::False, Some("Unknown identifier".to_string()))
}

fn eval_optional_slot(slot: Option<&Value>, property: Option<&str>) -> Resolved {
    let Some(v) = slot else {
        return Resolved::tri_only(TriState::False, Some("Unknown identifier".to_string()));
    };
    match property {
        None => Resolved::truthy(v.clone(), Span::synthetic()),
        Some(p) => eval_property_of(v, p),
    }
}

fn eval_property_of(v: &Value, property: &str) -> Resolved {
    match v.get(property) {
        Some(inner) => Resolved::truthy(inner.clone(), Span::synthetic()),
        None => {
            if v.is_null() {
                Resolved::tri_only(TriState::Unknown, None)
            } else {
                Resolved::tri_only(TriState::False, Some(format!("No such property: {property}")))
            }
        }
    }
}

fn eval_member(
    object: &Expr,
    property: &str,
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
    span: Span,
) -> Resolved {
    let obj = walk(object, ctx, options, depth + 1);
    if obj.tri.is_unknown() {
        return Resolved::tri_only(TriState::Unknown, None).with_child(obj.into_result(*object.span()));
    }
    let Some(obj_value) = &obj.value else {
        return Resolved::tri_only(TriState::Unknown, None).with_child(obj.into_result(*object.span()));
    };
    if obj_value.is_null() {
        return Resolved::tri_only(TriState::Unknown, None).with_child(obj.into_result(*object.span()));
    }

    if property == "length" {
        return match options.adapter.length(obj_value) {
            crate::adapter::LengthResult::Known(n) => Resolved::truthy(Value::Number(n as f64), span),
            crate::adapter::LengthResult::Unknown => {
                Resolved::tri_only(TriState::Unknown, Some("length is not defined for this value".to_string()))
            }
        };
    }

    match obj_value.get(property) {
        Some(v) => Resolved::truthy(v.clone(), span),
        None => Resolved::tri_only(TriState::False, None),
    }
}

impl Resolved {
    fn with_child(mut self, child: EvaluationResult) -> Resolved {
        self.children.push(child);
        self
    }

    fn with_children_vec(mut self, children: Vec<EvaluationResult>) -> Resolved {
        self.children = children;
        self
    }
}

fn eval_index(
    object: &Expr,
    index: &Expr,
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
    _span: Span,
) -> Resolved {
    let obj = walk(object, ctx, options, depth + 1);
    let idx = walk(index, ctx, options, depth + 1);
    let children = vec![inner_clone_for_children(&obj, *object.span()), inner_clone_for_children(&idx, *index.span())];

    if obj.tri.is_unknown() || idx.tri.is_unknown() {
        return Resolved::tri_only(TriState::Unknown, None).with_children_vec(children);
    }
    let (Some(obj_value), Some(idx_value)) = (&obj.value, &idx.value) else {
        return Resolved::tri_only(TriState::Unknown, None).with_children_vec(children);
    };
    if obj_value.is_null() {
        return Resolved::tri_only(TriState::Unknown, None).with_children_vec(children);
    }

    match obj_value {
        Value::List(items) => {
            let Some(i) = idx_value.as_number() else {
                return Resolved::tri_only(TriState::False, Some("Index is not numeric".to_string()))
                    .with_children_vec(children);
            };
            let i = i as i64;
            if i < 0 || i as usize >= items.len() {
                Resolved::tri_only(TriState::False, Some("Index out of bounds".to_string())).with_children_vec(children)
            } else {
                Resolved::truthy(items[i as usize].clone(), _span).with_children_vec(children)
            }
        }
        Value::Map(_) => {
            let Some(key) = idx_value.as_str() else {
                return Resolved::tri_only(TriState::False, Some("Index key is not a string".to_string()))
                    .with_children_vec(children);
            };
            match obj_value.get(key) {
                Some(v) => Resolved::truthy(v.clone(), _span).with_children_vec(children),
                None => Resolved::tri_only(TriState::False, Some(format!("No such key: {key}"))).with_children_vec(children),
            }
        }
        _ => Resolved::tri_only(TriState::False, Some("Value is not indexable".to_string())).with_children_vec(children),
    }
}

fn eval_unary(
    op: UnaryOp,
    operand: &Expr,
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
    _span: Span,
) -> Resolved {
    let inner = walk(operand, ctx, options, depth + 1);
    let child = inner_clone_for_children(&inner, *operand.span());
    match op {
        UnaryOp::Not => {
            let tri = inner.tri.not();
            let reason = if tri.is_false() { Some("Negation of true value".to_string()) } else { None };
            Resolved::tri_only(tri, reason).with_child(child)
        }
        UnaryOp::Neg => match inner.value.as_ref().and_then(Value::as_number) {
            Some(n) => Resolved::truthy(Value::Number(-n), _span).with_child(child),
            None => Resolved::tri_only(TriState::False, Some("Operand is not numeric".to_string())).with_child(child),
        },
    }
}

fn inner_clone_for_children(r: &Resolved, span: Span) -> EvaluationResult {
    r.clone_for_children(span)
}

fn eval_binary(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
    span: Span,
) -> Resolved {
    match op {
        BinaryOp::And => {
            let l = walk(left, ctx, options, depth + 1);
            if l.tri.is_false() {
                return Resolved::tri_only(TriState::False, Some("Left operand is false".to_string()))
                    .with_child(l.into_result(*left.span()));
            }
            let r = walk(right, ctx, options, depth + 1);
            let tri = l.tri.and(r.tri);
            let reason = if tri.is_false() { Some("Operands not both true".to_string()) } else { None };
            Resolved::tri_only(tri, reason)
                .with_children_vec(vec![l.into_result(*left.span()), r.into_result(*right.span())])
        }
        BinaryOp::Or => {
            let l = walk(left, ctx, options, depth + 1);
            if l.tri.is_true() {
                return Resolved::tri_only(TriState::True, None).with_child(l.into_result(*left.span()));
            }
            let r = walk(right, ctx, options, depth + 1);
            let tri = l.tri.or(r.tri);
            let reason = if tri.is_false() { Some("Neither operand is true".to_string()) } else { None };
            Resolved::tri_only(tri, reason)
                .with_children_vec(vec![l.into_result(*left.span()), r.into_result(*right.span())])
        }
        BinaryOp::Implies => {
            let l = walk(left, ctx, options, depth + 1);
            let r = walk(right, ctx, options, depth + 1);
            let tri = l.tri.implies(r.tri);
            let reason = if tri.is_false() { Some("Premise true but conclusion false".to_string()) } else { None };
            Resolved::tri_only(tri, reason)
                .with_children_vec(vec![l.into_result(*left.span()), r.into_result(*right.span())])
        }
        BinaryOp::Iff => {
            let l = walk(left, ctx, options, depth + 1);
            let r = walk(right, ctx, options, depth + 1);
            let tri = l.tri.iff(r.tri);
            let reason = if tri.is_false() { Some("Operands disagree".to_string()) } else { None };
            Resolved::tri_only(tri, reason)
                .with_children_vec(vec![l.into_result(*left.span()), r.into_result(*right.span())])
        }
        BinaryOp::Eq | BinaryOp::NotEq => {
            let l = walk(left, ctx, options, depth + 1);
            let r = walk(right, ctx, options, depth + 1);
            let children = vec![inner_clone_for_children(&l, *left.span()), inner_clone_for_children(&r, *right.span())];
            if l.tri.is_unknown() || r.tri.is_unknown() {
                return Resolved::tri_only(TriState::Unknown, None).with_children_vec(children);
            }
            let (Some(lv), Some(rv)) = (&l.value, &r.value) else {
                return Resolved::tri_only(TriState::Unknown, None).with_children_vec(children);
            };
            let eq = lv == rv;
            let result = if op == BinaryOp::Eq { eq } else { !eq };
            let reason = if !result {
                Some(format!("Values not equal: {lv} != {rv}"))
            } else {
                None
            };
            Resolved::tri_only(TriState::from_bool(result), reason).with_children_vec(children)
        }
        BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
            eval_numeric_comparison(op, left, right, ctx, options, depth)
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            eval_arithmetic(op, left, right, ctx, options, depth, span)
        }
        BinaryOp::In => eval_in(left, right, ctx, options, depth),
    }
}

fn eval_numeric_comparison(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
) -> Resolved {
    let l = walk(left, ctx, options, depth + 1);
    let r = walk(right, ctx, options, depth + 1);
    let children = vec![inner_clone_for_children(&l, *left.span()), inner_clone_for_children(&r, *right.span())];
    if l.tri.is_unknown() || r.tri.is_unknown() {
        return Resolved::tri_only(TriState::Unknown, None).with_children_vec(children);
    }
    let (Some(ln), Some(rn)) = (l.value.as_ref().and_then(Value::as_number), r.value.as_ref().and_then(Value::as_number)) else {
        return Resolved::tri_only(TriState::False, Some("Operands are not numeric".to_string())).with_children_vec(children);
    };
    let result = match op {
        BinaryOp::Lt => ln < rn,
        BinaryOp::LtEq => ln <= rn,
        BinaryOp::Gt => ln > rn,
        BinaryOp::GtEq => ln >= rn,
        _ => unreachable!("eval_numeric_comparison only receives ordering operators"),
    };
    let reason = if !result { Some(format!("{ln} is not {} {rn}", op.as_str())) } else { None };
    Resolved::tri_only(TriState::from_bool(result), reason).with_children_vec(children)
}

fn eval_arithmetic(
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
    span: Span,
) -> Resolved {
    let l = walk(left, ctx, options, depth + 1);
    let r = walk(right, ctx, options, depth + 1);
    let children = vec![inner_clone_for_children(&l, *left.span()), inner_clone_for_children(&r, *right.span())];
    if l.tri.is_unknown() || r.tri.is_unknown() {
        return Resolved::tri_only(TriState::Unknown, None).with_children_vec(children);
    }

    if op == BinaryOp::Add {
        if let (Some(Value::String(ls)), Some(Value::String(rs))) = (&l.value, &r.value) {
            return Resolved::truthy(Value::String(format!("{ls}{rs}")), span).with_children_vec(children);
        }
    }

    let (Some(ln), Some(rn)) = (l.value.as_ref().and_then(Value::as_number), r.value.as_ref().and_then(Value::as_number)) else {
        return Resolved::tri_only(TriState::False, Some("Operands are not numeric".to_string())).with_children_vec(children);
    };

    match op {
        BinaryOp::Add => Resolved::truthy(Value::Number(ln + rn), span).with_children_vec(children),
        BinaryOp::Sub => Resolved::truthy(Value::Number(ln - rn), span).with_children_vec(children),
        BinaryOp::Mul => Resolved::truthy(Value::Number(ln * rn), span).with_children_vec(children),
        BinaryOp::Div => {
            if rn == 0.0 {
                Resolved::tri_only(TriState::False, Some("Division by zero".to_string())).with_children_vec(children)
            } else {
                Resolved::truthy(Value::Number(ln / rn), span).with_children_vec(children)
            }
        }
        BinaryOp::Mod => {
            if rn == 0.0 {
                Resolved::tri_only(TriState::False, Some("Modulo by zero".to_string())).with_children_vec(children)
            } else {
                Resolved::truthy(Value::Number(ln % rn), span).with_children_vec(children)
            }
        }
        _ => unreachable!("eval_arithmetic only receives arithmetic operators"),
    }
}

fn eval_in(
    left: &Expr,
    right: &Expr,
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
) -> Resolved {
    let l = walk(left, ctx, options, depth + 1);
    let r = walk(right, ctx, options, depth + 1);
    let children = vec![inner_clone_for_children(&l, *left.span()), inner_clone_for_children(&r, *right.span())];
    if l.tri.is_unknown() || r.tri.is_unknown() {
        return Resolved::tri_only(TriState::Unknown, None).with_children_vec(children);
    }
    match (&l.value, &r.value) {
        (Some(needle), Some(Value::List(items))) => {
            let found = items.contains(needle);
            let reason = if !found { Some("Value not found in collection".to_string()) } else { None };
            Resolved::tri_only(TriState::from_bool(found), reason).with_children_vec(children)
        }
        (Some(Value::String(needle)), Some(Value::String(haystack))) => {
            let found = haystack.contains(needle.as_str());
            let reason = if !found { Some("Substring not found".to_string()) } else { None };
            Resolved::tri_only(TriState::from_bool(found), reason).with_children_vec(children)
        }
        _ => Resolved::tri_only(TriState::False, Some("Right-hand side is not a collection or string".to_string()))
            .with_children_vec(children),
    }
}

fn eval_conditional(
    cond: &Expr,
    then_branch: &Expr,
    else_branch: Option<&Expr>,
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
    _span: Span,
) -> Resolved {
    let c = walk(cond, ctx, options, depth + 1);
    let cond_result = c.into_result(*cond.span());

    if c.tri.is_true() {
        let then = walk(then_branch, ctx, options, depth + 1);
        let then_result = then.into_result(*then_branch.span());
        return Resolved::tri_only(then.tri, then.reason.clone()).with_children_vec(vec![cond_result, then_result]);
    }
    if c.tri.is_false() {
        return match else_branch {
            Some(e) => {
                let else_eval = walk(e, ctx, options, depth + 1);
                let else_result = else_eval.into_result(*e.span());
                Resolved::tri_only(else_eval.tri, else_eval.reason.clone())
                    .with_children_vec(vec![cond_result, else_result])
            }
            None => Resolved::tri_only(TriState::False, Some("no else branch and condition is false".to_string()))
                .with_children_vec(vec![cond_result]),
        };
    }

    let then = walk(then_branch, ctx, options, depth + 1);
    let then_result = then.into_result(*then_branch.span());
    let else_eval = else_branch.map(|e| (walk(e, ctx, options, depth + 1), *e.span()));
    let mut children = vec![cond_result, then_result];
    let tri = match &else_eval {
        Some((eev, eev_span)) => {
            children.push(eev.clone_for_children(*eev_span));
            if then.tri == eev.tri {
                then.tri
            } else {
                TriState::Unknown
            }
        }
        None => TriState::Unknown,
    };
    let reason = if tri.is_unknown() {
        Some("branches disagree under unknown condition".to_string())
    } else {
        None
    };
    Resolved::tri_only(tri, reason).with_children_vec(children)
}

impl Resolved {
    fn clone_for_children(&self, span: Span) -> EvaluationResult {
        EvaluationResult::with_children(self.tri, span, self.reason.clone(), self.children.clone())
    }
}

fn eval_old(
    inner: &Expr,
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
    _span: Span,
) -> Resolved {
    let Some(snapshot) = ctx.old_snapshot else {
        return Resolved::tri_only(TriState::False, Some("old() without previous state snapshot".to_string()));
    };
    let snapshot_ctx = ctx.with_snapshot_store(snapshot);
    let r = walk(inner, &snapshot_ctx, options, depth + 1);
    let child = r.clone_for_children(*inner.span());
    Resolved { tri: r.tri, reason: r.reason, value: r.value, children: vec![child] }
}

fn eval_list(
    elements: &[Expr],
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
    span: Span,
) -> Resolved {
    let mut values = Vec::with_capacity(elements.len());
    let mut children = Vec::with_capacity(elements.len());
    let mut any_unknown = false;
    for e in elements {
        let r = walk(e, ctx, options, depth + 1);
        any_unknown |= r.tri.is_unknown();
        if let Some(v) = &r.value {
            values.push(v.clone());
        }
        children.push(r.into_result(*e.span()));
    }
    if any_unknown {
        return Resolved::tri_only(TriState::Unknown, None).with_children_vec(children);
    }
    Resolved::truthy(Value::List(values), span).with_children_vec(children)
}

fn eval_map(
    entries: &[isl_ast::MapEntry],
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
    span: Span,
) -> Resolved {
    let mut map = std::collections::BTreeMap::new();
    let mut children = Vec::with_capacity(entries.len() * 2);
    let mut any_unknown = false;
    for entry in entries {
        let key_res = walk(&entry.key, ctx, options, depth + 1);
        let val_res = walk(&entry.value, ctx, options, depth + 1);
        any_unknown |= key_res.tri.is_unknown() || val_res.tri.is_unknown();
        if let (Some(Value::String(k)), Some(v)) = (&key_res.value, &val_res.value) {
            map.insert(k.clone(), v.clone());
        }
        children.push(key_res.into_result(*entry.key.span()));
        children.push(val_res.into_result(*entry.value.span()));
    }
    if any_unknown {
        return Resolved::tri_only(TriState::Unknown, None).with_children_vec(children);
    }
    Resolved::truthy(Value::Map(map), span).with_children_vec(children)
}

fn eval_quantifier(
    kind: QuantifierKind,
    var: &str,
    collection: &Expr,
    predicate: &Expr,
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
    span: Span,
) -> Resolved {
    let coll = walk(collection, ctx, options, depth + 1);
    let coll_result = coll.clone_for_children(*collection.span());
    if coll.tri.is_unknown() {
        return Resolved::tri_only(TriState::Unknown, None).with_child(coll_result);
    }
    let Some(items) = coll.value.as_ref().and_then(Value::as_list) else {
        return Resolved::tri_only(TriState::False, Some("Collection is not a list".to_string())).with_child(coll_result);
    };

    if items.is_empty() {
        let tri = match kind {
            QuantifierKind::All | QuantifierKind::None | QuantifierKind::Count | QuantifierKind::Sum => TriState::True,
            QuantifierKind::Any => TriState::False,
            QuantifierKind::Filter => TriState::True,
        };
        let reason = if tri.is_false() { Some("Empty collection".to_string()) } else { None };
        return Resolved::tri_only(tri, reason).with_child(coll_result);
    }

    let items = items.to_vec();
    let mut children = vec![coll_result];
    let mut per_element = Vec::with_capacity(items.len());
    for item in &items {
        let child_ctx = ctx.with_binding(var, item.clone());
        let r = walk(predicate, &child_ctx, options, depth + 1);
        children.push(r.clone_for_children(*predicate.span()));
        per_element.push(r.tri);
    }

    let any_unknown = per_element.iter().any(|t| t.is_unknown());
    let tri = match kind {
        QuantifierKind::All => {
            if per_element.iter().any(|t| t.is_false()) {
                TriState::False
            } else if any_unknown {
                TriState::Unknown
            } else {
                TriState::True
            }
        }
        QuantifierKind::Any => {
            if per_element.iter().any(|t| t.is_true()) {
                TriState::True
            } else if any_unknown {
                TriState::Unknown
            } else {
                TriState::False
            }
        }
        QuantifierKind::None => {
            if per_element.iter().any(|t| t.is_true()) {
                TriState::False
            } else if any_unknown {
                TriState::Unknown
            } else {
                TriState::True
            }
        }
        QuantifierKind::Count | QuantifierKind::Sum | QuantifierKind::Filter => {
            if any_unknown {
                TriState::Unknown
            } else {
                TriState::True
            }
        }
    };
    let reason = if tri.is_false() {
        Some(format!("Quantifier '{}' failed", kind.as_str()))
    } else {
        None
    };
    Resolved::tri_only(tri, reason).with_children_vec(children)
}

fn eval_call(
    callee: &Expr,
    args: &[Expr],
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
    span: Span,
) -> Resolved {
    if let Expr::Member { object, property, .. } = callee {
        if let Expr::Identifier { name, .. } = object.as_ref() {
            if ctx.domain.find_entity(name).is_some() {
                return eval_entity_call(name, property, args, ctx, options, depth);
            }
        }
        return eval_value_method_call(object, property, args, ctx, options, depth, span);
    }

    if let Expr::Identifier { name, .. } = callee {
        return eval_builtin_call(name, args, ctx, options, depth, span);
    }

    Resolved::tri_only(TriState::False, Some("Call target is not callable".to_string()))
}

fn build_criteria(
    args: &[Expr],
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
) -> Option<Value> {
    if args.is_empty() {
        return None;
    }
    if args.len() == 1 {
        if let Expr::Map { .. } = &args[0] {
            let r = walk(&args[0], ctx, options, depth + 1);
            return r.value;
        }
        if let Expr::Binary { op: BinaryOp::Eq, left, right, .. } = &args[0] {
            if let Expr::Identifier { name, .. } = left.as_ref() {
                let r = walk(right, ctx, options, depth + 1);
                return r.value.map(|v| Value::map([(name.clone(), v)]));
            }
        }
        let r = walk(&args[0], ctx, options, depth + 1);
        return r.value.map(|v| Value::map([("id".to_string(), v)]));
    }

    let mut map = std::collections::BTreeMap::new();
    for arg in args {
        if let Expr::Binary { op: BinaryOp::Eq, left, right, .. } = arg {
            if let Expr::Identifier { name, .. } = left.as_ref() {
                let r = walk(right, ctx, options, depth + 1);
                if let Some(v) = r.value {
                    map.insert(name.clone(), v);
                }
            }
        }
    }
    Some(Value::Map(map))
}

fn eval_entity_call(
    entity_name: &str,
    method: &str,
    args: &[Expr],
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
) -> Resolved {
    let criteria = build_criteria(args, ctx, options, depth);
    match method {
        "exists" => {
            let tri = options.adapter.exists(ctx.store, entity_name, criteria.as_ref());
            let reason = if tri.is_false() {
                Some(format!("{entity_name} does not exist"))
            } else if tri.is_unknown() {
                Some(format!("Cannot determine if {entity_name} exists"))
            } else {
                None
            };
            Resolved::tri_only(tri, reason)
        }
        "lookup" => {
            let Some(c) = criteria else {
                return Resolved::tri_only(TriState::False, Some("lookup requires criteria".to_string()));
            };
            match options.adapter.lookup(ctx.store, entity_name, &c) {
                Lookup::Found(v) => Resolved::truthy(v, Span::synthetic()),
                Lookup::NotFound => Resolved::tri_only(TriState::False, Some(format!("No matching {entity_name}"))),
                Lookup::Unknown => {
                    Resolved::tri_only(TriState::Unknown, Some(format!("Cannot look up {entity_name}")))
                }
            }
        }
        "count" => {
            let n = ctx.store.count(entity_name, criteria.as_ref());
            Resolved::truthy(Value::Number(n as f64), Span::synthetic())
        }
        "getAll" => {
            let items = ctx.store.get_all(entity_name);
            Resolved::truthy(Value::List(items), Span::synthetic())
        }
        _ => Resolved::tri_only(TriState::False, Some(format!("Unknown entity method: {method}"))),
    }
}

fn eval_value_method_call(
    object: &Expr,
    method: &str,
    args: &[Expr],
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
    span: Span,
) -> Resolved {
    let obj = walk(object, ctx, options, depth + 1);
    if obj.tri.is_unknown() {
        return Resolved::tri_only(TriState::Unknown, None);
    }
    let Some(obj_value) = &obj.value else {
        return Resolved::tri_only(TriState::Unknown, None);
    };

    let arg_values: Vec<Resolved> = args.iter().map(|a| walk(a, ctx, options, depth + 1)).collect();
    if arg_values.iter().any(|a| a.tri.is_unknown()) {
        return Resolved::tri_only(TriState::Unknown, None);
    }

    match method {
        "is_valid" => {
            let tri = options.adapter.is_valid(obj_value);
            let reason = if tri.is_false() { Some("Value is not valid".to_string()) } else { None };
            Resolved::tri_only(tri, reason)
        }
        "length" => match options.adapter.length(obj_value) {
            crate::adapter::LengthResult::Known(n) => Resolved::truthy(Value::Number(n as f64), span),
            crate::adapter::LengthResult::Unknown => {
                Resolved::tri_only(TriState::Unknown, Some("length is not defined for this value".to_string()))
            }
        },
        "contains" => match obj_value {
            Value::String(s) => {
                let needle = arg_values.first().and_then(|a| a.value.as_ref()).and_then(Value::as_str).unwrap_or("");
                Resolved::truthy(Value::Bool(s.contains(needle)), span)
            }
            Value::List(items) => {
                let needle = arg_values.first().and_then(|a| a.value.clone());
                let found = needle.map(|n| items.contains(&n)).unwrap_or(false);
                Resolved::truthy(Value::Bool(found), span)
            }
            _ => Resolved::tri_only(TriState::False, Some("contains is not defined for this value".to_string())),
        },
        "startsWith" => {
            if let Value::String(s) = obj_value {
                let needle = arg_values.first().and_then(|a| a.value.as_ref()).and_then(Value::as_str).unwrap_or("");
                Resolved::truthy(Value::Bool(s.starts_with(needle)), span)
            } else {
                Resolved::tri_only(TriState::False, Some("startsWith requires a string".to_string()))
            }
        }
        "endsWith" => {
            if let Value::String(s) = obj_value {
                let needle = arg_values.first().and_then(|a| a.value.as_ref()).and_then(Value::as_str).unwrap_or("");
                Resolved::truthy(Value::Bool(s.ends_with(needle)), span)
            } else {
                Resolved::tri_only(TriState::False, Some("endsWith requires a string".to_string()))
            }
        }
        "concat" => {
            if let Value::String(s) = obj_value {
                let suffix = arg_values.first().and_then(|a| a.value.as_ref()).and_then(Value::as_str).unwrap_or("");
                Resolved::truthy(Value::String(format!("{s}{suffix}")), span)
            } else {
                Resolved::tri_only(TriState::False, Some("concat requires a string".to_string()))
            }
        }
        "isEmpty" => match obj_value {
            Value::List(items) => Resolved::truthy(Value::Bool(items.is_empty()), span),
            Value::String(s) => Resolved::truthy(Value::Bool(s.is_empty()), span),
            _ => Resolved::tri_only(TriState::False, Some("isEmpty is not defined for this value".to_string())),
        },
        "sum" => match obj_value {
            Value::List(items) => {
                let total: f64 = items.iter().filter_map(Value::as_number).sum();
                Resolved::truthy(Value::Number(total), span)
            }
            _ => Resolved::tri_only(TriState::False, Some("sum requires a list".to_string())),
        },
        "count" => match obj_value {
            Value::List(items) => Resolved::truthy(Value::Number(items.len() as f64), span),
            _ => Resolved::tri_only(TriState::False, Some("count requires a list".to_string())),
        },
        "index" => match obj_value {
            Value::List(items) => {
                let needle = arg_values.first().and_then(|a| a.value.clone());
                let found = needle.and_then(|n| items.iter().position(|v| *v == n));
                match found {
                    Some(i) => Resolved::truthy(Value::Number(i as f64), span),
                    None => Resolved::tri_only(TriState::False, Some("Value not found in list".to_string())),
                }
            }
            _ => Resolved::tri_only(TriState::False, Some("index requires a list".to_string())),
        },
        _ => Resolved::tri_only(TriState::False, Some(format!("Unknown method: {method}"))),
    }
}

fn eval_builtin_call(
    name: &str,
    args: &[Expr],
    ctx: &EvaluationContext<'_>,
    options: &EvaluationOptions<'_>,
    depth: usize,
    span: Span,
) -> Resolved {
    match name {
        "all" | "any" | "none" => {
            if args.len() != 2 {
                return Resolved::tri_only(
                    TriState::False,
                    Some(format!("{name} requires a collection and a predicate")),
                );
            }
            let kind = match name {
                "all" => QuantifierKind::All,
                "any" => QuantifierKind::Any,
                _ => QuantifierKind::None,
            };
            if let Expr::Lambda { params, body, .. } = &args[1] {
                let var = params.first().cloned().unwrap_or_else(|| "it".to_string());
                return eval_quantifier(kind, &var, &args[0], body, ctx, options, depth, span);
            }
            Resolved::tri_only(TriState::False, Some("Second argument must be a lambda".to_string()))
        }
        "count" | "sum" | "min" | "max" => {
            let Some(first) = args.first() else {
                return Resolved::tri_only(TriState::False, Some(format!("{name} requires an argument")));
            };
            let r = walk(first, ctx, options, depth + 1);
            if r.tri.is_unknown() {
                return Resolved::tri_only(TriState::Unknown, None);
            }
            let Some(items) = r.value.as_ref().and_then(Value::as_list) else {
                return Resolved::tri_only(TriState::False, Some(format!("{name} requires a list")));
            };
            match name {
                "count" => Resolved::truthy(Value::Number(items.len() as f64), span),
                "sum" => Resolved::truthy(Value::Number(items.iter().filter_map(Value::as_number).sum()), span),
                "min" => match items.iter().filter_map(Value::as_number).fold(None, |acc, n| {
                    Some(acc.map_or(n, |m: f64| m.min(n)))
                }) {
                    Some(n) => Resolved::truthy(Value::Number(n), span),
                    None => Resolved::tri_only(TriState::False, Some("Empty collection has no minimum".to_string())),
                },
                "max" => match items.iter().filter_map(Value::as_number).fold(None, |acc, n| {
                    Some(acc.map_or(n, |m: f64| m.max(n)))
                }) {
                    Some(n) => Resolved::truthy(Value::Number(n), span),
                    None => Resolved::tri_only(TriState::False, Some("Empty collection has no maximum".to_string())),
                },
                _ => unreachable!(),
            }
        }
        "abs" | "round" | "floor" | "ceil" => {
            let Some(first) = args.first() else {
                return Resolved::tri_only(TriState::False, Some(format!("{name} requires an argument")));
            };
            let r = walk(first, ctx, options, depth + 1);
            if r.tri.is_unknown() {
                return Resolved::tri_only(TriState::Unknown, None);
            }
            let Some(n) = r.value.as_ref().and_then(Value::as_number) else {
                return Resolved::tri_only(TriState::False, Some(format!("{name} requires a number")));
            };
            let result = match name {
                "abs" => n.abs(),
                "round" => n.round(),
                "floor" => n.floor(),
                "ceil" => n.ceil(),
                _ => unreachable!(),
            };
            Resolved::truthy(Value::Number(result), span)
        }
        _ => Resolved::tri_only(TriState::False, Some(format!("Unknown function: {name}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::DEFAULT_ADAPTER;
    use crate::store::EmptyStore;
    use isl_ast::NodeSpan;
    use isl_position::Span as PSpan;

    fn sp() -> NodeSpan {
        NodeSpan(PSpan::synthetic())
    }

    fn empty_domain() -> isl_ast::Domain {
        isl_ast::Domain {
            name: "D".to_string(),
            version: "1.0.0".to_string(),
            owner: None,
            imports: vec![],
            type_decls: vec![],
            entities: vec![],
            behaviors: vec![],
            policies: vec![],
            views: vec![],
            scenario_blocks: vec![],
            chaos_blocks: vec![],
            invariants: vec![],
            span: sp(),
        }
    }

    fn num(n: f64) -> Expr {
        Expr::Number { value: n, is_float: n.fract() != 0.0, span: sp() }
    }

    #[test]
    fn literal_false_is_false_and_null_is_false() {
        let domain = empty_domain();
        let store = EmptyStore;
        let ctx = EvaluationContext::new(&domain, &store);
        let options = EvaluationOptions::new(&DEFAULT_ADAPTER);
        assert_eq!(evaluate(&Expr::Boolean(false, sp()), &ctx, &options).value, TriState::False);
        assert_eq!(evaluate(&Expr::Null(sp()), &ctx, &options).value, TriState::False);
        assert_eq!(evaluate(&Expr::Boolean(true, sp()), &ctx, &options).value, TriState::True);
    }

    #[test]
    fn division_by_zero_is_false_with_reason() {
        let domain = empty_domain();
        let store = EmptyStore;
        let ctx = EvaluationContext::new(&domain, &store);
        let options = EvaluationOptions::new(&DEFAULT_ADAPTER);
        let expr = Expr::Binary { op: BinaryOp::Div, left: Box::new(num(10.0)), right: Box::new(num(0.0)), span: sp() };
        let result = evaluate(&expr, &ctx, &options);
        assert_eq!(result.value, TriState::False);
        assert_eq!(result.reason.as_deref(), Some("Division by zero"));
    }

    #[test]
    fn vacuous_truth_holds_through_implies() {
        let domain = empty_domain();
        let store = EmptyStore;
        let ctx = EvaluationContext::new(&domain, &store);
        let options = EvaluationOptions::new(&DEFAULT_ADAPTER);
        let expr = Expr::Binary {
            op: BinaryOp::Implies,
            left: Box::new(Expr::Boolean(false, sp())),
            right: Box::new(Expr::Boolean(false, sp())),
            span: sp(),
        };
        assert_eq!(evaluate(&expr, &ctx, &options).value, TriState::True);
    }

    #[test]
    fn empty_collection_quantifier_laws() {
        let domain = empty_domain();
        let store = EmptyStore;
        let ctx = EvaluationContext::new(&domain, &store);
        let options = EvaluationOptions::new(&DEFAULT_ADAPTER);
        let all_expr = Expr::Quantifier {
            kind: QuantifierKind::All,
            var: "x".to_string(),
            collection: Box::new(Expr::List { elements: vec![], span: sp() }),
            predicate: Box::new(Expr::Boolean(true, sp())),
            span: sp(),
        };
        assert_eq!(evaluate(&all_expr, &ctx, &options).value, TriState::True);
        let any_expr = Expr::Quantifier {
            kind: QuantifierKind::Any,
            var: "x".to_string(),
            collection: Box::new(Expr::List { elements: vec![], span: sp() }),
            predicate: Box::new(Expr::Boolean(true, sp())),
            span: sp(),
        };
        assert_eq!(evaluate(&any_expr, &ctx, &options).value, TriState::False);
    }

    #[test]
    fn error_identifier_reads_the_context_error_value() {
        let domain = empty_domain();
        let store = EmptyStore;
        let ctx = EvaluationContext::new(&domain, &store)
            .with_error(Value::map([("code".to_string(), Value::String("InvalidCredentials".to_string()))]));
        let options = EvaluationOptions::new(&DEFAULT_ADAPTER);
        let expr = Expr::Binary {
            op: BinaryOp::Eq,
            left: Box::new(Expr::Member {
                object: Box::new(Expr::Identifier { name: "error".to_string(), span: sp() }),
                property: "code".to_string(),
                span: sp(),
            }),
            right: Box::new(Expr::String("InvalidCredentials".to_string(), sp())),
            span: sp(),
        };
        assert_eq!(evaluate(&expr, &ctx, &options).value, TriState::True);
    }

    #[test]
    fn old_without_snapshot_is_false() {
        let domain = empty_domain();
        let store = EmptyStore;
        let ctx = EvaluationContext::new(&domain, &store);
        let options = EvaluationOptions::new(&DEFAULT_ADAPTER);
        let expr = Expr::Old { expr: Box::new(Expr::Boolean(true, sp())), span: sp() };
        let result = evaluate(&expr, &ctx, &options);
        assert_eq!(result.value, TriState::False);
        assert_eq!(result.reason.as_deref(), Some("old() without previous state snapshot"));
    }

    #[test]
    fn input_property_access_reads_the_input_map() {
        let domain = empty_domain();
        let store = EmptyStore;
        let ctx = EvaluationContext::new(&domain, &store)
            .with_input(Value::map([("email".to_string(), Value::String(String::new()))]));
        let options = EvaluationOptions::new(&DEFAULT_ADAPTER);
        let length_expr = Expr::Member {
            object: Box::new(Expr::Input { property: "email".to_string(), span: sp() }),
            property: "length".to_string(),
            span: sp(),
        };
        let gt_expr = Expr::Binary {
            op: BinaryOp::Gt,
            left: Box::new(length_expr),
            right: Box::new(num(0.0)),
            span: sp(),
        };
        let result = evaluate(&gt_expr, &ctx, &options);
        assert_eq!(result.value, TriState::False);
    }

    #[test]
    fn conditional_under_unknown_condition_agrees_when_branches_agree() {
        let domain = empty_domain();
        let store = EmptyStore;
        let ctx = EvaluationContext::new(&domain, &store);
        let options = EvaluationOptions::new(&DEFAULT_ADAPTER);
        let unknown_cond = Expr::Old { expr: Box::new(Expr::Boolean(true, sp())), span: sp() };
        let expr = Expr::Conditional {
            cond: Box::new(Expr::Binary {
                op: BinaryOp::Eq,
                left: Box::new(unknown_cond),
                right: Box::new(Expr::Boolean(true, sp())),
                span: sp(),
            }),
            then_branch: Box::new(Expr::Boolean(true, sp())),
            else_branch: Some(Box::new(Expr::Boolean(true, sp()))),
            span: sp(),
        };
        assert_eq!(evaluate(&expr, &ctx, &options).value, TriState::True);
    }
}
