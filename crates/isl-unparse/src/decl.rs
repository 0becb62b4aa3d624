//! Declaration-level writers (§4.2 top-level grammar), mirroring
//! `isl-parser`'s `sections.rs` dispatch one section at a time.

use crate::expr::write_expr;
use crate::scenario::{write_chaos_block, write_scenario_block};
use crate::types::write_type_definition;
use crate::Writer;
use isl_ast::*;

pub(crate) fn write_domain(w: &mut Writer, domain: &Domain) {
    w.open(format!("domain {}", domain.name));
    w.line(format!("version: \"{}\"", domain.version));
    if let Some(owner) = &domain.owner {
        w.line(format!("owner: \"{owner}\""));
    }
    write_imports(w, &domain.imports);
    for decl in &domain.type_decls {
        write_type_decl(w, decl);
    }
    for entity in &domain.entities {
        write_entity(w, entity);
    }
    for behavior in &domain.behaviors {
        write_behavior(w, behavior);
    }
    for policy in &domain.policies {
        write_policy(w, policy);
    }
    for view in &domain.views {
        write_view(w, view);
    }
    for block in &domain.scenario_blocks {
        write_scenario_block(w, block);
    }
    for block in &domain.chaos_blocks {
        write_chaos_block(w, block);
    }
    if !domain.invariants.is_empty() {
        write_expr_block(w, "invariants", &domain.invariants);
    }
    w.close();
}

/// One `name [as alias] from "source"` entry per line inside a single
/// `imports { ... }` block — the grouped-by-source shape `Domain.imports`
/// holds collapses back to exactly this on reparse (`parse_imports` merges
/// consecutive same-source items regardless of how many `imports` blocks
/// produced them).
fn write_imports(w: &mut Writer, imports: &[Import]) {
    if imports.is_empty() {
        return;
    }
    w.open("imports");
    for import in imports {
        for item in &import.items {
            let mut line = item.name.clone();
            if let Some(alias) = &item.alias {
                line.push_str(&format!(" as {alias}"));
            }
            line.push_str(&format!(" from \"{}\"", import.source));
            w.line(line);
        }
    }
    w.close();
}

fn write_type_decl(w: &mut Writer, decl: &TypeDecl) {
    w.line(format!("type {} = {}", decl.name, write_type_definition(&decl.definition)));
}

fn write_annotation(a: &Annotation) -> &str {
    match a {
        Annotation::Immutable => "immutable",
        Annotation::Unique => "unique",
        Annotation::Secret => "secret",
        Annotation::Pii => "pii",
        Annotation::Indexed => "indexed",
        Annotation::Other(name) => name,
    }
}

fn write_field(w: &mut Writer, field: &Field) {
    let mut line = format!("{}: {}", field.name, write_type_definition(&field.type_def));
    if !field.annotations.is_empty() {
        let anns = field.annotations.iter().map(write_annotation).collect::<Vec<_>>().join(", ");
        line.push_str(&format!(" [{anns}]"));
    }
    w.line(line);
}

fn write_expr_block(w: &mut Writer, header: &str, exprs: &[Expr]) {
    w.open(header);
    for e in exprs {
        w.line(write_expr(e));
    }
    w.close();
}

fn write_entity(w: &mut Writer, entity: &Entity) {
    w.open(format!("entity {}", entity.name));
    for field in &entity.fields {
        write_field(w, field);
    }
    if !entity.invariants.is_empty() {
        write_expr_block(w, "invariants", &entity.invariants);
    }
    if let Some(lifecycle) = &entity.lifecycle {
        w.open("lifecycle");
        for t in &lifecycle.transitions {
            w.line(format!("{} -> {}", t.from, t.to));
        }
        w.close();
    }
    w.close();
}

fn write_behavior(w: &mut Writer, behavior: &Behavior) {
    let mut header = format!("behavior {}", behavior.name);
    if let Some(desc) = &behavior.description {
        header.push_str(&format!(" \"{desc}\""));
    }
    w.open(header);
    if !behavior.actors.is_empty() {
        w.line(format!("actors {{ {} }}", behavior.actors.join(", ")));
    }
    w.open("input");
    for field in &behavior.input.fields {
        write_field(w, field);
    }
    w.close();
    write_output(w, &behavior.output);
    if !behavior.preconditions.is_empty() {
        write_expr_block(w, "pre", &behavior.preconditions);
    }
    for post in &behavior.postconditions {
        let tag = if post.condition_tag == "any_error" { "failure" } else { &post.condition_tag };
        write_expr_block(w, &format!("post {tag}"), &post.predicates);
    }
    if !behavior.invariants.is_empty() {
        write_expr_block(w, "invariants", &behavior.invariants);
    }
    write_clauses(w, "temporal", behavior.temporal.iter().map(|c| (&c.text, &c.args)));
    write_clauses(w, "security", behavior.security.iter().map(|c| (&c.text, &c.args)));
    write_clauses(w, "compliance", behavior.compliance.iter().map(|c| (&c.text, &c.args)));
    write_clauses(w, "observability", behavior.observability.iter().map(|c| (&c.text, &c.args)));
    w.close();
}

fn write_clauses<'a>(w: &mut Writer, header: &str, clauses: impl Iterator<Item = (&'a String, &'a Vec<Expr>)>) {
    let mut clauses = clauses.peekable();
    if clauses.peek().is_none() {
        return;
    }
    w.open(header);
    for (text, args) in clauses {
        if args.is_empty() {
            w.line(text.clone());
        } else {
            w.line(format!("{text}({})", args.iter().map(write_expr).collect::<Vec<_>>().join(", ")));
        }
    }
    w.close();
}

fn write_output(w: &mut Writer, output: &OutputSpec) {
    w.open("output");
    if let Some(success) = &output.success_type {
        w.line(format!("success: {}", write_type_definition(success)));
    }
    if !output.errors.is_empty() {
        w.open("errors");
        for err in &output.errors {
            write_error_spec(w, err);
        }
        w.close();
    }
    w.close();
}

fn write_error_spec(w: &mut Writer, err: &ErrorSpec) {
    if err.when.is_none() && !err.retriable && err.retry_after.is_none() {
        w.line(err.name.clone());
        return;
    }
    w.open(err.name.clone());
    if let Some(when) = &err.when {
        w.line(format!("when: \"{when}\""));
    }
    if err.retriable {
        w.line("retriable: true");
    }
    if let Some(retry_after) = &err.retry_after {
        w.line(format!("retry_after: {}", write_expr(retry_after)));
    }
    w.close();
}

fn write_policy(w: &mut Writer, policy: &Policy) {
    w.open(format!("policy {}", policy.name));
    if !policy.rules.is_empty() {
        w.open("rules");
        for rule in &policy.rules {
            let effect = write_effect(rule.effect);
            w.line(format!("rule {effect} when {}", write_expr(&rule.condition)));
        }
        w.close();
    }
    if let Some(default) = policy.default {
        w.line(format!("default: {}", write_effect(default)));
    }
    w.close();
}

fn write_effect(effect: Effect) -> &'static str {
    match effect {
        Effect::Allow => "allow",
        Effect::Deny => "deny",
    }
}

fn write_view(w: &mut Writer, view: &View) {
    w.open(format!("view {}", view.name));
    if !view.source_entity.is_empty() {
        w.line(format!("source: {}", view.source_entity.join(".")));
    }
    if !view.fields.is_empty() {
        w.line(format!("fields: [{}]", view.fields.join(", ")));
    }
    if let Some(filter) = &view.filter {
        w.line(format!("filter: {}", write_expr(filter)));
    }
    w.close();
}

pub(crate) fn write_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Let { name, value, .. } => format!("let {name} = {}", write_expr(value)),
        Stmt::Call { expr, .. } => write_expr(expr),
        Stmt::Assign { target, value, .. } => format!("{} = {}", write_expr(target), write_expr(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_position::Span;

    fn sp() -> NodeSpan {
        NodeSpan(Span::synthetic())
    }

    #[test]
    fn error_spec_with_no_detail_prints_bare_name() {
        let mut w = Writer::new();
        write_error_spec(&mut w, &ErrorSpec { name: "Bad".to_string(), when: None, retriable: false, retry_after: None, span: sp() });
        assert_eq!(w.finish(), "Bad\n");
    }

    #[test]
    fn error_spec_with_retriable_prints_block() {
        let mut w = Writer::new();
        write_error_spec(&mut w, &ErrorSpec { name: "Bad".to_string(), when: None, retriable: true, retry_after: None, span: sp() });
        assert_eq!(w.finish(), "Bad {\n    retriable: true\n}\n");
    }
}
