//! Scenario/chaos-block writer (§4.2 scenario grammar, §4.3 chaos
//! normalisation). Both inline and block injection forms collapse to one
//! [`Injection`] shape on parse; this writer always emits the form that
//! shape's fields actually describe (`call` present → block form, `target`
//! present → inline form) rather than trying to recover which one the
//! original source used.

use crate::decl::write_stmt;
use crate::expr::write_expr;
use crate::Writer;
use isl_ast::{ChaosArgument, ChaosBlock, ChaosScenario, Injection, Scenario, ScenarioBlock, Stmt, WithClause};

pub(crate) fn write_scenario_block(w: &mut Writer, block: &ScenarioBlock) {
    w.open(format!("scenarios {}", block.target_behavior));
    for scenario in &block.scenarios {
        write_scenario(w, scenario);
    }
    w.close();
}

fn write_scenario(w: &mut Writer, scenario: &Scenario) {
    w.open(format!("scenario \"{}\"", scenario.name));
    write_stmt_block(w, "given", &scenario.given);
    write_stmt_block(w, "when", &scenario.when);
    write_expr_block(w, "then", &scenario.then);
    w.close();
}

fn write_stmt_block(w: &mut Writer, header: &str, stmts: &[Stmt]) {
    if stmts.is_empty() {
        return;
    }
    w.open(header);
    for s in stmts {
        w.line(write_stmt(s));
    }
    w.close();
}

fn write_expr_block(w: &mut Writer, header: &str, exprs: &[isl_ast::Expr]) {
    if exprs.is_empty() {
        return;
    }
    w.open(header);
    for e in exprs {
        w.line(write_expr(e));
    }
    w.close();
}

pub(crate) fn write_chaos_block(w: &mut Writer, block: &ChaosBlock) {
    w.open(format!("chaos {}", block.target_behavior));
    for scenario in &block.scenarios {
        write_chaos_scenario(w, scenario);
    }
    w.close();
}

fn write_chaos_scenario(w: &mut Writer, scenario: &ChaosScenario) {
    w.open(format!("scenario \"{}\"", scenario.name));
    for injection in &scenario.inject {
        write_injection(w, injection);
    }
    write_stmt_block(w, "when", &scenario.when);
    write_expr_block(w, "then", &scenario.then);
    // `expectations` is `then` followed by whatever `expect { ... }` added;
    // only the tail beyond `then` needs its own block to reconstruct both
    // fields on reparse (ChaosScenario::expectations = then ++ expect).
    let extra = &scenario.expectations[scenario.then.len().min(scenario.expectations.len())..];
    write_expr_block(w, "expect", extra);
    if let Some(with_clause) = &scenario.with_clause {
        write_with_clause(w, with_clause);
    }
    w.close();
}

fn write_injection(w: &mut Writer, injection: &Injection) {
    if let Some(call) = &injection.call {
        w.open("inject");
        w.line(write_expr(call));
        w.close();
        return;
    }
    let mut line = format!("inject {}", injection.fault_type);
    if let Some(target) = &injection.target {
        line.push_str(&format!(" on {target}"));
    }
    if let Some(with_clause) = &injection.with_clause {
        line.push_str(&format!(" with {{ {} }}", write_with_args(with_clause)));
        w.line(line);
        return;
    }
    w.line(line);
}

fn write_with_clause(w: &mut Writer, with_clause: &WithClause) {
    w.line(format!("with {{ {} }}", write_with_args(with_clause)));
}

fn write_with_args(with_clause: &WithClause) -> String {
    with_clause.args.iter().map(write_chaos_argument).collect::<Vec<_>>().join(", ")
}

fn write_chaos_argument(arg: &ChaosArgument) -> String {
    format!("{}: {}", arg.name, write_expr(&arg.value))
}
