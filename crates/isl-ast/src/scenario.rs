use crate::expr::Expr;
use crate::span::NodeSpan;

/// The minimal closed statement set used inside `Scenario.given`/`when` and
/// `ChaosScenario.when` bodies. These are short imperative setup sequences,
/// not a general statement language — see SPEC_FULL §3.3.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let { name: String, value: Expr, span: NodeSpan },
    Call { expr: Expr, span: NodeSpan },
    Assign { target: Expr, value: Expr, span: NodeSpan },
}

impl Stmt {
    pub fn span(&self) -> &isl_position::Span {
        match self {
            Stmt::Let { span, .. } | Stmt::Call { span, .. } | Stmt::Assign { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub given: Vec<Stmt>,
    pub when: Vec<Stmt>,
    pub then: Vec<Expr>,
    pub span: NodeSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioBlock {
    pub target_behavior: String,
    pub scenarios: Vec<Scenario>,
    pub span: NodeSpan,
}

/// A named argument supplied to a chaos `with { ... }` clause, e.g.
/// `latency: 500.ms`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChaosArgument {
    pub name: String,
    pub value: Expr,
    pub span: NodeSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WithClause {
    pub args: Vec<ChaosArgument>,
    pub span: NodeSpan,
}

/// A fault injected into a chaos scenario. Both the inline form
/// (`inject <type> on <target> with { ... }`) and the block form
/// (`inject { fn(...) }`) normalise to this one shape (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct Injection {
    pub fault_type: String,
    pub target: Option<String>,
    pub call: Option<Expr>,
    pub with_clause: Option<WithClause>,
    pub span: NodeSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChaosScenario {
    pub name: String,
    pub inject: Vec<Injection>,
    pub when: Vec<Stmt>,
    pub then: Vec<Expr>,
    pub expectations: Vec<Expr>,
    pub with_clause: Option<WithClause>,
    pub span: NodeSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChaosBlock {
    pub target_behavior: String,
    pub scenarios: Vec<ChaosScenario>,
    pub span: NodeSpan,
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_position::Span;

    fn sp() -> NodeSpan {
        NodeSpan(Span::synthetic())
    }

    #[test]
    fn chaos_scenario_merges_then_and_expect_into_expectations() {
        let then_expr = Expr::Boolean(true, sp());
        let scenario = ChaosScenario {
            name: "latency-spike".to_string(),
            inject: vec![],
            when: vec![],
            then: vec![then_expr.clone()],
            expectations: vec![then_expr],
            with_clause: None,
            span: sp(),
        };
        assert_eq!(scenario.then, scenario.expectations);
    }

    #[test]
    fn missing_with_clause_is_none() {
        let injection = Injection {
            fault_type: "latency".to_string(),
            target: Some("PaymentGateway".to_string()),
            call: None,
            with_clause: None,
            span: sp(),
        };
        assert!(injection.with_clause.is_none());
    }
}
