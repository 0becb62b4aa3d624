use crate::decl::Field;
use crate::expr::Expr;
use crate::span::NodeSpan;

#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub fields: Vec<Field>,
    pub span: NodeSpan,
}

/// One declared error outcome a behavior's `output` section can produce.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorSpec {
    pub name: String,
    pub when: Option<String>,
    pub retriable: bool,
    pub retry_after: Option<Expr>,
    pub span: NodeSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub success_type: Option<crate::types::TypeDefinition>,
    pub errors: Vec<ErrorSpec>,
    pub span: NodeSpan,
}

/// A postcondition block keyed by outcome tag: `"success"`, `"any_error"`, or
/// a specific declared error name.
#[derive(Debug, Clone, PartialEq)]
pub struct PostBlock {
    pub condition_tag: String,
    pub predicates: Vec<Expr>,
    pub span: NodeSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemporalClause {
    pub text: String,
    pub args: Vec<Expr>,
    pub span: NodeSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SecurityClause {
    pub text: String,
    pub args: Vec<Expr>,
    pub span: NodeSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceClause {
    pub text: String,
    pub args: Vec<Expr>,
    pub span: NodeSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObservabilityClause {
    pub text: String,
    pub args: Vec<Expr>,
    pub span: NodeSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Behavior {
    pub name: String,
    pub description: Option<String>,
    pub actors: Vec<String>,
    pub input: InputSpec,
    pub output: OutputSpec,
    pub preconditions: Vec<Expr>,
    pub postconditions: Vec<PostBlock>,
    pub invariants: Vec<Expr>,
    pub temporal: Vec<TemporalClause>,
    pub security: Vec<SecurityClause>,
    pub compliance: Vec<ComplianceClause>,
    pub observability: Vec<ObservabilityClause>,
    pub span: NodeSpan,
}

impl Behavior {
    /// Finds the postcondition block matching a resolved outcome tag,
    /// following the selection rule in SPEC_FULL §4.5: an exact tag match (a
    /// declared error name, or `"success"`) wins; `"any_error"` is the
    /// fallback for any error outcome that did not match by name.
    pub fn post_block_for(&self, tag: &str) -> Option<&PostBlock> {
        self.postconditions.iter().find(|b| b.condition_tag == tag).or_else(|| {
            if tag != "success" {
                self.postconditions.iter().find(|b| b.condition_tag == "any_error")
            } else {
                None
            }
        })
    }

    pub fn find_error(&self, name: &str) -> Option<&ErrorSpec> {
        self.output.errors.iter().find(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_position::Span;

    fn sp() -> NodeSpan {
        NodeSpan(Span::synthetic())
    }

    fn behavior_with_blocks(tags: &[&str]) -> Behavior {
        Behavior {
            name: "Login".to_string(),
            description: None,
            actors: vec![],
            input: InputSpec { fields: vec![], span: sp() },
            output: OutputSpec { success_type: None, errors: vec![], span: sp() },
            preconditions: vec![],
            postconditions: tags
                .iter()
                .map(|t| PostBlock { condition_tag: t.to_string(), predicates: vec![], span: sp() })
                .collect(),
            invariants: vec![],
            temporal: vec![],
            security: vec![],
            compliance: vec![],
            observability: vec![],
            span: sp(),
        }
    }

    #[test]
    fn exact_tag_wins_over_any_error() {
        let b = behavior_with_blocks(&["success", "InvalidCredentials", "any_error"]);
        assert_eq!(b.post_block_for("InvalidCredentials").unwrap().condition_tag, "InvalidCredentials");
    }

    #[test]
    fn any_error_is_fallback() {
        let b = behavior_with_blocks(&["success", "any_error"]);
        assert_eq!(b.post_block_for("SomeOtherError").unwrap().condition_tag, "any_error");
    }

    #[test]
    fn no_fallback_for_success_tag() {
        let b = behavior_with_blocks(&["any_error"]);
        assert!(b.post_block_for("success").is_none());
    }
}
