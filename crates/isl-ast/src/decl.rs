use crate::behavior::Behavior;
use crate::expr::Expr;
use crate::scenario::{ChaosBlock, ScenarioBlock};
use crate::span::NodeSpan;
use crate::types::TypeDefinition;

/// One imported name, with its optional `as` alias.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportItem {
    pub name: String,
    pub alias: Option<String>,
    pub span: NodeSpan,
}

/// `imports { A, B as C } from "path"`, already lowered by the fuzzy
/// normaliser (if present) to the canonical one-source-per-import shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub source: String,
    pub items: Vec<ImportItem>,
    pub span: NodeSpan,
}

/// A top-level `type NAME = ...` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub definition: TypeDefinition,
    pub span: NodeSpan,
}

/// Annotation tags recognised on entity fields. `Other` preserves forward
/// compatibility with annotations not in the closed set named by the
/// grammar, the way the lexer preserves unknown escapes verbatim rather than
/// rejecting them outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Immutable,
    Unique,
    Secret,
    Pii,
    Indexed,
    Other(String),
}

impl Annotation {
    pub fn from_name(name: &str) -> Self {
        match name {
            "immutable" => Annotation::Immutable,
            "unique" => Annotation::Unique,
            "secret" => Annotation::Secret,
            "pii" => Annotation::Pii,
            "indexed" => Annotation::Indexed,
            other => Annotation::Other(other.to_string()),
        }
    }
}

/// A single field on an [`Entity`] (or an `InputSpec`/`OutputSpec` shape —
/// those reuse `Field` rather than inventing a parallel struct, since the
/// grammar production for a field list is identical in both positions).
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub type_def: TypeDefinition,
    pub optional: bool,
    pub annotations: Vec<Annotation>,
    pub span: NodeSpan,
}

/// One `(from_state, to_state)` edge. Recorded verbatim; the AST does not
/// require the set of edges to form a closed graph (see SPEC_FULL §3.3).
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleTransition {
    pub from: String,
    pub to: String,
    pub span: NodeSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lifecycle {
    pub transitions: Vec<LifecycleTransition>,
    pub span: NodeSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub fields: Vec<Field>,
    pub invariants: Vec<Expr>,
    pub lifecycle: Option<Lifecycle>,
    pub span: NodeSpan,
}

/// Resolution a [`PolicyRule`] applies when its condition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRule {
    pub effect: Effect,
    pub condition: Expr,
    pub span: NodeSpan,
}

/// A named access-control policy: an ordered list of rules evaluated
/// first-match, plus an optional fallback when no rule's condition holds.
///
/// The distilled spec names `Policy` as a top-level `Domain` list with no
/// further elaboration; this shape (ordered `rules` + optional `default`) is
/// the open-question resolution recorded in DESIGN.md.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub name: String,
    pub rules: Vec<PolicyRule>,
    pub default: Option<Effect>,
    pub span: NodeSpan,
}

/// A named, filtered projection over one entity's fields.
///
/// Same status as `Policy`: named and unelaborated in the distilled spec;
/// structure fixed by DESIGN.md.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub name: String,
    pub source_entity: Vec<String>,
    pub fields: Vec<String>,
    pub filter: Option<Expr>,
    pub span: NodeSpan,
}

/// The root AST node. A `Domain` owns every declaration in source order;
/// keyword order inside the block is free, so each list simply accumulates
/// declarations as the parser encounters them (§4.2).
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    pub name: String,
    pub version: String,
    pub owner: Option<String>,
    pub imports: Vec<Import>,
    pub type_decls: Vec<TypeDecl>,
    pub entities: Vec<Entity>,
    pub behaviors: Vec<Behavior>,
    pub policies: Vec<Policy>,
    pub views: Vec<View>,
    pub scenario_blocks: Vec<ScenarioBlock>,
    pub chaos_blocks: Vec<ChaosBlock>,
    pub invariants: Vec<Expr>,
    pub span: NodeSpan,
}

impl Domain {
    pub fn find_entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn find_behavior(&self, name: &str) -> Option<&Behavior> {
        self.behaviors.iter().find(|b| b.name == name)
    }
}
