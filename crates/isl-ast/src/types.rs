use crate::expr::Expr;
use crate::span::NodeSpan;

/// One of the seven closed primitive type names. Kept as an enum rather than
/// a bare `String` so the fuzzy parser's primitive-case normalisation
/// (`string -> String`, `number -> Int`, `boolean -> Boolean`) and the
/// unparser's canonical rendering both work off an exhaustive match instead
/// of string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    String,
    Int,
    Decimal,
    Boolean,
    Timestamp,
    Uuid,
    Duration,
}

impl Primitive {
    pub fn as_str(self) -> &'static str {
        match self {
            Primitive::String => "String",
            Primitive::Int => "Int",
            Primitive::Decimal => "Decimal",
            Primitive::Boolean => "Boolean",
            Primitive::Timestamp => "Timestamp",
            Primitive::Uuid => "UUID",
            Primitive::Duration => "Duration",
        }
    }
}

/// A named constraint attached to a [`TypeDefinition::Constrained`] base
/// type, e.g. `{ format: "email" }` or `{ min: 0, max: 100 }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub value: Expr,
    pub span: NodeSpan,
}

/// A field inside a [`TypeDefinition::Struct`] or a union variant's field
/// list. Distinct from `decl::Field`, which additionally carries annotations
/// only meaningful on entity fields (`immutable`, `unique`, `secret`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub type_def: TypeDefinition,
    pub span: NodeSpan,
}

/// One variant of a [`TypeDefinition::Union`]: a tag name plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionVariant {
    pub name: String,
    pub fields: Vec<StructField>,
    pub span: NodeSpan,
}

/// The closed set of type-level constructs a `type` declaration, struct
/// field, or generic parameter (`List`/`Map`/`Optional` element types) can
/// reference.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    Primitive { name: Primitive, span: NodeSpan },
    Constrained { base: Box<TypeDefinition>, constraints: Vec<Constraint>, span: NodeSpan },
    Enum { variants: Vec<String>, span: NodeSpan },
    Struct { fields: Vec<StructField>, span: NodeSpan },
    List { element: Box<TypeDefinition>, span: NodeSpan },
    Map { key: Box<TypeDefinition>, value: Box<TypeDefinition>, span: NodeSpan },
    Optional { inner: Box<TypeDefinition>, span: NodeSpan },
    Reference { qualified_name: Vec<String>, span: NodeSpan },
    Union { variants: Vec<UnionVariant>, span: NodeSpan },
}

impl TypeDefinition {
    pub fn span(&self) -> &isl_position::Span {
        match self {
            TypeDefinition::Primitive { span, .. }
            | TypeDefinition::Constrained { span, .. }
            | TypeDefinition::Enum { span, .. }
            | TypeDefinition::Struct { span, .. }
            | TypeDefinition::List { span, .. }
            | TypeDefinition::Map { span, .. }
            | TypeDefinition::Optional { span, .. }
            | TypeDefinition::Reference { span, .. }
            | TypeDefinition::Union { span, .. } => span,
        }
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
    fn primitive_names_round_trip() {
        for p in [
            Primitive::String,
            Primitive::Int,
            Primitive::Decimal,
            Primitive::Boolean,
            Primitive::Timestamp,
            Primitive::Uuid,
            Primitive::Duration,
        ] {
            assert!(!p.as_str().is_empty());
        }
    }

    #[test]
    fn nested_type_ignores_span_in_equality() {
        let a = TypeDefinition::Optional {
            inner: Box::new(TypeDefinition::Primitive { name: Primitive::Int, span: sp() }),
            span: sp(),
        };
        let b = TypeDefinition::Optional {
            inner: Box::new(TypeDefinition::Primitive { name: Primitive::Int, span: sp() }),
            span: sp(),
        };
        assert_eq!(a, b);
    }
}
