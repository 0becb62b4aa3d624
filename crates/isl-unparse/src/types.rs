//! Type-definition writer (§3.3/§4.2 type grammar).

use crate::expr::write_expr;
use isl_ast::{Constraint, Primitive, StructField, TypeDefinition, UnionVariant};

pub(crate) fn write_type_definition(ty: &TypeDefinition) -> String {
    match ty {
        TypeDefinition::Primitive { name, .. } => name.as_str().to_string(),
        TypeDefinition::Constrained { base, constraints, .. } => {
            let cs = constraints.iter().map(write_constraint).collect::<Vec<_>>().join(", ");
            format!("{} {{ {cs} }}", write_type_definition(base))
        }
        TypeDefinition::Enum { variants, .. } => format!("Enum {{ {} }}", variants.join(", ")),
        TypeDefinition::Struct { fields, .. } => format!("Struct {{ {} }}", write_struct_fields(fields)),
        TypeDefinition::List { element, .. } => format!("List[{}]", write_type_definition(element)),
        TypeDefinition::Map { key, value, .. } => {
            format!("Map[{}, {}]", write_type_definition(key), write_type_definition(value))
        }
        TypeDefinition::Optional { inner, .. } => format!("{}?", write_type_definition(inner)),
        TypeDefinition::Reference { qualified_name, .. } => qualified_name.join("."),
        TypeDefinition::Union { variants, .. } => {
            format!("Union {{ {} }}", variants.iter().map(write_union_variant).collect::<Vec<_>>().join(" | "))
        }
    }
}

fn write_constraint(c: &Constraint) -> String {
    format!("{}: {}", c.name, write_expr(&c.value))
}

fn write_struct_fields(fields: &[StructField]) -> String {
    fields.iter().map(|f| format!("{}: {}", f.name, write_type_definition(&f.type_def))).collect::<Vec<_>>().join(", ")
}

fn write_union_variant(v: &UnionVariant) -> String {
    if v.fields.is_empty() {
        v.name.clone()
    } else {
        format!("{} {{ {} }}", v.name, write_struct_fields(&v.fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isl_ast::NodeSpan;
    use isl_position::Span;

    fn sp() -> NodeSpan {
        NodeSpan(Span::synthetic())
    }

    #[test]
    fn optional_of_constrained_primitive() {
        let ty = TypeDefinition::Optional {
            inner: Box::new(TypeDefinition::Constrained {
                base: Box::new(TypeDefinition::Primitive { name: Primitive::String, span: sp() }),
                constraints: vec![Constraint {
                    name: "format".to_string(),
                    value: isl_ast::Expr::String("email".to_string(), sp()),
                    span: sp(),
                }],
                span: sp(),
            }),
            span: sp(),
        };
        assert_eq!(write_type_definition(&ty), "String { format: \"email\" }?");
    }

    #[test]
    fn list_of_map() {
        let ty = TypeDefinition::List {
            element: Box::new(TypeDefinition::Map {
                key: Box::new(TypeDefinition::Primitive { name: Primitive::String, span: sp() }),
                value: Box::new(TypeDefinition::Primitive { name: Primitive::Int, span: sp() }),
                span: sp(),
            }),
            span: sp(),
        };
        assert_eq!(write_type_definition(&ty), "List[Map[String, Int]]");
    }
}
