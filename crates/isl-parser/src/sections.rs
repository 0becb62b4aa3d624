//! Declaration-level grammar (§4.2 top-level grammar, pre/post shorthand,
//! chaos normalisation). Dispatches on the closed set of section keywords;
//! order inside a `domain` block is free, so each section simply appends to
//! the matching [`Domain`] list as it is encountered.

use crate::Parser;
use isl_ast::*;
use isl_diagnostics::DiagnosticCode;
use isl_token::TokenKind;

pub(crate) fn parse_domain(parser: &mut Parser) -> Option<Domain> {
    if !parser.at(TokenKind::DomainKw) {
        // Skip any stray leading tokens looking for a `domain` header; if
        // none exists anywhere in the stream there is no AST to build at all
        // (§4.2: "ast is Some if any top-level Domain header was recognised").
        while !parser.at_eof() && !parser.at(TokenKind::DomainKw) {
            parser.advance();
        }
        if parser.at_eof() {
            parser.error_eof("a 'domain' header");
            return None;
        }
    }
    let start = parser.advance().span; // 'domain'
    let name_tok = parser.expect(TokenKind::Identifier, "a domain name");

    let mut domain = Domain {
        name: name_tok.value.to_string(),
        version: String::new(),
        owner: None,
        imports: Vec::new(),
        type_decls: Vec::new(),
        entities: Vec::new(),
        behaviors: Vec::new(),
        policies: Vec::new(),
        views: Vec::new(),
        scenario_blocks: Vec::new(),
        chaos_blocks: Vec::new(),
        invariants: Vec::new(),
        span: NodeSpan::from(start.clone()),
    };

    let braced = parser.eat(TokenKind::LBrace).is_some();
    let mut saw_version = false;
    loop {
        if braced && parser.at(TokenKind::RBrace) {
            break;
        }
        if !braced && parser.at_eof() {
            break;
        }
        if parser.at_eof() {
            parser.error_eof("'}' to close domain block");
            break;
        }
        if !parse_one_section(parser, &mut domain, &mut saw_version) {
            let span = parser.peek().span.clone();
            let found = parser.peek().clone();
            parser.diagnostic(
                DiagnosticCode::UnexpectedToken,
                format!("unexpected token in domain body: {:?} {:?}", found.kind, found.value),
                span,
            );
            parser.synchronize();
        }
    }
    let end = if braced { parser.expect(TokenKind::RBrace, "'}' to close domain block").span } else { parser.peek().span.clone() };
    domain.span = NodeSpan::from(start.union(&end));

    if !saw_version {
        parser.diagnostic(DiagnosticCode::MissingVersion, "domain has no 'version' field", domain.span.0.clone());
    }

    Some(domain)
}

/// Dispatches one section. Returns `false` if the current token is not a
/// recognised section keyword, so the caller can emit a diagnostic and
/// resynchronise.
fn parse_one_section(parser: &mut Parser, domain: &mut Domain, saw_version: &mut bool) -> bool {
    match parser.peek_kind() {
        TokenKind::VersionKw => {
            parser.advance();
            parser.eat(TokenKind::Colon);
            let tok = parser.expect(TokenKind::StringLiteral, "a version string");
            domain.version = tok.value.to_string();
            *saw_version = true;
        }
        TokenKind::OwnerKw => {
            parser.advance();
            parser.eat(TokenKind::Colon);
            let tok = parser.expect(TokenKind::StringLiteral, "an owner string");
            domain.owner = Some(tok.value.to_string());
        }
        TokenKind::ImportsKw => parse_imports(parser, domain),
        TokenKind::TypeKw => parse_type_decl(parser, domain),
        TokenKind::EntityKw => parse_entity(parser, domain),
        TokenKind::BehaviorKw => parse_behavior(parser, domain),
        TokenKind::PolicyKw => parse_policy(parser, domain),
        TokenKind::ViewKw => parse_view(parser, domain),
        TokenKind::ScenariosKw => parse_scenario_block(parser, domain),
        TokenKind::ChaosKw => parse_chaos_block(parser, domain),
        TokenKind::InvariantsKw => {
            parser.advance();
            domain.invariants.extend(parse_expr_seq(parser, TokenKind::RBrace));
        }
        _ => return false,
    }
    true
}

/// Parses a bare `{ expr expr ... }` sequence (no separators required: each
/// expression is self-terminating under Pratt precedence). A leading `-`
/// before an item is accepted and discarded — the `pre { - expr* }` shorthand
/// (§4.2) — since it carries no meaning beyond marking one bullet per line.
fn parse_expr_seq(parser: &mut Parser, terminator: TokenKind) -> Vec<Expr> {
    parser.expect(TokenKind::LBrace, "'{' to open block");
    let mut items = Vec::new();
    while !parser.at(terminator) && !parser.at_eof() {
        parser.eat(TokenKind::Minus);
        items.push(parser.parse_expr());
        parser.eat(TokenKind::Comma);
    }
    parser.expect(terminator, "'}' to close block");
    items
}

fn parse_imports(parser: &mut Parser, domain: &mut Domain) {
    let start = parser.advance().span; // 'imports'
    parser.expect(TokenKind::LBrace, "'{' to open imports block");
    while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
        let name_tok = parser.expect(TokenKind::Identifier, "an imported name");
        let alias = if parser.eat(TokenKind::AsKw).is_some() {
            Some(parser.expect(TokenKind::Identifier, "an import alias").value.to_string())
        } else {
            None
        };
        let item_span = name_tok.span.clone();
        parser.expect(TokenKind::FromKw, "'from' after import item");
        let source_tok = parser.expect(TokenKind::StringLiteral, "an import source string");
        let item = ImportItem { name: name_tok.value.to_string(), alias, span: NodeSpan::from(item_span) };

        match domain.imports.last_mut() {
            Some(last) if last.source == *source_tok.value => last.items.push(item),
            _ => domain.imports.push(Import {
                source: source_tok.value.to_string(),
                items: vec![item],
                span: NodeSpan::from(source_tok.span.clone()),
            }),
        }
        parser.eat(TokenKind::Comma);
    }
    let end = parser.expect(TokenKind::RBrace, "'}' to close imports block").span;
    let _ = start.union(&end);
}

fn parse_type_decl(parser: &mut Parser, domain: &mut Domain) {
    let start = parser.advance().span; // 'type'
    let name_tok = parser.expect(TokenKind::Identifier, "a type name");
    parser.expect(TokenKind::Assign, "'=' in type declaration");
    let definition = parse_type_definition(parser);
    let span = start.union(definition.span());
    domain.type_decls.push(TypeDecl { name: name_tok.value.to_string(), definition, span: NodeSpan::from(span) });
}

/// Resolves the seven closed primitive names; anything else in a bare-word
/// type position is either a recognised type-level keyword (`Enum`,
/// `Struct`, `List`, `Map`, `Union`) or a [`TypeDefinition::Reference`].
fn primitive_from_name(name: &str) -> Option<Primitive> {
    Some(match name {
        "String" => Primitive::String,
        "Int" => Primitive::Int,
        "Decimal" => Primitive::Decimal,
        "Boolean" => Primitive::Boolean,
        "Timestamp" => Primitive::Timestamp,
        "UUID" => Primitive::Uuid,
        "Duration" => Primitive::Duration,
        _ => return None,
    })
}

fn parse_type_definition(parser: &mut Parser) -> TypeDefinition {
    let base = parse_base_type_definition(parser);
    parse_type_postfix(parser, base)
}

/// Handles the two postfix type forms: `?` (optional) and a trailing
/// constraint block `{ constraintName: expr, ... }` (constrained), which may
/// stack (`String? { format: "email" }`).
fn parse_type_postfix(parser: &mut Parser, mut ty: TypeDefinition) -> TypeDefinition {
    loop {
        if parser.at(TokenKind::Question) {
            let end = parser.advance().span;
            let span = ty.span().union(&end);
            ty = TypeDefinition::Optional { inner: Box::new(ty), span: NodeSpan::from(span) };
            continue;
        }
        if parser.at(TokenKind::LBrace) {
            let start_span = ty.span().clone();
            parser.advance();
            let mut constraints = Vec::new();
            while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
                let cname = parser.expect(TokenKind::Identifier, "a constraint name");
                parser.expect(TokenKind::Colon, "':' after constraint name");
                let value = parser.parse_expr();
                let cspan = cname.span.union(value.span());
                constraints.push(Constraint { name: cname.value.to_string(), value, span: NodeSpan::from(cspan) });
                parser.eat(TokenKind::Comma);
            }
            let end = parser.expect(TokenKind::RBrace, "'}' to close constraint block").span;
            let span = start_span.union(&end);
            ty = TypeDefinition::Constrained { base: Box::new(ty), constraints, span: NodeSpan::from(span) };
            continue;
        }
        break;
    }
    ty
}

fn parse_base_type_definition(parser: &mut Parser) -> TypeDefinition {
    let tok = parser.peek().clone();
    match tok.kind {
        TokenKind::EnumKw => {
            parser.advance();
            parser.expect(TokenKind::LBrace, "'{' to open enum variants");
            let mut variants = Vec::new();
            while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
                variants.push(parser.expect(TokenKind::Identifier, "an enum variant name").value.to_string());
                parser.eat(TokenKind::Comma);
            }
            let end = parser.expect(TokenKind::RBrace, "'}' to close enum variants").span;
            TypeDefinition::Enum { variants, span: NodeSpan::from(tok.span.union(&end)) }
        }
        TokenKind::Identifier if &*tok.value == "Struct" => {
            parser.advance();
            let (fields, end) = parse_struct_fields(parser);
            TypeDefinition::Struct { fields, span: NodeSpan::from(tok.span.union(&end)) }
        }
        TokenKind::Identifier if &*tok.value == "List" => {
            parser.advance();
            parser.expect(TokenKind::LBracket, "'[' after 'List'");
            let element = parse_type_definition(parser);
            let end = parser.expect(TokenKind::RBracket, "']' to close 'List[...]'").span;
            TypeDefinition::List { element: Box::new(element), span: NodeSpan::from(tok.span.union(&end)) }
        }
        TokenKind::Identifier if &*tok.value == "Map" => {
            parser.advance();
            parser.expect(TokenKind::LBracket, "'[' after 'Map'");
            let key = parse_type_definition(parser);
            parser.expect(TokenKind::Comma, "',' between Map key and value types");
            let value = parse_type_definition(parser);
            let end = parser.expect(TokenKind::RBracket, "']' to close 'Map[...]'").span;
            TypeDefinition::Map { key: Box::new(key), value: Box::new(value), span: NodeSpan::from(tok.span.union(&end)) }
        }
        TokenKind::Identifier if &*tok.value == "Union" => {
            parser.advance();
            parser.expect(TokenKind::LBrace, "'{' to open union variants");
            let mut variants = Vec::new();
            while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
                let vname = parser.expect(TokenKind::Identifier, "a union variant name");
                let (fields, vend) = parse_struct_fields(parser);
                variants.push(UnionVariant { name: vname.value.to_string(), fields, span: NodeSpan::from(vname.span.union(&vend)) });
                parser.eat(TokenKind::Pipe);
                parser.eat(TokenKind::Comma);
            }
            let end = parser.expect(TokenKind::RBrace, "'}' to close union variants").span;
            TypeDefinition::Union { variants, span: NodeSpan::from(tok.span.union(&end)) }
        }
        TokenKind::Identifier => {
            parser.advance();
            if let Some(p) = primitive_from_name(&tok.value) {
                return TypeDefinition::Primitive { name: p, span: NodeSpan::from(tok.span) };
            }
            let mut parts = vec![tok.value.to_string()];
            let mut end_span = tok.span.clone();
            while parser.at(TokenKind::Dot) {
                parser.advance();
                let part = parser.expect(TokenKind::Identifier, "a qualified type name segment");
                end_span = part.span.clone();
                parts.push(part.value.to_string());
            }
            TypeDefinition::Reference { qualified_name: parts, span: NodeSpan::from(tok.span.union(&end_span)) }
        }
        _ => {
            parser.advance();
            parser.diagnostic(
                DiagnosticCode::UnexpectedToken,
                format!("expected a type, found {:?} {:?}", tok.kind, tok.value),
                tok.span.clone(),
            );
            TypeDefinition::Reference { qualified_name: vec!["Unknown".to_string()], span: NodeSpan::from(tok.span) }
        }
    }
}

fn parse_struct_fields(parser: &mut Parser) -> (Vec<StructField>, isl_position::Span) {
    parser.expect(TokenKind::LBrace, "'{' to open field list");
    let mut fields = Vec::new();
    while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
        let name_tok = parser.expect(TokenKind::Identifier, "a field name");
        parser.expect(TokenKind::Colon, "':' after field name");
        let type_def = parse_type_definition(parser);
        let span = name_tok.span.union(type_def.span());
        fields.push(StructField { name: name_tok.value.to_string(), type_def, span: NodeSpan::from(span) });
        parser.eat(TokenKind::Comma);
    }
    let end = parser.expect(TokenKind::RBrace, "'}' to close field list").span;
    (fields, end)
}

/// Parses one `name: type [annotations]` field, used by entity bodies and
/// `input { ... }` specs alike (§3.3: the grammar production is identical in
/// both positions).
fn parse_field(parser: &mut Parser) -> Field {
    let name_tok = parser.expect(TokenKind::Identifier, "a field name");
    parser.expect(TokenKind::Colon, "':' after field name");
    let type_def = parse_type_definition(parser);
    let mut end_span = type_def.span().clone();
    let mut annotations = Vec::new();
    if parser.at(TokenKind::LBracket) {
        parser.advance();
        while !parser.at(TokenKind::RBracket) && !parser.at_eof() {
            let ann_tok = parser.expect(TokenKind::Identifier, "an annotation name");
            annotations.push(Annotation::from_name(&ann_tok.value));
            parser.eat(TokenKind::Comma);
        }
        end_span = parser.expect(TokenKind::RBracket, "']' to close annotation list").span;
    }
    let optional = matches!(type_def, TypeDefinition::Optional { .. });
    let span = name_tok.span.union(&end_span);
    Field { name: name_tok.value.to_string(), type_def, optional, annotations, span: NodeSpan::from(span) }
}

fn parse_entity(parser: &mut Parser, domain: &mut Domain) {
    let start = parser.advance().span; // 'entity'
    let name_tok = parser.expect(TokenKind::Identifier, "an entity name");
    parser.expect(TokenKind::LBrace, "'{' to open entity body");

    let mut fields = Vec::new();
    let mut invariants = Vec::new();
    let mut lifecycle = None;
    while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
        match parser.peek_kind() {
            TokenKind::InvariantsKw => {
                parser.advance();
                invariants.extend(parse_expr_seq_raw(parser));
            }
            TokenKind::LifecycleKw => lifecycle = Some(parse_lifecycle(parser)),
            TokenKind::Identifier => fields.push(parse_field(parser)),
            _ => {
                let span = parser.peek().span.clone();
                parser.diagnostic(DiagnosticCode::UnexpectedToken, "expected a field, 'invariants', or 'lifecycle'", span);
                parser.advance();
            }
        }
    }
    let end = parser.expect(TokenKind::RBrace, "'}' to close entity body").span;
    domain.entities.push(Entity {
        name: name_tok.value.to_string(),
        fields,
        invariants,
        lifecycle,
        span: NodeSpan::from(start.union(&end)),
    });
}

/// Same shape as [`parse_expr_seq`] but without consuming the opening brace
/// itself — used where the caller already knows it is positioned just after
/// the section keyword and wants the brace consumed here.
fn parse_expr_seq_raw(parser: &mut Parser) -> Vec<Expr> {
    parser.expect(TokenKind::LBrace, "'{' to open block");
    let mut items = Vec::new();
    while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
        parser.eat(TokenKind::Minus);
        items.push(parser.parse_expr());
        parser.eat(TokenKind::Comma);
    }
    parser.expect(TokenKind::RBrace, "'}' to close block");
    items
}

fn parse_lifecycle(parser: &mut Parser) -> Lifecycle {
    let start = parser.advance().span; // 'lifecycle'
    parser.expect(TokenKind::LBrace, "'{' to open lifecycle body");
    let mut transitions = Vec::new();
    while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
        let from_tok = parser.expect(TokenKind::Identifier, "a lifecycle state name");
        parser.expect(TokenKind::Arrow, "'->' between lifecycle states");
        let to_tok = parser.expect(TokenKind::Identifier, "a lifecycle state name");
        let span = from_tok.span.union(&to_tok.span);
        transitions.push(LifecycleTransition { from: from_tok.value.to_string(), to: to_tok.value.to_string(), span: NodeSpan::from(span) });
        parser.eat(TokenKind::Comma);
    }
    let end = parser.expect(TokenKind::RBrace, "'}' to close lifecycle body").span;
    Lifecycle { transitions, span: NodeSpan::from(start.union(&end)) }
}

fn parse_behavior(parser: &mut Parser, domain: &mut Domain) {
    let start = parser.advance().span; // 'behavior'
    let name_tok = parser.expect(TokenKind::Identifier, "a behavior name");
    let description = parser.eat(TokenKind::StringLiteral).map(|t| t.value.to_string());
    parser.expect(TokenKind::LBrace, "'{' to open behavior body");

    let mut actors = Vec::new();
    let mut input = InputSpec { fields: Vec::new(), span: NodeSpan::from(start.clone()) };
    let mut output = OutputSpec { success_type: None, errors: Vec::new(), span: NodeSpan::from(start.clone()) };
    let mut preconditions = Vec::new();
    let mut postconditions: Vec<PostBlock> = Vec::new();
    let mut invariants = Vec::new();
    let mut temporal = Vec::new();
    let mut security = Vec::new();
    let mut compliance = Vec::new();
    let mut observability = Vec::new();

    while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
        match parser.peek_kind() {
            TokenKind::ActorsKw => {
                parser.advance();
                parser.expect(TokenKind::LBrace, "'{' to open actors list");
                while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
                    actors.push(parser.expect(TokenKind::Identifier, "an actor name").value.to_string());
                    parser.eat(TokenKind::Comma);
                }
                parser.expect(TokenKind::RBrace, "'}' to close actors list");
            }
            TokenKind::InputKw => input = parse_input_spec(parser),
            TokenKind::OutputKw => output = parse_output_spec(parser),
            TokenKind::PreKw | TokenKind::PreconditionsKw => {
                parser.advance();
                preconditions.extend(parse_expr_seq_raw(parser));
            }
            TokenKind::PostKw => postconditions.push(parse_post_shorthand(parser)),
            TokenKind::PostconditionsKw => {
                parser.advance();
                parser.expect(TokenKind::LBrace, "'{' to open postconditions block");
                while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
                    postconditions.push(parse_post_verbose_entry(parser));
                }
                parser.expect(TokenKind::RBrace, "'}' to close postconditions block");
            }
            TokenKind::InvariantsKw => {
                parser.advance();
                invariants.extend(parse_expr_seq_raw(parser));
            }
            TokenKind::TemporalKw => {
                parser.advance();
                temporal.extend(parse_clauses(parser).into_iter().map(|(text, args, span)| TemporalClause { text, args, span }));
            }
            TokenKind::SecurityKw => {
                parser.advance();
                security.extend(parse_clauses(parser).into_iter().map(|(text, args, span)| SecurityClause { text, args, span }));
            }
            TokenKind::ComplianceKw => {
                parser.advance();
                compliance.extend(parse_clauses(parser).into_iter().map(|(text, args, span)| ComplianceClause { text, args, span }));
            }
            TokenKind::ObservabilityKw => {
                parser.advance();
                observability.extend(parse_clauses(parser).into_iter().map(|(text, args, span)| ObservabilityClause { text, args, span }));
            }
            _ => {
                let span = parser.peek().span.clone();
                parser.diagnostic(DiagnosticCode::UnexpectedToken, "expected a behavior section", span);
                parser.advance();
            }
        }
    }
    let end = parser.expect(TokenKind::RBrace, "'}' to close behavior body").span;
    domain.behaviors.push(Behavior {
        name: name_tok.value.to_string(),
        description,
        actors,
        input,
        output,
        preconditions,
        postconditions,
        invariants,
        temporal,
        security,
        compliance,
        observability,
        span: NodeSpan::from(start.union(&end)),
    });
}

fn parse_input_spec(parser: &mut Parser) -> InputSpec {
    let start = parser.advance().span; // 'input'
    parser.expect(TokenKind::LBrace, "'{' to open input spec");
    let mut fields = Vec::new();
    while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
        fields.push(parse_field(parser));
    }
    let end = parser.expect(TokenKind::RBrace, "'}' to close input spec").span;
    InputSpec { fields, span: NodeSpan::from(start.union(&end)) }
}

fn parse_output_spec(parser: &mut Parser) -> OutputSpec {
    let start = parser.advance().span; // 'output'
    parser.expect(TokenKind::LBrace, "'{' to open output spec");
    let mut success_type = None;
    let mut errors = Vec::new();
    while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
        if parser.at(TokenKind::Identifier) && &*parser.peek().value == "success" {
            parser.advance();
            parser.expect(TokenKind::Colon, "':' after 'success'");
            success_type = Some(parse_type_definition(parser));
        } else if parser.at(TokenKind::ErrorsKw) {
            parser.advance();
            parser.expect(TokenKind::LBrace, "'{' to open errors list");
            let mut seen = std::collections::HashSet::new();
            while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
                let err = parse_error_spec(parser);
                if !seen.insert(err.name.clone()) {
                    parser.diagnostic(
                        DiagnosticCode::DuplicateErrorName,
                        format!("duplicate error name '{}'; first declaration kept", err.name),
                        err.span.0.clone(),
                    );
                    continue;
                }
                errors.push(err);
            }
            parser.expect(TokenKind::RBrace, "'}' to close errors list");
        } else {
            let span = parser.peek().span.clone();
            parser.diagnostic(DiagnosticCode::UnexpectedToken, "expected 'success' or 'errors' in output spec", span);
            parser.advance();
        }
    }
    let end = parser.expect(TokenKind::RBrace, "'}' to close output spec").span;
    OutputSpec { success_type, errors, span: NodeSpan::from(start.union(&end)) }
}

fn parse_error_spec(parser: &mut Parser) -> ErrorSpec {
    let name_tok = parser.expect(TokenKind::Identifier, "an error name");
    let mut when = None;
    let mut retriable = false;
    let mut retry_after = None;
    let mut end_span = name_tok.span.clone();
    if parser.eat(TokenKind::LBrace).is_some() {
        while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
            let key_tok = parser.expect(TokenKind::Identifier, "an error-spec field name");
            parser.expect(TokenKind::Colon, "':' after error-spec field name");
            match &*key_tok.value {
                "when" => when = Some(parser.expect(TokenKind::StringLiteral, "a 'when' description string").value.to_string()),
                "retriable" => retriable = matches!(parser.parse_expr(), Expr::Boolean(true, _)),
                "retry_after" => retry_after = Some(parser.parse_expr()),
                _ => {
                    parser.diagnostic(DiagnosticCode::UnexpectedToken, format!("unknown error-spec field '{}'", key_tok.value), key_tok.span.clone());
                    let _ = parser.parse_expr();
                }
            }
            parser.eat(TokenKind::Comma);
        }
        end_span = parser.expect(TokenKind::RBrace, "'}' to close error spec").span;
    }
    ErrorSpec { name: name_tok.value.to_string(), when, retriable, retry_after, span: NodeSpan::from(name_tok.span.union(&end_span)) }
}

/// `post success { ... }` / `post <ERROR_NAME> { ... }` / `post failure { ... }`
/// (§4.2 pre/post shorthand).
fn parse_post_shorthand(parser: &mut Parser) -> PostBlock {
    let start = parser.advance().span; // 'post'
    let tag_tok = parser.expect(TokenKind::Identifier, "a postcondition tag ('success', an error name, or 'failure')");
    let condition_tag = match &*tag_tok.value {
        "failure" => "any_error".to_string(),
        other => other.to_string(),
    };
    let predicates = parse_expr_seq_raw(parser);
    let end = predicates.last().map(|e| e.span().clone()).unwrap_or(tag_tok.span);
    PostBlock { condition_tag, predicates, span: NodeSpan::from(start.union(&end)) }
}

/// `success implies { ... }` inside a verbose `postconditions { ... }` block.
fn parse_post_verbose_entry(parser: &mut Parser) -> PostBlock {
    let tag_tok = parser.expect(TokenKind::Identifier, "a postcondition tag");
    let condition_tag = match &*tag_tok.value {
        "failure" => "any_error".to_string(),
        other => other.to_string(),
    };
    parser.expect(TokenKind::Implies, "'implies' after postcondition tag");
    let predicates = parse_expr_seq_raw(parser);
    let end = predicates.last().map(|e| e.span().clone()).unwrap_or(tag_tok.span.clone());
    PostBlock { condition_tag, predicates, span: NodeSpan::from(tag_tok.span.union(&end)) }
}

/// A `temporal`/`security`/`compliance`/`observability` clause block: each
/// clause is `name(args...)`, recorded verbatim as `{text, args}` per the
/// open-question resolution in DESIGN.md (the grammar does not special-case
/// `within X exactly` / `rate_limit N/hour` prose forms).
fn parse_clauses(parser: &mut Parser) -> Vec<(String, Vec<Expr>, NodeSpan)> {
    parser.expect(TokenKind::LBrace, "'{' to open clause block");
    let mut clauses = Vec::new();
    while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
        let name_tok = parser.expect(TokenKind::Identifier, "a clause name");
        let mut args = Vec::new();
        let mut end_span = name_tok.span.clone();
        if parser.eat(TokenKind::LParen).is_some() {
            args = parser.parse_expr_list(TokenKind::RParen);
            end_span = parser.expect(TokenKind::RParen, "')' to close clause arguments").span;
        }
        clauses.push((name_tok.value.to_string(), args, NodeSpan::from(name_tok.span.union(&end_span))));
        parser.eat(TokenKind::Comma);
    }
    parser.expect(TokenKind::RBrace, "'}' to close clause block");
    clauses
}

fn parse_policy(parser: &mut Parser, domain: &mut Domain) {
    let start = parser.advance().span; // 'policy'
    let name_tok = parser.expect(TokenKind::Identifier, "a policy name");
    parser.expect(TokenKind::LBrace, "'{' to open policy body");
    let mut rules = Vec::new();
    let mut default = None;
    while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
        match parser.peek_kind() {
            TokenKind::RulesKw => {
                parser.advance();
                parser.expect(TokenKind::LBrace, "'{' to open rules list");
                while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
                    rules.push(parse_policy_rule(parser));
                }
                parser.expect(TokenKind::RBrace, "'}' to close rules list");
            }
            TokenKind::DefaultKw => {
                parser.advance();
                parser.expect(TokenKind::Colon, "':' after 'default'");
                default = Some(parse_effect(parser));
            }
            _ => {
                let span = parser.peek().span.clone();
                parser.diagnostic(DiagnosticCode::UnexpectedToken, "expected 'rules' or 'default' in policy body", span);
                parser.advance();
            }
        }
    }
    let end = parser.expect(TokenKind::RBrace, "'}' to close policy body").span;
    domain.policies.push(Policy { name: name_tok.value.to_string(), rules, default, span: NodeSpan::from(start.union(&end)) });
}

fn parse_effect(parser: &mut Parser) -> Effect {
    if parser.eat(TokenKind::AllowKw).is_some() {
        Effect::Allow
    } else {
        parser.expect(TokenKind::DenyKw, "'allow' or 'deny'");
        Effect::Deny
    }
}

fn parse_policy_rule(parser: &mut Parser) -> PolicyRule {
    let start = parser.advance_rule_kw_or_effect_span();
    let effect = parse_effect(parser);
    parser.expect(TokenKind::WhenKw, "'when' after rule effect");
    let condition = parser.parse_expr();
    let span = start.union(condition.span());
    PolicyRule { effect, condition, span: NodeSpan::from(span) }
}

impl Parser {
    /// `rule` is an optional leading keyword before `allow`/`deny when ...`;
    /// both `rule allow when ...` and bare `allow when ...` are accepted.
    fn advance_rule_kw_or_effect_span(&mut self) -> isl_position::Span {
        if self.at(TokenKind::RuleKw) {
            self.advance().span
        } else {
            self.peek().span.clone()
        }
    }
}

fn parse_view(parser: &mut Parser, domain: &mut Domain) {
    let start = parser.advance().span; // 'view'
    let name_tok = parser.expect(TokenKind::Identifier, "a view name");
    parser.expect(TokenKind::LBrace, "'{' to open view body");
    let mut source_entity = Vec::new();
    let mut fields = Vec::new();
    let mut filter = None;
    while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
        if parser.at(TokenKind::FieldsKw) {
            parser.advance();
            parser.expect(TokenKind::Colon, "':' after 'fields'");
            parser.expect(TokenKind::LBracket, "'[' to open view field list");
            while !parser.at(TokenKind::RBracket) && !parser.at_eof() {
                fields.push(parser.expect(TokenKind::Identifier, "a projected field name").value.to_string());
                parser.eat(TokenKind::Comma);
            }
            parser.expect(TokenKind::RBracket, "']' to close view field list");
        } else if parser.at(TokenKind::Identifier) && &*parser.peek().value == "source" {
            parser.advance();
            parser.expect(TokenKind::Colon, "':' after 'source'");
            source_entity.push(parser.expect(TokenKind::Identifier, "a source entity name").value.to_string());
            while parser.eat(TokenKind::Dot).is_some() {
                source_entity.push(parser.expect(TokenKind::Identifier, "a qualified source segment").value.to_string());
            }
        } else if parser.at(TokenKind::FilterKw) {
            parser.advance();
            parser.expect(TokenKind::Colon, "':' after 'filter'");
            filter = Some(parser.parse_expr());
        } else {
            let span = parser.peek().span.clone();
            parser.diagnostic(DiagnosticCode::UnexpectedToken, "expected 'source', 'fields', or 'filter' in view body", span);
            parser.advance();
        }
    }
    let end = parser.expect(TokenKind::RBrace, "'}' to close view body").span;
    domain.views.push(View { name: name_tok.value.to_string(), source_entity, fields, filter, span: NodeSpan::from(start.union(&end)) });
}

fn parse_stmt(parser: &mut Parser) -> Stmt {
    if parser.at(TokenKind::Identifier) && &*parser.peek().value == "let" {
        let start = parser.advance().span;
        let name_tok = parser.expect(TokenKind::Identifier, "a let-binding name");
        parser.expect(TokenKind::Assign, "'=' in let binding");
        let value = parser.parse_expr();
        let span = start.union(value.span());
        return Stmt::Let { name: name_tok.value.to_string(), value, span: NodeSpan::from(span) };
    }
    let expr = parser.parse_expr();
    if parser.eat(TokenKind::Assign).is_some() {
        let value = parser.parse_expr();
        let span = expr.span().union(value.span());
        return Stmt::Assign { target: expr, value, span: NodeSpan::from(span) };
    }
    let span = expr.span().clone();
    Stmt::Call { expr, span: NodeSpan::from(span) }
}

fn parse_stmt_seq(parser: &mut Parser, terminator: TokenKind) -> Vec<Stmt> {
    parser.expect(TokenKind::LBrace, "'{' to open block");
    let mut items = Vec::new();
    while !parser.at(terminator) && !parser.at_eof() {
        items.push(parse_stmt(parser));
        parser.eat(TokenKind::Comma);
    }
    parser.expect(terminator, "'}' to close block");
    items
}

fn parse_scenario_block(parser: &mut Parser, domain: &mut Domain) {
    let start = parser.advance().span; // 'scenarios'
    let target_tok = parser.expect(TokenKind::Identifier, "a target behavior name");
    parser.expect(TokenKind::LBrace, "'{' to open scenarios block");
    let mut scenarios = Vec::new();
    while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
        if !parser.at(TokenKind::ScenarioKw) {
            let span = parser.peek().span.clone();
            parser.diagnostic(DiagnosticCode::UnexpectedToken, "expected 'scenario' inside scenarios block", span);
            parser.advance();
            continue;
        }
        let s_start = parser.advance().span; // 'scenario'
        let name_tok = parser.expect(TokenKind::StringLiteral, "a scenario name string");
        parser.expect(TokenKind::LBrace, "'{' to open scenario body");
        let mut given = Vec::new();
        let mut when = Vec::new();
        let mut then = Vec::new();
        while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
            match parser.peek_kind() {
                TokenKind::GivenKw => {
                    parser.advance();
                    given.extend(parse_stmt_seq(parser, TokenKind::RBrace));
                }
                TokenKind::WhenKw => {
                    parser.advance();
                    when.extend(parse_stmt_seq(parser, TokenKind::RBrace));
                }
                TokenKind::ThenKw => {
                    parser.advance();
                    then.extend(parse_expr_seq_raw(parser));
                }
                _ => {
                    let span = parser.peek().span.clone();
                    parser.diagnostic(DiagnosticCode::UnexpectedToken, "expected 'given', 'when', or 'then' in scenario body", span);
                    parser.advance();
                }
            }
        }
        let s_end = parser.expect(TokenKind::RBrace, "'}' to close scenario body").span;
        scenarios.push(Scenario { name: name_tok.value.to_string(), given, when, then, span: NodeSpan::from(s_start.union(&s_end)) });
    }
    let end = parser.expect(TokenKind::RBrace, "'}' to close scenarios block").span;
    domain.scenario_blocks.push(ScenarioBlock {
        target_behavior: target_tok.value.to_string(),
        scenarios,
        span: NodeSpan::from(start.union(&end)),
    });
}

fn parse_with_clause(parser: &mut Parser) -> WithClause {
    let start = parser.advance().span; // 'with'
    parser.expect(TokenKind::LBrace, "'{' to open with-clause body");
    let mut args = Vec::new();
    while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
        let name_tok = parser.expect(TokenKind::Identifier, "a with-clause argument name");
        parser.expect(TokenKind::Colon, "':' after with-clause argument name");
        let value = parser.parse_expr();
        let span = name_tok.span.union(value.span());
        args.push(ChaosArgument { name: name_tok.value.to_string(), value, span: NodeSpan::from(span) });
        parser.eat(TokenKind::Comma);
    }
    let end = parser.expect(TokenKind::RBrace, "'}' to close with-clause body").span;
    WithClause { args, span: NodeSpan::from(start.union(&end)) }
}

/// Both the block form (`inject { fn(args) }`) and the inline form
/// (`inject <type> on <target> with { ... }`) normalise to one [`Injection`]
/// shape (§4.3).
fn parse_injection(parser: &mut Parser) -> Injection {
    let start = parser.advance().span; // 'inject'
    if parser.at(TokenKind::LBrace) {
        parser.advance();
        let call = parser.parse_expr();
        let end = parser.expect(TokenKind::RBrace, "'}' to close inject block").span;
        let fault_type = match &call {
            Expr::Call { callee, .. } => match callee.as_ref() {
                Expr::Identifier { name, .. } => name.clone(),
                Expr::QualifiedName { parts, .. } => parts.join("."),
                _ => "unknown".to_string(),
            },
            _ => "unknown".to_string(),
        };
        return Injection {
            fault_type,
            target: None,
            call: Some(call),
            with_clause: None,
            span: NodeSpan::from(start.union(&end)),
        };
    }
    let type_tok = parser.expect(TokenKind::Identifier, "an injected fault type");
    let mut end_span = type_tok.span.clone();
    let mut target = None;
    if parser.at(TokenKind::Identifier) && &*parser.peek().value == "on" {
        parser.advance();
        let target_tok = parser.expect(TokenKind::Identifier, "an injection target");
        end_span = target_tok.span.clone();
        target = Some(target_tok.value.to_string());
    }
    let with_clause = if parser.at(TokenKind::WithKw) {
        let wc = parse_with_clause(parser);
        end_span = wc.span.0.clone();
        Some(wc)
    } else {
        None
    };
    Injection { fault_type: type_tok.value.to_string(), target, call: None, with_clause, span: NodeSpan::from(start.union(&end_span)) }
}

fn parse_chaos_block(parser: &mut Parser, domain: &mut Domain) {
    let start = parser.advance().span; // 'chaos'
    let target_tok = parser.expect(TokenKind::Identifier, "a target behavior name");
    parser.expect(TokenKind::LBrace, "'{' to open chaos block");
    let mut scenarios = Vec::new();
    while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
        if !matches!(parser.peek_kind(), TokenKind::ChaosKw | TokenKind::ScenarioKw) {
            let span = parser.peek().span.clone();
            parser.diagnostic(DiagnosticCode::UnexpectedToken, "expected 'chaos' or 'scenario' inside chaos block", span);
            parser.advance();
            continue;
        }
        let c_start = parser.advance().span; // 'chaos' or 'scenario'
        let name_tok = parser.expect(TokenKind::StringLiteral, "a chaos scenario name string");
        parser.expect(TokenKind::LBrace, "'{' to open chaos scenario body");

        let mut inject = Vec::new();
        let mut when = Vec::new();
        let mut then = Vec::new();
        let mut expect = Vec::new();
        let mut with_clause = None;
        while !parser.at(TokenKind::RBrace) && !parser.at_eof() {
            match parser.peek_kind() {
                TokenKind::InjectKw => inject.push(parse_injection(parser)),
                TokenKind::WhenKw => {
                    parser.advance();
                    when.extend(parse_stmt_seq(parser, TokenKind::RBrace));
                }
                TokenKind::ThenKw => {
                    parser.advance();
                    then.extend(parse_expr_seq_raw(parser));
                }
                TokenKind::ExpectKw => {
                    parser.advance();
                    expect.extend(parse_expr_seq_raw(parser));
                }
                TokenKind::WithKw => with_clause = Some(parse_with_clause(parser)),
                _ => {
                    let span = parser.peek().span.clone();
                    parser.diagnostic(DiagnosticCode::UnexpectedToken, "expected a chaos scenario section", span);
                    parser.advance();
                }
            }
        }
        let c_end = parser.expect(TokenKind::RBrace, "'}' to close chaos scenario body").span;
        let mut expectations = then.clone();
        expectations.extend(expect.clone());
        scenarios.push(ChaosScenario {
            name: name_tok.value.to_string(),
            inject,
            when,
            then,
            expectations,
            with_clause,
            span: NodeSpan::from(c_start.union(&c_end)),
        });
    }
    let end = parser.expect(TokenKind::RBrace, "'}' to close chaos block").span;
    domain.chaos_blocks.push(ChaosBlock {
        target_behavior: target_tok.value.to_string(),
        scenarios,
        span: NodeSpan::from(start.union(&end)),
    });
}
