//! Translation of selection closures into GraphQL operation text.
//!
//! The walk is a single recursive match over [`ExprKind`]. Every node either
//! contributes text or fails with a [`Diagnostic`] pointing at the offending
//! sub-expression; the first failure aborts the whole selection.

use crate::context::SelectionContext;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::fragment;
use crate::host;
use crate::symbols::{
    field_selector, template, FunctionSymbol, MethodSymbol, ParameterSymbol, Symbol,
    SymbolResolver, Tag,
};
use crate::syntax::{Expr, ExprKind, FnDecl, Literal, TypeExpr};
use crate::variable::{GraphQLQueryVariable, VariableSet};
use indexmap::IndexMap;
use std::cell::RefCell;
use tokio_util::sync::CancellationToken;

/// A translated selection.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ResolvedQuery {
    /// `(vars) { body }`, or `{ body }` without variables.
    pub query: String,
    pub variables: VariableSet,
}

/// Translate a selection closure. The closure takes the root (`|q| ...`)
/// or a variables object followed by the root (`|vars, q| ...`).
#[tracing::instrument(skip_all, fields(selection = %selection.location))]
pub fn resolve(
    selection: &Expr,
    symbols: &dyn SymbolResolver,
    cancel: &CancellationToken,
) -> Result<ResolvedQuery, Diagnostic> {
    translate(selection, &[], symbols, cancel)
}

/// Translate the selection of a request struct, `|req, q| ...`. Every field
/// becomes an operation variable in declaration order, used or not.
#[tracing::instrument(skip_all, fields(selection = %selection.location, fields = fields.len()))]
pub fn resolve_request(
    selection: &Expr,
    fields: &[(String, TypeExpr)],
    symbols: &dyn SymbolResolver,
    cancel: &CancellationToken,
) -> Result<ResolvedQuery, Diagnostic> {
    match &selection.kind {
        ExprKind::Closure { params, .. } if params.len() == 2 => {}
        _ => return Err(Diagnostic::new(DiagnosticKind::Untranslatable, selection)),
    }
    let declared: Vec<_> = fields
        .iter()
        .map(|(name, ty)| GraphQLQueryVariable::variable(name, host::graphql_type(ty)))
        .collect();
    translate(selection, &declared, symbols, cancel)
}

fn translate(
    selection: &Expr,
    declared: &[GraphQLQueryVariable],
    symbols: &dyn SymbolResolver,
    cancel: &CancellationToken,
) -> Result<ResolvedQuery, Diagnostic> {
    let ExprKind::Closure { params, body } = &selection.kind else {
        return Err(Diagnostic::new(DiagnosticKind::Untranslatable, selection));
    };
    let (variables_param, root) = match params.as_slice() {
        [root] => (None, root),
        [variables, root] => (Some(variables), root),
        _ => return Err(Diagnostic::new(DiagnosticKind::Untranslatable, selection)),
    };

    let variables = RefCell::new(VariableSet::default());
    let mut predefined = IndexMap::new();
    if let Some(variables_param) = variables_param {
        for variable in declared {
            let variable = variables.borrow_mut().insert(variable.clone()).clone();
            predefined.insert(format!("{}.{}", variables_param.name, variable.name), variable);
        }
        register_variables_object(
            body,
            &variables_param.name,
            symbols,
            &variables,
            &mut predefined,
        )?;
    }

    let ctx = SelectionContext::new(&root.name, &variables, symbols, cancel)
        .with_predefined(predefined);
    let body = resolve_selector_body(&ctx, body)?;
    drop(ctx);

    let variables = variables.into_inner();
    let query = if variables.is_empty() {
        body
    } else {
        format!("({}) {}", variables.declaration(), body)
    };
    tracing::debug!(%query, variables = variables.len(), "resolved selection");
    Ok(ResolvedQuery { query, variables })
}

/// Translate a fragment declaration into a body template. Parameters after
/// the root are left as `{{name}}` placeholders for callers to fill in.
#[tracing::instrument(skip_all, fields(fragment = %decl.name))]
pub fn resolve_fragment_template(
    decl: &FnDecl,
    symbols: &dyn SymbolResolver,
    cancel: &CancellationToken,
) -> Result<String, Diagnostic> {
    let Some((root, params)) = decl.params.split_first() else {
        return Err(Diagnostic::new(DiagnosticKind::Untranslatable, &decl.body));
    };
    let predefined = params
        .iter()
        .map(|p| {
            let value = fragment::placeholder(&p.name);
            (p.name.clone(), GraphQLQueryVariable::constant(&p.name, value))
        })
        .collect();

    let variables = RefCell::new(VariableSet::default());
    let ctx = SelectionContext::new(&root.name, &variables, symbols, cancel)
        .enter(&decl.name, &decl.body)?
        .with_predefined(predefined);
    resolve_selector_body(&ctx, &decl.body)
}

/// Every `vars.prop` in the body becomes an operation variable up front, in
/// order of first appearance.
fn register_variables_object(
    body: &Expr,
    variables_name: &str,
    symbols: &dyn SymbolResolver,
    variables: &RefCell<VariableSet>,
    predefined: &mut IndexMap<String, GraphQLQueryVariable>,
) -> Result<(), Diagnostic> {
    let mut failure = None;
    body.walk(&mut |node| {
        if failure.is_some() {
            return;
        }
        let ExprKind::Field { receiver, .. } = &node.kind else {
            return;
        };
        if !receiver.is_ident(variables_name) || predefined.contains_key(&node.text) {
            return;
        }
        match symbols.symbol(node) {
            Some(Symbol::VariablesProperty { name, graphql_type }) => {
                let variable = GraphQLQueryVariable::variable(name, graphql_type);
                let variable = variables.borrow_mut().insert(variable).clone();
                predefined.entry(node.text.clone()).or_insert(variable);
            }
            _ => failure = Some(Diagnostic::new(DiagnosticKind::Untranslatable, node)),
        }
    });
    match failure {
        Some(diagnostic) => Err(diagnostic),
        None => Ok(()),
    }
}

/// Resolve the body of a selector and wrap it in braces.
pub(crate) fn resolve_selector_body(
    ctx: &SelectionContext<'_>,
    body: &Expr,
) -> Result<String, Diagnostic> {
    if returns_root(body, &ctx.root) {
        return Err(Diagnostic::new(DiagnosticKind::OpenSelector, body));
    }
    let inner = resolve_node(ctx, body)?;
    if inner.is_empty() {
        return Err(Diagnostic::new(DiagnosticKind::Untranslatable, body));
    }
    Ok(braced(&inner))
}

fn returns_root(body: &Expr, root: &str) -> bool {
    match &body.kind {
        ExprKind::Block { stmts, .. } if stmts.len() == 1 => returns_root(&stmts[0], root),
        ExprKind::Return(Some(inner)) => returns_root(inner, root),
        _ => body.is_ident(root),
    }
}

fn braced(inner: &str) -> String {
    format!("{{ {inner} }}")
}

pub(crate) fn resolve_node(ctx: &SelectionContext<'_>, node: &Expr) -> Result<String, Diagnostic> {
    ctx.check_cancelled(node)?;
    match &node.kind {
        ExprKind::Path(segments) if segments.len() == 1 => identifier(ctx, node, &segments[0]),
        ExprKind::Field { receiver, .. } => member_access(ctx, node, receiver),
        ExprKind::MethodCall { receiver, args, .. } => method_call(ctx, node, receiver, args),
        ExprKind::Call { args, .. } => call(ctx, node, args),
        ExprKind::Tuple(items) => join(ctx, items.iter()),
        ExprKind::Struct { fields, .. } => join(ctx, fields.iter().map(|(_, e)| e)),
        ExprKind::Cast { expr, .. } => match ctx.symbols.type_of(node) {
            Some(ty) if ty.is_enum => resolve_node(ctx, expr),
            _ => Err(Diagnostic::new(DiagnosticKind::Untranslatable, node)),
        },
        ExprKind::Block { stmts, has_tail } => match stmts.as_slice() {
            [only] if *has_tail => resolve_node(ctx, only),
            [Expr {
                kind: ExprKind::Return(Some(inner)),
                ..
            }] => resolve_node(ctx, inner),
            [first, ..] => Err(Diagnostic::new(DiagnosticKind::Untranslatable, first)),
            [] => Err(Diagnostic::new(DiagnosticKind::Untranslatable, node)),
        },
        ExprKind::Return(Some(inner)) => resolve_node(ctx, inner),
        _ => Err(Diagnostic::new(DiagnosticKind::Untranslatable, node)),
    }
}

fn join<'e>(
    ctx: &SelectionContext<'_>,
    items: impl Iterator<Item = &'e Expr>,
) -> Result<String, Diagnostic> {
    let mut parts = Vec::new();
    for item in items {
        let part = resolve_node(ctx, item)?;
        if !part.is_empty() {
            parts.push(part);
        }
    }
    Ok(parts.join(" "))
}

fn identifier(ctx: &SelectionContext<'_>, node: &Expr, name: &str) -> Result<String, Diagnostic> {
    if name == ctx.root {
        return Err(Diagnostic::new(DiagnosticKind::OpenSelector, node));
    }
    match ctx.symbols.symbol(node) {
        // A helper passed where a selector is expected selects from the
        // same root under its own parameter name.
        Some(Symbol::Function(FunctionSymbol {
            declaration: Some(decl),
            ..
        })) if decl.params.len() == 1 => {
            let inner = ctx.enter(&decl.name, node)?.with_root(&decl.params[0].name);
            let body = resolve_selector_body(&inner, &decl.body)?;
            Ok(unbrace(&body).to_string())
        }
        Some(Symbol::Function(FunctionSymbol {
            tags, parameters, ..
        })) if parameters.is_empty() => match template(&tags) {
            Some(body) => Ok(body.to_string()),
            None => Err(Diagnostic::new(DiagnosticKind::FragmentUnavailable, node)),
        },
        Some(Symbol::Parameter { .. }) => Err(Diagnostic::new(DiagnosticKind::OutOfScope, node)),
        _ => Err(Diagnostic::new(DiagnosticKind::Untranslatable, node)),
    }
}

fn unbrace(body: &str) -> &str {
    body.strip_prefix("{ ")
        .and_then(|b| b.strip_suffix(" }"))
        .unwrap_or(body)
}

fn member_access(
    ctx: &SelectionContext<'_>,
    node: &Expr,
    receiver: &Expr,
) -> Result<String, Diagnostic> {
    check_receiver(ctx, node, receiver)?;
    match ctx.symbols.symbol(node) {
        Some(Symbol::Member { tags, .. }) => match field_selector(&tags) {
            Some(wire) => Ok(wire.to_string()),
            None => Err(Diagnostic::new(DiagnosticKind::MissingFieldSelector, node)),
        },
        _ => Err(Diagnostic::new(DiagnosticKind::MissingFieldSelector, node)),
    }
}

/// Members may only be read off the current root.
fn check_receiver(
    ctx: &SelectionContext<'_>,
    node: &Expr,
    receiver: &Expr,
) -> Result<(), Diagnostic> {
    match receiver.as_ident() {
        Some(name) if name == ctx.root => Ok(()),
        Some(_) => match ctx.symbols.symbol(receiver) {
            Some(Symbol::State { .. }) => {
                Err(Diagnostic::new(DiagnosticKind::Untranslatable, node))
            }
            _ => Err(Diagnostic::new(DiagnosticKind::OutOfScope, receiver)),
        },
        None => Err(Diagnostic::new(DiagnosticKind::Untranslatable, node)),
    }
}

fn method_call(
    ctx: &SelectionContext<'_>,
    node: &Expr,
    receiver: &Expr,
    args: &[Expr],
) -> Result<String, Diagnostic> {
    check_receiver(ctx, node, receiver)?;
    let Some(Symbol::Method(method)) = ctx.symbols.symbol(node) else {
        return Err(Diagnostic::new(DiagnosticKind::MissingFieldSelector, node));
    };

    if method.tags.contains(&Tag::Syntax) {
        return narrowing(ctx, node, &method, args);
    }
    if is_fragment(&method.tags) || method.declaration.is_some() {
        return inline_fragment(
            ctx,
            node,
            &method.name,
            &method.tags,
            method.declaration.as_deref(),
            &method.parameters,
            args,
        );
    }
    match field_selector(&method.tags) {
        Some(wire) => selector(ctx, node, wire, &method, args),
        None => Err(Diagnostic::new(DiagnosticKind::MissingFieldSelector, node)),
    }
}

fn call(ctx: &SelectionContext<'_>, node: &Expr, args: &[Expr]) -> Result<String, Diagnostic> {
    match ctx.symbols.symbol(node) {
        Some(Symbol::Function(function)) if is_fragment(&function.tags) => {
            let Some((root, rest)) = args.split_first() else {
                return Err(Diagnostic::new(DiagnosticKind::Untranslatable, node));
            };
            match root.as_ident() {
                Some(name) if name == ctx.root => {}
                Some(_) => return Err(Diagnostic::new(DiagnosticKind::OutOfScope, root)),
                None => return Err(Diagnostic::new(DiagnosticKind::Untranslatable, root)),
            }
            inline_fragment(
                ctx,
                node,
                &function.name,
                &function.tags,
                function.declaration.as_deref(),
                &function.parameters,
                rest,
            )
        }
        // Tuple structs and variants group their fields like a tuple.
        Some(Symbol::Constructor { .. }) => join(ctx, args.iter()),
        _ => Err(Diagnostic::new(DiagnosticKind::MissingFieldSelector, node)),
    }
}

fn is_fragment(tags: &[Tag]) -> bool {
    tags.iter()
        .any(|t| matches!(t, Tag::Fragment | Tag::FragmentTemplate(_)))
}

fn inline_fragment(
    ctx: &SelectionContext<'_>,
    node: &Expr,
    name: &str,
    tags: &[Tag],
    declaration: Option<&FnDecl>,
    parameters: &[ParameterSymbol],
    args: &[Expr],
) -> Result<String, Diagnostic> {
    let Some(source) = fragment::source(name, tags, declaration) else {
        return Err(Diagnostic::new(DiagnosticKind::FragmentUnavailable, node));
    };
    if args.len() != parameters.len() {
        return Err(Diagnostic::new(DiagnosticKind::Untranslatable, node));
    }
    tracing::trace!(fragment = source.name(), "inlining fragment");
    let body = source.inline(ctx, node, args, parameters)?;
    Ok(unbrace(&body).to_string())
}

fn narrowing(
    ctx: &SelectionContext<'_>,
    node: &Expr,
    method: &MethodSymbol,
    args: &[Expr],
) -> Result<String, Diagnostic> {
    match (method.type_arguments.first(), args) {
        (Some(target), [selector]) => {
            let body = resolve_selector_arg(ctx, selector)?;
            Ok(format!("... on {target} {body}"))
        }
        _ => Err(Diagnostic::new(DiagnosticKind::Untranslatable, node)),
    }
}

fn selector(
    ctx: &SelectionContext<'_>,
    node: &Expr,
    wire: &str,
    method: &MethodSymbol,
    args: &[Expr],
) -> Result<String, Diagnostic> {
    let expected = method.parameters.len() + usize::from(method.has_selector);
    if args.len() != expected {
        return Err(Diagnostic::new(DiagnosticKind::Untranslatable, node));
    }

    let mut arguments = Vec::new();
    for (parameter, arg) in method.parameters.iter().zip(args) {
        let value = resolve_argument(ctx, arg, parameter)?;
        if !value.is_empty() {
            arguments.push(format!("{}: {}", parameter.name, value));
        }
    }
    let head = if arguments.is_empty() {
        wire.to_string()
    } else {
        format!("{wire}({})", arguments.join(", "))
    };

    if !method.has_selector {
        return Ok(head);
    }
    let Some(selector) = args.last() else {
        return Err(Diagnostic::new(DiagnosticKind::Untranslatable, node));
    };
    let body = resolve_selector_arg(ctx, selector)?;
    let polymorphic = method
        .selector_target
        .as_ref()
        .is_some_and(|t| t.is_polymorphic());
    if polymorphic {
        Ok(format!("{head} {{ __typename {} }}", unbrace(&body)))
    } else {
        Ok(format!("{head} {body}"))
    }
}

/// The trailing transform of a selector: a closure, or a helper function
/// referenced by name.
fn resolve_selector_arg(ctx: &SelectionContext<'_>, arg: &Expr) -> Result<String, Diagnostic> {
    match &arg.kind {
        ExprKind::Closure { params, body } => match params.as_slice() {
            [root] => resolve_selector_body(&ctx.with_root(&root.name), body),
            _ => Err(Diagnostic::new(DiagnosticKind::Untranslatable, arg)),
        },
        ExprKind::Path(segments) if segments.len() == 1 => {
            let inner = identifier(ctx, arg, &segments[0])?;
            if inner.is_empty() {
                return Err(Diagnostic::new(DiagnosticKind::Untranslatable, arg));
            }
            Ok(braced(&inner))
        }
        _ => Err(Diagnostic::new(DiagnosticKind::Untranslatable, arg)),
    }
}

/// Render an argument value: a literal, a bound variable, or an enum member.
pub(crate) fn resolve_argument(
    ctx: &SelectionContext<'_>,
    arg: &Expr,
    parameter: &ParameterSymbol,
) -> Result<String, Diagnostic> {
    ctx.check_cancelled(arg)?;
    if let ExprKind::Lit(literal) = &arg.kind {
        return Ok(render_literal(literal));
    }
    if let Some(variable) = ctx.predefined(&arg.text) {
        return Ok(variable.graphql_value().to_string());
    }

    match &arg.kind {
        ExprKind::Closure { .. } => Ok(String::new()),
        ExprKind::Path(_) => match ctx.symbols.symbol(arg) {
            Some(Symbol::Local { name } | Symbol::Parameter { name }) => Ok(ctx.register(
                GraphQLQueryVariable::variable(name, &parameter.graphql_type),
            )),
            Some(Symbol::EnumMember { variant, tags }) => Ok(field_selector(&tags)
                .map(str::to_string)
                .unwrap_or_else(|| zeroql_schema::surface::fallback_enum_value(&variant))),
            Some(Symbol::Constructor { name }) if name == "None" => Ok("null".to_string()),
            Some(Symbol::State { .. }) => Err(Diagnostic::new(DiagnosticKind::NonStatic, arg)),
            _ => Err(Diagnostic::new(DiagnosticKind::Untranslatable, arg)),
        },
        ExprKind::Call { func, args } if func.is_ident("Some") && args.len() == 1 => {
            resolve_argument(ctx, &args[0], parameter)
        }
        ExprKind::Cast { expr, .. } => match ctx.symbols.type_of(arg) {
            Some(ty) if ty.is_enum => resolve_argument(ctx, expr, parameter),
            _ => Err(Diagnostic::new(DiagnosticKind::Untranslatable, arg)),
        },
        // `self.limit`, `config.limit`: not a local and not the variables object.
        ExprKind::Field { .. } => Err(Diagnostic::new(DiagnosticKind::NonStatic, arg)),
        _ => Err(Diagnostic::new(DiagnosticKind::Untranslatable, arg)),
    }
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Str(value) => quote_string(value),
        Literal::Int(value) | Literal::Float(value) => value.clone(),
        Literal::Bool(value) => value.to_string(),
    }
}

fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_literals_are_escaped() {
        assert_eq!(quote_string("a\"b\\c\n"), r#""a\"b\\c\n""#);
        assert_eq!(quote_string("\u{1}"), r#""\u0001""#);
    }

    #[test]
    fn unbrace_strips_one_level() {
        assert_eq!(unbrace("{ a { b } }"), "a { b }");
        assert_eq!(unbrace("a"), "a");
    }

    #[test]
    fn root_detection_sees_through_blocks() {
        let expr = crate::syntax::parse_expr("{ return o; }").unwrap();
        assert!(returns_root(&expr, "o"));
        let expr = crate::syntax::parse_expr("o.id").unwrap();
        assert!(!returns_root(&expr, "o"));
    }
}
