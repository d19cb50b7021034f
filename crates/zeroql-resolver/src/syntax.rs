//! The selection expression tree.
//!
//! Selections are written as Rust closures. They are parsed with `syn` and
//! lowered into [`Expr`], a closed set of node shapes that the resolver
//! matches on exhaustively. Lowered trees own plain data only, so they can
//! move between threads; source spans are kept on the side when a caller
//! needs them for reporting.

use proc_macro2::Span;
use quote::ToTokens;
use std::sync::atomic::{AtomicU64, Ordering};
use syn::spanned::Spanned;

/// Process-wide unique node identity. Helper and fragment bodies are lowered
/// separately from the selections that use them, so ids never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

static NEXT_NODE: AtomicU64 = AtomicU64::new(0);

impl NodeId {
    fn fresh() -> Self {
        NodeId(NEXT_NODE.fetch_add(1, Ordering::Relaxed))
    }
}

/// One-based line and column of a node in its source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    fn of(span: Span) -> Self {
        let start = span.start();
        Location {
            line: start.line,
            column: start.column + 1,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub location: Location,
    /// Normalized source text. Paths, field accesses and calls render the
    /// way they are usually written (`vars.id`, `Role::Admin`, `names(p)`),
    /// so the text serves as a lookup key and reads well in diagnostics.
    pub text: String,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Closure {
        params: Vec<Param>,
        body: Box<Expr>,
    },
    /// `{ ... }`; `has_tail` is set when the last statement has no semicolon.
    Block {
        stmts: Vec<Expr>,
        has_tail: bool,
    },
    Return(Option<Box<Expr>>),
    Field {
        receiver: Box<Expr>,
        member: String,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        type_args: Vec<String>,
        args: Vec<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Tuple(Vec<Expr>),
    Struct {
        path: String,
        fields: Vec<(String, Expr)>,
    },
    Cast {
        expr: Box<Expr>,
        ty: String,
    },
    Path(Vec<String>),
    Lit(Literal),
    Unsupported,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(String),
    Float(String),
    Bool(bool),
}

/// A closure or function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Option<TypeExpr>,
}

/// A Rust type as written, reduced to what type mapping needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Named { name: String, args: Vec<TypeExpr> },
    Ref(Box<TypeExpr>),
    Other(String),
}

impl TypeExpr {
    /// The named type behind references and smart pointers:
    /// `&Person` and `Box<Person>` both give `Person`.
    pub fn base_name(&self) -> &str {
        match self {
            TypeExpr::Ref(inner) => inner.base_name(),
            TypeExpr::Named { name, args } if name == "Box" && args.len() == 1 => {
                args[0].base_name()
            }
            TypeExpr::Named { name, .. } => name,
            TypeExpr::Other(text) => text,
        }
    }
}

/// A free function that selections may reference: a helper passed in
/// selector position, or a fragment.
#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Expr,
    pub is_fragment: bool,
    pub location: Location,
}

impl Expr {
    /// Pre-order traversal.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match &self.kind {
            ExprKind::Closure { body, .. } => body.walk(f),
            ExprKind::Block { stmts, .. } => stmts.iter().for_each(|s| s.walk(f)),
            ExprKind::Return(inner) => {
                if let Some(inner) = inner {
                    inner.walk(f);
                }
            }
            ExprKind::Field { receiver, .. } => receiver.walk(f),
            ExprKind::MethodCall { receiver, args, .. } => {
                receiver.walk(f);
                args.iter().for_each(|a| a.walk(f));
            }
            ExprKind::Call { func, args } => {
                func.walk(f);
                args.iter().for_each(|a| a.walk(f));
            }
            ExprKind::Tuple(items) => items.iter().for_each(|i| i.walk(f)),
            ExprKind::Struct { fields, .. } => fields.iter().for_each(|(_, e)| e.walk(f)),
            ExprKind::Cast { expr, .. } => expr.walk(f),
            ExprKind::Path(_) | ExprKind::Lit(_) | ExprKind::Unsupported => {}
        }
    }

    /// The identifier, if this node is a single-segment path.
    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Path(segments) if segments.len() == 1 => Some(&segments[0]),
            _ => None,
        }
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.as_ident() == Some(name)
    }
}

/// Zero-argument conversions that only exist to satisfy the borrow checker
/// inside a selector. They do not change the query shape.
const TRANSPARENT_METHODS: &[&str] = &[
    "clone", "to_owned", "to_string", "into", "cloned", "copied", "as_deref", "as_ref",
];

/// Lowers `syn` trees, optionally remembering the span of every node.
#[derive(Default)]
pub struct Lowering {
    spans: Option<Vec<(NodeId, Span)>>,
}

impl Lowering {
    pub fn with_spans() -> Self {
        Self {
            spans: Some(Vec::new()),
        }
    }

    /// Spans recorded so far, keyed by node.
    pub fn into_spans(self) -> Vec<(NodeId, Span)> {
        self.spans.unwrap_or_default()
    }

    fn node(&mut self, span: Span, text: String, kind: ExprKind) -> Expr {
        let id = NodeId::fresh();
        if let Some(spans) = &mut self.spans {
            spans.push((id, span));
        }
        Expr {
            id,
            location: Location::of(span),
            text,
            kind,
        }
    }

    pub fn lower(&mut self, expr: &syn::Expr) -> Expr {
        let span = expr.span();
        match expr {
            syn::Expr::Paren(p) => self.lower(&p.expr),
            syn::Expr::Group(g) => self.lower(&g.expr),
            syn::Expr::Reference(r) => self.lower(&r.expr),
            syn::Expr::Unary(u) => match (&u.op, u.expr.as_ref()) {
                (syn::UnOp::Deref(_), inner) => self.lower(inner),
                (syn::UnOp::Neg(_), syn::Expr::Lit(lit)) => {
                    let negated = match &lit.lit {
                        syn::Lit::Int(i) => Some(Literal::Int(format!("-{}", i.base10_digits()))),
                        syn::Lit::Float(f) => {
                            Some(Literal::Float(format!("-{}", f.base10_digits())))
                        }
                        _ => None,
                    };
                    match negated {
                        Some(value) => self.node(span, tokens(expr), ExprKind::Lit(value)),
                        None => self.node(span, tokens(expr), ExprKind::Unsupported),
                    }
                }
                _ => self.node(span, tokens(expr), ExprKind::Unsupported),
            },
            syn::Expr::Closure(c) => {
                let params: Vec<Param> = c.inputs.iter().map(param_of_pat).collect();
                let body = Box::new(self.lower(&c.body));
                let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
                let text = format!("|{}| {}", names.join(", "), body.text);
                self.node(span, text, ExprKind::Closure { params, body })
            }
            syn::Expr::Block(b) => self.lower_block(&b.block),
            syn::Expr::Return(r) => {
                let inner = r.expr.as_ref().map(|e| Box::new(self.lower(e)));
                self.node(span, tokens(expr), ExprKind::Return(inner))
            }
            syn::Expr::Field(f) => {
                let receiver = Box::new(self.lower(&f.base));
                let member = match &f.member {
                    syn::Member::Named(ident) => ident.to_string(),
                    syn::Member::Unnamed(index) => index.index.to_string(),
                };
                let text = format!("{}.{}", receiver.text, member);
                self.node(span, text, ExprKind::Field { receiver, member })
            }
            syn::Expr::MethodCall(m) => {
                let method = m.method.to_string();
                if m.args.is_empty()
                    && m.turbofish.is_none()
                    && TRANSPARENT_METHODS.contains(&method.as_str())
                {
                    return self.lower(&m.receiver);
                }
                let receiver = Box::new(self.lower(&m.receiver));
                let type_args: Vec<String> = m
                    .turbofish
                    .as_ref()
                    .map(|t| {
                        t.args
                            .iter()
                            .filter_map(|arg| match arg {
                                syn::GenericArgument::Type(ty) => {
                                    Some(type_expr(ty).base_name().to_string())
                                }
                                _ => None,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                let args: Vec<Expr> = m.args.iter().map(|a| self.lower(a)).collect();
                let turbofish = if type_args.is_empty() {
                    String::new()
                } else {
                    format!("::<{}>", type_args.join(", "))
                };
                let text = format!(
                    "{}.{}{}({})",
                    receiver.text,
                    method,
                    turbofish,
                    joined(&args)
                );
                self.node(
                    span,
                    text,
                    ExprKind::MethodCall {
                        receiver,
                        method,
                        type_args,
                        args,
                    },
                )
            }
            syn::Expr::Call(c) => {
                let func = Box::new(self.lower(&c.func));
                let args: Vec<Expr> = c.args.iter().map(|a| self.lower(a)).collect();
                let text = format!("{}({})", func.text, joined(&args));
                self.node(span, text, ExprKind::Call { func, args })
            }
            syn::Expr::Tuple(t) => {
                let items: Vec<Expr> = t.elems.iter().map(|e| self.lower(e)).collect();
                let text = format!("({})", joined(&items));
                self.node(span, text, ExprKind::Tuple(items))
            }
            syn::Expr::Struct(s) => {
                let path = path_text(&s.path);
                let fields = s
                    .fields
                    .iter()
                    .map(|fv| {
                        let name = match &fv.member {
                            syn::Member::Named(ident) => ident.to_string(),
                            syn::Member::Unnamed(index) => index.index.to_string(),
                        };
                        (name, self.lower(&fv.expr))
                    })
                    .collect();
                self.node(span, tokens(expr), ExprKind::Struct { path, fields })
            }
            syn::Expr::Cast(c) => {
                let inner = Box::new(self.lower(&c.expr));
                let ty = type_expr(&c.ty).base_name().to_string();
                self.node(span, tokens(expr), ExprKind::Cast { expr: inner, ty })
            }
            syn::Expr::Path(p) if p.qself.is_none() => {
                let segments: Vec<String> =
                    p.path.segments.iter().map(|s| s.ident.to_string()).collect();
                let text = segments.join("::");
                self.node(span, text, ExprKind::Path(segments))
            }
            syn::Expr::Lit(l) => {
                let literal = match &l.lit {
                    syn::Lit::Str(s) => Some(Literal::Str(s.value())),
                    syn::Lit::Int(i) => Some(Literal::Int(i.base10_digits().to_string())),
                    syn::Lit::Float(f) => Some(Literal::Float(f.base10_digits().to_string())),
                    syn::Lit::Bool(b) => Some(Literal::Bool(b.value)),
                    _ => None,
                };
                match literal {
                    Some(literal) => self.node(span, tokens(expr), ExprKind::Lit(literal)),
                    None => self.node(span, tokens(expr), ExprKind::Unsupported),
                }
            }
            _ => self.node(span, tokens(expr), ExprKind::Unsupported),
        }
    }

    fn lower_block(&mut self, block: &syn::Block) -> Expr {
        let span = block.span();
        let mut stmts = Vec::with_capacity(block.stmts.len());
        let mut has_tail = false;
        for stmt in &block.stmts {
            match stmt {
                syn::Stmt::Expr(e, semi) => {
                    has_tail = semi.is_none();
                    stmts.push(self.lower(e));
                }
                other => {
                    has_tail = false;
                    let text = other.to_token_stream().to_string();
                    stmts.push(self.node(other.span(), text, ExprKind::Unsupported));
                }
            }
        }
        let text = block.to_token_stream().to_string();
        self.node(span, text, ExprKind::Block { stmts, has_tail })
    }

    /// Lower a free function into a declaration selections can reference.
    pub fn lower_fn(&mut self, item: &syn::ItemFn) -> FnDecl {
        let params = item
            .sig
            .inputs
            .iter()
            .map(|input| match input {
                syn::FnArg::Typed(pt) => Param {
                    name: pat_name(&pt.pat),
                    ty: Some(type_expr(&pt.ty)),
                },
                syn::FnArg::Receiver(_) => Param {
                    name: "self".to_string(),
                    ty: None,
                },
            })
            .collect();
        let is_fragment = item.attrs.iter().any(|attr| {
            attr.path()
                .segments
                .last()
                .is_some_and(|s| s.ident == "fragment")
        });
        FnDecl {
            name: item.sig.ident.to_string(),
            params,
            body: self.lower_block(&item.block),
            is_fragment,
            location: Location::of(item.sig.ident.span()),
        }
    }
}

/// Parse and lower a selection expression from source text.
pub fn parse_expr(source: &str) -> Result<Expr, syn::Error> {
    let expr: syn::Expr = syn::parse_str(source)?;
    Ok(Lowering::default().lower(&expr))
}

/// Parse and lower a free function from source text.
pub fn parse_fn(source: &str) -> Result<FnDecl, syn::Error> {
    let item: syn::ItemFn = syn::parse_str(source)?;
    Ok(Lowering::default().lower_fn(&item))
}

pub fn type_expr(ty: &syn::Type) -> TypeExpr {
    match ty {
        syn::Type::Reference(r) => TypeExpr::Ref(Box::new(type_expr(&r.elem))),
        syn::Type::Paren(p) => type_expr(&p.elem),
        syn::Type::Group(g) => type_expr(&g.elem),
        syn::Type::Path(p) if p.qself.is_none() => match p.path.segments.last() {
            Some(segment) => {
                let args = match &segment.arguments {
                    syn::PathArguments::AngleBracketed(angle) => angle
                        .args
                        .iter()
                        .filter_map(|arg| match arg {
                            syn::GenericArgument::Type(t) => Some(type_expr(t)),
                            _ => None,
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                TypeExpr::Named {
                    name: segment.ident.to_string(),
                    args,
                }
            }
            None => TypeExpr::Other(ty.to_token_stream().to_string()),
        },
        other => TypeExpr::Other(other.to_token_stream().to_string()),
    }
}

fn param_of_pat(pat: &syn::Pat) -> Param {
    match pat {
        syn::Pat::Type(pt) => Param {
            name: pat_name(&pt.pat),
            ty: Some(type_expr(&pt.ty)),
        },
        other => Param {
            name: pat_name(other),
            ty: None,
        },
    }
}

fn pat_name(pat: &syn::Pat) -> String {
    match pat {
        syn::Pat::Ident(ident) => ident.ident.to_string(),
        syn::Pat::Reference(r) => pat_name(&r.pat),
        syn::Pat::Type(pt) => pat_name(&pt.pat),
        other => other.to_token_stream().to_string(),
    }
}

fn path_text(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|s| s.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

fn joined(items: &[Expr]) -> String {
    items
        .iter()
        .map(|item| item.text.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn tokens(expr: &syn::Expr) -> String {
    expr.to_token_stream().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowers_closure_with_field_access() {
        let expr = parse_expr("|q| q.me(|o| o.first_name)").unwrap();
        let ExprKind::Closure { params, body } = &expr.kind else {
            panic!("expected closure, got {:?}", expr.kind);
        };
        assert_eq!(params[0].name, "q");
        let ExprKind::MethodCall { receiver, method, args, .. } = &body.kind else {
            panic!("expected method call");
        };
        assert!(receiver.is_ident("q"));
        assert_eq!(method, "me");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn field_and_path_text_is_normalized() {
        let expr = parse_expr("vars.user_id").unwrap();
        assert_eq!(expr.text, "vars.user_id");
        let expr = parse_expr("Role::SuperUser").unwrap();
        assert_eq!(expr.text, "Role::SuperUser");
        assert!(matches!(expr.kind, ExprKind::Path(ref s) if s.len() == 2));
    }

    #[test]
    fn call_text_is_normalized() {
        assert_eq!(parse_expr("names( p )").unwrap().text, "names(p)");
        assert_eq!(
            parse_expr("o.friends(Some(5), |f| (f.id, f.role))").unwrap().text,
            "o.friends(Some(5), |f| (f.id, f.role))"
        );
        assert_eq!(
            parse_expr("o.on::<Circle, _>(|c| c.radius)").unwrap().text,
            "o.on::<Circle, _>(|c| c.radius)"
        );
    }

    #[test]
    fn transparent_wrappers_are_dropped() {
        let expr = parse_expr("(&o.first_name.clone())").unwrap();
        assert!(matches!(expr.kind, ExprKind::Field { ref member, .. } if member == "first_name"));
    }

    #[test]
    fn turbofish_becomes_type_args() {
        let expr = parse_expr("o.on::<Circle>(|c| c.radius)").unwrap();
        let ExprKind::MethodCall { type_args, .. } = &expr.kind else {
            panic!("expected method call");
        };
        assert_eq!(type_args, &vec!["Circle".to_string()]);
    }

    #[test]
    fn literals() {
        assert!(matches!(parse_expr("10i32").unwrap().kind, ExprKind::Lit(Literal::Int(ref v)) if v == "10"));
        assert!(matches!(parse_expr("-2.5").unwrap().kind, ExprKind::Lit(Literal::Float(ref v)) if v == "-2.5"));
        assert!(matches!(parse_expr("\"a\"").unwrap().kind, ExprKind::Lit(Literal::Str(ref v)) if v == "a"));
        assert!(matches!(parse_expr("'c'").unwrap().kind, ExprKind::Unsupported));
    }

    #[test]
    fn blocks_track_tail() {
        let expr = parse_expr("|o| { o.id }").unwrap();
        let ExprKind::Closure { body, .. } = &expr.kind else { panic!() };
        assert!(matches!(body.kind, ExprKind::Block { has_tail: true, ref stmts } if stmts.len() == 1));

        let expr = parse_expr("|o| { let x = 1; o.id }").unwrap();
        let ExprKind::Closure { body, .. } = &expr.kind else { panic!() };
        assert!(matches!(body.kind, ExprKind::Block { ref stmts, .. } if stmts.len() == 2));
    }

    #[test]
    fn lowers_fragment_fn() {
        let decl = parse_fn("#[fragment] fn person_fields(p: &Person, size: i32) -> (String, String) { (p.first_name.clone(), p.avatar(size)) }").unwrap();
        assert!(decl.is_fragment);
        assert_eq!(decl.name, "person_fields");
        assert_eq!(decl.params.len(), 2);
        assert_eq!(decl.params[0].ty.as_ref().unwrap().base_name(), "Person");
    }

    #[test]
    fn node_ids_are_unique_across_trees() {
        let a = parse_expr("o.id").unwrap();
        let b = parse_expr("o.id").unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn walk_is_preorder() {
        let expr = parse_expr("(o.a, o.b)").unwrap();
        let mut texts = Vec::new();
        expr.walk(&mut |e| texts.push(e.text.clone()));
        assert_eq!(texts[1], "o.a");
        assert_eq!(texts[2], "o");
        assert_eq!(texts[3], "o.b");
    }
}
