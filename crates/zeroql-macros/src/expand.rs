use crate::config::Resolved;
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use std::collections::HashSet;
use std::path::Path;
use syn::spanned::Spanned;
use tokio_util::sync::CancellationToken;
use zeroql_resolver::syntax::{type_expr, Expr, ExprKind, Lowering, NodeId};
use zeroql_resolver::{
    resolve, resolve_request, Diagnostic, Invocation, OperationKind, RequestArgs, SemanticModel,
    VariableValue,
};
use zeroql_schema::Surface;

const VARIABLES: &str = "__zeroql_variables";

pub fn expand(
    operation: OperationKind,
    input: TokenStream,
    manifest_dir: &Path,
) -> syn::Result<TokenStream> {
    let invocation: Invocation = syn::parse2(input)?;
    let config = Resolved::new(manifest_dir, &invocation)?;
    let surface = config.surface()?;
    let scope = config.scope()?;

    let root_type = root_type(&surface, operation, &invocation.selection)?;

    let variables_param = match invocation.selection.inputs.len() {
        1 => None,
        2 => {
            if invocation.variables.is_none() {
                return Err(syn::Error::new_spanned(
                    &invocation.selection.inputs,
                    "a selection with a variables parameter needs `variables = <expr>`",
                ));
            }
            invocation.selection.inputs.first()
        }
        _ => {
            return Err(syn::Error::new_spanned(
                &invocation.selection.inputs,
                "a selection takes the root (`|q|`) or a variables object and the root (`|vars, q|`)",
            ))
        }
    };

    let mut lowering = Lowering::with_spans();
    let selection = lowering.lower(&syn::Expr::Closure(invocation.selection.clone()));
    let spans = lowering.into_spans();

    let model = SemanticModel::bind(&surface, &scope, root_type, &selection);
    let resolved = resolve(&selection, &model, &CancellationToken::new())
        .map_err(|d| compile_error(d, &spans, invocation.selection.span()))?;

    let properties = variables_param
        .and_then(|_| variables_properties(&selection))
        .unwrap_or_default();
    let variables_ident = format_ident!("{}", VARIABLES);
    let entries = resolved
        .variables
        .iter()
        .filter(|v| matches!(v.value, VariableValue::Variable(_)))
        .map(|v| {
            let key = &v.name;
            if properties.contains(key) {
                let property = format_ident!("{}", key);
                quote!(#key: &#variables_ident.#property)
            } else {
                let local = format_ident!("{}", key, span = Span::call_site());
                quote!(#key: #local)
            }
        });

    let text = format!("{} {}", operation.keyword(), resolved.query);
    let constructor = format_ident!("{}", operation.keyword());
    let tracked = config
        .tracked()
        .map(|path| path.display().to_string())
        .map(|path| quote!(const _: &str = include_str!(#path);));

    let bind_variables = invocation
        .variables
        .as_ref()
        .map(|expr| quote!(let #variables_ident = #expr;));

    let operation_expr = quote! {
        ::zeroql::Operation::#constructor(
            #text,
            ::zeroql::serde_json::json!({ #(#entries),* }),
        )
    };

    let Some(client) = &invocation.client else {
        return Ok(quote! {{
            #(#tracked)*
            #bind_variables
            #operation_expr
        }});
    };

    let selector = selector_closure(&invocation.selection, variables_param.is_some());
    let method = constructor;
    Ok(quote! {{
        #(#tracked)*
        #bind_variables
        let __zeroql_operation = #operation_expr;
        (#client).#method(__zeroql_operation, #selector)
    }})
}

/// Expand `#[request(..)]`: keep the struct and implement `zeroql::Request`
/// for it with the compiled operation. Every named field is a variable.
pub fn expand_request(
    attr: TokenStream,
    item: TokenStream,
    manifest_dir: &Path,
) -> syn::Result<TokenStream> {
    let args: RequestArgs = syn::parse2(attr)?;
    let item: syn::ItemStruct = syn::parse2(item)?;
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "a request struct cannot be generic",
        ));
    }
    let fields: Vec<(syn::Ident, &syn::Type)> = match &item.fields {
        syn::Fields::Named(named) => named
            .named
            .iter()
            .filter_map(|f| Some((f.ident.clone()?, &f.ty)))
            .collect(),
        syn::Fields::Unit => Vec::new(),
        syn::Fields::Unnamed(_) => {
            return Err(syn::Error::new_spanned(
                &item.fields,
                "request fields become operation variables and need names",
            ))
        }
    };

    let config = Resolved::with_options(manifest_dir, args.schema.as_ref(), &args.fragments)?;
    let surface = config.surface()?;
    let scope = config.scope()?;
    let root_type = root_type(&surface, args.operation, &args.selection)?;

    let syn::ReturnType::Type(_, output) = &args.selection.output else {
        return Err(syn::Error::new_spanned(
            &args.selection,
            "a request selection declares what it returns: `|req, q| -> T { .. }`",
        ));
    };
    let mut inputs = args.selection.inputs.iter();
    let (Some(request_pat), Some(root_pat)) = (inputs.next(), inputs.next()) else {
        return Err(syn::Error::new_spanned(
            &args.selection.inputs,
            "a request selection takes the request and the root: `|req, q| ...`",
        ));
    };
    let root_ty = match root_pat {
        syn::Pat::Type(typed) => match typed.ty.as_ref() {
            syn::Type::Reference(r) => r.elem.as_ref().clone(),
            other => other.clone(),
        },
        _ => {
            let ident = format_ident!("{}", root_type);
            syn::parse_quote!(#ident)
        }
    };

    let mut lowering = Lowering::with_spans();
    let selection = lowering.lower(&syn::Expr::Closure(args.selection.clone()));
    let spans = lowering.into_spans();
    let declared: Vec<_> = fields
        .iter()
        .map(|(name, ty)| (name.to_string(), type_expr(ty)))
        .collect();

    let model = SemanticModel::bind(&surface, &scope, root_type, &selection);
    let resolved = resolve_request(&selection, &declared, &model, &CancellationToken::new())
        .map_err(|d| compile_error(d, &spans, args.selection.span()))?;

    let text = format!("{} {}", args.operation.keyword(), resolved.query);
    let tracked = config
        .tracked()
        .map(|path| path.display().to_string())
        .map(|path| quote!(const _: &str = include_str!(#path);));
    let entries = fields.iter().map(|(name, _)| {
        let key = name.to_string();
        quote!(#key: &self.#name)
    });
    let name = &item.ident;
    let body = &args.selection.body;

    Ok(quote! {
        #item

        impl ::zeroql::Request for #name {
            type Root = #root_ty;
            type Output = #output;

            const OPERATION: &'static str = #text;

            fn variables(&self) -> ::zeroql::serde_json::Value {
                #(#tracked)*
                ::zeroql::serde_json::json!({ #(#entries),* })
            }

            fn select(&self, __zeroql_root: &Self::Root) -> Self::Output {
                let #request_pat = self;
                let #root_pat = __zeroql_root;
                #body
            }
        }
    })
}

fn root_type<'s>(
    surface: &'s Surface,
    operation: OperationKind,
    selection: &syn::ExprClosure,
) -> syn::Result<&'s str> {
    match operation {
        OperationKind::Query => surface.query_type(),
        OperationKind::Mutation => surface.mutation_type(),
    }
    .ok_or_else(|| {
        syn::Error::new_spanned(
            selection,
            format!("the schema declares no {} root type", operation.keyword()),
        )
    })
}

/// A diagnostic as a compile error at the span of its node.
fn compile_error(diagnostic: Diagnostic, spans: &[(NodeId, Span)], fallback: Span) -> syn::Error {
    let span = diagnostic
        .node
        .and_then(|id| spans.iter().find(|(node, _)| *node == id))
        .map(|(_, span)| *span)
        .unwrap_or(fallback);
    syn::Error::new(
        span,
        format!("[{}] {}", diagnostic.kind.code(), diagnostic.message),
    )
}

/// Member names read from the variables parameter in the selection body.
fn variables_properties(selection: &Expr) -> Option<HashSet<String>> {
    let ExprKind::Closure { params, body } = &selection.kind else {
        return None;
    };
    let name = &params.first()?.name;
    let mut found = HashSet::new();
    body.walk(&mut |node| {
        if let ExprKind::Field { receiver, member } = &node.kind {
            if receiver.is_ident(name) {
                found.insert(member.clone());
            }
        }
    });
    Some(found)
}

/// The closure handed to the client. A two-parameter selection becomes a
/// closure over the root that binds the variables object first.
fn selector_closure(selection: &syn::ExprClosure, has_variables: bool) -> TokenStream {
    if !has_variables {
        return quote!(#selection);
    }
    let mut inputs = selection.inputs.iter();
    let (Some(variables), Some(root)) = (inputs.next(), inputs.next()) else {
        return quote!(#selection);
    };
    let variables_ident = format_ident!("{}", VARIABLES);
    let body = &selection.body;
    quote! {
        move |#root| {
            let #variables = #variables_ident;
            #body
        }
    }
}
