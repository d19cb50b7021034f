//! Input of the `query!` and `mutation!` macros.
//!
//! ```text
//! query!(client, schema = "schema.graphql", fragments = "src/fragments.rs", |q| ...)
//! query!(client, variables = vars, |vars, q| ...)
//! ```
//!
//! Every part but the selection closure is optional. Parsing lives here so
//! the proc macros and source discovery agree on the grammar.
//!
//! Request structs carry their selection in the attribute instead:
//!
//! ```text
//! #[zeroql::request(|req, q| q.user(req.id, |u| u.first_name.clone()))]
//! #[zeroql::request(mutation, schema = "schema.graphql", |req, m| ...)]
//! ```

use syn::parse::{Parse, ParseStream};
use syn::{Ident, LitStr, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
}

impl OperationKind {
    pub fn from_macro(name: &str) -> Option<Self> {
        match name {
            "query" => Some(OperationKind::Query),
            "mutation" => Some(OperationKind::Mutation),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
        }
    }
}

pub struct Invocation {
    pub client: Option<syn::Expr>,
    pub schema: Option<LitStr>,
    pub fragments: Vec<LitStr>,
    /// Value for the first parameter of a two-parameter selection.
    pub variables: Option<syn::Expr>,
    pub selection: syn::ExprClosure,
}

impl Parse for Invocation {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut client = None;
        let mut schema = None;
        let mut fragments = Vec::new();
        let mut variables = None;

        loop {
            if input.peek(Token![|]) || input.peek(Token![move]) {
                let selection: syn::ExprClosure = input.parse()?;
                let _: Option<Token![,]> = input.parse()?;
                if !input.is_empty() {
                    return Err(input.error("the selection closure must come last"));
                }
                return Ok(Invocation {
                    client,
                    schema,
                    fragments,
                    variables,
                    selection,
                });
            }

            if input.peek(Ident) && input.peek2(Token![=]) && !input.peek2(Token![==]) {
                let key: Ident = input.parse()?;
                let _: Token![=] = input.parse()?;
                match key.to_string().as_str() {
                    "schema" => schema = Some(input.parse()?),
                    "fragments" => fragments.push(input.parse()?),
                    "variables" => variables = Some(input.parse()?),
                    other => {
                        return Err(syn::Error::new(
                            key.span(),
                            format!(
                                "unknown option `{other}`, expected `schema`, `fragments` or `variables`"
                            ),
                        ))
                    }
                }
            } else if client.is_none() && !input.is_empty() {
                client = Some(input.parse()?);
            } else {
                return Err(input.error("expected a selection closure such as `|q| q.me(|o| o.id)`"));
            }
            let _: Token![,] = input.parse()?;
        }
    }
}

/// Arguments of the `request` attribute.
pub struct RequestArgs {
    pub operation: OperationKind,
    pub schema: Option<LitStr>,
    pub fragments: Vec<LitStr>,
    pub selection: syn::ExprClosure,
}

impl Parse for RequestArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut operation = OperationKind::Query;
        if input.peek(Ident) && !input.peek2(Token![=]) {
            let kind: Ident = input.parse()?;
            operation = OperationKind::from_macro(&kind.to_string()).ok_or_else(|| {
                syn::Error::new(kind.span(), "expected `query` or `mutation`")
            })?;
            let _: Token![,] = input.parse()?;
        }

        let mut schema = None;
        let mut fragments = Vec::new();
        while input.peek(Ident) && input.peek2(Token![=]) {
            let key: Ident = input.parse()?;
            let _: Token![=] = input.parse()?;
            match key.to_string().as_str() {
                "schema" => schema = Some(input.parse()?),
                "fragments" => fragments.push(input.parse()?),
                other => {
                    return Err(syn::Error::new(
                        key.span(),
                        format!("unknown option `{other}`, expected `schema` or `fragments`"),
                    ))
                }
            }
            let _: Token![,] = input.parse()?;
        }

        if !(input.peek(Token![|]) || input.peek(Token![move])) {
            return Err(input.error("expected a selection closure such as `|req, q| ...`"));
        }
        let selection: syn::ExprClosure = input.parse()?;
        if selection.inputs.len() != 2 {
            return Err(syn::Error::new_spanned(
                &selection.inputs,
                "a request selection takes the request and the root: `|req, q| ...`",
            ));
        }
        let _: Option<Token![,]> = input.parse()?;
        if !input.is_empty() {
            return Err(input.error("the selection closure must come last"));
        }
        Ok(RequestArgs {
            operation,
            schema,
            fragments,
            selection,
        })
    }
}
