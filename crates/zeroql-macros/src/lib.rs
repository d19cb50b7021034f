//! Macros that compile typed selections into GraphQL at build time.
//!
//! ```ignore
//! let me = zeroql::query!(client, |q| q.me(|o| (o.id, o.first_name.clone()))).await?;
//! ```
//!
//! The selection closure is translated while the crate compiles; the
//! expansion carries the finished query text and a JSON object with the
//! values of the locals it references. Without a client the macro evaluates
//! to a `zeroql::Operation`.

mod config;
mod expand;

use proc_macro::TokenStream;
use std::path::PathBuf;
use zeroql_resolver::OperationKind;

/// Compile a query selection.
///
/// `query!([client,] [schema = "..",] [fragments = "..",] [variables = expr,] |q| ..)`
#[proc_macro]
pub fn query(input: TokenStream) -> TokenStream {
    run(OperationKind::Query, input)
}

/// Compile a mutation selection. Takes the same options as [`query!`].
#[proc_macro]
pub fn mutation(input: TokenStream) -> TokenStream {
    run(OperationKind::Mutation, input)
}

fn run(operation: OperationKind, input: TokenStream) -> TokenStream {
    expand::expand(operation, input.into(), &manifest_dir())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn manifest_dir() -> PathBuf {
    std::env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_default()
}

/// Turn a struct into a request: its named fields are the operation
/// variables, in declaration order, and the selection closure compiled here
/// runs against the response.
///
/// ```ignore
/// #[zeroql::request(|req, q| -> Option<String> { q.user(req.id, |u| u.first_name.clone()) })]
/// pub struct GetUserName {
///     pub id: i32,
/// }
///
/// let name = client.request(&GetUserName { id: 42 }).await?.into_data()?;
/// ```
///
/// `#[request(mutation, schema = "..", fragments = "..", |req, m| -> T { .. })]`
#[proc_macro_attribute]
pub fn request(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand::expand_request(attr.into(), item.into(), &manifest_dir())
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Mark a function as a fragment: a reusable selection over its first
/// parameter that `query!` inlines wherever the function is called.
///
/// ```ignore
/// #[fragment]
/// fn person_fields(p: &Person) -> (String, String) {
///     (p.first_name.clone(), p.last_name.clone())
/// }
/// ```
#[proc_macro_attribute]
pub fn fragment(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[fragment] takes no arguments",
        )
        .to_compile_error()
        .into();
    }
    let parsed = item.clone();
    let function = syn::parse_macro_input!(parsed as syn::ItemFn);
    if function.sig.inputs.is_empty() {
        return syn::Error::new_spanned(
            &function.sig,
            "a fragment takes the selection root as its first parameter",
        )
        .to_compile_error()
        .into();
    }
    item
}
