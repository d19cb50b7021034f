//! Rust source emitter for the typed selector surface.
//!
//! Every schema type becomes one Rust item. Plain scalar and enum fields are
//! public data fields; object-valued fields and fields with arguments become
//! selector methods over a private backing field. The selector methods only
//! exist so that selection closures type-check: at run time they project the
//! already deserialized response, and their argument parameters are ignored.

use proc_macro2::{Ident, Span, TokenStream};
use quote::{format_ident, quote};
use std::collections::HashSet;
use zeroql_schema::parser::{
    ClassDefinition, EnumDef, FieldDefinition, Schema, TypeDefinition, UnionDef, BUILTIN_SCALARS,
};
use zeroql_schema::surface::variant_name;

/// Knobs for [`generate`].
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Name of the generated client alias.
    pub client_name: String,
    /// Where the schema came from, recorded in the file header.
    pub source: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            client_name: "GraphQLClient".to_string(),
            source: None,
        }
    }
}

/// Generate the selector surface for `schema` as formatted Rust source.
pub fn generate(schema: &Schema, options: &GenerateOptions) -> syn::Result<String> {
    let emitter = Emitter::new(schema);
    let tokens = emitter.file(options);
    let file = syn::parse2::<syn::File>(tokens)?;

    let header = match &options.source {
        Some(source) => format!("// Generated by zeroql-codegen from {}. Do not edit.\n", source),
        None => "// Generated by zeroql-codegen. Do not edit.\n".to_string(),
    };
    Ok(format!("{}\n{}", header, prettyplease::unparse(&file)))
}

struct Emitter<'a> {
    schema: &'a Schema,
    custom_scalars: HashSet<&'a str>,
}

impl<'a> Emitter<'a> {
    fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            custom_scalars: schema.scalars.iter().map(|s| s.name.as_str()).collect(),
        }
    }

    fn file(&self, options: &GenerateOptions) -> TokenStream {
        let scalars = self
            .schema
            .scalars
            .iter()
            .filter(|s| !BUILTIN_SCALARS.contains(&s.name.as_str()))
            .map(|s| {
                let doc = doc_comment_tokens(&s.description);
                let name = ident(&s.name);
                quote! {
                    #doc
                    pub type #name = ::zeroql::serde_json::Value;
                }
            });
        let enums = self.schema.enums.iter().map(|e| self.enum_item(e));
        let inputs = self.schema.inputs.iter().map(|i| self.input_item(i));
        let objects = self
            .schema
            .objects
            .iter()
            .map(|o| self.object_item(o, &ident(&o.name), &o.name));
        let interfaces = self.schema.interfaces.iter().map(|i| {
            let fields = format_ident!("{}Fields", i.name);
            let item = self.object_item(i, &fields, &i.name);
            let alias = polymorphic_alias(&i.name, &i.description);
            quote! { #item #alias }
        });
        let unions = self.schema.unions.iter().map(|u| self.union_item(u));
        let client = self.client_alias(options);

        quote! {
            #![allow(dead_code, unused_variables, clippy::all)]

            #(#scalars)*
            #(#enums)*
            #(#inputs)*
            #(#objects)*
            #(#interfaces)*
            #(#unions)*
            #client
        }
    }

    fn enum_item(&self, e: &EnumDef) -> TokenStream {
        let doc = doc_comment_tokens(&e.description);
        let name = ident(&e.name);
        let variants = e.values.iter().enumerate().map(|(i, value)| {
            let doc = doc_comment_tokens(&value.description);
            let variant = ident(&variant_name(&value.name));
            let wire = &value.name;
            let default = (i == 0).then(|| quote!(#[default]));
            quote! {
                #doc
                #default
                #[serde(rename = #wire)]
                #variant
            }
        });
        quote! {
            #doc
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ::zeroql::serde::Serialize, ::zeroql::serde::Deserialize)]
            #[serde(crate = "::zeroql::serde")]
            pub enum #name {
                #(#variants,)*
            }
        }
    }

    fn input_item(&self, input: &ClassDefinition) -> TokenStream {
        let doc = doc_comment_tokens(&input.description);
        let name = ident(&input.name);
        let fields = input.fields.iter().map(|field| {
            let doc = doc_comment_tokens(&field.description);
            let member = ident(&field.name);
            let wire = &field.wire_name;
            let ty = self.value_type(&field.ty, true);
            let skip = field
                .ty
                .can_be_null()
                .then(|| quote!(skip_serializing_if = "Option::is_none",));
            quote! {
                #doc
                #[serde(rename = #wire, #skip default)]
                pub #member: #ty
            }
        });
        quote! {
            #doc
            #[derive(Debug, Clone, Default, PartialEq, ::zeroql::serde::Serialize, ::zeroql::serde::Deserialize)]
            #[serde(crate = "::zeroql::serde")]
            pub struct #name {
                #(#fields,)*
            }
        }
    }

    /// An object struct. `type_name` is the schema name reported through
    /// `GraphQLType`, which differs from `name` for interface field structs.
    fn object_item(&self, class: &ClassDefinition, name: &Ident, type_name: &str) -> TokenStream {
        let doc = doc_comment_tokens(&class.description);
        let mut fields = Vec::new();
        let mut methods = Vec::new();

        for field in &class.fields {
            let wire = &field.wire_name;
            if field.requires_selector() {
                let backing = backing_ident(&field.name);
                let ty = self.value_type(&field.ty, true);
                fields.push(quote! {
                    #[serde(rename = #wire, default)]
                    #backing: #ty
                });
                methods.push(self.selector_method(field));
            } else {
                let field_doc = doc_comment_tokens(&field.description);
                let member = ident(&field.name);
                let ty = self.value_type(&field.ty, true);
                fields.push(quote! {
                    #field_doc
                    #[serde(rename = #wire, default)]
                    pub #member: #ty
                });
            }
        }

        let methods = (!methods.is_empty()).then(|| {
            quote! {
                impl #name {
                    #(#methods)*
                }
            }
        });

        quote! {
            #doc
            #[derive(Debug, Clone, Default, ::zeroql::serde::Deserialize)]
            #[serde(crate = "::zeroql::serde")]
            pub struct #name {
                #(#fields,)*
            }

            impl ::zeroql::GraphQLType for #name {
                const TYPE_NAME: &'static str = #type_name;
            }

            #methods
        }
    }

    fn union_item(&self, union: &UnionDef) -> TokenStream {
        let fields = format_ident!("{}Fields", union.name);
        let type_name = &union.name;
        let alias = polymorphic_alias(&union.name, &union.description);
        quote! {
            #[derive(Debug, Clone, Default, ::zeroql::serde::Deserialize)]
            #[serde(crate = "::zeroql::serde")]
            pub struct #fields {}

            impl ::zeroql::GraphQLType for #fields {
                const TYPE_NAME: &'static str = #type_name;
            }

            #alias
        }
    }

    fn selector_method(&self, field: &FieldDefinition) -> TokenStream {
        let doc = doc_comment_tokens(&field.description);
        let name = ident(&field.name);
        let backing = backing_ident(&field.name);

        let params: Vec<TokenStream> = field
            .arguments
            .iter()
            .map(|arg| {
                let arg_name = ident(&zeroql_schema::parser::surface_name(&arg.name));
                let ty = self.argument_type(&arg.ty);
                quote!(#arg_name: #ty)
            })
            .collect();

        if !field.ty.requires_selector() {
            let ty = self.value_type(&field.ty, true);
            return quote! {
                #doc
                pub fn #name(&self, #(#params),*) -> #ty {
                    self.#backing.clone()
                }
            };
        }

        let target = ident(field.ty.name());
        let result = result_type(&field.ty);
        let body = project(&field.ty, &quote!(value), true, 0);
        let selector = if contains_list(&field.ty) {
            quote!(impl Fn(&#target) -> T)
        } else {
            quote!(impl FnOnce(&#target) -> T)
        };
        quote! {
            #doc
            pub fn #name<T>(&self, #(#params,)* selector: #selector) -> #result {
                let value = &self.#backing;
                #body
            }
        }
    }

    /// Rust type holding a value of `ty` as deserialized from a response.
    /// Objects directly inside a struct are boxed so recursive types have a
    /// finite size.
    fn value_type(&self, ty: &TypeDefinition, boxed: bool) -> TokenStream {
        let inner = match ty {
            TypeDefinition::Scalar { name, .. } => self.scalar_type(name),
            TypeDefinition::Enum { name, .. } => {
                let name = ident(name);
                quote!(#name)
            }
            TypeDefinition::Object { name, .. } | TypeDefinition::Input { name, .. } => {
                let name = ident(name);
                if boxed {
                    quote!(Box<#name>)
                } else {
                    quote!(#name)
                }
            }
            TypeDefinition::List { element, .. } => {
                let element = self.value_type(element, false);
                quote!(Vec<#element>)
            }
        };
        if ty.can_be_null() {
            quote!(Option<#inner>)
        } else {
            inner
        }
    }

    /// Rust parameter type for a field argument.
    fn argument_type(&self, ty: &TypeDefinition) -> TokenStream {
        let inner = match ty {
            TypeDefinition::Scalar { name, .. } => match name.as_str() {
                "Int" => quote!(i32),
                "Float" => quote!(f64),
                "Boolean" => quote!(bool),
                "String" | "ID" => quote!(&str),
                other => {
                    let ty = self.scalar_type(other);
                    quote!(&#ty)
                }
            },
            TypeDefinition::Enum { name, .. } => {
                let name = ident(name);
                quote!(#name)
            }
            TypeDefinition::Object { name, .. } | TypeDefinition::Input { name, .. } => {
                let name = ident(name);
                quote!(&#name)
            }
            TypeDefinition::List { element, .. } => {
                let element = self.argument_type(element);
                quote!(&[#element])
            }
        };
        if ty.can_be_null() {
            quote!(Option<#inner>)
        } else {
            inner
        }
    }

    fn scalar_type(&self, name: &str) -> TokenStream {
        match name {
            "Int" => quote!(i32),
            "Float" => quote!(f64),
            "Boolean" => quote!(bool),
            "String" | "ID" => quote!(String),
            custom if self.custom_scalars.contains(custom) => {
                let name = ident(custom);
                quote!(#name)
            }
            _ => quote!(::zeroql::serde_json::Value),
        }
    }

    fn client_alias(&self, options: &GenerateOptions) -> TokenStream {
        let name = ident(&options.client_name);
        let root = |name: &Option<String>| match name {
            Some(name) => {
                let name = ident(name);
                quote!(#name)
            }
            None => quote!(::zeroql::Unit),
        };
        let query = root(&self.schema.query_type);
        let mutation = root(&self.schema.mutation_type);
        quote! {
            /// Client for this schema.
            pub type #name<T = ::zeroql::HttpTransport> = ::zeroql::Client<#query, #mutation, T>;
        }
    }
}

fn polymorphic_alias(name: &str, description: &Option<String>) -> TokenStream {
    let doc = doc_comment_tokens(description);
    let alias = ident(name);
    let fields = format_ident!("{}Fields", name);
    quote! {
        #doc
        pub type #alias = ::zeroql::Polymorphic<#fields>;
    }
}

/// What a selector method returns for a field of type `ty`.
fn result_type(ty: &TypeDefinition) -> TokenStream {
    let inner = match ty {
        TypeDefinition::List { element, .. } => {
            let element = result_type(element);
            quote!(Vec<#element>)
        }
        _ => quote!(T),
    };
    if ty.can_be_null() {
        quote!(Option<#inner>)
    } else {
        inner
    }
}

/// Expression applying `selector` to `place`, a reference to the backing
/// value of type `ty`. Nullable levels are guarded and lists mapped.
fn project(ty: &TypeDefinition, place: &TokenStream, boxed: bool, depth: usize) -> TokenStream {
    let selector = if depth == 0 {
        quote!(selector)
    } else {
        quote!(&selector)
    };
    match ty {
        TypeDefinition::List { element, can_be_null } => {
            let list = format_ident!("l{}", depth);
            let item = format_ident!("v{}", depth);
            let mapped = match element.as_ref() {
                TypeDefinition::Object {
                    can_be_null: false, ..
                } => quote!(#list.iter().map(&selector).collect::<Vec<_>>()),
                element => {
                    let inner = project(element, &quote!(#item), false, depth + 1);
                    quote!(#list.iter().map(|#item| #inner).collect::<Vec<_>>())
                }
            };
            if *can_be_null {
                quote!(#place.as_ref().map(|#list| #mapped))
            } else {
                quote!({ let #list = #place; #mapped })
            }
        }
        TypeDefinition::Object { can_be_null: true, .. } if boxed => {
            quote!(#place.as_deref().map(#selector))
        }
        TypeDefinition::Object { can_be_null: true, .. } => {
            quote!(#place.as_ref().map(#selector))
        }
        _ if boxed => quote!(selector(&**#place)),
        _ => quote!(selector(#place)),
    }
}

fn contains_list(ty: &TypeDefinition) -> bool {
    matches!(ty, TypeDefinition::List { .. })
}

/// Identifier for a possibly `r#`-prefixed name.
fn ident(name: &str) -> Ident {
    match name.strip_prefix("r#") {
        Some(raw) => Ident::new_raw(raw, Span::call_site()),
        None => Ident::new(name, Span::call_site()),
    }
}

fn backing_ident(name: &str) -> Ident {
    format_ident!("__{}", name.trim_start_matches("r#"))
}

/// `#[doc]` attributes for a schema description, one per line.
fn doc_comment_tokens(description: &Option<String>) -> TokenStream {
    let Some(description) = description else {
        return TokenStream::new();
    };
    let lines = sanitize_doc(description)
        .lines()
        .map(|line| format!(" {}", line))
        .collect::<Vec<_>>();
    quote! { #(#[doc = #lines])* }
}

/// Keep rustdoc quiet about schema prose: `[TAG]` would be read as an
/// intra-doc link and bare URLs are linted.
fn sanitize_doc(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(close) = rest.find(']') {
                let inner = &rest[1..close];
                let is_link = rest[close + 1..].starts_with('(');
                if !inner.is_empty() && !is_link && !inner.contains('[') {
                    out.push('`');
                    out.push_str(inner);
                    out.push('`');
                    rest = &rest[close + 1..];
                    continue;
                }
            }
        } else if rest.starts_with("https://") || rest.starts_with("http://") {
            let end = rest
                .find(|c: char| c.is_whitespace() || matches!(c, ')' | ',' | '>' | '\''))
                .unwrap_or(rest.len());
            if out.ends_with('<') {
                out.push_str(&rest[..end]);
            } else {
                out.push('<');
                out.push_str(&rest[..end]);
                out.push('>');
            }
            rest = &rest[end..];
            continue;
        }
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const SCHEMA: &str = indoc! {r#"
        schema { query: Query mutation: Mutation }

        "An instant, as an ISO string."
        scalar DateTime

        enum Role { ADMIN SUPER_USER }

        input UserFilter { role: Role name: String! parent: UserFilter }

        interface Figure { perimeter: Float! }
        type Circle implements Figure { radius: Float! perimeter: Float! }
        union Shape = Circle

        type Person {
            id: ID!
            firstName: String!
            tags: [String!]
            createdAt: DateTime
            avatar(size: Int!): String
            labels(first: Int): [String]
            manager: Person
            friends(first: Int, filter: UserFilter): [Person]!
            "Nested lists. See [DEPRECATED] and https://example.com/docs"
            grid: [[Person!]]
        }

        type Query { me: Person! user(id: ID!): Person shape: Shape figures: [Figure!]! }
        type Mutation { touch(ids: [ID!]!, role: Role): Person! }
    "#};

    fn generated() -> syn::File {
        let schema = zeroql_schema::parse(SCHEMA).unwrap();
        let source = generate(&schema, &GenerateOptions::default()).unwrap();
        syn::parse_file(&source).unwrap()
    }

    fn find_struct<'f>(file: &'f syn::File, name: &str) -> &'f syn::ItemStruct {
        file.items
            .iter()
            .find_map(|item| match item {
                syn::Item::Struct(s) if s.ident == name => Some(s),
                _ => None,
            })
            .unwrap_or_else(|| panic!("no struct {name}"))
    }

    fn methods<'f>(file: &'f syn::File, name: &str) -> Vec<&'f syn::ImplItemFn> {
        file.items
            .iter()
            .filter_map(|item| match item {
                syn::Item::Impl(i) if i.trait_.is_none() => Some(i),
                _ => None,
            })
            .filter(|i| {
                let ty = &i.self_ty;
                quote!(#ty).to_string() == name
            })
            .flat_map(|i| {
                i.items.iter().filter_map(|item| match item {
                    syn::ImplItem::Fn(f) => Some(f),
                    _ => None,
                })
            })
            .collect()
    }

    fn method<'f>(file: &'f syn::File, ty: &str, name: &str) -> String {
        let f = methods(file, ty)
            .into_iter()
            .find(|f| f.sig.ident == name)
            .unwrap_or_else(|| panic!("no method {ty}::{name}"));
        quote!(#f).to_string()
    }

    #[test]
    fn one_member_per_schema_field() {
        let file = generated();
        let person = find_struct(&file, "Person");
        let public = person
            .fields
            .iter()
            .filter(|f| matches!(f.vis, syn::Visibility::Public(_)))
            .count();
        let selectors = methods(&file, "Person").len();
        assert_eq!(public + selectors, 9);
        assert_eq!(person.fields.len(), 9);
    }

    #[test]
    fn scalar_fields_are_plain_data() {
        let file = generated();
        let person = find_struct(&file, "Person");
        let field = person
            .fields
            .iter()
            .find(|f| f.ident.as_ref().is_some_and(|i| i == "tags"))
            .unwrap();
        let ty = &field.ty;
        assert_eq!(quote!(#ty).to_string(), "Option < Vec < String > >");
        let created = person
            .fields
            .iter()
            .find(|f| f.ident.as_ref().is_some_and(|i| i == "created_at"))
            .unwrap();
        let ty = &created.ty;
        assert_eq!(quote!(#ty).to_string(), "Option < DateTime >");
    }

    #[test]
    fn nullable_object_is_guarded() {
        let file = generated();
        let manager = method(&file, "Person", "manager");
        assert!(manager.contains("FnOnce (& Person) -> T"), "{manager}");
        assert!(manager.contains("-> Option < T >"), "{manager}");
        assert!(manager.contains("as_deref () . map (selector)"), "{manager}");

        let me = method(&file, "Query", "me");
        assert!(me.contains("selector (& * * value)"), "{me}");
    }

    #[test]
    fn lists_map_their_elements() {
        let file = generated();
        let friends = method(&file, "Person", "friends");
        assert!(friends.contains("impl Fn (& Person) -> T"), "{friends}");
        assert!(friends.contains("-> Vec < Option < T > >"), "{friends}");
        assert!(friends.contains("first : Option < i32 >"), "{friends}");
        assert!(friends.contains("filter : Option < & UserFilter >"), "{friends}");

        let grid = method(&file, "Person", "grid");
        assert!(grid.contains("-> Option < Vec < Option < Vec < T > > > >"), "{grid}");
    }

    #[test]
    fn scalar_selectors_return_backing_value() {
        let file = generated();
        let avatar = method(&file, "Person", "avatar");
        assert!(avatar.contains("size : i32"), "{avatar}");
        assert!(avatar.contains("-> Option < String >"), "{avatar}");
        assert!(avatar.contains("self . __avatar . clone ()"), "{avatar}");
    }

    #[test]
    fn scalar_list_selector_is_returned_untransformed() {
        let file = generated();
        let labels = method(&file, "Person", "labels");
        assert!(labels.contains("first : Option < i32 >"), "{labels}");
        assert!(labels.contains("-> Option < Vec < Option < String > > >"), "{labels}");
        assert!(labels.contains("self . __labels . clone ()"), "{labels}");
        assert!(!labels.contains("map"), "{labels}");
        assert!(!labels.contains("selector"), "{labels}");
    }

    #[test]
    fn argument_types() {
        let file = generated();
        let touch = method(&file, "Mutation", "touch");
        assert!(touch.contains("ids : & [& str]"), "{touch}");
        assert!(touch.contains("role : Option < Role >"), "{touch}");
    }

    #[test]
    fn polymorphic_types_alias_the_runtime_wrapper() {
        let schema = zeroql_schema::parse(SCHEMA).unwrap();
        let source = generate(&schema, &GenerateOptions::default()).unwrap();
        assert!(source.contains("pub type Shape = ::zeroql::Polymorphic<ShapeFields>;"));
        assert!(source.contains("pub type Figure = ::zeroql::Polymorphic<FigureFields>;"));
        assert!(source.contains("pub struct FigureFields"));
        assert!(source.contains("const TYPE_NAME: &'static str = \"Figure\";"));
    }

    #[test]
    fn enums_and_inputs() {
        let schema = zeroql_schema::parse(SCHEMA).unwrap();
        let source = generate(&schema, &GenerateOptions::default()).unwrap();
        assert!(source.contains("#[serde(rename = \"SUPER_USER\")]"));
        assert!(source.contains("SuperUser,"));
        assert!(source.contains("pub parent: Option<Box<UserFilter>>"));
        assert!(source.contains("skip_serializing_if = \"Option::is_none\""));
    }

    #[test]
    fn client_alias_uses_roots() {
        let schema = zeroql_schema::parse(SCHEMA).unwrap();
        let options = GenerateOptions {
            client_name: "Api".to_string(),
            source: Some("schema.graphql".to_string()),
        };
        let source = generate(&schema, &options).unwrap();
        assert!(source.starts_with("// Generated by zeroql-codegen from schema.graphql."));
        assert!(compact(&source).contains(
            "pubtypeApi<T=::zeroql::HttpTransport>=::zeroql::Client<Query,Mutation,T>;"
        ));

        let schema = zeroql_schema::parse("schema { query: Query } type Query { a: Int }").unwrap();
        let source = generate(&schema, &GenerateOptions::default()).unwrap();
        assert!(compact(&source).contains("::zeroql::Client<Query,::zeroql::Unit,T>"));
    }

    /// Source text with all whitespace removed, independent of line wrapping.
    fn compact(source: &str) -> String {
        source.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn doc_sanitizing() {
        assert_eq!(sanitize_doc("See [DEPRECATED] now"), "See `DEPRECATED` now");
        assert_eq!(sanitize_doc("[a](https://x.io)"), "[a](<https://x.io>)");
        assert_eq!(sanitize_doc("at https://x.io."), "at <https://x.io.>");
        assert_eq!(sanitize_doc("<https://x.io>"), "<https://x.io>");
    }
}
