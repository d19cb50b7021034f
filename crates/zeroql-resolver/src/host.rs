//! Symbol binding for Rust selections.
//!
//! [`SemanticModel`] answers the resolver's symbol questions for one
//! selection. It is built by walking the lowered tree once, tracking which
//! closure parameter stands for which surface type, and recording what each
//! node refers to.

use crate::symbols::{
    FunctionSymbol, MethodSymbol, ParameterSymbol, Symbol, SymbolResolver, Tag, TypeInfo,
};
use crate::syntax::{Expr, ExprKind, FnDecl, NodeId, TypeExpr};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use zeroql_schema::surface::{Member, Surface, NARROWING_METHOD};

/// A fragment compiled ahead of time, usable from other units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FragmentTemplate {
    pub name: String,
    pub root_type: String,
    /// Parameters after the root, with the GraphQL types their arguments
    /// take when they become variables.
    #[serde(serialize_with = "serialize_parameters")]
    pub parameters: Vec<ParameterSymbol>,
    pub template: String,
}

fn serialize_parameters<S: serde::Serializer>(
    parameters: &[ParameterSymbol],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(parameters.len()))?;
    for p in parameters {
        map.serialize_entry(&p.name, &p.graphql_type)?;
    }
    map.end()
}

/// Everything a selection may reference besides the surface: functions of
/// its own unit, templates of fragments from other units, and struct
/// declarations used as variables objects.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    functions: IndexMap<String, Arc<FnDecl>>,
    templates: IndexMap<String, Arc<FragmentTemplate>>,
    structs: IndexMap<String, Vec<(String, TypeExpr)>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, decl: Arc<FnDecl>) {
        self.functions.insert(decl.name.clone(), decl);
    }

    /// Templates never shadow a function of the same name.
    pub fn add_template(&mut self, template: Arc<FragmentTemplate>) {
        if !self.functions.contains_key(&template.name) {
            self.templates.insert(template.name.clone(), template);
        }
    }

    pub fn add_struct(&mut self, name: impl Into<String>, fields: Vec<(String, TypeExpr)>) {
        self.structs.insert(name.into(), fields);
    }

    pub fn function(&self, name: &str) -> Option<&Arc<FnDecl>> {
        self.functions.get(name)
    }

    pub fn template(&self, name: &str) -> Option<&Arc<FragmentTemplate>> {
        self.templates.get(name)
    }

    fn struct_field(&self, name: &str, field: &str) -> Option<&TypeExpr> {
        self.structs
            .get(name)?
            .iter()
            .find_map(|(f, ty)| (f == field).then_some(ty))
    }
}

/// GraphQL type of a Rust type as written: `i32` is `Int!`,
/// `Option<String>` is `String`, `Vec<Role>` is `[Role!]!`.
pub fn graphql_type(ty: &TypeExpr) -> String {
    match ty {
        TypeExpr::Ref(inner) => graphql_type(inner),
        TypeExpr::Named { name, args } if args.len() == 1 => match name.as_str() {
            "Option" => {
                let inner = graphql_type(&args[0]);
                inner.strip_suffix('!').unwrap_or(&inner).to_string()
            }
            "Vec" => format!("[{}]!", graphql_type(&args[0])),
            "Box" | "Arc" | "Rc" => graphql_type(&args[0]),
            _ => format!("{name}!"),
        },
        TypeExpr::Named { name, .. } => format!("{}!", scalar_name(name)),
        TypeExpr::Other(text) => format!("{text}!"),
    }
}

fn scalar_name(rust: &str) -> &str {
    match rust {
        "i8" | "i16" | "i32" | "i64" | "u8" | "u16" | "u32" | "u64" | "isize" | "usize" => "Int",
        "f32" | "f64" => "Float",
        "bool" => "Boolean",
        "String" | "str" | "char" => "String",
        other => other,
    }
}

fn is_screaming(name: &str) -> bool {
    name.len() > 1
        && name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn starts_upper(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// Symbols and types of the nodes of one selection.
#[derive(Debug, Default)]
pub struct SemanticModel {
    symbols: HashMap<NodeId, Symbol>,
    types: HashMap<NodeId, TypeInfo>,
}

impl SymbolResolver for SemanticModel {
    fn symbol(&self, node: &Expr) -> Option<Symbol> {
        self.symbols.get(&node.id).cloned()
    }

    fn type_of(&self, node: &Expr) -> Option<TypeInfo> {
        self.types.get(&node.id).cloned()
    }
}

impl SemanticModel {
    /// Bind a selection closure whose root parameter has type `root_type`.
    pub fn bind(surface: &Surface, scope: &Scope, root_type: &str, selection: &Expr) -> Self {
        let mut binder = Binder::new(surface, scope);
        if let ExprKind::Closure { params, body } = &selection.kind {
            let mut env = Vec::new();
            match params.as_slice() {
                [root] => env.push((root.name.clone(), Binding::Root(root_type.to_string()))),
                [variables, root] => {
                    let declared = variables
                        .ty
                        .as_ref()
                        .map(|ty| ty.base_name().to_string());
                    env.push((variables.name.clone(), Binding::Variables(declared)));
                    env.push((root.name.clone(), Binding::Root(root_type.to_string())));
                }
                _ => {}
            }
            binder.bind(body, &mut env);
        }
        binder.model
    }

    /// Bind a fragment declaration on its own, for template extraction.
    /// Returns `None` when the root parameter's type is not on the surface.
    pub fn bind_fragment(surface: &Surface, scope: &Scope, decl: &FnDecl) -> Option<Self> {
        let root_type = fragment_root_type(surface, decl)?;
        let mut binder = Binder::new(surface, scope);
        binder.bind_fn(decl, &root_type);
        Some(binder.model)
    }
}

/// The surface type a fragment selects from, from its first parameter.
pub fn fragment_root_type(surface: &Surface, decl: &FnDecl) -> Option<String> {
    let name = decl.params.first()?.ty.as_ref()?.base_name();
    surface.get(name).map(|t| t.name.clone())
}

/// Parameters of a function after its root, as the resolver sees them.
pub fn fragment_parameters(decl: &FnDecl) -> Vec<ParameterSymbol> {
    decl.params
        .iter()
        .skip(1)
        .map(|p| ParameterSymbol {
            name: p.name.clone(),
            graphql_type: p.ty.as_ref().map(graphql_type).unwrap_or_default(),
        })
        .collect()
}

/// The concrete type of `o.on(|c: &Circle| ..)` or `o.on::<Circle, _>(..)`.
fn narrowing_target(type_args: &[String], args: &[Expr]) -> Option<String> {
    if let Some(explicit) = type_args.first().filter(|t| t.as_str() != "_") {
        return Some(explicit.clone());
    }
    match args.first().map(|a| &a.kind) {
        Some(ExprKind::Closure { params, .. }) => params
            .first()?
            .ty
            .as_ref()
            .map(|ty| ty.base_name().to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone)]
enum Binding {
    /// A selection root of the given surface type.
    Root(String),
    /// The variables object, with its declared struct if annotated.
    Variables(Option<String>),
    /// A plain parameter of a helper or fragment.
    Param,
}

type Env = Vec<(String, Binding)>;

fn lookup<'e>(env: &'e Env, name: &str) -> Option<&'e Binding> {
    env.iter().rev().find_map(|(n, b)| (n == name).then_some(b))
}

struct Binder<'a> {
    surface: &'a Surface,
    scope: &'a Scope,
    model: SemanticModel,
    /// Functions already bound, by name and root type.
    visited: HashSet<(String, String)>,
}

impl<'a> Binder<'a> {
    fn new(surface: &'a Surface, scope: &'a Scope) -> Self {
        Self {
            surface,
            scope,
            model: SemanticModel::default(),
            visited: HashSet::new(),
        }
    }

    fn record(&mut self, node: &Expr, symbol: Symbol) {
        self.model.symbols.insert(node.id, symbol);
    }

    fn type_info(&self, name: &str) -> TypeInfo {
        let mut tags = Vec::new();
        if self.surface.is_polymorphic(name) {
            tags.push(Tag::UnionInterface);
        }
        TypeInfo {
            name: name.to_string(),
            is_enum: self.surface.is_enum(name),
            tags,
        }
    }

    fn root_type(&self, node: &Expr, env: &Env) -> Option<String> {
        match lookup(env, node.as_ident()?) {
            Some(Binding::Root(ty)) => Some(ty.clone()),
            _ => None,
        }
    }

    fn bind(&mut self, node: &Expr, env: &mut Env) {
        match &node.kind {
            ExprKind::Closure { params, body } => {
                let depth = env.len();
                env.extend(params.iter().map(|p| (p.name.clone(), Binding::Param)));
                self.bind(body, env);
                env.truncate(depth);
            }
            ExprKind::Block { stmts, .. } => {
                for stmt in stmts {
                    self.bind(stmt, env);
                }
            }
            ExprKind::Return(inner) => {
                if let Some(inner) = inner {
                    self.bind(inner, env);
                }
            }
            ExprKind::Field { receiver, member } => {
                self.bind(receiver, env);
                self.bind_field(node, receiver, member, env);
            }
            ExprKind::Path(segments) => {
                if let Some(symbol) = self.classify_path(segments, env) {
                    self.record(node, symbol);
                }
            }
            ExprKind::MethodCall {
                receiver,
                method,
                type_args,
                args,
            } => self.bind_method_call(node, receiver, method, type_args, args, env),
            ExprKind::Call { func, args } => self.bind_call(node, func, args, env),
            ExprKind::Tuple(items) => {
                for item in items {
                    self.bind(item, env);
                }
            }
            ExprKind::Struct { fields, .. } => {
                for (_, value) in fields {
                    self.bind(value, env);
                }
            }
            ExprKind::Cast { expr, ty } => {
                let info = self.type_info(ty);
                self.model.types.insert(node.id, info);
                self.bind(expr, env);
            }
            ExprKind::Lit(_) | ExprKind::Unsupported => {}
        }
    }

    fn bind_field(&mut self, node: &Expr, receiver: &Expr, member: &str, env: &Env) {
        let Some(name) = receiver.as_ident() else {
            return;
        };
        match lookup(env, name) {
            Some(Binding::Root(ty)) => {
                let tags = match self.surface.member(ty, member) {
                    Some(Member::Property { wire_name, .. }) => vec![Tag::FieldSelector {
                        name: wire_name.clone(),
                    }],
                    _ => Vec::new(),
                };
                self.record(
                    node,
                    Symbol::Member {
                        name: member.to_string(),
                        tags,
                    },
                );
            }
            Some(Binding::Variables(Some(declared))) => {
                if let Some(ty) = self.scope.struct_field(declared, member) {
                    let graphql_type = graphql_type(ty);
                    self.record(
                        node,
                        Symbol::VariablesProperty {
                            name: member.to_string(),
                            graphql_type,
                        },
                    );
                }
            }
            _ => {}
        }
    }

    fn classify_path(&self, segments: &[String], env: &Env) -> Option<Symbol> {
        match segments {
            [name] => {
                if lookup(env, name).is_some() {
                    return Some(Symbol::Parameter { name: name.clone() });
                }
                Some(self.classify_ident(name))
            }
            [.., owner, variant] => {
                if owner == "Self" || is_screaming(variant) {
                    return Some(Symbol::State {
                        name: segments.join("::"),
                    });
                }
                if self.surface.is_enum(owner) {
                    let tags = self
                        .surface
                        .enum_value(owner, variant)
                        .map(|wire| Tag::FieldSelector {
                            name: wire.to_string(),
                        })
                        .into_iter()
                        .collect();
                    return Some(Symbol::EnumMember {
                        variant: variant.clone(),
                        tags,
                    });
                }
                (starts_upper(owner) && starts_upper(variant)).then(|| Symbol::EnumMember {
                    variant: variant.clone(),
                    tags: Vec::new(),
                })
            }
            [] => None,
        }
    }

    fn classify_ident(&self, name: &str) -> Symbol {
        if name == "self" || is_screaming(name) {
            return Symbol::State {
                name: name.to_string(),
            };
        }
        if name == "Some" || name == "None" {
            return Symbol::Constructor {
                name: name.to_string(),
            };
        }
        if let Some(symbol) = self.function_symbol(name) {
            return Symbol::Function(symbol);
        }
        if starts_upper(name) {
            return Symbol::Constructor {
                name: name.to_string(),
            };
        }
        Symbol::Local {
            name: name.to_string(),
        }
    }

    fn function_symbol(&self, name: &str) -> Option<FunctionSymbol> {
        if let Some(decl) = self.scope.function(name) {
            let tags = if decl.is_fragment {
                vec![Tag::Fragment]
            } else {
                Vec::new()
            };
            return Some(FunctionSymbol {
                name: name.to_string(),
                parameters: fragment_parameters(decl),
                tags,
                declaration: Some(decl.clone()),
            });
        }
        self.scope.template(name).map(|t| FunctionSymbol {
            name: name.to_string(),
            parameters: t.parameters.clone(),
            tags: vec![Tag::FragmentTemplate(t.template.clone())],
            declaration: None,
        })
    }

    fn bind_method_call(
        &mut self,
        node: &Expr,
        receiver: &Expr,
        method: &str,
        type_args: &[String],
        args: &[Expr],
        env: &mut Env,
    ) {
        self.bind(receiver, env);
        let Some(receiver_type) = self.root_type(receiver, env) else {
            for arg in args {
                self.bind(arg, env);
            }
            return;
        };

        if method == NARROWING_METHOD && self.surface.is_polymorphic(&receiver_type) {
            let target = narrowing_target(type_args, args);
            self.record(
                node,
                Symbol::Method(MethodSymbol {
                    name: method.to_string(),
                    parameters: Vec::new(),
                    has_selector: true,
                    selector_target: target.as_deref().map(|t| self.type_info(t)),
                    type_arguments: target.iter().cloned().collect(),
                    tags: vec![Tag::Syntax],
                    declaration: None,
                }),
            );
            for arg in args {
                self.bind_selector_arg(arg, target.as_deref(), env);
            }
            return;
        }

        let surface = self.surface;
        if let Some(
            member @ Member::Selector {
                wire_name,
                arguments,
                ..
            },
        ) = surface.member(&receiver_type, method)
        {
            let target = member.target().map(str::to_string);
            let parameters: Vec<ParameterSymbol> = arguments
                .iter()
                .map(|a| ParameterSymbol {
                    name: a.name.clone(),
                    graphql_type: a.graphql_type.clone(),
                })
                .collect();
            self.record(
                node,
                Symbol::Method(MethodSymbol {
                    name: method.to_string(),
                    parameters: parameters.clone(),
                    has_selector: target.is_some(),
                    selector_target: target.as_deref().map(|t| self.type_info(t)),
                    type_arguments: Vec::new(),
                    tags: vec![Tag::FieldSelector {
                        name: wire_name.clone(),
                    }],
                    declaration: None,
                }),
            );
            for (i, arg) in args.iter().enumerate() {
                match parameters.get(i) {
                    Some(parameter) => self.bind_argument(arg, parameter, env),
                    None => self.bind_selector_arg(arg, target.as_deref(), env),
                }
            }
            return;
        }

        if let Some(function) = self.function_symbol(method) {
            if function.declaration.as_ref().map_or(true, |d| d.is_fragment) {
                for (arg, parameter) in args.iter().zip(&function.parameters) {
                    self.bind_argument(arg, parameter, env);
                }
                if let Some(decl) = &function.declaration {
                    self.bind_fn(decl, &receiver_type);
                }
                self.record(
                    node,
                    Symbol::Method(MethodSymbol {
                        name: function.name,
                        parameters: function.parameters,
                        has_selector: false,
                        selector_target: None,
                        type_arguments: Vec::new(),
                        tags: function.tags,
                        declaration: function.declaration,
                    }),
                );
                return;
            }
        }

        for arg in args {
            self.bind(arg, env);
        }
    }

    fn bind_call(&mut self, node: &Expr, func: &Expr, args: &[Expr], env: &mut Env) {
        self.bind(func, env);
        let symbol = self.model.symbols.get(&func.id).cloned();
        match symbol {
            Some(Symbol::Function(function)) => {
                let root_type = args.first().and_then(|root| self.root_type(root, env));
                if let Some(root) = args.first() {
                    self.bind(root, env);
                }
                for (arg, parameter) in args.iter().skip(1).zip(&function.parameters) {
                    self.bind_argument(arg, parameter, env);
                }
                if let (Some(decl), Some(root_type)) = (&function.declaration, &root_type) {
                    self.bind_fn(decl, root_type);
                }
                self.record(node, Symbol::Function(function));
            }
            Some(Symbol::Constructor { name }) => {
                for arg in args {
                    self.bind(arg, env);
                }
                self.record(node, Symbol::Constructor { name });
            }
            _ => {
                for arg in args {
                    self.bind(arg, env);
                }
            }
        }
    }

    /// Bind a value in argument position. Variables-object properties used
    /// here take the parameter's type unless their struct declares one.
    fn bind_argument(&mut self, arg: &Expr, parameter: &ParameterSymbol, env: &mut Env) {
        match &arg.kind {
            ExprKind::Call { func, args } if func.is_ident("Some") && args.len() == 1 => {
                self.bind(func, env);
                self.bind_argument(&args[0], parameter, env);
            }
            ExprKind::Field { receiver, member } => {
                self.bind(arg, env);
                let is_variables = receiver
                    .as_ident()
                    .is_some_and(|name| matches!(lookup(env, name), Some(Binding::Variables(_))));
                if is_variables && !self.model.symbols.contains_key(&arg.id) {
                    self.record(
                        arg,
                        Symbol::VariablesProperty {
                            name: member.clone(),
                            graphql_type: parameter.graphql_type.clone(),
                        },
                    );
                }
            }
            _ => self.bind(arg, env),
        }
    }

    fn bind_selector_arg(&mut self, arg: &Expr, target: Option<&str>, env: &mut Env) {
        match &arg.kind {
            ExprKind::Closure { params, body } => {
                let depth = env.len();
                for param in params {
                    let binding = match target {
                        Some(target) => Binding::Root(target.to_string()),
                        None => Binding::Param,
                    };
                    env.push((param.name.clone(), binding));
                }
                self.bind(body, env);
                env.truncate(depth);
            }
            ExprKind::Path(_) => {
                self.bind(arg, env);
                if let (Some(Symbol::Function(function)), Some(target)) =
                    (self.model.symbols.get(&arg.id).cloned(), target)
                {
                    if let Some(decl) = function.declaration {
                        self.bind_fn(&decl, target);
                    }
                }
            }
            _ => self.bind(arg, env),
        }
    }

    /// Bind the body of a helper or fragment selecting from `root_type`.
    fn bind_fn(&mut self, decl: &FnDecl, root_type: &str) {
        if !self
            .visited
            .insert((decl.name.clone(), root_type.to_string()))
        {
            return;
        }
        let Some((root, rest)) = decl.params.split_first() else {
            return;
        };
        let declared = root
            .ty
            .as_ref()
            .map(|ty| ty.base_name())
            .filter(|name| self.surface.get(name).is_some())
            .unwrap_or(root_type)
            .to_string();
        let mut env: Env = vec![(root.name.clone(), Binding::Root(declared))];
        env.extend(rest.iter().map(|p| (p.name.clone(), Binding::Param)));
        self.bind(&decl.body, &mut env);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{parse_expr, parse_fn};

    fn ty(source: &str) -> TypeExpr {
        crate::syntax::type_expr(&syn::parse_str(source).unwrap())
    }

    #[test]
    fn rust_types_map_to_graphql() {
        assert_eq!(graphql_type(&ty("i32")), "Int!");
        assert_eq!(graphql_type(&ty("Option<i32>")), "Int");
        assert_eq!(graphql_type(&ty("&str")), "String!");
        assert_eq!(graphql_type(&ty("Vec<Role>")), "[Role!]!");
        assert_eq!(graphql_type(&ty("Option<Vec<Option<f64>>>")), "[Float]");
        assert_eq!(graphql_type(&ty("bool")), "Boolean!");
    }

    #[test]
    fn identifiers_are_classified() {
        let surface = Surface::from_schema(&zeroql_schema::parse("schema { query: Query } type Query { id: Int! }").unwrap());
        let scope = Scope::new();
        let binder = Binder::new(&surface, &scope);
        assert!(matches!(binder.classify_ident("user_id"), Symbol::Local { .. }));
        assert!(matches!(binder.classify_ident("self"), Symbol::State { .. }));
        assert!(matches!(binder.classify_ident("MAX_USERS"), Symbol::State { .. }));
        assert!(matches!(binder.classify_ident("None"), Symbol::Constructor { .. }));
    }

    #[test]
    fn fragment_root_type_comes_from_annotation() {
        let surface = Surface::from_schema(
            &zeroql_schema::parse("schema { query: Query } type Person { id: Int! } type Query { me: Person }")
                .unwrap(),
        );
        let decl = parse_fn("fn f(p: &Person) -> i32 { p.id }").unwrap();
        assert_eq!(fragment_root_type(&surface, &decl).as_deref(), Some("Person"));
        let decl = parse_fn("fn f(p: &Unknown) -> i32 { p.id }").unwrap();
        assert_eq!(fragment_root_type(&surface, &decl), None);
    }

    #[test]
    fn member_symbols_carry_wire_names() {
        let surface = Surface::from_schema(
            &zeroql_schema::parse(
                "schema { query: Query } type Person { firstName: String! } type Query { me: Person }",
            )
            .unwrap(),
        );
        let expr = parse_expr("|q| q.me(|o| o.first_name.clone())").unwrap();
        let model = SemanticModel::bind(&surface, &Scope::new(), "Query", &expr);
        let mut found = None;
        expr.walk(&mut |node| {
            if node.text == "o.first_name" {
                found = model.symbol(node);
            }
        });
        let Some(Symbol::Member { tags, .. }) = found else {
            panic!("no member symbol");
        };
        assert_eq!(crate::symbols::field_selector(&tags), Some("firstName"));
    }
}
