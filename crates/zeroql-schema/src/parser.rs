use apollo_parser::cst;
use apollo_parser::Parser;
use heck::ToSnakeCase;
use std::collections::HashMap;
use std::fmt;

/// What kind of GraphQL type a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Enum,
    Object,
    InputObject,
    Interface,
    Union,
}

/// A GraphQL type reference exactly as written in the SDL (NamedType, List,
/// NonNull wrapping).
#[derive(Debug, Clone)]
pub enum GqlType {
    Named(String),
    List(Box<GqlType>),
    NonNull(Box<GqlType>),
}

impl GqlType {
    /// Get the base (innermost) named type.
    pub fn base_name(&self) -> &str {
        match self {
            GqlType::Named(name) => name,
            GqlType::List(inner) => inner.base_name(),
            GqlType::NonNull(inner) => inner.base_name(),
        }
    }
}

/// A normalized type reference: the SDL wrappers are folded into a
/// nullability flag on every level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDefinition {
    Scalar { name: String, can_be_null: bool },
    Enum { name: String, can_be_null: bool },
    Object { name: String, can_be_null: bool },
    Input { name: String, can_be_null: bool },
    List {
        element: Box<TypeDefinition>,
        can_be_null: bool,
    },
}

impl TypeDefinition {
    /// Name of the innermost named type.
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Scalar { name, .. }
            | TypeDefinition::Enum { name, .. }
            | TypeDefinition::Object { name, .. }
            | TypeDefinition::Input { name, .. } => name,
            TypeDefinition::List { element, .. } => element.name(),
        }
    }

    pub fn can_be_null(&self) -> bool {
        match self {
            TypeDefinition::Scalar { can_be_null, .. }
            | TypeDefinition::Enum { can_be_null, .. }
            | TypeDefinition::Object { can_be_null, .. }
            | TypeDefinition::Input { can_be_null, .. }
            | TypeDefinition::List { can_be_null, .. } => *can_be_null,
        }
    }

    /// Whether reading this type needs a sub-selection (object, or a list of
    /// objects at any depth).
    pub fn requires_selector(&self) -> bool {
        match self {
            TypeDefinition::Object { .. } => true,
            TypeDefinition::Scalar { .. }
            | TypeDefinition::Enum { .. }
            | TypeDefinition::Input { .. } => false,
            TypeDefinition::List { element, .. } => element.requires_selector(),
        }
    }

    /// Render back to SDL, e.g. `[Int!]!`.
    pub fn graphql_type(&self) -> String {
        let inner = match self {
            TypeDefinition::List { element, .. } => format!("[{}]", element.graphql_type()),
            other => other.name().to_string(),
        };
        if self.can_be_null() {
            inner
        } else {
            format!("{}!", inner)
        }
    }
}

/// A field of an object, interface or input type.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// Surface (Rust) name: snake_case, keyword-safe.
    pub name: String,
    /// Name on the wire, as declared in the schema.
    pub wire_name: String,
    pub description: Option<String>,
    pub ty: TypeDefinition,
    pub arguments: Vec<ArgumentDefinition>,
}

impl FieldDefinition {
    /// Fields that return objects, and fields that take arguments, are
    /// exposed as selector methods rather than plain data fields.
    pub fn requires_selector(&self) -> bool {
        !self.arguments.is_empty() || self.ty.requires_selector()
    }
}

/// A field argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDefinition {
    pub name: String,
    /// SDL rendering including nullability, e.g. `Int!`.
    pub graphql_type: String,
    pub ty: TypeDefinition,
}

/// An object, interface or input type.
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    pub name: String,
    pub description: Option<String>,
    pub fields: Vec<FieldDefinition>,
    pub implements: Vec<String>,
}

/// A simplified enum value.
#[derive(Debug, Clone)]
pub struct EnumValueDef {
    pub name: String,
    pub description: Option<String>,
}

/// A simplified enum type.
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<EnumValueDef>,
}

/// A simplified scalar type.
#[derive(Debug, Clone)]
pub struct ScalarDef {
    pub name: String,
    pub description: Option<String>,
}

/// A union and its member types.
#[derive(Debug, Clone)]
pub struct UnionDef {
    pub name: String,
    pub description: Option<String>,
    pub types: Vec<String>,
}

/// Parsed and categorized schema data.
#[derive(Debug, Clone)]
pub struct Schema {
    pub scalars: Vec<ScalarDef>,
    pub enums: Vec<EnumDef>,
    pub objects: Vec<ClassDefinition>,
    pub interfaces: Vec<ClassDefinition>,
    pub unions: Vec<UnionDef>,
    pub inputs: Vec<ClassDefinition>,
    /// `None` when the schema block names no query root.
    pub query_type: Option<String>,
    /// `None` when the schema block names no mutation root.
    pub mutation_type: Option<String>,
    pub type_kind_map: HashMap<String, TypeKind>,
}

impl Schema {
    pub fn object(&self, name: &str) -> Option<&ClassDefinition> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Concrete object types that implement the given interface.
    pub fn implementors(&self, interface: &str) -> Vec<String> {
        self.objects
            .iter()
            .filter(|o| o.implements.iter().any(|i| i == interface))
            .map(|o| o.name.clone())
            .collect()
    }
}

/// Errors that make a schema unusable for generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The document has no `schema { ... }` root operation block.
    MissingSchemaDefinition,
    /// A root operation names a type that is not declared as an object.
    UnknownRootType { operation: String, name: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSchemaDefinition => {
                write!(f, "Schema definition not found: expected a `schema {{ ... }}` block")
            }
            Self::UnknownRootType { operation, name } => {
                write!(f, "Root {} type `{}` is not a declared object type", operation, name)
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// Built-in GraphQL scalar names.
pub const BUILTIN_SCALARS: &[&str] = &["String", "Int", "Float", "Boolean", "ID"];

/// Folds SDL wrappers into [`TypeDefinition`]s. Every field and argument goes
/// through the same formatter, so one schema type always renders the same way.
pub struct TypeFormatter<'a> {
    kinds: &'a HashMap<String, TypeKind>,
}

impl<'a> TypeFormatter<'a> {
    pub fn new(kinds: &'a HashMap<String, TypeKind>) -> Self {
        Self { kinds }
    }

    pub fn format(&self, ty: &GqlType) -> TypeDefinition {
        self.format_nullable(ty, true)
    }

    fn format_nullable(&self, ty: &GqlType, can_be_null: bool) -> TypeDefinition {
        match ty {
            GqlType::NonNull(inner) => self.format_nullable(inner, false),
            GqlType::List(inner) => TypeDefinition::List {
                element: Box::new(self.format_nullable(inner, true)),
                can_be_null,
            },
            GqlType::Named(name) => {
                let name = name.clone();
                match self.kinds.get(&name) {
                    Some(TypeKind::Enum) => TypeDefinition::Enum { name, can_be_null },
                    Some(TypeKind::InputObject) => TypeDefinition::Input { name, can_be_null },
                    Some(TypeKind::Object | TypeKind::Interface | TypeKind::Union) => {
                        TypeDefinition::Object { name, can_be_null }
                    }
                    Some(TypeKind::Scalar) => TypeDefinition::Scalar { name, can_be_null },
                    None => {
                        tracing::warn!(type_name = %name, "unknown type, treating it as a scalar");
                        TypeDefinition::Scalar { name, can_be_null }
                    }
                }
            }
        }
    }
}

pub fn parse(schema_text: &str) -> Result<Schema, SchemaError> {
    let parser = Parser::new(schema_text);
    let tree = parser.parse();

    // Report parse errors but continue (apollo-parser is error-resilient).
    for err in tree.errors() {
        tracing::warn!("Schema parse warning: {}", err.message());
    }

    let doc = tree.document();

    let mut type_kind_map: HashMap<String, TypeKind> = HashMap::new();
    for s in BUILTIN_SCALARS {
        type_kind_map.insert(s.to_string(), TypeKind::Scalar);
    }

    // First pass: names and kinds, so forward references resolve.
    let mut roots: Option<Vec<(String, String)>> = None;
    for def in doc.definitions() {
        let (name, kind) = match &def {
            cst::Definition::ScalarTypeDefinition(s) => (extract_name(&s.name()), TypeKind::Scalar),
            cst::Definition::EnumTypeDefinition(e) => (extract_name(&e.name()), TypeKind::Enum),
            cst::Definition::ObjectTypeDefinition(o) => (extract_name(&o.name()), TypeKind::Object),
            cst::Definition::InputObjectTypeDefinition(i) => {
                (extract_name(&i.name()), TypeKind::InputObject)
            }
            cst::Definition::InterfaceTypeDefinition(i) => {
                (extract_name(&i.name()), TypeKind::Interface)
            }
            cst::Definition::UnionTypeDefinition(u) => (extract_name(&u.name()), TypeKind::Union),
            cst::Definition::SchemaDefinition(s) => {
                roots = Some(extract_roots(s));
                continue;
            }
            _ => continue,
        };
        type_kind_map.insert(name, kind);
    }

    let Some(roots) = roots else {
        return Err(SchemaError::MissingSchemaDefinition);
    };

    let formatter = TypeFormatter::new(&type_kind_map);
    let mut scalars = Vec::new();
    let mut enums = Vec::new();
    let mut objects = Vec::new();
    let mut interfaces = Vec::new();
    let mut unions = Vec::new();
    let mut inputs = Vec::new();

    for def in doc.definitions() {
        match def {
            cst::Definition::ScalarTypeDefinition(s) => {
                let name = extract_name(&s.name());
                let description = extract_description(&s.description());
                scalars.push(ScalarDef { name, description });
            }
            cst::Definition::EnumTypeDefinition(e) => enums.push(extract_enum(&e)),
            cst::Definition::ObjectTypeDefinition(o) => objects.push(ClassDefinition {
                name: extract_name(&o.name()),
                description: extract_description(&o.description()),
                fields: extract_fields(&formatter, &o.fields_definition()),
                implements: extract_implements(&o.implements_interfaces()),
            }),
            cst::Definition::InterfaceTypeDefinition(i) => interfaces.push(ClassDefinition {
                name: extract_name(&i.name()),
                description: extract_description(&i.description()),
                fields: extract_fields(&formatter, &i.fields_definition()),
                implements: extract_implements(&i.implements_interfaces()),
            }),
            cst::Definition::UnionTypeDefinition(u) => unions.push(extract_union(&u)),
            cst::Definition::InputObjectTypeDefinition(i) => {
                inputs.push(extract_input(&formatter, &i))
            }
            _ => {}
        }
    }

    let mut query_type = None;
    let mut mutation_type = None;
    for (operation, name) in roots {
        if type_kind_map.get(&name) != Some(&TypeKind::Object) {
            return Err(SchemaError::UnknownRootType { operation, name });
        }
        match operation.as_str() {
            "query" => query_type = Some(name),
            "mutation" => mutation_type = Some(name),
            _ => {}
        }
    }

    tracing::debug!(
        objects = objects.len(),
        inputs = inputs.len(),
        enums = enums.len(),
        "parsed schema"
    );

    Ok(Schema {
        scalars,
        enums,
        objects,
        interfaces,
        unions,
        inputs,
        query_type,
        mutation_type,
        type_kind_map,
    })
}

fn extract_roots(schema: &cst::SchemaDefinition) -> Vec<(String, String)> {
    schema
        .root_operation_type_definitions()
        .filter_map(|root| {
            let op = root.operation_type()?;
            let operation = if op.query_token().is_some() {
                "query"
            } else if op.mutation_token().is_some() {
                "mutation"
            } else {
                "subscription"
            };
            let name = extract_name(&root.named_type()?.name());
            Some((operation.to_string(), name))
        })
        .collect()
}

fn extract_name(name: &Option<cst::Name>) -> String {
    name.as_ref()
        .map(|n| n.text().to_string())
        .unwrap_or_default()
}

fn extract_description(desc: &Option<cst::Description>) -> Option<String> {
    desc.as_ref()
        .and_then(|d| d.string_value())
        .map(String::from)
        .filter(|s| !s.is_empty())
}

fn extract_type(ty: &Option<cst::Type>) -> GqlType {
    match ty {
        None => GqlType::Named("String".to_string()),
        Some(t) => match t {
            cst::Type::NamedType(nt) => {
                let name = extract_name(&nt.name());
                GqlType::Named(name)
            }
            cst::Type::ListType(lt) => {
                let inner = extract_type(&lt.ty());
                GqlType::List(Box::new(inner))
            }
            cst::Type::NonNullType(nnt) => {
                if let Some(named) = nnt.named_type() {
                    let name = extract_name(&named.name());
                    GqlType::NonNull(Box::new(GqlType::Named(name)))
                } else if let Some(list) = nnt.list_type() {
                    let inner = extract_type(&list.ty());
                    GqlType::NonNull(Box::new(GqlType::List(Box::new(inner))))
                } else {
                    GqlType::NonNull(Box::new(GqlType::Named("String".to_string())))
                }
            }
        },
    }
}

fn extract_implements(implements: &Option<cst::ImplementsInterfaces>) -> Vec<String> {
    implements
        .as_ref()
        .map(|i| i.named_types().map(|nt| extract_name(&nt.name())).collect())
        .unwrap_or_default()
}

fn extract_fields(
    formatter: &TypeFormatter<'_>,
    fields_def: &Option<cst::FieldsDefinition>,
) -> Vec<FieldDefinition> {
    let Some(fd) = fields_def else {
        return Vec::new();
    };
    fd.field_definitions()
        .map(|f| {
            let wire_name = extract_name(&f.name());
            FieldDefinition {
                name: surface_name(&wire_name),
                description: extract_description(&f.description()),
                ty: formatter.format(&extract_type(&f.ty())),
                arguments: extract_arguments(formatter, &f.arguments_definition()),
                wire_name,
            }
        })
        .collect()
}

fn extract_arguments(
    formatter: &TypeFormatter<'_>,
    args_def: &Option<cst::ArgumentsDefinition>,
) -> Vec<ArgumentDefinition> {
    let Some(ad) = args_def else {
        return Vec::new();
    };
    ad.input_value_definitions()
        .map(|iv| {
            let ty = formatter.format(&extract_type(&iv.ty()));
            ArgumentDefinition {
                name: extract_name(&iv.name()),
                graphql_type: ty.graphql_type(),
                ty,
            }
        })
        .collect()
}

fn extract_enum(e: &cst::EnumTypeDefinition) -> EnumDef {
    let name = extract_name(&e.name());
    let description = extract_description(&e.description());
    let values = e
        .enum_values_definition()
        .map(|evd| {
            evd.enum_value_definitions()
                .map(|ev| {
                    let val_name = ev
                        .enum_value()
                        .map(|v| v.text().to_string())
                        .unwrap_or_default();
                    let val_desc = extract_description(&ev.description());
                    EnumValueDef {
                        name: val_name,
                        description: val_desc,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    EnumDef {
        name,
        description,
        values,
    }
}

fn extract_union(u: &cst::UnionTypeDefinition) -> UnionDef {
    let types = u
        .union_member_types()
        .map(|members| {
            members
                .named_types()
                .map(|nt| extract_name(&nt.name()))
                .collect()
        })
        .unwrap_or_default();
    UnionDef {
        name: extract_name(&u.name()),
        description: extract_description(&u.description()),
        types,
    }
}

fn extract_input(formatter: &TypeFormatter<'_>, i: &cst::InputObjectTypeDefinition) -> ClassDefinition {
    let name = extract_name(&i.name());
    let description = extract_description(&i.description());
    let fields = i
        .input_fields_definition()
        .map(|ifd| {
            ifd.input_value_definitions()
                .map(|iv| {
                    let wire_name = extract_name(&iv.name());
                    FieldDefinition {
                        name: surface_name(&wire_name),
                        description: extract_description(&iv.description()),
                        ty: formatter.format(&extract_type(&iv.ty())),
                        arguments: Vec::new(),
                        wire_name,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    ClassDefinition {
        name,
        description,
        fields,
        implements: Vec::new(),
    }
}

/// Surface name for a schema field: snake_case, keyword-safe.
pub fn surface_name(wire_name: &str) -> String {
    safe_ident(&wire_name.to_snake_case())
}

/// Rust keywords that need r# prefix when used as identifiers.
const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "static", "struct", "trait", "true", "type", "unsafe", "use", "where", "while", "async",
    "await", "dyn", "abstract", "become", "box", "do", "final", "macro", "override", "priv",
    "typeof", "unsized", "virtual", "yield", "try",
];

/// Keywords that cannot be raw identifiers at all.
const RESERVED_PATH_KEYWORDS: &[&str] = &["self", "Self", "super", "crate", "_"];

/// Make a name safe for use as a Rust identifier.
pub fn safe_ident(name: &str) -> String {
    if RESERVED_PATH_KEYWORDS.contains(&name) {
        format!("{}_", name)
    } else if RUST_KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINI_SCHEMA: &str = r#"
        schema {
            query: Query
            mutation: Mutation
        }

        "Represents a date and time." scalar DateTime
        scalar JSON

        "The status of an issue." enum IssueStatus {
            BACKLOG
            TODO
            "Work in progress." IN_PROGRESS
            DONE
        }

        "A user account." type User implements Node {
            "The unique identifier." id: ID!
            "The user's display name." firstName: String!
            email: String
            tags: [String!]
            createdAt: DateTime
            friends(first: Int): [User!]!
        }

        interface Node {
            id: ID!
        }

        union SearchResult = User | Team

        type Team implements Node {
            id: ID!
            key: String!
            type: String
        }

        "Filter for users." input UserFilter {
            "Filter by name." firstName: String
            active: Boolean!
        }

        type Query {
            viewer: User!
            user(id: ID!, filter: UserFilter): User
            search(term: String!): [SearchResult]
        }

        type Mutation {
            deleteUser(id: ID!): Boolean!
        }
    "#;

    fn mini() -> Schema {
        parse(MINI_SCHEMA).unwrap()
    }

    #[test]
    fn parse_scalars() {
        let schema = mini();
        let names: Vec<&str> = schema.scalars.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["DateTime", "JSON"]);
        assert_eq!(
            schema.scalars[0].description.as_deref(),
            Some("Represents a date and time.")
        );
    }

    #[test]
    fn parse_enums() {
        let schema = mini();
        assert_eq!(schema.enums.len(), 1);
        let e = &schema.enums[0];
        assert_eq!(e.name, "IssueStatus");
        let values: Vec<&str> = e.values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(values, vec!["BACKLOG", "TODO", "IN_PROGRESS", "DONE"]);
        assert_eq!(e.values[2].description.as_deref(), Some("Work in progress."));
    }

    #[test]
    fn parse_roots() {
        let schema = mini();
        assert_eq!(schema.query_type.as_deref(), Some("Query"));
        assert_eq!(schema.mutation_type.as_deref(), Some("Mutation"));
        // Roots stay regular objects.
        assert!(schema.object("Query").is_some());
    }

    #[test]
    fn missing_schema_block_fails() {
        let err = parse("type Query { viewer: String }").unwrap_err();
        assert_eq!(err, SchemaError::MissingSchemaDefinition);
        assert!(err.to_string().contains("Schema definition not found"));
    }

    #[test]
    fn unknown_root_type_fails() {
        let err = parse("schema { query: Missing }").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownRootType { ref name, .. } if name == "Missing"));
    }

    #[test]
    fn absent_mutation_root_is_none() {
        let schema = parse("schema { query: Query } type Query { a: Int }").unwrap();
        assert!(schema.mutation_type.is_none());
    }

    #[test]
    fn field_names_are_normalized() {
        let schema = mini();
        let user = schema.object("User").unwrap();
        let first = &user.fields[1];
        assert_eq!(first.name, "first_name");
        assert_eq!(first.wire_name, "firstName");
        let team = schema.object("Team").unwrap();
        assert_eq!(team.fields[2].name, "r#type");
        assert_eq!(team.fields[2].wire_name, "type");
    }

    #[test]
    fn parse_field_types() {
        let schema = mini();
        let user = schema.object("User").unwrap();

        let id = user.fields.iter().find(|f| f.wire_name == "id").unwrap();
        assert_eq!(
            id.ty,
            TypeDefinition::Scalar {
                name: "ID".to_string(),
                can_be_null: false
            }
        );

        let tags = user.fields.iter().find(|f| f.wire_name == "tags").unwrap();
        assert_eq!(tags.ty.graphql_type(), "[String!]");
        assert!(tags.ty.can_be_null());
        assert!(!tags.requires_selector());

        let friends = user.fields.iter().find(|f| f.wire_name == "friends").unwrap();
        assert_eq!(friends.ty.graphql_type(), "[User!]!");
        assert!(friends.requires_selector());
    }

    #[test]
    fn union_and_interface_fields_are_objects() {
        let schema = mini();
        let query = schema.object("Query").unwrap();
        let search = query.fields.iter().find(|f| f.wire_name == "search").unwrap();
        match &search.ty {
            TypeDefinition::List { element, can_be_null } => {
                assert!(*can_be_null);
                assert!(matches!(element.as_ref(), TypeDefinition::Object { name, can_be_null: true } if name == "SearchResult"));
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn parse_arguments() {
        let schema = mini();
        let query = schema.object("Query").unwrap();
        let user = query.fields.iter().find(|f| f.wire_name == "user").unwrap();
        let args: Vec<(&str, &str)> = user
            .arguments
            .iter()
            .map(|a| (a.name.as_str(), a.graphql_type.as_str()))
            .collect();
        assert_eq!(args, vec![("id", "ID!"), ("filter", "UserFilter")]);
        assert!(matches!(user.arguments[1].ty, TypeDefinition::Input { .. }));
    }

    #[test]
    fn parse_interfaces_and_unions() {
        let schema = mini();
        assert_eq!(schema.interfaces.len(), 1);
        assert_eq!(schema.interfaces[0].name, "Node");
        assert_eq!(schema.unions[0].types, vec!["User", "Team"]);
        assert_eq!(schema.implementors("Node"), vec!["User", "Team"]);
        assert_eq!(schema.type_kind_map.get("Node"), Some(&TypeKind::Interface));
        assert_eq!(schema.type_kind_map.get("SearchResult"), Some(&TypeKind::Union));
    }

    #[test]
    fn parse_inputs() {
        let schema = mini();
        assert_eq!(schema.inputs.len(), 1);
        let input = &schema.inputs[0];
        assert_eq!(input.name, "UserFilter");
        assert_eq!(input.description.as_deref(), Some("Filter for users."));
        assert_eq!(input.fields[0].name, "first_name");
        assert_eq!(input.fields[0].description.as_deref(), Some("Filter by name."));
        assert!(!input.fields[1].ty.can_be_null());
    }

    #[test]
    fn formatter_renders_identically() {
        let schema = mini();
        let query = schema.object("Query").unwrap();
        let user_id = &query.fields[1].arguments[0];
        let mutation = schema.object("Mutation").unwrap();
        let delete_id = &mutation.fields[0].arguments[0];
        assert_eq!(user_id.ty, delete_id.ty);
        assert_eq!(user_id.graphql_type, delete_id.graphql_type);
    }

    #[test]
    fn safe_ident_keywords() {
        assert_eq!(safe_ident("type"), "r#type");
        assert_eq!(safe_ident("match"), "r#match");
        assert_eq!(safe_ident("async"), "r#async");
        assert_eq!(safe_ident("self"), "self_");
    }

    #[test]
    fn safe_ident_non_keywords() {
        assert_eq!(safe_ident("name"), "name");
        assert_eq!(safe_ident("id"), "id");
        assert_eq!(safe_ident("user_name"), "user_name");
    }

    #[test]
    fn gql_type_base_name() {
        let named = GqlType::Named("User".to_string());
        assert_eq!(named.base_name(), "User");

        let list = GqlType::List(Box::new(GqlType::NonNull(Box::new(GqlType::Named(
            "Int".to_string(),
        )))));
        assert_eq!(list.base_name(), "Int");
    }
}
