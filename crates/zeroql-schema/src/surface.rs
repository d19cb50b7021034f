//! Metadata describing the generated selector surface.
//!
//! The typed surface emitted by `zeroql-codegen` is ordinary Rust; the
//! resolver never sees it. Instead it consults this model, which records for
//! every generated member whether it is a plain property or a selector
//! method, and which wire name it stands for.

use crate::parser::{ArgumentDefinition, ClassDefinition, Schema, TypeDefinition};
use heck::{ToShoutySnakeCase, ToUpperCamelCase};
use indexmap::IndexMap;

/// Name of the narrowing method generated on interface and union types.
pub const NARROWING_METHOD: &str = "on";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Object,
    Interface,
    Union,
    Input,
    Enum,
    Scalar,
}

/// A generated member that the resolver can translate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    /// Directly exposed scalar or enum data.
    Property { wire_name: String, ty: TypeDefinition },
    /// A selector method: field arguments in declared order, then a
    /// transform closure when the result needs a sub-selection.
    Selector {
        wire_name: String,
        arguments: Vec<ArgumentDefinition>,
        ty: TypeDefinition,
    },
}

impl Member {
    pub fn wire_name(&self) -> &str {
        match self {
            Member::Property { wire_name, .. } | Member::Selector { wire_name, .. } => wire_name,
        }
    }

    pub fn ty(&self) -> &TypeDefinition {
        match self {
            Member::Property { ty, .. } | Member::Selector { ty, .. } => ty,
        }
    }

    pub fn arguments(&self) -> &[ArgumentDefinition] {
        match self {
            Member::Property { .. } => &[],
            Member::Selector { arguments, .. } => arguments,
        }
    }

    /// The type selected by the trailing transform, if the member takes one.
    pub fn target(&self) -> Option<&str> {
        match self {
            Member::Selector { ty, .. } if ty.requires_selector() => Some(ty.name()),
            _ => None,
        }
    }
}

/// One generated type.
#[derive(Debug, Clone)]
pub struct SurfaceType {
    pub name: String,
    pub kind: SurfaceKind,
    /// Rust member name to member.
    pub members: IndexMap<String, Member>,
    /// Rust variant name to wire value, for enums.
    pub enum_values: IndexMap<String, String>,
    /// Concrete types reachable through narrowing, for interfaces and unions.
    pub possible_types: Vec<String>,
}

impl SurfaceType {
    fn new(name: &str, kind: SurfaceKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            members: IndexMap::new(),
            enum_values: IndexMap::new(),
            possible_types: Vec::new(),
        }
    }

    pub fn is_polymorphic(&self) -> bool {
        matches!(self.kind, SurfaceKind::Interface | SurfaceKind::Union)
    }
}

/// The whole selector surface of one schema.
#[derive(Debug, Clone)]
pub struct Surface {
    types: IndexMap<String, SurfaceType>,
    query_type: Option<String>,
    mutation_type: Option<String>,
}

impl Surface {
    pub fn from_schema(schema: &Schema) -> Self {
        let mut types = IndexMap::new();

        for scalar in &schema.scalars {
            types.insert(scalar.name.clone(), SurfaceType::new(&scalar.name, SurfaceKind::Scalar));
        }

        for e in &schema.enums {
            let mut ty = SurfaceType::new(&e.name, SurfaceKind::Enum);
            for value in &e.values {
                ty.enum_values.insert(variant_name(&value.name), value.name.clone());
            }
            types.insert(e.name.clone(), ty);
        }

        for object in &schema.objects {
            types.insert(object.name.clone(), class_type(object, SurfaceKind::Object));
        }

        for interface in &schema.interfaces {
            let mut ty = class_type(interface, SurfaceKind::Interface);
            ty.possible_types = schema.implementors(&interface.name);
            types.insert(interface.name.clone(), ty);
        }

        for union in &schema.unions {
            let mut ty = SurfaceType::new(&union.name, SurfaceKind::Union);
            ty.possible_types = union.types.clone();
            types.insert(union.name.clone(), ty);
        }

        for input in &schema.inputs {
            let mut ty = SurfaceType::new(&input.name, SurfaceKind::Input);
            for field in &input.fields {
                ty.members.insert(
                    field.name.clone(),
                    Member::Property {
                        wire_name: field.wire_name.clone(),
                        ty: field.ty.clone(),
                    },
                );
            }
            types.insert(input.name.clone(), ty);
        }

        Self {
            types,
            query_type: schema.query_type.clone(),
            mutation_type: schema.mutation_type.clone(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SurfaceType> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &SurfaceType> {
        self.types.values()
    }

    pub fn member(&self, type_name: &str, member: &str) -> Option<&Member> {
        self.types.get(type_name)?.members.get(member)
    }

    pub fn is_polymorphic(&self, type_name: &str) -> bool {
        self.types
            .get(type_name)
            .is_some_and(SurfaceType::is_polymorphic)
    }

    pub fn is_enum(&self, type_name: &str) -> bool {
        self.types
            .get(type_name)
            .is_some_and(|t| t.kind == SurfaceKind::Enum)
    }

    /// Wire value of an enum variant, if the variant is known.
    pub fn enum_value(&self, enum_name: &str, variant: &str) -> Option<&str> {
        self.types
            .get(enum_name)?
            .enum_values
            .get(variant)
            .map(String::as_str)
    }

    pub fn query_type(&self) -> Option<&str> {
        self.query_type.as_deref()
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }
}

fn class_type(class: &ClassDefinition, kind: SurfaceKind) -> SurfaceType {
    let mut ty = SurfaceType::new(&class.name, kind);
    for field in &class.fields {
        let member = if field.requires_selector() {
            Member::Selector {
                wire_name: field.wire_name.clone(),
                arguments: field.arguments.clone(),
                ty: field.ty.clone(),
            }
        } else {
            Member::Property {
                wire_name: field.wire_name.clone(),
                ty: field.ty.clone(),
            }
        };
        ty.members.insert(field.name.clone(), member);
    }
    ty
}

/// Rust variant name for an enum value: `IN_PROGRESS` -> `InProgress`.
pub fn variant_name(value: &str) -> String {
    let name = value.to_upper_camel_case();
    if name == "Self" {
        "Self_".to_string()
    } else {
        name
    }
}

/// Wire value assumed for an enum variant the surface does not know.
pub fn fallback_enum_value(variant: &str) -> String {
    variant.to_shouty_snake_case()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use indoc::indoc;

    const SCHEMA: &str = indoc! {r#"
        schema { query: Query }

        enum Role { ADMIN SUPER_USER }

        interface Figure { perimeter: Float! creator: Person }
        type Circle implements Figure { radius: Float! perimeter: Float! creator: Person }
        type Square implements Figure { side: Float! perimeter: Float! creator: Person }
        union Shape = Circle | Square

        type Person {
            firstName: String!
            role: Role
            tags: [String!]
            avatar(size: Int!): String
            friends: [Person!]!
        }

        type Query {
            me: Person
            figures: [Figure!]!
            shape: Shape
        }
    "#};

    fn surface() -> Surface {
        Surface::from_schema(&parse(SCHEMA).unwrap())
    }

    #[test]
    fn one_member_per_field() {
        let surface = surface();
        let person = surface.get("Person").unwrap();
        let names: Vec<&str> = person.members.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["first_name", "role", "tags", "avatar", "friends"]);
    }

    #[test]
    fn scalars_and_enums_are_properties() {
        let surface = surface();
        assert!(matches!(
            surface.member("Person", "first_name"),
            Some(Member::Property { wire_name, .. }) if wire_name == "firstName"
        ));
        assert!(matches!(surface.member("Person", "role"), Some(Member::Property { .. })));
        assert!(matches!(surface.member("Person", "tags"), Some(Member::Property { .. })));
    }

    #[test]
    fn arguments_force_a_selector_without_target() {
        let surface = surface();
        let avatar = surface.member("Person", "avatar").unwrap();
        assert!(matches!(avatar, Member::Selector { .. }));
        assert_eq!(avatar.arguments().len(), 1);
        assert_eq!(avatar.arguments()[0].graphql_type, "Int!");
        assert_eq!(avatar.target(), None);
    }

    #[test]
    fn selectors_compare_by_arguments() {
        let first = surface();
        let second = surface();
        assert_eq!(
            first.member("Person", "avatar"),
            second.member("Person", "avatar")
        );
        assert_ne!(
            first.member("Person", "avatar"),
            first.member("Person", "friends")
        );
    }

    #[test]
    fn object_fields_select_their_target() {
        let surface = surface();
        assert_eq!(surface.member("Query", "me").unwrap().target(), Some("Person"));
        assert_eq!(surface.member("Person", "friends").unwrap().target(), Some("Person"));
        assert_eq!(surface.member("Query", "shape").unwrap().target(), Some("Shape"));
    }

    #[test]
    fn polymorphic_types() {
        let surface = surface();
        assert!(surface.is_polymorphic("Shape"));
        assert!(surface.is_polymorphic("Figure"));
        assert!(!surface.is_polymorphic("Person"));
        assert_eq!(surface.get("Shape").unwrap().possible_types, vec!["Circle", "Square"]);
        assert_eq!(surface.get("Figure").unwrap().possible_types, vec!["Circle", "Square"]);
        assert!(surface.member("Figure", "creator").is_some());
    }

    #[test]
    fn enum_values_map_to_wire_names() {
        let surface = surface();
        assert!(surface.is_enum("Role"));
        assert_eq!(surface.enum_value("Role", "SuperUser"), Some("SUPER_USER"));
        assert_eq!(surface.enum_value("Role", "Missing"), None);
        assert_eq!(fallback_enum_value("SuperUser"), "SUPER_USER");
    }

    #[test]
    fn roots() {
        let surface = surface();
        assert_eq!(surface.query_type(), Some("Query"));
        assert_eq!(surface.mutation_type(), None);
    }
}
