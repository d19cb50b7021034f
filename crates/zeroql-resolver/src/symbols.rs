//! What the resolver needs to know about the program around a selection.
//!
//! The resolver never inspects types itself. It asks a [`SymbolResolver`]
//! what a node refers to and reads the tags attached to generated members.

use crate::syntax::{Expr, FnDecl};
use std::sync::Arc;

/// Metadata attached to generated members and user functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    /// Maps a member to its wire field name.
    FieldSelector { name: String },
    /// A fragment whose declaration can be walked.
    Fragment,
    /// A fragment precompiled into a body template with `{{param}}`
    /// placeholders.
    FragmentTemplate(String),
    /// Built-in syntax, currently only type narrowing.
    Syntax,
    /// The type is an interface or union.
    UnionInterface,
}

pub fn field_selector(tags: &[Tag]) -> Option<&str> {
    tags.iter().find_map(|t| match t {
        Tag::FieldSelector { name } => Some(name.as_str()),
        _ => None,
    })
}

pub fn template(tags: &[Tag]) -> Option<&str> {
    tags.iter().find_map(|t| match t {
        Tag::FragmentTemplate(body) => Some(body.as_str()),
        _ => None,
    })
}

/// A declared parameter of a selector or fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSymbol {
    pub name: String,
    /// GraphQL type used when an argument bound to this parameter becomes
    /// an operation variable.
    pub graphql_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    pub name: String,
    pub is_enum: bool,
    pub tags: Vec<Tag>,
}

impl TypeInfo {
    pub fn is_polymorphic(&self) -> bool {
        self.tags.contains(&Tag::UnionInterface)
    }
}

#[derive(Debug, Clone)]
pub struct MethodSymbol {
    pub name: String,
    /// Field arguments (or fragment parameters after the root), in order.
    pub parameters: Vec<ParameterSymbol>,
    /// Whether a trailing transform closure follows the arguments.
    pub has_selector: bool,
    /// The type the trailing transform selects from.
    pub selector_target: Option<TypeInfo>,
    pub type_arguments: Vec<String>,
    pub tags: Vec<Tag>,
    /// Declaration of a fragment invoked in method form.
    pub declaration: Option<Arc<FnDecl>>,
}

#[derive(Debug, Clone)]
pub struct FunctionSymbol {
    pub name: String,
    /// Parameters after the selection root.
    pub parameters: Vec<ParameterSymbol>,
    pub tags: Vec<Tag>,
    pub declaration: Option<Arc<FnDecl>>,
}

#[derive(Debug, Clone)]
pub enum Symbol {
    /// A generated property.
    Member { name: String, tags: Vec<Tag> },
    Method(MethodSymbol),
    /// A free function: a helper or a fragment.
    Function(FunctionSymbol),
    Local { name: String },
    Parameter { name: String },
    /// Instance or static state: `self`, struct fields, `CONSTANTS`.
    State { name: String },
    EnumMember { variant: String, tags: Vec<Tag> },
    /// A type or variant constructor: `Some`, `None`, `UserModel`.
    Constructor { name: String },
    /// A property of the variables object passed to a two-parameter
    /// selection.
    VariablesProperty { name: String, graphql_type: String },
}

/// Answers symbol and type questions about nodes of a selection.
///
/// Implementations must be able to answer for every node the resolver may
/// visit, including nodes of helper and fragment declarations the
/// selection references.
pub trait SymbolResolver: Send + Sync {
    fn symbol(&self, node: &Expr) -> Option<Symbol>;
    fn type_of(&self, node: &Expr) -> Option<TypeInfo>;
}
