//! Compile-time translation of typed selection closures into GraphQL.
//!
//! A selection such as `|q| q.user(id, |u| u.first_name.clone())` is parsed
//! with `syn`, bound against the generated selector [`Surface`](zeroql_schema::Surface)
//! by [`host::SemanticModel`], and translated by [`resolver::resolve`] into
//! `($id: Int!) { user(id: $id) { firstName } }` plus its variables.
//!
//! [`program::Program`] compiles whole sets of source files, sharing
//! fragments between them.

pub mod context;
pub mod diagnostic;
pub mod fragment;
pub mod host;
pub mod invocation;
pub mod program;
pub mod resolver;
pub mod symbols;
pub mod syntax;
pub mod variable;

pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use host::{FragmentTemplate, Scope, SemanticModel};
pub use invocation::{Invocation, OperationKind, RequestArgs};
pub use program::{Artifact, CompileOutput, Program, RequestStruct, Unit};
pub use resolver::{resolve, resolve_fragment_template, resolve_request, ResolvedQuery};
pub use symbols::{Symbol, SymbolResolver, Tag};
pub use variable::{GraphQLQueryVariable, VariableSet, VariableValue};
