//! GraphQL schema model for zeroql.
//!
//! [`parser::parse`] turns SDL into a normalized [`parser::Schema`];
//! [`surface::Surface`] derives from it the metadata of the generated
//! selector surface, which the query resolver consults.

pub mod parser;
pub mod surface;

pub use parser::{
    parse, ArgumentDefinition, ClassDefinition, FieldDefinition, Schema, SchemaError,
    TypeDefinition, TypeKind,
};
pub use surface::{Member, Surface, SurfaceKind, SurfaceType};
