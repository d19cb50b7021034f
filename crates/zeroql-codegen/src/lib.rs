//! Code generation for zeroql.
//!
//! [`emit::generate`] turns a parsed schema into the typed selector surface
//! that selection closures are written against. The `zeroql-codegen` binary
//! wraps it, and also compiles the `query!`/`mutation!` sites of a set of
//! source files into a JSON listing of operations.

pub mod emit;

pub use emit::{generate, GenerateOptions};
