//! Request structs.
//!
//! `#[zeroql::request(..)]` implements [`Request`] for a struct: the struct's
//! fields are the operation variables and its selection picks the result
//! out of the response root.

use serde::de::DeserializeOwned;

/// An operation compiled from a struct's selection.
pub trait Request {
    /// Root type the selection runs against, `Query` or `Mutation`.
    type Root: DeserializeOwned;
    type Output;

    /// Full operation text with every field declared as a variable.
    const OPERATION: &'static str;

    /// The struct's fields, keyed by variable name.
    fn variables(&self) -> serde_json::Value;

    fn select(&self, root: &Self::Root) -> Self::Output;
}
