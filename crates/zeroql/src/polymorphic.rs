//! Runtime support for generated types.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use std::ops::Deref;

/// Implemented by every generated object type.
pub trait GraphQLType {
    /// Name of the type in the schema, as reported by `__typename`.
    const TYPE_NAME: &'static str;
}

/// Root type for an operation kind the schema does not declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {}

/// A value of an interface or union type.
///
/// Derefs to the fields shared by every possible type. Fields of a concrete
/// type are reached by narrowing with [`Polymorphic::on`].
#[derive(Debug, Clone, Default)]
pub struct Polymorphic<T> {
    typename: String,
    fields: T,
    raw: serde_json::Value,
}

impl<T> Polymorphic<T> {
    /// The concrete type of this value.
    pub fn typename(&self) -> &str {
        &self.typename
    }

    /// Apply `selector` when this value is a `U`.
    ///
    /// ```ignore
    /// let radius = shape.on(|c: &Circle| c.radius);
    /// ```
    pub fn on<U, R>(&self, selector: impl FnOnce(&U) -> R) -> Option<R>
    where
        U: GraphQLType + DeserializeOwned,
    {
        if self.typename != U::TYPE_NAME {
            return None;
        }
        match U::deserialize(&self.raw) {
            Ok(value) => Some(selector(&value)),
            Err(e) => {
                tracing::warn!(typename = %self.typename, "cannot read narrowed value: {}", e);
                None
            }
        }
    }
}

impl<T> Deref for Polymorphic<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.fields
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Polymorphic<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        let typename = raw
            .get("__typename")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        let fields = T::deserialize(&raw).map_err(D::Error::custom)?;
        Ok(Self {
            typename,
            fields,
            raw,
        })
    }
}
