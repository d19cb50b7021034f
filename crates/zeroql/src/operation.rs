//! Compiled operations and their results.

use crate::error::{GraphQLError, ZeroQLError};
use serde::{Deserialize, Serialize};

/// A query or mutation as produced by `query!` / `mutation!`: the finished
/// document text and the values of its variables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    #[serde(rename = "query")]
    pub text: &'static str,
    pub variables: serde_json::Value,
}

impl Operation {
    pub fn query(text: &'static str, variables: serde_json::Value) -> Self {
        Self { text, variables }
    }

    pub fn mutation(text: &'static str, variables: serde_json::Value) -> Self {
        Self { text, variables }
    }
}

/// Raw GraphQL response shape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQLError>>,
    #[serde(default)]
    pub extensions: Option<serde_json::Value>,
}

/// Outcome of an executed operation. `data` is the selection's return value;
/// it is `None` when the server returned no data.
#[derive(Debug, Clone)]
pub struct GraphQLResult<T> {
    pub query: &'static str,
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLError>>,
    pub extensions: Option<serde_json::Value>,
}

impl<T> GraphQLResult<T> {
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }

    /// The data, or the server's errors when there are any.
    pub fn into_data(self) -> Result<T, ZeroQLError> {
        if let Some(errors) = self.errors.filter(|e| !e.is_empty()) {
            return Err(ZeroQLError::GraphQL {
                errors,
                query: self.query.to_string(),
            });
        }
        self.data
            .ok_or_else(|| ZeroQLError::MissingData("No data in response".to_string()))
    }
}
