//! The typed client.
//!
//! A generated schema module declares `type GraphQLClient<T> = Client<Query,
//! Mutation, T>`. Operations come from `query!` and `mutation!`, which
//! expand to calls of [`Client::query`] and [`Client::mutation`] with the
//! compiled document and the original selection closure. Request structs
//! run through [`Client::request`].

use crate::error::ZeroQLError;
use crate::operation::{GraphQLResult, Operation};
use crate::polymorphic::Unit;
use crate::request::Request;
use crate::transport::{HttpTransport, Transport};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Client for a schema with query root `Q` and mutation root `M`.
pub struct Client<Q, M = Unit, T = HttpTransport> {
    transport: T,
    roots: PhantomData<fn() -> (Q, M)>,
}

impl<Q, M> Client<Q, M, HttpTransport> {
    /// Client talking to the GraphQL endpoint at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_transport(HttpTransport::new(url))
    }
}

impl<Q, M, T> Client<Q, M, T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            roots: PhantomData,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<Q, M, T: Clone> Clone for Client<Q, M, T> {
    fn clone(&self) -> Self {
        Self::with_transport(self.transport.clone())
    }
}

impl<Q, M, T: std::fmt::Debug> std::fmt::Debug for Client<Q, M, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("transport", &self.transport)
            .finish()
    }
}

impl<Q, M, T> Client<Q, M, T>
where
    Q: DeserializeOwned,
    M: DeserializeOwned,
    T: Transport,
{
    /// Run a query and apply `selector` to its data.
    pub async fn query<R>(
        &self,
        operation: Operation,
        selector: impl FnOnce(&Q) -> R,
    ) -> Result<GraphQLResult<R>, ZeroQLError> {
        self.execute(operation, selector).await
    }

    /// Run a mutation and apply `selector` to its data.
    pub async fn mutation<R>(
        &self,
        operation: Operation,
        selector: impl FnOnce(&M) -> R,
    ) -> Result<GraphQLResult<R>, ZeroQLError> {
        self.execute(operation, selector).await
    }

    /// Run a request struct and apply its selection to the data.
    pub async fn request<R: Request>(
        &self,
        request: &R,
    ) -> Result<GraphQLResult<R::Output>, ZeroQLError> {
        let operation = Operation {
            text: R::OPERATION,
            variables: request.variables(),
        };
        self.execute(operation, |root: &R::Root| request.select(root)).await
    }

    async fn execute<Root: DeserializeOwned, R>(
        &self,
        operation: Operation,
        selector: impl FnOnce(&Root) -> R,
    ) -> Result<GraphQLResult<R>, ZeroQLError> {
        let response = self.transport.send(&operation).await?;

        let data = match response.data {
            None | Some(serde_json::Value::Null) => None,
            Some(value) => {
                let root: Root = serde_json::from_value(value).map_err(|e| {
                    ZeroQLError::MissingData(format!("Failed to deserialize response: {}", e))
                })?;
                Some(selector(&root))
            }
        };

        if let Some(errors) = response.errors.as_ref().filter(|e| !e.is_empty()) {
            tracing::debug!(errors = errors.len(), query = operation.text, "operation returned errors");
        }

        Ok(GraphQLResult {
            query: operation.text,
            data,
            errors: response.errors,
            extensions: response.extensions,
        })
    }
}
