//! Typed GraphQL for Rust.
//!
//! Selections are ordinary closures over a generated schema surface:
//!
//! ```ignore
//! let client = GraphQLClient::new("https://api.example.com/graphql");
//! let user_id = 42;
//! let name = zeroql::query!(client, |q| q.user(user_id, |u| u.first_name.clone()))
//!     .await?
//!     .into_data()?;
//! ```
//!
//! `query!` compiles the closure to
//! `query ($user_id: Int!) { user(id: $user_id) { firstName } }` while the
//! crate builds; at run time the response is deserialized into the
//! generated types and the same closure picks the result out of it.

pub mod client;
pub mod error;
pub mod operation;
pub mod polymorphic;
pub mod request;
pub mod transport;

pub use client::Client;
pub use error::{GraphQLError, ZeroQLError};
pub use operation::{GraphQLResponse, GraphQLResult, Operation};
pub use polymorphic::{GraphQLType, Polymorphic, Unit};
pub use request::Request;
pub use transport::{HttpTransport, Transport};
pub use zeroql_macros::{fragment, mutation, query, request};

// Generated code and macro expansions refer to these.
pub use serde;
pub use serde_json;
