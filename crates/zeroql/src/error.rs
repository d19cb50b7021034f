//! Error types for the zeroql runtime.
//!
//! [`ZeroQLError`] covers transport failures: authentication, rate limiting,
//! non-2xx responses and undecodable payloads. GraphQL errors reported by the
//! server travel inside [`GraphQLResult`](crate::GraphQLResult) and only
//! become a [`ZeroQLError::GraphQL`] when the caller asks for the data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single GraphQL error from a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default)]
    pub path: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub extensions: Option<serde_json::Value>,
}

/// Errors that can occur while executing an operation.
#[derive(Debug)]
pub enum ZeroQLError {
    /// The server rejected the credentials (HTTP 401).
    Authentication(String),
    /// The credentials lack permission (HTTP 403).
    Forbidden(String),
    /// Request was rate-limited (HTTP 429).
    RateLimited {
        retry_after: Option<f64>,
        message: String,
    },
    /// Network or HTTP transport error.
    Network(reqwest::Error),
    /// Non-2xx HTTP response not covered by a more specific variant.
    HttpError { status: u16, body: String },
    /// GraphQL errors returned by the server.
    GraphQL {
        errors: Vec<GraphQLError>,
        query: String,
    },
    /// The response carried no data, or data that does not fit the schema.
    MissingData(String),
}

impl fmt::Display for ZeroQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication(msg) => write!(f, "Authentication error: {}", msg),
            Self::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            Self::RateLimited { message, .. } => write!(f, "Rate limited: {}", message),
            Self::Network(e) => write!(f, "Network error: {}", e),
            Self::HttpError { status, body } => write!(f, "HTTP error {}: {}", status, body),
            Self::GraphQL { errors, .. } => {
                let msgs: Vec<String> = errors
                    .iter()
                    .map(|e| {
                        let mut parts = vec![e.message.clone()];
                        if let Some(path) = &e.path {
                            let path: Vec<String> = path.iter().map(|p| p.to_string()).collect();
                            parts.push(format!("at {}", path.join(".")));
                        }
                        if let Some(ext) = &e.extensions {
                            parts.push(format!("({})", ext));
                        }
                        parts.join(" ")
                    })
                    .collect();
                write!(f, "GraphQL errors: {}", msgs.join("; "))
            }
            Self::MissingData(msg) => write!(f, "Missing data: {}", msg),
        }
    }
}

impl std::error::Error for ZeroQLError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Network(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ZeroQLError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e)
    }
}
