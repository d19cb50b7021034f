//! Sending operations to a GraphQL server.

use crate::error::ZeroQLError;
use crate::operation::{GraphQLResponse, Operation};
use async_trait::async_trait;

/// Delivers an operation and returns the raw response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, operation: &Operation) -> Result<GraphQLResponse, ZeroQLError>;
}

/// GraphQL over HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            token: None,
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Use a preconfigured reqwest client (timeouts, proxies, default headers).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, operation: &Operation) -> Result<GraphQLResponse, ZeroQLError> {
        tracing::debug!(url = %self.url, query = operation.text, "sending operation");

        let mut request = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("User-Agent", format!("zeroql/{}", env!("CARGO_PKG_VERSION")))
            .json(operation);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if status == 401 {
            let text = response.text().await.unwrap_or_default();
            return Err(ZeroQLError::Authentication(text));
        }
        if status == 403 {
            let text = response.text().await.unwrap_or_default();
            return Err(ZeroQLError::Forbidden(text));
        }
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok());
            let text = response.text().await.unwrap_or_default();
            return Err(ZeroQLError::RateLimited {
                retry_after,
                message: text,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ZeroQLError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}
