//! HTTP transport used by the gateway.

use std::fmt;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use thiserror::Error;

use super::GatewayFuture;

/// Base URL of the Vultr v2 API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.vultr.com/v2";

/// Timeout applied to each individual attempt.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP method of an [`ApiRequest`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        })
    }
}

/// Request relative to the API base URL.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path below the base URL, starting with `/`.
    pub path: String,
    /// Optional JSON body.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Builds a `GET` request.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    /// Builds a `POST` request with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    /// Builds a `DELETE` request.
    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: None,
        }
    }
}

/// Completed HTTP exchange, whatever its status.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

/// Failure to complete an HTTP exchange.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TransportError {
    /// Raised when the HTTP client cannot be constructed.
    #[error("failed to build HTTP client: {message}")]
    Client {
        /// Error reported by the client builder.
        message: String,
    },
    /// Raised when no API token was supplied.
    #[error("API token is empty")]
    MissingToken,
    /// Raised when the attempt exceeded [`REQUEST_TIMEOUT`].
    #[error("{method} {path} timed out")]
    TimedOut {
        /// Request method.
        method: Method,
        /// Request path.
        path: String,
    },
    /// Raised for connection and protocol failures.
    #[error("{method} {path} failed: {message}")]
    Failed {
        /// Request method.
        method: Method,
        /// Request path.
        path: String,
        /// Error reported by the client.
        message: String,
    },
}

/// Sends authenticated requests and returns the raw exchange.
pub trait Transport {
    /// Performs one attempt of `request`.
    fn send<'a>(&'a self, request: &'a ApiRequest) -> GatewayFuture<'a, ApiResponse, TransportError>;
}

/// [`Transport`] backed by `reqwest` with bearer authentication.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl ReqwestTransport {
    /// Builds a transport for `base_url` authenticating with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::MissingToken`] when `token` is blank and
    /// [`TransportError::Client`] when the HTTP client cannot be built.
    pub fn new(base_url: &str, token: &str) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, token, REQUEST_TIMEOUT)
    }

    /// Builds a transport whose attempts time out after `timeout` instead of
    /// [`REQUEST_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Same as [`ReqwestTransport::new`].
    pub fn with_timeout(
        base_url: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let trimmed_token = token.trim();
        if trimmed_token.is_empty() {
            return Err(TransportError::MissingToken);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Client {
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_owned(),
            token: trimmed_token.to_owned(),
        })
    }

    /// Returns the base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn classify(request: &ApiRequest, err: &reqwest::Error) -> TransportError {
        if err.is_timeout() {
            return TransportError::TimedOut {
                method: request.method,
                path: request.path.clone(),
            };
        }
        TransportError::Failed {
            method: request.method,
            path: request.path.clone(),
            message: err.to_string(),
        }
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(&'a self, request: &'a ApiRequest) -> GatewayFuture<'a, ApiResponse, TransportError> {
        Box::pin(async move {
            let url = format!("{}{}", self.base_url, request.path);
            let mut builder = match request.method {
                Method::Get => self.client.get(url),
                Method::Post => self.client.post(url),
                Method::Delete => self.client.delete(url),
            }
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/json");
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|err| Self::classify(request, &err))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|err| Self::classify(request, &err))?;
            Ok(ApiResponse { status, body })
        })
    }
}
