//! Request transport
//!
//! The client core only ever issues [`ApiRequest`]s through the [`Transport`]
//! trait; [`HttpTransport`] is the reqwest-backed implementation.

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::debug;

use crate::error::ApiError;

/// Body of an outgoing request
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    /// `application/x-www-form-urlencoded` fields
    Form(Vec<(String, String)>),
    Json(serde_json::Value),
}

/// A transport-independent request against the backend API
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, e.g. `/users/me`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    /// Bearer token, attached by the client from the session
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: Vec::new(),
            body: RequestBody::Empty,
            bearer: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        self.body = RequestBody::Form(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = RequestBody::Json(value);
        self
    }

    /// Value of a query parameter, if present
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Short `METHOD /path` label for logs and routing
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Raw response: status code and body text
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests to the backend.
///
/// Implementations only fail with [`ApiError::Transport`]; HTTP error statuses
/// are returned as ordinary responses and classified by the client.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport rooted at `base_url` (e.g. `http://localhost:8000/api`)
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        debug!("{} {}{}", request.method, self.base_url, request.path);

        let mut builder = self
            .client
            .request(request.method.clone(), format!("{}{}", self.base_url, request.path))
            .header("Accept", "application/json");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Json(value) => builder.json(&value),
        };

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = ApiRequest::post("/toggle_trading").query("status", true);
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.query_value("status"), Some("true"));
        assert_eq!(req.body, RequestBody::Empty);
        assert_eq!(req.label(), "POST /toggle_trading");
    }

    #[test]
    fn test_form_body() {
        let req = ApiRequest::post("/token").form(&[("username", "alice"), ("password", "pw")]);
        match req.body {
            RequestBody::Form(fields) => {
                assert_eq!(fields[0], ("username".to_string(), "alice".to_string()));
                assert_eq!(fields.len(), 2);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_success_range() {
        assert!(ApiResponse { status: 200, body: String::new() }.is_success());
        assert!(ApiResponse { status: 204, body: String::new() }.is_success());
        assert!(!ApiResponse { status: 401, body: String::new() }.is_success());
    }
}
