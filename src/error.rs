//! Error taxonomy for calls against the trading backend.

use thiserror::Error;

/// Coarse failure class, used to decide how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Session rejected: invalidate and redirect, no message.
    Authorization,
    /// Request understood but refused: transient message with server detail.
    Validation,
    /// Backend unreachable or answered garbage: logged, generic message.
    Transport,
}

/// Errors returned by backend calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend rejected the session (HTTP 401).
    #[error("not authenticated: {}", detail.as_deref().unwrap_or("session rejected"))]
    Unauthorized { detail: Option<String> },

    /// Any other non-success status.
    #[error("request rejected ({status}): {}", detail.as_deref().unwrap_or("no detail"))]
    Rejected { status: u16, detail: Option<String> },

    /// Network failure or unreachable backend.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A success response whose body could not be parsed.
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// Input refused before any request was sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Unauthorized { .. } => ErrorClass::Authorization,
            Self::Rejected { .. } | Self::InvalidInput(_) => ErrorClass::Validation,
            Self::Transport(_) | Self::Decode { .. } => ErrorClass::Transport,
        }
    }

    pub fn is_authorization(&self) -> bool {
        self.class() == ErrorClass::Authorization
    }

    /// Server-supplied detail text, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { detail } | Self::Rejected { detail, .. } => detail.as_deref(),
            Self::InvalidInput(reason) => Some(reason),
            Self::Transport(_) | Self::Decode { .. } => None,
        }
    }

    /// Build the error for a non-success status and its raw body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = extract_detail(body);
        if status == 401 {
            Self::Unauthorized { detail }
        } else {
            Self::Rejected { status, detail }
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Pull `detail` out of a `{"detail": ...}` error body.
///
/// String details are returned as-is; structured details (validation error
/// lists) are returned as their JSON text.
pub fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_string_detail() {
        let body = r#"{"detail":"API Key and Secret must be set first"}"#;
        assert_eq!(
            extract_detail(body).as_deref(),
            Some("API Key and Secret must be set first")
        );
    }

    #[test]
    fn test_extract_structured_detail() {
        let body = r#"{"detail":[{"loc":["query","num_lots"],"msg":"value is not a valid integer"}]}"#;
        let detail = extract_detail(body).unwrap();
        assert!(detail.contains("num_lots"));
    }

    #[test]
    fn test_extract_detail_missing() {
        assert_eq!(extract_detail("Internal Server Error"), None);
        assert_eq!(extract_detail(r#"{"error":"x"}"#), None);
        assert_eq!(extract_detail(r#"{"detail":null}"#), None);
    }

    #[test]
    fn test_status_classification() {
        let err = ApiError::from_status(401, r#"{"detail":"Invalid authentication credentials"}"#);
        assert_eq!(err.class(), ErrorClass::Authorization);
        assert_eq!(err.detail(), Some("Invalid authentication credentials"));

        let err = ApiError::from_status(400, r#"{"detail":"Token is invalid or has expired"}"#);
        assert_eq!(err.class(), ErrorClass::Validation);

        let err = ApiError::from_status(500, "");
        assert!(matches!(err, ApiError::Rejected { status: 500, detail: None }));
    }

    #[test]
    fn test_transport_class() {
        let err = ApiError::Transport("connection refused".to_string());
        assert_eq!(err.class(), ErrorClass::Transport);
        assert_eq!(err.detail(), None);
    }
}
