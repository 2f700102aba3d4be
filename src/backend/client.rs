//! Backend API Client
//!
//! Typed calls for every backend endpoint. Attaches the session's bearer token
//! and invalidates the session on any 401, whichever call received it, as
//! long as the rejected token is still the current one.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

use super::models::*;
use super::transport::{ApiRequest, Transport};
use crate::dashboard::state::{EditableConfig, RequestToken};
use crate::error::ApiError;
use crate::session::SessionStore;

/// Backend client bound to one session
#[derive(Clone)]
pub struct BackendClient {
    transport: Arc<dyn Transport>,
    session: SessionStore,
}

impl BackendClient {
    pub fn new(transport: Arc<dyn Transport>, session: SessionStore) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Send a request and classify the response.
    ///
    /// A 401 clears the session before the error is returned.
    async fn execute(&self, mut request: ApiRequest) -> Result<String, ApiError> {
        let sent = self.session.get();
        request.bearer = sent.clone();
        let label = request.label();

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("{} failed: {}", label, e);
                return Err(e);
            }
        };

        if response.is_success() {
            debug!("{} -> {}", label, response.status);
            return Ok(response.body);
        }

        let err = ApiError::from_status(response.status, &response.body);
        if err.is_authorization() {
            self.session.invalidate_if(sent.as_deref());
        } else {
            debug!("{} rejected: {}", label, err);
        }
        Err(err)
    }

    async fn execute_json<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ApiError> {
        let endpoint = request.label();
        let body = self.execute(request).await?;
        serde_json::from_str(&body).map_err(|source| ApiError::Decode { endpoint, source })
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Exchange username/password for a session token
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let request =
            ApiRequest::post("/token").form(&[("username", username), ("password", password)]);
        self.execute_json(request).await
    }

    /// Create an account
    pub async fn register(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let body = serde_json::to_value(RegisterRequest {
            username: username.to_string(),
            password: password.to_string(),
        })
        .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
        self.execute(ApiRequest::post("/register").json(body)).await?;
        Ok(())
    }

    // ========================================================================
    // Profile and configuration
    // ========================================================================

    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        self.execute_json(ApiRequest::get("/users/me")).await
    }

    /// Save broker credentials and lot size
    pub async fn update_credentials(&self, config: &EditableConfig) -> Result<(), ApiError> {
        let request = ApiRequest::post("/update_credentials")
            .query("api_key", &config.api_key)
            .query("api_secret", &config.api_secret)
            .query("num_lots", config.num_lots);
        self.execute(request).await?;
        Ok(())
    }

    /// Exchange a venue request token for a fresh access token
    pub async fn generate_token(&self, request_token: &RequestToken) -> Result<(), ApiError> {
        let request =
            ApiRequest::post("/generate_token").query("request_token", request_token.as_str());
        self.execute(request).await?;
        Ok(())
    }

    /// Enable or disable the trading process
    pub async fn toggle_trading(&self, enabled: bool) -> Result<(), ApiError> {
        let request = ApiRequest::post("/toggle_trading").query("status", enabled);
        self.execute(request).await?;
        Ok(())
    }

    // ========================================================================
    // Trades
    // ========================================================================

    pub async fn trades(&self) -> Result<Vec<Trade>, ApiError> {
        self.execute_json(ApiRequest::get("/trades")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockTransport;
    use crate::backend::transport::RequestBody;
    use crate::dashboard::state::NumLots;
    use crate::session::MemoryTokenStorage;
    use serde_json::json;

    fn client_with(token: Option<&str>) -> (BackendClient, Arc<MockTransport>) {
        let storage = match token {
            Some(t) => MemoryTokenStorage::with_token(t),
            None => MemoryTokenStorage::new(),
        };
        let session = SessionStore::open(storage).unwrap();
        let mock = Arc::new(MockTransport::new());
        (BackendClient::new(mock.clone(), session), mock)
    }

    #[tokio::test]
    async fn test_bearer_attached_when_present() {
        let (client, mock) = client_with(Some("alice"));
        mock.always("GET /trades", 200, json!([]));

        client.trades().await.unwrap();

        let sent = mock.requests();
        assert_eq!(sent[0].bearer.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_no_bearer_without_session() {
        let (client, mock) = client_with(None);
        mock.always("GET /users/me", 401, json!({"detail": "Not authenticated"}));

        let err = client.profile().await.unwrap_err();

        assert!(err.is_authorization());
        assert_eq!(mock.requests()[0].bearer, None);
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session() {
        for path in ["GET /users/me", "GET /trades", "POST /toggle_trading"] {
            let (client, mock) = client_with(Some("alice"));
            mock.always(path, 401, json!({"detail": "Invalid authentication credentials"}));

            let result = match path {
                "GET /users/me" => client.profile().await.map(|_| ()),
                "GET /trades" => client.trades().await.map(|_| ()),
                _ => client.toggle_trading(true).await,
            };

            assert!(result.unwrap_err().is_authorization(), "{}", path);
            assert!(!client.session().is_authenticated(), "{}", path);
        }
    }

    #[tokio::test]
    async fn test_stale_unauthorized_keeps_newer_session() {
        let (client, mock) = client_with(Some("old"));
        let release = mock.gated(
            "POST /toggle_trading",
            401,
            json!({"detail": "Invalid authentication credentials"}),
        );

        let in_flight = tokio::spawn({
            let client = client.clone();
            async move { client.toggle_trading(true).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(mock.requests()[0].bearer.as_deref(), Some("old"));

        client.session().set(None);
        client.session().set(Some("fresh".to_string()));
        release.send(()).unwrap();

        let err = in_flight.await.unwrap().unwrap_err();
        assert!(err.is_authorization());
        assert_eq!(client.session().get().as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_rejection_keeps_session() {
        let (client, mock) = client_with(Some("alice"));
        mock.always(
            "POST /generate_token",
            400,
            json!({"detail": "API Key and Secret must be set first"}),
        );

        let token = RequestToken::parse("req123").unwrap();
        let err = client.generate_token(&token).await.unwrap_err();

        assert_eq!(err.detail(), Some("API Key and Secret must be set first"));
        assert!(client.session().is_authenticated());
        assert_eq!(mock.requests()[0].query_value("request_token"), Some("req123"));
    }

    #[tokio::test]
    async fn test_login_sends_form_fields() {
        let (client, mock) = client_with(None);
        mock.always("POST /token", 200, json!({"access_token": "alice", "token_type": "bearer"}));

        let token = client.login("alice", "secret").await.unwrap();

        assert_eq!(token.access_token, "alice");
        match &mock.requests()[0].body {
            RequestBody::Form(fields) => {
                assert!(fields.contains(&("username".to_string(), "alice".to_string())));
                assert!(fields.contains(&("password".to_string(), "secret".to_string())));
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_credentials_query() {
        let (client, mock) = client_with(Some("alice"));
        mock.always("POST /update_credentials", 200, json!({"id": 1}));

        let config = EditableConfig {
            api_key: "k".to_string(),
            api_secret: "s".to_string(),
            num_lots: NumLots::new(3).unwrap(),
        };
        client.update_credentials(&config).await.unwrap();

        let sent = &mock.requests()[0];
        assert_eq!(sent.query_value("api_key"), Some("k"));
        assert_eq!(sent.query_value("api_secret"), Some("s"));
        assert_eq!(sent.query_value("num_lots"), Some("3"));
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_session() {
        let (client, mock) = client_with(Some("alice"));
        mock.fail_always("GET /trades", "connection refused");

        let err = client.trades().await.unwrap_err();

        assert!(matches!(err, ApiError::Transport(_)));
        assert!(client.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let (client, mock) = client_with(Some("alice"));
        mock.always_raw("GET /trades", 200, "<html>");

        let err = client.trades().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}
