//! Login, registration and logout.

use tracing::info;

use crate::backend::BackendClient;
use crate::error::ApiError;

/// Message shown when a login/registration failure carries no detail
pub const GENERIC_AUTH_FAILURE: &str = "An error occurred";

/// Acquires and drops the session
pub struct AuthFlow {
    client: BackendClient,
}

impl AuthFlow {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }

    /// Log in and store the session token
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        require_credentials(username, password)?;

        let token = self.client.login(username, password).await?;
        self.client.session().set(Some(token.access_token));
        info!("Logged in as {}", username);
        Ok(())
    }

    /// Create an account, then log straight in with the same credentials
    pub async fn register(&self, username: &str, password: &str) -> Result<(), ApiError> {
        require_credentials(username, password)?;

        self.client.register(username, password).await?;
        info!("Registered {}", username);
        self.login(username, password).await
    }

    pub fn logout(&self) {
        self.client.session().set(None);
        info!("Logged out");
    }

    /// Text to show for a failed login or registration
    pub fn failure_message(err: &ApiError) -> String {
        err.detail().unwrap_or(GENERIC_AUTH_FAILURE).to_string()
    }
}

fn require_credentials(username: &str, password: &str) -> Result<(), ApiError> {
    if username.trim().is_empty() {
        return Err(ApiError::InvalidInput("username is required".to_string()));
    }
    if password.is_empty() {
        return Err(ApiError::InvalidInput("password is required".to_string()));
    }
    Ok(())
}
