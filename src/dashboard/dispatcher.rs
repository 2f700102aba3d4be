//! Operator actions
//!
//! Each action sends one mutating request, reports the outcome as a
//! transient message and, on success, forces an immediate refresh.

use std::sync::Arc;
use tracing::info;

use super::config_state::ConfigState;
use super::feedback::{with_detail, Feedback};
use super::state::{NumLots, RefreshSequence, RequestToken, SharedLiveView};
use crate::backend::BackendClient;
use crate::error::ApiError;

pub const TOKEN_SUCCESS: &str = "Token generated successfully";
pub const TRADING_STARTED: &str = "Trading started";
pub const TRADING_STOPPED: &str = "Trading stopped";

pub struct ActionDispatcher {
    client: BackendClient,
    config: Arc<ConfigState>,
    live: SharedLiveView,
    sequence: RefreshSequence,
    feedback: Feedback,
}

impl ActionDispatcher {
    pub fn new(
        client: BackendClient,
        config: Arc<ConfigState>,
        live: SharedLiveView,
        sequence: RefreshSequence,
        feedback: Feedback,
    ) -> Self {
        Self {
            client,
            config,
            live,
            sequence,
            feedback,
        }
    }

    /// Save broker credentials and lot size
    pub async fn update_credentials(
        &self,
        api_key: String,
        api_secret: String,
        num_lots: NumLots,
    ) -> Result<(), ApiError> {
        self.config.save(api_key, api_secret, num_lots).await
    }

    /// Exchange a pasted request token for a fresh venue access token
    pub async fn generate_token(&self, request_token: &str) -> Result<(), ApiError> {
        let result = match RequestToken::parse(request_token) {
            Ok(token) => self.client.generate_token(&token).await,
            Err(e) => Err(e),
        };
        self.feedback.settle(result, TOKEN_SUCCESS, |e| {
            with_detail("Error generating token", e)
        })
    }

    /// Flip the trading process and return the state that was requested.
    ///
    /// The requested state is fixed before the request is sent: the negation
    /// of the last requested state if a previous toggle is still unconfirmed,
    /// else of the reported status.
    pub async fn toggle_trading(&self) -> Result<bool, ApiError> {
        let intent = self
            .live
            .write()
            .await
            .toggle_intent(self.sequence.current());

        let (desired, result) = match intent {
            Some(desired) => {
                info!(
                    "Requesting trading {}",
                    if desired { "start" } else { "stop" }
                );
                let result = self.client.toggle_trading(desired).await;
                if result.is_err() {
                    self.live.write().await.abandon_intent(desired);
                }
                (desired, result)
            }
            None => (
                false,
                Err(ApiError::InvalidInput(
                    "trading status not loaded yet".to_string(),
                )),
            ),
        };

        let success = if desired { TRADING_STARTED } else { TRADING_STOPPED };
        self.feedback
            .settle(result, success, |e| with_detail("Error toggling trading", e))?;
        Ok(desired)
    }

    /// Request an explicit trading state
    pub async fn set_trading(&self, enabled: bool) -> Result<(), ApiError> {
        let result = self.client.toggle_trading(enabled).await;
        let success = if enabled { TRADING_STARTED } else { TRADING_STOPPED };
        self.feedback
            .settle(result, success, |e| with_detail("Error toggling trading", e))
    }

    /// Wait for the refresh forced by the latest successful action
    pub async fn settled(&self) {
        self.feedback.settled().await;
    }
}
