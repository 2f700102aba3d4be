//! Operator-editable configuration
//!
//! Seeded once from the profile when the dashboard mounts. After that only
//! operator edits and successful saves change it; status refreshes never do.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::feedback::Feedback;
use super::state::{EditableConfig, LiveStatus, NumLots, RefreshSequence, SharedLiveView};
use crate::backend::BackendClient;
use crate::error::ApiError;

pub const SAVE_SUCCESS: &str = "Credentials updated successfully";
pub const SAVE_FAILURE: &str = "Error updating credentials";

pub struct ConfigState {
    client: BackendClient,
    editable: RwLock<EditableConfig>,
    loaded: AtomicBool,
    /// Set only once the profile has actually been applied
    seeded: AtomicBool,
    live: SharedLiveView,
    sequence: RefreshSequence,
    feedback: Feedback,
}

impl ConfigState {
    pub fn new(
        client: BackendClient,
        live: SharedLiveView,
        sequence: RefreshSequence,
        feedback: Feedback,
    ) -> Self {
        Self {
            client,
            editable: RwLock::new(EditableConfig::default()),
            loaded: AtomicBool::new(false),
            seeded: AtomicBool::new(false),
            live,
            sequence,
            feedback,
        }
    }

    /// Seed editable fields (and a first status copy) from the profile.
    ///
    /// Only the first call fetches; later calls are no-ops.
    pub async fn load(&self) -> Result<(), ApiError> {
        if self.loaded.swap(true, Ordering::SeqCst) {
            debug!("Configuration already loaded");
            return Ok(());
        }

        let ticket = self.sequence.next();
        let profile = self.client.profile().await?;

        *self.editable.write().await = EditableConfig::from_profile(&profile);
        self.seeded.store(true, Ordering::SeqCst);
        self.live
            .write()
            .await
            .apply_status(ticket, LiveStatus::from_profile(&profile));

        info!("Loaded configuration for {}", profile.username);
        Ok(())
    }

    /// Whether the editable fields hold the server's values
    pub fn is_loaded(&self) -> bool {
        self.seeded.load(Ordering::SeqCst)
    }

    pub async fn current(&self) -> EditableConfig {
        self.editable.read().await.clone()
    }

    /// Complete a partial edit from the loaded values.
    ///
    /// Refused while the fields were never seeded: filling gaps from
    /// defaults would overwrite the stored credentials with empty strings.
    pub async fn merge_edits(
        &self,
        api_key: Option<String>,
        api_secret: Option<String>,
        num_lots: Option<NumLots>,
    ) -> Result<EditableConfig, ApiError> {
        match (api_key, api_secret, num_lots) {
            (Some(api_key), Some(api_secret), Some(num_lots)) => Ok(EditableConfig {
                api_key,
                api_secret,
                num_lots,
            }),
            _ if !self.is_loaded() => Err(ApiError::InvalidInput(
                "current configuration is not loaded; supply API key, secret and lot size"
                    .to_string(),
            )),
            (api_key, api_secret, num_lots) => {
                let current = self.current().await;
                Ok(EditableConfig {
                    api_key: api_key.unwrap_or(current.api_key),
                    api_secret: api_secret.unwrap_or(current.api_secret),
                    num_lots: num_lots.unwrap_or(current.num_lots),
                })
            }
        }
    }

    pub async fn set_api_key(&self, api_key: impl Into<String>) {
        self.editable.write().await.api_key = api_key.into();
    }

    pub async fn set_api_secret(&self, api_secret: impl Into<String>) {
        self.editable.write().await.api_secret = api_secret.into();
    }

    pub async fn set_num_lots(&self, num_lots: NumLots) {
        self.editable.write().await.num_lots = num_lots;
    }

    /// Send the three values to the backend.
    ///
    /// On success the local fields take the saved values and a refresh is
    /// forced. On failure local fields are left exactly as they are.
    pub async fn save(
        &self,
        api_key: String,
        api_secret: String,
        num_lots: NumLots,
    ) -> Result<(), ApiError> {
        let candidate = EditableConfig {
            api_key,
            api_secret,
            num_lots,
        };

        let result = self.client.update_credentials(&candidate).await;
        if result.is_ok() {
            *self.editable.write().await = candidate;
        }

        self.feedback
            .settle(result, SAVE_SUCCESS, |_| SAVE_FAILURE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockTransport;
    use crate::dashboard::notice::{NoticeBoard, NoticeLevel};
    use crate::dashboard::poller::StatusPoller;
    use crate::dashboard::state::LiveView;
    use crate::session::{MemoryTokenStorage, SessionStore};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    struct Fixture {
        config: ConfigState,
        poller: StatusPoller,
        live: SharedLiveView,
        notices: NoticeBoard,
        session: SessionStore,
        mock: Arc<MockTransport>,
    }

    fn fixture() -> Fixture {
        let session = SessionStore::open(MemoryTokenStorage::with_token("alice")).unwrap();
        let mock = Arc::new(MockTransport::new());
        let client = BackendClient::new(mock.clone(), session.clone());
        let live = LiveView::shared();
        let sequence = RefreshSequence::new();
        let poller = StatusPoller::new(
            client.clone(),
            live.clone(),
            sequence.clone(),
            CancellationToken::new(),
        );
        let notices = NoticeBoard::new(Duration::from_secs(60));
        let feedback = Feedback::new(notices.clone(), poller.refresher());
        let config = ConfigState::new(client, live.clone(), sequence, feedback);
        Fixture {
            config,
            poller,
            live,
            notices,
            session,
            mock,
        }
    }

    fn profile(api_key: &str, num_lots: i64) -> serde_json::Value {
        json!({
            "id": 1,
            "username": "alice",
            "api_key": api_key,
            "api_secret": "S",
            "num_lots": num_lots,
            "is_trading_active": false,
        })
    }

    #[tokio::test]
    async fn test_load_seeds_editable_and_status() {
        let f = fixture();
        f.mock.always("GET /users/me", 200, profile("A", 2));

        f.config.load().await.unwrap();

        let config = f.config.current().await;
        assert_eq!(config.api_key, "A");
        assert_eq!(config.api_secret, "S");
        assert_eq!(config.num_lots.get(), 2);
        assert_eq!(f.live.read().await.status().unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_load_runs_once() {
        let f = fixture();
        f.mock.once("GET /users/me", 200, profile("A", 2));
        f.mock.always("GET /users/me", 200, profile("B", 9));

        f.config.load().await.unwrap();
        f.config.load().await.unwrap();

        assert_eq!(f.mock.count("GET /users/me"), 1);
        assert_eq!(f.config.current().await.api_key, "A");
    }

    #[tokio::test]
    async fn test_poll_never_touches_editable_fields() {
        let f = fixture();
        f.mock.once("GET /users/me", 200, profile("A", 2));
        f.mock.always("GET /users/me", 200, profile("B", 9));
        f.mock.always("GET /trades", 200, json!([]));

        f.config.load().await.unwrap();
        f.poller.refresher().refresh_now().await.unwrap();

        let config = f.config.current().await;
        assert_eq!(config.api_key, "A");
        assert_eq!(config.num_lots.get(), 2);
    }

    #[tokio::test]
    async fn test_operator_edits_survive_polls() {
        let f = fixture();
        f.mock.always("GET /users/me", 200, profile("A", 2));
        f.mock.always("GET /trades", 200, json!([]));

        f.config.load().await.unwrap();
        f.config.set_api_key("typing...").await;
        f.poller.refresher().refresh_now().await.unwrap();

        assert_eq!(f.config.current().await.api_key, "typing...");
    }

    #[tokio::test]
    async fn test_failed_load_is_not_seeded() {
        let f = fixture();
        f.mock.always("GET /users/me", 500, json!({"detail": "db locked"}));

        assert!(f.config.load().await.is_err());

        assert!(!f.config.is_loaded());
        let err = f
            .config
            .merge_edits(None, None, Some(NumLots::new(3).unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let full = f
            .config
            .merge_edits(
                Some("K".to_string()),
                Some("S".to_string()),
                Some(NumLots::new(3).unwrap()),
            )
            .await
            .unwrap();
        assert_eq!(full.api_key, "K");
    }

    #[tokio::test]
    async fn test_partial_edit_keeps_loaded_values() {
        let f = fixture();
        f.mock.always("GET /users/me", 200, profile("A", 2));

        f.config.load().await.unwrap();
        let merged = f
            .config
            .merge_edits(None, None, Some(NumLots::new(3).unwrap()))
            .await
            .unwrap();

        assert!(f.config.is_loaded());
        assert_eq!(merged.api_key, "A");
        assert_eq!(merged.api_secret, "S");
        assert_eq!(merged.num_lots.get(), 3);
    }

    #[tokio::test]
    async fn test_save_success() {
        let f = fixture();
        f.mock.always("GET /users/me", 200, profile("A", 2));
        f.mock.always("GET /trades", 200, json!([]));
        f.mock.always("POST /update_credentials", 200, json!({"id": 1}));

        f.config.load().await.unwrap();
        f.config
            .save("K".to_string(), "S2".to_string(), NumLots::new(3).unwrap())
            .await
            .unwrap();
        f.config.feedback.settled().await;

        let config = f.config.current().await;
        assert_eq!(config.api_key, "K");
        assert_eq!(config.num_lots.get(), 3);
        assert_eq!(f.notices.current().unwrap().text, SAVE_SUCCESS);
        // load + forced refresh
        assert_eq!(f.mock.count("GET /users/me"), 2);
    }

    #[tokio::test]
    async fn test_save_failure_leaves_local_fields() {
        let f = fixture();
        f.mock.always("GET /users/me", 200, profile("A", 2));
        f.mock.always("POST /update_credentials", 500, json!({"detail": "db locked"}));

        f.config.load().await.unwrap();
        f.config.set_api_key("edited").await;
        let result = f
            .config
            .save("edited".to_string(), "S".to_string(), NumLots::new(5).unwrap())
            .await;

        assert!(result.is_err());
        let config = f.config.current().await;
        assert_eq!(config.api_key, "edited");
        assert_eq!(config.num_lots.get(), 2);
        let notice = f.notices.current().unwrap();
        assert_eq!(notice.level, NoticeLevel::Failure);
        assert_eq!(notice.text, SAVE_FAILURE);
        assert!(f.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_save_unauthorized_signs_out_silently() {
        let f = fixture();
        f.mock.always("POST /update_credentials", 401, json!({"detail": "Invalid authentication credentials"}));

        let result = f
            .config
            .save("K".to_string(), "S".to_string(), NumLots::new(1).unwrap())
            .await;

        assert!(result.unwrap_err().is_authorization());
        assert!(!f.session.is_authenticated());
        assert!(f.notices.current().is_none());
    }
}
