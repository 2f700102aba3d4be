//! Outcome reporting shared by every operator action.

use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::notice::NoticeBoard;
use super::poller::Refresher;
use crate::error::{ApiError, ErrorClass};

/// After an action: show a message and, on success, force a refresh.
#[derive(Clone)]
pub struct Feedback {
    notices: NoticeBoard,
    refresher: Refresher,
    last_refresh: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Feedback {
    pub fn new(notices: NoticeBoard, refresher: Refresher) -> Self {
        Self {
            notices,
            refresher,
            last_refresh: Arc::new(Mutex::new(None)),
        }
    }

    /// Report an action's result and pass it back unchanged.
    ///
    /// Authorization failures raise no message; the session is already gone
    /// and the route change is the signal.
    pub fn settle(
        &self,
        result: Result<(), ApiError>,
        success: &str,
        failure: impl FnOnce(&ApiError) -> String,
    ) -> Result<(), ApiError> {
        match &result {
            Ok(()) => {
                info!("{}", success);
                self.notices.success(success);
                let handle = self.refresher.refresh_now();
                *self.last_refresh.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
            }
            Err(e) if e.class() == ErrorClass::Authorization => {
                debug!("Action rejected with an expired session");
            }
            Err(e) => {
                let text = failure(e);
                if e.class() == ErrorClass::Transport {
                    warn!("{} ({})", text, e);
                } else {
                    info!("{}", text);
                }
                self.notices.failure(text);
            }
        }
        result
    }

    /// Wait for the refresh triggered by the latest successful action
    pub async fn settled(&self) {
        let handle = self
            .last_refresh
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

/// `<prefix>: <server detail or error text>`
pub fn with_detail(prefix: &str, err: &ApiError) -> String {
    match err.detail() {
        Some(detail) => format!("{}: {}", prefix, detail),
        None => format!("{}: {}", prefix, err),
    }
}
