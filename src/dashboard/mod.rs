//! Authenticated dashboard
//!
//! Everything here exists only while a session does. [`Dashboard::mount`]
//! refuses to start without one, and the dashboard unmounts itself as soon as
//! the session is cleared (logout or a 401 anywhere).
//!
//! # Components
//!
//! - [`state`] - editable config vs. live status, refresh ordering
//! - [`config_state`] - operator-editable configuration
//! - [`poller`] - periodic status and trade refresh
//! - [`dispatcher`] - save / generate token / toggle trading
//! - [`metrics`] - totals derived from the trade list
//! - [`notice`] - transient success/failure messages
//!
//! # Usage
//!
//! ```rust,ignore
//! let dashboard = Dashboard::mount(client, &settings).await?;
//!
//! dashboard.dispatcher().toggle_trading().await?;
//! let snapshot = dashboard.snapshot().await;
//! println!("{} trades, P&L {:.2}", snapshot.metrics.trade_count, snapshot.metrics.total_pnl);
//!
//! dashboard.unmount().await;
//! ```

pub mod config_state;
pub mod dispatcher;
pub mod feedback;
pub mod metrics;
pub mod notice;
pub mod poller;
pub mod state;

pub use config_state::ConfigState;
pub use dispatcher::ActionDispatcher;
pub use metrics::DerivedMetrics;
pub use notice::{Notice, NoticeBoard, NoticeLevel};
pub use poller::{Refresher, StatusPoller};
pub use state::{EditableConfig, LiveStatus, LiveView, NumLots, RefreshSequence, RequestToken};

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use self::feedback::Feedback;
use self::state::SharedLiveView;
use crate::backend::{BackendClient, Trade};
use crate::config::ClientConfig;
use crate::error::ApiError;

/// A mounted dashboard. Dropping it unmounts.
pub struct Dashboard {
    config: Arc<ConfigState>,
    dispatcher: ActionDispatcher,
    live: SharedLiveView,
    notices: NoticeBoard,
    refresher: Refresher,
    lifetime: CancellationToken,
    poller_task: JoinHandle<()>,
}

/// Point-in-time copy of everything the dashboard shows
#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    /// `None` until the editable fields have been seeded from the profile
    pub config: Option<EditableConfig>,
    pub status: Option<LiveStatus>,
    pub trades: Vec<Trade>,
    pub metrics: DerivedMetrics,
    pub notice: Option<Notice>,
}

impl DashboardSnapshot {
    pub fn is_loading(&self) -> bool {
        self.status.is_none()
    }
}

impl Dashboard {
    /// Mount the dashboard: seed configuration once, then start polling.
    ///
    /// Fails with [`ApiError::Unauthorized`] when there is no session or the
    /// backend rejects it during the initial load. Any other initial load
    /// failure is logged and the dashboard stays in its loading state.
    pub async fn mount(client: BackendClient, settings: &ClientConfig) -> Result<Self, ApiError> {
        let session = client.session().subscribe();
        if session.borrow().is_none() {
            return Err(ApiError::Unauthorized { detail: None });
        }

        let lifetime = CancellationToken::new();
        let live = LiveView::shared();
        let sequence = RefreshSequence::new();
        let poller = StatusPoller::new(
            client.clone(),
            live.clone(),
            sequence.clone(),
            lifetime.clone(),
        );
        let refresher = poller.refresher();
        let notices = NoticeBoard::new(settings.notice_ttl);
        let feedback = Feedback::new(notices.clone(), refresher.clone());
        let config = Arc::new(ConfigState::new(
            client.clone(),
            live.clone(),
            sequence.clone(),
            feedback.clone(),
        ));
        let dispatcher =
            ActionDispatcher::new(client, config.clone(), live.clone(), sequence, feedback);

        tokio::spawn(unmount_on_sign_out(session, lifetime.clone()));

        match config.load().await {
            Ok(()) => {}
            Err(e) if e.is_authorization() => {
                lifetime.cancel();
                return Err(e);
            }
            Err(e) => warn!("Initial profile load failed: {}", e),
        }

        let poller_task = poller.start(settings.poll_interval);
        info!("Dashboard mounted");

        Ok(Self {
            config,
            dispatcher,
            live,
            notices,
            refresher,
            lifetime,
            poller_task,
        })
    }

    pub fn config(&self) -> &ConfigState {
        &self.config
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    /// Force a refresh outside the timer
    pub fn refresh(&self) -> JoinHandle<()> {
        self.refresher.refresh_now()
    }

    pub fn is_mounted(&self) -> bool {
        !self.lifetime.is_cancelled()
    }

    /// Resolves once the dashboard has been unmounted for any reason
    pub async fn closed(&self) {
        self.lifetime.cancelled().await;
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let (status, trades) = {
            let live = self.live.read().await;
            (live.status().cloned(), live.trades().to_vec())
        };
        let config = if self.config.is_loaded() {
            Some(self.config.current().await)
        } else {
            None
        };
        DashboardSnapshot {
            config,
            metrics: DerivedMetrics::from_trades(&trades),
            status,
            trades,
            notice: self.notices.current(),
        }
    }

    /// Stop polling and wait for the timer task to exit
    pub async fn unmount(mut self) {
        self.lifetime.cancel();
        if let Err(e) = (&mut self.poller_task).await {
            warn!("Poller task ended abnormally: {}", e);
        }
        info!("Dashboard unmounted");
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

async fn unmount_on_sign_out(
    mut session: watch::Receiver<Option<String>>,
    lifetime: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = lifetime.cancelled() => return,
            changed = session.changed() => {
                if changed.is_err() || session.borrow_and_update().is_none() {
                    info!("Session ended, unmounting dashboard");
                    lifetime.cancel();
                    return;
                }
            }
        }
    }
}
