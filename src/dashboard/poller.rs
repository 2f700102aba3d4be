//! Periodic status and trade refresh
//!
//! Every refresh (timer tick or forced) takes a ticket from the shared
//! [`RefreshSequence`] when it is issued. Ticks may overlap and complete in
//! any order; [`LiveView`] drops any response older than the last one
//! applied. Everything runs under the dashboard's lifetime token, and
//! results that arrive after cancellation are discarded.

use futures::future::join;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{LiveStatus, RefreshSequence, SharedLiveView, Ticket};
use crate::backend::BackendClient;

struct PollerInner {
    client: BackendClient,
    live: SharedLiveView,
    sequence: RefreshSequence,
    lifetime: CancellationToken,
}

/// Recurring status/trades fetcher for a mounted dashboard
pub struct StatusPoller {
    inner: Arc<PollerInner>,
}

/// Forces an out-of-band refresh. Cheap to clone.
#[derive(Clone)]
pub struct Refresher {
    inner: Arc<PollerInner>,
}

impl StatusPoller {
    pub fn new(
        client: BackendClient,
        live: SharedLiveView,
        sequence: RefreshSequence,
        lifetime: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                client,
                live,
                sequence,
                lifetime,
            }),
        }
    }

    pub fn refresher(&self) -> Refresher {
        Refresher {
            inner: self.inner.clone(),
        }
    }

    /// Start the timer. The first tick fires immediately.
    ///
    /// Ticks are fire-and-forget: a new one is issued every `period` whether
    /// or not earlier ones have finished. The loop ends when the lifetime
    /// token is cancelled.
    pub fn start(&self, period: Duration) -> JoinHandle<()> {
        let inner = self.inner.clone();
        info!("Status poller started ({:?} period)", period);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = inner.lifetime.cancelled() => break,
                    _ = interval.tick() => {
                        let ticket = inner.sequence.next();
                        tokio::spawn(inner.clone().tick(ticket));
                    }
                }
            }

            info!("Status poller stopped");
        })
    }
}

impl Refresher {
    /// Issue a refresh now, bypassing the timer
    pub fn refresh_now(&self) -> JoinHandle<()> {
        let ticket = self.inner.sequence.next();
        tokio::spawn(self.inner.clone().tick(ticket))
    }
}

impl PollerInner {
    async fn tick(self: Arc<Self>, ticket: Ticket) {
        if self.lifetime.is_cancelled() {
            return;
        }

        let fetches = join(self.client.profile(), self.client.trades());
        let (profile, trades) = tokio::select! {
            _ = self.lifetime.cancelled() => {
                debug!("Refresh {:?} abandoned, dashboard unmounted", ticket);
                return;
            }
            results = fetches => results,
        };

        // The client has already dropped the session; stop instead of merging.
        let rejected = profile.as_ref().is_err_and(|e| e.is_authorization())
            || trades.as_ref().is_err_and(|e| e.is_authorization());
        if rejected {
            self.lifetime.cancel();
            return;
        }

        let mut live = self.live.write().await;
        if self.lifetime.is_cancelled() {
            return;
        }

        match profile {
            Ok(profile) => {
                live.apply_status(ticket, LiveStatus::from_profile(&profile));
            }
            Err(e) => warn!("Status refresh failed: {}", e),
        }
        match trades {
            Ok(trades) => {
                live.apply_trades(ticket, trades);
            }
            Err(e) => warn!("Trade refresh failed: {}", e),
        }
    }
}
