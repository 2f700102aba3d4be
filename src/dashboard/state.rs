//! Dashboard state
//!
//! Editable configuration and server-owned status are separate types.
//! [`LiveView`] only ever accepts [`LiveStatus`] and trades, so a status
//! refresh has no way to write into an [`EditableConfig`].

use chrono::NaiveDateTime;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::backend::models::{Trade, UserProfile};
use crate::error::ApiError;

// ============================================================================
// Validated inputs
// ============================================================================

/// Lot size: a positive whole number of lots
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NumLots(u32);

impl NumLots {
    pub fn new(lots: u32) -> Result<Self, ApiError> {
        if lots == 0 {
            return Err(ApiError::InvalidInput("lot size must be at least 1".to_string()));
        }
        Ok(Self(lots))
    }

    /// Parse operator input, e.g. from a text field
    pub fn parse(input: &str) -> Result<Self, ApiError> {
        let trimmed = input.trim();
        let lots = trimmed.parse::<i64>().map_err(|_| {
            ApiError::InvalidInput(format!("lot size '{}' is not a whole number", trimmed))
        })?;
        if lots < 1 {
            return Err(ApiError::InvalidInput(format!(
                "lot size must be at least 1, got {}",
                lots
            )));
        }
        let lots = u32::try_from(lots)
            .map_err(|_| ApiError::InvalidInput(format!("lot size {} is too large", lots)))?;
        Ok(Self(lots))
    }

    /// Seed value from a profile; missing or unusable values fall back to 1
    fn from_server(value: Option<i64>) -> Self {
        value
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v > 0)
            .map(Self)
            .unwrap_or(Self(1))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for NumLots {
    fn default() -> Self {
        Self(1)
    }
}

impl fmt::Display for NumLots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One-time code from the venue's login redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestToken(String);

impl RequestToken {
    pub fn parse(input: &str) -> Result<Self, ApiError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ApiError::InvalidInput("request token is empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Profile halves
// ============================================================================

/// Operator-editable configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditableConfig {
    pub api_key: String,
    pub api_secret: String,
    pub num_lots: NumLots,
}

impl EditableConfig {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            api_key: profile.api_key.clone().unwrap_or_default(),
            api_secret: profile.api_secret.clone().unwrap_or_default(),
            num_lots: NumLots::from_server(profile.num_lots),
        }
    }
}

/// Server-owned status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveStatus {
    pub username: String,
    pub access_token_present: bool,
    pub request_token_updated_at: Option<NaiveDateTime>,
    pub is_trading_active: bool,
}

impl LiveStatus {
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            username: profile.username.clone(),
            access_token_present: profile.access_token_present(),
            request_token_updated_at: profile.request_token_updated_at,
            is_trading_active: profile.is_trading_active,
        }
    }

    pub fn access_token_label(&self) -> &'static str {
        if self.access_token_present {
            "Active"
        } else {
            "Inactive"
        }
    }

    pub fn token_updated_label(&self) -> String {
        self.request_token_updated_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "Never".to_string())
    }

    pub fn trading_label(&self) -> &'static str {
        if self.is_trading_active {
            "RUNNING"
        } else {
            "STOPPED"
        }
    }
}

// ============================================================================
// Refresh ordering
// ============================================================================

/// Issue-order stamp of a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Monotonic source of [`Ticket`]s, shared by every refresh path
#[derive(Debug, Clone, Default)]
pub struct RefreshSequence(Arc<AtomicU64>);

impl RefreshSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> Ticket {
        Ticket(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Latest ticket issued so far
    pub fn current(&self) -> Ticket {
        Ticket(self.0.load(Ordering::SeqCst))
    }
}

// ============================================================================
// Live view
// ============================================================================

/// Status and trades as last reported by the backend
#[derive(Debug, Default)]
pub struct LiveView {
    status: Option<LiveStatus>,
    trades: Vec<Trade>,
    status_ticket: Option<Ticket>,
    trades_ticket: Option<Ticket>,
    /// Last requested trading state not yet confirmed by a refresh
    trading_intent: Option<(bool, Ticket)>,
}

/// Handle shared between the poller, the dispatcher and readers
pub type SharedLiveView = Arc<RwLock<LiveView>>;

impl LiveView {
    pub fn shared() -> SharedLiveView {
        Arc::new(RwLock::new(Self::default()))
    }

    pub fn status(&self) -> Option<&LiveStatus> {
        self.status.as_ref()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Replace status unless a newer refresh was already applied.
    ///
    /// Returns whether the status was applied.
    pub fn apply_status(&mut self, ticket: Ticket, status: LiveStatus) -> bool {
        if self.status_ticket.is_some_and(|last| ticket < last) {
            debug!("Discarding stale status (ticket {:?})", ticket);
            return false;
        }
        if self
            .trading_intent
            .is_some_and(|(_, issued_at)| ticket > issued_at)
        {
            self.trading_intent = None;
        }
        self.status = Some(status);
        self.status_ticket = Some(ticket);
        true
    }

    /// Replace the trade list wholesale unless a newer refresh was already applied
    pub fn apply_trades(&mut self, ticket: Ticket, trades: Vec<Trade>) -> bool {
        if self.trades_ticket.is_some_and(|last| ticket < last) {
            debug!("Discarding stale trades (ticket {:?})", ticket);
            return false;
        }
        self.trades = trades;
        self.trades_ticket = Some(ticket);
        true
    }

    /// Decide the state a toggle should request, and remember it.
    ///
    /// The basis is the last requested state while it is unconfirmed, else the
    /// reported status. `latest` is the newest ticket issued; only a refresh
    /// issued after it confirms the intent. `None` when no status is known.
    pub fn toggle_intent(&mut self, latest: Ticket) -> Option<bool> {
        let current = match self.trading_intent {
            Some((requested, _)) => requested,
            None => self.status.as_ref()?.is_trading_active,
        };
        let desired = !current;
        self.trading_intent = Some((desired, latest));
        Some(desired)
    }

    /// Forget an intent whose request failed
    pub fn abandon_intent(&mut self, desired: bool) {
        if self.trading_intent.is_some_and(|(requested, _)| requested == desired) {
            self.trading_intent = None;
        }
    }
}
