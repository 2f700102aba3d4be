//! Backend API Data Models
//!
//! Request and response types for the trading backend REST API.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Authentication
// ============================================================================

/// Response from `POST /token`
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Session token for bearer authentication
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Request body for `POST /register`
#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

// ============================================================================
// User profile
// ============================================================================

/// Response from `GET /users/me`
///
/// Carries both operator-editable configuration and server-owned status; the
/// dashboard splits these apart before storing anything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: i64,
    pub username: String,

    // Editable configuration
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default)]
    pub num_lots: Option<i64>,

    // Server-owned status
    /// Venue access token; only its presence matters to the client
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub request_token_updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub is_trading_active: bool,
}

impl UserProfile {
    pub fn access_token_present(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

// ============================================================================
// Trades
// ============================================================================

/// Lifecycle state of a trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Closed,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Option side, read off the contract symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Call,
    Put,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call => write!(f, "CE"),
            Self::Put => write!(f, "PE"),
        }
    }
}

/// An executed trade as reported by the backend (read-only)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trade {
    pub id: i64,
    pub symbol: String,
    pub entry_time: NaiveDateTime,
    #[serde(default)]
    pub exit_time: Option<NaiveDateTime>,
    pub entry_price: f64,
    #[serde(default)]
    pub exit_price: Option<f64>,
    pub quantity: i64,
    /// Realized P&L; absent while the position is open
    #[serde(default)]
    pub pnl: Option<f64>,
    pub status: TradeStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Trade {
    pub fn option_kind(&self) -> OptionKind {
        if self.symbol.contains("CE") {
            OptionKind::Call
        } else {
            OptionKind::Put
        }
    }

    pub fn is_open(&self) -> bool {
        self.pnl.is_none()
    }
}
