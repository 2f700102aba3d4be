//! Trading Backend API Integration
//!
//! # Components
//!
//! - [`transport`] - abstract request function and its reqwest implementation
//! - [`client`] - typed endpoint calls with bearer auth and 401 handling
//! - [`models`] - request/response data types
//!
//! # API Endpoints Used
//!
//! All paths are relative to `<origin>/api`.
//!
//! - `POST /token` - Login (form fields)
//! - `POST /register` - Create account
//! - `GET /users/me` - Profile and status
//! - `POST /update_credentials` - Save broker credentials and lot size
//! - `POST /generate_token` - Exchange request token
//! - `POST /toggle_trading` - Start/stop the trading process
//! - `GET /trades` - Trade history

pub mod client;
pub mod models;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use client::BackendClient;
pub use models::{OptionKind, Trade, TradeStatus, UserProfile};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, RequestBody, Transport};
