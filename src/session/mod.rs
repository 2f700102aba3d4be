//! Session lifecycle
//!
//! - [`store`] - the authoritative token, persisted and subscribable
//! - [`storage`] - durable backing for the token
//! - [`route`] - which view a navigation request lands on
//! - [`auth`] - login, registration, logout

pub mod auth;
pub mod route;
pub mod storage;
pub mod store;

pub use auth::AuthFlow;
pub use route::Route;
pub use storage::{FileTokenStorage, MemoryTokenStorage, TokenStorage, SESSION_STORAGE_KEY};
pub use store::SessionStore;
