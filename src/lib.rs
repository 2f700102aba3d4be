// Library crate - session, backend client and dashboard state for the algo trading console

pub mod backend;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod session;

// Re-export commonly used types
pub use backend::{BackendClient, HttpTransport, Trade, UserProfile};
pub use config::ClientConfig;
pub use dashboard::{Dashboard, DashboardSnapshot};
pub use error::{ApiError, ErrorClass};
pub use session::{AuthFlow, Route, SessionStore};
