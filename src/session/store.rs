//! The single authoritative session token.

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::route::Route;
use super::storage::{TokenStorage, SESSION_STORAGE_KEY};

/// Owns the session token. Clones share the same underlying session.
///
/// Every component that talks to the backend receives a `SessionStore`
/// handle; nothing reads the token from anywhere else.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    token: watch::Sender<Option<String>>,
    storage: Box<dyn TokenStorage>,
}

impl SessionStore {
    /// Open the store, restoring any token persisted by a previous run.
    pub fn open(storage: impl TokenStorage + 'static) -> Result<Self> {
        let restored = storage.load(SESSION_STORAGE_KEY)?.filter(|t| !t.is_empty());
        if restored.is_some() {
            info!("Restored persisted session");
        }
        let (token, _) = watch::channel(restored);
        Ok(Self {
            inner: Arc::new(Inner {
                token,
                storage: Box::new(storage),
            }),
        })
    }

    pub fn get(&self) -> Option<String> {
        self.inner.token.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.token.borrow().is_some()
    }

    /// Replace the session. `None` clears it.
    ///
    /// Persistence failures are logged; the in-memory value always changes so
    /// invalidation can never be blocked by storage.
    pub fn set(&self, token: Option<String>) {
        let token = token.filter(|t| !t.is_empty());
        let persisted = match &token {
            Some(t) => self.inner.storage.store(SESSION_STORAGE_KEY, t),
            None => self.inner.storage.remove(SESSION_STORAGE_KEY),
        };
        if let Err(e) = persisted {
            warn!("Failed to persist session change: {:#}", e);
        }

        let present = token.is_some();
        self.inner.token.send_replace(token);
        debug!("Session {}", if present { "set" } else { "cleared" });
    }

    /// Drop the session because the backend rejected it.
    pub fn invalidate(&self) {
        if self.is_authenticated() {
            warn!("Session rejected by backend, signing out");
        }
        self.set(None);
    }

    /// Drop the session only if it is still the one a rejected request carried.
    ///
    /// A 401 answering a token that has since been replaced says nothing
    /// about the current session. Returns whether the session was cleared.
    pub fn invalidate_if(&self, sent: Option<&str>) -> bool {
        if self.inner.token.borrow().as_deref() != sent {
            debug!("Ignoring rejection of a superseded session");
            return false;
        }
        self.invalidate();
        true
    }

    /// Watch for session changes. The receiver sees every `set` immediately.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.inner.token.subscribe()
    }

    /// Where a navigation request actually lands given the current session.
    pub fn route(&self, requested: Option<Route>) -> Route {
        Route::resolve(requested, self.is_authenticated())
    }
}
