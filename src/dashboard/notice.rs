//! Transient operator messages.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    raised_at: Instant,
}

/// Holds the latest message until it expires or is dismissed.
/// A new message replaces the previous one.
#[derive(Clone)]
pub struct NoticeBoard {
    current: Arc<Mutex<Option<Notice>>>,
    ttl: Duration,
}

impl NoticeBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            ttl,
        }
    }

    pub fn success(&self, text: impl Into<String>) {
        self.raise(NoticeLevel::Success, text.into());
    }

    pub fn failure(&self, text: impl Into<String>) {
        self.raise(NoticeLevel::Failure, text.into());
    }

    fn raise(&self, level: NoticeLevel, text: String) {
        let notice = Notice {
            level,
            text,
            raised_at: Instant::now(),
        };
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some(notice);
    }

    /// The visible message, if it has not expired
    pub fn current(&self) -> Option<Notice> {
        let mut slot = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().is_some_and(|n| n.raised_at.elapsed() >= self.ttl) {
            *slot = None;
        }
        slot.clone()
    }

    pub fn dismiss(&self) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
