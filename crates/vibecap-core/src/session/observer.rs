//! Callbacks fired by the session timer

use serde::Serialize;
use std::fmt;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// Inactivity deadline passed
    Timeout,
    /// User asked to log out
    Manual,
    /// Page closed with auto-logout enabled
    PageClosed,
}

impl LogoutReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Manual => "manual",
            Self::PageClosed => "page_closed",
        }
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Receiver for session events
///
/// Called from timer tasks without any timer lock held, so implementations
/// may call back into the timer.
pub trait SessionObserver: Send + Sync {
    fn on_logout(&self, reason: LogoutReason);

    /// `remaining_ms` is the length of the warning window
    fn on_warning(&self, _remaining_ms: i64) {}

    /// Tab became visible again and the countdown restarted
    fn on_activity_resume(&self) {}
}

/// Callback for the token expiry watcher
pub trait TokenObserver: Send + Sync {
    fn on_token_expired(&self);
}
