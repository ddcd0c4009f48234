//! Client-side session management
//!
//! [`SessionTimer`] forces a logout after a period of inactivity and warns
//! shortly before doing so. [`TokenExpiryWatcher`] independently enforces the
//! fixed lifetime of the server-issued token.

pub mod clock;
pub mod observer;
pub mod settings;
pub mod store;
pub mod timer;
pub mod token;

pub use clock::{Clock, RuntimeClock};
pub use observer::{LogoutReason, SessionObserver, TokenObserver};
pub use settings::{DEFAULT_TIMEOUT_MINUTES, SETTINGS_KEY, SessionSettings, SettingsUpdate};
pub use store::{FileSettingsStore, MemorySettingsStore, SettingsStore};
pub use timer::{DEFAULT_WARNING_WINDOW, SessionInfo, SessionTimer, SessionTimerBuilder, SettingsDebug};
pub use token::{CHECK_INTERVAL, TOKEN_EXPIRY_KEY, TOKEN_LIFETIME, TokenExpiryWatcher, WatcherStatus};
