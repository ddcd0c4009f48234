//! Persisted session preferences

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Storage key for the settings document
pub const SETTINGS_KEY: &str = "session_settings";

/// Inactivity timeout used when nothing is stored
pub const DEFAULT_TIMEOUT_MINUTES: i64 = 30;

/// User-facing session settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    /// Inactivity timeout in minutes
    pub session_timeout: i64,
    pub show_warnings: bool,
    pub auto_logout_on_close: bool,
    pub pause_when_hidden: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            session_timeout: DEFAULT_TIMEOUT_MINUTES,
            show_warnings: true,
            auto_logout_on_close: false,
            pause_when_hidden: true,
        }
    }
}

impl SessionSettings {
    /// Timeout in milliseconds; zero or negative means the session never expires
    pub fn timeout_ms(&self) -> i64 {
        self.session_timeout.saturating_mul(60_000)
    }

    /// Parse a stored document, keeping defaults for any missing field
    pub fn from_stored(raw: &str) -> Result<Self> {
        let stored: SettingsUpdate = serde_json::from_str(raw)?;
        let mut settings = Self::default();
        stored.merge_into(&mut settings);
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Partial settings change; `None` keeps the current value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_timeout: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_warnings: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_logout_on_close: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause_when_hidden: Option<bool>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(minutes) = self.session_timeout
            && minutes <= 0
        {
            return Err(Error::InvalidInput(format!(
                "Session timeout must be a positive number of minutes, got {}",
                minutes
            )));
        }
        Ok(())
    }

    pub fn merge_into(&self, settings: &mut SessionSettings) {
        if let Some(v) = self.session_timeout {
            settings.session_timeout = v;
        }
        if let Some(v) = self.show_warnings {
            settings.show_warnings = v;
        }
        if let Some(v) = self.auto_logout_on_close {
            settings.auto_logout_on_close = v;
        }
        if let Some(v) = self.pause_when_hidden {
            settings.pause_when_hidden = v;
        }
    }
}
