//! Inactivity timer with a warning window before forced logout

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::clock::{Clock, RuntimeClock};
use super::observer::{LogoutReason, SessionObserver};
use super::settings::{SETTINGS_KEY, SessionSettings, SettingsUpdate};
use super::store::{MemorySettingsStore, SettingsStore};
use crate::error::Result;

/// How long before the deadline the warning fires
pub const DEFAULT_WARNING_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Snapshot returned by [`SessionTimer::session_info`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub last_activity: DateTime<Utc>,
    /// Milliseconds until the logout deadline, 0 when no countdown is running
    pub time_until_expiry: i64,
    pub is_warning_shown: bool,
    pub is_active: bool,
    pub settings: SessionSettings,
}

/// Diagnostic dump of the timer and its persisted settings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDebug {
    pub settings: SessionSettings,
    pub timeout_ms: i64,
    pub warning_window_ms: i64,
    /// Raw stored document, if readable
    pub stored: Option<String>,
    pub is_initialized: bool,
    pub is_tab_visible: bool,
    pub session_start: DateTime<Utc>,
    pub time_until_expiry: i64,
}

struct SessionState {
    settings: SessionSettings,
    last_activity: DateTime<Utc>,
    session_start: DateTime<Utc>,
    is_warning_shown: bool,
    is_tab_visible: bool,
    is_initialized: bool,
    /// Logout deadline armed
    is_running: bool,
    /// Countdown was cleared by a hidden tab and restarts on visible
    paused: bool,
    /// Bumped whenever timers are cleared; firings from older epochs are ignored
    epoch: u64,
    warning_task: Option<JoinHandle<()>>,
    logout_task: Option<JoinHandle<()>>,
    observer: Option<Arc<dyn SessionObserver>>,
}

impl SessionState {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            settings: SessionSettings::default(),
            last_activity: now,
            session_start: now,
            is_warning_shown: false,
            is_tab_visible: true,
            is_initialized: false,
            is_running: false,
            paused: false,
            epoch: 0,
            warning_task: None,
            logout_task: None,
            observer: None,
        }
    }

    fn clear_timers(&mut self) {
        if let Some(task) = self.warning_task.take() {
            task.abort();
        }
        if let Some(task) = self.logout_task.take() {
            task.abort();
        }
        self.epoch += 1;
        self.is_running = false;
    }

    fn time_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        if !self.is_running {
            return 0;
        }
        let elapsed = (now - self.last_activity).num_milliseconds();
        (self.settings.timeout_ms() - elapsed).max(0)
    }
}

struct Inner {
    store: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    warning_window: Duration,
    state: Mutex<SessionState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn warning_window_ms(&self) -> i64 {
        self.warning_window.as_millis() as i64
    }

    fn fire_warning(&self, epoch: u64) {
        let observer = {
            let mut state = self.lock();
            if state.epoch != epoch {
                return;
            }
            state.warning_task = None;
            state.is_warning_shown = true;
            state.observer.clone()
        };

        info!(remaining_ms = self.warning_window_ms(), "Session expiring soon");
        if let Some(observer) = observer {
            observer.on_warning(self.warning_window_ms());
        }
    }

    fn fire_logout(&self, epoch: u64) {
        let observer = {
            let mut state = self.lock();
            if state.epoch != epoch {
                return;
            }
            // The running task is this one; drop its handle instead of aborting it
            state.logout_task = None;
            state.clear_timers();
            state.observer.clone()
        };

        info!("Session timeout - logging out");
        if let Some(observer) = observer {
            observer.on_logout(LogoutReason::Timeout);
        }
    }
}

/// Builder for [`SessionTimer`]
pub struct SessionTimerBuilder {
    store: Option<Arc<dyn SettingsStore>>,
    clock: Option<Arc<dyn Clock>>,
    warning_window: Duration,
}

impl SessionTimerBuilder {
    fn new() -> Self {
        Self {
            store: None,
            clock: None,
            warning_window: DEFAULT_WARNING_WINDOW,
        }
    }

    /// Where settings are persisted (default: in-memory)
    pub fn store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn warning_window(mut self, window: Duration) -> Self {
        self.warning_window = window;
        self
    }

    pub fn build(self) -> SessionTimer {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemorySettingsStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(RuntimeClock::new()));
        let now = clock.now();

        SessionTimer {
            inner: Arc::new(Inner {
                store,
                clock,
                warning_window: self.warning_window,
                state: Mutex::new(SessionState::new(now)),
            }),
        }
    }
}

/// Client-side inactivity timer
///
/// The countdown is driven by [`start_session`](Self::start_session) and
/// [`extend_session`](Self::extend_session) only. Recording activity moves
/// `last_activity` but does not push the deadline back.
///
/// Methods that arm timers spawn tokio tasks and must run inside a runtime.
#[derive(Clone)]
pub struct SessionTimer {
    inner: Arc<Inner>,
}

impl SessionTimer {
    pub fn builder() -> SessionTimerBuilder {
        SessionTimerBuilder::new()
    }

    /// Timer persisting to `store` with the default warning window
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self::builder().store(store).build()
    }

    fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Clear existing timers and arm new deadlines from now
    fn arm(&self, state: &mut SessionState) {
        state.clear_timers();
        state.paused = false;

        let timeout_ms = state.settings.timeout_ms();
        if timeout_ms <= 0 {
            warn!(
                session_timeout = state.settings.session_timeout,
                "Invalid session timeout, countdown not started"
            );
            return;
        }

        let timeout = Duration::from_millis(timeout_ms as u64);
        let window = self.inner.warning_window;
        let epoch = state.epoch;

        if state.settings.show_warnings && window < timeout {
            let inner = Arc::downgrade(&self.inner);
            state.warning_task = Some(spawn_deadline(inner, timeout - window, move |inner| {
                inner.fire_warning(epoch)
            }));
        }

        let inner = Arc::downgrade(&self.inner);
        state.logout_task = Some(spawn_deadline(inner, timeout, move |inner| {
            inner.fire_logout(epoch)
        }));
        state.is_running = true;

        debug!(timeout_ms, warning_window_ms = window.as_millis() as u64, "Session timer armed");
    }

    fn reset_locked(&self, state: &mut SessionState) {
        if state.is_tab_visible || !state.settings.pause_when_hidden {
            self.arm(state);
        }
    }

    async fn persist(&self, settings: &SessionSettings) {
        let result = match settings.to_json() {
            Ok(json) => self.inner.store.set(SETTINGS_KEY, &json).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => debug!(?settings, "Session settings saved"),
            Err(e) => warn!(error = %e, "Failed to save session settings"),
        }
    }

    /// Read persisted settings into the timer
    ///
    /// Missing settings are written back as defaults. Malformed or unreadable
    /// settings fall back to defaults without failing.
    pub async fn load_settings(&self) -> SessionSettings {
        let settings = match self.inner.store.get(SETTINGS_KEY).await {
            Ok(Some(raw)) => match SessionSettings::from_stored(&raw) {
                Ok(settings) => {
                    debug!(?settings, "Loaded session settings");
                    settings
                }
                Err(e) => {
                    warn!(error = %e, "Malformed session settings, using defaults");
                    SessionSettings::default()
                }
            },
            Ok(None) => {
                let settings = SessionSettings::default();
                info!("No saved session settings, storing defaults");
                self.persist(&settings).await;
                settings
            }
            Err(e) => {
                warn!(error = %e, "Session settings unavailable, using defaults");
                SessionSettings::default()
            }
        };

        self.inner.lock().settings = settings;
        settings
    }

    /// Load settings and attach the observer; the countdown stays dormant
    ///
    /// Calling again only swaps the observer.
    pub async fn init(&self, observer: Arc<dyn SessionObserver>) {
        {
            let mut state = self.inner.lock();
            if state.is_initialized {
                info!("Session timer already initialized, updating observer only");
                state.observer = Some(observer);
                return;
            }
        }

        let settings = self.load_settings().await;

        let now = self.now();
        let mut state = self.inner.lock();
        state.observer = Some(observer);
        if state.is_initialized {
            return;
        }
        state.session_start = now;
        state.last_activity = now;
        state.is_initialized = true;

        info!(
            timeout_minutes = settings.session_timeout,
            "Session timer initialized, waiting for start"
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock().is_initialized
    }

    /// Whether a logout deadline is armed
    pub fn is_running(&self) -> bool {
        self.inner.lock().is_running
    }

    pub fn settings(&self) -> SessionSettings {
        self.inner.lock().settings
    }

    pub fn warning_window(&self) -> Duration {
        self.inner.warning_window
    }

    /// Begin the countdown; ignored before init or while already running
    pub fn start_session(&self) {
        let now = self.now();
        let mut state = self.inner.lock();

        if !state.is_initialized {
            warn!("Cannot start session - not initialized yet");
            return;
        }
        if state.is_running {
            debug!("Session already running");
            return;
        }

        state.last_activity = now;
        self.arm(&mut state);
        info!(timeout_minutes = state.settings.session_timeout, "Session started");
    }

    /// User chose to stay: hide the warning and restart the countdown
    pub fn extend_session(&self) {
        let now = self.now();
        let mut state = self.inner.lock();

        if !state.is_initialized {
            warn!("Cannot extend session - not initialized yet");
            return;
        }

        state.last_activity = now;
        state.is_warning_shown = false;

        if state.is_running {
            self.reset_locked(&mut state);
        } else {
            self.arm(&mut state);
        }
        info!(timeout_minutes = state.settings.session_timeout, "Session extended");
    }

    /// Re-arm the full window unless paused by a hidden tab
    pub fn reset_timer(&self) {
        let mut state = self.inner.lock();
        if !state.is_initialized {
            warn!("Cannot reset session timer - not initialized yet");
            return;
        }
        self.reset_locked(&mut state);
    }

    /// Log out now, bypassing the deadlines
    pub fn logout(&self) {
        let observer = {
            let mut state = self.inner.lock();
            state.clear_timers();
            state.paused = false;
            state.is_warning_shown = false;
            state.observer.clone()
        };

        info!("Manual logout");
        if let Some(observer) = observer {
            observer.on_logout(LogoutReason::Manual);
        }
    }

    /// Page is being closed; logs out when `autoLogoutOnClose` is set
    ///
    /// Returns whether a logout happened.
    pub fn page_closing(&self) -> bool {
        let observer = {
            let mut state = self.inner.lock();
            if !state.settings.auto_logout_on_close {
                return false;
            }
            state.clear_timers();
            state.paused = false;
            state.observer.clone()
        };

        info!("Page closing - auto logout");
        if let Some(observer) = observer {
            observer.on_logout(LogoutReason::PageClosed);
        }
        true
    }

    /// Tab visibility changed
    ///
    /// With `pauseWhenHidden`, hiding clears the countdown and showing again
    /// restarts the full window if a countdown was running.
    pub fn set_tab_visibility(&self, visible: bool) {
        let now = self.now();
        let observer = {
            let mut state = self.inner.lock();
            state.is_tab_visible = visible;
            if !state.settings.pause_when_hidden {
                return;
            }

            if !visible {
                if state.is_running {
                    state.paused = true;
                }
                state.clear_timers();
                info!("Tab hidden - session timer paused");
                return;
            }

            if !state.paused {
                return;
            }
            state.last_activity = now;
            self.arm(&mut state);
            info!("Tab visible - session timer resumed");
            state.observer.clone()
        };

        if let Some(observer) = observer {
            observer.on_activity_resume();
        }
    }

    /// Click or keypress; moves `last_activity` without touching the countdown
    pub fn record_activity(&self) {
        let now = self.now();
        self.inner.lock().last_activity = now;
    }

    /// Successful API call; same effect as [`record_activity`](Self::record_activity)
    pub fn update_last_activity(&self) {
        self.record_activity();
    }

    /// Whether the last activity is within the timeout
    ///
    /// A non-positive timeout never expires.
    pub fn is_session_valid(&self) -> bool {
        let now = self.now();
        let state = self.inner.lock();
        let timeout_ms = state.settings.timeout_ms();
        timeout_ms <= 0 || (now - state.last_activity).num_milliseconds() < timeout_ms
    }

    pub fn hide_warning(&self) {
        self.inner.lock().is_warning_shown = false;
    }

    pub fn session_info(&self) -> SessionInfo {
        let now = self.now();
        let state = self.inner.lock();
        SessionInfo {
            last_activity: state.last_activity,
            time_until_expiry: state.time_until_expiry(now),
            is_warning_shown: state.is_warning_shown,
            is_active: state.is_running,
            settings: state.settings,
        }
    }

    /// Merge, validate and persist a settings change
    ///
    /// A running countdown is re-armed with the new timeout. Storage failures
    /// are logged; the change still applies in memory.
    pub async fn save_settings(&self, update: SettingsUpdate) -> Result<SessionSettings> {
        update.validate()?;

        let settings = {
            let mut state = self.inner.lock();
            update.merge_into(&mut state.settings);
            state.settings
        };
        self.persist(&settings).await;

        let mut state = self.inner.lock();
        if state.is_initialized && state.is_running {
            self.reset_locked(&mut state);
        }
        info!(?settings, "Session settings updated");
        Ok(settings)
    }

    pub async fn set_session_timeout(&self, minutes: i64) -> Result<SessionSettings> {
        info!(minutes, "Changing session timeout");
        self.save_settings(SettingsUpdate {
            session_timeout: Some(minutes),
            ..Default::default()
        })
        .await
    }

    /// Re-read persisted settings, re-arming a running countdown
    pub async fn reload_settings(&self) -> SessionSettings {
        let settings = self.load_settings().await;
        let mut state = self.inner.lock();
        if state.is_initialized && state.is_running {
            self.reset_locked(&mut state);
        }
        info!(timeout_minutes = settings.session_timeout, "Session settings reloaded");
        settings
    }

    pub async fn debug_settings(&self) -> SettingsDebug {
        let stored = match self.inner.store.get(SETTINGS_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Could not read stored session settings");
                None
            }
        };

        let now = self.now();
        let snapshot = {
            let state = self.inner.lock();
            SettingsDebug {
                settings: state.settings,
                timeout_ms: state.settings.timeout_ms(),
                warning_window_ms: self.inner.warning_window_ms(),
                stored,
                is_initialized: state.is_initialized,
                is_tab_visible: state.is_tab_visible,
                session_start: state.session_start,
                time_until_expiry: state.time_until_expiry(now),
            }
        };

        info!(
            settings = ?snapshot.settings,
            timeout_ms = snapshot.timeout_ms,
            stored = ?snapshot.stored,
            is_initialized = snapshot.is_initialized,
            time_until_expiry = snapshot.time_until_expiry,
            "Session timer debug"
        );
        snapshot
    }

    /// Stop all timers and forget the observer
    pub fn destroy(&self) {
        let mut state = self.inner.lock();
        state.clear_timers();
        state.paused = false;
        state.is_initialized = false;
        state.observer = None;
        info!("Session timer destroyed");
    }
}

fn spawn_deadline<F>(inner: Weak<Inner>, after: Duration, fire: F) -> JoinHandle<()>
where
    F: FnOnce(&Inner) + Send + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        if let Some(inner) = inner.upgrade() {
            fire(&inner);
        }
    })
}
