//! Local check of the server token's fixed expiry

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::clock::{Clock, RuntimeClock};
use super::observer::TokenObserver;
use super::store::SettingsStore;
use crate::error::Result;

/// Storage key for the token expiry timestamp (RFC 3339)
pub const TOKEN_EXPIRY_KEY: &str = "tokenExpiry";

/// Lifetime of a token issued by the server
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// How often the stored expiry is checked
pub const CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherStatus {
    pub is_active: bool,
    pub check_interval_ms: u64,
    pub next_check_in: String,
}

struct WatcherInner {
    store: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    check_interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
    observer: Mutex<Option<Arc<dyn TokenObserver>>>,
}

impl WatcherInner {
    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn observer(&self) -> Option<Arc<dyn TokenObserver>> {
        self.observer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    async fn expiry(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.store.get(TOKEN_EXPIRY_KEY).await? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(e) => {
                warn!(value = %raw, error = %e, "Ignoring unreadable token expiry");
                Ok(None)
            }
        }
    }

    async fn check(&self) -> bool {
        let expiry = match self.expiry().await {
            Ok(Some(expiry)) => expiry,
            Ok(None) => {
                debug!("No token expiry stored");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Could not read token expiry");
                return false;
            }
        };

        if self.clock.now() < expiry {
            return false;
        }

        info!(%expiry, "Token expired - logging out");
        if let Err(e) = self.store.remove(TOKEN_EXPIRY_KEY).await {
            warn!(error = %e, "Failed to clear token expiry");
        }
        if let Some(observer) = self.observer() {
            observer.on_token_expired();
        }
        true
    }
}

/// Periodically compares the stored token expiry against the clock
#[derive(Clone)]
pub struct TokenExpiryWatcher {
    inner: Arc<WatcherInner>,
}

impl TokenExpiryWatcher {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self::with_clock(store, Arc::new(RuntimeClock::new()))
    }

    pub fn with_clock(store: Arc<dyn SettingsStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(WatcherInner {
                store,
                clock,
                check_interval: CHECK_INTERVAL,
                task: Mutex::new(None),
                observer: Mutex::new(None),
            }),
        }
    }

    /// Store the expiry of a token issued now; returns the expiry
    pub async fn record_token_issued(&self) -> Result<DateTime<Utc>> {
        let expiry = self.inner.clock.now()
            + chrono::Duration::milliseconds(TOKEN_LIFETIME.as_millis() as i64);
        self.inner
            .store
            .set(TOKEN_EXPIRY_KEY, &expiry.to_rfc3339())
            .await?;
        debug!(%expiry, "Recorded token expiry");
        Ok(expiry)
    }

    pub async fn expiry(&self) -> Result<Option<DateTime<Utc>>> {
        self.inner.expiry().await
    }

    pub async fn clear_token(&self) -> Result<()> {
        self.inner.store.remove(TOKEN_EXPIRY_KEY).await
    }

    /// Check once; returns whether the token had expired
    pub async fn check_expiry(&self) -> bool {
        self.inner.check().await
    }

    /// Start the periodic check; returns false if already running
    pub fn start(&self, observer: Arc<dyn TokenObserver>) -> bool {
        let mut task = self.inner.task();
        if task.is_some() {
            info!("Token watcher already running, skipping");
            return false;
        }

        *self
            .inner
            .observer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(observer);

        let weak: Weak<WatcherInner> = Arc::downgrade(&self.inner);
        let period = self.inner.check_interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.check().await;
            }
        }));

        info!(
            interval_secs = period.as_secs(),
            "Token watcher started"
        );
        true
    }

    pub fn stop(&self) {
        if let Some(task) = self.inner.task().take() {
            task.abort();
            info!("Token watcher stopped");
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.task().is_some()
    }

    pub fn status(&self) -> WatcherStatus {
        let is_active = self.is_active();
        WatcherStatus {
            is_active,
            check_interval_ms: self.inner.check_interval.as_millis() as u64,
            next_check_in: if is_active {
                "< 1 minute".to_string()
            } else {
                "Not running".to_string()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::MemorySettingsStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl TokenObserver for Counter {
        fn on_token_expired(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Counter {
        fn get(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    async fn elapse(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_after_one_hour() {
        let store = Arc::new(MemorySettingsStore::new());
        let watcher = TokenExpiryWatcher::new(store.clone());
        let counter = Arc::new(Counter::default());

        watcher.record_token_issued().await.unwrap();
        assert!(watcher.start(counter.clone()));

        elapse(59 * 60).await;
        assert_eq!(counter.get(), 0);
        assert!(watcher.expiry().await.unwrap().is_some());

        elapse(2 * 60 + 1).await;
        assert_eq!(counter.get(), 1);
        assert_eq!(store.get(TOKEN_EXPIRY_KEY).await.unwrap(), None);

        elapse(10 * 60).await;
        assert_eq!(counter.get(), 1);
        watcher.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let watcher = TokenExpiryWatcher::new(Arc::new(MemorySettingsStore::new()));
        assert!(!watcher.status().is_active);

        assert!(watcher.start(Arc::new(Counter::default())));
        assert!(!watcher.start(Arc::new(Counter::default())));
        assert_eq!(watcher.status().next_check_in, "< 1 minute");
        assert_eq!(watcher.status().check_interval_ms, 60_000);

        watcher.stop();
        assert!(!watcher.is_active());
        assert_eq!(watcher.status().next_check_in, "Not running");
    }

    #[tokio::test]
    async fn test_check_without_token() {
        let watcher = TokenExpiryWatcher::new(Arc::new(MemorySettingsStore::new()));
        assert!(!watcher.check_expiry().await);
    }

    #[tokio::test]
    async fn test_past_expiry_detected_immediately() {
        let store = Arc::new(MemorySettingsStore::with_entry(
            TOKEN_EXPIRY_KEY,
            "2020-01-01T00:00:00Z",
        ));
        let watcher = TokenExpiryWatcher::new(store.clone());
        assert!(watcher.check_expiry().await);
        assert_eq!(watcher.expiry().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unreadable_expiry_ignored() {
        let store = Arc::new(MemorySettingsStore::with_entry(TOKEN_EXPIRY_KEY, "soon"));
        let watcher = TokenExpiryWatcher::new(store);
        assert_eq!(watcher.expiry().await.unwrap(), None);
        assert!(!watcher.check_expiry().await);
    }
}
