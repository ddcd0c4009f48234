//! Wall-clock source for the session timer

use chrono::{DateTime, Utc};
use tokio::time::Instant;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock that advances with the tokio timer, paused test time included
#[derive(Debug, Clone, Copy)]
pub struct RuntimeClock {
    wall_anchor: DateTime<Utc>,
    instant_anchor: Instant,
}

impl RuntimeClock {
    pub fn new() -> Self {
        Self {
            wall_anchor: Utc::now(),
            instant_anchor: Instant::now(),
        }
    }
}

impl Default for RuntimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for RuntimeClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Instant::now().saturating_duration_since(self.instant_anchor);
        self.wall_anchor + chrono::Duration::milliseconds(elapsed.as_millis() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_follows_paused_time() {
        let clock = RuntimeClock::new();
        let before = clock.now();
        tokio::time::advance(Duration::from_secs(90)).await;
        let elapsed = clock.now() - before;
        assert_eq!(elapsed.num_seconds(), 90);
    }
}
