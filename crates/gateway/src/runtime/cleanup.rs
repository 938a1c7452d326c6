//! Background eviction of idle sessions.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use imo_sessions::{LifecycleManager, SessionStore};

/// Periodically evicts sessions idle beyond the configured timeout.
#[derive(Clone)]
pub struct CleanupScheduler {
    sessions: Arc<SessionStore>,
    lifecycle: LifecycleManager,
    interval: Duration,
}

impl CleanupScheduler {
    pub fn new(sessions: Arc<SessionStore>, idle_timeout: Duration, interval: Duration) -> Self {
        Self {
            sessions,
            lifecycle: LifecycleManager::new(idle_timeout),
            interval,
        }
    }

    /// One cleanup cycle as of `now`.  Returns the number of sessions
    /// evicted.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        self.lifecycle.sweep(&self.sessions, now)
    }

    /// Start the periodic loop.  The first sweep happens one full
    /// interval after spawning.
    pub fn spawn(self) -> CleanupHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = self.interval;

        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        let evicted = self.sweep(Utc::now());
                        if evicted > 0 {
                            tracing::info!(evicted, remaining = self.sessions.len(), "evicted idle sessions");
                        }
                    }
                }
            }
            tracing::debug!("session cleanup stopped");
        });

        tracing::info!(interval_secs = period.as_secs(), "session cleanup started");
        CleanupHandle { cancel, task }
    }
}

/// Stops the cleanup loop started by [`CleanupScheduler::spawn`].  The
/// loop is also cancelled when the handle is dropped.
pub struct CleanupHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl CleanupHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signal the loop to stop and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "session cleanup task did not exit cleanly");
        }
    }
}

impl Drop for CleanupHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sweep_uses_idle_timeout() {
        let sessions = Arc::new(SessionStore::new());
        sessions
            .get_or_create("u1", || async { Ok("t1".to_string()) })
            .await
            .unwrap();

        let scheduler = CleanupScheduler::new(
            sessions.clone(),
            Duration::from_secs(24 * 3600),
            Duration::from_secs(3600),
        );

        assert_eq!(scheduler.sweep(Utc::now()), 0);
        assert_eq!(sessions.len(), 1);

        assert_eq!(scheduler.sweep(Utc::now() + chrono::Duration::hours(25)), 1);
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn loop_evicts_and_stops_on_shutdown() {
        let sessions = Arc::new(SessionStore::new());
        sessions
            .get_or_create("u1", || async { Ok("t1".to_string()) })
            .await
            .unwrap();

        // Zero idle timeout: anything touched before the tick is stale.
        let handle = CleanupScheduler::new(
            sessions.clone(),
            Duration::ZERO,
            Duration::from_millis(10),
        )
        .spawn();

        for _ in 0..100 {
            if sessions.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(sessions.is_empty());
        assert!(handle.is_running());

        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("cleanup loop did not stop");
    }

    #[tokio::test]
    async fn dropping_the_handle_stops_the_loop() {
        let sessions = Arc::new(SessionStore::new());
        let handle = CleanupScheduler::new(
            sessions.clone(),
            Duration::ZERO,
            Duration::from_millis(10),
        )
        .spawn();
        drop(handle);

        // Allow the cancelled task to exit, then confirm nothing is swept.
        tokio::time::sleep(Duration::from_millis(20)).await;
        sessions
            .get_or_create("u1", || async { Ok("t1".to_string()) })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sessions.len(), 1);
    }
}
