//! Idle-session lifecycle.
//!
//! A session whose last inbound message is older than the idle timeout is
//! evicted on the next sweep; the user's next message starts a new thread.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::store::SessionStore;

/// Evaluates and applies the idle timeout.
#[derive(Debug, Clone)]
pub struct LifecycleManager {
    idle_timeout: chrono::Duration,
}

impl LifecycleManager {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout: chrono::Duration::from_std(idle_timeout)
                .unwrap_or(chrono::Duration::MAX),
        }
    }

    /// Oldest `last_accessed_at` that still counts as live at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.idle_timeout)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Run one eviction pass against `store`.  Returns how many sessions
    /// were removed.
    pub fn sweep(&self, store: &SessionStore, now: DateTime<Utc>) -> usize {
        let cutoff = self.cutoff(now);
        let evicted = store.evict_idle_since(cutoff);
        tracing::debug!(%cutoff, evicted, remaining = store.len(), "session sweep");
        evicted
    }
}
