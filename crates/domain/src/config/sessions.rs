use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session lifecycle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Controls how long an idle conversation keeps its thread and how often
/// the background sweep runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Sessions not touched for this many seconds are evicted.
    #[serde(default = "d_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Interval between eviction sweeps.
    #[serde(default = "d_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: d_idle_timeout(),
            cleanup_interval_secs: d_cleanup_interval(),
        }
    }
}

impl SessionsConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

fn d_idle_timeout() -> u64 {
    24 * 60 * 60
}
fn d_cleanup_interval() -> u64 {
    60 * 60
}
