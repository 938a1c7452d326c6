use std::time::Duration;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message processing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Deadline for one inbound message, from session lookup to reply.
    #[serde(default = "d_message_timeout")]
    pub message_timeout_secs: u64,

    /// Delay between run status polls while the run is queued or in progress.
    #[serde(default = "d_1000")]
    pub poll_interval_ms: u64,

    /// Delay after submitting tool outputs before polling again.
    #[serde(default = "d_1000")]
    pub action_settle_ms: u64,

    /// Prefix user messages with the name captured by the `lead` tool.
    #[serde(default = "d_true")]
    pub inject_collected_name: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            message_timeout_secs: d_message_timeout(),
            poll_interval_ms: 1000,
            action_settle_ms: 1000,
            inject_collected_name: true,
        }
    }
}

impl RuntimeConfig {
    pub fn message_timeout(&self) -> Duration {
        Duration::from_secs(self.message_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn action_settle(&self) -> Duration {
        Duration::from_millis(self.action_settle_ms)
    }
}

fn d_message_timeout() -> u64 {
    120
}
fn d_1000() -> u64 {
    1000
}
fn d_true() -> bool {
    true
}
